// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The benchmark state machine: setup, run, teardown.

use crate::connections::Connections;
use crate::env::ServerEnv;
use crate::error::BenchmarkError;
use crate::label::{Label, LabelMap};
use crate::measure::{self, ThroughputResult};
use crate::options::BenchmarkOptions;
use crate::orchestrator::{activate_forwarder, activate_traffic_gen, start_traffic_gen};
use crate::plan::{forwarder_plan, traffic_gen_plan};
use crate::readiness::FaceReadiness;
use crate::state::RunState;
use crate::workload::WorkloadPlanner;
use control::gql::GqlOptions;
use core::fmt::{Display, Formatter};
use futures::future::try_join_all;
use std::future::Future;
use std::time::SystemTime;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Where a [`Benchmark`] is in its lifecycle.  Phases only move forward.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Phase {
    Constructed,
    ForwarderActive,
    GeneratorsActive,
    WorkloadRunning,
    Measured,
    TornDown,
}

impl Display for Phase {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        let name = match self {
            Phase::Constructed => "constructed",
            Phase::ForwarderActive => "forwarder-active",
            Phase::GeneratorsActive => "generators-active",
            Phase::WorkloadRunning => "workload-running",
            Phase::Measured => "measured",
            Phase::TornDown => "torn-down",
        };
        f.write_str(name)
    }
}

/// Run `work` unless `cancel` fires first, in which case every connection is closed.
async fn cancellable<T>(
    cancel: &CancellationToken,
    conns: &Connections,
    work: impl Future<Output = Result<T, BenchmarkError>>,
) -> Result<T, BenchmarkError> {
    if cancel.is_cancelled() {
        conns.close_all();
        return Err(BenchmarkError::Cancelled);
    }
    tokio::select! {
        biased;
        () = cancel.cancelled() => {
            warn!("benchmark cancelled, closing control connections");
            conns.close_all();
            Err(BenchmarkError::Cancelled)
        }
        result = work => result,
    }
}

/// One forwarder benchmark.
pub struct Benchmark {
    env: ServerEnv,
    opts: BenchmarkOptions,
    conns: Connections,
    cancel: CancellationToken,
    state: RunState,
    phase: Phase,
}

impl Benchmark {
    /// Check options and environment and take over `conns`.
    ///
    /// No remote call is made; option and core allocation problems are reported here.
    /// Cancelling `cancel` aborts whatever phase is in progress.
    pub fn new(
        env: ServerEnv,
        opts: BenchmarkOptions,
        conns: Connections,
        cancel: CancellationToken,
    ) -> Result<Self, BenchmarkError> {
        opts.validate()?;
        forwarder_plan(&env.forwarder, &opts)?;
        for label in Label::ALL {
            traffic_gen_plan(env.generator(label))?;
        }
        Ok(Self {
            env,
            opts,
            conns,
            cancel,
            state: RunState::default(),
            phase: Phase::Constructed,
        })
    }

    /// A benchmark over GraphQL connections to the nodes of `env`.
    pub fn gql(
        env: ServerEnv,
        opts: BenchmarkOptions,
        gql: &GqlOptions,
        cancel: CancellationToken,
    ) -> Result<Self, BenchmarkError> {
        let conns = Connections::gql(&env, gql)?;
        Self::new(env, opts, conns, cancel)
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    #[must_use]
    pub fn state(&self) -> &RunState {
        &self.state
    }

    #[must_use]
    pub fn options(&self) -> &BenchmarkOptions {
        &self.opts
    }

    fn require(&self, operation: &'static str, phase: Phase) -> Result<(), BenchmarkError> {
        if self.phase == phase {
            Ok(())
        } else {
            Err(BenchmarkError::Phase {
                operation,
                phase: self.phase,
            })
        }
    }

    /// Activate the forwarder and the traffic generators and connect them.
    ///
    /// The forwarder and the generator nodes are restarted and activated concurrently.  Traffic
    /// generators start only after forwarder activation has completed.
    #[instrument(level = "info", skip_all)]
    pub async fn setup(&mut self) -> Result<(), BenchmarkError> {
        self.require("setup", Phase::Constructed)?;
        let (conns, env, opts) = (&self.conns, &self.env, &self.opts);
        let readiness = &FaceReadiness::new();

        let forwarder = async {
            let activation =
                activate_forwarder(conns.forwarder(), &env.forwarder, opts, readiness).await;
            if activation.is_err() {
                readiness.abandon();
            }
            activation
        };
        let generators = try_join_all(conns.generator_nodes().into_iter().map(
            |(tg, labels)| async move {
                // a shared node is activated once, with the first label's resources
                activate_traffic_gen(tg, env.generator(labels[0])).await?;
                try_join_all(labels.iter().map(|label| async move {
                    let started =
                        start_traffic_gen(tg, env.generator(*label), opts, *label, readiness)
                            .await?;
                    Ok::<_, BenchmarkError>((*label, started))
                }))
                .await
            },
        ));
        let (forwarder, generators) = cancellable(&self.cancel, conns, async {
            Ok(tokio::join!(forwarder, generators))
        })
        .await?;

        let activation = forwarder?;
        self.state.faces = activation.faces.map(|_, face| Some(face));
        self.state.ndt_duplicate = activation.ndt_duplicate;
        self.phase = Phase::ForwarderActive;
        if activation.ndt_duplicate {
            warn!("dispatch table collision: forwarding shards are not fully used");
        }

        for (label, started) in generators?.into_iter().flatten() {
            self.state.version_bypass_hi[label] = started.version_bypass_hi.unwrap_or(0);
            self.state.fetchers[label] = Some(started.fetcher);
        }
        self.phase = Phase::GeneratorsActive;
        info!("setup complete");
        Ok(())
    }

    /// Run the timed workload and measure it.
    #[instrument(level = "info", skip_all)]
    pub async fn run(&mut self) -> Result<ThroughputResult, BenchmarkError> {
        self.require("run", Phase::GeneratorsActive)?;
        let planner = WorkloadPlanner::new(&self.opts, &mut rand::rng(), SystemTime::now())?;
        let plan = planner.plan(&self.state)?;

        let (conns, state) = (&self.conns, &self.state);
        let started = cancellable(&self.cancel, conns, async {
            Ok(measure::start_fetches(conns, state, &plan).await)
        })
        .await?;
        let mut failure = None;
        for outcome in started {
            match outcome {
                Ok((label, tasks)) => self.state.tasks[label] = tasks,
                Err(e) => {
                    failure.get_or_insert(e);
                }
            }
        }
        if let Some(e) = failure {
            warn!("not every direction started fetching: {e}");
            return Err(e);
        }
        self.phase = Phase::WorkloadRunning;

        let (warmup, duration) = (self.opts.warmup(), self.opts.duration());
        let (conns, state) = (&self.conns, &self.state);
        info!(
            "fetching: {}s warmup, {}s measurement",
            warmup.as_secs(),
            duration.as_secs()
        );
        let measured = cancellable(&self.cancel, conns, async {
            tokio::time::sleep(warmup).await;
            let before = if warmup.is_zero() {
                None
            } else {
                Some(measure::sample(conns, state).await?)
            };
            tokio::time::sleep(duration).await;
            let after = measure::sample(conns, state).await?;
            Ok((before, after))
        })
        .await;
        if matches!(measured, Err(BenchmarkError::Cancelled)) {
            return Err(BenchmarkError::Cancelled);
        }

        cancellable(&self.cancel, conns, async {
            Ok(measure::stop_fetches(conns, state).await)
        })
        .await?;
        self.state.tasks = LabelMap::default();

        let (before, after) = measured?;
        let mut result = measure::reduce(before.as_ref(), &after, self.opts.payload_len)?;
        result.ndt_duplicate = self.state.ndt_duplicate;
        self.phase = Phase::Measured;
        info!(
            "measured {:.0} pps, {:.0} bps over {:.3}s",
            result.pps, result.bps, result.duration
        );
        Ok(result)
    }

    /// Stop leftover fetch tasks and close all connections.  Best-effort; never fails.
    #[instrument(level = "info", skip_all)]
    pub async fn teardown(&mut self) {
        if self.phase == Phase::TornDown {
            return;
        }
        if self.state.has_tasks() && !self.cancel.is_cancelled() {
            let (conns, state) = (&self.conns, &self.state);
            let stopped = cancellable(&self.cancel, conns, async {
                Ok(measure::stop_fetches(conns, state).await)
            })
            .await;
            if !matches!(stopped, Ok(true)) {
                warn!("some fetch tasks may still be running");
            }
            self.state.tasks = LabelMap::default();
        }
        self.conns.close_all();
        debug!("teardown from phase {}", self.phase);
        self.phase = Phase::TornDown;
    }

    /// Setup, run and teardown.  Teardown happens whatever the outcome.
    pub async fn execute(mut self) -> Result<ThroughputResult, BenchmarkError> {
        let outcome = match self.setup().await {
            Ok(()) => self.run().await,
            Err(e) => Err(e),
        };
        self.teardown().await;
        outcome
    }
}
