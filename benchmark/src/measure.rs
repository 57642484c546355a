// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Starting, sampling and stopping fetch tasks, and reducing their counters to throughput.

use crate::connections::Connections;
use crate::error::{BenchmarkError, MeasureError};
use crate::label::Label;
use crate::state::RunState;
use crate::workload::DirectionTasks;
use control::ids::TaskId;
use control::trafficgen::FetchCounters;
use futures::future::{join_all, try_join_all};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

/// Counters of one flow at one point in time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FlowSample {
    /// The consuming endpoint running the task.
    pub label: Label,
    pub task: TaskId,
    pub counters: FetchCounters,
}

/// Counters of every running flow, sampled together.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Snapshot {
    pub flows: Vec<FlowSample>,
}

impl Snapshot {
    fn find(&self, label: Label, task: &TaskId) -> Option<&FetchCounters> {
        self.flows
            .iter()
            .find(|f| f.label == label && &f.task == task)
            .map(|f| &f.counters)
    }
}

/// The outcome of one measured run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThroughputResult {
    /// Average measurement window over all flows, in seconds.
    pub duration: f64,
    /// Data packets received by all flows within their windows.
    pub packets: u64,
    /// Packets per second.
    pub pps: f64,
    /// Payload bits per second.
    pub bps: f64,
    /// Whether the forwarder's dispatch table mapped two shards to one index.
    pub ndt_duplicate: bool,
}

/// Start the fetch tasks of every direction concurrently.
///
/// Each direction reports separately, in plan order, so the tasks of directions that started
/// can be stopped when another one failed.
#[instrument(level = "debug", skip_all)]
pub async fn start_fetches(
    conns: &Connections,
    state: &RunState,
    plan: &[DirectionTasks],
) -> Vec<Result<(Label, Vec<TaskId>), BenchmarkError>> {
    join_all(plan.iter().map(|d| async move {
        let consumer = d.direction.consumer;
        let fetcher = state.fetcher(consumer)?;
        let ids = conns
            .generator(consumer)
            .start_fetch(fetcher, &d.tasks)
            .await?;
        debug!("{}: started {} fetch tasks", d.direction, ids.len());
        Ok::<_, BenchmarkError>((consumer, ids))
    }))
    .await
}

/// Sample the counters of every running task concurrently.
#[instrument(level = "debug", skip_all)]
pub async fn sample(conns: &Connections, state: &RunState) -> Result<Snapshot, BenchmarkError> {
    let running = state.tasks.iter().filter(|(_, tasks)| !tasks.is_empty());
    let per_label = try_join_all(running.map(|(label, tasks)| async move {
        let counters = conns.generator(label).get_fetch_progress(tasks).await?;
        if counters.len() != tasks.len() {
            return Err(BenchmarkError::from(MeasureError::CounterCount {
                label,
                expected: tasks.len(),
                got: counters.len(),
            }));
        }
        Ok::<_, BenchmarkError>(
            tasks
                .iter()
                .zip(counters)
                .map(|(task, counters)| FlowSample {
                    label,
                    task: task.clone(),
                    counters,
                })
                .collect::<Vec<_>>(),
        )
    }))
    .await?;
    Ok(Snapshot {
        flows: per_label.into_iter().flatten().collect(),
    })
}

/// Stop every running task, concurrently and best-effort: failures are logged.
///
/// Returns whether all endpoints confirmed.
#[instrument(level = "debug", skip_all)]
pub async fn stop_fetches(conns: &Connections, state: &RunState) -> bool {
    let running = state.tasks.iter().filter(|(_, tasks)| !tasks.is_empty());
    let outcomes = join_all(running.map(|(label, tasks)| async move {
        let outcome = conns.generator(label).stop_fetch(tasks).await;
        if let Err(e) = &outcome {
            warn!("failed to stop fetch tasks on {label}: {e}");
        }
        outcome
    }))
    .await;
    outcomes.iter().all(Result::is_ok)
}

/// Reduce two snapshots to throughput.
///
/// Every flow of `after` is paired with the same task in `before`; without a `before`
/// snapshot counters start from zero.  Per flow, the elapsed time of a finished task is its
/// completion time.
#[allow(clippy::cast_precision_loss)]
pub fn reduce(
    before: Option<&Snapshot>,
    after: &Snapshot,
    payload_len: u32,
) -> Result<ThroughputResult, MeasureError> {
    if after.flows.is_empty() {
        return Err(MeasureError::NoFlows);
    }
    let zero = FetchCounters::default();
    let mut packets: u64 = 0;
    let mut nanos: u128 = 0;
    for flow in &after.flows {
        let base = match before {
            None => &zero,
            Some(before) => {
                before
                    .find(flow.label, &flow.task)
                    .ok_or_else(|| MeasureError::UnmatchedFlow {
                        label: flow.label,
                        task: flow.task.to_string(),
                    })?
            }
        };
        let (end, start) = (flow.counters, base);
        if end.n_rx_data < start.n_rx_data || end.effective_elapsed() < start.effective_elapsed() {
            warn!("counters of {} on {} went backwards", flow.task, flow.label);
        }
        packets += end.n_rx_data.saturating_sub(start.n_rx_data);
        nanos += u128::from(
            end.effective_elapsed()
                .saturating_sub(start.effective_elapsed()),
        );
    }
    let duration = nanos as f64 / 1e9 / after.flows.len() as f64;
    if duration <= 0.0 {
        return Err(MeasureError::ZeroElapsed);
    }
    let pps = packets as f64 / duration;
    Ok(ThroughputResult {
        duration,
        packets,
        pps,
        bps: pps * f64::from(payload_len) * 8.0,
        ndt_duplicate: false,
    })
}
