// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! End to end benchmark runs against in-memory nodes.

#![allow(clippy::unwrap_used, clippy::float_cmp, clippy::cast_possible_truncation)]

use control::api::{FwControl, GenControl};
use control::error::ControlError;
use control::fake::{Call, FakeNode};
use control::ids::LCoreId;
use control::trafficgen::{FetchCounters, FetchTaskDef, ProducerConfig};
use ndnbench_benchmark::{
    Benchmark, BenchmarkError, BenchmarkOptions, ConfigError, Connections, ForwarderEnv, GenEnv,
    Label, LabelMap, Phase, ProducerKind, ServerEnv, TrafficDir,
};
use net::port::PortSpec;
use pretty_assertions::assert_eq;
use std::ops::Range;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing_test::traced_test;

const SECOND: u64 = 1_000_000_000;

fn cores(range: Range<u32>) -> Vec<LCoreId> {
    range.map(LCoreId).collect()
}

fn port(text: &str) -> PortSpec {
    text.parse().unwrap()
}

fn generator(url: &str, pci: &str) -> GenEnv {
    GenEnv {
        gql_server: url.into(),
        port: port(pci),
        cores_primary: cores(0..4),
        cores_secondary: cores(4..5),
        fileserver_path: "/srv/ndn".into(),
    }
}

fn server_env(shared: bool) -> ServerEnv {
    let b_url = if shared {
        "http://gen-a:3030/"
    } else {
        "http://gen-b:3030/"
    };
    ServerEnv {
        forwarder: ForwarderEnv {
            gql_server: "http://fw:3030/".into(),
            ports: LabelMap::new(port("04:00.0"), port("04:00.1")),
            cores_primary: cores(0..16),
            cores_secondary: cores(16..18),
        },
        generators: LabelMap::new(
            generator("http://gen-a:3030/", "05:00.0"),
            generator(b_url, "06:00.0"),
        ),
    }
}

/// Each reading of a task adds one second and 1000 Data.
fn steady(_flow: usize, sample: usize) -> FetchCounters {
    let n = sample as u64 + 1;
    FetchCounters {
        elapsed: n * SECOND,
        finished: None,
        n_rx_data: n * 1000,
    }
}

struct Nodes {
    fw: Arc<FakeNode>,
    a: Arc<FakeNode>,
    b: Arc<FakeNode>,
}

impl Nodes {
    fn new() -> Self {
        Self::with(
            FakeNode::new("fw"),
            FakeNode::new("a").with_counters(steady),
            FakeNode::new("b").with_counters(steady),
        )
    }

    fn with(fw: FakeNode, a: FakeNode, b: FakeNode) -> Self {
        Self {
            fw: Arc::new(fw),
            a: Arc::new(a),
            b: Arc::new(b),
        }
    }

    fn connections(&self, env: &ServerEnv) -> Connections {
        let mut generators = [Arc::clone(&self.a), Arc::clone(&self.b)].into_iter();
        Connections::new(env, Arc::clone(&self.fw) as Arc<dyn FwControl>, |url| {
            generators
                .next()
                .map(|node| node as Arc<dyn GenControl>)
                .ok_or_else(|| ControlError::InvalidEndpoint(url.to_owned()))
        })
        .unwrap()
    }

    fn benchmark(&self, opts: BenchmarkOptions) -> Benchmark {
        let env = server_env(false);
        let conns = self.connections(&env);
        Benchmark::new(env, opts, conns, CancellationToken::new()).unwrap()
    }

    fn all(&self) -> [&FakeNode; 3] {
        [self.fw.as_ref(), self.a.as_ref(), self.b.as_ref()]
    }
}

fn fetch_tasks(node: &FakeNode) -> Vec<FetchTaskDef> {
    node.calls()
        .into_iter()
        .filter_map(|call| match call {
            Call::StartFetch(_, tasks) => Some(tasks),
            _ => None,
        })
        .flatten()
        .collect()
}

fn producer(node: &FakeNode) -> Option<ProducerConfig> {
    node.calls().into_iter().find_map(|call| match call {
        Call::StartTrafficGen(config) => Some(config.producer),
        _ => None,
    })?
}

#[tokio::test(start_paused = true)]
#[traced_test]
async fn bidirectional_two_shards_without_warmup() {
    let nodes = Nodes::new();
    let mut benchmark = nodes.benchmark(BenchmarkOptions {
        n_fwds: 2,
        n_flows: 2,
        warmup: 0,
        duration: 10,
        ..BenchmarkOptions::default()
    });

    benchmark.setup().await.unwrap();
    assert_eq!(benchmark.phase(), Phase::GeneratorsActive);
    assert_eq!(nodes.fw.count("restart"), 1);
    assert_eq!(nodes.fw.count("createEthPort"), 2);
    assert_eq!(nodes.fw.count("createFace"), 2);
    assert_eq!(nodes.fw.count("insertFibEntry"), 4);
    assert_eq!(nodes.fw.count("updateNdt"), 4);
    for generator in [&nodes.a, &nodes.b] {
        assert_eq!(generator.count("restart"), 1);
        assert_eq!(generator.count("activate"), 1);
        assert_eq!(generator.count("startTrafficGen"), 1);
    }
    assert!(benchmark.state().fetchers[Label::B].is_some());

    let result = benchmark.run().await.unwrap();
    assert_eq!(benchmark.phase(), Phase::Measured);
    // without warmup every task is read once, and counted from zero
    assert_eq!(nodes.a.count("fetchCounters"), 1);
    assert_eq!(nodes.b.count("fetchCounters"), 1);
    assert_eq!(result.packets, 4000);
    assert_eq!(result.duration, 1.0);
    assert_eq!(result.pps, 4000.0);
    assert_eq!(result.bps, 32_000_000.0);
    assert!(!result.ndt_duplicate);

    // B fetches what A produces, one flow per shard
    let names: Vec<_> = fetch_tasks(&nodes.b)
        .iter()
        .map(|t| t.prefix.to_string())
        .collect();
    assert_eq!(names.len(), 2);
    assert!(names[0].starts_with("/A/0/"), "{names:?}");
    assert!(names[1].starts_with("/A/1/"), "{names:?}");
    assert!(nodes.a.running_tasks().is_empty());
    assert!(nodes.b.running_tasks().is_empty());

    benchmark.teardown().await;
    assert_eq!(benchmark.phase(), Phase::TornDown);
    assert!(nodes.all().iter().all(|n| n.is_closed()));
    assert!(logs_contain("setup complete"));
}

#[tokio::test(start_paused = true)]
async fn warmup_sample_is_the_baseline() {
    let nodes = Nodes::new();
    let result = nodes
        .benchmark(BenchmarkOptions {
            n_fwds: 2,
            n_flows: 2,
            payload_len: 100,
            warmup: 5,
            duration: 10,
            ..BenchmarkOptions::default()
        })
        .execute()
        .await
        .unwrap();
    assert_eq!(nodes.a.count("fetchCounters"), 2);
    // one reading apart: one second and 1000 Data per flow
    assert_eq!(result.packets, 4000);
    assert_eq!(result.duration, 1.0);
    assert_eq!(result.bps, 4000.0 * 100.0 * 8.0);
    assert!(nodes.fw.is_closed());
}

#[tokio::test(start_paused = true)]
async fn dispatch_table_collisions() {
    for (indices, duplicate) in [([0, 1, 0, 3], true), ([0, 1, 2, 3], false)] {
        let nodes = Nodes::with(
            FakeNode::new("fw").with_ndt_indices(indices),
            FakeNode::new("a").with_counters(steady),
            FakeNode::new("b").with_counters(steady),
        );
        let mut benchmark = nodes.benchmark(BenchmarkOptions {
            n_fwds: 2,
            n_flows: 2,
            warmup: 0,
            duration: 1,
            ..BenchmarkOptions::default()
        });
        benchmark.setup().await.unwrap();
        assert_eq!(benchmark.state().ndt_duplicate, duplicate);
        let result = benchmark.run().await.unwrap();
        assert_eq!(result.ndt_duplicate, duplicate);
    }
}

#[tokio::test(start_paused = true)]
async fn fileserver_versions_carry_the_seed() {
    let nodes = Nodes::with(
        FakeNode::new("fw"),
        FakeNode::new("a").with_version_bypass_hi(5),
        FakeNode::new("b").with_counters(steady),
    );
    let result = nodes
        .benchmark(BenchmarkOptions {
            traffic_dir: TrafficDir::Unidirectional,
            producer_kind: ProducerKind::FileServer,
            n_fwds: 2,
            n_flows: 3,
            warmup: 0,
            duration: 1,
            ..BenchmarkOptions::default()
        })
        .execute()
        .await
        .unwrap();
    assert_eq!(result.packets, 3000);

    assert!(matches!(producer(&nodes.a), Some(ProducerConfig::FileServer(_))));
    assert_eq!(producer(&nodes.b), None);
    assert!(fetch_tasks(&nodes.a).is_empty());
    let tasks = fetch_tasks(&nodes.b);
    assert_eq!(tasks.len(), 3);
    for (flow, task) in tasks.iter().enumerate() {
        let name = task.prefix.to_string();
        let version = name.rsplit('/').next().unwrap();
        assert!(version.starts_with("54=%00%00%00%05"), "{name}");
        assert!(version.ends_with(&format!("%{flow:02X}")), "{name}");
        assert!(!task.can_be_prefix && !task.must_be_fresh);
    }
}

#[tokio::test(start_paused = true)]
async fn fileserver_without_seed_is_rejected_before_fetching() {
    let nodes = Nodes::new();
    let mut benchmark = nodes.benchmark(BenchmarkOptions {
        producer_kind: ProducerKind::FileServer,
        ..BenchmarkOptions::default()
    });
    benchmark.setup().await.unwrap();
    assert!(matches!(
        benchmark.run().await,
        Err(BenchmarkError::Config(ConfigError::VersionBound { .. }))
    ));
    assert_eq!(benchmark.phase(), Phase::GeneratorsActive);
    assert_eq!(nodes.a.count("fetch") + nodes.b.count("fetch"), 0);
}

#[tokio::test(start_paused = true)]
async fn shared_generator_is_activated_once() {
    let env = server_env(true);
    let nodes = Nodes::new();
    let mut connects = 0;
    let shared = Arc::clone(&nodes.a);
    let conns = Connections::new(&env, Arc::clone(&nodes.fw) as Arc<dyn FwControl>, |_| {
        connects += 1;
        Ok(Arc::clone(&shared) as Arc<dyn GenControl>)
    })
    .unwrap();
    assert_eq!(connects, 1);
    assert!(conns.shared());

    let opts = BenchmarkOptions {
        n_fwds: 1,
        n_flows: 2,
        warmup: 0,
        duration: 1,
        ..BenchmarkOptions::default()
    };
    let result = Benchmark::new(env, opts, conns, CancellationToken::new())
        .unwrap()
        .execute()
        .await
        .unwrap();
    assert_eq!(nodes.a.count("restart"), 1);
    assert_eq!(nodes.a.count("activate"), 1);
    assert_eq!(nodes.a.count("startTrafficGen"), 2);
    assert_eq!(nodes.a.count("fetch"), 2);
    assert!(nodes.b.calls().is_empty());
    assert_eq!(result.packets, 4000);
}

#[tokio::test(start_paused = true)]
#[traced_test]
async fn cancellation_closes_every_node() {
    let nodes = Nodes::with(
        FakeNode::new("fw").with_latency(Duration::from_secs(60)),
        FakeNode::new("a"),
        FakeNode::new("b"),
    );
    let env = server_env(false);
    let conns = nodes.connections(&env);
    let cancel = CancellationToken::new();
    let mut benchmark =
        Benchmark::new(env, BenchmarkOptions::default(), conns, cancel.clone()).unwrap();

    let canceller = async {
        tokio::time::sleep(Duration::from_secs(10)).await;
        cancel.cancel();
    };
    let (outcome, ()) = tokio::join!(benchmark.setup(), canceller);
    assert!(matches!(outcome, Err(BenchmarkError::Cancelled)));
    assert_eq!(benchmark.phase(), Phase::Constructed);
    assert!(nodes.all().iter().all(|n| n.is_closed()));
    // generators never got a face to connect to
    assert_eq!(nodes.a.count("startTrafficGen"), 0);
    assert!(logs_contain("benchmark cancelled"));

    benchmark.teardown().await;
    assert_eq!(benchmark.phase(), Phase::TornDown);
}

#[tokio::test(start_paused = true)]
async fn cancellation_during_measurement_stops_nothing_remotely() {
    let nodes = Nodes::new();
    let env = server_env(false);
    let conns = nodes.connections(&env);
    let cancel = CancellationToken::new();
    let mut benchmark = Benchmark::new(
        env,
        BenchmarkOptions {
            n_flows: 1,
            ..BenchmarkOptions::default()
        },
        conns,
        cancel.clone(),
    )
    .unwrap();
    benchmark.setup().await.unwrap();

    let canceller = async {
        tokio::time::sleep(Duration::from_secs(2)).await;
        cancel.cancel();
    };
    let (outcome, ()) = tokio::join!(benchmark.run(), canceller);
    assert!(matches!(outcome, Err(BenchmarkError::Cancelled)));
    assert_eq!(benchmark.phase(), Phase::WorkloadRunning);
    assert!(benchmark.state().has_tasks());
    benchmark.teardown().await;
    assert!(nodes.all().iter().all(|n| n.is_closed()));
    assert_eq!(nodes.b.count("delete"), 0);
}

#[tokio::test]
async fn invalid_configuration_makes_no_calls() {
    let nodes = Nodes::new();
    let env = server_env(false);
    let opts = BenchmarkOptions {
        n_flows: 0,
        ..BenchmarkOptions::default()
    };
    let conns = nodes.connections(&env);
    assert!(matches!(
        Benchmark::new(env.clone(), opts, conns, CancellationToken::new()),
        Err(BenchmarkError::Config(ConfigError::FlowCount { count: 0, .. }))
    ));

    let mut starved = env;
    starved.forwarder.cores_primary = cores(0..3);
    let conns = nodes.connections(&server_env(false));
    assert!(matches!(
        Benchmark::new(
            starved,
            BenchmarkOptions::default(),
            conns,
            CancellationToken::new()
        ),
        Err(BenchmarkError::Config(ConfigError::Alloc {
            node: "forwarder",
            ..
        }))
    ));
    assert!(nodes.all().iter().all(|n| n.calls().is_empty()));
}

#[tokio::test(start_paused = true)]
async fn phases_only_move_forward() {
    let nodes = Nodes::new();
    let mut benchmark = nodes.benchmark(BenchmarkOptions {
        n_flows: 1,
        warmup: 0,
        duration: 1,
        ..BenchmarkOptions::default()
    });
    assert!(matches!(
        benchmark.run().await,
        Err(BenchmarkError::Phase {
            operation: "run",
            phase: Phase::Constructed
        })
    ));
    benchmark.setup().await.unwrap();
    assert!(matches!(
        benchmark.setup().await,
        Err(BenchmarkError::Phase {
            operation: "setup",
            phase: Phase::GeneratorsActive
        })
    ));
    benchmark.run().await.unwrap();
    assert!(matches!(
        benchmark.run().await,
        Err(BenchmarkError::Phase {
            phase: Phase::Measured,
            ..
        })
    ));
    benchmark.teardown().await;
    benchmark.teardown().await;
    assert_eq!(benchmark.phase(), Phase::TornDown);
}

#[tokio::test(start_paused = true)]
async fn forwarder_failure_releases_waiting_generators() {
    let nodes = Nodes::with(
        FakeNode::new("fw").failing_on("createFace"),
        FakeNode::new("a"),
        FakeNode::new("b"),
    );
    let mut benchmark = nodes.benchmark(BenchmarkOptions::default());
    let outcome = benchmark.setup().await;
    assert!(matches!(
        outcome,
        Err(BenchmarkError::Control(ControlError::Rejected {
            operation: "createFace",
            ..
        }))
    ));
    assert_eq!(benchmark.phase(), Phase::Constructed);
    assert_eq!(nodes.a.count("activate"), 1);
    assert_eq!(nodes.a.count("startTrafficGen"), 0);
}

#[tokio::test(start_paused = true)]
async fn generator_failure_after_forwarder_success() {
    let nodes = Nodes::with(
        FakeNode::new("fw"),
        FakeNode::new("a"),
        FakeNode::new("b").failing_on("startTrafficGen"),
    );
    let mut benchmark = nodes.benchmark(BenchmarkOptions::default());
    assert!(matches!(
        benchmark.setup().await,
        Err(BenchmarkError::Control(ControlError::Rejected {
            operation: "startTrafficGen",
            ..
        }))
    ));
    assert_eq!(benchmark.phase(), Phase::ForwarderActive);
    assert!(benchmark.state().faces[Label::A].is_some());
}

#[tokio::test(start_paused = true)]
async fn generators_start_after_forwarder_activation() {
    let nodes = Nodes::with(
        FakeNode::new("fw").with_latency(Duration::from_secs(1)),
        FakeNode::new("a"),
        FakeNode::new("b"),
    );
    let n_fwds = 4;
    let mut benchmark = nodes.benchmark(BenchmarkOptions {
        n_fwds,
        ..BenchmarkOptions::default()
    });
    let watch = async {
        loop {
            tokio::time::sleep(Duration::from_millis(10)).await;
            if nodes.a.count("startTrafficGen") + nodes.b.count("startTrafficGen") > 0 {
                return (nodes.fw.count("createFace"), nodes.fw.count("insertFibEntry"));
            }
        }
    };
    let (outcome, (faces, fib_entries)) = tokio::join!(benchmark.setup(), watch);
    outcome.unwrap();
    assert_eq!(faces, 2);
    assert_eq!(fib_entries, 2 * n_fwds);
}

#[tokio::test(start_paused = true)]
async fn late_forwarder_failure_starts_no_generator() {
    let nodes = Nodes::with(
        FakeNode::new("fw").failing_on("updateNdt"),
        FakeNode::new("a"),
        FakeNode::new("b"),
    );
    let mut benchmark = nodes.benchmark(BenchmarkOptions::default());
    assert!(matches!(
        benchmark.setup().await,
        Err(BenchmarkError::Control(ControlError::Rejected {
            operation: "updateNdt",
            ..
        }))
    ));
    assert_eq!(nodes.fw.count("createFace"), 1);
    assert_eq!(nodes.a.count("startTrafficGen"), 0);
    assert_eq!(nodes.b.count("startTrafficGen"), 0);
}

#[tokio::test(start_paused = true)]
async fn tasks_started_before_a_failure_are_stopped() {
    let nodes = Nodes::with(
        FakeNode::new("fw"),
        FakeNode::new("a").failing_on("fetch"),
        FakeNode::new("b").with_counters(steady),
    );
    let mut benchmark = nodes.benchmark(BenchmarkOptions {
        n_fwds: 2,
        n_flows: 2,
        ..BenchmarkOptions::default()
    });
    benchmark.setup().await.unwrap();
    assert!(matches!(
        benchmark.run().await,
        Err(BenchmarkError::Control(ControlError::Rejected {
            operation: "fetch",
            ..
        }))
    ));
    assert_eq!(benchmark.phase(), Phase::GeneratorsActive);
    assert!(benchmark.state().tasks[Label::A].is_empty());
    assert_eq!(benchmark.state().tasks[Label::B].len(), 2);
    assert_eq!(nodes.b.running_tasks().len(), 2);

    benchmark.teardown().await;
    assert_eq!(nodes.b.count("delete"), 1);
    assert!(nodes.b.running_tasks().is_empty());
    assert!(nodes.all().iter().all(|n| n.is_closed()));
}
