// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Benchmark errors.

use crate::benchmark::Phase;
use crate::label::Label;
use control::ControlError;

/// Not enough cores for a node's resource plan.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AllocError {
    #[error("{requested} cores requested but only {available} available")]
    Insufficient { requested: usize, available: usize },
    #[error("role {0} requested twice")]
    DuplicateRole(String),
}

/// Problems with options or environment, detected before any remote call where possible.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("{node}: {source}")]
    Alloc {
        node: &'static str,
        #[source]
        source: AllocError,
    },
    #[error("face {0} needs at least one receive queue")]
    NoRxQueues(Label),
    #[error("at least one forwarding shard is required")]
    NoShards,
    #[error("{0} forwarding shards exceed the dispatch table value range")]
    TooManyShards(usize),
    #[error("flow count {count} out of range 1..={max}")]
    FlowCount { count: usize, max: usize },
    #[error("interest name length {0} is below the minimum of 4")]
    NameTooShort(usize),
    #[error("producer thread count must be positive")]
    NoProducerThreads,
    #[error("payload length must be positive")]
    NoPayload,
    #[error("measurement duration must be positive")]
    NoDuration,
    #[error("file version {version:#x} of flow {flow} does not exceed 0xFFFFFFFF")]
    VersionBound { version: u64, flow: usize },
}

/// Problems reducing counters to a throughput figure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MeasureError {
    #[error("no flows were measured")]
    NoFlows,
    #[error("flow {task} on {label} has no matching baseline sample")]
    UnmatchedFlow { label: Label, task: String },
    #[error("{label} returned {got} counter sets for {expected} tasks")]
    CounterCount {
        label: Label,
        expected: usize,
        got: usize,
    },
    #[error("average elapsed time is zero")]
    ZeroElapsed,
}

#[derive(Debug, thiserror::Error)]
pub enum BenchmarkError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("control plane error: {0}")]
    Control(#[from] ControlError),
    #[error("measurement error: {0}")]
    Measure(#[from] MeasureError),
    #[error("{operation} is not allowed in phase {phase}")]
    Phase {
        operation: &'static str,
        phase: Phase,
    },
    #[error("forwarder face for {0} was never created")]
    FaceUnavailable(Label),
    #[error("no {what} recorded for {label}")]
    MissingState { what: &'static str, label: Label },
    #[error("benchmark cancelled")]
    Cancelled,
}
