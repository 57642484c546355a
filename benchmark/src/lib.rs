// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Forwarder throughput benchmark.
//!
//! A [`Benchmark`] drives one forwarder and two traffic generator endpoints (`A` and `B`)
//! through their control planes: it activates all nodes, connects the generators to the
//! forwarder, runs a timed fetch workload and reduces the fetchers' counters to a
//! [`ThroughputResult`].

#![deny(
    unsafe_code,
    clippy::all,
    clippy::pedantic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic
)]
#![allow(clippy::missing_errors_doc, clippy::module_name_repetitions)]

pub mod alloc;
pub mod benchmark;
pub mod connections;
pub mod env;
pub mod error;
pub mod label;
pub mod locator;
pub mod measure;
pub mod options;
pub mod orchestrator;
pub mod plan;
pub mod readiness;
pub mod state;
pub mod workload;

pub use benchmark::{Benchmark, Phase};
pub use connections::Connections;
pub use env::{ForwarderEnv, GenEnv, ServerEnv};
pub use error::{AllocError, BenchmarkError, ConfigError, MeasureError};
pub use label::{Label, LabelMap};
pub use measure::ThroughputResult;
pub use options::{BenchmarkOptions, DataMatch, FaceScheme, ProducerKind, TrafficDir};
