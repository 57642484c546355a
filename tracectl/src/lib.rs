// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Crate to control tracing dynamically at runtime

#![deny(clippy::all, clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]

pub mod control;
pub mod levels;

// re-exports
pub use control::DEFAULT_DEFAULT_LOGLEVEL;
pub use control::{TraceCtlError, TracingControl, get_trace_ctl};
pub use levels::{TracingLevels, describe_tags};
pub use tracing_subscriber::filter::LevelFilter;
