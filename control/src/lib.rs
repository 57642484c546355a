// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Control-plane access to forwarder and traffic generator nodes.
//!
//! [`api`] defines what the benchmark needs from a node, [`gql`] implements it over GraphQL and,
//! with the `testing` feature, [`fake`] implements it in memory.

#![deny(
    unsafe_code,
    clippy::all,
    clippy::pedantic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic
)]
#![allow(clippy::missing_errors_doc, clippy::module_name_repetitions)]

pub mod activate;
pub mod api;
pub mod error;
#[cfg(any(test, feature = "testing"))]
pub mod fake;
pub mod gql;
pub mod ids;
pub mod locator;
pub mod name;
pub mod trafficgen;

pub use api::{Control, FwControl, GenControl};
pub use error::ControlError;
pub use gql::{GqlControl, GqlOptions};
pub use name::Name;
