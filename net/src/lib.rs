// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Validated network value types used to describe benchmark faces and ports.

#![deny(
    unsafe_code,
    clippy::all,
    clippy::pedantic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic
)]
#![allow(clippy::missing_errors_doc)]

pub mod eth;
pub mod pci;
pub mod port;
pub mod vlan;
pub mod vxlan;
