// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! VXLAN tunnel identifiers.

mod vni;

pub use vni::{InvalidVni, Vni};
