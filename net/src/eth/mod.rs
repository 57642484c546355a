// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Ethernet addressing.

pub mod mac;

pub use mac::{InvalidMac, Mac};
