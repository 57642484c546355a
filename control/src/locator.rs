// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Face locators.
//!
//! A locator describes the transport of a face.  It is serialized with an explicit `scheme`
//! discriminant; the VXLAN locator embeds the Ethernet locator and adds the tunnel fields.

use crate::ids::PortId;
use net::eth::Mac;
use net::vlan::Vlan;
use net::vxlan::Vni;
use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;

/// A face locator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "scheme", rename_all = "lowercase")]
pub enum FaceLocator {
    Ether(EtherLocator),
    Vxlan(VxlanLocator),
    Memif(MemifLocator),
}

impl FaceLocator {
    /// The name of the transport scheme.
    #[must_use]
    pub fn scheme(&self) -> &'static str {
        match self {
            FaceLocator::Ether(_) => "ether",
            FaceLocator::Vxlan(_) => "vxlan",
            FaceLocator::Memif(_) => "memif",
        }
    }

    /// The Ethernet part of the locator, if the transport runs over an Ethernet port.
    #[must_use]
    pub fn ether(&self) -> Option<&EtherLocator> {
        match self {
            FaceLocator::Ether(ether) => Some(ether),
            FaceLocator::Vxlan(vxlan) => Some(&vxlan.ether),
            FaceLocator::Memif(_) => None,
        }
    }
}

/// Ethernet face on a registered port.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EtherLocator {
    pub port: PortId,
    pub n_rx_queues: u16,
    pub local: Mac,
    pub remote: Mac,
    /// `None` is an untagged face; the field is then omitted entirely.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vlan: Option<Vlan>,
}

/// VXLAN tunnel face: an Ethernet locator plus the tunnel endpoint fields.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VxlanLocator {
    #[serde(flatten)]
    pub ether: EtherLocator,
    #[serde(rename = "localIP")]
    pub local_ip: Ipv4Addr,
    #[serde(rename = "remoteIP")]
    pub remote_ip: Ipv4Addr,
    pub vxlan: Vni,
    pub inner_local: Mac,
    pub inner_remote: Mac,
}

/// Which side of a shared memory interface a node plays.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemifRole {
    Server,
    Client,
}

/// Shared memory packet interface face.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemifLocator {
    pub role: MemifRole,
    pub socket_name: String,
    pub id: u32,
    pub dataroom: u16,
}
