// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Node activation arguments.

use crate::ids::LCoreId;
use ordermap::OrderMap;
use serde::{Deserialize, Serialize};

/// The role a node is activated for.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeRole {
    Forwarder,
    #[serde(rename = "trafficgen")]
    TrafficGen,
}

impl core::fmt::Display for NodeRole {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            NodeRole::Forwarder => f.write_str("forwarder"),
            NodeRole::TrafficGen => f.write_str("trafficgen"),
        }
    }
}

/// Logical core roles on the forwarder.
///
/// The declaration order is the allocation order: node-side scheduling assumes the receive
/// cores come first, then transmit, then forwarding, then crypto.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LCoreRole {
    Rx,
    Tx,
    Fwd,
    Crypto,
}

/// Role to core assignment, serialized in insertion order.
pub type LCoreAlloc = OrderMap<LCoreRole, Vec<LCoreId>>;

/// Environment abstraction layer parameters.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EalConfig {
    pub cores: Vec<LCoreId>,
    pub lcore_main: LCoreId,
}

/// Packet buffer pool templates.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PoolTemplate {
    Direct,
    Indirect,
    Payload,
}

/// Sizing of one packet buffer pool.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolConfig {
    pub capacity: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dataroom: Option<u16>,
}

impl PoolConfig {
    #[must_use]
    pub const fn new(capacity: u32) -> Self {
        PoolConfig {
            capacity,
            dataroom: None,
        }
    }

    #[must_use]
    pub const fn with_dataroom(capacity: u32, dataroom: u16) -> Self {
        PoolConfig {
            capacity,
            dataroom: Some(dataroom),
        }
    }
}

pub type MempoolConfig = OrderMap<PoolTemplate, PoolConfig>;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NdtConfig {
    pub prefix_len: u8,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FibConfig {
    pub start_depth: u8,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PcctConfig {
    pub pcct_capacity: u32,
    pub cs_memory_capacity: u32,
    pub cs_indirect_capacity: u32,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueConfig {
    pub dequeue_burst_size: u16,
}

/// Forwarder activation arguments.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivateFwArgs {
    pub eal: EalConfig,
    pub lcore_alloc: LCoreAlloc,
    pub mempool: MempoolConfig,
    pub ndt: NdtConfig,
    pub fib: FibConfig,
    pub pcct: PcctConfig,
    pub fwd_interest_queue: QueueConfig,
    pub fwd_data_queue: QueueConfig,
    pub fwd_nack_queue: QueueConfig,
}

/// Traffic generator activation arguments.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivateGenArgs {
    pub eal: EalConfig,
    pub mempool: MempoolConfig,
}

/// A complete activation request for either role.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ActivationPlan {
    Forwarder(Box<ActivateFwArgs>),
    TrafficGen(ActivateGenArgs),
}

impl ActivationPlan {
    #[must_use]
    pub fn role(&self) -> NodeRole {
        match self {
            ActivationPlan::Forwarder(_) => NodeRole::Forwarder,
            ActivationPlan::TrafficGen(_) => NodeRole::TrafficGen,
        }
    }

    /// The activation arguments as a JSON value.
    ///
    /// # Errors
    ///
    /// Fails only if a map key does not serialize as a string, which none of ours do.
    pub fn to_json(&self) -> Result<serde_json::Value, serde_json::Error> {
        match self {
            ActivationPlan::Forwarder(args) => serde_json::to_value(args),
            ActivationPlan::TrafficGen(args) => serde_json::to_value(args),
        }
    }
}
