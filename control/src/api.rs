// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The control-plane operations a benchmark needs from remote nodes.

use crate::activate::ActivationPlan;
use crate::error::ControlError;
use crate::ids::{FaceId, FetcherId, NdtIndex, PortId, TaskId};
use crate::locator::FaceLocator;
use crate::name::Name;
use crate::trafficgen::{FetchCounters, FetchTaskDef, TrafficGenConfig, TrafficGenStarted};
use async_trait::async_trait;
use net::pci::PciAddress;

/// Operations common to every node.
#[async_trait]
pub trait Control: Send + Sync {
    /// A human readable description of the connection, used in logs.
    fn endpoint(&self) -> &str;

    /// Clear all prior activation state on the node.
    async fn restart(&self) -> Result<(), ControlError>;

    /// Apply core, memory and queue sizing.  The node must be freshly restarted.
    async fn activate(&self, plan: &ActivationPlan) -> Result<(), ControlError>;

    /// Register a physical Ethernet port.
    async fn create_eth_port(&self, address: &PciAddress) -> Result<PortId, ControlError>;

    /// Release the connection.
    ///
    /// Calls in flight fail with [`ControlError::Closed`], as do all later calls.
    /// Closing twice is harmless.
    fn close(&self);
}

/// Operations on a forwarder.
#[async_trait]
pub trait FwControl: Control {
    async fn create_face(&self, locator: &FaceLocator) -> Result<FaceId, ControlError>;

    async fn insert_fib_entry(&self, name: &Name, nexthop: &FaceId) -> Result<(), ControlError>;

    /// Register `name` in the name dispatch table with the suggested partition `value`.
    ///
    /// Returns the dispatch table index the name hashes into.
    async fn update_ndt(&self, name: &Name, value: u8) -> Result<NdtIndex, ControlError>;
}

/// Operations on a traffic generator.
#[async_trait]
pub trait GenControl: Control {
    /// Create the face and start the producer (if any) and the fetcher on it.
    async fn start_traffic_gen(
        &self,
        config: &TrafficGenConfig,
    ) -> Result<TrafficGenStarted, ControlError>;

    /// Start one fetch task per definition, returning task ids in the same order.
    async fn start_fetch(
        &self,
        fetcher: &FetcherId,
        tasks: &[FetchTaskDef],
    ) -> Result<Vec<TaskId>, ControlError>;

    /// Read counters of each task, in the same order as `tasks`.
    async fn get_fetch_progress(&self, tasks: &[TaskId])
    -> Result<Vec<FetchCounters>, ControlError>;

    async fn stop_fetch(&self, tasks: &[TaskId]) -> Result<(), ControlError>;
}
