// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! An in-memory node implementing every control-plane trait.
//!
//! A [`FakeNode`] records each call it receives and answers from a small script, which lets the
//! benchmark be driven end to end without any remote process.

use crate::activate::ActivationPlan;
use crate::api::{Control, FwControl, GenControl};
use crate::error::ControlError;
use crate::ids::{FaceId, FetcherId, NdtIndex, PortId, TaskId};
use crate::locator::FaceLocator;
use crate::name::Name;
use crate::trafficgen::{FetchCounters, FetchTaskDef, TrafficGenConfig, TrafficGenStarted};
use async_trait::async_trait;
use net::pci::PciAddress;
use std::collections::{BTreeMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// One recorded control-plane call.
#[derive(Clone, Debug, PartialEq)]
pub enum Call {
    Restart,
    Activate(ActivationPlan),
    CreateEthPort(PciAddress),
    CreateFace(FaceLocator),
    InsertFibEntry(Name, FaceId),
    UpdateNdt(Name, u8),
    StartTrafficGen(TrafficGenConfig),
    StartFetch(FetcherId, Vec<FetchTaskDef>),
    GetFetchProgress(Vec<TaskId>),
    StopFetch(Vec<TaskId>),
}

impl Call {
    /// The operation name used in failure injection and in [`ControlError`]s.
    #[must_use]
    pub fn operation(&self) -> &'static str {
        match self {
            Call::Restart => "restart",
            Call::Activate(_) => "activate",
            Call::CreateEthPort(_) => "createEthPort",
            Call::CreateFace(_) => "createFace",
            Call::InsertFibEntry(..) => "insertFibEntry",
            Call::UpdateNdt(..) => "updateNdt",
            Call::StartTrafficGen(_) => "startTrafficGen",
            Call::StartFetch(..) => "fetch",
            Call::GetFetchProgress(_) => "fetchCounters",
            Call::StopFetch(_) => "delete",
        }
    }
}

/// Produces the counters of the `flow`-th task started on a node at its `sample`-th reading.
pub type CounterScript = Box<dyn Fn(usize, usize) -> FetchCounters + Send + Sync>;

#[derive(Default)]
struct State {
    calls: Vec<Call>,
    ndt_indices: VecDeque<NdtIndex>,
    next_ndt: NdtIndex,
    next_id: u64,
    /// task id -> (flow ordinal on this node, readings so far)
    tasks: BTreeMap<TaskId, (usize, usize)>,
    stopped: Vec<TaskId>,
}

/// A scriptable in-memory node.
pub struct FakeNode {
    name: String,
    state: Mutex<State>,
    counters: CounterScript,
    version_bypass_hi: Option<u32>,
    fail_on: Option<&'static str>,
    latency: Option<Duration>,
    closed: CancellationToken,
}

impl FakeNode {
    /// A node answering every call successfully.
    ///
    /// Dispatch table updates return distinct indices counting up from zero and every fetch
    /// task reports zero counters until [`FakeNode::with_counters`] says otherwise.
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            state: Mutex::new(State::default()),
            counters: Box::new(|_, _| FetchCounters::default()),
            version_bypass_hi: None,
            fail_on: None,
            latency: None,
            closed: CancellationToken::new(),
        }
    }

    /// Answer dispatch table updates with these indices, in call order, before falling back to
    /// counting.
    #[must_use]
    pub fn with_ndt_indices(self, indices: impl IntoIterator<Item = NdtIndex>) -> Self {
        self.lock().ndt_indices = indices.into_iter().collect();
        self
    }

    #[must_use]
    pub fn with_counters(
        mut self,
        script: impl Fn(usize, usize) -> FetchCounters + Send + Sync + 'static,
    ) -> Self {
        self.counters = Box::new(script);
        self
    }

    #[must_use]
    pub fn with_version_bypass_hi(mut self, hi: u32) -> Self {
        self.version_bypass_hi = Some(hi);
        self
    }

    /// Reject every call of the named operation (see [`Call::operation`]).
    #[must_use]
    pub fn failing_on(mut self, operation: &'static str) -> Self {
        self.fail_on = Some(operation);
        self
    }

    /// Delay every answer.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Every call received so far, in arrival order.
    #[must_use]
    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    /// How many calls of the named operation were received.
    #[must_use]
    pub fn count(&self, operation: &str) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|c| c.operation() == operation)
            .count()
    }

    /// Tasks that were started and not yet stopped.
    #[must_use]
    pub fn running_tasks(&self) -> Vec<TaskId> {
        let state = self.lock();
        state
            .tasks
            .keys()
            .filter(|t| !state.stopped.contains(t))
            .cloned()
            .collect()
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }

    fn fresh_id(&self, state: &mut State, kind: &str) -> String {
        state.next_id += 1;
        format!("{}-{kind}-{}", self.name, state.next_id)
    }

    /// Record `call`, then wait out the latency and apply failure injection.
    async fn enter(&self, call: Call) -> Result<(), ControlError> {
        if self.closed.is_cancelled() {
            return Err(ControlError::Closed(self.name.clone()));
        }
        let operation = call.operation();
        self.lock().calls.push(call);
        if let Some(latency) = self.latency {
            tokio::select! {
                () = self.closed.cancelled() => return Err(ControlError::Closed(self.name.clone())),
                () = tokio::time::sleep(latency) => {}
            }
        }
        if self.fail_on == Some(operation) {
            return Err(ControlError::Rejected {
                operation,
                messages: format!("{operation} failure injected on {}", self.name),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl Control for FakeNode {
    fn endpoint(&self) -> &str {
        &self.name
    }

    async fn restart(&self) -> Result<(), ControlError> {
        self.enter(Call::Restart).await
    }

    async fn activate(&self, plan: &ActivationPlan) -> Result<(), ControlError> {
        self.enter(Call::Activate(plan.clone())).await
    }

    async fn create_eth_port(&self, address: &PciAddress) -> Result<PortId, ControlError> {
        self.enter(Call::CreateEthPort(*address)).await?;
        let mut state = self.lock();
        Ok(PortId::from(self.fresh_id(&mut state, "port")))
    }

    fn close(&self) {
        self.closed.cancel();
    }
}

#[async_trait]
impl FwControl for FakeNode {
    async fn create_face(&self, locator: &FaceLocator) -> Result<FaceId, ControlError> {
        self.enter(Call::CreateFace(locator.clone())).await?;
        let mut state = self.lock();
        Ok(FaceId::from(self.fresh_id(&mut state, "face")))
    }

    async fn insert_fib_entry(&self, name: &Name, nexthop: &FaceId) -> Result<(), ControlError> {
        self.enter(Call::InsertFibEntry(name.clone(), nexthop.clone()))
            .await
    }

    async fn update_ndt(&self, name: &Name, value: u8) -> Result<NdtIndex, ControlError> {
        self.enter(Call::UpdateNdt(name.clone(), value)).await?;
        let mut state = self.lock();
        if let Some(index) = state.ndt_indices.pop_front() {
            return Ok(index);
        }
        state.next_ndt += 1;
        Ok(state.next_ndt - 1)
    }
}

#[async_trait]
impl GenControl for FakeNode {
    async fn start_traffic_gen(
        &self,
        config: &TrafficGenConfig,
    ) -> Result<TrafficGenStarted, ControlError> {
        self.enter(Call::StartTrafficGen(config.clone())).await?;
        let mut state = self.lock();
        Ok(TrafficGenStarted {
            fetcher: FetcherId::from(self.fresh_id(&mut state, "fetcher")),
            version_bypass_hi: self.version_bypass_hi,
        })
    }

    async fn start_fetch(
        &self,
        fetcher: &FetcherId,
        tasks: &[FetchTaskDef],
    ) -> Result<Vec<TaskId>, ControlError> {
        self.enter(Call::StartFetch(fetcher.clone(), tasks.to_vec()))
            .await?;
        let mut state = self.lock();
        let mut ids = Vec::with_capacity(tasks.len());
        for _ in tasks {
            let id = TaskId::from(self.fresh_id(&mut state, "task"));
            let flow = state.tasks.len();
            state.tasks.insert(id.clone(), (flow, 0));
            ids.push(id);
        }
        Ok(ids)
    }

    async fn get_fetch_progress(
        &self,
        tasks: &[TaskId],
    ) -> Result<Vec<FetchCounters>, ControlError> {
        self.enter(Call::GetFetchProgress(tasks.to_vec())).await?;
        let mut state = self.lock();
        let mut counters = Vec::with_capacity(tasks.len());
        for task in tasks {
            let Some((flow, sample)) = state.tasks.get_mut(task) else {
                return Err(ControlError::Rejected {
                    operation: "fetchCounters",
                    messages: format!("unknown fetch task {task}"),
                });
            };
            counters.push((self.counters)(*flow, *sample));
            *sample += 1;
        }
        Ok(counters)
    }

    async fn stop_fetch(&self, tasks: &[TaskId]) -> Result<(), ControlError> {
        self.enter(Call::StopFetch(tasks.to_vec())).await?;
        self.lock().stopped.extend_from_slice(tasks);
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn ndt_script_then_count() {
        let node = FakeNode::new("f").with_ndt_indices([7]);
        let name = Name::root().push('A').push(0);
        assert_eq!(node.update_ndt(&name, 3).await.unwrap(), 7);
        assert_eq!(node.update_ndt(&name, 3).await.unwrap(), 0);
        assert_eq!(node.update_ndt(&name, 3).await.unwrap(), 1);
        assert_eq!(node.count("updateNdt"), 3);
    }

    #[tokio::test]
    async fn counters_follow_flow_and_sample() {
        let node = FakeNode::new("a").with_counters(|flow, sample| FetchCounters {
            elapsed: 1000 * (sample as u64 + 1),
            finished: None,
            n_rx_data: (flow as u64 + 1) * (sample as u64 + 1),
        });
        let task = FetchTaskDef {
            prefix: Name::root().push('B'),
            can_be_prefix: false,
            must_be_fresh: true,
            segment_end: None,
        };
        let ids = node
            .start_fetch(&FetcherId::from("x"), &[task.clone(), task])
            .await
            .unwrap();
        let first = node.get_fetch_progress(&ids).await.unwrap();
        let second = node.get_fetch_progress(&ids).await.unwrap();
        assert_eq!(first[1].n_rx_data, 2);
        assert_eq!(second[1].n_rx_data, 4);
        assert_eq!(second[0].elapsed, 2000);

        node.stop_fetch(&ids[..1]).await.unwrap();
        assert_eq!(node.running_tasks(), vec![ids[1].clone()]);
    }

    #[tokio::test]
    async fn injected_failure_and_close() {
        let node = FakeNode::new("f").failing_on("restart");
        assert!(matches!(
            node.restart().await,
            Err(ControlError::Rejected { operation: "restart", .. })
        ));
        node.close();
        assert!(node.is_closed());
        assert!(matches!(
            node.create_eth_port(&"04:00.0".parse().unwrap()).await,
            Err(ControlError::Closed(_))
        ));
    }
}
