// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Control-plane client speaking GraphQL over HTTP.

use crate::activate::{ActivationPlan, NodeRole};
use crate::api::{Control, FwControl, GenControl};
use crate::error::ControlError;
use crate::ids::{FaceId, FetcherId, NdtIndex, PortId, TaskId};
use crate::locator::FaceLocator;
use crate::name::Name;
use crate::trafficgen::{
    FetchCounters, FetchTaskDef, ProducerConfig, TrafficGenConfig, TrafficGenStarted,
};
use async_trait::async_trait;
use net::pci::PciAddress;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};
use url::Url;

const SHUTDOWN: &str = "mutation shutdown($restart: Boolean) { shutdown(restart: $restart) }";
const VERSION: &str = "query version { version { version } }";
const ACTIVATE_FORWARDER: &str = "mutation activate($arg: JSON!) { activate(forwarder: $arg) }";
const ACTIVATE_TRAFFICGEN: &str = "mutation activate($arg: JSON!) { activate(trafficgen: $arg) }";
const CREATE_ETH_PORT: &str = "mutation createEthPort($driver: EthPortDriverKind, $pciAddr: String) {
  createEthPort(driver: $driver, pciAddr: $pciAddr) { id }
}";
const CREATE_FACE: &str =
    "mutation createFace($locator: JSON!) { createFace(locator: $locator) { id } }";
const INSERT_FIB_ENTRY: &str = "mutation insertFibEntry($name: Name!, $nexthops: [ID!]!) {
  insertFibEntry(name: $name, nexthops: $nexthops) { id }
}";
const UPDATE_NDT: &str =
    "mutation updateNdt($name: Name!, $value: Int!) { updateNdt(name: $name, value: $value) { index } }";
const START_TRAFFIC_GEN: &str = "mutation startTrafficGen($face: JSON!, $producer: JSON, $fileServer: JSON, $fetcher: JSON) {
  startTrafficGen(face: $face, producer: $producer, fileServer: $fileServer, fetcher: $fetcher) {
    id
    fetcher { id }
    fileServer { versionBypassHi }
  }
}";
const FETCH: &str =
    "mutation fetch($fetcher: ID!, $task: JSON!) { fetch(fetcher: $fetcher, task: $task) { id } }";
const FETCH_COUNTERS: &str =
    "query fetchCounters($id: ID!) { node(id: $id) { ... on FetchTaskContext { counters } } }";
const DELETE: &str = "mutation delete($id: ID!) { delete(id: $id) }";

/// Timing knobs of a [`GqlControl`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GqlOptions {
    /// Upper bound on a single request, including reading the response.
    pub request_timeout: Duration,
    /// How long a node may take to answer again after a restart.
    pub restart_timeout: Duration,
    /// Interval between liveness probes while waiting for a restart.
    pub restart_poll: Duration,
}

impl Default for GqlOptions {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(60),
            restart_timeout: Duration::from_secs(60),
            restart_poll: Duration::from_millis(500),
        }
    }
}

#[derive(Deserialize)]
struct GqlMessage {
    message: String,
}

#[derive(Deserialize)]
struct GqlResponse {
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    errors: Vec<GqlMessage>,
}

/// A connection to one node's GraphQL endpoint.
pub struct GqlControl {
    endpoint: Url,
    client: reqwest::Client,
    options: GqlOptions,
    closed: CancellationToken,
}

impl GqlControl {
    /// Create a connection to `endpoint`, e.g. `http://127.0.0.1:3030/`.
    ///
    /// No request is made until the first operation.
    ///
    /// # Errors
    ///
    /// Fails if `endpoint` is not an http(s) URL or the HTTP client cannot be built.
    pub fn new(endpoint: &str, options: GqlOptions) -> Result<Self, ControlError> {
        let url =
            Url::parse(endpoint).map_err(|_| ControlError::InvalidEndpoint(endpoint.to_owned()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ControlError::InvalidEndpoint(endpoint.to_owned()));
        }
        let client = reqwest::Client::builder()
            .timeout(options.request_timeout)
            .build()
            .map_err(|source| ControlError::Http {
                endpoint: endpoint.to_owned(),
                source,
            })?;
        Ok(Self {
            endpoint: url,
            client,
            options,
            closed: CancellationToken::new(),
        })
    }

    fn closed_error(&self) -> ControlError {
        ControlError::Closed(self.endpoint.to_string())
    }

    /// Post one GraphQL operation and return its `data` member.
    async fn execute(
        &self,
        operation: &'static str,
        query: &str,
        variables: Value,
    ) -> Result<Value, ControlError> {
        if self.closed.is_cancelled() {
            return Err(self.closed_error());
        }
        trace!("{operation} -> {}: {variables}", self.endpoint);
        let body = json!({ "query": query, "operationName": operation, "variables": variables });
        let exchange = async {
            let response = self
                .client
                .post(self.endpoint.clone())
                .json(&body)
                .send()
                .await?;
            let status = response.status();
            let bytes = response.bytes().await?;
            Ok::<_, reqwest::Error>((status, bytes))
        };
        let (status, bytes) = tokio::select! {
            () = self.closed.cancelled() => return Err(self.closed_error()),
            reply = exchange => reply.map_err(|source| ControlError::Http {
                endpoint: self.endpoint.to_string(),
                source,
            })?,
        };

        // GraphQL servers may report request errors with a 4xx status and a regular body.
        let reply: GqlResponse = match serde_json::from_slice(&bytes) {
            Ok(reply) => reply,
            Err(_) if !status.is_success() => {
                return Err(ControlError::Status {
                    endpoint: self.endpoint.to_string(),
                    operation,
                    status: status.as_u16(),
                });
            }
            Err(source) => return Err(ControlError::Decode { operation, source }),
        };
        if !reply.errors.is_empty() {
            let messages = reply
                .errors
                .into_iter()
                .map(|e| e.message)
                .collect::<Vec<_>>()
                .join("; ");
            return Err(ControlError::Rejected {
                operation,
                messages,
            });
        }
        if !status.is_success() {
            return Err(ControlError::Status {
                endpoint: self.endpoint.to_string(),
                operation,
                status: status.as_u16(),
            });
        }
        reply.data.ok_or(ControlError::MissingField {
            operation,
            field: "data",
        })
    }

    async fn wait_alive(&self) -> Result<(), ControlError> {
        let probe = async {
            loop {
                tokio::time::sleep(self.options.restart_poll).await;
                match self.execute("version", VERSION, json!({})).await {
                    Ok(_) => return Ok(()),
                    Err(e @ ControlError::Closed(_)) => return Err(e),
                    Err(e) => trace!("{} not up yet: {e}", self.endpoint),
                }
            }
        };
        tokio::time::timeout(self.options.restart_timeout, probe)
            .await
            .map_err(|_| ControlError::RestartTimeout {
                endpoint: self.endpoint.to_string(),
                seconds: self.options.restart_timeout.as_secs(),
            })?
    }
}

/// Extract and decode the value at `pointer` inside a response's `data`.
fn field<T: DeserializeOwned>(
    operation: &'static str,
    data: &Value,
    pointer: &'static str,
) -> Result<T, ControlError> {
    let value = data.pointer(pointer).ok_or(ControlError::MissingField {
        operation,
        field: pointer,
    })?;
    T::deserialize(value).map_err(|source| ControlError::Decode { operation, source })
}

fn to_json<T: serde::Serialize>(operation: &'static str, value: &T) -> Result<Value, ControlError> {
    serde_json::to_value(value).map_err(|source| ControlError::Decode { operation, source })
}

/// Create one fetch task per definition, in order.
///
/// When a creation fails, the tasks created before it are deleted, best-effort, and the error
/// is returned.
async fn create_all<'t, C, CF, D, DF>(
    tasks: &'t [FetchTaskDef],
    create: C,
    delete: D,
) -> Result<Vec<TaskId>, ControlError>
where
    C: Fn(&'t FetchTaskDef) -> CF,
    CF: Future<Output = Result<TaskId, ControlError>>,
    D: FnOnce(Vec<TaskId>) -> DF,
    DF: Future<Output = Result<(), ControlError>>,
{
    let mut ids = Vec::with_capacity(tasks.len());
    for task in tasks {
        match create(task).await {
            Ok(id) => ids.push(id),
            Err(e) => {
                if !ids.is_empty() {
                    let created = ids.len();
                    if let Err(cleanup) = delete(ids).await {
                        warn!("cannot delete {created} fetch tasks after failed start: {cleanup}");
                    }
                }
                return Err(e);
            }
        }
    }
    Ok(ids)
}

#[async_trait]
impl Control for GqlControl {
    fn endpoint(&self) -> &str {
        self.endpoint.as_str()
    }

    async fn restart(&self) -> Result<(), ControlError> {
        debug!("restarting {}", self.endpoint);
        match self
            .execute("shutdown", SHUTDOWN, json!({ "restart": true }))
            .await
        {
            Ok(_) => {}
            // the node may exit before it finishes answering
            Err(ControlError::Http { source, .. }) => {
                debug!("{} dropped the shutdown request: {source}", self.endpoint);
            }
            Err(e) => return Err(e),
        }
        self.wait_alive().await?;
        debug!("{} is back after restart", self.endpoint);
        Ok(())
    }

    async fn activate(&self, plan: &ActivationPlan) -> Result<(), ControlError> {
        let arg = plan
            .to_json()
            .map_err(|source| ControlError::Decode {
                operation: "activate",
                source,
            })?;
        let query = match plan.role() {
            NodeRole::Forwarder => ACTIVATE_FORWARDER,
            NodeRole::TrafficGen => ACTIVATE_TRAFFICGEN,
        };
        debug!("activating {} as {}", self.endpoint, plan.role());
        self.execute("activate", query, json!({ "arg": arg }))
            .await?;
        Ok(())
    }

    async fn create_eth_port(&self, address: &PciAddress) -> Result<PortId, ControlError> {
        const OP: &str = "createEthPort";
        let data = self
            .execute(
                OP,
                CREATE_ETH_PORT,
                json!({ "driver": "PCI", "pciAddr": address.to_string() }),
            )
            .await?;
        field(OP, &data, "/createEthPort/id")
    }

    fn close(&self) {
        if !self.closed.is_cancelled() {
            debug!("closing connection to {}", self.endpoint);
        }
        self.closed.cancel();
    }
}

#[async_trait]
impl FwControl for GqlControl {
    async fn create_face(&self, locator: &FaceLocator) -> Result<FaceId, ControlError> {
        const OP: &str = "createFace";
        let locator = to_json(OP, locator)?;
        let data = self
            .execute(OP, CREATE_FACE, json!({ "locator": locator }))
            .await?;
        field(OP, &data, "/createFace/id")
    }

    async fn insert_fib_entry(&self, name: &Name, nexthop: &FaceId) -> Result<(), ControlError> {
        self.execute(
            "insertFibEntry",
            INSERT_FIB_ENTRY,
            json!({ "name": name, "nexthops": [nexthop] }),
        )
        .await?;
        Ok(())
    }

    async fn update_ndt(&self, name: &Name, value: u8) -> Result<NdtIndex, ControlError> {
        const OP: &str = "updateNdt";
        let data = self
            .execute(OP, UPDATE_NDT, json!({ "name": name, "value": value }))
            .await?;
        field(OP, &data, "/updateNdt/index")
    }
}

#[async_trait]
impl GenControl for GqlControl {
    async fn start_traffic_gen(
        &self,
        config: &TrafficGenConfig,
    ) -> Result<TrafficGenStarted, ControlError> {
        const OP: &str = "startTrafficGen";
        let (producer, file_server) = match &config.producer {
            None => (Value::Null, Value::Null),
            Some(ProducerConfig::PingServer(tgp)) => (to_json(OP, tgp)?, Value::Null),
            Some(ProducerConfig::FileServer(fs)) => (Value::Null, to_json(OP, fs)?),
        };
        let variables = json!({
            "face": to_json(OP, &config.face)?,
            "producer": producer,
            "fileServer": file_server,
            "fetcher": to_json(OP, &config.fetcher)?,
        });
        let data = self.execute(OP, START_TRAFFIC_GEN, variables).await?;
        let fetcher = field(OP, &data, "/startTrafficGen/fetcher/id")?;
        let version_bypass_hi = match data.pointer("/startTrafficGen/fileServer/versionBypassHi") {
            None => None,
            Some(value) => {
                Option::<u32>::deserialize(value).map_err(|source| ControlError::Decode {
                    operation: OP,
                    source,
                })?
            }
        };
        Ok(TrafficGenStarted {
            fetcher,
            version_bypass_hi,
        })
    }

    async fn start_fetch(
        &self,
        fetcher: &FetcherId,
        tasks: &[FetchTaskDef],
    ) -> Result<Vec<TaskId>, ControlError> {
        const OP: &str = "fetch";
        create_all(
            tasks,
            |task| async move {
                let variables = json!({ "fetcher": fetcher, "task": to_json(OP, task)? });
                let data = self.execute(OP, FETCH, variables).await?;
                field::<TaskId>(OP, &data, "/fetch/id")
            },
            |created| async move { self.stop_fetch(&created).await },
        )
        .await
    }

    async fn get_fetch_progress(
        &self,
        tasks: &[TaskId],
    ) -> Result<Vec<FetchCounters>, ControlError> {
        const OP: &str = "fetchCounters";
        let mut counters = Vec::with_capacity(tasks.len());
        for task in tasks {
            let data = self
                .execute(OP, FETCH_COUNTERS, json!({ "id": task }))
                .await?;
            counters.push(field(OP, &data, "/node/counters")?);
        }
        Ok(counters)
    }

    async fn stop_fetch(&self, tasks: &[TaskId]) -> Result<(), ControlError> {
        for task in tasks {
            let data = self.execute("delete", DELETE, json!({ "id": task })).await?;
            if data.pointer("/delete") != Some(&Value::Bool(true)) {
                warn!("{} did not delete fetch task {task}", self.endpoint);
            }
        }
        Ok(())
    }
}
