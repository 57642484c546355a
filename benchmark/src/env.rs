// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The server environment: where the nodes are and what hardware they may use.

use crate::label::{Label, LabelMap};
use control::ids::LCoreId;
use net::port::PortSpec;
use serde::Serialize;
use std::path::PathBuf;

/// The forwarder node.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ForwarderEnv {
    /// GraphQL endpoint URL.
    pub gql_server: String,
    /// The port facing each traffic generator endpoint.
    pub ports: LabelMap<PortSpec>,
    /// Cores for receive, transmit and forwarding threads.
    pub cores_primary: Vec<LCoreId>,
    /// Cores for the main loop and crypto.
    pub cores_secondary: Vec<LCoreId>,
}

/// One traffic generator endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenEnv {
    pub gql_server: String,
    /// The port facing the forwarder.
    pub port: PortSpec,
    pub cores_primary: Vec<LCoreId>,
    pub cores_secondary: Vec<LCoreId>,
    /// Root directory served by the file server workload.
    pub fileserver_path: PathBuf,
}

/// All three nodes of a benchmark.  Immutable for the lifetime of a run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ServerEnv {
    pub forwarder: ForwarderEnv,
    pub generators: LabelMap<GenEnv>,
}

impl ServerEnv {
    #[must_use]
    pub fn generator(&self, label: Label) -> &GenEnv {
        &self.generators[label]
    }

    /// Whether both endpoints are served by the same traffic generator process.
    #[must_use]
    pub fn generators_shared(&self) -> bool {
        self.generators[Label::A].gql_server == self.generators[Label::B].gql_server
    }
}
