// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Server environment from environment variables.
//!
//! Each node is described by variables prefixed with its letter: `F` for the forwarder, `A` and
//! `B` for the traffic generator endpoints, e.g. `F_GQLSERVER`, `F_PORT_A`, `A_CORES_PRIMARY`.

use benchmark::{ForwarderEnv, GenEnv, Label, LabelMap, ServerEnv};
use control::ids::LCoreId;
use net::port::{InvalidPortSpec, PortSpec};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Highest core id accepted in a core list.
pub const MAX_LCORE_ID: u32 = 4095;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid core list '{0}': expected comma separated ids or ranges like 0-3, ids at most 4095")]
pub struct InvalidCoreList(String);

#[derive(Debug, thiserror::Error)]
pub enum InvalidEnv {
    #[error("environment variable {0} is not set")]
    Missing(String),
    #[error("{var}: {source}")]
    Port {
        var: String,
        #[source]
        source: InvalidPortSpec,
    },
    #[error("{var}: {source}")]
    Cores {
        var: String,
        #[source]
        source: InvalidCoreList,
    },
    #[error("cannot load {}: {source}", .path.display())]
    EnvFile {
        path: PathBuf,
        #[source]
        source: dotenvy::Error,
    },
}

/// Parse `0-3,8,10-11` into core ids, in the order given.
pub fn parse_cores(input: &str) -> Result<Vec<LCoreId>, InvalidCoreList> {
    let invalid = || InvalidCoreList(input.to_owned());
    let input = input.trim();
    if input.is_empty() {
        return Ok(vec![]);
    }
    let mut cores = Vec::new();
    for item in input.split(',').map(str::trim) {
        let (first, last) = match item.split_once('-') {
            Some((first, last)) => (first, last),
            None => (item, item),
        };
        let first: u32 = first.trim().parse().map_err(|_| invalid())?;
        let last: u32 = last.trim().parse().map_err(|_| invalid())?;
        if first > last || last > MAX_LCORE_ID {
            return Err(invalid());
        }
        cores.extend((first..=last).map(LCoreId));
    }
    Ok(cores)
}

/// Reads a [`ServerEnv`] through a variable lookup.
pub struct ServerEnvLoader<F> {
    lookup: F,
}

impl ServerEnvLoader<fn(&str) -> Option<String>> {
    /// Load from the process environment, after merging in `env_file` if given.
    ///
    /// Variables already set in the process take precedence over the file.
    pub fn process(env_file: Option<&Path>) -> Result<Self, InvalidEnv> {
        if let Some(path) = env_file {
            dotenvy::from_path(path).map_err(|source| InvalidEnv::EnvFile {
                path: path.to_path_buf(),
                source,
            })?;
            debug!("loaded server environment from {}", path.display());
        }
        Ok(Self {
            lookup: |var| std::env::var(var).ok(),
        })
    }
}

impl<F: Fn(&str) -> Option<String>> ServerEnvLoader<F> {
    pub fn new(lookup: F) -> Self {
        Self { lookup }
    }

    fn get(&self, var: &str) -> Result<String, InvalidEnv> {
        (self.lookup)(var)
            .map(|value| value.trim().to_owned())
            .filter(|value| !value.is_empty())
            .ok_or_else(|| InvalidEnv::Missing(var.to_owned()))
    }

    fn port(&self, var: &str) -> Result<PortSpec, InvalidEnv> {
        self.get(var)?.parse().map_err(|source| InvalidEnv::Port {
            var: var.to_owned(),
            source,
        })
    }

    fn cores(&self, var: &str) -> Result<Vec<LCoreId>, InvalidEnv> {
        parse_cores(&self.get(var)?).map_err(|source| InvalidEnv::Cores {
            var: var.to_owned(),
            source,
        })
    }

    fn forwarder(&self) -> Result<ForwarderEnv, InvalidEnv> {
        Ok(ForwarderEnv {
            gql_server: self.get("F_GQLSERVER")?,
            ports: LabelMap::new(self.port("F_PORT_A")?, self.port("F_PORT_B")?),
            cores_primary: self.cores("F_CORES_PRIMARY")?,
            cores_secondary: self.cores("F_CORES_SECONDARY")?,
        })
    }

    fn generator(&self, label: Label) -> Result<GenEnv, InvalidEnv> {
        Ok(GenEnv {
            gql_server: self.get(&format!("{label}_GQLSERVER"))?,
            port: self.port(&format!("{label}_PORT_F"))?,
            cores_primary: self.cores(&format!("{label}_CORES_PRIMARY"))?,
            cores_secondary: self.cores(&format!("{label}_CORES_SECONDARY"))?,
            fileserver_path: self.get(&format!("{label}_FILESERVER_PATH"))?.into(),
        })
    }

    pub fn load(&self) -> Result<ServerEnv, InvalidEnv> {
        Ok(ServerEnv {
            forwarder: self.forwarder()?,
            generators: LabelMap::new(self.generator(Label::A)?, self.generator(Label::B)?),
        })
    }
}
