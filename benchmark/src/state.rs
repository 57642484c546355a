// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Run-scoped state collected during setup and used by the measurement.

use crate::error::BenchmarkError;
use crate::label::{Label, LabelMap};
use control::ids::{FaceId, FetcherId, TaskId};

/// Everything the nodes handed back so far.  Created empty; never persisted.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RunState {
    /// Forwarder face towards each endpoint.
    pub faces: LabelMap<Option<FaceId>>,
    /// Fetcher running on each endpoint.
    pub fetchers: LabelMap<Option<FetcherId>>,
    /// Active fetch tasks of each consuming endpoint.
    pub tasks: LabelMap<Vec<TaskId>>,
    /// File server version seed of each producing endpoint.
    pub version_bypass_hi: LabelMap<u32>,
    /// Whether two dispatch table registrations landed on the same index.
    pub ndt_duplicate: bool,
}

impl RunState {
    pub fn fetcher(&self, label: Label) -> Result<&FetcherId, BenchmarkError> {
        self.fetchers[label]
            .as_ref()
            .ok_or(BenchmarkError::MissingState {
                what: "fetcher",
                label,
            })
    }

    /// Whether any fetch task may still be running.
    #[must_use]
    pub fn has_tasks(&self) -> bool {
        self.tasks.iter().any(|(_, tasks)| !tasks.is_empty())
    }
}
