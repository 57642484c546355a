// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Traffic generator configuration, fetch tasks and fetch counters.

use crate::ids::FetcherId;
use crate::locator::FaceLocator;
use crate::name::Name;
use serde::{Deserialize, Deserializer, Serialize};
use std::path::PathBuf;

/// One reply of a synthetic producer pattern.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TgpReply {
    /// Suffix appended to the Interest name to form the Data name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suffix: Option<Name>,
    pub payload_len: u32,
    /// Freshness period in milliseconds.
    pub freshness_period: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TgpPattern {
    pub prefix: Name,
    pub replies: Vec<TgpReply>,
}

/// Synthetic reply producer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TgpConfig {
    pub n_threads: u16,
    pub patterns: Vec<TgpPattern>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileServerMount {
    pub prefix: Name,
    pub path: PathBuf,
}

/// File segment server.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileServerConfig {
    pub n_threads: u16,
    pub mounts: Vec<FileServerMount>,
    pub segment_len: u32,
    pub want_version_bypass: bool,
}

/// Either kind of producer a traffic generator may run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProducerConfig {
    PingServer(TgpConfig),
    FileServer(FileServerConfig),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetcherConfig {
    pub n_threads: u16,
    pub n_tasks: u16,
}

/// Everything started on one traffic generator face.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrafficGenConfig {
    pub face: FaceLocator,
    /// `None` when this endpoint only consumes.
    pub producer: Option<ProducerConfig>,
    pub fetcher: FetcherConfig,
}

/// What a node reports back after starting a traffic generator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrafficGenStarted {
    pub fetcher: FetcherId,
    /// High 32 bits of file server versions that bypass version discovery.
    pub version_bypass_hi: Option<u32>,
}

/// Definition of one fetch task, i.e. one flow.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchTaskDef {
    pub prefix: Name,
    #[serde(default, skip_serializing_if = "core::ops::Not::not")]
    pub can_be_prefix: bool,
    #[serde(default, skip_serializing_if = "core::ops::Not::not")]
    pub must_be_fresh: bool,
    /// Exclusive upper bound of segment numbers; `None` fetches without bound.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub segment_end: Option<u64>,
}

/// Progress counters of one fetch task.
///
/// All times are nanoseconds since the task started.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchCounters {
    #[serde(deserialize_with = "counter")]
    pub elapsed: u64,
    /// Set once the task has retrieved its whole segment range.
    #[serde(default, deserialize_with = "optional_counter")]
    pub finished: Option<u64>,
    #[serde(deserialize_with = "counter")]
    pub n_rx_data: u64,
}

impl FetchCounters {
    /// Elapsed time, frozen at completion for a task that has finished.
    #[must_use]
    pub fn effective_elapsed(&self) -> u64 {
        self.finished.unwrap_or(self.elapsed)
    }
}

/// 64-bit counters may be sent as JSON numbers or as decimal strings.
#[derive(Deserialize)]
#[serde(untagged)]
enum Counter {
    Number(u64),
    Text(String),
}

impl Counter {
    fn into_u64<E: serde::de::Error>(self) -> Result<u64, E> {
        match self {
            Counter::Number(n) => Ok(n),
            Counter::Text(s) => s
                .parse()
                .map_err(|_| E::custom(format!("counter '{s}' is not an integer"))),
        }
    }
}

fn counter<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    Counter::deserialize(deserializer)?.into_u64()
}

fn optional_counter<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u64>, D::Error> {
    Option::<Counter>::deserialize(deserializer)?
        .map(Counter::into_u64)
        .transpose()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn counters_accept_numbers_and_strings() {
        let counters: FetchCounters = serde_json::from_value(json!({
            "elapsed": "2000000000",
            "nRxData": 2000,
            "finished": null,
        }))
        .unwrap();
        assert_eq!(
            counters,
            FetchCounters {
                elapsed: 2_000_000_000,
                finished: None,
                n_rx_data: 2000,
            }
        );

        let counters: FetchCounters = serde_json::from_value(json!({
            "elapsed": 9,
            "finished": "7",
            "nRxData": "1",
        }))
        .unwrap();
        assert_eq!(counters.effective_elapsed(), 7);
    }

    #[test]
    fn task_def_omits_unset_qualifiers() {
        let task = FetchTaskDef {
            prefix: Name::root().push('A').push(0),
            can_be_prefix: false,
            must_be_fresh: true,
            segment_end: None,
        };
        assert_eq!(
            serde_json::to_value(&task).unwrap(),
            json!({ "prefix": "/A/0", "mustBeFresh": true })
        );
    }
}
