// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Benchmark options.

use crate::error::ConfigError;
use crate::label::{Direction, Label};
use core::fmt::{Display, Formatter};
use core::str::FromStr;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Size of the random discriminator space in flow names.
pub const DISCRIMINATOR_SPACE: u32 = 1024;

/// File server flows are numbered in the low byte of the file version.
pub const MAX_FILESERVER_FLOWS: usize = 256;

/// Error parsing one of the option enums from text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {kind} '{value}'")]
pub struct InvalidOption {
    kind: &'static str,
    value: String,
}

macro_rules! text_enum {
    ($name:ident, $kind:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $text,)+
                }
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = InvalidOption;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    _ => Err(InvalidOption { kind: $kind, value: s.to_owned() }),
                }
            }
        }
    };
}

/// Transport used for one face.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FaceScheme {
    #[default]
    Ether,
    Vxlan,
    Memif,
}
text_enum!(FaceScheme, "face scheme", { Ether => "ether", Vxlan => "vxlan", Memif => "memif" });

/// Which endpoints produce traffic.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum TrafficDir {
    /// `A` produces, `B` consumes.
    Unidirectional,
    /// Both endpoints produce and consume.
    #[default]
    Bidirectional,
}

impl TrafficDir {
    /// The producing endpoints, in measurement order.
    #[must_use]
    pub const fn producers(self) -> &'static [Label] {
        match self {
            TrafficDir::Unidirectional => &[Label::A],
            TrafficDir::Bidirectional => &[Label::A, Label::B],
        }
    }

    pub fn directions(self) -> impl Iterator<Item = Direction> {
        self.producers()
            .iter()
            .map(|p| Direction::from_producer(*p))
    }

    #[must_use]
    pub fn is_producer(self, label: Label) -> bool {
        self.producers().contains(&label)
    }
}

impl From<TrafficDir> for u8 {
    fn from(dir: TrafficDir) -> u8 {
        match dir {
            TrafficDir::Unidirectional => 1,
            TrafficDir::Bidirectional => 2,
        }
    }
}

impl TryFrom<u8> for TrafficDir {
    type Error = InvalidOption;

    fn try_from(n: u8) -> Result<Self, Self::Error> {
        match n {
            1 => Ok(TrafficDir::Unidirectional),
            2 => Ok(TrafficDir::Bidirectional),
            _ => Err(InvalidOption {
                kind: "traffic direction",
                value: n.to_string(),
            }),
        }
    }
}

impl Display for TrafficDir {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", u8::from(*self))
    }
}

impl FromStr for TrafficDir {
    type Err = InvalidOption;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<u8>()
            .map_err(|_| InvalidOption {
                kind: "traffic direction",
                value: s.to_owned(),
            })
            .and_then(TrafficDir::try_from)
    }
}

/// What the producing endpoints serve.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProducerKind {
    /// Synthetic replies with a fixed payload.
    #[default]
    PingServer,
    /// Segments of files under the node's file server root.
    FileServer,
}
text_enum!(ProducerKind, "producer kind", { PingServer => "pingserver", FileServer => "fileserver" });

/// How Data names relate to Interest names.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataMatch {
    #[default]
    Exact,
    Prefix,
}
text_enum!(DataMatch, "data match", { Exact => "exact", Prefix => "prefix" });

/// Everything that shapes one benchmark run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BenchmarkOptions {
    pub face_a_scheme: FaceScheme,
    pub face_a_rx_queues: u16,
    pub face_b_scheme: FaceScheme,
    pub face_b_rx_queues: u16,
    /// Number of forwarding threads, which is also the number of name shards per endpoint.
    pub n_fwds: usize,
    pub traffic_dir: TrafficDir,
    pub producer_kind: ProducerKind,
    pub n_producer_threads: u16,
    /// Flows per direction.
    pub n_flows: usize,
    /// Interest name length in components, including the segment number.
    pub interest_name_len: usize,
    pub data_match: DataMatch,
    pub payload_len: u32,
    /// Exclusive upper bound of segment numbers; zero fetches without bound.
    pub segment_end: u64,
    /// Seconds between starting the flows and the first sample.
    pub warmup: u64,
    /// Seconds between the two samples.
    pub duration: u64,
}

impl Default for BenchmarkOptions {
    fn default() -> Self {
        Self {
            face_a_scheme: FaceScheme::Ether,
            face_a_rx_queues: 1,
            face_b_scheme: FaceScheme::Ether,
            face_b_rx_queues: 1,
            n_fwds: 4,
            traffic_dir: TrafficDir::Bidirectional,
            producer_kind: ProducerKind::PingServer,
            n_producer_threads: 1,
            n_flows: 8,
            interest_name_len: 4,
            data_match: DataMatch::Exact,
            payload_len: 1000,
            segment_end: 0,
            warmup: 5,
            duration: 30,
        }
    }
}

impl BenchmarkOptions {
    #[must_use]
    pub fn scheme(&self, label: Label) -> FaceScheme {
        match label {
            Label::A => self.face_a_scheme,
            Label::B => self.face_b_scheme,
        }
    }

    #[must_use]
    pub fn rx_queues(&self, label: Label) -> u16 {
        match label {
            Label::A => self.face_a_rx_queues,
            Label::B => self.face_b_rx_queues,
        }
    }

    #[must_use]
    pub fn warmup(&self) -> Duration {
        Duration::from_secs(self.warmup)
    }

    #[must_use]
    pub fn duration(&self) -> Duration {
        Duration::from_secs(self.duration)
    }

    /// The segment bound sent to fetchers, `None` when unbounded.
    #[must_use]
    pub fn segment_end(&self) -> Option<u64> {
        (self.segment_end > 0).then_some(self.segment_end)
    }

    /// Check the options on their own, without looking at the environment.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for label in Label::ALL {
            if self.rx_queues(label) == 0 {
                return Err(ConfigError::NoRxQueues(label));
            }
        }
        if self.n_fwds == 0 {
            return Err(ConfigError::NoShards);
        }
        if self.n_fwds > usize::from(u8::MAX) + 1 {
            return Err(ConfigError::TooManyShards(self.n_fwds));
        }
        let max_flows = match self.producer_kind {
            ProducerKind::PingServer => DISCRIMINATOR_SPACE as usize,
            ProducerKind::FileServer => MAX_FILESERVER_FLOWS,
        };
        if self.n_flows == 0 || self.n_flows > max_flows {
            return Err(ConfigError::FlowCount {
                count: self.n_flows,
                max: max_flows,
            });
        }
        if self.interest_name_len < 4 {
            return Err(ConfigError::NameTooShort(self.interest_name_len));
        }
        if self.n_producer_threads == 0 {
            return Err(ConfigError::NoProducerThreads);
        }
        if self.payload_len == 0 {
            return Err(ConfigError::NoPayload);
        }
        if self.duration == 0 {
            return Err(ConfigError::NoDuration);
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults_are_valid() {
        BenchmarkOptions::default().validate().unwrap();
    }

    #[test]
    fn validation_failures() {
        let base = BenchmarkOptions::default();
        let cases = [
            (
                BenchmarkOptions {
                    face_b_rx_queues: 0,
                    ..base.clone()
                },
                ConfigError::NoRxQueues(Label::B),
            ),
            (
                BenchmarkOptions {
                    n_fwds: 0,
                    ..base.clone()
                },
                ConfigError::NoShards,
            ),
            (
                BenchmarkOptions {
                    n_flows: 1025,
                    ..base.clone()
                },
                ConfigError::FlowCount {
                    count: 1025,
                    max: 1024,
                },
            ),
            (
                BenchmarkOptions {
                    n_flows: 300,
                    producer_kind: ProducerKind::FileServer,
                    ..base.clone()
                },
                ConfigError::FlowCount {
                    count: 300,
                    max: 256,
                },
            ),
            (
                BenchmarkOptions {
                    interest_name_len: 3,
                    ..base.clone()
                },
                ConfigError::NameTooShort(3),
            ),
            (
                BenchmarkOptions {
                    duration: 0,
                    ..base.clone()
                },
                ConfigError::NoDuration,
            ),
        ];
        for (options, expected) in cases {
            assert_eq!(options.validate(), Err(expected));
        }
    }

    #[test]
    fn traffic_dir_producers() {
        let uni: Vec<_> = TrafficDir::Unidirectional.directions().collect();
        assert_eq!(uni, vec![Direction::from_producer(Label::A)]);
        assert_eq!(uni[0].consumer, Label::B);
        assert_eq!(TrafficDir::Bidirectional.directions().count(), 2);
        assert!(!TrafficDir::Unidirectional.is_producer(Label::B));
        assert_eq!("1".parse::<TrafficDir>().unwrap(), TrafficDir::Unidirectional);
        assert!("3".parse::<TrafficDir>().is_err());
    }

    #[test]
    fn options_serialize_like_the_node_tools() {
        let json = serde_json::to_value(BenchmarkOptions::default()).unwrap();
        assert_eq!(json["faceAScheme"], "ether");
        assert_eq!(json["trafficDir"], 2);
        assert_eq!(json["producerKind"], "pingserver");
        let partial: BenchmarkOptions =
            serde_json::from_value(serde_json::json!({ "nFlows": 2, "dataMatch": "prefix" })).unwrap();
        assert_eq!(partial.n_flows, 2);
        assert_eq!(partial.data_match, DataMatch::Prefix);
        assert_eq!(partial.n_fwds, 4);
        assert_eq!(
            "vxlan".parse::<FaceScheme>().unwrap(),
            FaceScheme::Vxlan
        );
        assert!("fileServer".parse::<ProducerKind>().is_err());
    }
}
