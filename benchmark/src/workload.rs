// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Fetch task planning: which names each consumer requests.

use crate::error::ConfigError;
use crate::label::Direction;
use crate::options::{BenchmarkOptions, DISCRIMINATOR_SPACE, DataMatch, ProducerKind};
use crate::orchestrator::shard_prefix;
use crate::state::RunState;
use control::name::Name;
use control::trafficgen::FetchTaskDef;
use core::fmt::Write;
use rand::Rng;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::debug;

/// TLV type of a version name component.
pub const VERSION_TYPE: u8 = 54;

/// Versions at or below this value would not carry the node's bypass seed.
pub const VERSION_BOUND: u64 = 0xFFFF_FFFF;

/// Pick `n` distinct values in `[0, space)`.
pub fn discriminators(rng: &mut impl Rng, n: usize, space: u32) -> Result<Vec<u32>, ConfigError> {
    let space = space as usize;
    if n > space {
        return Err(ConfigError::FlowCount { count: n, max: space });
    }
    Ok(rand::seq::index::sample(rng, space, n)
        .into_iter()
        .filter_map(|i| u32::try_from(i).ok())
        .collect())
}

/// Low 24 bits of the Unix time in seconds.
#[must_use]
pub fn time24(now: SystemTime) -> u32 {
    let secs = now.duration_since(UNIX_EPOCH).map_or(0, |d| d.as_secs());
    u32::try_from(secs & 0x00FF_FFFF).unwrap_or(0)
}

/// A file version that lets a fetcher skip version discovery on a file server.
///
/// Layout, most significant first: 32 bits of node supplied seed, 24 bits of time,
/// 8 bits of flow index.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileVersion(u64);

impl FileVersion {
    #[must_use]
    pub fn compose(hi: u32, time24: u32, flow: u8) -> Self {
        FileVersion(
            (u64::from(hi) << 32) | (u64::from(time24 & 0x00FF_FFFF) << 8) | u64::from(flow),
        )
    }

    /// Split into (seed, time, flow).
    #[must_use]
    pub fn parts(self) -> (u32, u32, u8) {
        let [.., flow] = self.0.to_be_bytes();
        (
            u32::try_from(self.0 >> 32).unwrap_or(0),
            u32::try_from((self.0 >> 8) & 0x00FF_FFFF).unwrap_or(0),
            flow,
        )
    }

    #[must_use]
    pub fn value(self) -> u64 {
        self.0
    }

    /// The name component in URI form, e.g. `54=%00%00%00%05%12%34%56%03`.
    #[must_use]
    pub fn component(self) -> String {
        let mut out = format!("{VERSION_TYPE}=");
        for byte in self.0.to_be_bytes() {
            let _ = write!(out, "%{byte:02X}");
        }
        out
    }
}

/// The fetch tasks of one direction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DirectionTasks {
    pub direction: Direction,
    pub tasks: Vec<FetchTaskDef>,
}

/// Plans fetch tasks for a run.
///
/// Discriminators and the version time are fixed at construction, so every direction of a run
/// shares them.
#[derive(Clone, Debug)]
pub struct WorkloadPlanner<'a> {
    opts: &'a BenchmarkOptions,
    discriminators: Vec<u32>,
    time24: u32,
}

impl<'a> WorkloadPlanner<'a> {
    pub fn new(
        opts: &'a BenchmarkOptions,
        rng: &mut impl Rng,
        now: SystemTime,
    ) -> Result<Self, ConfigError> {
        Ok(Self::with_discriminators(
            opts,
            discriminators(rng, opts.n_flows, DISCRIMINATOR_SPACE)?,
            time24(now),
        ))
    }

    #[must_use]
    pub fn with_discriminators(
        opts: &'a BenchmarkOptions,
        discriminators: Vec<u32>,
        time24: u32,
    ) -> Self {
        Self {
            opts,
            discriminators,
            time24,
        }
    }

    #[must_use]
    pub fn discriminators(&self) -> &[u32] {
        &self.discriminators
    }

    fn flow_prefix(&self, direction: Direction, flow: usize, discriminator: u32) -> Name {
        shard_prefix(direction.producer, flow % self.opts.n_fwds).push(discriminator)
    }

    fn ping_task(&self, prefix: Name) -> FetchTaskDef {
        // the fetcher appends the segment number as the last component
        let mut prefix = prefix;
        for _ in 4..self.opts.interest_name_len {
            prefix = prefix.push('I');
        }
        FetchTaskDef {
            prefix,
            can_be_prefix: self.opts.data_match == DataMatch::Prefix,
            must_be_fresh: true,
            segment_end: self.opts.segment_end(),
        }
    }

    fn file_task(&self, prefix: Name, hi: u32, flow: usize) -> Result<FetchTaskDef, ConfigError> {
        let flow_byte = u8::try_from(flow).map_err(|_| ConfigError::FlowCount {
            count: flow + 1,
            max: usize::from(u8::MAX) + 1,
        })?;
        let version = FileVersion::compose(hi, self.time24, flow_byte);
        if version.value() <= VERSION_BOUND {
            return Err(ConfigError::VersionBound {
                version: version.value(),
                flow,
            });
        }
        Ok(FetchTaskDef {
            prefix: prefix.push(version.component()),
            can_be_prefix: false,
            must_be_fresh: false,
            segment_end: self.opts.segment_end(),
        })
    }

    /// Fetch tasks for `direction`, one per flow.
    pub fn tasks(&self, direction: Direction, state: &RunState) -> Result<Vec<FetchTaskDef>, ConfigError> {
        let hi = state.version_bypass_hi[direction.producer];
        self.discriminators
            .iter()
            .enumerate()
            .map(|(flow, discriminator)| {
                let prefix = self.flow_prefix(direction, flow, *discriminator);
                match self.opts.producer_kind {
                    ProducerKind::PingServer => Ok(self.ping_task(prefix)),
                    ProducerKind::FileServer => self.file_task(prefix, hi, flow),
                }
            })
            .collect()
    }

    /// Fetch tasks for every direction of the configured traffic.
    pub fn plan(&self, state: &RunState) -> Result<Vec<DirectionTasks>, ConfigError> {
        self.opts
            .traffic_dir
            .directions()
            .map(|direction| {
                let tasks = self.tasks(direction, state)?;
                debug!("{direction}: {} fetch tasks", tasks.len());
                Ok(DirectionTasks { direction, tasks })
            })
            .collect()
    }
}
