// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Activation sequences of the forwarder and the traffic generators.

use crate::env::{ForwarderEnv, GenEnv};
use crate::error::BenchmarkError;
use crate::label::{Label, LabelMap};
use crate::locator::{LocatorBuilder, Side};
use crate::options::{BenchmarkOptions, DataMatch, ProducerKind};
use crate::plan::{forwarder_plan, traffic_gen_plan};
use crate::readiness::FaceReadiness;
use control::api::{FwControl, GenControl};
use control::ids::{FaceId, NdtIndex};
use control::name::Name;
use control::trafficgen::{
    FetcherConfig, FileServerConfig, FileServerMount, ProducerConfig, TgpConfig, TgpPattern,
    TgpReply, TrafficGenConfig, TrafficGenStarted,
};
use std::collections::HashSet;
use tracing::{debug, info, instrument, warn};

/// Freshness period of synthetic replies, in milliseconds.
pub const REPLY_FRESHNESS_MS: u32 = 1;

/// What forwarder activation produces.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ForwarderActivation {
    pub faces: LabelMap<FaceId>,
    pub ndt_duplicate: bool,
}

/// The prefix served by shard `shard` of `label`: `/<label>/<shard>`.
#[must_use]
pub fn shard_prefix(label: Label, shard: usize) -> Name {
    Name::root().push(label).push(shard)
}

/// Remembers dispatch table indices handed out on one forwarder.
#[derive(Debug, Default)]
pub struct NdtTracker {
    seen: HashSet<NdtIndex>,
    duplicate: bool,
}

impl NdtTracker {
    /// Record `index`, returning whether it had been assigned before.
    pub fn record(&mut self, index: NdtIndex) -> bool {
        let repeated = !self.seen.insert(index);
        self.duplicate |= repeated;
        repeated
    }

    #[must_use]
    pub fn duplicate(&self) -> bool {
        self.duplicate
    }
}

/// Restart and activate the forwarder, then create one face per label with its FIB and
/// dispatch entries.
///
/// Faces are published to `readiness` only once every face and its entries are installed.
#[instrument(level = "debug", skip_all, fields(node = fw.endpoint()))]
pub async fn activate_forwarder(
    fw: &dyn FwControl,
    env: &ForwarderEnv,
    opts: &BenchmarkOptions,
    readiness: &FaceReadiness,
) -> Result<ForwarderActivation, BenchmarkError> {
    let plan = forwarder_plan(env, opts)?;
    fw.restart().await?;
    fw.activate(&plan).await?;
    info!("forwarder {} activated", fw.endpoint());

    let locators = LocatorBuilder::new(opts);
    let mut ndt = NdtTracker::default();
    let mut faces = Vec::with_capacity(Label::ALL.len());
    for label in Label::ALL {
        let locator = locators
            .build(fw, Side::Forwarder, label, &env.ports[label])
            .await?;
        let face = fw.create_face(&locator).await?;
        debug!("forwarder face {face} towards {label}");

        for shard in 0..opts.n_fwds {
            let name = shard_prefix(label, shard);
            fw.insert_fib_entry(&name, &face).await?;
            // shard counts above u8::MAX are rejected by option validation
            let value = u8::try_from(shard).unwrap_or(u8::MAX);
            let index = fw.update_ndt(&name, value).await?;
            if ndt.record(index) {
                warn!("dispatch table index {index} of {name} was already assigned");
            }
        }
        faces.push(face);
    }

    let mut faces = faces.into_iter();
    let (Some(a), Some(b)) = (faces.next(), faces.next()) else {
        return Err(BenchmarkError::FaceUnavailable(Label::B));
    };
    let faces = LabelMap::new(a, b);
    for label in Label::ALL {
        readiness.publish(label, faces[label].clone());
    }
    Ok(ForwarderActivation {
        faces,
        ndt_duplicate: ndt.duplicate(),
    })
}

/// Restart and activate one traffic generator node.
#[instrument(level = "debug", skip_all, fields(node = tg.endpoint()))]
pub async fn activate_traffic_gen(
    tg: &dyn GenControl,
    env: &GenEnv,
) -> Result<(), BenchmarkError> {
    let plan = traffic_gen_plan(env)?;
    tg.restart().await?;
    tg.activate(&plan).await?;
    info!("traffic generator {} activated", tg.endpoint());
    Ok(())
}

/// The producer `label` runs, if it is a traffic source.
#[must_use]
pub fn producer_config(
    opts: &BenchmarkOptions,
    label: Label,
    env: &GenEnv,
) -> Option<ProducerConfig> {
    if !opts.traffic_dir.is_producer(label) {
        return None;
    }
    Some(match opts.producer_kind {
        ProducerKind::PingServer => ProducerConfig::PingServer(TgpConfig {
            n_threads: opts.n_producer_threads,
            patterns: (0..opts.n_fwds)
                .map(|shard| TgpPattern {
                    prefix: shard_prefix(label, shard),
                    replies: vec![TgpReply {
                        suffix: match opts.data_match {
                            DataMatch::Exact => None,
                            DataMatch::Prefix => Some(Name::root().push('D')),
                        },
                        payload_len: opts.payload_len,
                        freshness_period: REPLY_FRESHNESS_MS,
                    }],
                })
                .collect(),
        }),
        ProducerKind::FileServer => ProducerConfig::FileServer(FileServerConfig {
            n_threads: opts.n_producer_threads,
            mounts: vec![FileServerMount {
                prefix: Name::root().push(label),
                path: env.fileserver_path.clone(),
            }],
            segment_len: opts.payload_len,
            want_version_bypass: true,
        }),
    })
}

/// Start the producer and fetcher of `label` once the forwarder face towards it exists.
#[instrument(level = "debug", skip_all, fields(node = tg.endpoint(), %label))]
pub async fn start_traffic_gen(
    tg: &dyn GenControl,
    env: &GenEnv,
    opts: &BenchmarkOptions,
    label: Label,
    readiness: &FaceReadiness,
) -> Result<TrafficGenStarted, BenchmarkError> {
    let face = readiness.wait(label).await?;
    debug!("forwarder face {face} is up, starting {label}");
    let locator = LocatorBuilder::new(opts)
        .build(tg, Side::Generator, label, &env.port)
        .await?;
    let n_tasks = u16::try_from(opts.n_flows).unwrap_or(u16::MAX);
    let config = TrafficGenConfig {
        face: locator,
        producer: producer_config(opts, label, env),
        fetcher: FetcherConfig {
            n_threads: 1,
            n_tasks,
        },
    };
    let started = tg.start_traffic_gen(&config).await?;
    info!("traffic generator {label} started, fetcher {}", started.fetcher);
    Ok(started)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn ndt_duplicates() {
        let mut ndt = NdtTracker::default();
        assert!(!ndt.record(0));
        assert!(!ndt.record(1));
        assert!(ndt.record(0));
        assert!(ndt.duplicate());

        let mut ndt = NdtTracker::default();
        for index in [0, 1, 2] {
            ndt.record(index);
        }
        assert!(!ndt.duplicate());
    }

    fn gen_env() -> GenEnv {
        GenEnv {
            gql_server: "http://a/".into(),
            port: "05:00.0".parse().unwrap(),
            cores_primary: vec![],
            cores_secondary: vec![],
            fileserver_path: "/srv/ndn".into(),
        }
    }

    #[test]
    fn pingserver_patterns_per_shard() {
        let opts = BenchmarkOptions {
            n_fwds: 2,
            data_match: DataMatch::Prefix,
            payload_len: 300,
            ..BenchmarkOptions::default()
        };
        let Some(ProducerConfig::PingServer(tgp)) = producer_config(&opts, Label::B, &gen_env())
        else {
            panic!("expected a ping server");
        };
        let prefixes: Vec<_> = tgp.patterns.iter().map(|p| p.prefix.to_string()).collect();
        assert_eq!(prefixes, vec!["/B/0", "/B/1"]);
        let reply = &tgp.patterns[1].replies[0];
        assert_eq!(reply.suffix.as_ref().map(ToString::to_string).as_deref(), Some("/D"));
        assert_eq!(reply.payload_len, 300);
        assert_eq!(reply.freshness_period, 1);
    }

    #[test]
    fn consumers_only_do_not_produce() {
        let opts = BenchmarkOptions {
            traffic_dir: crate::options::TrafficDir::Unidirectional,
            producer_kind: ProducerKind::FileServer,
            ..BenchmarkOptions::default()
        };
        assert_eq!(producer_config(&opts, Label::B, &gen_env()), None);
        let Some(ProducerConfig::FileServer(fs)) = producer_config(&opts, Label::A, &gen_env())
        else {
            panic!("expected a file server");
        };
        assert_eq!(fs.mounts[0].prefix.to_string(), "/A");
        assert_eq!(fs.mounts[0].path, std::path::PathBuf::from("/srv/ndn"));
        assert_eq!(fs.segment_len, 1000);
        assert!(fs.want_version_bypass);
    }
}
