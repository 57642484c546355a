// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Command line and environment of the benchmark binary.

#![deny(clippy::all, clippy::pedantic, clippy::unwrap_used)]
#![allow(clippy::missing_errors_doc)]

mod env;

pub use clap::Parser;
pub use env::{InvalidCoreList, InvalidEnv, MAX_LCORE_ID, ServerEnvLoader, parse_cores};

use benchmark::{BenchmarkOptions, DataMatch, FaceScheme, ProducerKind, TrafficDir};
use control::gql::GqlOptions;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug, serde::Serialize)]
#[command(name = "ndnbench")]
#[command(version)]
#[command(about = "Forwarder throughput benchmark", long_about = None)]
pub struct CmdArgs {
    #[arg(long, value_name = "ether|vxlan|memif", default_value_t = FaceScheme::Ether)]
    face_a_scheme: FaceScheme,

    #[arg(
        long,
        value_name = "N",
        default_value_t = 1,
        value_parser = clap::value_parser!(u16).range(1..),
        help = "Receive queues of the forwarder face towards A"
    )]
    face_a_rx_queues: u16,

    #[arg(long, value_name = "ether|vxlan|memif", default_value_t = FaceScheme::Ether)]
    face_b_scheme: FaceScheme,

    #[arg(
        long,
        value_name = "N",
        default_value_t = 1,
        value_parser = clap::value_parser!(u16).range(1..),
        help = "Receive queues of the forwarder face towards B"
    )]
    face_b_rx_queues: u16,

    /// Forwarding threads, which is also the number of name shards per endpoint.
    #[arg(long, value_name = "N", default_value_t = 4)]
    n_fwds: usize,

    #[arg(
        long,
        value_name = "1|2",
        default_value_t = TrafficDir::Bidirectional,
        help = "1: A produces and B consumes; 2: both directions"
    )]
    traffic_dir: TrafficDir,

    #[arg(long, value_name = "pingserver|fileserver", default_value_t = ProducerKind::PingServer)]
    producer_kind: ProducerKind,

    #[arg(long, value_name = "N", default_value_t = 1)]
    n_producer_threads: u16,

    /// Flows per direction.
    #[arg(long, value_name = "N", default_value_t = 8)]
    n_flows: usize,

    /// Interest name length in components, including the segment number.
    #[arg(long, value_name = "N", default_value_t = 4)]
    interest_name_len: usize,

    #[arg(long, value_name = "exact|prefix", default_value_t = DataMatch::Exact)]
    data_match: DataMatch,

    #[arg(long, value_name = "BYTES", default_value_t = 1000)]
    payload_len: u32,

    #[arg(
        long,
        value_name = "N",
        default_value_t = 0,
        help = "Exclusive upper bound of fetched segment numbers, 0 for unbounded"
    )]
    segment_end: u64,

    #[arg(long, value_name = "SECONDS", default_value_t = 5)]
    warmup: u64,

    #[arg(long, value_name = "SECONDS", default_value_t = 30)]
    duration: u64,

    #[arg(
        long,
        value_name = "N",
        default_value_t = 1,
        value_parser = clap::value_parser!(u32).range(1..),
        help = "Number of benchmark runs"
    )]
    count: u32,

    #[arg(
        long,
        value_name = "PATH",
        help = "File with server environment variables, loaded before reading the process environment"
    )]
    env_file: Option<PathBuf>,

    #[arg(
        long,
        value_name = "SECONDS",
        default_value_t = 60,
        value_parser = clap::value_parser!(u64).range(1..),
        help = "Timeout of a single control request, and of a node coming back after restart"
    )]
    request_timeout: u64,

    #[arg(
        long,
        default_value_t = false,
        help = "Show the available tracing tags and exit"
    )]
    show_tracing_tags: bool,

    #[arg(
        long,
        value_name = "tracing configuration",
        help = "Tracing config string as comma-separated sequence of tag=level, with level one in [off,error,warn,info,debug,trace].
Passing default=level sets the default log-level.
E.g. default=warn,benchmark=debug"
    )]
    tracing: Option<String>,
}

impl CmdArgs {
    /// The benchmark options given on the command line.
    #[must_use]
    pub fn options(&self) -> BenchmarkOptions {
        BenchmarkOptions {
            face_a_scheme: self.face_a_scheme,
            face_a_rx_queues: self.face_a_rx_queues,
            face_b_scheme: self.face_b_scheme,
            face_b_rx_queues: self.face_b_rx_queues,
            n_fwds: self.n_fwds,
            traffic_dir: self.traffic_dir,
            producer_kind: self.producer_kind,
            n_producer_threads: self.n_producer_threads,
            n_flows: self.n_flows,
            interest_name_len: self.interest_name_len,
            data_match: self.data_match,
            payload_len: self.payload_len,
            segment_end: self.segment_end,
            warmup: self.warmup,
            duration: self.duration,
        }
    }

    #[must_use]
    pub fn gql_options(&self) -> GqlOptions {
        let timeout = Duration::from_secs(self.request_timeout);
        GqlOptions {
            request_timeout: timeout,
            restart_timeout: timeout,
            ..GqlOptions::default()
        }
    }

    #[must_use]
    pub fn count(&self) -> u32 {
        self.count
    }

    #[must_use]
    pub fn env_file(&self) -> Option<&PathBuf> {
        self.env_file.as_ref()
    }

    #[must_use]
    pub fn show_tracing_tags(&self) -> bool {
        self.show_tracing_tags
    }

    #[must_use]
    pub fn tracing(&self) -> Option<&String> {
        self.tracing.as_ref()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults_match_benchmark_defaults() {
        let args = CmdArgs::try_parse_from(["ndnbench"]).unwrap();
        assert_eq!(args.options(), BenchmarkOptions::default());
        assert_eq!(args.count(), 1);
        assert_eq!(args.gql_options().request_timeout, Duration::from_secs(60));
        assert!(args.env_file().is_none());
    }

    #[test]
    fn options_from_flags() {
        let args = CmdArgs::try_parse_from([
            "ndnbench",
            "--face-b-scheme",
            "memif",
            "--traffic-dir",
            "1",
            "--producer-kind",
            "fileserver",
            "--data-match",
            "prefix",
            "--n-flows",
            "16",
            "--warmup",
            "0",
            "--count",
            "3",
            "--request-timeout",
            "5",
            "--env-file",
            "/etc/ndnbench.env",
            "--tracing",
            "default=debug",
        ])
        .unwrap();
        let options = args.options();
        assert_eq!(options.face_b_scheme, FaceScheme::Memif);
        assert_eq!(options.traffic_dir, TrafficDir::Unidirectional);
        assert_eq!(options.producer_kind, ProducerKind::FileServer);
        assert_eq!(options.data_match, DataMatch::Prefix);
        assert_eq!(options.n_flows, 16);
        assert_eq!(options.warmup, 0);
        assert_eq!(args.count(), 3);
        assert_eq!(args.gql_options().restart_timeout, Duration::from_secs(5));
        assert_eq!(
            args.env_file(),
            Some(&PathBuf::from("/etc/ndnbench.env"))
        );
        assert_eq!(args.tracing().map(String::as_str), Some("default=debug"));
    }

    #[test]
    fn bad_flags_are_rejected() {
        for bad in [
            ["--face-a-scheme", "ethernet"],
            ["--traffic-dir", "3"],
            ["--count", "0"],
            ["--face-a-rx-queues", "0"],
            ["--producer-kind", "fileServer"],
        ] {
            let argv = std::iter::once("ndnbench").chain(bad);
            assert!(CmdArgs::try_parse_from(argv).is_err(), "{bad:?}");
        }
    }
}
