// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

#![deny(clippy::all, clippy::pedantic)]

use args::{CmdArgs, InvalidEnv, Parser, ServerEnvLoader};
use benchmark::{Benchmark, BenchmarkError, BenchmarkOptions, ServerEnv, ThroughputResult};
use serde::Serialize;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracectl::{TraceCtlError, describe_tags, get_trace_ctl};
use tracing::{debug, error, info, warn};

#[derive(Debug, thiserror::Error)]
enum Failure {
    #[error(transparent)]
    Tracing(#[from] TraceCtlError),
    #[error(transparent)]
    Env(#[from] InvalidEnv),
    #[error(transparent)]
    Benchmark(#[from] BenchmarkError),
    #[error("cannot encode output: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("cannot install signal handler: {0}")]
    Signal(#[from] ctrlc::Error),
    #[error("cannot start runtime: {0}")]
    Runtime(std::io::Error),
}

/// One line of output per run.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RunRecord<'a> {
    run: u32,
    options: &'a BenchmarkOptions,
    result: &'a ThroughputResult,
}

async fn run_all(
    args: &CmdArgs,
    env: &ServerEnv,
    opts: &BenchmarkOptions,
    cancel: CancellationToken,
) -> Result<(), Failure> {
    let gql = args.gql_options();
    for run in 1..=args.count() {
        info!("━━━━━━ run {run} of {} ━━━━━━", args.count());
        let benchmark = Benchmark::gql(env.clone(), opts.clone(), &gql, cancel.clone())?;
        let result = benchmark.execute().await?;
        if result.ndt_duplicate {
            warn!("run {run}: dispatch table collision, result may understate capacity");
        }
        let record = RunRecord {
            run,
            options: opts,
            result: &result,
        };
        println!("{}", serde_json::to_string(&record)?);
    }
    Ok(())
}

fn run(args: &CmdArgs) -> Result<(), Failure> {
    let tctl = get_trace_ctl();
    if let Some(tracing) = args.tracing() {
        tctl.setup_from_string(tracing)?;
    }
    debug!("tracing: {}", tctl.as_config_string());
    let env = ServerEnvLoader::process(args.env_file().map(PathBuf::as_path))?.load()?;
    debug!("server environment: {}", serde_json::to_string(&env)?);
    let opts = args.options();
    opts.validate().map_err(BenchmarkError::from)?;
    info!("options: {}", serde_json::to_string(&opts)?);

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    ctrlc::set_handler(move || {
        warn!("interrupted, aborting benchmark");
        on_signal.cancel();
    })?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(Failure::Runtime)?;
    runtime.block_on(run_all(args, &env, &opts, cancel))
}

fn main() {
    let args = CmdArgs::parse();
    if args.show_tracing_tags() {
        println!("{}", describe_tags());
        std::process::exit(0);
    }
    if let Err(e) = run(&args) {
        error!("{e}");
        std::process::exit(1);
    }
}
