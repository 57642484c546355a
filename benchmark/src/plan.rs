// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Activation plans: core allocation plus the fixed sizing policy of each role.

use crate::alloc::ResourceAllocator;
use crate::env::{ForwarderEnv, GenEnv};
use crate::error::{AllocError, ConfigError};
use crate::label::Label;
use crate::options::BenchmarkOptions;
use control::activate::{
    ActivateFwArgs, ActivateGenArgs, ActivationPlan, EalConfig, FibConfig, LCoreRole,
    MempoolConfig, NdtConfig, PcctConfig, PoolConfig, PoolTemplate, QueueConfig,
};
use control::ids::LCoreId;

/// Transmit threads on the forwarder, one per face.
pub const FORWARDER_TX_CORES: usize = 2;

const FW_DIRECT: PoolConfig = PoolConfig::with_dataroom(1_048_575, 9146);
const FW_INDIRECT: PoolConfig = PoolConfig::new(2_097_151);
const GEN_DIRECT: PoolConfig = PoolConfig::with_dataroom(65535, 9146);
const GEN_INDIRECT: PoolConfig = PoolConfig::new(1_048_575);
const GEN_PAYLOAD: PoolConfig = PoolConfig::new(16383);

fn eal(
    node: &'static str,
    primary: &[LCoreId],
    secondary: &[LCoreId],
) -> Result<EalConfig, ConfigError> {
    let Some(main) = secondary.first() else {
        return Err(ConfigError::Alloc {
            node,
            source: AllocError::Insufficient {
                requested: 1,
                available: 0,
            },
        });
    };
    Ok(EalConfig {
        cores: primary.iter().chain(secondary).copied().collect(),
        lcore_main: *main,
    })
}

/// The forwarder's activation plan.
///
/// Primary cores go to receive (one per queue of both faces), transmit and forwarding threads,
/// in that order.  The first secondary core runs the main loop and the second one crypto.
pub fn forwarder_plan(
    env: &ForwarderEnv,
    opts: &BenchmarkOptions,
) -> Result<ActivationPlan, ConfigError> {
    const NODE: &str = "forwarder";
    let rx: usize = Label::ALL
        .iter()
        .map(|l| usize::from(opts.rx_queues(*l)))
        .sum();
    let mut lcore_alloc = ResourceAllocator::new(&env.cores_primary)
        .allocate(&[
            (LCoreRole::Rx, rx),
            (LCoreRole::Tx, FORWARDER_TX_CORES),
            (LCoreRole::Fwd, opts.n_fwds),
        ])
        .map_err(|source| ConfigError::Alloc { node: NODE, source })?;
    // secondary[0] is the main lcore
    let secondary = ResourceAllocator::new(&env.cores_secondary)
        .take(2)
        .map_err(|source| ConfigError::Alloc { node: NODE, source })?;
    lcore_alloc.insert(LCoreRole::Crypto, vec![secondary[1]]);

    let mempool = MempoolConfig::from_iter([
        (PoolTemplate::Direct, FW_DIRECT),
        (PoolTemplate::Indirect, FW_INDIRECT),
    ]);
    Ok(ActivationPlan::Forwarder(Box::new(ActivateFwArgs {
        eal: eal(NODE, &env.cores_primary, &env.cores_secondary)?,
        lcore_alloc,
        mempool,
        ndt: NdtConfig { prefix_len: 2 },
        fib: FibConfig { start_depth: 4 },
        pcct: PcctConfig {
            pcct_capacity: 65535,
            cs_memory_capacity: 4096,
            cs_indirect_capacity: 4096,
        },
        fwd_interest_queue: QueueConfig {
            dequeue_burst_size: 32,
        },
        fwd_data_queue: QueueConfig {
            dequeue_burst_size: 64,
        },
        fwd_nack_queue: QueueConfig {
            dequeue_burst_size: 64,
        },
    })))
}

/// A traffic generator's activation plan: all its cores, main loop on the first secondary core.
pub fn traffic_gen_plan(env: &GenEnv) -> Result<ActivationPlan, ConfigError> {
    let mempool = MempoolConfig::from_iter([
        (PoolTemplate::Direct, GEN_DIRECT),
        (PoolTemplate::Indirect, GEN_INDIRECT),
        (PoolTemplate::Payload, GEN_PAYLOAD),
    ]);
    Ok(ActivationPlan::TrafficGen(ActivateGenArgs {
        eal: eal("traffic generator", &env.cores_primary, &env.cores_secondary)?,
        mempool,
    }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod test {
    use super::*;
    use net::port::PortSpec;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn cores(ids: impl IntoIterator<Item = u32>) -> Vec<LCoreId> {
        ids.into_iter().map(LCoreId).collect()
    }

    fn forwarder_env(primary: u32) -> ForwarderEnv {
        let port: PortSpec = "04:00.0".parse().unwrap();
        ForwarderEnv {
            gql_server: "http://f/".into(),
            ports: crate::label::LabelMap::new(port, port),
            cores_primary: cores(0..primary),
            cores_secondary: cores([40, 41]),
        }
    }

    #[test]
    fn forwarder_lcore_alloc() {
        let opts = BenchmarkOptions {
            face_a_rx_queues: 2,
            n_fwds: 3,
            ..BenchmarkOptions::default()
        };
        let plan = forwarder_plan(&forwarder_env(8), &opts).unwrap();
        let json = plan.to_json().unwrap();
        assert_eq!(
            json["lcoreAlloc"],
            json!({ "RX": [0, 1, 2], "TX": [3, 4], "FWD": [5, 6, 7], "CRYPTO": [41] })
        );
        assert_eq!(json["eal"]["lcoreMain"], 40);
        assert_eq!(json["eal"]["cores"].as_array().unwrap().len(), 10);
        assert_eq!(
            json["mempool"],
            json!({ "DIRECT": { "capacity": 1_048_575, "dataroom": 9146 }, "INDIRECT": { "capacity": 2_097_151 } })
        );
        assert_eq!(json["pcct"]["csIndirectCapacity"], 4096);
        assert_eq!(json["fwdNackQueue"]["dequeueBurstSize"], 64);
    }

    #[test]
    fn forwarder_needs_enough_cores() {
        let opts = BenchmarkOptions::default();
        assert_eq!(
            forwarder_plan(&forwarder_env(7), &opts),
            Err(ConfigError::Alloc {
                node: "forwarder",
                source: AllocError::Insufficient {
                    requested: 8,
                    available: 7
                }
            })
        );
        let mut env = forwarder_env(8);
        env.cores_secondary.truncate(1);
        assert!(forwarder_plan(&env, &opts).is_err());
    }

    #[test]
    fn traffic_gen_pools() {
        let env = GenEnv {
            gql_server: "http://a/".into(),
            port: "05:00.0".parse().unwrap(),
            cores_primary: cores([1, 2]),
            cores_secondary: cores([3]),
            fileserver_path: "/srv".into(),
        };
        let json = traffic_gen_plan(&env).unwrap().to_json().unwrap();
        assert_eq!(json["eal"], json!({ "cores": [1, 2, 3], "lcoreMain": 3 }));
        assert_eq!(json["mempool"]["PAYLOAD"], json!({ "capacity": 16383 }));
    }
}
