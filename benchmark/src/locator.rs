// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Face locators for both ends of each forwarder to traffic generator link.

use crate::label::Label;
use crate::options::{BenchmarkOptions, FaceScheme};
use control::api::Control;
use control::error::ControlError;
use control::locator::{EtherLocator, FaceLocator, MemifLocator, MemifRole, VxlanLocator};
use net::eth::Mac;
use net::port::PortSpec;
use net::vxlan::Vni;
use std::net::Ipv4Addr;
use tracing::debug;

pub const MEMIF_SOCKET: &str = "/run/ndn/ndndpdk-benchmark-memif.sock";
pub const MEMIF_DATAROOM: u16 = 9000;

const VXLAN_IP: Ipv4Addr = Ipv4Addr::new(192, 168, 118, 0);
const VXLAN_INNER_MAC: Mac = Mac([0x02, 0x00, 0x00, 0xff, 0xff, 0xff]);

/// Which end of a link a locator describes.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Side {
    Forwarder,
    Generator,
}

impl Side {
    #[must_use]
    pub const fn other(self) -> Side {
        match self {
            Side::Forwarder => Side::Generator,
            Side::Generator => Side::Forwarder,
        }
    }

    const fn mac_octet(self) -> u8 {
        match self {
            Side::Forwarder => 0x00,
            Side::Generator => 0x01,
        }
    }
}

/// The address of `side` on the link of `label`: `02:00:00:00:XX:LL`.
pub fn link_mac(side: Side, label: Label) -> Mac {
    Mac([0x02, 0x00, 0x00, 0x00, side.mac_octet(), label.code_point()])
}

/// The (local, remote) addresses seen from `side`.
pub fn link_macs(side: Side, label: Label) -> (Mac, Mac) {
    (link_mac(side, label), link_mac(side.other(), label))
}

#[must_use]
pub fn memif_locator(side: Side, label: Label) -> MemifLocator {
    MemifLocator {
        role: match side {
            Side::Forwarder => MemifRole::Server,
            Side::Generator => MemifRole::Client,
        },
        socket_name: MEMIF_SOCKET.to_owned(),
        id: u32::from(label.code_point()),
        dataroom: MEMIF_DATAROOM,
    }
}

/// Builds locators according to each face's configured scheme.
#[derive(Copy, Clone, Debug)]
pub struct LocatorBuilder<'a> {
    opts: &'a BenchmarkOptions,
}

impl<'a> LocatorBuilder<'a> {
    #[must_use]
    pub fn new(opts: &'a BenchmarkOptions) -> Self {
        Self { opts }
    }

    /// Build the locator for the `side` end of the `label` link.
    ///
    /// Ethernet based schemes register `port` on the node behind `control` first.
    pub async fn build<C: Control + ?Sized>(
        &self,
        control: &C,
        side: Side,
        label: Label,
        port: &PortSpec,
    ) -> Result<FaceLocator, ControlError> {
        let scheme = self.opts.scheme(label);
        if scheme == FaceScheme::Memif {
            return Ok(FaceLocator::Memif(memif_locator(side, label)));
        }

        let port_id = control.create_eth_port(&port.address).await?;
        debug!("{}: port {} registered as {port_id}", control.endpoint(), port.address);
        let (local, remote) = link_macs(side, label);
        let ether = EtherLocator {
            port: port_id,
            n_rx_queues: self.opts.rx_queues(label),
            local,
            remote,
            vlan: port.vlan,
        };
        Ok(match scheme {
            FaceScheme::Vxlan => FaceLocator::Vxlan(VxlanLocator {
                ether,
                local_ip: VXLAN_IP,
                remote_ip: VXLAN_IP,
                vxlan: Vni::ZERO,
                inner_local: VXLAN_INNER_MAC,
                inner_remote: VXLAN_INNER_MAC,
            }),
            _ => FaceLocator::Ether(ether),
        })
    }
}
