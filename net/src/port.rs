// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Physical port specifications: a PCI address with an optional VLAN suffix.

use crate::pci::{InvalidPciAddress, PciAddress};
use crate::vlan::{InvalidVlan, Vlan};
use core::fmt::{Display, Formatter};
use core::str::FromStr;

/// A physical port, written `<pci-address>[+<vlan>]`.
///
/// `04:00.0` is an untagged port, `04:00.0+0` a priority tagged one and `04:00.0+100` a port
/// on VLAN 100.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "String", into = "String"))]
pub struct PortSpec {
    /// The PCI address of the network adapter.
    pub address: PciAddress,
    /// The VLAN tag, or `None` for an untagged port.
    pub vlan: Option<Vlan>,
}

/// Errors which can occur while parsing a [`PortSpec`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidPortSpec {
    #[error(transparent)]
    Address(#[from] InvalidPciAddress),
    #[error("invalid vlan suffix '{0}'")]
    VlanSyntax(String),
    #[error(transparent)]
    Vlan(#[from] InvalidVlan),
}

impl FromStr for PortSpec {
    type Err = InvalidPortSpec;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (address, vlan) = match s.split_once('+') {
            None => (s, None),
            Some((address, vlan)) => {
                let tag = vlan
                    .parse::<u16>()
                    .map_err(|_| InvalidPortSpec::VlanSyntax(vlan.to_owned()))?;
                (address, Some(Vlan::new(tag)?))
            }
        };
        Ok(PortSpec {
            address: address.parse()?,
            vlan,
        })
    }
}

impl Display for PortSpec {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        match self.vlan {
            None => write!(f, "{}", self.address),
            Some(vlan) => write!(f, "{}+{vlan}", self.address),
        }
    }
}

impl TryFrom<String> for PortSpec {
    type Error = InvalidPortSpec;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        PortSpec::from_str(&value)
    }
}

impl From<PortSpec> for String {
    fn from(value: PortSpec) -> Self {
        value.to_string()
    }
}
