// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! PCI addresses of physical network ports.

use core::fmt::{Display, Formatter};
use core::str::FromStr;

/// A PCI address in domain:bus:device.function form.
///
/// The domain may be omitted when parsing (`04:00.0` is the same device as `0000:04:00.0`).
/// The canonical (displayed and serialized) form always includes the domain.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "String", into = "String"))]
pub struct PciAddress {
    domain: u16,
    bus: u8,
    device: u8,
    function: u8,
}

/// Errors which can occur while parsing a [`PciAddress`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidPciAddress {
    /// The text does not follow the `[domain:]bus:device.function` layout.
    #[error("invalid pci address '{0}': expected [dddd:]bb:dd.f")]
    Syntax(String),
    /// A field is not a hex number of the right width.
    #[error("invalid pci address '{0}': bad {1} field")]
    Field(String, &'static str),
    /// Device numbers are 5 bits wide.
    #[error("invalid pci address '{0}': device {1:#x} exceeds 0x1f")]
    DeviceTooLarge(String, u8),
    /// Function numbers are 3 bits wide.
    #[error("invalid pci address '{0}': function {1} exceeds 7")]
    FunctionTooLarge(String, u8),
}

impl PciAddress {
    /// The largest legal device number.
    pub const MAX_DEVICE: u8 = 0x1f;
    /// The largest legal function number.
    pub const MAX_FUNCTION: u8 = 7;

    /// Build a [`PciAddress`] from its components.
    ///
    /// # Errors
    ///
    /// Returns an error if the device or function number is out of range.
    pub fn new(domain: u16, bus: u8, device: u8, function: u8) -> Result<Self, InvalidPciAddress> {
        let this = PciAddress {
            domain,
            bus,
            device,
            function,
        };
        if device > Self::MAX_DEVICE {
            return Err(InvalidPciAddress::DeviceTooLarge(this.to_string(), device));
        }
        if function > Self::MAX_FUNCTION {
            return Err(InvalidPciAddress::FunctionTooLarge(this.to_string(), function));
        }
        Ok(this)
    }

    #[must_use]
    pub fn domain(&self) -> u16 {
        self.domain
    }

    #[must_use]
    pub fn bus(&self) -> u8 {
        self.bus
    }

    #[must_use]
    pub fn device(&self) -> u8 {
        self.device
    }

    #[must_use]
    pub fn function(&self) -> u8 {
        self.function
    }
}

impl Display for PciAddress {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "{:04x}:{:02x}:{:02x}.{:x}",
            self.domain, self.bus, self.device, self.function
        )
    }
}

fn hex_field<T: TryFrom<u32>>(
    input: &str,
    field: &str,
    width: usize,
    name: &'static str,
) -> Result<T, InvalidPciAddress> {
    if field.is_empty() || field.len() > width {
        return Err(InvalidPciAddress::Field(input.to_owned(), name));
    }
    u32::from_str_radix(field, 16)
        .ok()
        .and_then(|v| T::try_from(v).ok())
        .ok_or_else(|| InvalidPciAddress::Field(input.to_owned(), name))
}

impl FromStr for PciAddress {
    type Err = InvalidPciAddress;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (rest, function) = s
            .rsplit_once('.')
            .ok_or_else(|| InvalidPciAddress::Syntax(s.to_owned()))?;
        let parts: Vec<&str> = rest.split(':').collect();
        let (domain, bus, device) = match parts.as_slice() {
            [bus, device] => (0, *bus, *device),
            [domain, bus, device] => (hex_field(s, domain, 4, "domain")?, *bus, *device),
            _ => return Err(InvalidPciAddress::Syntax(s.to_owned())),
        };
        PciAddress::new(
            domain,
            hex_field(s, bus, 2, "bus")?,
            hex_field(s, device, 2, "device")?,
            hex_field(s, function, 1, "function")?,
        )
        .map_err(|e| match e {
            InvalidPciAddress::DeviceTooLarge(_, d) => {
                InvalidPciAddress::DeviceTooLarge(s.to_owned(), d)
            }
            InvalidPciAddress::FunctionTooLarge(_, f) => {
                InvalidPciAddress::FunctionTooLarge(s.to_owned(), f)
            }
            other => other,
        })
    }
}

impl TryFrom<&str> for PciAddress {
    type Error = InvalidPciAddress;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        PciAddress::from_str(value)
    }
}

impl TryFrom<String> for PciAddress {
    type Error = InvalidPciAddress;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        PciAddress::from_str(&value)
    }
}

impl From<PciAddress> for String {
    fn from(value: PciAddress) -> Self {
        value.to_string()
    }
}
