// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Mac address type and logic.

use core::fmt::{Display, Formatter};
use core::str::FromStr;

/// A [MAC Address] type.
///
/// `Mac` is a transparent wrapper around `[u8; 6]` which provides a
/// small collection of methods and type safety.
///
/// The textual form is six lowercase hex octets separated by colons, which is also the form
/// used when a [`Mac`] is serialized.
///
/// [MAC Address]: https://en.wikipedia.org/wiki/MAC_address
#[must_use]
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(any(feature = "bolero", test), derive(bolero::TypeGenerator))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "String", into = "String"))]
pub struct Mac(pub [u8; 6]);

impl From<[u8; 6]> for Mac {
    fn from(value: [u8; 6]) -> Self {
        Mac(value)
    }
}

impl From<Mac> for [u8; 6] {
    fn from(value: Mac) -> Self {
        value.0
    }
}

impl AsRef<[u8; 6]> for Mac {
    #[must_use]
    fn as_ref(&self) -> &[u8; 6] {
        &self.0
    }
}

impl Display for Mac {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02x}:{b:02x}:{c:02x}:{d:02x}:{e:02x}:{g:02x}")
    }
}

/// Errors which can occur while parsing a [`Mac`] from text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidMac {
    /// The text does not have exactly six colon separated octets.
    #[error("invalid mac address '{0}': expected six colon separated octets")]
    OctetCount(String),
    /// One of the octets is not a two digit hex number.
    #[error("invalid mac address '{0}': bad octet '{1}'")]
    BadOctet(String, String),
}

impl FromStr for Mac {
    type Err = InvalidMac;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut octets = [0u8; 6];
        let mut count = 0;
        for part in s.split(':') {
            if count == octets.len() {
                return Err(InvalidMac::OctetCount(s.to_owned()));
            }
            if part.len() != 2 {
                return Err(InvalidMac::BadOctet(s.to_owned(), part.to_owned()));
            }
            octets[count] = u8::from_str_radix(part, 16)
                .map_err(|_| InvalidMac::BadOctet(s.to_owned(), part.to_owned()))?;
            count += 1;
        }
        if count != octets.len() {
            return Err(InvalidMac::OctetCount(s.to_owned()));
        }
        Ok(Mac(octets))
    }
}

impl TryFrom<String> for Mac {
    type Error = InvalidMac;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Mac::from_str(&value)
    }
}

impl From<Mac> for String {
    fn from(value: Mac) -> Self {
        value.to_string()
    }
}
