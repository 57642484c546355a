// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! VLAN tag validation.

use tracing::instrument;

/// An 802.1Q VLAN tag as carried in a face locator.
///
/// Unlike a strict VLAN identifier, tag `0` is representable: it denotes a priority-tagged
/// frame.  An untagged face is represented by the *absence* of a [`Vlan`] (i.e.
/// `Option<Vlan>::None`), never by tag `0`.
#[repr(transparent)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "u16", into = "u16"))]
pub struct Vlan(u16);

/// Errors which can occur when converting a `u16` to a validated [`Vlan`]
#[derive(Copy, Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[must_use]
pub enum InvalidVlan {
    /// 4095 is a reserved VLAN id.
    #[error("4095 is a reserved vlan")]
    Reserved,
    /// The value is too large to be a legal [`Vlan`] (12-bit max).
    #[error("{0} is too large to be a legal vlan ({MAX} is max legal value)", MAX = Vlan::MAX.to_u16())]
    TooLarge(u16),
}

impl InvalidVlan {
    /// The raw `u16` value of the reserved (4095) tag
    pub const RESERVED: u16 = 4095;
    /// The raw `u16` value of the first truly nonsensical tag (4096)
    pub const TOO_LARGE: u16 = Self::RESERVED + 1;
}

impl Vlan {
    /// The priority tag (0).
    pub const PRIORITY: Vlan = Vlan(0);

    /// The maximum legal [`Vlan`] value (2^12 - 2).
    pub const MAX: Vlan = Vlan(4094);

    /// Create a new [`Vlan`] from a `u16`.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is 4095 (reserved) or greater than [`Vlan::MAX`].
    #[instrument(level = "trace")]
    pub fn new(tag: u16) -> Result<Self, InvalidVlan> {
        match tag {
            InvalidVlan::RESERVED => Err(InvalidVlan::Reserved),
            InvalidVlan::TOO_LARGE.. => Err(InvalidVlan::TooLarge(tag)),
            _ => Ok(Vlan(tag)),
        }
    }

    /// Get the value of the [`Vlan`] as a `u16`.
    #[must_use]
    pub const fn to_u16(self) -> u16 {
        self.0
    }
}

impl From<Vlan> for u16 {
    fn from(vlan: Vlan) -> u16 {
        vlan.to_u16()
    }
}

impl TryFrom<u16> for Vlan {
    type Error = InvalidVlan;

    fn try_from(tag: u16) -> Result<Vlan, Self::Error> {
        Vlan::new(tag)
    }
}

impl core::fmt::Display for Vlan {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.to_u16())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod test {
    use super::*;

    #[test]
    fn zero_is_the_priority_tag() {
        assert_eq!(Vlan::new(0).unwrap(), Vlan::PRIORITY);
    }

    #[test]
    fn vlan_parse_contract() {
        bolero::check!()
            .with_type()
            .cloned()
            .for_each(|raw: u16| match Vlan::new(raw) {
                Ok(vlan) => {
                    assert_eq!(vlan.to_u16(), raw);
                    assert!(vlan <= Vlan::MAX);
                }
                Err(InvalidVlan::Reserved) => assert_eq!(raw, 4095),
                Err(InvalidVlan::TooLarge(x)) => {
                    assert_eq!(x, raw);
                    assert!(raw >= InvalidVlan::TOO_LARGE);
                }
            });
    }
}
