// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

/// A [VXLAN][RFC7348] Network Identifier.
///
/// A `Vni` is a 24-bit value that identifies a VXLAN [overlay network].
///
/// # Legal values
///
/// * Value `0` is accepted here.  Many EVPN implementations reserve it, but a point-to-point
///   benchmark tunnel has no such restriction and the forwarder treats it as any other VNI.
/// * The maximum legal value is <var>2<sup>24</sup> - 1 = 16,777,215 = `0x00_FF_FF_FF`</var>.
///
/// [RFC7348]: https://datatracker.ietf.org/doc/html/rfc7348#section-5
/// [overlay network]: https://en.wikipedia.org/wiki/Overlay_network
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "serde", serde(try_from = "u32", into = "u32"))]
#[repr(transparent)]
pub struct Vni(u32);

impl Vni {
    /// The zero [`Vni`].
    pub const ZERO: Vni = Vni(0);
    /// The maximum legal [`Vni`] value (2<sup>24</sup> - 1).
    pub const MAX: u32 = 0x00_FF_FF_FF;
    /// First value which is too large to be a legal [`Vni`]
    #[allow(unused)] // used in test suite
    const TOO_LARGE: u32 = Vni::MAX + 1;

    /// Create a new [`Vni`] from a `u32`.
    ///
    /// # Errors
    ///
    /// Returns an [`InvalidVni`] error if the value is greater than [`Vni::MAX`].
    pub fn new(vni: u32) -> Result<Vni, InvalidVni> {
        if vni > Vni::MAX {
            return Err(InvalidVni::TooLarge(vni));
        }
        Ok(Vni(vni))
    }

    /// Get the value of the [`Vni`] as a `u32`.
    #[must_use]
    pub fn as_u32(self) -> u32 {
        self.0
    }
}

/// Errors that can occur when converting a `u32` to a [`Vni`]
#[must_use]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, thiserror::Error)]
pub enum InvalidVni {
    /// This error type contains the (illegal) value used to attempt creation of a [`Vni`].
    /// The max legal value is found in [`Vni::MAX`].
    #[error("The value {0} is too large to be a Vni (max is {MAX})", MAX = Vni::MAX)]
    TooLarge(u32),
}

impl From<Vni> for u32 {
    fn from(vni: Vni) -> u32 {
        vni.as_u32()
    }
}

impl TryFrom<u32> for Vni {
    type Error = InvalidVni;

    fn try_from(vni: u32) -> Result<Vni, Self::Error> {
        Vni::new(vni)
    }
}
