// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Opaque identifiers handed out by remote nodes.

use core::fmt::{Display, Formatter};
use serde::{Deserialize, Serialize};

macro_rules! opaque_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                $name(value)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                $name(value.to_owned())
            }
        }
    };
}

opaque_id!(
    /// Identifier of an Ethernet port registered on a node.
    PortId
);
opaque_id!(
    /// Identifier of a face created on a node.
    FaceId
);
opaque_id!(
    /// Identifier of a traffic generator fetcher.
    FetcherId
);
opaque_id!(
    /// Identifier of one running fetch task (one flow).
    TaskId
);

/// Index of a name dispatch table entry, as assigned by the forwarder.
pub type NdtIndex = u32;

/// A logical core number on a remote node.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LCoreId(pub u32);

impl Display for LCoreId {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for LCoreId {
    fn from(value: u32) -> Self {
        LCoreId(value)
    }
}
