// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Names in URI form, as accepted by the control plane.

use core::fmt::{Display, Formatter};
use serde::{Deserialize, Serialize};

/// A hierarchical name in URI form, e.g. `/A/0/713`.
///
/// Components are kept in their textual (already escaped) form; this type never parses
/// the TLV structure of a component.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Name(String);

impl Name {
    /// The name with zero components.
    #[must_use]
    pub fn root() -> Name {
        Name(String::new())
    }

    /// Append one component.
    #[must_use]
    pub fn push(mut self, component: impl Display) -> Name {
        use core::fmt::Write;
        let _ = write!(self.0, "/{component}");
        self
    }

    /// The number of components.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.split('/').filter(|c| !c.is_empty()).count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        if self.0.is_empty() { "/" } else { &self.0 }
    }
}

impl Display for Name {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}
