// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Traffic generator endpoint labels.

use core::fmt::{Display, Formatter};
use core::ops::{Index, IndexMut};
use serde::{Deserialize, Serialize};

/// One of the two traffic generator endpoints attached to the forwarder.
///
/// The label doubles as the first name component of everything the endpoint produces.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Label {
    A,
    B,
}

impl Label {
    pub const ALL: [Label; 2] = [Label::A, Label::B];

    /// The label's character code, used in MAC addresses and memif ids.
    #[must_use]
    pub const fn code_point(self) -> u8 {
        match self {
            Label::A => b'A',
            Label::B => b'B',
        }
    }

    /// The endpoint on the other side of the forwarder.
    #[must_use]
    pub const fn peer(self) -> Label {
        match self {
            Label::A => Label::B,
            Label::B => Label::A,
        }
    }

    const fn index(self) -> usize {
        match self {
            Label::A => 0,
            Label::B => 1,
        }
    }
}

impl Display for Label {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        match self {
            Label::A => f.write_str("A"),
            Label::B => f.write_str("B"),
        }
    }
}

/// One value per [`Label`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelMap<T> {
    #[serde(rename = "A")]
    a: T,
    #[serde(rename = "B")]
    b: T,
}

impl<T> LabelMap<T> {
    pub const fn new(a: T, b: T) -> Self {
        Self { a, b }
    }

    pub fn from_fn(mut f: impl FnMut(Label) -> T) -> Self {
        Self {
            a: f(Label::A),
            b: f(Label::B),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Label, &T)> {
        [(Label::A, &self.a), (Label::B, &self.b)].into_iter()
    }

    pub fn map<U>(self, mut f: impl FnMut(Label, T) -> U) -> LabelMap<U> {
        LabelMap {
            a: f(Label::A, self.a),
            b: f(Label::B, self.b),
        }
    }
}

impl<T> Index<Label> for LabelMap<T> {
    type Output = T;

    fn index(&self, label: Label) -> &T {
        match label.index() {
            0 => &self.a,
            _ => &self.b,
        }
    }
}

impl<T> IndexMut<Label> for LabelMap<T> {
    fn index_mut(&mut self, label: Label) -> &mut T {
        match label.index() {
            0 => &mut self.a,
            _ => &mut self.b,
        }
    }
}

/// A producer and the endpoint fetching from it.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct Direction {
    pub producer: Label,
    pub consumer: Label,
}

impl Direction {
    #[must_use]
    pub const fn from_producer(producer: Label) -> Self {
        Self {
            producer,
            consumer: producer.peer(),
        }
    }
}

impl Display for Direction {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}->{}", self.producer, self.consumer)
    }
}
