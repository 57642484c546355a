// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Hand-off of forwarder faces to the traffic generators that connect to them.

use crate::error::BenchmarkError;
use crate::label::{Label, LabelMap};
use control::ids::FaceId;
use tokio::sync::watch;
use tracing::trace;

#[derive(Clone, Debug, PartialEq, Eq)]
enum FaceState {
    Pending,
    Ready(FaceId),
    Abandoned,
}

/// One watch channel per label, written by forwarder activation.
#[derive(Debug)]
pub struct FaceReadiness {
    faces: LabelMap<watch::Sender<FaceState>>,
}

impl Default for FaceReadiness {
    fn default() -> Self {
        Self::new()
    }
}

impl FaceReadiness {
    #[must_use]
    pub fn new() -> Self {
        Self {
            faces: LabelMap::from_fn(|_| watch::Sender::new(FaceState::Pending)),
        }
    }

    /// Announce that the forwarder face for `label` exists.
    pub fn publish(&self, label: Label, face: FaceId) {
        trace!("forwarder face for {label} is ready: {face}");
        self.faces[label].send_replace(FaceState::Ready(face));
    }

    /// Release all waiters of faces that were not published; they fail.
    pub fn abandon(&self) {
        for (_, sender) in self.faces.iter() {
            sender.send_if_modified(|state| {
                if *state == FaceState::Pending {
                    *state = FaceState::Abandoned;
                    true
                } else {
                    false
                }
            });
        }
    }

    /// Wait until the forwarder face for `label` is published.
    pub async fn wait(&self, label: Label) -> Result<FaceId, BenchmarkError> {
        let mut receiver = self.faces[label].subscribe();
        let state = receiver
            .wait_for(|state| *state != FaceState::Pending)
            .await
            .map_err(|_| BenchmarkError::FaceUnavailable(label))?;
        match &*state {
            FaceState::Ready(face) => Ok(face.clone()),
            _ => Err(BenchmarkError::FaceUnavailable(label)),
        }
    }
}
