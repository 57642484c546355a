// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Control connections to the three logical nodes.

use crate::env::ServerEnv;
use crate::label::{Label, LabelMap};
use control::api::{FwControl, GenControl};
use control::error::ControlError;
use control::gql::{GqlControl, GqlOptions};
use std::sync::Arc;
use tracing::debug;

/// The forwarder connection plus one traffic generator connection per label.
///
/// When both labels name the same traffic generator server, they share one connection.
pub struct Connections {
    forwarder: Arc<dyn FwControl>,
    generators: LabelMap<Arc<dyn GenControl>>,
    shared: bool,
}

impl Connections {
    /// Wire up connections, creating generator connections with `connect(url)`.
    ///
    /// `connect` is called once per distinct generator URL.
    pub fn new(
        env: &ServerEnv,
        forwarder: Arc<dyn FwControl>,
        mut connect: impl FnMut(&str) -> Result<Arc<dyn GenControl>, ControlError>,
    ) -> Result<Self, ControlError> {
        let a = connect(&env.generator(Label::A).gql_server)?;
        let shared = env.generators_shared();
        let b = if shared {
            debug!("A and B share traffic generator {}", a.endpoint());
            Arc::clone(&a)
        } else {
            connect(&env.generator(Label::B).gql_server)?
        };
        Ok(Self {
            forwarder,
            generators: LabelMap::new(a, b),
            shared,
        })
    }

    /// GraphQL connections to every node of `env`.
    pub fn gql(env: &ServerEnv, options: &GqlOptions) -> Result<Self, ControlError> {
        let forwarder = Arc::new(GqlControl::new(&env.forwarder.gql_server, options.clone())?);
        Self::new(env, forwarder, |url| {
            Ok(Arc::new(GqlControl::new(url, options.clone())?) as Arc<dyn GenControl>)
        })
    }

    #[must_use]
    pub fn forwarder(&self) -> &dyn FwControl {
        self.forwarder.as_ref()
    }

    #[must_use]
    pub fn generator(&self, label: Label) -> &dyn GenControl {
        self.generators[label].as_ref()
    }

    #[must_use]
    pub fn shared(&self) -> bool {
        self.shared
    }

    /// Each distinct generator node with the labels it serves.
    #[must_use]
    pub fn generator_nodes(&self) -> Vec<(&dyn GenControl, Vec<Label>)> {
        if self.shared {
            vec![(self.generator(Label::A), Label::ALL.to_vec())]
        } else {
            Label::ALL
                .iter()
                .map(|l| (self.generator(*l), vec![*l]))
                .collect()
        }
    }

    /// Close every connection.  In-flight calls fail.
    pub fn close_all(&self) {
        self.forwarder.close();
        for (_, generator) in self.generators.iter() {
            generator.close();
        }
    }
}
