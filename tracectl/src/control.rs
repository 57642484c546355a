// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The process-wide tracing subscriber and its level control.

use crate::levels::TracingLevels;
use std::sync::{Mutex, OnceLock, PoisonError};
use tracing_subscriber::filter::{LevelFilter, Targets};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{Registry, reload};

pub const DEFAULT_DEFAULT_LOGLEVEL: LevelFilter = LevelFilter::INFO;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TraceCtlError {
    #[error("invalid tracing directive '{0}': expected tag=level")]
    InvalidDirective(String),
    #[error("invalid level '{1}' for tag '{0}'")]
    InvalidLevel(String, String),
    #[error("failed to reload tracing filter: {0}")]
    ReloadFailure(String),
}

/// Owner of the global subscriber's filter.
pub struct TracingControl {
    levels: Mutex<TracingLevels>,
    reload: Option<reload::Handle<Targets, Registry>>,
}

static TRACING_CTL: OnceLock<TracingControl> = OnceLock::new();

/// Get the tracing control, installing the global subscriber on first use.
///
/// If another subscriber is already installed (as in tests), levels are still tracked but have
/// no effect.
pub fn get_trace_ctl() -> &'static TracingControl {
    TRACING_CTL.get_or_init(TracingControl::install)
}

impl TracingControl {
    fn install() -> Self {
        let levels = TracingLevels::new(DEFAULT_DEFAULT_LOGLEVEL);
        let (filter, handle) = reload::Layer::new(levels.to_targets());
        let fmt = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_thread_names(true);
        let reload = tracing_subscriber::registry()
            .with(filter)
            .with(fmt)
            .try_init()
            .is_ok()
            .then_some(handle);
        Self {
            levels: Mutex::new(levels),
            reload,
        }
    }

    fn update(&self, f: impl FnOnce(&mut TracingLevels) -> Result<(), TraceCtlError>) -> Result<(), TraceCtlError> {
        let mut levels = self.levels.lock().unwrap_or_else(PoisonError::into_inner);
        let mut next = levels.clone();
        f(&mut next)?;
        if let Some(handle) = &self.reload {
            handle
                .reload(next.to_targets())
                .map_err(|e| TraceCtlError::ReloadFailure(e.to_string()))?;
        }
        *levels = next;
        Ok(())
    }

    pub fn set_default_level(&self, level: LevelFilter) -> Result<(), TraceCtlError> {
        self.update(|levels| {
            levels.default = level;
            Ok(())
        })
    }

    /// Apply `tag=level` directives, e.g. `default=info,benchmark=debug`.
    pub fn setup_from_string(&self, input: &str) -> Result<(), TraceCtlError> {
        self.update(|levels| levels.apply(input))
    }

    /// The current configuration in the form accepted by [`TracingControl::setup_from_string`].
    #[must_use]
    pub fn as_config_string(&self) -> String {
        self.levels
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .to_string()
    }
}
