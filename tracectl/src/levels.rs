// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Per-tag log levels and their textual form.

use crate::control::TraceCtlError;
use core::fmt::{Display, Formatter};
use ordermap::OrderMap;
use tracing_subscriber::filter::{LevelFilter, Targets};

/// Short tags accepted in level strings and the tracing targets each one covers.
///
/// Any other tag is taken as a target (module path prefix) verbatim.
pub const TAGS: &[(&str, &[&str])] = &[
    ("benchmark", &["ndnbench_benchmark"]),
    ("control", &["ndnbench_control"]),
    ("ndnbench", &["ndnbench"]),
    ("args", &["ndnbench_args"]),
    ("http", &["reqwest", "hyper", "hyper_util"]),
];

/// One line per tag with the targets it covers.
#[must_use]
pub fn describe_tags() -> String {
    TAGS.iter()
        .map(|(tag, targets)| format!("{tag:<12}{}", targets.join(", ")))
        .collect::<Vec<_>>()
        .join("\n")
}

/// The name of the pseudo-tag that sets the default level.
pub const DEFAULT_TAG: &str = "default";

/// A default level plus per-tag overrides, in the order they were first configured.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TracingLevels {
    pub default: LevelFilter,
    pub tags: OrderMap<String, LevelFilter>,
}

fn parse_level(tag: &str, level: &str) -> Result<LevelFilter, TraceCtlError> {
    match level.trim().to_ascii_lowercase().as_str() {
        "off" => Ok(LevelFilter::OFF),
        "error" => Ok(LevelFilter::ERROR),
        "warn" | "warning" => Ok(LevelFilter::WARN),
        "info" => Ok(LevelFilter::INFO),
        "debug" => Ok(LevelFilter::DEBUG),
        "trace" => Ok(LevelFilter::TRACE),
        _ => Err(TraceCtlError::InvalidLevel(tag.to_owned(), level.to_owned())),
    }
}

impl TracingLevels {
    #[must_use]
    pub fn new(default: LevelFilter) -> Self {
        Self {
            default,
            tags: OrderMap::new(),
        }
    }

    pub fn set(&mut self, tag: &str, level: LevelFilter) {
        if tag == DEFAULT_TAG {
            self.default = level;
        } else {
            self.tags.insert(tag.to_owned(), level);
        }
    }

    /// Apply a string of the form `tag=level,tag=level`.
    ///
    /// Nothing is applied unless every directive is valid.
    pub fn apply(&mut self, input: &str) -> Result<(), TraceCtlError> {
        let mut parsed = Vec::new();
        for directive in input.split(',').map(str::trim).filter(|d| !d.is_empty()) {
            let Some((tag, level)) = directive.split_once('=') else {
                return Err(TraceCtlError::InvalidDirective(directive.to_owned()));
            };
            let tag = tag.trim();
            if tag.is_empty() {
                return Err(TraceCtlError::InvalidDirective(directive.to_owned()));
            }
            parsed.push((tag, parse_level(tag, level)?));
        }
        for (tag, level) in parsed {
            self.set(tag, level);
        }
        Ok(())
    }

    /// The filter implementing these levels.
    #[must_use]
    pub fn to_targets(&self) -> Targets {
        let mut targets = Targets::new().with_default(self.default);
        for (tag, level) in &self.tags {
            match TAGS.iter().find(|(name, _)| name == tag) {
                Some((_, covered)) => {
                    for target in *covered {
                        targets = targets.with_target(*target, *level);
                    }
                }
                None => targets = targets.with_target(tag.clone(), *level),
            }
        }
        targets
    }
}

impl Display for TracingLevels {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        write!(f, "{DEFAULT_TAG}={}", self.default)?;
        for (tag, level) in &self.tags {
            write!(f, ",{tag}={level}")?;
        }
        Ok(())
    }
}
