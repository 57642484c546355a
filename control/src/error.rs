// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Errors reported by control-plane connections.

/// The type of errors that can happen when issuing requests to a remote node.
///
/// None of these are retried by the caller; any of them aborts the current setup or run phase.
#[derive(Debug, thiserror::Error)]
pub enum ControlError {
    #[error("control connection to {0} is closed")]
    Closed(String),
    #[error("transport failure talking to {endpoint}: {source}")]
    Http {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{endpoint} answered {operation} with HTTP status {status}")]
    Status {
        endpoint: String,
        operation: &'static str,
        status: u16,
    },
    #[error("{operation} rejected: {messages}")]
    Rejected {
        operation: &'static str,
        messages: String,
    },
    #[error("cannot decode {operation} response: {source}")]
    Decode {
        operation: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("{operation} response lacks {field}")]
    MissingField {
        operation: &'static str,
        field: &'static str,
    },
    #[error("{endpoint} did not come back within {seconds}s after restart")]
    RestartTimeout { endpoint: String, seconds: u64 },
    #[error("invalid endpoint '{0}'")]
    InvalidEndpoint(String),
}
