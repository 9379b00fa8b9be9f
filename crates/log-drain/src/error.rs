// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::time::Duration;

use statsd_sink::SinkError;

/// Errors raised while loading configuration. All of them are fatal at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable {0}")]
    Missing(&'static str),

    #[error("Invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// Errors raised while compiling an extraction rule.
#[derive(Debug, thiserror::Error)]
pub enum RuleError {
    #[error("rule key cannot be empty")]
    EmptyKey,

    #[error("invalid rule pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("malformed rule: {0}")]
    Malformed(String),
}

/// Errors that stop the drain service.
#[derive(Debug, thiserror::Error)]
pub enum DrainError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to start statsd client: {0}")]
    Sink(#[from] SinkError),

    #[error("Failed to bind HTTP listener on port {port}: {source}")]
    Bind {
        port: u16,
        #[source]
        source: std::io::Error,
    },

    #[error("HTTP server error: {0}")]
    Serve(std::io::Error),

    #[error("Pipeline did not drain within {0:?}")]
    ShutdownTimeout(Duration),

    #[error("Pipeline stage failed: {0}")]
    StageFailed(String),
}
