// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use thiserror::Error;

/// Errors raised by the statsd client.
#[derive(Debug, Error)]
pub enum SinkError {
    /// The aggregator address could not be parsed or resolved.
    #[error("invalid statsd address {addr}: {reason}")]
    InvalidAddress { addr: String, reason: String },

    /// The local UDP socket could not be bound or connected.
    #[error("failed to open statsd socket: {0}")]
    Bind(std::io::Error),

    /// A datagram could not be written.
    #[error("failed to send metric {metric}: {source}")]
    Send {
        metric: String,
        #[source]
        source: std::io::Error,
    },
}
