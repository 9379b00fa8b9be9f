// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};

use async_trait::async_trait;
use tokio::net::UdpSocket;
use tracing::{debug, trace};

use crate::errors::SinkError;
use crate::sink::MetricSink;
use crate::tags::ExcludedTags;
use crate::wire::{encode, MetricType};

/// UDP client for a statsd-compatible aggregator.
///
/// One datagram is written per call; nothing is buffered or retried.
#[derive(Debug)]
pub struct StatsdClient {
    socket: UdpSocket,
    target: SocketAddr,
    excluded_tags: ExcludedTags,
}

impl StatsdClient {
    /// Resolves `addr` (`host:port`) and connects a local UDP socket to it.
    pub async fn new(addr: &str, excluded_tags: ExcludedTags) -> Result<Self, SinkError> {
        let target = tokio::net::lookup_host(addr)
            .await
            .map_err(|e| SinkError::InvalidAddress {
                addr: addr.to_string(),
                reason: e.to_string(),
            })?
            .next()
            .ok_or_else(|| SinkError::InvalidAddress {
                addr: addr.to_string(),
                reason: "no address resolved".to_string(),
            })?;

        let local = if target.is_ipv4() {
            SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0))
        } else {
            SocketAddr::from((Ipv6Addr::UNSPECIFIED, 0))
        };
        let socket = UdpSocket::bind(local).await.map_err(SinkError::Bind)?;
        socket.connect(target).await.map_err(SinkError::Bind)?;

        debug!(
            "statsd client connected to {} ({} excluded tags)",
            target,
            excluded_tags.len()
        );

        Ok(Self {
            socket,
            target,
            excluded_tags,
        })
    }

    /// Address datagrams are sent to.
    pub fn target(&self) -> SocketAddr {
        self.target
    }

    pub fn excluded_tags(&self) -> &ExcludedTags {
        &self.excluded_tags
    }

    async fn send(
        &self,
        metric_type: MetricType,
        name: &str,
        value: f64,
        tags: &[String],
    ) -> Result<(), SinkError> {
        let line = encode(metric_type, name, value, tags);
        trace!("Sending {}", line);
        self.socket
            .send(line.as_bytes())
            .await
            .map(|_| ())
            .map_err(|source| SinkError::Send {
                metric: name.to_string(),
                source,
            })
    }
}

#[async_trait]
impl MetricSink for StatsdClient {
    async fn count(&self, name: &str, value: f64, tags: &[String]) -> Result<(), SinkError> {
        self.send(MetricType::Count, name, value, tags).await
    }

    async fn gauge(&self, name: &str, value: f64, tags: &[String]) -> Result<(), SinkError> {
        self.send(MetricType::Gauge, name, value, tags).await
    }

    async fn timing(&self, name: &str, value_ms: f64, tags: &[String]) -> Result<(), SinkError> {
        self.send(MetricType::Timing, name, value_ms, tags).await
    }

    fn is_excluded(&self, tag: &str) -> bool {
        self.excluded_tags.contains(tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_new_rejects_address_without_port() {
        let result = StatsdClient::new("localhost", ExcludedTags::default()).await;
        assert!(matches!(result, Err(SinkError::InvalidAddress { .. })));
    }

    #[tokio::test]
    async fn test_is_excluded_uses_configured_set() {
        let client = StatsdClient::new("127.0.0.1:8125", ExcludedTags::parse("dyno:web.1"))
            .await
            .expect("client creation failed");
        assert!(client.is_excluded("dyno:web.1"));
        assert!(!client.is_excluded("app:web"));
        assert_eq!(client.target(), "127.0.0.1:8125".parse().unwrap());
    }
}
