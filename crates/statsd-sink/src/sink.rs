// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;

use crate::errors::SinkError;

/// Destination for tagged numeric observations, one operation per metric kind.
///
/// Every call is independent: a failure is reported to the caller and never poisons
/// later calls.
#[async_trait]
pub trait MetricSink: Send + Sync {
    /// Increments a counter by `value`.
    async fn count(&self, name: &str, value: f64, tags: &[String]) -> Result<(), SinkError>;

    /// Sets a gauge to `value`.
    async fn gauge(&self, name: &str, value: f64, tags: &[String]) -> Result<(), SinkError>;

    /// Records a duration in milliseconds.
    async fn timing(&self, name: &str, value_ms: f64, tags: &[String]) -> Result<(), SinkError>;

    /// Whether `tag` must be stripped before emission.
    fn is_excluded(&self, _tag: &str) -> bool {
        false
    }
}
