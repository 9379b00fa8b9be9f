// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use serde::Deserialize;

/// How the aggregator should treat an observation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    /// Increments a counter by the observed value.
    Counter,
    /// Sets a gauge to the observed value.
    Gauge,
    /// Records a duration, in milliseconds.
    Timing,
}

/// A single named measurement extracted from a log line.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricObservation {
    /// Metric name, request prefix included.
    pub name: String,
    pub value: f64,
    pub tags: Vec<String>,
    pub kind: MetricKind,
}
