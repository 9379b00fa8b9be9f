// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;

use statsd_sink::MetricSink;
use tokio::sync::mpsc;
use tracing::{debug, error};

use crate::metric::{MetricKind, MetricObservation};

/// Single consumer of the metric queue, forwarding each observation to the sink.
pub struct MetricEmitter {
    metrics: mpsc::Receiver<MetricObservation>,
    sink: Arc<dyn MetricSink>,
}

impl MetricEmitter {
    pub fn new(metrics: mpsc::Receiver<MetricObservation>, sink: Arc<dyn MetricSink>) -> Self {
        Self { metrics, sink }
    }

    /// Runs until the metric queue is closed and empty.
    pub async fn spin(mut self) {
        while let Some(observation) = self.metrics.recv().await {
            self.emit(observation).await;
        }
        debug!("METRIC_EMITTER | Metric queue closed and drained");
    }

    /// Sends one observation. Failures are logged and the observation is dropped.
    pub async fn emit(&self, mut observation: MetricObservation) {
        observation.tags.retain(|tag| !self.sink.is_excluded(tag));

        let MetricObservation {
            name,
            value,
            tags,
            kind,
        } = &observation;
        let result = match kind {
            MetricKind::Counter => self.sink.count(name, *value, tags).await,
            MetricKind::Gauge => self.sink.gauge(name, *value, tags).await,
            MetricKind::Timing => self.sink.timing(name, *value, tags).await,
        };

        if let Err(e) = result {
            error!("METRIC_EMITTER | Failed to emit {}: {}", name, e);
        }
    }
}
