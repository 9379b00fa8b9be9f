// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, error, trace};

use crate::extractor::Extractor;
use crate::line::TaggedLine;
use crate::metric::MetricObservation;

/// Single consumer of the line queue. Lines are handled strictly in arrival order.
pub struct LineProcessor {
    lines: mpsc::Receiver<TaggedLine>,
    metrics: mpsc::Sender<MetricObservation>,
    extractor: Arc<Extractor>,
}

impl LineProcessor {
    pub fn new(
        lines: mpsc::Receiver<TaggedLine>,
        metrics: mpsc::Sender<MetricObservation>,
        extractor: Arc<Extractor>,
    ) -> Self {
        Self {
            lines,
            metrics,
            extractor,
        }
    }

    /// Runs until the line queue is closed and empty. Dropping `self` afterwards closes
    /// the metric queue.
    pub async fn spin(mut self) {
        while let Some(line) = self.lines.recv().await {
            if !self.process(&line).await {
                error!("LINE_PROCESSOR | Metric queue is closed, stopping");
                return;
            }
        }
        debug!("LINE_PROCESSOR | Line queue closed and drained");
    }

    /// Publishes every observation of `line`. Returns false once the metric queue is gone.
    async fn process(&self, line: &TaggedLine) -> bool {
        let observations = self.extractor.extract(line);
        if observations.is_empty() {
            trace!(
                "LINE_PROCESSOR | No metrics in line from {}",
                line.application()
            );
            return true;
        }

        for observation in observations {
            if self.metrics.send(observation).await.is_err() {
                return false;
            }
        }
        true
    }
}
