// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Wiring of the two bounded queues and the stages consuming them.
//!
//! ```text
//! gateway --[line queue]--> LineProcessor --[metric queue]--> MetricEmitter --> sink
//! ```
//!
//! Shutdown is drain-on-close: once every line sender is gone the processor empties the
//! line queue and exits, which closes the metric queue, which lets the emitter finish.

use std::sync::Arc;
use std::time::Duration;

use statsd_sink::MetricSink;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::emitter::MetricEmitter;
use crate::error::DrainError;
use crate::extractor::Extractor;
use crate::gateway::LineSender;
use crate::processor::LineProcessor;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineConfig {
    pub line_queue_capacity: usize,
    pub metric_queue_capacity: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            line_queue_capacity: 500,
            metric_queue_capacity: 500,
        }
    }
}

/// Handle to the running stages.
pub struct Pipeline {
    lines: LineSender,
    processor: JoinHandle<()>,
    emitter: JoinHandle<()>,
}

impl Pipeline {
    /// Spawns both stages on the current runtime. Capacities must be non-zero.
    pub fn start(
        extractor: Extractor,
        sink: Arc<dyn MetricSink>,
        config: &PipelineConfig,
    ) -> Self {
        let (line_tx, line_rx) = mpsc::channel(config.line_queue_capacity);
        let (metric_tx, metric_rx) = mpsc::channel(config.metric_queue_capacity);

        let processor = LineProcessor::new(line_rx, metric_tx, Arc::new(extractor));
        let emitter = MetricEmitter::new(metric_rx, sink);

        debug!(
            "Starting pipeline with line queue {} and metric queue {}",
            config.line_queue_capacity, config.metric_queue_capacity
        );
        Self {
            lines: line_tx,
            processor: tokio::spawn(processor.spin()),
            emitter: tokio::spawn(emitter.spin()),
        }
    }

    /// A new publisher for the line queue.
    pub fn sender(&self) -> LineSender {
        self.lines.clone()
    }

    /// Closes the line queue and waits, up to `timeout`, for both stages to drain.
    ///
    /// Senders handed out by [`Pipeline::sender`] keep the queue open, so they must be
    /// dropped first. Stages still running at the deadline are aborted.
    pub async fn shutdown(self, timeout: Duration) -> Result<(), DrainError> {
        let Self {
            lines,
            mut processor,
            mut emitter,
        } = self;
        drop(lines);

        let drained = tokio::time::timeout(timeout, async {
            (&mut processor)
                .await
                .map_err(|e| DrainError::StageFailed(format!("line processor: {e}")))?;
            (&mut emitter)
                .await
                .map_err(|e| DrainError::StageFailed(format!("metric emitter: {e}")))
        })
        .await;

        match drained {
            Ok(Ok(())) => {
                info!("Pipeline drained");
                Ok(())
            }
            Ok(Err(e)) => {
                error!("{}", e);
                emitter.abort();
                Err(e)
            }
            Err(_) => {
                error!("Pipeline did not drain within {:?}, aborting", timeout);
                processor.abort();
                emitter.abort();
                Err(DrainError::ShutdownTimeout(timeout))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::line::{LineContext, TaggedLine};
    use async_trait::async_trait;
    use statsd_sink::SinkError;
    use std::sync::Mutex;
    use tokio::sync::Semaphore;

    /// Records emitted names. When gated, every call waits for a permit first.
    struct GatedSink {
        names: Mutex<Vec<String>>,
        gate: Option<Semaphore>,
    }

    impl GatedSink {
        fn open() -> Arc<Self> {
            Arc::new(Self {
                names: Mutex::new(Vec::new()),
                gate: None,
            })
        }

        fn closed() -> Arc<Self> {
            Arc::new(Self {
                names: Mutex::new(Vec::new()),
                gate: Some(Semaphore::new(0)),
            })
        }

        async fn record(&self, name: &str) -> Result<(), SinkError> {
            if let Some(gate) = &self.gate {
                gate.acquire().await.expect("gate is never closed").forget();
            }
            self.names
                .lock()
                .expect("lock poisoned")
                .push(name.to_string());
            Ok(())
        }

        fn names(&self) -> Vec<String> {
            self.names.lock().expect("lock poisoned").clone()
        }
    }

    #[async_trait]
    impl MetricSink for GatedSink {
        async fn count(&self, name: &str, _: f64, _: &[String]) -> Result<(), SinkError> {
            self.record(name).await
        }

        async fn gauge(&self, name: &str, _: f64, _: &[String]) -> Result<(), SinkError> {
            self.record(name).await
        }

        async fn timing(&self, name: &str, _: f64, _: &[String]) -> Result<(), SinkError> {
            self.record(name).await
        }
    }

    fn tagged(raw: String) -> TaggedLine {
        TaggedLine::new(
            Arc::new(LineContext {
                application: "web".to_string(),
                tags: vec!["app:web".to_string()],
                metric_prefix: String::new(),
            }),
            raw,
        )
    }

    #[tokio::test]
    async fn test_shutdown_drains_everything_accepted() {
        let sink = GatedSink::open();
        let pipeline = Pipeline::start(
            Extractor::default(),
            Arc::clone(&sink) as Arc<dyn MetricSink>,
            &PipelineConfig::default(),
        );

        let sender = pipeline.sender();
        for i in 0..50 {
            sender
                .send(tagged(format!("count#line{i}=1 status=200")))
                .await
                .expect("queue is open");
        }
        drop(sender);

        pipeline
            .shutdown(Duration::from_secs(5))
            .await
            .expect("pipeline should drain");

        let expected: Vec<String> = (0..50).map(|i| format!("line{i}")).collect();
        assert_eq!(sink.names(), expected);
    }

    #[tokio::test]
    async fn test_full_queues_apply_backpressure() {
        let sink = GatedSink::closed();
        let pipeline = Pipeline::start(
            Extractor::default(),
            Arc::clone(&sink) as Arc<dyn MetricSink>,
            &PipelineConfig {
                line_queue_capacity: 1,
                metric_queue_capacity: 1,
            },
        );
        let sender = pipeline.sender();

        // At most four lines fit: one per queue plus one held by each stage.
        let mut accepted = 0;
        for i in 0..10 {
            let line = tagged(format!("count#m{i}=1"));
            match tokio::time::timeout(Duration::from_millis(100), sender.send(line)).await {
                Ok(sent) => {
                    sent.expect("queue is open");
                    accepted += 1;
                }
                Err(_) => break,
            }
        }
        assert!(accepted < 10, "sender should block on a full pipeline");

        if let Some(gate) = &sink.gate {
            gate.add_permits(accepted);
        }
        drop(sender);
        pipeline
            .shutdown(Duration::from_secs(5))
            .await
            .expect("pipeline should drain");
        assert_eq!(sink.names().len(), accepted);
    }

    #[tokio::test]
    async fn test_shutdown_times_out_on_stuck_sink() {
        let sink = GatedSink::closed();
        let pipeline = Pipeline::start(
            Extractor::default(),
            Arc::clone(&sink) as Arc<dyn MetricSink>,
            &PipelineConfig::default(),
        );
        pipeline
            .sender()
            .send(tagged("connect=1ms".to_string()))
            .await
            .expect("queue is open");

        let result = pipeline.shutdown(Duration::from_millis(50)).await;
        assert!(matches!(result, Err(DrainError::ShutdownTimeout(_))));
        assert!(sink.names().is_empty());
    }
}
