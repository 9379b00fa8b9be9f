// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;

use statsd_sink::{MetricSink, StatsdClient};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::auth::Credentials;
use crate::config::DrainConfig;
use crate::error::DrainError;
use crate::extractor::Extractor;
use crate::gateway::{router, GatewayState};
use crate::pipeline::{Pipeline, PipelineConfig};

/// The log drain: HTTP gateway in front of the metric pipeline.
pub struct DrainServer {
    config: DrainConfig,
}

impl DrainServer {
    pub fn new(config: DrainConfig) -> Self {
        Self { config }
    }

    /// Connects the statsd client, binds `0.0.0.0:<port>` and serves until `shutdown` is
    /// cancelled.
    pub async fn run(self, shutdown: CancellationToken) -> Result<(), DrainError> {
        info!("Starting log drain with {:?}", self.config);

        let sink = StatsdClient::new(&self.config.statsd_url, self.config.excluded_tags.clone())
            .await?;

        let port = self.config.port;
        let listener = TcpListener::bind(SocketAddr::from((Ipv4Addr::UNSPECIFIED, port)))
            .await
            .map_err(|source| DrainError::Bind { port, source })?;

        self.serve(listener, Arc::new(sink), shutdown).await
    }

    /// Serves drain requests on `listener`, sending metrics to `sink`.
    ///
    /// Once `shutdown` fires the server stops accepting, finishes in-flight requests and
    /// then drains the pipeline within the configured timeout.
    pub async fn serve(
        self,
        listener: TcpListener,
        sink: Arc<dyn MetricSink>,
        shutdown: CancellationToken,
    ) -> Result<(), DrainError> {
        let config = self.config;
        let pipeline = Pipeline::start(
            Extractor::new(config.extraction_rules),
            sink,
            &PipelineConfig {
                line_queue_capacity: config.line_queue_capacity,
                metric_queue_capacity: config.metric_queue_capacity,
            },
        );

        let state = GatewayState::new(
            Arc::new(config.app_registry),
            pipeline.sender(),
            config.max_line_bytes,
        );
        let credentials = Arc::new(Credentials::new(
            config.basic_auth_username,
            config.basic_auth_password,
        ));
        let app = router(state, credentials, config.max_body_bytes);

        match listener.local_addr() {
            Ok(addr) => info!("Log drain listening on {}", addr),
            Err(e) => debug!("Could not read listener address: {}", e),
        }

        let served = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown.cancelled_owned())
            .await
            .map_err(DrainError::Serve);

        info!("HTTP server stopped, draining pipeline");
        let drained = pipeline.shutdown(config.shutdown_timeout).await;

        served?;
        drained
    }
}
