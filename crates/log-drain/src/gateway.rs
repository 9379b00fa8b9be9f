// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! HTTP ingestion of drained log lines.
//!
//! `POST /?app=<name>[&tags=a:1,b:2][&prefix=web.]` accepts a newline separated body.
//! Every line is tagged with the request's context and published to the line queue in
//! body order. Publishing waits for queue space, so a full pipeline slows the sender
//! down instead of dropping lines.

use std::io;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{middleware, Router};
use futures::TryStreamExt;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};
use tokio::sync::mpsc;
use tokio_util::io::StreamReader;
use tower_http::limit::RequestBodyLimitLayer;
use tracing::{debug, error};

use crate::auth::{require_basic_auth, Credentials};
use crate::line::TaggedLine;
use crate::registry::AppRegistry;

const INGEST_PATH: &str = "/";
const STATUS_PATH: &str = "/status";

pub type LineSender = mpsc::Sender<TaggedLine>;

/// Shared state of the ingest handler.
#[derive(Clone)]
pub struct GatewayState {
    registry: Arc<AppRegistry>,
    lines: LineSender,
    max_line_bytes: usize,
}

impl GatewayState {
    pub fn new(registry: Arc<AppRegistry>, lines: LineSender, max_line_bytes: usize) -> Self {
        Self {
            registry,
            lines,
            max_line_bytes,
        }
    }
}

/// Drain query parameters. A repeated key keeps its first value.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct DrainQuery {
    app: Option<String>,
    tags: Option<String>,
    prefix: Option<String>,
}

impl DrainQuery {
    fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        let mut query = Self::default();
        for (key, value) in pairs {
            let slot = match key.as_str() {
                "app" => &mut query.app,
                "tags" => &mut query.tags,
                "prefix" => &mut query.prefix,
                _ => continue,
            };
            slot.get_or_insert(value);
        }
        query
    }
}

/// Builds the drain router. Only the ingest route requires credentials.
pub fn router(state: GatewayState, credentials: Arc<Credentials>, max_body_bytes: usize) -> Router {
    Router::new()
        .route(INGEST_PATH, post(ingest))
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .route_layer(middleware::from_fn_with_state(
            credentials,
            require_basic_auth,
        ))
        .route(STATUS_PATH, get(status))
        .with_state(state)
}

async fn status() -> &'static str {
    "OK"
}

async fn ingest(
    State(state): State<GatewayState>,
    query: Result<Query<Vec<(String, String)>>, QueryRejection>,
    body: Body,
) -> Response {
    let query = match query {
        Ok(Query(pairs)) => DrainQuery::from_pairs(pairs),
        Err(e) => {
            debug!("Unparsable drain query: {}", e);
            DrainQuery::default()
        }
    };
    let Some(app) = query.app.filter(|app| !app.is_empty()) else {
        error!("Rejected drain request without app query parameter");
        return (StatusCode::INTERNAL_SERVER_ERROR, "Missing app query parameter").into_response();
    };

    let context = Arc::new(state.registry.resolve(
        &app,
        query.tags.as_deref(),
        query.prefix.as_deref(),
    ));

    let stream = body.into_data_stream().map_err(io::Error::other);
    let mut reader = LineReader::new(StreamReader::new(stream), state.max_line_bytes);
    loop {
        match reader.next_line().await {
            Ok(Some(raw_line)) => {
                debug!("Received line for {}: {}", app, raw_line);
                if state
                    .lines
                    .send(TaggedLine::new(Arc::clone(&context), raw_line))
                    .await
                    .is_err()
                {
                    error!("Line queue is closed, dropping the rest of the request for {}", app);
                    break;
                }
            }
            Ok(None) => break,
            Err(e) => {
                error!("Failed to read drain body for {}: {}", app, e);
                break;
            }
        }
    }

    (StatusCode::OK, "OK").into_response()
}

/// Splits a byte stream on `\n`, refusing lines longer than `max_line_bytes`.
struct LineReader<R> {
    inner: R,
    max_line_bytes: usize,
    buf: Vec<u8>,
}

impl<R> LineReader<R>
where
    R: AsyncBufRead + Unpin,
{
    fn new(inner: R, max_line_bytes: usize) -> Self {
        Self {
            inner,
            max_line_bytes,
            buf: Vec::new(),
        }
    }

    /// Next line without its `\n` or `\r\n` terminator, decoded lossily. `None` at end
    /// of input.
    async fn next_line(&mut self) -> io::Result<Option<String>> {
        self.buf.clear();
        let limit = self.max_line_bytes as u64 + 1;
        let read = (&mut self.inner)
            .take(limit)
            .read_until(b'\n', &mut self.buf)
            .await?;
        if read == 0 {
            return Ok(None);
        }

        if self.buf.last() == Some(&b'\n') {
            self.buf.pop();
            if self.buf.last() == Some(&b'\r') {
                self.buf.pop();
            }
        } else if read as u64 == limit {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("line exceeds {} bytes", self.max_line_bytes),
            ));
        }

        Ok(Some(String::from_utf8_lossy(&self.buf).into_owned()))
    }
}
