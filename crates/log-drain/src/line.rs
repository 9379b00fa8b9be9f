// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;

/// Per-request context shared by every line of one drain request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineContext {
    pub application: String,
    /// Effective tags, the trailing `app:<application>` tag included.
    pub tags: Vec<String>,
    pub metric_prefix: String,
}

/// One raw log line together with the context it arrived with.
#[derive(Debug, Clone)]
pub struct TaggedLine {
    context: Arc<LineContext>,
    raw_line: String,
}

impl TaggedLine {
    pub fn new(context: Arc<LineContext>, raw_line: String) -> Self {
        Self { context, raw_line }
    }

    pub fn application(&self) -> &str {
        &self.context.application
    }

    pub fn tags(&self) -> &[String] {
        &self.context.tags
    }

    pub fn metric_prefix(&self) -> &str {
        &self.context.metric_prefix
    }

    pub fn raw_line(&self) -> &str {
        &self.raw_line
    }
}
