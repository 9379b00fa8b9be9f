// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Per-application defaults for tags and metric prefixes.
//!
//! The registry is loaded once at startup from `APP_REGISTRY`:
//!
//! ```json
//! {"web": {"tags": ["env:prod", "team:core"], "prefix": "web."}}
//! ```

use std::collections::HashMap;

use serde::Deserialize;

use crate::line::LineContext;

/// Defaults applied when a drain request does not override them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AppDefaults {
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub prefix: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppRegistry {
    apps: HashMap<String, AppDefaults>,
}

impl AppRegistry {
    pub fn new(apps: HashMap<String, AppDefaults>) -> Self {
        Self { apps }
    }

    /// Parses the JSON object form used by `APP_REGISTRY`.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json).map(Self::new)
    }

    #[must_use]
    pub fn with_app(mut self, application: &str, defaults: AppDefaults) -> Self {
        self.apps.insert(application.to_string(), defaults);
        self
    }

    pub fn get(&self, application: &str) -> Option<&AppDefaults> {
        self.apps.get(application)
    }

    pub fn len(&self) -> usize {
        self.apps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.apps.is_empty()
    }

    /// Builds the context attached to every line of a request.
    ///
    /// Explicit comma-separated tags replace the registry defaults. Segments are kept
    /// verbatim except that empty ones are skipped, and `app:<application>` is always
    /// appended. An explicit prefix wins even
    /// when it is empty.
    pub fn resolve(
        &self,
        application: &str,
        explicit_tags: Option<&str>,
        explicit_prefix: Option<&str>,
    ) -> LineContext {
        let defaults = self.get(application);

        let mut tags: Vec<String> = match explicit_tags.filter(|t| !t.is_empty()) {
            Some(list) => list
                .split(',')
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .collect(),
            None => defaults.map(|d| d.tags.clone()).unwrap_or_default(),
        };
        tags.push(format!("app:{application}"));

        let metric_prefix = match explicit_prefix {
            Some(prefix) => prefix.to_string(),
            None => defaults.map(|d| d.prefix.clone()).unwrap_or_default(),
        };

        LineContext {
            application: application.to_string(),
            tags,
            metric_prefix,
        }
    }
}
