// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Rules mapping `key=value` log fields to metrics.
//!
//! Rules are evaluated in order and the first rule whose key matches wins. Three match
//! modes exist:
//!
//! - **exact**: the field key equals `key`; the metric is named `name`, or `key`.
//! - **prefix**: the field key starts with `key`; the metric is named `name` followed by
//!   the rest of the field key (`count#db.queries` → `db.queries`).
//! - **regex**: `key` is a regular expression; `name` may reference capture groups
//!   (`$1`). Without `name`, the first capture group (or the whole key) is used.
//!
//! # Configuration
//!
//! ```json
//! [
//!   {"type": "timing", "key": "connect"},
//!   {"type": "gauge", "key": "sample#", "match": "prefix"},
//!   {"type": "gauge", "key": "^mem_(\\w+)$", "match": "regex", "name": "memory.$1"}
//! ]
//! ```

use std::borrow::Cow;

use regex::Regex;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use tracing::error;

use crate::error::RuleError;
use crate::metric::MetricKind;

/// How a rule's `key` is compared with a field key.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyMatch {
    #[default]
    Exact,
    Prefix,
    Regex,
}

/// A rule as written in configuration.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct ExtractionRule {
    #[serde(rename = "type")]
    pub kind: MetricKind,
    pub key: String,
    #[serde(default, rename = "match")]
    pub key_match: KeyMatch,
    #[serde(default)]
    pub name: Option<String>,
}

impl ExtractionRule {
    pub fn exact(kind: MetricKind, key: &str) -> Self {
        Self {
            kind,
            key: key.to_string(),
            key_match: KeyMatch::Exact,
            name: None,
        }
    }

    pub fn prefix(kind: MetricKind, key: &str) -> Self {
        Self {
            kind,
            key: key.to_string(),
            key_match: KeyMatch::Prefix,
            name: None,
        }
    }

    #[must_use]
    pub fn named(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    fn compile(self) -> Result<CompiledRule, RuleError> {
        if self.key.is_empty() {
            return Err(RuleError::EmptyKey);
        }
        let matcher = match self.key_match {
            KeyMatch::Exact => Matcher::Exact(self.key),
            KeyMatch::Prefix => Matcher::Prefix(self.key),
            KeyMatch::Regex => Matcher::Regex(Regex::new(&self.key).map_err(|e| {
                RuleError::InvalidPattern {
                    pattern: self.key.clone(),
                    reason: e.to_string(),
                }
            })?),
        };
        Ok(CompiledRule {
            kind: self.kind,
            matcher,
            name: self.name,
        })
    }
}

#[derive(Debug, Clone)]
enum Matcher {
    Exact(String),
    Prefix(String),
    Regex(Regex),
}

#[derive(Debug, Clone)]
struct CompiledRule {
    kind: MetricKind,
    matcher: Matcher,
    name: Option<String>,
}

impl CompiledRule {
    fn metric_name<'a>(&'a self, key: &'a str) -> Option<Cow<'a, str>> {
        match &self.matcher {
            Matcher::Exact(expected) => (key == expected.as_str())
                .then(|| Cow::Borrowed(self.name.as_deref().unwrap_or(expected))),
            Matcher::Prefix(prefix) => {
                let rest = key.strip_prefix(prefix.as_str()).filter(|r| !r.is_empty())?;
                Some(match &self.name {
                    Some(name) => Cow::Owned(format!("{name}{rest}")),
                    None => Cow::Borrowed(rest),
                })
            }
            Matcher::Regex(regex) => {
                let captures = regex.captures(key)?;
                let name = match &self.name {
                    Some(template) => {
                        let mut name = String::new();
                        captures.expand(template, &mut name);
                        Cow::Owned(name)
                    }
                    None => Cow::Borrowed(
                        captures
                            .get(1)
                            .unwrap_or_else(|| captures.get_match())
                            .as_str(),
                    ),
                };
                (!name.is_empty()).then_some(name)
            }
        }
    }
}

/// Ordered, compiled rule set. Immutable once built.
#[derive(Debug, Clone)]
pub struct ExtractionRules {
    rules: Vec<CompiledRule>,
}

impl ExtractionRules {
    /// Compiles `rules`, failing on the first invalid one.
    pub fn new(rules: Vec<ExtractionRule>) -> Result<Self, RuleError> {
        let rules = rules
            .into_iter()
            .map(ExtractionRule::compile)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { rules })
    }

    /// Parses rules from the `EXTRACTION_RULES` JSON array.
    ///
    /// Invalid entries are logged and skipped. If nothing valid remains, the default
    /// rules are used.
    pub fn from_json(json: &str) -> Self {
        let entries = match serde_json::from_str::<JsonValue>(json) {
            Ok(JsonValue::Array(entries)) => entries,
            Ok(_) => {
                error!("Extraction rules must be a JSON array, using default rules");
                return Self::default();
            }
            Err(e) => {
                error!("Failed to parse extraction rules: {}, using default rules", e);
                return Self::default();
            }
        };

        let mut rules = Vec::with_capacity(entries.len());
        for entry in entries {
            let compiled = serde_json::from_value::<ExtractionRule>(entry)
                .map_err(|e| RuleError::Malformed(e.to_string()))
                .and_then(ExtractionRule::compile);
            match compiled {
                Ok(rule) => rules.push(rule),
                Err(e) => error!("Failed to parse extraction rule: {}, ignoring", e),
            }
        }

        if rules.is_empty() {
            error!("No valid extraction rules configured, using default rules");
            return Self::default();
        }
        Self { rules }
    }

    /// Finds the first rule matching `key` and the metric name it yields.
    pub fn lookup<'a>(&'a self, key: &'a str) -> Option<(MetricKind, Cow<'a, str>)> {
        self.rules
            .iter()
            .find_map(|rule| rule.metric_name(key).map(|name| (rule.kind, name)))
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl Default for ExtractionRules {
    /// Router timings and sizes plus the `count#`/`sample#`/`measure#` conventions.
    fn default() -> Self {
        let rules = [
            ExtractionRule::exact(MetricKind::Timing, "connect"),
            ExtractionRule::exact(MetricKind::Timing, "service"),
            ExtractionRule::exact(MetricKind::Gauge, "bytes"),
            ExtractionRule::prefix(MetricKind::Counter, "count#"),
            ExtractionRule::prefix(MetricKind::Gauge, "sample#"),
            ExtractionRule::prefix(MetricKind::Timing, "measure#"),
        ];
        Self {
            rules: rules
                .into_iter()
                .filter_map(|rule| rule.compile().ok())
                .collect(),
        }
    }
}
