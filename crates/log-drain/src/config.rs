// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use statsd_sink::ExcludedTags;

use crate::error::ConfigError;
use crate::registry::AppRegistry;
use crate::rules::ExtractionRules;

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_QUEUE_CAPACITY: usize = 500;
const DEFAULT_MAX_BODY_BYTES: usize = 10 * 1024 * 1024;
const DEFAULT_MAX_LINE_BYTES: usize = 64 * 1024;
const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 10;
const VALID_LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Configuration for the log drain, built once at startup.
#[derive(Clone)]
pub struct DrainConfig {
    /// HTTP listening port
    pub port: u16,
    /// Aggregator address, `host:port`
    pub statsd_url: String,
    /// Forces debug logging
    pub debug: bool,
    /// Log level used when `debug` is off
    pub log_level: String,
    pub basic_auth_username: String,
    pub basic_auth_password: String,
    pub excluded_tags: ExcludedTags,
    pub app_registry: AppRegistry,
    pub extraction_rules: ExtractionRules,
    /// Bound of the queue between the gateway and the line processor
    pub line_queue_capacity: usize,
    /// Bound of the queue between the line processor and the emitter
    pub metric_queue_capacity: usize,
    pub max_body_bytes: usize,
    pub max_line_bytes: usize,
    /// Upper bound for draining both queues on shutdown
    pub shutdown_timeout: Duration,
}

impl Default for DrainConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            statsd_url: "localhost:8125".to_string(),
            debug: false,
            log_level: "info".to_string(),
            basic_auth_username: String::new(),
            basic_auth_password: String::new(),
            excluded_tags: ExcludedTags::default(),
            app_registry: AppRegistry::default(),
            extraction_rules: ExtractionRules::default(),
            line_queue_capacity: DEFAULT_QUEUE_CAPACITY,
            metric_queue_capacity: DEFAULT_QUEUE_CAPACITY,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            max_line_bytes: DEFAULT_MAX_LINE_BYTES,
            shutdown_timeout: Duration::from_secs(DEFAULT_SHUTDOWN_TIMEOUT_SECS),
        }
    }
}

impl fmt::Debug for DrainConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DrainConfig")
            .field("port", &self.port)
            .field("statsd_url", &self.statsd_url)
            .field("debug", &self.debug)
            .field("log_level", &self.log_level)
            .field("basic_auth_username", &self.basic_auth_username)
            .field("basic_auth_password", &"<redacted>")
            .field("excluded_tags", &self.excluded_tags.len())
            .field("app_registry", &self.app_registry.len())
            .field("extraction_rules", &self.extraction_rules.len())
            .field("line_queue_capacity", &self.line_queue_capacity)
            .field("metric_queue_capacity", &self.metric_queue_capacity)
            .field("max_body_bytes", &self.max_body_bytes)
            .field("max_line_bytes", &self.max_line_bytes)
            .field("shutdown_timeout", &self.shutdown_timeout)
            .finish()
    }
}

impl DrainConfig {
    /// Create configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Create configuration from an arbitrary variable source. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let statsd_url = var("STATSD_URL").ok_or(ConfigError::Missing("STATSD_URL"))?;
        let basic_auth_username =
            var("BASIC_AUTH_USERNAME").ok_or(ConfigError::Missing("BASIC_AUTH_USERNAME"))?;
        let basic_auth_password =
            var("BASIC_AUTH_PASSWORD").ok_or(ConfigError::Missing("BASIC_AUTH_PASSWORD"))?;

        let app_registry = match var("APP_REGISTRY") {
            Some(json) => AppRegistry::from_json(&json).map_err(|e| ConfigError::Invalid {
                key: "APP_REGISTRY",
                reason: e.to_string(),
            })?,
            None => AppRegistry::default(),
        };

        let config = Self {
            port: parse_var(var("PORT"), "PORT")?.unwrap_or(defaults.port),
            statsd_url: statsd_url.trim().to_string(),
            debug: var("DATADOG_DRAIN_DEBUG").is_some(),
            log_level: var("DD_LOG_LEVEL")
                .map(|val| val.trim().to_lowercase())
                .unwrap_or(defaults.log_level),
            basic_auth_username,
            basic_auth_password,
            excluded_tags: var("EXCLUDED_TAGS")
                .map(|list| ExcludedTags::parse(&list))
                .unwrap_or_default(),
            app_registry,
            extraction_rules: var("EXTRACTION_RULES")
                .map(|json| ExtractionRules::from_json(&json))
                .unwrap_or_default(),
            line_queue_capacity: parse_var(var("LINE_QUEUE_CAPACITY"), "LINE_QUEUE_CAPACITY")?
                .unwrap_or(defaults.line_queue_capacity),
            metric_queue_capacity: parse_var(
                var("METRIC_QUEUE_CAPACITY"),
                "METRIC_QUEUE_CAPACITY",
            )?
            .unwrap_or(defaults.metric_queue_capacity),
            max_body_bytes: parse_var(var("DRAIN_MAX_BODY_BYTES"), "DRAIN_MAX_BODY_BYTES")?
                .unwrap_or(defaults.max_body_bytes),
            max_line_bytes: parse_var(var("DRAIN_MAX_LINE_BYTES"), "DRAIN_MAX_LINE_BYTES")?
                .unwrap_or(defaults.max_line_bytes),
            shutdown_timeout: parse_var::<u64>(
                var("DRAIN_SHUTDOWN_TIMEOUT_SECS"),
                "DRAIN_SHUTDOWN_TIMEOUT_SECS",
            )?
            .map(Duration::from_secs)
            .unwrap_or(defaults.shutdown_timeout),
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.statsd_url.trim().is_empty() {
            return Err(ConfigError::Missing("STATSD_URL"));
        }
        if self.basic_auth_username.is_empty() {
            return Err(ConfigError::Missing("BASIC_AUTH_USERNAME"));
        }
        if self.basic_auth_password.is_empty() {
            return Err(ConfigError::Missing("BASIC_AUTH_PASSWORD"));
        }

        let positive = [
            ("LINE_QUEUE_CAPACITY", self.line_queue_capacity),
            ("METRIC_QUEUE_CAPACITY", self.metric_queue_capacity),
            ("DRAIN_MAX_BODY_BYTES", self.max_body_bytes),
            ("DRAIN_MAX_LINE_BYTES", self.max_line_bytes),
        ];
        for (key, value) in positive {
            if value == 0 {
                return Err(ConfigError::Invalid {
                    key,
                    reason: "must be greater than 0".to_string(),
                });
            }
        }

        if !VALID_LOG_LEVELS.contains(&self.log_level.as_str()) {
            return Err(ConfigError::Invalid {
                key: "DD_LOG_LEVEL",
                reason: format!(
                    "'{}' is not one of: trace, debug, info, warn, error",
                    self.log_level
                ),
            });
        }

        Ok(())
    }
}

fn parse_var<T>(value: Option<String>, key: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    value
        .map(|raw| {
            raw.trim().parse::<T>().map_err(|e| ConfigError::Invalid {
                key,
                reason: e.to_string(),
            })
        })
        .transpose()
}
