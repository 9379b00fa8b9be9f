// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Turns a raw log line into metric observations.
//!
//! Lines are read as logfmt: whitespace separated `key=value` fields, where a value may
//! be double quoted to include spaces. Each key is looked up in the [`ExtractionRules`];
//! matching fields with a numeric value produce one [`MetricObservation`].
//!
//! ```text
//! at=info method=GET path="/" connect=5ms service=12ms status=200 bytes=1548
//! ```
//!
//! With the default rules this yields `connect` (5ms), `service` (12ms) and `bytes`
//! (1548) and ignores everything else.

use tracing::trace;

use crate::line::TaggedLine;
use crate::metric::{MetricKind, MetricObservation};
use crate::rules::ExtractionRules;

#[derive(Debug, Clone, Default)]
pub struct Extractor {
    rules: ExtractionRules,
}

impl Extractor {
    pub fn new(rules: ExtractionRules) -> Self {
        Self { rules }
    }

    /// Extracts every metric found in `line`, in field order.
    pub fn extract(&self, line: &TaggedLine) -> Vec<MetricObservation> {
        let mut observations = Vec::new();

        for (key, raw_value) in Fields::new(line.raw_line()) {
            let Some((kind, name)) = self.rules.lookup(key) else {
                continue;
            };
            let Some((value, unit)) = parse_value(raw_value) else {
                trace!("Skipping non-numeric value for {}: {:?}", key, raw_value);
                continue;
            };
            let value = match kind {
                MetricKind::Timing => to_millis(value, unit),
                MetricKind::Counter | MetricKind::Gauge => value,
            };
            if !value.is_finite() {
                continue;
            }

            observations.push(MetricObservation {
                name: format!("{}{}", line.metric_prefix(), name),
                value,
                tags: line.tags().to_vec(),
                kind,
            });
        }

        observations
    }
}

/// Iterator over the `key=value` fields of a logfmt line. Tokens without `=` or with
/// an empty key are skipped.
struct Fields<'a> {
    rest: &'a str,
}

impl<'a> Fields<'a> {
    fn new(line: &'a str) -> Self {
        Self { rest: line }
    }

    /// Splits off the next whitespace delimited token, honoring double quotes.
    fn next_token(&mut self) -> Option<&'a str> {
        let input = self.rest.trim_start();
        if input.is_empty() {
            self.rest = input;
            return None;
        }

        let mut in_quotes = false;
        let mut escaped = false;
        let mut end = input.len();
        for (i, c) in input.char_indices() {
            if escaped {
                escaped = false;
                continue;
            }
            match c {
                '\\' if in_quotes => escaped = true,
                '"' => in_quotes = !in_quotes,
                c if c.is_whitespace() && !in_quotes => {
                    end = i;
                    break;
                }
                _ => {}
            }
        }

        self.rest = &input[end..];
        Some(&input[..end])
    }
}

impl<'a> Iterator for Fields<'a> {
    type Item = (&'a str, &'a str);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let token = self.next_token()?;
            let Some((key, value)) = token.split_once('=') else {
                continue;
            };
            if key.is_empty() {
                continue;
            }
            let value = value
                .strip_prefix('"')
                .map(|v| v.strip_suffix('"').unwrap_or(v))
                .unwrap_or(value);
            return Some((key, value));
        }
    }
}

/// Splits a value into its leading decimal number and the unit that follows it.
///
/// Accepts an optional sign, digits with an optional fraction, and an exponent only
/// when digits follow the `e`. Returns `None` when no digits are present.
fn parse_value(raw: &str) -> Option<(f64, &str)> {
    let raw = raw.trim();
    let bytes = raw.as_bytes();
    let mut end = 0;

    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end += 1;
    }
    let int_start = end;
    while bytes.get(end).is_some_and(u8::is_ascii_digit) {
        end += 1;
    }
    let mut digits = end - int_start;

    if bytes.get(end) == Some(&b'.') {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while bytes.get(frac_end).is_some_and(u8::is_ascii_digit) {
            frac_end += 1;
        }
        if digits > 0 || frac_end > frac_start {
            digits += frac_end - frac_start;
            end = frac_end;
        }
    }
    if digits == 0 {
        return None;
    }

    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+' | b'-')) {
            exp_end += 1;
        }
        let exp_digits_start = exp_end;
        while bytes.get(exp_end).is_some_and(u8::is_ascii_digit) {
            exp_end += 1;
        }
        if exp_end > exp_digits_start {
            end = exp_end;
        }
    }

    let value = raw[..end].parse::<f64>().ok()?;
    value.is_finite().then_some((value, raw[end..].trim()))
}

/// Converts a duration in `unit` to milliseconds. Unknown units are left as is.
fn to_millis(value: f64, unit: &str) -> f64 {
    match unit {
        "ns" => value / 1_000_000.0,
        "us" | "µs" => value / 1_000.0,
        "" | "ms" => value,
        "s" => value * 1_000.0,
        "m" | "min" => value * 60_000.0,
        "h" => value * 3_600_000.0,
        _ => value,
    }
}
