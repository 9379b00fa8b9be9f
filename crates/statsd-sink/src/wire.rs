// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! DogStatsD datagram encoding.
//!
//! ```text
//! <name>:<value>|<type>[|#<tag>,<tag>]
//! ```

use std::fmt::Write;

/// Metric types understood by the aggregator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricType {
    Count,
    Gauge,
    Timing,
}

impl MetricType {
    fn symbol(self) -> &'static str {
        match self {
            MetricType::Count => "c",
            MetricType::Gauge => "g",
            MetricType::Timing => "ms",
        }
    }
}

/// Encodes a single observation as one DogStatsD line.
///
/// Characters that would break the framing (`:`, `|`, `@` and newlines in names,
/// `|`, `,` and newlines in tags) are replaced with `_`.
pub fn encode(metric_type: MetricType, name: &str, value: f64, tags: &[String]) -> String {
    let mut line = String::with_capacity(name.len() + 16 + tags.len() * 16);
    line.extend(name.chars().map(|c| match c {
        ':' | '|' | '@' | '\n' | '\r' => '_',
        c => c,
    }));
    // Display for f64 renders integral values without a fractional part.
    let _ = write!(line, ":{}|{}", value, metric_type.symbol());

    let mut tags = tags.iter().filter(|t| !t.is_empty()).peekable();
    if tags.peek().is_some() {
        line.push_str("|#");
        for (i, tag) in tags.enumerate() {
            if i > 0 {
                line.push(',');
            }
            line.extend(tag.chars().map(|c| match c {
                '|' | ',' | '\n' | '\r' => '_',
                c => c,
            }));
        }
    }
    line
}
