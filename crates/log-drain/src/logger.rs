// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Log formatting for the drain.
//!
//! Every line is prefixed with `LOG_DRAIN` so the drain's own output can be told apart
//! from the application logs it sits next to:
//!
//! ```text
//! LOG_DRAIN | INFO | Log drain listening on 0.0.0.0:8080
//! LOG_DRAIN | ERROR | METRIC_EMITTER | Failed to emit connect: failed to send metric connect: Connection refused (os error 111)
//! ```

use std::fmt;

use tracing::subscriber::SetGlobalDefaultError;
use tracing_core::{Event, Subscriber};
use tracing_subscriber::fmt::{
    format::{self, FormatEvent, FormatFields},
    FmtContext, FormattedFields,
};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::EnvFilter;

const PREFIX: &str = "LOG_DRAIN";

#[derive(Debug, Clone, Copy)]
pub struct Formatter;

impl<S, N> FormatEvent<S, N> for Formatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: format::Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        write!(&mut writer, "{PREFIX} | {} | ", event.metadata().level())?;

        if let Some(scope) = ctx.event_scope() {
            for span in scope.from_root() {
                write!(writer, "{}", span.name())?;

                let ext = span.extensions();
                if let Some(fields) = ext.get::<FormattedFields<N>>() {
                    if !fields.is_empty() {
                        write!(writer, "{{{fields}}}")?;
                    }
                }
                write!(writer, ": ")?;
            }
        }

        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

/// Installs the global subscriber, writing to stderr at `level`.
pub fn init(level: &str) -> Result<(), SetGlobalDefaultError> {
    let env_filter = EnvFilter::try_new(format!("h2=off,hyper=off,{level}"))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = tracing_subscriber::fmt::Subscriber::builder()
        .with_env_filter(env_filter)
        .with_ansi(false)
        .with_writer(std::io::stderr)
        .event_format(Formatter)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
}
