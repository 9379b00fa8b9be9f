// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Fire-and-forget DogStatsD client.
//!
//! [`StatsdClient`] owns a UDP socket connected to a statsd-compatible aggregator and
//! emits one datagram per observation. Callers depend on the [`MetricSink`] trait so
//! the emission stage can be exercised against in-memory sinks.

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

pub mod client;
pub mod errors;
pub mod sink;
pub mod tags;
pub mod wire;

pub use client::StatsdClient;
pub use errors::SinkError;
pub use sink::MetricSink;
pub use tags::ExcludedTags;
