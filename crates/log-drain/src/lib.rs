// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

pub mod auth;
pub mod config;
pub mod emitter;
pub mod error;
pub mod extractor;
pub mod gateway;
pub mod line;
pub mod logger;
pub mod metric;
pub mod pipeline;
pub mod processor;
pub mod registry;
pub mod rules;
pub mod server;

pub use config::DrainConfig;
pub use error::{ConfigError, DrainError};
pub use server::DrainServer;
