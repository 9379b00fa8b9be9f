// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

use std::{env, process};

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use datadog_log_drain::{logger, DrainConfig, DrainServer};

#[tokio::main]
pub async fn main() {
    let debug_enabled = env::var("DATADOG_DRAIN_DEBUG").is_ok_and(|val| !val.is_empty());
    let log_level = if debug_enabled {
        "debug".to_string()
    } else {
        env::var("DD_LOG_LEVEL")
            .map(|val| val.to_lowercase())
            .unwrap_or_else(|_| "info".to_string())
    };
    if let Err(e) = logger::init(&log_level) {
        eprintln!("LOG_DRAIN | ERROR | Failed to install logger: {e}");
    }
    debug!("Logging subsystem enabled");

    let config = match DrainConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Error loading log drain configuration: {e}");
            process::exit(1);
        }
    };

    let shutdown = CancellationToken::new();
    tokio::spawn(cancel_on_signal(shutdown.clone()));

    if let Err(e) = DrainServer::new(config).run(shutdown).await {
        error!("Log drain stopped with error: {e}");
        process::exit(1);
    }
    info!("Log drain stopped");
}

/// Cancels `shutdown` on SIGINT or SIGTERM.
async fn cancel_on_signal(shutdown: CancellationToken) {
    let signal = wait_for_signal().await;
    info!("Received {signal}, shutting down");
    shutdown.cancel();
}

#[cfg(unix)]
async fn wait_for_signal() -> &'static str {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(sigterm) => sigterm,
        Err(e) => {
            error!("Failed to install SIGTERM handler: {e}");
            return wait_for_ctrl_c().await;
        }
    };

    tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        name = wait_for_ctrl_c() => name,
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() -> &'static str {
    wait_for_ctrl_c().await
}

async fn wait_for_ctrl_c() -> &'static str {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for SIGINT: {e}");
        std::future::pending::<()>().await;
    }
    "SIGINT"
}
