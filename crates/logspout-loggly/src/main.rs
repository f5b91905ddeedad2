// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

use std::env;
use std::future::Future;
use std::io;
use std::process::ExitCode;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use loggly_adapter::{
    adapter,
    logger::Formatter,
    record::SourceMessage,
    registry::{LogAdapter, Registry},
};

const LOG_LEVEL_ENV_VAR: &str = "LOGGLY_LOG_LEVEL";

#[tokio::main]
pub async fn main() -> ExitCode {
    let log_level = env::var(LOG_LEVEL_ENV_VAR)
        .map(|val| val.to_lowercase())
        .unwrap_or("info".to_string());
    let env_filter = format!("h2=off,hyper=off,rustls=off,{log_level}");

    let filter = match EnvFilter::try_new(env_filter) {
        Ok(filter) => filter,
        Err(e) => {
            eprintln!("could not parse log level {log_level:?} in configuration: {e}");
            return ExitCode::FAILURE;
        }
    };
    let subscriber = tracing_subscriber::fmt::Subscriber::builder()
        .with_env_filter(filter)
        .event_format(Formatter)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("setting default subscriber failed: {e}");
        return ExitCode::FAILURE;
    }
    debug!("Logging subsystem enabled");

    let mut registry = Registry::new();
    if let Err(e) = adapter::register(&mut registry) {
        error!("Could not register loggly adapter: {e}");
        return ExitCode::FAILURE;
    }

    let adapters = match registry.build_routes() {
        Ok(adapters) => adapters,
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    };
    for adapter in &adapters {
        info!("Routing stdin to {} adapter", adapter.name());
    }

    let cancel_token = CancellationToken::new();
    let signal_token = cancel_token.clone();
    tokio::spawn(cancel_on_signal(tokio::signal::ctrl_c(), signal_token));

    route_stdin(&adapters, &cancel_token).await;

    for adapter in adapters {
        adapter.close().await;
    }
    ExitCode::SUCCESS
}

/// Cancels `token` once `signal` fires. A listener that fails to install
/// is logged and leaves the token alone.
async fn cancel_on_signal<F>(signal: F, token: CancellationToken)
where
    F: Future<Output = io::Result<()>>,
{
    match signal.await {
        Ok(()) => {
            debug!("Received interrupt, shutting down");
            token.cancel();
        }
        Err(e) => error!("Unable to listen for interrupt signal: {}", e),
    }
}

/// Feeds every stdin line to every adapter until EOF or cancellation.
async fn route_stdin(adapters: &[Box<dyn LogAdapter>], cancel_token: &CancellationToken) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            () = cancel_token.cancelled() => break,
            line = lines.next_line() => line,
        };
        match line {
            Ok(Some(line)) => {
                let Some(message) = parse_line(&line) else {
                    continue;
                };
                for adapter in adapters {
                    adapter.submit(message.clone());
                }
            }
            Ok(None) => {
                debug!("stdin closed");
                break;
            }
            Err(e) => {
                error!("Failed to read from stdin: {e}");
                break;
            }
        }
    }
}

/// A line is either a JSON source message or raw log text.
fn parse_line(line: &str) -> Option<SourceMessage> {
    let trimmed = line.trim_end_matches('\r');
    if trimmed.trim().is_empty() {
        return None;
    }
    if trimmed.trim_start().starts_with('{') {
        if let Ok(message) = serde_json::from_str::<SourceMessage>(trimmed) {
            return Some(message);
        }
    }
    Some(SourceMessage {
        data: trimmed.to_string(),
        ..Default::default()
    })
}
