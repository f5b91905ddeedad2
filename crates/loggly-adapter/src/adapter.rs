// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Wires intake, engine and dispatcher into one running Loggly adapter.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::config::AdapterConfig;
use crate::constants::ADAPTER_NAME;
use crate::dispatcher::{DispatchOutcome, DispatcherService};
use crate::engine::BatchingEngine;
use crate::errors::{ConfigError, RegistryError};
use crate::intake::{self, IntakeHandle};
use crate::record::{LogRecord, SourceMessage};
use crate::registry::{CloseFuture, LogAdapter, Registry, Route};
use crate::transport::{LogglyClient, Transport};

pub struct LogglyAdapter {
    intake: IntakeHandle,
    cancel_token: CancellationToken,
    engine_task: JoinHandle<()>,
    dispatcher_task: JoinHandle<()>,
}

impl LogglyAdapter {
    /// Spawns the engine and dispatcher on the current tokio runtime.
    pub fn start(config: AdapterConfig) -> Result<Self, ConfigError> {
        let transport = Arc::new(LogglyClient::new(&config)?);
        Ok(Self::start_with_transport(config, transport, None))
    }

    /// Like [`LogglyAdapter::start`] with a caller-supplied transport and an
    /// optional channel receiving every send's outcome.
    #[must_use]
    pub fn start_with_transport(
        config: AdapterConfig,
        transport: Arc<dyn Transport>,
        outcomes: Option<mpsc::UnboundedSender<DispatchOutcome>>,
    ) -> Self {
        let (mut dispatcher, dispatcher_handle) = DispatcherService::new(&config, transport);
        if let Some(tx) = outcomes {
            dispatcher = dispatcher.with_outcomes(tx);
        }

        let cancel_token = CancellationToken::new();
        let (intake, rx) = intake::channel();
        let engine = BatchingEngine::new(&config, rx, dispatcher_handle, cancel_token.clone());

        let dispatcher_task = tokio::spawn(dispatcher.run());
        let engine_task = tokio::spawn(engine.run());
        debug!("Loggly adapter started, shipping to {}", config.endpoint);

        LogglyAdapter {
            intake,
            cancel_token,
            engine_task,
            dispatcher_task,
        }
    }

    /// Handle for producers; cheap to clone.
    #[must_use]
    pub fn intake(&self) -> IntakeHandle {
        self.intake.clone()
    }

    pub fn send(&self, record: LogRecord) -> Result<(), mpsc::error::SendError<LogRecord>> {
        self.intake.send(record)
    }

    /// Forwards a message stream into the adapter on a background task.
    pub fn stream(&self, messages: mpsc::Receiver<SourceMessage>) -> JoinHandle<()> {
        let intake = self.intake();
        tokio::spawn(async move { intake.forward(messages).await })
    }

    /// Flushes buffered records, then waits for in-flight sends to finish.
    pub async fn shutdown(self) {
        self.cancel_token.cancel();
        if let Err(e) = self.engine_task.await {
            error!("Batching engine task failed: {}", e);
        }
        if let Err(e) = self.dispatcher_task.await {
            error!("Dispatcher task failed: {}", e);
        }
        debug!("Loggly adapter stopped");
    }
}

impl LogAdapter for LogglyAdapter {
    fn name(&self) -> &'static str {
        ADAPTER_NAME
    }

    fn submit(&self, message: SourceMessage) {
        if let Err(e) = self.intake.submit(message) {
            error!("Loggly adapter stopped, dropping record: {}", e);
        }
    }

    fn close(self: Box<Self>) -> CloseFuture {
        Box::pin(LogglyAdapter::shutdown(*self))
    }
}

/// Adds the `loggly` factory and its default route to `registry`.
///
/// The factory reads its settings from the `LOGGLY_*` environment variables.
pub fn register(registry: &mut Registry) -> Result<(), RegistryError> {
    registry.register_factory(ADAPTER_NAME, new_from_env);
    registry.add_route(Route::new(ADAPTER_NAME, ADAPTER_NAME))
}

fn new_from_env(_route: &Route) -> Result<Box<dyn LogAdapter>, ConfigError> {
    let config = AdapterConfig::from_env()?;
    Ok(Box::new(LogglyAdapter::start(config)?))
}
