// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Hand-off channel between producers and the batching engine.
//!
//! Any number of producers hold a cloned [`IntakeHandle`]; exactly one
//! [`BatchingEngine`](crate::engine::BatchingEngine) owns the receiving end.
//! The channel is unbounded, so a send never waits on the engine's pace.

use tokio::sync::mpsc;
use tracing::{debug, error};

use crate::record::{LogRecord, SourceMessage};

pub type IntakeReceiver = mpsc::UnboundedReceiver<LogRecord>;

#[derive(Clone, Debug)]
pub struct IntakeHandle {
    tx: mpsc::UnboundedSender<LogRecord>,
}

/// Creates a connected handle/receiver pair.
#[must_use]
pub fn channel() -> (IntakeHandle, IntakeReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (IntakeHandle { tx }, rx)
}

impl IntakeHandle {
    /// Queues one record for batching.
    ///
    /// Fails only once the engine has stopped; the record is handed back.
    pub fn send(&self, record: LogRecord) -> Result<(), mpsc::error::SendError<LogRecord>> {
        self.tx.send(record)
    }

    pub fn submit(&self, message: SourceMessage) -> Result<(), mpsc::error::SendError<LogRecord>> {
        self.send(LogRecord::from(message))
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Pumps a stream of source messages into the intake until the stream
    /// ends or the engine stops.
    pub async fn forward(&self, mut messages: mpsc::Receiver<SourceMessage>) {
        while let Some(message) = messages.recv().await {
            if let Err(e) = self.submit(message) {
                error!("Failed to queue log record, batching engine stopped: {}", e);
                return;
            }
        }
        debug!("Log stream ended");
    }
}
