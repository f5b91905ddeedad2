// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! The batching loop.
//!
//! One [`BatchingEngine`] task owns the open batch and the flush deadline;
//! nothing else reads or writes either, so no locks are involved. The loop
//! waits on two events:
//!
//! - **record arrival**: append to the open batch; once it holds `capacity`
//!   records it is handed to the dispatcher (capacity flush)
//! - **deadline expiry**: hand over the open batch if it is non-empty
//!   (deadline flush); an empty batch costs no network call
//!
//! The deadline is re-armed to `flush_interval` after every flush decision,
//! so it measures time since the last flush. Handing over a batch is a
//! channel send; the loop never waits on network I/O.
//!
//! On cancellation, or once every intake handle is dropped, the engine
//! closes the intake, batches whatever is still queued and flushes the open
//! batch before returning.

use std::fmt;
use std::time::Duration;

use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::batch::Batch;
use crate::config::AdapterConfig;
use crate::dispatcher::DispatcherHandle;
use crate::intake::IntakeReceiver;
use crate::record::LogRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushTrigger {
    Capacity,
    Deadline,
    Shutdown,
}

impl fmt::Display for FlushTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Capacity => write!(f, "capacity"),
            Self::Deadline => write!(f, "deadline"),
            Self::Shutdown => write!(f, "shutdown"),
        }
    }
}

// Roughly 30 years, the same horizon tokio uses for an unbounded sleep.
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

pub struct BatchingEngine {
    rx: IntakeReceiver,
    dispatcher: DispatcherHandle,
    batch: Batch,
    capacity: usize,
    flush_interval: Duration,
    cancel_token: CancellationToken,
}

impl BatchingEngine {
    #[must_use]
    pub fn new(
        config: &AdapterConfig,
        rx: IntakeReceiver,
        dispatcher: DispatcherHandle,
        cancel_token: CancellationToken,
    ) -> Self {
        let capacity = config.batch_capacity.max(1);
        BatchingEngine {
            rx,
            dispatcher,
            batch: Batch::new(capacity),
            capacity,
            flush_interval: config.flush_interval,
            cancel_token,
        }
    }

    pub async fn run(mut self) {
        debug!(
            "Batching engine started: capacity {}, flush interval {:?}",
            self.capacity, self.flush_interval
        );
        let deadline = sleep_until(self.next_deadline());
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                biased;
                () = self.cancel_token.cancelled() => break,
                maybe_record = self.rx.recv() => {
                    let Some(record) = maybe_record else {
                        debug!("All intake handles dropped");
                        break;
                    };
                    if self.insert(record) {
                        deadline.as_mut().reset(self.next_deadline());
                    }
                }
                () = &mut deadline => {
                    self.flush(FlushTrigger::Deadline);
                    deadline.as_mut().reset(self.next_deadline());
                }
            }
        }

        self.drain();
        debug!("Batching engine stopped");
    }

    /// Intervals too large to represent are treated as "never".
    fn next_deadline(&self) -> Instant {
        let now = Instant::now();
        now.checked_add(self.flush_interval)
            .unwrap_or_else(|| now + FAR_FUTURE)
    }

    /// Adds a record to the open batch. Returns whether a flush happened.
    fn insert(&mut self, record: LogRecord) -> bool {
        let mut flushed = false;
        if self.batch.is_full() {
            // A full batch is always flushed on the insert that filled it.
            warn!(
                "Open batch already holds {} records before insert, flushing it first",
                self.batch.len()
            );
            self.flush(FlushTrigger::Capacity);
            flushed = true;
        }

        if let Err(record) = self.batch.push(record) {
            error!(
                "Dropping log record from {}: fresh batch rejected it",
                record.container_name
            );
            return flushed;
        }

        if self.batch.is_full() {
            self.flush(FlushTrigger::Capacity);
            flushed = true;
        }
        flushed
    }

    /// Hands the open batch to the dispatcher and opens a fresh one.
    fn flush(&mut self, trigger: FlushTrigger) {
        if self.batch.is_empty() {
            return;
        }
        let batch = std::mem::replace(&mut self.batch, Batch::new(self.capacity));
        debug!("Flushing {} records ({} flush)", batch.len(), trigger);
        if let Err(e) = self.dispatcher.dispatch(batch) {
            error!(
                "Dispatcher stopped, dropping batch of {} records",
                e.0.len()
            );
        }
    }

    fn drain(&mut self) {
        self.rx.close();
        let mut drained = 0;
        while let Ok(record) = self.rx.try_recv() {
            self.insert(record);
            drained += 1;
        }
        if drained > 0 {
            debug!("Drained {} queued records on shutdown", drained);
        }
        self.flush(FlushTrigger::Shutdown);
    }
}
