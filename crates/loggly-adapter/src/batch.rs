// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Bounded, insertion-ordered batches and their bulk wire encoding.
//!
//! The Loggly bulk endpoint takes newline-delimited JSON: one object per
//! record, each followed by `\n`, with no enclosing array.

use serde::Serialize;
use tracing::error;

use crate::record::LogRecord;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    records: Vec<LogRecord>,
    capacity: usize,
}

impl Batch {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Batch {
            records: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Appends a record. Callers check [`Batch::is_full`] first; a record
    /// pushed onto a full batch is handed back.
    pub fn push(&mut self, record: LogRecord) -> Result<(), LogRecord> {
        if self.is_full() {
            return Err(record);
        }
        self.records.push(record);
        Ok(())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[must_use]
    pub fn is_full(&self) -> bool {
        self.records.len() >= self.capacity
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[must_use]
    pub fn records(&self) -> &[LogRecord] {
        &self.records
    }

    /// Newline-delimited JSON body for the bulk endpoint.
    ///
    /// A record that fails to encode is logged and left out; the rest of the
    /// batch is still encoded.
    #[must_use]
    pub fn to_ndjson(&self) -> Vec<u8> {
        encode_ndjson(&self.records)
    }
}

pub(crate) fn encode_ndjson<T: Serialize>(items: &[T]) -> Vec<u8> {
    let mut body = Vec::new();
    for item in items {
        let mark = body.len();
        match serde_json::to_writer(&mut body, item) {
            Ok(()) => body.push(b'\n'),
            Err(e) => {
                body.truncate(mark);
                error!("Failed to serialize log record, skipping it: {}", e);
            }
        }
    }
    body
}
