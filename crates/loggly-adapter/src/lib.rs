// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! # Loggly adapter
//!
//! Buffered, time-bounded shipping of container log records to the Loggly
//! bulk ingestion endpoint.
//!
//! ```text
//!   producer ──> intake ──> BatchingEngine ──> Dispatcher ──> Loggly /bulk
//!                (mpsc)     (capacity | deadline)  (bounded pool of sends)
//! ```
//!
//! - [`intake`]: unbounded hand-off channel between producers and the engine
//! - [`engine`]: owns the open batch and the flush deadline
//! - [`dispatcher`]: fire-and-forget sends, one POST per batch
//! - [`transport`]: the HTTP capability used by the dispatcher
//! - [`registry`]: explicit adapter/route registration for the host process

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

pub mod adapter;
pub mod batch;
pub mod config;
pub mod constants;
pub mod dispatcher;
pub mod engine;
pub mod errors;
pub mod http;
pub mod intake;
pub mod logger;
pub mod record;
pub mod registry;
pub mod transport;
