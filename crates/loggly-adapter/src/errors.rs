// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use reqwest::StatusCode;

/// Errors raised while building an [`AdapterConfig`](crate::config::AdapterConfig).
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("could not find environment variable {0}")]
    MissingToken(&'static str),
    #[error("{name} must be a positive integer, got {value:?}")]
    InvalidNumber { name: &'static str, value: String },
    #[error("{0} must be greater than zero")]
    Zero(&'static str),
    #[error("could not build HTTP client: {0}")]
    HttpClient(String),
}

/// Errors raised while registering adapters or building their routes.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("no adapter factory registered under {0:?}")]
    UnknownAdapter(String),
    #[error("route {0:?} already exists")]
    DuplicateRoute(String),
    #[error("could not create {adapter} adapter for route {route:?}: {source}")]
    Factory {
        adapter: String,
        route: String,
        #[source]
        source: ConfigError,
    },
}

/// Why a single batch could not be delivered. Batches are never retried.
#[derive(Debug, thiserror::Error)]
pub enum ShippingError {
    #[error("error from client: {0}")]
    Transport(String),
    #[error("received a {status} status code when sending message. response: {body}")]
    Rejected { status: StatusCode, body: String },
}

impl ShippingError {
    #[must_use]
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Transport(_) => None,
            Self::Rejected { status, .. } => Some(*status),
        }
    }
}
