// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use tracing::error;

use crate::config::AdapterConfig;
use crate::constants::LOGGLY_TAGS_HEADER;
use crate::errors::{ConfigError, ShippingError};
use crate::http::get_client;

/// Executes one "send batch" call against the ingestion endpoint.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends one encoded batch. Implementations make exactly one attempt.
    async fn send(&self, body: Vec<u8>) -> Result<(), ShippingError>;
}

/// Loggly bulk endpoint over HTTP.
#[derive(Debug, Clone)]
pub struct LogglyClient {
    client: reqwest::Client,
    url: String,
    headers: HeaderMap,
}

impl LogglyClient {
    pub fn new(config: &AdapterConfig) -> Result<Self, ConfigError> {
        Ok(LogglyClient {
            client: get_client(config)?,
            url: config.bulk_url(),
            headers: build_headers(config),
        })
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }
}

fn build_headers(config: &AdapterConfig) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));

    // No tags means no header at all, never an empty one.
    if let Some(tags) = config.tags.header_value() {
        match HeaderValue::from_str(tags) {
            Ok(value) => {
                headers.insert(LOGGLY_TAGS_HEADER, value);
            }
            Err(e) => error!("Ignoring tags {:?}, not a valid header value: {}", tags, e),
        }
    }
    headers
}

#[async_trait]
impl Transport for LogglyClient {
    async fn send(&self, body: Vec<u8>) -> Result<(), ShippingError> {
        let resp = self
            .client
            .post(&self.url)
            .headers(self.headers.clone())
            .body(body)
            .send()
            .await
            .map_err(|e| ShippingError::Transport(describe(&e)))?;

        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }
        let body = resp.text().await.unwrap_or_default();
        Err(ShippingError::Rejected { status, body })
    }
}

fn describe(e: &reqwest::Error) -> String {
    if e.is_timeout() {
        format!("request timed out: {e}")
    } else if e.is_connect() {
        format!("connection failed: {e}")
    } else {
        e.to_string()
    }
}
