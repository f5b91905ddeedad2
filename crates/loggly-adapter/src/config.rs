// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::env;
use std::time::Duration;

use crate::constants::{
    BULK_PATH, CLIENT_TIMEOUT, DEFAULT_BATCH_CAPACITY, DEFAULT_FLUSH_INTERVAL,
    DEFAULT_LOGGLY_URL, DEFAULT_MAX_IN_FLIGHT, HTTPS_PROXY_ENV_VAR, LOGGLY_BUFFER_SIZE_ENV_VAR,
    LOGGLY_FLUSH_INTERVAL_ENV_VAR, LOGGLY_MAX_IN_FLIGHT_ENV_VAR, LOGGLY_TAGS_ENV_VAR,
    LOGGLY_TOKEN_ENV_VAR, LOGGLY_URL_ENV_VAR,
};
use crate::errors::ConfigError;

/// Normalized Loggly tags.
///
/// Loggly takes tags as a comma-separated list. Entries are trimmed and empty
/// entries dropped, so `" a, ,b "` becomes `"a,b"` and `" , "` means no tags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tags {
    joined: Option<String>,
}

impl Tags {
    #[must_use]
    pub fn from_env_string(env_tags: &str) -> Self {
        let tags = env_tags
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .collect::<Vec<&str>>();
        if tags.is_empty() {
            return Self { joined: None };
        }
        Self {
            joined: Some(tags.join(",")),
        }
    }

    /// Header value, or `None` when the header must be omitted.
    #[must_use]
    pub fn header_value(&self) -> Option<&str> {
        self.joined.as_deref()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.joined.is_none()
    }
}

/// Settings for one adapter. Immutable once the adapter is built and shared
/// read-only by every dispatch task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterConfig {
    /// Base URL of the ingestion endpoint, without trailing slash.
    pub endpoint: String,
    pub token: String,
    pub tags: Tags,
    /// Records per batch; a full batch is flushed immediately.
    pub batch_capacity: usize,
    /// Time since the last flush after which a partial batch is flushed.
    pub flush_interval: Duration,
    /// Timeout applied to every POST.
    pub client_timeout: Duration,
    /// Upper bound on concurrent sends.
    pub max_in_flight: usize,
    pub https_proxy: Option<String>,
}

impl AdapterConfig {
    /// Builds a config with defaults for everything but the token.
    ///
    /// An empty token is rejected: the adapter cannot be constructed without one.
    pub fn new(token: impl Into<String>) -> Result<Self, ConfigError> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(ConfigError::MissingToken(LOGGLY_TOKEN_ENV_VAR));
        }
        Ok(AdapterConfig {
            endpoint: DEFAULT_LOGGLY_URL.to_string(),
            token,
            tags: Tags::default(),
            batch_capacity: DEFAULT_BATCH_CAPACITY,
            flush_interval: DEFAULT_FLUSH_INTERVAL,
            client_timeout: CLIENT_TIMEOUT,
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
            https_proxy: None,
        })
    }

    /// Reads the `LOGGLY_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let token = lookup(LOGGLY_TOKEN_ENV_VAR).unwrap_or_default();
        let mut config = Self::new(token)?;

        if let Some(tags) = lookup(LOGGLY_TAGS_ENV_VAR) {
            config = config.with_tags(&tags);
        }
        if let Some(url) = lookup(LOGGLY_URL_ENV_VAR).filter(|u| !u.trim().is_empty()) {
            config = config.with_endpoint(url);
        }
        if let Some(raw) = lookup(LOGGLY_BUFFER_SIZE_ENV_VAR) {
            let capacity = parse_positive(LOGGLY_BUFFER_SIZE_ENV_VAR, &raw)?;
            config = config.with_batch_capacity(capacity)?;
        }
        if let Some(raw) = lookup(LOGGLY_FLUSH_INTERVAL_ENV_VAR) {
            let secs = parse_positive(LOGGLY_FLUSH_INTERVAL_ENV_VAR, &raw)?;
            config = config.with_flush_interval(Duration::from_secs(secs as u64))?;
        }
        if let Some(raw) = lookup(LOGGLY_MAX_IN_FLIGHT_ENV_VAR) {
            let max = parse_positive(LOGGLY_MAX_IN_FLIGHT_ENV_VAR, &raw)?;
            config = config.with_max_in_flight(max)?;
        }
        config.https_proxy = lookup(HTTPS_PROXY_ENV_VAR).filter(|p| !p.trim().is_empty());

        Ok(config)
    }

    #[must_use]
    pub fn with_tags(mut self, tags: &str) -> Self {
        self.tags = Tags::from_env_string(tags);
        self
    }

    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        let endpoint: String = endpoint.into();
        self.endpoint = endpoint.trim().trim_end_matches('/').to_string();
        self
    }

    pub fn with_batch_capacity(mut self, capacity: usize) -> Result<Self, ConfigError> {
        if capacity == 0 {
            return Err(ConfigError::Zero("batch capacity"));
        }
        self.batch_capacity = capacity;
        Ok(self)
    }

    pub fn with_flush_interval(mut self, interval: Duration) -> Result<Self, ConfigError> {
        if interval.is_zero() {
            return Err(ConfigError::Zero("flush interval"));
        }
        self.flush_interval = interval;
        Ok(self)
    }

    pub fn with_max_in_flight(mut self, max: usize) -> Result<Self, ConfigError> {
        if max == 0 {
            return Err(ConfigError::Zero("max in flight"));
        }
        self.max_in_flight = max;
        Ok(self)
    }

    #[must_use]
    pub fn with_client_timeout(mut self, timeout: Duration) -> Self {
        self.client_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_https_proxy(mut self, proxy: Option<String>) -> Self {
        self.https_proxy = proxy;
        self
    }

    /// `{endpoint}/bulk/{token}`
    #[must_use]
    pub fn bulk_url(&self) -> String {
        format!("{}/{}/{}", self.endpoint, BULK_PATH, self.token)
    }
}

fn parse_positive(name: &'static str, raw: &str) -> Result<usize, ConfigError> {
    match raw.trim().parse::<usize>() {
        Ok(0) => Err(ConfigError::Zero(name)),
        Ok(n) => Ok(n),
        Err(_) => Err(ConfigError::InvalidNumber {
            name,
            value: raw.to_string(),
        }),
    }
}
