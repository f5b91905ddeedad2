// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! reqwest client construction for the bulk endpoint.

use std::time::Duration;

use tracing::error;

use crate::config::AdapterConfig;
use crate::errors::ConfigError;

/// Builds the client used for every send.
///
/// An unparsable proxy is logged and the client falls back to a direct
/// connection rather than refusing to ship logs.
pub fn get_client(config: &AdapterConfig) -> Result<reqwest::Client, ConfigError> {
    match build_client(config, true) {
        Ok(client) => Ok(client),
        Err(e) => {
            error!(
                "Unable to parse proxy configuration: {}, falling back to direct connection",
                e
            );
            build_client(config, false).map_err(|e| ConfigError::HttpClient(e.to_string()))
        }
    }
}

fn build_client(
    config: &AdapterConfig,
    allow_proxy: bool,
) -> Result<reqwest::Client, reqwest::Error> {
    let mut client = reqwest::Client::builder()
        .timeout(config.client_timeout)
        .pool_idle_timeout(Some(Duration::from_secs(90)))
        .tcp_keepalive(Some(Duration::from_secs(120)));

    if allow_proxy {
        if let Some(https_uri) = &config.https_proxy {
            let proxy = reqwest::Proxy::https(https_uri.clone())?;
            client = client.proxy(proxy);
        }
    }

    client.build()
}
