// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::time::Duration;

/// Name under which the adapter is registered with the host.
pub const ADAPTER_NAME: &str = "loggly";

pub const LOGGLY_TOKEN_ENV_VAR: &str = "LOGGLY_TOKEN";
pub const LOGGLY_TAGS_ENV_VAR: &str = "LOGGLY_TAGS";
pub const LOGGLY_URL_ENV_VAR: &str = "LOGGLY_URL";
pub const LOGGLY_BUFFER_SIZE_ENV_VAR: &str = "LOGGLY_BUFFER_SIZE";
pub const LOGGLY_FLUSH_INTERVAL_ENV_VAR: &str = "LOGGLY_FLUSH_INTERVAL";
pub const LOGGLY_MAX_IN_FLIGHT_ENV_VAR: &str = "LOGGLY_MAX_IN_FLIGHT";
pub const HTTPS_PROXY_ENV_VAR: &str = "HTTPS_PROXY";

pub const LOGGLY_TAGS_HEADER: &str = "X-LOGGLY-TAG";
pub const DEFAULT_LOGGLY_URL: &str = "https://logs-01.loggly.com";
pub const BULK_PATH: &str = "bulk";

pub const DEFAULT_BATCH_CAPACITY: usize = 100;
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(10);
pub const DEFAULT_MAX_IN_FLIGHT: usize = 16;

/// The host culls any adapter that does not yield within one second, so a
/// single send must give up before that.
pub const CLIENT_TIMEOUT: Duration = Duration::from_millis(900);
