// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Log records as shipped to Loggly, and the producer-side message they are
//! projected from.

use serde::{Deserialize, Serialize};

/// One log line with the metadata of the container that emitted it.
///
/// Serialized as a single JSON object; `container_hostname` goes on the wire
/// as `hostname`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRecord {
    pub message: String,
    pub container_name: String,
    pub container_id: String,
    pub container_image: String,
    #[serde(rename = "hostname")]
    pub container_hostname: String,
}

/// A raw log line as yielded by the upstream log source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SourceMessage {
    pub data: String,
    #[serde(default)]
    pub container: Container,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Container {
    pub name: String,
    pub id: String,
    pub config: ContainerConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ContainerConfig {
    pub image: String,
    pub hostname: String,
}

impl From<SourceMessage> for LogRecord {
    fn from(msg: SourceMessage) -> Self {
        LogRecord {
            message: msg.data,
            container_name: msg.container.name,
            container_id: msg.container.id,
            container_image: msg.container.config.image,
            container_hostname: msg.container.config.hostname,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_source_message() {
        let msg = SourceMessage {
            data: "GET / 200".to_string(),
            container: Container {
                name: "/web".to_string(),
                id: "abc123".to_string(),
                config: ContainerConfig {
                    image: "nginx:1.25".to_string(),
                    hostname: "web-1".to_string(),
                },
            },
        };

        let record = LogRecord::from(msg);

        assert_eq!(record.message, "GET / 200");
        assert_eq!(record.container_name, "/web");
        assert_eq!(record.container_id, "abc123");
        assert_eq!(record.container_image, "nginx:1.25");
        assert_eq!(record.container_hostname, "web-1");
    }

    #[test]
    fn test_wire_keys() {
        let record = LogRecord {
            message: "hello".to_string(),
            container_name: "n".to_string(),
            container_id: "i".to_string(),
            container_image: "img".to_string(),
            container_hostname: "h".to_string(),
        };

        let value = serde_json::to_value(&record).unwrap();
        let obj = value.as_object().unwrap();

        assert_eq!(obj.len(), 5);
        assert_eq!(obj["message"], "hello");
        assert_eq!(obj["container_name"], "n");
        assert_eq!(obj["container_id"], "i");
        assert_eq!(obj["container_image"], "img");
        assert_eq!(obj["hostname"], "h");
        assert!(!obj.contains_key("container_hostname"));
    }

    #[test]
    fn test_source_message_missing_container() {
        let msg: SourceMessage = serde_json::from_str(r#"{"data":"plain line"}"#).unwrap();
        let record = LogRecord::from(msg);

        assert_eq!(record.message, "plain line");
        assert!(record.container_name.is_empty());
        assert!(record.container_hostname.is_empty());
    }
}
