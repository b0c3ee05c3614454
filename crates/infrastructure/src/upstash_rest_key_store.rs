//! Key store adapter for the Upstash REST protocol.
//!
//! Every command is one `POST` of a JSON array such as `["INCR", "key"]`,
//! authenticated with a bearer token. The server answers `{"result": ...}` or
//! `{"error": "..."}`.

use std::time::Duration;

use async_trait::async_trait;
use fitgate_application::{KeyStore, KeyTtl};
use fitgate_core::{StoreResult, TransportError};
use serde::Deserialize;
use serde_json::Value;
use url::Url;

use crate::store_timeout::within_deadline;

#[derive(Debug, Deserialize)]
struct RestReply {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<String>,
}

/// REST implementation of the key store port.
#[derive(Clone)]
pub struct UpstashRestKeyStore {
    http_client: reqwest::Client,
    endpoint: Url,
    token: String,
    timeout: Duration,
}

impl UpstashRestKeyStore {
    /// Creates a store for one REST endpoint.
    #[must_use]
    pub fn new(
        http_client: reqwest::Client,
        endpoint: Url,
        token: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            http_client,
            endpoint,
            token: token.into(),
            timeout,
        }
    }

    async fn execute(&self, command: &[&str]) -> StoreResult<Value> {
        let name = command.first().copied().unwrap_or_default();

        within_deadline(self.timeout, async {
            let response = self
                .http_client
                .post(self.endpoint.clone())
                .bearer_auth(self.token.as_str())
                .json(command)
                .send()
                .await
                .map_err(|error| {
                    TransportError::Connection(format!("upstash {name} request failed: {error}"))
                })?;

            let status = response.status();
            let body = response.text().await.map_err(|error| {
                TransportError::Connection(format!("upstash {name} response was cut off: {error}"))
            })?;

            decode_reply(name, status.as_u16(), &body)
        })
        .await
    }
}

fn decode_reply(command: &str, status: u16, body: &str) -> StoreResult<Value> {
    let reply: RestReply = serde_json::from_str(body).map_err(|error| {
        TransportError::MalformedResponse(format!(
            "upstash {command} returned status {status} with unreadable body: {error}"
        ))
    })?;

    if let Some(message) = reply.error {
        return Err(TransportError::Command(format!(
            "upstash {command} failed: {message}"
        )));
    }
    if !(200..300).contains(&status) {
        return Err(TransportError::Command(format!(
            "upstash {command} returned status {status}"
        )));
    }

    Ok(reply.result.unwrap_or(Value::Null))
}

fn malformed(command: &str, value: &Value) -> TransportError {
    TransportError::MalformedResponse(format!("unexpected upstash {command} result: {value}"))
}

fn as_optional_string(command: &str, value: Value) -> StoreResult<Option<String>> {
    match value {
        Value::Null => Ok(None),
        Value::String(text) => Ok(Some(text)),
        other => Err(malformed(command, &other)),
    }
}

fn as_integer(command: &str, value: &Value) -> StoreResult<i64> {
    match value {
        Value::Number(number) => number.as_i64().ok_or_else(|| malformed(command, value)),
        Value::String(text) => text.parse().map_err(|_| malformed(command, value)),
        _ => Err(malformed(command, value)),
    }
}

fn as_string_list(command: &str, value: Value) -> StoreResult<Vec<String>> {
    match value {
        Value::Null => Ok(Vec::new()),
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::String(text) => Ok(text),
                other => Err(malformed(command, &other)),
            })
            .collect(),
        other => Err(malformed(command, &other)),
    }
}

#[async_trait]
impl KeyStore for UpstashRestKeyStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let result = self.execute(&["GET", key]).await?;
        as_optional_string("GET", result)
    }

    async fn set_with_expiry(&self, key: &str, value: &str, ttl_seconds: u64) -> StoreResult<()> {
        let ttl = ttl_seconds.to_string();
        self.execute(&["SET", key, value, "EX", ttl.as_str()])
            .await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        self.execute(&["DEL", key]).await?;
        Ok(())
    }

    async fn increment(&self, key: &str) -> StoreResult<i64> {
        let result = self.execute(&["INCR", key]).await?;
        as_integer("INCR", &result)
    }

    async fn expire(&self, key: &str, ttl_seconds: u64) -> StoreResult<bool> {
        let ttl = ttl_seconds.to_string();
        let result = self.execute(&["EXPIRE", key, ttl.as_str()]).await?;
        Ok(as_integer("EXPIRE", &result)? == 1)
    }

    async fn ttl(&self, key: &str) -> StoreResult<KeyTtl> {
        let result = self.execute(&["TTL", key]).await?;
        Ok(KeyTtl::from_raw(as_integer("TTL", &result)?))
    }

    async fn ping(&self) -> StoreResult<()> {
        match self.execute(&["PING"]).await? {
            Value::String(reply) if reply == "PONG" => Ok(()),
            other => Err(malformed("PING", &other)),
        }
    }

    async fn add_member(&self, set_key: &str, member: &str) -> StoreResult<()> {
        self.execute(&["SADD", set_key, member]).await?;
        Ok(())
    }

    async fn members(&self, set_key: &str) -> StoreResult<Vec<String>> {
        let result = self.execute(&["SMEMBERS", set_key]).await?;
        as_string_list("SMEMBERS", result)
    }

    async fn remove_member(&self, set_key: &str, member: &str) -> StoreResult<()> {
        self.execute(&["SREM", set_key, member]).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use fitgate_application::KeyStore;
    use fitgate_core::TransportError;
    use serde_json::{Value, json};
    use url::Url;

    use super::{UpstashRestKeyStore, as_integer, as_optional_string, as_string_list, decode_reply};

    #[test]
    fn result_envelope_is_unwrapped() {
        assert_eq!(decode_reply("GET", 200, r#"{"result":"3"}"#), Ok(json!("3")));
        assert_eq!(decode_reply("GET", 200, r#"{"result":null}"#), Ok(Value::Null));
    }

    #[test]
    fn error_envelope_is_a_command_error() {
        let reply = decode_reply(
            "INCR",
            400,
            r#"{"error":"ERR value is not an integer or out of range"}"#,
        );

        assert!(matches!(
            reply,
            Err(TransportError::Command(message)) if message.contains("not an integer")
        ));
    }

    #[test]
    fn non_success_status_without_error_fails() {
        assert!(matches!(
            decode_reply("GET", 502, r#"{}"#),
            Err(TransportError::Command(_))
        ));
    }

    #[test]
    fn unreadable_body_is_malformed() {
        assert!(matches!(
            decode_reply("GET", 401, "Unauthorized"),
            Err(TransportError::MalformedResponse(_))
        ));
    }

    #[test]
    fn result_shapes_are_decoded() {
        assert_eq!(as_optional_string("GET", Value::Null), Ok(None));
        assert_eq!(
            as_optional_string("GET", json!("x")),
            Ok(Some("x".to_owned()))
        );
        assert!(as_optional_string("GET", json!(1)).is_err());

        assert_eq!(as_integer("INCR", &json!(4)), Ok(4));
        assert_eq!(as_integer("TTL", &json!(-2)), Ok(-2));
        assert!(as_integer("INCR", &json!("four")).is_err());

        assert_eq!(
            as_string_list("SMEMBERS", json!(["a", "b"])),
            Ok(vec!["a".to_owned(), "b".to_owned()])
        );
        assert!(as_string_list("SMEMBERS", json!([1])).is_err());
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_a_transport_error() {
        let Ok(endpoint) = Url::parse("http://127.0.0.1:1") else {
            panic!("endpoint rejected");
        };
        let store = UpstashRestKeyStore::new(
            reqwest::Client::new(),
            endpoint,
            "token",
            Duration::from_millis(500),
        );

        assert!(matches!(
            store.increment("ratelimit:a:1").await,
            Err(TransportError::Connection(_) | TransportError::Timeout(_))
        ));
    }
}
