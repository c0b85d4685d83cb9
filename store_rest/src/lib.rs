//! [`KvStore`] backend for a managed Redis service with a REST interface.
//!
//! Each command is posted as a JSON argument array:
//!
//! - `POST {url}` with `["SET", "k", "v"]` answers `{"result": ...}` or `{"error": "..."}`
//! - `POST {url}/pipeline` with `[[...], [...]]` answers one envelope per command
//! - `POST {url}/multi-exec` runs the same body as a `MULTI`/`EXEC` transaction
//!
//! Requests carry `Authorization: Bearer <token>`.

use std::time::Duration;

use async_trait::async_trait;
use blaze_store::{BatchMode, Command, KvStore, Reply, StoreError};
use serde::Deserialize;
use serde_json::Value;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// One reply envelope.
#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<String>,
}

impl Envelope {
    fn into_reply(self) -> Result<Reply, StoreError> {
        if let Some(error) = self.error {
            return Err(StoreError::Command(error));
        }
        json_to_reply(self.result.unwrap_or(Value::Null))
    }
}

/// A batch answer: one envelope per command, or a single error for the batch.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum BatchResponse {
    Replies(Vec<Envelope>),
    Failed(Envelope),
}

/// Convert a JSON result into a [`Reply`].
pub fn json_to_reply(value: Value) -> Result<Reply, StoreError> {
    match value {
        Value::Null => Ok(Reply::Nil),
        Value::Bool(b) => Ok(Reply::Int(i64::from(b))),
        Value::Number(n) => match n.as_i64() {
            Some(i) => Ok(Reply::Int(i)),
            None => Ok(Reply::Bulk(n.to_string())),
        },
        Value::String(s) => Ok(Reply::Bulk(s)),
        Value::Array(items) => items
            .into_iter()
            .map(json_to_reply)
            .collect::<Result<Vec<_>, _>>()
            .map(Reply::Array),
        Value::Object(_) => Err(StoreError::Serialization(format!(
            "unsupported reply shape: {value}"
        ))),
    }
}

fn map_transport(e: reqwest::Error) -> StoreError {
    if e.is_timeout() {
        StoreError::Timeout
    } else if e.is_connect() {
        StoreError::Unavailable(format!("connection failed: {e}"))
    } else {
        StoreError::Backend(e.to_string())
    }
}

/// A [`KvStore`] talking to the REST endpoint at `url`.
pub struct RestKvStore {
    http_client: reqwest::Client,
    url: String,
    token: String,
}

impl RestKvStore {
    pub fn new(url: impl Into<String>, token: impl Into<String>) -> Self {
        Self::with_timeout(url, token, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(url: impl Into<String>, token: impl Into<String>, timeout: Duration) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            http_client,
            url: url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn post(&self, path: &str, body: &Value) -> Result<Value, StoreError> {
        let url = format!("{}{}", self.url, path);
        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.token)
            .json(body)
            .send()
            .await
            .map_err(map_transport)?;

        let status = response.status();
        let payload: Value = response
            .json()
            .await
            .map_err(|e| StoreError::Serialization(format!("invalid store response: {e}")))?;

        // Command errors come back as 4xx with an `error` body.
        if !status.is_success() && payload.get("error").is_none() {
            return Err(StoreError::Backend(format!("HTTP status {status}")));
        }
        Ok(payload)
    }
}

#[async_trait]
impl KvStore for RestKvStore {
    async fn execute(&self, command: Command) -> Result<Reply, StoreError> {
        tracing::trace!(command = command.name(), "kv command");
        let payload = self.post("", &serde_json::json!(command.to_args())).await?;
        serde_json::from_value::<Envelope>(payload)?.into_reply()
    }

    async fn execute_batch(
        &self,
        commands: Vec<Command>,
        mode: BatchMode,
    ) -> Result<Vec<Reply>, StoreError> {
        if commands.is_empty() {
            return Ok(Vec::new());
        }
        let path = match mode {
            BatchMode::Pipeline => "/pipeline",
            BatchMode::Transaction => "/multi-exec",
        };
        tracing::trace!(count = commands.len(), ?mode, "kv batch");
        let body: Vec<Vec<String>> = commands.iter().map(Command::to_args).collect();
        let payload = self.post(path, &serde_json::json!(body)).await?;
        parse_batch(payload, commands.len(), mode)
    }
}

fn parse_batch(payload: Value, expected: usize, mode: BatchMode) -> Result<Vec<Reply>, StoreError> {
    match serde_json::from_value::<BatchResponse>(payload)? {
        BatchResponse::Failed(envelope) => match envelope.error {
            Some(_) if mode == BatchMode::Transaction => Err(StoreError::TransactionAborted),
            Some(error) => Err(StoreError::Command(error)),
            None => Err(StoreError::Serialization("batch reply is not a list".into())),
        },
        BatchResponse::Replies(envelopes) => {
            if envelopes.len() != expected {
                return Err(StoreError::Serialization(format!(
                    "expected {expected} replies, got {}",
                    envelopes.len()
                )));
            }
            envelopes.into_iter().map(Envelope::into_reply).collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_results_map_to_replies() {
        assert_eq!(json_to_reply(json!(null)).unwrap(), Reply::Nil);
        assert_eq!(json_to_reply(json!(7)).unwrap(), Reply::Int(7));
        assert_eq!(json_to_reply(json!("OK")).unwrap(), Reply::Bulk("OK".into()));
        assert_eq!(
            json_to_reply(json!(["a", 1, null])).unwrap(),
            Reply::Array(vec![Reply::Bulk("a".into()), Reply::Int(1), Reply::Nil])
        );
        assert!(json_to_reply(json!({"x": 1})).is_err());
    }

    #[test]
    fn error_envelope_is_command_error() {
        let env: Envelope = serde_json::from_value(json!({"error": "WRONGTYPE"})).unwrap();
        assert!(matches!(env.into_reply(), Err(StoreError::Command(m)) if m == "WRONGTYPE"));
    }

    #[test]
    fn pipeline_replies_in_order() {
        let payload = json!([{"result": "OK"}, {"result": 3}]);
        let replies = parse_batch(payload, 2, BatchMode::Pipeline).unwrap();
        assert_eq!(replies, vec![Reply::Bulk("OK".into()), Reply::Int(3)]);
    }

    #[test]
    fn pipeline_entry_error_propagates() {
        let payload = json!([{"result": "OK"}, {"error": "ERR value is not an integer"}]);
        assert!(matches!(
            parse_batch(payload, 2, BatchMode::Pipeline),
            Err(StoreError::Command(_))
        ));
    }

    #[test]
    fn aborted_transaction() {
        let payload = json!({"error": "EXECABORT"});
        assert!(matches!(
            parse_batch(payload, 1, BatchMode::Transaction),
            Err(StoreError::TransactionAborted)
        ));
    }

    #[test]
    fn reply_count_mismatch() {
        let payload = json!([{"result": "OK"}]);
        assert!(parse_batch(payload, 2, BatchMode::Transaction).is_err());
    }

    #[test]
    fn trailing_slash_is_trimmed() {
        let store = RestKvStore::new("https://kv.example.com/", "t");
        assert_eq!(store.url(), "https://kv.example.com");
    }

    #[tokio::test]
    async fn unreachable_backend_is_an_error() {
        let store =
            RestKvStore::with_timeout("http://127.0.0.1:1", "t", Duration::from_millis(500));
        let err = store.get("k").await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::Unavailable(_) | StoreError::Timeout | StoreError::Backend(_)
        ));
    }
}
