//! HTTP client for a Stacks-style node API.

use std::time::Duration;

use async_trait::async_trait;
use blaze_clarity::ClarityValue;
use blaze_types::Principal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{BroadcastResponse, ChainClient, ChainError};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const API_KEY_HEADER: &str = "x-api-key";

#[derive(Debug, Serialize)]
struct ReadOnlyRequest {
    sender: String,
    arguments: Vec<String>,
}

/// `{"okay": true, "result": "0x.."}` or `{"okay": false, "cause": ".."}`.
#[derive(Debug, Deserialize)]
struct ReadOnlyResponse {
    okay: bool,
    #[serde(default)]
    result: Option<String>,
    #[serde(default)]
    cause: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AccountResponse {
    nonce: u64,
}

/// A [`ChainClient`] over HTTP.
pub struct HttpChainClient {
    http_client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpChainClient {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self::with_timeout(base_url, api_key, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(
        base_url: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.is_empty()),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => request.header(API_KEY_HEADER, key),
            None => request,
        }
    }

    fn read_only_url(&self, contract: &Principal, function: &str) -> Result<String, ChainError> {
        let (address, name) = contract.contract_parts().ok_or_else(|| {
            ChainError::ReadOnly(format!("{contract} is not a contract principal"))
        })?;
        Ok(format!(
            "{}/v2/contracts/call-read/{}/{}/{}",
            self.base_url, address, name, function
        ))
    }
}

fn parse_read_only(response: ReadOnlyResponse) -> Result<ClarityValue, ChainError> {
    if !response.okay {
        return Err(ChainError::ReadOnly(
            response.cause.unwrap_or_else(|| "unknown cause".into()),
        ));
    }
    let result = response
        .result
        .ok_or_else(|| ChainError::InvalidResponse("read-only reply without result".into()))?;
    Ok(blaze_clarity::deserialize_hex(&result)?)
}

/// A node answers a broadcast with the txid as a JSON string, or an error object.
fn parse_broadcast(payload: Value) -> Result<BroadcastResponse, ChainError> {
    match payload {
        Value::String(txid) => Ok(BroadcastResponse::accepted(txid)),
        Value::Object(_) => serde_json::from_value(payload)
            .map_err(|e| ChainError::InvalidResponse(format!("broadcast reply: {e}"))),
        other => Err(ChainError::InvalidResponse(format!(
            "unexpected broadcast reply: {other}"
        ))),
    }
}

#[async_trait]
impl ChainClient for HttpChainClient {
    async fn call_read_only(
        &self,
        contract: &Principal,
        function: &str,
        sender: &Principal,
        args: Vec<ClarityValue>,
    ) -> Result<ClarityValue, ChainError> {
        let url = self.read_only_url(contract, function)?;
        let body = ReadOnlyRequest {
            sender: sender.to_string(),
            arguments: args.iter().map(ClarityValue::to_hex).collect(),
        };

        tracing::debug!(%contract, function, "read-only call");
        let response = self
            .authorize(self.http_client.post(&url).json(&body))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ChainError::RequestFailed(format!(
                "HTTP status {}",
                response.status()
            )));
        }

        let parsed: ReadOnlyResponse = response
            .json()
            .await
            .map_err(|e| ChainError::InvalidResponse(format!("read-only reply: {e}")))?;
        parse_read_only(parsed)
    }

    async fn account_nonce(&self, principal: &Principal) -> Result<u64, ChainError> {
        let url = format!("{}/v2/accounts/{}?proof=0", self.base_url, principal);
        let response = self.authorize(self.http_client.get(&url)).send().await?;

        if !response.status().is_success() {
            return Err(ChainError::RequestFailed(format!(
                "HTTP status {}",
                response.status()
            )));
        }

        let account: AccountResponse = response
            .json()
            .await
            .map_err(|e| ChainError::InvalidResponse(format!("account reply: {e}")))?;
        Ok(account.nonce)
    }

    async fn broadcast(&self, tx: Vec<u8>) -> Result<BroadcastResponse, ChainError> {
        let url = format!("{}/v2/transactions", self.base_url);
        let response = self
            .authorize(
                self.http_client
                    .post(&url)
                    .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
                    .body(tx),
            )
            .send()
            .await?;

        // Rejections arrive as 400 with a JSON body; keep them as a response.
        let status = response.status();
        let payload: Value = response.json().await.map_err(|e| {
            ChainError::InvalidResponse(format!("broadcast reply (HTTP {status}): {e}"))
        })?;
        parse_broadcast(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const CONTRACT: &str = "SP2ZNGJ85ENDY6QRHQ5P2D4FXKGZWCKTB2T0Z55KS.blaze-welsh-v0";

    #[test]
    fn read_only_url_layout() {
        let client = HttpChainClient::new("https://api.hiro.so/", None);
        let contract = Principal::parse(CONTRACT).unwrap();
        assert_eq!(
            client.read_only_url(&contract, "verify-signature").unwrap(),
            "https://api.hiro.so/v2/contracts/call-read/SP2ZNGJ85ENDY6QRHQ5P2D4FXKGZWCKTB2T0Z55KS/blaze-welsh-v0/verify-signature"
        );
    }

    #[test]
    fn read_only_requires_contract_principal() {
        let client = HttpChainClient::new("https://api.hiro.so", None);
        let standard = Principal::parse("SP2ZNGJ85ENDY6QRHQ5P2D4FXKGZWCKTB2T0Z55KS").unwrap();
        assert!(client.read_only_url(&standard, "f").is_err());
    }

    #[test]
    fn read_only_reply_decodes_result() {
        let ok = ReadOnlyResponse {
            okay: true,
            result: Some("0x03".into()),
            cause: None,
        };
        assert_eq!(parse_read_only(ok).unwrap(), ClarityValue::Bool(true));

        let failed = ReadOnlyResponse {
            okay: false,
            result: None,
            cause: Some("Unchecked(NoSuchContract)".into()),
        };
        assert!(matches!(parse_read_only(failed), Err(ChainError::ReadOnly(c)) if c.contains("NoSuchContract")));
    }

    #[test]
    fn broadcast_reply_shapes() {
        assert_eq!(
            parse_broadcast(json!("0xabc")).unwrap(),
            BroadcastResponse::accepted("0xabc")
        );
        let rejected = parse_broadcast(json!({
            "error": "transaction rejected",
            "reason": "NotEnoughFunds",
            "txid": "0xabc"
        }))
        .unwrap();
        assert_eq!(rejected.error.as_deref(), Some("transaction rejected"));
        assert_eq!(rejected.reason.as_deref(), Some("NotEnoughFunds"));
        assert!(parse_broadcast(json!(5)).is_err());
    }

    #[test]
    fn empty_api_key_is_ignored() {
        let client = HttpChainClient::new("http://localhost:3999", Some(String::new()));
        assert!(client.api_key.is_none());
    }

    #[tokio::test]
    async fn unreachable_node_is_an_error() {
        let client = HttpChainClient::with_timeout(
            "http://127.0.0.1:1",
            None,
            Duration::from_millis(500),
        );
        let who = Principal::parse("SP2ZNGJ85ENDY6QRHQ5P2D4FXKGZWCKTB2T0Z55KS").unwrap();
        let err = client.account_nonce(&who).await.unwrap_err();
        assert!(matches!(
            err,
            ChainError::Unavailable(_) | ChainError::Timeout | ChainError::RequestFailed(_)
        ));
    }
}
