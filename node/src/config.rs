//! Service configuration with TOML file support.

use serde::{Deserialize, Serialize};

use blaze_chain::{SigningConfig, DEFAULT_FEE};
use blaze_types::{NetworkId, PrivateKey};

use crate::NodeError;

/// The welsh token and its subnet contract, configured when no `[[tokens]]`
/// table is given.
pub const WELSH_TOKEN: &str = "SP3NE50GEXFG9SZGTT51P40X2CKYSZ5CC4ZTZ7A2G.welshcorgicoin-token";
pub const WELSH_SUBNET: &str = "SP2ZNGJ85ENDY6QRHQ5P2D4FXKGZWCKTB2T0Z55KS.blaze-welsh-v0";

/// One token served by the subnet.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenConfig {
    /// The SIP-010 token contract.
    pub token: String,
    /// The Blaze subnet contract holding deposits of `token`.
    pub contract: String,
    /// Transfers per `batch-transfer` call; falls back to `default_batch_size`.
    #[serde(default)]
    pub batch_size: Option<usize>,
}

/// Configuration for the Blaze service.
///
/// Can be loaded from a TOML file via [`NodeConfig::from_toml_file`] or
/// built programmatically (e.g. for tests).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Which network to sign and broadcast for.
    #[serde(default = "default_network")]
    pub network: NetworkId,

    /// Address the HTTP API binds to.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// REST endpoint of the shared key-value store.
    #[serde(default)]
    pub kv_url: String,

    /// Bearer token for the key-value store.
    #[serde(default, skip_serializing)]
    pub kv_token: String,

    /// Stacks node API; the network default when unset.
    #[serde(default)]
    pub stacks_api_url: Option<String>,

    #[serde(default, skip_serializing)]
    pub stacks_api_key: Option<String>,

    /// Hex-encoded service signing key. Never written back out.
    #[serde(default, skip_serializing)]
    pub private_key: Option<String>,

    /// Shared secret chainhook deliveries and manual sweeps must present as
    /// a bearer token. Both endpoints refuse every request when unset.
    #[serde(default, skip_serializing)]
    pub events_secret: Option<String>,

    /// Fee for each `batch-transfer` call, in micro-STX.
    #[serde(default = "default_fee")]
    pub fee: u64,

    /// Drain a token's queue during intake once it holds a full batch.
    #[serde(default)]
    pub auto_process: bool,

    /// Seconds between background sweeps of every queue; 0 disables the sweeper.
    #[serde(default)]
    pub sweep_interval_secs: u64,

    #[serde(default = "default_batch_size")]
    pub minimum_batch_size: u64,

    #[serde(default = "default_batch_size_usize")]
    pub default_batch_size: usize,

    /// Log format: "human" or "json".
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Whether to serve the Prometheus `/metrics` endpoint.
    #[serde(default = "default_true")]
    pub enable_metrics: bool,

    #[serde(default = "default_tokens")]
    pub tokens: Vec<TokenConfig>,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_network() -> NetworkId {
    NetworkId::Mainnet
}

fn default_listen_addr() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_fee() -> u64 {
    DEFAULT_FEE
}

fn default_batch_size() -> u64 {
    1
}

fn default_batch_size_usize() -> usize {
    1
}

fn default_log_format() -> String {
    "human".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_tokens() -> Vec<TokenConfig> {
    vec![TokenConfig {
        token: WELSH_TOKEN.to_string(),
        contract: WELSH_SUBNET.to_string(),
        batch_size: None,
    }]
}

// ── Impl ───────────────────────────────────────────────────────────────

impl NodeConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: &str) -> Result<Self, NodeError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| NodeError::Config(e.to_string()))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, NodeError> {
        toml::from_str(s).map_err(|e| NodeError::Config(e.to_string()))
    }

    /// Serialize the configuration to a TOML string. Secrets are omitted.
    pub fn to_toml_string(&self) -> String {
        toml::to_string_pretty(self).expect("NodeConfig is always serializable to TOML")
    }

    /// The Stacks API base URL, falling back to the network's public endpoint.
    pub fn stacks_api_url(&self) -> String {
        self.stacks_api_url
            .clone()
            .unwrap_or_else(|| self.network.default_api_url().to_string())
    }

    /// The service signing identity.
    pub fn signing_config(&self) -> Result<SigningConfig, NodeError> {
        let raw = self
            .private_key
            .as_deref()
            .ok_or_else(|| NodeError::Config("private_key is not set".into()))?;
        let key = PrivateKey::from_hex(raw)
            .map_err(|e| NodeError::Config(format!("private_key: {e}")))?;
        Ok(SigningConfig::new(key, self.network))
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            network: default_network(),
            listen_addr: default_listen_addr(),
            kv_url: String::new(),
            kv_token: String::new(),
            stacks_api_url: None,
            stacks_api_key: None,
            private_key: None,
            events_secret: None,
            fee: default_fee(),
            auto_process: false,
            sweep_interval_secs: 0,
            minimum_batch_size: default_batch_size(),
            default_batch_size: default_batch_size_usize(),
            log_format: default_log_format(),
            log_level: default_log_level(),
            enable_metrics: default_true(),
            tokens: default_tokens(),
        }
    }
}
