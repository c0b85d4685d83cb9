//! Token to subnet-contract mapping.

use std::collections::HashMap;

use blaze_queue::QueueConfig;
use blaze_types::Principal;

use crate::config::{NodeConfig, TokenConfig};
use crate::NodeError;

/// One-to-one mapping between served tokens and their subnet contracts.
#[derive(Clone, Debug, Default)]
pub struct TokenRegistry {
    by_token: HashMap<Principal, Principal>,
    by_contract: HashMap<Principal, Principal>,
    batch_sizes: HashMap<Principal, usize>,
}

impl TokenRegistry {
    pub fn from_config(tokens: &[TokenConfig]) -> Result<Self, NodeError> {
        let mut registry = Self::default();
        for entry in tokens {
            let token = parse_contract("token", &entry.token)?;
            let contract = parse_contract("contract", &entry.contract)?;
            if registry.by_token.contains_key(&token) {
                return Err(NodeError::Config(format!("token {token} listed twice")));
            }
            if registry.by_contract.contains_key(&contract) {
                return Err(NodeError::Config(format!("contract {contract} listed twice")));
            }
            if let Some(size) = entry.batch_size {
                registry.batch_sizes.insert(token.clone(), size);
            }
            registry.by_contract.insert(contract.clone(), token.clone());
            registry.by_token.insert(token, contract);
        }
        Ok(registry)
    }

    /// The subnet contract for `token`.
    pub fn contract_for(&self, token: &Principal) -> Result<&Principal, NodeError> {
        self.by_token
            .get(token)
            .ok_or_else(|| NodeError::UnknownToken(token.to_string()))
    }

    /// The token wrapped by `contract`, if it is a served subnet.
    pub fn token_for(&self, contract: &Principal) -> Option<&Principal> {
        self.by_contract.get(contract)
    }

    pub fn tokens(&self) -> impl Iterator<Item = (&Principal, &Principal)> {
        self.by_token.iter()
    }

    pub fn len(&self) -> usize {
        self.by_token.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_token.is_empty()
    }

    /// Queue settings for every served token.
    pub fn queue_config(&self, config: &NodeConfig) -> QueueConfig {
        QueueConfig {
            default_batch_size: config.default_batch_size,
            minimum_batch_size: config.minimum_batch_size,
            batch_sizes: self.batch_sizes.clone(),
        }
    }
}

fn parse_contract(field: &str, raw: &str) -> Result<Principal, NodeError> {
    let principal =
        Principal::parse(raw).map_err(|e| NodeError::Config(format!("{field} {raw}: {e}")))?;
    if !principal.is_contract() {
        return Err(NodeError::Config(format!(
            "{field} {raw} is not a contract principal"
        )));
    }
    Ok(principal)
}
