//! Nullable chain: an in-memory node that emulates the subnet contracts.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use blaze_chain::{BroadcastResponse, ChainClient, ChainError, VERIFY_FUNCTION};
use blaze_clarity::ClarityValue;
use blaze_crypto::{sha512_256, verify_transfer_signature, Domain, TransferMessage};
use blaze_types::{MicroAmount, NetworkId, Principal};

/// A read-only call seen by the node.
#[derive(Clone, Debug, PartialEq)]
pub struct ReadOnlyCall {
    pub contract: Principal,
    pub function: String,
    pub sender: Principal,
    pub args: Vec<ClarityValue>,
}

/// An in-memory chain node for testing.
///
/// Each registered subnet contract answers `verify-signature` using the
/// same structured-data rule as the deployed contract. Broadcasts are
/// recorded and accepted unless the node is told to reject or go offline.
pub struct NullChain {
    network: NetworkId,
    subnets: Mutex<HashMap<Principal, Principal>>,
    nonces: Mutex<HashMap<Principal, u64>>,
    read_only_calls: Mutex<Vec<ReadOnlyCall>>,
    broadcasts: Mutex<Vec<Vec<u8>>>,
    rejection: Mutex<Option<(String, Option<String>)>>,
    offline: AtomicBool,
}

impl NullChain {
    pub fn new(network: NetworkId) -> Self {
        Self {
            network,
            subnets: Mutex::new(HashMap::new()),
            nonces: Mutex::new(HashMap::new()),
            read_only_calls: Mutex::new(Vec::new()),
            broadcasts: Mutex::new(Vec::new()),
            rejection: Mutex::new(None),
            offline: AtomicBool::new(false),
        }
    }

    /// Register a subnet contract wrapping `token`.
    pub fn with_subnet(self, contract: Principal, token: Principal) -> Self {
        self.subnets.lock().unwrap().insert(contract, token);
        self
    }

    pub fn set_account_nonce(&self, principal: Principal, nonce: u64) {
        self.nonces.lock().unwrap().insert(principal, nonce);
    }

    /// Reject every broadcast with `error` until cleared.
    pub fn reject_broadcasts(&self, error: &str, reason: Option<&str>) {
        *self.rejection.lock().unwrap() = Some((error.to_string(), reason.map(String::from)));
    }

    pub fn accept_broadcasts(&self) {
        *self.rejection.lock().unwrap() = None;
    }

    /// Make every call fail as if the node were unreachable.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn broadcasts(&self) -> Vec<Vec<u8>> {
        self.broadcasts.lock().unwrap().clone()
    }

    pub fn read_only_calls(&self) -> Vec<ReadOnlyCall> {
        self.read_only_calls.lock().unwrap().clone()
    }

    fn ensure_online(&self) -> Result<(), ChainError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(ChainError::Unavailable("null chain is offline".into()));
        }
        Ok(())
    }

    fn verify(&self, token: Principal, args: &[ClarityValue]) -> Result<ClarityValue, ChainError> {
        let [signature, signer, to, amount, nonce] = args else {
            return Err(ChainError::ReadOnly(format!(
                "verify-signature expects 5 arguments, got {}",
                args.len()
            )));
        };
        let arg_error = |name: &str| ChainError::ReadOnly(format!("bad argument: {name}"));

        let signature = signature.as_buffer().ok_or_else(|| arg_error("signature"))?;
        let signer = signer.as_principal().ok_or_else(|| arg_error("signer"))?;
        let to = to.as_principal().ok_or_else(|| arg_error("to"))?;
        let amount = amount.as_uint().ok_or_else(|| arg_error("amount"))?;
        let nonce = nonce
            .as_uint()
            .and_then(|n| u64::try_from(n).ok())
            .ok_or_else(|| arg_error("nonce"))?;

        let message = TransferMessage {
            token,
            to,
            amount: MicroAmount::new(amount),
            nonce,
        };
        Ok(ClarityValue::Bool(verify_transfer_signature(
            &hex::encode(signature),
            &signer,
            &message,
            &Domain::blaze(self.network),
        )))
    }
}

#[async_trait]
impl ChainClient for NullChain {
    async fn call_read_only(
        &self,
        contract: &Principal,
        function: &str,
        sender: &Principal,
        args: Vec<ClarityValue>,
    ) -> Result<ClarityValue, ChainError> {
        self.ensure_online()?;
        self.read_only_calls.lock().unwrap().push(ReadOnlyCall {
            contract: contract.clone(),
            function: function.to_string(),
            sender: sender.clone(),
            args: args.clone(),
        });

        let token = self
            .subnets
            .lock()
            .unwrap()
            .get(contract)
            .cloned()
            .ok_or_else(|| ChainError::ReadOnly(format!("NoSuchContract({contract})")))?;

        match function {
            VERIFY_FUNCTION => self.verify(token, &args),
            other => Err(ChainError::ReadOnly(format!("UndefinedFunction({other})"))),
        }
    }

    async fn account_nonce(&self, principal: &Principal) -> Result<u64, ChainError> {
        self.ensure_online()?;
        Ok(self
            .nonces
            .lock()
            .unwrap()
            .get(principal)
            .copied()
            .unwrap_or(0))
    }

    async fn broadcast(&self, tx: Vec<u8>) -> Result<BroadcastResponse, ChainError> {
        self.ensure_online()?;
        let txid = format!("0x{}", hex::encode(sha512_256(&tx)));
        if let Some((error, reason)) = self.rejection.lock().unwrap().clone() {
            return Ok(BroadcastResponse {
                txid: Some(txid),
                error: Some(error),
                reason,
            });
        }
        self.broadcasts.lock().unwrap().push(tx);
        Ok(BroadcastResponse::accepted(txid))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blaze_crypto::{derive_principal, keypair_from_seed, sign_transfer};

    const CONTRACT: &str = "SP2ZNGJ85ENDY6QRHQ5P2D4FXKGZWCKTB2T0Z55KS.blaze-welsh-v0";
    const TOKEN: &str = "SP3NE50GEXFG9SZGTT51P40X2CKYSZ5CC4ZTZ7A2G.welshcorgicoin-token";

    fn p(s: &str) -> Principal {
        Principal::parse(s).unwrap()
    }

    fn chain() -> NullChain {
        NullChain::new(NetworkId::Mainnet).with_subnet(p(CONTRACT), p(TOKEN))
    }

    #[tokio::test]
    async fn verifies_structured_signatures() {
        let chain = chain();
        let kp = keypair_from_seed(&[21u8; 32]);
        let signer = derive_principal(&kp.public, NetworkId::Mainnet);
        let to = p("SP3NE50GEXFG9SZGTT51P40X2CKYSZ5CC4ZTZ7A2G");
        let message = TransferMessage {
            token: p(TOKEN),
            to: to.clone(),
            amount: MicroAmount::new(50),
            nonce: 4,
        };
        let sig = sign_transfer(&message, &Domain::blaze(NetworkId::Mainnet), &kp.private).unwrap();

        let args = |amount: u128| {
            vec![
                ClarityValue::buffer_from_hex(&sig).unwrap(),
                ClarityValue::principal(&signer),
                ClarityValue::principal(&to),
                ClarityValue::uint(amount),
                ClarityValue::uint(4u64),
            ]
        };
        let ok = chain
            .call_read_only(&p(CONTRACT), VERIFY_FUNCTION, &signer, args(50))
            .await
            .unwrap();
        assert!(ok.is_true());

        let tampered = chain
            .call_read_only(&p(CONTRACT), VERIFY_FUNCTION, &signer, args(51))
            .await
            .unwrap();
        assert!(!tampered.is_true());
        assert_eq!(chain.read_only_calls().len(), 2);
    }

    #[tokio::test]
    async fn unknown_contract_errors() {
        let chain = chain();
        let who = p("SP3NE50GEXFG9SZGTT51P40X2CKYSZ5CC4ZTZ7A2G");
        let err = chain
            .call_read_only(&p(TOKEN), VERIFY_FUNCTION, &who, vec![])
            .await
            .unwrap_err();
        assert!(matches!(err, ChainError::ReadOnly(_)));
    }

    #[tokio::test]
    async fn broadcasts_are_recorded_or_rejected() {
        let chain = chain();
        let accepted = chain.broadcast(vec![1, 2, 3]).await.unwrap();
        assert!(accepted.txid.is_some());
        assert_eq!(chain.broadcasts().len(), 1);

        chain.reject_broadcasts("transaction rejected", Some("BadNonce"));
        let rejected = chain.broadcast(vec![4]).await.unwrap();
        assert_eq!(rejected.error.as_deref(), Some("transaction rejected"));
        assert_eq!(chain.broadcasts().len(), 1);

        chain.set_offline(true);
        assert!(chain.broadcast(vec![5]).await.is_err());
    }

    #[tokio::test]
    async fn account_nonce_defaults_to_zero() {
        let chain = chain();
        let who = p("SP3NE50GEXFG9SZGTT51P40X2CKYSZ5CC4ZTZ7A2G");
        assert_eq!(chain.account_nonce(&who).await.unwrap(), 0);
        chain.set_account_nonce(who.clone(), 9);
        assert_eq!(chain.account_nonce(&who).await.unwrap(), 9);
    }
}
