//! Transfer signature generation and on-chain verification.

use std::fmt;
use std::sync::Arc;

use blaze_clarity::ClarityValue;
use blaze_crypto::{derive_principal, public_from_private, sign_transfer, Domain, TransferMessage};
use blaze_types::{MicroAmount, NetworkId, Principal, PrivateKey, PublicKey};

use crate::{ChainClient, ChainError};

/// Name of the subnet contract's read-only signature check.
pub const VERIFY_FUNCTION: &str = "verify-signature";

/// The service's signing identity.
pub struct SigningConfig {
    pub private_key: PrivateKey,
    pub network: NetworkId,
}

impl SigningConfig {
    pub fn new(private_key: PrivateKey, network: NetworkId) -> Self {
        Self {
            private_key,
            network,
        }
    }

    pub fn public_key(&self) -> PublicKey {
        public_from_private(&self.private_key)
    }

    /// The principal that signs and pays for service transactions.
    pub fn principal(&self) -> Principal {
        derive_principal(&self.public_key(), self.network)
    }

    pub fn domain(&self) -> Domain {
        Domain::blaze(self.network)
    }
}

impl fmt::Debug for SigningConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningConfig")
            .field("principal", &self.principal().to_string())
            .field("network", &self.network)
            .finish_non_exhaustive()
    }
}

/// Signs transfers with the service key and checks client signatures
/// against the subnet contract.
pub struct SignatureHelper {
    signing: Arc<SigningConfig>,
    chain: Arc<dyn ChainClient>,
}

impl SignatureHelper {
    pub fn new(signing: Arc<SigningConfig>, chain: Arc<dyn ChainClient>) -> Self {
        Self { signing, chain }
    }

    /// Sign `{token, to, amount, nonce}` with the service key.
    pub fn generate_signature(
        &self,
        token: &Principal,
        to: &Principal,
        amount: MicroAmount,
        nonce: u64,
    ) -> Result<String, ChainError> {
        let message = TransferMessage {
            token: token.clone(),
            to: to.clone(),
            amount,
            nonce,
        };
        Ok(sign_transfer(
            &message,
            &self.signing.domain(),
            &self.signing.private_key,
        )?)
    }

    /// Ask the subnet contract whether `signature` authorizes the transfer.
    ///
    /// A signature that is not hex is rejected without a chain call. Other
    /// malformed signatures are left for the contract to reject.
    pub async fn verify_signature(
        &self,
        contract: &Principal,
        signature: &str,
        signer: &Principal,
        to: &Principal,
        amount: MicroAmount,
        nonce: u64,
    ) -> Result<bool, ChainError> {
        let Ok(sig_buffer) = ClarityValue::buffer_from_hex(signature) else {
            tracing::debug!(%signer, "signature is not hex");
            return Ok(false);
        };

        let args = vec![
            sig_buffer,
            ClarityValue::principal(signer),
            ClarityValue::principal(to),
            ClarityValue::uint(amount.micro()),
            ClarityValue::uint(nonce),
        ];
        let result = self
            .chain
            .call_read_only(contract, VERIFY_FUNCTION, signer, args)
            .await?;
        Ok(result.is_true())
    }

    pub fn signing(&self) -> &SigningConfig {
        &self.signing
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BroadcastResponse;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Records read-only calls and answers with a fixed value.
    struct FixedChain {
        answer: ClarityValue,
        calls: Mutex<Vec<(String, String, Vec<ClarityValue>)>>,
    }

    #[async_trait]
    impl ChainClient for FixedChain {
        async fn call_read_only(
            &self,
            contract: &Principal,
            function: &str,
            _sender: &Principal,
            args: Vec<ClarityValue>,
        ) -> Result<ClarityValue, ChainError> {
            self.calls
                .lock()
                .unwrap()
                .push((contract.to_string(), function.to_string(), args));
            Ok(self.answer.clone())
        }

        async fn account_nonce(&self, _principal: &Principal) -> Result<u64, ChainError> {
            Ok(0)
        }

        async fn broadcast(&self, _tx: Vec<u8>) -> Result<BroadcastResponse, ChainError> {
            Ok(BroadcastResponse::default())
        }
    }

    fn helper(answer: ClarityValue) -> (SignatureHelper, Arc<FixedChain>) {
        let chain = Arc::new(FixedChain {
            answer,
            calls: Mutex::new(Vec::new()),
        });
        let signing = Arc::new(SigningConfig::new(PrivateKey([4u8; 32]), NetworkId::Mainnet));
        (SignatureHelper::new(signing, chain.clone()), chain)
    }

    fn p(s: &str) -> Principal {
        Principal::parse(s).unwrap()
    }

    const CONTRACT: &str = "SP2ZNGJ85ENDY6QRHQ5P2D4FXKGZWCKTB2T0Z55KS.blaze-welsh-v0";
    const TOKEN: &str = "SP3NE50GEXFG9SZGTT51P40X2CKYSZ5CC4ZTZ7A2G.welshcorgicoin-token";
    const BOB: &str = "SP2ZNGJ85ENDY6QRHQ5P2D4FXKGZWCKTB2T0Z55KS";

    #[test]
    fn generated_signature_verifies_locally() {
        let (helper, _) = helper(ClarityValue::Bool(true));
        let sig = helper
            .generate_signature(&p(TOKEN), &p(BOB), MicroAmount::new(5), 1)
            .unwrap();
        let message = TransferMessage {
            token: p(TOKEN),
            to: p(BOB),
            amount: MicroAmount::new(5),
            nonce: 1,
        };
        assert!(blaze_crypto::verify_transfer_signature(
            &sig,
            &helper.signing().principal(),
            &message,
            &helper.signing().domain()
        ));
    }

    #[tokio::test]
    async fn verify_calls_contract_with_ordered_args() {
        let (helper, chain) = helper(ClarityValue::ok(ClarityValue::Bool(true)));
        let valid = helper
            .verify_signature(&p(CONTRACT), "0xbeef", &p(BOB), &p(BOB), MicroAmount::new(9), 3)
            .await
            .unwrap();
        assert!(valid);

        let calls = chain.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        let (contract, function, args) = &calls[0];
        assert_eq!(contract, CONTRACT);
        assert_eq!(function, VERIFY_FUNCTION);
        assert_eq!(args[0], ClarityValue::Buffer(vec![0xbe, 0xef]));
        assert_eq!(args[3], ClarityValue::UInt(9));
        assert_eq!(args[4], ClarityValue::UInt(3));
    }

    #[tokio::test]
    async fn non_hex_signature_skips_chain() {
        let (helper, chain) = helper(ClarityValue::Bool(true));
        let valid = helper
            .verify_signature(&p(CONTRACT), "not-hex", &p(BOB), &p(BOB), MicroAmount::new(1), 1)
            .await
            .unwrap();
        assert!(!valid);
        assert!(chain.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn non_true_result_is_invalid() {
        let (helper, _) = helper(ClarityValue::UInt(1));
        let valid = helper
            .verify_signature(&p(CONTRACT), "00", &p(BOB), &p(BOB), MicroAmount::new(1), 1)
            .await
            .unwrap();
        assert!(!valid);
    }

    #[test]
    fn debug_hides_key() {
        let signing = SigningConfig::new(PrivateKey([4u8; 32]), NetworkId::Testnet);
        let rendered = format!("{signing:?}");
        assert!(rendered.contains("ST"));
        assert!(!rendered.contains(&"04".repeat(32)));
    }
}
