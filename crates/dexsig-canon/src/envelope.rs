//! Signed, submission-ready envelopes.
//!
//! dYdX: protobuf `TxRaw` bytes whose signature covers the `SignDoc`.
//! Hyperliquid: the `/exchange` request body.

use alloy::primitives::Address;
use dexsig_core::{ActionKind, CoreError};
use dexsig_signer::{
    sign_typed, usd_send_message, user_signed_domain, withdraw_message, Credentials,
    PayloadSigner, SignatureParts,
};
use serde_json::{json, Value};
use tracing::debug;

use crate::action::{ActionBody, ChainAction};
use crate::cosmos::{CosmosTxBuilder, Fee, SignDoc};
use crate::error::Result;
use crate::hyperliquid::{Action, SigningInput};

/// On-chain account state a cosmos transaction commits to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountParams {
    pub account_number: u64,
    pub sequence: u64,
}

/// A signed dYdX transaction.
#[derive(Debug, Clone)]
pub struct CosmosEnvelope {
    kind: ActionKind,
    tx_bytes: Vec<u8>,
    sign_doc: SignDoc,
    sequence: u64,
    signature: SignatureParts,
}

impl CosmosEnvelope {
    pub fn kind(&self) -> ActionKind {
        self.kind
    }

    /// Encoded `TxRaw`, ready for `broadcast_tx_sync`.
    pub fn tx_bytes(&self) -> &[u8] {
        &self.tx_bytes
    }

    pub fn sign_doc(&self) -> &SignDoc {
        &self.sign_doc
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn account_number(&self) -> u64 {
        self.sign_doc.account_number
    }

    pub fn signature(&self) -> &SignatureParts {
        &self.signature
    }
}

/// A signed Hyperliquid action.
#[derive(Debug, Clone)]
pub struct HyperliquidEnvelope {
    kind: ActionKind,
    action: Action,
    nonce: u64,
    vault_address: Option<Address>,
    expires_after: Option<u64>,
    signature: SignatureParts,
}

impl HyperliquidEnvelope {
    pub fn kind(&self) -> ActionKind {
        self.kind
    }

    pub fn action(&self) -> &Action {
        &self.action
    }

    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    pub fn signature(&self) -> &SignatureParts {
        &self.signature
    }

    /// Body for `POST /exchange`.
    pub fn to_request(&self) -> Result<Value> {
        let mut body = json!({
            "action": serde_json::to_value(&self.action)?,
            "nonce": self.nonce,
            "signature": serde_json::to_value(self.signature.to_wire())?,
        });
        if let Some(vault) = self.vault_address {
            body["vaultAddress"] = json!(vault.to_string().to_lowercase());
        }
        if let Some(expires) = self.expires_after {
            body["expiresAfter"] = json!(expires);
        }
        Ok(body)
    }
}

#[derive(Debug, Clone)]
pub enum SignedEnvelope {
    Cosmos(CosmosEnvelope),
    Hyperliquid(HyperliquidEnvelope),
}

impl SignedEnvelope {
    pub fn kind(&self) -> ActionKind {
        match self {
            Self::Cosmos(e) => e.kind(),
            Self::Hyperliquid(e) => e.kind(),
        }
    }

    pub fn chain(&self) -> &'static str {
        match self {
            Self::Cosmos(_) => "dydx",
            Self::Hyperliquid(_) => "hyperliquid",
        }
    }
}

// =============================================================================
// dYdX
// =============================================================================

fn dydx_messages(action: &ChainAction) -> Result<Vec<crate::cosmos::Any>> {
    match action.body() {
        ActionBody::Dydx(msg) => Ok(vec![msg.to_any()]),
        ActionBody::Hyperliquid(_) => Err(CoreError::BadRequest(
            "Hyperliquid actions cannot be wrapped in a cosmos transaction".to_string(),
        )
        .into()),
    }
}

/// Unsigned transaction for gas simulation: zero fee, one empty signature.
pub fn simulation_tx(
    action: &ChainAction,
    builder: &CosmosTxBuilder,
    public_key: &[u8; 33],
    sequence: u64,
) -> Result<Vec<u8>> {
    let unsigned = builder.build(dydx_messages(action)?, public_key, sequence, Fee::zero());
    Ok(unsigned.simulation_bytes())
}

/// Sign a dYdX action in SIGN_MODE_DIRECT.
///
/// `signer` hashes the encoded `SignDoc`; for dYdX that is the raw SHA-256
/// signer.
pub fn sign_cosmos(
    action: &ChainAction,
    builder: &CosmosTxBuilder,
    fee: Fee,
    account: AccountParams,
    signer: &dyn PayloadSigner,
    credentials: &Credentials,
) -> Result<CosmosEnvelope> {
    let messages = dydx_messages(action)?;
    let unsigned = builder.build(messages, credentials.public_key(), account.sequence, fee);
    let sign_doc = unsigned.sign_doc(account.account_number);
    let signature = signer.sign(&sign_doc.encode(), credentials)?;
    let tx_bytes = unsigned.into_tx_raw(signature.to_compact()?.to_vec()).encode();

    debug!(
        kind = %action.kind().as_str(),
        chain_id = %builder.chain_id(),
        account_number = account.account_number,
        sequence = account.sequence,
        tx_len = tx_bytes.len(),
        "Signed cosmos transaction"
    );

    Ok(CosmosEnvelope {
        kind: action.kind(),
        tx_bytes,
        sign_doc,
        sequence: account.sequence,
        signature,
    })
}

// =============================================================================
// Hyperliquid
// =============================================================================

fn hyperliquid_action(action: ChainAction) -> Result<(ActionKind, Action)> {
    let kind = action.kind();
    match action.into_body() {
        ActionBody::Hyperliquid(a) => Ok((kind, a)),
        ActionBody::Dydx(_) => Err(CoreError::BadRequest(
            "dYdX messages cannot be posted to Hyperliquid".to_string(),
        )
        .into()),
    }
}

/// Sign an L1 action through the phantom agent.
///
/// `signer` receives the action-hash preimage; the structured-data signer
/// hashes it into the agent's `connectionId`.
pub fn sign_l1_action(
    action: ChainAction,
    nonce: u64,
    vault_address: Option<Address>,
    expires_after: Option<u64>,
    signer: &dyn PayloadSigner,
    credentials: &Credentials,
) -> Result<HyperliquidEnvelope> {
    let (kind, action) = hyperliquid_action(action)?;
    if action.is_user_signed() {
        return Err(CoreError::BadRequest(format!(
            "{} is signed by the wallet as typed data, not as an L1 action",
            kind.as_str()
        ))
        .into());
    }
    let input = SigningInput {
        action: &action,
        nonce,
        vault_address,
        expires_after,
    };
    let signature = signer.sign(&input.preimage()?, credentials)?;

    debug!(kind = %kind.as_str(), nonce, vault = ?vault_address, "Signed L1 action");

    Ok(HyperliquidEnvelope {
        kind,
        action,
        nonce,
        vault_address,
        expires_after,
        signature,
    })
}

/// Sign `usdSend` / `withdraw3` as EIP-712 typed data. The action's `time`
/// is the nonce.
pub fn sign_user_action(action: ChainAction, credentials: &Credentials) -> Result<HyperliquidEnvelope> {
    let (kind, action) = hyperliquid_action(action)?;
    let (message, time) = match &action {
        Action::UsdSend(w) => (
            usd_send_message(&w.hyperliquid_chain, &w.destination, &w.amount, w.time),
            w.time,
        ),
        Action::Withdraw3(w) => (
            withdraw_message(&w.hyperliquid_chain, &w.destination, &w.amount, w.time),
            w.time,
        ),
        _ => {
            return Err(CoreError::BadRequest(format!(
                "{} is an L1 action, not a user-signed one",
                kind.as_str()
            ))
            .into())
        }
    };
    let signature = sign_typed(credentials, &user_signed_domain(), &message)?;

    debug!(kind = %kind.as_str(), nonce = time, "Signed user action");

    Ok(HyperliquidEnvelope {
        kind,
        action,
        nonce: time,
        vault_address: None,
        expires_after: None,
        signature,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dydx::DydxCanonicalizer;
    use crate::hyperliquid::HyperliquidCanonicalizer;
    use crate::CanonError;
    use dexsig_core::{
        CancelRequest, ClientOrderId, OrderFlags, TransferRequest, TransferSource, TransferTarget,
    };
    use dexsig_signer::{RawHashSigner, StructuredDataSigner};

    const TEST_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
    const DYDX_OWNER: &str = "dydx1qyqszqgpqyqszqgpqyqszqgpqyqszqgpqyqszqgp";

    fn creds() -> Credentials {
        Credentials::from_hex(TEST_KEY, None).unwrap()
    }

    fn deposit() -> ChainAction {
        let req = TransferRequest {
            currency: "USDC".to_string(),
            amount: "25".to_string(),
            source: TransferSource::Wallet,
            target: TransferTarget::Subaccount {
                address: DYDX_OWNER.to_string(),
                number: 0,
            },
        };
        DydxCanonicalizer::new(DYDX_OWNER).unwrap().transfer(&req).unwrap()
    }

    fn hl_cancel() -> ChainAction {
        let req = CancelRequest::new("ETH", ClientOrderId(7), OrderFlags::LongTerm);
        HyperliquidCanonicalizer::new(false, "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266")
            .cancel_order(&req, 1, None)
            .unwrap()
    }

    fn usd_send() -> ChainAction {
        let req = TransferRequest {
            currency: "USDC".to_string(),
            amount: "3".to_string(),
            source: TransferSource::Wallet,
            target: TransferTarget::Address("0x0000000000000000000000000000000000000001".to_string()),
        };
        HyperliquidCanonicalizer::new(false, "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266")
            .usd_send(&req, 1_700_000_000_123)
            .unwrap()
    }

    #[test]
    fn test_cosmos_signature_recovers_to_signer() {
        let creds = creds();
        let signer = RawHashSigner::sha256();
        let account = AccountParams {
            account_number: 12,
            sequence: 3,
        };
        let envelope = sign_cosmos(
            &deposit(),
            &CosmosTxBuilder::for_network(false),
            Fee::zero(),
            account,
            &signer,
            &creds,
        )
        .unwrap();

        let digest = signer.digest(&envelope.sign_doc().encode());
        assert_eq!(envelope.signature().recover_address(&digest).unwrap(), creds.address());
        assert_eq!(envelope.account_number(), 12);
        assert_eq!(envelope.sequence(), 3);
        assert_eq!(envelope.kind(), ActionKind::Transfer);

        // TxRaw ends with the 64-byte compact signature (tag 3, len 64).
        let tx = envelope.tx_bytes();
        let compact = envelope.signature().to_compact().unwrap();
        assert_eq!(&tx[tx.len() - 64..], &compact[..]);
        assert_eq!(&tx[tx.len() - 66..tx.len() - 64], &[0x1a, 0x40]);
    }

    #[test]
    fn test_cosmos_rejects_hyperliquid_action() {
        let result = sign_cosmos(
            &hl_cancel(),
            &CosmosTxBuilder::for_network(false),
            Fee::zero(),
            AccountParams {
                account_number: 0,
                sequence: 0,
            },
            &RawHashSigner::sha256(),
            &creds(),
        );
        assert!(matches!(result, Err(CanonError::Core(CoreError::BadRequest(_)))));
    }

    #[test]
    fn test_simulation_tx_has_empty_signature() {
        let bytes = simulation_tx(&deposit(), &CosmosTxBuilder::for_network(true), &[2u8; 33], 0).unwrap();
        assert_eq!(&bytes[bytes.len() - 2..], &[0x1a, 0x00]);
    }

    #[test]
    fn test_l1_signature_recovers_to_signer() {
        let creds = creds();
        let signer = StructuredDataSigner::phantom_agent(false);
        let envelope = sign_l1_action(hl_cancel(), 1_700_000_000_000, None, None, &signer, &creds).unwrap();

        let input = SigningInput {
            action: envelope.action(),
            nonce: envelope.nonce(),
            vault_address: None,
            expires_after: None,
        };
        let digest = signer.agent_digest(input.action_hash().unwrap());
        assert_eq!(envelope.signature().recover_address(&digest).unwrap(), creds.address());
    }

    #[test]
    fn test_request_body_shape() {
        let signer = StructuredDataSigner::phantom_agent(false);
        let envelope = sign_l1_action(hl_cancel(), 42, None, None, &signer, &creds()).unwrap();
        let body = envelope.to_request().unwrap();

        assert_eq!(body["action"]["type"], "cancelByCloid");
        assert_eq!(body["nonce"], 42);
        assert!(body["signature"]["r"].as_str().unwrap().starts_with("0x"));
        assert!(body.get("vaultAddress").is_none());
        assert!(body.get("expiresAfter").is_none());

        let vault = Address::repeat_byte(0xab);
        let envelope = sign_l1_action(hl_cancel(), 42, Some(vault), Some(99), &signer, &creds()).unwrap();
        let body = envelope.to_request().unwrap();
        assert_eq!(body["vaultAddress"], "0xabababababababababababababababababababab");
        assert_eq!(body["expiresAfter"], 99);
    }

    #[test]
    fn test_user_action_rejected_as_l1() {
        let signer = StructuredDataSigner::phantom_agent(false);
        let result = sign_l1_action(usd_send(), 1, None, None, &signer, &creds());
        assert!(matches!(result, Err(CanonError::Core(CoreError::BadRequest(_)))));
    }

    #[test]
    fn test_user_action_signed_as_typed_data() {
        let creds = creds();
        let envelope = sign_user_action(usd_send(), &creds).unwrap();
        assert_eq!(envelope.nonce(), 1_700_000_000_123);
        assert_eq!(envelope.kind(), ActionKind::Transfer);

        let message = usd_send_message(
            "Testnet",
            "0x0000000000000000000000000000000000000001",
            "3",
            1_700_000_000_123,
        );
        let digest = message.signing_hash(&user_signed_domain());
        assert_eq!(envelope.signature().recover_address(&digest).unwrap(), creds.address());
    }

    #[test]
    fn test_l1_action_rejected_as_user_action() {
        assert!(sign_user_action(hl_cancel(), &creds()).is_err());
    }
}
