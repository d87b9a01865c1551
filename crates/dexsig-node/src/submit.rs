//! Broadcast signed envelopes. One attempt, no retries.

use std::sync::Arc;

use dexsig_canon::{CosmosEnvelope, HyperliquidEnvelope, SignedEnvelope};
use dexsig_telemetry::Metrics;
use tracing::{info, warn};

use crate::error::{NodeError, NodeResult};
use crate::exchange::{ExchangeApi, ExchangeResponse};
use crate::rpc::{BroadcastTxResponse, NodeRpc};

/// Outcome of a single broadcast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BroadcastResult {
    /// Hyperliquid has no transaction hash.
    Accepted { tx_hash: Option<String> },
    /// Chain or exchange rejected the action. `log` is verbatim.
    Rejected {
        code: Option<u32>,
        codespace: Option<String>,
        log: String,
    },
}

impl BroadcastResult {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted { .. })
    }

    /// Metric label.
    pub fn outcome(&self) -> &'static str {
        match self {
            Self::Accepted { .. } => "accepted",
            Self::Rejected { .. } => "rejected",
        }
    }
}

impl From<BroadcastTxResponse> for BroadcastResult {
    fn from(resp: BroadcastTxResponse) -> Self {
        if resp.code == 0 {
            Self::Accepted {
                tx_hash: Some(resp.hash),
            }
        } else {
            Self::Rejected {
                code: Some(resp.code),
                codespace: Some(resp.codespace),
                log: resp.log,
            }
        }
    }
}

impl From<ExchangeResponse> for BroadcastResult {
    fn from(resp: ExchangeResponse) -> Self {
        match resp.error_message() {
            None => Self::Accepted { tx_hash: None },
            Some(log) => Self::Rejected {
                code: None,
                codespace: None,
                log,
            },
        }
    }
}

enum Transport {
    Node(Arc<dyn NodeRpc>),
    Exchange(Arc<dyn ExchangeApi>),
}

/// Sends envelopes for one chain.
pub struct TxSubmitter {
    transport: Transport,
}

impl TxSubmitter {
    pub fn dydx(node: Arc<dyn NodeRpc>) -> Self {
        Self {
            transport: Transport::Node(node),
        }
    }

    pub fn hyperliquid(exchange: Arc<dyn ExchangeApi>) -> Self {
        Self {
            transport: Transport::Exchange(exchange),
        }
    }

    pub async fn broadcast(&self, envelope: &SignedEnvelope) -> NodeResult<BroadcastResult> {
        let result = match (&self.transport, envelope) {
            (Transport::Node(node), SignedEnvelope::Cosmos(env)) => broadcast_cosmos(node.as_ref(), env).await,
            (Transport::Exchange(api), SignedEnvelope::Hyperliquid(env)) => {
                post_hyperliquid(api.as_ref(), env).await
            }
            _ => {
                return Err(NodeError::exchange(format!(
                    "{} envelope sent to the wrong chain",
                    envelope.chain()
                )))
            }
        };

        match &result {
            Ok(outcome) => Metrics::broadcast(envelope.chain(), outcome.outcome()),
            Err(_) => Metrics::broadcast(envelope.chain(), "error"),
        }
        result
    }
}

async fn broadcast_cosmos(node: &dyn NodeRpc, envelope: &CosmosEnvelope) -> NodeResult<BroadcastResult> {
    let response = node.broadcast_tx_sync(envelope.tx_bytes().to_vec()).await?;
    let result = BroadcastResult::from(response);
    match &result {
        BroadcastResult::Accepted { tx_hash } => info!(
            kind = %envelope.kind().as_str(),
            sequence = envelope.sequence(),
            tx_hash = ?tx_hash,
            "Transaction accepted"
        ),
        BroadcastResult::Rejected { code, codespace, log } => warn!(
            kind = %envelope.kind().as_str(),
            sequence = envelope.sequence(),
            code = ?code,
            codespace = ?codespace,
            log = %log,
            "Transaction rejected"
        ),
    }
    Ok(result)
}

async fn post_hyperliquid(api: &dyn ExchangeApi, envelope: &HyperliquidEnvelope) -> NodeResult<BroadcastResult> {
    let payload = envelope
        .to_request()
        .map_err(|e| NodeError::Decode(e.to_string()))?;
    let response = api.post_action(payload).await?;
    let result = BroadcastResult::from(response);
    match &result {
        BroadcastResult::Accepted { .. } => {
            info!(kind = %envelope.kind().as_str(), nonce = envelope.nonce(), "Action accepted")
        }
        BroadcastResult::Rejected { log, .. } => warn!(
            kind = %envelope.kind().as_str(),
            nonce = envelope.nonce(),
            log = %log,
            "Action rejected"
        ),
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockExchange, MockNode};
    use dexsig_canon::{
        sign_cosmos, sign_l1_action, AccountParams, CosmosTxBuilder, DydxCanonicalizer, Fee,
        HyperliquidCanonicalizer,
    };
    use dexsig_core::{CancelRequest, ClientOrderId, OrderFlags, TransferRequest, TransferSource, TransferTarget};
    use dexsig_signer::{Credentials, RawHashSigner, StructuredDataSigner};
    use serde_json::json;

    const TEST_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
    const OWNER: &str = "dydx1qyqszqgpqyqszqgpqyqszqgpqyqszqgpqyqszqgp";

    fn cosmos_envelope() -> SignedEnvelope {
        let creds = Credentials::from_hex(TEST_KEY, None).unwrap();
        let req = TransferRequest {
            currency: "USDC".to_string(),
            amount: "1".to_string(),
            source: TransferSource::Wallet,
            target: TransferTarget::Subaccount {
                address: OWNER.to_string(),
                number: 0,
            },
        };
        let action = DydxCanonicalizer::new(OWNER).unwrap().transfer(&req).unwrap();
        let env = sign_cosmos(
            &action,
            &CosmosTxBuilder::for_network(false),
            Fee::zero(),
            AccountParams {
                account_number: 1,
                sequence: 0,
            },
            &RawHashSigner::sha256(),
            &creds,
        )
        .unwrap();
        SignedEnvelope::Cosmos(env)
    }

    fn hyperliquid_envelope() -> SignedEnvelope {
        let creds = Credentials::from_hex(TEST_KEY, None).unwrap();
        let req = CancelRequest::new("ETH", ClientOrderId(1), OrderFlags::LongTerm);
        let action = HyperliquidCanonicalizer::new(false, creds.address().to_string())
            .cancel_order(&req, 1, None)
            .unwrap();
        let env = sign_l1_action(action, 1, None, None, &StructuredDataSigner::phantom_agent(false), &creds).unwrap();
        SignedEnvelope::Hyperliquid(env)
    }

    #[tokio::test]
    async fn test_cosmos_accepted() {
        let node = Arc::new(MockNode::new());
        let submitter = TxSubmitter::dydx(node.clone());
        let envelope = cosmos_envelope();

        let result = submitter.broadcast(&envelope).await.unwrap();
        assert_eq!(
            result,
            BroadcastResult::Accepted {
                tx_hash: Some("MOCKHASH".to_string())
            }
        );
        let SignedEnvelope::Cosmos(env) = &envelope else { unreachable!() };
        assert_eq!(node.broadcast_txs(), vec![env.tx_bytes().to_vec()]);
    }

    #[tokio::test]
    async fn test_cosmos_rejected_keeps_reason() {
        let node = Arc::new(MockNode::new());
        node.set_broadcast_response(BroadcastTxResponse {
            code: 32,
            hash: "H".to_string(),
            log: "account sequence mismatch, expected 1, got 0".to_string(),
            codespace: "sdk".to_string(),
        });
        let result = TxSubmitter::dydx(node).broadcast(&cosmos_envelope()).await.unwrap();
        assert_eq!(
            result,
            BroadcastResult::Rejected {
                code: Some(32),
                codespace: Some("sdk".to_string()),
                log: "account sequence mismatch, expected 1, got 0".to_string(),
            }
        );
        assert_eq!(result.outcome(), "rejected");
    }

    #[tokio::test]
    async fn test_hyperliquid_accepted_and_payload() {
        let exchange = Arc::new(MockExchange::new());
        let result = TxSubmitter::hyperliquid(exchange.clone())
            .broadcast(&hyperliquid_envelope())
            .await
            .unwrap();
        assert!(result.is_accepted());

        let posts = exchange.posts();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0]["action"]["type"], "cancelByCloid");
        assert_eq!(posts[0]["nonce"], 1);
    }

    #[tokio::test]
    async fn test_hyperliquid_embedded_error() {
        let exchange = Arc::new(MockExchange::new());
        exchange.set_response(json!({
            "status": "ok",
            "response": {"type": "cancel", "data": {"statuses": [{"error": "Order was never placed, already canceled, or filled."}]}}
        }));
        let result = TxSubmitter::hyperliquid(exchange)
            .broadcast(&hyperliquid_envelope())
            .await
            .unwrap();
        match result {
            BroadcastResult::Rejected { log, code, .. } => {
                assert!(log.starts_with("Order was never placed"));
                assert_eq!(code, None);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_wrong_chain() {
        let node = Arc::new(MockNode::new());
        let result = TxSubmitter::dydx(node.clone()).broadcast(&hyperliquid_envelope()).await;
        assert!(matches!(result, Err(NodeError::Exchange { .. })));
        assert_eq!(node.call_count(), 0);
    }
}
