//! dYdX session pipeline tests against `MockNode`.
//!
//! - Short-term market order: quantization, block window, signature
//! - Cancel flag checks before any network traffic
//! - Sequence and fee handling per message class
//! - Owner address checked against the signing key

mod integration;
use integration::common::fixtures::{btc_scale, config, credentials, DYDX_OWNER};
use integration::common::proto::{contains, decode_tx_raw, recover_signers, signer_sequence};

use std::sync::Arc;

use dexsig_canon::{ActionBody, CosmosTxBuilder, DydxCanonicalizer};
use dexsig_client::{AppError, DydxSession};
use dexsig_signer::SignerError;
use dexsig_core::{
    CancelRequest, ClientOrderId, CoreError, ExpiryWindow, LeverageRequest, OrderFlags, OrderRequest,
    OrderSide, TransferRequest, TransferSource, TransferTarget, TriggerDirection,
};
use dexsig_node::{BroadcastResult, BroadcastTxResponse, FeeDenom, FeeEstimator, MockNode, NodeCall};

fn session(node: &Arc<MockNode>) -> DydxSession {
    DydxSession::new(&config(), credentials(), node.clone()).unwrap()
}

fn core_error(err: &AppError) -> &CoreError {
    err.as_core().unwrap_or_else(|| panic!("expected a validation error, got {err:?}"))
}

/// Short-term market buy of 0.01 BTC at 50000 on a BTC-USD scale.
#[tokio::test]
async fn test_short_term_market_order_end_to_end() {
    let node = Arc::new(MockNode::new());
    let session = session(&node);

    let req = OrderRequest::market("BTC-USD", OrderSide::Buy, "0.01", "50000").with_client_id(7);
    let outcome = session.place_order(&req).await.unwrap();

    assert_eq!(
        outcome.result,
        BroadcastResult::Accepted {
            tx_hash: Some("MOCKHASH".to_string())
        }
    );
    assert_eq!(outcome.client_id, ClientOrderId(7));
    assert_eq!(
        outcome.identity,
        session.identity(0, ClientOrderId(7), OrderFlags::ShortTerm, 0)
    );

    // Height is only read for short-term orders, before the account lookup.
    // Order messages are gasless, so nothing is simulated.
    let calls = node.calls();
    assert_eq!(calls.len(), 3);
    assert_eq!(calls[0], NodeCall::AbciInfo);
    assert_eq!(calls[1], NodeCall::AccountInfo(DYDX_OWNER.to_string()));
    assert!(matches!(calls[2], NodeCall::BroadcastTxSync(_)));

    // Integer units and the block window.
    let quantized = req.validate().unwrap().quantize_dydx(&btc_scale()).unwrap();
    assert_eq!(quantized.quantums, 100_000_000);
    assert_eq!(quantized.subticks, 5_000_000_000);
    let expected = DydxCanonicalizer::new(DYDX_OWNER)
        .unwrap()
        .place_order(&quantized, 0, ExpiryWindow::GoodTilBlock(1_020))
        .unwrap();
    let ActionBody::Dydx(msg) = expected.body() else {
        panic!("expected a dYdX message");
    };

    let tx = decode_tx_raw(&node.broadcast_txs()[0]);
    assert!(contains(&tx.body_bytes, &msg.encode()));

    let priced = FeeEstimator::new(FeeDenom::Usdc, false).fee_for_gas(100_000).unwrap();
    assert!(!contains(&tx.auth_info_bytes, &priced.encode()));
    assert_eq!(signer_sequence(&tx), 0);

    let chain_id = CosmosTxBuilder::for_network(false).chain_id().to_string();
    assert!(recover_signers(&tx, &chain_id, 1).contains(&credentials().address()));

    assert_eq!(session.placed_orders().len(), 1);
}

#[tokio::test]
async fn test_cancel_with_wrong_flags_never_reaches_node() {
    let node = Arc::new(MockNode::new());
    let session = session(&node);

    let conditional = OrderRequest::limit("BTC-USD", OrderSide::Sell, "0.01", "49000")
        .with_trigger_price("48000")
        .with_trigger_direction(TriggerDirection::Descending)
        .with_client_id(9);
    let outcome = session.place_order(&conditional).await.unwrap();
    assert!(outcome.result.is_accepted());

    // Conditional placement needs no block height.
    assert!(!node.calls().contains(&NodeCall::AbciInfo));
    let calls_after_place = node.call_count();

    let cancel = CancelRequest::new("BTC-USD", ClientOrderId(9), OrderFlags::LongTerm);
    let err = session.cancel_order(&cancel).await.unwrap_err();
    assert!(matches!(core_error(&err), CoreError::InvalidOrder(_)));
    assert_eq!(node.call_count(), calls_after_place);
    assert_eq!(session.placed_orders().len(), 1);

    // The matching cancel goes through and forgets the order.
    let cancel = CancelRequest::new("BTC-USD", ClientOrderId(9), OrderFlags::Conditional);
    assert!(session.cancel_order(&cancel).await.unwrap().is_accepted());
    assert!(session.placed_orders().is_empty());
}

#[tokio::test]
async fn test_missing_trigger_direction_is_rejected_locally() {
    let node = Arc::new(MockNode::new());
    let session = session(&node);

    let req = OrderRequest::limit("BTC-USD", OrderSide::Sell, "0.01", "49000").with_trigger_price("48000");
    let err = session.place_order(&req).await.unwrap_err();

    assert!(matches!(core_error(&err), CoreError::ArgumentsRequired(_)));
    assert_eq!(node.call_count(), 0);
}

#[tokio::test]
async fn test_unknown_market_is_bad_request() {
    let node = Arc::new(MockNode::new());
    let session = session(&node);

    let req = OrderRequest::limit("DOGE-USD", OrderSide::Buy, "10", "0.1");
    let err = session.place_order(&req).await.unwrap_err();

    assert!(matches!(core_error(&err), CoreError::BadRequest(_)));
    assert_eq!(node.call_count(), 0);
}

#[tokio::test]
async fn test_rejected_broadcast_is_reported_and_not_recorded() {
    let node = Arc::new(MockNode::new());
    node.set_broadcast_response(BroadcastTxResponse {
        code: 32,
        hash: "H".to_string(),
        log: "account sequence mismatch, expected 4, got 0".to_string(),
        codespace: "sdk".to_string(),
    });
    let session = session(&node);

    let req = OrderRequest::limit("BTC-USD", OrderSide::Buy, "0.01", "50000").with_client_id(1);
    let outcome = session.place_order(&req).await.unwrap();
    match outcome.result {
        BroadcastResult::Rejected { code, log, .. } => {
            assert_eq!(code, Some(32));
            assert!(log.contains("sequence mismatch"));
        }
        other => panic!("unexpected {other:?}"),
    }
    assert!(session.placed_orders().is_empty());
}

#[tokio::test]
async fn test_account_is_refetched_for_every_transaction() {
    let node = Arc::new(MockNode::new());
    node.set_account(1, 4);
    let session = session(&node);

    for client_id in [1, 2] {
        let req = OrderRequest::limit("BTC-USD", OrderSide::Buy, "0.01", "50000").with_client_id(client_id);
        assert!(session.place_order(&req).await.unwrap().result.is_accepted());
    }

    let lookups = node
        .calls()
        .iter()
        .filter(|c| matches!(c, NodeCall::AccountInfo(_)))
        .count();
    assert_eq!(lookups, 2);

    // Long-term orders are sequence-checked. The chain still reports 4, but
    // the second transaction must not reuse it.
    let txs = node.broadcast_txs();
    assert_eq!(txs.len(), 2);
    let first = decode_tx_raw(&txs[0]);
    let second = decode_tx_raw(&txs[1]);
    assert_eq!(signer_sequence(&first), 4);
    assert_eq!(signer_sequence(&second), 5);
}

#[tokio::test]
async fn test_short_term_order_leaves_sequence_for_next_transaction() {
    let node = Arc::new(MockNode::new());
    let session = session(&node);

    let order = OrderRequest::market("BTC-USD", OrderSide::Buy, "0.01", "50000").with_client_id(1);
    assert!(session.place_order(&order).await.unwrap().result.is_accepted());

    let deposit = TransferRequest {
        currency: "USDC".to_string(),
        amount: "10".to_string(),
        source: TransferSource::Wallet,
        target: TransferTarget::Subaccount {
            address: DYDX_OWNER.to_string(),
            number: 0,
        },
    };
    assert!(session.transfer(&deposit).await.unwrap().is_accepted());

    // The chain still reports 0 after the short-term order.
    let txs = node.broadcast_txs();
    assert_eq!(txs.len(), 2);
    assert_eq!(signer_sequence(&decode_tx_raw(&txs[0])), 0);
    assert_eq!(signer_sequence(&decode_tx_raw(&txs[1])), 0);

    // Only the transfer pays gas.
    assert_eq!(node.simulated_txs().len(), 1);
    let fee = FeeEstimator::new(FeeDenom::Usdc, false).fee_for_gas(100_000).unwrap();
    assert_eq!(fee.gas_limit, 160_000);
    assert!(contains(&decode_tx_raw(&txs[1]).auth_info_bytes, &fee.encode()));
}

#[tokio::test]
async fn test_short_term_cancel_does_not_consume_sequence() {
    let node = Arc::new(MockNode::new());
    node.set_account(1, 3);
    let session = session(&node);

    let cancel = CancelRequest::new("BTC-USD", ClientOrderId(5), OrderFlags::ShortTerm);
    assert!(session.cancel_order(&cancel).await.unwrap().is_accepted());
    let order = OrderRequest::limit("BTC-USD", OrderSide::Buy, "0.01", "50000").with_client_id(6);
    assert!(session.place_order(&order).await.unwrap().result.is_accepted());

    let txs = node.broadcast_txs();
    assert_eq!(signer_sequence(&decode_tx_raw(&txs[0])), 3);
    assert_eq!(signer_sequence(&decode_tx_raw(&txs[1])), 3);
    assert!(node.simulated_txs().is_empty());
}

#[test]
fn test_owner_must_belong_to_signing_key() {
    let mut config = config();
    config.dydx.address = Some("dydx1qyqszqgpqyqszqgpqyqszqgpqyqszqgpqyqszqgp".to_string());

    let node = Arc::new(MockNode::new());
    let err = DydxSession::new(&config, credentials(), node.clone()).err().unwrap();
    assert!(matches!(err, AppError::Signer(SignerError::CosmosAddressMismatch { .. })));
}

#[tokio::test]
async fn test_deposit_skips_block_height() {
    let node = Arc::new(MockNode::new());
    let session = session(&node);

    let req = TransferRequest {
        currency: "USDC".to_string(),
        amount: "25.5".to_string(),
        source: TransferSource::Wallet,
        target: TransferTarget::Subaccount {
            address: DYDX_OWNER.to_string(),
            number: 0,
        },
    };
    assert!(session.transfer(&req).await.unwrap().is_accepted());

    let calls = node.calls();
    assert_eq!(calls.len(), 3);
    assert!(!calls.contains(&NodeCall::AbciInfo));
}

#[tokio::test]
async fn test_leverage_not_supported() {
    let node = Arc::new(MockNode::new());
    let session = session(&node);

    let req = LeverageRequest {
        symbol: "BTC-USD".to_string(),
        leverage: 5,
        is_cross: true,
    };
    let err = session.update_leverage(&req).await.unwrap_err();
    assert!(matches!(core_error(&err), CoreError::NotSupported(_)));
    assert_eq!(node.call_count(), 0);
}
