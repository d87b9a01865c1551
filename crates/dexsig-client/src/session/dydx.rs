//! dYdX v4 session: cosmos transactions signed in SIGN_MODE_DIRECT.

use std::sync::Arc;

use dashmap::DashMap;
use dexsig_canon::{
    sign_cosmos, simulation_tx, AccountParams, ActionBody, ChainAction, CosmosTxBuilder,
    DydxCanonicalizer, Fee, SignedEnvelope,
};
use dexsig_core::{
    BatchCancelRequest, CancelRequest, ChainClock, ClientOrderId, CoreError, ExpiryPolicy, LeverageRequest, MarginRequest,
    ModifyRequest, OrderFlags, OrderIdentity, OrderRequest, PlacedOrder, TransferRequest,
    WithdrawRequest, DEFAULT_ORDER_NAMESPACE,
};
use dexsig_node::{BroadcastResult, FeeEstimator, HttpNodeClient, NodeError, NodeRpc, TxSubmitter};
use dexsig_signer::{Credentials, RawHashSigner, SequenceCounter};
use dexsig_telemetry::Metrics;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{now_seconds, track, Markets, OrderOutcome, PlacedOrders};
use crate::config::AppConfig;
use crate::error::{AppError, AppResult};

/// Human-readable part of dYdX account addresses.
const BECH32_PREFIX: &str = "dydx";

/// Signs and broadcasts dYdX actions for one wallet.
pub struct DydxSession {
    credentials: Credentials,
    canonicalizer: DydxCanonicalizer,
    tx_builder: CosmosTxBuilder,
    signer: RawHashSigner,
    fees: FeeEstimator,
    expiry: ExpiryPolicy,
    node: Arc<dyn NodeRpc>,
    submitter: TxSubmitter,
    markets: Markets,
    namespace: Uuid,
    good_til_secs: u64,
    /// Next sequence per address, shared by concurrent signings.
    sequences: DashMap<String, Arc<SequenceCounter>>,
    /// Account numbers, dropped after each broadcast.
    accounts: DashMap<String, u64>,
    placed: PlacedOrders,
}

impl DydxSession {
    pub fn new(config: &AppConfig, credentials: Credentials, node: Arc<dyn NodeRpc>) -> AppResult<Self> {
        let is_mainnet = config.is_mainnet();
        let owner = config.dydx.address()?;
        credentials.verify_cosmos_address(BECH32_PREFIX, owner)?;
        let mut canonicalizer = DydxCanonicalizer::new(owner)?;
        if let Some(router) = &config.dydx.router_address {
            canonicalizer = canonicalizer.with_router_address(router.clone());
        }

        info!(
            owner = %canonicalizer.owner(),
            evm_address = %credentials.address(),
            mainnet = is_mainnet,
            markets = config.markets.len(),
            "dYdX session ready"
        );

        Ok(Self {
            credentials,
            canonicalizer,
            tx_builder: CosmosTxBuilder::for_network(is_mainnet).with_memo(config.dydx.memo.clone()),
            signer: RawHashSigner::sha256(),
            fees: FeeEstimator::new(config.dydx.fee_denom, is_mainnet).with_multiplier(config.dydx.gas_multiplier),
            expiry: ExpiryPolicy::default(),
            submitter: TxSubmitter::dydx(node.clone()),
            node,
            markets: Markets::new(config.markets.iter().cloned()),
            namespace: config.dydx.order_namespace.unwrap_or(DEFAULT_ORDER_NAMESPACE),
            good_til_secs: config.dydx.good_til_secs,
            sequences: DashMap::new(),
            accounts: DashMap::new(),
            placed: PlacedOrders::default(),
        })
    }

    /// Session against the configured HTTP endpoints.
    pub fn connect(config: &AppConfig, credentials: Credentials) -> AppResult<Self> {
        let node = HttpNodeClient::new(
            config.network.dydx_rpc_url(),
            config.network.dydx_rest_url(),
            config.network.timeout(),
        )?;
        Self::new(config, credentials, Arc::new(node))
    }

    pub fn owner(&self) -> &str {
        self.canonicalizer.owner()
    }

    pub fn placed_orders(&self) -> &PlacedOrders {
        &self.placed
    }

    pub fn identity(&self, subaccount: u32, client_id: ClientOrderId, flags: OrderFlags, pair_id: u32) -> OrderIdentity {
        OrderIdentity::derive(&self.namespace, self.owner(), subaccount, client_id, flags, pair_id)
    }

    // =========================================================================
    // Orders
    // =========================================================================

    pub async fn place_order(&self, req: &OrderRequest) -> AppResult<OrderOutcome> {
        track(self.place_order_inner(req).await)
    }

    async fn place_order_inner(&self, req: &OrderRequest) -> AppResult<OrderOutcome> {
        let order = req.validate()?;
        let market = self.markets.get(order.symbol())?;
        let quantized = order.quantize_dydx(market.dydx_scale()?)?;
        let order = &quantized.order;

        let clock = self.clock(order.flags()).await?;
        let window = self.expiry.compute(
            order.flags(),
            clock,
            order.good_til_secs().or(Some(self.good_til_secs)),
            None,
        )?;
        let action = self.canonicalizer.place_order(&quantized, market.pair_id, window)?;

        let placed = PlacedOrder {
            identity: self.identity(order.subaccount(), order.client_id(), order.flags(), market.pair_id),
            client_id: order.client_id(),
            flags: order.flags(),
            pair_id: market.pair_id,
            subaccount: order.subaccount(),
        };

        let result = self.submit(action).await?;
        if result.is_accepted() {
            self.placed.record(placed);
        }
        Ok(OrderOutcome {
            identity: placed.identity,
            client_id: placed.client_id,
            result,
        })
    }

    /// A cancel for an order this session placed must reuse its flags; the
    /// check runs before any node call.
    pub async fn cancel_order(&self, req: &CancelRequest) -> AppResult<BroadcastResult> {
        track(self.cancel_order_inner(req).await)
    }

    async fn cancel_order_inner(&self, req: &CancelRequest) -> AppResult<BroadcastResult> {
        let pair_id = self.markets.pair_id(&req.symbol)?;
        let placed = self.placed.get(req.subaccount, req.client_id, pair_id);
        if let Some(placed) = &placed {
            req.check_against(placed)?;
        }

        let clock = self.clock(req.order_flags).await?;
        let window = self.expiry.compute(
            req.order_flags,
            clock,
            req.good_til_secs.or(Some(self.good_til_secs)),
            req.good_til_block,
        )?;
        let action = self
            .canonicalizer
            .cancel_order(req, pair_id, placed.as_ref(), window)?;

        let result = self.submit(action).await?;
        if result.is_accepted() {
            self.placed.remove(req.subaccount, req.client_id, pair_id);
        }
        Ok(result)
    }

    /// Short-term orders only.
    pub async fn batch_cancel(&self, req: &BatchCancelRequest) -> AppResult<BroadcastResult> {
        track(self.batch_cancel_inner(req).await)
    }

    async fn batch_cancel_inner(&self, req: &BatchCancelRequest) -> AppResult<BroadcastResult> {
        req.validate()?;
        let clock = self.clock(OrderFlags::ShortTerm).await?;
        let window = self
            .expiry
            .compute(OrderFlags::ShortTerm, clock, None, req.good_til_block)?;
        let good_til_block = window
            .good_til_block()
            .ok_or_else(|| CoreError::InvalidOrder("short-term window without a block".to_string()))?;
        let action = self
            .canonicalizer
            .batch_cancel(req, |symbol| self.markets.pair_id(symbol), good_til_block)?;

        let result = self.submit(action).await?;
        if result.is_accepted() {
            for cancel in &req.orders {
                if let Ok(pair_id) = self.markets.pair_id(&cancel.symbol) {
                    self.placed.remove(req.subaccount, cancel.client_id, pair_id);
                }
            }
        }
        Ok(result)
    }

    pub async fn modify_order(&self, req: &ModifyRequest) -> AppResult<BroadcastResult> {
        let action = track(self.canonicalizer.modify_order(req).map_err(AppError::from))?;
        self.submit(action).await
    }

    // =========================================================================
    // Collateral
    // =========================================================================

    pub async fn transfer(&self, req: &TransferRequest) -> AppResult<BroadcastResult> {
        let action = track(self.canonicalizer.transfer(req).map_err(AppError::from))?;
        self.submit(action).await
    }

    pub async fn withdraw(&self, req: &WithdrawRequest) -> AppResult<BroadcastResult> {
        let action = track(self.canonicalizer.withdraw(req).map_err(AppError::from))?;
        self.submit(action).await
    }

    pub async fn update_leverage(&self, req: &LeverageRequest) -> AppResult<BroadcastResult> {
        let action = track(self.canonicalizer.update_leverage(req).map_err(AppError::from))?;
        self.submit(action).await
    }

    pub async fn update_margin(&self, req: &MarginRequest) -> AppResult<BroadcastResult> {
        let action = track(self.canonicalizer.update_margin(req).map_err(AppError::from))?;
        self.submit(action).await
    }

    // =========================================================================
    // Pipeline
    // =========================================================================

    /// Block height is only fetched for short-term flags.
    async fn clock(&self, flags: OrderFlags) -> AppResult<ChainClock> {
        let latest_block_height = if flags.is_short_term() {
            let height = self.node.abci_info().await?;
            u32::try_from(height)
                .map_err(|_| NodeError::Decode(format!("block height {height} exceeds uint32")))?
        } else {
            0
        };
        Ok(ChainClock {
            latest_block_height,
            now_seconds: now_seconds(),
        })
    }

    /// Account number and sequence for the signing wallet. The sequence is
    /// only taken from the counter when `consume` is set.
    async fn account(&self, counter: &SequenceCounter, consume: bool) -> AppResult<AccountParams> {
        let owner = self.owner();
        let cached = self.accounts.get(owner).map(|entry| *entry);
        let account_number = match cached {
            Some(number) if counter.is_synced() => number,
            _ => {
                let info = self.node.account_info(owner).await?;
                counter.observe(info.sequence);
                self.accounts.insert(owner.to_string(), info.account_number);
                debug!(
                    owner = %owner,
                    account_number = info.account_number,
                    chain_sequence = info.sequence,
                    "Fetched account info"
                );
                info.account_number
            }
        };
        let sequence = if consume { counter.reserve() } else { counter.current() };
        let sequence =
            sequence.ok_or_else(|| NodeError::exchange(format!("sequence for {owner} is not synced")))?;
        Ok(AccountParams {
            account_number,
            sequence,
        })
    }

    async fn submit(&self, action: ChainAction) -> AppResult<BroadcastResult> {
        let (clob, sequenced) = match action.body() {
            ActionBody::Dydx(msg) => (msg.is_clob(), !msg.is_short_term()),
            ActionBody::Hyperliquid(_) => (false, true),
        };
        let counter = self
            .sequences
            .entry(self.owner().to_string())
            .or_default()
            .clone();

        let outcome = self.sign_and_broadcast(&action, &counter, clob, sequenced).await;
        self.accounts.remove(self.owner());
        match &outcome {
            Ok(result) if result.is_accepted() => {}
            _ if sequenced => {
                warn!(owner = %self.owner(), kind = %action.kind().as_str(), "Resetting sequence after failed broadcast");
                counter.reset();
            }
            _ => {}
        }
        outcome
    }

    /// CLOB messages go out with an empty fee and skip simulation. Short-term
    /// ones sign with the current sequence and leave the counter untouched.
    async fn sign_and_broadcast(
        &self,
        action: &ChainAction,
        counter: &SequenceCounter,
        clob: bool,
        sequenced: bool,
    ) -> AppResult<BroadcastResult> {
        let account = self.account(counter, sequenced).await?;

        let fee = if clob {
            Fee::zero()
        } else {
            let sim_tx = simulation_tx(action, &self.tx_builder, self.credentials.public_key(), account.sequence)?;
            self.fees.estimate(self.node.as_ref(), sim_tx).await?
        };

        let envelope = sign_cosmos(action, &self.tx_builder, fee, account, &self.signer, &self.credentials)?;
        Metrics::action_signed("dydx", action.kind().as_str());
        debug!(
            kind = %action.kind().as_str(),
            sequence = account.sequence,
            sequenced,
            "Signed dYdX transaction"
        );

        Ok(self.submitter.broadcast(&SignedEnvelope::Cosmos(envelope)).await?)
    }
}
