//! Hyperliquid session: L1 actions through the phantom agent, transfers as
//! user-signed typed data.

use std::borrow::Cow;
use std::sync::Arc;

use alloy::primitives::Address;
use dexsig_canon::{sign_l1_action, sign_user_action, ChainAction, HyperliquidCanonicalizer, SignedEnvelope};
use dexsig_core::{
    parse_decimal, BatchCancelRequest, CancelRequest, FormattedOrder, LeverageRequest, MarginRequest,
    ModifyRequest, OrderKind, OrderRequest, PlacedOrder, TransferRequest, WithdrawRequest,
};
use dexsig_node::{BroadcastResult, ExchangeApi, HttpExchangeClient, TxSubmitter};
use dexsig_signer::{Clock, Credentials, NonceManager, StructuredDataSigner, SystemClock};
use dexsig_telemetry::Metrics;
use rust_decimal::Decimal;
use tracing::{debug, info};

use super::{track, Markets, OrderOutcome, PlacedOrders};
use crate::config::AppConfig;
use crate::error::{AppError, AppResult};

/// Signs and posts Hyperliquid actions for one wallet.
pub struct HyperliquidSession<C: Clock = SystemClock> {
    credentials: Credentials,
    canonicalizer: HyperliquidCanonicalizer,
    signer: StructuredDataSigner,
    nonces: NonceManager<C>,
    submitter: TxSubmitter,
    markets: Markets,
    vault_address: Option<Address>,
    expires_after_ms: Option<u64>,
    slippage: Decimal,
    placed: PlacedOrders,
}

impl HyperliquidSession<SystemClock> {
    pub fn new(config: &AppConfig, credentials: Credentials, exchange: Arc<dyn ExchangeApi>) -> AppResult<Self> {
        Self::with_clock(config, credentials, exchange, SystemClock)
    }

    /// Session against the configured API URL.
    pub fn connect(config: &AppConfig, credentials: Credentials) -> AppResult<Self> {
        let exchange = HttpExchangeClient::new(config.network.hyperliquid_api_url(), config.network.timeout())?;
        Self::new(config, credentials, Arc::new(exchange))
    }
}

impl<C: Clock> HyperliquidSession<C> {
    pub fn with_clock(
        config: &AppConfig,
        credentials: Credentials,
        exchange: Arc<dyn ExchangeApi>,
        clock: C,
    ) -> AppResult<Self> {
        let is_mainnet = config.is_mainnet();
        if config.hyperliquid.slippage < Decimal::ZERO || config.hyperliquid.slippage >= Decimal::ONE {
            return Err(AppError::Config(format!(
                "[hyperliquid] slippage must be in [0, 1), got {}",
                config.hyperliquid.slippage
            )));
        }
        let mut canonicalizer = HyperliquidCanonicalizer::new(is_mainnet, credentials.address().to_string());
        if let Some(namespace) = config.dydx.order_namespace {
            canonicalizer = canonicalizer.with_namespace(namespace);
        }
        let vault_address = config.hyperliquid.vault_address()?;

        info!(
            address = %credentials.address(),
            vault = ?vault_address,
            chain = canonicalizer.chain_name(),
            markets = config.markets.len(),
            "Hyperliquid session ready"
        );

        Ok(Self {
            credentials,
            canonicalizer,
            signer: StructuredDataSigner::phantom_agent(is_mainnet),
            nonces: NonceManager::new(clock),
            submitter: TxSubmitter::hyperliquid(exchange),
            markets: Markets::new(config.markets.iter().cloned()),
            vault_address,
            expires_after_ms: config.hyperliquid.expires_after_ms,
            slippage: config.hyperliquid.slippage,
            placed: PlacedOrders::default(),
        })
    }

    pub fn address(&self) -> Address {
        self.credentials.address()
    }

    pub fn placed_orders(&self) -> &PlacedOrders {
        &self.placed
    }

    /// Fold the exchange's clock into future nonces.
    pub fn sync_server_time(&self, server_time_ms: u64) -> AppResult<()> {
        Ok(self.nonces.sync_with_server(server_time_ms)?)
    }

    // =========================================================================
    // Orders
    // =========================================================================

    pub async fn place_order(&self, req: &OrderRequest) -> AppResult<OrderOutcome> {
        track(self.place_order_inner(req).await)
    }

    async fn place_order_inner(&self, req: &OrderRequest) -> AppResult<OrderOutcome> {
        let (formatted, asset) = self.format(req)?;
        let order = &formatted.order;
        let placed = PlacedOrder {
            identity: self.canonicalizer.identity(order, asset),
            client_id: order.client_id(),
            flags: order.flags(),
            pair_id: asset,
            subaccount: order.subaccount(),
        };

        let action = self.canonicalizer.place_order(&formatted, asset)?;
        let result = self.submit_l1(action).await?;
        if result.is_accepted() {
            self.placed.record(placed);
        }
        Ok(OrderOutcome {
            identity: placed.identity,
            client_id: placed.client_id,
            result,
        })
    }

    pub async fn cancel_order(&self, req: &CancelRequest) -> AppResult<BroadcastResult> {
        track(self.cancel_order_inner(req).await)
    }

    async fn cancel_order_inner(&self, req: &CancelRequest) -> AppResult<BroadcastResult> {
        let asset = self.markets.pair_id(&req.symbol)?;
        let placed = self.placed.get(req.subaccount, req.client_id, asset);
        let action = self.canonicalizer.cancel_order(req, asset, placed.as_ref())?;

        let result = self.submit_l1(action).await?;
        if result.is_accepted() {
            self.placed.remove(req.subaccount, req.client_id, asset);
        }
        Ok(result)
    }

    pub async fn batch_cancel(&self, req: &BatchCancelRequest) -> AppResult<BroadcastResult> {
        let action = track(
            self.canonicalizer
                .batch_cancel(req, |symbol| self.markets.pair_id(symbol))
                .map_err(AppError::from),
        )?;
        let result = self.submit_l1(action).await?;
        if result.is_accepted() {
            for cancel in &req.orders {
                if let Ok(asset) = self.markets.pair_id(&cancel.symbol) {
                    self.placed.remove(req.subaccount, cancel.client_id, asset);
                }
            }
        }
        Ok(result)
    }

    pub async fn modify_order(&self, req: &ModifyRequest) -> AppResult<OrderOutcome> {
        track(self.modify_order_inner(req).await)
    }

    async fn modify_order_inner(&self, req: &ModifyRequest) -> AppResult<OrderOutcome> {
        let (formatted, asset) = self.format(&req.order)?;
        let identity = self.canonicalizer.identity(&formatted.order, asset);
        let client_id = formatted.order.client_id();

        let action = self.canonicalizer.modify_order(req.target, &formatted, asset)?;
        let result = self.submit_l1(action).await?;
        Ok(OrderOutcome {
            identity,
            client_id,
            result,
        })
    }

    // =========================================================================
    // Account
    // =========================================================================

    pub async fn update_leverage(&self, req: &LeverageRequest) -> AppResult<BroadcastResult> {
        let action = track(self.leverage_action(req))?;
        self.submit_l1(action).await
    }

    fn leverage_action(&self, req: &LeverageRequest) -> AppResult<ChainAction> {
        let asset = self.markets.pair_id(&req.symbol)?;
        Ok(self.canonicalizer.update_leverage(req, asset)?)
    }

    pub async fn update_margin(&self, req: &MarginRequest) -> AppResult<BroadcastResult> {
        let action = track(self.margin_action(req))?;
        self.submit_l1(action).await
    }

    fn margin_action(&self, req: &MarginRequest) -> AppResult<ChainAction> {
        let asset = self.markets.pair_id(&req.symbol)?;
        Ok(self.canonicalizer.update_margin(req, asset)?)
    }

    /// `usdSend`; the nonce doubles as the message `time`.
    pub async fn transfer(&self, req: &TransferRequest) -> AppResult<BroadcastResult> {
        let time = self.nonces.next();
        let action = track(self.canonicalizer.usd_send(req, time).map_err(AppError::from))?;
        self.submit_user_signed(action).await
    }

    /// `withdraw3` to an EVM address on the bridge chain.
    pub async fn withdraw(&self, req: &WithdrawRequest) -> AppResult<BroadcastResult> {
        let time = self.nonces.next();
        let action = track(self.canonicalizer.withdraw(req, time).map_err(AppError::from))?;
        self.submit_user_signed(action).await
    }

    // =========================================================================
    // Pipeline
    // =========================================================================

    fn format(&self, req: &OrderRequest) -> AppResult<(FormattedOrder, u32)> {
        let req = self.apply_slippage(req)?;
        let order = req.validate()?;
        let market = self.markets.get(order.symbol())?;
        let formatted = order.quantize_hyperliquid(market, market.hyperliquid_scale()?)?;
        Ok((formatted, market.pair_id))
    }

    /// Market orders become IOC limits `slippage` beyond the given price.
    fn apply_slippage<'r>(&self, req: &'r OrderRequest) -> AppResult<Cow<'r, OrderRequest>> {
        let price = match (req.kind, &req.price) {
            (OrderKind::Market, Some(price)) => parse_decimal(price)?,
            _ => return Ok(Cow::Borrowed(req)),
        };
        let bound = if req.side.is_buy() {
            price * (Decimal::ONE + self.slippage)
        } else {
            price * (Decimal::ONE - self.slippage)
        };
        debug!(symbol = %req.symbol, %price, %bound, "Applied market slippage");

        let mut bounded = req.clone();
        bounded.price = Some(bound.normalize().to_string());
        Ok(Cow::Owned(bounded))
    }

    async fn submit_l1(&self, action: ChainAction) -> AppResult<BroadcastResult> {
        let nonce = self.nonces.next();
        let expires_after = self.expires_after_ms.map(|ms| nonce.saturating_add(ms));
        let envelope = sign_l1_action(
            action,
            nonce,
            self.vault_address,
            expires_after,
            &self.signer,
            &self.credentials,
        )?;
        self.broadcast(SignedEnvelope::Hyperliquid(envelope)).await
    }

    async fn submit_user_signed(&self, action: ChainAction) -> AppResult<BroadcastResult> {
        let envelope = sign_user_action(action, &self.credentials)?;
        self.broadcast(SignedEnvelope::Hyperliquid(envelope)).await
    }

    async fn broadcast(&self, envelope: SignedEnvelope) -> AppResult<BroadcastResult> {
        Metrics::action_signed("hyperliquid", envelope.kind().as_str());
        Ok(self.submitter.broadcast(&envelope).await?)
    }
}
