//! dexsig - sign and broadcast orders on dYdX v4 and Hyperliquid.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use dexsig_client::{AppConfig, DydxSession, HyperliquidSession, Markets};
use dexsig_core::{
    CancelRequest, ClientOrderId, LeverageRequest, OrderFlags, OrderIdentity, OrderKind, OrderRequest,
    OrderSide, TimeInForce, TransferRequest, TransferSource, TransferTarget, TriggerDirection,
    WithdrawRequest, COLLATERAL_SYMBOL, DEFAULT_ORDER_NAMESPACE,
};
use dexsig_signer::Credentials;
use tracing::info;

/// Order signing and transaction construction for dYdX v4 and Hyperliquid
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long, env = "DEXSIG_CONFIG", default_value = "config/default.toml")]
    config: String,

    /// Target exchange
    #[arg(long, value_enum, default_value_t = Chain::Dydx)]
    chain: Chain,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Chain {
    Dydx,
    Hyperliquid,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Side {
    Buy,
    Sell,
}

impl From<Side> for OrderSide {
    fn from(side: Side) -> Self {
        match side {
            Side::Buy => OrderSide::Buy,
            Side::Sell => OrderSide::Sell,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Tif {
    Gtt,
    Ioc,
    Fok,
}

impl From<Tif> for TimeInForce {
    fn from(tif: Tif) -> Self {
        match tif {
            Tif::Gtt => TimeInForce::Gtt,
            Tif::Ioc => TimeInForce::Ioc,
            Tif::Fok => TimeInForce::Fok,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Direction {
    Ascending,
    Descending,
}

impl From<Direction> for TriggerDirection {
    fn from(direction: Direction) -> Self {
        match direction {
            Direction::Ascending => TriggerDirection::Ascending,
            Direction::Descending => TriggerDirection::Descending,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Place an order
    Place {
        symbol: String,
        #[arg(value_enum)]
        side: Side,
        amount: String,
        /// Limit price; for market orders, the worst acceptable price
        #[arg(long)]
        price: Option<String>,
        #[arg(long)]
        market: bool,
        #[arg(long, value_enum, default_value_t = Tif::Gtt)]
        tif: Tif,
        #[arg(long)]
        post_only: bool,
        #[arg(long)]
        reduce_only: bool,
        #[arg(long)]
        trigger_price: Option<String>,
        #[arg(long, value_enum)]
        trigger_direction: Option<Direction>,
        #[arg(long)]
        client_id: Option<u32>,
        #[arg(long, default_value_t = 0)]
        subaccount: u32,
        #[arg(long)]
        good_til_secs: Option<u64>,
    },
    /// Cancel an order by client id
    Cancel {
        symbol: String,
        client_id: u32,
        /// Order flags used at placement: 0, 32 or 64
        #[arg(long, default_value_t = 0)]
        flags: u32,
        #[arg(long, default_value_t = 0)]
        subaccount: u32,
        #[arg(long)]
        good_til_block: Option<u32>,
        /// Hyperliquid exchange order id
        #[arg(long)]
        oid: Option<u64>,
    },
    /// Compute an order identity without touching the network
    OrderId {
        symbol: String,
        client_id: u32,
        #[arg(long, default_value_t = 0)]
        flags: u32,
        #[arg(long, default_value_t = 0)]
        subaccount: u32,
        /// Wallet address; defaults to `[dydx] address`
        #[arg(long)]
        address: Option<String>,
    },
    /// Sign the dYdX onboarding message and print the derived entropy
    Onboard,
    /// Move USDC between wallet, subaccounts and addresses
    Transfer {
        amount: String,
        recipient: String,
        /// Credit a subaccount of `recipient` instead of the address itself
        #[arg(long)]
        recipient_subaccount: Option<u32>,
        /// Debit a subaccount instead of the wallet
        #[arg(long)]
        from_subaccount: Option<u32>,
    },
    /// Withdraw USDC to an external address
    Withdraw {
        amount: String,
        destination: String,
        #[arg(long, default_value_t = 0)]
        subaccount: u32,
    },
    /// Set leverage for a market (Hyperliquid)
    Leverage {
        symbol: String,
        leverage: u32,
        #[arg(long)]
        isolated: bool,
    },
}

enum Session {
    Dydx(DydxSession),
    Hyperliquid(HyperliquidSession),
}

impl Session {
    fn connect(chain: Chain, config: &AppConfig, credentials: Credentials) -> Result<Self> {
        Ok(match chain {
            Chain::Dydx => Self::Dydx(DydxSession::connect(config, credentials)?),
            Chain::Hyperliquid => Self::Hyperliquid(HyperliquidSession::connect(config, credentials)?),
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    dexsig_telemetry::init_logging()?;

    info!(config_path = %args.config, chain = ?args.chain, "Starting dexsig v{}", env!("CARGO_PKG_VERSION"));

    let config = AppConfig::from_file(&args.config)?;
    info!(mainnet = config.is_mainnet(), markets = config.markets.len(), "Configuration loaded");

    match &args.command {
        Command::OrderId {
            symbol,
            client_id,
            flags,
            subaccount,
            address,
        } => {
            let flags = OrderFlags::try_from(*flags)?;
            let pair_id = Markets::new(config.markets.iter().cloned()).pair_id(symbol)?;
            let address = match address {
                Some(address) => address.as_str(),
                None => config.dydx.address()?,
            };
            let namespace = config.dydx.order_namespace.unwrap_or(DEFAULT_ORDER_NAMESPACE);
            let identity = OrderIdentity::derive(
                &namespace,
                address,
                *subaccount,
                ClientOrderId(*client_id),
                flags,
                pair_id,
            );
            println!("{identity}");
            println!("cloid {}", identity.to_cloid());
            return Ok(());
        }
        Command::Onboard => {
            let credentials = load_credentials(&config)?;
            let onboarding = dexsig_signer::onboard(&credentials, config.is_mainnet())?;
            println!("signature 0x{}", hex::encode(onboarding.signature.to_bytes()?));
            println!("entropy {}", onboarding.entropy);
            return Ok(());
        }
        _ => {}
    }

    let credentials = load_credentials(&config)?;
    let session = Session::connect(args.chain, &config, credentials)?;

    match args.command {
        Command::Place {
            symbol,
            side,
            amount,
            price,
            market,
            tif,
            post_only,
            reduce_only,
            trigger_price,
            trigger_direction,
            client_id,
            subaccount,
            good_til_secs,
        } => {
            let kind = if market { OrderKind::Market } else { OrderKind::Limit };
            let mut req = OrderRequest::new(symbol, side.into(), kind, amount)
                .with_time_in_force(tif.into())
                .with_subaccount(subaccount);
            req.price = price;
            req.post_only = post_only;
            req.reduce_only = reduce_only;
            req.trigger_price = trigger_price;
            req.trigger_direction = trigger_direction.map(Into::into);
            req.client_id = client_id.map(ClientOrderId);
            req.good_til_secs = good_til_secs;

            let outcome = match &session {
                Session::Dydx(s) => s.place_order(&req).await?,
                Session::Hyperliquid(s) => s.place_order(&req).await?,
            };
            println!("identity {}", outcome.identity);
            println!("client_id {}", outcome.client_id);
            println!("{:?}", outcome.result);
        }
        Command::Cancel {
            symbol,
            client_id,
            flags,
            subaccount,
            good_til_block,
            oid,
        } => {
            let mut req = CancelRequest::new(symbol, ClientOrderId(client_id), OrderFlags::try_from(flags)?)
                .with_subaccount(subaccount);
            req.good_til_block = good_til_block;
            req.exchange_order_id = oid;

            let result = match &session {
                Session::Dydx(s) => s.cancel_order(&req).await?,
                Session::Hyperliquid(s) => s.cancel_order(&req).await?,
            };
            println!("{result:?}");
        }
        Command::Transfer {
            amount,
            recipient,
            recipient_subaccount,
            from_subaccount,
        } => {
            let req = TransferRequest {
                currency: COLLATERAL_SYMBOL.to_string(),
                amount,
                source: from_subaccount.map_or(TransferSource::Wallet, TransferSource::Subaccount),
                target: match recipient_subaccount {
                    Some(number) => TransferTarget::Subaccount {
                        address: recipient,
                        number,
                    },
                    None => TransferTarget::Address(recipient),
                },
            };
            let result = match &session {
                Session::Dydx(s) => s.transfer(&req).await?,
                Session::Hyperliquid(s) => s.transfer(&req).await?,
            };
            println!("{result:?}");
        }
        Command::Withdraw {
            amount,
            destination,
            subaccount,
        } => {
            let req = WithdrawRequest {
                currency: COLLATERAL_SYMBOL.to_string(),
                amount,
                subaccount,
                destination,
            };
            let result = match &session {
                Session::Dydx(s) => s.withdraw(&req).await?,
                Session::Hyperliquid(s) => s.withdraw(&req).await?,
            };
            println!("{result:?}");
        }
        Command::Leverage {
            symbol,
            leverage,
            isolated,
        } => {
            let Session::Hyperliquid(s) = &session else {
                bail!("leverage is only available on Hyperliquid");
            };
            let req = LeverageRequest {
                symbol,
                leverage,
                is_cross: !isolated,
            };
            println!("{:?}", s.update_leverage(&req).await?);
        }
        Command::OrderId { .. } | Command::Onboard => {}
    }

    Ok(())
}

fn load_credentials(config: &AppConfig) -> Result<Credentials> {
    let source = config.key.key_source()?;
    let credentials = Credentials::load(&source, config.key.expected_address()?)
        .context("Failed to load signing key")?;
    info!(address = %credentials.address(), "Signing key loaded");
    Ok(credentials)
}
