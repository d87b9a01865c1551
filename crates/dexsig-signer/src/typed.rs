//! EIP-712 typed messages that carry their own fields.
//!
//! Some primary type names (`HyperliquidTransaction:UsdSend`, `dYdX`) are not
//! valid Rust/Solidity identifiers, so these messages are encoded by hand
//! instead of through `sol!`. Only flat structs of `string`, `uint64` and
//! `address` members are supported, which is all the messages below need.

use std::borrow::Cow;

use alloy::primitives::{keccak256, Address, B256, U256};
use alloy::sol_types::Eip712Domain;

use crate::error::Result;
use crate::key::Credentials;
use crate::scheme::{sign_digest, SignatureParts};

/// A member value of a typed message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypedValue {
    String(String),
    Uint64(u64),
    Address(Address),
}

impl TypedValue {
    fn type_name(&self) -> &'static str {
        match self {
            Self::String(_) => "string",
            Self::Uint64(_) => "uint64",
            Self::Address(_) => "address",
        }
    }

    fn encode(&self) -> B256 {
        match self {
            Self::String(s) => keccak256(s.as_bytes()),
            Self::Uint64(n) => B256::from(U256::from(*n)),
            Self::Address(a) => a.into_word(),
        }
    }
}

/// A flat EIP-712 struct.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypedMessage {
    primary_type: String,
    fields: Vec<(String, TypedValue)>,
}

impl TypedMessage {
    pub fn new(primary_type: impl Into<String>) -> Self {
        Self {
            primary_type: primary_type.into(),
            fields: Vec::new(),
        }
    }

    pub fn field(mut self, name: impl Into<String>, value: TypedValue) -> Self {
        self.fields.push((name.into(), value));
        self
    }

    pub fn primary_type(&self) -> &str {
        &self.primary_type
    }

    /// `Name(type1 field1,type2 field2)`
    pub fn encode_type(&self) -> String {
        let members: Vec<String> = self
            .fields
            .iter()
            .map(|(name, value)| format!("{} {name}", value.type_name()))
            .collect();
        format!("{}({})", self.primary_type, members.join(","))
    }

    pub fn struct_hash(&self) -> B256 {
        let mut data = Vec::with_capacity(32 * (self.fields.len() + 1));
        data.extend_from_slice(keccak256(self.encode_type().as_bytes()).as_slice());
        for (_, value) in &self.fields {
            data.extend_from_slice(value.encode().as_slice());
        }
        keccak256(&data)
    }

    /// `keccak256(0x1901 || domainSeparator || structHash)`
    pub fn signing_hash(&self, domain: &Eip712Domain) -> B256 {
        let mut data = Vec::with_capacity(66);
        data.extend_from_slice(&[0x19, 0x01]);
        data.extend_from_slice(domain.hash_struct().as_slice());
        data.extend_from_slice(self.struct_hash().as_slice());
        keccak256(&data)
    }
}

/// Sign a typed message under `domain`.
pub fn sign_typed(
    credentials: &Credentials,
    domain: &Eip712Domain,
    message: &TypedMessage,
) -> Result<SignatureParts> {
    sign_digest(credentials, &message.signing_hash(domain))
}

// =============================================================================
// dYdX onboarding
// =============================================================================

pub const ONBOARDING_DOMAIN_NAME: &str = "dYdX Chain";
pub const ONBOARDING_ACTION: &str = "dYdX Chain Onboarding";
pub const ONBOARDING_CHAIN_ID_MAINNET: u64 = 1;
pub const ONBOARDING_CHAIN_ID_TESTNET: u64 = 11_155_111;

/// Domain `{name: "dYdX Chain", chainId}`; no version or contract.
pub fn onboarding_domain(is_mainnet: bool) -> Eip712Domain {
    let chain_id = if is_mainnet {
        ONBOARDING_CHAIN_ID_MAINNET
    } else {
        ONBOARDING_CHAIN_ID_TESTNET
    };
    Eip712Domain::new(
        Some(Cow::Borrowed(ONBOARDING_DOMAIN_NAME)),
        None,
        Some(U256::from(chain_id)),
        None,
        None,
    )
}

pub fn onboarding_message() -> TypedMessage {
    TypedMessage::new("dYdX").field("action", TypedValue::String(ONBOARDING_ACTION.to_string()))
}

/// Wallet onboarding signature and the entropy a dYdX key is derived from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Onboarding {
    pub signature: SignatureParts,
    /// `keccak256(r || s)`
    pub entropy: B256,
}

pub fn onboard(credentials: &Credentials, is_mainnet: bool) -> Result<Onboarding> {
    let signature = sign_typed(credentials, &onboarding_domain(is_mainnet), &onboarding_message())?;
    let entropy = keccak256(signature.to_compact()?);
    Ok(Onboarding { signature, entropy })
}

// =============================================================================
// Hyperliquid user-signed actions
// =============================================================================

pub const USER_SIGNED_DOMAIN_NAME: &str = "HyperliquidSignTransaction";
pub const USER_SIGNED_DOMAIN_VERSION: &str = "1";
/// Chain id the signature is bound to (`signatureChainId` in the action).
pub const USER_SIGNED_CHAIN_ID: u64 = 0x66eee;

pub fn user_signed_domain() -> Eip712Domain {
    Eip712Domain::new(
        Some(Cow::Borrowed(USER_SIGNED_DOMAIN_NAME)),
        Some(Cow::Borrowed(USER_SIGNED_DOMAIN_VERSION)),
        Some(U256::from(USER_SIGNED_CHAIN_ID)),
        Some(Address::ZERO),
        None,
    )
}

fn user_signed(primary_type: &str, hyperliquid_chain: &str, destination: &str, amount: &str, time: u64) -> TypedMessage {
    TypedMessage::new(primary_type)
        .field("hyperliquidChain", TypedValue::String(hyperliquid_chain.to_string()))
        .field("destination", TypedValue::String(destination.to_string()))
        .field("amount", TypedValue::String(amount.to_string()))
        .field("time", TypedValue::Uint64(time))
}

/// `HyperliquidTransaction:UsdSend`
pub fn usd_send_message(hyperliquid_chain: &str, destination: &str, amount: &str, time: u64) -> TypedMessage {
    user_signed("HyperliquidTransaction:UsdSend", hyperliquid_chain, destination, amount, time)
}

/// `HyperliquidTransaction:Withdraw`
pub fn withdraw_message(hyperliquid_chain: &str, destination: &str, amount: &str, time: u64) -> TypedMessage {
    user_signed("HyperliquidTransaction:Withdraw", hyperliquid_chain, destination, amount, time)
}
