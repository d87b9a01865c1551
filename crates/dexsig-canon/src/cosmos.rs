//! Cosmos SDK transaction types (`cosmos.tx.v1beta1`).
//!
//! A transaction is signed in SIGN_MODE_DIRECT: the signature covers the
//! SHA-256 of the protobuf `SignDoc`, which embeds the exact body and auth
//! info bytes later placed in `TxRaw`.

use crate::proto::ProtoWriter;

pub const MAINNET_CHAIN_ID: &str = "dydx-mainnet-1";
pub const TESTNET_CHAIN_ID: &str = "dydx-testnet-4";

pub const SECP256K1_PUBKEY_TYPE_URL: &str = "/cosmos.crypto.secp256k1.PubKey";

/// `signing.v1beta1.SignMode.SIGN_MODE_DIRECT`
pub const SIGN_MODE_DIRECT: i32 = 1;

/// `google.protobuf.Any`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Any {
    pub type_url: String,
    pub value: Vec<u8>,
}

impl Any {
    pub fn new(type_url: impl Into<String>, value: Vec<u8>) -> Self {
        Self {
            type_url: type_url.into(),
            value,
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        ProtoWriter::new()
            .string(1, &self.type_url)
            .bytes(2, &self.value)
            .finish()
    }

    /// Compressed secp256k1 public key wrapped for `SignerInfo`.
    pub fn secp256k1_pubkey(public_key: &[u8; 33]) -> Self {
        let key = ProtoWriter::new().bytes(1, public_key).finish();
        Self::new(SECP256K1_PUBKEY_TYPE_URL, key)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Coin {
    pub denom: String,
    /// Integer amount in the denom's base unit.
    pub amount: String,
}

impl Coin {
    pub fn new(denom: impl Into<String>, amount: u128) -> Self {
        Self {
            denom: denom.into(),
            amount: amount.to_string(),
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        ProtoWriter::new()
            .string(1, &self.denom)
            .string(2, &self.amount)
            .finish()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fee {
    pub amount: Vec<Coin>,
    pub gas_limit: u64,
}

impl Fee {
    /// No coins and no gas limit; used for simulation.
    pub fn zero() -> Self {
        Self::default()
    }

    pub fn new(coin: Coin, gas_limit: u64) -> Self {
        Self {
            amount: vec![coin],
            gas_limit,
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut w = ProtoWriter::new();
        for coin in &self.amount {
            w.length_delimited(1, &coin.encode());
        }
        w.uint64(2, self.gas_limit);
        w.finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignerInfo {
    pub public_key: [u8; 33],
    pub sequence: u64,
}

impl SignerInfo {
    pub fn encode(&self) -> Vec<u8> {
        // ModeInfo { single: Single { mode } }
        let single = ProtoWriter::new().int32(1, SIGN_MODE_DIRECT).finish();
        let mode_info = ProtoWriter::new().length_delimited(1, &single).finish();

        ProtoWriter::new()
            .length_delimited(1, &Any::secp256k1_pubkey(&self.public_key).encode())
            .length_delimited(2, &mode_info)
            .uint64(3, self.sequence)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthInfo {
    pub signer_infos: Vec<SignerInfo>,
    pub fee: Fee,
}

impl AuthInfo {
    pub fn encode(&self) -> Vec<u8> {
        let mut w = ProtoWriter::new();
        for info in &self.signer_infos {
            w.length_delimited(1, &info.encode());
        }
        w.length_delimited(2, &self.fee.encode());
        w.finish()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TxBody {
    pub messages: Vec<Any>,
    pub memo: String,
    pub timeout_height: u64,
}

impl TxBody {
    pub fn encode(&self) -> Vec<u8> {
        let mut w = ProtoWriter::new();
        for msg in &self.messages {
            w.length_delimited(1, &msg.encode());
        }
        w.string(2, &self.memo);
        w.uint64(3, self.timeout_height);
        w.finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignDoc {
    pub body_bytes: Vec<u8>,
    pub auth_info_bytes: Vec<u8>,
    pub chain_id: String,
    pub account_number: u64,
}

impl SignDoc {
    pub fn encode(&self) -> Vec<u8> {
        ProtoWriter::new()
            .bytes(1, &self.body_bytes)
            .bytes(2, &self.auth_info_bytes)
            .string(3, &self.chain_id)
            .uint64(4, self.account_number)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxRaw {
    pub body_bytes: Vec<u8>,
    pub auth_info_bytes: Vec<u8>,
    pub signatures: Vec<Vec<u8>>,
}

impl TxRaw {
    pub fn encode(&self) -> Vec<u8> {
        let mut w = ProtoWriter::new();
        w.bytes(1, &self.body_bytes);
        w.bytes(2, &self.auth_info_bytes);
        for sig in &self.signatures {
            w.length_delimited(3, sig);
        }
        w.finish()
    }
}

// =============================================================================
// Builder
// =============================================================================

/// Assembles body and auth info for one chain.
#[derive(Debug, Clone)]
pub struct CosmosTxBuilder {
    chain_id: String,
    memo: String,
}

impl CosmosTxBuilder {
    pub fn new(chain_id: impl Into<String>) -> Self {
        Self {
            chain_id: chain_id.into(),
            memo: String::new(),
        }
    }

    pub fn for_network(is_mainnet: bool) -> Self {
        Self::new(if is_mainnet {
            MAINNET_CHAIN_ID
        } else {
            TESTNET_CHAIN_ID
        })
    }

    pub fn with_memo(mut self, memo: impl Into<String>) -> Self {
        self.memo = memo.into();
        self
    }

    pub fn chain_id(&self) -> &str {
        &self.chain_id
    }

    pub fn build(&self, messages: Vec<Any>, public_key: &[u8; 33], sequence: u64, fee: Fee) -> UnsignedTx {
        let body = TxBody {
            messages,
            memo: self.memo.clone(),
            timeout_height: 0,
        };
        let auth_info = AuthInfo {
            signer_infos: vec![SignerInfo {
                public_key: *public_key,
                sequence,
            }],
            fee,
        };
        UnsignedTx {
            body_bytes: body.encode(),
            auth_info_bytes: auth_info.encode(),
            chain_id: self.chain_id.clone(),
        }
    }
}

/// Body and auth info bytes, fixed before signing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsignedTx {
    body_bytes: Vec<u8>,
    auth_info_bytes: Vec<u8>,
    chain_id: String,
}

impl UnsignedTx {
    pub fn body_bytes(&self) -> &[u8] {
        &self.body_bytes
    }

    pub fn auth_info_bytes(&self) -> &[u8] {
        &self.auth_info_bytes
    }

    pub fn sign_doc(&self, account_number: u64) -> SignDoc {
        SignDoc {
            body_bytes: self.body_bytes.clone(),
            auth_info_bytes: self.auth_info_bytes.clone(),
            chain_id: self.chain_id.clone(),
            account_number,
        }
    }

    /// `TxRaw` with one empty signature, as `simulate` expects.
    pub fn simulation_bytes(&self) -> Vec<u8> {
        TxRaw {
            body_bytes: self.body_bytes.clone(),
            auth_info_bytes: self.auth_info_bytes.clone(),
            signatures: vec![Vec::new()],
        }
        .encode()
    }

    pub fn into_tx_raw(self, signature: Vec<u8>) -> TxRaw {
        TxRaw {
            body_bytes: self.body_bytes,
            auth_info_bytes: self.auth_info_bytes,
            signatures: vec![signature],
        }
    }
}
