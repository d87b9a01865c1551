//! Signing schemes.
//!
//! Both schemes end in the same place: a 32-byte digest signed with
//! deterministic ECDSA (RFC6979) over secp256k1. They differ in how the
//! canonical payload becomes that digest:
//! - [`StructuredDataSigner`]: EIP-712. The payload's Keccak-256 becomes the
//!   `connectionId` of a phantom `Agent` struct, which is signed under the
//!   configured domain.
//! - [`RawHashSigner`]: the payload is hashed (Keccak-256 or SHA-256) and the
//!   digest is signed directly.

use alloy::primitives::{keccak256, Address, PrimitiveSignature, B256, U256};
use alloy::signers::SignerSync;
use alloy::sol;
use alloy::sol_types::{eip712_domain, Eip712Domain, SolStruct};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{Result, SignerError};
use crate::key::Credentials;

// =============================================================================
// Signature encoding
// =============================================================================

/// ECDSA signature split into its components.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureParts {
    /// 64 lowercase hex chars, zero-padded, no prefix.
    pub r: String,
    /// 64 lowercase hex chars, zero-padded, no prefix.
    pub s: String,
    /// Recovery id offset by 27 (27 or 28).
    pub v: u8,
}

impl SignatureParts {
    pub fn from_signature(sig: &PrimitiveSignature) -> Self {
        Self {
            r: hex::encode(sig.r().to_be_bytes::<32>()),
            s: hex::encode(sig.s().to_be_bytes::<32>()),
            v: 27 + u8::from(sig.v()),
        }
    }

    /// Create from raw signature bytes (65 bytes: r(32) + s(32) + v(1)).
    ///
    /// Accepts v as 0/1 or 27/28.
    pub fn from_bytes(bytes: &[u8; 65]) -> Self {
        let v_raw = bytes[64];
        let v = if v_raw < 27 { v_raw + 27 } else { v_raw };
        Self {
            r: hex::encode(&bytes[0..32]),
            s: hex::encode(&bytes[32..64]),
            v,
        }
    }

    /// `r || s`, the 64-byte form cosmos transactions carry.
    pub fn to_compact(&self) -> Result<[u8; 64]> {
        let mut out = [0u8; 64];
        out[..32].copy_from_slice(&decode_word(&self.r)?);
        out[32..].copy_from_slice(&decode_word(&self.s)?);
        Ok(out)
    }

    /// `r || s || v`.
    pub fn to_bytes(&self) -> Result<[u8; 65]> {
        let mut out = [0u8; 65];
        out[..64].copy_from_slice(&self.to_compact()?);
        out[64] = self.v;
        Ok(out)
    }

    /// `0x`-prefixed JSON form used by Hyperliquid.
    pub fn to_wire(&self) -> WireSignature {
        WireSignature {
            r: format!("0x{}", self.r),
            s: format!("0x{}", self.s),
            v: self.v,
        }
    }

    /// Recover the signing address for `digest`.
    pub fn recover_address(&self, digest: &B256) -> Result<Address> {
        let y_parity = match self.v {
            27 => false,
            28 => true,
            other => {
                return Err(SignerError::InvalidSignature(format!(
                    "v must be 27 or 28, got {other}"
                )))
            }
        };
        let r = U256::from_be_bytes(decode_word(&self.r)?);
        let s = U256::from_be_bytes(decode_word(&self.s)?);
        PrimitiveSignature::new(r, s, y_parity)
            .recover_address_from_prehash(digest)
            .map_err(|e| SignerError::InvalidSignature(e.to_string()))
    }
}

fn decode_word(hex_str: &str) -> Result<[u8; 32]> {
    let bytes = hex::decode(hex_str.trim_start_matches("0x"))?;
    bytes
        .try_into()
        .map_err(|_| SignerError::InvalidSignature("component is not 32 bytes".to_string()))
}

/// Signature as it appears in an exchange request body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireSignature {
    pub r: String,
    pub s: String,
    pub v: u8,
}

/// Sign a 32-byte digest. Pure and synchronous.
pub fn sign_digest(credentials: &Credentials, digest: &B256) -> Result<SignatureParts> {
    // NOTE: never log the signature together with the digest preimage
    let sig = credentials.signer().sign_hash_sync(digest)?;
    Ok(SignatureParts::from_signature(&sig))
}

// =============================================================================
// PayloadSigner
// =============================================================================

/// Which scheme a signer implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SigningScheme {
    StructuredData,
    RawHash,
}

/// Turns canonical payload bytes into a signature.
pub trait PayloadSigner: Send + Sync {
    fn scheme(&self) -> SigningScheme;

    /// The digest that is actually signed for `payload`.
    fn digest(&self, payload: &[u8]) -> B256;

    fn sign(&self, payload: &[u8], credentials: &Credentials) -> Result<SignatureParts> {
        sign_digest(credentials, &self.digest(payload))
    }
}

/// Phantom agent domain constants.
pub const AGENT_DOMAIN_NAME: &str = "Exchange";
pub const AGENT_DOMAIN_VERSION: &str = "1";
pub const AGENT_CHAIN_ID: u64 = 1337;

sol! {
    #[derive(Debug)]
    struct Agent {
        string source;
        bytes32 connectionId;
    }
}

/// EIP-712 signer binding a payload hash to a phantom agent.
#[derive(Debug, Clone)]
pub struct StructuredDataSigner {
    domain: Eip712Domain,
    source: String,
}

impl StructuredDataSigner {
    pub fn new(domain: Eip712Domain, source: impl Into<String>) -> Self {
        Self {
            domain,
            source: source.into(),
        }
    }

    /// Hyperliquid L1 action signer: source "a" on mainnet, "b" on testnet.
    pub fn phantom_agent(is_mainnet: bool) -> Self {
        let domain = eip712_domain! {
            name: AGENT_DOMAIN_NAME,
            version: AGENT_DOMAIN_VERSION,
            chain_id: AGENT_CHAIN_ID,
            verifying_contract: Address::ZERO,
        };
        Self::new(domain, if is_mainnet { "a" } else { "b" })
    }

    pub fn domain(&self) -> &Eip712Domain {
        &self.domain
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// EIP-712 signing hash for an already-computed connection id.
    pub fn agent_digest(&self, connection_id: B256) -> B256 {
        let agent = Agent {
            source: self.source.clone(),
            connectionId: connection_id,
        };
        agent.eip712_signing_hash(&self.domain)
    }
}

impl PayloadSigner for StructuredDataSigner {
    fn scheme(&self) -> SigningScheme {
        SigningScheme::StructuredData
    }

    fn digest(&self, payload: &[u8]) -> B256 {
        self.agent_digest(keccak256(payload))
    }
}

/// Hash function applied by [`RawHashSigner`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashKind {
    Keccak256,
    /// Cosmos SIGN_MODE_DIRECT.
    Sha256,
}

impl HashKind {
    pub fn hash(&self, payload: &[u8]) -> B256 {
        match self {
            Self::Keccak256 => keccak256(payload),
            Self::Sha256 => B256::from_slice(&Sha256::digest(payload)),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RawHashSigner {
    hash: HashKind,
}

impl RawHashSigner {
    pub fn new(hash: HashKind) -> Self {
        Self { hash }
    }

    pub fn keccak() -> Self {
        Self::new(HashKind::Keccak256)
    }

    pub fn sha256() -> Self {
        Self::new(HashKind::Sha256)
    }
}

impl PayloadSigner for RawHashSigner {
    fn scheme(&self) -> SigningScheme {
        SigningScheme::RawHash
    }

    fn digest(&self, payload: &[u8]) -> B256 {
        self.hash.hash(payload)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::tests::{test_credentials, TEST_ADDRESS};

    fn test_address() -> Address {
        TEST_ADDRESS.parse().unwrap()
    }

    /// Domain separator and struct hash must match a hand-built encoding.
    #[test]
    fn test_agent_domain_separator() {
        let signer = StructuredDataSigner::phantom_agent(false);
        let action_hash = B256::from_slice(
            &hex::decode("f01fa6eaca0b8cbd2afe65f8852a2e00d35eae3d19560ece9b8a28614646e849")
                .unwrap(),
        );

        let type_hash = keccak256(
            b"EIP712Domain(string name,string version,uint256 chainId,address verifyingContract)",
        );
        let mut domain_data = Vec::new();
        domain_data.extend_from_slice(type_hash.as_slice());
        domain_data.extend_from_slice(keccak256(AGENT_DOMAIN_NAME.as_bytes()).as_slice());
        domain_data.extend_from_slice(keccak256(AGENT_DOMAIN_VERSION.as_bytes()).as_slice());
        let mut chain_id = [0u8; 32];
        chain_id[24..].copy_from_slice(&AGENT_CHAIN_ID.to_be_bytes());
        domain_data.extend_from_slice(&chain_id);
        domain_data.extend_from_slice(&[0u8; 32]);
        assert_eq!(signer.domain().hash_struct(), keccak256(&domain_data));

        let mut struct_data = Vec::new();
        struct_data.extend_from_slice(keccak256(b"Agent(string source,bytes32 connectionId)").as_slice());
        struct_data.extend_from_slice(keccak256(b"b").as_slice());
        struct_data.extend_from_slice(action_hash.as_slice());
        let struct_hash = keccak256(&struct_data);

        let mut signing = vec![0x19, 0x01];
        signing.extend_from_slice(keccak256(&domain_data).as_slice());
        signing.extend_from_slice(struct_hash.as_slice());
        assert_eq!(signer.agent_digest(action_hash), keccak256(&signing));
    }

    /// Known vector produced by the Hyperliquid Python SDK.
    #[test]
    fn test_agent_signature_vector() {
        let creds = test_credentials();
        let signer = StructuredDataSigner::phantom_agent(false);
        let action_hash = B256::from_slice(
            &hex::decode("f01fa6eaca0b8cbd2afe65f8852a2e00d35eae3d19560ece9b8a28614646e849")
                .unwrap(),
        );
        let digest = signer.agent_digest(action_hash);
        let sig = sign_digest(&creds, &digest).unwrap();

        assert_eq!(sig.r, "a9e728f2faea4febc0b6eb9c3dbbac04b375eb3869f051030d205318425faebc");
        assert_eq!(sig.s, "7b21be7030bb979352b71494708b99d789266f0d0e1242a21e74905b683e4698");
        assert_eq!(sig.v, 27);
        assert_eq!(sig.recover_address(&digest).unwrap(), test_address());
    }

    #[test]
    fn test_structured_signer_recovers() {
        let creds = test_credentials();
        let signer = StructuredDataSigner::phantom_agent(true);
        let payload = b"canonical action bytes";
        let sig = signer.sign(payload, &creds).unwrap();

        assert_eq!(signer.scheme(), SigningScheme::StructuredData);
        assert_eq!(sig.recover_address(&signer.digest(payload)).unwrap(), test_address());
    }

    #[test]
    fn test_raw_hash_signers_recover() {
        let creds = test_credentials();
        let payload = b"sign doc bytes";
        for signer in [RawHashSigner::sha256(), RawHashSigner::keccak()] {
            let sig = signer.sign(payload, &creds).unwrap();
            assert_eq!(sig.r.len(), 64);
            assert_eq!(sig.s.len(), 64);
            assert!(sig.v == 27 || sig.v == 28);
            assert_eq!(sig.recover_address(&signer.digest(payload)).unwrap(), test_address());
        }
    }

    #[test]
    fn test_sha256_digest() {
        let digest = HashKind::Sha256.hash(b"abc");
        assert_eq!(
            hex::encode(digest),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_signing_is_deterministic() {
        let creds = test_credentials();
        let signer = RawHashSigner::sha256();
        assert_eq!(signer.sign(b"x", &creds).unwrap(), signer.sign(b"x", &creds).unwrap());
    }

    #[test]
    fn test_signature_byte_forms() {
        let mut raw = [0u8; 65];
        raw[31] = 1;
        raw[63] = 2;
        raw[64] = 1;
        let parts = SignatureParts::from_bytes(&raw);
        assert_eq!(parts.v, 28);
        assert_eq!(parts.r, format!("{}01", "0".repeat(62)));

        let compact = parts.to_compact().unwrap();
        assert_eq!(compact[31], 1);
        assert_eq!(compact[63], 2);
        assert_eq!(parts.to_bytes().unwrap()[64], 28);

        let wire = parts.to_wire();
        assert!(wire.r.starts_with("0x"));
        assert_eq!(
            serde_json::to_string(&wire).unwrap(),
            format!(r#"{{"r":"0x{}","s":"0x{}","v":28}}"#, parts.r, parts.s)
        );
    }

    #[test]
    fn test_recover_rejects_bad_v() {
        let parts = SignatureParts {
            r: "11".repeat(32),
            s: "22".repeat(32),
            v: 3,
        };
        assert!(matches!(
            parts.recover_address(&B256::ZERO),
            Err(SignerError::InvalidSignature(_))
        ));
    }
}
