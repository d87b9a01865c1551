//! Private key loading and the credentials derived from it.
//!
//! Security notes:
//! - Raw key bytes only live in `Zeroizing` buffers while being parsed.
//! - `Credentials` never implements `Serialize`, and its `Debug` output omits
//!   the key.
//! - Keys are loaded once per session; there is no runtime rotation.

use std::fmt;
use std::path::PathBuf;

use alloy::primitives::Address;
use alloy::signers::local::PrivateKeySigner;
use bech32::{Bech32, Hrp};
use ripemd::{Digest, Ripemd160};
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::error::{Result, SignerError};

/// Source of the private key.
#[derive(Debug, Clone)]
pub enum KeySource {
    /// Load from environment variable (development).
    EnvVar { var_name: String },
    /// Load from file (production, recommend 0600 permissions).
    File { path: PathBuf },
}

/// A secp256k1 key with its derived public key and EVM address.
#[derive(Clone)]
pub struct Credentials {
    signer: PrivateKeySigner,
    public_key: [u8; 33],
}

impl Credentials {
    /// Load the key from `source` and optionally verify its address.
    ///
    /// # Errors
    /// Returns `SignerError` if the source cannot be read, the hex is
    /// malformed, the key is not a valid scalar, or the derived address does
    /// not match `expected_address`.
    pub fn load(source: &KeySource, expected_address: Option<Address>) -> Result<Self> {
        let secret = match source {
            KeySource::EnvVar { var_name } => {
                let hex = Zeroizing::new(
                    std::env::var(var_name)
                        .map_err(|_| SignerError::EnvVarNotFound(var_name.clone()))?,
                );
                parse_hex_key(&hex)?
            }
            KeySource::File { path } => {
                let content = Zeroizing::new(std::fs::read_to_string(path)?);
                parse_hex_key(&content)?
            }
        };
        Self::from_bytes(&secret, expected_address)
    }

    /// Build from raw key bytes.
    pub fn from_bytes(secret: &[u8], expected_address: Option<Address>) -> Result<Self> {
        let signer = PrivateKeySigner::from_slice(secret)
            .map_err(|e| SignerError::InvalidKey(e.to_string()))?;

        if let Some(expected) = expected_address {
            if signer.address() != expected {
                return Err(SignerError::AddressMismatch {
                    expected,
                    actual: signer.address(),
                });
            }
        }

        let encoded = signer.credential().verifying_key().to_encoded_point(true);
        let public_key: [u8; 33] = encoded
            .as_bytes()
            .try_into()
            .map_err(|_| SignerError::InvalidKey("unexpected public key length".to_string()))?;

        Ok(Self { signer, public_key })
    }

    /// Build from a hex string (with or without `0x`).
    pub fn from_hex(hex_key: &str, expected_address: Option<Address>) -> Result<Self> {
        let secret = parse_hex_key(hex_key)?;
        Self::from_bytes(&secret, expected_address)
    }

    /// EVM address of the key.
    pub fn address(&self) -> Address {
        self.signer.address()
    }

    /// 33-byte SEC1 compressed public key, as cosmos `PubKey` expects.
    pub fn public_key(&self) -> &[u8; 33] {
        &self.public_key
    }

    /// Bech32 account address under `prefix`:
    /// `ripemd160(sha256(compressed public key))`.
    pub fn cosmos_address(&self, prefix: &str) -> Result<String> {
        let hrp = Hrp::parse(prefix).map_err(|_| SignerError::InvalidPrefix(prefix.to_string()))?;
        let account = Ripemd160::digest(Sha256::digest(self.public_key));
        bech32::encode::<Bech32>(hrp, &account)
            .map_err(|_| SignerError::InvalidPrefix(prefix.to_string()))
    }

    /// Check that `configured` is this key's account under `prefix`.
    ///
    /// # Errors
    /// `SignerError::CosmosAddressMismatch` when it belongs to another key.
    pub fn verify_cosmos_address(&self, prefix: &str, configured: &str) -> Result<()> {
        let derived = self.cosmos_address(prefix)?;
        if !configured.eq_ignore_ascii_case(&derived) {
            return Err(SignerError::CosmosAddressMismatch {
                configured: configured.to_string(),
                derived,
            });
        }
        Ok(())
    }

    pub(crate) fn signer(&self) -> &PrivateKeySigner {
        &self.signer
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("address", &self.address())
            .field("public_key", &hex::encode(self.public_key))
            .finish_non_exhaustive()
    }
}

/// Parse hex key from string (supports 0x prefix and whitespace trimming).
fn parse_hex_key(hex_str: &str) -> Result<Zeroizing<Vec<u8>>> {
    let trimmed = hex_str.trim().trim_start_matches("0x");
    Ok(Zeroizing::new(hex::decode(trimmed)?))
}
