//! Transaction signing capability.
//!
//! Key handling is deliberately opaque to the rest of the service: the
//! gateway hands a canonical payload to a [`TransactionSigner`] and gets
//! back an encoded signature plus the identity's address. Swapping the
//! scheme (or delegating to an external signer) touches nothing else.

use base64::{engine::general_purpose, Engine as _};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

use super::types::Address;
use crate::error::ConfigError;

type HmacSha256 = Hmac<Sha256>;

/// Signs transaction payloads on behalf of one ledger identity.
pub trait TransactionSigner: Send + Sync {
    /// Address of the signing identity.
    fn address(&self) -> &Address;

    /// Produce an encoded signature over the canonical payload bytes.
    fn sign(&self, payload: &[u8]) -> String;
}

/// Keyed signer holding the identity's secret in memory.
pub struct LocalKeySigner {
    key: Vec<u8>,
    address: Address,
}

impl LocalKeySigner {
    /// Build a signer from a hex-encoded private key (0x prefix
    /// optional). The identity address is derived from the key digest.
    pub fn from_hex_key(hex_key: &str) -> Result<Self, ConfigError> {
        let stripped = hex_key.strip_prefix("0x").unwrap_or(hex_key);
        let key = hex::decode(stripped).map_err(|e| ConfigError::InvalidVar {
            name: "SIGNER_PRIVATE_KEY",
            reason: e.to_string(),
        })?;
        if key.is_empty() {
            return Err(ConfigError::InvalidVar {
                name: "SIGNER_PRIVATE_KEY",
                reason: "key must not be empty".to_string(),
            });
        }

        let digest = Sha256::digest(&key);
        let address = Address::new(format!("0x{}", hex::encode(&digest[..20])));

        Ok(Self { key, address })
    }
}

impl TransactionSigner for LocalKeySigner {
    fn address(&self) -> &Address {
        &self.address
    }

    fn sign(&self, payload: &[u8]) -> String {
        let mut mac =
            HmacSha256::new_from_slice(&self.key).expect("HMAC can take key of any size");
        mac.update(payload);
        general_purpose::STANDARD.encode(mac.finalize().into_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_is_stable_for_key() {
        let a = LocalKeySigner::from_hex_key("0xdeadbeef").unwrap();
        let b = LocalKeySigner::from_hex_key("deadbeef").unwrap();
        assert_eq!(a.address(), b.address());
        assert!(a.address().as_str().starts_with("0x"));
        assert_eq!(a.address().as_str().len(), 42);
    }

    #[test]
    fn test_signature_is_deterministic_and_key_dependent() {
        let a = LocalKeySigner::from_hex_key("0011").unwrap();
        let b = LocalKeySigner::from_hex_key("0022").unwrap();
        assert_eq!(a.sign(b"payload"), a.sign(b"payload"));
        assert_ne!(a.sign(b"payload"), b.sign(b"payload"));
    }

    #[test]
    fn test_invalid_hex_rejected() {
        assert!(LocalKeySigner::from_hex_key("0xzz").is_err());
        assert!(LocalKeySigner::from_hex_key("").is_err());
    }
}
