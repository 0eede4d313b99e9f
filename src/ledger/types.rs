use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque address-like identifier for a participant or signing identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    pub fn new(addr: impl Into<String>) -> Self {
        Self(addr.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Hash identifying a submitted ledger transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TxHash(String);

impl TxHash {
    pub fn new(hash: impl Into<String>) -> Self {
        Self(hash.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Handle to an in-flight write transaction, returned by submission and
/// consumed by confirmation.
#[derive(Debug, Clone)]
pub struct TxHandle {
    pub hash: TxHash,
    pub nonce: u64,
}

/// Finalization metadata for a confirmed transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    pub tx_hash: TxHash,
    pub block_number: u64,
    pub gas_used: u64,
    /// true if the state change was applied, false if reverted
    pub status: bool,
}

/// A contract invocation before signing. Gas pricing is left to the
/// ledger node; the sequence number is the only client-managed field.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnsignedTransaction {
    pub from: Address,
    pub contract: Address,
    pub nonce: u64,
    pub method: String,
    pub args: serde_json::Value,
}

impl UnsignedTransaction {
    /// Canonical byte encoding handed to the signing capability.
    pub fn signing_payload(&self) -> Vec<u8> {
        format!(
            "{}:{}:{}:{}:{}",
            self.from, self.contract, self.nonce, self.method, self.args
        )
        .into_bytes()
    }
}
