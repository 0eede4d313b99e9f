//! Structured error types shared across the aggregation service.
//!
//! Every failure carries its kind plus enough context (participant
//! address, variable name, stage) for callers to branch on it rather
//! than parse message strings.

use thiserror::Error;

/// Fatal configuration problems detected at startup.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A required environment variable is not set.
    #[error("missing required configuration variable {0}")]
    MissingVar(&'static str),

    /// A variable is present but cannot be parsed.
    #[error("invalid value for {name}: {reason}")]
    InvalidVar {
        /// Variable name as it appears in the environment
        name: &'static str,
        /// Parse failure detail
        reason: String,
    },
}

/// Failures raised by the ledger gateway.
#[derive(Error, Debug)]
pub enum LedgerError {
    /// Transport-level failure reaching the ledger endpoint. Retryable
    /// for read operations only.
    #[error("ledger endpoint unreachable: {0}")]
    Unreachable(String),

    /// The requested record does not exist on the ledger.
    #[error("ledger record not found: {0}")]
    NotFound(String),

    /// The ledger answered with an RPC-level error.
    #[error("ledger rpc error {code}: {message}")]
    Rpc {
        /// Numeric code from the JSON-RPC error object
        code: i64,
        /// Human-readable message from the ledger node
        message: String,
    },

    /// Signing identity balance is below the configured minimum. Raised
    /// before any transaction is constructed.
    #[error("insufficient funds: balance {balance} wei below minimum {required} wei")]
    InsufficientFunds {
        /// Current balance of the signing identity
        balance: u128,
        /// Configured minimum balance
        required: u128,
    },

    /// The transaction was submitted but not finalized within the
    /// confirmation window. Its eventual fate on the ledger is unknown.
    #[error("transaction {tx_hash} unconfirmed after {timeout_secs}s")]
    ConfirmationTimeout {
        /// Hash of the submitted transaction
        tx_hash: String,
        /// Confirmation window that elapsed
        timeout_secs: u64,
    },

    /// The transaction was finalized but reverted by the contract.
    #[error("transaction {tx_hash} reverted in block {block}")]
    TransactionReverted {
        /// Hash of the reverted transaction
        tx_hash: String,
        /// Block in which the revert was recorded
        block: u64,
    },

    /// The ledger returned a payload this client cannot interpret.
    #[error("malformed ledger response: {0}")]
    MalformedResponse(String),
}

impl LedgerError {
    /// Whether a read operation may be retried after this error.
    pub fn is_retryable(&self) -> bool {
        matches!(self, LedgerError::Unreachable(_))
    }
}

/// Failures raised by the signature extractor.
#[derive(Error, Debug)]
pub enum ExtractError {
    /// A required model layer is absent from the raw local model.
    #[error("missing required model layer {layer}")]
    MissingLayer {
        /// Key of the absent layer
        layer: String,
    },

    /// The extracted statistic sequence is shorter than the deployed
    /// signature length.
    #[error("signature length {actual} below required {expected}")]
    SignatureLength {
        /// Deployed signature length
        expected: usize,
        /// Length actually produced
        actual: usize,
    },

    /// A layer contained no elements, so no statistics can be taken.
    #[error("model layer {layer} is empty")]
    EmptyLayer {
        /// Key of the empty layer
        layer: String,
    },
}
