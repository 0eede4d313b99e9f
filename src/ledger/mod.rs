pub mod gateway;
pub mod rpc;
pub mod signer;
pub mod types;

pub use gateway::{HttpLedgerGateway, LedgerGateway};
pub use signer::{LocalKeySigner, TransactionSigner};
pub use types::{Address, Receipt, TxHandle, TxHash};

#[cfg(test)]
pub use gateway::MockLedgerGateway;
