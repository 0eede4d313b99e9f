//! Ledger gateway.
//!
//! The [`LedgerGateway`] trait is the engine's only view of the ledger.
//! [`HttpLedgerGateway`] implements it over JSON-RPC: reads go through
//! bounded retry with exponential backoff, writes serialize on the
//! signing identity's sequence number and check the balance
//! precondition before any transaction is built.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::Mutex;
use tokio::time;
use tracing::{debug, info, warn};

use super::rpc::RpcClient;
use super::signer::TransactionSigner;
use super::types::{Address, Receipt, TxHandle, UnsignedTransaction};
use crate::core::config::LedgerConfig;
use crate::error::LedgerError;

/// Capabilities the aggregation engine needs from the ledger.
///
/// Reads are idempotent and side-effect free. The two write operations
/// construct, sign and submit a single state-changing transaction each.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LedgerGateway: Send + Sync {
    /// All participant addresses currently registered on the contract.
    async fn list_participants(&self) -> Result<Vec<Address>, LedgerError>;

    /// The integer-scaled local signature of one participant.
    /// `NotFound` if the participant has no record.
    async fn read_local_signature(&self, participant: &Address) -> Result<Vec<i64>, LedgerError>;

    /// The current integer-scaled global signature. Empty before the
    /// contract is initialized.
    async fn read_global_signature(&self) -> Result<Vec<i64>, LedgerError>;

    /// Current balance of the signing identity, in wei.
    async fn signer_balance(&self) -> Result<u128, LedgerError>;

    /// Submit the new global signature. Owner-only contract call.
    async fn write_global_signature(&self, vector: &[i64]) -> Result<TxHandle, LedgerError>;

    /// Submit this identity's local signature (participant side).
    async fn post_local_signature(&self, vector: &[i64]) -> Result<TxHandle, LedgerError>;

    /// Block until `handle` is finalized or the configured confirmation
    /// window elapses. Timeout means the transaction's fate is unknown.
    async fn await_confirmation(&self, handle: &TxHandle) -> Result<Receipt, LedgerError>;
}

/// JSON-RPC implementation of the gateway.
pub struct HttpLedgerGateway {
    rpc: RpcClient,
    contract: Address,
    signer: Arc<dyn TransactionSigner>,
    min_balance_wei: u128,
    submit_timeout: Duration,
    confirmation_timeout: Duration,
    confirmation_poll: Duration,
    read_retry_attempts: u32,
    read_retry_base: Duration,
    // One in-flight write per identity: the guard spans the nonce read
    // and the submission, so concurrent rounds queue here.
    write_lock: Mutex<()>,
}

impl HttpLedgerGateway {
    pub fn new(
        config: &LedgerConfig,
        signer: Arc<dyn TransactionSigner>,
    ) -> Result<Self, LedgerError> {
        let rpc = RpcClient::new(config.rpc_url.clone(), config.fetch_timeout)?;
        Ok(Self {
            rpc,
            contract: config.contract_address.clone(),
            signer,
            min_balance_wei: config.min_balance_wei,
            submit_timeout: config.submit_timeout,
            confirmation_timeout: config.confirmation_timeout,
            confirmation_poll: config.confirmation_poll,
            read_retry_attempts: config.read_retry_attempts,
            read_retry_base: config.read_retry_base,
            write_lock: Mutex::new(()),
        })
    }

    async fn with_read_retry<T, F, Fut>(&self, what: &str, op: F) -> Result<T, LedgerError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, LedgerError>>,
    {
        let mut attempt = 0u32;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt + 1 < self.read_retry_attempts => {
                    // Exponential backoff, capped exponent
                    let delay = self.read_retry_base * 2u32.pow(attempt.min(5));
                    warn!(
                        "{} failed ({}), retry {}/{} in {:?}",
                        what,
                        e,
                        attempt + 1,
                        self.read_retry_attempts - 1,
                        delay
                    );
                    time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn call_contract<T: serde::de::DeserializeOwned>(
        &self,
        method: &str,
        args: serde_json::Value,
    ) -> Result<T, LedgerError> {
        self.rpc
            .call(
                "fl_call",
                json!([{
                    "contract": self.contract,
                    "method": method,
                    "args": args,
                }]),
            )
            .await
    }

    /// Balance precondition, nonce acquisition, signing and submission
    /// for one contract write. Holds the identity write lock throughout.
    async fn submit_transaction(
        &self,
        method: &str,
        args: serde_json::Value,
    ) -> Result<TxHandle, LedgerError> {
        let _guard = self.write_lock.lock().await;

        let balance = self.signer_balance().await?;
        if balance < self.min_balance_wei {
            return Err(LedgerError::InsufficientFunds {
                balance,
                required: self.min_balance_wei,
            });
        }

        let nonce: u64 = self
            .rpc
            .call("fl_getTransactionCount", json!([self.signer.address()]))
            .await?;

        let tx = UnsignedTransaction {
            from: self.signer.address().clone(),
            contract: self.contract.clone(),
            nonce,
            method: method.to_string(),
            args,
        };
        let signature = self.signer.sign(&tx.signing_payload());

        let hash = self
            .rpc
            .call_with_timeout(
                "fl_sendTransaction",
                json!([{ "transaction": tx, "signature": signature }]),
                self.submit_timeout,
            )
            .await?;

        let handle = TxHandle { hash, nonce };
        info!(
            "submitted {} transaction {} (nonce {})",
            method, handle.hash, handle.nonce
        );
        Ok(handle)
    }
}

#[async_trait]
impl LedgerGateway for HttpLedgerGateway {
    async fn list_participants(&self) -> Result<Vec<Address>, LedgerError> {
        self.with_read_retry("getParticipants", || {
            self.call_contract("getParticipants", json!([]))
        })
        .await
    }

    async fn read_local_signature(&self, participant: &Address) -> Result<Vec<i64>, LedgerError> {
        let vector: Vec<i64> = self
            .with_read_retry("getLocalModel", || {
                self.call_contract("getLocalModel", json!([participant]))
            })
            .await?;
        // The contract answers an empty array for unknown addresses
        if vector.is_empty() {
            return Err(LedgerError::NotFound(format!(
                "no local signature for participant {}",
                participant
            )));
        }
        debug!("fetched {} components from {}", vector.len(), participant);
        Ok(vector)
    }

    async fn read_global_signature(&self) -> Result<Vec<i64>, LedgerError> {
        self.with_read_retry("getGlobalModel", || {
            self.call_contract("getGlobalModel", json!([]))
        })
        .await
    }

    async fn signer_balance(&self) -> Result<u128, LedgerError> {
        let raw: String = self
            .with_read_retry("getBalance", || {
                self.rpc
                    .call("fl_getBalance", json!([self.signer.address()]))
            })
            .await?;
        raw.parse()
            .map_err(|_| LedgerError::MalformedResponse(format!("unparsable balance {:?}", raw)))
    }

    async fn write_global_signature(&self, vector: &[i64]) -> Result<TxHandle, LedgerError> {
        self.submit_transaction("updateGlobalModel", json!([vector]))
            .await
    }

    async fn post_local_signature(&self, vector: &[i64]) -> Result<TxHandle, LedgerError> {
        self.submit_transaction("postLocalWeights", json!([vector]))
            .await
    }

    async fn await_confirmation(&self, handle: &TxHandle) -> Result<Receipt, LedgerError> {
        let deadline = Instant::now() + self.confirmation_timeout;
        loop {
            let polled: Result<Option<Receipt>, LedgerError> = self
                .rpc
                .call_optional("fl_getTransactionReceipt", json!([handle.hash]))
                .await;

            match polled {
                Ok(Some(receipt)) if receipt.status => {
                    info!(
                        "transaction {} confirmed in block {} (gas {})",
                        receipt.tx_hash, receipt.block_number, receipt.gas_used
                    );
                    return Ok(receipt);
                }
                Ok(Some(receipt)) => {
                    return Err(LedgerError::TransactionReverted {
                        tx_hash: handle.hash.to_string(),
                        block: receipt.block_number,
                    });
                }
                Ok(None) => {}
                // Transient transport trouble while polling does not
                // decide the transaction's fate; keep polling until the
                // window closes.
                Err(e) if e.is_retryable() => {
                    warn!("receipt poll for {} failed: {}", handle.hash, e);
                }
                Err(e) => return Err(e),
            }

            if Instant::now() >= deadline {
                return Err(LedgerError::ConfirmationTimeout {
                    tx_hash: handle.hash.to_string(),
                    timeout_secs: self.confirmation_timeout.as_secs(),
                });
            }
            time::sleep(self.confirmation_poll).await;
        }
    }
}
