//! Participant-side submission.
//!
//! A prosumer reduces its raw local model to the ledger signature and
//! posts it under its own signing identity. Shares the extractor, codec
//! and gateway with the aggregation path, so both sides of the protocol
//! agree on scaling and rounding.

use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::error::{ExtractError, LedgerError};
use crate::ledger::{LedgerGateway, Receipt};
use crate::signature::{RawLocalModel, SignatureExtractor};

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error(transparent)]
    Extract(#[from] ExtractError),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

pub struct LocalSubmitter {
    gateway: Arc<dyn LedgerGateway>,
    extractor: SignatureExtractor,
}

impl LocalSubmitter {
    pub fn new(gateway: Arc<dyn LedgerGateway>, extractor: SignatureExtractor) -> Self {
        Self { gateway, extractor }
    }

    /// Extract this participant's signature and post it to the ledger,
    /// waiting for finalization.
    pub async fn submit_local_model(&self, model: &RawLocalModel) -> Result<Receipt, SubmitError> {
        let signature = self.extractor.extract(model)?;
        info!("submitting local signature ({} components)", signature.len());

        let handle = self.gateway.post_local_signature(&signature).await?;
        let receipt = self.gateway.await_confirmation(&handle).await?;
        info!(
            "local signature accepted in block {} (tx {})",
            receipt.block_number, receipt.tx_hash
        );
        Ok(receipt)
    }
}
