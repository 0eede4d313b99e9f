//! Aggregation round engine.
//!
//! Drives one round end to end: fetch ledger state, fan out the local
//! signature reads, validate shapes, compute the federated mean, submit
//! the update, await confirmation and verify the write. The stage
//! sequence is fixed; a failure at any stage terminates the round with
//! that stage recorded, and nothing proceeds on partial data.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use futures::stream::{self, StreamExt};
use tracing::{error, info, warn};
use uuid::Uuid;

use super::round::{federated_mean, RoundError, RoundOutcome, RoundResult, RoundStage};
use crate::core::config::AggregationConfig;
use crate::error::LedgerError;
use crate::ledger::{Address, LedgerGateway, TxHash};

#[derive(Default)]
struct RoundContext {
    previous_global: Vec<i64>,
    locals: Vec<(Address, Vec<i64>)>,
    new_global: Option<Vec<i64>>,
    tx_hash: Option<TxHash>,
}

pub struct AggregationRoundEngine {
    gateway: Arc<dyn LedgerGateway>,
    config: AggregationConfig,
}

impl AggregationRoundEngine {
    pub fn new(gateway: Arc<dyn LedgerGateway>, config: AggregationConfig) -> Self {
        Self { gateway, config }
    }

    /// Execute one aggregation round. Never panics and never returns a
    /// transport error directly: every failure mode is folded into the
    /// returned [`RoundResult`].
    pub async fn run_round(&self) -> RoundResult {
        let round_id = Uuid::new_v4();
        let started_at = Utc::now();
        info!("round {} starting", round_id);

        let mut ctx = RoundContext::default();
        let outcome = match self.execute(round_id, &mut ctx).await {
            Ok(outcome) => outcome,
            Err((stage, err)) => {
                error!("round {} failed at {}: {}", round_id, stage, err);
                RoundOutcome::Failed { stage, error: err }
            }
        };

        if let RoundOutcome::Succeeded { verified } = &outcome {
            info!("round {} succeeded (verified: {})", round_id, verified);
        }

        RoundResult {
            round_id,
            previous_global: ctx.previous_global,
            new_global: ctx.new_global,
            locals: ctx.locals,
            outcome,
            tx_hash: ctx.tx_hash,
            started_at,
            finished_at: Utc::now(),
        }
    }

    async fn execute(
        &self,
        round_id: Uuid,
        ctx: &mut RoundContext,
    ) -> Result<RoundOutcome, (RoundStage, RoundError)> {
        // FetchingState
        ctx.previous_global = self
            .gateway
            .read_global_signature()
            .await
            .map_err(|e| (RoundStage::FetchingState, RoundError::from(e)))?;

        let participants = self
            .gateway
            .list_participants()
            .await
            .map_err(|e| (RoundStage::FetchingState, RoundError::from(e)))?;
        let participants = dedup_preserving_order(participants);

        if participants.is_empty() {
            info!("round {}: no participants registered", round_id);
            return Ok(RoundOutcome::NoParticipants);
        }
        info!(
            "round {}: fetching {} local signatures",
            round_id,
            participants.len()
        );

        ctx.locals = self.fetch_locals(&participants).await?;

        // Validating
        let expected = if ctx.previous_global.is_empty() {
            self.config.signature_length
        } else {
            ctx.previous_global.len()
        };
        if !ctx.previous_global.is_empty() && ctx.previous_global.len() != self.config.signature_length
        {
            warn!(
                "ledger global signature length {} differs from configured {}",
                ctx.previous_global.len(),
                self.config.signature_length
            );
        }
        for (participant, vector) in &ctx.locals {
            if vector.len() != expected {
                return Err((
                    RoundStage::Validating,
                    RoundError::SignatureShapeMismatch {
                        participant: participant.clone(),
                        expected,
                        actual: vector.len(),
                    },
                ));
            }
        }

        // Computing
        let vectors: Vec<Vec<i64>> = ctx.locals.iter().map(|(_, v)| v.clone()).collect();
        let new_global = federated_mean(&vectors);
        ctx.new_global = Some(new_global.clone());

        // Submitting
        let handle = self
            .gateway
            .write_global_signature(&new_global)
            .await
            .map_err(|e| (RoundStage::Submitting, RoundError::from(e)))?;
        ctx.tx_hash = Some(handle.hash.clone());

        // Confirming
        let receipt = self
            .gateway
            .await_confirmation(&handle)
            .await
            .map_err(|e| (RoundStage::Confirming, RoundError::from(e)))?;

        // Verifying. A mismatch (or an unreadable ledger) after a
        // confirmed write is a consistency warning on a succeeded
        // round, never a failure: the write is already final.
        let verified = match self.gateway.read_global_signature().await {
            Ok(readback) if readback == new_global => true,
            Ok(_) => {
                warn!(
                    "round {}: global signature read back after {} does not match submitted vector",
                    round_id, receipt.tx_hash
                );
                false
            }
            Err(e) => {
                warn!(
                    "round {}: verification read failed after confirmed write: {}",
                    round_id, e
                );
                false
            }
        };

        Ok(RoundOutcome::Succeeded { verified })
    }

    /// Fan out the local signature reads with bounded concurrency. The
    /// reads are idempotent and the assembly is keyed by participant,
    /// so completion order cannot influence the result. Any single
    /// failure aborts the round.
    async fn fetch_locals(
        &self,
        participants: &[Address],
    ) -> Result<Vec<(Address, Vec<i64>)>, (RoundStage, RoundError)> {
        let mut fetched: HashMap<Address, Result<Vec<i64>, LedgerError>> =
            stream::iter(participants.to_vec())
                .map(|participant| {
                    let gateway = Arc::clone(&self.gateway);
                    async move {
                        let result = gateway.read_local_signature(&participant).await;
                        (participant, result)
                    }
                })
                .buffer_unordered(self.config.max_concurrent_fetches.max(1))
                .collect()
                .await;

        let mut locals = Vec::with_capacity(participants.len());
        for participant in participants {
            match fetched.remove(participant) {
                Some(Ok(vector)) => locals.push((participant.clone(), vector)),
                Some(Err(source)) => {
                    return Err((
                        RoundStage::FetchingState,
                        RoundError::PartialFetchFailure {
                            participant: participant.clone(),
                            source,
                        },
                    ))
                }
                None => unreachable!("participants deduplicated before fetch"),
            }
        }
        Ok(locals)
    }
}

fn dedup_preserving_order(participants: Vec<Address>) -> Vec<Address> {
    let mut seen = std::collections::HashSet::new();
    let before = participants.len();
    let unique: Vec<Address> = participants
        .into_iter()
        .filter(|p| seen.insert(p.clone()))
        .collect();
    if unique.len() != before {
        warn!(
            "ledger listed duplicate participants: {} unique out of {}",
            unique.len(),
            before
        );
    }
    unique
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::gateway::MockLedgerGateway;
    use crate::ledger::types::TxHandle;

    fn engine_config() -> AggregationConfig {
        AggregationConfig {
            signature_length: 2,
            scaling_factor: 1,
            max_concurrent_fetches: 4,
            round_interval_secs: 0,
        }
    }

    fn addr(s: &str) -> Address {
        Address::new(s)
    }

    #[tokio::test]
    async fn test_absent_local_record_aborts_before_any_write() {
        let mut mock = MockLedgerGateway::new();
        mock.expect_read_global_signature()
            .returning(|| Ok(vec![0, 0]));
        mock.expect_list_participants()
            .returning(|| Ok(vec![addr("0xa"), addr("0xb")]));
        mock.expect_read_local_signature()
            .returning(|participant| {
                if participant.as_str() == "0xa" {
                    Ok(vec![1, 2])
                } else {
                    Err(LedgerError::NotFound("no record".to_string()))
                }
            });
        // No write_global_signature expectation: a call would panic.

        let engine = AggregationRoundEngine::new(Arc::new(mock), engine_config());
        let result = engine.run_round().await;

        match result.outcome {
            RoundOutcome::Failed {
                stage: RoundStage::FetchingState,
                error: RoundError::PartialFetchFailure { participant, .. },
            } => assert_eq!(participant.as_str(), "0xb"),
            other => panic!("expected PartialFetchFailure, got {:?}", other),
        }
        assert!(result.tx_hash.is_none());
    }

    #[tokio::test]
    async fn test_insufficient_funds_fails_at_submitting() {
        let mut mock = MockLedgerGateway::new();
        mock.expect_read_global_signature()
            .returning(|| Ok(vec![0, 0]));
        mock.expect_list_participants()
            .returning(|| Ok(vec![addr("0xa")]));
        mock.expect_read_local_signature()
            .returning(|_| Ok(vec![4, 6]));
        mock.expect_write_global_signature().returning(|_| {
            Err(LedgerError::InsufficientFunds {
                balance: 10,
                required: 1000,
            })
        });
        // await_confirmation must not run after a failed submission.

        let engine = AggregationRoundEngine::new(Arc::new(mock), engine_config());
        let result = engine.run_round().await;

        match result.outcome {
            RoundOutcome::Failed {
                stage: RoundStage::Submitting,
                error: RoundError::Ledger(LedgerError::InsufficientFunds { .. }),
            } => {}
            other => panic!("expected InsufficientFunds at Submitting, got {:?}", other),
        }
        assert_eq!(result.new_global, Some(vec![4, 6]));
        assert!(result.tx_hash.is_none());
    }

    #[tokio::test]
    async fn test_unreachable_ledger_fails_while_fetching() {
        let mut mock = MockLedgerGateway::new();
        mock.expect_read_global_signature()
            .returning(|| Err(LedgerError::Unreachable("connection refused".to_string())));

        let engine = AggregationRoundEngine::new(Arc::new(mock), engine_config());
        let result = engine.run_round().await;

        assert!(matches!(
            result.outcome,
            RoundOutcome::Failed {
                stage: RoundStage::FetchingState,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_duplicate_participants_counted_once() {
        let mut mock = MockLedgerGateway::new();
        mock.expect_read_global_signature()
            .returning(|| Ok(vec![0, 0]));
        mock.expect_list_participants()
            .returning(|| Ok(vec![addr("0xa"), addr("0xa"), addr("0xb")]));
        mock.expect_read_local_signature().returning(|participant| {
            if participant.as_str() == "0xa" {
                Ok(vec![2, 2])
            } else {
                Ok(vec![4, 4])
            }
        });
        mock.expect_write_global_signature().returning(|vector| {
            // Mean of {a, b}, not {a, a, b}
            assert_eq!(vector, &[3i64, 3][..]);
            Ok(TxHandle {
                hash: TxHash::new("0xtx"),
                nonce: 1,
            })
        });
        mock.expect_await_confirmation().returning(|handle| {
            Ok(crate::ledger::Receipt {
                tx_hash: handle.hash.clone(),
                block_number: 10,
                gas_used: 21_000,
                status: true,
            })
        });

        let engine = AggregationRoundEngine::new(Arc::new(mock), engine_config());
        let result = engine.run_round().await;

        assert!(result.outcome.is_success());
        assert_eq!(result.locals.len(), 2);
    }
}
