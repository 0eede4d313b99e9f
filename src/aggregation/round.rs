//! Round domain types and the federated-mean arithmetic.

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::error::LedgerError;
use crate::ledger::{Address, TxHash};

/// Stages of one aggregation round, in execution order. A failure at
/// any stage terminates the round carrying the stage name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RoundStage {
    Init,
    FetchingState,
    Validating,
    Computing,
    Submitting,
    Confirming,
    Verifying,
}

impl std::fmt::Display for RoundStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RoundStage::Init => "Init",
            RoundStage::FetchingState => "FetchingState",
            RoundStage::Validating => "Validating",
            RoundStage::Computing => "Computing",
            RoundStage::Submitting => "Submitting",
            RoundStage::Confirming => "Confirming",
            RoundStage::Verifying => "Verifying",
        };
        f.write_str(name)
    }
}

/// Why a round failed. All-or-nothing: a round never aggregates over a
/// partial participant set.
#[derive(Debug, Error)]
pub enum RoundError {
    /// A participant's local signature could not be fetched, either for
    /// transport reasons or because the record is absent.
    #[error("failed to fetch local signature of {participant}: {source}")]
    PartialFetchFailure {
        participant: Address,
        source: LedgerError,
    },

    /// A fetched local signature does not match the deployed length.
    #[error("signature of {participant} has length {actual}, expected {expected}")]
    SignatureShapeMismatch {
        participant: Address,
        expected: usize,
        actual: usize,
    },

    /// A ledger operation outside the fetch fan-out failed.
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// Terminal outcome of a round.
#[derive(Debug)]
pub enum RoundOutcome {
    /// The new global signature was committed and confirmed. `verified`
    /// is false when the post-write read-back did not match the
    /// submitted vector (a ledger consistency warning, not a failure).
    Succeeded { verified: bool },

    /// The participant set was empty. Defined empty case, not an error.
    NoParticipants,

    /// The round aborted at `stage`.
    Failed { stage: RoundStage, error: RoundError },
}

impl RoundOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, RoundOutcome::Succeeded { .. })
    }
}

/// Everything one round observed and produced.
#[derive(Debug)]
pub struct RoundResult {
    pub round_id: Uuid,
    pub previous_global: Vec<i64>,
    /// Set once the Computing stage has run
    pub new_global: Option<Vec<i64>>,
    /// Local signatures used, in participant enumeration order
    pub locals: Vec<(Address, Vec<i64>)>,
    pub outcome: RoundOutcome,
    /// Set once submission produced a transaction, including the
    /// ambiguous confirmation-timeout case
    pub tx_hash: Option<TxHash>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Element-wise arithmetic mean over integer-scaled signatures.
///
/// Sums are exact in `i128`, so the result is independent of input
/// order; the single division per component rounds half away from zero,
/// the same rule the codec uses. All vectors must share one length
/// (the engine validates this before calling). Empty input yields an
/// empty vector.
pub fn federated_mean(locals: &[Vec<i64>]) -> Vec<i64> {
    let Some(first) = locals.first() else {
        return Vec::new();
    };
    let n = locals.len() as i128;

    (0..first.len())
        .map(|i| {
            let sum: i128 = locals.iter().map(|local| local[i] as i128).sum();
            div_round_half_away(sum, n)
        })
        .collect()
}

/// Integer division rounding half away from zero.
fn div_round_half_away(sum: i128, n: i128) -> i64 {
    let quotient = sum / n;
    let remainder = sum % n;
    let rounded = if remainder.abs() * 2 >= n {
        quotient + remainder.signum()
    } else {
        quotient
    };
    rounded as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_elementwise_mean() {
        let locals = vec![vec![2, 4], vec![4, 8]];
        assert_eq!(federated_mean(&locals), vec![3, 6]);
    }

    #[test]
    fn test_mean_is_order_independent() {
        let a = vec![vec![1, -7, 300], vec![5, 2, -100], vec![9, 9, 9]];
        let b = vec![a[2].clone(), a[0].clone(), a[1].clone()];
        assert_eq!(federated_mean(&a), federated_mean(&b));
    }

    #[test]
    fn test_rounding_half_away_from_zero() {
        // (1 + 2) / 2 = 1.5 -> 2; (-1 - 2) / 2 = -1.5 -> -2
        assert_eq!(federated_mean(&[vec![1], vec![2]]), vec![2]);
        assert_eq!(federated_mean(&[vec![-1], vec![-2]]), vec![-2]);
        // (1 + 1 + 2) / 3 = 1.33.. -> 1
        assert_eq!(federated_mean(&[vec![1], vec![1], vec![2]]), vec![1]);
    }

    #[test]
    fn test_large_components_do_not_overflow() {
        let locals = vec![vec![i64::MAX], vec![i64::MAX], vec![i64::MAX - 3]];
        assert_eq!(federated_mean(&locals), vec![i64::MAX - 1]);
    }

    #[test]
    fn test_single_participant_identity() {
        let locals = vec![vec![42, -7, 0]];
        assert_eq!(federated_mean(&locals), vec![42, -7, 0]);
    }

    #[test]
    fn test_empty_input() {
        assert!(federated_mean(&[]).is_empty());
    }

    #[test]
    fn test_div_round_half_away_cases() {
        assert_eq!(div_round_half_away(5, 2), 3);
        assert_eq!(div_round_half_away(-5, 2), -3);
        assert_eq!(div_round_half_away(4, 3), 1);
        assert_eq!(div_round_half_away(-4, 3), -1);
        assert_eq!(div_round_half_away(0, 7), 0);
    }
}
