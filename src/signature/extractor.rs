//! Signature extraction.
//!
//! Reduces a full local model (named weight arrays for the 4-layer MLP)
//! to the fixed-length fingerprint stored on the ledger: five summary
//! statistics over the primary layer, then the mean of each remaining
//! layer, scaled to integers. Pure computation, no I/O.

use std::collections::HashMap;

use ndarray::ArrayD;
use tracing::warn;

use super::codec::ScaledCodec;
use crate::error::ExtractError;

/// Layer whose full distribution is summarized.
pub const PRIMARY_LAYER: &str = "W1";

/// Remaining layers, contributing one mean each, in declared order.
pub const TAIL_LAYERS: [&str; 6] = ["b1", "W2", "b2", "W3", "b3", "W4"];

/// A participant's full local model before reduction: layer name to
/// weight array. Never leaves the participant; only the derived
/// signature is transmitted.
#[derive(Debug, Clone, Default)]
pub struct RawLocalModel {
    layers: HashMap<String, ArrayD<f64>>,
}

impl RawLocalModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, weights: ArrayD<f64>) {
        self.layers.insert(name.into(), weights);
    }

    pub fn layer(&self, name: &str) -> Option<&ArrayD<f64>> {
        self.layers.get(name)
    }
}

/// Reduces raw local models to integer-scaled signatures of a fixed
/// deployed length.
pub struct SignatureExtractor {
    codec: ScaledCodec,
    signature_length: usize,
}

impl SignatureExtractor {
    pub fn new(codec: ScaledCodec, signature_length: usize) -> Self {
        Self {
            codec,
            signature_length,
        }
    }

    /// Extract the integer-scaled signature for `model`.
    ///
    /// Statistic order is fixed: mean, population standard deviation,
    /// minimum, maximum and median of the flattened primary layer,
    /// followed by the mean of each tail layer. A sequence longer than
    /// the deployed length is truncated (lossy, logged); a shorter one
    /// is a [`ExtractError::SignatureLength`] error.
    pub fn extract(&self, model: &RawLocalModel) -> Result<Vec<i64>, ExtractError> {
        let primary = self.flattened(model, PRIMARY_LAYER)?;

        let mut stats = Vec::with_capacity(self.signature_length);
        stats.push(mean(&primary));
        stats.push(population_std(&primary));
        stats.push(minimum(&primary));
        stats.push(maximum(&primary));
        stats.push(median(&primary));

        for layer in TAIL_LAYERS {
            let values = self.flattened(model, layer)?;
            stats.push(mean(&values));
        }

        if stats.len() < self.signature_length {
            return Err(ExtractError::SignatureLength {
                expected: self.signature_length,
                actual: stats.len(),
            });
        }
        if stats.len() > self.signature_length {
            warn!(
                "extracted {} statistics, truncating to deployed length {}",
                stats.len(),
                self.signature_length
            );
            stats.truncate(self.signature_length);
        }

        Ok(stats.iter().map(|&s| self.codec.encode(s)).collect())
    }

    fn flattened(&self, model: &RawLocalModel, name: &str) -> Result<Vec<f64>, ExtractError> {
        let layer = model.layer(name).ok_or_else(|| ExtractError::MissingLayer {
            layer: name.to_string(),
        })?;
        if layer.is_empty() {
            return Err(ExtractError::EmptyLayer {
                layer: name.to_string(),
            });
        }
        Ok(layer.iter().copied().collect())
    }
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

fn population_std(values: &[f64]) -> f64 {
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

fn minimum(values: &[f64]) -> f64 {
    values.iter().copied().fold(f64::INFINITY, f64::min)
}

fn maximum(values: &[f64]) -> f64 {
    values.iter().copied().fold(f64::NEG_INFINITY, f64::max)
}

fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{arr1, arr2};

    fn mlp_model() -> RawLocalModel {
        let mut model = RawLocalModel::new();
        model.insert("W1", arr2(&[[1.0, 2.0], [3.0, 4.0]]).into_dyn());
        model.insert("b1", arr1(&[0.5, 1.5]).into_dyn());
        model.insert("W2", arr2(&[[2.0, 2.0], [2.0, 2.0]]).into_dyn());
        model.insert("b2", arr1(&[-1.0, 1.0]).into_dyn());
        model.insert("W3", arr2(&[[10.0]]).into_dyn());
        model.insert("b3", arr1(&[0.25]).into_dyn());
        model.insert("W4", arr2(&[[-4.0, 4.0]]).into_dyn());
        model
    }

    #[test]
    fn test_statistic_order_and_values() {
        let extractor = SignatureExtractor::new(ScaledCodec::new(1_000_000), 11);
        let signature = extractor.extract(&mlp_model()).unwrap();

        assert_eq!(signature.len(), 11);
        // W1 = [1,2,3,4]: mean 2.5, pop std sqrt(1.25), min 1, max 4, median 2.5
        assert_eq!(signature[0], 2_500_000);
        assert_eq!(signature[1], (1.25f64.sqrt() * 1e6).round() as i64);
        assert_eq!(signature[2], 1_000_000);
        assert_eq!(signature[3], 4_000_000);
        assert_eq!(signature[4], 2_500_000);
        // Tail means: b1=1.0, W2=2.0, b2=0.0, W3=10.0, b3=0.25, W4=0.0
        assert_eq!(&signature[5..], &[1_000_000, 2_000_000, 0, 10_000_000, 250_000, 0]);
    }

    #[test]
    fn test_extraction_is_deterministic() {
        let extractor = SignatureExtractor::new(ScaledCodec::default(), 11);
        let model = mlp_model();
        let first = extractor.extract(&model).unwrap();
        let second = extractor.extract(&model).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_missing_layer_is_named() {
        let extractor = SignatureExtractor::new(ScaledCodec::default(), 11);
        let mut model = mlp_model();
        model.layers.remove("b2");

        match extractor.extract(&model) {
            Err(ExtractError::MissingLayer { layer }) => assert_eq!(layer, "b2"),
            other => panic!("expected MissingLayer, got {:?}", other),
        }
    }

    #[test]
    fn test_short_sequence_is_an_error_not_a_pad() {
        let extractor = SignatureExtractor::new(ScaledCodec::default(), 12);
        match extractor.extract(&mlp_model()) {
            Err(ExtractError::SignatureLength { expected, actual }) => {
                assert_eq!(expected, 12);
                assert_eq!(actual, 11);
            }
            other => panic!("expected SignatureLength, got {:?}", other),
        }
    }

    #[test]
    fn test_over_length_sequence_is_truncated() {
        let extractor = SignatureExtractor::new(ScaledCodec::new(1), 5);
        let signature = extractor.extract(&mlp_model()).unwrap();
        // First five statistics of W1 survive, tail means are dropped
        assert_eq!(signature.len(), 5);
        assert_eq!(signature[0], 3); // mean 2.5 rounds away from zero
    }

    #[test]
    fn test_median_even_and_odd() {
        assert_eq!(median(&[1.0, 3.0]), 2.0);
        assert_eq!(median(&[5.0, 1.0, 3.0]), 3.0);
    }

    #[test]
    fn test_empty_layer_rejected() {
        let extractor = SignatureExtractor::new(ScaledCodec::default(), 11);
        let mut model = mlp_model();
        model.insert("W3", arr1(&[] as &[f64]).into_dyn());
        assert!(matches!(
            extractor.extract(&model),
            Err(ExtractError::EmptyLayer { .. })
        ));
    }
}
