//! Scaled fixed-point codec.
//!
//! The ledger stores signature components as signed integers scaled by a
//! fixed factor. This module is the only place that converts between the
//! integer ledger representation and real-valued statistics; everything
//! that touches signature numbers goes through a [`ScaledCodec`].

/// Default scaling factor used by the deployed contract.
pub const DEFAULT_SCALING_FACTOR: i64 = 1_000_000;

/// Converts between real-valued statistics and integer-scaled ledger
/// values. Rounding is half away from zero (`f64::round`), the single
/// rounding rule used across extraction and aggregation.
#[derive(Debug, Clone, Copy)]
pub struct ScaledCodec {
    scale: i64,
}

impl ScaledCodec {
    pub fn new(scale: i64) -> Self {
        Self { scale }
    }

    pub fn scale(&self) -> i64 {
        self.scale
    }

    /// Scale a real value to its integer ledger representation.
    /// Lossy: `decode(encode(x))` is within `0.5 / scale` of `x`.
    pub fn encode(&self, real: f64) -> i64 {
        (real * self.scale as f64).round() as i64
    }

    /// Recover the real value from its ledger representation.
    pub fn decode(&self, scaled: i64) -> f64 {
        scaled as f64 / self.scale as f64
    }

    /// Decode a whole signature vector for presentation.
    pub fn decode_vector(&self, scaled: &[i64]) -> Vec<f64> {
        scaled.iter().map(|&v| self.decode(v)).collect()
    }
}

impl Default for ScaledCodec {
    fn default() -> Self {
        Self::new(DEFAULT_SCALING_FACTOR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_scales_and_rounds() {
        let codec = ScaledCodec::default();
        assert_eq!(codec.encode(0.5), 500_000);
        assert_eq!(codec.encode(-0.062438), -62_438);
        // Half-way cases round away from zero
        assert_eq!(codec.encode(0.0000005), 1);
        assert_eq!(codec.encode(-0.0000005), -1);
    }

    #[test]
    fn test_decode_inverts_scaling() {
        let codec = ScaledCodec::default();
        assert!((codec.decode(1_500_000) - 1.5).abs() < 1e-12);
        assert!((codec.decode(-95) - (-0.000095)).abs() < 1e-12);
    }

    #[test]
    fn test_round_trip_within_half_step() {
        let codec = ScaledCodec::default();
        let half_step = 0.5 / DEFAULT_SCALING_FACTOR as f64;
        for &x in &[0.0, 0.1234567, -3.999_999_4, 17.5, -0.000_000_4] {
            let back = codec.decode(codec.encode(x));
            assert!(
                (back - x).abs() <= half_step,
                "round trip drifted: {} -> {}",
                x,
                back
            );
        }
    }

    #[test]
    fn test_unit_scale_is_identity_on_integers() {
        let codec = ScaledCodec::new(1);
        assert_eq!(codec.encode(42.0), 42);
        assert_eq!(codec.decode(42), 42.0);
    }

    #[test]
    fn test_decode_vector() {
        let codec = ScaledCodec::default();
        let reals = codec.decode_vector(&[1_000_000, -500_000]);
        assert_eq!(reals, vec![1.0, -0.5]);
    }
}
