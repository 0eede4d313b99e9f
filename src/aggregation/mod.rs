pub mod engine;
pub mod round;

pub use engine::AggregationRoundEngine;
pub use round::{federated_mean, RoundError, RoundOutcome, RoundResult, RoundStage};
