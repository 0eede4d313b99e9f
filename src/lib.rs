//! # FedGrid Aggregator
//!
//! Federated-learning model aggregation with a distributed ledger as
//! the state of record. Prosumers post integer-scaled signatures of
//! their local models to a contract; the aggregation round engine reads
//! them, computes the federated mean and commits the new global
//! signature back with confirmation and verification.
//!
//! Module map:
//! - [`signature`] — signature extraction and the fixed-point codec
//! - [`ledger`] — gateway trait, JSON-RPC implementation, signing
//! - [`aggregation`] — the round engine and round domain types
//! - [`submission`] — participant-side signature posting
//! - [`reporting`] — read-only HTTP surface and synthetic dashboard data
//! - [`core`] — configuration, logging, health

pub mod aggregation;
pub mod core;
pub mod error;
pub mod ledger;
pub mod reporting;
pub mod signature;
pub mod submission;

pub use crate::aggregation::{AggregationRoundEngine, RoundOutcome, RoundResult};
pub use crate::core::Config;
pub use crate::error::{ConfigError, ExtractError, LedgerError};
pub use crate::ledger::{HttpLedgerGateway, LedgerGateway};
pub use crate::signature::{RawLocalModel, ScaledCodec, SignatureExtractor};
