//! Engine error types

use crate::types::{ResolveError, SourceOutcome};
use flightsync_common::FlightIdentity;
use thiserror::Error;

/// Errors crossing the engine boundary
#[derive(Debug, Error)]
pub enum EngineError {
    /// Every adapter failed or timed out
    #[error("no data available for {flight}: {} source(s) failed", .outcomes.len())]
    NoDataAvailable {
        flight: FlightIdentity,
        outcomes: Vec<SourceOutcome>,
    },

    /// Resolver input contract violated
    #[error("resolve failed: {0}")]
    Resolve(#[from] ResolveError),

    /// Engine could not be built from configuration
    #[error(transparent)]
    Config(#[from] flightsync_common::Error),
}
