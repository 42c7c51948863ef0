//! Core traits and types for the aggregation pipeline
//!
//! # Architecture
//! - **Source adapters:** fetch one provider's view of a flight ([`SourceAdapter`])
//! - **Aggregator:** fan out to every adapter, isolate failures ([`SourceOutcome`])
//! - **Resolver:** merge observations field by field ([`ResolveError`])

use async_trait::async_trait;
use flightsync_common::{CanonicalFlightData, FlightIdentity, SourceId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Source Adapter Trait
// ============================================================================

/// One flight data provider
///
/// Implementations stamp every field with a self-calibrated confidence and
/// the provider's own update time, omit fields they know nothing about, and
/// return an observation with zero fields (not an error) when the provider
/// has no record of the flight.
///
/// # Example
/// ```rust,ignore
/// #[async_trait]
/// impl SourceAdapter for MyProvider {
///     fn name(&self) -> &str {
///         "my-provider"
///     }
///
///     async fn fetch(&self, flight: &FlightIdentity) -> Result<CanonicalFlightData, SourceError> {
///         let observed_at = Utc::now();
///         Ok(CanonicalFlightData::new(flight.clone(), self.name(), observed_at)
///             .with_field(FieldName::Status, FieldValue::Status(FlightStatus::OnTime), 0.9))
///     }
/// }
/// ```
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Provider name, used as the observation source id
    fn name(&self) -> &str;

    /// Fetch the provider's current view of `flight`
    ///
    /// # Errors
    /// Any transport, protocol or payload failure. A flight the provider
    /// does not know is `Ok` with an empty observation.
    async fn fetch(&self, flight: &FlightIdentity) -> Result<CanonicalFlightData, SourceError>;
}

/// Source adapter errors
#[derive(Debug, Error)]
pub enum SourceError {
    /// I/O error (fixture file read)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Network communication error
    #[error("Network error: {0}")]
    Network(String),

    /// Provider answered with a non-success HTTP status
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// Provider rejected our credentials
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Payload could not be normalized
    #[error("Malformed payload: {0}")]
    Malformed(String),

    /// Provider is not usable right now
    #[error("Source unavailable: {0}")]
    Unavailable(String),

    /// Internal processing error
    #[error("Internal error: {0}")]
    Internal(String),
}

// ============================================================================
// Source Outcomes
// ============================================================================

/// What happened when one adapter was asked for a flight
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FetchStatus {
    /// Observation with at least one field
    Succeeded { fields: usize },
    /// Provider answered but knows nothing about the flight
    NoData,
    /// Deadline passed before the provider answered
    TimedOut { after_ms: u64 },
    /// Transport error, provider error or malformed payload
    Failed { reason: String },
}

/// Per-adapter report produced by the aggregator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceOutcome {
    pub source: SourceId,
    #[serde(flatten)]
    pub status: FetchStatus,
    pub elapsed_ms: u64,
}

impl SourceOutcome {
    /// True when the adapter produced an observation (including "no data")
    pub fn produced_observation(&self) -> bool {
        matches!(
            self.status,
            FetchStatus::Succeeded { .. } | FetchStatus::NoData
        )
    }
}

// ============================================================================
// Resolver Errors
// ============================================================================

/// Resolver input-contract violations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResolveError {
    /// Resolver requires at least one observation
    #[error("cannot resolve an empty set of observations")]
    EmptyInput,

    /// Observations describe different flights
    #[error("observation from '{source_id}' is for {found}, expected {expected}")]
    MixedFlights {
        expected: FlightIdentity,
        found: FlightIdentity,
        source_id: SourceId,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_serializes_flat() {
        let outcome = SourceOutcome {
            source: SourceId::new("alpha"),
            status: FetchStatus::TimedOut { after_ms: 250 },
            elapsed_ms: 251,
        };

        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["source"], "alpha");
        assert_eq!(json["status"], "timed_out");
        assert_eq!(json["after_ms"], 250);
        assert!(!outcome.produced_observation());
    }

    #[test]
    fn test_no_data_counts_as_observation() {
        let outcome = SourceOutcome {
            source: SourceId::new("alpha"),
            status: FetchStatus::NoData,
            elapsed_ms: 3,
        };
        assert!(outcome.produced_observation());
    }
}
