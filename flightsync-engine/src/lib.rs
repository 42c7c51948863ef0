//! flightsync-engine library interface
//!
//! Aggregates flight status from independent providers and resolves their
//! disagreements into one canonical record per flight.

pub mod adapters;
pub mod config;
pub mod engine;
pub mod error;
pub mod fusion;
pub mod types;
pub mod validators;

pub use crate::adapters::{AdapterRegistry, AggregationReport, Aggregator};
pub use crate::engine::{FlightReport, FlightStatusEngine};
pub use crate::error::EngineError;
pub use crate::fusion::{ConflictResolver, ResolverConfig};
pub use crate::types::{FetchStatus, ResolveError, SourceAdapter, SourceError, SourceOutcome};
