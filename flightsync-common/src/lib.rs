//! # FlightSync Common Library
//!
//! Shared code for the FlightSync engine and tooling:
//! - Canonical flight data model (identity, field catalogue, observations)
//! - Resolver output types
//! - Configuration loading
//! - Common error type

pub mod config;
pub mod error;
pub mod model;
pub mod resolution;

pub use error::{Error, Result};
pub use model::{
    CanonicalFlightData, FieldKind, FieldName, FieldObservation, FieldValue, FlightIdentity,
    FlightStatus, SourceContribution, SourceId,
};
pub use resolution::{
    ConflictField, RejectedContribution, ResolutionMethod, ResolutionResult, SourceScore,
    SourceValue,
};
