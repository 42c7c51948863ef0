//! Engine facade: aggregate, then resolve

use crate::adapters::{AdapterRegistry, Aggregator};
use crate::error::EngineError;
use crate::fusion::{ConflictResolver, ResolverConfig};
use crate::types::SourceOutcome;
use flightsync_common::config::TomlConfig;
use flightsync_common::{CanonicalFlightData, FlightIdentity, ResolutionResult};
use serde::Serialize;
use uuid::Uuid;

/// Everything known about one flight after a resolve run
#[derive(Debug, Clone, Serialize)]
pub struct FlightReport {
    pub run_id: Uuid,
    pub flight: FlightIdentity,
    pub resolution: ResolutionResult,
    /// Per-adapter outcomes (empty for offline resolution)
    pub outcomes: Vec<SourceOutcome>,
}

pub struct FlightStatusEngine {
    aggregator: Aggregator,
    resolver: ConflictResolver,
}

impl FlightStatusEngine {
    pub fn new(registry: AdapterRegistry, config: ResolverConfig) -> Self {
        Self {
            aggregator: Aggregator::new(registry),
            resolver: ConflictResolver::new(config),
        }
    }

    /// Build adapters and resolver settings from bootstrap config
    pub fn from_config(config: &TomlConfig) -> Result<Self, EngineError> {
        let registry = AdapterRegistry::from_config(config)?;
        Ok(Self::new(registry, ResolverConfig::from(&config.resolver)))
    }

    pub fn registry(&self) -> &AdapterRegistry {
        self.aggregator.registry()
    }

    /// Fetch `flight` from every provider and resolve the answers
    ///
    /// # Errors
    /// * `EngineError::NoDataAvailable` - no provider produced an observation
    pub async fn resolve_flight(&self, flight: &FlightIdentity) -> Result<FlightReport, EngineError> {
        let report = self.aggregator.collect(flight).await?;
        let resolution = self.resolver.resolve(&report.observations)?;

        Ok(FlightReport {
            run_id: report.run_id,
            flight: report.flight,
            resolution,
            outcomes: report.outcomes,
        })
    }

    /// Resolve observations obtained elsewhere (e.g. recorded files)
    pub fn resolve_observations(&self, observations: &[CanonicalFlightData]) -> Result<FlightReport, EngineError> {
        let resolution = self.resolver.resolve(observations)?;

        Ok(FlightReport {
            run_id: Uuid::new_v4(),
            flight: resolution.resolved_data.flight.clone(),
            resolution,
            outcomes: Vec::new(),
        })
    }
}
