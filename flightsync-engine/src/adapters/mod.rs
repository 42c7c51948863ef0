//! Source adapters and the parallel aggregator
//!
//! # Adapters
//! 1. **http_provider** - JSON-over-HTTP flight status APIs
//! 2. **fixture** - observations recorded in a local JSON file
//!
//! # Parallel Execution
//! The [`Aggregator`] spawns one task per registered adapter, each bounded
//! by that adapter's own deadline. Timeouts, errors and malformed payloads
//! are recorded as [`SourceOutcome`]s and excluded from the observation set;
//! they never abort aggregation and never cancel other fetches.

pub mod fixture;
pub mod http_provider;

pub use fixture::FixtureAdapter;
pub use http_provider::{HttpProviderAdapter, HttpProviderConfig};

use crate::config::resolve_api_key;
use crate::error::EngineError;
use crate::types::{FetchStatus, SourceAdapter, SourceError, SourceOutcome};
use flightsync_common::config::{ProviderKind, TomlConfig};
use flightsync_common::{CanonicalFlightData, Error, FlightIdentity, SourceId};
use futures::future::join_all;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::error::Elapsed;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

// ============================================================================
// Adapter Registry
// ============================================================================

/// A registered adapter and its fetch deadline
#[derive(Clone)]
pub struct RegisteredAdapter {
    pub adapter: Arc<dyn SourceAdapter>,
    pub timeout: Duration,
}

/// Immutable set of adapters the aggregator fans out to
///
/// Cloning is cheap and clones share the same adapters, so one registry
/// can serve any number of concurrent aggregations.
#[derive(Clone, Default)]
pub struct AdapterRegistry {
    entries: Arc<Vec<RegisteredAdapter>>,
}

impl AdapterRegistry {
    pub fn builder() -> AdapterRegistryBuilder {
        AdapterRegistryBuilder::default()
    }

    /// Build adapters for every enabled `[[providers]]` entry
    ///
    /// # Errors
    /// `Error::Config` for duplicate provider names or an adapter that
    /// cannot be constructed.
    pub fn from_config(config: &TomlConfig) -> Result<Self, Error> {
        let mut builder = Self::builder();

        for provider in &config.providers {
            provider.validate()?;

            if !provider.enabled {
                info!(provider = %provider.name, "Provider disabled, skipping");
                continue;
            }

            let adapter: Arc<dyn SourceAdapter> = match provider.kind {
                ProviderKind::Http => {
                    let endpoint = provider.endpoint.clone().ok_or_else(|| {
                        Error::Config(format!("provider '{}': missing endpoint", provider.name))
                    })?;
                    let adapter = HttpProviderAdapter::new(HttpProviderConfig {
                        name: provider.name.clone(),
                        endpoint,
                        api_key: resolve_api_key(provider),
                        requests_per_second: provider.requests_per_second,
                        base_confidence: provider.base_confidence,
                        // aggregator deadline fires first; this only bounds standalone use
                        request_timeout: provider.timeout() + Duration::from_secs(1),
                    })
                    .map_err(|e| Error::Config(format!("provider '{}': {}", provider.name, e)))?;
                    Arc::new(adapter)
                }
                ProviderKind::Fixture => {
                    let path = provider.path.clone().ok_or_else(|| {
                        Error::Config(format!("provider '{}': missing path", provider.name))
                    })?;
                    Arc::new(FixtureAdapter::new(provider.name.clone(), path))
                }
            };

            builder = builder.register(adapter, provider.timeout());
        }

        builder.build()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.adapter.name()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RegisteredAdapter> {
        self.entries.iter()
    }
}

/// Collects adapters before the registry is frozen
#[derive(Default)]
pub struct AdapterRegistryBuilder {
    entries: Vec<RegisteredAdapter>,
}

impl AdapterRegistryBuilder {
    pub fn register(mut self, adapter: Arc<dyn SourceAdapter>, timeout: Duration) -> Self {
        self.entries.push(RegisteredAdapter { adapter, timeout });
        self
    }

    /// Freeze the registry
    ///
    /// # Errors
    /// `Error::Config` for duplicate adapter names or a zero timeout.
    pub fn build(self) -> Result<AdapterRegistry, Error> {
        let mut seen = HashSet::new();
        for entry in &self.entries {
            let name = entry.adapter.name();
            if !seen.insert(name.to_string()) {
                return Err(Error::Config(format!("duplicate provider name '{}'", name)));
            }
            if entry.timeout.is_zero() {
                return Err(Error::Config(format!("provider '{}' has a zero timeout", name)));
            }
        }

        Ok(AdapterRegistry {
            entries: Arc::new(self.entries),
        })
    }
}

// ============================================================================
// Aggregator
// ============================================================================

/// Result of one fan-out
#[derive(Debug, Clone, Serialize)]
pub struct AggregationReport {
    pub run_id: Uuid,
    pub flight: FlightIdentity,
    /// Observations that passed validation, including zero-field "no data"
    pub observations: Vec<CanonicalFlightData>,
    /// One outcome per registered adapter, in registration order
    pub outcomes: Vec<SourceOutcome>,
}

/// Parallel fetch executor
pub struct Aggregator {
    registry: AdapterRegistry,
}

impl Aggregator {
    pub fn new(registry: AdapterRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &AdapterRegistry {
        &self.registry
    }

    /// Fetch `flight` from every registered adapter concurrently
    ///
    /// Dropping the returned future aborts the fetches still in flight.
    ///
    /// # Errors
    /// `EngineError::NoDataAvailable` when no adapter produced an
    /// observation; the error carries every source outcome.
    pub async fn collect(&self, flight: &FlightIdentity) -> Result<AggregationReport, EngineError> {
        let run_id = Uuid::new_v4();
        debug!(run_id = %run_id, flight = %flight, adapters = self.registry.len(), "Starting aggregation");

        let mut tasks = FetchTasks(Vec::with_capacity(self.registry.len()));
        for entry in self.registry.iter() {
            let adapter = Arc::clone(&entry.adapter);
            let name = adapter.name().to_string();
            let timeout = entry.timeout;
            let task_flight = flight.clone();

            let handle = tokio::spawn(async move {
                let started = Instant::now();
                let result = tokio::time::timeout(timeout, adapter.fetch(&task_flight)).await;
                (result, started.elapsed())
            });
            tasks.0.push((name, timeout, handle));
        }

        let results = join_all(tasks.0.iter_mut().map(|(_, _, handle)| handle)).await;

        let mut observations = Vec::new();
        let mut outcomes = Vec::with_capacity(self.registry.len());

        for ((name, timeout, _), joined) in tasks.0.iter().zip(results) {
            let name = name.as_str();
            let timeout = *timeout;
            let (status, elapsed) = match joined {
                Ok((Ok(Ok(observation)), elapsed)) => match check_observation(name, flight, &observation) {
                    Ok(()) => {
                        let status = if observation.is_empty() {
                            FetchStatus::NoData
                        } else {
                            FetchStatus::Succeeded {
                                fields: observation.field_count(),
                            }
                        };
                        observations.push(observation);
                        (status, elapsed)
                    }
                    Err(reason) => (FetchStatus::Failed { reason }, elapsed),
                },
                Ok((Ok(Err(e)), elapsed)) => (FetchStatus::Failed { reason: e.to_string() }, elapsed),
                Ok((Err(_), elapsed)) => (
                    FetchStatus::TimedOut {
                        after_ms: duration_ms(timeout),
                    },
                    elapsed,
                ),
                Err(e) => (
                    FetchStatus::Failed {
                        reason: format!("fetch task aborted: {}", e),
                    },
                    Duration::ZERO,
                ),
            };

            match &status {
                FetchStatus::Succeeded { fields } => {
                    debug!(source = %name, flight = %flight, fields, "Fetch successful")
                }
                FetchStatus::NoData => debug!(source = %name, flight = %flight, "Source has no data"),
                FetchStatus::TimedOut { after_ms } => warn!(
                    source = %name,
                    flight = %flight,
                    after_ms,
                    "Fetch timed out (per-source error isolation)"
                ),
                FetchStatus::Failed { reason } => warn!(
                    source = %name,
                    flight = %flight,
                    error = %reason,
                    "Fetch failed (per-source error isolation)"
                ),
            }

            outcomes.push(SourceOutcome {
                source: SourceId::new(name),
                status,
                elapsed_ms: duration_ms(elapsed),
            });
        }

        if observations.is_empty() {
            warn!(run_id = %run_id, flight = %flight, "No source produced an observation");
            return Err(EngineError::NoDataAvailable {
                flight: flight.clone(),
                outcomes,
            });
        }

        info!(
            run_id = %run_id,
            flight = %flight,
            observations = observations.len(),
            failed = outcomes.iter().filter(|o| !o.produced_observation()).count(),
            "Aggregation complete"
        );

        Ok(AggregationReport {
            run_id,
            flight: flight.clone(),
            observations,
            outcomes,
        })
    }
}

/// Reject observations that do not describe what was asked for
fn check_observation(
    adapter: &str,
    flight: &FlightIdentity,
    observation: &CanonicalFlightData,
) -> Result<(), String> {
    if &observation.flight != flight {
        return Err(format!(
            "malformed payload: observation is for {}, requested {}",
            observation.flight, flight
        ));
    }
    if observation.source.as_str() != adapter {
        return Err(format!(
            "malformed payload: observation claims source '{}'",
            observation.source
        ));
    }
    Ok(())
}

type FetchOutput = (Result<Result<CanonicalFlightData, SourceError>, Elapsed>, Duration);

/// Spawned fetches of one `collect` call, in registry order
///
/// Dropping it aborts every task still running, so a cancelled `collect`
/// leaves no fetch behind.
struct FetchTasks(Vec<(String, Duration, JoinHandle<FetchOutput>)>);

impl Drop for FetchTasks {
    fn drop(&mut self) {
        for (_, _, handle) in &self.0 {
            handle.abort();
        }
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

// ============================================================================
// Mock Adapter for Testing
// ============================================================================

#[cfg(test)]
pub mod mock {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};
    use chrono::{TimeZone, Utc};
    use flightsync_common::{FieldName, FieldValue, FlightStatus};

    pub enum MockBehavior {
        Answer(FlightStatus, f64),
        NoData,
        Fail,
        Hang(Duration),
        /// Sleep, then raise the flag once the fetch runs to completion
        Finish(Duration, Arc<AtomicBool>),
        Panic,
        WrongFlight,
    }

    /// Mock adapter for testing
    pub struct MockAdapter {
        pub name: &'static str,
        pub behavior: MockBehavior,
    }

    impl MockAdapter {
        pub fn new(name: &'static str, behavior: MockBehavior) -> Arc<dyn SourceAdapter> {
            Arc::new(Self { name, behavior })
        }
    }

    #[async_trait]
    impl SourceAdapter for MockAdapter {
        fn name(&self) -> &str {
            self.name
        }

        async fn fetch(&self, flight: &FlightIdentity) -> Result<CanonicalFlightData, SourceError> {
            let at = Utc.with_ymd_and_hms(2026, 10, 18, 9, 0, 0).unwrap();
            let empty = CanonicalFlightData::new(flight.clone(), self.name, at);
            match &self.behavior {
                MockBehavior::Answer(status, confidence) => {
                    Ok(empty.with_field(FieldName::Status, FieldValue::Status(*status), *confidence))
                }
                MockBehavior::NoData => Ok(empty),
                MockBehavior::Fail => Err(SourceError::Network("connection refused".to_string())),
                MockBehavior::Hang(delay) => {
                    tokio::time::sleep(*delay).await;
                    Ok(empty)
                }
                MockBehavior::Finish(delay, finished) => {
                    tokio::time::sleep(*delay).await;
                    finished.store(true, Ordering::SeqCst);
                    Ok(empty)
                }
                MockBehavior::Panic => panic!("mock adapter panicked"),
                MockBehavior::WrongFlight => {
                    let other = FlightIdentity::new("ZZ", "1", flight.scheduled_date)
                        .map_err(|e| SourceError::Internal(e.to_string()))?;
                    Ok(CanonicalFlightData::new(other, self.name, at))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mock::{MockAdapter, MockBehavior};
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use chrono::NaiveDate;
    use flightsync_common::FlightStatus;

    fn flight() -> FlightIdentity {
        FlightIdentity::new("AA", "100", NaiveDate::from_ymd_opt(2026, 10, 18).unwrap()).unwrap()
    }

    const DEADLINE: Duration = Duration::from_millis(200);

    #[test]
    fn test_duplicate_names_rejected() {
        let result = AdapterRegistry::builder()
            .register(MockAdapter::new("alpha", MockBehavior::NoData), DEADLINE)
            .register(MockAdapter::new("alpha", MockBehavior::Fail), DEADLINE)
            .build();
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let result = AdapterRegistry::builder()
            .register(MockAdapter::new("alpha", MockBehavior::NoData), Duration::ZERO)
            .build();
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_collect_all_success() {
        let registry = AdapterRegistry::builder()
            .register(MockAdapter::new("alpha", MockBehavior::Answer(FlightStatus::OnTime, 0.9)), DEADLINE)
            .register(MockAdapter::new("bravo", MockBehavior::Answer(FlightStatus::OnTime, 0.7)), DEADLINE)
            .build()
            .unwrap();

        let report = Aggregator::new(registry).collect(&flight()).await.unwrap();
        assert_eq!(report.observations.len(), 2);
        assert_eq!(report.outcomes.len(), 2);
        assert!(report.outcomes.iter().all(|o| o.status == FetchStatus::Succeeded { fields: 1 }));
    }

    #[tokio::test]
    async fn test_failures_are_isolated() {
        let registry = AdapterRegistry::builder()
            .register(MockAdapter::new("alpha", MockBehavior::Answer(FlightStatus::Delayed, 0.8)), DEADLINE)
            .register(MockAdapter::new("bravo", MockBehavior::Fail), DEADLINE)
            .register(MockAdapter::new("charlie", MockBehavior::Hang(Duration::from_secs(5))), DEADLINE)
            .register(MockAdapter::new("delta", MockBehavior::Panic), DEADLINE)
            .register(MockAdapter::new("echo", MockBehavior::WrongFlight), DEADLINE)
            .build()
            .unwrap();

        let report = Aggregator::new(registry).collect(&flight()).await.unwrap();
        assert_eq!(report.observations.len(), 1);
        assert_eq!(report.observations[0].source.as_str(), "alpha");

        let status = |name: &str| {
            report
                .outcomes
                .iter()
                .find(|o| o.source.as_str() == name)
                .map(|o| o.status.clone())
                .unwrap()
        };
        assert!(matches!(status("bravo"), FetchStatus::Failed { .. }));
        assert_eq!(status("charlie"), FetchStatus::TimedOut { after_ms: 200 });
        assert!(matches!(status("delta"), FetchStatus::Failed { .. }));
        assert!(matches!(status("echo"), FetchStatus::Failed { reason } if reason.contains("malformed")));
    }

    #[tokio::test]
    async fn test_no_data_is_an_observation() {
        let registry = AdapterRegistry::builder()
            .register(MockAdapter::new("alpha", MockBehavior::NoData), DEADLINE)
            .register(MockAdapter::new("bravo", MockBehavior::Fail), DEADLINE)
            .build()
            .unwrap();

        let report = Aggregator::new(registry).collect(&flight()).await.unwrap();
        assert_eq!(report.observations.len(), 1);
        assert!(report.observations[0].is_empty());
        assert_eq!(report.outcomes[0].status, FetchStatus::NoData);
    }

    #[tokio::test]
    async fn test_all_failed_is_no_data_available() {
        let registry = AdapterRegistry::builder()
            .register(MockAdapter::new("alpha", MockBehavior::Fail), DEADLINE)
            .register(MockAdapter::new("bravo", MockBehavior::Hang(Duration::from_secs(5))), DEADLINE)
            .build()
            .unwrap();

        match Aggregator::new(registry).collect(&flight()).await {
            Err(EngineError::NoDataAvailable { outcomes, .. }) => assert_eq!(outcomes.len(), 2),
            other => panic!("expected NoDataAvailable, got {:?}", other.map(|r| r.observations.len())),
        }
    }

    #[tokio::test]
    async fn test_empty_registry_is_no_data_available() {
        let result = Aggregator::new(AdapterRegistry::default()).collect(&flight()).await;
        assert!(matches!(result, Err(EngineError::NoDataAvailable { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetches_run_concurrently() {
        let registry = AdapterRegistry::builder()
            .register(MockAdapter::new("alpha", MockBehavior::Hang(Duration::from_millis(200))), Duration::from_secs(2))
            .register(MockAdapter::new("bravo", MockBehavior::Hang(Duration::from_millis(200))), Duration::from_secs(2))
            .register(MockAdapter::new("charlie", MockBehavior::Hang(Duration::from_millis(200))), Duration::from_secs(2))
            .build()
            .unwrap();

        let started = Instant::now();
        let report = Aggregator::new(registry).collect(&flight()).await.unwrap();
        assert_eq!(report.observations.len(), 3);
        // Paused clock: sequential fetches would take 600ms
        assert!(started.elapsed() < Duration::from_millis(400));
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_collect_aborts_fetches() {
        let finished = Arc::new(AtomicBool::new(false));
        let registry = AdapterRegistry::builder()
            .register(
                MockAdapter::new("alpha", MockBehavior::Finish(Duration::from_millis(100), Arc::clone(&finished))),
                Duration::from_secs(2),
            )
            .build()
            .unwrap();
        let aggregator = Aggregator::new(registry);

        let cut_short = tokio::time::timeout(Duration::from_millis(20), aggregator.collect(&flight())).await;
        assert!(cut_short.is_err());

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(!finished.load(Ordering::SeqCst));
    }
}
