//! Test Helper Utilities
//!
//! Shared observation builders and adapters for flightsync-engine tests

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use flightsync_common::{CanonicalFlightData, FieldName, FieldValue, FlightIdentity, FlightStatus};
use flightsync_engine::{SourceAdapter, SourceError};
use std::sync::Arc;

pub fn flight() -> FlightIdentity {
    FlightIdentity::new("AA", "100", NaiveDate::from_ymd_opt(2026, 10, 18).unwrap()).unwrap()
}

/// Base instant T; `at(5)` is T+5 minutes
pub fn at(minutes: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 18, 9, 0, 0).unwrap() + Duration::minutes(minutes)
}

pub fn observation(source: &str, minutes: i64) -> CanonicalFlightData {
    CanonicalFlightData::new(flight(), source, at(minutes))
}

/// Observation carrying only a status field
pub fn status_observation(source: &str, status: FlightStatus, confidence: f64, minutes: i64) -> CanonicalFlightData {
    observation(source, minutes).with_field(FieldName::Status, FieldValue::Status(status), confidence)
}

pub fn status(value: FlightStatus) -> FieldValue {
    FieldValue::Status(value)
}

/// Adapter returning a canned observation after an optional delay
pub struct StaticAdapter {
    name: String,
    answer: Result<CanonicalFlightData, String>,
    delay: std::time::Duration,
}

impl StaticAdapter {
    pub fn answering(observation: CanonicalFlightData) -> Arc<dyn SourceAdapter> {
        Arc::new(Self {
            name: observation.source.to_string(),
            answer: Ok(observation),
            delay: std::time::Duration::ZERO,
        })
    }

    pub fn slow(observation: CanonicalFlightData, delay: std::time::Duration) -> Arc<dyn SourceAdapter> {
        Arc::new(Self {
            name: observation.source.to_string(),
            answer: Ok(observation),
            delay,
        })
    }

    pub fn failing(name: &str, reason: &str) -> Arc<dyn SourceAdapter> {
        Arc::new(Self {
            name: name.to_string(),
            answer: Err(reason.to_string()),
            delay: std::time::Duration::ZERO,
        })
    }
}

#[async_trait]
impl SourceAdapter for StaticAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self, _flight: &FlightIdentity) -> Result<CanonicalFlightData, SourceError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.answer
            .clone()
            .map_err(SourceError::Unavailable)
    }
}
