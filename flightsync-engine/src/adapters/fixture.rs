//! Fixture adapter
//!
//! Serves observations recorded in a JSON file (an array of
//! `CanonicalFlightData`). The file is read on every fetch so recordings
//! can be swapped while the engine runs.

use crate::types::{SourceAdapter, SourceError};
use async_trait::async_trait;
use chrono::Utc;
use flightsync_common::{CanonicalFlightData, FlightIdentity, SourceId};
use std::path::{Path, PathBuf};
use tracing::debug;

pub struct FixtureAdapter {
    name: String,
    path: PathBuf,
}

impl FixtureAdapter {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl SourceAdapter for FixtureAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    /// Latest recorded observation for `flight`, re-stamped with this
    /// adapter's name; an empty observation if none is recorded
    async fn fetch(&self, flight: &FlightIdentity) -> Result<CanonicalFlightData, SourceError> {
        let content = tokio::fs::read_to_string(&self.path).await?;
        let recorded: Vec<CanonicalFlightData> = serde_json::from_str(&content)
            .map_err(|e| SourceError::Malformed(format!("{}: {}", self.path.display(), e)))?;

        let latest = recorded
            .into_iter()
            .filter(|obs| &obs.flight == flight)
            .max_by_key(|obs| obs.observed_at);

        match latest {
            Some(mut observation) => {
                observation.source = SourceId::new(self.name.as_str());
                debug!(
                    source = %self.name,
                    flight = %flight,
                    fields = observation.field_count(),
                    "Fixture observation loaded"
                );
                Ok(observation)
            }
            None => Ok(CanonicalFlightData::new(flight.clone(), self.name.as_str(), Utc::now())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate, TimeZone};
    use flightsync_common::{FieldName, FieldValue, FlightStatus};
    use std::io::Write;

    fn flight(number: &str) -> FlightIdentity {
        FlightIdentity::new("AA", number, NaiveDate::from_ymd_opt(2026, 10, 18).unwrap()).unwrap()
    }

    fn write_fixture(observations: &[CanonicalFlightData]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(serde_json::to_string(observations).unwrap().as_bytes())
            .unwrap();
        file
    }

    #[tokio::test]
    async fn test_latest_matching_observation_returned() {
        let t0 = Utc.with_ymd_and_hms(2026, 10, 18, 9, 0, 0).unwrap();
        let file = write_fixture(&[
            CanonicalFlightData::new(flight("100"), "recorded", t0)
                .with_field(FieldName::Status, FieldValue::Status(FlightStatus::OnTime), 0.9),
            CanonicalFlightData::new(flight("100"), "recorded", t0 + Duration::minutes(5))
                .with_field(FieldName::Status, FieldValue::Status(FlightStatus::Delayed), 0.9),
            CanonicalFlightData::new(flight("200"), "recorded", t0 + Duration::minutes(9)),
        ]);

        let adapter = FixtureAdapter::new("replay", file.path());
        let obs = adapter.fetch(&flight("100")).await.unwrap();

        assert_eq!(obs.source.as_str(), "replay");
        assert_eq!(obs.value(FieldName::Status), Some(&FieldValue::Status(FlightStatus::Delayed)));
    }

    #[tokio::test]
    async fn test_unknown_flight_is_no_data() {
        let file = write_fixture(&[]);
        let adapter = FixtureAdapter::new("replay", file.path());

        let obs = adapter.fetch(&flight("100")).await.unwrap();
        assert!(obs.is_empty());
        assert_eq!(obs.flight, flight("100"));
    }

    #[tokio::test]
    async fn test_lowercase_recorded_carrier_matches() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(
            br#"[{
                "flight": {"carrier": "aa", "flight_number": "100", "scheduled_date": "2026-10-18"},
                "source": "recorded",
                "observed_at": "2026-10-18T09:00:00Z",
                "fields": {
                    "status": {
                        "value": {"kind": "status", "value": "DELAYED"},
                        "confidence": 0.9,
                        "observed_at": "2026-10-18T09:00:00Z"
                    }
                }
            }]"#,
        )
        .unwrap();
        let adapter = FixtureAdapter::new("replay", file.path());

        let obs = adapter.fetch(&flight("100")).await.unwrap();
        assert_eq!(obs.value(FieldName::Status), Some(&FieldValue::Status(FlightStatus::Delayed)));
    }

    #[tokio::test]
    async fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let adapter = FixtureAdapter::new("replay", dir.path().join("missing.json"));

        assert!(matches!(adapter.fetch(&flight("100")).await, Err(SourceError::Io(_))));
    }

    #[tokio::test]
    async fn test_garbage_file_is_malformed() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"{ not json").unwrap();
        let adapter = FixtureAdapter::new("replay", file.path());

        assert!(matches!(adapter.fetch(&flight("100")).await, Err(SourceError::Malformed(_))));
    }
}
