//! Canonical flight data model
//!
//! Every source adapter normalizes its provider payload into these types
//! before anything reaches the resolver. The field catalogue is closed:
//! a field name outside [`FieldName`] cannot be represented, and each
//! recognized field accepts exactly one [`FieldKind`] of value.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

// ============================================================================
// Flight identity
// ============================================================================

/// Identity of one scheduled flight
///
/// Carrier codes are normalized to upper case so that `aa` and `AA` name
/// the same flight. Deserialization goes through [`FlightIdentity::new`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "RawFlightIdentity")]
pub struct FlightIdentity {
    /// IATA or ICAO carrier code (e.g. "AA", "DAL")
    pub carrier: String,
    /// Flight number without the carrier prefix (e.g. "100")
    pub flight_number: String,
    /// Scheduled departure date at the origin airport
    pub scheduled_date: NaiveDate,
}

impl FlightIdentity {
    /// Build a validated identity
    ///
    /// # Errors
    /// `Error::InvalidInput` when the carrier is not 2-3 alphanumeric
    /// characters or the flight number is not 1-5 alphanumeric characters.
    pub fn new(
        carrier: impl Into<String>,
        flight_number: impl Into<String>,
        scheduled_date: NaiveDate,
    ) -> Result<Self> {
        let carrier = carrier.into().trim().to_ascii_uppercase();
        let flight_number = flight_number.into().trim().to_ascii_uppercase();

        if !(2..=3).contains(&carrier.len()) || !carrier.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(Error::InvalidInput(format!(
                "carrier code must be 2-3 alphanumeric characters, got '{}'",
                carrier
            )));
        }

        if !(1..=5).contains(&flight_number.len())
            || !flight_number.chars().all(|c| c.is_ascii_alphanumeric())
        {
            return Err(Error::InvalidInput(format!(
                "flight number must be 1-5 alphanumeric characters, got '{}'",
                flight_number
            )));
        }

        Ok(Self {
            carrier,
            flight_number,
            scheduled_date,
        })
    }
}

/// Unvalidated wire form of [`FlightIdentity`]
#[derive(Deserialize)]
struct RawFlightIdentity {
    carrier: String,
    flight_number: String,
    scheduled_date: NaiveDate,
}

impl TryFrom<RawFlightIdentity> for FlightIdentity {
    type Error = crate::Error;

    fn try_from(raw: RawFlightIdentity) -> Result<Self> {
        FlightIdentity::new(raw.carrier, raw.flight_number, raw.scheduled_date)
    }
}

impl fmt::Display for FlightIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}/{}", self.carrier, self.flight_number, self.scheduled_date)
    }
}

// ============================================================================
// Source identity
// ============================================================================

/// Identifier of the provider an observation came from
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceId(String);

impl SourceId {
    /// Source id stamped on records produced by the resolver
    pub const RESOLVED: &'static str = "resolved";

    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn resolved() -> Self {
        Self(Self::RESOLVED.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SourceId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

// ============================================================================
// Field catalogue
// ============================================================================

/// Operational status of a flight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FlightStatus {
    Scheduled,
    OnTime,
    Delayed,
    Boarding,
    Departed,
    EnRoute,
    Landed,
    Arrived,
    Cancelled,
    Diverted,
}

impl FlightStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlightStatus::Scheduled => "SCHEDULED",
            FlightStatus::OnTime => "ON_TIME",
            FlightStatus::Delayed => "DELAYED",
            FlightStatus::Boarding => "BOARDING",
            FlightStatus::Departed => "DEPARTED",
            FlightStatus::EnRoute => "EN_ROUTE",
            FlightStatus::Landed => "LANDED",
            FlightStatus::Arrived => "ARRIVED",
            FlightStatus::Cancelled => "CANCELLED",
            FlightStatus::Diverted => "DIVERTED",
        }
    }
}

impl fmt::Display for FlightStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FlightStatus {
    type Err = Error;

    /// Lenient parse for provider payloads ("on-time", "On Time", "ON_TIME")
    fn from_str(s: &str) -> Result<Self> {
        let normalized: String = s
            .trim()
            .chars()
            .map(|c| if c == '-' || c == ' ' { '_' } else { c.to_ascii_uppercase() })
            .collect();

        match normalized.as_str() {
            "SCHEDULED" => Ok(FlightStatus::Scheduled),
            "ON_TIME" => Ok(FlightStatus::OnTime),
            "DELAYED" => Ok(FlightStatus::Delayed),
            "BOARDING" => Ok(FlightStatus::Boarding),
            "DEPARTED" => Ok(FlightStatus::Departed),
            "EN_ROUTE" | "IN_AIR" => Ok(FlightStatus::EnRoute),
            "LANDED" => Ok(FlightStatus::Landed),
            "ARRIVED" => Ok(FlightStatus::Arrived),
            "CANCELLED" | "CANCELED" => Ok(FlightStatus::Cancelled),
            "DIVERTED" => Ok(FlightStatus::Diverted),
            _ => Err(Error::InvalidInput(format!("unknown flight status '{}'", s))),
        }
    }
}

/// Shape of value a field accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    Status,
    Time,
    Minutes,
    Text,
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldKind::Status => "status",
            FieldKind::Time => "time",
            FieldKind::Minutes => "minutes",
            FieldKind::Text => "text",
        };
        f.write_str(name)
    }
}

/// Recognized flight fields
///
/// Ordering follows declaration order and drives the field order of
/// resolved records and conflict lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldName {
    Status,
    ScheduledDeparture,
    EstimatedDeparture,
    ActualDeparture,
    ScheduledArrival,
    EstimatedArrival,
    ActualArrival,
    DepartureGate,
    ArrivalGate,
    DepartureTerminal,
    ArrivalTerminal,
    DelayMinutes,
    BaggageClaim,
    AircraftType,
}

impl FieldName {
    pub const ALL: [FieldName; 14] = [
        FieldName::Status,
        FieldName::ScheduledDeparture,
        FieldName::EstimatedDeparture,
        FieldName::ActualDeparture,
        FieldName::ScheduledArrival,
        FieldName::EstimatedArrival,
        FieldName::ActualArrival,
        FieldName::DepartureGate,
        FieldName::ArrivalGate,
        FieldName::DepartureTerminal,
        FieldName::ArrivalTerminal,
        FieldName::DelayMinutes,
        FieldName::BaggageClaim,
        FieldName::AircraftType,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldName::Status => "status",
            FieldName::ScheduledDeparture => "scheduled_departure",
            FieldName::EstimatedDeparture => "estimated_departure",
            FieldName::ActualDeparture => "actual_departure",
            FieldName::ScheduledArrival => "scheduled_arrival",
            FieldName::EstimatedArrival => "estimated_arrival",
            FieldName::ActualArrival => "actual_arrival",
            FieldName::DepartureGate => "departure_gate",
            FieldName::ArrivalGate => "arrival_gate",
            FieldName::DepartureTerminal => "departure_terminal",
            FieldName::ArrivalTerminal => "arrival_terminal",
            FieldName::DelayMinutes => "delay_minutes",
            FieldName::BaggageClaim => "baggage_claim",
            FieldName::AircraftType => "aircraft_type",
        }
    }

    /// Kind of value this field carries
    pub fn kind(&self) -> FieldKind {
        match self {
            FieldName::Status => FieldKind::Status,
            FieldName::ScheduledDeparture
            | FieldName::EstimatedDeparture
            | FieldName::ActualDeparture
            | FieldName::ScheduledArrival
            | FieldName::EstimatedArrival
            | FieldName::ActualArrival => FieldKind::Time,
            FieldName::DelayMinutes => FieldKind::Minutes,
            FieldName::DepartureGate
            | FieldName::ArrivalGate
            | FieldName::DepartureTerminal
            | FieldName::ArrivalTerminal
            | FieldName::BaggageClaim
            | FieldName::AircraftType => FieldKind::Text,
        }
    }

    /// Whether `value` is a well-typed observation for this field
    ///
    /// The review sentinel is never accepted as input.
    pub fn accepts(&self, value: &FieldValue) -> bool {
        value.kind() == Some(self.kind())
    }
}

impl fmt::Display for FieldName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        FieldName::ALL
            .iter()
            .copied()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| Error::InvalidInput(format!("unknown field '{}'", s)))
    }
}

/// Value of one field
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    Status(FlightStatus),
    Time(DateTime<Utc>),
    Minutes(i64),
    Text(String),
    /// Sentinel for a field whose sources could not be reconciled
    PendingReview,
}

impl FieldValue {
    pub fn kind(&self) -> Option<FieldKind> {
        match self {
            FieldValue::Status(_) => Some(FieldKind::Status),
            FieldValue::Time(_) => Some(FieldKind::Time),
            FieldValue::Minutes(_) => Some(FieldKind::Minutes),
            FieldValue::Text(_) => Some(FieldKind::Text),
            FieldValue::PendingReview => None,
        }
    }

    pub fn is_pending_review(&self) -> bool {
        matches!(self, FieldValue::PendingReview)
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Status(status) => write!(f, "{}", status),
            FieldValue::Time(at) => write!(f, "{}", at.to_rfc3339()),
            FieldValue::Minutes(minutes) => write!(f, "{}min", minutes),
            FieldValue::Text(text) => f.write_str(text),
            FieldValue::PendingReview => f.write_str("<pending review>"),
        }
    }
}

// ============================================================================
// Observations
// ============================================================================

/// One field as reported by one source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldObservation {
    pub value: FieldValue,
    /// Self-calibrated confidence (0.0-1.0)
    pub confidence: f64,
    /// Provider's own last-update time for this field
    pub observed_at: DateTime<Utc>,
}

impl FieldObservation {
    /// Create an observation, clamping confidence into [0.0, 1.0]
    pub fn new(value: FieldValue, confidence: f64, observed_at: DateTime<Utc>) -> Self {
        let confidence = if confidence.is_nan() {
            0.0
        } else {
            confidence.clamp(0.0, 1.0)
        };

        Self {
            value,
            confidence,
            observed_at,
        }
    }

    /// False for NaN, infinite or out-of-range confidence
    ///
    /// Only reachable through deserialization, since [`FieldObservation::new`]
    /// clamps.
    pub fn has_valid_confidence(&self) -> bool {
        self.confidence.is_finite() && (0.0..=1.0).contains(&self.confidence)
    }
}

/// Free-form provenance attached to an observation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceContribution {
    #[serde(default)]
    pub notes: Vec<String>,
    #[serde(default)]
    pub sub_scores: BTreeMap<String, f64>,
}

impl SourceContribution {
    pub fn is_empty(&self) -> bool {
        self.notes.is_empty() && self.sub_scores.is_empty()
    }
}

/// One provider's normalized view of a flight at a point in time
///
/// An observation with no fields is a valid "no data" answer and is
/// distinct from a fetch failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalFlightData {
    pub flight: FlightIdentity,
    pub source: SourceId,
    /// When the provider produced this view
    pub observed_at: DateTime<Utc>,
    #[serde(default)]
    pub fields: BTreeMap<FieldName, FieldObservation>,
    #[serde(default)]
    pub contributions: SourceContribution,
}

impl CanonicalFlightData {
    /// Empty observation ("no data")
    pub fn new(flight: FlightIdentity, source: impl Into<SourceId>, observed_at: DateTime<Utc>) -> Self {
        Self {
            flight,
            source: source.into(),
            observed_at,
            fields: BTreeMap::new(),
            contributions: SourceContribution::default(),
        }
    }

    /// Add a field stamped with the observation timestamp
    pub fn with_field(self, name: FieldName, value: FieldValue, confidence: f64) -> Self {
        let observed_at = self.observed_at;
        self.with_field_at(name, value, confidence, observed_at)
    }

    /// Add a field with its own update timestamp
    pub fn with_field_at(
        mut self,
        name: FieldName,
        value: FieldValue,
        confidence: f64,
        observed_at: DateTime<Utc>,
    ) -> Self {
        self.fields
            .insert(name, FieldObservation::new(value, confidence, observed_at));
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.contributions.notes.push(note.into());
        self
    }

    pub fn with_sub_score(mut self, name: impl Into<String>, score: f64) -> Self {
        self.contributions.sub_scores.insert(name.into(), score);
        self
    }

    pub fn field(&self, name: FieldName) -> Option<&FieldObservation> {
        self.fields.get(&name)
    }

    pub fn value(&self, name: FieldName) -> Option<&FieldValue> {
        self.fields.get(&name).map(|obs| &obs.value)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// Mean confidence across all fields (0.0 for an empty observation)
    pub fn mean_confidence(&self) -> f64 {
        if self.fields.is_empty() {
            return 0.0;
        }
        let sum: f64 = self.fields.values().map(|obs| obs.confidence).sum();
        sum / self.fields.len() as f64
    }
}

impl From<String> for SourceId {
    fn from(value: String) -> Self {
        Self(value)
    }
}
