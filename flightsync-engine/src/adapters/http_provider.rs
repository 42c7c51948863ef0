// HTTP Provider Adapter
//
// Generic client for JSON flight status APIs exposing
// GET {endpoint}/flights/{carrier}/{flight_number}/{date}
//
// Expected payload:
// {
//   "carrier": "AA", "flight_number": "100", "scheduled_date": "2026-10-18",
//   "updated_at": "2026-10-18T09:00:00Z",
//   "fields": { "status": { "value": "DELAYED", "confidence": 0.9, "updated_at": "..." } },
//   "notes": ["..."], "sub_scores": { "punctuality": 0.7 }
// }
//
// 404 means the provider does not know the flight (no data, not an error).

use crate::types::{SourceAdapter, SourceError};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use flightsync_common::{
    CanonicalFlightData, FieldKind, FieldName, FieldObservation, FieldValue, FlightIdentity,
    FlightStatus,
};
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use reqwest::StatusCode;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::num::NonZeroU32;
use std::time::Duration;
use tracing::debug;

/// Header carrying the provider API key
pub const API_KEY_HEADER: &str = "x-api-key";

const USER_AGENT: &str = concat!("flightsync/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Deserialize)]
struct ProviderPayload {
    carrier: String,
    flight_number: String,
    scheduled_date: NaiveDate,
    updated_at: DateTime<Utc>,
    #[serde(default)]
    fields: BTreeMap<String, ProviderField>,
    #[serde(default)]
    notes: Vec<String>,
    #[serde(default)]
    sub_scores: BTreeMap<String, f64>,
}

#[derive(Debug, Deserialize)]
struct ProviderField {
    value: serde_json::Value,
    #[serde(default)]
    confidence: Option<f64>,
    #[serde(default)]
    updated_at: Option<DateTime<Utc>>,
}

/// Settings for one HTTP provider
#[derive(Debug, Clone)]
pub struct HttpProviderConfig {
    pub name: String,
    pub endpoint: String,
    pub api_key: Option<String>,
    pub requests_per_second: Option<u32>,
    /// Confidence for fields whose payload carries none
    pub base_confidence: f64,
    /// Transport-level timeout (the aggregator applies its own deadline too)
    pub request_timeout: Duration,
}

pub struct HttpProviderAdapter {
    name: String,
    endpoint: String,
    api_key: Option<String>,
    base_confidence: f64,
    client: reqwest::Client,
    rate_limiter: Option<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>,
}

impl HttpProviderAdapter {
    pub fn new(config: HttpProviderConfig) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| SourceError::Internal(format!("failed to build HTTP client: {}", e)))?;

        let rate_limiter = config
            .requests_per_second
            .and_then(NonZeroU32::new)
            .map(|rps| RateLimiter::direct(Quota::per_second(rps)));

        Ok(Self {
            name: config.name,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            api_key: config.api_key,
            base_confidence: config.base_confidence,
            client,
            rate_limiter,
        })
    }

    fn flight_url(&self, flight: &FlightIdentity) -> String {
        format!(
            "{}/flights/{}/{}/{}",
            self.endpoint, flight.carrier, flight.flight_number, flight.scheduled_date
        )
    }
}

#[async_trait]
impl SourceAdapter for HttpProviderAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self, flight: &FlightIdentity) -> Result<CanonicalFlightData, SourceError> {
        if let Some(limiter) = &self.rate_limiter {
            limiter.until_ready().await;
        }

        let url = self.flight_url(flight);
        debug!(source = %self.name, url = %url, "Fetching flight status");

        let mut request = self.client.get(&url);
        if let Some(key) = &self.api_key {
            request = request.header(API_KEY_HEADER, key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| SourceError::Network(e.to_string()))?;

        let status = response.status();
        match status {
            StatusCode::NOT_FOUND => {
                debug!(source = %self.name, flight = %flight, "Provider has no record of flight");
                return Ok(CanonicalFlightData::new(flight.clone(), self.name.as_str(), Utc::now()));
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(SourceError::Unauthorized(format!(
                    "provider rejected credentials ({})",
                    status
                )));
            }
            StatusCode::TOO_MANY_REQUESTS => {
                return Err(SourceError::Unavailable("rate limited by provider".to_string()));
            }
            _ if !status.is_success() => {
                let message = response.text().await.unwrap_or_default();
                return Err(SourceError::Http {
                    status: status.as_u16(),
                    message: truncate(&message, 200),
                });
            }
            _ => {}
        }

        let body = response
            .text()
            .await
            .map_err(|e| SourceError::Network(e.to_string()))?;

        parse_payload(&self.name, flight, &body, self.base_confidence)
    }
}

/// Normalize a provider payload into an observation
///
/// # Errors
/// `SourceError::Malformed` if the document does not parse, describes a
/// different flight, names an unknown field, or carries a value that does
/// not fit its field.
pub fn parse_payload(
    source: &str,
    flight: &FlightIdentity,
    body: &str,
    base_confidence: f64,
) -> Result<CanonicalFlightData, SourceError> {
    let payload: ProviderPayload =
        serde_json::from_str(body).map_err(|e| SourceError::Malformed(e.to_string()))?;

    let identity = FlightIdentity::new(&payload.carrier, &payload.flight_number, payload.scheduled_date)
        .map_err(|e| SourceError::Malformed(e.to_string()))?;
    if &identity != flight {
        return Err(SourceError::Malformed(format!(
            "payload is for {}, requested {}",
            identity, flight
        )));
    }

    let mut observation = CanonicalFlightData::new(identity, source, payload.updated_at);

    for (raw_name, field) in payload.fields {
        let name: FieldName = raw_name
            .parse()
            .map_err(|_| SourceError::Malformed(format!("unknown field '{}'", raw_name)))?;

        if field.value.is_null() {
            continue;
        }

        let value = convert_value(name, &field.value)?;
        let confidence = field.confidence.unwrap_or(base_confidence);
        if !confidence.is_finite() || !(0.0..=1.0).contains(&confidence) {
            return Err(SourceError::Malformed(format!(
                "field '{}' confidence {} outside [0, 1]",
                name, confidence
            )));
        }

        let observed_at = field.updated_at.unwrap_or(payload.updated_at);
        observation
            .fields
            .insert(name, FieldObservation::new(value, confidence, observed_at));
    }

    observation.contributions.notes = payload.notes;
    observation.contributions.sub_scores = payload.sub_scores;

    Ok(observation)
}

fn convert_value(name: FieldName, raw: &serde_json::Value) -> Result<FieldValue, SourceError> {
    let mismatch = || SourceError::Malformed(format!("field '{}' expects a {} value, got {}", name, name.kind(), raw));

    match name.kind() {
        FieldKind::Status => {
            let text = raw.as_str().ok_or_else(mismatch)?;
            text.parse::<FlightStatus>()
                .map(FieldValue::Status)
                .map_err(|e| SourceError::Malformed(e.to_string()))
        }
        FieldKind::Time => {
            let text = raw.as_str().ok_or_else(mismatch)?;
            DateTime::parse_from_rfc3339(text)
                .map(|at| FieldValue::Time(at.with_timezone(&Utc)))
                .map_err(|e| SourceError::Malformed(format!("field '{}': {}", name, e)))
        }
        FieldKind::Minutes => raw.as_i64().map(FieldValue::Minutes).ok_or_else(mismatch),
        FieldKind::Text => {
            let text = raw.as_str().map(str::trim).ok_or_else(mismatch)?;
            if text.is_empty() {
                return Err(mismatch());
            }
            Ok(FieldValue::Text(text.to_string()))
        }
    }
}

fn truncate(message: &str, max_chars: usize) -> String {
    message.chars().take(max_chars).collect()
}
