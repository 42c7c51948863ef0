//! Field value extraction
//!
//! Flattens a set of observations into per-field contribution lists,
//! dropping malformed contributions before any resolution happens.

use flightsync_common::{
    CanonicalFlightData, FieldName, FieldObservation, RejectedContribution, SourceValue,
};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use tracing::debug;

/// Valid contributions grouped by field, plus everything that was dropped
#[derive(Debug, Clone, Default)]
pub struct ExtractedFields {
    /// Contributions per field, each list in canonical order
    pub by_field: BTreeMap<FieldName, Vec<SourceValue>>,
    /// Dropped contributions, sorted by source then field
    pub rejected: Vec<RejectedContribution>,
}

/// Collect every `(source, value, confidence, timestamp)` tuple per field
///
/// Output depends only on the set of observations, never on their order.
pub fn extract_field_values(observations: &[CanonicalFlightData]) -> ExtractedFields {
    let mut extracted = ExtractedFields::default();

    for observation in observations {
        for (field, contribution) in &observation.fields {
            match check_contribution(*field, contribution) {
                Ok(()) => extracted
                    .by_field
                    .entry(*field)
                    .or_default()
                    .push(SourceValue {
                        source: observation.source.clone(),
                        value: contribution.value.clone(),
                        confidence: contribution.confidence,
                        observed_at: contribution.observed_at,
                    }),
                Err(reason) => {
                    debug!(
                        source = %observation.source,
                        field = %field,
                        reason = %reason,
                        "Dropping malformed field contribution"
                    );
                    extracted.rejected.push(RejectedContribution {
                        source: observation.source.clone(),
                        field: *field,
                        reason,
                    });
                }
            }
        }
    }

    for values in extracted.by_field.values_mut() {
        values.sort_by(canonical_order);
    }
    extracted.rejected.sort_by(|a, b| {
        a.source
            .cmp(&b.source)
            .then(a.field.cmp(&b.field))
            .then_with(|| a.reason.cmp(&b.reason))
    });

    extracted
}

/// Validate one contribution against the field catalogue
///
/// # Errors
/// Human-readable reason when the value has the wrong kind, is the review
/// sentinel, or carries a confidence outside [0, 1].
pub fn check_contribution(field: FieldName, contribution: &FieldObservation) -> Result<(), String> {
    if contribution.value.is_pending_review() {
        return Err("pending-review sentinel is not an observation".to_string());
    }

    if !field.accepts(&contribution.value) {
        return Err(format!(
            "expected {} value, got {}",
            field.kind(),
            contribution
                .value
                .kind()
                .map(|kind| kind.to_string())
                .unwrap_or_else(|| "none".to_string())
        ));
    }

    if !contribution.has_valid_confidence() {
        return Err(format!(
            "confidence {} outside [0, 1]",
            contribution.confidence
        ));
    }

    Ok(())
}

/// Total order over contributions: source, timestamp, confidence, value
pub fn canonical_order(a: &SourceValue, b: &SourceValue) -> Ordering {
    a.source
        .cmp(&b.source)
        .then(a.observed_at.cmp(&b.observed_at))
        .then(a.confidence.total_cmp(&b.confidence))
        .then_with(|| a.value.cmp(&b.value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};
    use flightsync_common::{FieldValue, FlightIdentity, FlightStatus};

    fn flight() -> FlightIdentity {
        FlightIdentity::new("AA", "100", NaiveDate::from_ymd_opt(2026, 10, 18).unwrap()).unwrap()
    }

    fn status(source: &str, status: FlightStatus, confidence: f64) -> CanonicalFlightData {
        let at = Utc.with_ymd_and_hms(2026, 10, 18, 9, 0, 0).unwrap();
        CanonicalFlightData::new(flight(), source, at).with_field(
            FieldName::Status,
            FieldValue::Status(status),
            confidence,
        )
    }

    #[test]
    fn test_values_sorted_by_source() {
        let observations = vec![
            status("charlie", FlightStatus::OnTime, 0.5),
            status("alpha", FlightStatus::Delayed, 0.9),
            status("bravo", FlightStatus::OnTime, 0.7),
        ];

        let extracted = extract_field_values(&observations);
        let sources: Vec<&str> = extracted.by_field[&FieldName::Status]
            .iter()
            .map(|v| v.source.as_str())
            .collect();
        assert_eq!(sources, vec!["alpha", "bravo", "charlie"]);
        assert!(extracted.rejected.is_empty());
    }

    #[test]
    fn test_wrong_kind_is_rejected() {
        let at = Utc.with_ymd_and_hms(2026, 10, 18, 9, 0, 0).unwrap();
        let observation = CanonicalFlightData::new(flight(), "alpha", at)
            .with_field(FieldName::DepartureGate, FieldValue::Minutes(12), 0.9)
            .with_field(FieldName::DelayMinutes, FieldValue::Minutes(12), 0.9);

        let extracted = extract_field_values(&[observation]);
        assert!(!extracted.by_field.contains_key(&FieldName::DepartureGate));
        assert!(extracted.by_field.contains_key(&FieldName::DelayMinutes));
        assert_eq!(extracted.rejected.len(), 1);
        assert_eq!(extracted.rejected[0].field, FieldName::DepartureGate);
        assert!(extracted.rejected[0].reason.contains("expected text"));
    }

    #[test]
    fn test_out_of_range_confidence_is_rejected() {
        let mut observation = status("alpha", FlightStatus::OnTime, 0.9);
        if let Some(field) = observation.fields.get_mut(&FieldName::Status) {
            field.confidence = 1.7;
        }

        let extracted = extract_field_values(&[observation]);
        assert!(extracted.by_field.is_empty());
        assert_eq!(extracted.rejected.len(), 1);
    }

    #[test]
    fn test_pending_review_input_is_rejected() {
        let at = Utc.with_ymd_and_hms(2026, 10, 18, 9, 0, 0).unwrap();
        let observation = CanonicalFlightData::new(flight(), "resolved", at).with_field(
            FieldName::Status,
            FieldValue::PendingReview,
            0.8,
        );

        let extracted = extract_field_values(&[observation]);
        assert!(extracted.by_field.is_empty());
        assert!(extracted.rejected[0].reason.contains("pending-review"));
    }
}
