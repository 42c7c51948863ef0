//! Per-field resolution
//!
//! Ladder applied to one field's contributions:
//! 1. All values equal → that value (`highest_confidence`, no disagreement)
//! 2. Strictly greatest confidence → its value (`highest_confidence`)
//! 3. Top-confidence tie → latest timestamp among the tied (`most_recent`)
//! 4. Tie on both with differing values → [`FieldValue::PendingReview`] (`manual_review`)

use chrono::{DateTime, Utc};
use flightsync_common::{FieldValue, ResolutionMethod, SourceId, SourceValue};

/// Outcome of resolving one field
#[derive(Debug, Clone, PartialEq)]
pub struct FieldResolution {
    pub value: FieldValue,
    pub method: ResolutionMethod,
    /// True when at least two contributions carry different values
    pub disagreement: bool,
    /// Confidence carried into the resolved record
    pub confidence: f64,
    /// Timestamp carried into the resolved record
    pub observed_at: DateTime<Utc>,
    /// Source whose value was chosen (None for manual review)
    pub winner: Option<SourceId>,
}

/// Resolve one field from its contributions
///
/// `values` must be in canonical order (see `extract::canonical_order`) for
/// the winner's source id to be order-independent. Returns `None` for an
/// empty list.
pub fn resolve_field(values: &[SourceValue], epsilon: f64) -> Option<FieldResolution> {
    let first = values.first()?;
    let disagreement = values.iter().any(|v| v.value != first.value);

    let max_confidence = values
        .iter()
        .map(|v| v.confidence)
        .fold(f64::NEG_INFINITY, f64::max);

    let top: Vec<&SourceValue> = values
        .iter()
        .filter(|v| max_confidence - v.confidence <= epsilon)
        .collect();

    if all_same_value(&top) {
        return Some(choose(&top, ResolutionMethod::HighestConfidence, disagreement));
    }

    let latest = top.iter().map(|v| v.observed_at).max()?;
    let newest: Vec<&SourceValue> = top
        .iter()
        .copied()
        .filter(|v| v.observed_at == latest)
        .collect();

    if all_same_value(&newest) {
        return Some(choose(&newest, ResolutionMethod::MostRecent, disagreement));
    }

    Some(FieldResolution {
        value: FieldValue::PendingReview,
        method: ResolutionMethod::ManualReview,
        disagreement,
        confidence: max_confidence,
        observed_at: latest,
        winner: None,
    })
}

fn all_same_value(candidates: &[&SourceValue]) -> bool {
    match candidates.first() {
        Some(first) => candidates.iter().all(|v| v.value == first.value),
        None => false,
    }
}

/// Pick among candidates that all carry the same value
///
/// The reported source is the first candidate (canonical order) holding
/// the highest confidence and, among those, the latest timestamp.
fn choose(candidates: &[&SourceValue], method: ResolutionMethod, disagreement: bool) -> FieldResolution {
    let mut best = candidates[0];
    for &candidate in &candidates[1..] {
        let better = candidate.confidence > best.confidence
            || (candidate.confidence == best.confidence && candidate.observed_at > best.observed_at);
        if better {
            best = candidate;
        }
    }

    FieldResolution {
        value: best.value.clone(),
        method,
        disagreement,
        confidence: best.confidence,
        observed_at: best.observed_at,
        winner: Some(best.source.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use flightsync_common::FlightStatus;

    const EPS: f64 = 1e-9;

    fn at(minutes: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 18, 9, 0, 0).unwrap() + Duration::minutes(minutes)
    }

    fn sv(source: &str, status: FlightStatus, confidence: f64, minutes: i64) -> SourceValue {
        SourceValue {
            source: SourceId::new(source),
            value: FieldValue::Status(status),
            confidence,
            observed_at: at(minutes),
        }
    }

    #[test]
    fn test_empty_input_yields_none() {
        assert!(resolve_field(&[], EPS).is_none());
    }

    #[test]
    fn test_agreement_is_trivial_highest_confidence() {
        let values = vec![
            sv("a", FlightStatus::OnTime, 0.6, 0),
            sv("b", FlightStatus::OnTime, 0.9, 3),
        ];

        let resolution = resolve_field(&values, EPS).unwrap();
        assert_eq!(resolution.value, FieldValue::Status(FlightStatus::OnTime));
        assert_eq!(resolution.method, ResolutionMethod::HighestConfidence);
        assert!(!resolution.disagreement);
        assert_eq!(resolution.confidence, 0.9);
        assert_eq!(resolution.winner, Some(SourceId::new("b")));
    }

    #[test]
    fn test_strictly_highest_confidence_wins() {
        let values = vec![
            sv("a", FlightStatus::OnTime, 0.9, 0),
            sv("b", FlightStatus::Delayed, 0.6, 10),
        ];

        let resolution = resolve_field(&values, EPS).unwrap();
        assert_eq!(resolution.value, FieldValue::Status(FlightStatus::OnTime));
        assert_eq!(resolution.method, ResolutionMethod::HighestConfidence);
        assert!(resolution.disagreement);
    }

    #[test]
    fn test_confidence_tie_broken_by_recency() {
        let values = vec![
            sv("a", FlightStatus::OnTime, 0.8, 0),
            sv("b", FlightStatus::Delayed, 0.8, 5),
        ];

        let resolution = resolve_field(&values, EPS).unwrap();
        assert_eq!(resolution.value, FieldValue::Status(FlightStatus::Delayed));
        assert_eq!(resolution.method, ResolutionMethod::MostRecent);
        assert_eq!(resolution.observed_at, at(5));
    }

    #[test]
    fn test_full_tie_goes_to_manual_review() {
        let values = vec![
            sv("a", FlightStatus::OnTime, 0.8, 0),
            sv("b", FlightStatus::Delayed, 0.8, 0),
        ];

        let resolution = resolve_field(&values, EPS).unwrap();
        assert_eq!(resolution.value, FieldValue::PendingReview);
        assert_eq!(resolution.method, ResolutionMethod::ManualReview);
        assert_eq!(resolution.confidence, 0.8);
        assert!(resolution.winner.is_none());
    }

    #[test]
    fn test_tie_within_epsilon() {
        let values = vec![
            sv("a", FlightStatus::OnTime, 0.8, 0),
            sv("b", FlightStatus::Delayed, 0.8 + 1e-12, 5),
        ];

        let resolution = resolve_field(&values, EPS).unwrap();
        assert_eq!(resolution.method, ResolutionMethod::MostRecent);
    }

    #[test]
    fn test_lower_confidence_outsiders_ignored_in_tie() {
        // c is newest but below the tied top confidence
        let values = vec![
            sv("a", FlightStatus::OnTime, 0.8, 0),
            sv("b", FlightStatus::OnTime, 0.8, 2),
            sv("c", FlightStatus::Cancelled, 0.4, 30),
        ];

        let resolution = resolve_field(&values, EPS).unwrap();
        assert_eq!(resolution.value, FieldValue::Status(FlightStatus::OnTime));
        assert_eq!(resolution.method, ResolutionMethod::HighestConfidence);
        assert!(resolution.disagreement);
    }

    #[test]
    fn test_newest_tied_group_agreeing_wins() {
        let values = vec![
            sv("a", FlightStatus::OnTime, 0.8, 0),
            sv("b", FlightStatus::Delayed, 0.8, 5),
            sv("c", FlightStatus::Delayed, 0.8, 5),
        ];

        let resolution = resolve_field(&values, EPS).unwrap();
        assert_eq!(resolution.value, FieldValue::Status(FlightStatus::Delayed));
        assert_eq!(resolution.method, ResolutionMethod::MostRecent);
        assert_eq!(resolution.winner, Some(SourceId::new("b")));
    }
}
