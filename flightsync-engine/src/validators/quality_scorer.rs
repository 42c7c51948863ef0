// Quality Scorer - overall and per-source quality of a resolution
//
// Overall: mean field support, penalized by the fraction of disagreeing
// fields and again by the fraction sent to manual review.
// Per source: share of fields where the source held the top confidence,
// blended with how recent its observation is.

use crate::fusion::extract::check_contribution;
use chrono::{DateTime, Utc};
use flightsync_common::{CanonicalFlightData, FieldName, SourceScore, SourceValue};
use std::collections::BTreeMap;

/// Scoring weights (all in [0, 1])
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QualityWeights {
    pub conflict_penalty: f64,
    pub manual_review_penalty: f64,
    pub authority_weight: f64,
}

impl Default for QualityWeights {
    fn default() -> Self {
        Self {
            conflict_penalty: 0.25,
            manual_review_penalty: 1.0,
            authority_weight: 0.7,
        }
    }
}

/// Inputs the overall score needs from one resolved field
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldAssessment {
    /// Mean confidence of every contribution to the field
    pub support: f64,
    pub disagreement: bool,
    pub manual_review: bool,
}

/// Mean contributor confidence for one field (0.0 when empty)
pub fn field_support(values: &[SourceValue]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let sum: f64 = values.iter().map(|v| v.confidence).sum();
    sum / values.len() as f64
}

/// Calculate overall quality score
///
/// # Returns
/// * Score in [0.0, 1.0]; 0.0 when no field was resolved
pub fn calculate_quality_score(fields: &[FieldAssessment], weights: &QualityWeights) -> f64 {
    if fields.is_empty() {
        return 0.0;
    }

    let total = fields.len() as f64;
    let mean_support = fields.iter().map(|f| f.support).sum::<f64>() / total;
    let conflict_fraction = fields.iter().filter(|f| f.disagreement).count() as f64 / total;
    let manual_fraction = fields.iter().filter(|f| f.manual_review).count() as f64 / total;

    let score = mean_support
        * (1.0 - weights.conflict_penalty * conflict_fraction)
        * (1.0 - weights.manual_review_penalty * manual_fraction);

    score.clamp(0.0, 1.0)
}

/// Score every observation by authority share and recency
///
/// Output is ordered by source then observation time.
pub fn score_sources(
    observations: &[CanonicalFlightData],
    by_field: &BTreeMap<FieldName, Vec<SourceValue>>,
    epsilon: f64,
    weights: &QualityWeights,
) -> Vec<SourceScore> {
    let top_confidence: BTreeMap<FieldName, f64> = by_field
        .iter()
        .map(|(field, values)| {
            let max = values
                .iter()
                .map(|v| v.confidence)
                .fold(f64::NEG_INFINITY, f64::max);
            (*field, max)
        })
        .collect();

    let oldest = observations.iter().map(|o| o.observed_at).min();
    let newest = observations.iter().map(|o| o.observed_at).max();

    let mut scores: Vec<SourceScore> = observations
        .iter()
        .map(|observation| {
            let mut field_count = 0;
            let mut authoritative_fields = 0;

            for (field, contribution) in &observation.fields {
                if check_contribution(*field, contribution).is_err() {
                    continue;
                }
                field_count += 1;
                if let Some(top) = top_confidence.get(field) {
                    if top - contribution.confidence <= epsilon {
                        authoritative_fields += 1;
                    }
                }
            }

            let authority = if field_count == 0 {
                0.0
            } else {
                authoritative_fields as f64 / field_count as f64
            };
            let recency = recency(observation.observed_at, oldest, newest);
            let score = weights.authority_weight * authority + (1.0 - weights.authority_weight) * recency;

            SourceScore {
                source: observation.source.clone(),
                observed_at: observation.observed_at,
                field_count,
                authoritative_fields,
                authority,
                recency,
                score: score.clamp(0.0, 1.0),
            }
        })
        .collect();

    scores.sort_by(|a, b| {
        a.source
            .cmp(&b.source)
            .then(a.observed_at.cmp(&b.observed_at))
            .then(a.field_count.cmp(&b.field_count))
            .then(a.authoritative_fields.cmp(&b.authoritative_fields))
    });
    scores
}

/// Linear position of `at` between the oldest and newest observation
fn recency(at: DateTime<Utc>, oldest: Option<DateTime<Utc>>, newest: Option<DateTime<Utc>>) -> f64 {
    match (oldest, newest) {
        (Some(oldest), Some(newest)) if newest > oldest => {
            let span = (newest - oldest).num_milliseconds() as f64;
            let offset = (at - oldest).num_milliseconds() as f64;
            (offset / span).clamp(0.0, 1.0)
        }
        _ => 1.0,
    }
}
