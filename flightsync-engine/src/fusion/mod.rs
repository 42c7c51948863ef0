//! Conflict resolution
//!
//! Merges observations of one flight into a single resolved record.
//!
//! # Pipeline
//! 1. **extract** - per-field contribution lists, malformed values dropped
//! 2. **field_resolver** - choose each field's value and resolution method
//! 3. **contributions** - union of free-form source metadata
//! 4. **validators::quality_scorer** - overall and per-source scores
//!
//! [`ConflictResolver::resolve`] is pure and synchronous: the output is a
//! function of the set of observations, independent of their order, and
//! inputs are never mutated.

pub mod contributions;
pub mod extract;
pub mod field_resolver;

use crate::types::ResolveError;
use crate::validators::quality_scorer::{
    calculate_quality_score, field_support, score_sources, FieldAssessment, QualityWeights,
};
use flightsync_common::config::ResolverSettings;
use flightsync_common::{
    CanonicalFlightData, ConflictField, FieldObservation, ResolutionMethod, ResolutionResult,
    SourceId,
};
use std::collections::BTreeMap;
use tracing::{debug, info};

pub use contributions::merge_contributions;
pub use extract::{extract_field_values, ExtractedFields};
pub use field_resolver::{resolve_field, FieldResolution};

/// Resolver tuning
#[derive(Debug, Clone, PartialEq)]
pub struct ResolverConfig {
    /// Confidences within this distance of the maximum are tied
    pub confidence_epsilon: f64,
    /// Report agreeing fields in the conflict list as well
    pub report_agreements: bool,
    pub weights: QualityWeights,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self::from(&ResolverSettings::default())
    }
}

impl From<&ResolverSettings> for ResolverConfig {
    fn from(settings: &ResolverSettings) -> Self {
        Self {
            confidence_epsilon: settings.confidence_epsilon,
            report_agreements: settings.report_agreements,
            weights: QualityWeights {
                conflict_penalty: settings.conflict_penalty,
                manual_review_penalty: settings.manual_review_penalty,
                authority_weight: settings.authority_weight,
            },
        }
    }
}

/// Field-wise conflict resolver
#[derive(Debug, Clone, Default)]
pub struct ConflictResolver {
    config: ResolverConfig,
}

impl ConflictResolver {
    pub fn new(config: ResolverConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Resolve a non-empty set of observations of one flight
    ///
    /// # Errors
    /// * `ResolveError::EmptyInput` - no observations
    /// * `ResolveError::MixedFlights` - observations name different flights
    pub fn resolve(&self, observations: &[CanonicalFlightData]) -> Result<ResolutionResult, ResolveError> {
        let first = observations.first().ok_or(ResolveError::EmptyInput)?;

        if let Some(stray) = observations.iter().find(|o| o.flight != first.flight) {
            return Err(ResolveError::MixedFlights {
                expected: first.flight.clone(),
                found: stray.flight.clone(),
                source_id: stray.source.clone(),
            });
        }

        let extracted = extract_field_values(observations);
        let epsilon = self.config.confidence_epsilon;

        let mut fields = BTreeMap::new();
        let mut conflicts = Vec::new();
        let mut assessments = Vec::with_capacity(extracted.by_field.len());

        for (field, values) in &extracted.by_field {
            let Some(resolution) = resolve_field(values, epsilon) else {
                continue;
            };

            debug!(
                field = %field,
                contributors = values.len(),
                method = %resolution.method,
                disagreement = resolution.disagreement,
                winner = resolution.winner.as_ref().map(|s| s.as_str()).unwrap_or("-"),
                "Field resolved"
            );

            assessments.push(FieldAssessment {
                support: field_support(values),
                disagreement: resolution.disagreement,
                manual_review: resolution.method == ResolutionMethod::ManualReview,
            });

            if resolution.disagreement || self.config.report_agreements {
                conflicts.push(ConflictField {
                    field: *field,
                    values: values.clone(),
                    resolved_value: resolution.value.clone(),
                    method: resolution.method,
                    disagreement: resolution.disagreement,
                });
            }

            fields.insert(
                *field,
                FieldObservation {
                    value: resolution.value,
                    confidence: resolution.confidence,
                    observed_at: resolution.observed_at,
                },
            );
        }

        let observed_at = observations
            .iter()
            .map(|o| o.observed_at)
            .max()
            .unwrap_or(first.observed_at);

        let resolved_data = CanonicalFlightData {
            flight: first.flight.clone(),
            source: SourceId::resolved(),
            observed_at,
            fields,
            contributions: merge_contributions(observations),
        };

        let quality_score = calculate_quality_score(&assessments, &self.config.weights);
        let source_scores = score_sources(observations, &extracted.by_field, epsilon, &self.config.weights);

        let manual_review = assessments.iter().filter(|a| a.manual_review).count();
        info!(
            flight = %first.flight,
            observations = observations.len(),
            fields = resolved_data.field_count(),
            conflicts = assessments.iter().filter(|a| a.disagreement).count(),
            manual_review,
            rejected = extracted.rejected.len(),
            quality_score,
            "Resolved flight"
        );

        Ok(ResolutionResult {
            resolved_data,
            conflicts,
            quality_score,
            source_scores,
            rejected: extracted.rejected,
        })
    }
}
