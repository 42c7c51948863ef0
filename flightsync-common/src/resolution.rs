//! Resolver output types
//!
//! A [`ResolutionResult`] is what callers receive after observations from
//! several sources have been merged: the resolved record, every conflict
//! and how it was settled, and how much the result can be trusted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::model::{CanonicalFlightData, FieldName, FieldValue, SourceId};

/// How a field's value was chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionMethod {
    /// Strictly greatest confidence won (also recorded when all sources agree)
    HighestConfidence,
    /// Tied at the top confidence, broken by the latest timestamp
    MostRecent,
    /// Tied on confidence and timestamp with differing values
    ManualReview,
}

impl fmt::Display for ResolutionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResolutionMethod::HighestConfidence => "highest_confidence",
            ResolutionMethod::MostRecent => "most_recent",
            ResolutionMethod::ManualReview => "manual_review",
        };
        f.write_str(name)
    }
}

/// One source's contribution to one field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceValue {
    pub source: SourceId,
    pub value: FieldValue,
    pub confidence: f64,
    pub observed_at: DateTime<Utc>,
}

/// A field reported in the conflict list
///
/// `resolved_value` is one of `values` unless `method` is
/// [`ResolutionMethod::ManualReview`], in which case it is
/// [`FieldValue::PendingReview`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConflictField {
    pub field: FieldName,
    /// Every contribution, ordered by source then timestamp
    pub values: Vec<SourceValue>,
    pub resolved_value: FieldValue,
    pub method: ResolutionMethod,
    /// False only for agreeing fields included as diagnostics
    pub disagreement: bool,
}

impl ConflictField {
    pub fn needs_manual_review(&self) -> bool {
        self.method == ResolutionMethod::ManualReview
    }

    /// Distinct values among the contributions, in first-seen order
    pub fn distinct_values(&self) -> Vec<&FieldValue> {
        let mut distinct: Vec<&FieldValue> = Vec::new();
        for contribution in &self.values {
            if !distinct.contains(&&contribution.value) {
                distinct.push(&contribution.value);
            }
        }
        distinct
    }
}

/// Per-observation quality score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceScore {
    pub source: SourceId,
    pub observed_at: DateTime<Utc>,
    /// Valid field contributions made by this observation
    pub field_count: usize,
    /// Fields where this observation held the top confidence
    pub authoritative_fields: usize,
    /// `authoritative_fields / field_count` (0.0 with no fields)
    pub authority: f64,
    /// 1.0 for the newest observation, 0.0 for the oldest
    pub recency: f64,
    pub score: f64,
}

/// A field contribution that was dropped before resolution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectedContribution {
    pub source: SourceId,
    pub field: FieldName,
    pub reason: String,
}

/// Output of one resolver run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolutionResult {
    pub resolved_data: CanonicalFlightData,
    /// Empty when every source agreed on every field
    pub conflicts: Vec<ConflictField>,
    /// Overall quality (0.0-1.0)
    pub quality_score: f64,
    pub source_scores: Vec<SourceScore>,
    pub rejected: Vec<RejectedContribution>,
}

impl ResolutionResult {
    /// True if any field has disagreeing sources
    pub fn has_conflicts(&self) -> bool {
        self.conflicts.iter().any(|c| c.disagreement)
    }

    pub fn conflict(&self, field: FieldName) -> Option<&ConflictField> {
        self.conflicts.iter().find(|c| c.field == field)
    }

    /// Fields left as [`FieldValue::PendingReview`]
    pub fn manual_review_fields(&self) -> Vec<FieldName> {
        self.conflicts
            .iter()
            .filter(|c| c.needs_manual_review())
            .map(|c| c.field)
            .collect()
    }
}
