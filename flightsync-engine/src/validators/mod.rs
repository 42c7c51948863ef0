//! Resolution quality assessment
//!
//! # Validators
//! 1. **quality_scorer** - Overall quality score and per-source scores

pub mod quality_scorer;

pub use quality_scorer::{calculate_quality_score, score_sources, FieldAssessment, QualityWeights};
