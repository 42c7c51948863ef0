//! Source contribution merge
//!
//! Notes are unioned (first occurrence kept) and sub-scores are namespaced
//! by source, so no source's metadata ever overwrites another's.

use flightsync_common::{CanonicalFlightData, SourceContribution, SourceId};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Merge free-form contribution metadata from all observations
///
/// Observations are visited in `(source, observed_at, notes, sub_scores)`
/// order, making the result independent of input order. Sub-score keys become
/// `"<source>/<name>"`; a repeated key gets a `#2`, `#3`, ... suffix.
/// Keys from an already-resolved record are kept as they are.
pub fn merge_contributions(observations: &[CanonicalFlightData]) -> SourceContribution {
    let mut ordered: Vec<&CanonicalFlightData> = observations.iter().collect();
    ordered.sort_by(|a, b| {
        a.source
            .cmp(&b.source)
            .then(a.observed_at.cmp(&b.observed_at))
            .then_with(|| a.contributions.notes.cmp(&b.contributions.notes))
            .then_with(|| compare_sub_scores(&a.contributions.sub_scores, &b.contributions.sub_scores))
    });

    let mut merged = SourceContribution::default();

    for observation in ordered {
        for note in &observation.contributions.notes {
            if !merged.notes.contains(note) {
                merged.notes.push(note.clone());
            }
        }

        for (name, score) in &observation.contributions.sub_scores {
            let base = if observation.source.as_str() == SourceId::RESOLVED {
                name.clone()
            } else {
                format!("{}/{}", observation.source, name)
            };
            let mut key = base.clone();
            let mut n = 2;
            while merged.sub_scores.contains_key(&key) {
                key = format!("{}#{}", base, n);
                n += 1;
            }
            merged.sub_scores.insert(key, *score);
        }
    }

    merged
}

/// Total order over sub-score maps: keys, then scores by `f64::total_cmp`
fn compare_sub_scores(a: &BTreeMap<String, f64>, b: &BTreeMap<String, f64>) -> Ordering {
    for ((a_key, a_score), (b_key, b_score)) in a.iter().zip(b.iter()) {
        let ordering = a_key.cmp(b_key).then_with(|| a_score.total_cmp(b_score));
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    a.len().cmp(&b.len())
}
