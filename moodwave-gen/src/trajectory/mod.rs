//! Mood trajectory planning
//!
//! Maps a (start, end) mood pair to an ordered, deduplicated list of catalog
//! labels by sampling the straight line between them in valence/arousal
//! space and snapping each sample to its nearest catalog mood.

pub mod catalog;

pub use catalog::{find, nearest, sorted_labels, MoodPoint, CATALOG};

use tracing::debug;

/// Default number of intermediate samples between start and end
pub const DEFAULT_STEPS: usize = 5;

/// Plan the mood sequence from `start` to `end`
///
/// If either mood is not in the catalog, returns `[start, end]` verbatim.
/// Otherwise samples `steps + 2` evenly spaced points (both endpoints
/// included), maps each to its nearest catalog mood and drops repeated
/// labels, keeping first occurrences. Labels use catalog spelling.
pub fn plan(start: &str, end: &str, steps: usize) -> Vec<String> {
    let (from, to) = match (find(start), find(end)) {
        (Some(from), Some(to)) => (from, to),
        (from, to) => {
            debug!(
                start = start,
                end = end,
                start_known = from.is_some(),
                end_known = to.is_some(),
                "Mood not in catalog, passing through unplanned"
            );
            return vec![start.to_string(), end.to_string()];
        }
    };

    let segments = (steps + 1) as f64;
    let mut labels: Vec<String> = Vec::with_capacity(steps + 2);

    for i in 0..=steps + 1 {
        let t = i as f64 / segments;
        let valence = from.valence + t * (to.valence - from.valence);
        let arousal = from.arousal + t * (to.arousal - from.arousal);

        let label = nearest(valence, arousal).label;
        if !labels.iter().any(|existing| existing == label) {
            labels.push(label.to_string());
        }
    }

    labels
}
