//! Static mood reference catalog
//!
//! Coordinates are (valence, arousal) on a 0-10 scale. Iteration order
//! matters: nearest-match ties resolve to the earlier entry.

/// A known mood and its position in valence/arousal space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MoodPoint {
    pub label: &'static str,
    pub valence: f64,
    pub arousal: f64,
}

impl MoodPoint {
    const fn new(label: &'static str, valence: f64, arousal: f64) -> Self {
        Self {
            label,
            valence,
            arousal,
        }
    }

    /// Manhattan distance to a point in (valence, arousal) space
    pub fn manhattan_distance(&self, valence: f64, arousal: f64) -> f64 {
        (self.valence - valence).abs() + (self.arousal - arousal).abs()
    }
}

pub const CATALOG: [MoodPoint; 26] = [
    // High valence, high arousal
    MoodPoint::new("Thrilling", 9.0, 9.0),
    MoodPoint::new("Excited", 9.0, 8.5),
    MoodPoint::new("Energetic", 8.5, 8.5),
    MoodPoint::new("Joyful", 9.0, 7.5),
    MoodPoint::new("Uplifting", 9.5, 6.5),
    MoodPoint::new("Cheerful", 8.5, 6.5),
    MoodPoint::new("Hopeful", 7.0, 5.5),
    // Low valence, high arousal
    MoodPoint::new("Fearful", 1.5, 9.5),
    MoodPoint::new("Angry", 2.0, 8.5),
    MoodPoint::new("Anxious", 2.0, 8.0),
    MoodPoint::new("Tense", 2.5, 7.5),
    MoodPoint::new("Intense", 4.0, 9.0),
    MoodPoint::new("Mysterious", 5.0, 6.0),
    // Low valence, low arousal
    MoodPoint::new("Depressed", 1.0, 1.0),
    MoodPoint::new("Gloomy", 2.5, 2.0),
    MoodPoint::new("Lonely", 2.0, 2.5),
    MoodPoint::new("Sad", 3.0, 4.0),
    MoodPoint::new("Melancholic", 3.5, 3.5),
    MoodPoint::new("Sorrowful", 2.0, 3.0),
    // High valence, low arousal
    MoodPoint::new("Peaceful", 9.0, 1.0),
    MoodPoint::new("Relaxed", 8.5, 1.5),
    MoodPoint::new("Comforting", 8.0, 2.0),
    MoodPoint::new("Calm", 7.5, 2.5),
    MoodPoint::new("Gentle", 7.0, 3.0),
    MoodPoint::new("Nostalgic", 6.5, 4.5),
    MoodPoint::new("Dreamy", 6.0, 3.5),
];

/// Case-insensitive exact lookup
pub fn find(label: &str) -> Option<&'static MoodPoint> {
    CATALOG
        .iter()
        .find(|point| point.label.eq_ignore_ascii_case(label))
}

/// Catalog entry nearest to a point; first minimum in catalog order wins
pub fn nearest(valence: f64, arousal: f64) -> &'static MoodPoint {
    let mut best = &CATALOG[0];
    let mut best_distance = best.manhattan_distance(valence, arousal);

    for point in CATALOG.iter().skip(1) {
        let distance = point.manhattan_distance(valence, arousal);
        if distance < best_distance {
            best = point;
            best_distance = distance;
        }
    }

    best
}

/// Catalog labels in alphabetical order, for mood pickers
pub fn sorted_labels() -> Vec<&'static str> {
    let mut labels: Vec<&'static str> = CATALOG.iter().map(|p| p.label).collect();
    labels.sort_unstable();
    labels
}
