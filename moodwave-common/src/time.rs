//! Display helpers for song durations

/// Format a second count as `m:ss` for display
///
/// Zero renders as `0:00`; fractional seconds are truncated.
pub fn format_mm_ss(seconds: f64) -> String {
    if !seconds.is_finite() || seconds <= 0.0 {
        return "0:00".to_string();
    }
    let total = seconds.floor() as u64;
    format!("{}:{:02}", total / 60, total % 60)
}
