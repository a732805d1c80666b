//! Score normalization shared by every component that returns a
//! probability-like value.

/// Clamp a model- or rubric-supplied score into `[0, 1]` and round it to
/// two decimals. Applied before any score leaves the pipeline.
pub fn clamp_score(value: f64) -> f64 {
    let clamped = if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    };
    (clamped * 100.0).round() / 100.0
}
