//! Signal conditioning: DC offset removal and peak normalization

/// Condition a raw sample buffer for spectral analysis.
///
/// Subtracts the arithmetic mean, then scales so the largest absolute
/// sample is 1.0. An all-zero buffer comes back unchanged (there is
/// nothing to center or scale). Pure and deterministic.
pub fn condition(samples: &[f64]) -> Vec<f64> {
    if samples.is_empty() {
        return Vec::new();
    }

    let mean = samples.iter().sum::<f64>() / samples.len() as f64;
    let mut out: Vec<f64> = samples.iter().map(|s| s - mean).collect();

    let peak = out.iter().fold(0.0f64, |acc, s| acc.max(s.abs()));
    if peak > 0.0 {
        for s in &mut out {
            *s /= peak;
        }
    }

    out
}
