// src/core/dsp/filters.rs
//
// Butterworth bandpass filtering via cascaded second-order sections.
// Matches scipy.signal.butter(order, [low, high], btype='band', output='sos')
// followed by sosfilt: analog prototype poles, lowpass-to-bandpass
// transformation, bilinear transform, conjugate pairing into biquads.

use num_complex::Complex;
use std::f64::consts::PI;

/// One second-order section in direct form II transposed.
/// Denominator a0 is normalized to 1.
#[derive(Debug, Clone, Copy)]
pub struct Biquad {
    pub b0: f64,
    pub b1: f64,
    pub b2: f64,
    pub a1: f64,
    pub a2: f64,
}

impl Biquad {
    fn response_at(&self, z: Complex<f64>) -> Complex<f64> {
        let num = self.b0 * z * z + self.b1 * z + self.b2;
        let den = z * z + self.a1 * z + self.a2;
        num / den
    }
}

/// Design a Butterworth bandpass as cascaded biquads.
///
/// `low` and `high` are band edges as fractions of the Nyquist frequency,
/// both strictly inside (0, 1) with `low < high`. An order-n design yields
/// 2n poles, i.e. n sections.
pub fn butter_bandpass_sos(order: usize, low: f64, high: f64) -> Vec<Biquad> {
    debug_assert!(order >= 1);
    debug_assert!(0.0 < low && low < high && high < 1.0);

    // Pre-warp the digital band edges onto the analog frequency axis
    let u_low = (PI * low / 2.0).tan();
    let u_high = (PI * high / 2.0).tan();
    let bw = u_high - u_low;
    let center_sq = u_high * u_low;

    // Analog lowpass prototype: poles on the unit circle in the left half
    // plane at angles (2k + order + 1) * pi / (2 * order)
    let prototype: Vec<Complex<f64>> = (0..order)
        .map(|k| {
            let angle = (2 * k + order + 1) as f64 * PI / (2 * order) as f64;
            Complex::from_polar(1.0, angle)
        })
        .collect();

    // Lowpass-to-bandpass: each prototype pole p maps to the two roots of
    // s^2 - (p * bw) * s + center_sq = 0
    let mut analog_poles = Vec::with_capacity(2 * order);
    for p in prototype {
        let b = -p * bw;
        let disc = (b * b - 4.0 * center_sq).sqrt();
        analog_poles.push((-b + disc) / 2.0);
        analog_poles.push((-b - disc) / 2.0);
    }

    // Bilinear transform into the z plane. The bandpass zeros land at
    // z = +1 (from s = 0) and z = -1 (from s = infinity), `order` of each.
    let z_poles: Vec<Complex<f64>> = analog_poles
        .iter()
        .map(|&s| (1.0 + s) / (1.0 - s))
        .collect();

    // Pair poles into conjugate pairs; each pair plus one (+1, -1) zero
    // pair forms a biquad with real coefficients.
    let mut used = vec![false; z_poles.len()];
    let mut sections = Vec::with_capacity(order);
    for i in 0..z_poles.len() {
        if used[i] {
            continue;
        }
        let mut best = i;
        let mut best_err = f64::INFINITY;
        for j in (i + 1)..z_poles.len() {
            if used[j] {
                continue;
            }
            let err = (z_poles[i].re - z_poles[j].re).abs()
                + (z_poles[i].im + z_poles[j].im).abs();
            if err < best_err {
                best_err = err;
                best = j;
            }
        }
        used[i] = true;
        used[best] = true;

        let p1 = z_poles[i];
        let p2 = z_poles[best];
        sections.push(Biquad {
            // (z - 1)(z + 1) = z^2 - 1
            b0: 1.0,
            b1: 0.0,
            b2: -1.0,
            a1: -(p1 + p2).re,
            a2: (p1 * p2).re,
        });
    }

    // Normalize the cascade to unit gain at the geometric band center,
    // with the correction spread evenly across sections.
    let center = (low * high).sqrt();
    let z = Complex::from_polar(1.0, PI * center);
    let mut gain = 1.0;
    for s in &sections {
        gain *= s.response_at(z).norm();
    }
    if gain > 0.0 && gain.is_finite() {
        let per_section = (1.0 / gain).powf(1.0 / sections.len() as f64);
        for s in &mut sections {
            s.b0 *= per_section;
            s.b1 *= per_section;
            s.b2 *= per_section;
        }
    }

    sections
}

/// Run a signal through cascaded sections, causally, from zero state.
/// Output length always equals input length.
pub fn sosfilt(sections: &[Biquad], input: &[f64]) -> Vec<f64> {
    let mut output = input.to_vec();
    for s in sections {
        // Direct form II transposed state
        let mut z1 = 0.0;
        let mut z2 = 0.0;
        for sample in &mut output {
            let x = *sample;
            let y = s.b0 * x + z1;
            z1 = s.b1 * x - s.a1 * y + z2;
            z2 = s.b2 * x - s.a2 * y;
            *sample = y;
        }
    }
    output
}

/// Isolate a frequency band with a Butterworth bandpass.
///
/// Band edges are clamped as fractions of Nyquist to [1e-4, 1 - 1e-4]
/// before the design, so a band configured near 0 Hz or near Nyquist can
/// never produce a degenerate filter. If the clamped edges collapse, the
/// upper edge is pushed an epsilon above the lower one.
pub fn bandpass_filter(
    samples: &[f64],
    sample_rate: u32,
    low_hz: f64,
    high_hz: f64,
    order: usize,
) -> Vec<f64> {
    if samples.is_empty() {
        return Vec::new();
    }

    let nyquist = sample_rate as f64 / 2.0;
    let low = (low_hz / nyquist).clamp(1e-4, 0.9999);
    let mut high = (high_hz / nyquist).clamp(1e-4, 0.9999);
    if high <= low {
        high = low + 1e-4;
    }

    let sections = butter_bandpass_sos(order, low, high);
    sosfilt(&sections, samples)
}
