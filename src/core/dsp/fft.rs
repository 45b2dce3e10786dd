//! One-sided magnitude spectrum estimation

use rustfft::{num_complex::Complex, FftPlanner};

/// Floor added to magnitudes before the log conversion so silence maps to
/// a deterministic dB value instead of -inf.
pub const MAGNITUDE_EPSILON: f64 = 1e-10;

/// Spectral estimator over full-length buffers.
///
/// Plans are cached per FFT length, so repeated calls at the same window
/// size (the streaming case) reuse the planned transform.
pub struct SpectralEstimator {
    planner: FftPlanner<f64>,
}

impl SpectralEstimator {
    pub fn new() -> Self {
        Self {
            planner: FftPlanner::new(),
        }
    }

    /// Compute the one-sided magnitude spectrum of `samples` in dB.
    ///
    /// The transform covers the full buffer length with no windowing and no
    /// zero-padding; windowing, where wanted, is a conditioning concern for
    /// the caller. Only strictly positive frequency bins are returned (the
    /// DC bin and the negative-frequency mirror are dropped), so both
    /// returned vectors have `(len - 1) / 2` entries.
    /// Magnitudes are `20 * log10(|X[k]| + 1e-10)`.
    pub fn spectrum(&mut self, samples: &[f64], sample_rate: u32) -> (Vec<f64>, Vec<f64>) {
        let n = samples.len();
        if n < 2 {
            return (Vec::new(), Vec::new());
        }

        let fft = self.planner.plan_fft_forward(n);
        let mut buffer: Vec<Complex<f64>> =
            samples.iter().map(|&s| Complex::new(s, 0.0)).collect();
        fft.process(&mut buffer);

        // Positive frequencies are bins 1 ..= (n - 1) / 2
        let bins = (n - 1) / 2;
        let freq_step = sample_rate as f64 / n as f64;

        let frequencies: Vec<f64> = (1..=bins).map(|k| k as f64 * freq_step).collect();
        let magnitudes_db: Vec<f64> = buffer[1..=bins]
            .iter()
            .map(|c| 20.0 * (c.norm() + MAGNITUDE_EPSILON).log10())
            .collect();

        (frequencies, magnitudes_db)
    }
}

impl Default for SpectralEstimator {
    fn default() -> Self {
        Self::new()
    }
}
