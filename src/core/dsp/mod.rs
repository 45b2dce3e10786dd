//! Digital signal processing utilities

pub mod fft;
pub mod filters;
pub mod peaks;

pub use fft::SpectralEstimator;
pub use filters::bandpass_filter;
pub use peaks::{find_peaks, Peak};
