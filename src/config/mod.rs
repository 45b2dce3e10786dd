//! Detection and monitoring configuration
//!
//! Configuration is a fixed, validated struct: recognized fields only,
//! checked once at construction and never re-validated per call. How the
//! values are loaded (file format, CLI flags, hardcoded defaults) is the
//! caller's concern; everything here is plain serde-friendly data.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// One frequency band of interest with its detection parameters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BandConfig {
    /// Lower band edge in Hz
    pub min_hz: f64,
    /// Upper band edge in Hz
    pub max_hz: f64,
    /// Peak height threshold in dB
    pub threshold_db: f64,
    /// Minimum event separation in seconds.
    ///
    /// NOTE: the peak finder applies this as a distance in spectrum bins
    /// (`min_event_separation * sample_rate`), not as a time gap. See
    /// `core::dsp::peaks` for the details of this approximation.
    pub min_event_separation: f64,
}

impl BandConfig {
    fn validate(&self, name: &str, nyquist: f64) -> Result<()> {
        if !(self.min_hz >= 0.0 && self.min_hz.is_finite()) {
            return Err(Error::Config(format!(
                "{name}: min_hz must be a non-negative finite value, got {}",
                self.min_hz
            )));
        }
        if self.min_hz >= self.max_hz {
            return Err(Error::Config(format!(
                "{name}: min_hz ({}) must be below max_hz ({})",
                self.min_hz, self.max_hz
            )));
        }
        if self.max_hz > nyquist {
            return Err(Error::Config(format!(
                "{name}: max_hz ({}) exceeds the Nyquist frequency ({nyquist})",
                self.max_hz
            )));
        }
        if self.min_event_separation < 0.0 {
            return Err(Error::Config(format!(
                "{name}: min_event_separation must not be negative"
            )));
        }
        Ok(())
    }
}

/// Immutable detection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Sample rate in Hz. High-resolution capture (96 kHz or more) is
    /// required to reach the ultrasound band.
    pub sample_rate: u32,
    /// Infrasound band (below human hearing)
    pub infrasound: BandConfig,
    /// Ultrasound band (above human hearing)
    pub ultrasound: BandConfig,
    /// Butterworth bandpass filter order
    pub filter_order: usize,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            sample_rate: 96_000,
            infrasound: BandConfig {
                min_hz: 0.01,
                max_hz: 20.0,
                threshold_db: -40.0,
                min_event_separation: 0.5,
            },
            ultrasound: BandConfig {
                min_hz: 20_000.0,
                max_hz: 48_000.0,
                threshold_db: -50.0,
                min_event_separation: 0.05,
            },
            filter_order: 5,
        }
    }
}

impl DetectionConfig {
    /// Nyquist frequency for the configured sample rate.
    pub fn nyquist(&self) -> f64 {
        self.sample_rate as f64 / 2.0
    }

    /// Check the Nyquist invariant for both bands and the filter order.
    /// Called once by `EventDetector::new`; a failure is fatal.
    pub fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            return Err(Error::Config("sample_rate must not be zero".into()));
        }
        if self.filter_order == 0 {
            return Err(Error::Config("filter_order must be at least 1".into()));
        }
        let nyquist = self.nyquist();
        self.infrasound.validate("infrasound", nyquist)?;
        self.ultrasound.validate("ultrasound", nyquist)?;
        Ok(())
    }
}

/// Configuration for the real-time monitoring pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub detection: DetectionConfig,
    /// Capture channel count; multi-channel input is downmixed to mono.
    pub channels: u16,
    /// Preferred capture chunk size in frames
    pub chunk_size: usize,
    /// Analysis window length in seconds. Detection runs once per
    /// non-overlapping window, so this is also the event timing resolution.
    pub window_secs: f64,
    /// Capture queue capacity in chunks. On overflow the oldest chunk is
    /// dropped and an overrun is recorded; the device callback never blocks.
    pub queue_capacity: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            detection: DetectionConfig::default(),
            channels: 1,
            chunk_size: 2048,
            window_secs: 0.1,
            queue_capacity: 64,
        }
    }
}

impl MonitorConfig {
    /// Samples per analysis window.
    pub fn window_len(&self) -> usize {
        (self.detection.sample_rate as f64 * self.window_secs) as usize
    }

    pub fn validate(&self) -> Result<()> {
        self.detection.validate()?;
        if self.channels == 0 {
            return Err(Error::Config("channels must be at least 1".into()));
        }
        if self.chunk_size == 0 {
            return Err(Error::Config("chunk_size must not be zero".into()));
        }
        if self.queue_capacity == 0 {
            return Err(Error::Config("queue_capacity must not be zero".into()));
        }
        if self.window_len() == 0 {
            return Err(Error::Config(format!(
                "window_secs ({}) yields an empty analysis window",
                self.window_secs
            )));
        }
        Ok(())
    }
}
