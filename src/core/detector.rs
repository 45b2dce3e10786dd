// src/core/detector.rs
//
// Per-band event detection: bandpass -> spectrum -> peak extraction.
// This is the unit shared by the offline analyzer and the real-time
// monitoring pipeline.

use chrono::{DateTime, Utc};
use log::info;
use serde::{Deserialize, Serialize};

use super::dsp::{bandpass_filter, find_peaks, SpectralEstimator};
use crate::config::{BandConfig, DetectionConfig};
use crate::error::Result;

/// Frequency band outside human hearing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Band {
    Infrasound,
    Ultrasound,
}

impl Band {
    pub fn label(&self) -> &'static str {
        match self {
            Band::Infrasound => "infrasound",
            Band::Ultrasound => "ultrasound",
        }
    }
}

impl std::fmt::Display for Band {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// One detected spectral peak. Immutable once created; the timestamp is
/// set only on the real-time path, at emission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpectralEvent {
    pub band: Band,
    pub frequency_hz: f64,
    pub magnitude_db: f64,
    /// File name or capture label this event came from
    pub source: String,
    pub timestamp: Option<DateTime<Utc>>,
}

/// Detects out-of-band spectral events in a sample buffer.
///
/// The configuration is validated once here and never mutated afterwards;
/// `detect` is deterministic given identical input and config.
pub struct EventDetector {
    config: DetectionConfig,
    estimator: SpectralEstimator,
}

impl EventDetector {
    pub fn new(config: DetectionConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            estimator: SpectralEstimator::new(),
        })
    }

    pub fn config(&self) -> &DetectionConfig {
        &self.config
    }

    /// Run detection over both bands, infrasound first. Events within a
    /// band come out in ascending frequency order. An empty buffer yields
    /// an empty list.
    pub fn detect(&mut self, samples: &[f64], source: &str) -> Vec<SpectralEvent> {
        let mut events = self.detect_band(samples, Band::Infrasound, source);
        events.extend(self.detect_band(samples, Band::Ultrasound, source));
        events
    }

    /// Run detection over a single band.
    pub fn detect_band(&mut self, samples: &[f64], band: Band, source: &str) -> Vec<SpectralEvent> {
        if samples.is_empty() {
            return Vec::new();
        }

        let band_config = self.band_config(band);
        let sample_rate = self.config.sample_rate;

        // Keep the ultrasound passband clear of Nyquist artifacts
        let filter_high = match band {
            Band::Infrasound => band_config.max_hz,
            Band::Ultrasound => band_config
                .max_hz
                .min(sample_rate as f64 / 2.0 - 1000.0),
        };

        let filtered = bandpass_filter(
            samples,
            sample_rate,
            band_config.min_hz,
            filter_high,
            self.config.filter_order,
        );

        let (frequencies, magnitudes_db) = self.estimator.spectrum(&filtered, sample_rate);

        // Frequencies come out ascending, so the band restriction is a
        // contiguous bin range.
        let start = frequencies.partition_point(|&f| f < band_config.min_hz);
        let end = frequencies.partition_point(|&f| f <= band_config.max_hz);
        if start >= end {
            return Vec::new();
        }

        let separation = (sample_rate as f64 * band_config.min_event_separation) as usize;
        let peaks = find_peaks(&magnitudes_db[start..end], band_config.threshold_db, separation);

        peaks
            .into_iter()
            .map(|p| {
                let event = SpectralEvent {
                    band,
                    frequency_hz: frequencies[start + p.index],
                    magnitude_db: p.height,
                    source: source.to_string(),
                    timestamp: None,
                };
                info!(
                    "{} detected: {:.2} Hz at {:.1} dB ({})",
                    band, event.frequency_hz, event.magnitude_db, source
                );
                event
            })
            .collect()
    }

    fn band_config(&self, band: Band) -> BandConfig {
        match band {
            Band::Infrasound => self.config.infrasound,
            Band::Ultrasound => self.config.ultrasound,
        }
    }
}
