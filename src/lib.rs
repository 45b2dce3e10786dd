//! SpecWatchr - Detect sounds beyond human hearing
//!
//! Spectral event detection for infrasound (below ~20 Hz) and ultrasound
//! (above ~20 kHz) in mono audio, offline from decoded files and live
//! from a microphone feed.
//!
//! ## Features
//!
//! - **Offline analysis**: condition -> bandpass -> spectrum -> peak
//!   extraction over a decoded buffer
//! - **Real-time monitoring**: bounded capture queue, windowed detection
//!   off the audio callback thread, consumer callbacks per event
//! - **Per-band configuration**: band edges, thresholds, and event
//!   separation for infrasound and ultrasound independently
//! - **Synthetic signal generation**: out-of-band test tones written as
//!   WAV and replayable through the pipeline
//!
//! ## Module Structure
//!
//! - `core` - conditioning, DSP, detection, offline analysis
//! - `streaming` - capture devices, bounded pipeline, callback dispatch
//! - `config` - detection and monitoring configuration
//! - `cli` - command-line interface and report rendering
//! - `testgen` - synthetic signal utilities
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use specwatchr::core::AudioAnalyzer;
//!
//! let mut analyzer = AudioAnalyzer::new()?;
//! let report = analyzer.analyze_file(path)?;
//! println!("{} event(s) detected", report.total_events);
//! ```
//!
//! ```rust,ignore
//! use specwatchr::config::MonitorConfig;
//! use specwatchr::streaming::{CpalSource, MonitorPipeline};
//!
//! let mut pipeline = MonitorPipeline::new(MonitorConfig::default())?;
//! pipeline.register_callback(Box::new(|event| {
//!     println!("{}: {:.2} Hz @ {:.1} dB", event.band, event.frequency_hz, event.magnitude_db);
//! }));
//! pipeline.start(Box::new(CpalSource::default_device()), None)?;
//! ```

// Core analysis functionality
pub mod core;

// Real-time monitoring
pub mod streaming;

// Configuration
pub mod config;

// Command-line interface
pub mod cli;

// Error taxonomy
pub mod error;

// Synthetic signal generation
pub mod testgen;

// Re-export commonly used types at crate root for convenience
pub use config::{BandConfig, DetectionConfig, MonitorConfig};
pub use crate::core::{
    AnalysisMode, AnalysisReport, AudioAnalyzer, AudioData, Band, EventDetector, SpectralEvent,
};
pub use error::{Error, Result};
pub use streaming::{
    CallbackDispatcher, CaptureSource, CaptureSpec, CpalSource, EventCallback, MonitorPipeline,
    MonitorSummary, PipelineState,
};
