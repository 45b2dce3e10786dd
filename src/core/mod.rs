//! Core analysis and detection modules

pub mod analyzer;
pub mod conditioner;
pub mod decoder;
pub mod detector;
pub mod dsp;

pub use analyzer::{collect_audio_files, AnalysisMode, AnalysisReport, AudioAnalyzer};
pub use conditioner::condition;
pub use decoder::{decode_audio, AudioData};
pub use detector::{Band, EventDetector, SpectralEvent};
