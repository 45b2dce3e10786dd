//! Error taxonomy for detection and monitoring

use std::time::Duration;
use thiserror::Error;

/// Errors surfaced by the detection engine and the monitoring pipeline.
///
/// Queue overruns and consumer-callback panics are deliberately *not*
/// variants here: they are non-fatal, logged as warnings, and counted by
/// the pipeline (see `MonitorSummary`).
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid detection configuration, e.g. band edges violating the
    /// Nyquist constraint. Fatal at construction time.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The capture device could not be opened at the requested
    /// sample rate / channel count. Fatal to `start()`; the pipeline
    /// stays idle.
    #[error("audio device unavailable: {0}")]
    Device(String),

    /// Offline decode failure, propagated directly to the caller.
    #[error("failed to decode audio: {0}")]
    Decode(String),

    /// A pipeline thread failed to join within the shutdown bound.
    #[error("{thread} thread did not stop within {timeout:?}")]
    ShutdownTimeout {
        thread: &'static str,
        timeout: Duration,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
