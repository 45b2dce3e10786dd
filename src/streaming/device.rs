// src/streaming/device.rs
//
// Capture device abstraction for the real-time path. The pipeline treats
// a source as a black box that, once opened, delivers mono chunks at
// approximately the configured rate until the stop flag is set. CpalSource
// implements it on the system audio backend; tests substitute a paced
// synthetic source.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, StreamConfig};
use crossbeam_channel::Sender;
use log::{info, warn};

use crate::error::Error;

/// Parameters a capture source is opened with.
#[derive(Debug, Clone)]
pub struct CaptureSpec {
    pub sample_rate: u32,
    pub channels: u16,
    /// Preferred frames per hardware callback; backends may deliver
    /// differently sized chunks, which the worker's accumulator absorbs.
    pub chunk_size: usize,
}

/// Receives one copied mono chunk per hardware callback. Must never block.
pub type ChunkSink = Box<dyn FnMut(Vec<f64>) + Send>;

/// A capture backend driven on a dedicated thread.
///
/// `capture` opens the device, signals the open outcome on `ready` exactly
/// once before delivering any chunk, then streams into `sink` until `stop`
/// is set. Open failure is reported through `ready` as `Error::Device`.
pub trait CaptureSource: Send {
    fn capture(
        &mut self,
        spec: &CaptureSpec,
        sink: ChunkSink,
        stop: Arc<AtomicBool>,
        ready: Sender<Result<(), Error>>,
    );
}

/// Microphone capture via cpal.
pub struct CpalSource {
    device_name: Option<String>,
}

impl CpalSource {
    /// Use the host's default input device.
    pub fn default_device() -> Self {
        Self { device_name: None }
    }

    /// Use the input device whose name contains `name`.
    pub fn by_name(name: impl Into<String>) -> Self {
        Self {
            device_name: Some(name.into()),
        }
    }

    fn open_device(&self) -> Result<cpal::Device, Error> {
        let host = cpal::default_host();
        match &self.device_name {
            None => host
                .default_input_device()
                .ok_or_else(|| Error::Device("no default input device".into())),
            Some(name) => host
                .input_devices()
                .map_err(|e| Error::Device(e.to_string()))?
                .find(|d| {
                    d.name()
                        .map(|n| n.to_lowercase().contains(&name.to_lowercase()))
                        .unwrap_or(false)
                })
                .ok_or_else(|| Error::Device(format!("no input device matching '{name}'"))),
        }
    }

    fn build_stream(
        device: &cpal::Device,
        spec: &CaptureSpec,
        mut sink: ChunkSink,
    ) -> Result<cpal::Stream, Error> {
        let supported = device
            .default_input_config()
            .map_err(|e| Error::Device(format!("no supported input config: {e}")))?;

        let config = StreamConfig {
            channels: spec.channels,
            sample_rate: cpal::SampleRate(spec.sample_rate),
            buffer_size: cpal::BufferSize::Fixed(spec.chunk_size as u32),
        };

        let channels = spec.channels as usize;
        let err_fn = |err: cpal::StreamError| {
            // Backend status flags (under/overruns and the like) are
            // logged, never treated as fatal here.
            warn!("audio stream reported: {err}");
        };

        let stream = match supported.sample_format() {
            SampleFormat::F32 => device
                .build_input_stream(
                    &config,
                    move |data: &[f32], _: &cpal::InputCallbackInfo| {
                        sink(downmix_f32(data, channels));
                    },
                    err_fn,
                    None,
                )
                .map_err(|e| Error::Device(e.to_string()))?,
            SampleFormat::I16 => device
                .build_input_stream(
                    &config,
                    move |data: &[i16], _: &cpal::InputCallbackInfo| {
                        sink(downmix_i16(data, channels));
                    },
                    err_fn,
                    None,
                )
                .map_err(|e| Error::Device(e.to_string()))?,
            SampleFormat::U16 => device
                .build_input_stream(
                    &config,
                    move |data: &[u16], _: &cpal::InputCallbackInfo| {
                        sink(downmix_u16(data, channels));
                    },
                    err_fn,
                    None,
                )
                .map_err(|e| Error::Device(e.to_string()))?,
            other => {
                return Err(Error::Device(format!("unsupported sample format: {other}")))
            }
        };

        Ok(stream)
    }
}

impl CaptureSource for CpalSource {
    fn capture(
        &mut self,
        spec: &CaptureSpec,
        sink: ChunkSink,
        stop: Arc<AtomicBool>,
        ready: Sender<Result<(), Error>>,
    ) {
        // The stream must be created and kept alive on this thread, so the
        // open outcome is reported back through the ready handshake.
        let stream = match self
            .open_device()
            .and_then(|device| {
                let name = device.name().unwrap_or_else(|_| "unknown".into());
                info!(
                    "opening input device '{name}' at {} Hz, {} channel(s)",
                    spec.sample_rate, spec.channels
                );
                Self::build_stream(&device, spec, sink)
            })
            .and_then(|stream| {
                stream
                    .play()
                    .map_err(|e| Error::Device(e.to_string()))?;
                Ok(stream)
            }) {
            Ok(stream) => {
                let _ = ready.send(Ok(()));
                stream
            }
            Err(e) => {
                let _ = ready.send(Err(e));
                return;
            }
        };

        while !stop.load(Ordering::SeqCst) {
            std::thread::sleep(Duration::from_millis(50));
        }
        drop(stream);
    }
}

fn downmix_f32(data: &[f32], channels: usize) -> Vec<f64> {
    data.chunks_exact(channels)
        .map(|frame| frame.iter().map(|&s| s as f64).sum::<f64>() / channels as f64)
        .collect()
}

fn downmix_i16(data: &[i16], channels: usize) -> Vec<f64> {
    data.chunks_exact(channels)
        .map(|frame| {
            let sum: f64 = frame.iter().map(|&s| s as f64).sum();
            sum / channels as f64 / i16::MAX as f64
        })
        .collect()
}

fn downmix_u16(data: &[u16], channels: usize) -> Vec<f64> {
    let half = u16::MAX as f64 / 2.0;
    data.chunks_exact(channels)
        .map(|frame| {
            let avg: f64 = frame.iter().map(|&s| s as f64).sum::<f64>() / channels as f64;
            (avg - half) / half
        })
        .collect()
}

/// Description of one input device, for the CLI device listing.
#[derive(Debug, Clone)]
pub struct DeviceInfo {
    pub name: String,
    pub max_input_channels: u16,
    pub default_sample_rate: u32,
}

/// Enumerate input-capable devices on the default host.
pub fn list_input_devices() -> Result<Vec<DeviceInfo>, Error> {
    let host = cpal::default_host();
    let devices = host
        .input_devices()
        .map_err(|e| Error::Device(e.to_string()))?;

    let mut found = Vec::new();
    for device in devices {
        let name = device.name().unwrap_or_else(|_| "unknown".into());
        if let Ok(config) = device.default_input_config() {
            found.push(DeviceInfo {
                name,
                max_input_channels: config.channels(),
                default_sample_rate: config.sample_rate().0,
            });
        }
    }
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stereo_downmix_averages_frames() {
        let mono = downmix_f32(&[1.0, 0.0, -0.5, 0.5], 2);
        assert_eq!(mono, vec![0.5, 0.0]);
    }

    #[test]
    fn i16_downmix_normalizes_to_unit_range() {
        let mono = downmix_i16(&[i16::MAX, i16::MAX], 1);
        assert!(mono.iter().all(|&s| (s - 1.0).abs() < 1e-9));
    }

    #[test]
    fn u16_downmix_centers_around_zero() {
        let mid = (u16::MAX / 2) as u16;
        let mono = downmix_u16(&[mid, 0, u16::MAX], 1);
        assert!(mono[0].abs() < 1e-4);
        assert!((mono[1] + 1.0).abs() < 1e-9);
        assert!((mono[2] - 1.0).abs() < 1e-9);
    }
}
