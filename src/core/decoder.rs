// src/core/decoder.rs
//
// Audio decoding for the offline analysis path. Uses Symphonia for
// format-agnostic decoding; the detection engine itself only ever sees
// the (samples, sample_rate) pair this produces.

use std::fs::File;
use std::path::Path;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::error::{Error, Result};

/// Container for decoded audio data
#[derive(Debug, Clone)]
pub struct AudioData {
    /// Mono samples in [-1.0, 1.0]
    pub samples: Vec<f64>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Channel count of the source file (before the mono downmix)
    pub channels: usize,
    /// Duration in seconds
    pub duration_secs: f64,
    /// Codec name as reported by the decoder
    pub codec_name: String,
}

/// Decode an audio file to mono floating-point samples.
///
/// Multi-channel input is downmixed by averaging channels. Any probe or
/// codec failure is reported as `Error::Decode` and propagated directly;
/// there is no background thread to isolate the offline path from.
pub fn decode_audio(path: &Path) -> Result<AudioData> {
    let file = File::open(path)
        .map_err(|e| Error::Decode(format!("failed to open {}: {e}", path.display())))?;

    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension() {
        hint.with_extension(ext.to_str().unwrap_or(""));
    }

    let meta_opts = MetadataOptions::default();
    let fmt_opts = FormatOptions::default();

    let mut probed = symphonia::default::get_probe()
        .format(&hint, mss, &fmt_opts, &meta_opts)
        .map_err(|e| Error::Decode(format!("unrecognized or corrupt format: {e}")))?;

    let track = probed
        .format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| Error::Decode("no supported audio track found".into()))?;

    let track_id = track.id;
    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or_else(|| Error::Decode("file does not specify a sample rate".into()))?;

    let channels = track.codec_params.channels.map(|c| c.count()).unwrap_or(1);
    if channels == 0 {
        return Err(Error::Decode("file reports 0 audio channels".into()));
    }

    let codec_name = format!("{:?}", track.codec_params.codec);

    let dec_opts = DecoderOptions::default();
    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &dec_opts)
        .map_err(|e| Error::Decode(format!("failed to create decoder: {e}")))?;

    let mut interleaved: Vec<f32> = Vec::new();
    let mut sample_buf: Option<SampleBuffer<f32>> = None;

    loop {
        let packet = match probed.format.next_packet() {
            Ok(packet) => packet,
            Err(symphonia::core::errors::Error::IoError(ref e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break
            }
            Err(symphonia::core::errors::Error::ResetRequired) => {
                decoder.reset();
                continue;
            }
            Err(e) => return Err(Error::Decode(e.to_string())),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(buf) => buf,
            // Isolated corrupt packets are skipped, not fatal
            Err(symphonia::core::errors::Error::DecodeError(_)) => continue,
            Err(e) => return Err(Error::Decode(e.to_string())),
        };

        if sample_buf.is_none() {
            let spec = *decoded.spec();
            let duration = decoded.capacity() as u64;
            sample_buf = Some(SampleBuffer::new(duration, spec));
        }

        if let Some(ref mut buf) = sample_buf {
            buf.copy_interleaved_ref(decoded);
            interleaved.extend_from_slice(buf.samples());
        }
    }

    if interleaved.is_empty() {
        return Err(Error::Decode("no audio samples decoded from file".into()));
    }

    let samples = downmix_mono(&interleaved, channels);
    let duration_secs = samples.len() as f64 / sample_rate as f64;

    Ok(AudioData {
        samples,
        sample_rate,
        channels,
        duration_secs,
        codec_name,
    })
}

/// Average interleaved frames down to a single mono channel.
fn downmix_mono(interleaved: &[f32], channels: usize) -> Vec<f64> {
    if channels == 1 {
        return interleaved.iter().map(|&s| s as f64).collect();
    }

    interleaved
        .chunks_exact(channels)
        .map(|frame| frame.iter().map(|&s| s as f64).sum::<f64>() / channels as f64)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn downmix_averages_channels() {
        let interleaved = vec![1.0, 0.0, 0.5, 0.5, -1.0, 1.0];
        let mono = downmix_mono(&interleaved, 2);
        assert_eq!(mono, vec![0.5, 0.5, 0.0]);
    }

    #[test]
    fn mono_passthrough_converts_to_f64() {
        let interleaved = vec![0.25f32, -0.25];
        let mono = downmix_mono(&interleaved, 1);
        assert_eq!(mono, vec![0.25, -0.25]);
    }

    #[test]
    fn missing_file_reports_decode_error() {
        let err = decode_audio(Path::new("/nonexistent/audio.wav")).unwrap_err();
        assert!(matches!(err, Error::Decode(_)));
    }
}
