use std::io::Cursor;
use std::sync::OnceLock;

use symphonia::core::audio::SampleBuffer as SymSampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::default::{get_codecs, get_probe};
use thiserror::Error;

pub const SUPPORTED_EXTS: &[&str] = &["wav", "mp3", "m4a", "ogg"];

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("unsupported or corrupt audio data: {0}")]
    Probe(SymphoniaError),
    #[error("no decodable audio track")]
    NoTrack,
    #[error("decoder init failed: {0}")]
    Codec(SymphoniaError),
    #[error("stream error while decoding: {0}")]
    Stream(SymphoniaError),
    #[error("unknown sample rate")]
    UnknownRate,
    #[error("no audio frames decoded")]
    NoFrames,
}

/// Per-channel float samples in [-1, 1] plus their sample rate. Decoded on
/// demand from an asset's bytes and cached by the session, never persisted.
#[derive(Clone, Debug, Default)]
pub struct SampleBuffer {
    pub channels: Vec<Vec<f32>>,
    pub sample_rate: u32,
}

impl SampleBuffer {
    pub fn frames(&self) -> usize {
        self.channels.first().map(|c| c.len()).unwrap_or(0)
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len().max(1)
    }

    pub fn duration_secs(&self) -> f32 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames() as f32 / self.sample_rate as f32
    }
}

fn io_trace_enabled() -> bool {
    static ENABLED: OnceLock<bool> = OnceLock::new();
    *ENABLED.get_or_init(|| {
        std::env::var("VOICETRIM_IO_TRACE")
            .ok()
            .map(|v| {
                let v = v.trim().to_ascii_lowercase();
                !(v.is_empty() || v == "0" || v == "false" || v == "off")
            })
            .unwrap_or(false)
    })
}

pub(crate) fn io_trace(event: &str, sample_rate: u32, channels: u16, frames: usize) {
    if !io_trace_enabled() {
        return;
    }
    eprintln!("io_trace event={event} sr={sample_rate} ch={channels} frames={frames}");
}

pub fn is_supported_extension(ext: &str) -> bool {
    SUPPORTED_EXTS.iter().any(|e| ext.eq_ignore_ascii_case(e))
}

/// Decode an in-memory audio blob of any enabled codec into per-channel float
/// samples. The symphonia format reader and decoder live only inside this
/// call, so the decoding context is released on every exit path.
pub fn decode_bytes(bytes: &[u8], ext_hint: Option<&str>) -> Result<SampleBuffer, DecodeError> {
    let mss = MediaSourceStream::new(Box::new(Cursor::new(bytes.to_vec())), Default::default());
    let mut hint = Hint::new();
    if let Some(ext) = ext_hint {
        hint.with_extension(ext);
    }
    let probed = get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(DecodeError::Probe)?;
    let mut format = probed.format;
    let track = format.default_track().ok_or(DecodeError::NoTrack)?.clone();
    let mut decoder = get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(DecodeError::Codec)?;
    let track_id = track.id;
    let mut sample_rate = track.codec_params.sample_rate.unwrap_or(0);
    let mut chans: Vec<Vec<f32>> = Vec::new();
    loop {
        let packet = match format.next_packet() {
            Ok(p) => p,
            Err(SymphoniaError::DecodeError(_)) => continue,
            Err(SymphoniaError::IoError(err))
                if err.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(err) => return Err(DecodeError::Stream(err)),
        };
        if packet.track_id() != track_id {
            continue;
        }
        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            Err(SymphoniaError::DecodeError(_)) => continue,
            Err(SymphoniaError::IoError(err))
                if err.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(err) => return Err(DecodeError::Stream(err)),
        };
        if sample_rate == 0 {
            sample_rate = decoded.spec().rate;
        }
        let channels = decoded.spec().channels.count().max(1);
        if chans.is_empty() {
            chans = vec![Vec::new(); channels];
        }
        let mut buf = SymSampleBuffer::<f32>::new(decoded.capacity() as u64, *decoded.spec());
        buf.copy_interleaved_ref(decoded);
        for frame in buf.samples().chunks(channels) {
            for (ci, &v) in frame.iter().enumerate() {
                chans[ci].push(if v.is_finite() { v } else { 0.0 });
            }
        }
    }
    if sample_rate == 0 {
        return Err(DecodeError::UnknownRate);
    }
    let frames = chans.first().map(|c| c.len()).unwrap_or(0);
    if frames == 0 {
        return Err(DecodeError::NoFrames);
    }
    io_trace("decode", sample_rate, chans.len() as u16, frames);
    Ok(SampleBuffer {
        channels: chans,
        sample_rate,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn garbage_bytes_fail_probe() {
        let err = decode_bytes(b"definitely not an audio container", None);
        assert!(matches!(err, Err(DecodeError::Probe(_))));
    }

    #[test]
    fn pcm16_wav_roundtrips_through_symphonia() {
        let mono: Vec<f32> = (0..400)
            .map(|i| ((i as f32) * 0.05).sin() * 0.8)
            .collect();
        let bytes = crate::clip::write_wav_pcm16(&[mono.clone()], 8_000);
        let decoded = decode_bytes(&bytes, Some("wav")).expect("decode own container");
        assert_eq!(decoded.sample_rate, 8_000);
        assert_eq!(decoded.channel_count(), 1);
        assert_eq!(decoded.frames(), mono.len());
        // symphonia rescales i16 by 1/32768 for both signs, so allow one
        // extra LSB over the quantizer's own bound
        for (a, b) in mono.iter().zip(decoded.channels[0].iter()) {
            assert!((a - b).abs() <= 2.0 / 32768.0, "{a} vs {b}");
        }
    }
}
