use std::io::Cursor;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use anyhow::{Context, Result};
use atomic_float::AtomicF32;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample};
use thiserror::Error;

use crate::audio_io::{self, DecodeError};
use crate::clip;
use crate::wave;

/// Normalization target for recordings, matching what the cloning service
/// ingests.
pub const TRANSCODE_SAMPLE_RATE: u32 = 16_000;

/// Capture formats in preference order, probed once when a session starts.
/// Uncompressed float first, integer formats as fallbacks.
const CAPTURE_FORMAT_PREFERENCE: &[cpal::SampleFormat] = &[
    cpal::SampleFormat::F32,
    cpal::SampleFormat::I16,
    cpal::SampleFormat::U16,
];

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("no input device available")]
    NoDevice,
    #[error("no supported capture format on this device")]
    NoSupportedFormat,
    #[error("could not enumerate input configs: {0}")]
    Configs(#[from] cpal::SupportedStreamConfigsError),
    #[error("could not open input stream: {0}")]
    Build(#[from] cpal::BuildStreamError),
    #[error("could not start input stream: {0}")]
    Play(#[from] cpal::PlayStreamError),
}

#[derive(Debug, Error)]
pub enum TranscodeError {
    #[error("capture produced no audio")]
    EmptyCapture,
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

/// Everything the input stream wrote before stop: interleaved f32 chunks at
/// the device's native rate, concatenated on stop.
pub struct RawCapture {
    pub interleaved: Vec<f32>,
    pub channels: u16,
    pub sample_rate: u32,
    pub format: cpal::SampleFormat,
}

impl RawCapture {
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            return 0;
        }
        self.interleaved.len() / self.channels as usize
    }

    /// Serialize the capture as recorded: 32-bit float WAV at the device
    /// rate. This blob is what the transcode pipeline consumes, and what
    /// gets emitted untouched when that pipeline fails.
    pub fn to_blob(&self) -> Result<Vec<u8>> {
        let spec = hound::WavSpec {
            channels: self.channels.max(1),
            sample_rate: self.sample_rate.max(1),
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        };
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer =
                hound::WavWriter::new(&mut cursor, spec).context("open capture writer")?;
            for &v in &self.interleaved {
                writer
                    .write_sample(v.clamp(-1.0, 1.0))
                    .context("write capture sample")?;
            }
            writer.finalize().context("finalize capture blob")?;
        }
        Ok(cursor.into_inner())
    }
}

struct CaptureShared {
    chunks: Mutex<Vec<Vec<f32>>>,
    peak: AtomicF32,
}

/// A live microphone session. Dropping it (or calling [`Recorder::stop`])
/// tears the input stream down.
pub struct Recorder {
    _stream: cpal::Stream,
    shared: Arc<CaptureShared>,
    channels: u16,
    sample_rate: u32,
    format: cpal::SampleFormat,
    started_at: Instant,
}

impl Recorder {
    pub fn start() -> Result<Self, CaptureError> {
        let host = cpal::default_host();
        let device = host.default_input_device().ok_or(CaptureError::NoDevice)?;
        let (format, config) = pick_capture_config(&device)?;
        let shared = Arc::new(CaptureShared {
            chunks: Mutex::new(Vec::new()),
            peak: AtomicF32::new(0.0),
        });
        let stream = match format {
            cpal::SampleFormat::F32 => build_capture_stream::<f32>(&device, &config, &shared)?,
            cpal::SampleFormat::I16 => build_capture_stream::<i16>(&device, &config, &shared)?,
            cpal::SampleFormat::U16 => build_capture_stream::<u16>(&device, &config, &shared)?,
            _ => return Err(CaptureError::NoSupportedFormat),
        };
        stream.play()?;
        audio_io::io_trace("capture_start", config.sample_rate, config.channels, 0);
        Ok(Self {
            _stream: stream,
            shared,
            channels: config.channels,
            sample_rate: config.sample_rate,
            format,
            started_at: Instant::now(),
        })
    }

    pub fn elapsed_secs(&self) -> f32 {
        self.started_at.elapsed().as_secs_f32()
    }

    /// Peak absolute level since the last read, for the input meter.
    pub fn take_peak(&self) -> f32 {
        self.shared
            .peak
            .swap(0.0, std::sync::atomic::Ordering::Relaxed)
    }

    pub fn stop(self) -> RawCapture {
        let chunks = {
            let mut guard = self
                .shared
                .chunks
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            std::mem::take(&mut *guard)
        };
        let total: usize = chunks.iter().map(|c| c.len()).sum();
        let mut interleaved = Vec::with_capacity(total);
        for chunk in chunks {
            interleaved.extend_from_slice(&chunk);
        }
        audio_io::io_trace(
            "capture_stop",
            self.sample_rate,
            self.channels,
            total / self.channels.max(1) as usize,
        );
        RawCapture {
            interleaved,
            channels: self.channels,
            sample_rate: self.sample_rate,
            format: self.format,
        }
    }
}

fn pick_capture_config(
    device: &cpal::Device,
) -> Result<(cpal::SampleFormat, cpal::StreamConfig), CaptureError> {
    let ranges: Vec<_> = device.supported_input_configs()?.collect();
    for &wanted in CAPTURE_FORMAT_PREFERENCE {
        if let Some(range) = ranges.iter().find(|r| r.sample_format() == wanted) {
            let supported = range.clone().with_max_sample_rate();
            return Ok((wanted, supported.into()));
        }
    }
    Err(CaptureError::NoSupportedFormat)
}

fn build_capture_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    shared: &Arc<CaptureShared>,
) -> Result<cpal::Stream, CaptureError>
where
    T: cpal::SizedSample,
    f32: FromSample<T>,
{
    let shared = shared.clone();
    let err_fn = |e| eprintln!("cpal input error: {e}");
    let stream = device.build_input_stream(
        config,
        move |data: &[T], _: &cpal::InputCallbackInfo| {
            let mut chunk = Vec::with_capacity(data.len());
            let mut peak = 0.0f32;
            for &s in data {
                let v = f32::from_sample(s);
                peak = peak.max(v.abs());
                chunk.push(v);
            }
            let prev = shared.peak.load(std::sync::atomic::Ordering::Relaxed);
            if peak > prev {
                shared
                    .peak
                    .store(peak, std::sync::atomic::Ordering::Relaxed);
            }
            if let Ok(mut guard) = shared.chunks.lock() {
                guard.push(chunk);
            }
        },
        err_fn,
        None,
    )?;
    Ok(stream)
}

/// Result of post-record normalization. `fallback` marks a blob that skipped
/// the pipeline because a stage failed.
pub struct RecordingOutcome {
    pub blob: Vec<u8>,
    pub sample_rate: u32,
    pub channel_count: u16,
    pub duration_secs: f32,
    pub fallback: bool,
}

/// Normalize a capture blob: decode, resample to `target_sr`, requantize to
/// 16-bit via the canonical container writer. Any stage failure hands the
/// original blob back untouched, tagged as a fallback; a recording is never
/// discarded over a format problem.
pub fn transcode_capture(blob: Vec<u8>, raw: &RawCapture, target_sr: u32) -> RecordingOutcome {
    match transcode_inner(&blob, target_sr) {
        Ok(outcome) => outcome,
        Err(err) => {
            eprintln!("recording transcode failed, keeping raw capture: {err}");
            let duration_secs = if raw.sample_rate > 0 {
                raw.frames() as f32 / raw.sample_rate as f32
            } else {
                0.0
            };
            RecordingOutcome {
                blob,
                sample_rate: raw.sample_rate,
                channel_count: raw.channels,
                duration_secs,
                fallback: true,
            }
        }
    }
}

fn transcode_inner(blob: &[u8], target_sr: u32) -> Result<RecordingOutcome, TranscodeError> {
    let decoded = audio_io::decode_bytes(blob, Some("wav"))?;
    if decoded.frames() == 0 {
        return Err(TranscodeError::EmptyCapture);
    }
    let target_sr = target_sr.max(1);
    let channels = wave::resample_channels(&decoded.channels, decoded.sample_rate, target_sr);
    let frames = channels.first().map(|c| c.len()).unwrap_or(0);
    let bytes = clip::write_wav_pcm16(&channels, target_sr);
    audio_io::io_trace("transcode", target_sr, channels.len() as u16, frames);
    Ok(RecordingOutcome {
        blob: bytes,
        sample_rate: target_sr,
        channel_count: channels.len() as u16,
        duration_secs: frames as f32 / target_sr as f32,
        fallback: false,
    })
}
