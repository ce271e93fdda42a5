use std::sync::Arc;

use anyhow::{Context, Result};
use arc_swap::ArcSwapOption;
use atomic_float::AtomicF32;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

#[derive(Debug)]
pub struct AudioBuffer {
    pub channels: Vec<Vec<f32>>, // per-channel samples in [-1, 1]
}

impl AudioBuffer {
    pub fn from_channels(channels: Vec<Vec<f32>>) -> Self {
        if channels.is_empty() {
            Self {
                channels: vec![Vec::new()],
            }
        } else {
            Self { channels }
        }
    }

    pub fn len(&self) -> usize {
        self.channels.first().map(|c| c.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len().max(1)
    }
}

pub struct SharedAudio {
    pub samples: ArcSwapOption<AudioBuffer>,
    pub vol: AtomicF32, // 0.0..1.0 linear gain
    pub playing: std::sync::atomic::AtomicBool,
    pub play_pos: std::sync::atomic::AtomicUsize,
    pub meter_rms: AtomicF32,
    pub out_sample_rate: u32,
}

/// Output side of the audio path. The playback cursor reads `play_pos`; the
/// app swaps whole buffers on asset adoption, which also drops the previous
/// buffer's handle.
pub struct AudioEngine {
    _stream: Option<cpal::Stream>,
    pub shared: Arc<SharedAudio>,
}

impl AudioEngine {
    fn new_shared(out_sample_rate: u32) -> Arc<SharedAudio> {
        Arc::new(SharedAudio {
            samples: ArcSwapOption::from(None),
            vol: AtomicF32::new(1.0),
            playing: std::sync::atomic::AtomicBool::new(false),
            play_pos: std::sync::atomic::AtomicUsize::new(0),
            meter_rms: AtomicF32::new(0.0),
            out_sample_rate,
        })
    }

    pub fn new() -> Result<Self> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .context("No default output device")?;
        let cfg = device
            .default_output_config()
            .context("No default output config")?;

        let shared = Self::new_shared(cfg.sample_rate());

        let stream = match cfg.sample_format() {
            cpal::SampleFormat::F32 => {
                Self::build_stream::<f32>(&device, &cfg.into(), shared.clone())?
            }
            cpal::SampleFormat::I16 => {
                Self::build_stream::<i16>(&device, &cfg.into(), shared.clone())?
            }
            cpal::SampleFormat::U16 => {
                Self::build_stream::<u16>(&device, &cfg.into(), shared.clone())?
            }
            _ => anyhow::bail!("Unsupported sample format"),
        };

        Ok(Self {
            _stream: Some(stream),
            shared,
        })
    }

    /// Engine with no device attached; playback calls become no-ops but the
    /// rest of the app (trim, encode, save) keeps working.
    pub fn new_detached() -> Self {
        let shared = Self::new_shared(48_000);
        Self {
            _stream: None,
            shared,
        }
    }

    fn build_stream<T>(
        device: &cpal::Device,
        cfg: &cpal::StreamConfig,
        shared: Arc<SharedAudio>,
    ) -> Result<cpal::Stream>
    where
        T: cpal::SizedSample + cpal::FromSample<f32>,
    {
        use std::sync::atomic::Ordering;
        let channels = cfg.channels as usize;
        let err_fn = |e| eprintln!("cpal stream error: {e}");
        let stream = device.build_output_stream(
            cfg,
            move |data: &mut [T], _| {
                let mut sum_sq = 0.0f32;
                let mut n = 0usize;
                let maybe_samples = shared.samples.load();
                let playing = shared.playing.load(Ordering::Relaxed);
                let vol = shared.vol.load(Ordering::Relaxed);
                let silence = |frame: &mut [T]| {
                    for ch in frame.iter_mut() {
                        *ch = T::from_sample(0.0);
                    }
                };
                match maybe_samples.as_ref() {
                    Some(samples) if playing && samples.len() > 0 => {
                        let len = samples.len();
                        let src_channels = samples.channel_count();
                        let mut pos = shared.play_pos.load(Ordering::Relaxed);
                        for frame in data.chunks_mut(channels) {
                            if pos >= len {
                                shared.playing.store(false, Ordering::Relaxed);
                                silence(frame);
                                continue;
                            }
                            let mut frame_sum = 0.0f32;
                            for (out_ch, out_sample) in frame.iter_mut().enumerate() {
                                let src_ch = if src_channels == 1 {
                                    0
                                } else if out_ch < src_channels {
                                    out_ch
                                } else {
                                    src_channels - 1
                                };
                                let raw = samples
                                    .channels
                                    .get(src_ch)
                                    .and_then(|c| c.get(pos))
                                    .copied()
                                    .unwrap_or(0.0);
                                let s = (raw * vol).clamp(-1.0, 1.0);
                                frame_sum += s;
                                *out_sample = T::from_sample(s);
                            }
                            let frame_avg = frame_sum / channels as f32;
                            sum_sq += frame_avg * frame_avg;
                            n += 1;
                            pos += 1;
                        }
                        shared.play_pos.store(pos.min(len), Ordering::Relaxed);
                    }
                    _ => {
                        for frame in data.chunks_mut(channels) {
                            silence(frame);
                        }
                    }
                }
                let rms = if n > 0 {
                    (sum_sq / n as f32).sqrt()
                } else {
                    0.0
                };
                shared.meter_rms.store(rms, Ordering::Relaxed);
            },
            err_fn,
            None,
        )?;
        stream.play()?;
        Ok(stream)
    }

    pub fn set_samples(&self, samples: Arc<AudioBuffer>) {
        self.shared.samples.store(Some(samples));
        self.shared
            .play_pos
            .store(0, std::sync::atomic::Ordering::Relaxed);
    }

    pub fn set_volume(&self, v: f32) {
        self.shared
            .vol
            .store(v.clamp(0.0, 1.0), std::sync::atomic::Ordering::Relaxed);
    }

    pub fn is_playing(&self) -> bool {
        self.shared
            .playing
            .load(std::sync::atomic::Ordering::Relaxed)
    }

    pub fn toggle_play(&self) {
        if self.is_playing() {
            self.stop();
        } else {
            self.play();
        }
    }

    pub fn play(&self) {
        let Some(samples) = self.shared.samples.load_full() else {
            return;
        };
        // rewind when starting from the end
        let pos = self
            .shared
            .play_pos
            .load(std::sync::atomic::Ordering::Relaxed);
        if pos >= samples.len() {
            self.shared
                .play_pos
                .store(0, std::sync::atomic::Ordering::Relaxed);
        }
        self.shared
            .playing
            .store(true, std::sync::atomic::Ordering::Relaxed);
    }

    pub fn stop(&self) {
        self.shared
            .playing
            .store(false, std::sync::atomic::Ordering::Relaxed);
    }

    pub fn seek_to_sample(&self, pos: usize) {
        if let Some(buf) = self.shared.samples.load().as_ref() {
            let p = pos.min(buf.len());
            self.shared
                .play_pos
                .store(p, std::sync::atomic::Ordering::Relaxed);
        }
    }

    pub fn play_pos(&self) -> usize {
        self.shared
            .play_pos
            .load(std::sync::atomic::Ordering::Relaxed)
    }
}
