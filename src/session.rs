use std::sync::Arc;

use thiserror::Error;

use crate::audio_io::{self, DecodeError, SampleBuffer};
use crate::clip::{self, TrimError, TrimRegion};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("no audio loaded")]
    NoAsset,
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Trim(#[from] TrimError),
}

/// One loaded voice sample: the encoded bytes plus the metadata the UI needs
/// without re-decoding. Bytes are the source of truth; save writes them out
/// verbatim.
#[derive(Clone, Debug)]
pub struct AudioAsset {
    pub bytes: Vec<u8>,
    pub ext_hint: Option<String>,
    pub sample_rate: u32,
    pub duration_secs: f32,
    pub channel_count: usize,
}

impl AudioAsset {
    pub fn from_decoded(bytes: Vec<u8>, ext_hint: Option<String>, decoded: &SampleBuffer) -> Self {
        Self {
            bytes,
            ext_hint,
            sample_rate: decoded.sample_rate,
            duration_secs: decoded.duration_secs(),
            channel_count: decoded.channel_count(),
        }
    }
}

/// The edit state for the active asset. `generation` bumps on every adoption
/// so downstream caches (envelope, playback buffer) know when to rebuild.
#[derive(Default)]
pub struct EditSession {
    asset: Option<AudioAsset>,
    trim: TrimRegion,
    generation: u64,
    decoded: Option<Arc<SampleBuffer>>,
}

impl EditSession {
    pub fn asset(&self) -> Option<&AudioAsset> {
        self.asset.as_ref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn trim(&self) -> TrimRegion {
        self.trim
    }

    pub fn trim_mut(&mut self) -> &mut TrimRegion {
        &mut self.trim
    }

    pub fn duration_secs(&self) -> f32 {
        self.asset.as_ref().map(|a| a.duration_secs).unwrap_or(0.0)
    }

    /// Replace the active asset. The trim region resets to the full length
    /// and the previous decode cache is dropped.
    pub fn adopt(&mut self, asset: AudioAsset, decoded: Option<Arc<SampleBuffer>>) {
        self.trim = TrimRegion::full(asset.duration_secs);
        self.asset = Some(asset);
        self.decoded = decoded;
        self.generation = self.generation.wrapping_add(1);
    }

    /// Decoded samples for the active asset, decoding at most once per
    /// adoption.
    pub fn decoded(&mut self) -> Result<Arc<SampleBuffer>, SessionError> {
        if let Some(buf) = &self.decoded {
            return Ok(buf.clone());
        }
        let asset = self.asset.as_ref().ok_or(SessionError::NoAsset)?;
        let buf = Arc::new(audio_io::decode_bytes(
            &asset.bytes,
            asset.ext_hint.as_deref(),
        )?);
        self.decoded = Some(buf.clone());
        Ok(buf)
    }

    /// Cut the active asset down to the trim region and adopt the result as
    /// the new asset. On any error the asset, region, and generation are left
    /// exactly as they were.
    pub fn apply_trim(&mut self) -> Result<(), SessionError> {
        let decoded = self.decoded()?;
        let region = self.trim;
        let sliced = clip::slice_channels(&decoded.channels, decoded.sample_rate, region)?;
        let bytes = clip::write_wav_pcm16(&sliced, decoded.sample_rate);
        let new_buf = Arc::new(SampleBuffer {
            channels: sliced,
            sample_rate: decoded.sample_rate,
        });
        let asset = AudioAsset::from_decoded(bytes, Some("wav".into()), &new_buf);
        self.adopt(asset, Some(new_buf));
        Ok(())
    }
}
