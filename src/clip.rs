use thiserror::Error;

/// Minimum distance between the trim boundaries, in seconds.
pub const MIN_GAP_SECS: f32 = 0.1;

/// Size of the RIFF/WAVE header emitted by [`write_wav_pcm16`].
pub const WAV_HEADER_LEN: usize = 44;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TrimError {
    #[error("trim end must be after trim start")]
    InvalidRange,
    #[error("trim range rounds down to zero samples")]
    EmptyRange,
}

/// Trim boundaries in seconds relative to the start of the active sample.
///
/// Invariant: `0 <= start_secs` and `start_secs + MIN_GAP_SECS <= end_secs`,
/// maintained by the drag operations below. The slicer re-validates anyway so
/// a region built by hand cannot corrupt an asset.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrimRegion {
    pub start_secs: f32,
    pub end_secs: f32,
}

impl Default for TrimRegion {
    fn default() -> Self {
        Self::full(0.0)
    }
}

impl TrimRegion {
    pub fn full(duration_secs: f32) -> Self {
        Self {
            start_secs: 0.0,
            end_secs: duration_secs.max(0.0),
        }
    }

    /// Move the start boundary toward `candidate`, clamped to
    /// `[0, end - MIN_GAP_SECS]`.
    pub fn drag_start_to(&mut self, candidate: f32) {
        let hi = (self.end_secs - MIN_GAP_SECS).max(0.0);
        self.start_secs = candidate.clamp(0.0, hi);
    }

    /// Move the end boundary toward `candidate`, clamped to
    /// `[start + MIN_GAP_SECS, duration]`.
    pub fn drag_end_to(&mut self, candidate: f32, duration_secs: f32) {
        let lo = self.start_secs + MIN_GAP_SECS;
        let hi = duration_secs.max(lo);
        self.end_secs = candidate.clamp(lo, hi);
    }

    pub fn len_secs(&self) -> f32 {
        (self.end_secs - self.start_secs).max(0.0)
    }
}

/// Map a pointer x offset inside the waveform surface to a [0, 1] ratio.
/// Mouse and touch both go through here; out-of-surface positions clamp.
pub fn pointer_ratio(x: f32, width: f32) -> f32 {
    if width <= 0.0 || !x.is_finite() {
        return 0.0;
    }
    (x / width).clamp(0.0, 1.0)
}

/// Cut every channel to `[floor(start*sr), floor(end*sr))`.
pub fn slice_channels(
    channels: &[Vec<f32>],
    sample_rate: u32,
    region: TrimRegion,
) -> Result<Vec<Vec<f32>>, TrimError> {
    if region.end_secs <= region.start_secs {
        return Err(TrimError::InvalidRange);
    }
    let start = (region.start_secs as f64 * sample_rate as f64).floor() as usize;
    let end = (region.end_secs as f64 * sample_rate as f64).floor() as usize;
    if end <= start {
        return Err(TrimError::EmptyRange);
    }
    Ok(channels
        .iter()
        .map(|c| {
            let s = start.min(c.len());
            let e = end.min(c.len());
            c[s..e].to_vec()
        })
        .collect())
}

/// 16-bit quantizer: clamp to [-1, 1], scale positives by 32767 and negatives
/// by 32768, round half away from zero.
pub fn quantize_i16(v: f32) -> i16 {
    let s = if v.is_finite() { v.clamp(-1.0, 1.0) } else { 0.0 };
    let scaled = if s >= 0.0 { s * 32767.0 } else { s * 32768.0 };
    scaled.round() as i16
}

/// Serialize multichannel float samples into the canonical container: a
/// 44-byte RIFF/WAVE header (linear PCM, 16-bit LE) followed by interleaved
/// samples. This is the only WAV serializer in the crate; the recorder
/// transcoder reuses it.
pub fn write_wav_pcm16(channels: &[Vec<f32>], sample_rate: u32) -> Vec<u8> {
    let ch = channels.len().max(1) as u16;
    let frames = channels.iter().map(|c| c.len()).min().unwrap_or(0);
    let block_align = ch * 2;
    let byte_rate = sample_rate * block_align as u32;
    let data_len = frames * block_align as usize;
    let mut out = Vec::with_capacity(WAV_HEADER_LEN + data_len);
    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&((36 + data_len) as u32).to_le_bytes());
    out.extend_from_slice(b"WAVE");
    out.extend_from_slice(b"fmt ");
    out.extend_from_slice(&16u32.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes()); // format tag: linear PCM
    out.extend_from_slice(&ch.to_le_bytes());
    out.extend_from_slice(&sample_rate.to_le_bytes());
    out.extend_from_slice(&byte_rate.to_le_bytes());
    out.extend_from_slice(&block_align.to_le_bytes());
    out.extend_from_slice(&16u16.to_le_bytes());
    out.extend_from_slice(b"data");
    out.extend_from_slice(&(data_len as u32).to_le_bytes());
    for i in 0..frames {
        for c in channels {
            out.extend_from_slice(&quantize_i16(c[i]).to_le_bytes());
        }
    }
    out
}

/// Slice at the region boundaries and encode the result. Validation failures
/// happen before any byte is produced, so the caller's asset and region stay
/// untouched on error.
pub fn trim_to_wav(
    channels: &[Vec<f32>],
    sample_rate: u32,
    region: TrimRegion,
) -> Result<Vec<u8>, TrimError> {
    let sliced = slice_channels(channels, sample_rate, region)?;
    Ok(write_wav_pcm16(&sliced, sample_rate))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantize_hits_integer_bounds() {
        assert_eq!(quantize_i16(1.0), 32767);
        assert_eq!(quantize_i16(-1.0), -32768);
        assert_eq!(quantize_i16(0.0), 0);
        assert_eq!(quantize_i16(2.5), 32767);
        assert_eq!(quantize_i16(-2.5), -32768);
        assert_eq!(quantize_i16(f32::NAN), 0);
    }

    #[test]
    fn header_fields_are_little_endian_pcm16() {
        let bytes = write_wav_pcm16(&[vec![0.0f32; 8], vec![0.0f32; 8]], 44_100);
        assert_eq!(&bytes[0..4], b"RIFF");
        assert_eq!(&bytes[8..12], b"WAVE");
        assert_eq!(&bytes[12..16], b"fmt ");
        assert_eq!(u16::from_le_bytes([bytes[20], bytes[21]]), 1); // PCM
        assert_eq!(u16::from_le_bytes([bytes[22], bytes[23]]), 2); // channels
        assert_eq!(
            u32::from_le_bytes([bytes[24], bytes[25], bytes[26], bytes[27]]),
            44_100
        );
        assert_eq!(
            u32::from_le_bytes([bytes[28], bytes[29], bytes[30], bytes[31]]),
            44_100 * 2 * 2
        );
        assert_eq!(u16::from_le_bytes([bytes[32], bytes[33]]), 4); // block align
        assert_eq!(u16::from_le_bytes([bytes[34], bytes[35]]), 16); // bits
        assert_eq!(&bytes[36..40], b"data");
        assert_eq!(
            u32::from_le_bytes([bytes[40], bytes[41], bytes[42], bytes[43]]),
            8 * 2 * 2
        );
        assert_eq!(bytes.len(), WAV_HEADER_LEN + 8 * 2 * 2);
    }

    #[test]
    fn slice_rejects_inverted_region() {
        let chans = vec![vec![0.1f32; 100]];
        let region = TrimRegion {
            start_secs: 2.0,
            end_secs: 2.0,
        };
        assert_eq!(
            slice_channels(&chans, 10, region),
            Err(TrimError::InvalidRange)
        );
    }

    #[test]
    fn slice_rejects_subsample_region() {
        let chans = vec![vec![0.1f32; 10]];
        let region = TrimRegion {
            start_secs: 0.2,
            end_secs: 0.9,
        };
        // floor(0.9*1) - floor(0.2*1) == 0
        assert_eq!(
            slice_channels(&chans, 1, region),
            Err(TrimError::EmptyRange)
        );
    }

    #[test]
    fn drag_start_clamps_against_end_gap() {
        let mut region = TrimRegion {
            start_secs: 1.0,
            end_secs: 3.0,
        };
        region.drag_start_to(3.5);
        assert!((region.start_secs - 2.9).abs() < 1e-6);
        region.drag_start_to(-5.0);
        assert_eq!(region.start_secs, 0.0);
    }

    #[test]
    fn drag_end_clamps_into_duration() {
        let mut region = TrimRegion {
            start_secs: 1.0,
            end_secs: 2.0,
        };
        region.drag_end_to(99.0, 5.0);
        assert_eq!(region.end_secs, 5.0);
        region.drag_end_to(0.0, 5.0);
        assert!((region.end_secs - 1.1).abs() < 1e-6);
    }
}
