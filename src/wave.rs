/// Downsample one channel into `buckets` mean-absolute-amplitude values,
/// normalized by the loudest bucket. A silent input stays all-zero; the
/// normalizer never divides by zero.
pub fn build_envelope(out: &mut Vec<f32>, samples: &[f32], buckets: usize) {
    out.clear();
    if samples.is_empty() || buckets == 0 {
        return;
    }
    let len = samples.len();
    let step = (len as f32 / buckets as f32).max(1.0);
    let mut pos = 0.0f32;
    for _ in 0..buckets {
        let start = pos as usize;
        let end = ((pos + step) as usize).min(len);
        if start >= end {
            out.push(0.0);
        } else {
            let mut acc = 0.0f32;
            for &v in &samples[start..end] {
                if v.is_finite() {
                    acc += v.abs();
                }
            }
            out.push(acc / (end - start) as f32);
        }
        pos += step;
        if (pos as usize) >= len {
            break;
        }
    }
    let max = out.iter().copied().fold(0.0f32, f32::max);
    if max > 0.0 {
        for v in out.iter_mut() {
            *v /= max;
        }
    }
}

/// Linear-interpolation resampler, good enough for playback prep and the
/// 16 kHz transcode target.
pub fn resample_linear(samples: &[f32], in_sr: u32, out_sr: u32) -> Vec<f32> {
    if in_sr == out_sr || samples.is_empty() {
        return samples.to_vec();
    }
    if in_sr == 0 || out_sr == 0 {
        return samples.to_vec();
    }
    let ratio = out_sr as f64 / in_sr as f64;
    let out_len = ((samples.len() as f64) * ratio).ceil() as usize;
    if out_len == 0 {
        return Vec::new();
    }
    let mut out = Vec::with_capacity(out_len);
    let len = samples.len();
    for i in 0..out_len {
        let src_pos = (i as f64) / ratio;
        let i0 = src_pos.floor() as usize;
        if i0 >= len {
            out.push(samples[len - 1]);
            continue;
        }
        let i1 = (i0 + 1).min(len.saturating_sub(1));
        let t = (src_pos - i0 as f64).clamp(0.0, 1.0) as f32;
        out.push(samples[i0] * (1.0 - t) + samples[i1] * t);
    }
    out
}

pub fn resample_channels(channels: &[Vec<f32>], in_sr: u32, out_sr: u32) -> Vec<Vec<f32>> {
    if in_sr == out_sr {
        return channels.to_vec();
    }
    channels
        .iter()
        .map(|c| resample_linear(c, in_sr, out_sr))
        .collect()
}
