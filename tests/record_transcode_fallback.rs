use voicetrim::record::{self, RawCapture, TRANSCODE_SAMPLE_RATE};

fn capture_tone(sr: u32, channels: u16, secs: f32) -> RawCapture {
    let frames = (sr as f32 * secs) as usize;
    let mut interleaved = Vec::with_capacity(frames * channels as usize);
    for i in 0..frames {
        let t = i as f32 / sr as f32;
        let v = (t * 220.0 * std::f32::consts::TAU).sin() * 0.4;
        for _ in 0..channels {
            interleaved.push(v);
        }
    }
    RawCapture {
        interleaved,
        channels,
        sample_rate: sr,
        format: cpal::SampleFormat::F32,
    }
}

#[test]
fn capture_blob_is_float_wav_at_device_rate() {
    let raw = capture_tone(48_000, 2, 0.2);
    let blob = raw.to_blob().expect("serialize");
    let reader = hound::WavReader::new(std::io::Cursor::new(blob)).expect("parse blob");
    let spec = reader.spec();
    assert_eq!(spec.sample_rate, 48_000);
    assert_eq!(spec.channels, 2);
    assert_eq!(spec.bits_per_sample, 32);
    assert_eq!(spec.sample_format, hound::SampleFormat::Float);
    assert_eq!(reader.len() as usize, raw.interleaved.len());
}

#[test]
fn transcode_produces_sixteen_khz_pcm16() {
    let raw = capture_tone(48_000, 2, 0.5);
    let blob = raw.to_blob().expect("serialize");
    let outcome = record::transcode_capture(blob, &raw, TRANSCODE_SAMPLE_RATE);
    assert!(!outcome.fallback);
    assert_eq!(outcome.sample_rate, 16_000);
    assert_eq!(outcome.channel_count, 2);
    assert!((outcome.duration_secs - 0.5).abs() < 0.01);
    let reader =
        hound::WavReader::new(std::io::Cursor::new(outcome.blob)).expect("parse output");
    let spec = reader.spec();
    assert_eq!(spec.sample_rate, 16_000);
    assert_eq!(spec.bits_per_sample, 16);
    assert_eq!(spec.sample_format, hound::SampleFormat::Int);
    assert_eq!(spec.channels, 2);
}

#[test]
fn transcode_honors_a_custom_target_rate() {
    let raw = capture_tone(44_100, 1, 0.25);
    let blob = raw.to_blob().expect("serialize");
    let outcome = record::transcode_capture(blob, &raw, 22_050);
    assert!(!outcome.fallback);
    assert_eq!(outcome.sample_rate, 22_050);
    let reader =
        hound::WavReader::new(std::io::Cursor::new(outcome.blob)).expect("parse output");
    assert_eq!(reader.spec().sample_rate, 22_050);
}

#[test]
fn broken_blob_survives_as_a_byte_identical_fallback() {
    let raw = capture_tone(48_000, 1, 0.1);
    let blob = vec![0xde, 0xad, 0xbe, 0xef, 0x00, 0x01, 0x02, 0x03];
    let outcome = record::transcode_capture(blob.clone(), &raw, TRANSCODE_SAMPLE_RATE);
    assert!(outcome.fallback);
    assert_eq!(outcome.blob, blob);
    assert_eq!(outcome.sample_rate, 48_000);
    assert_eq!(outcome.channel_count, 1);
    assert!((outcome.duration_secs - 0.1).abs() < 0.01);
}

#[test]
fn transcoded_recording_feeds_back_into_the_editor() {
    let raw = capture_tone(48_000, 1, 0.3);
    let blob = raw.to_blob().expect("serialize");
    let outcome = record::transcode_capture(blob, &raw, TRANSCODE_SAMPLE_RATE);
    let decoded =
        voicetrim::audio_io::decode_bytes(&outcome.blob, Some("wav")).expect("decode output");
    assert_eq!(decoded.sample_rate, 16_000);
    assert_eq!(decoded.channel_count(), 1);
    assert!((decoded.duration_secs() - 0.3).abs() < 0.01);
}
