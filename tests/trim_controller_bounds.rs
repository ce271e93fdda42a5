use std::sync::Arc;

use voicetrim::audio_io::SampleBuffer;
use voicetrim::clip::{self, TrimRegion, MIN_GAP_SECS};
use voicetrim::session::{AudioAsset, EditSession, SessionError};

fn tone_session(secs: f32, sr: u32) -> EditSession {
    let frames = (secs * sr as f32) as usize;
    let samples: Vec<f32> = (0..frames)
        .map(|i| ((i as f32 / sr as f32) * 440.0 * std::f32::consts::TAU).sin() * 0.6)
        .collect();
    let bytes = clip::write_wav_pcm16(&[samples.clone()], sr);
    let buf = Arc::new(SampleBuffer {
        channels: vec![samples],
        sample_rate: sr,
    });
    let asset = AudioAsset::from_decoded(bytes, Some("wav".into()), &buf);
    let mut session = EditSession::default();
    session.adopt(asset, Some(buf));
    session
}

#[test]
fn start_handle_cannot_cross_the_end() {
    let mut region = TrimRegion {
        start_secs: 1.0,
        end_secs: 3.0,
    };
    region.drag_start_to(3.5);
    assert!((region.start_secs - 2.9).abs() < 1e-6);
    assert!(region.end_secs - region.start_secs >= MIN_GAP_SECS - 1e-6);
}

#[test]
fn end_handle_respects_duration_and_gap() {
    let mut region = TrimRegion {
        start_secs: 4.5,
        end_secs: 5.0,
    };
    region.drag_end_to(100.0, 5.0);
    assert_eq!(region.end_secs, 5.0);
    region.drag_end_to(-2.0, 5.0);
    assert!((region.end_secs - (4.5 + MIN_GAP_SECS)).abs() < 1e-6);
}

#[test]
fn pointer_ratio_clamps_and_rejects_degenerate_input() {
    assert_eq!(clip::pointer_ratio(-10.0, 200.0), 0.0);
    assert_eq!(clip::pointer_ratio(400.0, 200.0), 1.0);
    assert!((clip::pointer_ratio(50.0, 200.0) - 0.25).abs() < 1e-6);
    assert_eq!(clip::pointer_ratio(50.0, 0.0), 0.0);
    assert_eq!(clip::pointer_ratio(f32::NAN, 200.0), 0.0);
}

#[test]
fn adopting_an_asset_selects_the_full_length() {
    let mut session = tone_session(2.5, 8_000);
    assert_eq!(session.trim().start_secs, 0.0);
    assert!((session.trim().end_secs - 2.5).abs() < 1e-3);

    session.trim_mut().drag_start_to(1.0);
    let replacement = tone_session(1.0, 8_000);
    let asset = replacement.asset().unwrap().clone();
    session.adopt(asset, None);
    assert_eq!(session.trim().start_secs, 0.0);
    assert!((session.trim().end_secs - 1.0).abs() < 1e-3);
}

#[test]
fn cut_replaces_the_asset_and_reselects_everything() {
    let mut session = tone_session(3.0, 8_000);
    let gen_before = session.generation();
    session.trim_mut().drag_start_to(1.0);
    session.trim_mut().drag_end_to(2.0, 3.0);
    session.apply_trim().expect("cut");
    assert_eq!(session.generation(), gen_before + 1);
    assert!((session.duration_secs() - 1.0).abs() < 1e-3);
    assert_eq!(session.trim().start_secs, 0.0);
    assert!((session.trim().end_secs - 1.0).abs() < 1e-3);
}

#[test]
fn failed_cut_changes_nothing() {
    let mut session = tone_session(3.0, 8_000);
    let bytes_before = session.asset().unwrap().bytes.clone();
    let gen_before = session.generation();
    session.trim_mut().start_secs = 2.0;
    session.trim_mut().end_secs = 2.0;
    assert!(matches!(
        session.apply_trim(),
        Err(SessionError::Trim(_))
    ));
    assert_eq!(session.generation(), gen_before);
    assert_eq!(session.asset().unwrap().bytes, bytes_before);
    assert_eq!(session.trim().start_secs, 2.0);
}

#[test]
fn decoding_an_adopted_asset_without_cache_works() {
    let mut session = tone_session(1.0, 8_000);
    let asset = session.asset().unwrap().clone();
    let mut fresh = EditSession::default();
    fresh.adopt(asset, None);
    let decoded = fresh.decoded().expect("decode from bytes");
    assert_eq!(decoded.sample_rate, 8_000);
    assert_eq!(decoded.frames(), 8_000);
}
