use voicetrim::wave;

#[test]
fn silence_renders_as_flat_zero_without_nan() {
    let mut env = Vec::new();
    wave::build_envelope(&mut env, &vec![0.0f32; 44_100], 800);
    assert_eq!(env.len(), 800);
    assert!(env.iter().all(|v| *v == 0.0 && v.is_finite()));
}

#[test]
fn envelope_matches_requested_resolution() {
    let samples: Vec<f32> = (0..22_050)
        .map(|i| ((i as f32) * 0.01).sin() * 0.7)
        .collect();
    for buckets in [1usize, 64, 333, 1920] {
        let mut env = Vec::new();
        wave::build_envelope(&mut env, &samples, buckets);
        assert_eq!(env.len(), buckets, "bucket count {buckets}");
        assert!(env.iter().all(|v| v.is_finite() && (0.0..=1.0).contains(v)));
    }
}

#[test]
fn peak_bucket_normalizes_to_full_scale() {
    let mut samples = vec![0.05f32; 3_000];
    for v in samples[1_000..2_000].iter_mut() {
        *v = 0.9;
    }
    let mut env = Vec::new();
    wave::build_envelope(&mut env, &samples, 30);
    let max = env.iter().copied().fold(0.0f32, f32::max);
    assert!((max - 1.0).abs() < 1e-6);
}

#[test]
fn fewer_samples_than_buckets_stays_finite() {
    let samples = vec![0.3f32; 7];
    let mut env = Vec::new();
    wave::build_envelope(&mut env, &samples, 64);
    assert!(!env.is_empty());
    assert!(env.len() <= 64);
    assert!(env.iter().all(|v| v.is_finite()));
}
