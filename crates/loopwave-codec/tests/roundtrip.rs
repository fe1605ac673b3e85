//! Analysis/synthesis round trips at the reference configuration.
//!
//! Run with:
//! ```bash
//! cargo test -p loopwave-codec --test roundtrip
//! ```

use loopwave_codec::SpectralCodec;
use loopwave_core::SynthConfig;
use ndarray::Array3;
use std::f32::consts::PI;

const SAMPLE_RATE: u32 = 44100;

fn codec_with_mel_bins(mel_bins: usize) -> SpectralCodec {
    let config = SynthConfig {
        sample_rate: SAMPLE_RATE,
        hop: 256,
        mel_bins,
        ..SynthConfig::default()
    };
    SpectralCodec::new(&config).expect("reference config is valid")
}

fn pure_tone(frequency: f32, num_samples: usize) -> Vec<f32> {
    (0..num_samples)
        .map(|n| 0.5 * (2.0 * PI * frequency * n as f32 / SAMPLE_RATE as f32).sin())
        .collect()
}

fn snr_db(reference: &[f32], estimate: &[f32]) -> f32 {
    let signal: f32 = reference.iter().map(|s| s * s).sum();
    let noise: f32 = reference
        .iter()
        .zip(estimate)
        .map(|(a, b)| (a - b) * (a - b))
        .sum();
    10.0 * (signal / noise.max(1e-20)).log10()
}

#[test]
fn test_pure_tone_roundtrip_snr() {
    let codec = codec_with_mel_bins(256);
    let wave = pure_tone(440.0, SAMPLE_RATE as usize);

    let frame = codec.waveform_to_spectral(&wave).unwrap();
    assert_eq!(frame.frames(), 169);
    assert_eq!(frame.bins(), 513);
    assert!(frame.phase().iter().all(|p| (-1.0..=1.0).contains(p)));

    let restored = codec.reconstruct_frame(&frame).unwrap();
    assert_eq!(restored.len(), 44032);

    // Exclude one frame length at each boundary.
    let edge = codec.stft().frame_len();
    let end = restored.len() - edge;
    let snr = snr_db(&wave[edge..end], &restored[edge..end]);
    assert!(snr > 20.0, "round-trip SNR too low: {:.1} dB", snr);
}

#[test]
fn test_blocked_reconstruction_matches_single_timeline() {
    let codec = codec_with_mel_bins(256);
    let wave = pure_tone(1000.0, 16 * 256 + 768);
    let frame = codec.waveform_to_spectral(&wave).unwrap();
    assert_eq!(frame.frames(), 16);

    let whole = codec.reconstruct_frame(&frame).unwrap();
    let (magnitude, phase) = frame.into_parts();
    let blocked_mag = magnitude.into_shape_with_order((4, 4, 513)).unwrap();
    let blocked_phase = phase.into_shape_with_order((4, 4, 513)).unwrap();
    let blocked = codec
        .reconstruct_waveform(&blocked_mag, &blocked_phase)
        .unwrap();

    assert_eq!(whole.len(), blocked.len());
    for (a, b) in whole.iter().zip(&blocked) {
        assert!((a - b).abs() < 1e-6);
    }
}

#[test]
fn test_silence_maps_to_normalized_floor() {
    let codec = codec_with_mel_bins(128);
    let silence = vec![0.0f32; SAMPLE_RATE as usize];
    let mel = codec.waveform_to_mel(&silence, Some(80.0)).unwrap();

    assert_eq!(mel.dim(), (169, 128));
    assert!(mel.iter().all(|v| v.is_finite()));

    let floor = codec.magnitude_floor();
    let empty = codec.mel().empty_bands();
    for (band, column) in mel.columns().into_iter().enumerate() {
        let expected = if empty.contains(&band) { 0.0 } else { floor };
        for &v in column {
            assert!(
                (v - expected).abs() < 1e-4,
                "band {} holds {} instead of {}",
                band,
                v,
                expected
            );
        }
    }
}

#[test]
fn test_zero_magnitude_zero_phase_is_silent() {
    let codec = codec_with_mel_bins(128);
    let magnitude = Array3::<f32>::zeros((1, 16, 513));
    let phase = Array3::<f32>::zeros((1, 16, 513));
    let wave = codec.reconstruct_waveform(&magnitude, &phase).unwrap();

    assert_eq!(wave.len(), 15 * 256 + 1024);
    let peak = wave.iter().fold(0.0f32, |acc, s| acc.max(s.abs()));
    assert!(peak < 1e-4, "expected silence, peak was {}", peak);
}
