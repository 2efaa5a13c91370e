//! End-to-end tests for the steganography engine

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sonostego::io::{read_wav, write_wav, WavFormat};
use sonostego::signal::normalization::{correlation, variance};
use sonostego::{
    decode, decode_blind, encode, EmbeddingParameters, Method, SelectorConfig, SignalBuffer,
    StegoConfig, StegoError,
};

const SR: u32 = 16000;

fn white_noise(len: usize, seed: u64) -> Vec<f32> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..len).map(|_| rng.gen_range(-1.0f32..1.0)).collect()
}

/// Linear sweep from 100 Hz to 4 kHz over the buffer
fn sine_sweep(len: usize) -> Vec<f32> {
    let duration = len as f32 / SR as f32;
    (0..len)
        .map(|i| {
            let t = i as f32 / SR as f32;
            let freq = 100.0 + (4000.0 - 100.0) * t / (2.0 * duration);
            0.8 * (2.0 * std::f32::consts::PI * freq * t).sin()
        })
        .collect()
}

/// 50 Hz square wave, +1 for the first half of each period
fn square_wave(len: usize) -> Vec<f32> {
    let period = (SR / 50) as usize;
    (0..len)
        .map(|i| if i % period < period / 2 { 1.0 } else { -1.0 })
        .collect()
}

#[test]
fn test_lsb_sweep_carries_square_wave() {
    let _ = env_logger::builder().is_test(true).try_init();

    let cover = SignalBuffer::new(sine_sweep(SR as usize), SR);
    let secret = SignalBuffer::new(square_wave(SR as usize), SR);
    let params = EmbeddingParameters::lsb(2);

    let stego = encode(&cover, &secret, &params).unwrap();
    assert_eq!(stego.len(), cover.len());

    // The payload has to survive a 16-bit WAV round trip
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stego.wav");
    write_wav(&path, &stego, WavFormat::Pcm16).unwrap();
    let stego = read_wav(&path).unwrap();

    let extracted = decode(&stego, None, &params).unwrap();
    assert_eq!(extracted.len(), secret.len());

    let levels = [0.0f32, 1.0 / 3.0, 2.0 / 3.0, 1.0];
    for (i, (&x, &s)) in extracted.samples.iter().zip(&secret.samples).enumerate() {
        assert!(
            levels.iter().any(|l| (x - l).abs() < 1e-6),
            "sample {} not on the 2-bit grid: {}",
            i,
            x
        );
        assert_eq!(x > 0.5, s > 0.0, "sign mismatch at sample {}", i);
    }
}

#[test]
fn test_lsb_cover_fidelity() {
    let cover = SignalBuffer::new(sine_sweep(4000), SR);
    let secret = SignalBuffer::new(white_noise(4000, 11), SR);

    for num_bits in 1..=8u8 {
        let stego = encode(&cover, &secret, &EmbeddingParameters::lsb(num_bits)).unwrap();
        let max_error = (1 << num_bits) as f32 / 32767.0;
        for (c, s) in cover.samples.iter().zip(&stego.samples) {
            assert!((c - s).abs() <= max_error);
        }
    }
}

#[test]
fn test_additive_round_trip_with_cover() {
    let cover = SignalBuffer::new(white_noise(SR as usize, 1), SR).normalized();
    let secret = SignalBuffer::new(white_noise(SR as usize, 2), SR).normalized();
    let params = EmbeddingParameters::frequency_additive(0.01);

    let stego = encode(&cover, &secret, &params).unwrap();
    assert!((stego.peak() - 1.0).abs() < 1e-6);

    let extracted = decode(&stego, Some(&cover), &params).unwrap();
    let r = correlation(&extracted.samples, &secret.samples);
    assert!(r > 0.999, "correlation {:.6}", r);

    // Exactly the secret minus its projection on the cover, up to round-off
    let cc: f64 = cover.samples.iter().map(|&c| (c as f64).powi(2)).sum();
    let sc: f64 = cover
        .samples
        .iter()
        .zip(&secret.samples)
        .map(|(&c, &s)| c as f64 * s as f64)
        .sum();
    let mut expected: Vec<f64> = secret
        .samples
        .iter()
        .zip(&cover.samples)
        .map(|(&s, &c)| s as f64 - sc / cc * c as f64)
        .collect();
    let peak = expected.iter().fold(0.0f64, |m, x| m.max(x.abs()));
    expected.iter_mut().for_each(|x| *x /= peak);

    let diff: f64 = extracted
        .samples
        .iter()
        .zip(&expected)
        .map(|(&x, &e)| (x as f64 - e).powi(2))
        .sum();
    let norm: f64 = expected.iter().map(|e| e * e).sum();
    let error = (diff / norm).sqrt();
    assert!(error < 1e-4, "relative error {:e}", error);

    assert!(matches!(
        decode(&stego, None, &params),
        Err(StegoError::NonBlindDecodeWithoutCover)
    ));
}

#[test]
fn test_echo_recovers_correlated_estimate() {
    let len = SR as usize;
    let cover: Vec<f32> = (0..len)
        .map(|i| 0.02 * (2.0 * std::f32::consts::PI * 330.0 * i as f32 / SR as f32).sin())
        .collect();
    let cover = SignalBuffer::new(cover, SR);
    let secret = SignalBuffer::new(white_noise(len, 5), SR);
    let params = EmbeddingParameters::echo(0.1, 0.3);

    let stego = encode(&cover, &secret, &params).unwrap();
    assert_eq!(stego.len(), cover.len());

    let extracted = decode(&stego, None, &params).unwrap();
    let r = correlation(&extracted.samples, &secret.samples);
    assert!(r > 0.3, "correlation {:.3}", r);
}

#[test]
fn test_phase_mode_is_blind_and_keeps_length() {
    let cover = SignalBuffer::new(sine_sweep(10_000), SR);
    let secret = SignalBuffer::new(white_noise(6_000, 9), SR);
    let params = EmbeddingParameters::frequency_phase(0.01);

    let stego = encode(&cover, &secret, &params).unwrap();
    assert_eq!(stego.len(), 10_000);

    let extracted = decode(&stego, None, &params).unwrap();
    assert_eq!(extracted.len(), 10_000);
    assert!(extracted.peak() <= 1.0 + 1e-6);
}

#[test]
fn test_silent_cover_is_safe_for_every_method() {
    let cover = SignalBuffer::silence(4096, SR);
    let secret = SignalBuffer::new(white_noise(4096, 3), SR);

    let all = [
        EmbeddingParameters::lsb(2),
        EmbeddingParameters::frequency_additive(0.01),
        EmbeddingParameters::frequency_phase(0.01),
        EmbeddingParameters::echo(0.01, 0.3),
    ];
    for params in all {
        let stego = encode(&cover, &secret, &params).unwrap();
        assert_eq!(stego.len(), cover.len(), "{}", params.method());
        assert!(stego.samples.iter().all(|x| x.is_finite()));
    }

    // Nothing to hide in and nothing hidden: everything stays silent
    let silent = SignalBuffer::silence(4096, SR);
    let stego = encode(&cover, &silent, &EmbeddingParameters::echo(0.01, 0.3)).unwrap();
    assert!(stego.samples.iter().all(|&x| x == 0.0));
}

#[test]
fn test_selector_picks_lsb_on_impulse_cover() {
    let len = SR as usize;
    let mut impulse = vec![0.0f32; len];
    impulse[len / 2] = 1.0;
    let cover = SignalBuffer::new(impulse, SR);
    let secret = SignalBuffer::new(white_noise(len, 42), SR);

    let stego = encode(&cover, &secret, &EmbeddingParameters::lsb(2)).unwrap();
    let selection = decode_blind(&stego, &SelectorConfig::default()).unwrap();

    assert_eq!(selection.method(), Method::Lsb);
    assert!(!selection.is_ambiguous());

    let scores = selection.scores();
    assert_eq!(scores.len(), 3);
    let lsb = scores[0].1;
    assert!(scores[1..].iter().all(|(_, v)| *v < lsb));

    let chosen = selection.into_signal();
    assert!((variance(&chosen.samples) - lsb).abs() < 1e-12);
}

#[test]
fn test_selector_picks_lsb_on_quiet_noise_cover() {
    let len = SR as usize;
    let cover: Vec<f32> = white_noise(len, 77).into_iter().map(|x| 0.05 * x).collect();
    let cover = SignalBuffer::new(cover, SR);
    let secret = SignalBuffer::new(white_noise(len, 78), SR);

    let stego = encode(&cover, &secret, &EmbeddingParameters::lsb(2)).unwrap();
    let selection = decode_blind(&stego, &SelectorConfig::default()).unwrap();
    let scores = selection.scores();

    assert_eq!(selection.method(), Method::Lsb, "scores: {:?}", scores);
    // 2-bit codes of a uniform secret: variance of {0, 1/3, 2/3, 1}
    assert!((scores[0].1 - 0.1389).abs() < 0.01, "scores: {:?}", scores);
    // The echo estimate keeps the level of the quiet cover
    assert!(scores[2].1 < 0.01, "scores: {:?}", scores);
}

#[test]
fn test_config_drives_encode_and_decode() {
    let config = StegoConfig::from_toml_str(
        r#"
        [lsb]
        num_bits = 4

        [echo]
        delay_seconds = 0.05
        decay = 0.5
        "#,
    )
    .unwrap();

    let cover = SignalBuffer::new(sine_sweep(2000), SR);
    let secret = SignalBuffer::new(white_noise(2000, 8), SR);

    let params = config.parameters(Method::Lsb);
    let stego = encode(&cover, &secret, &params).unwrap();
    let extracted = decode(&stego, None, &params).unwrap();
    let expected = sonostego::codec::lsb::quantize(&secret.samples, 4);
    for (a, b) in extracted.samples.iter().zip(&expected) {
        assert!((a - b).abs() <= 1.0 / 15.0);
    }

    assert_eq!(
        config.parameters(Method::Echo),
        EmbeddingParameters::Echo {
            delay_seconds: 0.05,
            decay: 0.5,
            echo_gain: 0.1
        }
    );
}

#[test]
fn test_mismatched_rates_rejected() {
    let cover = SignalBuffer::new(sine_sweep(1600), SR);
    let secret = SignalBuffer::new(white_noise(800, 4), 8000);
    let err = encode(&cover, &secret, &EmbeddingParameters::lsb(2)).unwrap_err();
    assert!(matches!(err, StegoError::InvalidParameter { name: "sample_rate", .. }));

    let aligned = secret.resampled(SR).unwrap();
    assert!(encode(&cover, &aligned, &EmbeddingParameters::lsb(2)).is_ok());
}

#[cfg(feature = "cli")]
mod cli {
    use super::*;
    use clap::Parser;
    use sonostego::cli::{run, Cli};

    #[test]
    fn test_cli_lsb_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let cover_path = dir.path().join("cover.wav");
        let secret_path = dir.path().join("secret.wav");
        let stego_path = dir.path().join("stego.wav");
        let out_path = dir.path().join("extracted.wav");

        write_wav(
            &cover_path,
            &SignalBuffer::new(sine_sweep(8000), SR),
            WavFormat::Float32,
        )
        .unwrap();
        let secret = SignalBuffer::new(square_wave(8000), SR);
        write_wav(&secret_path, &secret, WavFormat::Float32).unwrap();

        let written = run(Cli::parse_from([
            "sonostego",
            "encode",
            "--method",
            "lsb",
            "--bits",
            "2",
            "--input",
            cover_path.to_str().unwrap(),
            "--secret",
            secret_path.to_str().unwrap(),
            "--output",
            stego_path.to_str().unwrap(),
        ]))
        .unwrap();
        assert_eq!(written, Some(stego_path.clone()));

        run(Cli::parse_from([
            "sonostego",
            "decode",
            "--method",
            "lsb",
            "--bits",
            "2",
            "--input",
            stego_path.to_str().unwrap(),
            "--output",
            out_path.to_str().unwrap(),
        ]))
        .unwrap();

        let extracted = read_wav(&out_path).unwrap();
        for (&x, &s) in extracted.samples.iter().zip(&secret.samples) {
            assert_eq!(x > 0.5, s > 0.0);
        }
    }

    #[test]
    fn test_cli_auto_decode_writes_output() {
        let dir = tempfile::tempdir().unwrap();
        let stego_path = dir.path().join("stego.wav");
        let out_path = dir.path().join("extracted.wav");
        write_wav(
            &stego_path,
            &SignalBuffer::new(white_noise(8000, 21), SR),
            WavFormat::Pcm16,
        )
        .unwrap();

        run(Cli::parse_from([
            "sonostego",
            "decode",
            "--method",
            "auto",
            "--input",
            stego_path.to_str().unwrap(),
            "--output",
            out_path.to_str().unwrap(),
        ]))
        .unwrap();
        assert_eq!(read_wav(&out_path).unwrap().len(), 8000);
    }

    #[test]
    fn test_cli_stream_encode() {
        let dir = tempfile::tempdir().unwrap();
        let cover_path = dir.path().join("cover.wav");
        let secret_path = dir.path().join("secret.wav");
        let stego_path = dir.path().join("stego.wav");

        write_wav(
            &cover_path,
            &SignalBuffer::new(sine_sweep(5000), SR),
            WavFormat::Float32,
        )
        .unwrap();
        write_wav(
            &secret_path,
            &SignalBuffer::new(white_noise(3000, 6), SR),
            WavFormat::Float32,
        )
        .unwrap();

        run(Cli::parse_from([
            "sonostego",
            "stream",
            "encode",
            "--method",
            "echo",
            "--delay",
            "0.01",
            "--input",
            cover_path.to_str().unwrap(),
            "--secret",
            secret_path.to_str().unwrap(),
            "--output",
            stego_path.to_str().unwrap(),
        ]))
        .unwrap();
        assert_eq!(read_wav(&stego_path).unwrap().len(), 5000);
    }

    #[test]
    fn test_cli_rejects_unknown_device() {
        let err = run(Cli::parse_from([
            "sonostego",
            "--device",
            "3",
            "decode",
            "--method",
            "lsb",
            "--input",
            "x.wav",
            "--output",
            "y.wav",
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("device 3"));
    }

    #[test]
    fn test_cli_additive_decode_without_cover_fails_cleanly() {
        let dir = tempfile::tempdir().unwrap();
        let stego_path = dir.path().join("stego.wav");
        let out_path = dir.path().join("extracted.wav");
        write_wav(
            &stego_path,
            &SignalBuffer::new(white_noise(1000, 2), SR),
            WavFormat::Float32,
        )
        .unwrap();

        let result = run(Cli::parse_from([
            "sonostego",
            "decode",
            "--method",
            "fft",
            "--fft-mode",
            "additive",
            "--input",
            stego_path.to_str().unwrap(),
            "--output",
            out_path.to_str().unwrap(),
        ]));
        assert!(result.is_err());
        assert!(!out_path.exists());
    }
}
