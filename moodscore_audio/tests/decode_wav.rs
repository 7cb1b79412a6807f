// End-to-end check of the symphonia decoder against WAV files written with
// hound: channel downmixing, sample-rate reporting, and the descriptors
// computed from a real decode.

use std::f32::consts::PI;
use std::path::Path;

use moodscore_audio::{AnalysisParams, AudioDecoder, SymphoniaDecoder, describe};

fn write_wav(path: &Path, sample_rate: u32, channels: u16, frames: &[Vec<f32>]) {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).unwrap();
    for frame in frames {
        for &s in frame {
            writer.write_sample((s * i16::MAX as f32) as i16).unwrap();
        }
    }
    writer.finalize().unwrap();
}

#[test]
fn stereo_wav_is_downmixed_to_mono() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stereo.wav");
    // Left +0.5, right -0.5: the mono mix is silence.
    let frames: Vec<Vec<f32>> = (0..4410).map(|_| vec![0.5, -0.5]).collect();
    write_wav(&path, 44100, 2, &frames);

    let audio = SymphoniaDecoder.decode(&path).unwrap();
    assert_eq!(audio.sample_rate, 44100);
    assert_eq!(audio.samples.len(), 4410);
    assert!(audio.samples.iter().all(|s| s.abs() < 1e-3));
}

#[test]
fn mono_sine_round_trips_through_descriptors() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("a440.wav");
    let frames: Vec<Vec<f32>> = (0..22050)
        .map(|i| vec![0.8 * (2.0 * PI * 440.0 * i as f32 / 22050.0).sin()])
        .collect();
    write_wav(&path, 22050, 1, &frames);

    let audio = SymphoniaDecoder.decode(&path).unwrap();
    assert_eq!(audio.sample_rate, 22050);
    assert!((audio.duration_seconds() - 1.0).abs() < 1e-3);

    let d = describe(&audio, &AnalysisParams::default());
    let loudest = d
        .pitch_profile
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.total_cmp(b.1))
        .map(|(pc, _)| pc)
        .unwrap();
    assert_eq!(loudest, 9);
    assert!(d.rms_mean > 0.3);
}

#[test]
fn truncated_wav_keeps_the_samples_before_the_cut() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cut.wav");
    let frames: Vec<Vec<f32>> = (0..22050).map(|_| vec![0.25]).collect();
    write_wav(&path, 22050, 1, &frames);

    // Header still announces a full second; the data stops halfway.
    let full = std::fs::metadata(&path).unwrap().len();
    let file = std::fs::OpenOptions::new().write(true).open(&path).unwrap();
    file.set_len(full / 2).unwrap();
    drop(file);

    let audio = SymphoniaDecoder.decode(&path).unwrap();
    assert!(!audio.samples.is_empty());
    assert!(audio.samples.len() < 22050);
    assert!(audio.samples.iter().all(|s| (s - 0.25).abs() < 1e-3));
}
