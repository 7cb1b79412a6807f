// Short-time signal descriptors for emotion profiling.
//
// All analysis runs on a single magnitude STFT (Hann window, `n_fft` samples,
// `hop_length` hop) plus a framed RMS over the raw samples:
// - onset envelope: positive spectral flux of the dB spectrogram, averaged
//   over frequency bins and normalized to a peak of 1.0, so its mean is a
//   loudness-independent measure of how busy the recording is
// - tempo: autocorrelation of the (lightly smoothed) onset envelope, weighted
//   by a log-normal prior centred on 120 BPM, searched over 30–300 BPM
// - chroma: per-frame pitch-class energy, each frame scaled to a max of 1.0;
//   summed over time it gives the 12-bin profile used for mode detection
//
// The numbers only need to be stable and monotone in the musical property
// they track; downstream code buckets or clamps them.

use rustfft::{FftPlanner, num_complex::Complex};
use serde::{Deserialize, Serialize};
use std::f32::consts::PI;

use crate::decode::DecodedAudio;

/// Dynamic range kept below the loudest bin when converting to dB.
const TOP_DB: f32 = 80.0;

const MIN_TEMPO_BPM: f32 = 30.0;
const MAX_TEMPO_BPM: f32 = 300.0;
const PRIOR_CENTER_BPM: f32 = 120.0;
/// Standard deviation of the tempo prior, in octaves.
const PRIOR_OCTAVE_STD: f32 = 1.0;

/// Lowest frequency (C1) folded into the chroma.
const CHROMA_MIN_HZ: f32 = 32.7;

/// STFT framing shared by every descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisParams {
    pub n_fft: usize,
    pub hop_length: usize,
}

impl Default for AnalysisParams {
    fn default() -> Self {
        AnalysisParams {
            n_fft: 2048,
            hop_length: 512,
        }
    }
}

/// Per-file summary of everything the profiler looks at.
#[derive(Debug, Clone, PartialEq)]
pub struct Descriptors {
    /// Beat-tracking estimate; 0.0 when the recording has no usable onsets.
    pub tempo_bpm: f32,
    /// Mean of the peak-normalized onset envelope, in [0, 1].
    pub onset_mean: f32,
    /// Chroma summed over time, indexed by pitch class (0 = C).
    pub pitch_profile: [f32; 12],
    /// Mean and standard deviation over every chroma value.
    pub chroma_mean: f32,
    pub chroma_std: f32,
    /// Mean and standard deviation of framed RMS energy.
    pub rms_mean: f32,
    pub rms_std: f32,
}

/// Compute all descriptors for one decoded recording.
pub fn describe(audio: &DecodedAudio, params: &AnalysisParams) -> Descriptors {
    let spectrogram = stft_magnitude(&audio.samples, params.n_fft, params.hop_length);
    let frame_rate = audio.sample_rate as f32 / params.hop_length as f32;

    let onset = onset_envelope(&spectrogram);
    let tempo_bpm = estimate_tempo(&onset, frame_rate);
    let (onset_mean, _) = mean_std(&onset);

    let chroma = chromagram(&spectrogram, audio.sample_rate, params.n_fft);
    let mut pitch_profile = [0.0f32; 12];
    for frame in &chroma {
        for (acc, v) in pitch_profile.iter_mut().zip(frame) {
            *acc += v;
        }
    }
    let flat: Vec<f32> = chroma.iter().flatten().copied().collect();
    let (chroma_mean, chroma_std) = mean_std(&flat);

    let rms = rms_frames(&audio.samples, params.n_fft, params.hop_length);
    let (rms_mean, rms_std) = mean_std(&rms);

    Descriptors {
        tempo_bpm,
        onset_mean,
        pitch_profile,
        chroma_mean,
        chroma_std,
        rms_mean,
        rms_std,
    }
}

/// Periodic Hann window of length `n`.
fn hann(n: usize) -> Vec<f32> {
    (0..n)
        .map(|i| 0.5 - 0.5 * (2.0 * PI * i as f32 / n as f32).cos())
        .collect()
}

/// Magnitude STFT. Returns one row of `n_fft / 2 + 1` bins per frame; the
/// final frame is zero-padded. An empty input yields no frames.
pub fn stft_magnitude(samples: &[f32], n_fft: usize, hop: usize) -> Vec<Vec<f32>> {
    if samples.is_empty() || n_fft == 0 || hop == 0 {
        return Vec::new();
    }
    let window = hann(n_fft);
    let mut planner = FftPlanner::<f32>::new();
    let fft = planner.plan_fft_forward(n_fft);
    let num_bins = n_fft / 2 + 1;

    let mut frames = Vec::new();
    let mut buffer = vec![Complex::new(0.0f32, 0.0); n_fft];
    let mut start = 0;
    while start < samples.len() {
        for (i, slot) in buffer.iter_mut().enumerate() {
            let s = samples.get(start + i).copied().unwrap_or(0.0);
            *slot = Complex::new(s * window[i], 0.0);
        }
        fft.process(&mut buffer);
        frames.push(buffer[..num_bins].iter().map(|c| c.norm()).collect());
        start += hop;
    }
    frames
}

/// Onset strength per frame, normalized so the strongest onset is 1.0.
/// Silence yields all zeros.
pub fn onset_envelope(spectrogram: &[Vec<f32>]) -> Vec<f32> {
    let peak = spectrogram
        .iter()
        .flatten()
        .fold(0.0f32, |acc, &m| acc.max(m));
    if spectrogram.is_empty() || peak <= 0.0 {
        return vec![0.0; spectrogram.len()];
    }

    let to_db = |m: f32| (20.0 * (m.max(1e-10) / peak).log10()).max(-TOP_DB);

    let mut env = Vec::with_capacity(spectrogram.len());
    env.push(0.0);
    for pair in spectrogram.windows(2) {
        let (prev, cur) = (&pair[0], &pair[1]);
        let flux: f32 = prev
            .iter()
            .zip(cur)
            .map(|(&p, &c)| (to_db(c) - to_db(p)).max(0.0))
            .sum();
        env.push(flux / cur.len().max(1) as f32);
    }

    let max = env.iter().fold(0.0f32, |acc, &v| acc.max(v));
    if max > 0.0 {
        for v in &mut env {
            *v /= max;
        }
    }
    env
}

/// Beats per minute from an onset envelope sampled at `frame_rate` frames
/// per second. Returns 0.0 if the envelope is flat zero or too short to
/// contain a 30 BPM period.
pub fn estimate_tempo(onset: &[f32], frame_rate: f32) -> f32 {
    if onset.len() < 3 || frame_rate <= 0.0 {
        return 0.0;
    }

    // 3-tap smoothing so a period that falls between two lags still shows up.
    let smoothed: Vec<f32> = (0..onset.len())
        .map(|i| {
            let prev = if i > 0 { onset[i - 1] } else { 0.0 };
            let next = onset.get(i + 1).copied().unwrap_or(0.0);
            0.25 * prev + 0.5 * onset[i] + 0.25 * next
        })
        .collect();

    let lag_min = ((60.0 * frame_rate / MAX_TEMPO_BPM).ceil() as usize).max(1);
    let lag_max = ((60.0 * frame_rate / MIN_TEMPO_BPM).floor() as usize).min(smoothed.len() - 1);
    if lag_min > lag_max {
        return 0.0;
    }

    let mut best: Option<(f32, usize)> = None;
    for lag in lag_min..=lag_max {
        let ac: f32 = smoothed
            .iter()
            .zip(&smoothed[lag..])
            .map(|(a, b)| a * b)
            .sum();
        if ac <= 0.0 {
            continue;
        }
        let bpm = 60.0 * frame_rate / lag as f32;
        let octaves = (bpm / PRIOR_CENTER_BPM).log2() / PRIOR_OCTAVE_STD;
        let weighted = ac * (-0.5 * octaves * octaves).exp();
        if best.is_none_or(|(score, _)| weighted > score) {
            best = Some((weighted, lag));
        }
    }

    match best {
        Some((_, lag)) => 60.0 * frame_rate / lag as f32,
        None => 0.0,
    }
}

/// Pitch class (0 = C) of a frequency, by nearest equal-tempered semitone.
fn pitch_class(freq: f32) -> usize {
    let midi = 69.0 + 12.0 * (freq / 440.0).log2();
    (midi.round() as i64).rem_euclid(12) as usize
}

/// Per-frame 12-bin chroma from a magnitude spectrogram. Each frame is scaled
/// to a maximum of 1.0; silent frames stay zero.
pub fn chromagram(spectrogram: &[Vec<f32>], sample_rate: u32, n_fft: usize) -> Vec<[f32; 12]> {
    let nyquist = sample_rate as f32 / 2.0;
    let bin_pc: Vec<Option<usize>> = (0..n_fft / 2 + 1)
        .map(|k| {
            let freq = k as f32 * sample_rate as f32 / n_fft as f32;
            (freq >= CHROMA_MIN_HZ && freq < nyquist).then(|| pitch_class(freq))
        })
        .collect();

    spectrogram
        .iter()
        .map(|frame| {
            let mut chroma = [0.0f32; 12];
            for (mag, pc) in frame.iter().zip(&bin_pc) {
                if let Some(pc) = pc {
                    chroma[*pc] += mag * mag;
                }
            }
            let max = chroma.iter().fold(0.0f32, |acc, &v| acc.max(v));
            if max > 0.0 {
                for v in &mut chroma {
                    *v /= max;
                }
            }
            chroma
        })
        .collect()
}

/// Root-mean-square energy over frames of `frame_len` samples every `hop`.
pub fn rms_frames(samples: &[f32], frame_len: usize, hop: usize) -> Vec<f32> {
    if samples.is_empty() || frame_len == 0 || hop == 0 {
        return Vec::new();
    }
    let mut out = Vec::new();
    let mut start = 0;
    while start < samples.len() {
        let end = (start + frame_len).min(samples.len());
        let sum_sq: f32 = samples[start..end].iter().map(|s| s * s).sum();
        out.push((sum_sq / frame_len as f32).sqrt());
        start += hop;
    }
    out
}

/// Population mean and standard deviation; (0, 0) for an empty slice.
pub fn mean_std(values: &[f32]) -> (f32, f32) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let n = values.len() as f32;
    let mean = values.iter().sum::<f32>() / n;
    let var = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f32>() / n;
    (mean, var.sqrt())
}
