// Per-label analysis: recordings in, one `EmotionProfile` out.
//
// Each file is decoded and reduced to a `FileAnalysis` (tempo, mode, density
// bucket, and the pitch/velocity windows). Files that fail to decode are
// logged and dropped; if none survive, the label gets the default profile.
//
// Aggregation across files:
// - tempo: 25th/75th percentiles (linear interpolation), floored to whole
//   BPM and clamped to [60, 180]
// - mode and density: majority vote, ties to the value seen first
// - rhythm: from the label text
// - pitch and velocity: the fixed profile constants. The per-file windows are
//   computed and logged but not aggregated.

use std::path::{Path, PathBuf};

use moodscore_audio::{AnalysisParams, AudioDecoder, Descriptors, describe};
use tracing::{debug, warn};

use crate::mode::Mode;
use crate::profile::{
    EmotionProfile, NoteDensity, PROFILE_PITCH_RANGE, PROFILE_VELOCITY_RANGE, RhythmPattern,
    TEMPO_CLAMP,
};

/// Lowest value of a per-file velocity window.
const VELOCITY_FLOOR: i32 = 40;

/// What one recording contributes to its label's profile.
#[derive(Debug, Clone, PartialEq)]
pub struct FileAnalysis {
    pub path: PathBuf,
    pub tempo_bpm: f32,
    pub mode: Mode,
    pub note_density: NoteDensity,
    /// Chroma mean ± std scaled onto [0, 127].
    pub pitch_window: (i32, i32),
    /// RMS mean ± std scaled onto [0, 127], low end floored at 40.
    pub velocity_window: (i32, i32),
}

impl FileAnalysis {
    pub fn from_descriptors(path: &Path, d: &Descriptors) -> Self {
        FileAnalysis {
            path: path.to_path_buf(),
            tempo_bpm: d.tempo_bpm,
            mode: Mode::detect(&d.pitch_profile),
            note_density: NoteDensity::from_onset_mean(d.onset_mean),
            pitch_window: scaled_window(d.chroma_mean, d.chroma_std, 0),
            velocity_window: scaled_window(d.rms_mean, d.rms_std, VELOCITY_FLOOR),
        }
    }
}

/// `[mean - std, mean + std]` scaled by 127 and clamped to `[floor, 127]`.
fn scaled_window(mean: f32, std: f32, floor: i32) -> (i32, i32) {
    let scale = |v: f32| ((v * 127.0).round() as i32).clamp(floor, 127);
    let lo = scale(mean - std);
    let hi = scale(mean + std);
    (lo, hi.max(lo))
}

/// Decode and describe one file.
pub fn analyze_file(
    path: &Path,
    decoder: &impl AudioDecoder,
    params: &AnalysisParams,
) -> Result<FileAnalysis, moodscore_audio::DecodeError> {
    let audio = decoder.decode(path)?;
    let descriptors = describe(&audio, params);
    let analysis = FileAnalysis::from_descriptors(path, &descriptors);
    debug!(
        path = %path.display(),
        tempo = analysis.tempo_bpm,
        mode = %analysis.mode,
        density = ?analysis.note_density,
        pitch_window = ?analysis.pitch_window,
        velocity_window = ?analysis.velocity_window,
        "analyzed recording"
    );
    Ok(analysis)
}

/// Build the profile for `label` from its (already sampled) files.
pub fn analyze(
    files: &[PathBuf],
    label: &str,
    decoder: &impl AudioDecoder,
    params: &AnalysisParams,
) -> EmotionProfile {
    let analyses: Vec<FileAnalysis> = files
        .iter()
        .filter_map(|path| match analyze_file(path, decoder, params) {
            Ok(a) => Some(a),
            Err(e) => {
                warn!(label, error = %e, "skipping undecodable file");
                None
            }
        })
        .collect();

    if analyses.is_empty() {
        warn!(label, files = files.len(), "no decodable recordings, using default profile");
        return EmotionProfile::default_profile();
    }
    aggregate(&analyses, label)
}

/// Combine per-file analyses (at least one) into a profile.
pub fn aggregate(analyses: &[FileAnalysis], label: &str) -> EmotionProfile {
    let default = EmotionProfile::default_profile();

    let tempos: Vec<f64> = analyses.iter().map(|a| a.tempo_bpm as f64).collect();
    let tempo_range = match (percentile(&tempos, 25.0), percentile(&tempos, 75.0)) {
        (Some(lo), Some(hi)) => (clamp_tempo(lo), clamp_tempo(hi)),
        _ => default.tempo_range,
    };

    let mode = majority_vote(analyses.iter().map(|a| a.mode)).unwrap_or(default.mode);
    let note_density =
        majority_vote(analyses.iter().map(|a| a.note_density)).unwrap_or(default.note_density);

    EmotionProfile {
        tempo_range,
        mode,
        pitch_range: PROFILE_PITCH_RANGE,
        velocity_range: PROFILE_VELOCITY_RANGE,
        note_density,
        rhythm_pattern: RhythmPattern::for_label(label),
        chord_progression: mode.chord_progression(),
    }
}

fn clamp_tempo(bpm: f64) -> u32 {
    let (lo, hi) = TEMPO_CLAMP;
    (bpm.floor().max(0.0) as u32).clamp(lo, hi)
}

/// Percentile with linear interpolation between closest ranks.
pub fn percentile(values: &[f64], pct: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let rank = (pct / 100.0).clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let frac = rank - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * frac)
}

/// Most frequent item; among equally frequent items the one seen first wins.
pub fn majority_vote<T: PartialEq>(items: impl IntoIterator<Item = T>) -> Option<T> {
    let mut counts: Vec<(T, usize)> = Vec::new();
    for item in items {
        match counts.iter_mut().find(|(seen, _)| *seen == item) {
            Some((_, n)) => *n += 1,
            None => counts.push((item, 1)),
        }
    }
    let mut best: Option<(T, usize)> = None;
    for (item, n) in counts {
        if best.as_ref().is_none_or(|(_, top)| n > *top) {
            best = Some((item, n));
        }
    }
    best.map(|(item, _)| item)
}
