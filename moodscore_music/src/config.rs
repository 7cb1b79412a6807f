// Data-driven pipeline configuration.
//
// Paths, the per-label sample bound, the optional RNG seed, and the STFT
// framing live in `MusicConfig`, loaded from JSON. Every field has a default,
// so a config file only needs to name what it changes and a missing file is
// not required at all (the CLI falls back to `MusicConfig::default()`).
//
// Musical constants (ticks per beat, bar length, density note counts) are not
// configurable; they are part of the output format contract and live next to
// the code that uses them.

use std::path::{Path, PathBuf};

use moodscore_audio::AnalysisParams;
use serde::{Deserialize, Serialize};

use crate::error::{MusicError, Result};

/// Default bound on files analyzed per emotion folder.
pub const DEFAULT_SAMPLE_LIMIT: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MusicConfig {
    /// Root of the corpus: one subdirectory of audio files per emotion.
    pub corpus_dir: PathBuf,
    /// Where the aggregated profile store is cached.
    pub cache_path: PathBuf,
    /// Directory that receives generated sequence files.
    pub output_dir: PathBuf,
    /// At most this many files are analyzed per emotion.
    pub sample_limit: usize,
    /// Fixed seed for sampling and generation. `None` draws from the OS.
    pub seed: Option<u64>,
    pub analysis: AnalysisParams,
}

impl Default for MusicConfig {
    fn default() -> Self {
        MusicConfig {
            corpus_dir: PathBuf::from("data/emotion_music_data"),
            cache_path: PathBuf::from("data/emotion_music_features.json"),
            output_dir: PathBuf::from("output"),
            sample_limit: DEFAULT_SAMPLE_LIMIT,
            seed: None,
            analysis: AnalysisParams::default(),
        }
    }
}

impl MusicConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| MusicError::io(path, e))?;
        serde_json::from_str(&text).map_err(|source| MusicError::Config {
            path: path.to_path_buf(),
            source,
        })
    }
}
