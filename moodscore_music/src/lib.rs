// Moodscore: emotion profiles from audio, music from emotion profiles.
//
// A two-stage pipeline. The aggregator turns a corpus of recordings, one
// folder per emotion label, into a compact `EmotionProfile` per label and
// caches the whole `ProfileStore` as JSON. The generator expands one profile
// plus a duration into a three-track MIDI file (tempo, block chords, random
// melody).
//
// Architecture:
// - profile.rs: EmotionProfile, note density, rhythm pattern, defaults
// - mode.rs: major/minor templates, mode detection, chord progressions
// - harmony.rs: note-name and roman-numeral chord tables
// - store.rs: ProfileStore and the JSON cache document
// - analyze.rs: per-file descriptors to per-label profile (votes, percentiles)
// - corpus.rs: corpus scanning, bounded random sampling, cached build
// - sequence.rs: in-memory tracks of delta-timed events
// - generate.rs: profile + duration to Sequence, then to a file
// - midi.rs: Sequence to Standard MIDI File via midly
// - config.rs: JSON pipeline configuration
// - fs.rs: write-then-rename file output
//
// All randomness comes from a caller-supplied `rand::Rng`; seed it to
// reproduce the sampled corpus subset and the generated file exactly.

pub mod analyze;
pub mod config;
pub mod corpus;
pub mod error;
mod fs;
pub mod generate;
pub mod harmony;
pub mod midi;
pub mod mode;
pub mod profile;
pub mod sequence;
pub mod store;

use std::path::{Path, PathBuf};

use moodscore_audio::{AnalysisParams, SymphoniaDecoder};

pub use config::MusicConfig;
pub use error::{MusicError, Result};
pub use profile::EmotionProfile;
pub use store::ProfileStore;

/// Directory `generate_sequence` writes into.
pub const DEFAULT_OUTPUT_DIR: &str = "output";

/// Load the profile cache at `cache_path`, or analyze `corpus_dir` with the
/// default decoder and sampling bound and cache the result.
pub fn build_or_load_profiles(corpus_dir: &Path, cache_path: &Path) -> Result<ProfileStore> {
    corpus::load_or_build(
        cache_path,
        corpus_dir,
        &SymphoniaDecoder,
        &AnalysisParams::default(),
        config::DEFAULT_SAMPLE_LIMIT,
        &mut rand::rng(),
    )
}

/// Generate a sequence for `emotion_label` into `output/<output_name>`.
pub fn generate_sequence(
    store: &ProfileStore,
    emotion_label: &str,
    duration_seconds: f64,
    output_name: &str,
) -> Result<PathBuf> {
    generate::generate(
        store,
        emotion_label,
        duration_seconds,
        Path::new(DEFAULT_OUTPUT_DIR),
        output_name,
        &mut rand::rng(),
    )
}
