// Corpus scanning and the cached build of the profile store.
//
// The corpus is a directory with one subdirectory per emotion label, each
// holding audio files. `load_or_build` returns the cached store when the
// cache document exists, without looking at the corpus. Otherwise it:
// 1. lists each label's audio files (sorted by name)
// 2. draws at most `sample_limit` of them without replacement
// 3. analyzes every label in parallel (analysis itself draws no randomness,
//    so the result depends only on which files were drawn)
// 4. writes the whole store to the cache and returns it
//
// An unreadable corpus or one without label folders yields an empty store,
// which is returned but not cached so the next run tries again.

use std::path::{Path, PathBuf};

use moodscore_audio::{AnalysisParams, AudioDecoder, list_audio_files};
use rand::Rng;
use rand::seq::IndexedRandom;
use rayon::prelude::*;
use tracing::{info, warn};

use crate::analyze::analyze;
use crate::error::Result;
use crate::store::ProfileStore;

/// One emotion folder and the files chosen for analysis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelSample {
    pub label: String,
    /// How many audio files the folder held before sampling.
    pub available: usize,
    pub files: Vec<PathBuf>,
}

/// Label folders directly under `corpus_dir` with their audio files, sorted
/// by label. An unreadable corpus is logged and treated as empty.
pub fn scan_corpus(corpus_dir: &Path) -> Vec<(String, Vec<PathBuf>)> {
    let entries = match std::fs::read_dir(corpus_dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(corpus = %corpus_dir.display(), error = %e, "cannot read corpus directory");
            return Vec::new();
        }
    };

    let mut labels: Vec<(String, PathBuf)> = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_ok_and(|t| t.is_dir()))
        .filter_map(|entry| {
            let label = entry.file_name().to_str()?.to_string();
            Some((label, entry.path()))
        })
        .collect();
    labels.sort();

    labels
        .into_iter()
        .map(|(label, dir)| {
            let files = list_audio_files(&dir).unwrap_or_else(|e| {
                warn!(label = %label, error = %e, "cannot list label directory");
                Vec::new()
            });
            (label, files)
        })
        .collect()
}

/// Keep every file if there are at most `limit`, otherwise a uniform random
/// subset of exactly `limit`, returned in name order.
pub fn sample_files(files: &[PathBuf], limit: usize, rng: &mut impl Rng) -> Vec<PathBuf> {
    if files.len() <= limit {
        return files.to_vec();
    }
    let mut chosen: Vec<PathBuf> = files.choose_multiple(rng, limit).cloned().collect();
    chosen.sort();
    chosen
}

/// Scan the corpus and draw each label's sample.
pub fn sample_corpus(corpus_dir: &Path, limit: usize, rng: &mut impl Rng) -> Vec<LabelSample> {
    scan_corpus(corpus_dir)
        .into_iter()
        .map(|(label, files)| {
            let sampled = sample_files(&files, limit, rng);
            info!(
                label = %label,
                available = files.len(),
                sampled = sampled.len(),
                "sampled label"
            );
            LabelSample {
                label,
                available: files.len(),
                files: sampled,
            }
        })
        .collect()
}

/// Analyze every sampled label. Labels run in parallel.
pub fn build_profiles(
    samples: &[LabelSample],
    decoder: &impl AudioDecoder,
    params: &AnalysisParams,
) -> ProfileStore {
    samples
        .par_iter()
        .map(|s| (s.label.clone(), analyze(&s.files, &s.label, decoder, params)))
        .collect::<Vec<_>>()
        .into_iter()
        .collect()
}

/// Return the cached store at `cache_path`, or build it from `corpus_dir`
/// and cache it.
pub fn load_or_build(
    cache_path: &Path,
    corpus_dir: &Path,
    decoder: &impl AudioDecoder,
    params: &AnalysisParams,
    sample_limit: usize,
    rng: &mut impl Rng,
) -> Result<ProfileStore> {
    if cache_path.exists() {
        let store = ProfileStore::load(cache_path)?;
        info!(cache = %cache_path.display(), labels = store.len(), "loaded cached profiles");
        return Ok(store);
    }

    info!(corpus = %corpus_dir.display(), "no profile cache, analyzing corpus");
    let samples = sample_corpus(corpus_dir, sample_limit, rng);
    if samples.is_empty() {
        warn!(corpus = %corpus_dir.display(), "no emotion folders found, profile store is empty");
        return Ok(ProfileStore::new());
    }

    let store = build_profiles(&samples, decoder, params);
    store.save(cache_path)?;
    info!(cache = %cache_path.display(), labels = store.len(), "cached profiles");
    Ok(store)
}
