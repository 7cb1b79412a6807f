// The profile store and its cache document.
//
// `ProfileStore` maps emotion label to `EmotionProfile`. It is built once
// (by aggregation or by loading the cache), then only read. The cache is a
// single JSON object keyed by label, written wholesale after aggregation and
// read back verbatim: no check is made that it still matches the corpus it
// came from. Delete the cache to force re-analysis.
//
// A `BTreeMap` keeps labels sorted, so the document is stable across runs.
//
// Each profile's tempo window is written under "tempo". "tempo_range" is
// accepted on input, but a document using it comes back with "tempo" once
// re-saved: values round-trip, key names only for "tempo" documents.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{MusicError, Result};
use crate::fs::write_atomic;
use crate::profile::EmotionProfile;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProfileStore {
    profiles: BTreeMap<String, EmotionProfile>,
}

impl ProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, label: &str) -> Option<&EmotionProfile> {
        self.profiles.get(label)
    }

    pub fn contains(&self, label: &str) -> bool {
        self.profiles.contains_key(label)
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.profiles.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &EmotionProfile)> {
        self.profiles.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    /// Parse a cache document.
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    /// Serialize to the cache document format.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Load the cache document at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| MusicError::io(path, e))?;
        Self::from_json(&text).map_err(|source| MusicError::CacheFormat {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Persist the whole store to `path`, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        let text = self.to_json().map_err(|source| MusicError::CacheFormat {
            path: path.to_path_buf(),
            source,
        })?;
        write_atomic(path, text.as_bytes())
    }
}

impl FromIterator<(String, EmotionProfile)> for ProfileStore {
    fn from_iter<T: IntoIterator<Item = (String, EmotionProfile)>>(iter: T) -> Self {
        ProfileStore {
            profiles: iter.into_iter().collect(),
        }
    }
}

impl Extend<(String, EmotionProfile)> for ProfileStore {
    fn extend<T: IntoIterator<Item = (String, EmotionProfile)>>(&mut self, iter: T) {
        self.profiles.extend(iter);
    }
}
