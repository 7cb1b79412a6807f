// Emotion profiles: the unit of cached knowledge.
//
// A profile is the compact statistical description of one emotion's music:
// tempo bounds, mode, melody pitch/velocity windows, note density, rhythm
// regularity, and the four-chord progression implied by the mode. Profiles
// are built by analyze.rs, cached in bulk by store.rs, and read by
// generate.rs.
//
// Serialized field names match the cache document: the tempo bounds live
// under "tempo" (with "tempo_range" accepted on input).

use serde::{Deserialize, Serialize};

use crate::error::{MusicError, Result};
use crate::harmony::RomanNumeral;
use crate::mode::Mode;

/// Tempo bounds are clamped into this window after aggregation.
pub const TEMPO_CLAMP: (u32, u32) = (60, 180);
/// Melody pitch window stored in every profile.
pub const PROFILE_PITCH_RANGE: (i32, i32) = (60, 84);
/// Melody velocity window stored in every profile.
pub const PROFILE_VELOCITY_RANGE: (i32, i32) = (60, 100);
/// Label substrings (case-insensitive) that make a profile's rhythm irregular.
pub const IRREGULAR_EMOTIONS: [&str; 3] = ["angry", "fear", "surprise"];
/// The labels produced by the facial-expression classifier upstream.
pub const KNOWN_EMOTIONS: [&str; 7] = [
    "angry", "disgust", "fear", "happy", "sad", "surprise", "neutral",
];

/// How many melody notes occupy a bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoteDensity {
    Low,
    Medium,
    High,
}

impl NoteDensity {
    /// Bucket a mean onset strength: below 0.1 is low, below 0.2 medium.
    pub fn from_onset_mean(onset_mean: f32) -> NoteDensity {
        if onset_mean < 0.1 {
            NoteDensity::Low
        } else if onset_mean < 0.2 {
            NoteDensity::Medium
        } else {
            NoteDensity::High
        }
    }

    pub fn notes_per_bar(self) -> u32 {
        match self {
            NoteDensity::Low => 4,
            NoteDensity::Medium => 8,
            NoteDensity::High => 16,
        }
    }
}

/// Whether melody notes keep their nominal length or are randomly stretched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RhythmPattern {
    Regular,
    Irregular,
}

impl RhythmPattern {
    /// Derived from the label text, not from audio.
    pub fn for_label(label: &str) -> RhythmPattern {
        let lower = label.to_lowercase();
        if IRREGULAR_EMOTIONS.iter().any(|e| lower.contains(e)) {
            RhythmPattern::Irregular
        } else {
            RhythmPattern::Regular
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmotionProfile {
    #[serde(rename = "tempo", alias = "tempo_range")]
    pub tempo_range: (u32, u32),
    pub mode: Mode,
    pub pitch_range: (i32, i32),
    pub velocity_range: (i32, i32),
    pub note_density: NoteDensity,
    pub rhythm_pattern: RhythmPattern,
    pub chord_progression: [RomanNumeral; 4],
}

impl Default for EmotionProfile {
    fn default() -> Self {
        EmotionProfile {
            tempo_range: (90, 120),
            mode: Mode::Major,
            pitch_range: PROFILE_PITCH_RANGE,
            velocity_range: PROFILE_VELOCITY_RANGE,
            note_density: NoteDensity::Medium,
            rhythm_pattern: RhythmPattern::Regular,
            chord_progression: Mode::Major.chord_progression(),
        }
    }
}

impl EmotionProfile {
    /// The profile substituted when a label has no decodable recordings.
    pub fn default_profile() -> Self {
        Self::default()
    }

    /// Check the invariants generation relies on. `label` is only used in the
    /// error message.
    pub fn validate(&self, label: &str) -> Result<()> {
        let invalid = |reason: String| MusicError::InvalidProfile {
            label: label.to_string(),
            reason,
        };
        let (lo, hi) = self.tempo_range;
        if lo == 0 || lo > hi {
            return Err(invalid(format!("tempo range [{lo}, {hi}]")));
        }
        let (lo, hi) = self.pitch_range;
        if lo > hi {
            return Err(invalid(format!("pitch range [{lo}, {hi}]")));
        }
        let (lo, hi) = self.velocity_range;
        if lo > hi {
            return Err(invalid(format!("velocity range [{lo}, {hi}]")));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_profile_values() {
        let p = EmotionProfile::default_profile();
        assert_eq!(p.tempo_range, (90, 120));
        assert_eq!(p.mode, Mode::Major);
        assert_eq!(p.pitch_range, (60, 84));
        assert_eq!(p.velocity_range, (60, 100));
        assert_eq!(p.note_density, NoteDensity::Medium);
        assert_eq!(p.rhythm_pattern, RhythmPattern::Regular);
        assert_eq!(
            p.chord_progression,
            [RomanNumeral::I, RomanNumeral::IV, RomanNumeral::V, RomanNumeral::I]
        );
        assert!(p.validate("neutral").is_ok());
    }

    #[test]
    fn test_density_buckets() {
        assert_eq!(NoteDensity::from_onset_mean(0.0), NoteDensity::Low);
        assert_eq!(NoteDensity::from_onset_mean(0.099), NoteDensity::Low);
        assert_eq!(NoteDensity::from_onset_mean(0.1), NoteDensity::Medium);
        assert_eq!(NoteDensity::from_onset_mean(0.199), NoteDensity::Medium);
        assert_eq!(NoteDensity::from_onset_mean(0.2), NoteDensity::High);
        assert_eq!(NoteDensity::from_onset_mean(0.9), NoteDensity::High);
    }

    #[test]
    fn test_notes_per_bar_divide_a_bar() {
        for d in [NoteDensity::Low, NoteDensity::Medium, NoteDensity::High] {
            assert_eq!(1920 % d.notes_per_bar(), 0);
        }
        assert_eq!(1920 / NoteDensity::Medium.notes_per_bar(), 240);
    }

    #[test]
    fn test_rhythm_from_label() {
        assert_eq!(RhythmPattern::for_label("angry"), RhythmPattern::Irregular);
        assert_eq!(RhythmPattern::for_label("Fearful"), RhythmPattern::Irregular);
        assert_eq!(RhythmPattern::for_label("SURPRISE_2"), RhythmPattern::Irregular);
        assert_eq!(RhythmPattern::for_label("happy"), RhythmPattern::Regular);
        assert_eq!(RhythmPattern::for_label("sad"), RhythmPattern::Regular);
    }

    #[test]
    fn test_validate_rejects_inverted_ranges() {
        let p = EmotionProfile {
            tempo_range: (130, 100),
            ..Default::default()
        };
        assert!(matches!(
            p.validate("x"),
            Err(MusicError::InvalidProfile { .. })
        ));

        let p = EmotionProfile {
            tempo_range: (0, 0),
            ..Default::default()
        };
        assert!(p.validate("x").is_err());

        let p = EmotionProfile {
            velocity_range: (100, 60),
            ..Default::default()
        };
        assert!(p.validate("x").is_err());
    }

    #[test]
    fn test_cache_field_names() {
        let json = serde_json::to_value(EmotionProfile::default()).unwrap();
        assert_eq!(json["tempo"], serde_json::json!([90, 120]));
        assert_eq!(json["mode"], "major");
        assert_eq!(json["note_density"], "medium");
        assert_eq!(json["rhythm_pattern"], "regular");
        assert_eq!(json["chord_progression"], serde_json::json!(["I", "IV", "V", "I"]));

        let aliased = r#"{"tempo_range":[70,90],"mode":"minor","pitch_range":[60,84],
            "velocity_range":[60,100],"note_density":"low","rhythm_pattern":"irregular",
            "chord_progression":["i","VI","III","VII"]}"#;
        let p: EmotionProfile = serde_json::from_str(aliased).unwrap();
        assert_eq!(p.tempo_range, (70, 90));
        assert_eq!(p.mode, Mode::Minor);
    }
}
