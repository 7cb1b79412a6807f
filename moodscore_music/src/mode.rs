// Major/minor mode support.
//
// Each mode is defined by its scale intervals from the tonic; as a 12-bin
// pitch-class mask (tonic = C) it doubles as the template a recording's
// summed chroma is correlated against to decide which mode it sounds like.
// The mode also fixes the four-chord progression a profile carries.
//
// Used by analyze.rs for per-file mode detection and by profile.rs for the
// progression stored with each profile.

use serde::{Deserialize, Serialize};

use crate::harmony::RomanNumeral;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// C D E F G A B
    Major,
    /// C D Eb F G Ab Bb (natural minor)
    Minor,
}

impl Mode {
    pub const ALL: [Mode; 2] = [Mode::Major, Mode::Minor];

    /// Semitone intervals from the tonic to each scale degree.
    pub fn intervals(self) -> [u8; 7] {
        match self {
            Mode::Major => [0, 2, 4, 5, 7, 9, 11],
            Mode::Minor => [0, 2, 3, 5, 7, 8, 10],
        }
    }

    /// Binary pitch-class mask with the tonic at pitch class 0.
    pub fn template(self) -> [f32; 12] {
        let mut mask = [0.0f32; 12];
        for &interval in &self.intervals() {
            mask[interval as usize] = 1.0;
        }
        mask
    }

    /// The fixed cyclic progression used for the accompaniment.
    pub fn chord_progression(self) -> [RomanNumeral; 4] {
        match self {
            Mode::Major => [
                RomanNumeral::I,
                RomanNumeral::IV,
                RomanNumeral::V,
                RomanNumeral::I,
            ],
            Mode::Minor => [
                RomanNumeral::MinorI,
                RomanNumeral::VI,
                RomanNumeral::III,
                RomanNumeral::VII,
            ],
        }
    }

    /// Classify a summed chroma profile by which template it correlates with
    /// more strongly. Ties (including a silent profile) go to major.
    pub fn detect(pitch_profile: &[f32; 12]) -> Mode {
        let major = correlation(pitch_profile, &Mode::Major.template());
        let minor = correlation(pitch_profile, &Mode::Minor.template());
        if minor > major { Mode::Minor } else { Mode::Major }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mode::Major => f.write_str("major"),
            Mode::Minor => f.write_str("minor"),
        }
    }
}

/// Pearson correlation of two 12-bin vectors; 0.0 if either is constant.
fn correlation(a: &[f32; 12], b: &[f32; 12]) -> f32 {
    let mean_a = a.iter().sum::<f32>() / 12.0;
    let mean_b = b.iter().sum::<f32>() / 12.0;
    let mut cov = 0.0;
    let mut var_a = 0.0;
    let mut var_b = 0.0;
    for (x, y) in a.iter().zip(b) {
        let (dx, dy) = (x - mean_a, y - mean_b);
        cov += dx * dy;
        var_a += dx * dx;
        var_b += dy * dy;
    }
    if var_a <= 0.0 || var_b <= 0.0 {
        return 0.0;
    }
    cov / (var_a.sqrt() * var_b.sqrt())
}
