// Harmonic lookup tables.
//
// Two immutable tables drive chord realization:
// - note names (with enharmonic spellings) to semitones above C
// - roman-numeral chord symbols to the three note names of the triad, spelled
//   in C (major numerals) or C minor (minor numerals)
//
// A chord is realized by looking up its note names, converting each to a
// pitch class, and transposing into octave 4 (C4 = MIDI 60).

use serde::{Deserialize, Serialize};

use crate::error::{MusicError, Result};

/// MIDI pitch of C4; chord tones are placed in the octave starting here.
pub const CHORD_OCTAVE_BASE: i32 = 60;

/// Note name to semitones above C.
pub const NOTE_SEMITONES: [(&str, u8); 17] = [
    ("C", 0),
    ("C#", 1),
    ("Db", 1),
    ("D", 2),
    ("D#", 3),
    ("Eb", 3),
    ("E", 4),
    ("F", 5),
    ("F#", 6),
    ("Gb", 6),
    ("G", 7),
    ("G#", 8),
    ("Ab", 8),
    ("A", 9),
    ("A#", 10),
    ("Bb", 10),
    ("B", 11),
];

/// Semitones above C for a note name, if the name is in the table.
pub fn note_semitone(name: &str) -> Option<u8> {
    NOTE_SEMITONES
        .iter()
        .find(|(n, _)| *n == name)
        .map(|&(_, semis)| semis)
}

/// Chord symbols, serialized exactly as they are written.
#[allow(clippy::upper_case_acronyms)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RomanNumeral {
    #[serde(rename = "I")]
    I,
    #[serde(rename = "ii")]
    Ii,
    #[serde(rename = "iii")]
    Iii,
    #[serde(rename = "IV")]
    IV,
    #[serde(rename = "V")]
    V,
    #[serde(rename = "vi")]
    Vi,
    #[serde(rename = "vii°")]
    ViiDim,
    #[serde(rename = "i")]
    MinorI,
    #[serde(rename = "ii°")]
    IiDim,
    #[serde(rename = "III")]
    III,
    #[serde(rename = "iv")]
    MinorIv,
    #[serde(rename = "v")]
    MinorV,
    #[serde(rename = "VI")]
    VI,
    #[serde(rename = "VII")]
    VII,
    #[serde(rename = "bVII")]
    FlatVII,
}

impl RomanNumeral {
    pub const ALL: [RomanNumeral; 15] = [
        RomanNumeral::I,
        RomanNumeral::Ii,
        RomanNumeral::Iii,
        RomanNumeral::IV,
        RomanNumeral::V,
        RomanNumeral::Vi,
        RomanNumeral::ViiDim,
        RomanNumeral::MinorI,
        RomanNumeral::IiDim,
        RomanNumeral::III,
        RomanNumeral::MinorIv,
        RomanNumeral::MinorV,
        RomanNumeral::VI,
        RomanNumeral::VII,
        RomanNumeral::FlatVII,
    ];

    pub fn symbol(self) -> &'static str {
        match self {
            RomanNumeral::I => "I",
            RomanNumeral::Ii => "ii",
            RomanNumeral::Iii => "iii",
            RomanNumeral::IV => "IV",
            RomanNumeral::V => "V",
            RomanNumeral::Vi => "vi",
            RomanNumeral::ViiDim => "vii°",
            RomanNumeral::MinorI => "i",
            RomanNumeral::IiDim => "ii°",
            RomanNumeral::III => "III",
            RomanNumeral::MinorIv => "iv",
            RomanNumeral::MinorV => "v",
            RomanNumeral::VI => "VI",
            RomanNumeral::VII => "VII",
            RomanNumeral::FlatVII => "bVII",
        }
    }

    /// Triad spelled as note names, root first.
    pub fn note_names(self) -> [&'static str; 3] {
        match self {
            RomanNumeral::I => ["C", "E", "G"],
            RomanNumeral::Ii => ["D", "F", "A"],
            RomanNumeral::Iii => ["E", "G", "B"],
            RomanNumeral::IV => ["F", "A", "C"],
            RomanNumeral::V => ["G", "B", "D"],
            RomanNumeral::Vi => ["A", "C", "E"],
            RomanNumeral::ViiDim => ["B", "D", "F"],
            RomanNumeral::MinorI => ["C", "Eb", "G"],
            RomanNumeral::IiDim => ["D", "F", "Ab"],
            RomanNumeral::III => ["Eb", "G", "Bb"],
            RomanNumeral::MinorIv => ["F", "Ab", "C"],
            RomanNumeral::MinorV => ["G", "Bb", "D"],
            RomanNumeral::VI => ["Ab", "C", "Eb"],
            RomanNumeral::VII | RomanNumeral::FlatVII => ["Bb", "D", "F"],
        }
    }

    /// MIDI pitches of the triad in octave 4, each clamped to [0, 127].
    pub fn pitches(self) -> Result<[u8; 3]> {
        let mut out = [0u8; 3];
        for (slot, name) in out.iter_mut().zip(self.note_names()) {
            let semis =
                note_semitone(name).ok_or_else(|| MusicError::UnknownNote(name.to_string()))?;
            *slot = (CHORD_OCTAVE_BASE + semis as i32).clamp(0, 127) as u8;
        }
        Ok(out)
    }
}

impl std::fmt::Display for RomanNumeral {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.symbol())
    }
}
