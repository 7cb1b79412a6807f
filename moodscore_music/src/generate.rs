// Profile-driven sequence generation.
//
// One call turns (profile, duration) into a three-track sequence:
// - "Tempo": a single set-tempo event at tick 0
// - "Chords": the profile's progression, one sustained triad per bar,
//   cycling every four bars
// - "Melody": `notes_per_bar` random notes per bar, each note-on followed
//   directly by its note-off
//
// Random draws, in order: the tempo, then per bar and per melody slot the
// pitch, the velocity, and (irregular rhythm only) the duration factor. With
// a seeded RNG the output is byte-for-byte reproducible.
//
// Durations are bounded by `MAX_BARS`; anything longer is an
// `InvalidDuration` before a single event is built.
//
// The sequence is fully built and checked in memory before midi.rs writes
// anything, so a failed call never leaves a file behind.

use std::path::{Path, PathBuf};

use rand::Rng;
use tracing::info;

use crate::error::{MusicError, Result};
use crate::midi::write_sequence;
use crate::profile::{EmotionProfile, RhythmPattern};
use crate::sequence::{BEATS_PER_BAR, EventKind, Sequence, TICKS_PER_BAR, Track};
use crate::store::ProfileStore;

pub const CHORD_CHANNEL: u8 = 0;
pub const MELODY_CHANNEL: u8 = 1;
/// General MIDI acoustic grand piano.
pub const PROGRAM: u8 = 0;
pub const CHORD_VELOCITY: u8 = 80;
/// Shortest melody note an irregular rhythm may produce.
pub const MIN_NOTE_TICKS: u32 = 60;
/// Irregular-rhythm duration factors and their probabilities.
pub const DURATION_SCALES: [(f64, f64); 3] = [(0.5, 0.3), (1.0, 0.5), (1.5, 0.2)];

/// The numbers a sequence was laid out with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    pub tempo_bpm: u32,
    pub bars: u32,
    pub notes_per_bar: u32,
    pub note_ticks: u32,
}

/// Upper bound on encoded melody bytes per bar: 16 notes, two events each,
/// at most a 4-byte delta plus a 3-byte message per event.
const MAX_TRACK_BYTES_PER_BAR: u32 = 256;
/// Most bars whose melody track still fits an SMF chunk's 32-bit length.
pub const MAX_BARS: u32 = u32::MAX / MAX_TRACK_BYTES_PER_BAR;

/// Whole 4/4 bars that fit in `duration_seconds` at `tempo_bpm`. Durations
/// that would need more than `MAX_BARS` are rejected.
pub fn bar_count(duration_seconds: f64, tempo_bpm: u32) -> Result<u32> {
    let bars = (duration_seconds * tempo_bpm as f64 / 60.0 / BEATS_PER_BAR as f64).floor();
    if !bars.is_finite() || bars < 0.0 || bars > MAX_BARS as f64 {
        return Err(MusicError::InvalidDuration(duration_seconds));
    }
    Ok(bars as u32)
}

/// Microseconds per quarter note at `tempo_bpm`.
pub fn tempo_micros(tempo_bpm: u32) -> u32 {
    60_000_000 / tempo_bpm.max(1)
}

fn clamp_midi(v: i32) -> u8 {
    v.clamp(0, 127) as u8
}

/// Draw a duration factor from `DURATION_SCALES`.
fn draw_scale(rng: &mut impl Rng) -> f64 {
    let u: f64 = rng.random_range(0.0..1.0);
    let mut cumulative = 0.0;
    for (scale, p) in DURATION_SCALES {
        cumulative += p;
        if u < cumulative {
            return scale;
        }
    }
    DURATION_SCALES[DURATION_SCALES.len() - 1].0
}

/// Length of one melody note in ticks.
pub fn melody_note_ticks(nominal: u32, rhythm: RhythmPattern, rng: &mut impl Rng) -> u32 {
    match rhythm {
        RhythmPattern::Regular => nominal,
        RhythmPattern::Irregular => {
            let scaled = (nominal as f64 * draw_scale(rng)).floor() as u32;
            scaled.max(MIN_NOTE_TICKS)
        }
    }
}

/// Build the sequence for one profile. The profile must already be valid.
pub fn compose(
    profile: &EmotionProfile,
    duration_seconds: f64,
    rng: &mut impl Rng,
) -> Result<(Sequence, Layout)> {
    let (tempo_lo, tempo_hi) = profile.tempo_range;
    let tempo_bpm = rng.random_range(tempo_lo..=tempo_hi);
    let notes_per_bar = profile.note_density.notes_per_bar();
    let layout = Layout {
        tempo_bpm,
        bars: bar_count(duration_seconds, tempo_bpm)?,
        notes_per_bar,
        note_ticks: TICKS_PER_BAR / notes_per_bar,
    };

    let mut tempo = Track::new("Tempo");
    tempo.push(0, EventKind::Tempo(tempo_micros(tempo_bpm)));

    let mut chords = Track::new("Chords");
    chords.push(
        0,
        EventKind::ProgramChange {
            channel: CHORD_CHANNEL,
            program: PROGRAM,
        },
    );

    let mut melody = Track::new("Melody");
    melody.push(
        0,
        EventKind::ProgramChange {
            channel: MELODY_CHANNEL,
            program: PROGRAM,
        },
    );

    let (pitch_lo, pitch_hi) = profile.pitch_range;
    let (vel_lo, vel_hi) = profile.velocity_range;

    for bar in 0..layout.bars {
        let numeral = profile.chord_progression[bar as usize % profile.chord_progression.len()];
        let pitches = numeral.pitches()?;
        for key in pitches {
            chords.push(
                0,
                EventKind::NoteOn {
                    channel: CHORD_CHANNEL,
                    key,
                    velocity: CHORD_VELOCITY,
                },
            );
        }
        for (i, key) in pitches.into_iter().enumerate() {
            let delta = if i == 0 { TICKS_PER_BAR } else { 0 };
            chords.push(
                delta,
                EventKind::NoteOff {
                    channel: CHORD_CHANNEL,
                    key,
                },
            );
        }

        for _ in 0..layout.notes_per_bar {
            let key = clamp_midi(rng.random_range(pitch_lo..=pitch_hi));
            let velocity = clamp_midi(rng.random_range(vel_lo..=vel_hi));
            let ticks = melody_note_ticks(layout.note_ticks, profile.rhythm_pattern, rng);
            melody.push(
                0,
                EventKind::NoteOn {
                    channel: MELODY_CHANNEL,
                    key,
                    velocity,
                },
            );
            melody.push(
                ticks,
                EventKind::NoteOff {
                    channel: MELODY_CHANNEL,
                    key,
                },
            );
        }
    }

    let mut sequence = Sequence::new();
    sequence.tracks.extend([tempo, chords, melody]);
    Ok((sequence, layout))
}

/// Generate a sequence for `emotion` and write it to
/// `output_dir/output_name`. Returns the written path.
pub fn generate(
    store: &ProfileStore,
    emotion: &str,
    duration_seconds: f64,
    output_dir: &Path,
    output_name: &str,
    rng: &mut impl Rng,
) -> Result<PathBuf> {
    let profile = store
        .get(emotion)
        .ok_or_else(|| MusicError::UnknownEmotion(emotion.to_string()))?;
    profile.validate(emotion)?;
    if !duration_seconds.is_finite() || duration_seconds < 0.0 {
        return Err(MusicError::InvalidDuration(duration_seconds));
    }

    let (sequence, layout) = compose(profile, duration_seconds, rng)?;
    if let Some(track) = sequence.first_unbalanced() {
        return Err(MusicError::UnbalancedTrack(track.to_string()));
    }

    let path = output_dir.join(output_name);
    write_sequence(&sequence, &path)?;
    info!(
        emotion,
        tempo = layout.tempo_bpm,
        bars = layout.bars,
        notes_per_bar = layout.notes_per_bar,
        path = %path.display(),
        "wrote sequence"
    );
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mode::Mode;
    use crate::profile::NoteDensity;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn profile_with(
        tempo: (u32, u32),
        density: NoteDensity,
        rhythm: RhythmPattern,
    ) -> EmotionProfile {
        EmotionProfile {
            tempo_range: tempo,
            note_density: density,
            rhythm_pattern: rhythm,
            ..EmotionProfile::default()
        }
    }

    fn note_offs(track: &Track) -> Vec<u32> {
        track
            .events
            .iter()
            .filter(|e| matches!(e.kind, EventKind::NoteOff { .. }))
            .map(|e| e.delta)
            .collect()
    }

    #[test]
    fn test_bar_count() {
        assert_eq!(bar_count(30.0, 120).unwrap(), 15);
        assert_eq!(bar_count(10.0, 90).unwrap(), 3); // 3.75
        assert_eq!(bar_count(1.0, 60).unwrap(), 0);
        assert_eq!(bar_count(0.0, 180).unwrap(), 0);
    }

    #[test]
    fn test_bar_count_rejects_oversized_durations() {
        // 1e12 s at 120 BPM is 5e11 bars, far past what a track can hold.
        assert!(matches!(
            bar_count(1.0e12, 120),
            Err(MusicError::InvalidDuration(d)) if d == 1.0e12
        ));
        let limit = MAX_BARS as f64 * 2.0; // seconds for MAX_BARS at 120 BPM
        assert_eq!(bar_count(limit, 120).unwrap(), MAX_BARS);
        assert!(bar_count(limit + 2.0, 120).is_err());
    }

    #[test]
    fn test_generate_huge_duration_is_error_and_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store: ProfileStore = [("calm".to_string(), EmotionProfile::default())]
            .into_iter()
            .collect();
        let result = generate(
            &store,
            "calm",
            1.0e12,
            dir.path(),
            "calm.mid",
            &mut StdRng::seed_from_u64(3),
        );
        assert!(matches!(result, Err(MusicError::InvalidDuration(_))));
        assert!(!dir.path().join("calm.mid").exists());
    }

    #[test]
    fn test_tempo_micros() {
        assert_eq!(tempo_micros(120), 500_000);
        assert_eq!(tempo_micros(60), 1_000_000);
    }

    #[test]
    fn test_compose_regular_layout() {
        let p = profile_with((120, 120), NoteDensity::Medium, RhythmPattern::Regular);
        let mut rng = StdRng::seed_from_u64(5);
        let (seq, layout) = compose(&p, 30.0, &mut rng).unwrap();

        assert_eq!(
            layout,
            Layout {
                tempo_bpm: 120,
                bars: 15,
                notes_per_bar: 8,
                note_ticks: 240
            }
        );
        assert_eq!(seq.tracks.len(), 3);

        let tempo = &seq.tracks[0];
        assert_eq!(tempo.events.len(), 1);
        assert_eq!(tempo.events[0].kind, EventKind::Tempo(500_000));

        let chords = &seq.tracks[1];
        assert_eq!(chords.note_on_count(), 15 * 3);
        assert_eq!(chords.length_ticks(), 15 * 1920);
        assert!(chords.is_balanced());

        let melody = &seq.tracks[2];
        assert_eq!(melody.note_on_count(), 15 * 8);
        assert!(note_offs(melody).iter().all(|&d| d == 240));
        assert_eq!(melody.length_ticks(), 15 * 1920);
        assert!(melody.is_balanced());
    }

    #[test]
    fn test_chords_follow_progression() {
        let p = EmotionProfile {
            mode: Mode::Minor,
            chord_progression: Mode::Minor.chord_progression(),
            ..profile_with((60, 60), NoteDensity::Low, RhythmPattern::Regular)
        };
        let (seq, layout) = compose(&p, 20.0, &mut StdRng::seed_from_u64(0)).unwrap();
        assert_eq!(layout.bars, 5);

        let roots: Vec<u8> = seq.tracks[1]
            .events
            .iter()
            .filter_map(|e| match e.kind {
                EventKind::NoteOn { key, .. } => Some(key),
                _ => None,
            })
            .step_by(3)
            .collect();
        // i, VI, III, VII, then i again.
        assert_eq!(roots, vec![60, 68, 63, 70, 60]);
    }

    #[test]
    fn test_melody_respects_ranges() {
        let p = EmotionProfile {
            pitch_range: (70, 72),
            velocity_range: (120, 140),
            ..profile_with((100, 140), NoteDensity::High, RhythmPattern::Regular)
        };
        let (seq, _) = compose(&p, 20.0, &mut StdRng::seed_from_u64(11)).unwrap();
        for e in &seq.tracks[2].events {
            if let EventKind::NoteOn { key, velocity, .. } = e.kind {
                assert!((70..=72).contains(&key));
                assert!((120..=127).contains(&velocity));
            }
        }
    }

    #[test]
    fn test_irregular_durations_have_floor_and_known_values() {
        let mut rng = StdRng::seed_from_u64(3);
        for nominal in [120, 240, 480] {
            for _ in 0..500 {
                let t = melody_note_ticks(nominal, RhythmPattern::Irregular, &mut rng);
                assert!(t >= MIN_NOTE_TICKS);
                assert!([nominal / 2, nominal, nominal * 3 / 2].contains(&t));
            }
        }
        // 16th notes halved would be 60 ticks, exactly the floor.
        for _ in 0..200 {
            assert!(melody_note_ticks(100, RhythmPattern::Irregular, &mut rng) >= 60);
        }
    }

    #[test]
    fn test_irregular_melody_is_balanced() {
        let p = profile_with((150, 170), NoteDensity::High, RhythmPattern::Irregular);
        let (seq, _) = compose(&p, 45.0, &mut StdRng::seed_from_u64(8)).unwrap();
        assert!(seq.first_unbalanced().is_none());
        assert!(note_offs(&seq.tracks[2]).iter().all(|&d| d >= 60));
    }

    #[test]
    fn test_short_duration_has_no_notes() {
        let p = profile_with((90, 120), NoteDensity::Medium, RhythmPattern::Regular);
        let (seq, layout) = compose(&p, 0.5, &mut StdRng::seed_from_u64(1)).unwrap();
        assert_eq!(layout.bars, 0);
        assert_eq!(seq.tracks[1].events.len(), 1);
        assert_eq!(seq.tracks[2].events.len(), 1);
    }

    #[test]
    fn test_same_seed_same_sequence() {
        let p = profile_with((80, 160), NoteDensity::High, RhythmPattern::Irregular);
        let a = compose(&p, 20.0, &mut StdRng::seed_from_u64(42)).unwrap();
        let b = compose(&p, 20.0, &mut StdRng::seed_from_u64(42)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_scale_distribution_roughly_matches_weights() {
        let mut rng = StdRng::seed_from_u64(77);
        let n = 10_000;
        let mut counts = [0usize; 3];
        for _ in 0..n {
            let s = draw_scale(&mut rng);
            let i = DURATION_SCALES.iter().position(|&(v, _)| v == s).unwrap();
            counts[i] += 1;
        }
        for (i, &(_, p)) in DURATION_SCALES.iter().enumerate() {
            let observed = counts[i] as f64 / n as f64;
            assert!((observed - p).abs() < 0.03, "scale {i}: {observed}");
        }
    }

    #[test]
    fn test_unknown_emotion_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store: ProfileStore = [("happy".to_string(), EmotionProfile::default())]
            .into_iter()
            .collect();
        let err = generate(
            &store,
            "melancholy",
            30.0,
            dir.path(),
            "out.mid",
            &mut StdRng::seed_from_u64(0),
        )
        .unwrap_err();
        assert!(matches!(err, MusicError::UnknownEmotion(ref e) if e == "melancholy"));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_invalid_duration_and_profile_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let bad = EmotionProfile {
            tempo_range: (150, 90),
            ..EmotionProfile::default()
        };
        let store: ProfileStore = [
            ("happy".to_string(), EmotionProfile::default()),
            ("broken".to_string(), bad),
        ]
        .into_iter()
        .collect();
        let mut rng = StdRng::seed_from_u64(0);

        assert!(matches!(
            generate(&store, "happy", -1.0, dir.path(), "a.mid", &mut rng),
            Err(MusicError::InvalidDuration(_))
        ));
        assert!(matches!(
            generate(&store, "happy", f64::NAN, dir.path(), "a.mid", &mut rng),
            Err(MusicError::InvalidDuration(_))
        ));
        assert!(matches!(
            generate(&store, "broken", 10.0, dir.path(), "b.mid", &mut rng),
            Err(MusicError::InvalidProfile { .. })
        ));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
