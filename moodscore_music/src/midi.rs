// MIDI output from generated sequences.
//
// Converts a `Sequence` into a Standard MIDI File, Format 1 (multi-track,
// one tempo track plus the instrument tracks), with metrical timing at the
// sequence's ticks per beat. Each track opens with a track-name meta event
// and closes with End of Track.
//
// Uses the `midly` crate for encoding. The file is encoded fully in memory
// and then written through fs.rs, so a failed write never leaves a truncated
// .mid behind.

use std::path::Path;

use midly::{
    Format, Header, MetaMessage, MidiMessage, Smf, Timing, TrackEvent, TrackEventKind,
    num::{u4, u7, u15, u24, u28},
};

use crate::error::{MusicError, Result};
use crate::fs::write_atomic;
use crate::sequence::{EventKind, Sequence, Track};

/// Largest value a set-tempo meta event can carry.
const MAX_TEMPO_MICROS: u32 = 0xFF_FFFF;
/// Largest metrical division a header can carry.
const MAX_TICKS_PER_BEAT: u32 = 0x7FFF;

/// Encode `sequence` as SMF bytes and write them to `path`.
pub fn write_sequence(sequence: &Sequence, path: &Path) -> Result<()> {
    let bytes = encode(sequence).map_err(|e| MusicError::io(path, e))?;
    write_atomic(path, &bytes)
}

/// Encode `sequence` as SMF bytes.
pub fn encode(sequence: &Sequence) -> std::io::Result<Vec<u8>> {
    let smf = sequence_to_smf(sequence);
    let mut buf = Vec::new();
    smf.write_std(&mut buf)?;
    Ok(buf)
}

/// Convert a Sequence to an in-memory SMF.
fn sequence_to_smf(sequence: &Sequence) -> Smf<'_> {
    let ticks_per_beat = sequence.ticks_per_beat.min(MAX_TICKS_PER_BEAT) as u16;
    let mut smf = Smf::new(Header::new(
        Format::Parallel,
        Timing::Metrical(u15::new(ticks_per_beat)),
    ));
    smf.tracks = sequence.tracks.iter().map(track_events).collect();
    smf
}

fn track_events(track: &Track) -> Vec<TrackEvent<'_>> {
    let mut events = Vec::with_capacity(track.events.len() + 2);

    events.push(TrackEvent {
        delta: u28::new(0),
        kind: TrackEventKind::Meta(MetaMessage::TrackName(track.name.as_bytes())),
    });

    for event in &track.events {
        let kind = match event.kind {
            EventKind::Tempo(micros) => {
                TrackEventKind::Meta(MetaMessage::Tempo(u24::new(micros.min(MAX_TEMPO_MICROS))))
            }
            EventKind::ProgramChange { channel, program } => TrackEventKind::Midi {
                channel: u4::new(channel & 0x0F),
                message: MidiMessage::ProgramChange {
                    program: u7::new(program & 0x7F),
                },
            },
            EventKind::NoteOn {
                channel,
                key,
                velocity,
            } => TrackEventKind::Midi {
                channel: u4::new(channel & 0x0F),
                message: MidiMessage::NoteOn {
                    key: u7::new(key & 0x7F),
                    vel: u7::new(velocity & 0x7F),
                },
            },
            EventKind::NoteOff { channel, key } => TrackEventKind::Midi {
                channel: u4::new(channel & 0x0F),
                message: MidiMessage::NoteOff {
                    key: u7::new(key & 0x7F),
                    vel: u7::new(0),
                },
            },
        };
        events.push(TrackEvent {
            delta: u28::new(event.delta),
            kind,
        });
    }

    events.push(TrackEvent {
        delta: u28::new(0),
        kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
    });
    events
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_sequence() -> Sequence {
        let mut tempo = Track::new("Tempo");
        tempo.push(0, EventKind::Tempo(500_000));

        let mut chords = Track::new("Chords");
        chords.push(0, EventKind::ProgramChange { channel: 0, program: 0 });
        for key in [60, 64, 67] {
            chords.push(0, EventKind::NoteOn { channel: 0, key, velocity: 80 });
        }
        chords.push(1920, EventKind::NoteOff { channel: 0, key: 60 });
        chords.push(0, EventKind::NoteOff { channel: 0, key: 64 });
        chords.push(0, EventKind::NoteOff { channel: 0, key: 67 });

        let mut seq = Sequence::new();
        seq.tracks.push(tempo);
        seq.tracks.push(chords);
        seq
    }

    #[test]
    fn test_sequence_to_smf_basic() {
        let seq = small_sequence();
        let smf = sequence_to_smf(&seq);
        assert_eq!(smf.tracks.len(), 2);
        assert_eq!(smf.header.format, Format::Parallel);
        assert_eq!(smf.header.timing, Timing::Metrical(u15::new(480)));
        // name + tempo + end of track
        assert_eq!(smf.tracks[0].len(), 3);
        // name + program + 3 on + 3 off + end of track
        assert_eq!(smf.tracks[1].len(), 9);
    }

    #[test]
    fn test_encoded_bytes_parse_back() {
        let bytes = encode(&small_sequence()).unwrap();
        assert_eq!(&bytes[..4], b"MThd");

        let smf = Smf::parse(&bytes).unwrap();
        assert_eq!(smf.tracks.len(), 2);
        assert!(matches!(
            smf.tracks[0][1].kind,
            TrackEventKind::Meta(MetaMessage::Tempo(t)) if t.as_int() == 500_000
        ));
        let last = smf.tracks[1].last().unwrap();
        assert!(matches!(last.kind, TrackEventKind::Meta(MetaMessage::EndOfTrack)));
        let total: u32 = smf.tracks[1].iter().map(|e| e.delta.as_int()).sum();
        assert_eq!(total, 1920);
    }

    #[test]
    fn test_slow_tempo_is_clamped_to_meta_range() {
        let mut seq = Sequence::new();
        let mut tempo = Track::new("Tempo");
        tempo.push(0, EventKind::Tempo(60_000_000));
        seq.tracks.push(tempo);
        let bytes = encode(&seq).unwrap();
        let smf = Smf::parse(&bytes).unwrap();
        assert!(matches!(
            smf.tracks[0][1].kind,
            TrackEventKind::Meta(MetaMessage::Tempo(t)) if t.as_int() == MAX_TEMPO_MICROS
        ));
    }

    #[test]
    fn test_write_sequence_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("output/song.mid");
        write_sequence(&small_sequence(), &path).unwrap();
        let bytes = std::fs::read(&path).unwrap();
        assert!(Smf::parse(&bytes).is_ok());
    }
}
