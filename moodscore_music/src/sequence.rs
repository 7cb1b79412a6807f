// In-memory multi-track event sequence.
//
// A `Sequence` is what generate.rs builds and midi.rs serializes. Each track
// is a list of events whose `delta` is the tick distance from the previous
// event on the same track, exactly as in a Standard MIDI File. Keeping the
// sequence separate from the `midly` types lets the structure be checked
// (every note-on closed by a later note-off of the same key) before a single
// byte is written.

use std::collections::BTreeMap;

/// Ticks per quarter-note beat.
pub const TICKS_PER_BEAT: u32 = 480;
/// Beats per bar (4/4).
pub const BEATS_PER_BAR: u32 = 4;
pub const TICKS_PER_BAR: u32 = TICKS_PER_BEAT * BEATS_PER_BAR;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// Microseconds per quarter note.
    Tempo(u32),
    ProgramChange { channel: u8, program: u8 },
    NoteOn { channel: u8, key: u8, velocity: u8 },
    NoteOff { channel: u8, key: u8 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Event {
    pub delta: u32,
    pub kind: EventKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    pub name: String,
    pub events: Vec<Event>,
}

impl Track {
    pub fn new(name: &str) -> Self {
        Track {
            name: name.to_string(),
            events: Vec::new(),
        }
    }

    pub fn push(&mut self, delta: u32, kind: EventKind) {
        self.events.push(Event { delta, kind });
    }

    /// Absolute tick of the last event.
    pub fn length_ticks(&self) -> u64 {
        self.events.iter().map(|e| e.delta as u64).sum()
    }

    pub fn note_on_count(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e.kind, EventKind::NoteOn { .. }))
            .count()
    }

    /// True if every note-on is followed later on this track by a note-off of
    /// the same channel and key, and no note-off arrives for a key that is
    /// not sounding.
    pub fn is_balanced(&self) -> bool {
        let mut open: BTreeMap<(u8, u8), u32> = BTreeMap::new();
        for event in &self.events {
            match event.kind {
                EventKind::NoteOn { channel, key, .. } => {
                    *open.entry((channel, key)).or_insert(0) += 1;
                }
                EventKind::NoteOff { channel, key } => match open.get_mut(&(channel, key)) {
                    Some(n) if *n > 0 => *n -= 1,
                    _ => return false,
                },
                EventKind::Tempo(_) | EventKind::ProgramChange { .. } => {}
            }
        }
        open.values().all(|&n| n == 0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sequence {
    pub ticks_per_beat: u32,
    pub tracks: Vec<Track>,
}

impl Sequence {
    pub fn new() -> Self {
        Sequence {
            ticks_per_beat: TICKS_PER_BEAT,
            tracks: Vec::new(),
        }
    }

    /// Name of the first unbalanced track, if any.
    pub fn first_unbalanced(&self) -> Option<&str> {
        self.tracks
            .iter()
            .find(|t| !t.is_balanced())
            .map(|t| t.name.as_str())
    }
}

impl Default for Sequence {
    fn default() -> Self {
        Self::new()
    }
}
