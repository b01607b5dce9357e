//! Piano keys and pitch/frequency conversion.
//!
//! Pitch is linear in semitones with A-4 (440 Hz) as pitch 0.

/// Note numbers and the two sentinel values used in song data.
pub mod notes {
    pub const C: u8 = 0;
    pub const C_S: u8 = 1;
    pub const D: u8 = 2;
    pub const D_S: u8 = 3;
    pub const E: u8 = 4;
    pub const F: u8 = 5;
    pub const F_S: u8 = 6;
    pub const G: u8 = 7;
    pub const G_S: u8 = 8;
    pub const A: u8 = 9;
    pub const A_S: u8 = 10;
    pub const B: u8 = 11;

    pub const PITCHES_PER_OCTAVE: u8 = 12;
    /// Octave holding the reference pitch.
    pub const OCTAVE_PITCH_OFFSET: u8 = 4;
    /// Note holding the reference pitch.
    pub const NOTE_PITCH_OFFSET: u8 = A;

    /// Trigger the release of the held note.
    pub const RELEASE: u8 = 244;
    /// Empty value: keep whatever the channel already holds.
    pub const CONTINUE: u8 = 255;
}

/// Frequency of pitch 0.
pub const REFERENCE_FREQ: f32 = 440.0;

/// A piano key: note (0-11) and octave (0-8), or one of the sentinels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Key {
    pub note: u8,
    pub octave: u8,
}

impl Key {
    /// No new note on this row.
    pub const CONTINUE: Key = Key { note: notes::CONTINUE, octave: notes::CONTINUE };
    /// Release the currently held note.
    pub const RELEASE: Key = Key { note: notes::RELEASE, octave: notes::RELEASE };

    pub const fn new(note: u8, octave: u8) -> Self {
        Self { note, octave }
    }

    pub const fn is_continue(self) -> bool {
        self.note == notes::CONTINUE
    }

    pub const fn is_release(self) -> bool {
        self.note == notes::RELEASE
    }

    /// Linear pitch of the key, or `None` for the sentinels.
    pub fn pitch(self) -> Option<f32> {
        if self.is_continue() || self.is_release() {
            None
        } else {
            Some(key2pitch(self.note, self.octave))
        }
    }
}

impl Default for Key {
    fn default() -> Self {
        Key::CONTINUE
    }
}

/// Frequency in Hz of a linear pitch.
pub fn pitch2freq(p: f32) -> f32 {
    REFERENCE_FREQ * libm::powf(2.0, p / notes::PITCHES_PER_OCTAVE as f32)
}

/// Linear pitch of a note in an octave.
pub fn key2pitch(note: u8, octave: u8) -> f32 {
    (note as f32 - notes::NOTE_PITCH_OFFSET as f32)
        + (octave as f32 - notes::OCTAVE_PITCH_OFFSET as f32) * notes::PITCHES_PER_OCTAVE as f32
}

/// Frequency in Hz of a note in an octave.
pub fn key2freq(note: u8, octave: u8) -> f32 {
    pitch2freq(key2pitch(note, octave))
}

/// Linear pitch of a key. Sentinels must be intercepted by the caller.
pub fn key_pitch(key: Key) -> f32 {
    key2pitch(key.note, key.octave)
}

/// Frequency of a key. Sentinels must be intercepted by the caller.
pub fn key_freq(key: Key) -> f32 {
    key2freq(key.note, key.octave)
}
