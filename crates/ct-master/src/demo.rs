//! A two-channel demo song: drums and bass on channel 0, strings then a
//! square lead on channel 1.

use ct_ir::{notes, Adsr, Effect, Instrument, Key, Oscillator, Scope, Song, SongBuilder, SongError, Waveform};

pub const DEMO_ROWS: u8 = 64;
pub const DEMO_FRAMES: u8 = 2;
pub const DEMO_CHANNELS: u8 = 2;

const KICK: u8 = 0;
const SNARE: u8 = 1;
const STRING: u8 = 2;
const BASS: u8 = 3;
const MAIN: u8 = 4;

/// Root of each 16-row bar, shared by bass and strings.
const PROGRESSION: [Key; 4] = [
    Key::new(notes::A, 2),
    Key::new(notes::F, 2),
    Key::new(notes::G, 2),
    Key::new(notes::E, 2),
];

/// (row, note, octave) of the lead line in frame 1. Rows not listed continue.
const LEAD: [(u8, u8, u8); 14] = [
    (0, notes::E, 5),
    (6, notes::D, 5),
    (8, notes::C, 5),
    (12, notes::B, 4),
    (16, notes::A, 4),
    (24, notes::C, 5),
    (28, notes::D, 5),
    (32, notes::E, 5),
    (38, notes::G, 5),
    (40, notes::F, 5),
    (44, notes::E, 5),
    (48, notes::D, 5),
    (52, notes::B, 4),
    (56, notes::E, 5),
];

fn bank() -> [Instrument; 5] {
    [
        Instrument::new(Oscillator::with_envelope(Waveform::Sine, Adsr::new(0.0, 0.12, 0.0, 0.02))),
        Instrument::with_volume(
            Oscillator::with_envelope(Waveform::WhiteNoise, Adsr::new(0.0, 0.08, 0.2, 0.05)),
            0.6,
        ),
        Instrument::with_volume(
            Oscillator::with_envelope(Waveform::Saw, Adsr::new(0.15, 0.3, 0.6, 0.4)),
            0.35,
        ),
        Instrument::with_volume(
            Oscillator::with_duty(Waveform::Triangle, 0.5, Adsr::new(0.005, 0.1, 0.7, 0.05)),
            0.8,
        ),
        Instrument::with_volume(
            Oscillator::with_duty(Waveform::Square, 0.25, Adsr::new(0.01, 0.1, 0.6, 0.15)),
            0.4,
        ),
    ]
}

/// Build the demo song.
pub fn demo_song() -> Result<Song, SongError> {
    let mut b = SongBuilder::new(DEMO_ROWS, DEMO_FRAMES, DEMO_CHANNELS, &[2, 4]);
    b.transport(60.0, 2.0, 3.0);
    for instrument in bank() {
        b.instrument(instrument)?;
    }

    let rhythm = rhythm_pattern(&mut b)?;
    b.arrange(0, 0, rhythm)?.arrange(0, 1, rhythm)?;

    let strings = string_pattern(&mut b)?;
    let lead = lead_pattern(&mut b)?;
    b.arrange(1, 0, strings)?.arrange(1, 1, lead)?;

    b.build()
}

fn rhythm_pattern(b: &mut SongBuilder) -> Result<u8, SongError> {
    let p = b.pattern(0)?;
    b.prepare(0, p, KICK, 1.0);

    for row in 0..DEMO_ROWS {
        let root = PROGRESSION[(row / 16) as usize];
        match row % 8 {
            0 => {
                b.note_with(row, KICK, Key::new(notes::C, 2), Some(1.0), &[Effect::DelayRelease {
                    delay: 0,
                    release: 4,
                }])?;
            }
            4 if row == 60 => {
                b.note_with(row, SNARE, Key::new(notes::C, 6), Some(0.7), &[Effect::Retrigger {
                    interval: 2,
                    count: 3,
                }])?;
            }
            4 => {
                b.note_with(row, SNARE, Key::new(notes::C, 6), Some(0.7), &[])?;
            }
            2 | 6 => {
                let octave = if row % 8 == 6 { root.octave - 1 } else { root.octave };
                b.note_with(row, BASS, Key::new(root.note, octave), Some(0.9), &[])?;
            }
            _ => {}
        }
    }
    Ok(p)
}

fn string_pattern(b: &mut SongBuilder) -> Result<u8, SongError> {
    let p = b.pattern(1)?;
    b.prepare(1, p, STRING, 0.8);

    for (bar, root) in PROGRESSION.iter().enumerate() {
        let row = bar as u8 * 16;
        // Minor on A and E, major on F and G
        let third = if bar % 3 == 0 { 3 } else { 4 };
        let key = Key::new(root.note, root.octave + 2);
        b.note_fx(row, key, &[
            Effect::arpeggio(&[third, 7]),
            Effect::vibrato(Scope::Channel, 5.0, 0.1),
            Effect::portamento(0.0),
        ])?;
        b.release(row + 14)?;
    }
    // Restore tempo on every pass through the first frame
    b.effect(0, Effect::speed(3.0))?;
    Ok(p)
}

fn lead_pattern(b: &mut SongBuilder) -> Result<u8, SongError> {
    let p = b.pattern(1)?;
    b.prepare(1, p, MAIN, 0.9);

    for (row, note, octave) in LEAD {
        b.note(row, Key::new(note, octave))?;
    }
    b.effect(0, Effect::arpeggio(&[]))?
        .effect(0, Effect::portamento(40.0))?
        .effect(0, Effect::vibrato(Scope::Channel, 6.0, 0.2))?;
    b.effect(32, Effect::tremolo(Scope::Channel, 4.0, 0.2))?;
    b.effect(48, Effect::speed(2.5))?;
    b.effect(56, Effect::Transpose { interval: 6, count: 2, semitones: 12 })?
        .effect(56, Effect::tremolo(Scope::Channel, 0.0, 0.0))?;
    b.release(62)?;
    Ok(p)
}
