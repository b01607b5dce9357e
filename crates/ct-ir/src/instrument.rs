//! Instruments: an owned oscillator with a gain.

use crate::key::{key2freq, pitch2freq, Key};
use crate::oscillator::Oscillator;

/// An instrument definition.
///
/// Channels play a private clone of the bank entry, so envelope and release
/// state never leak between voices.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Instrument {
    oscillator: Oscillator,
    /// Gain applied on top of every requested amplitude
    global_volume: f32,
}

impl Instrument {
    pub fn new(oscillator: Oscillator) -> Self {
        Self::with_volume(oscillator, 1.0)
    }

    pub fn with_volume(oscillator: Oscillator, global_volume: f32) -> Self {
        Self { oscillator, global_volume }
    }

    pub fn oscillator(&self) -> &Oscillator {
        &self.oscillator
    }

    pub fn oscillator_mut(&mut self) -> &mut Oscillator {
        &mut self.oscillator
    }

    pub fn global_volume(&self) -> f32 {
        self.global_volume
    }

    /// Steady tone for a key. Sentinel keys are silent.
    pub fn play_key(&self, a: f32, key: Key, t: f64) -> f32 {
        match key.pitch() {
            Some(p) => self.play_pitch(a, p, t),
            None => 0.0,
        }
    }

    /// Steady tone for a note in an octave.
    pub fn play(&self, a: f32, note: u8, octave: u8, t: f64) -> f32 {
        self.oscillator.tone(a * self.global_volume, key2freq(note, octave), t)
    }

    /// Steady tone for a linear pitch.
    pub fn play_pitch(&self, a: f32, p: f32, t: f64) -> f32 {
        self.oscillator.tone(a * self.global_volume, pitch2freq(p), t)
    }

    /// Enveloped tone for a key; `rt` is the release time since onset.
    pub fn play_key_released(&self, a: f32, key: Key, t: f64, rt: f64) -> f32 {
        match key.pitch() {
            Some(p) => self.play_pitch_released(a, p, t, rt),
            None => 0.0,
        }
    }

    /// Enveloped tone for a note in an octave.
    pub fn play_released(&self, a: f32, note: u8, octave: u8, t: f64, rt: f64) -> f32 {
        self.oscillator
            .tone_released(a * self.global_volume, key2freq(note, octave), t, rt)
    }

    /// Enveloped tone for a linear pitch.
    pub fn play_pitch_released(&self, a: f32, p: f32, t: f64, rt: f64) -> f32 {
        self.oscillator
            .tone_released(a * self.global_volume, pitch2freq(p), t, rt)
    }
}
