//! Waveform generator (PSG style) with an amplitude envelope.

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use crate::adsr::Adsr;

const TWO_PI: f64 = core::f64::consts::TAU;

/// Seed used by oscillators that are not given one explicitly.
pub const DEFAULT_NOISE_SEED: u64 = 0x0C0D_E7AC;

/// Primitive waveforms.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Waveform {
    #[default]
    Sine,
    /// Pulse wave, high while the period fraction is below the duty cycle.
    Square,
    /// Rises for `duty` of the period, falls for the remainder.
    Triangle,
    /// Ramp from -1 to 1.
    Saw,
    /// Uniform noise, one new value per period.
    WhiteNoise,
    /// 1-bit noise, high with probability `duty`, one new value per period.
    WhiteNoise2,
}

impl Waveform {
    pub const ALL: [Waveform; 6] = [
        Waveform::Sine,
        Waveform::Square,
        Waveform::Triangle,
        Waveform::Saw,
        Waveform::WhiteNoise,
        Waveform::WhiteNoise2,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Waveform::Sine => "Sine",
            Waveform::Square => "Square",
            Waveform::Triangle => "Triangle",
            Waveform::Saw => "Saw",
            Waveform::WhiteNoise => "WhiteNoise",
            Waveform::WhiteNoise2 => "WhiteNoise2",
        }
    }
}

/// A pulse sound generator: waveform, duty cycle, phase and amplitude envelope.
///
/// All state is plain data, so `clone()` yields an independent instance. Noise
/// is a pure function of `noise_seed` and the period index: a clone replays
/// exactly the same noise as its source.
#[derive(Clone, Debug, PartialEq)]
pub struct Oscillator {
    waveform: Waveform,
    duty_cycle: f32,
    /// Fraction of a period.
    phase: f32,
    released: bool,
    envelope: Adsr,
    noise_seed: u64,
}

impl Default for Oscillator {
    fn default() -> Self {
        Self::new(Waveform::Sine)
    }
}

impl Oscillator {
    pub fn new(waveform: Waveform) -> Self {
        Self {
            waveform,
            duty_cycle: 0.5,
            phase: 0.0,
            released: false,
            envelope: Adsr::default(),
            noise_seed: DEFAULT_NOISE_SEED,
        }
    }

    pub fn with_envelope(waveform: Waveform, envelope: Adsr) -> Self {
        Self { envelope, ..Self::new(waveform) }
    }

    pub fn with_duty(waveform: Waveform, duty_cycle: f32, envelope: Adsr) -> Self {
        let mut osc = Self::with_envelope(waveform, envelope);
        osc.set_duty_cycle(duty_cycle);
        osc
    }

    pub fn with_phase(waveform: Waveform, duty_cycle: f32, phase: f32, envelope: Adsr) -> Self {
        let mut osc = Self::with_duty(waveform, duty_cycle, envelope);
        osc.phase = phase;
        osc
    }

    pub fn waveform(&self) -> Waveform {
        self.waveform
    }

    pub fn set_waveform(&mut self, waveform: Waveform) {
        self.waveform = waveform;
    }

    pub fn duty_cycle(&self) -> f32 {
        self.duty_cycle
    }

    pub fn set_duty_cycle(&mut self, duty_cycle: f32) {
        self.duty_cycle = duty_cycle.clamp(0.0, 1.0);
    }

    pub fn phase(&self) -> f32 {
        self.phase
    }

    pub fn set_phase(&mut self, phase: f32) {
        self.phase = phase;
    }

    pub fn envelope(&self) -> &Adsr {
        &self.envelope
    }

    pub fn envelope_mut(&mut self) -> &mut Adsr {
        &mut self.envelope
    }

    pub fn noise_seed(&self) -> u64 {
        self.noise_seed
    }

    pub fn set_noise_seed(&mut self, seed: u64) {
        self.noise_seed = seed;
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    pub fn set_release(&mut self, released: bool) {
        self.released = released;
    }

    /// Return to the held state, ready for a new note.
    pub fn reset(&mut self) {
        self.released = false;
    }

    /// Steady tone: the raw waveform without envelope.
    pub fn oscillate(&self, a: f32, f: f32, t: f64, dc: f32, p: f32) -> f32 {
        if f <= 0.0 {
            return 0.0;
        }
        let cycles = f as f64 * t + p as f64;
        let index = libm::floor(cycles);
        let x = cycles - index;
        let dc = dc.clamp(0.0, 1.0) as f64;

        let v = match self.waveform {
            Waveform::Sine => libm::sin(TWO_PI * x),
            Waveform::Square => {
                if x < dc {
                    1.0
                } else {
                    -1.0
                }
            }
            Waveform::Triangle => triangle(x, dc),
            Waveform::Saw => 2.0 * x - 1.0,
            Waveform::WhiteNoise => {
                let r: f64 = self.noise_rng(index).gen();
                2.0 * r - 1.0
            }
            Waveform::WhiteNoise2 => {
                let r: f64 = self.noise_rng(index).gen();
                if r < dc {
                    1.0
                } else {
                    -1.0
                }
            }
        };
        a * v as f32
    }

    /// Enveloped tone. `t` and `rt` are seconds since the note onset; the note
    /// counts as released from `rt` on once the release flag is set.
    pub fn oscillate_released(&self, a: f32, f: f32, t: f64, rt: f64, dc: f32, p: f32) -> f32 {
        let release_at = if self.released { Some(rt) } else { None };
        let level = self.envelope.level(t, release_at);
        if level <= 0.0 {
            return 0.0;
        }
        self.oscillate(a * level, f, t, dc, p)
    }

    /// Steady tone with the oscillator's own duty cycle and phase.
    pub fn tone(&self, a: f32, f: f32, t: f64) -> f32 {
        self.oscillate(a, f, t, self.duty_cycle, self.phase)
    }

    /// Enveloped tone with the oscillator's own duty cycle and phase.
    pub fn tone_released(&self, a: f32, f: f32, t: f64, rt: f64) -> f32 {
        self.oscillate_released(a, f, t, rt, self.duty_cycle, self.phase)
    }

    fn noise_rng(&self, period_index: f64) -> Pcg32 {
        Pcg32::seed_from_u64(self.noise_seed ^ (period_index as i64 as u64))
    }
}

fn triangle(x: f64, dc: f64) -> f64 {
    if dc <= 0.0 {
        return 1.0 - 2.0 * x;
    }
    if dc >= 1.0 {
        return 2.0 * x - 1.0;
    }
    if x < dc {
        -1.0 + 2.0 * x / dc
    } else {
        1.0 - 2.0 * (x - dc) / (1.0 - dc)
    }
}
