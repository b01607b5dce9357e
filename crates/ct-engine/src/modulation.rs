//! Modulation generators.
//!
//! Every generator is a pure function of the query time and the time it was
//! triggered at, so a voice can be evaluated at any sample without carrying
//! per-sample accumulators.

use ct_ir::MAX_ARPEGGIO;

const TWO_PI: f64 = core::f64::consts::TAU;

/// Pitch modulation never moves further than this many semitones.
pub const PITCH_LIMIT: f32 = 96.0;

/// Track-level modulation applied on top of every voice.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GlobalMod {
    /// Volume multiplier (0-1)
    pub volume: f32,
    /// Pitch offset in semitones
    pub pitch: f32,
    /// Panning (0.5 = no offset)
    pub panning: f32,
}

impl GlobalMod {
    pub const NEUTRAL: GlobalMod = GlobalMod { volume: 1.0, pitch: 0.0, panning: 0.5 };
}

impl Default for GlobalMod {
    fn default() -> Self {
        Self::NEUTRAL
    }
}

/// Linear ramp at a signed rate (units per second).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Slide {
    rate: f32,
    start: f64,
}

impl Slide {
    /// Net rate is `up - down`. Returns `None` when the rates cancel.
    pub fn new(up: f32, down: f32, start: f64) -> Option<Self> {
        let rate = up - down;
        (rate != 0.0).then_some(Self { rate, start })
    }

    pub fn rate(&self) -> f32 {
        self.rate
    }

    /// Offset accumulated by time `t`.
    pub fn offset(&self, t: f64) -> f32 {
        self.rate * (t - self.start).max(0.0) as f32
    }

    /// Restart the ramp from zero at `t`.
    pub fn restart(&mut self, t: f64) {
        self.start = t;
    }
}

/// Sinusoidal oscillation (vibrato, tremolo).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Lfo {
    hz: f32,
    depth: f32,
    start: f64,
}

impl Lfo {
    /// Returns `None` when speed or depth is zero.
    pub fn new(hz: f32, depth: f32, start: f64) -> Option<Self> {
        (hz > 0.0 && depth > 0.0).then_some(Self { hz, depth, start })
    }

    fn angle(&self, t: f64) -> f64 {
        TWO_PI * self.hz as f64 * (t - self.start).max(0.0)
    }

    /// Bipolar offset in `[-depth, depth]`, zero at the start.
    pub fn value(&self, t: f64) -> f32 {
        self.depth * libm::sin(self.angle(t)) as f32
    }

    /// Gain in `[1 - depth, 1]`, unity at the start.
    pub fn factor(&self, t: f64) -> f32 {
        1.0 - self.depth * (1.0 - libm::cos(self.angle(t)) as f32) * 0.5
    }
}

/// Cycles through semitone offsets, one per step. Step 0 is the base note.
#[derive(Clone, Debug, PartialEq)]
pub struct Arpeggio {
    steps: heapless::Vec<u8, MAX_ARPEGGIO>,
    step: f64,
    start: f64,
}

impl Arpeggio {
    /// `count` includes the base note. Fewer than two steps is no arpeggio.
    pub fn new(count: u8, offsets: &[u8], step: f64, start: f64) -> Option<Self> {
        let count = (count as usize).min(MAX_ARPEGGIO);
        if count < 2 || step <= 0.0 {
            return None;
        }
        let mut steps = heapless::Vec::new();
        // Capacity is MAX_ARPEGGIO and count is clamped to it
        let _ = steps.push(0);
        for &offset in offsets.iter().take(count - 1) {
            let _ = steps.push(offset);
        }
        Some(Self { steps, step, start })
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Semitone offset sounding at `t`.
    pub fn offset(&self, t: f64) -> f32 {
        let index = libm::floor((t - self.start).max(0.0) / self.step) as usize;
        self.steps[index % self.steps.len()] as f32
    }
}

/// Pitch glide toward a target at a fixed speed.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Glide {
    from: f32,
    to: f32,
    speed: f32,
    start: f64,
}

impl Glide {
    /// `speed` is in semitones per second.
    pub fn new(from: f32, to: f32, speed: f32, start: f64) -> Self {
        Self { from, to, speed, start }
    }

    pub fn target(&self) -> f32 {
        self.to
    }

    pub fn pitch(&self, t: f64) -> f32 {
        let travelled = self.speed * (t - self.start).max(0.0) as f32;
        let distance = self.to - self.from;
        if travelled >= libm::fabsf(distance) {
            self.to
        } else if distance > 0.0 {
            self.from + travelled
        } else {
            self.from - travelled
        }
    }
}

/// Restarts the note every `interval` seconds after `start`, `count` times.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Retrigger {
    interval: f64,
    count: u16,
    start: f64,
}

impl Retrigger {
    pub fn new(interval: f64, count: u16, start: f64) -> Option<Self> {
        (interval > 0.0 && count > 0).then_some(Self { interval, count, start })
    }

    /// Effective onset of the note at `t`, given its original onset.
    ///
    /// Restarts fall at `start + n * interval` for `n` in `1..=count`.
    pub fn onset(&self, note_onset: f64, t: f64) -> f64 {
        let n = libm::floor((t - self.start) / self.interval).min(self.count as f64);
        if n < 1.0 {
            return note_onset;
        }
        (self.start + n * self.interval).max(note_onset)
    }
}

/// Shifts the note by `semitones` every `interval` seconds, `count` times.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transpose {
    interval: f64,
    count: u8,
    semitones: i8,
    start: f64,
}

impl Transpose {
    /// An interval of zero applies every shift at once.
    pub fn new(interval: f64, count: u8, semitones: i8, start: f64) -> Option<Self> {
        (count > 0 && semitones != 0).then_some(Self { interval, count, semitones, start })
    }

    pub fn offset(&self, t: f64) -> f32 {
        let elapsed = t - self.start;
        if elapsed < 0.0 {
            return 0.0;
        }
        let n = if self.interval <= 0.0 {
            self.count as f64
        } else {
            libm::floor(elapsed / self.interval).min(self.count as f64)
        };
        n as f32 * self.semitones as f32
    }
}
