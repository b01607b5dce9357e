//! Attack/decay/sustain/release amplitude envelope.

/// Amplitude envelope. Times are in seconds, sustain is a level in `0..=1`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Adsr {
    pub attack: f32,
    pub decay: f32,
    pub sustain: f32,
    pub release: f32,
}

impl Default for Adsr {
    fn default() -> Self {
        Self { attack: 0.0, decay: 0.0, sustain: 1.0, release: 0.0 }
    }
}

impl Adsr {
    pub fn new(attack: f32, decay: f32, sustain: f32, release: f32) -> Self {
        Self {
            attack: attack.max(0.0),
            decay: decay.max(0.0),
            sustain: sustain.clamp(0.0, 1.0),
            release: release.max(0.0),
        }
    }

    /// Level of a held note `t` seconds after onset.
    pub fn held_level(&self, t: f64) -> f32 {
        if t < 0.0 {
            return 0.0;
        }
        let attack = self.attack as f64;
        let decay = self.decay as f64;
        if t < attack {
            return (t / attack) as f32;
        }
        if t < attack + decay {
            let progress = ((t - attack) / decay) as f32;
            return 1.0 + (self.sustain - 1.0) * progress;
        }
        self.sustain
    }

    /// Level `t` seconds after onset, with release requested at `release_at`
    /// (also relative to onset) or not yet requested.
    pub fn level(&self, t: f64, release_at: Option<f64>) -> f32 {
        let rt = match release_at {
            Some(rt) if t >= rt => rt,
            _ => return self.held_level(t),
        };
        let release = self.release as f64;
        let since = t - rt;
        if since >= release {
            return 0.0;
        }
        let from = self.held_level(rt);
        from * (1.0 - (since / release) as f32)
    }
}
