//! Audio frame type.

/// A stereo audio frame, nominally in `[-1, 1]` per side.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Frame {
    pub left: f32,
    pub right: f32,
}

impl Frame {
    /// Create a silent frame.
    pub const fn silence() -> Self {
        Self { left: 0.0, right: 0.0 }
    }

    /// Create a mono frame (same value for both channels).
    pub const fn mono(value: f32) -> Self {
        Self { left: value, right: value }
    }

    /// Place a mono sample with a linear crossfade (0 = left, 1 = right).
    pub fn panned(value: f32, pan: f32) -> Self {
        let pan = pan.clamp(0.0, 1.0);
        Self { left: value * (1.0 - pan), right: value * pan }
    }

    /// Mix another frame into this one.
    pub fn mix(&mut self, other: Frame) {
        self.left += other.left;
        self.right += other.right;
    }

    /// Scale both sides by `gain`.
    pub fn scale(&mut self, gain: f32) {
        self.left *= gain;
        self.right *= gain;
    }

    /// Clamp both sides to `[-1, 1]`.
    pub fn clamped(self) -> Self {
        Self { left: self.left.clamp(-1.0, 1.0), right: self.right.clamp(-1.0, 1.0) }
    }

    pub fn is_silent(&self) -> bool {
        self.left == 0.0 && self.right == 0.0
    }
}
