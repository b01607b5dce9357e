//! Playback and render settings.

/// Settings for offline rendering and live playback.
///
/// Song transport (clock, speed, rows) is song data and lives in the song.
#[derive(Clone, Debug, PartialEq)]
pub struct PlaybackConfig {
    /// Sample rate for offline rendering (live playback uses the device rate)
    pub sample_rate: u32,
    /// Hard limit on rendered/played time, in seconds
    pub max_seconds: f64,
    /// End when the song wraps back to its first frame or hits a stop effect
    pub stop_at_loop: bool,
    /// Channels to disable
    pub muted: Vec<u8>,
    /// Output gain applied before clamping
    pub gain: f32,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            max_seconds: 60.0,
            stop_at_loop: true,
            muted: Vec::new(),
            gain: 1.0,
        }
    }
}

impl PlaybackConfig {
    /// Most frames to render at `sample_rate`.
    pub fn max_frames(&self, sample_rate: u32) -> usize {
        (self.max_seconds.max(0.0) * sample_rate as f64) as usize
    }

    pub fn is_muted(&self, channel: u8) -> bool {
        self.muted.contains(&channel)
    }
}
