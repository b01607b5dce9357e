//! Song definition: instrument bank, pattern bank and arrangement.

use alloc::vec::Vec;

use crate::error::SongError;
use crate::instrument::Instrument;
use crate::key::notes;
use crate::pattern::{Pattern, MAX_EFFECTS};

/// Instrument indices at or above this value are sentinels.
pub const MAX_INSTRUMENTS: usize = notes::RELEASE as usize;

/// Per-channel settings applied when a channel array is created.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ChannelSettings {
    /// Initial panning (0 = left, 0.5 = center, 1 = right)
    pub initial_pan: f32,
    /// Initial channel volume (0-1)
    pub initial_volume: f32,
    /// Start disabled
    pub muted: bool,
}

impl Default for ChannelSettings {
    fn default() -> Self {
        Self { initial_pan: 0.5, initial_volume: 1.0, muted: false }
    }
}

/// A complete song, ready to hand to the engine.
#[derive(Clone, Debug, PartialEq)]
pub struct Song {
    /// Clock frequency in Hz (60 NTSC, 50 PAL); one tick is `1 / clock` seconds
    pub clock: f32,
    /// Base time in ticks, multiplied by the speed
    pub basetime: f32,
    /// Speed multiplier; row duration is `speed * basetime / clock`
    pub speed: f32,
    /// Rows per pattern
    pub rows: u8,
    /// Frames in the arrangement
    pub frames: u8,
    /// Number of channels (polyphony)
    pub channels: u8,
    /// Instrument bank
    pub instruments: Vec<Instrument>,
    /// Pattern bank
    pub patterns: Vec<Pattern>,
    /// Arrangement grid: `pattern_indices[channel][frame]` indexes `patterns`
    pub pattern_indices: Vec<Vec<u8>>,
    /// Effect slots available to each channel
    pub fx_per_channel: Vec<u8>,
    /// Per-channel settings (empty = defaults)
    pub channel_settings: Vec<ChannelSettings>,
}

impl Song {
    /// Seconds per row at the initial speed.
    pub fn row_duration(&self) -> f64 {
        self.speed as f64 * self.basetime as f64 / self.clock as f64
    }

    /// Approximate song length in seconds at the initial speed.
    ///
    /// Jumps, stops and speed changes are not accounted for.
    pub fn duration(&self) -> f64 {
        self.rows as f64 * self.frames as f64 * self.row_duration()
    }

    /// Pattern playing on `channel` during `frame`.
    pub fn pattern_at(&self, channel: u8, frame: u8) -> Option<&Pattern> {
        let index = *self.pattern_indices.get(channel as usize)?.get(frame as usize)?;
        self.patterns.get(index as usize)
    }

    /// Settings for a channel, falling back to defaults.
    pub fn settings(&self, channel: u8) -> ChannelSettings {
        self.channel_settings.get(channel as usize).copied().unwrap_or_default()
    }

    /// Check every structural invariant the engine relies on.
    pub fn validate(&self) -> Result<(), SongError> {
        if self.channels == 0 {
            return Err(SongError::NoChannels);
        }
        for (name, value) in [("clock", self.clock), ("basetime", self.basetime), ("speed", self.speed)] {
            if !(value > 0.0 && value.is_finite()) {
                return Err(SongError::InvalidTransport { name, value });
            }
        }
        if self.rows == 0 {
            return Err(SongError::InvalidTransport { name: "rows", value: 0.0 });
        }
        if self.frames == 0 {
            return Err(SongError::InvalidTransport { name: "frames", value: 0.0 });
        }
        if self.instruments.len() > MAX_INSTRUMENTS {
            return Err(SongError::BankFull { max: MAX_INSTRUMENTS });
        }
        if self.fx_per_channel.len() != self.channels as usize {
            return Err(SongError::EffectsPerChannelShape {
                len: self.fx_per_channel.len(),
                channels: self.channels,
            });
        }
        if !self.channel_settings.is_empty() && self.channel_settings.len() != self.channels as usize {
            return Err(SongError::ChannelSettingsShape {
                len: self.channel_settings.len(),
                channels: self.channels,
            });
        }
        if let Some(&n_fx) = self.fx_per_channel.iter().find(|&&n| n as usize > MAX_EFFECTS) {
            return Err(SongError::TooManyEffects { count: n_fx as usize, max: MAX_EFFECTS });
        }

        for (index, pattern) in self.patterns.iter().enumerate() {
            if pattern.rows() != self.rows {
                return Err(SongError::RowsMismatch { pattern: index, rows: pattern.rows(), expected: self.rows });
            }
            for (row, inst) in pattern.iter().enumerate() {
                if inst.effects.len() > pattern.n_fx() as usize {
                    return Err(SongError::EffectCapacity {
                        row: row as u8,
                        count: inst.effects.len(),
                        n_fx: pattern.n_fx(),
                    });
                }
            }
        }

        let shape_ok = self.pattern_indices.len() == self.channels as usize
            && self.pattern_indices.iter().all(|row| row.len() == self.frames as usize);
        if !shape_ok {
            return Err(SongError::GridShape {
                rows: self.pattern_indices.len(),
                columns: self.pattern_indices.first().map_or(0, Vec::len),
                channels: self.channels,
                frames: self.frames,
            });
        }
        for (channel, row) in self.pattern_indices.iter().enumerate() {
            let allowed = self.fx_per_channel[channel];
            for (frame, &index) in row.iter().enumerate() {
                let pattern = self.patterns.get(index as usize).ok_or(SongError::PatternIndexOutOfRange {
                    channel: channel as u8,
                    frame: frame as u8,
                    index,
                    count: self.patterns.len(),
                })?;
                if pattern.n_fx() > allowed {
                    return Err(SongError::ChannelEffectCapacity {
                        pattern: index as usize,
                        channel: channel as u8,
                        n_fx: pattern.n_fx(),
                        allowed,
                    });
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::Key;
    use crate::oscillator::{Oscillator, Waveform};
    use crate::pattern::Instruction;

    fn minimal() -> Song {
        Song {
            clock: 60.0,
            basetime: 2.0,
            speed: 3.0,
            rows: 4,
            frames: 2,
            channels: 2,
            instruments: vec![Instrument::new(Oscillator::new(Waveform::Square))],
            patterns: vec![Pattern::new(4, 1), Pattern::new(4, 2)],
            pattern_indices: vec![vec![0, 0], vec![1, 0]],
            fx_per_channel: vec![1, 2],
            channel_settings: Vec::new(),
        }
    }

    #[test]
    fn valid_song_passes() {
        let song = minimal();
        assert_eq!(song.validate(), Ok(()));
        assert!((song.row_duration() - 0.1).abs() < 1e-9);
        assert!((song.duration() - 0.8).abs() < 1e-9);
        assert_eq!(song.settings(1), ChannelSettings::default());
    }

    #[test]
    fn pattern_lookup_follows_grid() {
        let mut song = minimal();
        song.patterns[1]
            .set(2, Instruction::new(0, Key::new(3, 4), 1.0))
            .unwrap();
        assert!(song.pattern_at(1, 0).unwrap().get(2).unwrap().key == Key::new(3, 4));
        assert!(song.pattern_at(0, 0).unwrap().is_silent());
        assert!(song.pattern_at(2, 0).is_none());
    }

    #[test]
    fn grid_index_out_of_range() {
        let mut song = minimal();
        song.pattern_indices[0][1] = 7;
        assert_eq!(
            song.validate(),
            Err(SongError::PatternIndexOutOfRange { channel: 0, frame: 1, index: 7, count: 2 })
        );
    }

    #[test]
    fn grid_shape_checked() {
        let mut song = minimal();
        song.pattern_indices.pop();
        assert!(matches!(song.validate(), Err(SongError::GridShape { .. })));
    }

    #[test]
    fn rows_mismatch_checked() {
        let mut song = minimal();
        song.patterns.push(Pattern::new(8, 1));
        assert_eq!(
            song.validate(),
            Err(SongError::RowsMismatch { pattern: 2, rows: 8, expected: 4 })
        );
    }

    #[test]
    fn channel_effect_capacity_checked() {
        let mut song = minimal();
        song.pattern_indices[0][0] = 1;
        assert_eq!(
            song.validate(),
            Err(SongError::ChannelEffectCapacity { pattern: 1, channel: 0, n_fx: 2, allowed: 1 })
        );
    }

    #[test]
    fn transport_must_be_positive() {
        let mut song = minimal();
        song.clock = 0.0;
        assert!(matches!(song.validate(), Err(SongError::InvalidTransport { name: "clock", .. })));
        let mut song = minimal();
        song.channels = 0;
        assert_eq!(song.validate(), Err(SongError::NoChannels));
    }
}
