//! Incremental song construction.
//!
//! A `SongBuilder` owns the song under construction plus a cursor (channel,
//! pattern, instrument, volume) so note entry only names what changes.
//!
//! ```
//! use ct_ir::{Effect, Instrument, Key, Oscillator, SongBuilder, Waveform, notes};
//!
//! let mut b = SongBuilder::new(16, 1, 1, &[1]);
//! let lead = b.instrument(Instrument::new(Oscillator::new(Waveform::Square))).unwrap();
//! let p = b.pattern(0).unwrap();
//! b.prepare(0, p, lead, 0.8);
//! b.note(0, Key::new(notes::C, 4)).unwrap()
//!     .note_fx(4, Key::new(notes::E, 4), &[Effect::arpeggio(&[4, 7])]).unwrap()
//!     .release(8).unwrap();
//! b.arrange(0, 0, p).unwrap();
//! let song = b.build().unwrap();
//! assert_eq!(song.patterns.len(), 1);
//! ```

use alloc::vec;
use alloc::vec::Vec;

use crate::effects::Effect;
use crate::error::SongError;
use crate::instrument::Instrument;
use crate::key::{notes, Key};
use crate::pattern::{EffectList, Instruction, Pattern, MAX_EFFECTS};
use crate::song::{ChannelSettings, Song, MAX_INSTRUMENTS};

/// Pattern indices are stored as `u8`.
pub const MAX_PATTERNS: usize = 256;

#[derive(Clone, Copy, Debug)]
struct Cursor {
    channel: u8,
    pattern: Option<u8>,
    instrument: u8,
    volume: f32,
}

/// Builder for a [`Song`]. Nothing is shared between builder instances.
#[derive(Clone, Debug)]
pub struct SongBuilder {
    song: Song,
    cursor: Cursor,
}

impl SongBuilder {
    /// Start a song with the default transport (60 Hz clock, base time 2, speed 3).
    ///
    /// Every grid cell initially points at pattern 0.
    pub fn new(rows: u8, frames: u8, channels: u8, fx_per_channel: &[u8]) -> Self {
        let song = Song {
            clock: 60.0,
            basetime: 2.0,
            speed: 3.0,
            rows,
            frames,
            channels,
            instruments: Vec::new(),
            patterns: Vec::new(),
            pattern_indices: vec![vec![0; frames as usize]; channels as usize],
            fx_per_channel: fx_per_channel.to_vec(),
            channel_settings: Vec::new(),
        };
        Self {
            song,
            cursor: Cursor { channel: 0, pattern: None, instrument: 0, volume: 1.0 },
        }
    }

    pub fn transport(&mut self, clock: f32, basetime: f32, speed: f32) -> &mut Self {
        self.song.clock = clock;
        self.song.basetime = basetime;
        self.song.speed = speed;
        self
    }

    /// Add an instrument to the bank and return its index.
    pub fn instrument(&mut self, instrument: Instrument) -> Result<u8, SongError> {
        if self.song.instruments.len() >= MAX_INSTRUMENTS {
            return Err(SongError::BankFull { max: MAX_INSTRUMENTS });
        }
        self.song.instruments.push(instrument);
        Ok((self.song.instruments.len() - 1) as u8)
    }

    /// Create an empty pattern sized for `channel` and move the cursor onto it.
    pub fn pattern(&mut self, channel: u8) -> Result<u8, SongError> {
        let n_fx = self.channel_fx(channel)?;
        if self.song.patterns.len() >= MAX_PATTERNS {
            return Err(SongError::BankFull { max: MAX_PATTERNS });
        }
        self.song.patterns.push(Pattern::new(self.song.rows, n_fx));
        let index = (self.song.patterns.len() - 1) as u8;
        self.cursor.channel = channel;
        self.cursor.pattern = Some(index);
        Ok(index)
    }

    /// Point the cursor at a pattern and pick the instrument and volume for following notes.
    pub fn prepare(&mut self, channel: u8, pattern: u8, instrument: u8, volume: f32) -> &mut Self {
        self.cursor = Cursor { channel, pattern: Some(pattern), instrument, volume };
        self
    }

    /// Write a note with the cursor's instrument and volume.
    pub fn note(&mut self, row: u8, key: Key) -> Result<&mut Self, SongError> {
        self.note_fx(row, key, &[])
    }

    /// Write a note with effects, using the cursor's instrument and volume.
    pub fn note_fx(&mut self, row: u8, key: Key, effects: &[Effect]) -> Result<&mut Self, SongError> {
        let Cursor { instrument, volume, .. } = self.cursor;
        self.note_with(row, instrument, key, Some(volume), effects)
    }

    /// Write a note naming the instrument and volume explicitly.
    pub fn note_with(
        &mut self,
        row: u8,
        instrument: u8,
        key: Key,
        volume: Option<f32>,
        effects: &[Effect],
    ) -> Result<&mut Self, SongError> {
        let mut codes = EffectList::new();
        for effect in effects {
            codes.try_push(effect.encode()).map_err(|_| SongError::TooManyEffects {
                count: effects.len(),
                max: MAX_EFFECTS,
            })?;
        }
        let instruction = Instruction { instrument, key, volume, effects: codes };
        self.current()?.set(row, instruction)?;
        Ok(self)
    }

    /// Release the held note at `row`.
    pub fn release(&mut self, row: u8) -> Result<&mut Self, SongError> {
        self.note_with(row, notes::CONTINUE, Key::RELEASE, None, &[])
    }

    /// Append an effect to the instruction at `row`.
    pub fn effect(&mut self, row: u8, effect: Effect) -> Result<&mut Self, SongError> {
        let pattern = self.current()?;
        let (rows, n_fx) = (pattern.rows(), pattern.n_fx());
        let instruction = pattern.get_mut(row).ok_or(SongError::RowOutOfRange { row, rows })?;
        if instruction.effects.len() >= n_fx as usize {
            return Err(SongError::EffectCapacity {
                row,
                count: instruction.effects.len() + 1,
                n_fx,
            });
        }
        instruction.effects.push(effect.encode());
        Ok(self)
    }

    /// Set the volume of the instruction at `row`, leaving its key untouched.
    pub fn volume(&mut self, row: u8, volume: f32) -> Result<&mut Self, SongError> {
        let pattern = self.current()?;
        let rows = pattern.rows();
        let instruction = pattern.get_mut(row).ok_or(SongError::RowOutOfRange { row, rows })?;
        instruction.volume = Some(volume.clamp(0.0, 1.0));
        Ok(self)
    }

    /// Place `pattern` on `channel` during `frame`.
    pub fn arrange(&mut self, channel: u8, frame: u8, pattern: u8) -> Result<&mut Self, SongError> {
        if pattern as usize >= self.song.patterns.len() {
            return Err(SongError::InvalidCursor("pattern not created"));
        }
        let cell = self
            .song
            .pattern_indices
            .get_mut(channel as usize)
            .and_then(|frames| frames.get_mut(frame as usize))
            .ok_or(SongError::InvalidCursor("grid cell out of range"))?;
        *cell = pattern;
        Ok(self)
    }

    pub fn channel_settings(&mut self, channel: u8, settings: ChannelSettings) -> Result<&mut Self, SongError> {
        if channel >= self.song.channels {
            return Err(SongError::InvalidCursor("channel out of range"));
        }
        if self.song.channel_settings.is_empty() {
            self.song.channel_settings = vec![ChannelSettings::default(); self.song.channels as usize];
        }
        self.song.channel_settings[channel as usize] = settings;
        Ok(self)
    }

    /// Channel and pattern under the cursor.
    pub fn cursor(&self) -> (u8, Option<u8>) {
        (self.cursor.channel, self.cursor.pattern)
    }

    /// Validate and return the finished song.
    pub fn build(self) -> Result<Song, SongError> {
        self.song.validate()?;
        tracing::debug!(
            channels = self.song.channels,
            frames = self.song.frames,
            rows = self.song.rows,
            instruments = self.song.instruments.len(),
            patterns = self.song.patterns.len(),
            "song built"
        );
        Ok(self.song)
    }

    fn channel_fx(&self, channel: u8) -> Result<u8, SongError> {
        if channel >= self.song.channels {
            return Err(SongError::InvalidCursor("channel out of range"));
        }
        self.song
            .fx_per_channel
            .get(channel as usize)
            .copied()
            .ok_or(SongError::EffectsPerChannelShape {
                len: self.song.fx_per_channel.len(),
                channels: self.song.channels,
            })
    }

    fn current(&mut self) -> Result<&mut Pattern, SongError> {
        let index = self.cursor.pattern.ok_or(SongError::InvalidCursor("no pattern selected"))?;
        self.song
            .patterns
            .get_mut(index as usize)
            .ok_or(SongError::InvalidCursor("pattern not created"))
    }
}
