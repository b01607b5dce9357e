//! Construction-time errors for song data.

use thiserror::Error;

/// A malformed song definition.
///
/// Raised while building or validating a song, never while rendering.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum SongError {
    #[error("song has no channels")]
    NoChannels,
    #[error("transport parameter `{name}` must be positive, got {value}")]
    InvalidTransport { name: &'static str, value: f32 },
    #[error("pattern {pattern} has {rows} rows, the track expects {expected}")]
    RowsMismatch { pattern: usize, rows: u8, expected: u8 },
    #[error("row {row} is outside a pattern of {rows} rows")]
    RowOutOfRange { row: u8, rows: u8 },
    #[error("row {row} carries {count} effects but the pattern has {n_fx} slots")]
    EffectCapacity { row: u8, count: usize, n_fx: u8 },
    #[error("{count} effects exceed the maximum of {max}")]
    TooManyEffects { count: usize, max: usize },
    #[error("pattern {pattern} declares {n_fx} effect slots, channel {channel} allows {allowed}")]
    ChannelEffectCapacity { pattern: usize, channel: u8, n_fx: u8, allowed: u8 },
    #[error("pattern index grid is {rows}x{columns}, expected {channels}x{frames}")]
    GridShape { rows: usize, columns: usize, channels: u8, frames: u8 },
    #[error("grid cell [{channel}][{frame}] points at pattern {index}, bank holds {count}")]
    PatternIndexOutOfRange { channel: u8, frame: u8, index: u8, count: usize },
    #[error("effects-per-channel table has {len} entries for {channels} channels")]
    EffectsPerChannelShape { len: usize, channels: u8 },
    #[error("channel settings table has {len} entries for {channels} channels")]
    ChannelSettingsShape { len: usize, channels: u8 },
    #[error("bank is full ({max} entries)")]
    BankFull { max: usize },
    #[error("builder cursor: {0}")]
    InvalidCursor(&'static str),
}
