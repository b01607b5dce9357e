//! Song data model for the codetracker sound engine.
//!
//! This crate defines everything a song is made of: keys and pitch
//! conversions, envelopes, oscillators, instruments, packed effect codes,
//! instructions, patterns and the arrangement grid. The engine crate consumes
//! a validated [`Song`]; nothing here depends on time or playback state.
//!
//! Designed to be `no_std` compatible with the `alloc` crate.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod adsr;
mod builder;
pub mod effects;
mod error;
mod instrument;
pub mod key;
mod oscillator;
mod pattern;
mod song;

pub use adsr::Adsr;
pub use builder::{SongBuilder, MAX_PATTERNS};
pub use effects::{Effect, Scope, MAX_ARPEGGIO};
pub use error::SongError;
pub use instrument::Instrument;
pub use key::{key2freq, key2pitch, key_freq, key_pitch, notes, pitch2freq, Key};
pub use oscillator::{Oscillator, Waveform, DEFAULT_NOISE_SEED};
pub use pattern::{EffectList, Instruction, Pattern, MAX_EFFECTS};
pub use song::{ChannelSettings, Song, MAX_INSTRUMENTS};
