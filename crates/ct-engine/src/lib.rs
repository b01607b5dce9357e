//! Playback engine for the codetracker sound engine.
//!
//! A [`Track`] sequences a validated song and dispatches rows into
//! caller-owned [`Channel`]s, which synthesize through their private
//! instrument clones. One `Track::play` call produces one stereo frame.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod channel;
mod frame;
pub mod modulation;
mod track;

pub use channel::Channel;
pub use frame::Frame;
pub use modulation::GlobalMod;
pub use track::{Position, Track};
