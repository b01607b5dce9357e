//! Instruction and pattern types for tracker sequences.

use alloc::vec;
use alloc::vec::Vec;
use arrayvec::ArrayVec;

use crate::effects::Effect;
use crate::error::SongError;
use crate::key::{notes, Key};

/// Most effect slots a pattern may declare.
pub const MAX_EFFECTS: usize = 8;

/// Effect codes attached to one instruction.
pub type EffectList = ArrayVec<u32, MAX_EFFECTS>;

/// One note-row event on one channel.
#[derive(Clone, Debug, PartialEq)]
pub struct Instruction {
    /// Index into the instrument bank, or `notes::CONTINUE` to keep the current one
    pub instrument: u8,
    /// Key to play, `Key::CONTINUE` to hold, `Key::RELEASE` to release
    pub key: Key,
    /// Volume (0-1), `None` to keep the current one
    pub volume: Option<f32>,
    /// Packed effect codes
    pub effects: EffectList,
}

impl Default for Instruction {
    fn default() -> Self {
        Self::empty()
    }
}

impl Instruction {
    /// An instruction that changes nothing.
    pub const fn empty() -> Self {
        Self {
            instrument: notes::CONTINUE,
            key: Key::CONTINUE,
            volume: None,
            effects: ArrayVec::new_const(),
        }
    }

    pub fn new(instrument: u8, key: Key, volume: f32) -> Self {
        Self { instrument, key, volume: Some(volume), effects: ArrayVec::new() }
    }

    /// Build an instruction with effects. Codes beyond `MAX_EFFECTS` are rejected.
    pub fn with_effects(
        instrument: u8,
        key: Key,
        volume: Option<f32>,
        effects: &[u32],
    ) -> Result<Self, SongError> {
        let effects = EffectList::try_from(effects)
            .map_err(|_| SongError::TooManyEffects { count: effects.len(), max: MAX_EFFECTS })?;
        Ok(Self { instrument, key, volume, effects })
    }

    /// Returns true if the instruction carries nothing to dispatch.
    pub fn is_empty(&self) -> bool {
        self.key.is_continue()
            && self.instrument == notes::CONTINUE
            && self.volume.is_none()
            && self.effects.iter().all(|&code| code == 0)
    }

    /// Iterate over the decoded effects, skipping empty slots.
    pub fn decoded_effects(&self) -> impl Iterator<Item = Effect> + '_ {
        self.effects
            .iter()
            .map(|&code| Effect::decode(code))
            .filter(|effect| *effect != Effect::None)
    }
}

/// A fixed-length sequence of instructions for one channel.
#[derive(Clone, Debug, PartialEq)]
pub struct Pattern {
    instructions: Vec<Instruction>,
    /// Effect slots available to each instruction
    n_fx: u8,
}

impl Pattern {
    /// Create a pattern of empty instructions.
    pub fn new(rows: u8, n_fx: u8) -> Self {
        Self { instructions: vec![Instruction::empty(); rows as usize], n_fx }
    }

    /// Number of rows.
    pub fn rows(&self) -> u8 {
        self.instructions.len() as u8
    }

    /// Effect capacity per instruction.
    pub fn n_fx(&self) -> u8 {
        self.n_fx
    }

    /// Get the instruction at a row.
    pub fn get(&self, row: u8) -> Option<&Instruction> {
        self.instructions.get(row as usize)
    }

    /// Mutable access to the instruction at a row.
    ///
    /// Callers growing the effect list must respect `n_fx` themselves.
    pub fn get_mut(&mut self, row: u8) -> Option<&mut Instruction> {
        self.instructions.get_mut(row as usize)
    }

    /// Replace the instruction at a row, enforcing the effect capacity.
    pub fn set(&mut self, row: u8, instruction: Instruction) -> Result<(), SongError> {
        let rows = self.rows();
        if instruction.effects.len() > self.n_fx as usize {
            return Err(SongError::EffectCapacity {
                row,
                count: instruction.effects.len(),
                n_fx: self.n_fx,
            });
        }
        let slot = self
            .instructions
            .get_mut(row as usize)
            .ok_or(SongError::RowOutOfRange { row, rows })?;
        *slot = instruction;
        Ok(())
    }

    /// Iterate over all instructions in row order.
    pub fn iter(&self) -> impl Iterator<Item = &Instruction> {
        self.instructions.iter()
    }

    /// Returns true if no row carries anything to dispatch.
    pub fn is_silent(&self) -> bool {
        self.iter().all(Instruction::is_empty)
    }
}
