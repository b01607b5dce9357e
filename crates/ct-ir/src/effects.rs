//! Effect commands and their packed 32-bit encoding.
//!
//! Layout: bits 31..24 hold the opcode, bits 23..0 the parameters. Two-field
//! opcodes split the parameters into `A` (bits 23..12) and `B` (bits 11..0).
//! Opcodes with bit 7 set are track-global variants applied to every voice.
//!
//! | Opcode | Effect | Parameters |
//! |--------|--------|------------|
//! | `0x01` | volume slide | A up, B down, 1/256 volume per second |
//! | `0x02` | pitch slide | A up, B down, 1/16 semitone per second |
//! | `0x03` | vibrato | A speed 1/16 Hz, B depth 1/64 semitone |
//! | `0x04` | tremolo | A speed 1/16 Hz, B depth 1/4095 volume |
//! | `0x05` | panning slide | A right, B left, 1/256 pan per second |
//! | `0x06` | arpeggio | bits 23..20 step count, then five semitone nibbles |
//! | `0x07` | portamento | 24-bit glide speed, 1/16 semitone per second |
//! | `0x08` | retrigger | A interval in ticks, B repetitions |
//! | `0x09` | speed | `A + B / 1000` |
//! | `0x0A` | pattern jump | A frame, B row |
//! | `0x0B` | stop | none |
//! | `0x0C` | transpose | bits 23..16 interval, 15..8 repetitions, 7..0 signed semitones |
//! | `0x0D` | delay / release | A onset delay in ticks, B release after ticks |
//! | `0x0E` | set volume | A volume, 1/4095 |
//! | `0x0F` | set panning | A panning, 1/4095 |
//! | `0x81`-`0x85`, `0x8F` | track-global variants of `0x01`-`0x05`, `0x0F` | as above |

/// Per-second rate scale for volume and panning slides.
pub const SLIDE_SCALE: f32 = 256.0;
/// Per-second rate scale for pitch slides and portamento (semitones).
pub const PITCH_SCALE: f32 = 16.0;
/// Hz scale for vibrato and tremolo speed.
pub const SPEED_SCALE: f32 = 16.0;
/// Semitone scale for vibrato depth.
pub const VIBRATO_DEPTH_SCALE: f32 = 64.0;
/// Full-scale value for 12-bit levels (tremolo depth, volume, panning).
pub const LEVEL_SCALE: f32 = 4095.0;
/// Maximum arpeggio steps, including the base note.
pub const MAX_ARPEGGIO: usize = 6;

const FIELD_MASK: u32 = 0xFFF;
const PARAM_MASK: u32 = 0x00FF_FFFF;
const GLOBAL: u8 = 0x80;

mod op {
    pub const NONE: u8 = 0x00;
    pub const VOLUME_SLIDE: u8 = 0x01;
    pub const PITCH_SLIDE: u8 = 0x02;
    pub const VIBRATO: u8 = 0x03;
    pub const TREMOLO: u8 = 0x04;
    pub const PANNING_SLIDE: u8 = 0x05;
    pub const ARPEGGIO: u8 = 0x06;
    pub const PORTAMENTO: u8 = 0x07;
    pub const RETRIGGER: u8 = 0x08;
    pub const SPEED: u8 = 0x09;
    pub const JUMP: u8 = 0x0A;
    pub const STOP: u8 = 0x0B;
    pub const TRANSPOSE: u8 = 0x0C;
    pub const DELAY_RELEASE: u8 = 0x0D;
    pub const SET_VOLUME: u8 = 0x0E;
    pub const SET_PANNING: u8 = 0x0F;
}

/// Which voices an effect applies to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Scope {
    /// A single channel
    #[default]
    Channel,
    /// Every channel of the track
    Track,
}

/// A decoded effect command.
///
/// Parameters stay in their encoded integer units; the `*_per_second`,
/// `hz` and `level` helpers convert them to physical values.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Effect {
    #[default]
    None,

    // === Slides & oscillations (channel or track scope) ===
    /// Volume slide up/down per second
    VolumeSlide { scope: Scope, up: u16, down: u16 },
    /// Pitch slide up/down per second
    PitchSlide { scope: Scope, up: u16, down: u16 },
    /// Sinusoidal pitch modulation
    Vibrato { scope: Scope, speed: u16, depth: u16 },
    /// Sinusoidal volume modulation
    Tremolo { scope: Scope, speed: u16, depth: u16 },
    /// Panning slide right/left per second
    PanningSlide { scope: Scope, right: u16, left: u16 },
    /// Set panning (0 = left, 4095 = right)
    SetPanning { scope: Scope, panning: u16 },

    // === Channel only ===
    /// Cycle the note through `count` offsets, one step per tick. Step 0 is the base note.
    Arpeggio { count: u8, offsets: [u8; MAX_ARPEGGIO - 1] },
    /// Glide toward new notes instead of snapping (0 disables)
    Portamento(u32),
    /// Restart the note every `interval` ticks, `count` times
    Retrigger { interval: u16, count: u16 },
    /// Shift the note by `semitones` every `interval` ticks, `count` times
    Transpose { interval: u8, count: u8, semitones: i8 },
    /// Delay the onset and/or force the release, in ticks
    DelayRelease { delay: u16, release: u16 },
    /// Set the channel volume (0-4095)
    SetVolume(u16),

    // === Transport (always track scope) ===
    /// Set the speed multiplier to `whole + thousandths / 1000`
    SetSpeed { whole: u16, thousandths: u16 },
    /// Jump to a frame and row at the next row boundary
    PatternJump { frame: u16, row: u16 },
    /// Halt the transport
    Stop,
}

impl Effect {
    /// Decode a packed effect code. Unknown opcodes decode to `Effect::None`.
    pub fn decode(code: u32) -> Effect {
        let opcode = (code >> 24) as u8;
        let params = code & PARAM_MASK;
        let a = ((params >> 12) & FIELD_MASK) as u16;
        let b = (params & FIELD_MASK) as u16;

        let scope = if opcode & GLOBAL != 0 { Scope::Track } else { Scope::Channel };
        let base = opcode & !GLOBAL;

        match base {
            op::VOLUME_SLIDE => Effect::VolumeSlide { scope, up: a, down: b },
            op::PITCH_SLIDE => Effect::PitchSlide { scope, up: a, down: b },
            op::VIBRATO => Effect::Vibrato { scope, speed: a, depth: b },
            op::TREMOLO => Effect::Tremolo { scope, speed: a, depth: b },
            op::PANNING_SLIDE => Effect::PanningSlide { scope, right: a, left: b },
            op::SET_PANNING => Effect::SetPanning { scope, panning: a },
            _ if scope == Scope::Track => Effect::None,
            op::ARPEGGIO => {
                let count = ((params >> 20) & 0xF) as u8;
                let mut offsets = [0u8; MAX_ARPEGGIO - 1];
                for (i, offset) in offsets.iter_mut().enumerate() {
                    *offset = ((params >> (16 - 4 * i)) & 0xF) as u8;
                }
                Effect::Arpeggio { count: count.min(MAX_ARPEGGIO as u8), offsets }
            }
            op::PORTAMENTO => Effect::Portamento(params),
            op::RETRIGGER => Effect::Retrigger { interval: a, count: b },
            op::SPEED => Effect::SetSpeed { whole: a, thousandths: b },
            op::JUMP => Effect::PatternJump { frame: a, row: b },
            op::STOP => Effect::Stop,
            op::TRANSPOSE => Effect::Transpose {
                interval: (params >> 16) as u8,
                count: (params >> 8) as u8,
                semitones: params as u8 as i8,
            },
            op::DELAY_RELEASE => Effect::DelayRelease { delay: a, release: b },
            op::SET_VOLUME => Effect::SetVolume(a),
            _ => Effect::None,
        }
    }

    /// Pack this effect into a 32-bit code. Fields wider than their slot are truncated.
    pub fn encode(&self) -> u32 {
        match *self {
            Effect::None => pack(op::NONE, 0),
            Effect::VolumeSlide { scope, up, down } => pack2(scoped(op::VOLUME_SLIDE, scope), up, down),
            Effect::PitchSlide { scope, up, down } => pack2(scoped(op::PITCH_SLIDE, scope), up, down),
            Effect::Vibrato { scope, speed, depth } => pack2(scoped(op::VIBRATO, scope), speed, depth),
            Effect::Tremolo { scope, speed, depth } => pack2(scoped(op::TREMOLO, scope), speed, depth),
            Effect::PanningSlide { scope, right, left } => {
                pack2(scoped(op::PANNING_SLIDE, scope), right, left)
            }
            Effect::SetPanning { scope, panning } => pack2(scoped(op::SET_PANNING, scope), panning, 0),
            Effect::Arpeggio { count, offsets } => {
                let mut params = ((count.min(MAX_ARPEGGIO as u8) as u32) & 0xF) << 20;
                for (i, offset) in offsets.iter().enumerate() {
                    params |= ((*offset as u32) & 0xF) << (16 - 4 * i);
                }
                pack(op::ARPEGGIO, params)
            }
            Effect::Portamento(speed) => pack(op::PORTAMENTO, speed),
            Effect::Retrigger { interval, count } => pack2(op::RETRIGGER, interval, count),
            Effect::SetSpeed { whole, thousandths } => pack2(op::SPEED, whole, thousandths),
            Effect::PatternJump { frame, row } => pack2(op::JUMP, frame, row),
            Effect::Stop => pack(op::STOP, 0),
            Effect::Transpose { interval, count, semitones } => pack(
                op::TRANSPOSE,
                (interval as u32) << 16 | (count as u32) << 8 | semitones as u8 as u32,
            ),
            Effect::DelayRelease { delay, release } => pack2(op::DELAY_RELEASE, delay, release),
            Effect::SetVolume(volume) => pack2(op::SET_VOLUME, volume, 0),
        }
    }

    /// Returns true if this effect is handled by the track rather than a channel.
    pub fn is_global(&self) -> bool {
        match self {
            Effect::VolumeSlide { scope, .. }
            | Effect::PitchSlide { scope, .. }
            | Effect::Vibrato { scope, .. }
            | Effect::Tremolo { scope, .. }
            | Effect::PanningSlide { scope, .. }
            | Effect::SetPanning { scope, .. } => *scope == Scope::Track,
            Effect::SetSpeed { .. } | Effect::PatternJump { .. } | Effect::Stop => true,
            _ => false,
        }
    }

    /// Returns the variant name as a static string (ignoring parameters).
    pub fn name(&self) -> &'static str {
        match self {
            Effect::None => "None",
            Effect::VolumeSlide { .. } => "VolumeSlide",
            Effect::PitchSlide { .. } => "PitchSlide",
            Effect::Vibrato { .. } => "Vibrato",
            Effect::Tremolo { .. } => "Tremolo",
            Effect::PanningSlide { .. } => "PanningSlide",
            Effect::SetPanning { .. } => "SetPanning",
            Effect::Arpeggio { .. } => "Arpeggio",
            Effect::Portamento(_) => "Portamento",
            Effect::Retrigger { .. } => "Retrigger",
            Effect::Transpose { .. } => "Transpose",
            Effect::DelayRelease { .. } => "DelayRelease",
            Effect::SetVolume(_) => "SetVolume",
            Effect::SetSpeed { .. } => "SetSpeed",
            Effect::PatternJump { .. } => "PatternJump",
            Effect::Stop => "Stop",
        }
    }

    // --- Authoring helpers: physical units in, effect out ---

    pub fn volume_slide(scope: Scope, up: f32, down: f32) -> Effect {
        Effect::VolumeSlide { scope, up: field(up * SLIDE_SCALE), down: field(down * SLIDE_SCALE) }
    }

    pub fn pitch_slide(scope: Scope, up: f32, down: f32) -> Effect {
        Effect::PitchSlide { scope, up: field(up * PITCH_SCALE), down: field(down * PITCH_SCALE) }
    }

    pub fn vibrato(scope: Scope, hz: f32, semitones: f32) -> Effect {
        Effect::Vibrato {
            scope,
            speed: field(hz * SPEED_SCALE),
            depth: field(semitones * VIBRATO_DEPTH_SCALE),
        }
    }

    pub fn tremolo(scope: Scope, hz: f32, depth: f32) -> Effect {
        Effect::Tremolo { scope, speed: field(hz * SPEED_SCALE), depth: field(depth * LEVEL_SCALE) }
    }

    pub fn panning_slide(scope: Scope, right: f32, left: f32) -> Effect {
        Effect::PanningSlide {
            scope,
            right: field(right * SLIDE_SCALE),
            left: field(left * SLIDE_SCALE),
        }
    }

    pub fn set_panning(scope: Scope, panning: f32) -> Effect {
        Effect::SetPanning { scope, panning: field(panning.clamp(0.0, 1.0) * LEVEL_SCALE) }
    }

    pub fn set_volume(volume: f32) -> Effect {
        Effect::SetVolume(field(volume.clamp(0.0, 1.0) * LEVEL_SCALE))
    }

    /// Arpeggio over the given semitone offsets; the base note is always step 0.
    pub fn arpeggio(offsets: &[u8]) -> Effect {
        let steps = offsets.len().min(MAX_ARPEGGIO - 1);
        let mut packed = [0u8; MAX_ARPEGGIO - 1];
        for (dst, src) in packed.iter_mut().zip(offsets) {
            *dst = (*src).min(0xF);
        }
        Effect::Arpeggio { count: steps as u8 + 1, offsets: packed }
    }

    pub fn portamento(semitones_per_second: f32) -> Effect {
        let speed = libm::roundf((semitones_per_second * PITCH_SCALE).max(0.0)) as u32;
        Effect::Portamento(speed.min(PARAM_MASK))
    }

    pub fn speed(speed: f32) -> Effect {
        let speed = speed.max(0.0);
        let whole = libm::floorf(speed);
        let thousandths = libm::roundf((speed - whole) * 1000.0).min(999.0);
        Effect::SetSpeed { whole: field(whole), thousandths: thousandths as u16 }
    }

    // --- Decoding helpers: effect parameters to physical units ---

    /// Speed multiplier carried by `SetSpeed`.
    pub fn speed_value(whole: u16, thousandths: u16) -> f32 {
        whole as f32 + thousandths as f32 / 1000.0
    }
}

/// Volume or panning slide rate in units per second.
pub fn slide_per_second(raw: u16) -> f32 {
    raw as f32 / SLIDE_SCALE
}

/// Pitch slide or portamento rate in semitones per second.
pub fn pitch_per_second(raw: u32) -> f32 {
    raw as f32 / PITCH_SCALE
}

/// Vibrato/tremolo frequency in Hz.
pub fn hz(raw: u16) -> f32 {
    raw as f32 / SPEED_SCALE
}

/// Vibrato depth in semitones.
pub fn vibrato_semitones(raw: u16) -> f32 {
    raw as f32 / VIBRATO_DEPTH_SCALE
}

/// 12-bit level as a fraction in `0..=1`.
pub fn level(raw: u16) -> f32 {
    (raw as f32 / LEVEL_SCALE).min(1.0)
}

fn field(value: f32) -> u16 {
    libm::roundf(value.clamp(0.0, FIELD_MASK as f32)) as u16
}

fn scoped(opcode: u8, scope: Scope) -> u8 {
    match scope {
        Scope::Channel => opcode,
        Scope::Track => opcode | GLOBAL,
    }
}

fn pack(opcode: u8, params: u32) -> u32 {
    (opcode as u32) << 24 | (params & PARAM_MASK)
}

fn pack2(opcode: u8, a: u16, b: u16) -> u32 {
    pack(opcode, ((a as u32) & FIELD_MASK) << 12 | ((b as u32) & FIELD_MASK))
}
