//! Channel (voice) state for tracker playback.

use ct_ir::effects::{hz, level, pitch_per_second, slide_per_second, vibrato_semitones};
use ct_ir::{notes, Effect, Instruction, Instrument, Scope};

use crate::frame::Frame;
use crate::modulation::{Arpeggio, Glide, GlobalMod, Lfo, Retrigger, Slide, Transpose, PITCH_LIMIT};

/// Clock tick assumed before the first dispatch (60 Hz).
const DEFAULT_TICK: f64 = 1.0 / 60.0;

/// One voice.
///
/// A channel owns a private clone of the instrument it was last told to play,
/// so envelope and release state never leak between voices or back into the
/// bank. It keeps no reference to the track driving it: the track passes the
/// instrument bank, the tick length and the global modulation on each call.
#[derive(Clone, Debug)]
pub struct Channel {
    number: u8,
    enabled: bool,
    /// Current volume (0-1)
    volume: f32,
    /// Semitone offset added to the held note
    pitch: f32,
    /// Current panning (0 = left, 1 = right)
    panning: f32,
    /// Copy of the last dispatched instruction
    instruction: Instruction,
    /// Bank index of the current instrument
    instrument_index: u8,
    instrument: Option<Instrument>,
    /// Linear pitch of the held key
    note: Option<f32>,
    /// Note onset
    time: f64,
    /// Release onset
    time_release: f64,
    released: bool,
    /// Clock tick in seconds
    tick: f64,

    // Per-voice generators
    volume_slide: Option<Slide>,
    pitch_slide: Option<Slide>,
    panning_slide: Option<Slide>,
    vibrato: Option<Lfo>,
    tremolo: Option<Lfo>,
    arpeggio: Option<Arpeggio>,
    /// Portamento speed in semitones per second (0 = off)
    portamento: f32,
    glide: Option<Glide>,
    retrigger: Option<Retrigger>,
    transpose: Option<Transpose>,
}

impl Channel {
    /// Create an enabled, silent channel at full volume, centered.
    pub fn new(number: u8) -> Self {
        Self {
            number,
            enabled: true,
            volume: 1.0,
            pitch: 0.0,
            panning: 0.5,
            instruction: Instruction::empty(),
            instrument_index: notes::CONTINUE,
            instrument: None,
            note: None,
            time: 0.0,
            time_release: 0.0,
            released: false,
            tick: DEFAULT_TICK,
            volume_slide: None,
            pitch_slide: None,
            panning_slide: None,
            vibrato: None,
            tremolo: None,
            arpeggio: None,
            portamento: 0.0,
            glide: None,
            retrigger: None,
            transpose: None,
        }
    }

    pub fn number(&self) -> u8 {
        self.number
    }

    pub fn enable(&mut self) {
        self.enabled = true;
    }

    pub fn disable(&mut self) {
        self.enabled = false;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, 1.0);
    }

    /// Semitone offset added to every note.
    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    pub fn set_pitch(&mut self, pitch: f32) {
        self.pitch = pitch;
    }

    pub fn panning(&self) -> f32 {
        self.panning
    }

    pub fn set_panning(&mut self, panning: f32) {
        self.panning = panning.clamp(0.0, 1.0);
    }

    /// Onset of the held note.
    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn set_time(&mut self, time: f64) {
        self.time = time;
    }

    /// Time at which the held note is (or will be) released.
    pub fn time_release(&self) -> f64 {
        self.time_release
    }

    pub fn set_time_release(&mut self, time: f64) {
        self.time_release = time;
    }

    /// Returns true once a release has been requested, even if it is scheduled
    /// for later than the current time.
    pub fn is_released(&self) -> bool {
        self.released
    }

    pub fn set_release(&mut self, released: bool) {
        self.released = released;
        if let Some(inst) = &mut self.instrument {
            inst.oscillator_mut().set_release(released);
        }
    }

    /// The held copy of the last dispatched instruction.
    pub fn instruction_state(&self) -> &Instruction {
        &self.instruction
    }

    /// Replace the held instruction without dispatching it.
    pub fn set_instruction_state(&mut self, instruction: Instruction) {
        self.instruction = instruction;
    }

    /// Edit the held instruction's volume and apply it to the voice.
    pub fn set_volume_instruction_state(&mut self, volume: f32) {
        let volume = volume.clamp(0.0, 1.0);
        self.instruction.volume = Some(volume);
        self.volume = volume;
    }

    /// The voice's private instrument, if one is assigned.
    pub fn instrument(&self) -> Option<&Instrument> {
        self.instrument.as_ref()
    }

    /// Bank index of the last selected instrument (`notes::CONTINUE` if none).
    pub fn instrument_index(&self) -> u8 {
        self.instrument_index
    }

    /// Linear pitch of the held key, if a note is held.
    pub fn note(&self) -> Option<f32> {
        self.note
    }

    /// Apply a dispatched instruction at time `t`.
    ///
    /// `bank` is the track's instrument bank and `tick` the clock tick in
    /// seconds. Track-scope effects on the instruction are ignored here.
    pub fn dispatch(&mut self, instruction: &Instruction, t: f64, bank: &[Instrument], tick: f64) {
        self.tick = tick;
        self.instruction = instruction.clone();

        if instruction.instrument != notes::CONTINUE {
            self.select_instrument(instruction.instrument, bank);
        }

        if let Some(volume) = instruction.volume {
            self.volume = volume.clamp(0.0, 1.0);
            if let Some(slide) = &mut self.volume_slide {
                slide.restart(t);
            }
        }

        // Portamento has to be known before the note it glides into
        for effect in instruction.decoded_effects() {
            if let Effect::Portamento(_) = effect {
                self.apply_effect(effect, t, false);
            }
        }

        let key = instruction.key;
        let mut triggered = false;
        if key.is_release() {
            self.release(t);
        } else if let Some(pitch) = key.pitch() {
            if instruction.instrument == notes::CONTINUE {
                self.reset_instrument();
            }
            self.trigger(pitch, t);
            triggered = true;
        }

        for effect in instruction.decoded_effects() {
            if !matches!(effect, Effect::Portamento(_)) {
                self.apply_effect(effect, t, triggered);
            }
        }
    }

    /// Decode one packed effect code and start its generator at `t`.
    ///
    /// Unknown opcodes and track-scope effects are ignored.
    pub fn decode_fx(&mut self, code: u32, t: f64) {
        self.apply_effect(Effect::decode(code), t, false);
    }

    /// Render this voice at `t` under the track's global modulation.
    pub fn sample(&self, t: f64, global: &GlobalMod) -> Frame {
        if !self.enabled || t < self.time {
            return Frame::silence();
        }
        let (Some(inst), Some(_)) = (&self.instrument, self.note) else {
            return Frame::silence();
        };

        let onset = match &self.retrigger {
            Some(retrigger) => retrigger.onset(self.time, t),
            None => self.time,
        };
        let elapsed = t - onset;
        let rt = (self.time_release - onset).max(0.0);

        let volume = self.current_volume(t) * global.volume.clamp(0.0, 1.0);
        if volume <= 0.0 {
            return Frame::silence();
        }
        let pitch = self.current_pitch(t) + global.pitch;
        let pan = self.current_panning(t) + (global.panning - 0.5);

        let s = inst.play_pitch_released(volume, pitch, elapsed, rt);
        Frame::panned(s, pan)
    }

    /// Effective volume at `t`, including slide and tremolo.
    pub fn current_volume(&self, t: f64) -> f32 {
        let mut volume = self.volume;
        if let Some(slide) = &self.volume_slide {
            volume += slide.offset(t);
        }
        volume = volume.clamp(0.0, 1.0);
        if let Some(tremolo) = &self.tremolo {
            volume *= tremolo.factor(t);
        }
        volume.clamp(0.0, 1.0)
    }

    /// Effective linear pitch at `t`, before global modulation.
    ///
    /// Returns 0 when no note is held.
    pub fn current_pitch(&self, t: f64) -> f32 {
        let mut pitch = self.base_pitch(t) + self.pitch;
        let mut offset = 0.0;
        if let Some(slide) = &self.pitch_slide {
            offset += slide.offset(t);
        }
        if let Some(vibrato) = &self.vibrato {
            offset += vibrato.value(t);
        }
        if let Some(arpeggio) = &self.arpeggio {
            offset += arpeggio.offset(t);
        }
        if let Some(transpose) = &self.transpose {
            offset += transpose.offset(t);
        }
        pitch += offset.clamp(-PITCH_LIMIT, PITCH_LIMIT);
        pitch
    }

    /// Effective panning at `t`, including slide.
    pub fn current_panning(&self, t: f64) -> f32 {
        let mut panning = self.panning;
        if let Some(slide) = &self.panning_slide {
            panning += slide.offset(t);
        }
        panning.clamp(0.0, 1.0)
    }

    fn base_pitch(&self, t: f64) -> f32 {
        match (&self.glide, self.note) {
            (Some(glide), _) => glide.pitch(t),
            (None, Some(note)) => note,
            (None, None) => 0.0,
        }
    }

    fn select_instrument(&mut self, index: u8, bank: &[Instrument]) {
        self.instrument_index = index;
        match bank.get(index as usize) {
            Some(inst) => {
                let mut inst = inst.clone();
                inst.oscillator_mut().set_release(self.released);
                self.instrument = Some(inst);
            }
            None => {
                tracing::warn!(
                    channel = self.number,
                    instrument = index,
                    bank = bank.len(),
                    "instrument outside the bank, channel silenced"
                );
                self.instrument = None;
            }
        }
    }

    fn reset_instrument(&mut self) {
        if let Some(inst) = &mut self.instrument {
            inst.oscillator_mut().reset();
        }
    }

    /// Start a new note.
    fn trigger(&mut self, pitch: f32, t: f64) {
        self.glide = match (self.note, self.portamento > 0.0) {
            (Some(_), true) if !self.released => {
                Some(Glide::new(self.base_pitch(t), pitch, self.portamento, t))
            }
            _ => None,
        };
        self.note = Some(pitch);
        self.time = t;
        self.time_release = t;
        self.set_release(false);
        self.retrigger = None;
        self.transpose = None;
        if let Some(slide) = &mut self.pitch_slide {
            slide.restart(t);
        }
    }

    fn release(&mut self, t: f64) {
        self.time_release = t;
        self.set_release(true);
    }

    fn ticks(&self, count: u16) -> f64 {
        count as f64 * self.tick
    }

    /// `triggered` is set when the same instruction started a new note.
    fn apply_effect(&mut self, effect: Effect, t: f64, triggered: bool) {
        match effect {
            Effect::VolumeSlide { scope: Scope::Channel, up, down } => {
                self.volume_slide = Slide::new(slide_per_second(up), slide_per_second(down), t);
            }
            Effect::PitchSlide { scope: Scope::Channel, up, down } => {
                self.pitch_slide = Slide::new(
                    pitch_per_second(up as u32),
                    pitch_per_second(down as u32),
                    t,
                );
            }
            Effect::PanningSlide { scope: Scope::Channel, right, left } => {
                self.panning_slide = Slide::new(slide_per_second(right), slide_per_second(left), t);
            }
            Effect::Vibrato { scope: Scope::Channel, speed, depth } => {
                self.vibrato = Lfo::new(hz(speed), vibrato_semitones(depth), t);
            }
            Effect::Tremolo { scope: Scope::Channel, speed, depth } => {
                self.tremolo = Lfo::new(hz(speed), level(depth), t);
            }
            Effect::SetPanning { scope: Scope::Channel, panning } => {
                self.panning = level(panning);
                if let Some(slide) = &mut self.panning_slide {
                    slide.restart(t);
                }
            }
            Effect::SetVolume(volume) => {
                self.volume = level(volume);
                if let Some(slide) = &mut self.volume_slide {
                    slide.restart(t);
                }
            }
            Effect::Arpeggio { count, offsets } => {
                self.arpeggio = Arpeggio::new(count, &offsets, self.tick, t);
            }
            Effect::Portamento(speed) => {
                self.portamento = pitch_per_second(speed);
                if speed == 0 {
                    self.glide = None;
                }
            }
            Effect::Retrigger { interval, count } => {
                self.retrigger = Retrigger::new(self.ticks(interval), count, t);
            }
            Effect::Transpose { interval, count, semitones } => {
                self.transpose = Transpose::new(self.ticks(interval as u16), count, semitones, t);
            }
            Effect::DelayRelease { delay, release } => {
                // Only a note started on this row can be delayed
                if triggered && delay > 0 {
                    self.time = t + self.ticks(delay);
                    self.time_release = self.time;
                }
                if release > 0 {
                    let from = if triggered { self.time } else { t };
                    self.time_release = from + self.ticks(release);
                    self.set_release(true);
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ct_ir::{notes, Adsr, Key, Oscillator, Waveform};

    const TICK: f64 = 1.0 / 60.0;

    fn bank() -> Vec<Instrument> {
        vec![
            Instrument::new(Oscillator::new(Waveform::Square)),
            Instrument::new(Oscillator::with_envelope(
                Waveform::Square,
                Adsr::new(0.1, 0.0, 1.0, 0.2),
            )),
        ]
    }

    fn note(instrument: u8, key: Key, effects: &[Effect]) -> Instruction {
        let codes: Vec<u32> = effects.iter().map(Effect::encode).collect();
        Instruction::with_effects(instrument, key, Some(1.0), &codes).unwrap()
    }

    fn a4() -> Key {
        Key::new(notes::A, 4)
    }

    /// A row that keeps the current note and only carries effects.
    fn hold(effects: &[Effect]) -> Instruction {
        let codes: Vec<u32> = effects.iter().map(Effect::encode).collect();
        Instruction::with_effects(notes::CONTINUE, Key::CONTINUE, None, &codes).unwrap()
    }

    fn level_at(ch: &Channel, t: f64) -> f32 {
        ch.sample(t, &GlobalMod::NEUTRAL).left.abs()
    }

    #[test]
    fn silent_until_dispatched() {
        let ch = Channel::new(0);
        assert!(ch.sample(0.0, &GlobalMod::NEUTRAL).is_silent());
        assert!(ch.instrument().is_none());
    }

    #[test]
    fn square_pans_center() {
        let mut ch = Channel::new(0);
        ch.dispatch(&note(0, a4(), &[]), 0.0, &bank(), TICK);
        // First half of the period is high
        let f = ch.sample(0.0005, &GlobalMod::NEUTRAL);
        assert_eq!(f, Frame::mono(0.5));
        assert_eq!(ch.note(), Some(0.0));
    }

    #[test]
    fn disabled_channel_is_silent() {
        let mut ch = Channel::new(0);
        ch.dispatch(&note(0, a4(), &[]), 0.0, &bank(), TICK);
        ch.disable();
        assert!(!ch.is_enabled());
        for i in 0..100 {
            assert!(ch.sample(i as f64 / 1000.0, &GlobalMod::NEUTRAL).is_silent());
        }
        ch.enable();
        assert!(!ch.sample(0.0005, &GlobalMod::NEUTRAL).is_silent());
    }

    #[test]
    fn out_of_range_instrument_is_silence() {
        let mut ch = Channel::new(3);
        ch.dispatch(&note(9, a4(), &[]), 0.0, &bank(), TICK);
        assert!(ch.instrument().is_none());
        assert_eq!(ch.instrument_index(), 9);
        assert!(ch.sample(0.0005, &GlobalMod::NEUTRAL).is_silent());
    }

    #[test]
    fn attack_is_quieter_than_sustain() {
        let mut ch = Channel::new(0);
        ch.dispatch(&note(1, a4(), &[]), 0.0, &bank(), TICK);
        // Same waveform position (1/440 s periods apart), inside and after the attack
        let t_attack = 10.0 / 440.0 + 0.0005;
        let t_sustain = 60.0 / 440.0 + 0.0005;
        let attack = ch.sample(t_attack, &GlobalMod::NEUTRAL).left.abs();
        let sustain = ch.sample(t_sustain, &GlobalMod::NEUTRAL).left.abs();
        assert!(attack > 0.0);
        assert!(attack < sustain);
    }

    #[test]
    fn release_key_fades_out() {
        let mut ch = Channel::new(0);
        let bank = bank();
        ch.dispatch(&note(1, a4(), &[]), 0.0, &bank, TICK);
        let release = Instruction { key: Key::RELEASE, ..Instruction::empty() };
        ch.dispatch(&release, 0.5, &bank, TICK);
        assert!(ch.is_released());
        assert_eq!(ch.time_release(), 0.5);
        assert!(!ch.sample(0.6005, &GlobalMod::NEUTRAL).is_silent());
        assert!(ch.sample(0.75, &GlobalMod::NEUTRAL).is_silent());
        // Held copy reflects the last instruction
        assert!(ch.instruction_state().key.is_release());
    }

    #[test]
    fn continue_keeps_the_note() {
        let mut ch = Channel::new(0);
        let bank = bank();
        ch.dispatch(&note(0, Key::new(notes::C, 5), &[]), 0.0, &bank, TICK);
        let volume_only = Instruction { volume: Some(0.25), ..Instruction::empty() };
        ch.dispatch(&volume_only, 0.2, &bank, TICK);
        assert_eq!(ch.time(), 0.0);
        assert_eq!(ch.volume(), 0.25);
        assert_eq!(ch.note(), Some(3.0));
    }

    #[test]
    fn arpeggio_steps_once_per_tick() {
        let mut ch = Channel::new(0);
        ch.dispatch(&note(0, a4(), &[Effect::arpeggio(&[4, 7])]), 0.0, &bank(), TICK);
        let pitches: Vec<f32> = (0..6).map(|i| ch.current_pitch((i as f64 + 0.5) * TICK)).collect();
        assert_eq!(pitches, vec![0.0, 4.0, 7.0, 0.0, 4.0, 7.0]);
    }

    #[test]
    fn new_note_resets_transpose_but_keeps_arpeggio() {
        let mut ch = Channel::new(0);
        let bank = bank();
        let transpose = Effect::Transpose { interval: 1, count: 1, semitones: 12 };
        ch.dispatch(&note(0, a4(), &[transpose, Effect::arpeggio(&[3])]), 0.0, &bank, TICK);
        assert_eq!(ch.current_pitch(1.5 * TICK), 12.0 + 3.0);
        ch.dispatch(&note(0, a4(), &[]), 0.5, &bank, TICK);
        // Only the arpeggio offset remains
        let p = ch.current_pitch(0.5 + 0.5 * TICK);
        assert!(p == 0.0 || p == 3.0);
        let q = ch.current_pitch(0.5 + 1.5 * TICK);
        assert!(q == 0.0 || q == 3.0);
        assert_ne!(p, q);
    }

    #[test]
    fn volume_slide_is_clamped() {
        let mut ch = Channel::new(0);
        let slide = Effect::volume_slide(Scope::Channel, 0.0, 2.0);
        ch.dispatch(&note(0, a4(), &[slide]), 0.0, &bank(), TICK);
        assert!((ch.current_volume(0.25) - 0.5).abs() < 1e-4);
        assert_eq!(ch.current_volume(2.0), 0.0);
        assert!(ch.sample(2.0005, &GlobalMod::NEUTRAL).is_silent());
    }

    #[test]
    fn portamento_glides_between_notes() {
        let mut ch = Channel::new(0);
        let bank = bank();
        ch.dispatch(&note(0, a4(), &[]), 0.0, &bank, TICK);
        ch.dispatch(&note(0, Key::new(notes::A, 5), &[Effect::portamento(24.0)]), 1.0, &bank, TICK);
        assert!((ch.current_pitch(1.25) - 6.0).abs() < 1e-4);
        assert_eq!(ch.current_pitch(2.0), 12.0);
    }

    #[test]
    fn delay_defers_onset_and_schedules_release() {
        let mut ch = Channel::new(0);
        let delayed = Effect::DelayRelease { delay: 6, release: 12 };
        ch.dispatch(&note(0, a4(), &[delayed]), 1.0, &bank(), TICK);
        assert!((ch.time() - 1.1).abs() < 1e-9);
        assert!((ch.time_release() - 1.3).abs() < 1e-9);
        assert!(ch.sample(1.05, &GlobalMod::NEUTRAL).is_silent());
        assert!(!ch.sample(1.1005, &GlobalMod::NEUTRAL).is_silent());
        assert!(ch.sample(1.4005, &GlobalMod::NEUTRAL).is_silent());
    }

    #[test]
    fn retrigger_restarts_envelope() {
        let mut ch = Channel::new(0);
        let retrig = Effect::Retrigger { interval: 12, count: 1 };
        ch.dispatch(&note(1, a4(), &[retrig]), 0.0, &bank(), TICK);
        // 0.2 s is one retrigger interval; 0.2005 sits at the start of a fresh attack
        let fresh = ch.sample(0.2005, &GlobalMod::NEUTRAL).left.abs();
        let before = ch.sample(0.1955, &GlobalMod::NEUTRAL).left.abs();
        assert!(fresh < 0.05);
        assert!(before > 0.4);
    }

    #[test]
    fn global_modulation_applies() {
        let mut ch = Channel::new(0);
        ch.dispatch(&note(0, a4(), &[]), 0.0, &bank(), TICK);
        let half = GlobalMod { volume: 0.5, ..GlobalMod::NEUTRAL };
        assert_eq!(ch.sample(0.0005, &half), Frame::mono(0.25));
        let hard_right = GlobalMod { panning: 1.0, ..GlobalMod::NEUTRAL };
        assert_eq!(ch.sample(0.0005, &hard_right), Frame { left: 0.0, right: 1.0 });
    }

    #[test]
    fn controls_edit_held_state() {
        let mut ch = Channel::new(2);
        assert_eq!(ch.number(), 2);
        ch.set_volume_instruction_state(0.4);
        assert_eq!(ch.instruction_state().volume, Some(0.4));
        assert_eq!(ch.volume(), 0.4);
        ch.set_instruction_state(note(0, a4(), &[]));
        assert_eq!(ch.instruction_state().key, a4());
        ch.set_pitch(2.0);
        ch.set_time(3.0);
        ch.set_time_release(4.0);
        ch.set_release(true);
        assert_eq!((ch.pitch(), ch.time(), ch.time_release()), (2.0, 3.0, 4.0));
        assert!(ch.is_released());
    }

    #[test]
    fn retrigger_on_held_note_counts_from_its_row() {
        let mut ch = Channel::new(0);
        let bank = bank();
        ch.dispatch(&note(1, a4(), &[]), 0.0, &bank, TICK);
        ch.dispatch(&hold(&[Effect::Retrigger { interval: 12, count: 2 }]), 0.5, &bank, TICK);
        assert_eq!(ch.time(), 0.0);
        assert!(level_at(&ch, 0.6955) > 0.4);
        // Restarts at 0.7 and 0.9, then the envelope runs on
        assert!(level_at(&ch, 0.7005) < 0.05);
        assert!(level_at(&ch, 0.8955) > 0.4);
        assert!(level_at(&ch, 0.9005) < 0.05);
        assert!(level_at(&ch, 1.1005) > 0.4);
    }

    #[test]
    fn note_cut_on_held_note_keeps_onset() {
        let mut ch = Channel::new(0);
        let bank = bank();
        ch.dispatch(&note(1, a4(), &[]), 0.0, &bank, TICK);
        ch.dispatch(&hold(&[Effect::DelayRelease { delay: 0, release: 12 }]), 0.5, &bank, TICK);
        assert_eq!(ch.time(), 0.0);
        assert!(ch.is_released());
        assert!((ch.time_release() - 0.7).abs() < 1e-9);
        assert!(level_at(&ch, 0.4905) > 0.4);
        assert!(level_at(&ch, 0.5005) > 0.4);
        assert!(level_at(&ch, 0.6955) > 0.4);
        let fading = level_at(&ch, 0.8005);
        assert!(fading > 0.1 && fading < 0.4);
        assert!(ch.sample(0.9005, &GlobalMod::NEUTRAL).is_silent());
    }

    #[test]
    fn tremolo_swings_below_full_volume() {
        let mut ch = Channel::new(0);
        let tremolo = Effect::tremolo(Scope::Channel, 1.0, 0.5);
        ch.dispatch(&note(0, a4(), &[tremolo]), 0.0, &bank(), TICK);
        let volumes: Vec<f32> = [0.0, 0.25, 0.5, 0.75].iter().map(|&t| ch.current_volume(t)).collect();
        let expected = [1.0, 0.75, 0.5, 0.75];
        for (got, want) in volumes.iter().zip(expected) {
            assert!((got - want).abs() < 1e-3, "{volumes:?}");
        }
        // Off again with a zero depth
        ch.decode_fx(Effect::tremolo(Scope::Channel, 1.0, 0.0).encode(), 1.0);
        assert_eq!(ch.current_volume(1.5), 1.0);
    }

    #[test]
    fn vibrato_oscillates_around_the_note() {
        let mut ch = Channel::new(0);
        let vibrato = Effect::vibrato(Scope::Channel, 2.0, 0.5);
        ch.dispatch(&note(0, Key::new(notes::A, 5), &[vibrato]), 0.0, &bank(), TICK);
        assert!((ch.current_pitch(0.0) - 12.0).abs() < 1e-4);
        assert!((ch.current_pitch(0.125) - 12.5).abs() < 1e-4);
        assert!((ch.current_pitch(0.375) - 11.5).abs() < 1e-4);
        assert!((ch.current_pitch(0.625) - 12.5).abs() < 1e-4);
    }

    #[test]
    fn pitch_slide_restarts_on_new_note() {
        let mut ch = Channel::new(0);
        let bank = bank();
        let slide = Effect::pitch_slide(Scope::Channel, 4.0, 0.0);
        ch.dispatch(&note(0, a4(), &[slide]), 0.0, &bank, TICK);
        assert!((ch.current_pitch(0.5) - 2.0).abs() < 1e-4);
        assert_eq!(ch.current_pitch(60.0), PITCH_LIMIT);

        ch.dispatch(&note(0, Key::new(notes::A, 5), &[]), 1.0, &bank, TICK);
        assert!((ch.current_pitch(1.5) - 14.0).abs() < 1e-4);
    }

    #[test]
    fn set_panning_and_panning_slide() {
        let mut ch = Channel::new(0);
        let bank = bank();
        let effects = [
            Effect::set_panning(Scope::Channel, 0.25),
            Effect::panning_slide(Scope::Channel, 0.5, 0.0),
        ];
        ch.dispatch(&note(0, a4(), &effects), 0.0, &bank, TICK);
        assert!((ch.current_panning(0.0) - 0.25).abs() < 1e-3);
        assert!((ch.current_panning(0.5) - 0.5).abs() < 1e-3);
        assert_eq!(ch.current_panning(5.0), 1.0);

        let f = ch.sample(0.0005, &GlobalMod::NEUTRAL);
        assert!((f.left - 0.75).abs() < 1e-3);
        assert!((f.right - 0.25).abs() < 1e-3);

        // Setting the pan restarts the slide from the new position
        ch.dispatch(&hold(&[Effect::set_panning(Scope::Channel, 0.0)]), 1.0, &bank, TICK);
        assert_eq!(ch.panning(), 0.0);
        assert!((ch.current_panning(1.5) - 0.25).abs() < 1e-3);
    }

    #[test]
    fn set_volume_overrides_and_restarts_slide() {
        let mut ch = Channel::new(0);
        let bank = bank();
        ch.dispatch(&note(0, a4(), &[Effect::set_volume(0.5)]), 0.0, &bank, TICK);
        assert!((ch.volume() - 0.5).abs() < 1e-3);

        let fade = Effect::volume_slide(Scope::Channel, 0.0, 0.5);
        ch.dispatch(&note(0, a4(), &[fade]), 1.0, &bank, TICK);
        assert!((ch.current_volume(1.5) - 0.75).abs() < 1e-4);

        ch.dispatch(&hold(&[Effect::set_volume(0.8)]), 2.0, &bank, TICK);
        assert!((ch.volume() - 0.8).abs() < 1e-4);
        assert!((ch.current_volume(2.2) - 0.7).abs() < 1e-4);
    }
}
