//! Track sequencer: transport, row dispatch and track-global effects.

use alloc::vec::Vec;

use ct_ir::effects::{hz, level, pitch_per_second, slide_per_second, vibrato_semitones};
use ct_ir::{Effect, Scope, Song, SongError};

use crate::channel::Channel;
use crate::frame::Frame;
use crate::modulation::{GlobalMod, Lfo, Slide, PITCH_LIMIT};

/// A point in the arrangement.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Position {
    pub frame: u8,
    pub row: u8,
}

/// Track-global modulation generators.
#[derive(Clone, Debug)]
struct GlobalFx {
    /// Base volume (0-1)
    volume: f32,
    /// Base panning (0-1)
    panning: f32,
    volume_slide: Option<Slide>,
    pitch_slide: Option<Slide>,
    panning_slide: Option<Slide>,
    vibrato: Option<Lfo>,
    tremolo: Option<Lfo>,
}

impl Default for GlobalFx {
    fn default() -> Self {
        Self {
            volume: 1.0,
            panning: 0.5,
            volume_slide: None,
            pitch_slide: None,
            panning_slide: None,
            vibrato: None,
            tremolo: None,
        }
    }
}

impl GlobalFx {
    fn evaluate(&self, t: f64) -> GlobalMod {
        let mut volume = self.volume;
        if let Some(slide) = &self.volume_slide {
            volume += slide.offset(t);
        }
        volume = volume.clamp(0.0, 1.0);
        if let Some(tremolo) = &self.tremolo {
            volume *= tremolo.factor(t);
        }

        let mut pitch = 0.0;
        if let Some(slide) = &self.pitch_slide {
            pitch += slide.offset(t);
        }
        if let Some(vibrato) = &self.vibrato {
            pitch += vibrato.value(t);
        }

        let mut panning = self.panning;
        if let Some(slide) = &self.panning_slide {
            panning += slide.offset(t);
        }

        GlobalMod {
            volume: volume.clamp(0.0, 1.0),
            pitch: pitch.clamp(-PITCH_LIMIT, PITCH_LIMIT),
            panning: panning.clamp(0.0, 1.0),
        }
    }
}

/// Sequencer for one song.
///
/// Owns the song (instrument bank, pattern bank, arrangement grid) and the
/// transport state. Channels are supplied by the caller on every query; the
/// track only pushes instructions into them and sums their output.
///
/// `play` must be called with non-decreasing times, ideally one sample period
/// apart: rows advance incrementally from the previous call.
pub struct Track {
    song: Song,
    /// Current speed multiplier
    speed: f32,
    /// Seconds per row at the current speed
    row_duration: f64,
    /// Seconds per clock tick
    tick: f64,
    position: Position,
    /// Time of the current row boundary
    row_start: f64,
    started: bool,
    stopped: bool,
    /// Jump applied at the next row boundary
    pending_jump: Option<Position>,
    loops: u32,
    fx: GlobalFx,
    current: GlobalMod,
}

impl Track {
    /// Validate `song` and take ownership of it.
    pub fn new(song: Song) -> Result<Self, SongError> {
        song.validate()?;
        let speed = song.speed;
        let row_duration = song.row_duration();
        let tick = 1.0 / song.clock as f64;
        tracing::debug!(
            channels = song.channels,
            frames = song.frames,
            rows = song.rows,
            row_duration,
            "track created"
        );
        Ok(Self {
            song,
            speed,
            row_duration,
            tick,
            position: Position::default(),
            row_start: 0.0,
            started: false,
            stopped: false,
            pending_jump: None,
            loops: 0,
            fx: GlobalFx::default(),
            current: GlobalMod::NEUTRAL,
        })
    }

    /// Allocate a channel array for this song, numbered from 0 and
    /// initialised from the song's channel settings.
    pub fn channels(&self) -> Vec<Channel> {
        (0..self.song.channels)
            .map(|number| {
                let settings = self.song.settings(number);
                let mut channel = Channel::new(number);
                channel.set_panning(settings.initial_pan);
                channel.set_volume(settings.initial_volume);
                if settings.muted {
                    channel.disable();
                }
                channel
            })
            .collect()
    }

    /// Advance the transport to `t`, dispatch due rows and return the summed
    /// stereo sample of `channels`.
    ///
    /// Channels beyond the song's channel count are rendered but never
    /// dispatched to.
    pub fn play(&mut self, t: f64, channels: &mut [Channel]) -> Frame {
        if !self.started {
            self.started = true;
            self.row_start = t;
            self.dispatch_row(t, channels);
        } else {
            while !self.stopped && t - self.row_start >= self.row_duration {
                self.row_start += self.row_duration;
                self.advance();
                self.dispatch_row(self.row_start, channels);
            }
        }

        self.update_fx(t);

        let mut out = Frame::silence();
        for channel in channels.iter() {
            out.mix(channel.sample(t, &self.current));
        }
        out
    }

    /// Apply one packed effect code at the track level.
    ///
    /// Transport and track-scope effects are handled; everything else is
    /// ignored.
    pub fn decode_fx(&mut self, code: u32, t: f64) {
        match Effect::decode(code) {
            Effect::SetSpeed { whole, thousandths } => {
                let speed = Effect::speed_value(whole, thousandths);
                if speed > 0.0 {
                    self.speed = speed;
                    self.row_duration = self.compute_row_duration();
                    tracing::debug!(speed, row_duration = self.row_duration, "speed change");
                } else {
                    tracing::debug!("ignoring zero speed");
                }
            }
            Effect::PatternJump { frame, row } => {
                if frame < self.song.frames as u16 && row < self.song.rows as u16 {
                    let target = Position { frame: frame as u8, row: row as u8 };
                    tracing::debug!(frame, row, "pattern jump");
                    self.pending_jump = Some(target);
                } else {
                    tracing::debug!(frame, row, "ignoring jump outside the song");
                }
            }
            Effect::Stop => {
                tracing::debug!(frame = self.position.frame, row = self.position.row, "stop");
                self.stopped = true;
            }
            Effect::VolumeSlide { scope: Scope::Track, up, down } => {
                self.fx.volume_slide = Slide::new(slide_per_second(up), slide_per_second(down), t);
            }
            Effect::PitchSlide { scope: Scope::Track, up, down } => {
                self.fx.pitch_slide =
                    Slide::new(pitch_per_second(up as u32), pitch_per_second(down as u32), t);
            }
            Effect::PanningSlide { scope: Scope::Track, right, left } => {
                self.fx.panning_slide = Slide::new(slide_per_second(right), slide_per_second(left), t);
            }
            Effect::Vibrato { scope: Scope::Track, speed, depth } => {
                self.fx.vibrato = Lfo::new(hz(speed), vibrato_semitones(depth), t);
            }
            Effect::Tremolo { scope: Scope::Track, speed, depth } => {
                self.fx.tremolo = Lfo::new(hz(speed), level(depth), t);
            }
            Effect::SetPanning { scope: Scope::Track, panning } => {
                self.fx.panning = level(panning);
                if let Some(slide) = &mut self.fx.panning_slide {
                    slide.restart(t);
                }
            }
            _ => {}
        }
    }

    /// Re-evaluate the track-global modulation at `t`.
    pub fn update_fx(&mut self, t: f64) {
        self.current = self.fx.evaluate(t);
    }

    /// Global modulation as of the last `play`/`update_fx` call.
    pub fn global_mod(&self) -> GlobalMod {
        self.current
    }

    pub fn song(&self) -> &Song {
        &self.song
    }

    /// Current track-global panning.
    pub fn panning(&self) -> f32 {
        self.current.panning
    }

    pub fn clock(&self) -> f32 {
        self.song.clock
    }

    /// Current speed multiplier.
    pub fn speed(&self) -> f32 {
        self.speed
    }

    pub fn number_of_channels(&self) -> u8 {
        self.song.channels
    }

    /// Seconds per row at the current speed.
    pub fn row_duration(&self) -> f64 {
        self.row_duration
    }

    /// Estimated song length in seconds at the current speed.
    ///
    /// Approximate: jumps, stops and later speed changes are not accounted for.
    pub fn duration(&self) -> f64 {
        self.song.rows as f64 * self.song.frames as f64 * self.row_duration
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// Number of times playback wrapped from the last frame to the first.
    pub fn loop_count(&self) -> u32 {
        self.loops
    }

    fn compute_row_duration(&self) -> f64 {
        self.speed as f64 * self.song.basetime as f64 / self.song.clock as f64
    }

    /// Move to the next row, honouring a pending jump.
    fn advance(&mut self) {
        if let Some(target) = self.pending_jump.take() {
            self.position = target;
            return;
        }
        let mut pos = self.position;
        pos.row += 1;
        if pos.row >= self.song.rows {
            pos.row = 0;
            pos.frame += 1;
            if pos.frame >= self.song.frames {
                pos.frame = 0;
                self.loops += 1;
                tracing::debug!(loops = self.loops, "song loop");
            }
        }
        self.position = pos;
    }

    /// Push the current row's instructions into the channels.
    fn dispatch_row(&mut self, t: f64, channels: &mut [Channel]) {
        let Position { frame, row } = self.position;
        tracing::trace!(frame, row, t, "row");
        let count = self.song.channels as usize;
        for (index, channel) in channels.iter_mut().enumerate().take(count) {
            let codes = {
                let Some(instruction) = self
                    .song
                    .pattern_at(index as u8, frame)
                    .and_then(|pattern| pattern.get(row))
                else {
                    continue;
                };
                if instruction.is_empty() {
                    continue;
                }
                channel.dispatch(instruction, t, &self.song.instruments, self.tick);
                instruction.effects.clone()
            };
            for code in codes {
                if Effect::decode(code).is_global() {
                    self.decode_fx(code, t);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ct_ir::{notes, Adsr, Instrument, Key, Oscillator, SongBuilder, Waveform};

    const SR: f64 = 8000.0;

    /// clock 60, basetime 2, speed 3: 0.1 s rows.
    fn builder(rows: u8, frames: u8, channels: u8) -> SongBuilder {
        let mut b = SongBuilder::new(rows, frames, channels, &vec![2; channels as usize]);
        b.transport(60.0, 2.0, 3.0);
        b.instrument(Instrument::new(Oscillator::new(Waveform::Square))).unwrap();
        b
    }

    fn arrange_all(b: &mut SongBuilder, channel: u8, frames: u8, pattern: u8) {
        for frame in 0..frames {
            b.arrange(channel, frame, pattern).unwrap();
        }
    }

    fn render(track: &mut Track, channels: &mut [Channel], until: f64) -> Vec<Frame> {
        let n = (until * SR) as usize;
        (0..n).map(|i| track.play(i as f64 / SR, channels)).collect()
    }

    #[test]
    fn row_duration_and_dispatch_scenario() {
        let mut b = builder(4, 1, 1);
        let p = b.pattern(0).unwrap();
        b.prepare(0, p, 0, 1.0);
        b.note(0, Key::new(notes::A, 4)).unwrap();
        b.note(1, Key::new(notes::A, 5)).unwrap();
        arrange_all(&mut b, 0, 1, p);
        let mut track = Track::new(b.build().unwrap()).unwrap();
        let mut channels = track.channels();

        assert!((track.row_duration() - 0.1).abs() < 1e-12);
        track.play(0.0, &mut channels);
        track.play(0.05, &mut channels);
        assert_eq!(track.position(), Position { frame: 0, row: 0 });
        assert_eq!(channels[0].note(), Some(0.0));

        track.play(0.15, &mut channels);
        assert_eq!(track.position(), Position { frame: 0, row: 1 });
        assert_eq!(channels[0].note(), Some(12.0));
        assert!((channels[0].time() - 0.1).abs() < 1e-12);
    }

    #[test]
    fn empty_song_is_silent() {
        let mut b = builder(4, 2, 3);
        let p = b.pattern(0).unwrap();
        for ch in 0..3 {
            arrange_all(&mut b, ch, 2, p);
        }
        let mut track = Track::new(b.build().unwrap()).unwrap();
        let mut channels = track.channels();
        assert!(channels.iter().all(Channel::is_enabled));
        for frame in render(&mut track, &mut channels, 1.0) {
            assert_eq!(frame, Frame::silence());
        }
    }

    #[test]
    fn disabled_channel_contributes_nothing() {
        let mut b = builder(4, 1, 2);
        let p0 = b.pattern(0).unwrap();
        b.prepare(0, p0, 0, 1.0);
        b.note(0, Key::new(notes::C, 4)).unwrap();
        let p1 = b.pattern(1).unwrap();
        b.prepare(1, p1, 0, 1.0);
        b.note(0, Key::new(notes::E, 4)).unwrap();
        b.arrange(0, 0, p0).unwrap().arrange(1, 0, p1).unwrap();
        let song = b.build().unwrap();

        let mut solo = Track::new(song.clone()).unwrap();
        let mut solo_channels = solo.channels();
        solo_channels[1].disable();
        let mut only_first = Track::new(song).unwrap();
        let mut first_channels = only_first.channels();

        for i in 0..2000 {
            let t = i as f64 / SR;
            let mixed = solo.play(t, &mut solo_channels);
            only_first.play(t, &mut first_channels[..1]);
            let expected = first_channels[0].sample(t, &only_first.global_mod());
            assert_eq!(mixed, expected);
        }
    }

    #[test]
    fn rows_wrap_into_frames_and_loop() {
        let mut b = builder(2, 2, 1);
        let p = b.pattern(0).unwrap();
        arrange_all(&mut b, 0, 2, p);
        let mut track = Track::new(b.build().unwrap()).unwrap();
        let mut channels = track.channels();
        assert!((track.duration() - 0.4).abs() < 1e-9);

        track.play(0.0, &mut channels);
        let positions: Vec<Position> = [0.05, 0.15, 0.25, 0.35, 0.45, 0.55]
            .iter()
            .map(|&t| {
                track.play(t, &mut channels);
                track.position()
            })
            .collect();
        assert_eq!(
            positions,
            vec![
                Position { frame: 0, row: 0 },
                Position { frame: 0, row: 1 },
                Position { frame: 1, row: 0 },
                Position { frame: 1, row: 1 },
                Position { frame: 0, row: 0 },
                Position { frame: 0, row: 1 },
            ]
        );
        assert_eq!(track.loop_count(), 1);
    }

    #[test]
    fn speed_change_rescales_rows() {
        let mut b = builder(8, 1, 1);
        let p = b.pattern(0).unwrap();
        b.prepare(0, p, 0, 1.0);
        b.note_fx(0, Key::new(notes::A, 4), &[Effect::speed(6.0)]).unwrap();
        arrange_all(&mut b, 0, 1, p);
        let mut track = Track::new(b.build().unwrap()).unwrap();
        let mut channels = track.channels();

        track.play(0.0, &mut channels);
        assert_eq!(track.speed(), 6.0);
        assert!((track.row_duration() - 0.2).abs() < 1e-9);
        track.play(0.15, &mut channels);
        assert_eq!(track.position().row, 0);
        track.play(0.25, &mut channels);
        assert_eq!(track.position().row, 1);
    }

    #[test]
    fn jump_applies_at_next_row() {
        let mut b = builder(8, 2, 1);
        let p = b.pattern(0).unwrap();
        b.prepare(0, p, 0, 1.0);
        b.note_fx(1, Key::new(notes::A, 4), &[Effect::PatternJump { frame: 1, row: 5 }]).unwrap();
        b.note_fx(2, Key::CONTINUE, &[Effect::PatternJump { frame: 9, row: 0 }]).unwrap();
        arrange_all(&mut b, 0, 2, p);
        let mut track = Track::new(b.build().unwrap()).unwrap();
        let mut channels = track.channels();

        track.play(0.0, &mut channels);
        track.play(0.15, &mut channels);
        assert_eq!(track.position(), Position { frame: 0, row: 1 });
        track.play(0.25, &mut channels);
        assert_eq!(track.position(), Position { frame: 1, row: 5 });
    }

    #[test]
    fn invalid_jump_is_ignored() {
        let mut b = builder(4, 1, 1);
        let p = b.pattern(0).unwrap();
        b.prepare(0, p, 0, 1.0);
        b.note_fx(0, Key::CONTINUE, &[Effect::PatternJump { frame: 3, row: 0 }]).unwrap();
        arrange_all(&mut b, 0, 1, p);
        let mut track = Track::new(b.build().unwrap()).unwrap();
        let mut channels = track.channels();
        track.play(0.0, &mut channels);
        track.play(0.15, &mut channels);
        assert_eq!(track.position(), Position { frame: 0, row: 1 });
    }

    #[test]
    fn stop_freezes_transport_but_voices_ring() {
        let mut b = builder(4, 1, 1);
        let p = b.pattern(0).unwrap();
        b.prepare(0, p, 0, 1.0);
        b.note_fx(1, Key::new(notes::A, 4), &[Effect::Stop]).unwrap();
        arrange_all(&mut b, 0, 1, p);
        let mut track = Track::new(b.build().unwrap()).unwrap();
        let mut channels = track.channels();

        let frames = render(&mut track, &mut channels, 1.0);
        assert!(track.is_stopped());
        assert_eq!(track.position(), Position { frame: 0, row: 1 });
        assert!(frames[frames.len() - 100..].iter().any(|f| !f.is_silent()));
    }

    #[test]
    fn global_volume_slide_scales_every_voice() {
        let mut b = builder(16, 1, 1);
        let p = b.pattern(0).unwrap();
        b.prepare(0, p, 0, 1.0);
        let fade = Effect::volume_slide(Scope::Track, 0.0, 1.0);
        b.note_fx(0, Key::new(notes::A, 4), &[fade]).unwrap();
        arrange_all(&mut b, 0, 1, p);
        let mut track = Track::new(b.build().unwrap()).unwrap();
        let mut channels = track.channels();

        track.play(0.0, &mut channels);
        assert!(channels[0].instruction_state().effects.len() == 1);
        let frame = track.play(0.2505, &mut channels);
        assert!((track.global_mod().volume - 0.7495).abs() < 1e-3);
        assert!((frame.left - 0.5 * track.global_mod().volume).abs() < 1e-4);
        track.play(1.5, &mut channels);
        assert_eq!(track.global_mod().volume, 0.0);
    }

    #[test]
    fn channel_settings_seed_channels() {
        let mut b = builder(4, 1, 2);
        let p = b.pattern(0).unwrap();
        arrange_all(&mut b, 0, 1, p);
        arrange_all(&mut b, 1, 1, p);
        b.channel_settings(1, ct_ir::ChannelSettings { initial_pan: 0.0, initial_volume: 0.5, muted: true })
            .unwrap();
        let track = Track::new(b.build().unwrap()).unwrap();
        let channels = track.channels();
        assert_eq!(channels.len(), 2);
        assert_eq!(channels[1].number(), 1);
        assert!(!channels[1].is_enabled());
        assert_eq!(channels[1].panning(), 0.0);
        assert_eq!(channels[1].volume(), 0.5);
        assert!(channels[0].is_enabled());
    }

    #[test]
    fn invalid_song_is_rejected() {
        let mut b = builder(4, 1, 1);
        let p = b.pattern(0).unwrap();
        arrange_all(&mut b, 0, 1, p);
        let mut song = b.build().unwrap();
        song.pattern_indices[0][0] = 9;
        assert!(matches!(Track::new(song), Err(SongError::PatternIndexOutOfRange { index: 9, .. })));
    }

    #[test]
    fn envelope_rises_through_attack() {
        let mut b = SongBuilder::new(4, 1, 1, &[0]);
        let pad = Oscillator::with_envelope(Waveform::Square, Adsr::new(0.1, 0.0, 1.0, 0.0));
        b.instrument(Instrument::new(pad)).unwrap();
        let p = b.pattern(0).unwrap();
        b.prepare(0, p, 0, 1.0);
        b.note(0, Key::new(notes::A, 4)).unwrap();
        b.arrange(0, 0, p).unwrap();
        let mut track = Track::new(b.build().unwrap()).unwrap();
        let mut channels = track.channels();

        let peak = |frames: &[Frame]| frames.iter().fold(0.0f32, |m, f| m.max(f.left.abs()));
        let frames = render(&mut track, &mut channels, 0.2);
        let attack = peak(&frames[..400]);
        let sustain = peak(&frames[1200..1600]);
        assert!(attack < sustain);
        assert!((sustain - 0.5).abs() < 1e-4);
    }

    /// Single-channel, 16-row song whose first row carries `effects`.
    fn global_fx_track(effects: &[Effect]) -> (Track, Vec<Channel>) {
        let mut b = builder(16, 1, 1);
        let p = b.pattern(0).unwrap();
        b.prepare(0, p, 0, 1.0);
        b.note_fx(0, Key::new(notes::A, 4), effects).unwrap();
        arrange_all(&mut b, 0, 1, p);
        let track = Track::new(b.build().unwrap()).unwrap();
        let channels = track.channels();
        (track, channels)
    }

    #[test]
    fn global_pitch_slide_and_vibrato() {
        let (mut track, mut channels) = global_fx_track(&[Effect::pitch_slide(Scope::Track, 2.0, 0.0)]);
        track.play(0.0, &mut channels);
        assert_eq!(track.global_mod().pitch, 0.0);
        track.play(0.5, &mut channels);
        assert!((track.global_mod().pitch - 1.0).abs() < 1e-4);
        // Channel state is untouched by track-scope effects
        assert_eq!(channels[0].current_pitch(0.5), 0.0);

        let (mut track, mut channels) = global_fx_track(&[Effect::vibrato(Scope::Track, 2.0, 0.5)]);
        track.play(0.0, &mut channels);
        track.play(0.125, &mut channels);
        assert!((track.global_mod().pitch - 0.5).abs() < 1e-4);
        track.play(0.375, &mut channels);
        assert!((track.global_mod().pitch + 0.5).abs() < 1e-4);
    }

    #[test]
    fn global_tremolo_scales_output() {
        let (mut track, mut channels) = global_fx_track(&[Effect::tremolo(Scope::Track, 1.0, 0.5)]);
        track.play(0.0, &mut channels);
        assert_eq!(track.global_mod().volume, 1.0);
        track.play(0.25, &mut channels);
        assert!((track.global_mod().volume - 0.75).abs() < 1e-3);
        let frame = track.play(0.5005, &mut channels);
        let volume = track.global_mod().volume;
        assert!((volume - 0.5).abs() < 1e-3);
        assert!((frame.left - 0.5 * volume).abs() < 1e-4);
        track.play(0.75, &mut channels);
        assert!((track.global_mod().volume - 0.75).abs() < 1e-3);
    }

    #[test]
    fn global_panning_set_and_slide() {
        let effects = [
            Effect::set_panning(Scope::Track, 0.25),
            Effect::panning_slide(Scope::Track, 0.5, 0.0),
        ];
        let mut b = builder(16, 1, 1);
        let p = b.pattern(0).unwrap();
        b.prepare(0, p, 0, 1.0);
        b.note_fx(0, Key::new(notes::A, 4), &effects).unwrap();
        b.effect(5, Effect::set_panning(Scope::Track, 0.0)).unwrap();
        arrange_all(&mut b, 0, 1, p);
        let mut track = Track::new(b.build().unwrap()).unwrap();
        let mut channels = track.channels();

        track.play(0.0, &mut channels);
        assert!((track.panning() - 0.25).abs() < 1e-3);
        // Channel pan 0.5 is offset by the global pan
        let frame = track.play(0.0005, &mut channels);
        assert!((frame.left - 0.75).abs() < 1e-3);
        assert!((frame.right - 0.25).abs() < 1e-3);

        track.play(0.45, &mut channels);
        assert!((track.panning() - 0.475).abs() < 1e-3);
        // Row 5 resets the pan and restarts the slide
        track.play(0.55, &mut channels);
        assert!((track.panning() - 0.025).abs() < 1e-3);
        assert_eq!(track.global_mod().panning, track.panning());
    }
}
