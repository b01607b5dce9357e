//! Headless controller for the codetracker sound engine.
//!
//! Owns a song and provides offline rendering and real-time playback that the
//! CLI and tests share.

mod config;
mod demo;
mod wav;

use ct_audio::{AudioOutput, CpalOutput};
use ct_engine::{Channel, Track};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

// Re-export common types so callers don't need ct-ir/ct-engine directly.
pub use ct_engine::{Frame, Position};
pub use ct_ir::{Song, SongError};

pub use config::PlaybackConfig;
pub use demo::{demo_song, DEMO_CHANNELS, DEMO_FRAMES, DEMO_ROWS};
pub use wav::{frames_to_wav, to_i16, write_wav};

/// Published position before the first row has been dispatched.
const NO_POSITION: u32 = u32::MAX;

/// Headless tracker controller: owns a song and manages playback.
pub struct Controller {
    song: Song,
    config: PlaybackConfig,
    playback: Option<PlaybackHandle>,
}

struct PlaybackHandle {
    stop_signal: Arc<AtomicBool>,
    position: Arc<AtomicU32>,
    finished: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl Controller {
    /// Validate `song` and take ownership of it.
    pub fn new(song: Song) -> Result<Self, SongError> {
        song.validate()?;
        Ok(Self { song, config: PlaybackConfig::default(), playback: None })
    }

    pub fn song(&self) -> &Song {
        &self.song
    }

    pub fn config(&self) -> &PlaybackConfig {
        &self.config
    }

    /// Replace the playback settings. Takes effect on the next `play` or render.
    pub fn set_config(&mut self, config: PlaybackConfig) {
        self.config = config;
    }

    // --- Real-time playback ---

    pub fn play(&mut self) {
        self.stop();

        let song = self.song.clone();
        let config = self.config.clone();
        let stop_signal = Arc::new(AtomicBool::new(false));
        let position = Arc::new(AtomicU32::new(NO_POSITION));
        let finished = Arc::new(AtomicBool::new(false));

        let stop = stop_signal.clone();
        let pos = position.clone();
        let done = finished.clone();

        let thread = std::thread::spawn(move || {
            audio_thread(song, config, stop, pos, done);
        });

        self.playback = Some(PlaybackHandle {
            stop_signal,
            position,
            finished,
            thread: Some(thread),
        });
    }

    pub fn stop(&mut self) {
        if let Some(mut pb) = self.playback.take() {
            pb.stop_signal.store(true, Ordering::Relaxed);
            if let Some(handle) = pb.thread.take() {
                let _ = handle.join();
            }
        }
    }

    pub fn is_playing(&self) -> bool {
        self.playback
            .as_ref()
            .is_some_and(|p| !p.finished.load(Ordering::Relaxed))
    }

    pub fn is_finished(&self) -> bool {
        self.playback
            .as_ref()
            .is_some_and(|p| p.finished.load(Ordering::Relaxed))
    }

    /// Position of the live playback, if it is running.
    pub fn position(&self) -> Option<Position> {
        let pb = self.playback.as_ref()?;
        if pb.finished.load(Ordering::Relaxed) {
            return None;
        }
        unpack_position(pb.position.load(Ordering::Relaxed))
    }

    // --- Offline rendering ---

    /// Render at the configured sample rate until the time limit, or until the
    /// song loops or stops when `stop_at_loop` is set.
    pub fn render_frames(&self) -> Result<Vec<Frame>, SongError> {
        let sample_rate = self.config.sample_rate;
        let max_frames = self.config.max_frames(sample_rate);
        let mut track = Track::new(self.song.clone())?;
        let mut channels = prepare_channels(&track, &self.config);

        let mut frames = Vec::with_capacity(max_frames);
        for i in 0..max_frames {
            let frame = track.play(i as f64 / sample_rate as f64, &mut channels);
            if reached_end(&track, &self.config) {
                tracing::debug!(frames = frames.len(), loops = track.loop_count(), "render finished");
                break;
            }
            frames.push(output(frame, self.config.gain));
        }
        Ok(frames)
    }

    /// Render and encode as a 16-bit stereo WAV file.
    pub fn render_to_wav(&self) -> Result<Vec<u8>, SongError> {
        let frames = self.render_frames()?;
        Ok(frames_to_wav(&frames, self.config.sample_rate))
    }
}

impl Drop for Controller {
    fn drop(&mut self) {
        self.stop();
    }
}

fn prepare_channels(track: &Track, config: &PlaybackConfig) -> Vec<Channel> {
    let mut channels = track.channels();
    for channel in channels.iter_mut() {
        if config.is_muted(channel.number()) {
            channel.disable();
        }
    }
    channels
}

fn reached_end(track: &Track, config: &PlaybackConfig) -> bool {
    config.stop_at_loop && (track.loop_count() > 0 || track.is_stopped())
}

fn output(mut frame: Frame, gain: f32) -> Frame {
    frame.scale(gain);
    frame.clamped()
}

fn pack_position(position: Position) -> u32 {
    (position.frame as u32) << 8 | position.row as u32
}

fn unpack_position(packed: u32) -> Option<Position> {
    (packed != NO_POSITION).then(|| Position { frame: (packed >> 8) as u8, row: packed as u8 })
}

fn audio_thread(
    song: Song,
    config: PlaybackConfig,
    stop_signal: Arc<AtomicBool>,
    position: Arc<AtomicU32>,
    finished: Arc<AtomicBool>,
) {
    let (mut output_dev, consumer) = match CpalOutput::new() {
        Ok(opened) => opened,
        Err(err) => {
            tracing::error!(%err, "cannot open audio output");
            finished.store(true, Ordering::Relaxed);
            return;
        }
    };

    let sample_rate = output_dev.sample_rate();
    let Ok(mut track) = Track::new(song) else {
        finished.store(true, Ordering::Relaxed);
        return;
    };
    let mut channels = prepare_channels(&track, &config);

    if let Err(err) = output_dev.build_stream(consumer) {
        tracing::error!(%err, "cannot start audio stream");
        finished.store(true, Ordering::Relaxed);
        return;
    }
    let _ = output_dev.start();

    let max_frames = config.max_frames(sample_rate) as u64;
    let publish_interval = (sample_rate / 100).max(1) as u64;
    let mut frame_count: u64 = 0;

    while frame_count < max_frames && !stop_signal.load(Ordering::Relaxed) {
        let frame = track.play(frame_count as f64 / sample_rate as f64, &mut channels);
        if reached_end(&track, &config) {
            break;
        }
        output_dev.write_spin(output(frame, config.gain));
        frame_count += 1;
        if frame_count % publish_interval == 0 {
            position.store(pack_position(track.position()), Ordering::Relaxed);
        }
    }

    // Let the ring drain before the stream is dropped
    for _ in 0..sample_rate / 10 {
        output_dev.write_spin(Frame::silence());
    }
    let _ = output_dev.stop();

    tracing::debug!(frames = frame_count, underruns = output_dev.underruns(), "playback finished");
    finished.store(true, Ordering::Relaxed);
}
