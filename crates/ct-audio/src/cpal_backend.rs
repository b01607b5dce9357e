//! Live output on the default cpal device.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, Stream, StreamConfig};
use ct_engine::Frame;
use ringbuf::traits::{Consumer, Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use crate::traits::{AudioError, AudioOutput};

/// Frames queued between the renderer and the device, in milliseconds.
const RING_LATENCY_MS: usize = 100;

/// Ring capacity in frames for `sample_rate`.
fn ring_capacity(sample_rate: u32) -> usize {
    (sample_rate as usize * RING_LATENCY_MS / 1000).max(1)
}

/// Write one frame per device frame into an interleaved buffer of
/// `channels` samples per frame. Channels past the second are zeroed.
///
/// Returns the number of device frames that found the source empty; those
/// are written as silence.
fn fill_interleaved(data: &mut [f32], channels: usize, mut next: impl FnMut() -> Option<Frame>) -> u64 {
    let mut missing = 0;
    for slot in data.chunks_mut(channels.max(1)) {
        let frame = match next() {
            Some(frame) => frame.clamped(),
            None => {
                missing += 1;
                Frame::silence()
            }
        };
        slot.fill(0.0);
        if let Some(left) = slot.first_mut() {
            *left = frame.left;
        }
        if let Some(right) = slot.get_mut(1) {
            *right = frame.right;
        }
    }
    missing
}

/// Stereo f32 output on the system's default device.
///
/// [`CpalOutput::new`] hands back the consuming half of an SPSC frame ring;
/// pass it to [`CpalOutput::build_stream`], which moves it into the device
/// callback. The render thread feeds the producing half through
/// [`AudioOutput::write`] or [`CpalOutput::write_spin`].
pub struct CpalOutput {
    device: Device,
    config: StreamConfig,
    stream: Option<Stream>,
    producer: HeapProd<Frame>,
    playing: Arc<AtomicBool>,
    underruns: Arc<AtomicU64>,
}

impl CpalOutput {
    pub fn new() -> Result<(Self, HeapCons<Frame>), AudioError> {
        let device = cpal::default_host().default_output_device().ok_or(AudioError::NoDevice)?;

        let mut config: StreamConfig = device
            .default_output_config()
            .map_err(|e| AudioError::DeviceInit(e.to_string()))?
            .into();
        config.channels = 2;

        let capacity = ring_capacity(config.sample_rate.0);
        let (producer, consumer) = HeapRb::<Frame>::new(capacity).split();

        tracing::debug!(
            device = %device.name().unwrap_or_default(),
            sample_rate = config.sample_rate.0,
            capacity,
            "audio output opened"
        );

        let output = Self {
            device,
            config,
            stream: None,
            producer,
            playing: Arc::new(AtomicBool::new(false)),
            underruns: Arc::new(AtomicU64::new(0)),
        };
        Ok((output, consumer))
    }

    /// Open the device stream, draining `consumer` from its callback.
    ///
    /// The callback writes silence until [`AudioOutput::start`] is called.
    pub fn build_stream(&mut self, mut consumer: HeapCons<Frame>) -> Result<(), AudioError> {
        let playing = self.playing.clone();
        let underruns = self.underruns.clone();
        let channels = self.config.channels as usize;

        let stream = self
            .device
            .build_output_stream(
                &self.config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    if playing.load(Ordering::Relaxed) {
                        let missing = fill_interleaved(data, channels, || consumer.try_pop());
                        if missing > 0 {
                            underruns.fetch_add(missing, Ordering::Relaxed);
                        }
                    } else {
                        data.fill(0.0);
                    }
                },
                |err| tracing::error!(%err, "audio stream error"),
                None,
            )
            .map_err(|e| AudioError::StreamCreate(e.to_string()))?;

        stream.play().map_err(|e| AudioError::Playback(e.to_string()))?;
        self.stream = Some(stream);
        Ok(())
    }

    /// Queue one frame, busy-waiting while the ring is full.
    pub fn write_spin(&mut self, frame: Frame) {
        while self.producer.try_push(frame).is_err() {
            std::hint::spin_loop();
        }
    }

    /// Device frames filled with silence because the ring ran dry.
    pub fn underruns(&self) -> u64 {
        self.underruns.load(Ordering::Relaxed)
    }
}

impl AudioOutput for CpalOutput {
    fn sample_rate(&self) -> u32 {
        self.config.sample_rate.0
    }

    fn write(&mut self, frames: &[Frame]) -> Result<(), AudioError> {
        let queued = self.producer.push_slice(frames);
        if queued < frames.len() {
            tracing::trace!(dropped = frames.len() - queued, "ring full");
        }
        Ok(())
    }

    fn start(&mut self) -> Result<(), AudioError> {
        self.playing.store(true, Ordering::Relaxed);
        match &self.stream {
            Some(stream) => stream.play().map_err(|e| AudioError::Playback(e.to_string())),
            None => Ok(()),
        }
    }

    fn stop(&mut self) -> Result<(), AudioError> {
        self.playing.store(false, Ordering::Relaxed);
        match &self.stream {
            Some(stream) => stream.pause().map_err(|e| AudioError::Playback(e.to_string())),
            None => Ok(()),
        }
    }
}
