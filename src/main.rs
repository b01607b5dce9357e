//! codetracker CLI: render the demo song to WAV or play it live.
//!
//! Usage:
//!   ct-cli
//!   ct-cli --wav demo.wav --seconds 20
//!   RUST_LOG=debug ct-cli --mute 0

use anyhow::{bail, Context, Result};
use clap::Parser;
use ct_master::{demo_song, Controller, PlaybackConfig};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "ct-cli", version, about = "Render or play the codetracker demo song")]
struct Args {
    /// Write a 16-bit stereo WAV file instead of playing live
    #[arg(long, value_name = "PATH")]
    wav: Option<PathBuf>,

    /// Maximum length in seconds
    #[arg(long, default_value_t = 60.0)]
    seconds: f64,

    /// Sample rate of the WAV render
    #[arg(long, value_name = "HZ", default_value_t = 44100)]
    sample_rate: u32,

    /// Silence a channel (repeatable)
    #[arg(long = "mute", value_name = "CH")]
    muted: Vec<u8>,

    /// End when the song loops back to its first frame
    #[arg(long)]
    loop_stop: bool,

    /// Output gain
    #[arg(long, default_value_t = 1.0)]
    gain: f32,
}

impl Args {
    fn config(&self) -> PlaybackConfig {
        PlaybackConfig {
            sample_rate: self.sample_rate,
            max_seconds: self.seconds,
            stop_at_loop: self.loop_stop,
            muted: self.muted.clone(),
            gain: self.gain,
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    if args.sample_rate == 0 {
        bail!("sample rate must be positive");
    }

    let song = demo_song().context("building demo song")?;
    let mut ctrl = Controller::new(song).context("loading demo song")?;
    ctrl.set_config(args.config());

    let song = ctrl.song();
    println!("Channels:    {}", song.channels);
    println!("Frames:      {} x {} rows", song.frames, song.rows);
    println!("Instruments: {}", song.instruments.len());
    println!("Patterns:    {}", song.patterns.len());
    println!(
        "Transport:   clock {} Hz, basetime {}, speed {} ({:.3} s/row)",
        song.clock,
        song.basetime,
        song.speed,
        song.row_duration()
    );
    println!("Length:      {:.1} s", song.duration());
    println!();

    match &args.wav {
        Some(path) => render_to_wav(&ctrl, path),
        None => {
            play_audio(&mut ctrl);
            Ok(())
        }
    }
}

fn play_audio(ctrl: &mut Controller) {
    ctrl.play();
    println!("Playing...");
    println!();

    while ctrl.is_playing() {
        if let Some(pos) = ctrl.position() {
            print!("\rFrame: {:02} | Row: {:02}", pos.frame, pos.row);
            let _ = std::io::stdout().flush();
        }
        std::thread::sleep(std::time::Duration::from_millis(10));
    }

    println!("\rDone.               ");
}

fn render_to_wav(ctrl: &Controller, path: &Path) -> Result<()> {
    let sample_rate = ctrl.config().sample_rate;
    println!("Rendering to {} at {} Hz...", path.display(), sample_rate);

    let wav = ctrl.render_to_wav().context("rendering")?;
    println!("Rendered {} bytes", wav.len());

    fs::write(path, &wav).with_context(|| format!("writing {}", path.display()))?;
    tracing::info!(path = %path.display(), bytes = wav.len(), "wav written");

    println!("Done.");
    Ok(())
}
