use anyhow::{Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use crossbeam::channel::{RecvTimeoutError, unbounded};
use log::{info, warn};
use std::io::{self, BufRead};
use std::path::{Path, PathBuf};
use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread,
    time::Duration,
};

use crunchbox::amp::params::Parameters;
use crunchbox::amp::stages::waveshaper::AmpType;
use crunchbox::audio::manager::Manager as AudioManager;
use crunchbox::console::{Command, Console, HELP, Reply};
use crunchbox::preset::Manager as PresetManager;
use crunchbox::processor::Processor;
use crunchbox::render::render_file;
use crunchbox::settings::Settings;

#[cfg(debug_assertions)]
#[global_allocator]
static A: assert_no_alloc::AllocDisabler = assert_no_alloc::AllocDisabler;

const POLL_INTERVAL: Duration = Duration::from_millis(200);

#[derive(Parser, Debug)]
#[command(name = "crunchbox")]
#[command(version)]
#[command(about = "A four-mode stereo distortion with offline rendering and a JACK host.")]
struct Args {
    #[arg(long, env = "CRUNCHBOX_PRESET_DIR", help = "Directory holding presets")]
    preset_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Mode,
}

#[derive(Subcommand, Debug)]
enum Mode {
    /// Process a WAV file
    Render {
        input: PathBuf,
        output: PathBuf,
        #[arg(long, help = "Frames per processing block")]
        block_size: Option<usize>,
        #[command(flatten)]
        tone: ToneArgs,
    },
    /// Run as a JACK client with a console on stdin
    Live {
        #[arg(long, help = "Enable WAV recording")]
        record: bool,
        #[arg(long, env = "RECORDING_DIR", help = "Directory to save recordings")]
        recording_dir: Option<PathBuf>,
        #[command(flatten)]
        tone: ToneArgs,
    },
    /// List or delete saved presets
    Presets {
        #[arg(long, value_name = "NAME")]
        delete: Option<String>,
    },
}

#[derive(ClapArgs, Debug)]
struct ToneArgs {
    #[arg(long, help = "Start from a saved preset")]
    preset: Option<String>,
    #[arg(long, help = "Input drive, 1-100")]
    gain: Option<f32>,
    #[arg(long, help = "Tone cutoff in Hz, 20-20000")]
    tone: Option<f32>,
    #[arg(long, help = "Output level, 0-1")]
    volume: Option<f32>,
    #[arg(long, value_enum)]
    amp: Option<AmpType>,
}

impl ToneArgs {
    fn apply(&self, params: &Parameters, presets: &PresetManager, fallback: Option<&str>) {
        if let Some(name) = self.preset.as_deref().or(fallback) {
            match presets.get(name) {
                Some(preset) => {
                    preset.apply(params);
                    info!("Loaded preset '{name}'");
                }
                None => warn!("Preset '{name}' not found, using defaults"),
            }
        }

        if let Some(gain) = self.gain {
            params.set_gain(gain);
        }
        if let Some(tone) = self.tone {
            params.set_tone_hz(tone);
        }
        if let Some(volume) = self.volume {
            params.set_volume(volume);
        }
        if let Some(amp) = self.amp {
            params.set_amp_type(amp);
        }
    }
}

fn main() -> Result<()> {
    dotenv::dotenv().ok();
    env_logger::init();

    let args = Args::parse();

    info!("Crunchbox v{}", env!("CARGO_PKG_VERSION"));
    info!("Args: {args:?}");

    let mut settings = Settings::load().context("failed to load settings")?;
    info!("Settings:\n{settings}");

    let preset_dir = args
        .preset_dir
        .clone()
        .unwrap_or_else(|| settings.preset_dir.clone());
    let mut presets = PresetManager::new(&preset_dir)
        .with_context(|| format!("failed to open preset directory '{}'", preset_dir.display()))?;

    match args.command {
        Mode::Render {
            input,
            output,
            block_size,
            tone,
        } => {
            let mut processor = Processor::default();
            tone.apply(
                &processor.params(),
                &presets,
                settings.selected_preset.as_deref(),
            );
            info!("Rendering with {}", processor.snapshot());

            let block_size = block_size.unwrap_or(settings.audio.block_size);
            let stats = render_file(&mut processor, &input, &output, block_size)?;
            println!(
                "Wrote {} ({} frames, {} ch, {} Hz, peak {:.3})",
                output.display(),
                stats.frames,
                stats.channels,
                stats.sample_rate,
                stats.peak
            );
        }
        Mode::Live {
            record,
            recording_dir,
            tone,
        } => {
            let params = Arc::new(Parameters::new());
            tone.apply(&params, &presets, settings.selected_preset.as_deref());

            let recording_dir = recording_dir.unwrap_or_else(|| settings.recording_dir.clone());
            let record_dir = record.then_some(recording_dir.as_path());
            let loaded = run_live(&settings, params, presets, record_dir)?;

            if loaded.is_some() && loaded != settings.selected_preset {
                settings.selected_preset = loaded;
                if let Err(e) = settings.save() {
                    warn!("Failed to save settings: {e:#}");
                }
            }
        }
        Mode::Presets { delete } => {
            if let Some(name) = delete {
                presets.delete(&name)?;
                println!("Deleted preset '{name}'");
            }

            for preset in presets.presets() {
                println!("{:<20} {}", preset.name, preset.params);
            }
        }
    }

    Ok(())
}

/// Run the JACK host until Ctrl+C or `quit`. Returns the last preset loaded
/// from the console.
fn run_live(
    settings: &Settings,
    params: Arc<Parameters>,
    presets: PresetManager,
    record_dir: Option<&Path>,
) -> Result<Option<String>> {
    let audio = AudioManager::new(&settings.audio, Arc::clone(&params), record_dir)
        .context("failed to start audio")?;
    info!(
        "Live at {} Hz, {} frames{}",
        audio.sample_rate(),
        audio.buffer_size(),
        if audio.is_recording() { " [recording]" } else { "" }
    );

    let running = Arc::new(AtomicBool::new(true));
    let shutdown_flag = Arc::clone(&running);

    ctrlc::set_handler(move || {
        info!("Ctrl+C received, shutting down...");
        shutdown_flag.store(false, Ordering::SeqCst);
    })
    .context("error setting Ctrl+C handler")?;

    let (tx, rx) = unbounded::<Result<Command>>();
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if line.trim().is_empty() {
                continue;
            }
            if tx.send(line.parse::<Command>()).is_err() {
                break;
            }
        }
    });

    let mut console = Console::new(Arc::clone(audio.params()), presets);
    println!("{HELP}");
    println!("{}", params.snapshot());

    while running.load(Ordering::SeqCst) {
        match rx.recv_timeout(POLL_INTERVAL) {
            Ok(Ok(command)) => match console.execute(command) {
                Ok(Reply::Message(message)) => println!("{message}"),
                Ok(Reply::Quit) => break,
                Err(e) => eprintln!("error: {e:#}"),
            },
            Ok(Err(e)) => eprintln!("error: {e:#}"),
            Err(RecvTimeoutError::Timeout) => {
                if let Some(snapshot) = console.refresh() {
                    println!("{snapshot}");
                }
            }
            // stdin closed; keep running until Ctrl+C.
            Err(RecvTimeoutError::Disconnected) => thread::sleep(POLL_INTERVAL),
        }
    }

    let loaded = console.loaded_preset().map(str::to_string);
    audio.shutdown()?;

    Ok(loaded)
}
