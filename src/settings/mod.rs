use anyhow::{Context, Result};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

const APP_DIR: &str = "crunchbox";
const SETTINGS_FILENAME: &str = "settings.json";

/// JACK connections and offline block size.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AudioSettings {
    pub input_left_port: String,
    pub input_right_port: String,
    pub output_left_port: String,
    pub output_right_port: String,
    /// Frames per block when rendering files.
    pub block_size: usize,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            input_left_port: "system:capture_1".into(),
            input_right_port: "system:capture_2".into(),
            output_left_port: "system:playback_1".into(),
            output_right_port: "system:playback_2".into(),
            block_size: 512,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub audio: AudioSettings,
    pub recording_dir: PathBuf,
    pub preset_dir: PathBuf,
    /// Preset applied at startup when none is named on the command line.
    pub selected_preset: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            audio: AudioSettings::default(),
            recording_dir: PathBuf::from("./recordings"),
            preset_dir: PathBuf::from("./presets"),
            selected_preset: None,
        }
    }
}

impl std::fmt::Display for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let audio = &self.audio;
        let rows = [
            ("inputs", format!("{}, {}", audio.input_left_port, audio.input_right_port)),
            ("outputs", format!("{}, {}", audio.output_left_port, audio.output_right_port)),
            ("block size", audio.block_size.to_string()),
            ("recordings", self.recording_dir.display().to_string()),
            ("presets", self.preset_dir.display().to_string()),
            (
                "preset",
                self.selected_preset.clone().unwrap_or_else(|| "none".into()),
            ),
        ];

        for (label, value) in rows {
            writeln!(f, "  {label:<12}{value}")?;
        }
        Ok(())
    }
}

impl Settings {
    pub fn load() -> Result<Self> {
        Self::load_from(&settings_path())
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&settings_path())
    }

    /// Read settings from `path`. A missing file yields defaults, which are
    /// written back on a best-effort basis.
    pub fn load_from(path: &Path) -> Result<Self> {
        match fs::read_to_string(path) {
            Ok(contents) => {
                let settings = serde_json::from_str(&contents)
                    .with_context(|| format!("invalid settings in '{}'", path.display()))?;
                debug!("Loaded settings from {}", path.display());
                Ok(settings)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!("No settings at {}, using defaults", path.display());
                let settings = Self::default();
                if let Err(e) = settings.save_to(path) {
                    warn!("Could not write default settings: {e:#}");
                }
                Ok(settings)
            }
            Err(e) => Err(e).with_context(|| format!("failed to read '{}'", path.display())),
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("failed to create '{}'", dir.display()))?;
        }

        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).with_context(|| format!("failed to write '{}'", path.display()))?;

        debug!("Saved settings to {}", path.display());
        Ok(())
    }
}

/// `$XDG_CONFIG_HOME/crunchbox/settings.json`, then `~/.config/crunchbox/`,
/// then the working directory.
pub fn settings_path() -> PathBuf {
    std::env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".config")))
        .map_or_else(
            || PathBuf::from(SETTINGS_FILENAME),
            |config| config.join(APP_DIR).join(SETTINGS_FILENAME),
        )
}
