//! Line-oriented control surface for a running amp.

use anyhow::{Context, Result, anyhow, bail};
use std::fmt::Write as _;
use std::str::FromStr;
use std::sync::Arc;

use crate::amp::params::{ParamId, ParamSnapshot, Parameters};
use crate::amp::stages::waveshaper::AmpType;
use crate::preset::{Manager, Preset};

pub const HELP: &str = "\
Commands:
  gain <1-100>       set input drive
  tone <20-20000>    set tone cutoff in Hz
  volume <0-1>       set output level
  amp <type>         clean, crunch, lead or metal
  show               print current settings
  presets            list saved presets
  save <name>        save current settings as a preset
  load <name>        load a preset
  help               show this text
  quit               stop";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Set(ParamId, f32),
    Amp(AmpType),
    Show,
    Presets,
    Save(String),
    Load(String),
    Help,
    Quit,
}

impl FromStr for Command {
    type Err = anyhow::Error;

    fn from_str(line: &str) -> Result<Self> {
        let line = line.trim();
        let (word, rest) = line
            .split_once(char::is_whitespace)
            .map_or((line, ""), |(w, r)| (w, r.trim()));

        let command = match word.to_ascii_lowercase().as_str() {
            "gain" | "tone" | "volume" => {
                let id = word.parse::<ParamId>().map_err(|e| anyhow!(e))?;
                let value = rest
                    .parse::<f32>()
                    .with_context(|| format!("'{rest}' is not a number"))?;
                Self::Set(id, value)
            }
            "amp" => Self::Amp(rest.parse::<AmpType>().map_err(|e| anyhow!(e))?),
            "show" => Self::Show,
            "presets" | "list" => Self::Presets,
            "save" => Self::Save(required_name(rest)?),
            "load" => Self::Load(required_name(rest)?),
            "help" | "?" => Self::Help,
            "quit" | "exit" | "q" => Self::Quit,
            "" => bail!("empty command"),
            other => bail!("unknown command '{other}', type 'help' for a list"),
        };

        Ok(command)
    }
}

fn required_name(rest: &str) -> Result<String> {
    if rest.is_empty() {
        bail!("a preset name is required");
    }
    Ok(rest.to_string())
}

#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Message(String),
    Quit,
}

pub struct Console {
    params: Arc<Parameters>,
    presets: Manager,
    seen_revision: u64,
    loaded: Option<String>,
}

impl Console {
    pub fn new(params: Arc<Parameters>, presets: Manager) -> Self {
        let seen_revision = params.revision();
        Self {
            params,
            presets,
            seen_revision,
            loaded: None,
        }
    }

    pub fn execute(&mut self, command: Command) -> Result<Reply> {
        let message = match command {
            Command::Set(id, value) => {
                self.params.set(id, value);
                let info = id.info();
                format!("{}: {}", info.name, info.format_value(self.params.get(id)))
            }
            Command::Amp(amp_type) => {
                self.params.set_amp_type(amp_type);
                format!("Amp Type: {amp_type}")
            }
            Command::Show => self.params.snapshot().to_string(),
            Command::Presets => self.list_presets(),
            Command::Save(name) => {
                self.presets
                    .save(&Preset::capture(&name, &self.params))?;
                format!("Saved preset '{name}'")
            }
            Command::Load(name) => {
                let preset = self
                    .presets
                    .get(&name)
                    .ok_or_else(|| anyhow!("no preset named '{name}'"))?;
                preset.apply(&self.params);
                let message = format!("Loaded '{name}': {}", preset.params);
                self.loaded = Some(name);
                message
            }
            Command::Help => HELP.to_string(),
            Command::Quit => return Ok(Reply::Quit),
        };

        self.seen_revision = self.params.revision();
        Ok(Reply::Message(message))
    }

    /// Returns the current values when something other than this console
    /// changed them since the last call.
    pub fn refresh(&mut self) -> Option<ParamSnapshot> {
        let revision = self.params.revision();
        if revision == self.seen_revision {
            return None;
        }
        self.seen_revision = revision;
        Some(self.params.snapshot())
    }

    /// Name of the last preset loaded from this console.
    pub fn loaded_preset(&self) -> Option<&str> {
        self.loaded.as_deref()
    }

    fn list_presets(&self) -> String {
        if self.presets.is_empty() {
            return format!("No presets in {}", self.presets.dir().display());
        }

        let mut out = String::new();
        for preset in self.presets.presets() {
            let _ = writeln!(out, "{:<20} {}", preset.name, preset.params);
        }
        out.trim_end().to_string()
    }
}
