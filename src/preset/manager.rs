use super::Preset;
use anyhow::{Context, Result, bail};
use log::{debug, warn};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Presets stored as one JSON file each in a directory, kept sorted by name.
pub struct Manager {
    dir: PathBuf,
    presets: BTreeMap<String, Preset>,
}

impl Manager {
    /// Open (creating if needed) a preset directory and read everything in it.
    pub fn new<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create preset directory '{}'", dir.display()))?;

        let mut manager = Self {
            dir,
            presets: BTreeMap::new(),
        };
        manager.reload()?;

        Ok(manager)
    }

    /// Re-read the directory. Files that fail to parse are skipped with a warning.
    pub fn reload(&mut self) -> Result<()> {
        let entries = fs::read_dir(&self.dir)
            .with_context(|| format!("failed to list '{}'", self.dir.display()))?;

        self.presets = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
            .filter_map(|path| match read_preset(&path) {
                Ok(preset) => Some((preset.name.clone(), preset)),
                Err(e) => {
                    warn!("Skipping preset {}: {e:#}", path.display());
                    None
                }
            })
            .collect();

        debug!("{} preset(s) in {}", self.presets.len(), self.dir.display());
        Ok(())
    }

    /// Write a preset, replacing any with the same name.
    pub fn save(&mut self, preset: &Preset) -> Result<()> {
        let path = self.path_for(&preset.name);
        let json = serde_json::to_string_pretty(preset)?;
        fs::write(&path, json)
            .with_context(|| format!("failed to write '{}'", path.display()))?;

        // Distinct names can share a sanitized file name, so re-read.
        self.reload()
    }

    pub fn delete(&mut self, name: &str) -> Result<()> {
        let path = self.path_for(name);
        if !path.exists() {
            bail!("no preset file for '{name}'");
        }

        fs::remove_file(&path)
            .with_context(|| format!("failed to delete '{}'", path.display()))?;
        self.presets.remove(name);
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.presets.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&Preset> {
        self.presets.get(name)
    }

    /// All presets, sorted by name.
    pub fn presets(&self) -> impl Iterator<Item = &Preset> {
        self.presets.values()
    }

    pub fn len(&self) -> usize {
        self.presets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.presets.is_empty()
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(file_stem(name)).with_extension("json")
    }
}

fn read_preset(path: &Path) -> Result<Preset> {
    let content = fs::read_to_string(path).context("unreadable")?;
    serde_json::from_str(&content).context("not a preset")
}

/// Replace anything outside `[A-Za-z0-9_-]` so a name is a safe file stem.
fn file_stem(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
