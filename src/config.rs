use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::fields::SelectionMap;
use crate::pipeline::{DEFAULT_QUALITY, OutputFormat, OutputOptions};

/// Remembered choices for the command-line front end.
///
/// The library core never reads these; the CLI loads them, turns them into
/// [`OutputOptions`] and a starting [`SelectionMap`], and passes those in.
///
/// # Loading
///
/// ```rust,no_run
/// use exif_redact::config::Preferences;
///
/// // From a JSON file
/// let prefs = Preferences::load(Some("preferences.json".as_ref())).unwrap();
///
/// // Or use defaults and customize
/// let mut prefs = Preferences::default();
/// prefs.quality = 85;
/// prefs.include_report = true;
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    /// Encode quality, 1–100.
    pub quality: u8,
    pub output_format: OutputFormat,
    /// Write a redaction report next to each output.
    pub include_report: bool,
    /// Persist `strip_map` between runs.
    pub remember: bool,
    /// Last selection, by `directory:Name`. `true` means strip.
    pub strip_map: SelectionMap,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            quality: DEFAULT_QUALITY,
            output_format: OutputFormat::Same,
            include_report: false,
            remember: false,
            strip_map: SelectionMap::new(),
        }
    }
}

impl Preferences {
    /// Resolve the preferences file path — same directory as the executable.
    pub fn config_path() -> Result<PathBuf> {
        let exe_path = std::env::current_exe().context("Failed to get executable path")?;
        let exe_dir = exe_path
            .parent()
            .context("Failed to get executable directory")?;
        Ok(exe_dir.join("preferences.json"))
    }

    /// Load preferences from the given path, or from the default location.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let prefs_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_path()?,
        };

        if !prefs_path.exists() {
            log::warn!(
                "Preferences file not found at {}. Using defaults.",
                prefs_path.display()
            );
            return Ok(Self::default());
        }

        let contents =
            std::fs::read_to_string(&prefs_path).context("Failed to read preferences file")?;
        let prefs: Preferences =
            serde_json::from_str(&contents).context("Failed to parse preferences file")?;
        Ok(prefs)
    }

    /// Save preferences to the given path, or to the default location.
    pub fn save(&self, path: Option<&Path>) -> Result<()> {
        let prefs_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_path()?,
        };

        let contents =
            serde_json::to_string_pretty(self).context("Failed to serialize preferences")?;
        std::fs::write(&prefs_path, contents).context("Failed to write preferences file")?;
        log::info!("Preferences saved to {}", prefs_path.display());
        Ok(())
    }

    /// Record `selection` and save, but only when `remember` is on.
    ///
    /// Returns whether anything was written.
    pub fn save_if_remembered(&mut self, selection: &SelectionMap, path: Option<&Path>) -> Result<bool> {
        if !self.remember {
            return Ok(false);
        }
        self.strip_map = selection.clone();
        self.save(path)?;
        Ok(true)
    }

    /// The starting selection for a run: the remembered map, or nothing.
    pub fn saved_selection(&self) -> SelectionMap {
        if self.remember {
            self.strip_map.clone()
        } else {
            SelectionMap::new()
        }
    }

    pub fn output_options(&self) -> OutputOptions {
        OutputOptions {
            format: self.output_format,
            quality: self.quality,
            include_report: self.include_report,
        }
    }
}
