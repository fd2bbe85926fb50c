//! Persistent application configuration.
//!
//! Stored as JSON next to the assets it describes. Every field has a default,
//! so a missing or partial file still yields a working setup.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sprites::ModifierConfig;
use vision::RecognizerConfig;

/// Grid shape of one explicitly declared sprite sheet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SheetConfig {
    pub file: PathBuf,
    pub cols: u32,
    pub rows: u32,
}

/// On-disk configuration for the application.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory scanned for `<cols>x<rows> <name>.png` sheet files.
    pub assets_dir: PathBuf,

    /// Explicitly declared sheets. These win over scanned files with the same
    /// name, and cover files that do not follow the naming convention.
    pub sheets: HashMap<String, SheetConfig>,

    /// Sheet holding the 52 card faces in card-class order.
    pub deck_sheet: String,

    /// Sheet and cell index of the card back used for `on_back` compositing.
    pub backs_sheet: String,
    pub card_back_index: u32,

    /// Modifier declarations per category.
    pub modifiers: ModifierConfig,

    /// Detection and identification parameters.
    pub recognizer: RecognizerConfig,

    /// Optional max capture height (downscales large captures for performance).
    pub max_capture_height: Option<u32>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            assets_dir: PathBuf::from("assets"),
            sheets: HashMap::new(),
            deck_sheet: "playing_cards".to_string(),
            backs_sheet: "enhancers".to_string(),
            card_back_index: 1,
            modifiers: ModifierConfig::default(),
            recognizer: RecognizerConfig::default(),
            max_capture_height: Some(1080),
        }
    }
}

impl Config {
    /// Load configuration from disk, falling back to defaults on error.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::try_load(path) {
            Ok(cfg) => cfg,
            Err(err) => {
                tracing::warn!(error = %err, "failed to load config; using defaults");
                Self::default()
            }
        }
    }

    /// Try to load configuration from disk (missing file is fine).
    pub fn try_load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let json = fs::read_to_string(path).with_context(|| format!("read {path:?}"))?;
        let cfg = serde_json::from_str(&json).with_context(|| format!("parse {path:?}"))?;
        Ok(cfg)
    }

    /// Save configuration to disk.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| format!("create {parent:?}"))?;
        }
        let json = serde_json::to_string_pretty(self).context("serialize config")?;
        fs::write(path, json).with_context(|| format!("write {path:?}"))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_json() {
        let cfg: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg.deck_sheet, "playing_cards");
        assert_eq!(cfg.backs_sheet, "enhancers");
        assert_eq!(cfg.card_back_index, 1);
        assert_eq!(cfg.recognizer.accept_threshold, 0.4);
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let cfg = Config::try_load(Path::new("/nonexistent/balatrack.json")).unwrap();
        assert_eq!(cfg.assets_dir, PathBuf::from("assets"));
    }

    #[test]
    fn test_partial_override() {
        let cfg: Config = serde_json::from_str(
            r#"{"deck_sheet": "custom_deck", "max_capture_height": null}"#,
        )
        .unwrap();
        assert_eq!(cfg.deck_sheet, "custom_deck");
        assert_eq!(cfg.max_capture_height, None);
        assert_eq!(cfg.backs_sheet, "enhancers");
    }
}
