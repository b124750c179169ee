// Store settings
// Loaded from ~/.config/sheetblock/settings.json

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // Buffered store
    #[serde(rename = "store.saveDelayMs")]
    pub save_delay_ms: u64,

    #[serde(rename = "store.keyPrefix")]
    pub key_prefix: String,

    // Owner block reference
    #[serde(rename = "renderer.macro")]
    pub renderer_macro: String,

    // New workbooks
    #[serde(rename = "workbook.defaultSheetName")]
    pub default_sheet_name: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            save_delay_ms: 3_000,
            key_prefix: "kef-sheet".to_string(),
            renderer_macro: "luckysheet".to_string(),
            default_sheet_name: "Sheet1".to_string(),
        }
    }
}

impl Settings {
    /// Get the settings file path
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("sheetblock")
            .join("settings.json")
    }

    /// Load settings from the default path, falling back to defaults
    pub fn load() -> Self {
        Self::load_from(&Self::config_path())
    }

    /// Load settings from `path`. A missing or unreadable file yields defaults.
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            log::debug!("no settings at {}, using defaults", path.display());
            return Self::default();
        }

        match fs::read_to_string(path) {
            Ok(contents) => match Self::parse(&contents) {
                Ok(settings) => settings,
                Err(e) => {
                    log::warn!("Error parsing {}: {}; using default settings", path.display(), e);
                    Self::default()
                }
            },
            Err(e) => {
                log::warn!("Error reading {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Parse settings JSON. Lines starting with `//` are comments.
    pub fn parse(contents: &str) -> Result<Self, String> {
        let cleaned: String = contents
            .lines()
            .filter(|line| !line.trim().starts_with("//"))
            .collect::<Vec<_>>()
            .join("\n");

        serde_json::from_str(&cleaned).map_err(|e| e.to_string())
    }

    /// Save current settings to the default path
    pub fn save(&self) -> Result<(), String> {
        self.save_to(&Self::config_path())
    }

    /// Write pretty JSON to a sibling temp file, then rename it over `path`.
    pub fn save_to(&self, path: &Path) -> Result<(), String> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| e.to_string())?;
        }

        let json = serde_json::to_string_pretty(self).map_err(|e| e.to_string())?;

        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(|e| e.to_string())?;
        fs::rename(&tmp, path).map_err(|e| {
            let _ = fs::remove_file(&tmp);
            e.to_string()
        })
    }

    pub fn save_delay(&self) -> Duration {
        Duration::from_millis(self.save_delay_ms)
    }

    /// Ephemeral-storage key holding the buffered snapshot of `node`.
    pub fn buffer_key(&self, node: &str) -> String {
        format!("{}-buffer-{}", self.key_prefix, node)
    }

    /// Ephemeral-storage key of the recovery ledger.
    pub fn ledger_key(&self) -> String {
        format!("{}-uuids", self.key_prefix)
    }

    /// Get the config file path for display/opening
    pub fn config_path_display() -> String {
        Self::config_path().to_string_lossy().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.save_delay(), Duration::from_secs(3));
        assert_eq!(settings.buffer_key("abc"), "kef-sheet-buffer-abc");
        assert_eq!(settings.ledger_key(), "kef-sheet-uuids");
        assert_eq!(settings.renderer_macro, "luckysheet");
        assert_eq!(settings.default_sheet_name, "Sheet1");
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let settings = Settings::parse(
            r#"{
    // shorter debounce
    "store.saveDelayMs": 500
}"#,
        )
        .unwrap();
        assert_eq!(settings.save_delay_ms, 500);
        assert_eq!(settings.key_prefix, "kef-sheet");
    }

    #[test]
    fn test_invalid_file_falls_back_to_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{ not json").unwrap();

        assert_eq!(Settings::load_from(&path), Settings::default());
        assert_eq!(Settings::load_from(&dir.path().join("missing.json")), Settings::default());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");

        let settings = Settings {
            key_prefix: "notes".to_string(),
            save_delay_ms: 1_200,
            ..Settings::default()
        };
        settings.save_to(&path).unwrap();

        assert!(!path.with_extension("json.tmp").exists());
        let written = fs::read_to_string(&path).unwrap();
        assert!(written.contains("\"store.keyPrefix\": \"notes\""));
        assert_eq!(Settings::load_from(&path), settings);
    }
}
