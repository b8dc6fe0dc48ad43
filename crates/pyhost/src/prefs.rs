//! Durable interpreter preferences.
//!
//! Preferences are stored as a JSON record in the user's config directory:
//! - macOS: ~/Library/Application Support/pyhost/preferences.json
//! - Linux: ~/.config/pyhost/preferences.json
//! - Windows: C:\Users\<User>\AppData\Roaming\pyhost\preferences.json
//!
//! Absence of the record is distinct from an empty record: the former means
//! "never configured", the latter "configured with defaults". Saves replace
//! the whole record.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Persisted interpreter preferences.
///
/// False and absent fields are omitted from the stored record so it stays
/// minimal and forward-compatible; missing keys read back as defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    /// Interpreter name or path to resolve; `None` means "pick a default".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub python: Option<String>,

    /// The host already has an interpreter loaded; skip discovery entirely.
    #[serde(default, skip_serializing_if = "is_false")]
    pub inprocess: bool,

    /// Bind to the managed Conda environment, overriding `python`.
    #[serde(default, skip_serializing_if = "is_false")]
    pub conda: bool,
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// Directory holding the preference record.
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("pyhost")
}

fn preferences_path(dir: &Path) -> PathBuf {
    dir.join("preferences.json")
}

/// Load the stored preferences; `None` when no record exists.
pub fn load_preferences() -> Result<Option<Preferences>> {
    load_preferences_in(&default_config_dir())
}

/// Like [`load_preferences`] but with an explicit config directory.
pub fn load_preferences_in(dir: &Path) -> Result<Option<Preferences>> {
    let path = preferences_path(dir);
    if !path.exists() {
        return Ok(None);
    }
    let contents = std::fs::read_to_string(&path)?;
    Ok(Some(serde_json::from_str(&contents)?))
}

/// Replace the stored record with `prefs`.
pub fn save_preferences(prefs: &Preferences) -> Result<()> {
    save_preferences_in(prefs, &default_config_dir())
}

/// Like [`save_preferences`] but with an explicit config directory.
pub fn save_preferences_in(prefs: &Preferences, dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir)?;
    std::fs::write(
        preferences_path(dir),
        serde_json::to_string_pretty(prefs)?,
    )?;
    Ok(())
}

/// Remove the stored record entirely.
pub fn clear_preferences() -> Result<()> {
    clear_preferences_in(&default_config_dir())
}

/// Like [`clear_preferences`] but with an explicit config directory.
pub fn clear_preferences_in(dir: &Path) -> Result<()> {
    let path = preferences_path(dir);
    if path.exists() {
        std::fs::remove_file(path)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_absent_record_is_none() {
        let dir = TempDir::new().unwrap();
        assert_eq!(load_preferences_in(dir.path()).unwrap(), None);
    }

    #[test]
    fn test_round_trip() {
        let dir = TempDir::new().unwrap();
        let prefs = Preferences {
            python: Some("/usr/bin/python3.9".to_string()),
            inprocess: false,
            conda: true,
        };

        save_preferences_in(&prefs, dir.path()).unwrap();
        let loaded = load_preferences_in(dir.path()).unwrap();
        assert_eq!(loaded, Some(prefs));
    }

    #[test]
    fn test_false_and_absent_fields_are_omitted() {
        let dir = TempDir::new().unwrap();
        let prefs = Preferences {
            python: Some("python3.11".to_string()),
            inprocess: false,
            conda: false,
        };

        save_preferences_in(&prefs, dir.path()).unwrap();
        let raw = std::fs::read_to_string(dir.path().join("preferences.json")).unwrap();
        assert!(raw.contains("python3.11"));
        assert!(!raw.contains("inprocess"));
        assert!(!raw.contains("conda"));
    }

    #[test]
    fn test_default_record_serializes_empty() {
        let json = serde_json::to_string(&Preferences::default()).unwrap();
        assert_eq!(json, "{}");
    }

    #[test]
    fn test_empty_record_reads_as_defaults() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("preferences.json"), "{}").unwrap();

        let loaded = load_preferences_in(dir.path()).unwrap();
        assert_eq!(loaded, Some(Preferences::default()));
    }

    #[test]
    fn test_partial_record_defaults_missing_keys() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("preferences.json"), r#"{"inprocess": true}"#).unwrap();

        let loaded = load_preferences_in(dir.path()).unwrap().unwrap();
        assert!(loaded.inprocess);
        assert!(!loaded.conda);
        assert_eq!(loaded.python, None);
    }

    #[test]
    fn test_save_replaces_whole_record() {
        let dir = TempDir::new().unwrap();
        save_preferences_in(
            &Preferences {
                python: Some("python3.9".to_string()),
                inprocess: false,
                conda: false,
            },
            dir.path(),
        )
        .unwrap();
        save_preferences_in(
            &Preferences {
                python: None,
                inprocess: true,
                conda: false,
            },
            dir.path(),
        )
        .unwrap();

        let loaded = load_preferences_in(dir.path()).unwrap().unwrap();
        assert!(loaded.inprocess);
        assert_eq!(loaded.python, None);
    }

    #[test]
    fn test_clear_removes_record() {
        let dir = TempDir::new().unwrap();
        save_preferences_in(&Preferences::default(), dir.path()).unwrap();
        clear_preferences_in(dir.path()).unwrap();
        assert_eq!(load_preferences_in(dir.path()).unwrap(), None);

        // Clearing an already-absent record is fine.
        clear_preferences_in(dir.path()).unwrap();
    }
}
