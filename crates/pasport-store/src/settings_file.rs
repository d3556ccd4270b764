// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Settings persistence — `settings.json` in the data directory.

use std::path::{Path, PathBuf};

use pasport_core::config::Settings;
use pasport_core::error::Result;
use tracing::{debug, info, warn};

/// File name of the settings file inside the data directory.
pub const SETTINGS_FILE: &str = "settings.json";

pub fn settings_path(data_dir: &Path) -> PathBuf {
    data_dir.join(SETTINGS_FILE)
}

/// Load the settings stored in `data_dir`.
///
/// A missing file gives the defaults. A file that cannot be read, parsed or
/// validated also gives the defaults, with a warning; it is left on disk
/// untouched until the next save.
pub fn load_settings(data_dir: &Path) -> Settings {
    let path = settings_path(data_dir);
    let data = match std::fs::read_to_string(&path) {
        Ok(data) => data,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "no settings file, using defaults");
            return Settings::default();
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "settings file unreadable, using defaults");
            return Settings::default();
        }
    };

    let settings: Settings = match serde_json::from_str(&data) {
        Ok(settings) => settings,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "settings file is not valid JSON, using defaults");
            return Settings::default();
        }
    };

    if let Err(e) = settings.validate() {
        warn!(path = %path.display(), error = %e, "stored settings out of range, using defaults");
        return Settings::default();
    }
    settings
}

/// Validate and write `settings` to `data_dir`.
pub fn save_settings(data_dir: &Path, settings: &Settings) -> Result<()> {
    settings.validate()?;
    std::fs::create_dir_all(data_dir)?;
    let path = settings_path(data_dir);
    let json = serde_json::to_string_pretty(settings)?;
    std::fs::write(&path, json)?;
    info!(path = %path.display(), "settings saved");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pasport_core::types::CropAspect;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(load_settings(dir.path()), Settings::default());
    }

    #[test]
    fn saved_settings_load_back() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings {
            default_crop_aspect: CropAspect::new(35.0, 45.0).unwrap(),
            export_dpi: 600,
            ..Settings::default()
        };
        save_settings(dir.path(), &settings).unwrap();

        let json = std::fs::read_to_string(settings_path(dir.path())).unwrap();
        assert!(json.contains("\"35:45\""));
        assert_eq!(load_settings(dir.path()), settings);
    }

    #[test]
    fn corrupt_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(settings_path(dir.path()), "{ not json").unwrap();
        assert_eq!(load_settings(dir.path()), Settings::default());
    }

    #[test]
    fn out_of_range_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(settings_path(dir.path()), r#"{"export_dpi": 0}"#).unwrap();
        assert_eq!(load_settings(dir.path()), Settings::default());
    }

    #[test]
    fn invalid_settings_are_not_saved() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings {
            export_dpi: 0,
            ..Settings::default()
        };
        assert!(save_settings(dir.path(), &settings).is_err());
        assert!(!settings_path(dir.path()).exists());
    }
}
