// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Data directory resolution.

use std::path::{Path, PathBuf};

/// Name of the card database inside the data directory.
pub const DATABASE_FILE: &str = "pasport.db";

/// Return the application data directory, creating it if needed.
pub fn data_dir() -> PathBuf {
    let dir = base_dir().join("pasport");
    std::fs::create_dir_all(&dir).ok();
    dir
}

/// Where the card database lives inside `dir` unless the settings name
/// another file.
pub fn default_database_path(dir: &Path) -> PathBuf {
    dir.join(DATABASE_FILE)
}

fn base_dir() -> PathBuf {
    // Try XDG data dir, then fallback to home
    if let Ok(xdg) = std::env::var("XDG_DATA_HOME") {
        return PathBuf::from(xdg);
    }
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".local").join("share");
    }
    // Last resort
    std::env::temp_dir()
}
