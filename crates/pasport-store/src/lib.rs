// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// pasport-store — persistence for Pasport: the SQLite card database,
// content-addressed image storage, and the settings file.

pub mod data_dir;
pub mod integrity;
pub mod settings_file;
pub mod store;

pub use integrity::hash_bytes;
pub use store::{CardStore, CardSummary};
