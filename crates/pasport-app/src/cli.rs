// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Command-line definitions.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use pasport_core::types::{CropAspect, EDITOR_MAX_SCALE, EDITOR_MIN_SCALE};

#[derive(Parser, Debug)]
#[command(name = "pasport", version, about = "Compose and print sixteen-photo passport cards")]
pub struct Cli {
    /// Card database to use instead of the configured one.
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create, list, rename and delete cards.
    #[command(subcommand)]
    Card(CardCommand),
    /// Assign photographs to slots and adjust their framing.
    #[command(subcommand)]
    Slot(SlotCommand),
    /// Render a card to a PDF or PNG page.
    Export(ExportArgs),
    /// Render one slot at preview size to a PNG.
    Preview(PreviewArgs),
    /// Show or change persistent settings.
    #[command(subcommand)]
    Settings(SettingsCommand),
    /// Copy the card database to a new file.
    Backup {
        /// Target file; must not exist.
        path: PathBuf,
    },
}

#[derive(Subcommand, Debug)]
pub enum CardCommand {
    /// List all cards.
    List,
    /// Show which slots of a card are filled.
    Show { name: String },
    /// Create an empty card.
    Add { name: String },
    /// Rename a card.
    Rename { old: String, new: String },
    /// Delete a card and its slots.
    Delete { name: String },
}

#[derive(Subcommand, Debug)]
pub enum SlotCommand {
    /// Put a photograph into a slot.
    Set(SlotSetArgs),
    /// Empty a slot.
    Clear { card: String, index: usize },
    /// Rotate a slot's photograph by a number of degrees.
    Rotate {
        card: String,
        index: usize,
        #[arg(allow_hyphen_values = true)]
        degrees: f64,
    },
    /// Zoom by mouse-wheel notches (negative zooms out).
    Zoom {
        card: String,
        index: usize,
        #[arg(allow_hyphen_values = true)]
        notches: f64,
    },
    /// Move the framing by a fraction of the slot size.
    Pan {
        card: String,
        index: usize,
        #[arg(allow_hyphen_values = true)]
        dx: f64,
        #[arg(allow_hyphen_values = true)]
        dy: f64,
    },
}

#[derive(Args, Debug)]
pub struct SlotSetArgs {
    pub card: String,
    /// Slot number, 0 to 15, row by row from the top left.
    pub index: usize,
    /// Photograph file (JPEG, PNG, ...).
    pub image: PathBuf,
    /// Zoom on the cover fit; 1 fills the slot exactly, at most 8.
    #[arg(long, default_value_t = 1.0, value_parser = parse_zoom)]
    pub zoom: f64,
    /// Rotation in degrees.
    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
    pub rotate: f64,
    /// Horizontal offset as a fraction of the slot width.
    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
    pub offset_x: f64,
    /// Vertical offset as a fraction of the slot height.
    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
    pub offset_y: f64,
    /// Crop aspect for this slot only, as W:H.
    #[arg(long)]
    pub aspect: Option<CropAspect>,
}

/// Zoom as the editor allows it; below 1 the photo would no longer cover the
/// slot.
fn parse_zoom(s: &str) -> Result<f64, String> {
    let zoom: f64 = s.parse().map_err(|_| format!("{s:?} is not a number"))?;
    if (EDITOR_MIN_SCALE..=EDITOR_MAX_SCALE).contains(&zoom) {
        Ok(zoom)
    } else {
        Err(format!(
            "zoom must be between {EDITOR_MIN_SCALE} and {EDITOR_MAX_SCALE}, got {zoom}"
        ))
    }
}

#[derive(Args, Debug)]
pub struct ExportArgs {
    pub card: String,
    /// Output file; the extension picks the format (.pdf or .png).
    #[arg(long)]
    pub out: PathBuf,
    /// Resolution for this export only.
    #[arg(long)]
    pub dpi: Option<u32>,
    /// Composite slots one after another instead of in parallel.
    #[arg(long, default_value_t = false)]
    pub sequential: bool,
    /// Override rayon worker threads (parallel mode only).
    #[arg(long)]
    pub threads: Option<usize>,
}

#[derive(Args, Debug)]
pub struct PreviewArgs {
    pub card: String,
    pub index: usize,
    #[arg(long)]
    pub out: PathBuf,
    /// Length of the longer edge in pixels.
    #[arg(long, default_value_t = 400)]
    pub max_edge: u32,
}

#[derive(Subcommand, Debug)]
pub enum SettingsCommand {
    /// Print the current settings as JSON.
    Show,
    /// Set the export resolution.
    SetDpi { dpi: u32 },
    /// Set the default crop aspect, as W:H.
    SetAspect { aspect: CropAspect },
    /// Turn cell borders on or off.
    SetBorders {
        #[arg(action = clap::ArgAction::Set)]
        enabled: bool,
    },
}
