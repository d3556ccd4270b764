// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Application configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{PasportError, Result};
use crate::types::{CropAspect, PaperSize};

/// Highest export resolution accepted. An A4 page at 1200 DPI is already
/// ~140 megapixels.
pub const MAX_EXPORT_DPI: u32 = 1200;

/// Persistent user settings.
///
/// Passed explicitly into every export; nothing reads a process-wide copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Crop aspect for slots without their own override. Also fixes the
    /// aspect of the grid frames.
    pub default_crop_aspect: CropAspect,
    /// Resolution of exported pages.
    pub export_dpi: u32,
    /// Paper the card is printed on (portrait).
    pub paper_size: PaperSize,
    /// Page geometry.
    pub layout: LayoutSettings,
    /// Card database location; `None` uses the data directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_path: Option<PathBuf>,
}

/// Fixed page geometry, in millimetres.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutSettings {
    /// Blank border around the whole page.
    pub margin_mm: f64,
    /// Spacing between neighbouring cells.
    pub gap_mm: f64,
    /// Band above the grid reserved for the card title.
    pub header_mm: f64,
    /// Strip under each photograph reserved for its caption.
    pub caption_mm: f64,
    /// Stroke a thin frame around each photograph.
    pub cell_borders: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_crop_aspect: CropAspect::PORTRAIT_2_3,
            export_dpi: 300,
            paper_size: PaperSize::A4,
            layout: LayoutSettings::default(),
            database_path: None,
        }
    }
}

impl Default for LayoutSettings {
    fn default() -> Self {
        Self {
            margin_mm: 5.0,
            gap_mm: 2.0,
            header_mm: 12.0,
            caption_mm: 4.0,
            cell_borders: false,
        }
    }
}

impl Settings {
    /// Check ranges before any rendering starts.
    pub fn validate(&self) -> Result<()> {
        if self.export_dpi == 0 || self.export_dpi > MAX_EXPORT_DPI {
            return Err(PasportError::InvalidSettings(format!(
                "export DPI must be between 1 and {MAX_EXPORT_DPI}, got {}",
                self.export_dpi
            )));
        }
        self.default_crop_aspect
            .validate()
            .map_err(|err| PasportError::InvalidSettings(err.to_string()))?;

        let (w, h) = self.paper_size.dimensions_mm();
        if !(w.is_finite() && h.is_finite()) || w <= 0.0 || h <= 0.0 {
            return Err(PasportError::InvalidSettings(format!(
                "paper size {w}x{h} mm is not usable"
            )));
        }
        if w > h {
            return Err(PasportError::InvalidSettings(format!(
                "paper size {w}x{h} mm is landscape; cards are laid out portrait"
            )));
        }
        self.layout.validate()
    }
}

impl LayoutSettings {
    pub fn validate(&self) -> Result<()> {
        let lengths = [
            ("margin", self.margin_mm),
            ("gap", self.gap_mm),
            ("header", self.header_mm),
            ("caption", self.caption_mm),
        ];
        for (name, value) in lengths {
            if !value.is_finite() || value < 0.0 {
                return Err(PasportError::InvalidSettings(format!(
                    "{name} must be a non-negative length, got {value}"
                )));
            }
        }
        Ok(())
    }
}
