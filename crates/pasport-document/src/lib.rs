// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// pasport-document — the rendering core of the Pasport card composer.
//
// Maps a slot's pan/zoom/rotation/crop onto a source photograph
// (`transform`), renders it into a fixed-aspect raster (`image::compositor`),
// arranges sixteen rasters on a portrait page (`layout`) and drives the whole
// card through to a print-ready page (`export`, `pdf`).

pub mod export;
pub mod image;
pub mod layout;
pub mod pdf;
pub mod transform;

// Re-export the primary items so callers can use `pasport_document::export_card` etc.
pub use export::{ExportOptions, ExportReport, ExportedPage, export_card, export_card_with};
pub use crate::image::compositor::{render, render_empty, render_preview};
pub use crate::image::source::{ImageLibrary, ImageSource, SourceImage};
pub use layout::{GridLayout, MmRect, Placement, compose_page};
pub use pdf::writer::PdfWriter;
pub use transform::SourceWindow;
