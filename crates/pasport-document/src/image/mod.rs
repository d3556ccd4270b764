// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image module — decoded source photographs and the slot compositor.

pub mod compositor;
pub mod source;

pub use compositor::{render, render_empty, render_preview};
pub use source::{ImageLibrary, ImageSource, SourceImage};
