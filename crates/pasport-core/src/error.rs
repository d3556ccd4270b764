// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Pasport.

use thiserror::Error;

use crate::types::ImageId;

/// Top-level error type for all Pasport operations.
#[derive(Debug, Error)]
pub enum PasportError {
    // -- Rendering errors --
    #[error("invalid transform: {reason}")]
    InvalidTransform { reason: String },

    #[error("aspect mismatch: expected {expected:.4}, got {actual:.4}")]
    AspectMismatch { expected: f64, actual: f64 },

    #[error("source image {0} could not be resolved")]
    MissingSourceImage(ImageId),

    #[error("invalid crop aspect: {0}")]
    InvalidAspect(String),

    #[error("slot index {0} out of range (cards have 16 slots)")]
    SlotIndex(usize),

    #[error("page layout failed: {0}")]
    Layout(String),

    // -- Document errors --
    #[error("image processing failed: {0}")]
    ImageError(String),

    #[error("PDF operation failed: {0}")]
    PdfError(String),

    // -- Storage / persistence --
    #[error("database error: {0}")]
    Database(String),

    #[error("card not found: {0}")]
    CardNotFound(String),

    #[error("invalid settings: {0}")]
    InvalidSettings(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl PasportError {
    /// Shorthand for [`PasportError::InvalidTransform`].
    pub fn invalid_transform(reason: impl Into<String>) -> Self {
        Self::InvalidTransform {
            reason: reason.into(),
        }
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, PasportError>;
