// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable error messages for the command-line shell.
//
// Every technical error is mapped to a plain sentence with a concrete
// suggestion. Severity drives how the shell presents it.

use crate::error::PasportError;

/// Severity of an error from the user's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// The export went through but something was left out.
    Warning,
    /// The user must change an input (a setting, a slot, a file name).
    ActionRequired,
    /// Retrying will not help; the data itself is unusable.
    Permanent,
}

/// A human-readable error with plain message and actionable suggestion.
#[derive(Debug, Clone)]
pub struct HumanError {
    /// One-line summary.
    pub message: String,
    /// What the user should try next.
    pub suggestion: String,
    /// Severity level.
    pub severity: Severity,
}

impl HumanError {
    fn new(message: impl Into<String>, suggestion: impl Into<String>, severity: Severity) -> Self {
        Self {
            message: message.into(),
            suggestion: suggestion.into(),
            severity,
        }
    }
}

/// Convert a `PasportError` into a `HumanError`.
pub fn humanize_error(err: &PasportError) -> HumanError {
    match err {
        // -- Rendering --
        PasportError::InvalidTransform { reason } => HumanError::new(
            "A photo's framing settings are not usable.",
            format!("Reset the photo's zoom and rotation and try again. ({reason})"),
            Severity::ActionRequired,
        ),

        PasportError::AspectMismatch { expected, actual } => HumanError::new(
            "A photo is cropped to a different shape than the card grid.",
            format!(
                "Set the photo's crop aspect to match the card ({expected:.3} instead of {actual:.3}), or change the default aspect in settings."
            ),
            Severity::ActionRequired,
        ),

        PasportError::MissingSourceImage(id) => HumanError::new(
            "A photo could not be found in the database.",
            format!("The slot was printed blank. Assign the photo again. (image {id})"),
            Severity::Warning,
        ),

        PasportError::InvalidAspect(detail) => HumanError::new(
            "That crop aspect is not valid.",
            format!("Write it as two positive numbers, for example 2:3. ({detail})"),
            Severity::ActionRequired,
        ),

        PasportError::SlotIndex(index) => HumanError::new(
            format!("There is no slot number {index}."),
            "Slots are numbered 0 to 15, left to right and top to bottom.",
            Severity::ActionRequired,
        ),

        PasportError::Layout(detail) => HumanError::new(
            "The page layout does not fit on the paper.",
            format!("Reduce the margins, gaps or header size in settings. ({detail})"),
            Severity::ActionRequired,
        ),

        // -- Documents --
        PasportError::ImageError(_) => HumanError::new(
            "There's a problem with this image.",
            "The image may be damaged or in an unusual format. Try saving it as a JPEG or PNG first.",
            Severity::Permanent,
        ),

        PasportError::PdfError(_) => HumanError::new(
            "The PDF could not be created.",
            "Try exporting to PNG instead, or lower the export resolution.",
            Severity::Permanent,
        ),

        // -- Storage --
        PasportError::Database(_) => HumanError::new(
            "The card database had a problem.",
            "Check that the database file is not open in another program and that the disk is not full.",
            Severity::Permanent,
        ),

        PasportError::CardNotFound(name) => HumanError::new(
            format!("There is no card called {name:?}."),
            "List the cards to check the spelling, or create the card first.",
            Severity::ActionRequired,
        ),

        PasportError::InvalidSettings(detail) => HumanError::new(
            "A setting is out of range.",
            format!("Correct the setting and try again. ({detail})"),
            Severity::ActionRequired,
        ),

        PasportError::Io(io_err) => match io_err.kind() {
            std::io::ErrorKind::NotFound => HumanError::new(
                "The file couldn't be found.",
                "It may have been moved or deleted. Check the path and try again.",
                Severity::ActionRequired,
            ),
            std::io::ErrorKind::PermissionDenied => HumanError::new(
                "Pasport doesn't have permission to use that file.",
                "Check the file permissions, or choose a different location.",
                Severity::ActionRequired,
            ),
            _ => HumanError::new(
                "There was a problem reading or writing a file.",
                "Try again. If this keeps happening, the disk may be full.",
                Severity::Permanent,
            ),
        },

        PasportError::Serialization(_) => HumanError::new(
            "Stored data could not be read.",
            "The settings file or a stored photo setting is damaged. Delete the settings file to restore defaults.",
            Severity::Permanent,
        ),
    }
}
