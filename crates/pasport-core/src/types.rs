// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Pasport card composer.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{PasportError, Result};

/// Number of photograph slots on every card.
pub const SLOT_COUNT: usize = 16;

/// Columns of the card grid.
pub const GRID_COLUMNS: usize = 4;

/// Rows of the card grid.
pub const GRID_ROWS: usize = 4;

/// Captions printed under each slot, in slot order (row-major).
pub const SLOT_LABELS: [&str; SLOT_COUNT] = [
    "skříň",
    "šatna",
    "stolek",
    "okno obývák",
    "tv",
    "světla obývák",
    "postel 1",
    "postel 2",
    "postel 3",
    "okno koupelna",
    "wc",
    "umyvadlo",
    "sprcha",
    "koupelna světla",
    "dveře vchod",
    "dveře koupelna",
];

/// Relative tolerance when two crop aspects are compared.
pub const ASPECT_TOLERANCE: f64 = 1e-3;

/// Zoom bounds enforced by the interactive editing helpers. Rendering itself
/// accepts any positive scale.
pub const EDITOR_MIN_SCALE: f64 = 1.0;
pub const EDITOR_MAX_SCALE: f64 = 8.0;

/// Zoom factor applied per mouse-wheel notch.
pub const WHEEL_ZOOM_STEP: f64 = 1.1;

/// Stable identifier for a stored source image (SHA-256 of its bytes).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageId(pub String);

impl ImageId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ImageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Full digests are unwieldy in logs; twelve hex digits are plenty.
        let short = self.0.get(..12).unwrap_or(&self.0);
        write!(f, "{short}")
    }
}

/// Database identifier of a card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CardId(pub i64);

impl fmt::Display for CardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// -- Crop aspect --------------------------------------------------------------

/// Width:height ratio of a rendered slot, e.g. `2:3` for portrait photos.
///
/// Serialised as the `"W:H"` string used in the settings file.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CropAspect {
    width: f64,
    height: f64,
}

impl CropAspect {
    /// Portrait 2:3, the default for passport cards.
    pub const PORTRAIT_2_3: Self = Self {
        width: 2.0,
        height: 3.0,
    };

    /// Create an aspect from its two terms. Both must be finite and positive.
    pub fn new(width: f64, height: f64) -> Result<Self> {
        if !(width.is_finite() && height.is_finite()) || width <= 0.0 || height <= 0.0 {
            return Err(PasportError::InvalidAspect(format!(
                "{width}:{height} (both terms must be positive)"
            )));
        }
        Ok(Self { width, height })
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    /// The ratio width / height.
    pub fn ratio(&self) -> f64 {
        self.width / self.height
    }

    /// Whether two aspects agree within [`ASPECT_TOLERANCE`].
    pub fn approx_eq(&self, other: &CropAspect) -> bool {
        let (a, b) = (self.ratio(), other.ratio());
        (a - b).abs() <= ASPECT_TOLERANCE * b
    }

    /// Re-check the invariant on a value whose fields came from elsewhere.
    pub fn validate(&self) -> Result<()> {
        Self::new(self.width, self.height).map(|_| ())
    }
}

impl Default for CropAspect {
    fn default() -> Self {
        Self::PORTRAIT_2_3
    }
}

impl fmt::Display for CropAspect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.width, self.height)
    }
}

impl FromStr for CropAspect {
    type Err = PasportError;

    fn from_str(s: &str) -> Result<Self> {
        let (w, h) = s
            .split_once(':')
            .ok_or_else(|| PasportError::InvalidAspect(format!("{s:?} is not in W:H form")))?;
        let parse = |term: &str| {
            term.trim()
                .parse::<f64>()
                .map_err(|_| PasportError::InvalidAspect(format!("{s:?} has a non-numeric term")))
        };
        Self::new(parse(w)?, parse(h)?)
    }
}

impl TryFrom<String> for CropAspect {
    type Error = PasportError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<CropAspect> for String {
    fn from(value: CropAspect) -> Self {
        value.to_string()
    }
}

// -- Transform ----------------------------------------------------------------

/// Pan in normalised slot space: `1.0` moves the sampling window by one full
/// slot width (x) or height (y).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Offset {
    pub x: f64,
    pub y: f64,
}

/// How a source photograph is framed inside its slot.
///
/// The all-default transform is the centred cover fit. Fields are stored
/// exactly as the editor produced them; only [`Transform::normalized`] wraps
/// the rotation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Transform {
    pub offset: Offset,
    /// Zoom multiplier on the cover fit (1.0 = cover).
    pub scale: f64,
    /// Rotation of the sampling window in degrees, any real value.
    pub rotation: f64,
    /// Slot-level override of the default crop aspect.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crop_aspect: Option<CropAspect>,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            offset: Offset::default(),
            scale: 1.0,
            rotation: 0.0,
            crop_aspect: None,
        }
    }
}

impl Transform {
    /// Reject structurally invalid transforms. Nothing is corrected.
    pub fn validate(&self) -> Result<()> {
        if !self.scale.is_finite() || self.scale <= 0.0 {
            return Err(PasportError::invalid_transform(format!(
                "scale must be positive, got {}",
                self.scale
            )));
        }
        if !self.rotation.is_finite() {
            return Err(PasportError::invalid_transform("rotation is not finite"));
        }
        if !(self.offset.x.is_finite() && self.offset.y.is_finite()) {
            return Err(PasportError::invalid_transform("offset is not finite"));
        }
        if let Some(aspect) = &self.crop_aspect {
            aspect.validate().map_err(|err| {
                PasportError::invalid_transform(format!("crop aspect: {err}"))
            })?;
        }
        Ok(())
    }

    /// The crop aspect this transform renders at.
    pub fn effective_aspect(&self, default: CropAspect) -> CropAspect {
        self.crop_aspect.unwrap_or(default)
    }

    /// Rotation wrapped into `[0, 360)`.
    pub fn normalized_rotation(&self) -> f64 {
        normalize_degrees(self.rotation)
    }

    /// Copy with the rotation wrapped into `[0, 360)`; what commit stores.
    pub fn normalized(&self) -> Self {
        Self {
            rotation: self.normalized_rotation(),
            ..*self
        }
    }

    /// Rotate by `degrees` (the editor's ±90° and ±5° buttons).
    pub fn rotated_by(&self, degrees: f64) -> Self {
        Self {
            rotation: normalize_degrees(self.rotation + degrees),
            ..*self
        }
    }

    /// Multiply the zoom by `factor`, kept within the editor bounds.
    pub fn zoomed_by(&self, factor: f64) -> Self {
        Self {
            scale: (self.scale * factor).clamp(EDITOR_MIN_SCALE, EDITOR_MAX_SCALE),
            ..*self
        }
    }

    /// Zoom for `notches` mouse-wheel steps (negative zooms out).
    pub fn wheel_zoomed(&self, notches: f64) -> Self {
        self.zoomed_by(WHEEL_ZOOM_STEP.powf(notches))
    }

    /// Pan by a delta in normalised slot space.
    pub fn panned_by(&self, dx: f64, dy: f64) -> Self {
        Self {
            offset: Offset {
                x: self.offset.x + dx,
                y: self.offset.y + dy,
            },
            ..*self
        }
    }

    pub fn with_crop_aspect(self, aspect: CropAspect) -> Self {
        Self {
            crop_aspect: Some(aspect),
            ..self
        }
    }
}

/// Wrap an angle into `[0, 360)`.
pub fn normalize_degrees(degrees: f64) -> f64 {
    let wrapped = degrees.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negative inputs.
    if wrapped >= 360.0 { 0.0 } else { wrapped }
}

// -- Slots and cards ----------------------------------------------------------

/// A photograph assigned to a slot together with its framing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotContent {
    pub image: ImageId,
    pub transform: Transform,
}

/// One of the sixteen fixed positions on a card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Slot {
    pub index: usize,
    pub content: Option<SlotContent>,
}

impl Slot {
    pub fn empty(index: usize) -> Self {
        Self {
            index,
            content: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_none()
    }

    /// Caption from the card template.
    pub fn label(&self) -> &'static str {
        SLOT_LABELS.get(self.index).copied().unwrap_or("")
    }

    /// Grid position as `(row, column)`, row-major from the top-left.
    pub fn grid_position(&self) -> (usize, usize) {
        (self.index / GRID_COLUMNS, self.index % GRID_COLUMNS)
    }
}

/// A passport card: a name and exactly [`SLOT_COUNT`] slots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Card {
    pub id: CardId,
    pub name: String,
    pub slots: [Slot; SLOT_COUNT],
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Card {
    /// A card with every slot empty.
    pub fn new(id: CardId, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            name: name.into(),
            slots: std::array::from_fn(Slot::empty),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn slot(&self, index: usize) -> Result<&Slot> {
        self.slots.get(index).ok_or(PasportError::SlotIndex(index))
    }

    fn slot_mut(&mut self, index: usize) -> Result<&mut Slot> {
        self.slots.get_mut(index).ok_or(PasportError::SlotIndex(index))
    }

    /// Put a photograph into a slot, replacing whatever was there.
    pub fn assign(&mut self, index: usize, image: ImageId, transform: Transform) -> Result<()> {
        transform.validate()?;
        self.slot_mut(index)?.content = Some(SlotContent { image, transform });
        Ok(())
    }

    pub fn clear(&mut self, index: usize) -> Result<()> {
        self.slot_mut(index)?.content = None;
        Ok(())
    }

    /// Validate and store a normalised transform for an occupied slot.
    ///
    /// This is the only write the rendering core performs on a card. Returns
    /// the transform as stored.
    pub fn commit_transform(&mut self, index: usize, transform: Transform) -> Result<Transform> {
        transform.validate()?;
        let slot = self.slot_mut(index)?;
        let content = slot.content.as_mut().ok_or_else(|| {
            PasportError::invalid_transform(format!("slot {index} has no photograph"))
        })?;
        content.transform = transform.normalized();
        Ok(content.transform)
    }

    /// Occupied slots in index order.
    pub fn filled_slots(&self) -> impl Iterator<Item = (usize, &SlotContent)> {
        self.slots
            .iter()
            .filter_map(|slot| slot.content.as_ref().map(|c| (slot.index, c)))
    }

    /// True when no slot holds a photograph.
    pub fn is_blank(&self) -> bool {
        self.slots.iter().all(Slot::is_empty)
    }
}

// -- Paper --------------------------------------------------------------------

/// Supported paper sizes, always used in portrait orientation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PaperSize {
    A4,
    A5,
    Letter,
    Custom { width_mm: f64, height_mm: f64 },
}

impl PaperSize {
    /// Dimensions in millimetres (width, height), portrait.
    pub fn dimensions_mm(&self) -> (f64, f64) {
        match self {
            Self::A4 => (210.0, 297.0),
            Self::A5 => (148.0, 210.0),
            Self::Letter => (215.9, 279.4),
            Self::Custom {
                width_mm,
                height_mm,
            } => (*width_mm, *height_mm),
        }
    }

    /// Dimensions in PDF points (1/72 inch).
    pub fn dimensions_pt(&self) -> (f64, f64) {
        let (w, h) = self.dimensions_mm();
        (mm_to_pt(w), mm_to_pt(h))
    }
}

pub const MM_PER_INCH: f64 = 25.4;

pub fn mm_to_pt(mm: f64) -> f64 {
    mm / MM_PER_INCH * 72.0
}

/// Convert a physical length to device pixels at `dpi`.
pub fn mm_to_px(mm: f64, dpi: u32) -> f64 {
    mm / MM_PER_INCH * f64::from(dpi)
}
