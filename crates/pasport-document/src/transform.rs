// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Transform model — turns a slot's pan/zoom/rotation/crop into the rotated
// window of the source photograph that will be sampled. Pure geometry, no
// pixels.
//
// Coordinates are source pixels with the origin at the top-left corner of
// the image and y pointing down; pixel (i, j) covers [i, i+1) x [j, j+1).

use pasport_core::error::{PasportError, Result};
use pasport_core::types::{CropAspect, Transform};

/// The region of a source photograph that fills one slot.
///
/// A rectangle of the slot's crop aspect, centred at `center_*`, rotated by
/// `rotation` degrees about its own centre. Positive rotation turns the
/// window clockwise over the photo, so the photo appears turned
/// counter-clockwise in the slot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SourceWindow {
    pub center_x: f64,
    pub center_y: f64,
    pub width: f64,
    pub height: f64,
    /// Rotation in degrees, wrapped into `[0, 360)`.
    pub rotation: f64,
    sin: f64,
    cos: f64,
}

impl SourceWindow {
    /// Compute the window for `transform` over a `source_width` x
    /// `source_height` photograph.
    ///
    /// 1. The cover size is the largest window of `aspect`, at the transform's
    ///    rotation, that fits inside the photo when centred on it.
    /// 2. `scale` divides that size.
    /// 3. `offset` moves the centre along the window's own axes, in units of
    ///    the window size.
    ///
    /// The result may extend past the photo; the compositor paints that area
    /// white.
    pub fn compute(
        transform: &Transform,
        aspect: CropAspect,
        source_width: u32,
        source_height: u32,
    ) -> Result<Self> {
        transform.validate()?;
        aspect
            .validate()
            .map_err(|err| PasportError::invalid_transform(err.to_string()))?;
        if source_width == 0 || source_height == 0 {
            return Err(PasportError::ImageError(format!(
                "source image has no pixels ({source_width}x{source_height})"
            )));
        }

        let rotation = transform.normalized_rotation();
        let (sin, cos) = sin_cos_degrees(rotation);
        let (w, h) = (f64::from(source_width), f64::from(source_height));

        let (cover_w, cover_h) = cover_size(aspect.ratio(), w, h, sin, cos);
        let width = cover_w / transform.scale;
        let height = cover_h / transform.scale;

        let dx = transform.offset.x * width;
        let dy = transform.offset.y * height;

        Ok(Self {
            center_x: w / 2.0 + cos * dx - sin * dy,
            center_y: h / 2.0 + sin * dx + cos * dy,
            width,
            height,
            rotation,
            sin,
            cos,
        })
    }

    /// Map a point of the slot, in normalised coordinates centred on the
    /// slot (`-0.5..=0.5` on both axes), to source pixel coordinates.
    pub fn map(&self, nx: f64, ny: f64) -> (f64, f64) {
        let lx = nx * self.width;
        let ly = ny * self.height;
        (
            self.center_x + self.cos * lx - self.sin * ly,
            self.center_y + self.sin * lx + self.cos * ly,
        )
    }

    /// Window corners in source coordinates: top-left, top-right,
    /// bottom-right, bottom-left (as seen in the slot).
    pub fn corners(&self) -> [(f64, f64); 4] {
        [
            self.map(-0.5, -0.5),
            self.map(0.5, -0.5),
            self.map(0.5, 0.5),
            self.map(-0.5, 0.5),
        ]
    }

    /// Whether the window lies entirely on the photo, i.e. the slot will
    /// contain no white fill. Editors use this to flag framing that shows
    /// white edges.
    pub fn lies_within(&self, source_width: u32, source_height: u32) -> bool {
        const EPS: f64 = 1e-6;
        let (w, h) = (f64::from(source_width), f64::from(source_height));
        self.corners()
            .iter()
            .all(|&(x, y)| x >= -EPS && y >= -EPS && x <= w + EPS && y <= h + EPS)
    }

    /// Source pixels covered by one output pixel when rendered `output_width`
    /// pixels wide.
    pub fn density(&self, output_width: u32) -> f64 {
        self.width / f64::from(output_width.max(1))
    }

    /// The same window expressed over a copy of the source resampled by
    /// `sx` horizontally and `sy` vertically.
    pub(crate) fn rescaled(&self, sx: f64, sy: f64) -> ScaledWindow {
        ScaledWindow {
            window: *self,
            sx,
            sy,
        }
    }
}

/// A [`SourceWindow`] mapped onto a resampled copy of its source.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ScaledWindow {
    window: SourceWindow,
    sx: f64,
    sy: f64,
}

impl ScaledWindow {
    pub(crate) fn map(&self, nx: f64, ny: f64) -> (f64, f64) {
        let (x, y) = self.window.map(nx, ny);
        (x * self.sx, y * self.sy)
    }
}

/// Largest `ratio`-shaped rectangle which, rotated by the angle with the
/// given sine/cosine, fits in a `w` x `h` box when both share a centre.
fn cover_size(ratio: f64, w: f64, h: f64, sin: f64, cos: f64) -> (f64, f64) {
    let (s, c) = (sin.abs(), cos.abs());
    // The rotated window's bounding box is
    //   width*c + height*s  by  width*s + height*c,  with height = width/ratio.
    let width = (w / (c + s / ratio)).min(h / (s + c / ratio));
    (width, width / ratio)
}

/// Sine and cosine of an angle in `[0, 360)` degrees, exact at the quarter
/// turns.
fn sin_cos_degrees(degrees: f64) -> (f64, f64) {
    if degrees == 0.0 {
        (0.0, 1.0)
    } else if degrees == 90.0 {
        (1.0, 0.0)
    } else if degrees == 180.0 {
        (0.0, -1.0)
    } else if degrees == 270.0 {
        (-1.0, 0.0)
    } else {
        degrees.to_radians().sin_cos()
    }
}
