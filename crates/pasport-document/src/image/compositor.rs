// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Slot compositor — renders one photograph, framed by its transform, into an
// opaque RGB raster of the requested size. Sampling is bilinear through the
// rotated source window; anything outside the photo is white.

use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage, RgbaImage};
use pasport_core::error::{PasportError, Result};
use pasport_core::types::{CropAspect, Transform};
use tracing::{debug, instrument};

use crate::image::source::SourceImage;
use crate::transform::SourceWindow;

/// Fill for every pixel not covered by the photograph.
pub const WHITE: Rgb<u8> = Rgb([255, 255, 255]);

/// A target size may miss the exact crop aspect by this many pixels along
/// one axis (integer rounding), no more.
pub const ASPECT_TOLERANCE_PX: f64 = 1.0;

/// Above this many source pixels per output pixel the photo is reduced with
/// a triangle filter first, so bilinear sampling does not alias.
const PREFILTER_DENSITY: f64 = 2.0;

/// Render `source` framed by `transform` into a `width` x `height` raster.
///
/// `aspect` is the slot's effective crop aspect
/// (`transform.effective_aspect(settings.default_crop_aspect)`); the target
/// size must agree with it to within [`ASPECT_TOLERANCE_PX`], otherwise
/// `AspectMismatch` is returned before any pixel work.
///
/// The output is a pure function of the inputs: the same arguments always
/// produce byte-identical rasters.
#[instrument(
    skip(source, transform),
    fields(src_w = source.width(), src_h = source.height())
)]
pub fn render(
    source: &SourceImage,
    transform: &Transform,
    aspect: CropAspect,
    width: u32,
    height: u32,
) -> Result<RgbImage> {
    check_target(width, height, aspect)?;
    let window = SourceWindow::compute(transform, aspect, source.width(), source.height())?;

    let density = window.density(width);
    let reduced: RgbaImage;
    let (pixels, sampler) = if density > PREFILTER_DENSITY {
        let (src_w, src_h) = source.dimensions();
        let new_w = ((f64::from(src_w) / density).ceil() as u32).max(1);
        let new_h = ((f64::from(src_h) / density).ceil() as u32).max(1);
        debug!(density, new_w, new_h, "Reducing source before sampling");
        reduced = imageops::resize(source.as_rgba(), new_w, new_h, FilterType::Triangle);
        (
            &reduced,
            window.rescaled(
                f64::from(new_w) / f64::from(src_w),
                f64::from(new_h) / f64::from(src_h),
            ),
        )
    } else {
        (source.as_rgba(), window.rescaled(1.0, 1.0))
    };

    let (out_w, out_h) = (f64::from(width), f64::from(height));
    let raster = RgbImage::from_fn(width, height, |u, v| {
        // Sample at pixel centres.
        let nx = (f64::from(u) + 0.5) / out_w - 0.5;
        let ny = (f64::from(v) + 0.5) / out_h - 0.5;
        let (x, y) = sampler.map(nx, ny);
        sample_bilinear(pixels, x, y)
    });

    debug!(
        window_w = window.width,
        window_h = window.height,
        rotation = window.rotation,
        "Slot rendered"
    );
    Ok(raster)
}

/// A uniform white raster: what an empty slot looks like.
pub fn render_empty(width: u32, height: u32) -> RgbImage {
    RgbImage::from_pixel(width, height, WHITE)
}

/// Render at a reduced size for interactive feedback. The longer edge of
/// the result is `max_edge` pixels; the algorithm is the same as [`render`].
pub fn render_preview(
    source: &SourceImage,
    transform: &Transform,
    aspect: CropAspect,
    max_edge: u32,
) -> Result<RgbImage> {
    let (width, height) = fit_size(aspect, max_edge, max_edge);
    render(source, transform, aspect, width, height)
}

/// Largest raster of `aspect` that fits in `max_width` x `max_height`.
pub fn fit_size(aspect: CropAspect, max_width: u32, max_height: u32) -> (u32, u32) {
    let ratio = aspect.ratio();
    let width = max_width.max(1);
    let height = ((f64::from(width) / ratio).round() as u32).max(1);
    if height <= max_height {
        return (width, height);
    }
    let height = max_height.max(1);
    let width = ((f64::from(height) * ratio).round() as u32).clamp(1, max_width.max(1));
    (width, height)
}

/// Reject target sizes that are empty or do not have the crop aspect.
pub fn check_target(width: u32, height: u32, aspect: CropAspect) -> Result<()> {
    if width == 0 || height == 0 {
        return Err(PasportError::ImageError(format!(
            "target raster must be at least 1x1, got {width}x{height}"
        )));
    }
    let (w, h) = (f64::from(width), f64::from(height));
    let ratio = aspect.ratio();
    if (w - h * ratio).abs() <= ASPECT_TOLERANCE_PX || (h - w / ratio).abs() <= ASPECT_TOLERANCE_PX
    {
        Ok(())
    } else {
        Err(PasportError::AspectMismatch {
            expected: ratio,
            actual: w / h,
        })
    }
}

/// Bilinear sample at continuous source coordinates, flattened onto white.
///
/// Points outside `[0, w) x [0, h)` are white. Inside, neighbours past the
/// last row or column are clamped to the edge, so the photo never blends
/// with the fill.
fn sample_bilinear(pixels: &RgbaImage, x: f64, y: f64) -> Rgb<u8> {
    let (w, h) = pixels.dimensions();
    // Written so that NaN lands in the white branch.
    if !(x >= 0.0 && y >= 0.0 && x < f64::from(w) && y < f64::from(h)) {
        return WHITE;
    }

    let fx = (x - 0.5).max(0.0);
    let fy = (y - 0.5).max(0.0);
    let x0 = (fx.floor() as u32).min(w - 1);
    let y0 = (fy.floor() as u32).min(h - 1);
    let x1 = (x0 + 1).min(w - 1);
    let y1 = (y0 + 1).min(h - 1);
    let tx = (fx - f64::from(x0)).clamp(0.0, 1.0);
    let ty = (fy - f64::from(y0)).clamp(0.0, 1.0);

    let taps = [
        (pixels.get_pixel(x0, y0).0, (1.0 - tx) * (1.0 - ty)),
        (pixels.get_pixel(x1, y0).0, tx * (1.0 - ty)),
        (pixels.get_pixel(x0, y1).0, (1.0 - tx) * ty),
        (pixels.get_pixel(x1, y1).0, tx * ty),
    ];

    // Premultiplied accumulation, then composite over white.
    let mut rgb = [0.0f64; 3];
    let mut alpha = 0.0f64;
    for (px, weight) in taps {
        let a = f64::from(px[3]) / 255.0 * weight;
        alpha += a;
        for (acc, channel) in rgb.iter_mut().zip(px) {
            *acc += f64::from(channel) * a;
        }
    }
    let to_u8 = |value: f64| -> u8 {
        (value + 255.0 * (1.0 - alpha)).round().clamp(0.0, 255.0) as u8
    };
    Rgb([to_u8(rgb[0]), to_u8(rgb[1]), to_u8(rgb[2])])
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;
    use pasport_core::types::Offset;

    /// Smooth, opaque gradient: red follows x, green follows y.
    fn gradient(width: u32, height: u32) -> SourceImage {
        let img = RgbaImage::from_fn(width, height, |x, y| {
            Rgba([
                (x * 255 / width.max(1)) as u8,
                (y * 255 / height.max(1)) as u8,
                96,
                255,
            ])
        });
        SourceImage::from_rgba(img).unwrap()
    }

    /// Opaque pseudo-random texture (deterministic hash of the coordinates).
    fn texture(width: u32, height: u32) -> SourceImage {
        let img = RgbaImage::from_fn(width, height, |x, y| {
            let v = x.wrapping_mul(73_856_093) ^ y.wrapping_mul(19_349_663);
            Rgba([v as u8, (v >> 8) as u8, (v >> 16) as u8, 255])
        });
        SourceImage::from_rgba(img).unwrap()
    }

    fn square() -> CropAspect {
        CropAspect::new(1.0, 1.0).unwrap()
    }

    fn busy_transform() -> Transform {
        Transform {
            offset: Offset { x: 0.12, y: -0.07 },
            scale: 1.3,
            rotation: 17.0,
            crop_aspect: None,
        }
    }

    #[test]
    fn rendering_is_deterministic() {
        let source = texture(320, 240);
        let a = render(&source, &busy_transform(), CropAspect::PORTRAIT_2_3, 80, 120).unwrap();
        let b = render(&source, &busy_transform(), CropAspect::PORTRAIT_2_3, 80, 120).unwrap();
        assert_eq!(a.dimensions(), (80, 120));
        assert_eq!(a.as_raw(), b.as_raw());
    }

    #[test]
    fn default_transform_matches_centre_crop() {
        // At one source pixel per output pixel the default transform is a
        // plain centre crop of the cover region.
        let source = texture(200, 100);
        let rendered = render(&source, &Transform::default(), square(), 100, 100).unwrap();

        let expected = imageops::crop_imm(source.as_rgba(), 50, 0, 100, 100).to_image();
        for (out, src) in rendered.pixels().zip(expected.pixels()) {
            assert_eq!(out.0, [src.0[0], src.0[1], src.0[2]]);
        }
    }

    #[test]
    fn default_transform_shows_only_the_centre_band() {
        // Red | blue | green thirds; a square cover fit sees only blue.
        let img = RgbaImage::from_fn(300, 100, |x, _| match x {
            0..=99 => Rgba([255, 0, 0, 255]),
            100..=199 => Rgba([0, 0, 255, 255]),
            _ => Rgba([0, 255, 0, 255]),
        });
        let source = SourceImage::from_rgba(img).unwrap();
        let rendered = render(&source, &Transform::default(), square(), 40, 40).unwrap();
        assert!(rendered.pixels().all(|p| *p == Rgb([0, 0, 255])));
    }

    #[test]
    fn every_pixel_is_photo_or_exact_white() {
        let colour = Rgba([10, 200, 30, 255]);
        let source = SourceImage::from_rgba(RgbaImage::from_pixel(150, 90, colour)).unwrap();
        let t = Transform {
            offset: Offset { x: 0.3, y: -0.2 },
            scale: 0.4,
            rotation: 33.0,
            crop_aspect: None,
        };
        let rendered = render(&source, &t, CropAspect::PORTRAIT_2_3, 60, 90).unwrap();

        let mut saw_white = false;
        let mut saw_photo = false;
        for px in rendered.pixels() {
            if *px == WHITE {
                saw_white = true;
            } else {
                assert_eq!(*px, Rgb([10, 200, 30]));
                saw_photo = true;
            }
        }
        assert!(saw_white && saw_photo);
    }

    #[test]
    fn window_off_the_photo_is_all_white() {
        let source = texture(50, 50);
        let t = Transform {
            offset: Offset { x: 5.0, y: 5.0 },
            ..Transform::default()
        };
        let rendered = render(&source, &t, square(), 20, 20).unwrap();
        assert!(rendered.pixels().all(|p| *p == WHITE));
    }

    #[test]
    fn full_turn_renders_identically() {
        let source = texture(240, 320);
        let base = busy_transform();
        let turned = Transform {
            rotation: base.rotation + 360.0,
            ..base
        };
        let a = render(&source, &base, CropAspect::PORTRAIT_2_3, 40, 60).unwrap();
        let b = render(&source, &turned, CropAspect::PORTRAIT_2_3, 40, 60).unwrap();
        assert_eq!(a.as_raw(), b.as_raw());
    }

    #[test]
    fn framing_is_independent_of_resolution() {
        let source = gradient(400, 300);
        let t = Transform {
            offset: Offset { x: 0.1, y: 0.05 },
            scale: 1.2,
            rotation: 20.0,
            crop_aspect: None,
        };
        let small = render(&source, &t, CropAspect::PORTRAIT_2_3, 60, 90).unwrap();
        let large = render(&source, &t, CropAspect::PORTRAIT_2_3, 120, 180).unwrap();
        let reduced = imageops::resize(&large, 60, 90, FilterType::Triangle);

        let total: u64 = small
            .as_raw()
            .iter()
            .zip(reduced.as_raw())
            .map(|(a, b)| u64::from(a.abs_diff(*b)))
            .sum();
        let mean = total as f64 / small.as_raw().len() as f64;
        assert!(mean < 3.0, "mean channel difference {mean}");
    }

    #[test]
    fn heavy_downscale_does_not_alias() {
        // A one-pixel checkerboard must average to grey, not to noise.
        let img = RgbaImage::from_fn(1200, 1200, |x, y| {
            if (x + y) % 2 == 0 {
                Rgba([0, 0, 0, 255])
            } else {
                Rgba([255, 255, 255, 255])
            }
        });
        let source = SourceImage::from_rgba(img).unwrap();
        let rendered = render(&source, &Transform::default(), square(), 30, 30).unwrap();
        for px in rendered.pixels() {
            assert!((110..=145).contains(&px.0[0]), "aliased pixel {:?}", px);
        }
    }

    #[test]
    fn translucent_pixels_are_flattened_onto_white() {
        let clear = SourceImage::from_rgba(RgbaImage::from_pixel(10, 10, Rgba([0, 0, 0, 0])))
            .unwrap();
        let rendered = render(&clear, &Transform::default(), square(), 10, 10).unwrap();
        assert!(rendered.pixels().all(|p| *p == WHITE));

        let half = SourceImage::from_rgba(RgbaImage::from_pixel(10, 10, Rgba([0, 0, 0, 128])))
            .unwrap();
        let rendered = render(&half, &Transform::default(), square(), 10, 10).unwrap();
        assert!(rendered.pixels().all(|p| p.0[0] == 127));
    }

    #[test]
    fn mismatched_target_is_rejected_before_rendering() {
        let source = texture(10, 10);
        let err = render(&source, &Transform::default(), CropAspect::PORTRAIT_2_3, 100, 100)
            .unwrap_err();
        assert!(matches!(err, PasportError::AspectMismatch { .. }));

        let err = render(&source, &Transform::default(), square(), 0, 0).unwrap_err();
        assert!(matches!(err, PasportError::ImageError(_)));
    }

    #[test]
    fn invalid_transform_propagates() {
        let source = texture(10, 10);
        let t = Transform {
            scale: -2.0,
            ..Transform::default()
        };
        assert!(matches!(
            render(&source, &t, square(), 10, 10),
            Err(PasportError::InvalidTransform { .. })
        ));
    }

    #[test]
    fn rounding_within_one_pixel_is_accepted() {
        // 2:3 at 101 px wide is 151.5 px tall; either rounding is fine.
        assert!(check_target(101, 151, CropAspect::PORTRAIT_2_3).is_ok());
        assert!(check_target(101, 152, CropAspect::PORTRAIT_2_3).is_ok());
        assert!(check_target(101, 160, CropAspect::PORTRAIT_2_3).is_err());
    }

    #[test]
    fn empty_slot_is_white() {
        let raster = render_empty(30, 45);
        assert_eq!(raster.dimensions(), (30, 45));
        assert!(raster.pixels().all(|p| *p == WHITE));
    }

    #[test]
    fn preview_uses_the_longer_edge() {
        let source = gradient(64, 64);
        let preview =
            render_preview(&source, &Transform::default(), CropAspect::PORTRAIT_2_3, 90).unwrap();
        assert_eq!(preview.dimensions(), (60, 90));

        let landscape = CropAspect::new(16.0, 9.0).unwrap();
        let preview = render_preview(&source, &Transform::default(), landscape, 160).unwrap();
        assert_eq!(preview.dimensions(), (160, 90));
    }

    #[test]
    fn fit_size_respects_both_bounds() {
        assert_eq!(fit_size(CropAspect::PORTRAIT_2_3, 200, 200), (133, 200));
        assert_eq!(fit_size(CropAspect::PORTRAIT_2_3, 100, 400), (100, 150));
    }
}
