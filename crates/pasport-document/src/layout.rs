// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page layout — the fixed 4x4 grid of photo frames on a portrait page, and
// assembly of the slot rasters into one page raster.
//
// Physical geometry is in millimetres with the origin at the top-left corner
// of the page and y pointing down. Pixel placements are derived per DPI.

use image::{Rgb, RgbImage, imageops};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;
use pasport_core::config::{LayoutSettings, Settings};
use pasport_core::error::{PasportError, Result};
use pasport_core::types::{CropAspect, GRID_COLUMNS, GRID_ROWS, PaperSize, SLOT_COUNT, mm_to_px};
use tracing::{debug, instrument};

use crate::image::compositor::{WHITE, fit_size};

/// Stroke colour of the optional cell borders.
const BORDER: Rgb<u8> = Rgb([160, 160, 160]);

/// An axis-aligned rectangle in millimetres.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MmRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl MmRect {
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Largest rectangle of `aspect` centred inside `self`.
    fn inscribed(&self, aspect: CropAspect) -> Self {
        let ratio = aspect.ratio();
        let (width, height) = if self.width / self.height > ratio {
            (self.height * ratio, self.height)
        } else {
            (self.width, self.width / ratio)
        };
        Self {
            x: self.x + (self.width - width) / 2.0,
            y: self.y + (self.height - height) / 2.0,
            width,
            height,
        }
    }

    fn overlaps(&self, other: &MmRect) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }
}

/// Where one slot's raster goes on the page raster, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// The page geometry of a card: a title band and a 4x4 grid of cells, each
/// holding a photo frame above a caption strip.
///
/// Slots are laid out row-major: slot 0 top-left, 3 top-right, 15
/// bottom-right.
#[derive(Debug, Clone, PartialEq)]
pub struct GridLayout {
    paper: PaperSize,
    aspect: CropAspect,
    cell_borders: bool,
    header: MmRect,
    cells: [MmRect; SLOT_COUNT],
    frames: [MmRect; SLOT_COUNT],
    captions: [MmRect; SLOT_COUNT],
}

impl GridLayout {
    /// Layout for the paper, geometry and grid aspect in `settings`.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Self::new(
            settings.paper_size,
            &settings.layout,
            settings.default_crop_aspect,
        )
    }

    /// Divide the page into the title band and the 16 cells.
    ///
    /// Fails with `Layout` if the margins, gaps, header and captions leave no
    /// room for the photographs.
    pub fn new(paper: PaperSize, geometry: &LayoutSettings, aspect: CropAspect) -> Result<Self> {
        geometry.validate()?;
        aspect
            .validate()
            .map_err(|err| PasportError::Layout(err.to_string()))?;

        let (page_w, page_h) = paper.dimensions_mm();
        let margin = geometry.margin_mm;
        let gap = geometry.gap_mm;

        let content_w = page_w - 2.0 * margin;
        let content_h = page_h - 2.0 * margin - geometry.header_mm;
        let cell_w = (content_w - gap * (GRID_COLUMNS - 1) as f64) / GRID_COLUMNS as f64;
        let cell_h = (content_h - gap * (GRID_ROWS - 1) as f64) / GRID_ROWS as f64;
        let photo_h = cell_h - geometry.caption_mm;

        if !(cell_w > 0.0 && photo_h > 0.0) {
            return Err(PasportError::Layout(format!(
                "no room for photographs on a {page_w}x{page_h} mm page \
                 (cell {cell_w:.2}x{cell_h:.2} mm, caption {} mm)",
                geometry.caption_mm
            )));
        }

        let header = MmRect {
            x: margin,
            y: margin,
            width: content_w,
            height: geometry.header_mm,
        };

        let empty = MmRect {
            x: 0.0,
            y: 0.0,
            width: 0.0,
            height: 0.0,
        };
        let mut cells = [empty; SLOT_COUNT];
        let mut frames = [empty; SLOT_COUNT];
        let mut captions = [empty; SLOT_COUNT];

        for index in 0..SLOT_COUNT {
            let row = index / GRID_COLUMNS;
            let col = index % GRID_COLUMNS;
            let cell = MmRect {
                x: margin + col as f64 * (cell_w + gap),
                y: header.bottom() + row as f64 * (cell_h + gap),
                width: cell_w,
                height: cell_h,
            };
            let photo_area = MmRect {
                height: photo_h,
                ..cell
            };
            cells[index] = cell;
            frames[index] = photo_area.inscribed(aspect);
            captions[index] = MmRect {
                y: photo_area.bottom(),
                height: geometry.caption_mm,
                ..cell
            };
        }

        debug!(
            paper = ?paper,
            %aspect,
            cell_w,
            cell_h,
            frame_w = frames[0].width,
            frame_h = frames[0].height,
            "Grid layout computed"
        );

        Ok(Self {
            paper,
            aspect,
            cell_borders: geometry.cell_borders,
            header,
            cells,
            frames,
            captions,
        })
    }

    pub fn paper(&self) -> PaperSize {
        self.paper
    }

    /// Aspect shared by every frame.
    pub fn aspect(&self) -> CropAspect {
        self.aspect
    }

    pub fn cell_borders(&self) -> bool {
        self.cell_borders
    }

    /// Band above the grid reserved for the card title.
    pub fn header(&self) -> MmRect {
        self.header
    }

    pub fn cells(&self) -> &[MmRect; SLOT_COUNT] {
        &self.cells
    }

    /// Photo frames, indexed by slot.
    pub fn frames(&self) -> &[MmRect; SLOT_COUNT] {
        &self.frames
    }

    /// Caption strips under each frame, indexed by slot.
    pub fn captions(&self) -> &[MmRect; SLOT_COUNT] {
        &self.captions
    }

    /// Page raster size at `dpi`.
    pub fn page_size_px(&self, dpi: u32) -> (u32, u32) {
        let (w, h) = self.paper.dimensions_mm();
        (
            mm_to_px(w, dpi).round() as u32,
            mm_to_px(h, dpi).round() as u32,
        )
    }

    /// Pixel placement of every frame at `dpi`.
    ///
    /// Each placement is the largest raster of the grid aspect whose pixels
    /// lie wholly inside the physical frame, centred on it.
    pub fn placements(&self, dpi: u32) -> Result<[Placement; SLOT_COUNT]> {
        let mut placements = [Placement {
            x: 0,
            y: 0,
            width: 0,
            height: 0,
        }; SLOT_COUNT];

        for (index, frame) in self.frames.iter().enumerate() {
            let x0 = mm_to_px(frame.x, dpi).ceil();
            let y0 = mm_to_px(frame.y, dpi).ceil();
            let avail_w = mm_to_px(frame.right(), dpi).floor() - x0;
            let avail_h = mm_to_px(frame.bottom(), dpi).floor() - y0;
            if avail_w < 1.0 || avail_h < 1.0 {
                return Err(PasportError::Layout(format!(
                    "frame {index} is smaller than one pixel at {dpi} DPI"
                )));
            }
            let (avail_w, avail_h) = (avail_w as u32, avail_h as u32);
            let (width, height) = fit_size(self.aspect, avail_w, avail_h);
            placements[index] = Placement {
                x: x0 as u32 + (avail_w - width) / 2,
                y: y0 as u32 + (avail_h - height) / 2,
                width,
                height,
            };
        }
        Ok(placements)
    }
}

/// Assemble 16 slot rasters, in slot order, into one white page raster.
///
/// Rasters are placed, never scaled: each is centred on its frame's
/// placement. A raster larger than its placement, or a count other than 16,
/// is a `Layout` error.
#[instrument(skip(rasters, layout), fields(count = rasters.len()))]
pub fn compose_page(rasters: &[RgbImage], layout: &GridLayout, dpi: u32) -> Result<RgbImage> {
    if rasters.len() != SLOT_COUNT {
        return Err(PasportError::Layout(format!(
            "a page takes exactly {SLOT_COUNT} slot rasters, got {}",
            rasters.len()
        )));
    }

    let placements = layout.placements(dpi)?;
    let (page_w, page_h) = layout.page_size_px(dpi);
    let mut page = RgbImage::from_pixel(page_w, page_h, WHITE);

    for (index, (raster, place)) in rasters.iter().zip(placements.iter()).enumerate() {
        let (w, h) = raster.dimensions();
        if w > place.width || h > place.height {
            return Err(PasportError::Layout(format!(
                "slot {index} raster is {w}x{h}, its frame holds {}x{}",
                place.width, place.height
            )));
        }
        let x = place.x + (place.width - w) / 2;
        let y = place.y + (place.height - h) / 2;
        imageops::replace(&mut page, raster, i64::from(x), i64::from(y));

        if layout.cell_borders() {
            // One pixel outside the frame so no photo pixel is covered.
            let rect = Rect::at(place.x as i32 - 1, place.y as i32 - 1)
                .of_size(place.width + 2, place.height + 2);
            draw_hollow_rect_mut(&mut page, rect, BORDER);
        }
    }

    debug!(page_w, page_h, "Page composed");
    Ok(page)
}
