// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Export pipeline — renders every slot of a card at the export DPI and
// assembles the page. Card and settings are only read.

use std::io::Cursor;
use std::path::Path;

use image::{ImageFormat, RgbImage};
use pasport_core::config::Settings;
use pasport_core::error::{PasportError, Result};
use pasport_core::types::{Card, CropAspect, ImageId, PaperSize, SLOT_COUNT, SLOT_LABELS, Slot};
use rayon::prelude::*;
use tracing::{debug, info, instrument, warn};

use crate::image::compositor::{render, render_empty};
use crate::image::source::ImageSource;
use crate::layout::{GridLayout, Placement, compose_page};
use crate::pdf::writer::PdfWriter;

/// Knobs that change how an export runs, never what it produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportOptions {
    /// Composite slots on a rayon pool instead of one after another.
    pub parallel: bool,
    /// Worker count for the pool; `None` uses rayon's global pool.
    pub threads: Option<usize>,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            parallel: true,
            threads: None,
        }
    }
}

impl ExportOptions {
    pub fn sequential() -> Self {
        Self {
            parallel: false,
            threads: None,
        }
    }
}

/// What happened to each slot during an export.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportReport {
    /// Slots rendered from their photograph.
    pub rendered: Vec<usize>,
    /// Slots with nothing assigned.
    pub empty: Vec<usize>,
    /// Slots whose image could not be resolved; printed blank.
    pub missing: Vec<(usize, ImageId)>,
}

impl ExportReport {
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }
}

/// One rendered card page.
#[derive(Debug, Clone)]
pub struct ExportedPage {
    /// The full page, sized to the paper at `dpi`.
    pub raster: RgbImage,
    pub dpi: u32,
    /// Card name, printed in the PDF header band.
    pub title: String,
    pub layout: GridLayout,
    pub report: ExportReport,
}

enum SlotOutcome {
    Rendered,
    Empty,
    Missing(ImageId),
}

/// Export `card` with the default options.
pub fn export_card<S>(card: &Card, images: &S, settings: &Settings) -> Result<ExportedPage>
where
    S: ImageSource + Sync + ?Sized,
{
    export_card_with(card, images, settings, ExportOptions::default())
}

/// Render all 16 slots of `card` at `settings.export_dpi` and assemble them
/// into one page.
///
/// Every slot's transform and crop aspect is checked before any pixel work;
/// a slot whose aspect disagrees with the grid fails the export with
/// `AspectMismatch`. Unresolvable images do not fail the export: the slot is
/// printed blank and listed in the report.
#[instrument(skip(card, images, settings), fields(card = %card.name, dpi = settings.export_dpi))]
pub fn export_card_with<S>(
    card: &Card,
    images: &S,
    settings: &Settings,
    options: ExportOptions,
) -> Result<ExportedPage>
where
    S: ImageSource + Sync + ?Sized,
{
    settings.validate()?;
    let grid_aspect = settings.default_crop_aspect;
    for (position, slot) in card.slots.iter().enumerate() {
        check_slot(position, slot, grid_aspect)?;
    }

    let dpi = settings.export_dpi;
    let layout = GridLayout::from_settings(settings)?;
    let placements = layout.placements(dpi)?;

    let job = |slot: &Slot| -> Result<(RgbImage, SlotOutcome)> {
        render_slot(slot, &placements[slot.index], images, grid_aspect)
    };

    let results: Vec<Result<(RgbImage, SlotOutcome)>> = if options.parallel {
        let run = || card.slots.par_iter().map(job).collect::<Vec<_>>();
        match options.threads {
            Some(threads) => build_thread_pool(threads)?.install(run),
            None => run(),
        }
    } else {
        card.slots.iter().map(job).collect()
    };

    let mut rasters = Vec::with_capacity(SLOT_COUNT);
    let mut report = ExportReport::default();
    for (index, result) in results.into_iter().enumerate() {
        let (raster, outcome) = result?;
        match outcome {
            SlotOutcome::Rendered => report.rendered.push(index),
            SlotOutcome::Empty => report.empty.push(index),
            SlotOutcome::Missing(id) => report.missing.push((index, id)),
        }
        rasters.push(raster);
    }

    let raster = compose_page(&rasters, &layout, dpi)?;
    info!(
        width = raster.width(),
        height = raster.height(),
        rendered = report.rendered.len(),
        missing = report.missing.len(),
        "Card exported"
    );

    Ok(ExportedPage {
        raster,
        dpi,
        title: card.name.clone(),
        layout,
        report,
    })
}

/// Validate one slot against the grid before rendering starts. A slot must
/// sit at the array position its index names, or it would land in the wrong
/// grid cell.
fn check_slot(position: usize, slot: &Slot, grid_aspect: CropAspect) -> Result<()> {
    if slot.index != position {
        return Err(PasportError::SlotIndex(slot.index));
    }
    let Some(content) = &slot.content else {
        return Ok(());
    };
    content.transform.validate()?;
    let aspect = content.transform.effective_aspect(grid_aspect);
    if !aspect.approx_eq(&grid_aspect) {
        return Err(PasportError::AspectMismatch {
            expected: grid_aspect.ratio(),
            actual: aspect.ratio(),
        });
    }
    Ok(())
}

fn render_slot<S>(
    slot: &Slot,
    place: &Placement,
    images: &S,
    grid_aspect: CropAspect,
) -> Result<(RgbImage, SlotOutcome)>
where
    S: ImageSource + Sync + ?Sized,
{
    let Some(content) = &slot.content else {
        return Ok((render_empty(place.width, place.height), SlotOutcome::Empty));
    };
    match images.source_image(&content.image) {
        Some(source) => {
            let aspect = content.transform.effective_aspect(grid_aspect);
            let raster = render(source, &content.transform, aspect, place.width, place.height)?;
            debug!(slot = slot.index, "Slot composited");
            Ok((raster, SlotOutcome::Rendered))
        }
        None => {
            warn!(
                slot = slot.index,
                image = %content.image,
                "Source image missing, slot printed blank"
            );
            Ok((
                render_empty(place.width, place.height),
                SlotOutcome::Missing(content.image.clone()),
            ))
        }
    }
}

fn build_thread_pool(threads: usize) -> Result<rayon::ThreadPool> {
    if threads == 0 {
        return Err(PasportError::InvalidSettings(
            "export thread count must be at least 1".into(),
        ));
    }
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()
        .map_err(|e| PasportError::ImageError(format!("failed to build thread pool: {e}")))
}

impl ExportedPage {
    pub fn paper(&self) -> PaperSize {
        self.layout.paper()
    }

    /// Caption printed under each frame, indexed by slot.
    pub fn captions(&self) -> [&'static str; SLOT_COUNT] {
        SLOT_LABELS
    }

    /// Encode the page raster as PNG.
    pub fn to_png_bytes(&self) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();
        self.raster
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .map_err(|err| PasportError::ImageError(format!("PNG encoding failed: {err}")))?;
        Ok(bytes)
    }

    pub fn save_png(&self, path: impl AsRef<Path>) -> Result<()> {
        let bytes = self.to_png_bytes()?;
        std::fs::write(path.as_ref(), &bytes)?;
        info!("Wrote PNG to {}", path.as_ref().display());
        Ok(())
    }

    /// A one-page PDF of the paper size with the page raster placed edge to
    /// edge, the card name in the header and the slot captions under the
    /// frames.
    pub fn to_pdf_bytes(&self) -> Result<Vec<u8>> {
        let mut writer = PdfWriter::new(self.paper());
        writer.set_title(self.title.clone());
        writer.create_from_page(self)
    }

    pub fn write_pdf(&self, path: impl AsRef<Path>) -> Result<()> {
        let bytes = self.to_pdf_bytes()?;
        std::fs::write(path.as_ref(), &bytes)?;
        info!("Wrote PDF to {}", path.as_ref().display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::compositor::WHITE;
    use crate::image::source::{ImageLibrary, SourceImage};
    use image::{Rgb, Rgba, RgbaImage};
    use pasport_core::types::{CardId, Transform};

    const DPI: u32 = 72;

    fn settings() -> Settings {
        Settings {
            export_dpi: DPI,
            ..Settings::default()
        }
    }

    fn solid(rgba: [u8; 4], w: u32, h: u32) -> SourceImage {
        SourceImage::from_rgba(RgbaImage::from_pixel(w, h, Rgba(rgba))).unwrap()
    }

    fn card_with_red_slot_zero() -> (Card, ImageLibrary) {
        let mut library = ImageLibrary::new();
        let id = ImageId("red".into());
        library.insert(id.clone(), solid([255, 0, 0, 255], 90, 120));
        let mut card = Card::new(CardId(1), "Kitchen");
        card.assign(0, id, Transform::default()).unwrap();
        (card, library)
    }

    #[test]
    fn empty_card_exports_all_white() {
        let card = Card::new(CardId(1), "Empty");
        let page = export_card(&card, &ImageLibrary::new(), &settings()).unwrap();

        assert_eq!(page.raster.dimensions(), page.layout.page_size_px(DPI));
        assert!(page.raster.pixels().all(|px| *px == WHITE));
        assert_eq!(page.report.empty.len(), SLOT_COUNT);
        assert!(page.report.rendered.is_empty());
    }

    #[test]
    fn slot_zero_red_colours_only_the_top_left_frame() {
        let (card, library) = card_with_red_slot_zero();
        let page = export_card(&card, &library, &settings()).unwrap();
        let placements = page.layout.placements(DPI).unwrap();
        let frame = placements[0];

        for (x, y, px) in page.raster.enumerate_pixels() {
            let inside = x >= frame.x
                && x < frame.x + frame.width
                && y >= frame.y
                && y < frame.y + frame.height;
            if inside {
                assert_eq!(*px, Rgb([255, 0, 0]), "pixel ({x}, {y}) inside frame 0");
            } else {
                assert_eq!(*px, WHITE, "pixel ({x}, {y}) outside frame 0");
            }
        }
        assert_eq!(page.report.rendered, vec![0]);
    }

    #[test]
    fn missing_image_exports_like_an_empty_slot() {
        let mut card = Card::new(CardId(1), "Gone");
        card.assign(3, ImageId("nowhere".into()), Transform::default())
            .unwrap();
        let blank = Card::new(CardId(2), "Blank");

        let page = export_card(&card, &ImageLibrary::new(), &settings()).unwrap();
        let reference = export_card(&blank, &ImageLibrary::new(), &settings()).unwrap();

        assert_eq!(page.raster, reference.raster);
        assert_eq!(page.report.missing, vec![(3, ImageId("nowhere".into()))]);
        assert!(!page.report.is_complete());
    }

    #[test]
    fn slot_aspect_override_must_match_the_grid() {
        let (mut card, library) = card_with_red_slot_zero();
        let square = Transform::default().with_crop_aspect(CropAspect::new(1.0, 1.0).unwrap());
        card.assign(0, ImageId("red".into()), square).unwrap();

        let err = export_card(&card, &library, &settings()).unwrap_err();
        assert!(matches!(err, PasportError::AspectMismatch { .. }));
    }

    #[test]
    fn matching_override_is_accepted() {
        let (mut card, library) = card_with_red_slot_zero();
        let same = Transform::default().with_crop_aspect(CropAspect::new(20.0, 30.0).unwrap());
        card.assign(0, ImageId("red".into()), same).unwrap();
        assert!(export_card(&card, &library, &settings()).is_ok());
    }

    #[test]
    fn invalid_transform_fails_before_rendering() {
        let (mut card, library) = card_with_red_slot_zero();
        card.slots[0].content.as_mut().unwrap().transform.scale = -1.0;
        assert!(matches!(
            export_card(&card, &library, &settings()),
            Err(PasportError::InvalidTransform { .. })
        ));
    }

    #[test]
    fn out_of_range_slot_index_is_an_error() {
        let (mut card, library) = card_with_red_slot_zero();
        card.slots[0].index = SLOT_COUNT;
        assert!(matches!(
            export_card(&card, &library, &settings()),
            Err(PasportError::SlotIndex(16))
        ));
    }

    #[test]
    fn slot_stored_out_of_place_is_an_error() {
        let (mut card, library) = card_with_red_slot_zero();
        card.slots.swap(0, 1);
        assert!(matches!(
            export_card(&card, &library, &settings()),
            Err(PasportError::SlotIndex(1))
        ));
    }

    #[test]
    fn parallel_and_sequential_exports_are_identical() {
        let mut library = ImageLibrary::new();
        let mut card = Card::new(CardId(1), "Mixed");
        for index in [0, 5, 10, 15] {
            let id = ImageId(format!("img{index}"));
            let shade = (index * 16) as u8;
            library.insert(id.clone(), solid([shade, 255 - shade, 90, 255], 64, 48));
            let transform = Transform {
                rotation: index as f64 * 7.0,
                scale: 1.5,
                ..Transform::default()
            };
            card.assign(index, id, transform).unwrap();
        }

        let parallel = export_card_with(&card, &library, &settings(), ExportOptions::default())
            .unwrap();
        let sequential =
            export_card_with(&card, &library, &settings(), ExportOptions::sequential()).unwrap();
        let pooled = export_card_with(
            &card,
            &library,
            &settings(),
            ExportOptions {
                parallel: true,
                threads: Some(2),
            },
        )
        .unwrap();

        assert_eq!(parallel.raster, sequential.raster);
        assert_eq!(parallel.raster, pooled.raster);
        assert_eq!(parallel.report, sequential.report);
    }

    #[test]
    fn export_is_deterministic_and_leaves_the_card_alone() {
        let (card, library) = card_with_red_slot_zero();
        let before = card.clone();
        let a = export_card(&card, &library, &settings()).unwrap();
        let b = export_card(&card, &library, &settings()).unwrap();
        assert_eq!(a.raster, b.raster);
        assert_eq!(card, before);
    }

    #[test]
    fn invalid_dpi_is_rejected() {
        let card = Card::new(CardId(1), "Card");
        let settings = Settings {
            export_dpi: 0,
            ..Settings::default()
        };
        assert!(matches!(
            export_card(&card, &ImageLibrary::new(), &settings),
            Err(PasportError::InvalidSettings(_))
        ));
    }

    #[test]
    fn png_bytes_decode_back_to_the_page() {
        let (card, library) = card_with_red_slot_zero();
        let page = export_card(&card, &library, &settings()).unwrap();
        let png = page.to_png_bytes().unwrap();
        let decoded = image::load_from_memory(&png).unwrap().to_rgb8();
        assert_eq!(decoded, page.raster);
    }
}
