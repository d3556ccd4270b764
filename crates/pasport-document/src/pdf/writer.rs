// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF writer — wraps an exported card page in a single-page PDF using
// `printpdf` 0.8.
//
// printpdf 0.8 uses a data-oriented API: documents are built by constructing
// `PdfPage` structs containing `Vec<Op>` operation lists, then serialised via
// `PdfDocument::save()`.

use pasport_core::error::{PasportError, Result};
use pasport_core::types::{PaperSize, mm_to_pt};
use printpdf::{
    FontId, Mm, Op, ParsedFont, PdfDocument, PdfPage, PdfSaveOptions, PdfWarnMsg, Point, Pt,
    RawImage, RawImageData, RawImageFormat, TextItem, XObjectTransform,
};
use tracing::{debug, info, instrument};

use crate::export::ExportedPage;
use crate::layout::MmRect;

/// Embedded for all page text. The builtin Type1 fonts only know WinAnsi,
/// which has no glyphs for names like "dveře koupelna".
const TEXT_FONT_TTF: &[u8] = include_bytes!("../../assets/fonts/RobotoMedium.ttf");

/// Largest font used for the card title.
const TITLE_FONT_PT: f32 = 16.0;
/// Largest font used for slot captions.
const CAPTION_FONT_PT: f32 = 7.0;

/// Creates card PDFs from exported page rasters.
pub struct PdfWriter {
    /// Paper size for page creation.
    paper_size: PaperSize,
    /// Title metadata embedded in the PDF /Info dictionary.
    title: Option<String>,
}

impl PdfWriter {
    /// Create a new writer targeting the given paper size.
    pub fn new(paper_size: PaperSize) -> Self {
        Self {
            paper_size,
            title: None,
        }
    }

    /// Set a title for the PDF metadata and the page header.
    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = Some(title.into());
    }

    /// Paper dimensions in printpdf's Mm units.
    fn page_dimensions(&self) -> (Mm, Mm) {
        let (w_mm, h_mm) = self.paper_size.dimensions_mm();
        (Mm(w_mm as f32), Mm(h_mm as f32))
    }

    /// Create a single-page PDF from an exported card page.
    ///
    /// The page raster covers the whole sheet at its export DPI, so every
    /// photograph keeps its physical size. The title and the slot captions
    /// are set in the embedded TrueType font, in the bands the layout reserved
    /// for them.
    #[instrument(skip(self, page), fields(dpi = page.dpi))]
    pub fn create_from_page(&self, page: &ExportedPage) -> Result<Vec<u8>> {
        let (page_w, page_h) = self.page_dimensions();
        let title = self.title.as_deref().unwrap_or("Pasport Card");

        info!(paper = ?self.paper_size, title, "Creating card PDF");

        let raw = RawImage {
            pixels: RawImageData::U8(page.raster.as_raw().clone()),
            width: page.raster.width() as usize,
            height: page.raster.height() as usize,
            data_format: RawImageFormat::RGB8,
            tag: Vec::new(),
        };

        let mut doc = PdfDocument::new(title);
        let xobject_id = doc.add_image(&raw);
        let font = load_text_font(&mut doc)?;

        let mut ops = vec![Op::UseXobject {
            id: xobject_id,
            transform: XObjectTransform {
                translate_x: Some(Pt(0.0)),
                translate_y: Some(Pt(0.0)),
                scale_x: Some(1.0),
                scale_y: Some(1.0),
                dpi: Some(page.dpi as f32),
                rotate: None,
            },
        }];

        let page_h_pt = page_h.into_pt().0;
        let layout = &page.layout;

        // Title, vertically centred in the header band.
        let header = layout.header();
        let title_size = fitting_font_size(&header, TITLE_FONT_PT);
        if title_size > 0.0 {
            let baseline = header.y + header.height / 2.0 + pt_to_mm(title_size) * 0.35;
            push_text(&mut ops, &font, &page.title, header.x, baseline, title_size, page_h_pt);
        }

        // Captions, one per cell, just above the bottom of their strip.
        for (caption, label) in layout.captions().iter().zip(page.captions()) {
            let size = fitting_font_size(caption, CAPTION_FONT_PT);
            if size <= 0.0 || label.is_empty() {
                continue;
            }
            let baseline = caption.bottom() - caption.height * 0.25;
            push_text(&mut ops, &font, label, caption.x, baseline, size, page_h_pt);
        }

        let pdf_page = PdfPage::new(page_w, page_h, ops);
        doc.with_pages(vec![pdf_page]);

        debug!(
            raster_w = page.raster.width(),
            raster_h = page.raster.height(),
            "Page raster placed"
        );

        let mut warnings: Vec<PdfWarnMsg> = Vec::new();
        let output = doc.save(&PdfSaveOptions::default(), &mut warnings);
        if !warnings.is_empty() {
            debug!(count = warnings.len(), "printpdf reported warnings");
        }

        Ok(output)
    }
}

/// Parse the embedded text font and register it with `doc`.
fn load_text_font(doc: &mut PdfDocument) -> Result<FontId> {
    let mut warnings: Vec<PdfWarnMsg> = Vec::new();
    let font = ParsedFont::from_bytes(TEXT_FONT_TTF, 0, &mut warnings)
        .ok_or_else(|| PasportError::PdfError("embedded text font could not be parsed".into()))?;
    Ok(doc.add_font(&font))
}

/// Font size that fits a line of text into `band`, capped at `max`. Zero
/// when the band has no height.
fn fitting_font_size(band: &MmRect, max: f32) -> f32 {
    let height_pt = mm_to_pt(band.height) as f32;
    (height_pt * 0.8).min(max).max(0.0)
}

fn pt_to_mm(pt: f32) -> f64 {
    f64::from(pt) / mm_to_pt(1.0)
}

/// Append one line of text whose baseline starts at `x_mm`, `baseline_mm`
/// from the top of the page.
fn push_text(
    ops: &mut Vec<Op>,
    font: &FontId,
    text: &str,
    x_mm: f64,
    baseline_mm: f64,
    size: f32,
    page_h_pt: f32,
) {
    ops.push(Op::StartTextSection);
    ops.push(Op::SetTextCursor {
        pos: Point {
            x: Pt(mm_to_pt(x_mm) as f32),
            y: Pt(page_h_pt - mm_to_pt(baseline_mm) as f32),
        },
    });
    ops.push(Op::SetFontSize {
        size: Pt(size),
        font: font.clone(),
    });
    ops.push(Op::WriteText {
        items: vec![TextItem::Text(text.to_string())],
        font: font.clone(),
    });
    ops.push(Op::EndTextSection);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::export_card;
    use crate::image::source::ImageLibrary;
    use pasport_core::config::Settings;
    use pasport_core::types::{Card, CardId};

    fn exported(settings: &Settings) -> ExportedPage {
        exported_named("Hallway", settings)
    }

    fn exported_named(name: &str, settings: &Settings) -> ExportedPage {
        let card = Card::new(CardId(7), name);
        export_card(&card, &ImageLibrary::new(), settings).unwrap()
    }

    fn squeeze(text: &str) -> String {
        text.split_whitespace().collect()
    }

    #[test]
    fn card_pdf_has_one_page() {
        let settings = Settings {
            export_dpi: 50,
            ..Settings::default()
        };
        let page = exported(&settings);
        let bytes = page.to_pdf_bytes().unwrap();

        assert!(bytes.starts_with(b"%PDF"));
        let doc = lopdf::Document::load_mem(&bytes).unwrap();
        assert_eq!(doc.get_pages().len(), 1);
    }

    #[test]
    fn czech_title_and_captions_decode_back() {
        let settings = Settings {
            export_dpi: 50,
            ..Settings::default()
        };
        let page = exported_named("Koupelna šatna dveře", &settings);
        let bytes = page.to_pdf_bytes().unwrap();

        let doc = lopdf::Document::load_mem(&bytes).unwrap();
        let text = squeeze(&doc.extract_text(&[1]).unwrap());
        assert!(text.contains("Koupelnašatnadveře"), "extracted: {text}");
        assert!(text.contains("skříň"), "extracted: {text}");
        assert!(text.contains("dveřekoupelna"), "extracted: {text}");
    }

    #[test]
    fn bands_without_height_get_no_text() {
        let mut settings = Settings {
            export_dpi: 50,
            ..Settings::default()
        };
        settings.layout.header_mm = 0.0;
        settings.layout.caption_mm = 0.0;
        let page = exported(&settings);
        assert_eq!(fitting_font_size(&page.layout.header(), TITLE_FONT_PT), 0.0);

        let bytes = PdfWriter::new(PaperSize::A4)
            .create_from_page(&page)
            .unwrap();
        let doc = lopdf::Document::load_mem(&bytes).unwrap();
        assert_eq!(doc.get_pages().len(), 1);
    }

    #[test]
    fn font_size_is_capped() {
        let band = MmRect {
            x: 0.0,
            y: 0.0,
            width: 100.0,
            height: 50.0,
        };
        assert_eq!(fitting_font_size(&band, TITLE_FONT_PT), TITLE_FONT_PT);
    }
}
