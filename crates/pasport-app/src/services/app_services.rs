// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Central service layer — opens the card database and settings once per
// invocation and exposes the operations the commands need.

use std::path::{Path, PathBuf};

use image::RgbImage;
use pasport_core::config::Settings;
use pasport_core::error::{PasportError, Result};
use pasport_core::types::{Card, CropAspect, ImageId, Transform};
use pasport_document::{
    ExportOptions, ExportedPage, SourceImage, SourceWindow, export_card_with, render_preview,
};
use pasport_store::settings_file::{load_settings, save_settings};
use pasport_store::{CardStore, CardSummary, data_dir};
use tracing::{info, warn};

/// A slot transform after an edit was committed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlotEdit {
    pub transform: Transform,
    /// False when the framing runs off the photo and the slot prints white
    /// edges.
    pub covers_slot: bool,
}

/// Backend services for one run of the shell.
pub struct AppServices {
    store: CardStore,
    data_dir: PathBuf,
    settings: Settings,
}

impl AppServices {
    /// Open the settings and the card database in the user's data directory.
    ///
    /// `db_override` wins over the database path in the settings file.
    pub fn init(db_override: Option<PathBuf>) -> Result<Self> {
        let dir = data_dir::data_dir();
        Self::open_in(dir, db_override)
    }

    /// Same as [`init`](Self::init) with an explicit data directory.
    pub fn open_in(dir: PathBuf, db_override: Option<PathBuf>) -> Result<Self> {
        info!(path = %dir.display(), "initialising app services");
        let settings = load_settings(&dir);
        let db_path = db_override
            .or_else(|| settings.database_path.clone())
            .unwrap_or_else(|| data_dir::default_database_path(&dir));
        let store = CardStore::open(&db_path)?;
        Ok(Self {
            store,
            data_dir: dir,
            settings,
        })
    }

    // -- Settings ------------------------------------------------------------

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Validate, persist and adopt new settings.
    pub fn save_settings(&mut self, settings: Settings) -> Result<()> {
        save_settings(&self.data_dir, &settings)?;
        self.settings = settings;
        Ok(())
    }

    pub fn set_export_dpi(&mut self, dpi: u32) -> Result<()> {
        let settings = Settings {
            export_dpi: dpi,
            ..self.settings.clone()
        };
        self.save_settings(settings)
    }

    pub fn set_default_aspect(&mut self, aspect: CropAspect) -> Result<()> {
        let settings = Settings {
            default_crop_aspect: aspect,
            ..self.settings.clone()
        };
        self.save_settings(settings)
    }

    pub fn set_cell_borders(&mut self, enabled: bool) -> Result<()> {
        let mut settings = self.settings.clone();
        settings.layout.cell_borders = enabled;
        self.save_settings(settings)
    }

    // -- Cards ---------------------------------------------------------------

    pub fn list_cards(&self) -> Result<Vec<CardSummary>> {
        self.store.list_cards()
    }

    pub fn create_card(&self, name: &str) -> Result<CardSummary> {
        self.store.create_card(name)
    }

    pub fn rename_card(&self, old: &str, new: &str) -> Result<()> {
        let card = self.store.card_by_name(old)?;
        self.store.rename_card(card.id, new)
    }

    pub fn delete_card(&self, name: &str) -> Result<()> {
        let card = self.store.card_by_name(name)?;
        self.store.delete_card(card.id)
    }

    pub fn load_card(&self, name: &str) -> Result<Card> {
        let card = self.store.card_by_name(name)?;
        self.store.load_card(card.id)
    }

    // -- Slots ---------------------------------------------------------------

    /// Store the photograph at `image_path` and put it into a slot.
    pub fn set_slot(
        &self,
        card: &str,
        index: usize,
        image_path: &Path,
        transform: &Transform,
    ) -> Result<ImageId> {
        let card = self.store.card_by_name(card)?;
        let bytes = std::fs::read(image_path)?;
        self.store
            .import_into_slot(card.id, index, &bytes, transform)
    }

    pub fn clear_slot(&self, card: &str, index: usize) -> Result<()> {
        let card = self.store.card_by_name(card)?;
        self.store.clear_slot(card.id, index)
    }

    /// Apply an edit to a slot's current transform and commit the result.
    pub fn edit_slot(
        &self,
        card: &str,
        index: usize,
        edit: impl FnOnce(&Transform) -> Transform,
    ) -> Result<SlotEdit> {
        let loaded = self.load_card(card)?;
        let content = loaded.slot(index)?.content.as_ref().ok_or_else(|| {
            PasportError::invalid_transform(format!("slot {index} has no photograph"))
        })?;
        let transform = self
            .store
            .update_transform(loaded.id, index, &edit(&content.transform))?;

        let covers_slot = match self.store.image_bytes(&content.image)? {
            Some(bytes) => {
                let source = SourceImage::from_bytes(&bytes)?;
                let aspect = transform.effective_aspect(self.settings.default_crop_aspect);
                SourceWindow::compute(&transform, aspect, source.width(), source.height())?
                    .lies_within(source.width(), source.height())
            }
            None => false,
        };
        if !covers_slot {
            warn!(index, "framing leaves the photo");
        }
        Ok(SlotEdit {
            transform,
            covers_slot,
        })
    }

    /// Render one slot at preview size.
    pub fn preview_slot(&self, card: &str, index: usize, max_edge: u32) -> Result<RgbImage> {
        let loaded = self.load_card(card)?;
        let Some(content) = loaded.slot(index)?.content.as_ref() else {
            return Err(PasportError::invalid_transform(format!(
                "slot {index} has no photograph"
            )));
        };
        let images = self.store.load_images(&loaded)?;
        let source = images
            .get(&content.image)
            .ok_or_else(|| PasportError::MissingSourceImage(content.image.clone()))?;
        let aspect = content
            .transform
            .effective_aspect(self.settings.default_crop_aspect);
        render_preview(source, &content.transform, aspect, max_edge)
    }

    // -- Export --------------------------------------------------------------

    /// Export a card, optionally at a different DPI than the settings say.
    pub fn export(
        &self,
        card: &str,
        dpi: Option<u32>,
        options: ExportOptions,
    ) -> Result<ExportedPage> {
        let loaded = self.load_card(card)?;
        let images = self.store.load_images(&loaded)?;
        let mut settings = self.settings.clone();
        if let Some(dpi) = dpi {
            settings.export_dpi = dpi;
        }

        let page = export_card_with(&loaded, &images, &settings, options)?;
        for (slot, image) in &page.report.missing {
            warn!(slot, %image, "slot exported blank");
        }
        Ok(page)
    }

    pub fn backup(&self, target: &Path) -> Result<()> {
        self.store.backup_to(target)
    }
}
