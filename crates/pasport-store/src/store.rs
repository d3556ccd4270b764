// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Card database backed by SQLite.
//
// Photographs are stored once, keyed by the SHA-256 of their encoded bytes;
// slots reference them by that id and carry their transform as JSON. Deleting
// a card removes its slots, and photographs no slot refers to any more are
// pruned.

use std::path::Path;

use chrono::{DateTime, Utc};
use pasport_core::error::{PasportError, Result};
use pasport_core::types::{Card, CardId, ImageId, SLOT_COUNT, Transform};
use pasport_document::{ImageLibrary, SourceImage};
use rusqlite::{Connection, OptionalExtension, params};
use tracing::{debug, info, instrument, warn};

use crate::integrity::image_id_for;

/// SQLite schema for cards, photographs and slot assignments.
const SCHEMA_SQL: &str = r#"
    CREATE TABLE IF NOT EXISTS cards (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS images (
        id TEXT PRIMARY KEY,
        bytes BLOB NOT NULL
    );

    CREATE TABLE IF NOT EXISTS slots (
        card_id INTEGER NOT NULL,
        slot_index INTEGER NOT NULL,
        image_id TEXT NOT NULL,
        transform TEXT NOT NULL,
        PRIMARY KEY (card_id, slot_index),
        FOREIGN KEY (card_id) REFERENCES cards(id) ON DELETE CASCADE,
        FOREIGN KEY (image_id) REFERENCES images(id)
    );
"#;

/// Convert a `rusqlite::Error` into a `PasportError::Database`.
fn db_err(e: rusqlite::Error) -> PasportError {
    PasportError::Database(e.to_string())
}

/// A card's identity and timestamps, without its slots.
#[derive(Debug, Clone, PartialEq)]
pub struct CardSummary {
    pub id: CardId,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The card database.
///
/// All methods are synchronous. The connection is `Send` but not `Sync`;
/// share it behind a mutex if needed.
pub struct CardStore {
    conn: Connection,
}

impl CardStore {
    /// Open (or create) the card database at `path`.
    ///
    /// Creates missing parent directories and tables, enables foreign keys
    /// and WAL journaling.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path.as_ref())
            .map_err(|e| PasportError::Database(format!("open: {e}")))?;

        conn.pragma_update(None, "journal_mode", "WAL")
            .map_err(|e| PasportError::Database(format!("WAL pragma: {e}")))?;

        let store = Self::init(conn)?;
        info!("card database opened");
        Ok(store)
    }

    /// Open an in-memory database (useful for tests).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| PasportError::Database(format!("open in-memory: {e}")))?;
        let store = Self::init(conn)?;
        debug!("in-memory card database opened");
        Ok(store)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", "ON")
            .map_err(|e| PasportError::Database(format!("foreign keys pragma: {e}")))?;
        conn.execute_batch(SCHEMA_SQL)
            .map_err(|e| PasportError::Database(format!("create tables: {e}")))?;
        Ok(Self { conn })
    }

    // -- Cards ---------------------------------------------------------------

    /// All cards, ordered by name ignoring case.
    pub fn list_cards(&self) -> Result<Vec<CardSummary>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, name, created_at, updated_at FROM cards
                 ORDER BY name COLLATE NOCASE",
            )
            .map_err(db_err)?;

        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                ))
            })
            .map_err(db_err)?;

        let mut cards = Vec::new();
        for row in rows {
            let (id, name, created, updated) = row.map_err(db_err)?;
            cards.push(summary_from_row(id, name, &created, &updated)?);
        }
        Ok(cards)
    }

    /// Create an empty card. Names are trimmed and must be unique.
    #[instrument(skip(self))]
    pub fn create_card(&self, name: &str) -> Result<CardSummary> {
        let name = checked_name(name)?;
        if self.find_card(name)?.is_some() {
            return Err(PasportError::Database(format!(
                "a card named {name:?} already exists"
            )));
        }

        let now = Utc::now();
        let ts = now.to_rfc3339();
        self.conn
            .execute(
                "INSERT INTO cards (name, created_at, updated_at) VALUES (?1, ?2, ?2)",
                params![name, ts],
            )
            .map_err(db_err)?;
        let id = CardId(self.conn.last_insert_rowid());

        info!(%id, "card created");
        Ok(CardSummary {
            id,
            name: name.to_string(),
            created_at: now,
            updated_at: now,
        })
    }

    /// Look a card up by its exact name.
    pub fn find_card(&self, name: &str) -> Result<Option<CardSummary>> {
        let row = self
            .conn
            .query_row(
                "SELECT id, name, created_at, updated_at FROM cards WHERE name = ?1",
                params![name],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                    ))
                },
            )
            .optional()
            .map_err(db_err)?;

        row.map(|(id, name, created, updated)| summary_from_row(id, name, &created, &updated))
            .transpose()
    }

    /// Like [`find_card`](Self::find_card), but a missing card is an error.
    pub fn card_by_name(&self, name: &str) -> Result<CardSummary> {
        self.find_card(name)?
            .ok_or_else(|| PasportError::CardNotFound(name.to_string()))
    }

    #[instrument(skip(self))]
    pub fn rename_card(&self, id: CardId, new_name: &str) -> Result<()> {
        let new_name = checked_name(new_name)?;
        let taken = self
            .find_card(new_name)?
            .is_some_and(|existing| existing.id != id);
        if taken {
            return Err(PasportError::Database(format!(
                "a card named {new_name:?} already exists"
            )));
        }

        let changed = self
            .conn
            .execute(
                "UPDATE cards SET name = ?1, updated_at = ?2 WHERE id = ?3",
                params![new_name, Utc::now().to_rfc3339(), id.0],
            )
            .map_err(db_err)?;
        if changed == 0 {
            return Err(PasportError::CardNotFound(id.to_string()));
        }
        info!("card renamed");
        Ok(())
    }

    /// Delete a card with its slots, then prune orphaned photographs.
    #[instrument(skip(self))]
    pub fn delete_card(&self, id: CardId) -> Result<()> {
        let pruned = self.in_transaction(|| {
            let changed = self
                .conn
                .execute("DELETE FROM cards WHERE id = ?1", params![id.0])
                .map_err(db_err)?;
            if changed == 0 {
                return Err(PasportError::CardNotFound(id.to_string()));
            }
            self.prune_images()
        })?;
        info!(pruned, "card deleted");
        Ok(())
    }

    /// Materialise a card with all 16 slots.
    #[instrument(skip(self))]
    pub fn load_card(&self, id: CardId) -> Result<Card> {
        let summary = self
            .conn
            .query_row(
                "SELECT id, name, created_at, updated_at FROM cards WHERE id = ?1",
                params![id.0],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                    ))
                },
            )
            .optional()
            .map_err(db_err)?
            .ok_or_else(|| PasportError::CardNotFound(id.to_string()))?;
        let summary = summary_from_row(summary.0, summary.1, &summary.2, &summary.3)?;

        let mut card = Card::new(summary.id, summary.name);
        card.created_at = summary.created_at;
        card.updated_at = summary.updated_at;

        let mut stmt = self
            .conn
            .prepare(
                "SELECT slot_index, image_id, transform FROM slots
                 WHERE card_id = ?1 ORDER BY slot_index",
            )
            .map_err(db_err)?;
        let rows = stmt
            .query_map(params![id.0], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })
            .map_err(db_err)?;

        for row in rows {
            let (index, image_id, transform_json) = row.map_err(db_err)?;
            let index = usize::try_from(index)
                .map_err(|_| PasportError::Database(format!("negative slot index {index}")))?;
            let transform: Transform = serde_json::from_str(&transform_json)?;
            card.assign(index, ImageId(image_id), transform)?;
        }

        debug!(filled = card.filled_slots().count(), "card loaded");
        Ok(card)
    }

    // -- Photographs ---------------------------------------------------------

    /// Store encoded photograph bytes and return their id. Storing the same
    /// bytes twice keeps one copy.
    ///
    /// The bytes are decoded once to reject files that are not images.
    #[instrument(skip(self, bytes), fields(bytes_len = bytes.len()))]
    pub fn put_image(&self, bytes: &[u8]) -> Result<ImageId> {
        SourceImage::from_bytes(bytes)?;
        let id = image_id_for(bytes);
        self.conn
            .execute(
                "INSERT OR IGNORE INTO images (id, bytes) VALUES (?1, ?2)",
                params![id.as_str(), bytes],
            )
            .map_err(db_err)?;
        debug!(image = %id, "image stored");
        Ok(id)
    }

    /// Encoded bytes of a stored photograph.
    pub fn image_bytes(&self, id: &ImageId) -> Result<Option<Vec<u8>>> {
        self.conn
            .query_row(
                "SELECT bytes FROM images WHERE id = ?1",
                params![id.as_str()],
                |row| row.get(0),
            )
            .optional()
            .map_err(db_err)
    }

    /// Decode every photograph `card` refers to.
    ///
    /// Photographs that are absent or fail to decode are left out with a
    /// warning; the export then prints those slots blank.
    #[instrument(skip(self, card), fields(card = %card.name))]
    pub fn load_images(&self, card: &Card) -> Result<ImageLibrary> {
        let mut library = ImageLibrary::new();
        for (index, content) in card.filled_slots() {
            if library.contains(&content.image) {
                continue;
            }
            let Some(bytes) = self.image_bytes(&content.image)? else {
                warn!(slot = index, image = %content.image, "image not in database");
                continue;
            };
            match SourceImage::from_bytes(&bytes) {
                Ok(source) => library.insert(content.image.clone(), source),
                Err(e) => {
                    warn!(slot = index, image = %content.image, error = %e, "stored image undecodable");
                }
            }
        }
        debug!(images = library.len(), "images loaded");
        Ok(library)
    }

    /// Delete photographs no slot refers to. Returns how many were removed.
    pub fn prune_images(&self) -> Result<usize> {
        self.conn
            .execute(
                "DELETE FROM images WHERE id NOT IN (SELECT image_id FROM slots)",
                [],
            )
            .map_err(db_err)
    }

    // -- Slots ---------------------------------------------------------------

    /// Put a stored photograph into a slot, replacing what was there.
    #[instrument(skip(self, transform))]
    pub fn assign_slot(
        &self,
        card: CardId,
        index: usize,
        image: &ImageId,
        transform: &Transform,
    ) -> Result<()> {
        self.in_transaction(|| self.write_slot(card, index, image, transform))?;
        debug!("slot assigned");
        Ok(())
    }

    /// Store an encoded photograph and put it into a slot in one step. When
    /// the assignment fails nothing is stored.
    #[instrument(skip(self, bytes, transform), fields(len = bytes.len()))]
    pub fn import_into_slot(
        &self,
        card: CardId,
        index: usize,
        bytes: &[u8],
        transform: &Transform,
    ) -> Result<ImageId> {
        let image = self.in_transaction(|| {
            let image = self.put_image(bytes)?;
            self.write_slot(card, index, &image, transform)?;
            Ok(image)
        })?;
        debug!(image = %image, "photo imported into slot");
        Ok(image)
    }

    fn write_slot(
        &self,
        card: CardId,
        index: usize,
        image: &ImageId,
        transform: &Transform,
    ) -> Result<()> {
        check_index(index)?;
        transform.validate()?;
        if self.image_bytes(image)?.is_none() {
            return Err(PasportError::MissingSourceImage(image.clone()));
        }
        self.touch_card(card)?;

        let json = serde_json::to_string(transform)?;
        self.conn
            .execute(
                "INSERT INTO slots (card_id, slot_index, image_id, transform)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT (card_id, slot_index)
                 DO UPDATE SET image_id = excluded.image_id, transform = excluded.transform",
                params![card.0, index as i64, image.as_str(), json],
            )
            .map_err(db_err)?;
        self.prune_images()?;
        Ok(())
    }

    /// Commit an edited transform for an occupied slot. The rotation is
    /// stored normalised; the stored transform is returned.
    #[instrument(skip(self, transform))]
    pub fn update_transform(
        &self,
        card: CardId,
        index: usize,
        transform: &Transform,
    ) -> Result<Transform> {
        check_index(index)?;
        let stored = self.in_transaction(|| {
            let mut loaded = self.load_card(card)?;
            let stored = loaded.commit_transform(index, *transform)?;

            let json = serde_json::to_string(&stored)?;
            self.conn
                .execute(
                    "UPDATE slots SET transform = ?1 WHERE card_id = ?2 AND slot_index = ?3",
                    params![json, card.0, index as i64],
                )
                .map_err(db_err)?;
            self.touch_card(card)?;
            Ok(stored)
        })?;
        debug!(rotation = stored.rotation, "transform committed");
        Ok(stored)
    }

    /// Empty a slot. Clearing an empty slot is not an error.
    #[instrument(skip(self))]
    pub fn clear_slot(&self, card: CardId, index: usize) -> Result<()> {
        check_index(index)?;
        self.in_transaction(|| {
            self.touch_card(card)?;
            self.conn
                .execute(
                    "DELETE FROM slots WHERE card_id = ?1 AND slot_index = ?2",
                    params![card.0, index as i64],
                )
                .map_err(db_err)?;
            self.prune_images()
        })?;
        debug!("slot cleared");
        Ok(())
    }

    /// Run `op` inside one transaction; any error rolls every statement back.
    fn in_transaction<T>(&self, op: impl FnOnce() -> Result<T>) -> Result<T> {
        let tx = self.conn.unchecked_transaction().map_err(db_err)?;
        let value = op()?;
        tx.commit().map_err(db_err)?;
        Ok(value)
    }

    fn touch_card(&self, id: CardId) -> Result<()> {
        let changed = self
            .conn
            .execute(
                "UPDATE cards SET updated_at = ?1 WHERE id = ?2",
                params![Utc::now().to_rfc3339(), id.0],
            )
            .map_err(db_err)?;
        if changed == 0 {
            return Err(PasportError::CardNotFound(id.to_string()));
        }
        Ok(())
    }

    // -- Maintenance ---------------------------------------------------------

    /// Write a consistent copy of the whole database to `path`.
    ///
    /// The target must not exist yet.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn backup_to(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if path.exists() {
            return Err(PasportError::Io(std::io::Error::new(
                std::io::ErrorKind::AlreadyExists,
                format!("{} already exists", path.display()),
            )));
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let target = path.to_string_lossy();
        self.conn
            .execute("VACUUM INTO ?1", params![target.as_ref()])
            .map_err(|e| PasportError::Database(format!("backup: {e}")))?;
        info!("database backed up");
        Ok(())
    }
}

fn check_index(index: usize) -> Result<()> {
    if index < SLOT_COUNT {
        Ok(())
    } else {
        Err(PasportError::SlotIndex(index))
    }
}

fn checked_name(name: &str) -> Result<&str> {
    let name = name.trim();
    if name.is_empty() {
        return Err(PasportError::Database("card name must not be empty".into()));
    }
    Ok(name)
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| PasportError::Database(format!("bad timestamp {value:?}: {e}")))
}

fn summary_from_row(id: i64, name: String, created: &str, updated: &str) -> Result<CardSummary> {
    Ok(CardSummary {
        id: CardId(id),
        name,
        created_at: parse_timestamp(created)?,
        updated_at: parse_timestamp(updated)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
    use pasport_core::types::Offset;

    fn make_store() -> CardStore {
        CardStore::open_in_memory().expect("open in-memory card store")
    }

    fn png(colour: [u8; 4]) -> Vec<u8> {
        let img = RgbaImage::from_pixel(6, 9, Rgba(colour));
        let mut bytes = Vec::new();
        DynamicImage::ImageRgba8(img)
            .write_to(&mut std::io::Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes
    }

    #[test]
    fn cards_are_listed_by_name_ignoring_case() {
        let store = make_store();
        store.create_card("bravo").unwrap();
        store.create_card("Alpha").unwrap();
        store.create_card("charlie").unwrap();

        let names: Vec<String> = store
            .list_cards()
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, ["Alpha", "bravo", "charlie"]);
    }

    #[test]
    fn duplicate_and_empty_names_are_rejected() {
        let store = make_store();
        store.create_card("Flat 3").unwrap();
        assert!(store.create_card("Flat 3").is_err());
        assert!(store.create_card("   ").is_err());
    }

    #[test]
    fn rename_and_delete() {
        let store = make_store();
        let card = store.create_card("Old").unwrap();
        store.rename_card(card.id, "New").unwrap();
        assert!(store.find_card("Old").unwrap().is_none());
        assert_eq!(store.card_by_name("New").unwrap().id, card.id);

        store.delete_card(card.id).unwrap();
        assert!(store.list_cards().unwrap().is_empty());
        assert!(matches!(
            store.delete_card(card.id),
            Err(PasportError::CardNotFound(_))
        ));
        assert!(matches!(
            store.card_by_name("New"),
            Err(PasportError::CardNotFound(_))
        ));
    }

    #[test]
    fn slots_round_trip_through_the_database() {
        let store = make_store();
        let card = store.create_card("Kitchen").unwrap();
        let image = store.put_image(&png([200, 10, 10, 255])).unwrap();
        let transform = Transform {
            offset: Offset { x: 0.1, y: -0.2 },
            scale: 1.5,
            rotation: 30.0,
            crop_aspect: None,
        };
        store.assign_slot(card.id, 4, &image, &transform).unwrap();

        let loaded = store.load_card(card.id).unwrap();
        assert_eq!(loaded.name, "Kitchen");
        let content = loaded.slot(4).unwrap().content.as_ref().unwrap();
        assert_eq!(content.image, image);
        assert_eq!(content.transform, transform);
        assert_eq!(loaded.filled_slots().count(), 1);
    }

    #[test]
    fn identical_photos_are_stored_once() {
        let store = make_store();
        let a = store.put_image(&png([1, 2, 3, 255])).unwrap();
        let b = store.put_image(&png([1, 2, 3, 255])).unwrap();
        assert_eq!(a, b);
        let count: i64 = store
            .conn
            .query_row("SELECT COUNT(*) FROM images", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn non_images_are_refused() {
        let store = make_store();
        assert!(matches!(
            store.put_image(b"not a photo"),
            Err(PasportError::ImageError(_))
        ));
    }

    #[test]
    fn update_transform_normalises_rotation() {
        let store = make_store();
        let card = store.create_card("Bath").unwrap();
        let image = store.put_image(&png([0, 0, 255, 255])).unwrap();
        store
            .assign_slot(card.id, 0, &image, &Transform::default())
            .unwrap();

        let edited = Transform::default().rotated_by(-90.0);
        let edited = Transform {
            rotation: edited.rotation - 720.0,
            ..edited
        };
        let stored = store.update_transform(card.id, 0, &edited).unwrap();
        assert_eq!(stored.rotation, 270.0);

        let loaded = store.load_card(card.id).unwrap();
        let content = loaded.slot(0).unwrap().content.as_ref().unwrap();
        assert_eq!(content.transform.rotation, 270.0);
    }

    #[test]
    fn update_transform_on_empty_slot_fails() {
        let store = make_store();
        let card = store.create_card("Empty").unwrap();
        assert!(
            store
                .update_transform(card.id, 2, &Transform::default())
                .is_err()
        );
    }

    #[test]
    fn slot_index_is_checked() {
        let store = make_store();
        let card = store.create_card("Card").unwrap();
        let image = store.put_image(&png([9, 9, 9, 255])).unwrap();
        assert!(matches!(
            store.assign_slot(card.id, SLOT_COUNT, &image, &Transform::default()),
            Err(PasportError::SlotIndex(16))
        ));
        assert!(matches!(
            store.clear_slot(card.id, 99),
            Err(PasportError::SlotIndex(99))
        ));
    }

    #[test]
    fn unknown_image_cannot_be_assigned() {
        let store = make_store();
        let card = store.create_card("Card").unwrap();
        let err = store
            .assign_slot(
                card.id,
                0,
                &ImageId("0".repeat(64)),
                &Transform::default(),
            )
            .unwrap_err();
        assert!(matches!(err, PasportError::MissingSourceImage(_)));
    }

    fn image_count(store: &CardStore) -> i64 {
        store
            .conn
            .query_row("SELECT COUNT(*) FROM images", [], |row| row.get(0))
            .unwrap()
    }

    #[test]
    fn import_into_slot_stores_and_assigns() {
        let store = make_store();
        let card = store.create_card("Hall").unwrap();
        let image = store
            .import_into_slot(card.id, 4, &png([1, 2, 3, 255]), &Transform::default())
            .unwrap();

        let loaded = store.load_card(card.id).unwrap();
        assert_eq!(loaded.slot(4).unwrap().content.as_ref().unwrap().image, image);
        assert_eq!(image_count(&store), 1);
    }

    #[test]
    fn failed_import_leaves_no_photo_behind() {
        let store = make_store();
        let card = store.create_card("Hall").unwrap();
        let photo = png([200, 10, 10, 255]);

        assert!(matches!(
            store.import_into_slot(CardId(999), 0, &photo, &Transform::default()),
            Err(PasportError::CardNotFound(_))
        ));
        assert!(matches!(
            store.import_into_slot(card.id, SLOT_COUNT, &photo, &Transform::default()),
            Err(PasportError::SlotIndex(16))
        ));
        let broken = Transform {
            scale: 0.0,
            ..Transform::default()
        };
        assert!(store.import_into_slot(card.id, 0, &photo, &broken).is_err());

        assert_eq!(image_count(&store), 0);
        assert!(store.load_card(card.id).unwrap().is_blank());
    }

    #[test]
    fn clearing_and_deleting_prune_orphaned_images() {
        let store = make_store();
        let card = store.create_card("Card").unwrap();
        let red = store.put_image(&png([255, 0, 0, 255])).unwrap();
        let blue = store.put_image(&png([0, 0, 255, 255])).unwrap();
        store
            .assign_slot(card.id, 0, &red, &Transform::default())
            .unwrap();
        store
            .assign_slot(card.id, 1, &blue, &Transform::default())
            .unwrap();

        store.clear_slot(card.id, 0).unwrap();
        assert!(store.image_bytes(&red).unwrap().is_none());
        assert!(store.image_bytes(&blue).unwrap().is_some());

        store.delete_card(card.id).unwrap();
        assert!(store.image_bytes(&blue).unwrap().is_none());
    }

    #[test]
    fn load_images_skips_undecodable_blobs() {
        let store = make_store();
        let card = store.create_card("Card").unwrap();
        let good = store.put_image(&png([0, 255, 0, 255])).unwrap();
        store
            .assign_slot(card.id, 0, &good, &Transform::default())
            .unwrap();

        // A corrupt blob written behind the store's back.
        let bad = ImageId("f".repeat(64));
        store
            .conn
            .execute(
                "INSERT INTO images (id, bytes) VALUES (?1, ?2)",
                params![bad.as_str(), b"garbage".to_vec()],
            )
            .unwrap();
        store
            .assign_slot(card.id, 1, &bad, &Transform::default())
            .unwrap();

        let loaded = store.load_card(card.id).unwrap();
        let library = store.load_images(&loaded).unwrap();
        assert!(library.contains(&good));
        assert!(!library.contains(&bad));
    }

    #[test]
    fn file_database_survives_reopen_and_backup() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("pasport.db");
        {
            let store = CardStore::open(&path).unwrap();
            store.create_card("Persisted").unwrap();
        }
        let store = CardStore::open(&path).unwrap();
        assert_eq!(store.list_cards().unwrap().len(), 1);

        let copy = dir.path().join("backup.db");
        store.backup_to(&copy).unwrap();
        let restored = CardStore::open(&copy).unwrap();
        assert!(restored.find_card("Persisted").unwrap().is_some());

        assert!(store.backup_to(&copy).is_err());
    }
}
