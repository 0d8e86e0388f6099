//! SQLite backend implementation.

use anyhow::Result;
use rusqlite::Connection;
use std::path::Path;

use super::schema::{MIGRATIONS, SCHEMA};
use super::{
    CanonicalPlace, NewPlace, NewStagedPhoto, PlaceCategory, ReviewStatus, StagedPhoto,
    StagingStore, StoreError, VerificationStatus,
};
use crate::filter::FilterResult;

pub struct SqliteDb {
    pub(crate) conn: Connection,
}

const PHOTO_COLUMNS: &str = "id, image_url, width, height, location_name, latitude, longitude, \
     caption, hashtags, likes, group_key, review_status, is_filtered, filter_score, \
     filter_reason, perceptual_hash, matched_place_id, match_confidence";

const PLACE_COLUMNS: &str =
    "id, name_local, name_en, latitude, longitude, region, category, verification_status";

impl SqliteDb {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        Ok(Self { conn })
    }

    pub fn initialize(&self) -> Result<()> {
        self.conn.execute_batch(SCHEMA)?;
        self.run_migrations()?;
        Ok(())
    }

    fn run_migrations(&self) -> Result<()> {
        for migration in MIGRATIONS {
            let _ = self.conn.execute(migration, []);
        }
        Ok(())
    }

    fn photo_from_row(row: &rusqlite::Row) -> rusqlite::Result<StagedPhoto> {
        let hashtags_json: String = row.get(8)?;
        let hashtags: Vec<String> = serde_json::from_str(&hashtags_json).unwrap_or_default();
        let status: String = row.get(11)?;

        Ok(StagedPhoto {
            id: row.get(0)?,
            image_url: row.get(1)?,
            width: row.get(2)?,
            height: row.get(3)?,
            location_name: row.get(4)?,
            latitude: row.get(5)?,
            longitude: row.get(6)?,
            caption: row.get(7)?,
            hashtags,
            likes: row.get(9)?,
            group_key: row.get(10)?,
            review_status: ReviewStatus::parse(&status),
            is_filtered: row.get(12)?,
            filter_score: row.get(13)?,
            filter_reason: row.get(14)?,
            perceptual_hash: row.get(15)?,
            matched_place_id: row.get(16)?,
            match_confidence: row.get(17)?,
        })
    }

    fn place_from_row(row: &rusqlite::Row) -> rusqlite::Result<CanonicalPlace> {
        let category: String = row.get(6)?;
        let verification: String = row.get(7)?;

        Ok(CanonicalPlace {
            id: row.get(0)?,
            name_local: row.get(1)?,
            name_en: row.get(2)?,
            latitude: row.get(3)?,
            longitude: row.get(4)?,
            region: row.get(5)?,
            category: PlaceCategory::parse(&category),
            verification_status: VerificationStatus::parse(&verification),
        })
    }

    /// Pipeline counters for the stats command.
    pub fn stats(&self) -> Result<StagingStats> {
        let count = |sql: &str| -> Result<i64> {
            Ok(self.conn.query_row(sql, [], |row| row.get(0))?)
        };

        Ok(StagingStats {
            total: count("SELECT COUNT(*) FROM photos_staging")?,
            pending: count("SELECT COUNT(*) FROM photos_staging WHERE review_status = 'pending'")?,
            approved: count(
                "SELECT COUNT(*) FROM photos_staging WHERE review_status = 'approved'",
            )?,
            rejected: count(
                "SELECT COUNT(*) FROM photos_staging WHERE review_status = 'rejected'",
            )?,
            unprocessed: count("SELECT COUNT(*) FROM photos_staging WHERE is_filtered IS NULL")?,
            passed_filter: count("SELECT COUNT(*) FROM photos_staging WHERE is_filtered = 0")?,
            filtered_out: count("SELECT COUNT(*) FROM photos_staging WHERE is_filtered = 1")?,
            matched: count(
                "SELECT COUNT(*) FROM photos_staging WHERE matched_place_id IS NOT NULL",
            )?,
            places: count("SELECT COUNT(*) FROM places")?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct StagingStats {
    pub total: i64,
    pub pending: i64,
    pub approved: i64,
    pub rejected: i64,
    pub unprocessed: i64,
    pub passed_filter: i64,
    pub filtered_out: i64,
    pub matched: i64,
    pub places: i64,
}

impl StagingStore for SqliteDb {
    fn create_staged_photo(&self, photo: &NewStagedPhoto) -> Result<i64> {
        let hashtags = serde_json::to_string(&photo.hashtags)?;
        self.conn.execute(
            r#"
            INSERT INTO photos_staging (
                image_url, width, height, location_name, latitude, longitude,
                caption, hashtags, likes, group_key
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            rusqlite::params![
                photo.image_url,
                photo.width,
                photo.height,
                photo.location_name,
                photo.latitude,
                photo.longitude,
                photo.caption,
                hashtags,
                photo.likes,
                photo.group_key,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn list_pending(&self, group_key: Option<&str>) -> Result<Vec<StagedPhoto>> {
        let photos = match group_key {
            Some(key) => {
                let sql = format!(
                    "SELECT {PHOTO_COLUMNS} FROM photos_staging \
                     WHERE review_status = 'pending' AND group_key = ? ORDER BY id"
                );
                let mut stmt = self.conn.prepare(&sql)?;
                let rows = stmt.query_map([key], Self::photo_from_row)?;
                rows.collect::<rusqlite::Result<Vec<_>>>()?
            }
            None => {
                let sql = format!(
                    "SELECT {PHOTO_COLUMNS} FROM photos_staging \
                     WHERE review_status = 'pending' ORDER BY id"
                );
                let mut stmt = self.conn.prepare(&sql)?;
                let rows = stmt.query_map([], Self::photo_from_row)?;
                rows.collect::<rusqlite::Result<Vec<_>>>()?
            }
        };
        Ok(photos)
    }

    fn list_unmatched(&self) -> Result<Vec<StagedPhoto>> {
        let sql = format!(
            "SELECT {PHOTO_COLUMNS} FROM photos_staging \
             WHERE review_status = 'pending' AND matched_place_id IS NULL ORDER BY id"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], Self::photo_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn list_accepted_hashes(&self, group_key: &str) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT perceptual_hash FROM photos_staging \
             WHERE group_key = ? AND perceptual_hash IS NOT NULL AND is_filtered = 0",
        )?;
        let rows = stmt.query_map([group_key], |row| row.get::<_, String>(0))?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn update_filter_result(&self, photo_id: i64, result: &FilterResult) -> Result<()> {
        let filtered_at = chrono::Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            r#"
            UPDATE photos_staging SET
                is_filtered = ?, filter_score = ?, filter_reason = ?,
                perceptual_hash = ?, filtered_at = ?
            WHERE id = ?
            "#,
            rusqlite::params![
                !result.passed,
                result.score,
                result.reason,
                result.perceptual_hash,
                filtered_at,
                photo_id,
            ],
        )?;
        if updated == 0 {
            return Err(StoreError::PhotoNotFound(photo_id).into());
        }
        Ok(())
    }

    fn list_registry(&self) -> Result<Vec<CanonicalPlace>> {
        // Insertion order; matcher tie-breaks depend on it being stable.
        let sql = format!("SELECT {PLACE_COLUMNS} FROM places ORDER BY id");
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], Self::place_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn find_place_by_name(&self, name_local: &str) -> Result<Option<CanonicalPlace>> {
        let sql = format!("SELECT {PLACE_COLUMNS} FROM places WHERE name_local = ?");
        let result = self
            .conn
            .query_row(&sql, [name_local], Self::place_from_row);
        match result {
            Ok(place) => Ok(Some(place)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn create_place(&self, place: &NewPlace) -> Result<i64> {
        self.conn.execute(
            r#"
            INSERT INTO places (
                name_local, name_en, latitude, longitude, region, category,
                verification_status
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
            rusqlite::params![
                place.name_local,
                place.name_en,
                place.latitude,
                place.longitude,
                place.region,
                place.category.as_str(),
                place.verification_status.as_str(),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn update_match_result(&self, photo_id: i64, place_id: i64, confidence: f64) -> Result<()> {
        // Guarded write: a photo already matched must never be reconsidered.
        let existing = self.conn.query_row(
            "SELECT matched_place_id FROM photos_staging WHERE id = ?",
            [photo_id],
            |row| row.get::<_, Option<i64>>(0),
        );
        match existing {
            Ok(Some(_)) => return Err(StoreError::AlreadyMatched(photo_id).into()),
            Ok(None) => {}
            Err(rusqlite::Error::QueryReturnedNoRows) => {
                return Err(StoreError::PhotoNotFound(photo_id).into())
            }
            Err(e) => return Err(e.into()),
        }

        self.conn.execute(
            "UPDATE photos_staging SET matched_place_id = ?, match_confidence = ? \
             WHERE id = ? AND matched_place_id IS NULL",
            rusqlite::params![place_id, confidence, photo_id],
        )?;
        Ok(())
    }
}
