//! Storage contract for the filter and matcher sweeps.
//!
//! Both components only ever touch the staging store through this trait, so
//! they can be exercised against an in-memory fake in tests and the SQLite
//! backend in production. Sweeps are single-threaded sequential batches, so
//! the trait carries no Send/Sync bound.

use anyhow::Result;
use thiserror::Error;

use super::{CanonicalPlace, NewPlace, NewStagedPhoto, StagedPhoto};
use crate::filter::FilterResult;

/// Structured store errors that sweep code branches on. Everything else
/// (I/O, SQL) is propagated as an opaque `anyhow` error.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("photo {0} not found in staging")]
    PhotoNotFound(i64),

    /// A photo already carrying a match must never be re-matched.
    #[error("photo {0} is already matched to a place")]
    AlreadyMatched(i64),
}

pub trait StagingStore {
    /// Stage a new scraped photo (status pending, filter/match fields null).
    /// Ingestion boundary: the scraper side only needs this operation.
    fn create_staged_photo(&self, photo: &NewStagedPhoto) -> Result<i64>;

    /// Pending staged photos in id order, optionally scoped to one group key.
    fn list_pending(&self, group_key: Option<&str>) -> Result<Vec<StagedPhoto>>;

    /// Pending staged photos that have not been matched to a place yet.
    fn list_unmatched(&self) -> Result<Vec<StagedPhoto>>;

    /// Perceptual hashes of photos in this group that passed the filter.
    /// Rejected duplicates keep their hash on record but are excluded here,
    /// so they never suppress future candidates.
    fn list_accepted_hashes(&self, group_key: &str) -> Result<Vec<String>>;

    /// Persist a filter decision. Sets the outcome fields and the
    /// `filtered_at` audit timestamp in a single write.
    fn update_filter_result(&self, photo_id: i64, result: &FilterResult) -> Result<()>;

    /// All canonical places in insertion order. The order is part of the
    /// contract: matcher tie-breaks keep the first-encountered entry.
    fn list_registry(&self) -> Result<Vec<CanonicalPlace>>;

    /// Exact lookup by localized name (the registry's unique key).
    fn find_place_by_name(&self, name_local: &str) -> Result<Option<CanonicalPlace>>;

    fn create_place(&self, place: &NewPlace) -> Result<i64>;

    /// Persist a match decision. Fails with [`StoreError::AlreadyMatched`]
    /// if the photo already has a matched place.
    fn update_match_result(&self, photo_id: i64, place_id: i64, confidence: f64) -> Result<()>;
}
