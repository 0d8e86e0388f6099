//! In-memory store used by filter and matcher tests.
//!
//! Implements the same contract as the SQLite backend over plain vectors.
//! Per-photo write failures can be injected to exercise the partial-failure
//! path of a sweep.

use anyhow::{anyhow, Result};
use std::cell::{Cell, RefCell};
use std::collections::HashSet;

use super::{
    CanonicalPlace, NewPlace, NewStagedPhoto, ReviewStatus, StagedPhoto, StagingStore, StoreError,
};
use crate::filter::FilterResult;

#[derive(Default)]
pub struct MemoryStore {
    photos: RefCell<Vec<StagedPhoto>>,
    places: RefCell<Vec<CanonicalPlace>>,
    next_photo_id: Cell<i64>,
    next_place_id: Cell<i64>,
    /// Photo ids whose writes should fail, to simulate persistence errors.
    fail_writes_for: RefCell<HashSet<i64>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            next_photo_id: Cell::new(1),
            next_place_id: Cell::new(1),
            ..Default::default()
        }
    }

    pub fn fail_writes_for(&self, photo_id: i64) {
        self.fail_writes_for.borrow_mut().insert(photo_id);
    }

    pub fn photo(&self, id: i64) -> Option<StagedPhoto> {
        self.photos.borrow().iter().find(|p| p.id == id).cloned()
    }

    pub fn place(&self, id: i64) -> Option<CanonicalPlace> {
        self.places.borrow().iter().find(|p| p.id == id).cloned()
    }

    pub fn place_count(&self) -> usize {
        self.places.borrow().len()
    }
}

impl StagingStore for MemoryStore {
    fn create_staged_photo(&self, photo: &NewStagedPhoto) -> Result<i64> {
        let id = self.next_photo_id.get();
        self.next_photo_id.set(id + 1);
        self.photos.borrow_mut().push(StagedPhoto {
            id,
            image_url: photo.image_url.clone(),
            width: photo.width,
            height: photo.height,
            location_name: photo.location_name.clone(),
            latitude: photo.latitude,
            longitude: photo.longitude,
            caption: photo.caption.clone(),
            hashtags: photo.hashtags.clone(),
            likes: photo.likes,
            group_key: photo.group_key.clone(),
            review_status: ReviewStatus::Pending,
            is_filtered: None,
            filter_score: None,
            filter_reason: None,
            perceptual_hash: None,
            matched_place_id: None,
            match_confidence: None,
        });
        Ok(id)
    }

    fn list_pending(&self, group_key: Option<&str>) -> Result<Vec<StagedPhoto>> {
        Ok(self
            .photos
            .borrow()
            .iter()
            .filter(|p| p.review_status == ReviewStatus::Pending)
            .filter(|p| group_key.map_or(true, |k| p.group_key == k))
            .cloned()
            .collect())
    }

    fn list_unmatched(&self) -> Result<Vec<StagedPhoto>> {
        Ok(self
            .photos
            .borrow()
            .iter()
            .filter(|p| p.review_status == ReviewStatus::Pending && p.matched_place_id.is_none())
            .cloned()
            .collect())
    }

    fn list_accepted_hashes(&self, group_key: &str) -> Result<Vec<String>> {
        Ok(self
            .photos
            .borrow()
            .iter()
            .filter(|p| p.group_key == group_key && p.is_filtered == Some(false))
            .filter_map(|p| p.perceptual_hash.clone())
            .collect())
    }

    fn update_filter_result(&self, photo_id: i64, result: &FilterResult) -> Result<()> {
        if self.fail_writes_for.borrow().contains(&photo_id) {
            return Err(anyhow!("injected write failure for photo {photo_id}"));
        }
        let mut photos = self.photos.borrow_mut();
        let photo = photos
            .iter_mut()
            .find(|p| p.id == photo_id)
            .ok_or(StoreError::PhotoNotFound(photo_id))?;
        photo.is_filtered = Some(!result.passed);
        photo.filter_score = Some(result.score);
        photo.filter_reason = result.reason.clone();
        photo.perceptual_hash = result.perceptual_hash.clone();
        Ok(())
    }

    fn list_registry(&self) -> Result<Vec<CanonicalPlace>> {
        Ok(self.places.borrow().clone())
    }

    fn find_place_by_name(&self, name_local: &str) -> Result<Option<CanonicalPlace>> {
        Ok(self
            .places
            .borrow()
            .iter()
            .find(|p| p.name_local == name_local)
            .cloned())
    }

    fn create_place(&self, place: &NewPlace) -> Result<i64> {
        if self.find_place_by_name(&place.name_local)?.is_some() {
            return Err(anyhow!("place name not unique: {}", place.name_local));
        }
        let id = self.next_place_id.get();
        self.next_place_id.set(id + 1);
        self.places.borrow_mut().push(CanonicalPlace {
            id,
            name_local: place.name_local.clone(),
            name_en: place.name_en.clone(),
            latitude: place.latitude,
            longitude: place.longitude,
            region: place.region.clone(),
            category: place.category,
            verification_status: place.verification_status,
        });
        Ok(id)
    }

    fn update_match_result(&self, photo_id: i64, place_id: i64, confidence: f64) -> Result<()> {
        if self.fail_writes_for.borrow().contains(&photo_id) {
            return Err(anyhow!("injected write failure for photo {photo_id}"));
        }
        let mut photos = self.photos.borrow_mut();
        let photo = photos
            .iter_mut()
            .find(|p| p.id == photo_id)
            .ok_or(StoreError::PhotoNotFound(photo_id))?;
        if photo.matched_place_id.is_some() {
            return Err(StoreError::AlreadyMatched(photo_id).into());
        }
        photo.matched_place_id = Some(place_id);
        photo.match_confidence = Some(confidence);
        Ok(())
    }
}
