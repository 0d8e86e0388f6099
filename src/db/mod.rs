mod schema;
pub mod backend;
pub mod sqlite;

#[cfg(test)]
pub mod memory;

use serde::{Deserialize, Serialize};

pub use backend::{StagingStore, StoreError};
pub use schema::{MIGRATIONS, SCHEMA};
pub use sqlite::SqliteDb;

/// Review lifecycle of a staged photo. Transitions to approved/rejected
/// happen in the admin review step, outside this crate; we only ever read
/// pending records and never touch the status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewStatus {
    Pending,
    Approved,
    Rejected,
}

impl ReviewStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewStatus::Pending => "pending",
            ReviewStatus::Approved => "approved",
            ReviewStatus::Rejected => "rejected",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "approved" => ReviewStatus::Approved,
            "rejected" => ReviewStatus::Rejected,
            _ => ReviewStatus::Pending,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaceCategory {
    Cafe,
    Viewspot,
}

impl PlaceCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlaceCategory::Cafe => "cafe",
            PlaceCategory::Viewspot => "viewspot",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "viewspot" => PlaceCategory::Viewspot,
            _ => PlaceCategory::Cafe,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerificationStatus {
    Pending,
    Verified,
}

impl VerificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerificationStatus::Pending => "pending",
            VerificationStatus::Verified => "verified",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "verified" => VerificationStatus::Verified,
            _ => VerificationStatus::Pending,
        }
    }
}

/// A scraped photo awaiting automated filtering, matching and human review.
#[derive(Debug, Clone)]
pub struct StagedPhoto {
    pub id: i64,
    pub image_url: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub location_name: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub caption: String,
    pub hashtags: Vec<String>,
    pub likes: i64,
    /// Place-name scope for duplicate detection. Duplicates are only
    /// checked against other photos with the same key.
    pub group_key: String,
    pub review_status: ReviewStatus,
    /// Filter outcome: true means the photo was filtered OUT.
    /// Null until the quality filter has run.
    pub is_filtered: Option<bool>,
    pub filter_score: Option<i64>,
    pub filter_reason: Option<String>,
    /// 256-character bit string, present only if the photo passed the
    /// resolution and aspect-ratio gates and its image could be hashed.
    pub perceptual_hash: Option<String>,
    pub matched_place_id: Option<i64>,
    pub match_confidence: Option<f64>,
}

/// Fields the scraper supplies when staging a new photo.
#[derive(Debug, Clone, Default)]
pub struct NewStagedPhoto {
    pub image_url: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub location_name: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub caption: String,
    pub hashtags: Vec<String>,
    pub likes: i64,
    pub group_key: String,
}

/// A registry entry for a real-world location.
#[derive(Debug, Clone)]
pub struct CanonicalPlace {
    pub id: i64,
    /// Localized display name and the registry's matching key (unique).
    pub name_local: String,
    pub name_en: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub region: String,
    pub category: PlaceCategory,
    pub verification_status: VerificationStatus,
}

#[derive(Debug, Clone)]
pub struct NewPlace {
    pub name_local: String,
    pub name_en: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub region: String,
    pub category: PlaceCategory,
    pub verification_status: VerificationStatus,
}
