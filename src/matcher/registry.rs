//! Registry assembly and curated known-places support.
//!
//! The matcher scores against id-less [`PlaceEntry`] values so persisted
//! registry rows and curated file entries can be mixed in one ordered
//! sequence; the winning entry is resolved to a database id afterwards.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

use crate::db::{CanonicalPlace, NewPlace, PlaceCategory, StagingStore, VerificationStatus};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaceEntry {
    pub name_local: String,
    #[serde(default)]
    pub name_en: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub region: String,
    pub category: PlaceCategory,
}

impl From<&CanonicalPlace> for PlaceEntry {
    fn from(place: &CanonicalPlace) -> Self {
        Self {
            name_local: place.name_local.clone(),
            name_en: place.name_en.clone(),
            latitude: place.latitude,
            longitude: place.longitude,
            region: place.region.clone(),
            category: place.category,
        }
    }
}

#[derive(Debug, Deserialize)]
struct KnownPlacesFile {
    #[serde(default)]
    places: Vec<PlaceEntry>,
}

/// Load curated places from a TOML file. A missing file is not an error;
/// the registry then consists of database entries only.
pub fn load_known_places(path: &Path) -> Result<Vec<PlaceEntry>> {
    if !path.exists() {
        debug!("No known-places file at {:?}", path);
        return Ok(Vec::new());
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading known places from {path:?}"))?;
    let file: KnownPlacesFile =
        toml::from_str(&content).with_context(|| format!("parsing known places in {path:?}"))?;
    Ok(file.places)
}

/// Ordered matching sequence: database registry first (insertion order),
/// then curated entries not already present by localized name.
pub fn assemble_registry(
    registry: &[CanonicalPlace],
    known: Vec<PlaceEntry>,
) -> Vec<PlaceEntry> {
    let mut entries: Vec<PlaceEntry> = registry.iter().map(PlaceEntry::from).collect();
    for entry in known {
        if !entries.iter().any(|e| e.name_local == entry.name_local) {
            entries.push(entry);
        }
    }
    entries
}

/// Administrative seeding: insert curated places that are absent, marked
/// verified. Idempotent; returns the number of places created.
pub fn seed_places(store: &dyn StagingStore, entries: &[PlaceEntry]) -> Result<usize> {
    let mut created = 0;
    for entry in entries {
        if store.find_place_by_name(&entry.name_local)?.is_some() {
            continue;
        }
        store.create_place(&NewPlace {
            name_local: entry.name_local.clone(),
            name_en: entry.name_en.clone(),
            latitude: entry.latitude,
            longitude: entry.longitude,
            region: entry.region.clone(),
            category: entry.category,
            verification_status: VerificationStatus::Verified,
        })?;
        info!("Seeded place: {}", entry.name_local);
        created += 1;
    }
    Ok(created)
}
