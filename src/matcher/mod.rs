//! Place matcher: resolves free-text photo metadata to canonical places.
//!
//! Scoring is additive over independent signals (names, region, category
//! keywords), capped at 1.0. A photo already matched to a place is never
//! reconsidered; a photo with no confident candidate stays pending and can
//! be retried once the registry grows.

pub mod registry;

use anyhow::Result;
use tracing::{info, warn};

use crate::config::MatcherConfig;
use crate::db::{NewPlace, PlaceCategory, StagedPhoto, StagingStore, VerificationStatus};

pub use registry::{assemble_registry, load_known_places, seed_places, PlaceEntry};

const CAFE_KEYWORDS: &[&str] = &["cafe", "카페", "coffee", "커피"];
const VIEWSPOT_KEYWORDS: &[&str] = &["view", "tower", "타워", "전망"];

fn category_keywords(category: PlaceCategory) -> &'static [&'static str] {
    match category {
        PlaceCategory::Cafe => CAFE_KEYWORDS,
        PlaceCategory::Viewspot => VIEWSPOT_KEYWORDS,
    }
}

/// Lowercase search corpus: location hint, caption and hashtags joined.
pub fn search_corpus(photo: &StagedPhoto) -> String {
    format!(
        "{} {} {}",
        photo.location_name.as_deref().unwrap_or(""),
        photo.caption,
        photo.hashtags.join(" ")
    )
    .to_lowercase()
}

/// Additive confidence score of one candidate place against the corpus.
pub fn match_score(entry: &PlaceEntry, corpus: &str) -> f64 {
    let mut score: f64 = 0.0;

    if !entry.name_local.is_empty() && corpus.contains(&entry.name_local.to_lowercase()) {
        score += 0.9;
    }

    if let Some(name_en) = entry.name_en.as_deref() {
        if !name_en.is_empty() && corpus.contains(&name_en.to_lowercase()) {
            score += 0.8;
        }
    }

    if !entry.region.is_empty() && corpus.contains(&entry.region.to_lowercase()) {
        score += 0.3;
    }

    if category_keywords(entry.category)
        .iter()
        .any(|keyword| corpus.contains(keyword))
    {
        score += 0.2;
    }

    score.min(1.0)
}

/// Counters for one match sweep.
#[derive(Debug, Clone, Default)]
pub struct MatchSweepStats {
    pub matched: usize,
    pub unmatched: usize,
    pub write_failures: usize,
}

pub struct PlaceMatcher {
    config: MatcherConfig,
}

impl PlaceMatcher {
    pub fn new(config: MatcherConfig) -> Self {
        Self { config }
    }

    /// Best candidate strictly above the confidence threshold. Ties keep
    /// the first-encountered entry, so the input order matters.
    pub fn find_best_match<'a>(
        &self,
        photo: &StagedPhoto,
        entries: &'a [PlaceEntry],
    ) -> Option<(&'a PlaceEntry, f64)> {
        let corpus = search_corpus(photo);
        let mut best: Option<(&PlaceEntry, f64)> = None;

        for entry in entries {
            let score = match_score(entry, &corpus);
            if score > self.config.match_threshold
                && best.map_or(true, |(_, best_score)| score > best_score)
            {
                best = Some((entry, score));
            }
        }

        best
    }

    /// Resolve an entry to a persisted place id, creating the place with
    /// verification pending if it is not in the registry yet.
    fn ensure_place(&self, store: &dyn StagingStore, entry: &PlaceEntry) -> Result<i64> {
        if let Some(existing) = store.find_place_by_name(&entry.name_local)? {
            return Ok(existing.id);
        }
        let id = store.create_place(&NewPlace {
            name_local: entry.name_local.clone(),
            name_en: entry.name_en.clone(),
            latitude: entry.latitude,
            longitude: entry.longitude,
            region: entry.region.clone(),
            category: entry.category,
            verification_status: VerificationStatus::Pending,
        })?;
        info!("Created place: {} (id {id})", entry.name_local);
        Ok(id)
    }

    /// Run one sweep over pending, unmatched photos.
    ///
    /// `known` entries are folded into the registry after the persisted
    /// places. Photos are independent; a failure on one is logged and the
    /// sweep continues.
    pub fn run_sweep(
        &self,
        store: &dyn StagingStore,
        known: Vec<PlaceEntry>,
    ) -> Result<MatchSweepStats> {
        let registry = store.list_registry()?;
        let entries = assemble_registry(&registry, known);
        let photos = store.list_unmatched()?;
        let mut stats = MatchSweepStats::default();

        info!(
            "Match sweep over {} photos against {} places",
            photos.len(),
            entries.len()
        );

        for photo in &photos {
            // list_unmatched already excludes matched photos; keep the
            // guard anyway, the write below must never overwrite a match
            if photo.matched_place_id.is_some() {
                continue;
            }

            let Some((entry, confidence)) = self.find_best_match(photo, &entries) else {
                stats.unmatched += 1;
                continue;
            };

            let place_id = match self.ensure_place(store, entry) {
                Ok(id) => id,
                Err(e) => {
                    warn!("Failed to resolve place '{}': {e:#}", entry.name_local);
                    stats.write_failures += 1;
                    continue;
                }
            };

            match store.update_match_result(photo.id, place_id, confidence) {
                Ok(()) => {
                    info!(
                        "Matched photo {} to '{}' (confidence {confidence:.2})",
                        photo.id, entry.name_local
                    );
                    stats.matched += 1;
                }
                Err(e) => {
                    warn!("Failed to persist match for photo {}: {e:#}", photo.id);
                    stats.write_failures += 1;
                }
            }
        }

        info!(
            "Match sweep complete: {} matched, {} unmatched, {} write failures",
            stats.matched, stats.unmatched, stats.write_failures
        );
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory::MemoryStore;
    use crate::db::NewStagedPhoto;

    fn entry(name_local: &str, name_en: Option<&str>, region: &str) -> PlaceEntry {
        PlaceEntry {
            name_local: name_local.to_string(),
            name_en: name_en.map(str::to_string),
            latitude: 35.66,
            longitude: 139.70,
            region: region.to_string(),
            category: PlaceCategory::Cafe,
        }
    }

    fn photo_with_text(location: Option<&str>, caption: &str, hashtags: &[&str]) -> StagedPhoto {
        StagedPhoto {
            id: 1,
            image_url: Some("https://example.com/a.jpg".to_string()),
            width: Some(1200),
            height: Some(800),
            location_name: location.map(str::to_string),
            latitude: None,
            longitude: None,
            caption: caption.to_string(),
            hashtags: hashtags.iter().map(|s| s.to_string()).collect(),
            likes: 0,
            group_key: "g".to_string(),
            review_status: crate::db::ReviewStatus::Pending,
            is_filtered: None,
            filter_score: None,
            filter_reason: None,
            perceptual_hash: None,
            matched_place_id: None,
            match_confidence: None,
        }
    }

    fn matcher() -> PlaceMatcher {
        PlaceMatcher::new(crate::config::MatcherConfig::default())
    }

    #[test]
    fn test_score_caps_at_one() {
        // Local name (+0.9) and region (+0.3) exceed 1.0, clamped
        let e = entry("블루 보틀", None, "Shibuya");
        let corpus = "visited 블루 보틀 in shibuya today";
        assert_eq!(match_score(&e, corpus), 1.0);
    }

    #[test]
    fn test_category_keyword_alone_is_not_enough() {
        let e = entry("블루 보틀", None, "Shibuya");
        let p = photo_with_text(None, "nice coffee", &[]);
        // Only the category keyword hits: 0.2 <= 0.5
        assert_eq!(match_score(&e, &search_corpus(&p)), 0.2);
        assert!(matcher().find_best_match(&p, &[e]).is_none());
    }

    #[test]
    fn test_english_name_match() {
        let e = entry("블루 보틀", Some("Blue Bottle Coffee"), "Shibuya");
        let p = photo_with_text(Some("Blue Bottle Coffee"), "morning", &[]);
        // English name 0.8 plus category keyword 0.2 ("coffee" in corpus)
        let entries = [e];
        let (matched, confidence) = matcher().find_best_match(&p, &entries).unwrap();
        assert_eq!(matched.name_local, "블루 보틀");
        assert_eq!(confidence, 1.0);
    }

    #[test]
    fn test_threshold_is_strict() {
        // A score exactly on the threshold is not a match
        let config = crate::config::MatcherConfig {
            match_threshold: 0.2,
            ..Default::default()
        };
        let e = entry("블루 보틀", None, "Shibuya");
        let p = photo_with_text(None, "nice coffee", &[]);
        assert_eq!(match_score(&e, &search_corpus(&p)), 0.2);
        assert!(PlaceMatcher::new(config).find_best_match(&p, &[e]).is_none());
    }

    #[test]
    fn test_tie_keeps_first_entry() {
        let first = entry("카페 알파", Some("Alpha"), "");
        let second = entry("카페 베타", Some("Beta"), "");
        let p = photo_with_text(None, "알파 or 베타? loved 카페 알파 and 카페 베타", &[]);

        let entries = [first.clone(), second];
        let (matched, _) = matcher().find_best_match(&p, &entries).unwrap();
        assert_eq!(matched.name_local, first.name_local);
    }

    #[test]
    fn test_hashtags_feed_the_corpus() {
        let e = entry("도쿄 타워", Some("Tokyo Tower"), "Minato");
        let p = photo_with_text(None, "sunset", &["#tokyotower", "#도쿄", "#도쿄 타워"]);
        assert!(matcher().find_best_match(&p, &[e]).is_some());
    }

    fn staged_with_caption(store: &MemoryStore, caption: &str) -> i64 {
        store
            .create_staged_photo(&NewStagedPhoto {
                image_url: Some("https://example.com/a.jpg".to_string()),
                width: Some(1200),
                height: Some(800),
                caption: caption.to_string(),
                group_key: "g".to_string(),
                ..Default::default()
            })
            .unwrap()
    }

    #[test]
    fn test_sweep_matches_against_persisted_registry() {
        let store = MemoryStore::new();
        seed_places(&store, &[entry("카페 알파", Some("Alpha Cafe"), "Shibuya")]).unwrap();
        let id = staged_with_caption(&store, "great time at 카페 알파");
        let unmatched = staged_with_caption(&store, "somewhere in the city");

        let stats = matcher().run_sweep(&store, Vec::new()).unwrap();

        assert_eq!(stats.matched, 1);
        assert_eq!(stats.unmatched, 1);

        let photo = store.photo(id).unwrap();
        let place = store.place(photo.matched_place_id.unwrap()).unwrap();
        assert_eq!(place.name_local, "카페 알파");
        // Local name (0.9) plus the "카페" keyword (0.2), capped at 1.0
        assert_eq!(photo.match_confidence, Some(1.0));
        // No-match photos stay pending for a future sweep
        assert!(store.photo(unmatched).unwrap().matched_place_id.is_none());
    }

    #[test]
    fn test_sweep_creates_place_from_known_entry() {
        let store = MemoryStore::new();
        let id = staged_with_caption(&store, "view from 도쿄 타워 was unreal");
        let known = vec![PlaceEntry {
            name_local: "도쿄 타워".to_string(),
            name_en: Some("Tokyo Tower".to_string()),
            latitude: 35.6586,
            longitude: 139.7454,
            region: "Minato".to_string(),
            category: PlaceCategory::Viewspot,
        }];

        let stats = matcher().run_sweep(&store, known).unwrap();
        assert_eq!(stats.matched, 1);

        let photo = store.photo(id).unwrap();
        let place = store.place(photo.matched_place_id.unwrap()).unwrap();
        assert_eq!(place.name_local, "도쿄 타워");
        // Matcher-created places await verification
        assert_eq!(
            place.verification_status,
            crate::db::VerificationStatus::Pending
        );
    }

    #[test]
    fn test_sweep_never_rematches() {
        let store = MemoryStore::new();
        seed_places(&store, &[entry("카페 알파", None, "")]).unwrap();
        let id = staged_with_caption(&store, "카페 알파");

        matcher().run_sweep(&store, Vec::new()).unwrap();
        let first = store.photo(id).unwrap();

        // Second sweep sees no unmatched photos and changes nothing
        let stats = matcher().run_sweep(&store, Vec::new()).unwrap();
        assert_eq!(stats.matched, 0);
        let second = store.photo(id).unwrap();
        assert_eq!(first.matched_place_id, second.matched_place_id);
        assert_eq!(first.match_confidence, second.match_confidence);
    }

    #[test]
    fn test_sweep_continues_past_write_failure() {
        let store = MemoryStore::new();
        seed_places(&store, &[entry("카페 알파", None, "")]).unwrap();
        let bad = staged_with_caption(&store, "카페 알파");
        let good = staged_with_caption(&store, "카페 알파 again");
        store.fail_writes_for(bad);

        let stats = matcher().run_sweep(&store, Vec::new()).unwrap();

        assert_eq!(stats.write_failures, 1);
        assert_eq!(stats.matched, 1);
        assert!(store.photo(bad).unwrap().matched_place_id.is_none());
        assert!(store.photo(good).unwrap().matched_place_id.is_some());
    }
}
