//! Quality filter: admissibility gates, quality scoring and near-duplicate
//! rejection for staged photos.
//!
//! Decisions are written back through the staging store; each photo is
//! evaluated exactly once (filter fields, once set, are not recomputed).

pub mod hashing;

use anyhow::Result;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::FilterConfig;
use crate::db::{StagedPhoto, StagingStore};

pub use hashing::{blockhash, hamming_distance, similarity, HttpImageSource, ImageSource};

/// Outcome of evaluating one staged photo.
///
/// Invariant: `passed == false` implies a reason is present and the score
/// is 0. A rejected duplicate still carries its hash for audit.
#[derive(Debug, Clone)]
pub struct FilterResult {
    pub passed: bool,
    pub score: i64,
    pub reason: Option<String>,
    pub perceptual_hash: Option<String>,
}

impl FilterResult {
    fn rejected(reason: String) -> Self {
        Self {
            passed: false,
            score: 0,
            reason: Some(reason),
            perceptual_hash: None,
        }
    }
}

/// Counters for one filter sweep.
#[derive(Debug, Clone, Default)]
pub struct FilterSweepStats {
    pub evaluated: usize,
    pub passed: usize,
    pub rejected: usize,
    pub write_failures: usize,
}

pub struct QualityFilter {
    config: FilterConfig,
    source: Box<dyn ImageSource>,
}

impl QualityFilter {
    pub fn new(config: FilterConfig) -> Self {
        let source = HttpImageSource::new(
            Duration::from_secs(config.fetch_timeout_secs),
            config.max_image_bytes,
        );
        Self {
            config,
            source: Box::new(source),
        }
    }

    /// Construct with a custom image source (tests, alternative transports).
    pub fn with_source(config: FilterConfig, source: Box<dyn ImageSource>) -> Self {
        Self { config, source }
    }

    /// Evaluate one photo against the accepted hashes of its group.
    ///
    /// Gate failures reject immediately. A failed image fetch only costs a
    /// score penalty; the photo can still pass without a hash.
    pub fn evaluate(&self, photo: &StagedPhoto, existing_hashes: &[String]) -> FilterResult {
        let (url, width, height) = match (
            photo.image_url.as_deref().filter(|u| !u.is_empty()),
            photo.width,
            photo.height,
        ) {
            (Some(url), Some(w), Some(h)) => (url, w, h),
            _ => return FilterResult::rejected("Missing image data".to_string()),
        };

        // 1. Resolution gate: hard floor, not scored
        let min = self.config.min_dimension;
        if width < min || height < min {
            return FilterResult::rejected(format!(
                "Resolution too low: {width}x{height} (minimum {min}px)"
            ));
        }

        // 2. Aspect-ratio gate: banners and slivers are unusable
        let ratio = width as f64 / height as f64;
        if ratio < self.config.min_aspect_ratio || ratio > self.config.max_aspect_ratio {
            return FilterResult::rejected(format!(
                "Aspect ratio out of range: {:.2} (acceptable: {:.1}-{:.1})",
                ratio, self.config.min_aspect_ratio, self.config.max_aspect_ratio
            ));
        }

        let mut score: i64 = 100;
        let mut reasons: Vec<&str> = Vec::new();

        // 3. Perceptual hash; failure is a penalty, not a rejection
        let hash = match self.compute_hash(url) {
            Ok(hash) => Some(hash),
            Err(e) => {
                debug!("Hashing failed for photo {}: {e:#}", photo.id);
                score -= 10;
                reasons.push("Could not calculate perceptual hash");
                None
            }
        };

        // 4. Duplicate check within the same group
        if let Some(ref hash) = hash {
            for existing in existing_hashes {
                if similarity(hash, existing) > self.config.duplicate_similarity {
                    return FilterResult {
                        passed: false,
                        score: 0,
                        reason: Some("Duplicate image detected".to_string()),
                        perceptual_hash: Some(hash.clone()),
                    };
                }
            }
        }

        // 5. Resolution-based scoring
        let megapixels = (width as f64 * height as f64) / 1_000_000.0;
        if megapixels < 0.5 {
            score -= 20;
            reasons.push("Low resolution");
        } else if megapixels > 2.0 {
            score += 10;
        }

        FilterResult {
            passed: true,
            score: score.clamp(0, 100),
            reason: if reasons.is_empty() {
                None
            } else {
                Some(reasons.join(", "))
            },
            perceptual_hash: hash,
        }
    }

    fn compute_hash(&self, url: &str) -> Result<String> {
        let bytes = self.source.fetch(url)?;
        blockhash(&bytes)
    }

    /// Run one sweep over pending, not-yet-filtered photos.
    ///
    /// Accepted hashes accumulate per group during the sweep, so the second
    /// copy of an image staged in the same batch is caught. A failed write
    /// for one photo is logged and the sweep moves on.
    pub fn run_sweep(
        &self,
        store: &dyn StagingStore,
        group_key: Option<&str>,
    ) -> Result<FilterSweepStats> {
        let pending = store.list_pending(group_key)?;
        let mut stats = FilterSweepStats::default();
        let mut accepted: HashMap<String, Vec<String>> = HashMap::new();

        info!("Filter sweep over {} pending photos", pending.len());

        for photo in &pending {
            // Re-running a sweep must not recompute settled decisions
            if photo.is_filtered.is_some() {
                continue;
            }

            if !accepted.contains_key(&photo.group_key) {
                let hashes = store.list_accepted_hashes(&photo.group_key)?;
                accepted.insert(photo.group_key.clone(), hashes);
            }
            let group_hashes = accepted.get(&photo.group_key).cloned().unwrap_or_default();

            let result = self.evaluate(photo, &group_hashes);
            stats.evaluated += 1;

            match store.update_filter_result(photo.id, &result) {
                Ok(()) => {
                    if result.passed {
                        stats.passed += 1;
                        if let Some(hash) = result.perceptual_hash {
                            accepted.entry(photo.group_key.clone()).or_default().push(hash);
                        }
                    } else {
                        stats.rejected += 1;
                        info!(
                            "Filtered photo {}: {}",
                            photo.id,
                            result.reason.as_deref().unwrap_or("")
                        );
                    }
                }
                Err(e) => {
                    // Partial-failure semantics: one bad record must not
                    // abort the batch
                    warn!("Failed to persist filter result for photo {}: {e:#}", photo.id);
                    stats.write_failures += 1;
                }
            }

            // Advisory pacing against third-party image hosts
            if self.config.fetch_pause_ms > 0 {
                std::thread::sleep(Duration::from_millis(self.config.fetch_pause_ms));
            }
        }

        info!(
            "Filter sweep complete: {} passed, {} rejected, {} write failures",
            stats.passed, stats.rejected, stats.write_failures
        );
        Ok(stats)
    }
}
