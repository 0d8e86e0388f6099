//! Perceptual hashing for near-duplicate detection.
//!
//! Uses a blockhash over a 16x16 downsample: each cell's average RGB
//! brightness is binarized against a fixed mid-range threshold, giving a
//! 256-bit hash encoded as a string of '0'/'1' characters. The threshold is
//! deliberately not adaptive per image; very dark or very bright photos can
//! hash poorly, which is a known limitation of the scheme.

use anyhow::{anyhow, Result};
use std::io::Read;
use std::time::Duration;

/// Hash grid edge length. The hash carries HASH_GRID^2 bits.
pub const HASH_GRID: u32 = 16;

/// Fixed brightness cutoff for binarization (mid-range of 0-255).
const BRIGHTNESS_THRESHOLD: f64 = 128.0;

/// Source of image bytes for hashing. Production fetches over HTTP; tests
/// substitute canned bytes or forced failures.
pub trait ImageSource {
    fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

/// HTTP image source with a timeout and a byte ceiling. Exceeding either is
/// an ordinary fetch failure, recovered by the caller as a score penalty.
pub struct HttpImageSource {
    timeout: Duration,
    max_bytes: u64,
}

impl HttpImageSource {
    pub fn new(timeout: Duration, max_bytes: u64) -> Self {
        Self { timeout, max_bytes }
    }
}

impl ImageSource for HttpImageSource {
    fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let response = ureq::get(url)
            .timeout(self.timeout)
            .call()
            .map_err(|e| anyhow!("image fetch failed: {e}"))?;

        let mut bytes = Vec::new();
        response
            .into_reader()
            .take(self.max_bytes + 1)
            .read_to_end(&mut bytes)?;

        if bytes.len() as u64 > self.max_bytes {
            return Err(anyhow!("image exceeds {} byte limit", self.max_bytes));
        }
        Ok(bytes)
    }
}

/// Compute the blockhash of an encoded image.
pub fn blockhash(bytes: &[u8]) -> Result<String> {
    let img = image::load_from_memory(bytes)?;
    let small = img.resize_exact(HASH_GRID, HASH_GRID, image::imageops::FilterType::Triangle);
    let rgb = small.to_rgb8();

    let mut hash = String::with_capacity((HASH_GRID * HASH_GRID) as usize);
    for pixel in rgb.pixels() {
        let brightness = (pixel[0] as f64 + pixel[1] as f64 + pixel[2] as f64) / 3.0;
        hash.push(if brightness > BRIGHTNESS_THRESHOLD {
            '1'
        } else {
            '0'
        });
    }
    Ok(hash)
}

/// Count of differing bit positions between two hash strings.
///
/// Degenerate case: hashes of unequal length are maximally distant, so the
/// longer length is returned.
pub fn hamming_distance(a: &str, b: &str) -> usize {
    if a.len() != b.len() {
        return a.len().max(b.len());
    }
    a.bytes().zip(b.bytes()).filter(|(x, y)| x != y).count()
}

/// Similarity in [0, 1] relative to the first hash's bit length.
pub fn similarity(a: &str, b: &str) -> f64 {
    if a.is_empty() {
        return 0.0;
    }
    1.0 - hamming_distance(a, b) as f64 / a.len() as f64
}
