use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    #[serde(default)]
    pub filter: FilterConfig,

    #[serde(default)]
    pub matcher: MatcherConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Minimum width and height in pixels. Photos below this are rejected.
    #[serde(default = "default_min_dimension")]
    pub min_dimension: u32,

    /// Acceptable aspect ratio range (width / height).
    #[serde(default = "default_min_aspect_ratio")]
    pub min_aspect_ratio: f64,

    #[serde(default = "default_max_aspect_ratio")]
    pub max_aspect_ratio: f64,

    /// Perceptual-hash similarity above which a photo counts as a duplicate.
    /// Product-tuned constant; do not change without review of live data.
    #[serde(default = "default_duplicate_similarity")]
    pub duplicate_similarity: f64,

    /// Timeout for fetching a single image.
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,

    /// Byte ceiling for a fetched image. Larger responses are treated as
    /// a hashing failure, not a sweep error.
    #[serde(default = "default_max_image_bytes")]
    pub max_image_bytes: u64,

    /// Advisory pause between records in a sweep, to pace image hosts.
    #[serde(default = "default_fetch_pause_ms")]
    pub fetch_pause_ms: u64,
}

fn default_min_dimension() -> u32 {
    500
}

fn default_min_aspect_ratio() -> f64 {
    0.3
}

fn default_max_aspect_ratio() -> f64 {
    3.0
}

fn default_duplicate_similarity() -> f64 {
    0.9
}

fn default_fetch_timeout_secs() -> u64 {
    10
}

fn default_max_image_bytes() -> u64 {
    10 * 1024 * 1024 // 10MB
}

fn default_fetch_pause_ms() -> u64 {
    100
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            min_dimension: default_min_dimension(),
            min_aspect_ratio: default_min_aspect_ratio(),
            max_aspect_ratio: default_max_aspect_ratio(),
            duplicate_similarity: default_duplicate_similarity(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
            max_image_bytes: default_max_image_bytes(),
            fetch_pause_ms: default_fetch_pause_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatcherConfig {
    /// Minimum confidence for accepting a place match. Candidates must
    /// strictly exceed this. Product-tuned constant.
    #[serde(default = "default_match_threshold")]
    pub match_threshold: f64,

    /// Curated known-places file folded into the matching registry.
    #[serde(default = "default_known_places_path")]
    pub known_places_path: PathBuf,
}

fn default_match_threshold() -> f64 {
    0.5
}

fn default_known_places_path() -> PathBuf {
    Config::config_dir().join("known_places.toml")
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            match_threshold: default_match_threshold(),
            known_places_path: default_known_places_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("photosift")
        .join("photosift.db")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            filter: FilterConfig::default(),
            matcher: MatcherConfig::default(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            // Create default config
            let config = Config::default();
            config.save()?;
            Ok(config)
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path();

        // Ensure parent directory exists
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;

        Ok(())
    }

    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("photosift")
    }

    fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.filter.min_dimension, 500);
        assert_eq!(config.filter.duplicate_similarity, 0.9);
        assert_eq!(config.matcher.match_threshold, 0.5);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            db_path = "/tmp/test.db"

            [filter]
            min_dimension = 800
            "#,
        )
        .unwrap();

        assert_eq!(config.db_path, PathBuf::from("/tmp/test.db"));
        assert_eq!(config.filter.min_dimension, 800);
        // Untouched fields keep their defaults
        assert_eq!(config.filter.max_aspect_ratio, 3.0);
        assert_eq!(config.matcher.match_threshold, 0.5);
    }
}
