pub const SCHEMA: &str = r#"
-- Staging table: scraped photos awaiting filtering, matching and review
CREATE TABLE IF NOT EXISTS photos_staging (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    image_url TEXT,
    width INTEGER,
    height INTEGER,
    location_name TEXT,
    latitude REAL,
    longitude REAL,
    caption TEXT NOT NULL DEFAULT '',
    hashtags TEXT NOT NULL DEFAULT '[]',
    likes INTEGER NOT NULL DEFAULT 0,
    group_key TEXT NOT NULL,
    review_status TEXT NOT NULL DEFAULT 'pending',
    is_filtered INTEGER,
    filter_score INTEGER,
    filter_reason TEXT,
    perceptual_hash TEXT,
    matched_place_id INTEGER REFERENCES places(id),
    match_confidence REAL,
    created_at TEXT DEFAULT CURRENT_TIMESTAMP,
    filtered_at TEXT
);

-- Place registry: canonical real-world locations
CREATE TABLE IF NOT EXISTS places (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name_local TEXT NOT NULL UNIQUE,
    name_en TEXT,
    latitude REAL NOT NULL,
    longitude REAL NOT NULL,
    region TEXT NOT NULL DEFAULT '',
    category TEXT NOT NULL DEFAULT 'cafe',
    verification_status TEXT NOT NULL DEFAULT 'pending',
    created_at TEXT DEFAULT CURRENT_TIMESTAMP
);

CREATE INDEX IF NOT EXISTS idx_staging_status ON photos_staging(review_status);
CREATE INDEX IF NOT EXISTS idx_staging_group ON photos_staging(group_key);
CREATE INDEX IF NOT EXISTS idx_staging_matched ON photos_staging(matched_place_id);
"#;

/// Idempotent migrations for databases created by older builds.
/// Failures are ignored (column may already exist).
pub const MIGRATIONS: &[&str] = &[
    "ALTER TABLE photos_staging ADD COLUMN likes INTEGER NOT NULL DEFAULT 0",
    "ALTER TABLE photos_staging ADD COLUMN filtered_at TEXT",
    "ALTER TABLE places ADD COLUMN verification_status TEXT NOT NULL DEFAULT 'pending'",
];
