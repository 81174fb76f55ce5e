use std::env;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::catalog::CollisionPolicy;
use crate::error::{DeckSyncError, Result};

pub const BULK_DATA_URL: &str = "https://archive.scryfall.com/json/scryfall-default-cards.json";
pub const CARDS_COLLECTION: &str = "cards";
pub const DEFAULT_WORKERS: usize = 100;
pub const CATALOG_FILE: &str = "scryfall-default-cards.json";

pub const TAPPEDOUT_HOST: &str = "tappedout.net";
/// Query parameter selecting tappedout's plain-text export.
pub const TAPPEDOUT_FORMAT_PARAM: (&str, &str) = ("fmt", "txt");
pub const DECKBOX_HOST: &str = "deckbox.org";
pub const DECKBOX_EXPORT_PATH: &str = "export";

pub fn default_cache_dir() -> PathBuf {
    if let Some(cache) = dirs::cache_dir() {
        cache.join("mtg-deck-sync")
    } else {
        PathBuf::from(".mtg-deck-sync-cache")
    }
}

// ---------------------------------------------------------------------------
// Credentials
// ---------------------------------------------------------------------------

/// Document store service-account credentials.
#[derive(Debug, Clone, PartialEq)]
pub enum Credentials {
    /// Credentials JSON passed inline.
    Json(serde_json::Value),
    /// Path to a credentials JSON file.
    File(PathBuf),
}

impl Credentials {
    /// Interpret a raw configuration value as either an inline JSON blob or
    /// a path to a credentials file.
    pub fn from_env_value(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(DeckSyncError::InvalidArgument(
                "empty credentials value".into(),
            ));
        }
        if trimmed.starts_with('{') {
            return Ok(Credentials::Json(serde_json::from_str(trimmed)?));
        }
        Ok(Credentials::File(PathBuf::from(trimmed)))
    }

    /// Load the credentials document, reading it from disk for file credentials.
    pub fn load(&self) -> Result<serde_json::Value> {
        match self {
            Credentials::Json(value) => Ok(value.clone()),
            Credentials::File(path) => {
                let contents = fs::read_to_string(path)?;
                Ok(serde_json::from_str(&contents)?)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// SyncConfig
// ---------------------------------------------------------------------------

/// Settings for a catalog sync run.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub catalog_url: String,
    pub workers: usize,
    pub queue_capacity: Option<usize>,
    pub write_retries: u32,
    pub collision_policy: CollisionPolicy,
    pub cache_dir: Option<PathBuf>,
    pub offline: bool,
    pub timeout: Duration,
    pub credentials: Option<Credentials>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            catalog_url: BULK_DATA_URL.to_string(),
            workers: DEFAULT_WORKERS,
            queue_capacity: None,
            write_retries: 0,
            collision_policy: CollisionPolicy::default(),
            cache_dir: None,
            offline: false,
            timeout: Duration::from_secs(120),
            credentials: None,
        }
    }
}

impl SyncConfig {
    /// Build a config from the process environment.
    ///
    /// Reads `CATALOG_URL`, `SYNC_WORKERS`, `SYNC_WRITE_RETRIES` and
    /// `FIREBASE_CONFIG`; unset variables keep their defaults.
    pub fn from_env() -> Result<Self> {
        let mut cfg = SyncConfig::default();
        if let Ok(url) = env::var("CATALOG_URL") {
            cfg.catalog_url = url;
        }
        if let Some(workers) = env_parse::<usize>("SYNC_WORKERS")? {
            cfg.workers = workers;
        }
        if let Some(retries) = env_parse::<u32>("SYNC_WRITE_RETRIES")? {
            cfg.write_retries = retries;
        }
        if let Ok(raw) = env::var("FIREBASE_CONFIG") {
            cfg.credentials = Some(Credentials::from_env_value(&raw)?);
        }
        Ok(cfg)
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Result<Option<T>> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| DeckSyncError::InvalidArgument(format!("{key}={raw} is not valid"))),
        Err(_) => Ok(None),
    }
}
