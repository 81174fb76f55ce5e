//! Local copy of the bulk catalog download.
//!
//! Every online sync downloads the catalog afresh and keeps the bytes on
//! disk; offline runs read that copy instead of touching the network.

use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, warn};

use crate::config;
use crate::error::{DeckSyncError, Result};
use crate::http::{get_with_retry, RetryPolicy, Transport};

/// Keeps the most recent catalog download in a cache directory.
pub struct CatalogCache {
    /// Directory where cached files are stored.
    pub cache_dir: PathBuf,
    /// If true, never download (use the cached file only).
    pub offline: bool,
}

impl CatalogCache {
    /// Create a new cache.
    ///
    /// If `cache_dir` is `None`, uses the platform-appropriate default cache directory.
    /// Creates the cache directory if it does not exist.
    pub fn new(cache_dir: Option<PathBuf>, offline: bool) -> Result<Self> {
        let dir = cache_dir.unwrap_or_else(config::default_cache_dir);
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            cache_dir: dir,
            offline,
        })
    }

    /// Local path the catalog from `url` is cached under.
    pub fn path_for(&self, url: &str) -> PathBuf {
        let name = url
            .split('?')
            .next()
            .and_then(|u| u.rsplit('/').next())
            .filter(|n| !n.is_empty())
            .unwrap_or(config::CATALOG_FILE);
        self.cache_dir.join(name)
    }

    /// Return the catalog bytes for `url`, downloading unless offline.
    pub async fn fetch(
        &self,
        transport: &dyn Transport,
        url: &str,
        policy: &RetryPolicy,
    ) -> Result<Vec<u8>> {
        let local_path = self.path_for(url);
        if self.offline {
            if fs::try_exists(&local_path).await? {
                info!(path = %local_path.display(), "using cached catalog");
                return Ok(fs::read(&local_path).await?);
            }
            return Err(DeckSyncError::NotFound(format!(
                "Catalog {} not cached and offline mode is enabled",
                local_path.display()
            )));
        }

        info!(url, "downloading catalog");
        let resp = get_with_retry(transport, url, policy).await?;
        if let Err(e) = self.save(&local_path, &resp.body).await {
            warn!(path = %local_path.display(), error = %e, "cannot cache catalog");
        }
        Ok(resp.body)
    }

    /// Write to a temp file first and rename on success, so an interrupted
    /// write never leaves a corrupt partial file behind.
    async fn save(&self, dest: &Path, bytes: &[u8]) -> Result<()> {
        let tmp_dest = dest.with_extension(format!(
            "{}.tmp",
            dest.extension().and_then(|e| e.to_str()).unwrap_or("")
        ));
        let result = async {
            fs::write(&tmp_dest, bytes).await?;
            fs::rename(&tmp_dest, dest).await?;
            Ok::<(), DeckSyncError>(())
        }
        .await;

        if result.is_err() {
            let _ = fs::remove_file(&tmp_dest).await;
        }
        result
    }

    /// Remove all cached files and recreate the cache directory.
    pub fn clear(&self) -> Result<()> {
        if self.cache_dir.exists() {
            std::fs::remove_dir_all(&self.cache_dir)?;
            std::fs::create_dir_all(&self.cache_dir)?;
        }
        Ok(())
    }
}
