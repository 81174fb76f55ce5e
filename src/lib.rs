//! Scryfall catalog sync and deck building.
//!
//! Downloads the Scryfall bulk card catalog, de-duplicates it by card name and
//! writes every card into a document store with a bounded pool of workers.
//! Decks are built by resolving card names against the store, either from a
//! name list or from a deck published on tappedout.net or deckbox.org.
//!
//! # Quick start
//!
//! ```no_run
//! use std::sync::Arc;
//! use mtg_deck_sync::{Cancellation, DeckSync, MemoryStore};
//!
//! # async fn run() -> mtg_deck_sync::Result<()> {
//! let sync = DeckSync::builder()
//!     .store(Arc::new(MemoryStore::new()))
//!     .workers(100)
//!     .build()?;
//!
//! // Load the catalog into the store
//! let report = sync.sync_catalog(&Cancellation::new()).await?;
//!
//! // Build a deck from a published list
//! let imported = sync.import_deck("https://deckbox.org/sets/2649137").await?;
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod cancel;
pub mod catalog;
pub mod config;
pub mod deck_list;
pub mod error;
pub mod http;
pub mod logging;
pub mod models;
pub mod normalize;
pub mod resolver;
pub mod retriever;
pub mod store;
pub mod upload;

pub use cache::CatalogCache;
pub use cancel::Cancellation;
pub use catalog::{parse_catalog, Bulk, Catalog, CollisionPolicy};
pub use config::{Credentials, SyncConfig};
pub use deck_list::{parse_deck_list, DeckList};
pub use error::{DeckSyncError, Result};
pub use http::{HttpResponse, ReqwestTransport, RetryPolicy, Transport};
pub use models::{CardEntry, CardShort, Deck, DeckCountMap};
pub use retriever::{DeckSource, DeckboxNormalizer, ListNormalizer, ListRetriever, RetrieverConfig};
pub use store::{DocumentStore, MemoryStore, Snapshot};
pub use upload::{UploadConfig, UploadDispatcher, UploadReport};

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use catalog::SkippedEntry;

// ---------------------------------------------------------------------------
// DeckSyncBuilder
// ---------------------------------------------------------------------------

/// Builder for configuring and constructing a [`DeckSync`] instance.
///
/// Use [`DeckSync::builder()`] to obtain a builder, chain configuration
/// methods, and call [`build()`](DeckSyncBuilder::build) to create it.
pub struct DeckSyncBuilder {
    config: SyncConfig,
    retriever: RetrieverConfig,
    catalog_retry: RetryPolicy,
    store: Option<Arc<dyn DocumentStore>>,
    transport: Option<Arc<dyn Transport>>,
    normalizer: Option<Arc<dyn ListNormalizer>>,
}

impl Default for DeckSyncBuilder {
    fn default() -> Self {
        Self {
            config: SyncConfig::default(),
            retriever: RetrieverConfig::default(),
            catalog_retry: RetryPolicy::new(3, None),
            store: None,
            transport: None,
            normalizer: None,
        }
    }
}

impl DeckSyncBuilder {
    /// Start from an existing [`SyncConfig`], e.g. one read with
    /// [`SyncConfig::from_env`].
    pub fn config(mut self, config: SyncConfig) -> Self {
        self.config = config;
        self
    }

    /// The document store cards are written to and read from. Required.
    pub fn store(mut self, store: Arc<dyn DocumentStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Override the HTTP transport. Defaults to a [`ReqwestTransport`].
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Override the deckbox export normalizer. Defaults to [`DeckboxNormalizer`].
    pub fn normalizer(mut self, normalizer: Arc<dyn ListNormalizer>) -> Self {
        self.normalizer = Some(normalizer);
        self
    }

    /// Number of concurrent upload workers. Defaults to 100.
    pub fn workers(mut self, workers: usize) -> Self {
        self.config.workers = workers;
        self
    }

    /// Capacity of the upload work queue. Defaults to the worker count.
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.config.queue_capacity = Some(capacity);
        self
    }

    /// Extra attempts for a failed document write. Defaults to 0.
    pub fn write_retries(mut self, retries: u32) -> Self {
        self.config.write_retries = retries;
        self
    }

    /// How catalog entries sharing a document key are folded. Defaults to
    /// [`CollisionPolicy::LastWins`].
    pub fn collision_policy(mut self, policy: CollisionPolicy) -> Self {
        self.config.collision_policy = policy;
        self
    }

    /// Bulk catalog download URL. Defaults to [`config::BULK_DATA_URL`].
    pub fn catalog_url(mut self, url: impl Into<String>) -> Self {
        self.config.catalog_url = url.into();
        self
    }

    /// Set a custom cache directory for the catalog download.
    pub fn cache_dir<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config.cache_dir = Some(path.as_ref().to_path_buf());
        self
    }

    /// Enable or disable offline mode.
    ///
    /// When offline, the catalog is never downloaded and only a previously
    /// cached copy is used. Defaults to `false`.
    pub fn offline(mut self, offline: bool) -> Self {
        self.config.offline = offline;
        self
    }

    /// Overall HTTP request timeout of the default transport.
    ///
    /// Defaults to 120 seconds.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Retry policy for the catalog download. Defaults to 3 attempts.
    pub fn catalog_retry(mut self, policy: RetryPolicy) -> Self {
        self.catalog_retry = policy;
        self
    }

    /// Retry policy for tappedout.net. Defaults to 3 attempts of 5 seconds each.
    pub fn tappedout_retry(mut self, policy: RetryPolicy) -> Self {
        self.retriever.tappedout = policy;
        self
    }

    /// Retry policy for deckbox.org. Defaults to 10 attempts, no per-attempt
    /// timeout.
    pub fn deckbox_retry(mut self, policy: RetryPolicy) -> Self {
        self.retriever.deckbox = policy;
        self
    }

    /// Build the client. Fails if no store was given or the worker count is 0.
    pub fn build(self) -> Result<DeckSync> {
        let store = self
            .store
            .ok_or_else(|| DeckSyncError::InvalidArgument("a document store is required".into()))?;
        if self.config.workers == 0 {
            return Err(DeckSyncError::InvalidArgument(
                "upload worker count must be at least 1".into(),
            ));
        }
        let transport: Arc<dyn Transport> = match self.transport {
            Some(t) => t,
            None => Arc::new(ReqwestTransport::new(self.config.timeout)?),
        };
        let normalizer = self
            .normalizer
            .unwrap_or_else(|| Arc::new(DeckboxNormalizer) as Arc<dyn ListNormalizer>);
        let cache = CatalogCache::new(self.config.cache_dir.clone(), self.config.offline)?;

        let dispatcher = UploadDispatcher::new(
            store.clone(),
            UploadConfig {
                workers: self.config.workers,
                queue_capacity: self.config.queue_capacity,
                write_retries: self.config.write_retries,
                ..Default::default()
            },
        );
        let retriever = ListRetriever::new(transport.clone(), normalizer, self.retriever);

        Ok(DeckSync {
            config: self.config,
            catalog_retry: self.catalog_retry,
            store,
            transport,
            cache,
            dispatcher,
            retriever,
        })
    }
}

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

/// Outcome of a full catalog sync.
#[derive(Debug, Clone, Default)]
pub struct SyncReport {
    /// Distinct cards after de-duplication.
    pub cards: usize,
    pub skipped: Vec<SkippedEntry>,
    pub collisions: Vec<String>,
    pub upload: UploadReport,
}

/// A deck imported from a published list.
#[derive(Debug, Clone)]
pub struct ImportedDeck {
    /// Canonical plain-text list as retrieved.
    pub list: String,
    pub deck: Deck,
    pub counts: DeckCountMap,
}

// ---------------------------------------------------------------------------
// DeckSync
// ---------------------------------------------------------------------------

/// Entry point tying catalog sync, deck resolution and list retrieval to one
/// store and transport.
///
/// Created via [`DeckSync::builder()`].
pub struct DeckSync {
    config: SyncConfig,
    catalog_retry: RetryPolicy,
    store: Arc<dyn DocumentStore>,
    transport: Arc<dyn Transport>,
    cache: CatalogCache,
    dispatcher: UploadDispatcher<dyn DocumentStore>,
    retriever: ListRetriever,
}

impl DeckSync {
    /// Create a new builder.
    pub fn builder() -> DeckSyncBuilder {
        DeckSyncBuilder::default()
    }

    /// Download the catalog, de-duplicate it and upload every card.
    pub async fn sync_catalog(&self, cancel: &Cancellation) -> Result<SyncReport> {
        if cancel.is_cancelled() {
            return Err(DeckSyncError::Cancelled);
        }
        let bytes = self
            .cache
            .fetch(self.transport.as_ref(), &self.config.catalog_url, &self.catalog_retry)
            .await?;

        let policy = self.config.collision_policy;
        let catalog = tokio::task::spawn_blocking(move || parse_catalog(&bytes, policy))
            .await
            .map_err(|e| DeckSyncError::Task(e.to_string()))??;
        info!(
            cards = catalog.bulk.len(),
            skipped = catalog.skipped.len(),
            collisions = catalog.collisions.len(),
            "catalog parsed"
        );

        let cards = catalog.bulk.len();
        let upload = self.upload(catalog.bulk, cancel).await?;
        Ok(SyncReport {
            cards,
            skipped: catalog.skipped,
            collisions: catalog.collisions,
            upload,
        })
    }

    /// Write an already-parsed catalog to the store.
    pub async fn upload(&self, bulk: Bulk, cancel: &Cancellation) -> Result<UploadReport> {
        self.dispatcher.dispatch(bulk, cancel).await
    }

    /// Resolve card names against the store. Repeated names add copies.
    pub async fn build_deck<I, N>(&self, names: I) -> Result<Deck>
    where
        I: IntoIterator<Item = N>,
        N: AsRef<str>,
    {
        resolver::resolve_deck(self.store.as_ref(), names).await
    }

    /// Resolve a parsed list, one card per requested copy.
    pub async fn build_deck_from_list(&self, list: &DeckList) -> Result<Deck> {
        resolver::resolve_deck_list(self.store.as_ref(), list).await
    }

    /// Fetch a published deck as a canonical plain-text list.
    pub async fn fetch_deck_list(&self, url: &str) -> Result<String> {
        self.retriever.fetch(url).await
    }

    /// Fetch a published deck, resolve its cards and count them.
    pub async fn import_deck(&self, url: &str) -> Result<ImportedDeck> {
        let list = self.fetch_deck_list(url).await?;
        let wanted = deck_list::parse_deck_list(&list);
        let deck = self.build_deck_from_list(&wanted).await?;
        let counts = deck.counts()?;
        Ok(ImportedDeck { list, deck, counts })
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.cache.cache_dir.clone()
    }

    /// Remove the cached catalog download.
    pub fn clear_cache(&self) -> Result<()> {
        self.cache.clear()
    }
}

// ---------------------------------------------------------------------------
// Display
// ---------------------------------------------------------------------------

impl fmt::Display for DeckSync {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "DeckSync(catalog={}, workers={}, cache_dir={}, offline={})",
            self.config.catalog_url,
            self.config.workers,
            self.cache.cache_dir.display(),
            self.cache.offline
        )
    }
}
