//! Bounded worker pool that writes a [`Bulk`] catalog into the document store.
//!
//! One producer feeds a bounded queue; `workers` consumers share its receiver.
//! A failed write is logged and skipped, it never aborts the batch. The
//! cancellation token is polled while waiting for work and while a write is
//! in flight.

use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::cancel::Cancellation;
use crate::catalog::Bulk;
use crate::config::{CARDS_COLLECTION, DEFAULT_WORKERS};
use crate::error::{DeckSyncError, Result};
use crate::models::CardEntry;
use crate::normalize::document_key;
use crate::store::DocumentStore;

// ---------------------------------------------------------------------------
// UploadConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct UploadConfig {
    /// Number of concurrent writers. Must be at least 1.
    pub workers: usize,
    /// Capacity of the work queue. Defaults to `workers`.
    pub queue_capacity: Option<usize>,
    /// Extra attempts for a failed write. `0` means each entry is written at
    /// most once.
    pub write_retries: u32,
    pub collection: String,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            queue_capacity: None,
            write_retries: 0,
            collection: CARDS_COLLECTION.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// UploadReport
// ---------------------------------------------------------------------------

/// Outcome of a completed dispatch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadReport {
    /// Entries taken off the queue and written at least once.
    pub attempted: usize,
    pub written: usize,
    /// Document keys whose write failed.
    pub failed: Vec<String>,
}

impl UploadReport {
    fn merge(&mut self, other: UploadReport) {
        self.attempted += other.attempted;
        self.written += other.written;
        self.failed.extend(other.failed);
    }
}

// ---------------------------------------------------------------------------
// UploadDispatcher
// ---------------------------------------------------------------------------

pub struct UploadDispatcher<S: DocumentStore + ?Sized> {
    store: Arc<S>,
    config: UploadConfig,
}

impl<S: DocumentStore + ?Sized + 'static> UploadDispatcher<S> {
    pub fn new(store: Arc<S>, config: UploadConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &UploadConfig {
        &self.config
    }

    /// Write every entry of `bulk` to the store.
    ///
    /// Resolves once the queue is drained and every worker has returned.
    /// Returns [`DeckSyncError::Cancelled`] if `cancel` fires before or during
    /// the dispatch; no particular subset of entries is guaranteed written in
    /// that case. A panicked worker yields [`DeckSyncError::Task`].
    pub async fn dispatch(&self, bulk: Bulk, cancel: &Cancellation) -> Result<UploadReport> {
        let workers = self.config.workers;
        if workers == 0 {
            return Err(DeckSyncError::InvalidArgument(
                "upload worker count must be at least 1".into(),
            ));
        }
        if cancel.is_cancelled() {
            return Err(DeckSyncError::Cancelled);
        }

        let total = bulk.len();
        let capacity = self.config.queue_capacity.unwrap_or(workers).max(1);
        let (tx, rx) = mpsc::channel::<CardEntry>(capacity);
        let rx = Arc::new(Mutex::new(rx));
        info!(entries = total, workers, "starting upload");

        let mut tasks = JoinSet::new();

        let producer_cancel = cancel.clone();
        tasks.spawn(async move {
            for entry in bulk.into_values() {
                tokio::select! {
                    biased;
                    _ = producer_cancel.cancelled() => break,
                    sent = tx.send(entry) => {
                        if sent.is_err() {
                            break;
                        }
                    }
                }
            }
            // Dropping `tx` closes the queue.
            UploadReport::default()
        });

        for worker in 0..workers {
            let rx = rx.clone();
            let store = self.store.clone();
            let cancel = cancel.clone();
            let config = self.config.clone();
            tasks.spawn(async move { run_worker(worker, rx, store, config, cancel).await });
        }

        let mut report = UploadReport::default();
        let mut lost = None;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(tally) => report.merge(tally),
                Err(e) => {
                    error!(error = %e, "upload task panicked");
                    lost.get_or_insert(e.to_string());
                }
            }
        }

        if cancel.is_cancelled() {
            warn!(
                attempted = report.attempted,
                total, "upload cancelled"
            );
            return Err(DeckSyncError::Cancelled);
        }
        // A panicked task takes its tally with it, so the report would
        // undercount.
        if let Some(reason) = lost {
            return Err(DeckSyncError::Task(reason));
        }
        info!(
            attempted = report.attempted,
            written = report.written,
            failed = report.failed.len(),
            "upload complete"
        );
        Ok(report)
    }
}

async fn run_worker<S: DocumentStore + ?Sized>(
    worker: usize,
    rx: Arc<Mutex<mpsc::Receiver<CardEntry>>>,
    store: Arc<S>,
    config: UploadConfig,
    cancel: Cancellation,
) -> UploadReport {
    let mut tally = UploadReport::default();
    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            next = async { rx.lock().await.recv().await } => next,
        };
        let Some(entry) = next else {
            break;
        };

        let key = document_key(&entry.name);
        tally.attempted += 1;
        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            outcome = write_entry(store.as_ref(), &config, &key, &entry) => outcome,
        };
        match outcome {
            Ok(()) => tally.written += 1,
            Err(e) => {
                error!(
                    key = %key,
                    id = %entry.id,
                    error = %e,
                    "cannot create document skipping"
                );
                tally.failed.push(key);
            }
        }
    }
    debug!(worker, attempted = tally.attempted, "upload worker finished");
    tally
}

async fn write_entry<S: DocumentStore + ?Sized>(
    store: &S,
    config: &UploadConfig,
    key: &str,
    entry: &CardEntry,
) -> Result<()> {
    let doc = serde_json::to_value(entry)?;
    let mut attempt = 0;
    loop {
        match store.set(&config.collection, key, doc.clone()).await {
            Ok(()) => return Ok(()),
            Err(e) if attempt < config.write_retries => {
                attempt += 1;
                warn!(key = %key, attempt, error = %e, "retrying document write");
            }
            Err(e) => return Err(e),
        }
    }
}
