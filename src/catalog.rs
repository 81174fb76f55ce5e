//! Bulk catalog parsing and de-duplication.
//!
//! The feed is one JSON array of card objects. Individual entries may be
//! `null` or fail to decode; those are skipped with a warning and never abort
//! the parse. Only an unreadable top level is fatal.

use flate2::read::GzDecoder;
use serde_json::value::RawValue;
use std::borrow::Cow;
use std::collections::{HashMap, HashSet};
use std::io::Read;
use tracing::{debug, warn};

use crate::error::Result;
use crate::models::CardEntry;
use crate::normalize::document_key;

/// Catalog entries keyed by document key.
pub type Bulk = HashMap<String, CardEntry>;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

// ---------------------------------------------------------------------------
// CollisionPolicy
// ---------------------------------------------------------------------------

/// What to do when two feed entries normalize to the same document key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CollisionPolicy {
    /// The entry appearing later in the feed replaces the earlier one.
    #[default]
    LastWins,
    /// The first entry in the feed is kept.
    FirstWins,
    /// Later entries replace earlier ones and every collided key is reported.
    Report,
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Null,
    Malformed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedEntry {
    /// Position of the entry in the feed array.
    pub index: usize,
    pub reason: SkipReason,
}

/// Result of parsing one catalog download.
#[derive(Debug, Default)]
pub struct Catalog {
    pub bulk: Bulk,
    pub skipped: Vec<SkippedEntry>,
    /// Keys that more than one entry mapped to. Only filled under
    /// [`CollisionPolicy::Report`].
    pub collisions: Vec<String>,
}

impl Catalog {
    pub fn null_count(&self) -> usize {
        self.skipped
            .iter()
            .filter(|s| s.reason == SkipReason::Null)
            .count()
    }
}

/// Parse raw catalog bytes (plain or gzip-compressed JSON) into a [`Catalog`].
///
/// Entries are split out as borrowed raw JSON and decoded one at a time, so no
/// intermediate value tree of the whole feed is built.
pub fn parse_catalog(bytes: &[u8], policy: CollisionPolicy) -> Result<Catalog> {
    let text: Cow<[u8]> = if bytes.starts_with(&GZIP_MAGIC) {
        let mut decoded = Vec::new();
        GzDecoder::new(bytes).read_to_end(&mut decoded)?;
        Cow::Owned(decoded)
    } else {
        Cow::Borrowed(bytes)
    };
    let raw: Vec<Option<&RawValue>> = serde_json::from_slice(&text)?;
    Ok(dedupe(raw, policy))
}

/// Fold already-split feed entries into a [`Catalog`]. `None` is a `null`
/// entry.
pub fn dedupe(raw: Vec<Option<&RawValue>>, policy: CollisionPolicy) -> Catalog {
    let mut catalog = Catalog {
        bulk: HashMap::with_capacity(raw.len()),
        ..Default::default()
    };
    let mut collided = HashSet::new();

    for (index, value) in raw.into_iter().enumerate() {
        let Some(value) = value else {
            warn!(index, "nil entry skipping");
            catalog.skipped.push(SkippedEntry {
                index,
                reason: SkipReason::Null,
            });
            continue;
        };
        let mut entry: CardEntry = match serde_json::from_str(value.get()) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(index, error = %e, "malformed entry skipping");
                catalog.skipped.push(SkippedEntry {
                    index,
                    reason: SkipReason::Malformed,
                });
                continue;
            }
        };
        entry.normalize_image_uris();
        let key = document_key(&entry.name);

        match (catalog.bulk.contains_key(&key), policy) {
            (false, _) => {
                catalog.bulk.insert(key, entry);
            }
            (true, CollisionPolicy::LastWins) => {
                debug!(key = %key, id = %entry.id, "replacing earlier entry");
                catalog.bulk.insert(key, entry);
            }
            (true, CollisionPolicy::FirstWins) => {
                debug!(key = %key, id = %entry.id, "keeping earlier entry");
            }
            (true, CollisionPolicy::Report) => {
                warn!(key = %key, id = %entry.id, index, "name collision");
                if collided.insert(key.clone()) {
                    catalog.collisions.push(key.clone());
                }
                catalog.bulk.insert(key, entry);
            }
        }
    }

    catalog
}
