//! Shared fixtures for the integration tests.
//!
//! Provides Scryfall-shaped card JSON, a document store wrapper that records
//! and selectively rejects writes, and a scripted HTTP transport.

#![allow(dead_code)]

use async_trait::async_trait;
use mtg_deck_sync::{DeckSyncError, DocumentStore, HttpResponse, MemoryStore, Result, Snapshot, Transport};
use reqwest::StatusCode;
use serde_json::{json, Value};
use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

// ---------------------------------------------------------------------------
// Card fixtures
// ---------------------------------------------------------------------------

pub fn card_json(id: &str, name: &str) -> Value {
    json!({
        "object": "card",
        "id": id,
        "oracle_id": format!("oracle-{id}"),
        "name": name,
        "lang": "en",
        "released_at": "2018-03-16",
        "layout": "normal",
        "set": "a25",
        "set_name": "Masters 25",
        "collector_number": "141",
        "rarity": "uncommon",
        "artist": "Christopher Moeller",
        "mana_cost": "{R}",
        "cmc": 1.0,
        "type_line": "Instant",
        "oracle_text": "Lightning Bolt deals 3 damage to any target.",
        "colors": ["R"],
        "color_identity": ["R"],
        "legalities": { "modern": "legal", "standard": "not_legal" },
        "image_uris": {
            "small": format!("https://img.scryfall.com/cards/small/{id}.jpg?1562442347"),
            "normal": format!("https://img.scryfall.com/cards/normal/{id}.jpg?1562442347"),
            "large": format!("https://img.scryfall.com/cards/large/{id}.jpg?1562442347"),
            "png": format!("https://img.scryfall.com/cards/png/{id}.png?1562442347"),
            "art_crop": format!("https://img.scryfall.com/cards/art_crop/{id}.jpg?1562442347"),
            "border_crop": format!("https://img.scryfall.com/cards/border_crop/{id}.jpg?1562442347")
        },
        "reserved": false,
        "edhrec_rank": 5
    })
}

pub fn split_card_json(id: &str) -> Value {
    json!({
        "id": id,
        "name": "Fire // Ice",
        "layout": "split",
        "set": "mh2",
        "rarity": "uncommon",
        "cmc": 4.0,
        "type_line": "Instant // Instant",
        "colors": [],
        "image_uris": {
            "normal": format!("https://img.scryfall.com/cards/normal/{id}.jpg?99")
        },
        "card_faces": [
            {
                "name": "Fire",
                "mana_cost": "{1}{R}",
                "type_line": "Instant",
                "oracle_text": "Fire deals 2 damage divided as you choose among one or two targets.",
                "colors": ["R"],
                "image_uris": { "normal": "https://img.scryfall.com/fire.jpg?1" }
            },
            {
                "name": "Ice",
                "mana_cost": "{1}{U}",
                "type_line": "Instant",
                "oracle_text": "Tap target permanent.\nDraw a card.",
                "colors": ["U"]
            }
        ]
    })
}

/// Serialize `values` as a catalog feed.
pub fn feed(values: &[Value]) -> Vec<u8> {
    serde_json::to_vec(values).unwrap()
}

// ---------------------------------------------------------------------------
// RecordingStore
// ---------------------------------------------------------------------------

/// [`MemoryStore`] wrapper that counts writes, rejects chosen keys and can
/// slow writes down or fail batched reads.
#[derive(Default)]
pub struct RecordingStore {
    pub inner: MemoryStore,
    pub writes: AtomicUsize,
    pub reject: HashSet<String>,
    /// Keys whose write panics the writing task.
    pub panic_on: HashSet<String>,
    pub write_delay: Option<Duration>,
    pub fail_get_all: bool,
    pub get_all_calls: AtomicUsize,
    pub written_keys: Mutex<Vec<String>>,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rejecting(keys: &[&str]) -> Self {
        Self {
            reject: keys.iter().map(|k| k.to_string()).collect(),
            ..Default::default()
        }
    }

    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DocumentStore for RecordingStore {
    async fn set(&self, collection: &str, key: &str, doc: Value) -> Result<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.write_delay {
            tokio::time::sleep(delay).await;
        }
        if self.panic_on.contains(key) {
            panic!("store crashed writing {key}");
        }
        if self.reject.contains(key) {
            return Err(DeckSyncError::Persistence {
                key: key.to_string(),
                reason: "permission denied".into(),
            });
        }
        self.written_keys.lock().unwrap().push(key.to_string());
        self.inner.set(collection, key, doc).await
    }

    async fn get(&self, collection: &str, key: &str) -> Result<Snapshot> {
        self.inner.get(collection, key).await
    }

    async fn get_all(&self, collection: &str, keys: &[String]) -> Result<Vec<Snapshot>> {
        self.get_all_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_get_all {
            return Err(DeckSyncError::Store("deadline exceeded".into()));
        }
        self.inner.get_all(collection, keys).await
    }
}

// ---------------------------------------------------------------------------
// ScriptedTransport
// ---------------------------------------------------------------------------

pub enum Reply {
    Status(u16, &'static str),
    Body(String),
    Bytes(Vec<u8>),
    Fail(&'static str),
    Hang,
}

/// Transport answering from a script; once the script runs out the fallback
/// reply is repeated. Every requested URL is recorded.
pub struct ScriptedTransport {
    script: Mutex<VecDeque<Reply>>,
    fallback: fn() -> Reply,
    pub calls: Mutex<Vec<String>>,
}

impl ScriptedTransport {
    pub fn new(script: Vec<Reply>, fallback: fn() -> Reply) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn always(fallback: fn() -> Reply) -> Self {
        Self::new(Vec::new(), fallback)
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn urls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn get(&self, url: &str) -> Result<HttpResponse> {
        self.calls.lock().unwrap().push(url.to_string());
        let reply = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(self.fallback);
        match reply {
            Reply::Status(code, body) => Ok(HttpResponse {
                status: StatusCode::from_u16(code).unwrap(),
                body: body.as_bytes().to_vec(),
            }),
            Reply::Body(body) => Ok(HttpResponse {
                status: StatusCode::OK,
                body: body.into_bytes(),
            }),
            Reply::Bytes(body) => Ok(HttpResponse {
                status: StatusCode::OK,
                body,
            }),
            Reply::Fail(reason) => Err(DeckSyncError::InvalidArgument(reason.to_string())),
            Reply::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(DeckSyncError::InvalidArgument("unreachable".into()))
            }
        }
    }
}
