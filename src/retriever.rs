//! Fetch a deck list published on a supported third-party site.
//!
//! The site is chosen by the URL host. Each site has its own export endpoint
//! and retry policy; sites whose export is not already a plain-text list are
//! passed through a [`ListNormalizer`].

use regex::Regex;
use std::sync::{Arc, LazyLock};
use std::time::Duration;
use tracing::{debug, error};
use url::Url;

use crate::config::{DECKBOX_EXPORT_PATH, DECKBOX_HOST, TAPPEDOUT_FORMAT_PARAM, TAPPEDOUT_HOST};
use crate::error::{DeckSyncError, Result};
use crate::http::{get_with_retry, RetryPolicy, Transport};

// ---------------------------------------------------------------------------
// DeckSource
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeckSource {
    /// tappedout.net, plain-text export via `?fmt=txt`.
    TappedOut,
    /// deckbox.org, HTML export via `/export`.
    Deckbox,
}

impl DeckSource {
    /// Pick the source for a deck URL, failing for unknown hosts.
    pub fn from_url(url: &Url) -> Result<Self> {
        match url.host_str() {
            Some(TAPPEDOUT_HOST) => Ok(DeckSource::TappedOut),
            Some(DECKBOX_HOST) => Ok(DeckSource::Deckbox),
            Some(other) => Err(DeckSyncError::UnsupportedSource(format!(
                "unknown host {other}"
            ))),
            None => Err(DeckSyncError::UnsupportedSource(format!(
                "no host in {url}"
            ))),
        }
    }

    /// The site's export endpoint for the deck at `url`.
    ///
    /// tappedout keeps the deck URL's own query and gains `fmt=txt`,
    /// replacing any `fmt` already present. deckbox appends a path segment,
    /// so its query is dropped.
    pub fn export_url(&self, url: &Url) -> String {
        let mut export = url.clone();
        export.set_fragment(None);
        match self {
            DeckSource::TappedOut => {
                let (param, value) = TAPPEDOUT_FORMAT_PARAM;
                let kept: Vec<(String, String)> = url
                    .query_pairs()
                    .filter(|(name, _)| *name != param)
                    .map(|(name, v)| (name.into_owned(), v.into_owned()))
                    .collect();
                export.set_query(None);
                export
                    .query_pairs_mut()
                    .extend_pairs(kept)
                    .append_pair(param, value);
                export.into()
            }
            DeckSource::Deckbox => {
                export.set_query(None);
                format!("{}/{DECKBOX_EXPORT_PATH}", export.as_str().trim_end_matches('/'))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// ListNormalizer
// ---------------------------------------------------------------------------

/// Converts a site's export body into the canonical plain-text card list.
pub trait ListNormalizer: Send + Sync {
    fn normalize(&self, body: &str) -> Result<String>;
}

static BREAK_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<br\s*/?>|</(p|div|tr|li)>").expect("valid regex"));
static ANY_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").expect("valid regex"));
static BODY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<body[^>]*>(.*)</body>").expect("valid regex"));
static HEAD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<head[^>]*>.*</head>").expect("valid regex"));

/// Turns deckbox's HTML export (`1 Card Name<br/>` lines) into one card per
/// line.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeckboxNormalizer;

impl ListNormalizer for DeckboxNormalizer {
    fn normalize(&self, body: &str) -> Result<String> {
        let inner = match BODY.captures(body).and_then(|c| c.get(1)) {
            Some(m) => m.as_str().to_string(),
            None => HEAD.replace_all(body, "").into_owned(),
        };
        let broken = BREAK_TAG.replace_all(&inner, "\n");
        let stripped = ANY_TAG.replace_all(&broken, "");

        let lines: Vec<String> = stripped
            .lines()
            .map(|line| decode_entities(line.trim()))
            .filter(|line| !line.is_empty())
            .collect();
        if !lines
            .iter()
            .any(|l| l.split_whitespace().next().is_some_and(|n| n.parse::<u32>().is_ok()))
        {
            return Err(DeckSyncError::InvalidArgument(
                "export contains no card lines".into(),
            ));
        }
        Ok(lines.join("\n"))
    }
}

fn decode_entities(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&quot;", "\"")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
        .trim()
        .to_string()
}

// ---------------------------------------------------------------------------
// ListRetriever
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct RetrieverConfig {
    pub tappedout: RetryPolicy,
    pub deckbox: RetryPolicy,
}

impl Default for RetrieverConfig {
    fn default() -> Self {
        Self {
            tappedout: RetryPolicy::new(3, Some(Duration::from_secs(5))),
            deckbox: RetryPolicy::default(),
        }
    }
}

pub struct ListRetriever {
    transport: Arc<dyn Transport>,
    normalizer: Arc<dyn ListNormalizer>,
    config: RetrieverConfig,
}

impl ListRetriever {
    pub fn new(
        transport: Arc<dyn Transport>,
        normalizer: Arc<dyn ListNormalizer>,
        config: RetrieverConfig,
    ) -> Self {
        Self {
            transport,
            normalizer,
            config,
        }
    }

    pub fn config(&self) -> &RetrieverConfig {
        &self.config
    }

    /// Fetch the deck at `url` as a canonical plain-text list.
    ///
    /// Unsupported hosts fail before any request is made.
    pub async fn fetch(&self, url: &str) -> Result<String> {
        let parsed = Url::parse(url)
            .map_err(|e| DeckSyncError::UnsupportedSource(format!("{url}: {e}")))?;
        let source = DeckSource::from_url(&parsed).map_err(|e| {
            debug!(url, host = ?parsed.host_str(), "unexpected deck host");
            e
        })?;
        let export = source.export_url(&parsed);
        debug!(?source, export = %export, "fetching deck list");

        match source {
            DeckSource::TappedOut => {
                let resp = get_with_retry(self.transport.as_ref(), &export, &self.config.tappedout)
                    .await
                    .map_err(|e| {
                        error!(uri = %export, error = %e, "cannot get tappedout deck");
                        match e {
                            DeckSyncError::UpstreamStatus { url, status } => {
                                DeckSyncError::DeckUnavailable { url, status }
                            }
                            other => other,
                        }
                    })?;
                resp.into_text().map_err(|e| {
                    error!(uri = %export, error = %e, "tappedout deck is not text");
                    DeckSyncError::Normalize {
                        url: export.clone(),
                        reason: e.to_string(),
                    }
                })
            }
            DeckSource::Deckbox => {
                let resp = get_with_retry(self.transport.as_ref(), &export, &self.config.deckbox)
                    .await
                    .map_err(|e| {
                        error!(uri = %export, error = %e, "cannot get deckbox deck");
                        e
                    })?;
                let body = resp.into_text().map_err(|e| DeckSyncError::Normalize {
                    url: export.clone(),
                    reason: e.to_string(),
                })?;
                self.normalizer.normalize(&body).map_err(|e| {
                    error!(url = %export, error = %e, "unexpected format for deck");
                    DeckSyncError::Normalize {
                        url: export.clone(),
                        reason: e.to_string(),
                    }
                })
            }
        }
    }
}
