use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

pub use interfaces::defs::{
    ContentPart, FeedDecoder, FetchRequest, HttpResponse, RawEntry, RawFeed, RawFeedMeta,
    Subscription, Transport, TransportError,
};

#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub user_agent: String,
    pub timeout_seconds: u64,
    pub follow_redirects: bool,
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: format!("feed-reader/{}", env!("CARGO_PKG_VERSION")),
            timeout_seconds: 15,
            follow_redirects: true,
            max_redirects: 5,
        }
    }
}

/// Stable handle of a site, derived from its link (or title when the link is
/// unknown). Used as the output filename.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SiteId(Uuid);

impl SiteId {
    pub fn derive(link: Option<&str>, title: &str) -> Self {
        let key = link.unwrap_or(title);
        Self(Uuid::new_v5(&Uuid::NAMESPACE_URL, key.as_bytes()))
    }
}

impl fmt::Display for SiteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

/// Stable handle of an entry. Link and title together, since some feeds
/// reuse one link for every entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntryId(Uuid);

impl EntryId {
    pub fn derive(link: &str, title: &str) -> Self {
        let key = format!("{}{}", link, title);
        Self(Uuid::new_v5(&Uuid::NAMESPACE_URL, key.as_bytes()))
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Site {
    pub title: String,
    pub link: Option<String>,
    pub category: Option<String>,
    pub last_updated: DateTime<Utc>,
}

impl Site {
    /// Timestamps at or before year 1900 are placeholders some feeds emit;
    /// they collapse to the epoch like a missing value.
    pub fn new(
        title: String,
        link: Option<String>,
        category: Option<String>,
        last_updated: Option<DateTime<Utc>>,
    ) -> Self {
        let last_updated = last_updated
            .filter(|ts| ts.year() > 1900)
            .unwrap_or(DateTime::UNIX_EPOCH);

        Self {
            title,
            link,
            category,
            last_updated,
        }
    }

    pub fn id(&self) -> SiteId {
        SiteId::derive(self.link.as_deref(), &self.title)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Entry {
    pub title: String,
    pub link: String,
    pub content: String,
    pub published: DateTime<Utc>,
    pub site_id: SiteId,
}

impl Entry {
    pub fn id(&self) -> EntryId {
        EntryId::derive(&self.link, &self.title)
    }
}

/// One processed site together with its final, already sorted and filtered
/// entries.
#[derive(Debug, Clone)]
pub struct FetchedSite {
    pub site: Site,
    pub entries: Vec<Entry>,
}

impl FetchedSite {
    /// Only the placeholder built for a 304 response lacks a site link; a
    /// fetched feed without one is rejected.
    pub fn is_not_modified(&self) -> bool {
        self.site.link.is_none()
    }
}

/// Conditions that abort processing of a single site. The ingestion pipeline
/// logs them and moves on to the next subscription.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SiteError {
    #[error("{url}: host could not be resolved")]
    HostUnresolved { url: String },

    #[error("{url}: transport error: {message}")]
    Transport { url: String, message: String },

    #[error("{url}: feed malformed or not retrieved (http status {status})")]
    MissingLink { url: String, status: u16 },

    #[error("{url}: rejected with http status {status}")]
    Rejected { url: String, status: u16 },

    #[error("{url}: resource gone (http status 410)")]
    Gone { url: String },
}

#[derive(Debug, thiserror::Error)]
pub enum ReaderError {
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("OPML error: {0}")]
    Opml(String),

    #[error("IO error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ReaderError {
    pub fn io(path: impl AsRef<std::path::Path>, source: std::io::Error) -> Self {
        ReaderError::Io {
            path: path.as_ref().display().to_string(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, ReaderError>;
