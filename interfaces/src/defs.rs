use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Duration;

/// One line of the subscription list: where to fetch, and how the user
/// labelled it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    pub url: String,
    pub title: Option<String>,
    pub category: Option<String>,
}

impl Subscription {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: None,
            category: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }
}

#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    #[error("host resolution failed: {0}")]
    HostUnresolved(String),

    #[error("request failed: {0}")]
    Other(String),
}

/// A typed representation of a piece of upstream content (`text/html`,
/// `text/plain`, ...).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentPart {
    pub content_type: String,
    pub value: String,
}

impl ContentPart {
    pub fn new(content_type: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            content_type: content_type.into(),
            value: value.into(),
        }
    }

    pub fn html(value: impl Into<String>) -> Self {
        Self::new("text/html", value)
    }

    pub fn plain(value: impl Into<String>) -> Self {
        Self::new("text/plain", value)
    }
}

/// Top-level metadata of an upstream feed. Every field is optional because
/// upstream feeds populate an arbitrary subset of them.
#[derive(Debug, Clone, Default)]
pub struct RawFeedMeta {
    pub title: Option<String>,
    pub link: Option<String>,
    pub updated: Option<String>,
    pub updated_parsed: Option<DateTime<Utc>>,
    pub published: Option<String>,
    pub published_parsed: Option<DateTime<Utc>>,
}

impl RawFeedMeta {
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn link(&self) -> Option<&str> {
        self.link.as_deref().filter(|link| !link.is_empty())
    }

    pub fn has_link(&self) -> bool {
        self.link().is_some()
    }
}

/// One upstream item, with the same presence-checked accessors as the feed
/// metadata.
#[derive(Debug, Clone, Default)]
pub struct RawEntry {
    pub title: Option<String>,
    pub link: Option<String>,
    pub content: Option<Vec<ContentPart>>,
    pub summary_detail: Option<ContentPart>,
    pub title_detail: Option<ContentPart>,
    pub published: Option<String>,
    pub published_parsed: Option<DateTime<Utc>>,
    pub updated: Option<String>,
    pub updated_parsed: Option<DateTime<Utc>>,
}

impl RawEntry {
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn link(&self) -> Option<&str> {
        self.link.as_deref().filter(|link| !link.is_empty())
    }

    pub fn content(&self) -> Option<&[ContentPart]> {
        self.content.as_deref()
    }

    pub fn summary_detail(&self) -> Option<&ContentPart> {
        self.summary_detail.as_ref()
    }

    pub fn title_detail(&self) -> Option<&ContentPart> {
        self.title_detail.as_ref()
    }
}

/// A decoded feed document.
#[derive(Debug, Clone, Default)]
pub struct RawFeed {
    /// Set when the document was malformed but a best-effort parse was
    /// still produced.
    pub bozo: bool,
    pub feed: RawFeedMeta,
    pub entries: Vec<RawEntry>,
}

// Collaborator note:
// The core never talks to the network or an XML library directly. It asks a
// `Transport` for bytes and a `FeedDecoder` for a `RawFeed`, so both can be
// swapped for scripted implementations in tests.

#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, request: &FetchRequest) -> Result<HttpResponse, TransportError>;
}

pub trait FeedDecoder: Send + Sync {
    /// Never fails: undecodable input yields a `RawFeed` with `bozo` set and
    /// empty metadata.
    fn decode(&self, body: &[u8]) -> RawFeed;
}
