#![allow(dead_code)]

use async_trait::async_trait;
use feed_reader::types::{
    FeedDecoder, FetchRequest, FetchedSite, HttpResponse, RawFeed, Transport, TransportError,
};
use feed_reader::writer::SiteWriter;
use std::collections::HashMap;
use std::sync::{Mutex, Once};

static INIT: Once = Once::new();

pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .try_init()
            .ok();
    });
}

/// Transport answering from a fixed script of url -> response.
#[derive(Default)]
pub struct ScriptedTransport {
    responses: HashMap<String, Result<HttpResponse, TransportError>>,
    requests: Mutex<Vec<FetchRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(mut self, url: &str, status: u16, body: &str) -> Self {
        self.responses
            .insert(url.to_string(), Ok(HttpResponse::new(status, body.as_bytes().to_vec())));
        self
    }

    pub fn fail(mut self, url: &str, error: TransportError) -> Self {
        self.responses.insert(url.to_string(), Err(error));
        self
    }

    pub fn requests(&self) -> Vec<FetchRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn get(&self, request: &FetchRequest) -> Result<HttpResponse, TransportError> {
        self.requests.lock().unwrap().push(request.clone());
        self.responses
            .get(&request.url)
            .cloned()
            .unwrap_or_else(|| Err(TransportError::Other(format!("unscripted url {}", request.url))))
    }
}

/// Decoder returning a prepared `RawFeed` for each known body.
#[derive(Default)]
pub struct StubDecoder {
    feeds: HashMap<String, RawFeed>,
}

impl StubDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, body: &str, feed: RawFeed) -> Self {
        self.feeds.insert(body.to_string(), feed);
        self
    }
}

impl FeedDecoder for StubDecoder {
    fn decode(&self, body: &[u8]) -> RawFeed {
        let key = String::from_utf8_lossy(body).to_string();
        self.feeds.get(&key).cloned().unwrap_or(RawFeed {
            bozo: true,
            ..RawFeed::default()
        })
    }
}

/// Writer keeping everything in memory.
#[derive(Default)]
pub struct MemoryWriter {
    pub sites: Vec<FetchedSite>,
    pub saved: bool,
}

impl SiteWriter for MemoryWriter {
    fn enqueue(&mut self, fetched: FetchedSite) {
        self.sites.push(fetched);
    }

    fn save(&mut self) -> feed_reader::Result<()> {
        self.saved = true;
        Ok(())
    }
}
