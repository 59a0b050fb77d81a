use crate::types::{FetchConfig, FetchRequest, HttpResponse, Result, Transport, TransportError};
use async_trait::async_trait;
use reqwest::header::LOCATION;
use reqwest::{Client, Response};
use std::error::Error as StdError;
use tracing::debug;
use url::Url;

/// Fragments resolvers put in their error messages when a host name does
/// not resolve.
const HOST_RESOLUTION_MARKERS: &[&str] = &[
    "dns error",
    "failed to lookup address",
    "name or service not known",
    "nodename nor servname",
    "no such host",
    "temporary failure in name resolution",
];

/// HTTP transport over reqwest. Redirects are followed here rather than by
/// the client, so a permanent move along the way is still reported as 301
/// while the body comes from the final location.
pub struct Fetcher {
    client: Client,
    follow_redirects: bool,
    max_redirects: usize,
}

impl Fetcher {
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .gzip(true)
            .deflate(true)
            .brotli(true)
            .redirect(reqwest::redirect::Policy::none())
            .build()?;

        Ok(Self {
            client,
            follow_redirects: config.follow_redirects,
            max_redirects: config.max_redirects,
        })
    }

    async fn send(&self, url: Url, request: &FetchRequest) -> std::result::Result<Response, TransportError> {
        let mut builder = self.client.get(url).timeout(request.timeout);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        builder.send().await.map_err(classify_error)
    }
}

/// Next location of a redirecting response, resolved against the url that
/// produced it.
fn redirect_target(status: u16, location: Option<&str>, current: &Url) -> Option<Url> {
    if !matches!(status, 301 | 302 | 303 | 307 | 308) {
        return None;
    }
    current.join(location?).ok()
}

/// Status handed to the orchestrator once the chain settles. A moved feed
/// that was served successfully shows up as 301; failures keep their own
/// status.
fn reported_status(hops: &[u16], final_status: u16) -> u16 {
    if hops.contains(&301) && (200..300).contains(&final_status) {
        301
    } else {
        final_status
    }
}

fn is_host_resolution_failure(error: &(dyn StdError + 'static)) -> bool {
    let mut source = Some(error);
    while let Some(err) = source {
        let message = err.to_string().to_lowercase();
        if HOST_RESOLUTION_MARKERS.iter().any(|marker| message.contains(marker)) {
            return true;
        }
        source = err.source();
    }
    false
}

/// Splits reqwest failures into the two kinds the orchestrator cares about.
pub fn classify_error(error: reqwest::Error) -> TransportError {
    if is_host_resolution_failure(&error) {
        TransportError::HostUnresolved(error.to_string())
    } else {
        TransportError::Other(error.to_string())
    }
}

#[async_trait]
impl Transport for Fetcher {
    async fn get(&self, request: &FetchRequest) -> std::result::Result<HttpResponse, TransportError> {
        debug!("Fetching feed: {}", request.url);

        let mut url = Url::parse(&request.url).map_err(|e| TransportError::Other(e.to_string()))?;
        let mut hops = Vec::new();

        loop {
            let response = self.send(url.clone(), request).await?;
            let status = response.status().as_u16();

            if self.follow_redirects {
                let location = response.headers().get(LOCATION).and_then(|v| v.to_str().ok());
                if let Some(next) = redirect_target(status, location, &url) {
                    if hops.len() >= self.max_redirects {
                        return Err(TransportError::Other(format!(
                            "too many redirects fetching {}",
                            request.url
                        )));
                    }
                    debug!("{} redirected ({}) to {}", url, status, next);
                    hops.push(status);
                    url = next;
                    continue;
                }
            }

            let body = response.bytes().await.map_err(classify_error)?;
            let status = reported_status(&hops, status);
            debug!("Fetched {} ({} bytes, status {})", request.url, body.len(), status);
            return Ok(HttpResponse::new(status, body.to_vec()));
        }
    }
}
