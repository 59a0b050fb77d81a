use crate::normalize;
use crate::settings::Settings;
use crate::types::{
    Entry, FeedDecoder, FetchConfig, FetchRequest, FetchedSite, RawFeed, Site, SiteError, Subscription,
    Transport, TransportError,
};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Drives one subscription through transport, response classification,
/// normalization and ranking.
pub struct RssAggregator {
    transport: Arc<dyn Transport>,
    decoder: Arc<dyn FeedDecoder>,
    config: FetchConfig,
    settings: Settings,
}

impl RssAggregator {
    pub fn new(
        transport: Arc<dyn Transport>,
        decoder: Arc<dyn FeedDecoder>,
        config: FetchConfig,
        settings: Settings,
    ) -> Self {
        Self {
            transport,
            decoder,
            config,
            settings,
        }
    }

    pub async fn fetch_site(&self, subscription: &Subscription) -> Result<FetchedSite, SiteError> {
        self.fetch_site_at(subscription, Utc::now()).await
    }

    /// Same as [`fetch_site`](Self::fetch_site) with an explicit notion of
    /// "now", used for synthetic dates and the age cutoff.
    pub async fn fetch_site_at(
        &self,
        subscription: &Subscription,
        now: DateTime<Utc>,
    ) -> Result<FetchedSite, SiteError> {
        let url = subscription.url.as_str();
        let label = subscription.title.as_deref().unwrap_or("(untitled)");

        let request = FetchRequest {
            url: url.to_string(),
            headers: vec![("User-Agent".to_string(), self.config.user_agent.clone())],
            timeout: Duration::from_secs(self.config.timeout_seconds),
        };

        let response = match self.transport.get(&request).await {
            Ok(response) => response,
            Err(TransportError::HostUnresolved(_)) => {
                warn!("{} ({}) skipped, error fetching url", label, url);
                return Err(SiteError::HostUnresolved { url: url.to_string() });
            }
            Err(TransportError::Other(message)) => {
                warn!("{} ({}) skipped. Error: {}", label, url, message);
                return Err(SiteError::Transport {
                    url: url.to_string(),
                    message,
                });
            }
        };

        if response.status == 304 {
            warn!("304 returned for: {}", label);
            return Ok(FetchedSite {
                site: not_modified_site(subscription),
                entries: Vec::new(),
            });
        }

        let feed = self.decoder.decode(&response.body);
        classify(url, label, &feed, response.status)?;

        let mut site = normalize::site(
            Some(&feed.feed),
            subscription.title.as_deref(),
            subscription.category.as_deref(),
        );

        let count = feed.entries.len();
        let entries: Vec<Entry> = feed
            .entries
            .iter()
            .enumerate()
            .filter_map(|(index, raw)| normalize::entry(raw, &site, now, index, count - index - 1))
            .collect();

        let entries = select_entries(entries, &self.settings, now);

        if let Some(latest) = entries.first() {
            site.last_updated = site.last_updated.max(latest.published);
        }

        info!("> Fetched: {}", site.title);
        Ok(FetchedSite { site, entries })
    }
}

/// Decides whether a decoded response is usable. Returns the error that
/// makes this site be skipped, and only logs the conditions that are not
/// fatal.
pub fn classify(url: &str, label: &str, feed: &RawFeed, status: u16) -> Result<(), SiteError> {
    if feed.bozo {
        warn!("{} ({}) bozo=1 http_status:{}", label, url, status);
    }

    if status == 410 {
        warn!("{} ({}) skipped, received http_status:{} Url gone", label, url, status);
        return Err(SiteError::Gone { url: url.to_string() });
    }

    if matches!(status, 401 | 403 | 404) {
        warn!(
            "{} ({}) skipped, feed malformed/not retrieved. HTTPStatus: {}",
            label, url, status
        );
        return Err(SiteError::Rejected {
            url: url.to_string(),
            status,
        });
    }

    if !feed.feed.has_link() {
        warn!(
            "{} ({}) skipped, feed malformed/not retrieved. HTTPStatus: {}",
            label, url, status
        );
        return Err(SiteError::MissingLink {
            url: url.to_string(),
            status,
        });
    }

    if status == 301 {
        warn!("{} ({}) has moved ({}) Check new URL", label, url, status);
    }

    Ok(())
}

/// Title filters, newest first, per-feed limit, then the age cutoff.
pub fn select_entries(entries: Vec<Entry>, settings: &Settings, now: DateTime<Utc>) -> Vec<Entry> {
    let mut entries: Vec<Entry> = entries
        .into_iter()
        .filter(|entry| !settings.is_skipped_title(&entry.title))
        .collect();

    entries.sort_by(|a, b| b.published.cmp(&a.published));
    separate_publish_times(&mut entries);
    entries.truncate(settings.num_entries_per_feed);

    if let Some(min_published) = settings.min_published(now) {
        entries.retain(|entry| entry.published >= min_published);
    }

    entries
}

/// Makes whole-second publish times strictly decreasing over a list already
/// sorted newest first. An entry that is not at least one second older than
/// its predecessor is moved to one second before it.
fn separate_publish_times(entries: &mut [Entry]) {
    for i in 1..entries.len() {
        let previous = entries[i - 1].published;
        if entries[i].published.timestamp() >= previous.timestamp() {
            entries[i].published = previous - chrono::Duration::seconds(1);
        }
    }
}

/// Placeholder kept for a site that answered "not modified".
pub fn not_modified_site(subscription: &Subscription) -> Site {
    normalize::site(
        None,
        subscription.title.as_deref(),
        subscription.category.as_deref(),
    )
}
