use crate::aggregator::RssAggregator;
use crate::types::{Result, Subscription};
use crate::writer::SiteWriter;
use chrono::{DateTime, Utc};
use tracing::{info, warn};
use url::Url;

/// Outcome counters of one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub fetched: usize,
    pub not_modified: usize,
    pub skipped: usize,
}

/// Only http(s) URLs are worth handing to the transport.
pub fn is_valid_feed_url(url: &str) -> bool {
    Url::parse(url)
        .map(|url| matches!(url.scheme(), "http" | "https"))
        .unwrap_or(false)
}

/// Processes the subscription list one site at a time, in order. A site
/// that fails is logged and left out; the rest of the batch carries on.
pub struct IngestionPipeline {
    aggregator: RssAggregator,
}

impl IngestionPipeline {
    pub fn new(aggregator: RssAggregator) -> Self {
        Self { aggregator }
    }

    pub async fn run(&self, subscriptions: &[Subscription], writer: &mut dyn SiteWriter) -> Result<RunSummary> {
        self.run_at(subscriptions, writer, Utc::now()).await
    }

    pub async fn run_at(
        &self,
        subscriptions: &[Subscription],
        writer: &mut dyn SiteWriter,
        now: DateTime<Utc>,
    ) -> Result<RunSummary> {
        let mut summary = RunSummary::default();

        for subscription in subscriptions {
            if !is_valid_feed_url(&subscription.url) {
                warn!("Skipping subscription with invalid url: {}", subscription.url);
                summary.skipped += 1;
                continue;
            }

            match self.aggregator.fetch_site_at(subscription, now).await {
                Ok(fetched) => {
                    if fetched.is_not_modified() {
                        summary.not_modified += 1;
                    } else {
                        summary.fetched += 1;
                    }
                    writer.enqueue(fetched);
                }
                Err(error) => {
                    warn!("Site skipped: {}", error);
                    summary.skipped += 1;
                }
            }
        }

        writer.save()?;

        info!(
            "Run finished: {} fetched, {} not modified, {} skipped",
            summary.fetched, summary.not_modified, summary.skipped
        );
        Ok(summary)
    }
}
