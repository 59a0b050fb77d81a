use anyhow::Context;
use clap::Parser;
use feed_reader::{
    opml, FeedParser, FetchConfig, Fetcher, IngestionPipeline, JsonSiteWriter, RssAggregator, Settings,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Fetches every feed of an OPML subscription list and writes the data
/// files of the static reader site.
#[derive(Debug, Parser)]
#[command(name = "feed-reader", version, about)]
struct Cli {
    /// Data folder: holds the settings, the OPML file and the generated output
    data_path: PathBuf,

    /// OPML file name, relative to the data folder
    opml_filename: String,

    /// HTTP timeout per feed, in seconds
    #[arg(long, default_value_t = 15)]
    timeout: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    info!("Starting feed reader on {}", cli.data_path.display());

    let settings = Settings::load(&cli.data_path).context("loading settings")?;

    let opml_path = cli.data_path.join(&cli.opml_filename);
    let subscriptions = opml::read_subscriptions(&opml_path, &settings).map_err(|e| {
        error!("OPML file '{}' not found or unreadable", opml_path.display());
        e
    })?;

    let config = FetchConfig {
        timeout_seconds: cli.timeout,
        ..FetchConfig::default()
    };
    let transport = Arc::new(Fetcher::new(&config).context("building HTTP client")?);
    let aggregator = RssAggregator::new(transport, Arc::new(FeedParser::new()), config, settings.clone());
    let pipeline = IngestionPipeline::new(aggregator);

    let mut writer = JsonSiteWriter::new(&cli.data_path, settings.clone());
    let summary = pipeline.run(&subscriptions, &mut writer).await?;

    settings.save(&cli.data_path).context("saving settings")?;

    info!(
        "Feed reader finished: {} fetched, {} not modified, {} skipped",
        summary.fetched, summary.not_modified, summary.skipped
    );
    Ok(())
}
