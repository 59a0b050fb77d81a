pub mod types;
pub mod settings;
pub mod sanitize;
pub mod dates;
pub mod normalize;
pub mod fetcher;
pub mod parser;
pub mod aggregator;
pub mod pipeline;
pub mod opml;
pub mod writer;

pub use types::*;
pub use settings::{Settings, SiteOrder};
pub use fetcher::Fetcher;
pub use parser::FeedParser;
pub use aggregator::RssAggregator;
pub use pipeline::{IngestionPipeline, RunSummary};
pub use writer::{JsonSiteWriter, SiteWriter};
