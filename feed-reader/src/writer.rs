use crate::settings::{Settings, SiteOrder};
use crate::types::{FetchedSite, ReaderError, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const SITES_LIST_FILE: &str = "sites.json";

/// Receives the normalized output of a run. Sites are enqueued as they are
/// fetched and persisted together once every subscription was processed.
pub trait SiteWriter {
    fn enqueue(&mut self, fetched: FetchedSite);

    fn save(&mut self) -> Result<()>;
}

#[derive(Debug, Serialize)]
struct SitesList {
    sites: Vec<String>,
}

#[derive(Debug, Serialize)]
struct SiteDocument<'a> {
    title: &'a str,
    link: Option<&'a str>,
    category: Option<&'a str>,
    category_icon: Option<&'a str>,
    last_updated: i64,
    entries: BTreeMap<String, EntryDocument<'a>>,
}

#[derive(Debug, Serialize)]
struct EntryDocument<'a> {
    id: String,
    title: &'a str,
    date: i64,
    url: &'a str,
    content: &'a str,
}

/// Writes one `{site_id}.json` per site plus a `sites.json` index into the
/// data directory, for the static front-end to load.
pub struct JsonSiteWriter {
    output_path: PathBuf,
    settings: Settings,
    queue: Vec<FetchedSite>,
}

impl JsonSiteWriter {
    pub fn new(output_path: impl Into<PathBuf>, settings: Settings) -> Self {
        Self {
            output_path: output_path.into(),
            settings,
            queue: Vec::new(),
        }
    }

    pub fn queued(&self) -> &[FetchedSite] {
        &self.queue
    }

    pub fn site_data_path(&self, fetched: &FetchedSite) -> PathBuf {
        self.output_path.join(format!("{}.json", fetched.site.id()))
    }

    /// Final listing order. Title and recency ties fall back on the stable
    /// site id so reruns produce identical files.
    fn ordered(&self) -> Vec<&FetchedSite> {
        let mut sites: Vec<&FetchedSite> = self.queue.iter().collect();
        match self.settings.site_order {
            SiteOrder::Subscription => {}
            SiteOrder::Title => sites.sort_by(|a, b| {
                a.site
                    .title
                    .to_lowercase()
                    .cmp(&b.site.title.to_lowercase())
                    .then_with(|| a.site.id().cmp(&b.site.id()))
            }),
            SiteOrder::Recency => sites.sort_by(|a, b| {
                b.site
                    .last_updated
                    .cmp(&a.site.last_updated)
                    .then_with(|| a.site.id().cmp(&b.site.id()))
            }),
        }
        sites
    }

    fn save_site_data(&self, fetched: &FetchedSite) -> Result<()> {
        let site = &fetched.site;
        let mut entries = BTreeMap::new();
        for entry in &fetched.entries {
            let id = entry.id().to_string();
            let mut key = entry.published.timestamp().to_string();
            if entries.contains_key(&key) {
                warn!("{}: two entries published at {}, keeping both", site.title, key);
                key = format!("{}-{}", key, id);
            }
            entries.insert(
                key,
                EntryDocument {
                    id,
                    title: &entry.title,
                    date: entry.published.timestamp(),
                    url: &entry.link,
                    content: &entry.content,
                },
            );
        }

        let document = SiteDocument {
            title: &site.title,
            link: site.link.as_deref(),
            category: site.category.as_deref(),
            category_icon: self.settings.category_icon(site.category.as_deref()),
            last_updated: site.last_updated.timestamp(),
            entries,
        };

        let path = self.site_data_path(fetched);
        write_json(&path, &document)?;
        info!("> Written: {} ({} entries)", site.title, fetched.entries.len());
        Ok(())
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let raw = serde_json::to_string_pretty(value)?;
    fs::write(path, raw).map_err(|e| ReaderError::io(path, e))
}

impl SiteWriter for JsonSiteWriter {
    fn enqueue(&mut self, fetched: FetchedSite) {
        self.queue.push(fetched);
    }

    fn save(&mut self) -> Result<()> {
        fs::create_dir_all(&self.output_path).map_err(|e| ReaderError::io(&self.output_path, e))?;

        let mut listing = Vec::with_capacity(self.queue.len());
        for fetched in self.ordered() {
            self.save_site_data(fetched)?;
            listing.push(format!("{}.json", fetched.site.id()));
        }

        write_json(
            &self.output_path.join(SITES_LIST_FILE),
            &SitesList { sites: listing },
        )
    }
}
