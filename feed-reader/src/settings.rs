use crate::types::{ReaderError, Result};
use chrono::{DateTime, Months, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const SETTINGS_FILENAME: &str = "settings-v2.json";
pub const DEFAULT_ENTRIES_PER_FEED: usize = 10;

/// How the final site listing is ordered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SiteOrder {
    #[default]
    Subscription,
    Title,
    Recency,
}

/// User-editable settings, read once per run and then treated as immutable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Subscriptions whose URL starts with any of these are not fetched.
    pub skip_urls: Vec<String>,
    /// Category title -> icon shown next to it by the renderer.
    #[serde(rename = "category_emoji_icons")]
    pub category_icons: BTreeMap<String, String>,
    /// Entries whose title contains any of these (case-insensitive) are dropped.
    pub skip_filters: Vec<String>,
    pub num_entries_per_feed: usize,
    pub entry_max_age_months: Option<u32>,
    pub site_order: SiteOrder,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            skip_urls: Vec::new(),
            category_icons: BTreeMap::new(),
            skip_filters: Vec::new(),
            num_entries_per_feed: DEFAULT_ENTRIES_PER_FEED,
            entry_max_age_months: None,
            site_order: SiteOrder::default(),
        }
    }
}

impl Settings {
    pub fn path_in(data_path: &Path) -> PathBuf {
        data_path.join(SETTINGS_FILENAME)
    }

    /// Loads settings from the data directory. A missing file yields the
    /// defaults.
    pub fn load(data_path: &Path) -> Result<Self> {
        let path = Self::path_in(data_path);
        if !path.exists() {
            debug!("No settings file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(&path).map_err(|e| ReaderError::io(&path, e))?;
        let settings: Settings = serde_json::from_str(&raw)?;
        info!("> Skip urls list: {:?}", settings.skip_urls);
        Ok(settings)
    }

    pub fn save(&self, data_path: &Path) -> Result<()> {
        let path = Self::path_in(data_path);
        let raw = serde_json::to_string(self)?;
        fs::write(&path, raw).map_err(|e| ReaderError::io(&path, e))?;
        Ok(())
    }

    pub fn is_skipped_url(&self, url: &str) -> bool {
        self.skip_urls.iter().any(|prefix| url.starts_with(prefix.as_str()))
    }

    pub fn is_skipped_title(&self, title: &str) -> bool {
        let title = title.to_uppercase();
        self.skip_filters
            .iter()
            .any(|filter| title.contains(&filter.to_uppercase()))
    }

    pub fn category_icon(&self, category: Option<&str>) -> Option<&str> {
        category
            .and_then(|c| self.category_icons.get(c))
            .map(String::as_str)
    }

    /// Oldest publish time an entry may have, if age filtering is enabled.
    pub fn min_published(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let months = self.entry_max_age_months.filter(|m| *m > 0)?;
        Some(
            now.checked_sub_months(Months::new(months))
                .unwrap_or(DateTime::UNIX_EPOCH),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn partial_file_falls_back_to_defaults() {
        let settings: Settings =
            serde_json::from_str(r#"{"skip_urls": ["https://dead.example"]}"#).unwrap();
        assert_eq!(settings.skip_urls, vec!["https://dead.example".to_string()]);
        assert_eq!(settings.num_entries_per_feed, DEFAULT_ENTRIES_PER_FEED);
        assert_eq!(settings.entry_max_age_months, None);
        assert_eq!(settings.site_order, SiteOrder::Subscription);
    }

    #[test]
    fn load_missing_file_gives_defaults_and_save_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(Settings::load(dir.path()).unwrap(), Settings::default());

        let mut settings = Settings::default();
        settings.category_icons.insert("Tech".into(), "💻".into());
        settings.site_order = SiteOrder::Recency;
        settings.save(dir.path()).unwrap();

        let raw = fs::read_to_string(Settings::path_in(dir.path())).unwrap();
        assert!(raw.contains("category_emoji_icons"));
        assert_eq!(Settings::load(dir.path()).unwrap(), settings);
    }

    #[test]
    fn title_filters_ignore_case() {
        let settings = Settings {
            skip_filters: vec!["sponsored".into()],
            ..Settings::default()
        };
        assert!(settings.is_skipped_title("[SPONSORED] Buy this"));
        assert!(!settings.is_skipped_title("A regular post"));
    }

    #[test]
    fn age_cutoff_disabled_without_months() {
        let now = Utc.with_ymd_and_hms(2024, 5, 20, 12, 0, 0).unwrap();
        assert_eq!(Settings::default().min_published(now), None);

        let settings = Settings {
            entry_max_age_months: Some(1),
            ..Settings::default()
        };
        assert_eq!(
            settings.min_published(now),
            Some(Utc.with_ymd_and_hms(2024, 4, 20, 12, 0, 0).unwrap())
        );
    }
}
