use crate::dates::{parse_timestamp, resolve_published};
use crate::sanitize::{absolutize, sanitize_content, site_origin};
use crate::types::{ContentPart, Entry, RawEntry, RawFeedMeta, Site};
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

static LAST_UNTITLED_CLOCK: AtomicU64 = AtomicU64::new(0);

/// Nanosecond clock value that never repeats within the process.
fn unique_clock_value() -> u64 {
    let now = Utc::now()
        .timestamp_nanos_opt()
        .and_then(|n| u64::try_from(n).ok())
        .unwrap_or_default();

    let previous = LAST_UNTITLED_CLOCK
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
            Some(now.max(last + 1))
        })
        .unwrap_or_default();
    now.max(previous + 1)
}

/// Drops characters that cannot be rendered (control characters and the
/// replacement character left behind by lossy decoding).
pub fn clean_title(title: &str) -> String {
    title
        .chars()
        .filter(|c| !c.is_control() && *c != char::REPLACEMENT_CHARACTER)
        .collect::<String>()
        .trim()
        .to_string()
}

fn site_title(feed: Option<&RawFeedMeta>, provided_title: Option<&str>) -> String {
    if let Some(title) = provided_title.filter(|t| !t.is_empty()) {
        return title.to_string();
    }

    match feed.and_then(RawFeedMeta::title) {
        Some(title) => clean_title(title),
        None => format!("untitled{}", unique_clock_value()),
    }
}

fn feed_last_updated(feed: &RawFeedMeta) -> Option<DateTime<Utc>> {
    feed.updated_parsed
        .or_else(|| feed.updated.as_deref().and_then(parse_timestamp))
        .or(feed.published_parsed)
        .or_else(|| feed.published.as_deref().and_then(parse_timestamp))
}

/// Builds the site for a fetched feed, or the placeholder for a
/// not-modified response when `feed` is `None`.
pub fn site(feed: Option<&RawFeedMeta>, provided_title: Option<&str>, category: Option<&str>) -> Site {
    Site::new(
        site_title(feed, provided_title),
        feed.and_then(RawFeedMeta::link).map(str::to_string),
        category.map(str::to_string),
        feed.and_then(feed_last_updated),
    )
}

fn pick_representation(parts: &[ContentPart]) -> Option<&str> {
    let by_type = |wanted: &str| {
        parts
            .iter()
            .find(|part| part.content_type.eq_ignore_ascii_case(wanted))
            .map(|part| part.value.as_str())
    };
    by_type("text/html").or_else(|| by_type("text/plain"))
}

/// Raw HTML of an entry. Feeds fill these fields inconsistently, sometimes
/// differently from one entry to the next, so each entry is inspected on
/// its own.
pub fn extract_content(entry: &RawEntry) -> String {
    let content = if let Some(parts) = entry.content() {
        pick_representation(parts)
    } else if let Some(summary) = entry.summary_detail() {
        Some(summary.value.as_str())
    } else {
        entry.title_detail().map(|title| title.value.as_str())
    };

    content.unwrap_or_default().to_string()
}

/// Builds one entry. Returns `None` when the upstream item has no link to
/// point at.
pub fn entry(
    raw: &RawEntry,
    parent: &Site,
    now: DateTime<Utc>,
    index: usize,
    reverse_index: usize,
) -> Option<Entry> {
    let Some(link) = raw.link() else {
        debug!("Dropping entry without link in {}: {:?}", parent.title, raw.title());
        return None;
    };

    let origin = parent.link.as_deref().and_then(site_origin);
    let origin = origin.as_deref();

    Some(Entry {
        title: raw.title().unwrap_or_default().to_string(),
        link: absolutize(link, origin),
        content: sanitize_content(&extract_content(raw), origin),
        published: resolve_published(raw, now, index, reverse_index),
        site_id: parent.id(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn feed_meta() -> RawFeedMeta {
        RawFeedMeta {
            title: Some("Upstream\u{0007} Title\u{FFFD} ".into()),
            link: Some("http://blog.example.com/".into()),
            updated: Some("2024-04-01T10:00:00Z".into()),
            ..RawFeedMeta::default()
        }
    }

    #[test]
    fn site_title_precedence() {
        let meta = feed_meta();
        assert_eq!(site(Some(&meta), Some("Mine"), None).title, "Mine");
        assert_eq!(site(Some(&meta), None, None).title, "Upstream Title");
        assert_eq!(site(Some(&meta), Some(""), None).title, "Upstream Title");

        let a = site(None, None, None).title;
        let b = site(None, None, None).title;
        assert!(a.starts_with("untitled"));
        assert_ne!(a, b);
    }

    #[test]
    fn site_metadata_from_feed() {
        let meta = feed_meta();
        let s = site(Some(&meta), None, Some("Tech"));
        assert_eq!(s.link.as_deref(), Some("http://blog.example.com/"));
        assert_eq!(s.category.as_deref(), Some("Tech"));
        assert_eq!(s.last_updated, Utc.with_ymd_and_hms(2024, 4, 1, 10, 0, 0).unwrap());

        let not_modified = site(None, Some("Mine"), Some("Tech"));
        assert_eq!(not_modified.link, None);
        assert_eq!(not_modified.last_updated, DateTime::UNIX_EPOCH);
    }

    #[test]
    fn content_precedence() {
        let mut raw = RawEntry {
            content: Some(vec![ContentPart::plain("plain"), ContentPart::html("<p>html</p>")]),
            summary_detail: Some(ContentPart::html("summary")),
            title_detail: Some(ContentPart::plain("title")),
            ..RawEntry::default()
        };
        assert_eq!(extract_content(&raw), "<p>html</p>");

        raw.content = Some(vec![ContentPart::plain("plain")]);
        assert_eq!(extract_content(&raw), "plain");

        raw.content = Some(vec![ContentPart::new("application/xhtml+xml", "x")]);
        assert_eq!(extract_content(&raw), "");

        raw.content = None;
        assert_eq!(extract_content(&raw), "summary");

        raw.summary_detail = None;
        assert_eq!(extract_content(&raw), "title");

        raw.title_detail = None;
        assert_eq!(extract_content(&raw), "");
    }

    #[test]
    fn entry_links_rewritten_against_site_origin() {
        let parent = site(Some(&feed_meta()), None, None);
        let raw = RawEntry {
            title: Some("Post".into()),
            link: Some("/2024/post".into()),
            summary_detail: Some(ContentPart::html(
                r#"<a href="/tag/rust">rust</a><script>track()</script>"#,
            )),
            published_parsed: Some(Utc.with_ymd_and_hms(2024, 4, 1, 0, 0, 0).unwrap()),
            ..RawEntry::default()
        };
        let now = Utc.with_ymd_and_hms(2024, 10, 1, 0, 0, 0).unwrap();

        let e = entry(&raw, &parent, now, 0, 0).unwrap();
        assert_eq!(e.link, "https://blog.example.com/2024/post");
        assert_eq!(
            e.content,
            r#"<a target="_blank" href="https://blog.example.com/tag/rust">rust</a>"#
        );
        assert_eq!(e.site_id, parent.id());
    }

    #[test]
    fn entry_without_link_is_dropped() {
        let parent = site(Some(&feed_meta()), None, None);
        let raw = RawEntry {
            title: Some("No link".into()),
            ..RawEntry::default()
        };
        assert!(entry(&raw, &parent, Utc::now(), 0, 0).is_none());
    }
}
