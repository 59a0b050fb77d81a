use crate::types::{ContentPart, FeedDecoder, RawEntry, RawFeed, RawFeedMeta};
use feed_rs::model::{Entry, Feed, Link, Text};
use feed_rs::parser;
use tracing::debug;

/// `FeedDecoder` backed by feed-rs. When the document does not parse as-is,
/// one lenient retry is made on a cleaned-up copy; a result obtained that
/// way is flagged as bozo.
#[derive(Debug, Default, Clone, Copy)]
pub struct FeedParser;

impl FeedParser {
    pub fn new() -> Self {
        Self
    }
}

impl FeedDecoder for FeedParser {
    fn decode(&self, body: &[u8]) -> RawFeed {
        debug!("Parsing feed content ({} bytes)", body.len());

        match parser::parse(body) {
            Ok(feed) => convert_feed(feed, false),
            Err(first_error) => {
                let cleaned = recover_document(body);
                match parser::parse(cleaned.as_bytes()) {
                    Ok(feed) => {
                        debug!("Feed parsed after cleanup (first attempt: {})", first_error);
                        convert_feed(feed, true)
                    }
                    Err(e) => {
                        debug!("Feed could not be parsed: {}", e);
                        RawFeed {
                            bozo: true,
                            ..RawFeed::default()
                        }
                    }
                }
            }
        }
    }
}

/// Drops anything before the first tag (BOMs, stray whitespace, server
/// banners) and replaces HTML-only entities that are not valid XML.
fn recover_document(body: &[u8]) -> String {
    let text = String::from_utf8_lossy(body);
    let start = text.find('<').unwrap_or(0);
    text[start..]
        .replace("&nbsp;", "&#160;")
        .replace("&ndash;", "&#8211;")
        .replace("&mdash;", "&#8212;")
        .replace("&ldquo;", "&#8220;")
        .replace("&rdquo;", "&#8221;")
        .replace("&lsquo;", "&#8216;")
        .replace("&rsquo;", "&#8217;")
        .replace("&hellip;", "&#8230;")
}

/// The page a feed or entry points at: the alternate link when marked,
/// otherwise the first one.
fn primary_link(links: &[Link]) -> Option<String> {
    links
        .iter()
        .find(|link| matches!(link.rel.as_deref(), None | Some("alternate")))
        .or_else(|| links.first())
        .map(|link| link.href.clone())
}

fn text_part(text: &Text) -> ContentPart {
    ContentPart::new(text.content_type.essence_str(), text.content.clone())
}

fn convert_feed(feed: Feed, bozo: bool) -> RawFeed {
    let meta = RawFeedMeta {
        title: feed.title.as_ref().map(|t| t.content.clone()),
        link: primary_link(&feed.links),
        updated_parsed: feed.updated,
        published_parsed: feed.published,
        ..RawFeedMeta::default()
    };

    let entries: Vec<RawEntry> = feed.entries.into_iter().map(convert_entry).collect();
    debug!("Parsed feed with {} entries", entries.len());

    RawFeed {
        bozo,
        feed: meta,
        entries,
    }
}

fn convert_entry(entry: Entry) -> RawEntry {
    let content = entry.content.as_ref().and_then(|content| {
        content.body.as_ref().map(|body| {
            vec![ContentPart::new(
                content.content_type.essence_str(),
                body.clone(),
            )]
        })
    });

    RawEntry {
        title: entry.title.as_ref().map(|t| t.content.clone()),
        link: primary_link(&entry.links),
        content,
        summary_detail: entry.summary.as_ref().map(text_part),
        title_detail: entry.title.as_ref().map(text_part),
        published_parsed: entry.published,
        updated_parsed: entry.updated,
        ..RawEntry::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RSS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Example Blog</title>
    <link>https://blog.example.com/</link>
    <description>Posts</description>
    <item>
      <title>Second post</title>
      <link>https://blog.example.com/second</link>
      <description>Second body</description>
      <pubDate>Tue, 05 Mar 2024 14:00:00 +0000</pubDate>
    </item>
    <item>
      <title>First post</title>
      <link>https://blog.example.com/first</link>
      <description>First body</description>
    </item>
  </channel>
</rss>"#;

    #[test]
    fn decodes_rss_channel_and_items() {
        let raw = FeedParser::new().decode(RSS.as_bytes());
        assert!(!raw.bozo);
        assert_eq!(raw.feed.title(), Some("Example Blog"));
        assert!(raw.feed.link().unwrap().starts_with("https://blog.example.com"));
        assert_eq!(raw.entries.len(), 2);
        assert_eq!(raw.entries[0].title(), Some("Second post"));
        assert_eq!(raw.entries[0].link(), Some("https://blog.example.com/second"));
        assert!(raw.entries[0].published_parsed.is_some());
        assert!(raw.entries[1].published.is_none());
        assert!(raw.entries[1].published_parsed.is_none());
    }

    #[test]
    fn garbage_before_document_still_yields_entries() {
        let body = format!("\u{FEFF}  warning: cache miss\n{}", &RSS[RSS.find("<rss").unwrap()..]);
        let raw = FeedParser::new().decode(body.as_bytes());
        assert_eq!(raw.feed.title(), Some("Example Blog"));
        assert_eq!(raw.entries.len(), 2);
    }

    #[test]
    fn undecodable_input_is_bozo_without_link() {
        let raw = FeedParser::new().decode(b"this is not a feed");
        assert!(raw.bozo);
        assert!(!raw.feed.has_link());
        assert!(raw.entries.is_empty());
    }
}
