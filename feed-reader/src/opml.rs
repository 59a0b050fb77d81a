use crate::settings::Settings;
use crate::types::{ReaderError, Result, Subscription};
use quick_xml::de::from_str;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

#[derive(Debug, Deserialize)]
struct Opml {
    body: Body,
}

#[derive(Debug, Deserialize)]
struct Body {
    #[serde(rename = "outline", default)]
    outlines: Vec<Outline>,
}

#[derive(Debug, Deserialize)]
struct Outline {
    #[serde(rename = "@type")]
    kind: Option<String>,
    #[serde(rename = "@xmlUrl")]
    xml_url: Option<String>,
    #[serde(rename = "@title")]
    title: Option<String>,
    #[serde(rename = "outline", default)]
    children: Vec<Outline>,
}

impl Outline {
    fn feed_url(&self) -> Option<&str> {
        let is_rss = self
            .kind
            .as_deref()
            .is_some_and(|kind| kind.eq_ignore_ascii_case("rss"));
        if is_rss {
            self.xml_url.as_deref().filter(|url| !url.is_empty())
        } else {
            None
        }
    }
}

fn collect(outlines: &[Outline], category: Option<&str>, out: &mut Vec<Subscription>) {
    for outline in outlines {
        if let Some(url) = outline.feed_url() {
            out.push(Subscription {
                url: url.to_string(),
                title: outline.title.clone(),
                category: category.map(str::to_string),
            });
        }
        // a nested outline's category is the title of the outline holding it
        collect(&outline.children, outline.title.as_deref(), out);
    }
}

/// Every feed outline of an OPML document, in document order.
pub fn parse_opml(xml: &str) -> Result<Vec<Subscription>> {
    let opml: Opml = from_str(xml).map_err(|e| ReaderError::Opml(e.to_string()))?;
    let mut subscriptions = Vec::new();
    collect(&opml.body.outlines, None, &mut subscriptions);
    Ok(subscriptions)
}

/// Reads the subscription list, leaving out URLs the settings skip.
pub fn read_subscriptions(path: &Path, settings: &Settings) -> Result<Vec<Subscription>> {
    let xml = fs::read_to_string(path).map_err(|e| ReaderError::io(path, e))?;
    let subscriptions = parse_opml(&xml)?;
    let total = subscriptions.len();

    let subscriptions: Vec<Subscription> = subscriptions
        .into_iter()
        .filter(|subscription| {
            let skipped = settings.is_skipped_url(&subscription.url);
            if skipped {
                debug!("Skipping subscription {}", subscription.url);
            }
            !skipped
        })
        .collect();

    info!(
        "Loaded {} subscriptions from {} ({} skipped)",
        subscriptions.len(),
        path.display(),
        total - subscriptions.len()
    );
    Ok(subscriptions)
}

#[cfg(test)]
mod tests {
    use super::*;

    const OPML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<opml version="1.0">
  <head><title>Subscriptions</title></head>
  <body>
    <outline text="Loose" title="Loose" type="rss" xmlUrl="https://loose.example/feed" />
    <outline text="Tech" title="Tech">
      <outline text="Rust" title="Rust Blog" type="rss" xmlUrl="https://blog.rust.example/feed.xml" />
      <outline text="No type" title="No type" xmlUrl="https://untyped.example/rss" />
      <outline text="Untitled" type="rss" xmlUrl="https://untitled.example/atom" />
    </outline>
  </body>
</opml>"#;

    #[test]
    fn finds_feeds_with_categories() {
        let subscriptions = parse_opml(OPML).unwrap();
        assert_eq!(
            subscriptions,
            vec![
                Subscription::new("https://loose.example/feed").with_title("Loose"),
                Subscription::new("https://blog.rust.example/feed.xml")
                    .with_title("Rust Blog")
                    .with_category("Tech"),
                Subscription::new("https://untitled.example/atom").with_category("Tech"),
            ]
        );
    }

    #[test]
    fn skip_prefixes_are_applied() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("subscriptions.xml");
        fs::write(&path, OPML).unwrap();

        let settings = Settings {
            skip_urls: vec!["https://loose.example".into()],
            ..Settings::default()
        };
        let subscriptions = read_subscriptions(&path, &settings).unwrap();
        assert_eq!(subscriptions.len(), 2);
        assert!(subscriptions.iter().all(|s| !s.url.starts_with("https://loose.example")));
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = read_subscriptions(&dir.path().join("nope.xml"), &Settings::default());
        assert!(matches!(result, Err(ReaderError::Io { .. })));
    }
}
