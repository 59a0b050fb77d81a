//! Textual rewrites applied to upstream HTML before it is embedded in the
//! generated site.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static SCRIPT_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<script\b[^>]*>.*?</script\s*>").unwrap());

static IMG_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<img\b[^>]*>").unwrap());

static BUTTON_CLASS: Lazy<Regex> = Lazy::new(|| Regex::new(r#"(?i)\s+class="button""#).unwrap());

static ANCHOR_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<a\b[^>]*>").unwrap());

static ROOT_RELATIVE_ATTR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)(\s(?:href|src)\s*=\s*)(["'])(/[^"'\s>]*)(["'])"#).unwrap()
});

/// Scheme and host of a site link, always as `https://{host}`. Several feeds
/// report their own address as plain http even when served over https.
pub fn site_origin(site_link: &str) -> Option<String> {
    let without_scheme = strip_scheme(site_link.trim());
    let host = without_scheme.split('/').next().unwrap_or_default();
    if host.is_empty() {
        None
    } else {
        Some(format!("https://{}", host))
    }
}

fn strip_scheme(link: &str) -> &str {
    for scheme in ["https://", "http://"] {
        let matches = link
            .get(..scheme.len())
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case(scheme));
        if matches {
            return &link[scheme.len()..];
        }
    }
    link
}

fn is_root_relative(link: &str) -> bool {
    link.starts_with('/') && !link.starts_with("//")
}

/// Turns `/path` into `{origin}/path`. Absolute and protocol-relative links,
/// and every link when the origin is unknown, are returned unchanged.
pub fn absolutize(link: &str, origin: Option<&str>) -> String {
    match origin {
        Some(origin) if is_root_relative(link) => format!("{}{}", origin, link),
        _ => link.to_string(),
    }
}

pub fn sanitize_content(html: &str, origin: Option<&str>) -> String {
    let content = SCRIPT_BLOCK.replace_all(html, "");

    let content = IMG_TAG.replace_all(&content, |caps: &Captures| {
        let tag = &caps[0];
        if tag.to_ascii_lowercase().contains("loading=") {
            tag.to_string()
        } else {
            format!("<img loading=\"lazy\"{}", &tag[4..])
        }
    });

    // the site stylesheet gives .button its own look
    let content = BUTTON_CLASS.replace_all(&content, "");

    let content = ANCHOR_TAG.replace_all(&content, |caps: &Captures| {
        let tag = &caps[0];
        if tag.to_ascii_lowercase().contains("target=") {
            tag.to_string()
        } else {
            format!("<a target=\"_blank\"{}", &tag[2..])
        }
    });

    let Some(origin) = origin else {
        return content.into_owned();
    };

    ROOT_RELATIVE_ATTR
        .replace_all(&content, |caps: &Captures| {
            let value = &caps[3];
            if is_root_relative(value) {
                format!("{}{}{}{}{}", &caps[1], &caps[2], origin, value, &caps[4])
            } else {
                caps[0].to_string()
            }
        })
        .into_owned()
}
