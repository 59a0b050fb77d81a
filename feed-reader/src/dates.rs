use crate::types::RawEntry;
use chrono::{DateTime, Datelike, Duration, Months, NaiveDate, NaiveDateTime, Utc};

const NAIVE_DATETIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M"];

/// Best-effort parse of a date string as found in feeds.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in NAIVE_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn upstream(parsed: Option<DateTime<Utc>>, raw: Option<&str>) -> Option<DateTime<Utc>> {
    parsed.or_else(|| raw.and_then(parse_timestamp))
}

/// Stand-in for entries without any date: one month further back per
/// position, pinned to the 1st so they never look new.
pub fn synthetic_date(now: DateTime<Utc>, index: usize) -> DateTime<Utc> {
    let months = u32::try_from(index).unwrap_or(u32::MAX);
    let shifted = now
        .checked_sub_months(Months::new(months))
        .unwrap_or(DateTime::UNIX_EPOCH);
    shifted.with_day(1).unwrap_or(shifted)
}

/// Publish time of one entry. `reverse_index` seconds are always added so
/// that entries sharing a coarse timestamp stay distinct and keep their
/// upstream order.
pub fn resolve_published(
    entry: &RawEntry,
    now: DateTime<Utc>,
    index: usize,
    reverse_index: usize,
) -> DateTime<Utc> {
    let base = upstream(entry.published_parsed, entry.published.as_deref())
        .or_else(|| upstream(entry.updated_parsed, entry.updated.as_deref()))
        .unwrap_or_else(|| synthetic_date(now, index));

    base + Duration::seconds(reverse_index as i64)
}
