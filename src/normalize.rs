//! Raw payload → canonical reviews → windowed subsets.
//!
//! Upstream payload shape varies by endpoint version, so every attribute is
//! resolved through an ordered list of candidate fields; the first field that
//! yields a usable value wins and later fields are not consulted. Parse
//! failures degrade to defaults — a single bad record never aborts the run.

use anyhow::{bail, Result};
use chrono::{DateTime, Duration, Local, NaiveDate, NaiveDateTime};
use serde_json::{Map, Value};
use tracing::debug;

use crate::models::{Review, Window};

type RawRecord = Map<String, Value>;

/// Date candidate fields, highest priority first.
const DATE_FIELDS: [&str; 5] = [
    "iso_date",
    "iso_date_of_last_edit",
    "date",
    "time",
    "published_at",
];

/// A value that would read as "nothing there" — mirrors the loose truthiness
/// the upstream payloads were written against (empty string, 0, empty
/// containers all mean absent).
fn is_blank(v: &Value) -> bool {
    match v {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(m) => m.is_empty(),
    }
}

/// First candidate field holding a non-blank value.
fn first_filled<'a>(rec: &'a RawRecord, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|k| rec.get(*k))
        .find(|v| !is_blank(v))
}

fn text_value(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn coerce_f64(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Interpret one date-like value as a UTC calendar date.
///
/// Strategies, in order: epoch seconds, full ISO-8601 (with " UTC"/"Z"
/// suffixes stripped first), then the first 10 characters as `YYYY-MM-DD`.
/// Any failure — including syntactically valid strings with impossible
/// calendar values — yields None, never an error.
pub fn to_iso_date(value: &Value) -> Option<NaiveDate> {
    match value {
        Value::Number(n) => epoch_date(n.as_f64()?),
        Value::String(s) => parse_date_str(s),
        _ => None,
    }
}

fn epoch_date(secs: f64) -> Option<NaiveDate> {
    if !secs.is_finite() {
        return None;
    }
    DateTime::from_timestamp(secs as i64, 0).map(|dt| dt.date_naive())
}

fn parse_date_str(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    let s = s.strip_suffix(" UTC").unwrap_or(s);
    let s = s.strip_suffix('Z').unwrap_or(s).trim();

    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(dt.date());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
        return Some(dt.date());
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(d);
    }

    // Partial strings: only the leading YYYY-MM-DD portion.
    let head: String = s.chars().take(10).collect();
    NaiveDate::parse_from_str(&head, "%Y-%m-%d").ok()
}

/// Pull the `reviews` array out of a raw envelope, rejecting anything that
/// is not an object carrying one — callers must be able to tell "zero
/// reviews" apart from "wrong input format".
pub fn reviews_array(raw: &Value) -> Result<&Vec<Value>> {
    let Some(obj) = raw.as_object() else {
        bail!("input shape error: top-level JSON must be an object with a `reviews` array");
    };
    match obj.get("reviews") {
        Some(Value::Array(items)) => Ok(items),
        Some(_) => bail!("input shape error: `reviews` must be an array"),
        None => bail!("input shape error: missing `reviews` array"),
    }
}

/// Map every raw record to a canonical `Review`, order preserved, nothing
/// dropped (windowing happens later).
pub fn normalize_reviews(raw: &Value) -> Result<Vec<Review>> {
    let items = reviews_array(raw)?;
    let out: Vec<Review> = items.iter().map(normalize_one).collect();
    debug!("Normalized {} raw records", out.len());
    Ok(out)
}

fn normalize_one(item: &Value) -> Review {
    let Some(rec) = item.as_object() else {
        // not even a mapping: all defaults
        return Review::new(String::new(), 0.0, None, String::new(), String::new(), None);
    };

    let review_id = first_filled(rec, &["review_id", "id"])
        .map(text_value)
        .unwrap_or_default();

    let rating = rec.get("rating").and_then(coerce_f64).unwrap_or(0.0);

    let date = DATE_FIELDS
        .iter()
        .find_map(|k| rec.get(*k).and_then(to_iso_date));

    let relative_time = first_filled(rec, &["relative_time_description", "relative_time"])
        .map(text_value)
        .unwrap_or_default();

    let text = first_filled(rec, &["snippet", "text", "content"])
        .map(|v| text_value(v).trim().to_string())
        .unwrap_or_default();

    let author = first_filled(rec, &["author_name", "author"])
        .map(text_value)
        .or_else(|| nested_author(rec));

    Review::new(review_id, rating, date, relative_time, text, author)
}

/// Fallback author lookup inside a nested `user` or `profile` mapping.
/// The first non-empty container wins even if it lacks a `name` field.
fn nested_author(rec: &RawRecord) -> Option<String> {
    let profile = first_filled(rec, &["user", "profile"])?.as_object()?;
    profile
        .get("name")
        .filter(|v| !is_blank(v))
        .map(text_value)
}

/// Keep reviews whose date falls inside the trailing window, evaluated
/// against today's wall-clock date. Undated reviews can never be proven
/// in-window and are dropped for any window other than `all`.
pub fn filter_window(reviews: &[Review], window: Window) -> Vec<Review> {
    let Some(days) = window.days() else {
        return reviews.to_vec();
    };
    let cutoff = Local::now().date_naive() - Duration::days(days);
    reviews
        .iter()
        .filter(|r| r.date.is_some_and(|d| d >= cutoff))
        .cloned()
        .collect()
}

/// Fixed trailing-90-day slice used for trend comparison regardless of the
/// active window.
pub fn slice_last90(reviews: &[Review]) -> Vec<Review> {
    filter_window(reviews, Window::Last90)
}
