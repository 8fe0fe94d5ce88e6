//! Resolve a human-entered pub name + location into a stable `data_id`
//! via the SerpAPI Google Maps search engine.

use anyhow::{bail, Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

const SEARCH_URL: &str = "https://serpapi.com/search.json";
const MAX_REPORTED_CANDIDATES: usize = 5;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlacePick {
    pub title: String,
    pub data_id: String,
    pub place_id: Option<String>,
    pub data_cid: Option<String>,
    pub address: Option<String>,
    pub rating: Option<f64>,
    pub reviews: Option<u64>,
    pub position: Option<u64>,
}

/// Verbose resolution outcome, including enough raw metadata to debug a
/// failed lookup.
#[derive(Debug, Clone, Serialize)]
pub struct Resolution {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pick: Option<PlacePick>,
    pub candidates: Vec<PlacePick>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_search_parameters: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_metadata: Option<Value>,
}

/// Compact object passed to downstream steps and stored in the cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompactResolution {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub place_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

pub struct ResolveOptions {
    pub lang: String,
    pub ll: Option<String>,
    pub google_domain: String,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            lang: "en".to_string(),
            ll: None,
            google_domain: "google.co.uk".to_string(),
        }
    }
}

/// Collapse whitespace and lowercase — also the cache key normalization.
pub fn normalize_text(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn opt_str(v: &Value, key: &str) -> Option<String> {
    match v.get(key) {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    }
}

fn to_pick(row: &Value) -> PlacePick {
    PlacePick {
        title: opt_str(row, "title").unwrap_or_default(),
        data_id: opt_str(row, "data_id").unwrap_or_default(),
        place_id: opt_str(row, "place_id"),
        data_cid: opt_str(row, "data_cid"),
        address: opt_str(row, "address"),
        rating: row.get("rating").and_then(Value::as_f64),
        reviews: row.get("reviews").and_then(Value::as_u64),
        position: row.get("position").and_then(Value::as_u64),
    }
}

fn failure(reason: &str, pick: Option<PlacePick>, candidates: Vec<PlacePick>, payload: &Value) -> Resolution {
    Resolution {
        success: false,
        reason: Some(reason.to_string()),
        pick,
        candidates,
        raw_search_parameters: payload.get("search_parameters").cloned(),
        raw_metadata: payload.get("search_metadata").cloned(),
    }
}

/// Judge a raw search payload: pick the top-positioned candidate and run the
/// light title/location sanity check. Pure so it can be tested offline.
pub fn evaluate_payload(payload: &Value, name: &str, location: &str) -> Resolution {
    let rows: Vec<&Value> = match payload.get("local_results") {
        Some(Value::Array(list)) if !list.is_empty() => list.iter().collect(),
        _ => match payload.get("place_results") {
            Some(place @ Value::Object(m)) if !m.is_empty() => vec![place],
            _ => Vec::new(),
        },
    };

    let mut candidates: Vec<PlacePick> = rows
        .iter()
        .filter(|r| r.is_object())
        .map(|r| to_pick(r))
        .collect();

    if candidates.is_empty() {
        return failure(
            "No local_results/place_results returned by the search API.",
            None,
            Vec::new(),
            payload,
        );
    }

    candidates.sort_by_key(|c| c.position.unwrap_or(9999));
    let top = candidates[0].clone();
    candidates.truncate(MAX_REPORTED_CANDIDATES);

    let name_n = normalize_text(name);
    let loc_n = normalize_text(location);
    let title_n = normalize_text(&top.title);

    let title_ok = name_n.split_whitespace().all(|tok| title_n.contains(tok));
    let address_ok = match top.address.as_deref() {
        None => true,
        Some(addr) => {
            let addr_n = normalize_text(addr);
            loc_n.split_whitespace().any(|tok| addr_n.contains(tok))
        }
    };

    if top.data_id.is_empty() {
        return failure("Top result missing data_id.", Some(top), candidates, payload);
    }
    if !(title_ok && address_ok) {
        return failure(
            "Top result failed light sanity check (title/location).",
            Some(top),
            candidates,
            payload,
        );
    }

    Resolution {
        success: true,
        reason: None,
        pick: Some(top),
        candidates,
        raw_search_parameters: payload.get("search_parameters").cloned(),
        raw_metadata: payload.get("search_metadata").cloned(),
    }
}

/// Resolve the top search result for `"{name} {location}"`.
pub async fn resolve_place(
    client: &Client,
    api_key: &str,
    name: &str,
    location: &str,
    opts: &ResolveOptions,
) -> Result<Resolution> {
    if normalize_text(name).is_empty() || normalize_text(location).is_empty() {
        bail!("Both name and location are required and must be non-empty.");
    }

    let query = format!("{} {}", name, location);
    debug!("Resolving place - query={:?}, domain={}", query, opts.google_domain);

    let mut params = vec![
        ("engine", "google_maps".to_string()),
        ("type", "search".to_string()),
        ("q", query),
        ("hl", opts.lang.clone()),
        ("google_domain", opts.google_domain.clone()),
        ("api_key", api_key.to_string()),
    ];
    if let Some(ll) = &opts.ll {
        params.push(("ll", ll.clone()));
    }

    let payload: Value = client
        .get(SEARCH_URL)
        .query(&params)
        .send()
        .await
        .context("Place search request failed")?
        .error_for_status()
        .context("HTTP error from place search")?
        .json()
        .await
        .context("Decoding place search JSON")?;

    if let Some(err) = payload.get("error").and_then(Value::as_str) {
        bail!("Search API error: {}", err);
    }

    let resolution = evaluate_payload(&payload, name, location);
    info!(
        "Place resolution - success={}, title={:?}",
        resolution.success,
        resolution.pick.as_ref().map(|p| p.title.as_str())
    );
    Ok(resolution)
}

/// Shrink the verbose payload to the compact object downstream steps use.
pub fn compact_resolution(res: &Resolution) -> CompactResolution {
    let pick = match res.pick.as_ref() {
        Some(pick) if res.success => pick,
        _ => {
            return CompactResolution {
                success: false,
                reason: Some(res.reason.clone().unwrap_or_else(|| "Unknown".to_string())),
                data_id: None,
                place_id: None,
                title: None,
                address: None,
            }
        }
    };
    CompactResolution {
        success: true,
        reason: None,
        data_id: Some(pick.data_id.clone()),
        place_id: pick.place_id.clone(),
        title: Some(pick.title.clone()),
        address: pick.address.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_payload() -> Value {
        json!({
            "search_parameters": {"engine": "google_maps"},
            "search_metadata": {"status": "Success"},
            "local_results": [
                {"title": "The Two Greens", "data_id": "0xaaa:0xbbb", "address": "High St, Tettenhall", "position": 2, "rating": 4.4, "reviews": 312},
                {"title": "The Two Greens Pub", "data_id": "0xccc:0xddd", "address": "12 Green Rd, Tettenhall", "position": 1, "rating": 4.1, "reviews": 120}
            ]
        })
    }

    #[test]
    fn picks_lowest_position_candidate() {
        let res = evaluate_payload(&sample_payload(), "The Two Greens", "Tettenhall");
        assert!(res.success);
        let pick = res.pick.unwrap();
        assert_eq!(pick.data_id, "0xccc:0xddd");
        assert_eq!(pick.position, Some(1));
    }

    #[test]
    fn title_mismatch_fails_sanity_check() {
        let res = evaluate_payload(&sample_payload(), "The Red Lion", "Tettenhall");
        assert!(!res.success);
        assert!(res.reason.unwrap().contains("sanity check"));
        assert!(!res.candidates.is_empty());
    }

    #[test]
    fn location_mismatch_fails_when_address_present() {
        let res = evaluate_payload(&sample_payload(), "The Two Greens", "Manchester");
        assert!(!res.success);
    }

    #[test]
    fn missing_address_passes_location_check() {
        let payload = json!({
            "local_results": [
                {"title": "The Two Greens", "data_id": "0xaaa:0xbbb", "position": 1}
            ]
        });
        let res = evaluate_payload(&payload, "The Two Greens", "Anywhere");
        assert!(res.success);
    }

    #[test]
    fn place_results_object_used_when_no_local_results() {
        let payload = json!({
            "place_results": {"title": "The Two Greens", "data_id": "0xaaa:0xbbb", "address": "Tettenhall"}
        });
        let res = evaluate_payload(&payload, "The Two Greens", "Tettenhall");
        assert!(res.success);
    }

    #[test]
    fn empty_payload_reports_no_candidates() {
        let res = evaluate_payload(&json!({}), "A", "B");
        assert!(!res.success);
        assert!(res.candidates.is_empty());
    }

    #[test]
    fn missing_data_id_is_a_failure() {
        let payload = json!({
            "local_results": [{"title": "The Two Greens", "address": "Tettenhall", "position": 1}]
        });
        let res = evaluate_payload(&payload, "The Two Greens", "Tettenhall");
        assert!(!res.success);
        assert!(res.reason.unwrap().contains("data_id"));
    }

    #[test]
    fn compact_carries_identity_fields_only() {
        let res = evaluate_payload(&sample_payload(), "The Two Greens", "Tettenhall");
        let compact = compact_resolution(&res);
        assert!(compact.success);
        assert_eq!(compact.data_id.as_deref(), Some("0xccc:0xddd"));
        assert!(compact.reason.is_none());
    }

    #[test]
    fn normalize_collapses_whitespace_and_case() {
        assert_eq!(normalize_text("  The   TWO  Greens "), "the two greens");
    }
}
