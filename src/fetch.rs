//! Paginated review fetch against the SerpAPI Google Maps Reviews engine.

use anyhow::{bail, Context, Result};
use chrono::{SecondsFormat, Utc};
use reqwest::Client;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::models::SortOrder;

const SEARCH_URL: &str = "https://serpapi.com/search.json";
// next_page_token needs a moment server-side before it becomes valid
const PAGE_PAUSE: std::time::Duration = std::time::Duration::from_secs(2);

pub struct FetchParams {
    pub max_results: usize,
    pub lang: String,
    pub sort_by: SortOrder,
}

impl Default for FetchParams {
    fn default() -> Self {
        Self {
            max_results: 500,
            lang: "en".to_string(),
            sort_by: SortOrder::Newest,
        }
    }
}

async fn fetch_page(
    client: &Client,
    api_key: &str,
    data_id: &str,
    token: Option<&str>,
    params: &FetchParams,
) -> Result<Value> {
    let mut query = vec![
        ("engine", "google_maps_reviews"),
        ("data_id", data_id),
        ("hl", params.lang.as_str()),
        ("api_key", api_key),
        ("sort_by", params.sort_by.as_str()),
    ];
    if let Some(t) = token {
        query.push(("next_page_token", t));
    }

    let resp = client
        .get(SEARCH_URL)
        .query(&query)
        .send()
        .await
        .with_context(|| format!("Request failed for reviews page (data_id={})", data_id))?
        .error_for_status()
        .with_context(|| format!("HTTP error fetching reviews (data_id={})", data_id))?;

    let payload: Value = resp
        .json()
        .await
        .with_context(|| format!("Decoding reviews JSON (data_id={})", data_id))?;

    // SerpAPI reports engine-level failures inside the body
    if let Some(err) = payload.get("error").and_then(Value::as_str) {
        bail!("Search API error: {}", err);
    }
    Ok(payload)
}

fn page_reviews(payload: &Value) -> Vec<Value> {
    for key in ["reviews", "reviews_results"] {
        if let Some(items) = payload.get(key).and_then(Value::as_array) {
            if !items.is_empty() {
                return items.clone();
            }
        }
    }
    Vec::new()
}

fn next_page_token(payload: &Value) -> Option<String> {
    if let Some(t) = payload.get("next_page_token").and_then(Value::as_str) {
        if !t.is_empty() {
            return Some(t.to_string());
        }
    }
    payload
        .get("serpapi_pagination")?
        .get("next_page_token")?
        .as_str()
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

/// Paginate all reviews for a `data_id`, honoring the sort server-side, and
/// wrap them in the raw envelope the normalizer consumes.
pub async fn fetch_all_reviews(
    client: &Client,
    api_key: &str,
    data_id: &str,
    params: &FetchParams,
) -> Result<Value> {
    let start = std::time::Instant::now();
    debug!(
        "Review fetch starting - data_id={}, max={}, sort={}",
        data_id,
        params.max_results,
        params.sort_by.as_str()
    );

    let mut all: Vec<Value> = Vec::new();
    let mut token: Option<String> = None;
    let mut pages = 0usize;

    loop {
        let payload = fetch_page(client, api_key, data_id, token.as_deref(), params).await?;
        pages += 1;

        let page = page_reviews(&payload);
        if page.is_empty() {
            warn!("Empty reviews page - data_id={}, page={}", data_id, pages);
        }
        all.extend(page);

        if all.len() >= params.max_results {
            debug!("Reached max_results cap at {} reviews", params.max_results);
            break;
        }
        match next_page_token(&payload) {
            Some(t) => token = Some(t),
            None => break,
        }
        tokio::time::sleep(PAGE_PAUSE).await;
    }

    let count = all.len().min(params.max_results);
    all.truncate(count);

    let elapsed = start.elapsed();
    info!(
        "Review fetch completed - data_id={}, duration={:.2}s, pages={}, reviews={}",
        data_id,
        elapsed.as_secs_f32(),
        pages,
        count
    );

    Ok(json!({
        "source": "serpapi/google_maps_reviews",
        "data_id": data_id,
        "count": count,
        "reviews": all,
        "meta": {
            "fetched_at": Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            "sort_by": params.sort_by.as_str(),
        },
    }))
}
