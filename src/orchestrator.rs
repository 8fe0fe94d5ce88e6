use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use reqwest::Client;
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::facts::build_facts;
use crate::fetch::{fetch_all_reviews, FetchParams};
use crate::llm::{chat_completion, ChatMessage, OpenAiConfig};
use crate::models::{SortOrder, Window};
use crate::normalize::{filter_window, normalize_reviews};
use crate::prompts::{load_style, user_style, user_summarize, SYSTEM_PROMPT};

/// Where the raw review payload comes from: a live fetch or a saved file.
pub enum ReviewSource {
    DataId(String),
    FromJson(PathBuf),
}

pub struct SummarizeOptions {
    pub pub_title: String,
    pub window: Window,
    pub sort: SortOrder,
    pub max_results: usize,
    pub style_file: Option<PathBuf>,
    pub out_md: PathBuf,
    pub out_json: PathBuf,
}

fn load_raw_file(path: &Path) -> Result<Value> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Reading reviews file {}", path.display()))?;
    let parsed: Value = serde_json::from_str(&text)
        .with_context(|| format!("Invalid JSON file: {}", path.display()))?;
    // a bare review array is accepted and wrapped into the envelope shape
    Ok(match parsed {
        Value::Array(items) => json!({ "reviews": items }),
        other => other,
    })
}

/// Full summarize pipeline: load/fetch raw payload, normalize, window, build
/// facts, narrate via LLM, persist markdown + facts JSON.
pub async fn run_summarize(
    source: ReviewSource,
    opts: &SummarizeOptions,
    serpapi_key: Option<&str>,
    openai: &OpenAiConfig,
) -> Result<()> {
    let pipeline_start = std::time::Instant::now();
    info!(
        "Pipeline started - pub_title={:?}, window={}",
        opts.pub_title,
        opts.window.as_str()
    );

    let client = Client::builder().build()?;

    // 1) load or fetch the raw payload
    let raw = match &source {
        ReviewSource::FromJson(path) => {
            info!("Using reviews from file: {}", path.display());
            load_raw_file(path)?
        }
        ReviewSource::DataId(data_id) => {
            let key = serpapi_key
                .context("Missing SERPAPI_API_KEY (required when fetching by data_id)")?;
            let params = FetchParams {
                max_results: opts.max_results,
                lang: "en".to_string(),
                sort_by: opts.sort,
            };
            let raw = fetch_all_reviews(&client, key, data_id, &params).await?;
            info!("Fetched reviews via search API for data_id: {}", data_id);
            raw
        }
    };

    // 2) normalize + window
    let reviews = normalize_reviews(&raw)?;
    let in_window = filter_window(&reviews, opts.window);
    info!(
        "Normalization completed - total={}, in_window={}",
        reviews.len(),
        in_window.len()
    );

    // 3) deterministic facts for the narrator
    let facts = build_facts(&reviews, opts.window);
    debug!(
        "Facts built - window={}, last90_count={}, suppress_volume_trend={}",
        facts.window, facts.last90.count, facts.narrative_hints.suppress_volume_trend
    );

    // 4) narrate
    let narrate_start = std::time::Instant::now();
    let style_text = load_style(opts.style_file.as_deref());
    let payload = serde_json::to_string(&json!({
        "pub_title": opts.pub_title,
        "window": opts.window.as_str(),
        "facts": facts,
    }))?;
    let messages = [
        ChatMessage {
            role: "system",
            content: SYSTEM_PROMPT.to_string(),
        },
        ChatMessage {
            role: "user",
            content: user_style(&style_text),
        },
        ChatMessage {
            role: "user",
            content: user_summarize(&payload),
        },
    ];
    let markdown = chat_completion(&client, openai, &messages).await?;
    info!(
        "Narration completed - duration={:.2}s",
        narrate_start.elapsed().as_secs_f32()
    );

    // 5) persist artifacts: narrative markdown + facts JSON (audit trail)
    std::fs::write(&opts.out_md, markdown.as_bytes())
        .with_context(|| format!("Writing {}", opts.out_md.display()))?;
    debug!("Wrote {}", opts.out_md.display());

    std::fs::write(&opts.out_json, serde_json::to_vec_pretty(&facts)?)
        .with_context(|| format!("Writing {}", opts.out_json.display()))?;
    debug!("Wrote {}", opts.out_json.display());

    info!(
        "Pipeline completed successfully - total_duration={:.2}s, reviews_in_window={}, outputs=[{}, {}]",
        pipeline_start.elapsed().as_secs_f32(),
        in_window.len(),
        opts.out_md.display(),
        opts.out_json.display()
    );
    Ok(())
}
