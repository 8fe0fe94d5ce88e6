mod analytics;
mod cache;
mod facts;
mod fetch;
mod llm;
mod models;
mod normalize;
mod orchestrator;
mod prompts;
mod resolve;

use std::path::PathBuf;

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use reqwest::Client;
use tracing::{debug, info};

use crate::cache::ResolutionCache;
use crate::fetch::{fetch_all_reviews, FetchParams};
use crate::llm::OpenAiConfig;
use crate::models::{SortOrder, Window};
use crate::normalize::{filter_window, normalize_reviews};
use crate::orchestrator::{run_summarize, ReviewSource, SummarizeOptions};
use crate::resolve::{compact_resolution, resolve_place, ResolveOptions};

/// Pub Pulse - fetch, analyze and narrate place reviews
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Resolve a pub name + location to a Google Maps data_id (with cache)
    Resolve {
        /// Pub name (e.g., 'The Two Greens')
        #[arg(long)]
        name: String,

        /// Town/area/city/borough (e.g., 'Tettenhall')
        #[arg(long)]
        location: String,

        /// Language for results (hl)
        #[arg(long, default_value = "en")]
        lang: String,

        /// Geo-bias like '@52.598,-2.166,14z'
        #[arg(long)]
        ll: Option<String>,

        #[arg(long, default_value = "google.co.uk")]
        google_domain: String,

        /// Path to the JSON cache file
        #[arg(long, default_value = ".cache/pubreview_resolutions.json")]
        cache_path: PathBuf,

        /// Print a short confirmation (title + address)
        #[arg(long)]
        confirm: bool,

        /// Print the full verbose payload instead of compact output
        #[arg(long)]
        debug: bool,
    },

    /// Fetch and normalize reviews for a data_id
    Fetch {
        /// Google Maps data_id (e.g., '0x...:0x...')
        #[arg(long)]
        data_id: String,

        /// Max reviews to fetch
        #[arg(long, default_value_t = 400)]
        max: usize,

        /// Language for results (hl)
        #[arg(long, default_value = "en")]
        lang: String,

        /// Server-side sort order
        #[arg(long, value_enum, default_value_t = SortOrder::Newest)]
        sort: SortOrder,

        /// Client-side date window filter
        #[arg(long, value_enum, default_value_t = Window::All)]
        window: Window,

        /// If >0, print this many normalized reviews for quick inspection
        #[arg(long, default_value_t = 0)]
        preview: usize,
    },

    /// Summarize reviews into a Pub Pulse report (Markdown + facts JSON)
    Summarize {
        /// Google Maps data_id to fetch now
        #[arg(long, conflicts_with = "from_json", required_unless_present = "from_json")]
        data_id: Option<String>,

        /// Path to raw reviews JSON previously saved (envelope or list)
        #[arg(long)]
        from_json: Option<PathBuf>,

        /// Shown in the summary header
        #[arg(long, default_value = "(Pub Name)")]
        pub_title: String,

        #[arg(long, value_enum, default_value_t = Window::Last90)]
        window: Window,

        #[arg(long, value_enum, default_value_t = SortOrder::Newest)]
        sort: SortOrder,

        #[arg(long, default_value_t = 500)]
        max: usize,

        /// Path to a style file (*.md/*.txt); defaults to 'pubpulse_style.md'
        #[arg(long)]
        style_file: Option<PathBuf>,

        #[arg(long, default_value = "pub_pulse.md")]
        out_md: PathBuf,

        #[arg(long, default_value = "pub_pulse_facts.json")]
        out_json: PathBuf,
    },
}

fn serpapi_key() -> Result<String> {
    std::env::var("SERPAPI_API_KEY")
        .ok()
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
        .ok_or_else(|| anyhow!("Missing SERPAPI_API_KEY"))
}

async fn run_resolve(
    name: String,
    location: String,
    lang: String,
    ll: Option<String>,
    google_domain: String,
    cache_path: PathBuf,
    confirm: bool,
    debug_out: bool,
) -> Result<()> {
    let key = serpapi_key()?;
    let mut cache = ResolutionCache::open(&cache_path)?;

    let cached = cache.get(&name, &location).cloned();
    let (result, verbose) = match cached {
        Some(hit) => {
            debug!("Cache hit for {:?} / {:?}", name, location);
            (hit, None)
        }
        None => {
            let client = Client::builder().build()?;
            let opts = ResolveOptions {
                lang,
                ll,
                google_domain,
            };
            let resolution = resolve_place(&client, &key, &name, &location, &opts).await?;
            let compact = compact_resolution(&resolution);
            if compact.success {
                cache.put(&name, &location, compact.clone())?;
                info!("Resolution cached - path={}", cache_path.display());
            }
            (compact, Some(resolution))
        }
    };

    if confirm && result.success {
        println!(
            "[confirm] {} — {}",
            result.title.as_deref().unwrap_or(""),
            result.address.as_deref().unwrap_or("")
        );
    }

    if debug_out {
        match verbose {
            Some(resolution) => println!("{}", serde_json::to_string_pretty(&resolution)?),
            // cache only holds the compact object
            None => println!(
                "{}",
                serde_json::to_string_pretty(
                    &serde_json::json!({"note": "cached_compact_only", "compact": result})
                )?
            ),
        }
    } else {
        println!("{}", serde_json::to_string_pretty(&result)?);
    }
    Ok(())
}

async fn run_fetch(
    data_id: String,
    max: usize,
    lang: String,
    sort: SortOrder,
    window: Window,
    preview: usize,
) -> Result<()> {
    let key = serpapi_key()?;
    let client = Client::builder().build()?;

    let params = FetchParams {
        max_results: max,
        lang,
        sort_by: sort,
    };
    let raw = fetch_all_reviews(&client, &key, &data_id, &params).await?;
    let mut reviews = normalize_reviews(&raw)?;
    if window != Window::All {
        reviews = filter_window(&reviews, window);
    }

    let summary = serde_json::json!({
        "data_id": raw["data_id"],
        "fetched_count": raw["count"],
        "normalized_count": reviews.len(),
        "window": window.as_str(),
        "sort_by": sort.as_str(),
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);

    if preview > 0 {
        let sample: Vec<_> = reviews
            .iter()
            .take(preview)
            .map(|r| {
                serde_json::json!({
                    "review_id": r.review_id,
                    "rating": r.rating,
                    "date": r.date,
                    "relative_time": r.relative_time,
                    "author": r.author,
                    // trim for console
                    "text": r.text.chars().take(200).collect::<String>(),
                })
            })
            .collect();
        println!("\nPREVIEW:");
        println!("{}", serde_json::to_string_pretty(&sample)?);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_thread_ids(false)
        .with_line_number(true)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Resolve {
            name,
            location,
            lang,
            ll,
            google_domain,
            cache_path,
            confirm,
            debug,
        } => {
            run_resolve(
                name,
                location,
                lang,
                ll,
                google_domain,
                cache_path,
                confirm,
                debug,
            )
            .await
        }

        Command::Fetch {
            data_id,
            max,
            lang,
            sort,
            window,
            preview,
        } => run_fetch(data_id, max, lang, sort, window, preview).await,

        Command::Summarize {
            data_id,
            from_json,
            pub_title,
            window,
            sort,
            max,
            style_file,
            out_md,
            out_json,
        } => {
            // credentials are validated before any processing begins
            let openai = OpenAiConfig::from_env()?;
            let (source, serp_key) = match (data_id, from_json) {
                (Some(id), None) => (ReviewSource::DataId(id), Some(serpapi_key()?)),
                (None, Some(path)) => (ReviewSource::FromJson(path), None),
                _ => return Err(anyhow!("Provide exactly one of --data-id or --from-json")),
            };
            let opts = SummarizeOptions {
                pub_title,
                window,
                sort,
                max_results: max,
                style_file,
                out_md,
                out_json,
            };
            run_summarize(source, &opts, serp_key.as_deref(), &openai).await
        }
    }
}
