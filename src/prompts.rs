use std::path::Path;

use tracing::{info, warn};

/// System prompt for the narrator. The narrative-hint clauses are load
/// bearing: they stop the model asserting trends the facts cannot support.
pub const SYSTEM_PROMPT: &str = "You are a precise analyst. Follow the style guide exactly. \
Use only provided facts/quotes. \
If window_is_all is true or narrative_hints.suppress_volume_trend is true, \
do NOT claim review volume is 'steady' or 'rising'; only compare last90 vs all-time if last90 exists.";

pub const DEFAULT_STYLE: &str = r#"# Pub Pulse Summary — [PUB_NAME]

## Executive Snapshot
- Timeframe: [WINDOW]. Total reviews in window, average rating, and sentiment split (pos/neu/neg).
- One-paragraph overview of guest sentiment and volume.

## Trends & Performance
- Compare last 90 days vs. all-time (avg rating, review volume).
- Call out direction of travel (improving, stable, declining).

## What Guests Love
- Bullet points of consistent positives with short supporting quotes.
- Highlight standout staff by name where possible.

## What Hurts
- Bullet points of recurring negatives with short supporting quotes.
- Focus on food execution, speed, and service consistency.

## Theme Breakdown
- Staff & Service — % pos / % neu / % neg, brief note.
- Food Quality / Execution — % pos / % neu / % neg, brief note.
- Speed / Wait Time — % pos / % neu / % neg, brief note.
- Value & Deals — % pos / % neu / % neg, brief note.
- Environment — % pos / % neu / % neg, brief note.
- Events — % pos / % neu / % neg, brief note.

## Moments That Matter (Do more of this)
- High-impact positives that drive repeat visits (events, deals, staff moments).

## Issue Log (ranked by impact)
- Each item: **Issue — Severity (1–5) | Suggested Owner | Action** (1–2 lines).
- Keep focused on operational fixes that move the needle.

## Staff Kudos Leaderboard
- Staff with the most positive mentions + example quotes.

## Events & Formats That Win
- What’s driving engagement (e.g., quiz nights, live sport), with examples.

## Improvement Priority List (next 30–60 days)
- Top 3 fixes with likely impact and quick actions.

## One Thing To Fix
- The single most impactful improvement to implement now.
"#;

pub fn user_style(style_text: &str) -> String {
    format!("Style guide:\n{}", style_text)
}

pub fn user_summarize(payload_json: &str) -> String {
    format!(
        "Summarize this JSON into a Pub Pulse markdown:\n{}",
        payload_json
    )
}

/// Style guide lookup order: explicit path, then `pubpulse_style.md` in the
/// working directory, then the built-in default.
pub fn load_style(path: Option<&Path>) -> String {
    if let Some(p) = path {
        match std::fs::read_to_string(p) {
            Ok(text) => {
                info!("Using style file: {}", p.display());
                return text;
            }
            Err(_) => {
                warn!(
                    "Style file not found at {}, falling back to built-in default",
                    p.display()
                );
                return DEFAULT_STYLE.to_string();
            }
        }
    }

    let local = Path::new("pubpulse_style.md");
    if let Ok(text) = std::fs::read_to_string(local) {
        info!("Using local style file: {}", local.display());
        return text;
    }

    warn!("No style file found, using built-in default style");
    DEFAULT_STYLE.to_string()
}
