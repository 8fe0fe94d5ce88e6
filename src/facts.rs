//! Deterministic facts object handed to the narrator.
//!
//! The narrative hints are a hard contract: the narrator must not assert a
//! volume trend when `suppress_volume_trend` is set, and should only lean on
//! a last-90-days comparison when `prefer_trend_statement` is set.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::analytics::{basic_metrics, sample_quotes, theme_breakdown, Quote, SentimentCounts};
use crate::models::{Review, Window};
use crate::normalize::{filter_window, slice_last90};

const QUOTE_SAMPLE_SIZE: usize = 6;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HorizonMetrics {
    pub count: usize,
    pub avg_rating: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NarrativeHints {
    /// True exactly when the active window is "all": there is no shorter
    /// horizon to trend against.
    pub suppress_volume_trend: bool,
    /// True when the trailing-90-day subset is non-empty and the active
    /// window is not itself last90 (a self-comparison says nothing).
    pub prefer_trend_statement: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Facts {
    pub window: String,
    pub window_is_all: bool,
    pub total_reviews_all_time: usize,
    pub reviews_in_window: usize,
    pub avg_rating_in_window: Option<f64>,
    pub last90: HorizonMetrics,
    pub all_time: HorizonMetrics,
    pub sentiment_counts_window: SentimentCounts,
    pub themes_window: BTreeMap<String, SentimentCounts>,
    pub quotes: Vec<Quote>,
    pub narrative_hints: NarrativeHints,
}

/// Assemble the facts object for one window selection. Metrics are computed
/// at three horizons (active window, trailing 90 days, all time); themes and
/// quotes only over the active window.
pub fn build_facts(reviews: &[Review], window: Window) -> Facts {
    let in_window = filter_window(reviews, window);
    let last90 = slice_last90(reviews);

    let metrics_all = basic_metrics(reviews);
    let metrics_win = basic_metrics(&in_window);
    let metrics_last90 = basic_metrics(&last90);

    Facts {
        window: window.as_str().to_string(),
        window_is_all: window == Window::All,
        total_reviews_all_time: metrics_all.count,
        reviews_in_window: metrics_win.count,
        avg_rating_in_window: metrics_win.avg_rating,
        last90: HorizonMetrics {
            count: metrics_last90.count,
            avg_rating: metrics_last90.avg_rating,
        },
        all_time: HorizonMetrics {
            count: metrics_all.count,
            avg_rating: metrics_all.avg_rating,
        },
        sentiment_counts_window: SentimentCounts {
            positive: metrics_win.pos,
            neutral: metrics_win.neu,
            negative: metrics_win.neg,
        },
        themes_window: theme_breakdown(&in_window),
        quotes: sample_quotes(&in_window, QUOTE_SAMPLE_SIZE),
        narrative_hints: NarrativeHints {
            suppress_volume_trend: window == Window::All,
            prefer_trend_statement: metrics_last90.count > 0 && window != Window::Last90,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::THEME_KEYWORDS;
    use chrono::{Duration, Local};

    fn review(rating: f64, days_ago: Option<i64>, text: &str) -> Review {
        Review::new(
            String::new(),
            rating,
            days_ago.map(|d| Local::now().date_naive() - Duration::days(d)),
            String::new(),
            text.to_string(),
            Some("Sam".to_string()),
        )
    }

    #[test]
    fn window_all_suppresses_volume_trend() {
        let reviews = vec![review(5.0, Some(10), "great staff")];
        let facts = build_facts(&reviews, Window::All);
        assert!(facts.window_is_all);
        assert!(facts.narrative_hints.suppress_volume_trend);
        // last90 is non-empty and the window is not last90
        assert!(facts.narrative_hints.prefer_trend_statement);
    }

    #[test]
    fn last180_with_recent_reviews_prefers_trend_statement() {
        let reviews = vec![review(4.0, Some(30), ""), review(2.0, Some(150), "")];
        let facts = build_facts(&reviews, Window::Last180);
        assert_eq!(facts.window, "last180");
        assert!(!facts.narrative_hints.suppress_volume_trend);
        assert!(facts.narrative_hints.prefer_trend_statement);
        assert_eq!(facts.reviews_in_window, 2);
        assert_eq!(facts.last90.count, 1);
        assert_eq!(facts.total_reviews_all_time, 2);
    }

    #[test]
    fn last90_window_never_self_compares() {
        let reviews = vec![review(4.0, Some(30), "")];
        let facts = build_facts(&reviews, Window::Last90);
        assert!(!facts.narrative_hints.prefer_trend_statement);
    }

    #[test]
    fn empty_last90_disables_trend_statement() {
        let reviews = vec![review(4.0, Some(300), "")];
        let facts = build_facts(&reviews, Window::All);
        assert_eq!(facts.last90.count, 0);
        assert_eq!(facts.last90.avg_rating, None);
        assert!(!facts.narrative_hints.prefer_trend_statement);
    }

    #[test]
    fn empty_input_yields_zero_facts_not_errors() {
        let facts = build_facts(&[], Window::Last90);
        assert_eq!(facts.total_reviews_all_time, 0);
        assert_eq!(facts.reviews_in_window, 0);
        assert_eq!(facts.avg_rating_in_window, None);
        assert_eq!(facts.sentiment_counts_window, SentimentCounts::default());
        assert_eq!(facts.themes_window.len(), THEME_KEYWORDS.len());
        assert!(facts.quotes.is_empty());
    }

    #[test]
    fn quotes_and_themes_scoped_to_active_window() {
        let reviews = vec![
            review(5.0, Some(10), "friendly staff"),
            review(1.0, Some(400), "slow service"),
        ];
        let facts = build_facts(&reviews, Window::Last90);
        assert_eq!(facts.quotes.len(), 1);
        assert_eq!(facts.quotes[0].text, "friendly staff");
        assert_eq!(facts.themes_window["Staff & Service"].positive, 1);
        assert_eq!(facts.themes_window["Speed / Wait Time"].negative, 0);
    }

    #[test]
    fn facts_round_trip_through_json() {
        let reviews = vec![
            review(4.0, Some(5), "lovely atmosphere, quick service"),
            review(4.0, Some(40), "good value deal"),
            review(5.0, Some(80), "great quiz night"),
            review(1.5, Some(20), "food was cold"),
            review(3.0, None, "average"),
        ];
        let facts = build_facts(&reviews, Window::Last180);
        let text = serde_json::to_string(&facts).unwrap();
        let back: Facts = serde_json::from_str(&text).unwrap();
        assert_eq!(facts, back);
    }
}
