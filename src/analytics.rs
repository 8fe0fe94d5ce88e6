//! Lightweight review analytics: sentiment bucketing, theme keyword scoring,
//! summary metrics and balanced quote sampling.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::Review;

/// Fixed theme catalogue. Matching is case-insensitive substring containment,
/// deliberately not word-boundary aware ("fast" hits "breakfast") — downstream
/// consumers are calibrated to this sensitivity.
pub const THEME_KEYWORDS: &[(&str, &[&str])] = &[
    (
        "Staff & Service",
        &[
            "staff", "service", "waiter", "waitress", "server", "friendly", "helpful", "polite",
            "attentive", "manager", "team", "bar staff", "foh",
        ],
    ),
    (
        "Food Quality / Execution",
        &[
            "food", "meal", "chicken", "lasagne", "steak", "grill", "undercooked", "overcooked",
            "cold", "microwave", "tasty", "portion", "menu",
        ],
    ),
    (
        "Speed / Wait Time",
        &["quick", "slow", "wait", "waiting", "timely", "fast", "delay"],
    ),
    (
        "Value & Deals",
        &["value", "price", "cheap", "deal", "2-for", "offer", "expensive"],
    ),
    (
        "Environment",
        &[
            "atmosphere", "vibe", "family", "kids", "clean", "dirty", "noise", "sport", "tv",
            "screen", "cozy", "cosy",
        ],
    ),
    ("Events", &["quiz", "karaoke", "event", "live", "host"]),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

/// Rating → sentiment bucket. Boundaries are inclusive toward the poles, so
/// the neutral band is the open interval (2.0, 4.0).
pub fn sentiment_bucket(rating: f64) -> Sentiment {
    if rating >= 4.0 {
        Sentiment::Positive
    } else if rating <= 2.0 {
        Sentiment::Negative
    } else {
        Sentiment::Neutral
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SentimentCounts {
    pub positive: usize,
    pub neutral: usize,
    pub negative: usize,
}

impl SentimentCounts {
    fn bump(&mut self, bucket: Sentiment) {
        match bucket {
            Sentiment::Positive => self.positive += 1,
            Sentiment::Neutral => self.neutral += 1,
            Sentiment::Negative => self.negative += 1,
        }
    }
}

fn keyword_hit(text: &str, words: &[&str]) -> bool {
    let t = text.to_lowercase();
    words.iter().any(|w| t.contains(w))
}

/// Sentiment tally per catalogue theme. Every theme appears in the output,
/// zero-count or not; one review may hit several themes independently.
pub fn theme_breakdown(reviews: &[Review]) -> BTreeMap<String, SentimentCounts> {
    let mut out = BTreeMap::new();
    for (theme, words) in THEME_KEYWORDS {
        let mut counts = SentimentCounts::default();
        for r in reviews {
            if keyword_hit(&r.text, words) {
                counts.bump(sentiment_bucket(r.rating));
            }
        }
        out.insert((*theme).to_string(), counts);
    }
    out
}

/// Count / average / sentiment split over any review subset.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Metrics {
    pub count: usize,
    /// None for the empty subset — never a zero standing in for "no data".
    pub avg_rating: Option<f64>,
    pub pos: usize,
    pub neu: usize,
    pub neg: usize,
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

pub fn basic_metrics(reviews: &[Review]) -> Metrics {
    if reviews.is_empty() {
        return Metrics {
            count: 0,
            avg_rating: None,
            pos: 0,
            neu: 0,
            neg: 0,
        };
    }
    let sum: f64 = reviews.iter().map(|r| r.rating).sum();
    let mut counts = SentimentCounts::default();
    for r in reviews {
        counts.bump(sentiment_bucket(r.rating));
    }
    Metrics {
        count: reviews.len(),
        avg_rating: Some(round2(sum / reviews.len() as f64)),
        pos: counts.positive,
        neu: counts.neutral,
        neg: counts.negative,
    }
}

/// A review snippet selected for narrative grounding.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Quote {
    pub text: String,
    pub author: String,
    pub rating: f64,
    pub date: Option<NaiveDate>,
}

const QUOTE_TEXT_CAP: usize = 300;
const ANONYMOUS_AUTHOR: &str = "Guest";

fn quote_from(r: &Review) -> Quote {
    Quote {
        text: r.text.chars().take(QUOTE_TEXT_CAP).collect(),
        author: r
            .author
            .clone()
            .unwrap_or_else(|| ANONYMOUS_AUTHOR.to_string()),
        rating: r.rating,
        date: r.date,
    }
}

/// Balanced positive/negative sample in input order: first n/2 positives,
/// then first n − n/2 negatives. Neutral reviews are never sampled, and an
/// exhausted pool is not padded from the other side.
pub fn sample_quotes(reviews: &[Review], n: usize) -> Vec<Quote> {
    let pos = reviews
        .iter()
        .filter(|r| sentiment_bucket(r.rating) == Sentiment::Positive)
        .take(n / 2);
    let neg = reviews
        .iter()
        .filter(|r| sentiment_bucket(r.rating) == Sentiment::Negative)
        .take(n - n / 2);
    pos.chain(neg).map(quote_from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn review(rating: f64, text: &str) -> Review {
        Review::new(
            String::new(),
            rating,
            None,
            String::new(),
            text.to_string(),
            None,
        )
    }

    #[test]
    fn sentiment_boundaries() {
        assert_eq!(sentiment_bucket(5.0), Sentiment::Positive);
        assert_eq!(sentiment_bucket(4.0), Sentiment::Positive);
        assert_eq!(sentiment_bucket(3.0), Sentiment::Neutral);
        assert_eq!(sentiment_bucket(2.1), Sentiment::Neutral);
        assert_eq!(sentiment_bucket(2.0), Sentiment::Negative);
        assert_eq!(sentiment_bucket(0.0), Sentiment::Negative);
    }

    #[test]
    fn metrics_empty_subset() {
        let m = basic_metrics(&[]);
        assert_eq!(m.count, 0);
        assert_eq!(m.avg_rating, None);
        assert_eq!((m.pos, m.neu, m.neg), (0, 0, 0));
    }

    #[test]
    fn metrics_split_and_average() {
        let m = basic_metrics(&[review(5.0, ""), review(1.0, "")]);
        assert_eq!(m.count, 2);
        assert_eq!(m.avg_rating, Some(3.0));
        assert_eq!((m.pos, m.neu, m.neg), (1, 0, 1));
    }

    #[test]
    fn average_rounds_to_two_decimals() {
        let m = basic_metrics(&[review(4.0, ""), review(4.0, ""), review(5.0, "")]);
        assert_eq!(m.avg_rating, Some(4.33));
    }

    #[test]
    fn every_theme_present_even_with_no_reviews() {
        let themes = theme_breakdown(&[]);
        assert_eq!(themes.len(), THEME_KEYWORDS.len());
        assert!(themes.values().all(|c| c == &SentimentCounts::default()));
        assert!(themes.contains_key("Staff & Service"));
        assert!(themes.contains_key("Events"));
    }

    #[test]
    fn theme_matching_is_case_insensitive_substring() {
        let reviews = vec![
            review(5.0, "The STAFF were lovely"),
            // "fast" inside "breakfast" — substring match is deliberate
            review(1.0, "terrible breakfast"),
        ];
        let themes = theme_breakdown(&reviews);
        assert_eq!(themes["Staff & Service"].positive, 1);
        assert_eq!(themes["Speed / Wait Time"].negative, 1);
    }

    #[test]
    fn one_review_may_hit_multiple_themes() {
        let reviews = vec![review(4.5, "friendly staff, tasty food, great quiz night")];
        let themes = theme_breakdown(&reviews);
        assert_eq!(themes["Staff & Service"].positive, 1);
        assert_eq!(themes["Food Quality / Execution"].positive, 1);
        assert_eq!(themes["Events"].positive, 1);
        assert_eq!(themes["Value & Deals"].positive, 0);
    }

    #[test]
    fn quotes_balanced_and_never_padded() {
        let reviews = vec![
            review(5.0, "great"),
            review(4.5, "good"),
            review(1.0, "bad"),
            review(3.0, "meh"),
        ];
        let quotes = sample_quotes(&reviews, 6);
        // 2 positives available (cap 3), 1 negative available (cap 3)
        assert_eq!(quotes.len(), 3);
        assert!(quotes.iter().all(|q| q.text != "meh"));
        assert_eq!(quotes[0].text, "great");
        assert_eq!(quotes[2].text, "bad");
    }

    #[test]
    fn quote_text_capped_and_author_defaulted() {
        let long = "x".repeat(400);
        let quotes = sample_quotes(&[review(5.0, &long)], 6);
        assert_eq!(quotes[0].text.chars().count(), 300);
        assert_eq!(quotes[0].author, "Guest");
    }
}
