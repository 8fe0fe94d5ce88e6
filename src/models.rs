use chrono::NaiveDate;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Provenance tag stamped on every normalized review.
pub const REVIEW_SOURCE: &str = "google_maps_reviews";

/// Canonical review record. Built once by `normalize::normalize_reviews`,
/// never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
    pub review_id: String,
    pub rating: f64,
    /// None when no candidate field yielded a parseable date.
    pub date: Option<NaiveDate>,
    pub relative_time: String,
    pub text: String,
    pub author: Option<String>,
    pub source: String,
}

impl Review {
    pub fn new(
        review_id: String,
        rating: f64,
        date: Option<NaiveDate>,
        relative_time: String,
        text: String,
        author: Option<String>,
    ) -> Self {
        Self {
            review_id,
            rating,
            date,
            relative_time,
            text,
            author,
            source: REVIEW_SOURCE.to_string(),
        }
    }
}

/// Client-side trailing time window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Window {
    All,
    #[value(name = "last90")]
    Last90,
    #[value(name = "last180")]
    Last180,
}

impl Window {
    /// Trailing horizon in days; None means no filtering.
    pub fn days(self) -> Option<i64> {
        match self {
            Window::All => None,
            Window::Last90 => Some(90),
            Window::Last180 => Some(180),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Window::All => "all",
            Window::Last90 => "last90",
            Window::Last180 => "last180",
        }
    }
}

impl std::fmt::Display for Window {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Server-side sort order understood by the reviews engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SortOrder {
    Newest,
    Rating,
    #[value(name = "most_relevant")]
    MostRelevant,
}

impl SortOrder {
    pub fn as_str(self) -> &'static str {
        match self {
            SortOrder::Newest => "newest",
            SortOrder::Rating => "rating",
            SortOrder::MostRelevant => "most_relevant",
        }
    }
}

impl std::fmt::Display for SortOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
