//! Data models for extracted articles and run results.
//!
//! This module defines the core data structures used throughout the application:
//! - [`ExtractedArticle`]: one verified article, ready to persist
//! - [`SavedArticle`]: where an accepted article ended up
//! - [`RunSummary`]: the counts and date range reported at the end of a run

use crate::dates::PublicationDate;
use itertools::{Itertools, MinMaxResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A verified article with all fields extracted.
///
/// Created only once every extraction step has succeeded; `body` is never
/// empty. Immutable afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedArticle {
    pub title: String,
    pub url: String,
    /// The run's target author, identical for every record of a run.
    pub author: String,
    pub publication_date: PublicationDate,
    pub body: String,
}

impl ExtractedArticle {
    /// Build a record, or `None` if `body` is empty.
    pub fn new(
        title: String,
        url: String,
        author: String,
        publication_date: PublicationDate,
        body: String,
    ) -> Option<Self> {
        if body.trim().is_empty() {
            return None;
        }
        Some(Self {
            title,
            url,
            author,
            publication_date,
            body,
        })
    }
}

/// An accepted article and the file it was written to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedArticle {
    pub title: String,
    pub url: String,
    pub author: String,
    pub date: String,
    /// The date was not found on the page and defaulted to the run date.
    pub date_inferred: bool,
    pub file: String,
}

impl SavedArticle {
    pub fn new(article: &ExtractedArticle, file: String) -> Self {
        Self {
            title: article.title.clone(),
            url: article.url.clone(),
            author: article.author.clone(),
            date: article.publication_date.date.clone(),
            date_inferred: article.publication_date.inferred,
            file,
        }
    }
}

/// What happened during one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Unique candidate URLs in the frontier.
    pub discovered: usize,
    pub fetch_failed: usize,
    pub not_by_author: usize,
    pub empty_body: usize,
    pub duplicates: usize,
    /// Articles that passed authorship verification.
    pub verified: usize,
    pub saved: usize,
    pub save_failed: usize,
    /// Earliest publication date among saved articles with a found date.
    pub earliest: Option<String>,
    pub latest: Option<String>,
    /// Stopped early on cancellation.
    pub cancelled: bool,
}

impl RunSummary {
    /// Fill `earliest`/`latest` from saved articles, ignoring inferred dates.
    pub fn set_date_range(&mut self, saved: &[SavedArticle]) {
        let (earliest, latest) = match saved
            .iter()
            .filter(|a| !a.date_inferred)
            .map(|a| a.date.as_str())
            .minmax()
        {
            MinMaxResult::NoElements => (None, None),
            MinMaxResult::OneElement(d) => (Some(d), Some(d)),
            MinMaxResult::MinMax(lo, hi) => (Some(lo), Some(hi)),
        };
        self.earliest = earliest.map(str::to_string);
        self.latest = latest.map(str::to_string);
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "URLs discovered   : {}", self.discovered)?;
        writeln!(f, "Fetch failures    : {}", self.fetch_failed)?;
        writeln!(f, "Not by author     : {}", self.not_by_author)?;
        writeln!(f, "Empty bodies      : {}", self.empty_body)?;
        writeln!(f, "Duplicates        : {}", self.duplicates)?;
        writeln!(f, "Articles verified : {}", self.verified)?;
        writeln!(f, "Articles saved    : {}", self.saved)?;
        if self.save_failed > 0 {
            writeln!(f, "Save failures     : {}", self.save_failed)?;
        }
        if let (Some(earliest), Some(latest)) = (&self.earliest, &self.latest) {
            writeln!(f, "Earliest          : {earliest}")?;
            writeln!(f, "Latest            : {latest}")?;
        }
        if self.cancelled {
            writeln!(f, "(run cancelled before completion)")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn saved(date: &str, inferred: bool) -> SavedArticle {
        SavedArticle {
            title: "T".to_string(),
            url: "https://example.com/t".to_string(),
            author: "A".to_string(),
            date: date.to_string(),
            date_inferred: inferred,
            file: format!("{date}_A_T.txt"),
        }
    }

    #[test]
    fn test_empty_body_is_not_an_article() {
        let article = ExtractedArticle::new(
            "Titre".to_string(),
            "https://example.com/a".to_string(),
            "Auteur".to_string(),
            PublicationDate::found("2025-07-15"),
            "  \n ".to_string(),
        );
        assert!(article.is_none());
    }

    #[test]
    fn test_date_range_ignores_inferred() {
        let mut summary = RunSummary::default();
        summary.set_date_range(&[
            saved("2024-05-01", false),
            saved("2026-10-16", true),
            saved("2023-01-09", false),
            saved("2024-12-31", false),
        ]);
        assert_eq!(summary.earliest.as_deref(), Some("2023-01-09"));
        assert_eq!(summary.latest.as_deref(), Some("2024-12-31"));
    }

    #[test]
    fn test_date_range_single_and_none() {
        let mut summary = RunSummary::default();
        summary.set_date_range(&[saved("2024-05-01", false)]);
        assert_eq!(summary.earliest, summary.latest);

        summary.set_date_range(&[saved("2026-10-16", true)]);
        assert_eq!(summary.earliest, None);
        assert_eq!(summary.latest, None);
    }

    #[test]
    fn test_summary_display() {
        let summary = RunSummary {
            discovered: 3,
            verified: 2,
            saved: 1,
            earliest: Some("2025-07-15".to_string()),
            latest: Some("2025-07-15".to_string()),
            ..Default::default()
        };
        let text = summary.to_string();
        assert!(text.contains("URLs discovered   : 3"));
        assert!(text.contains("Articles saved    : 1"));
        assert!(text.contains("Earliest          : 2025-07-15"));
        assert!(!text.contains("Save failures"));
    }

    #[test]
    fn test_summary_serialization() {
        let summary = RunSummary {
            discovered: 5,
            ..Default::default()
        };
        let json = serde_json::to_string(&summary).unwrap();
        assert!(json.contains("\"discovered\":5"));
    }
}
