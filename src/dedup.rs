//! Duplicate suppression for accepted articles.
//!
//! The same column is often reachable under several URLs (section and author
//! paths, tracking parameters, AMP variants), so URL identity is not enough.
//! Each verified article is reduced to a cheap [`Fingerprint`] of title,
//! publication date and body length; the first article with a given
//! fingerprint is accepted and every later one is rejected.
//!
//! Two genuinely different articles with the same title, date and body
//! length collapse into one. That false-negative risk is accepted.

use crate::models::ExtractedArticle;
use std::collections::HashSet;

/// Probable-identity key of an article.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint {
    pub title: String,
    pub date: String,
    pub body_len: usize,
}

impl Fingerprint {
    pub fn of(article: &ExtractedArticle) -> Self {
        Self {
            title: article.title.clone(),
            date: article.publication_date.date.clone(),
            body_len: article.body.chars().count(),
        }
    }
}

/// Seen-set of fingerprints. Only grows for the life of a run.
#[derive(Debug, Default)]
pub struct Deduplicator {
    seen: HashSet<Fingerprint>,
}

impl Deduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// `true` the first time `fingerprint` is offered (and records it),
    /// `false` on every later offer.
    pub fn accept(&mut self, fingerprint: Fingerprint) -> bool {
        self.seen.insert(fingerprint)
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }
}
