//! Plain-text archive files.
//!
//! File name: `{date}_{Tag}_{title}.txt`, where the title has every
//! non-word character replaced by `_` and is cut to 60 characters.
//!
//! File body:
//!
//! ```text
//! TITRE  : Le Québec et la langue
//! URL    : https://www.ledevoir.com/opinion/chroniques/123/...
//! AUTEUR : Jean-François Lisée
//! DATE   : 2025-07-15
//!
//! First paragraph...
//! ```

use super::ArticleSink;
use crate::models::ExtractedArticle;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use std::error::Error;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use tokio::fs;
use tracing::{debug, instrument};

const MAX_TITLE_CHARS: usize = 60;

static NON_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w-]").unwrap());

/// Title reduced to a file-name-safe fragment.
pub fn sanitize_title(title: &str) -> String {
    NON_WORD
        .replace_all(title, "_")
        .chars()
        .take(MAX_TITLE_CHARS)
        .collect()
}

pub fn file_name(article: &ExtractedArticle, tag: &str) -> String {
    format!("{}.txt", file_stem(article, tag))
}

fn file_stem(article: &ExtractedArticle, tag: &str) -> String {
    format!(
        "{}_{}_{}",
        article.publication_date.date,
        tag,
        sanitize_title(&article.title)
    )
}

/// Header block, blank line, body.
pub fn render(article: &ExtractedArticle) -> String {
    format!(
        "TITRE  : {}\nURL    : {}\nAUTEUR : {}\nDATE   : {}\n\n{}",
        article.title, article.url, article.author, article.publication_date.date, article.body
    )
}

/// Writes each article to its own file in one directory.
///
/// Files left by an earlier run are overwritten. Within one sink, a name is
/// never reused: a second article mapping to the same name gets a `_2`,
/// `_3`, ... suffix.
#[derive(Debug)]
pub struct TextFileSink {
    dir: PathBuf,
    tag: String,
    written: Mutex<HashSet<String>>,
}

impl TextFileSink {
    pub fn new(dir: impl Into<PathBuf>, tag: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            tag: tag.into(),
            written: Mutex::new(HashSet::new()),
        }
    }

    /// Reserve the first free name for `article` in this sink.
    fn claim_name(&self, article: &ExtractedArticle) -> String {
        let stem = file_stem(article, &self.tag);
        let mut written = self.written.lock().unwrap_or_else(PoisonError::into_inner);
        let name = (1..)
            .map(|n| match n {
                1 => format!("{stem}.txt"),
                n => format!("{stem}_{n}.txt"),
            })
            .find(|name| !written.contains(name))
            .unwrap_or_else(|| format!("{stem}.txt"));
        written.insert(name.clone());
        name
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl ArticleSink for TextFileSink {
    #[instrument(level = "debug", skip_all, fields(url = %article.url))]
    async fn save(&self, article: &ExtractedArticle) -> Result<String, Box<dyn Error>> {
        let name = self.claim_name(article);
        let path = self.dir.join(&name);
        fs::write(&path, render(article)).await?;
        debug!(path = %path.display(), "Wrote article file");
        Ok(name)
    }
}
