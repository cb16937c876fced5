//! Crawl orchestration: listings → frontier → per-article pipeline → sink.
//!
//! One [`CrawlOrchestrator`] owns one run: its frontier of candidate URLs,
//! its fingerprint seen-set, and the list of saved articles. Nothing here is
//! process-global, so several runs (different sites or authors) can share a
//! process.
//!
//! Per article URL the states are:
//!
//! ```text
//! Fetched → AuthorChecked → TitleExtracted → DateExtracted → BodyExtracted
//!         → Deduplicated → Persisted
//! ```
//!
//! with an exit to `Rejected` (not by the author, empty body, duplicate) or
//! `Failed` (fetch error, save error) at the relevant step. One article's
//! failure never affects another.
//!
//! Fetch and extraction run on up to `workers` articles at once, all behind
//! one [`RateLimiter`]. Deduplication and saving happen on the single loop
//! that drains those results, so the seen-set has exactly one writer.

use crate::author::{AuthorSignal, AuthorVerifier};
use crate::collector::{LinkCollector, ListingSurface};
use crate::config::{ArticleConfig, ConfigError, CrawlSettings, SiteConfig};
use crate::dates::{DateOf, PublicationDate, normalize};
use crate::dedup::{Deduplicator, Fingerprint};
use crate::extract::{SelectorChain, Strategy};
use crate::fetcher::{Css, Document, FetchError, FetchOptions, PageFetcher};
use crate::models::{ExtractedArticle, RunSummary, SavedArticle};
use crate::outputs::ArticleSink;
use crate::rate_limit::RateLimiter;
use crate::utils::truncate_for_log;
use chrono::{Local, NaiveDate};
use futures::stream::{self, StreamExt};
use std::collections::BTreeSet;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};
use url::Url;

/// Title, date and body chains for article pages.
#[derive(Debug)]
pub struct ArticleExtractor {
    title: SelectorChain,
    date: SelectorChain,
    body: SelectorChain,
    untitled: String,
    wait_for: Option<Css>,
}

impl ArticleExtractor {
    pub fn new(config: &ArticleConfig) -> Result<Self, ConfigError> {
        let date = config
            .date
            .iter()
            .map(|selector| -> Result<Box<dyn Strategy>, ConfigError> {
                Ok(Box::new(DateOf::new(selector, config.language)?))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            title: SelectorChain::from_rules(&config.title)?,
            date: SelectorChain::new(date),
            body: SelectorChain::paragraphs(
                &config.body,
                config.min_paragraph_len,
                &config.paragraph_separator,
            )?,
            untitled: config.untitled.clone(),
            wait_for: config.wait_for.as_deref().map(Css::parse).transpose()?,
        })
    }

    pub fn title(&self, doc: &Document) -> String {
        self.title
            .extract(doc)
            .unwrap_or_else(|| self.untitled.clone())
    }

    pub fn date(&self, doc: &Document, today: NaiveDate) -> PublicationDate {
        normalize(self.date.extract(doc), today)
    }

    /// Body text, or `None` when no chain strategy yields a paragraph.
    pub fn body(&self, doc: &Document) -> Option<String> {
        self.body.extract(doc)
    }
}

/// A site configuration compiled into selectors and patterns.
#[derive(Debug)]
pub struct Pipeline {
    pub site: String,
    pub author_name: String,
    author: AuthorVerifier,
    surfaces: Vec<ListingSurface>,
    extractor: ArticleExtractor,
}

/// Result of fetching and extracting one article, before deduplication.
#[derive(Debug)]
pub enum Extraction {
    Article(ExtractedArticle, AuthorSignal),
    NotByAuthor,
    EmptyBody,
    Failed(FetchError),
}

/// Why an article was filtered out. None of these are errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    NotByAuthor,
    EmptyBody,
    Duplicate,
}

/// Final state of one article URL.
#[derive(Debug)]
pub enum ArticleOutcome {
    Persisted(SavedArticle),
    Rejected(Rejection),
    Failed(FetchError),
    SaveFailed(String),
}

impl Pipeline {
    pub fn compile(config: &SiteConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            site: config.name.clone(),
            author_name: config.author.name.clone(),
            author: AuthorVerifier::new(&config.author)?,
            surfaces: config
                .listings
                .iter()
                .map(ListingSurface::new)
                .collect::<Result<Vec<_>, _>>()?,
            extractor: ArticleExtractor::new(&config.article)?,
        })
    }

    /// Verify and extract a fetched article page.
    pub fn extract(&self, doc: &Document, url: &Url, today: NaiveDate) -> Extraction {
        let Some(signal) = self.author.verify(doc, url) else {
            return Extraction::NotByAuthor;
        };
        let title = self.extractor.title(doc);
        let date = self.extractor.date(doc, today);
        let body = self.extractor.body(doc).unwrap_or_default();

        match ExtractedArticle::new(title, url.to_string(), self.author_name.clone(), date, body) {
            Some(article) => Extraction::Article(article, signal),
            None => Extraction::EmptyBody,
        }
    }
}

/// Everything a finished run hands back.
#[derive(Debug)]
pub struct CrawlReport {
    pub summary: RunSummary,
    pub saved: Vec<SavedArticle>,
}

/// Drives one crawl run.
pub struct CrawlOrchestrator<'a, F, S> {
    pipeline: &'a Pipeline,
    fetcher: &'a F,
    sink: &'a S,
    listing_timeout: Duration,
    page_delay: Duration,
    article_options: FetchOptions,
    limiter: RateLimiter,
    workers: usize,
    cancel: CancellationToken,
    today: NaiveDate,
    frontier: BTreeSet<String>,
    dedup: Deduplicator,
    saved: Vec<SavedArticle>,
    summary: RunSummary,
}

impl<'a, F: PageFetcher, S: ArticleSink> CrawlOrchestrator<'a, F, S> {
    pub fn new(
        pipeline: &'a Pipeline,
        fetcher: &'a F,
        sink: &'a S,
        settings: &CrawlSettings,
        cancel: CancellationToken,
    ) -> Self {
        let article_options = FetchOptions::new(Duration::from_millis(settings.article_timeout_ms))
            .wait_for(pipeline.extractor.wait_for.clone());
        Self {
            pipeline,
            fetcher,
            sink,
            listing_timeout: Duration::from_millis(settings.listing_timeout_ms),
            page_delay: Duration::from_millis(settings.page_delay_ms),
            article_options,
            limiter: RateLimiter::new(
                Duration::from_millis(settings.article_delay_ms),
                Duration::from_millis(settings.article_jitter_ms),
            ),
            workers: settings.workers.max(1),
            cancel,
            today: Local::now().date_naive(),
            frontier: BTreeSet::new(),
            dedup: Deduplicator::new(),
            saved: Vec::new(),
            summary: RunSummary::default(),
        }
    }

    /// Override the date used when an article carries none.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    /// Collect links, process the frontier, report.
    #[instrument(level = "info", skip_all, fields(site = %self.pipeline.site))]
    pub async fn run(mut self) -> CrawlReport {
        self.collect_links().await;
        self.process_frontier().await;

        self.summary.cancelled = self.cancel.is_cancelled();
        self.summary.set_date_range(&self.saved);
        info!(
            discovered = self.summary.discovered,
            verified = self.summary.verified,
            saved = self.summary.saved,
            unique = self.dedup.len(),
            earliest = ?self.summary.earliest,
            latest = ?self.summary.latest,
            "Crawl finished"
        );
        CrawlReport {
            summary: self.summary,
            saved: self.saved,
        }
    }

    /// Walk every listing surface in order into the frontier.
    async fn collect_links(&mut self) {
        let collector = LinkCollector::new(
            self.fetcher,
            self.listing_timeout,
            self.page_delay,
            self.cancel.clone(),
        );
        let mut listing_requested = false;
        for surface in &self.pipeline.surfaces {
            if self.cancel.is_cancelled() {
                break;
            }
            listing_requested = true;
            let report = collector
                .collect(surface, &self.pipeline.author, &mut self.frontier)
                .await;
            info!(
                pages = report.pages_visited,
                added = report.links_added,
                stop = %report.stop,
                "Listing surface done"
            );
        }
        if listing_requested {
            // the first article waits a full interval after the last listing page
            self.limiter.release().await;
        }
        self.summary.discovered = self.frontier.len();
        info!(count = self.frontier.len(), "Frontier collected");
    }

    async fn process_frontier(&mut self) {
        let Self {
            pipeline,
            fetcher,
            sink,
            article_options,
            limiter,
            workers,
            cancel,
            today,
            frontier,
            dedup,
            saved,
            summary,
            ..
        } = self;
        let (pipeline, fetcher, sink) = (*pipeline, *fetcher, *sink);
        let (limiter, article_options, cancel, today) = (&*limiter, &*article_options, &*cancel, *today);
        let total = frontier.len();

        let mut results = stream::iter(
            frontier
                .iter()
                .enumerate()
                .take_while(|_| !cancel.is_cancelled()),
        )
        .map(|(i, url)| async move {
            info!(index = i + 1, total, %url, "Processing article");
            let extraction =
                fetch_and_extract(pipeline, fetcher, limiter, article_options, url, today).await;
            (url, extraction)
        })
        .buffer_unordered(*workers);

        while let Some((url, extraction)) = results.next().await {
            let outcome = settle(extraction, dedup, sink).await;
            record(summary, saved, url, outcome);
        }
    }
}

/// Fetch one article behind the rate limiter and run extraction on it.
#[instrument(level = "info", skip_all, fields(%url))]
async fn fetch_and_extract<F: PageFetcher>(
    pipeline: &Pipeline,
    fetcher: &F,
    limiter: &RateLimiter,
    options: &FetchOptions,
    url: &str,
    today: NaiveDate,
) -> Extraction {
    let parsed = match Url::parse(url) {
        Ok(parsed) => parsed,
        Err(e) => return Extraction::Failed(FetchError::Network(e.to_string())),
    };
    limiter.acquire().await;
    let fetched = fetcher.fetch(&parsed, options).await;
    limiter.release().await;
    match fetched {
        Ok(doc) => pipeline.extract(&doc, &parsed, today),
        Err(e) => Extraction::Failed(e),
    }
}

/// Deduplicate and persist an extraction. Runs on the single consuming loop.
async fn settle<S: ArticleSink>(
    extraction: Extraction,
    dedup: &mut Deduplicator,
    sink: &S,
) -> ArticleOutcome {
    let article = match extraction {
        Extraction::Article(article, signal) => {
            debug!(%signal, "Authorship verified");
            article
        }
        Extraction::NotByAuthor => return ArticleOutcome::Rejected(Rejection::NotByAuthor),
        Extraction::EmptyBody => return ArticleOutcome::Rejected(Rejection::EmptyBody),
        Extraction::Failed(e) => return ArticleOutcome::Failed(e),
    };

    if !dedup.accept(Fingerprint::of(&article)) {
        return ArticleOutcome::Rejected(Rejection::Duplicate);
    }

    match sink.save(&article).await {
        Ok(file) => ArticleOutcome::Persisted(SavedArticle::new(&article, file)),
        Err(e) => ArticleOutcome::SaveFailed(e.to_string()),
    }
}

fn record(summary: &mut RunSummary, saved: &mut Vec<SavedArticle>, url: &str, outcome: ArticleOutcome) {
    match outcome {
        ArticleOutcome::Persisted(article) => {
            summary.verified += 1;
            summary.saved += 1;
            info!(%url, file = %article.file, title = %truncate_for_log(&article.title, 80), "Saved article");
            saved.push(article);
        }
        ArticleOutcome::Rejected(Rejection::NotByAuthor) => {
            summary.not_by_author += 1;
            info!(%url, "Not by target author; skipped");
        }
        ArticleOutcome::Rejected(Rejection::EmptyBody) => {
            summary.verified += 1;
            summary.empty_body += 1;
            info!(%url, "Empty body; skipped");
        }
        ArticleOutcome::Rejected(Rejection::Duplicate) => {
            summary.verified += 1;
            summary.duplicates += 1;
            info!(%url, "Duplicate article; skipped");
        }
        ArticleOutcome::Failed(e) => {
            summary.fetch_failed += 1;
            warn!(%url, error = %e, "Article fetch failed; skipped");
        }
        ArticleOutcome::SaveFailed(e) => {
            summary.verified += 1;
            summary.save_failed += 1;
            error!(%url, error = %e, "Failed to save article");
        }
    }
}
