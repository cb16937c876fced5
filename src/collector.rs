//! Listing-page pagination and article link discovery.
//!
//! Each [`ListingSurface`] is walked page by page. Every page's anchors are
//! absolutized, filtered, and diffed against the frontier collected so far:
//!
//! - no new links → pagination is exhausted, stop
//! - page budget spent → stop
//! - fetch failure → log, stop this surface (the run continues)
//! - otherwise merge, wait the inter-page delay, next page
//!
//! The "no new links" rule assumes listings are ordered newest-first and do
//! not reshuffle older items onto later pages. It is a heuristic: a listing
//! that reorders between requests can end collection early.
//!
//! Pages are visited strictly in sequence since each stop decision depends on
//! everything collected before it.

use crate::author::AuthorVerifier;
use crate::config::{ConfigError, ListingConfig, PAGE_PLACEHOLDER};
use crate::extract::SelectorChain;
use crate::fetcher::{Css, Document, FetchOptions, PageFetcher};
use regex::Regex;
use std::collections::BTreeSet;
use std::fmt;
use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use url::Url;

/// A compiled listing surface.
#[derive(Debug)]
pub struct ListingSurface {
    template: String,
    first_page_url: Option<String>,
    first_page_index: u32,
    max_pages: u32,
    anchors: SelectorChain,
    include: Option<Regex>,
    exclude: Option<Regex>,
    same_site: bool,
    require_author_slug: bool,
    wait_for: Option<Css>,
}

/// Why pagination of a surface ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// The page at this index contributed nothing new.
    NoNewLinks(u32),
    BudgetExhausted,
    /// The page at this index could not be loaded.
    FetchFailed(u32),
    Cancelled,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::NoNewLinks(page) => write!(f, "no new links on page {page}"),
            StopReason::BudgetExhausted => f.write_str("page budget exhausted"),
            StopReason::FetchFailed(page) => write!(f, "page {page} failed to load"),
            StopReason::Cancelled => f.write_str("cancelled"),
        }
    }
}

/// Outcome of walking one surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectReport {
    pub pages_visited: u32,
    pub links_added: usize,
    pub stop: StopReason,
}

fn compile_pattern(pattern: &Option<String>) -> Result<Option<Regex>, ConfigError> {
    pattern
        .as_deref()
        .map(|p| {
            Regex::new(p).map_err(|source| ConfigError::Pattern {
                pattern: p.to_string(),
                source,
            })
        })
        .transpose()
}

/// Host without a leading `www.`, for same-site comparison.
fn site_host(url: &Url) -> Option<&str> {
    url.host_str().map(|h| h.strip_prefix("www.").unwrap_or(h))
}

impl ListingSurface {
    pub fn new(config: &ListingConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            template: config.url_template.clone(),
            first_page_url: config.first_page_url.clone(),
            first_page_index: config.first_page_index,
            max_pages: config.max_pages,
            anchors: SelectorChain::anchors(&config.anchors)?,
            include: compile_pattern(&config.include)?,
            exclude: compile_pattern(&config.exclude)?,
            same_site: config.same_site,
            require_author_slug: config.require_author_slug,
            wait_for: config.wait_for.as_deref().map(Css::parse).transpose()?,
        })
    }

    /// URL of the listing page at `index`.
    pub fn page_url(&self, index: u32) -> Result<Url, url::ParseError> {
        match &self.first_page_url {
            Some(first) if index == self.first_page_index => Url::parse(first),
            _ => Url::parse(&self.template.replace(PAGE_PLACEHOLDER, &index.to_string())),
        }
    }

    /// Page indices within the budget, in visiting order.
    pub fn page_indices(&self) -> impl Iterator<Item = u32> {
        let start = self.first_page_index;
        start..start.saturating_add(self.max_pages)
    }

    /// Candidate article links on a listing page: absolute, fragment-free,
    /// passing this surface's filters.
    pub fn links(&self, doc: &Document, author: &AuthorVerifier) -> BTreeSet<String> {
        let base = doc.url();
        let mut links = BTreeSet::new();
        for href in self.anchors.union(doc) {
            let Ok(mut url) = base.join(&href) else {
                debug!(%href, "Skipping unresolvable href");
                continue;
            };
            if url.scheme() != "http" && url.scheme() != "https" {
                continue;
            }
            url.set_fragment(None);
            if self.keeps(base, &url, author) {
                links.insert(url.to_string());
            }
        }
        links
    }

    fn keeps(&self, base: &Url, url: &Url, author: &AuthorVerifier) -> bool {
        let s = url.as_str();
        if self.include.as_ref().is_some_and(|re| !re.is_match(s)) {
            return false;
        }
        if self.exclude.as_ref().is_some_and(|re| re.is_match(s)) {
            return false;
        }
        if self.same_site {
            match (site_host(base), site_host(url)) {
                (Some(b), Some(u)) if u == b || u.ends_with(&format!(".{b}")) => {}
                _ => return false,
            }
        }
        if self.require_author_slug && !author.url_matches(url) {
            return false;
        }
        true
    }
}

/// Walks listing surfaces and accumulates links into a frontier.
#[derive(Debug)]
pub struct LinkCollector<'a, F> {
    fetcher: &'a F,
    options: FetchOptions,
    page_delay: Duration,
    cancel: CancellationToken,
}

impl<'a, F: PageFetcher> LinkCollector<'a, F> {
    pub fn new(
        fetcher: &'a F,
        timeout: Duration,
        page_delay: Duration,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            fetcher,
            options: FetchOptions::new(timeout),
            page_delay,
            cancel,
        }
    }

    /// Paginate `surface`, merging new links into `frontier`.
    #[instrument(level = "info", skip_all, fields(surface = %surface.template))]
    pub async fn collect(
        &self,
        surface: &ListingSurface,
        author: &AuthorVerifier,
        frontier: &mut BTreeSet<String>,
    ) -> CollectReport {
        let options = self.options.clone().wait_for(surface.wait_for.clone());
        let mut pages_visited = 0;
        let mut links_added = 0;
        let mut indices = surface.page_indices().peekable();

        while let Some(page) = indices.next() {
            if self.cancel.is_cancelled() {
                info!(page, "Cancelled before listing page");
                return CollectReport { pages_visited, links_added, stop: StopReason::Cancelled };
            }

            let url = match surface.page_url(page) {
                Ok(url) => url,
                Err(e) => {
                    warn!(page, error = %e, "Listing URL does not parse; stopping surface");
                    return CollectReport { pages_visited, links_added, stop: StopReason::FetchFailed(page) };
                }
            };
            info!(page, %url, "Loading listing page");

            let found = match self.fetcher.fetch(&url, &options).await {
                Ok(doc) => surface.links(&doc, author),
                Err(e) => {
                    warn!(page, %url, error = %e, "Listing page failed; stopping pagination");
                    return CollectReport { pages_visited, links_added, stop: StopReason::FetchFailed(page) };
                }
            };
            pages_visited += 1;

            let new_links: Vec<String> = found
                .into_iter()
                .filter(|link| !frontier.contains(link))
                .collect();
            if new_links.is_empty() {
                info!(page, "No new links; pagination exhausted");
                return CollectReport { pages_visited, links_added, stop: StopReason::NoNewLinks(page) };
            }
            let added = new_links.len();
            links_added += added;
            frontier.extend(new_links);
            info!(page, new = added, total = frontier.len(), "Listing page parsed");

            if indices.peek().is_some() && !self.page_delay.is_zero() {
                tokio::select! {
                    _ = sleep(self.page_delay) => {}
                    _ = self.cancel.cancelled() => {}
                }
            }
        }

        info!(pages_visited, "Page budget exhausted");
        CollectReport { pages_visited, links_added, stop: StopReason::BudgetExhausted }
    }
}
