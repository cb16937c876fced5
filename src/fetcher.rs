//! Page fetching behind a small trait.
//!
//! The pipeline only ever sees a [`Document`]: a parsed page plus the URL it
//! was loaded from. How that page is obtained is up to the [`PageFetcher`]
//! implementation; [`HttpFetcher`] downloads it with `reqwest`, tests use an
//! in-memory map.
//!
//! Failures are reported as a [`FetchError`], which is always distinct from a
//! page that loads fine but matches nothing.

use crate::config::ConfigError;
use scraper::{ElementRef, Html, Selector};
use std::ops::Deref;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, instrument};
use url::Url;

/// Why a page could not be loaded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    #[error("network error: {0}")]
    Network(String),
    #[error("HTTP status {0}")]
    Status(u16),
    #[error("page loaded but `{0}` never appeared")]
    ConditionUnmet(String),
}

/// A compiled CSS selector that remembers its source text for logging.
#[derive(Debug, Clone)]
pub struct Css {
    source: String,
    selector: Selector,
}

impl Css {
    pub fn parse(source: &str) -> Result<Self, ConfigError> {
        let selector = Selector::parse(source).map_err(|e| ConfigError::Selector {
            selector: source.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            source: source.to_string(),
            selector,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }
}

impl Deref for Css {
    type Target = Selector;

    fn deref(&self) -> &Selector {
        &self.selector
    }
}

/// Per-request options: how long to wait and what marks the page as ready.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub timeout: Duration,
    /// Selector that must match for the load to count as complete.
    pub wait_for: Option<Css>,
}

impl FetchOptions {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            wait_for: None,
        }
    }

    pub fn wait_for(mut self, selector: Option<Css>) -> Self {
        self.wait_for = selector;
        self
    }
}

/// A loaded, DOM-queryable page.
#[derive(Debug)]
pub struct Document {
    url: Url,
    html: Html,
}

impl Document {
    pub fn parse(url: Url, body: &str) -> Self {
        Self {
            url,
            html: Html::parse_document(body),
        }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// All elements matching `selector`, in document order.
    pub fn select<'a>(&'a self, selector: &'a Selector) -> impl Iterator<Item = ElementRef<'a>> + 'a {
        self.html.select(selector)
    }

    pub fn select_first(&self, selector: &Selector) -> Option<ElementRef<'_>> {
        self.html.select(selector).next()
    }
}

/// Something that can turn a URL into a [`Document`].
pub trait PageFetcher {
    /// Load `url`, honouring the timeout and wait condition in `options`.
    async fn fetch(&self, url: &Url, options: &FetchOptions) -> Result<Document, FetchError>;
}

/// Plain HTTP fetcher. Pages are parsed as served, without running scripts.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(user_agent: &str) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .build()?;
        Ok(Self { client })
    }
}

impl PageFetcher for HttpFetcher {
    #[instrument(level = "debug", skip_all, fields(%url))]
    async fn fetch(&self, url: &Url, options: &FetchOptions) -> Result<Document, FetchError> {
        let map_err = |e: reqwest::Error| {
            if e.is_timeout() {
                FetchError::Timeout(options.timeout)
            } else if let Some(status) = e.status() {
                FetchError::Status(status.as_u16())
            } else {
                FetchError::Network(e.to_string())
            }
        };

        let response = self
            .client
            .get(url.clone())
            .timeout(options.timeout)
            .send()
            .await
            .map_err(map_err)?
            .error_for_status()
            .map_err(map_err)?;
        // Redirects land us on the final URL; relative links resolve against it.
        let final_url = response.url().clone();
        let body = response.text().await.map_err(map_err)?;
        debug!(bytes = body.len(), "Downloaded page");

        let document = Document::parse(final_url, &body);
        if let Some(selector) = &options.wait_for {
            if document.select_first(selector).is_none() {
                return Err(FetchError::ConditionUnmet(selector.as_str().to_string()));
            }
        }
        Ok(document)
    }
}

/// In-memory fetcher for tests: URL → HTML body or failure.
#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Debug, Default)]
    pub struct MapFetcher {
        pages: HashMap<String, Result<String, FetchError>>,
        requested: Mutex<Vec<String>>,
    }

    impl MapFetcher {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn page(mut self, url: &str, html: &str) -> Self {
            self.pages.insert(url.to_string(), Ok(html.to_string()));
            self
        }

        pub fn failing(mut self, url: &str, error: FetchError) -> Self {
            self.pages.insert(url.to_string(), Err(error));
            self
        }

        /// Every URL requested so far, in request order.
        pub fn requested(&self) -> Vec<String> {
            self.requested.lock().unwrap().clone()
        }
    }

    impl PageFetcher for MapFetcher {
        async fn fetch(&self, url: &Url, options: &FetchOptions) -> Result<Document, FetchError> {
            self.requested.lock().unwrap().push(url.to_string());
            match self.pages.get(url.as_str()) {
                Some(Ok(html)) => {
                    let document = Document::parse(url.clone(), html);
                    if let Some(selector) = &options.wait_for {
                        if document.select_first(selector).is_none() {
                            return Err(FetchError::ConditionUnmet(selector.as_str().to_string()));
                        }
                    }
                    Ok(document)
                }
                Some(Err(e)) => Err(e.clone()),
                None => Err(FetchError::Status(404)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::MapFetcher;
    use super::*;

    #[tokio::test]
    async fn test_map_fetcher_distinguishes_failure_from_empty() {
        let fetcher = MapFetcher::new()
            .page("https://example.com/empty", "<html><body></body></html>")
            .failing(
                "https://example.com/slow",
                FetchError::Timeout(Duration::from_secs(1)),
            );
        let options = FetchOptions::new(Duration::from_secs(1));

        let empty = Url::parse("https://example.com/empty").unwrap();
        let doc = fetcher.fetch(&empty, &options).await.unwrap();
        let p = Selector::parse("p").unwrap();
        assert_eq!(doc.select(&p).count(), 0);

        let slow = Url::parse("https://example.com/slow").unwrap();
        assert!(matches!(
            fetcher.fetch(&slow, &options).await,
            Err(FetchError::Timeout(_))
        ));
        assert_eq!(fetcher.requested().len(), 2);
    }

    #[tokio::test]
    async fn test_wait_for_condition() {
        let fetcher = MapFetcher::new().page("https://example.com/a", "<p>no article</p>");
        let url = Url::parse("https://example.com/a").unwrap();
        let options = FetchOptions::new(Duration::from_secs(1))
            .wait_for(Some(Css::parse("article").unwrap()));
        assert!(matches!(
            fetcher.fetch(&url, &options).await,
            Err(FetchError::ConditionUnmet(_))
        ));
    }

    #[test]
    fn test_css_parse_error_names_selector() {
        let err = Css::parse("div[[").unwrap_err();
        assert!(matches!(err, ConfigError::Selector { ref selector, .. } if selector == "div[["));
    }

    #[test]
    fn test_document_select_first() {
        let url = Url::parse("https://example.com/").unwrap();
        let doc = Document::parse(url, "<h1>One</h1><h1>Two</h1>");
        let h1 = Selector::parse("h1").unwrap();
        let first = doc.select_first(&h1).unwrap();
        assert_eq!(first.text().collect::<String>(), "One");
        assert_eq!(doc.url().as_str(), "https://example.com/");
    }
}
