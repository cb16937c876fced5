//! Per-site configuration records.
//!
//! A single pipeline serves every target site; what differs between sites
//! (listing URL template, selector lists, link filters, delays) lives in a
//! [`SiteConfig`] loaded from YAML. Four presets ship with the binary under
//! `sites/` and are selectable by name.
//!
//! # YAML shape
//!
//! ```yaml
//! name: ledevoir-lisee
//! author:
//!   name: Jean-François Lisée
//!   tag: Lisee
//! listings:
//!   - url_template: "https://www.ledevoir.com/auteur/jean-francois-lisee/{page}"
//!     first_page_url: "https://www.ledevoir.com/auteur/jean-francois-lisee"
//!     include: "/opinion/chroniques/"
//! article:
//!   title: ["title"]
//!   date: ["time"]
//!   body: ["article p"]
//! ```
//!
//! Extraction rules are either a bare selector (element text) or a
//! `{selector, attr}` map (attribute value).

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Placeholder substituted with the page index in listing URL templates.
pub const PAGE_PLACEHOLDER: &str = "{page}";

/// Errors raised while loading or compiling a site configuration.
///
/// All of these surface at start-up, before any page is fetched.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid YAML in site config: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid CSS selector `{selector}`: {reason}")]
    Selector { selector: String, reason: String },
    #[error("invalid URL pattern `{pattern}`: {source}")]
    Pattern {
        pattern: String,
        source: regex::Error,
    },
    #[error("unknown site preset `{0}` (try --list-sites)")]
    UnknownSite(String),
    #[error("invalid site config: {0}")]
    Invalid(String),
}

/// Built-in presets, one per supported site and author.
const PRESETS: &[(&str, &str)] = &[
    ("ledevoir-lisee", include_str!("../sites/ledevoir-lisee.yaml")),
    ("jdm-bock-cote", include_str!("../sites/jdm-bock-cote.yaml")),
    ("lapresse-lagace", include_str!("../sites/lapresse-lagace.yaml")),
    (
        "radio-canada-analyses",
        include_str!("../sites/radio-canada-analyses.yaml"),
    ),
];

/// Names of the built-in presets, in declaration order.
pub fn preset_names() -> impl Iterator<Item = &'static str> {
    PRESETS.iter().map(|(name, _)| *name)
}

/// Everything the pipeline needs to know about one site/author pair.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SiteConfig {
    /// Short identifier, used in logs and the manifest file name.
    pub name: String,
    pub author: AuthorConfig,
    /// Listing surfaces, collected in order and unioned into one frontier.
    pub listings: Vec<ListingConfig>,
    pub article: ArticleConfig,
    #[serde(default)]
    pub crawl: CrawlSettings,
}

/// The target author and how to recognise them on a page.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthorConfig {
    /// Display name written into every record (`AUTEUR`).
    pub name: String,
    /// Short tag used in output file names.
    pub tag: String,
    /// Name fragments that must all appear in a byline. Defaults to the
    /// whitespace-separated parts of `name`.
    #[serde(default)]
    pub fragments: Vec<String>,
    /// URL substrings that identify the author. Defaults to the slug of `name`.
    #[serde(default)]
    pub url_markers: Vec<String>,
    /// Byline locations, tried in order.
    #[serde(default = "default_byline_rules")]
    pub byline: Vec<FieldRule>,
    /// When false every fetched article is attributed to the author; used
    /// for section-scoped sites where listings carry no author.
    #[serde(default = "default_true")]
    pub verify: bool,
}

/// One paginated listing surface.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ListingConfig {
    /// Listing URL with a `{page}` placeholder. A template without the
    /// placeholder describes a single, unpaginated page.
    pub url_template: String,
    /// URL used for the first page instead of the template, for sites whose
    /// first page omits the page parameter.
    #[serde(default)]
    pub first_page_url: Option<String>,
    /// Index of the first page (0 for zero-indexed sources).
    #[serde(default = "default_first_page_index")]
    pub first_page_index: u32,
    /// Maximum number of listing pages to visit.
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,
    /// Anchor selectors whose `href` values are unioned.
    #[serde(default = "default_anchor_selectors")]
    pub anchors: Vec<String>,
    /// Regex an absolute link must match to be kept.
    #[serde(default)]
    pub include: Option<String>,
    /// Regex that discards an otherwise matching link.
    #[serde(default)]
    pub exclude: Option<String>,
    /// Keep only links on the listing's own site.
    #[serde(default)]
    pub same_site: bool,
    /// Keep only links whose URL carries one of the author's URL markers.
    /// Set on surfaces that are not scoped to the author.
    #[serde(default)]
    pub require_author_slug: bool,
    /// Selector that must be present for the page to count as loaded.
    #[serde(default)]
    pub wait_for: Option<String>,
}

/// How to pull fields out of an article page.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ArticleConfig {
    #[serde(default = "default_title_rules")]
    pub title: Vec<FieldRule>,
    /// Date element selectors; the first matching element of each is handed
    /// to the date normalizer (attribute, then text).
    #[serde(default = "default_date_selectors")]
    pub date: Vec<String>,
    /// Paragraph selectors for the body, tried in order.
    #[serde(default = "default_body_selectors")]
    pub body: Vec<String>,
    /// A paragraph counts only if its trimmed length exceeds this.
    #[serde(default)]
    pub min_paragraph_len: usize,
    #[serde(default = "default_paragraph_separator")]
    pub paragraph_separator: String,
    /// Title used when every title rule misses.
    #[serde(default = "default_untitled")]
    pub untitled: String,
    /// Language of localized dates on the site.
    #[serde(default)]
    pub language: Language,
    #[serde(default)]
    pub wait_for: Option<String>,
}

/// Pacing, timeouts and output settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CrawlSettings {
    /// Delay between listing pages.
    pub page_delay_ms: u64,
    /// Minimum spacing between article requests.
    pub article_delay_ms: u64,
    /// Random extra delay, uniformly drawn from `0..=article_jitter_ms`.
    pub article_jitter_ms: u64,
    pub listing_timeout_ms: u64,
    pub article_timeout_ms: u64,
    /// Maximum number of article fetches in flight.
    pub workers: usize,
    pub user_agent: String,
    pub output_dir: Option<PathBuf>,
}

impl Default for CrawlSettings {
    fn default() -> Self {
        Self {
            page_delay_ms: 1000,
            article_delay_ms: 1000,
            article_jitter_ms: 0,
            listing_timeout_ms: 30_000,
            article_timeout_ms: 60_000,
            workers: 1,
            user_agent: "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/114.0.0.0 Safari/537.36".to_string(),
            output_dir: None,
        }
    }
}

/// An extraction rule: element text, or one attribute of the element.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum FieldRule {
    Text(String),
    Attr { selector: String, attr: String },
}

/// Language of the month names used in localized dates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    French,
    English,
}

impl SiteConfig {
    /// Load one of the built-in presets by name.
    pub fn preset(name: &str) -> Result<Self, ConfigError> {
        let yaml = PRESETS
            .iter()
            .find(|(preset, _)| *preset == name)
            .map(|(_, yaml)| *yaml)
            .ok_or_else(|| ConfigError::UnknownSite(name.to_string()))?;
        Self::from_yaml(yaml)
    }

    /// Load a site configuration from a YAML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let yaml = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&yaml)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: SiteConfig = serde_yaml::from_str(yaml)?;
        config.fill_defaults();
        config.validate()?;
        Ok(config)
    }

    /// Output directory, defaulting to `chroniques_<tag>` in the working directory.
    pub fn output_dir(&self) -> PathBuf {
        self.crawl
            .output_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(format!("chroniques_{}", self.author.tag.to_lowercase())))
    }

    fn fill_defaults(&mut self) {
        if self.author.fragments.is_empty() {
            self.author.fragments = self
                .author
                .name
                .split_whitespace()
                .map(str::to_string)
                .collect();
        }
        if self.author.url_markers.is_empty() {
            self.author.url_markers = vec![crate::utils::slugify(&self.author.name)];
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.listings.is_empty() {
            return Err(ConfigError::Invalid(format!(
                "site `{}` declares no listings",
                self.name
            )));
        }
        if self.article.body.is_empty() {
            return Err(ConfigError::Invalid(format!(
                "site `{}` declares no body selectors",
                self.name
            )));
        }
        if let Some(listing) = self.listings.iter().find(|l| l.max_pages == 0) {
            return Err(ConfigError::Invalid(format!(
                "listing `{}` has a page budget of zero",
                listing.url_template
            )));
        }
        if self.crawl.workers == 0 {
            return Err(ConfigError::Invalid("workers must be at least 1".to_string()));
        }
        Ok(())
    }
}

fn default_true() -> bool {
    true
}

fn default_first_page_index() -> u32 {
    1
}

fn default_max_pages() -> u32 {
    50
}

fn default_anchor_selectors() -> Vec<String> {
    vec!["a[href]".to_string()]
}

fn default_byline_rules() -> Vec<FieldRule> {
    vec![
        FieldRule::Text(".author".to_string()),
        FieldRule::Text(".byline".to_string()),
        FieldRule::Text("[data-testid='author']".to_string()),
        FieldRule::Text("[rel~='author']".to_string()),
        FieldRule::Attr {
            selector: "meta[name='author']".to_string(),
            attr: "content".to_string(),
        },
    ]
}

fn default_title_rules() -> Vec<FieldRule> {
    vec![
        FieldRule::Text("h1".to_string()),
        FieldRule::Attr {
            selector: "meta[property='og:title']".to_string(),
            attr: "content".to_string(),
        },
        FieldRule::Text("title".to_string()),
    ]
}

fn default_date_selectors() -> Vec<String> {
    vec!["time[datetime]".to_string(), "time".to_string()]
}

fn default_body_selectors() -> Vec<String> {
    vec!["article p".to_string()]
}

fn default_paragraph_separator() -> String {
    "\n".to_string()
}

fn default_untitled() -> String {
    "Sans titre".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_presets_load() {
        for name in preset_names() {
            let config = SiteConfig::preset(name).unwrap();
            assert_eq!(config.name, name);
            assert!(!config.listings.is_empty());
            assert!(!config.author.url_markers.is_empty());
        }
    }

    #[test]
    fn test_unknown_preset() {
        let err = SiteConfig::preset("le-soleil").unwrap_err();
        assert!(matches!(err, ConfigError::UnknownSite(ref s) if s == "le-soleil"));
    }

    #[test]
    fn test_minimal_yaml_gets_defaults() {
        let yaml = r#"
name: test
author:
  name: Patrick Lagacé
  tag: Lagace
listings:
  - url_template: "https://example.com/auteurs/x?page={page}"
article: {}
"#;
        let config = SiteConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.author.fragments, vec!["Patrick", "Lagacé"]);
        assert_eq!(config.author.url_markers, vec!["patrick-lagace"]);
        assert!(config.author.verify);
        assert_eq!(config.listings[0].first_page_index, 1);
        assert_eq!(config.listings[0].anchors, vec!["a[href]"]);
        assert_eq!(config.article.body, vec!["article p"]);
        assert_eq!(config.article.language, Language::French);
        assert_eq!(config.crawl.workers, 1);
        assert_eq!(config.output_dir(), PathBuf::from("chroniques_lagace"));
    }

    #[test]
    fn test_field_rule_forms() {
        let yaml = r#"
- h1
- selector: "meta[property='og:title']"
  attr: content
"#;
        let rules: Vec<FieldRule> = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(rules[0], FieldRule::Text("h1".to_string()));
        assert_eq!(
            rules[1],
            FieldRule::Attr {
                selector: "meta[property='og:title']".to_string(),
                attr: "content".to_string()
            }
        );
    }

    #[test]
    fn test_rejects_zero_budget() {
        let yaml = r#"
name: test
author: { name: A B, tag: AB }
listings:
  - url_template: "https://example.com/{page}"
    max_pages: 0
article: {}
"#;
        assert!(matches!(
            SiteConfig::from_yaml(yaml),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_from_file_missing() {
        let err = SiteConfig::from_file(Path::new("/nonexistent/site.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
