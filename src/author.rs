//! Authorship verification.
//!
//! Listing pages are not a reliable source of attribution (section pages mix
//! authors, author pages embed "related" links), so every fetched article is
//! checked against independent signals, in order:
//!
//! 1. the URL carries one of the author's URL markers (normally the name slug)
//! 2. a byline element contains every name fragment
//! 3. JSON-LD metadata has an `author` (at any depth) containing every fragment
//!
//! The first positive signal wins. No signal is an ordinary negative result.
//! All comparisons are case- and accent-insensitive substring matches.

use crate::config::{AuthorConfig, ConfigError};
use crate::extract::SelectorChain;
use crate::fetcher::{Css, Document};
use crate::utils::fold;
use serde_json::Value;
use std::fmt;
use tracing::{debug, trace};
use url::Url;

/// Which signal attributed a document to the author.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorSignal {
    Url,
    Byline,
    StructuredData,
    /// Verification is disabled for this site.
    Unverified,
}

impl fmt::Display for AuthorSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AuthorSignal::Url => "url",
            AuthorSignal::Byline => "byline",
            AuthorSignal::StructuredData => "json-ld",
            AuthorSignal::Unverified => "unverified",
        };
        f.write_str(s)
    }
}

/// Checks documents against one target author.
#[derive(Debug)]
pub struct AuthorVerifier {
    fragments: Vec<String>,
    url_markers: Vec<String>,
    byline: SelectorChain,
    json_ld: Css,
    enabled: bool,
}

impl AuthorVerifier {
    pub fn new(config: &AuthorConfig) -> Result<Self, ConfigError> {
        let fragments: Vec<String> = config
            .fragments
            .iter()
            .map(|f| fold(f.trim()))
            .filter(|f| !f.is_empty())
            .collect();
        if config.verify && fragments.is_empty() {
            return Err(ConfigError::Invalid(format!(
                "author `{}` has no name fragments to verify against",
                config.name
            )));
        }
        Ok(Self {
            fragments,
            url_markers: config
                .url_markers
                .iter()
                .map(|m| fold(m.trim()))
                .filter(|m| !m.is_empty())
                .collect(),
            byline: SelectorChain::from_rules(&config.byline)?,
            json_ld: Css::parse(r#"script[type="application/ld+json"]"#)?,
            enabled: config.verify,
        })
    }

    /// Whether `url` carries one of the author's URL markers.
    pub fn url_matches(&self, url: &Url) -> bool {
        let url = fold(url.as_str());
        self.url_markers.iter().any(|marker| url.contains(marker.as_str()))
    }

    /// Whether `text` contains every name fragment.
    pub fn names_match(&self, text: &str) -> bool {
        let text = fold(text);
        self.fragments.iter().all(|f| text.contains(f.as_str()))
    }

    /// The first signal attributing `doc` (fetched from `url`) to the author,
    /// or `None` if the document is not theirs.
    pub fn verify(&self, doc: &Document, url: &Url) -> Option<AuthorSignal> {
        if !self.enabled {
            return Some(AuthorSignal::Unverified);
        }
        if self.url_matches(url) {
            return Some(AuthorSignal::Url);
        }
        if self.byline_matches(doc) {
            return Some(AuthorSignal::Byline);
        }
        if self.structured_data_matches(doc) {
            return Some(AuthorSignal::StructuredData);
        }
        debug!(%url, "No authorship signal matched");
        None
    }

    /// Every byline candidate, not only the first: pages often carry an
    /// unrelated `.author` block (newsletter, comments) before the real one.
    fn byline_matches(&self, doc: &Document) -> bool {
        self.byline.union(doc).iter().any(|text| self.names_match(text))
    }

    fn structured_data_matches(&self, doc: &Document) -> bool {
        for script in doc.select(&self.json_ld) {
            let raw = script.text().collect::<String>();
            let value: Value = match serde_json::from_str(raw.trim()) {
                Ok(v) => v,
                Err(e) => {
                    trace!(error = %e, "Skipping unparseable JSON-LD block");
                    continue;
                }
            };
            let mut names = Vec::new();
            collect_author_names(&value, false, &mut names);
            if names.iter().any(|name| self.names_match(name)) {
                return true;
            }
        }
        false
    }
}

/// Walk a JSON-LD value, collecting strings found under any `author` key.
///
/// `author` may be a string, an object with `name`, an array of either, or
/// sit inside `@graph` or any other nesting.
fn collect_author_names(value: &Value, under_author: bool, out: &mut Vec<String>) {
    match value {
        Value::String(s) if under_author => out.push(s.clone()),
        Value::Array(items) => {
            for item in items {
                collect_author_names(item, under_author, out);
            }
        }
        Value::Object(map) => {
            for (key, child) in map {
                let is_author = key.eq_ignore_ascii_case("author");
                let keeps_author = under_author && key == "name";
                collect_author_names(child, is_author || keeps_author, out);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FieldRule;

    fn lagace() -> AuthorVerifier {
        AuthorVerifier::new(&AuthorConfig {
            name: "Patrick Lagacé".to_string(),
            tag: "Lagace".to_string(),
            fragments: vec!["patrick".to_string(), "lagac".to_string()],
            url_markers: vec!["patrick-lagace".to_string()],
            byline: vec![
                FieldRule::Text(".byline".to_string()),
                FieldRule::Attr {
                    selector: "meta[name='author']".to_string(),
                    attr: "content".to_string(),
                },
            ],
            verify: true,
        })
        .unwrap()
    }

    fn doc(url: &str, html: &str) -> (Document, Url) {
        let url = Url::parse(url).unwrap();
        (Document::parse(url.clone(), html), url)
    }

    #[test]
    fn test_url_signal() {
        let (d, u) = doc("https://www.lapresse.ca/auteurs/patrick-lagace/2025-01-01/x.php", "");
        assert_eq!(lagace().verify(&d, &u), Some(AuthorSignal::Url));
    }

    #[test]
    fn test_byline_signal_case_and_accent_insensitive() {
        let (d, u) = doc(
            "https://www.lapresse.ca/actualites/2025-01-01/x.php",
            r#"<div class="byline">Par PATRICK LAGACÉ, La Presse</div>"#,
        );
        assert_eq!(lagace().verify(&d, &u), Some(AuthorSignal::Byline));
    }

    #[test]
    fn test_byline_needs_every_fragment() {
        let (d, u) = doc(
            "https://www.lapresse.ca/actualites/2025-01-01/x.php",
            r#"<div class="byline">Patrick Roy</div>"#,
        );
        assert_eq!(lagace().verify(&d, &u), None);
    }

    #[test]
    fn test_later_byline_candidate_counts() {
        let (d, u) = doc(
            "https://www.lapresse.ca/actualites/x.php",
            r#"<div class="byline">Infolettre</div><meta name="author" content="Patrick Lagacé">"#,
        );
        assert_eq!(lagace().verify(&d, &u), Some(AuthorSignal::Byline));
    }

    #[test]
    fn test_second_element_of_same_rule_counts() {
        let (d, u) = doc(
            "https://www.lapresse.ca/actualites/x.php",
            r#"<div class="byline">Infolettre</div><div class="byline">Patrick Lagacé</div>"#,
        );
        assert_eq!(lagace().verify(&d, &u), Some(AuthorSignal::Byline));
    }

    #[test]
    fn test_json_ld_nested_author() {
        let (d, u) = doc(
            "https://www.lapresse.ca/actualites/x.php",
            r#"<script type="application/ld+json">{ not json }</script>
               <script type="application/ld+json">
               {"@graph": [{"@type": "NewsArticle",
                 "author": [{"@type": "Person", "name": "Patrick Lagacé"}]}]}
               </script>"#,
        );
        assert_eq!(lagace().verify(&d, &u), Some(AuthorSignal::StructuredData));
    }

    #[test]
    fn test_json_ld_plain_string_author() {
        let (d, u) = doc(
            "https://www.lapresse.ca/actualites/x.php",
            r#"<script type="application/ld+json">{"author": "patrick lagace"}</script>"#,
        );
        assert_eq!(lagace().verify(&d, &u), Some(AuthorSignal::StructuredData));
    }

    #[test]
    fn test_json_ld_other_names_ignored() {
        let (d, u) = doc(
            "https://www.lapresse.ca/actualites/x.php",
            r#"<script type="application/ld+json">
               {"name": "Patrick Lagacé", "author": {"name": "Yves Boisvert"}}
               </script>"#,
        );
        assert_eq!(lagace().verify(&d, &u), None);
    }

    #[test]
    fn test_no_signal_is_negative() {
        let (d, u) = doc(
            "https://www.lapresse.ca/actualites/x.php",
            r#"<div class="byline">Yves Boisvert</div>"#,
        );
        assert_eq!(lagace().verify(&d, &u), None);
    }

    #[test]
    fn test_disabled_verification() {
        let v = AuthorVerifier::new(&AuthorConfig {
            name: "Radio-Canada".to_string(),
            tag: "RadioCanada".to_string(),
            fragments: vec![],
            url_markers: vec![],
            byline: vec![],
            verify: false,
        })
        .unwrap();
        let (d, u) = doc("https://ici.radio-canada.ca/info/analyses/1", "");
        assert_eq!(v.verify(&d, &u), Some(AuthorSignal::Unverified));
    }

    #[test]
    fn test_verify_without_fragments_rejected() {
        let err = AuthorVerifier::new(&AuthorConfig {
            name: "X".to_string(),
            tag: "X".to_string(),
            fragments: vec![],
            url_markers: vec![],
            byline: vec![],
            verify: true,
        });
        assert!(err.is_err());
    }
}
