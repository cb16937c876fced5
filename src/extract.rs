//! Selector chains: ordered extraction strategies with first-match-wins
//! semantics.
//!
//! News markup changes often and differs between templates of the same
//! site, so every field is described as a list of places to look. A
//! [`SelectorChain`] tries them in priority order and commits to the first
//! strategy that produces a non-empty value; later strategies are never
//! consulted once one succeeds. A chain where nothing matches reports an
//! empty field, not an error.
//!
//! Strategies:
//! - [`TextOf`]: text of the first matching element with any text
//! - [`AttrOf`]: an attribute of the first matching element that carries it
//! - [`Paragraphs`]: body text from paragraphs above a length floor
//! - [`crate::dates::DateOf`]: a normalized date from a date element

use crate::config::{ConfigError, FieldRule};
use crate::fetcher::{Css, Document};
use crate::utils::collapse_whitespace;
use std::fmt;
use tracing::debug;

/// One way of pulling a value out of a document.
pub trait Strategy: fmt::Debug + Send + Sync {
    /// The selector this strategy looks at, for logs.
    fn describe(&self) -> &str;

    /// The value this strategy finds, or `None` if it finds nothing usable.
    fn try_extract(&self, doc: &Document) -> Option<String>;

    /// Every value this strategy finds. Defaults to the single value of
    /// [`Strategy::try_extract`].
    fn extract_all(&self, doc: &Document) -> Vec<String> {
        self.try_extract(doc).into_iter().collect()
    }
}

/// An ordered list of strategies.
#[derive(Debug, Default)]
pub struct SelectorChain {
    strategies: Vec<Box<dyn Strategy>>,
}

impl SelectorChain {
    pub fn new(strategies: Vec<Box<dyn Strategy>>) -> Self {
        Self { strategies }
    }

    /// Build a chain of text/attribute strategies from config rules.
    pub fn from_rules(rules: &[FieldRule]) -> Result<Self, ConfigError> {
        let strategies = rules
            .iter()
            .map(|rule| -> Result<Box<dyn Strategy>, ConfigError> {
                Ok(match rule {
                    FieldRule::Text(selector) => Box::new(TextOf::new(selector)?),
                    FieldRule::Attr { selector, attr } => Box::new(AttrOf::new(selector, attr)?),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(strategies))
    }

    /// Build a body chain: one [`Paragraphs`] strategy per selector.
    pub fn paragraphs(
        selectors: &[String],
        min_len: usize,
        separator: &str,
    ) -> Result<Self, ConfigError> {
        let strategies = selectors
            .iter()
            .map(|selector| -> Result<Box<dyn Strategy>, ConfigError> {
                Ok(Box::new(Paragraphs::new(selector, min_len, separator)?))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(strategies))
    }

    /// Build an anchor chain: the `href` of every element matching any selector.
    pub fn anchors(selectors: &[String]) -> Result<Self, ConfigError> {
        let strategies = selectors
            .iter()
            .map(|selector| -> Result<Box<dyn Strategy>, ConfigError> {
                Ok(Box::new(AttrOf::new(selector, "href")?))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(strategies))
    }

    /// First non-empty value, in priority order.
    pub fn extract(&self, doc: &Document) -> Option<String> {
        self.extract_indexed(doc).map(|(_, value)| value)
    }

    /// Like [`SelectorChain::extract`], also returning the index of the
    /// strategy that produced the value.
    pub fn extract_indexed(&self, doc: &Document) -> Option<(usize, String)> {
        for (i, strategy) in self.strategies.iter().enumerate() {
            if let Some(value) = strategy.try_extract(doc) {
                if !value.is_empty() {
                    debug!(index = i, selector = strategy.describe(), "Selector chain matched");
                    return Some((i, value));
                }
            }
        }
        None
    }

    /// Values from every strategy, in chain order then document order.
    /// Duplicates are kept; callers dedupe.
    pub fn union(&self, doc: &Document) -> Vec<String> {
        self.strategies
            .iter()
            .flat_map(|strategy| strategy.extract_all(doc))
            .collect()
    }
}

/// Collapsed text of the first matching element that has any.
#[derive(Debug)]
pub struct TextOf {
    css: Css,
}

impl TextOf {
    pub fn new(selector: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            css: Css::parse(selector)?,
        })
    }
}

impl Strategy for TextOf {
    fn describe(&self) -> &str {
        self.css.as_str()
    }

    fn try_extract(&self, doc: &Document) -> Option<String> {
        self.texts(doc).next()
    }

    fn extract_all(&self, doc: &Document) -> Vec<String> {
        self.texts(doc).collect()
    }
}

impl TextOf {
    fn texts<'a>(&'a self, doc: &'a Document) -> impl Iterator<Item = String> + 'a {
        doc.select(&self.css)
            .map(|el| collapse_whitespace(&el.text().collect::<String>()))
            .filter(|text| !text.is_empty())
    }
}

/// Trimmed value of one attribute.
#[derive(Debug)]
pub struct AttrOf {
    css: Css,
    attr: String,
}

impl AttrOf {
    pub fn new(selector: &str, attr: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            css: Css::parse(selector)?,
            attr: attr.to_string(),
        })
    }

    fn values<'a>(&'a self, doc: &'a Document) -> impl Iterator<Item = String> + 'a {
        doc.select(&self.css)
            .filter_map(|el| el.value().attr(&self.attr))
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    }
}

impl Strategy for AttrOf {
    fn describe(&self) -> &str {
        self.css.as_str()
    }

    fn try_extract(&self, doc: &Document) -> Option<String> {
        self.values(doc).next()
    }

    fn extract_all(&self, doc: &Document) -> Vec<String> {
        self.values(doc).collect()
    }
}

/// Body text: matching paragraphs whose trimmed length exceeds `min_len`,
/// joined with `separator` in document order.
///
/// Succeeds only if at least one paragraph clears the floor, which keeps
/// short boilerplate (captions, share buttons, ad labels) from passing as a
/// body.
#[derive(Debug)]
pub struct Paragraphs {
    css: Css,
    min_len: usize,
    separator: String,
}

impl Paragraphs {
    pub fn new(selector: &str, min_len: usize, separator: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            css: Css::parse(selector)?,
            min_len,
            separator: separator.to_string(),
        })
    }
}

impl Strategy for Paragraphs {
    fn describe(&self) -> &str {
        self.css.as_str()
    }

    fn try_extract(&self, doc: &Document) -> Option<String> {
        let paragraphs: Vec<String> = doc
            .select(&self.css)
            .map(|el| collapse_whitespace(&el.text().collect::<String>()))
            .filter(|text| text.chars().count() > self.min_len && !text.is_empty())
            .collect();
        if paragraphs.is_empty() {
            None
        } else {
            Some(paragraphs.join(&self.separator))
        }
    }
}
