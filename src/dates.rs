//! Publication date normalization.
//!
//! Dates show up as ISO timestamps in `datetime` attributes, as ISO strings
//! in display text, or as localized prose (`15 juillet 2025`). Everything is
//! reduced to `YYYY-MM-DD`. Attempts, in order:
//!
//! 1. an ISO date inside the machine-readable attribute, used verbatim
//! 2. an ISO date inside the display text
//! 3. `D MONTHNAME YYYY` in the display text, via the month table of the
//!    site's language
//! 4. today's date
//!
//! The last step is an accuracy limitation, not a failure: normalization
//! never errors. Callers can tell an inferred date from a found one through
//! [`PublicationDate::inferred`].

use crate::config::{ConfigError, Language};
use crate::extract::Strategy;
use crate::fetcher::{Css, Document};
use crate::utils::fold;
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

static ISO_DATE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d{4}-\d{2}-\d{2})").unwrap());

static LOCALIZED_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(\d{1,2})(?:er|st|nd|rd|th)?\s+(\p{L}+)\.?,?\s+(\d{4})\b").unwrap());

/// Month names, folded (lowercase, no accents).
const FRENCH_MONTHS: &[(&str, u32)] = &[
    ("janvier", 1),
    ("janv", 1),
    ("fevrier", 2),
    ("fevr", 2),
    ("mars", 3),
    ("avril", 4),
    ("avr", 4),
    ("mai", 5),
    ("juin", 6),
    ("juillet", 7),
    ("juil", 7),
    ("aout", 8),
    ("septembre", 9),
    ("sept", 9),
    ("octobre", 10),
    ("oct", 10),
    ("novembre", 11),
    ("nov", 11),
    ("decembre", 12),
    ("dec", 12),
];

const ENGLISH_MONTHS: &[(&str, u32)] = &[
    ("january", 1),
    ("jan", 1),
    ("february", 2),
    ("feb", 2),
    ("march", 3),
    ("mar", 3),
    ("april", 4),
    ("apr", 4),
    ("may", 5),
    ("june", 6),
    ("jun", 6),
    ("july", 7),
    ("jul", 7),
    ("august", 8),
    ("aug", 8),
    ("september", 9),
    ("sep", 9),
    ("sept", 9),
    ("october", 10),
    ("oct", 10),
    ("november", 11),
    ("nov", 11),
    ("december", 12),
    ("dec", 12),
];

fn month_number(language: Language, name: &str) -> Option<u32> {
    let table = match language {
        Language::French => FRENCH_MONTHS,
        Language::English => ENGLISH_MONTHS,
    };
    let name = fold(name);
    table
        .iter()
        .find(|(month, _)| *month == name)
        .map(|(_, n)| *n)
}

/// A `YYYY-MM-DD` date and whether it was found or defaulted to today.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PublicationDate {
    pub date: String,
    pub inferred: bool,
}

impl PublicationDate {
    pub fn found(date: impl Into<String>) -> Self {
        Self {
            date: date.into(),
            inferred: false,
        }
    }

    pub fn today(today: NaiveDate) -> Self {
        Self {
            date: today.format("%Y-%m-%d").to_string(),
            inferred: true,
        }
    }
}

impl fmt::Display for PublicationDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.date)
    }
}

/// First ISO `YYYY-MM-DD` substring, verbatim.
pub fn find_iso(text: &str) -> Option<String> {
    ISO_DATE.captures(text).map(|c| c[1].to_string())
}

/// First `D MONTHNAME YYYY` occurrence with a known month, zero-padded.
pub fn find_localized(text: &str, language: Language) -> Option<String> {
    LOCALIZED_DATE.captures_iter(text).find_map(|c| {
        let day: u32 = c[1].parse().ok()?;
        let month = month_number(language, &c[2])?;
        let year: i32 = c[3].parse().ok()?;
        NaiveDate::from_ymd_opt(year, month, day).map(|d| d.format("%Y-%m-%d").to_string())
    })
}

/// Steps 1–3: a date from an element's attribute and display text, if any.
pub fn parse_date(attribute: Option<&str>, text: &str, language: Language) -> Option<String> {
    attribute
        .and_then(find_iso)
        .or_else(|| find_iso(text))
        .or_else(|| find_localized(text, language))
}

/// Step 4: a found date, or `today` marked as inferred. Never fails.
pub fn normalize(found: Option<String>, today: NaiveDate) -> PublicationDate {
    match found {
        Some(date) => PublicationDate::found(date),
        None => PublicationDate::today(today),
    }
}

/// Date strategy: the first element matching the selector, read through its
/// `datetime`/`content` attribute, then its text. Later matches are ignored.
#[derive(Debug)]
pub struct DateOf {
    css: Css,
    language: Language,
}

impl DateOf {
    pub fn new(selector: &str, language: Language) -> Result<Self, ConfigError> {
        Ok(Self {
            css: Css::parse(selector)?,
            language,
        })
    }
}

impl Strategy for DateOf {
    fn describe(&self) -> &str {
        self.css.as_str()
    }

    fn try_extract(&self, doc: &Document) -> Option<String> {
        let el = doc.select_first(&self.css)?;
        let attr = el
            .value()
            .attr("datetime")
            .or_else(|| el.value().attr("content"));
        let text = el.text().collect::<String>();
        parse_date(attr, &text, self.language)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::SelectorChain;
    use url::Url;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, 2).unwrap()
    }

    fn normalize_text(attr: Option<&str>, text: &str, language: Language, today: NaiveDate) -> PublicationDate {
        normalize(parse_date(attr, text, language), today)
    }

    #[test]
    fn test_french_long_form() {
        let d = normalize_text(None, "15 juillet 2025", Language::French, today());
        assert_eq!(d, PublicationDate::found("2025-07-15"));
    }

    #[test]
    fn test_iso_attribute_verbatim() {
        let d = normalize_text(
            Some("2025-07-15T10:00:00Z"),
            "il y a deux heures",
            Language::French,
            today(),
        );
        assert_eq!(d.date, "2025-07-15");
        assert!(!d.inferred);
    }

    #[test]
    fn test_unparseable_falls_back_to_today() {
        let d = normalize_text(None, "hier soir", Language::French, today());
        assert_eq!(d.date, "2026-01-02");
        assert!(d.inferred);
    }

    #[test]
    fn test_attribute_wins_over_text() {
        let d = normalize_text(Some("2024-03-01"), "15 juillet 2025", Language::French, today());
        assert_eq!(d.date, "2024-03-01");
    }

    #[test]
    fn test_iso_in_text() {
        let d = normalize_text(Some("not a date"), "Publié le 2023-11-05 à 6 h", Language::French, today());
        assert_eq!(d.date, "2023-11-05");
    }

    #[test]
    fn test_zero_padding_and_accents() {
        assert_eq!(find_localized("3 août 2024", Language::French).as_deref(), Some("2024-08-03"));
        assert_eq!(find_localized("3 aout 2024", Language::French).as_deref(), Some("2024-08-03"));
        assert_eq!(find_localized("1er février 2024", Language::French).as_deref(), Some("2024-02-01"));
        assert_eq!(find_localized("9 DÉCEMBRE 2021", Language::French).as_deref(), Some("2021-12-09"));
    }

    #[test]
    fn test_unknown_month_and_impossible_day() {
        assert_eq!(find_localized("15 brumaire 2025", Language::French), None);
        assert_eq!(find_localized("31 février 2025", Language::French), None);
        // first valid occurrence wins
        assert_eq!(
            find_localized("mis à jour le 40 mai 2025, publié le 2 mai 2025", Language::French).as_deref(),
            Some("2025-05-02")
        );
    }

    #[test]
    fn test_english_table() {
        assert_eq!(find_localized("July 4th 2025", Language::English), None);
        assert_eq!(find_localized("4 July 2025", Language::English).as_deref(), Some("2025-07-04"));
        assert_eq!(find_localized("15 juillet 2025", Language::English), None);
    }

    #[test]
    fn test_date_strategy_in_chain() {
        let doc = Document::parse(
            Url::parse("https://example.com/a").unwrap(),
            r#"<time>sans date</time><span class="date">Publié le 15 juillet 2025</span>"#,
        );
        let chain = SelectorChain::new(vec![
            Box::new(DateOf::new("time[datetime]", Language::French).unwrap()),
            Box::new(DateOf::new("time", Language::French).unwrap()),
            Box::new(DateOf::new(".date", Language::French).unwrap()),
        ]);
        assert_eq!(chain.extract_indexed(&doc), Some((2, "2025-07-15".to_string())));
    }

    #[test]
    fn test_only_first_matching_element_is_read() {
        let doc = Document::parse(
            Url::parse("https://example.com/a").unwrap(),
            r#"<time>mis à jour</time><span class="date">12 mars 2024</span>
               <aside><time datetime="2019-01-01">Article connexe</time></aside>"#,
        );
        let chain = SelectorChain::new(vec![
            Box::new(DateOf::new("time", Language::French).unwrap()),
            Box::new(DateOf::new(".date", Language::French).unwrap()),
        ]);
        assert_eq!(chain.extract_indexed(&doc), Some((1, "2024-03-12".to_string())));
    }
}
