//! Utility functions for text folding, string manipulation, and file system operations.
//!
//! This module provides helper functions used throughout the application:
//! - Accent/case folding for author-name comparison
//! - Slugification for author URL markers
//! - Whitespace collapsing for text pulled out of the DOM
//! - String truncation for logging
//! - File system validation for the output directory

use std::error::Error;
use std::fs as stdfs;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// Lowercase a string and strip diacritics.
///
/// Used wherever author names are compared against page content, so that
/// `"Lagacé"`, `"LAGACE"` and `"lagace"` all fold to the same value.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(fold("Jean-François Lisée"), "jean-francois lisee");
/// ```
pub fn fold(s: &str) -> String {
    s.nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_lowercase()
}

/// Convert a name to an ASCII, hyphenated slug.
///
/// Diacritics are stripped first, then every run of non-alphanumeric
/// characters collapses into a single `-`.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(slugify("Patrick Lagacé"), "patrick-lagace");
/// assert_eq!(slugify("Mathieu Bock-Côté"), "mathieu-bock-cote");
/// ```
pub fn slugify(name: &str) -> String {
    let folded = fold(name);
    let mut slug = String::with_capacity(folded.len());
    for c in folded.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c);
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    slug.trim_end_matches('-').to_string()
}

/// Collapse every run of whitespace into a single space and trim the ends.
///
/// DOM text nodes carry layout indentation and non-breaking spaces; this
/// normalises them before length checks and comparisons.
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Truncate a string for logging purposes.
///
/// Long strings are truncated to `max` characters with an ellipsis and
/// byte count indicator appended. Truncation always lands on a character
/// boundary.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// assert_eq!(truncate_for_log("a".repeat(500), 10), "aaaaaaaaaa…(+490 bytes)");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        None => s.to_string(),
        Some((cut, _)) => format!("{}…(+{} bytes)", &s[..cut], s.len() - cut),
    }
}

/// Ensure a directory exists and is writable.
///
/// This function creates the directory if it doesn't exist, then performs
/// a write test by creating and immediately deleting a probe file.
///
/// # Errors
///
/// Returns an error if:
/// - The directory cannot be created
/// - The directory is not writable (permission denied, read-only filesystem, etc.)
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn ensure_writable_dir(path: &Path) -> Result<(), Box<dyn Error>> {
    if let Err(e) = fs::create_dir_all(path).await {
        return Err(Box::new(e));
    }
    // Try a small sync write using std fs (simpler error surface)
    let probe_path = path.join("..__probe_write__");
    match stdfs::File::create(&probe_path) {
        Ok(_) => {
            let _ = stdfs::remove_file(&probe_path);
            info!("Output directory is writable");
            Ok(())
        }
        Err(e) => Err(Box::new(e)),
    }
}
