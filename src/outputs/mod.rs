//! Persistence of accepted articles.
//!
//! # Submodules
//!
//! - [`text`]: one `.txt` file per article, the archive format
//! - [`json`]: an optional run manifest listing every saved article
//!
//! # Output Structure
//!
//! ```text
//! output_dir/
//! ├── 2025-07-15_Lisee_Le_Québec__et_la_langue.txt
//! ├── 2025-07-22_Lisee_Une_autre_chronique.txt
//! └── ledevoir-lisee_manifest.json   # with --json-manifest
//! ```

pub mod json;
pub mod text;

use crate::models::ExtractedArticle;
use std::error::Error;

/// Somewhere accepted articles are written to.
pub trait ArticleSink {
    /// Persist one article, returning the name it was stored under.
    async fn save(&self, article: &ExtractedArticle) -> Result<String, Box<dyn Error>>;
}
