//! JSON run manifest.
//!
//! Written once at the end of a run when `--json-manifest` is given:
//!
//! ```text
//! output_dir/
//! └── {site}_manifest.json
//! ```
//!
//! The manifest records the run date, the target author, the summary counts
//! and one entry per saved article, so downstream tooling does not have to
//! parse file headers.

use crate::models::{RunSummary, SavedArticle};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{error, info, instrument};

#[derive(Debug, Serialize, Deserialize)]
pub struct Manifest {
    pub site: String,
    pub author: String,
    pub run_date: String,
    pub summary: RunSummary,
    pub articles: Vec<SavedArticle>,
}

/// Write `manifest` to `{dir}/{site}_manifest.json`, returning the path.
#[instrument(level = "info", skip_all, fields(dir = %dir.display()))]
pub async fn write_manifest(manifest: &Manifest, dir: &Path) -> Result<PathBuf, Box<dyn Error>> {
    let json = serde_json::to_string_pretty(manifest)?;
    let path = dir.join(format!("{}_manifest.json", manifest.site));

    info!(path = %path.display(), "Writing JSON manifest");
    if let Err(e) = fs::write(&path, json).await {
        error!(path = %path.display(), error = %e, "Failed to write JSON manifest");
        return Err(e.into());
    }
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_manifest_round_trip() {
        let tmp = tempfile::tempdir().unwrap();
        let manifest = Manifest {
            site: "ledevoir-lisee".to_string(),
            author: "Jean-François Lisée".to_string(),
            run_date: "2026-10-16".to_string(),
            summary: RunSummary {
                discovered: 1,
                saved: 1,
                ..Default::default()
            },
            articles: vec![SavedArticle {
                title: "Titre".to_string(),
                url: "https://www.ledevoir.com/opinion/chroniques/1/x".to_string(),
                author: "Jean-François Lisée".to_string(),
                date: "2025-07-15".to_string(),
                date_inferred: false,
                file: "2025-07-15_Lisee_Titre.txt".to_string(),
            }],
        };

        let path = write_manifest(&manifest, tmp.path()).await.unwrap();
        assert!(path.ends_with("ledevoir-lisee_manifest.json"));

        let read: Manifest = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(read.articles, manifest.articles);
        assert_eq!(read.summary.saved, 1);
    }
}
