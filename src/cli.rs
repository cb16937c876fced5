//! Command-line interface definitions for the column archiver.
//!
//! This module defines the CLI arguments and options using the `clap` crate.
//! The site comes from a built-in preset or a YAML file; every tuning flag is
//! optional and overrides the loaded configuration.

use crate::config::{ConfigError, SiteConfig, preset_names};
use clap::Parser;
use std::path::PathBuf;

/// Command-line arguments for the column archiver.
///
/// # Examples
///
/// ```sh
/// # Archive a preset site
/// chroniques_scraper --site lapresse-lagace
///
/// # Custom site file, faster pacing, manifest next to the text files
/// chroniques_scraper --config ./sites/custom.yaml --article-delay-ms 500 --json-manifest
///
/// # Show what a preset resolves to
/// chroniques_scraper --site jdm-bock-cote --dump-config
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Built-in site preset (see --list-sites)
    #[arg(short, long, env = "SCRAPER_SITE")]
    pub site: Option<String>,

    /// Path to a site YAML file; takes precedence over --site
    #[arg(short, long, env = "SCRAPER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory for the article files
    #[arg(short, long, env = "SCRAPER_OUTPUT_DIR")]
    pub output_dir: Option<PathBuf>,

    /// Listing page budget, applied to every listing surface
    #[arg(long)]
    pub max_pages: Option<u32>,

    /// Delay between listing pages, in milliseconds
    #[arg(long)]
    pub page_delay_ms: Option<u64>,

    /// Minimum spacing between article requests, in milliseconds
    #[arg(long)]
    pub article_delay_ms: Option<u64>,

    /// Number of article fetches in flight
    #[arg(short, long, value_parser = clap::value_parser!(u64).range(1..))]
    pub workers: Option<u64>,

    /// Also write a JSON manifest of saved articles and the run summary
    #[arg(long)]
    pub json_manifest: bool,

    /// Print the built-in site presets and exit
    #[arg(long)]
    pub list_sites: bool,

    /// Print the resolved site configuration as YAML and exit
    #[arg(long)]
    pub dump_config: bool,
}

impl Cli {
    /// Load the selected site and apply flag overrides.
    pub fn site_config(&self) -> Result<SiteConfig, ConfigError> {
        let mut config = match (&self.config, &self.site) {
            (Some(path), _) => SiteConfig::from_file(path)?,
            (None, Some(name)) => SiteConfig::preset(name)?,
            (None, None) => {
                return Err(ConfigError::Invalid(format!(
                    "no site selected; pass --site <{}> or --config <file>",
                    preset_names().collect::<Vec<_>>().join("|")
                )));
            }
        };
        self.apply_overrides(&mut config);
        Ok(config)
    }

    fn apply_overrides(&self, config: &mut SiteConfig) {
        if let Some(dir) = &self.output_dir {
            config.crawl.output_dir = Some(dir.clone());
        }
        if let Some(max_pages) = self.max_pages {
            for listing in &mut config.listings {
                listing.max_pages = max_pages.max(1);
            }
        }
        if let Some(ms) = self.page_delay_ms {
            config.crawl.page_delay_ms = ms;
        }
        if let Some(ms) = self.article_delay_ms {
            config.crawl.article_delay_ms = ms;
        }
        if let Some(workers) = self.workers {
            config.crawl.workers = workers as usize;
        }
    }
}
