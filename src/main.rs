//! # Chroniques Scraper
//!
//! Archives every column a given author published on a news site. Listing
//! pages are paginated into a set of candidate URLs, each candidate is
//! checked for authorship, its title, date and body are extracted, and each
//! distinct article is saved as one plain-text file.
//!
//! ## Usage
//!
//! ```sh
//! chroniques_scraper --site ledevoir-lisee
//! chroniques_scraper --config ./my-site.yaml --workers 2 --json-manifest
//! ```
//!
//! ## Architecture
//!
//! 1. **Collecting**: walk each listing surface until a page adds no new link
//! 2. **Fetching**: load article pages behind a shared rate limiter
//! 3. **Extracting**: verify the author, then title, date and body
//! 4. **Output**: drop duplicates, write one text file per article, summarize

use chrono::Local;
use clap::Parser;
use std::error::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod author;
mod cli;
mod collector;
mod config;
mod crawl;
mod dates;
mod dedup;
mod extract;
mod fetcher;
mod models;
mod outputs;
mod rate_limit;
mod utils;

use cli::Cli;
use config::preset_names;
use crawl::{CrawlOrchestrator, Pipeline};
use fetcher::HttpFetcher;
use outputs::json::{self, Manifest};
use outputs::text::TextFileSink;
use utils::ensure_writable_dir;

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    if args.list_sites {
        for name in preset_names() {
            println!("{name}");
        }
        return Ok(());
    }

    let site = args.site_config()?;
    if args.dump_config {
        print!("{}", serde_yaml::to_string(&site)?);
        return Ok(());
    }

    let start_time = std::time::Instant::now();
    info!(site = %site.name, author = %site.author.name, "chroniques_scraper starting up");

    // Early check: the output dir must be writable before anything is fetched
    let output_dir = site.output_dir();
    if let Err(e) = ensure_writable_dir(&output_dir).await {
        error!(
            path = %output_dir.display(),
            error = %e,
            "Output directory is not writable (fix perms or choose a different path)"
        );
        return Err(e);
    }

    let pipeline = Pipeline::compile(&site)?;
    let fetcher = HttpFetcher::new(&site.crawl.user_agent)?;
    let sink = TextFileSink::new(&output_dir, &site.author.tag);

    // ---- Ctrl-C stops the run between pages and between articles ----
    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received; finishing in-flight articles");
            on_signal.cancel();
        }
    });

    let report = CrawlOrchestrator::new(&pipeline, &fetcher, &sink, &site.crawl, cancel)
        .run()
        .await;

    println!("\n=== {} ({}) ===", site.author.name, site.name);
    print!("{}", report.summary);
    println!("Output directory  : {}", sink.dir().display());

    if args.json_manifest {
        let manifest = Manifest {
            site: site.name.clone(),
            author: site.author.name.clone(),
            run_date: Local::now().date_naive().to_string(),
            summary: report.summary.clone(),
            articles: report.saved,
        };
        match json::write_manifest(&manifest, &output_dir).await {
            Ok(path) => info!(path = %path.display(), "Wrote JSON manifest"),
            Err(e) => error!(error = %e, "Failed to write JSON manifest"),
        }
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        saved = report.summary.saved,
        "Execution complete"
    );

    Ok(())
}
