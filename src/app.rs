//! One digest run: fetch each listed feed in order, report what is new,
//! and update the seen-entry store in memory.
//!
//! [`run`] wraps [`run_digest`] with everything around it: loading the feed
//! list and the store, and saving the store once the digest is out.
use std::io::{self, Write};
use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;

use crate::config::Config;
use crate::feed::{load_feed_list, Fetcher};
use crate::report::{
    take_new_entries, write_feed_block, write_unchanged_summary, FeedOutcome, FeedReport,
};
use crate::storage::SeenStore;

/// Per-feed results of a finished run, in feed list order.
#[derive(Debug, Default)]
pub struct DigestRun {
    pub reports: Vec<FeedReport>,
}

impl DigestRun {
    pub fn new_entry_count(&self) -> usize {
        self.reports.iter().map(|r| r.new_entries().len()).sum()
    }

    pub fn failed_count(&self) -> usize {
        self.reports.iter().filter(|r| r.failed()).count()
    }
}

/// Fetches every feed in `urls` sequentially and writes the digest.
///
/// New entries go to `out` as each feed completes; fetch failures go to
/// `err` and never stop the run. `store` gains every reported identifier.
///
/// # Errors
///
/// Only a failure to write `out` is returned. The caller must then skip
/// saving the store, since the entries were never delivered.
pub async fn run_digest<W: Write, E: Write>(
    fetcher: &Fetcher,
    urls: &[String],
    store: &mut SeenStore,
    config: &Config,
    out: &mut W,
    err: &mut E,
) -> io::Result<DigestRun> {
    let mut run = DigestRun::default();

    for url in urls {
        let report = match fetcher.fetch(url).await {
            Ok(feed) => {
                store.mark_checked(url, Utc::now());
                let fetched = feed.entries.len();
                let new = take_new_entries(store, url, feed.entries);
                tracing::info!(
                    url = %url,
                    fetched = fetched,
                    new = new.len(),
                    "Checked feed"
                );
                FeedReport {
                    url: url.clone(),
                    title: feed.title,
                    outcome: FeedOutcome::Fetched(new),
                }
            }
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "Feed retrieval failed, skipping");
                // A closed stderr must not cost the reader the rest of the digest
                let _ = writeln!(err, "Error: failed to retrieve {url}: {e}");
                FeedReport {
                    url: url.clone(),
                    title: None,
                    outcome: FeedOutcome::Failed(e.to_string()),
                }
            }
        };

        write_feed_block(out, &report, &config.date_format)?;
        run.reports.push(report);
    }

    if config.list_unchanged_feeds {
        write_unchanged_summary(out, &run.reports)?;
    }
    out.flush()?;

    tracing::info!(
        feeds = run.reports.len(),
        failed = run.failed_count(),
        new_entries = run.new_entry_count(),
        "Digest complete"
    );
    Ok(run)
}

/// One full invocation against already resolved paths.
///
/// An empty feed list ends the run before the store is opened, so the state
/// file is left alone. An unreadable or corrupt store is reported on `err`
/// and the run carries on as if nothing had been seen yet.
///
/// # Errors
///
/// Fails when the feed list cannot be read, when `out` cannot be written, or
/// when the store cannot be saved. In the last case the digest has already
/// been printed and the same entries will be reported on the next run.
pub async fn run<W: Write, E: Write>(
    feeds_path: &Path,
    state_path: &Path,
    config: &Config,
    out: &mut W,
    err: &mut E,
) -> Result<DigestRun> {
    let urls = load_feed_list(feeds_path)?;
    if urls.is_empty() {
        let _ = writeln!(err, "No URLs listed in {}; exiting.", feeds_path.display());
        return Ok(DigestRun::default());
    }
    tracing::info!(feeds = urls.len(), path = %feeds_path.display(), "Loaded feed list");

    let (mut store, store_err) = SeenStore::load_or_recover(state_path);
    if let Some(e) = store_err {
        let _ = writeln!(
            err,
            "Warning: {} ({}); treating every entry as new",
            e,
            state_path.display()
        );
    }

    let fetcher = Fetcher::new(config).context("Failed to create HTTP client")?;

    let run = run_digest(&fetcher, &urls, &mut store, config, out, err)
        .await
        .context("Failed to write digest to stdout")?;

    store.save(state_path).context(
        "Failed to save seen-entry state; this run's entries will be reported again",
    )?;

    Ok(run)
}
