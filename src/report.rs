//! New-entry detection and the plain-text digest layout.
//!
//! Output is meant to be piped into a mail command, so it is plain text with
//! one block per feed:
//!
//! ```text
//! Feed: Example News
//!  URL: https://news.example/feed
//!   Entry: Third post
//!    Link: https://news.example/3
//!    Date: 03 January 2023 at 10:00:00
//! ```
use std::io::{self, Write};

use crate::feed::Entry;
use crate::storage::SeenStore;

const MISSING_LINK: &str = "(URL missing)";

/// Returns the entries of `url` not yet in `store`, recording each one.
///
/// Fetch order is kept. An identifier repeated within the same fetch is
/// reported once.
pub fn take_new_entries(store: &mut SeenStore, url: &str, entries: Vec<Entry>) -> Vec<Entry> {
    entries
        .into_iter()
        .filter(|entry| store.record(url, &entry.id))
        .collect()
}

/// What one feed contributed to this run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedOutcome {
    /// Fetched; the entries not seen before (possibly none).
    Fetched(Vec<Entry>),
    /// Fetch or parse failed with this reason.
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedReport {
    pub url: String,
    pub title: Option<String>,
    pub outcome: FeedOutcome,
}

impl FeedReport {
    pub fn new_entries(&self) -> &[Entry] {
        match &self.outcome {
            FeedOutcome::Fetched(entries) => entries,
            FeedOutcome::Failed(_) => &[],
        }
    }

    pub fn failed(&self) -> bool {
        matches!(self.outcome, FeedOutcome::Failed(_))
    }
}

/// Writes the `Feed:` header, with the ` URL:` line when a title is known.
fn write_feed_header<W: Write>(out: &mut W, report: &FeedReport) -> io::Result<()> {
    let failed = if report.failed() {
        " (retrieval failed)"
    } else {
        ""
    };
    match &report.title {
        Some(title) => {
            writeln!(out, "Feed: {title}{failed}")?;
            writeln!(out, " URL: {}", report.url)
        }
        None => writeln!(out, "Feed: {}{failed}", report.url),
    }
}

fn write_entry<W: Write>(out: &mut W, entry: &Entry, date_format: &str) -> io::Result<()> {
    writeln!(out, "  Entry: {}", entry.title)?;
    writeln!(
        out,
        "   Link: {}",
        entry.link.as_deref().unwrap_or(MISSING_LINK)
    )?;
    if let Some(published) = entry.published {
        writeln!(out, "   Date: {}", published.format(date_format))?;
    }
    Ok(())
}

/// Writes one feed's block of new entries. Writes nothing when the feed
/// has nothing new.
pub fn write_feed_block<W: Write>(
    out: &mut W,
    report: &FeedReport,
    date_format: &str,
) -> io::Result<()> {
    let entries = report.new_entries();
    if entries.is_empty() {
        return Ok(());
    }

    write_feed_header(out, report)?;
    for entry in entries {
        write_entry(out, entry, date_format)?;
    }
    writeln!(out)
}

/// Writes the trailing list of feeds that produced nothing new, failed
/// ones included. Writes nothing when every feed had news.
pub fn write_unchanged_summary<W: Write>(out: &mut W, reports: &[FeedReport]) -> io::Result<()> {
    let mut quiet = reports.iter().filter(|r| r.new_entries().is_empty()).peekable();
    if quiet.peek().is_none() {
        return Ok(());
    }

    writeln!(out, "Feeds without new articles:")?;
    for report in quiet {
        write_feed_header(out, report)?;
    }
    Ok(())
}
