use chrono::{DateTime, SecondsFormat, Utc};
use feed_rs::parser;
use sha2::{Digest, Sha256};

use crate::util::single_line;

const MISSING_TITLE: &str = "(Title missing)";

/// One entry of a fetched feed, normalised away from the `feed-rs` model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Stable identifier used for seen-tracking, see [`derive_id`].
    pub id: String,
    pub title: String,
    pub link: Option<String>,
    pub published: Option<DateTime<Utc>>,
}

/// A successfully fetched and parsed feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedFeed {
    /// The feed's own title, when it declares one.
    pub title: Option<String>,
    /// Entries in the order the feed lists them.
    pub entries: Vec<Entry>,
}

/// Parses RSS, Atom or JSON Feed bytes into a [`FetchedFeed`].
///
/// `feed-rs` would otherwise invent an ID (sometimes a random UUID) for
/// entries that lack one, so its generator is replaced with one yielding an
/// empty string and [`derive_id`] applies the fallbacks instead.
pub fn parse_feed(bytes: &[u8]) -> Result<FetchedFeed, parser::ParseFeedError> {
    let feed = parser::Builder::new()
        .id_generator(|_, _, _| String::new())
        .build()
        .parse(bytes)?;

    let title = feed
        .title
        .map(|t| single_line(&t.content).into_owned())
        .filter(|t| !t.is_empty());

    let entries = feed
        .entries
        .into_iter()
        .map(|entry| {
            let link = entry
                .links
                .first()
                .map(|l| single_line(&l.href).into_owned())
                .filter(|href| !href.is_empty());
            let published = entry.published.or(entry.updated);
            let title = entry
                .title
                .map(|t| single_line(&t.content).into_owned())
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| MISSING_TITLE.to_string());

            let id = derive_id(Some(entry.id.as_str()), link.as_deref(), &title, published);

            Entry {
                id,
                title,
                link,
                published,
            }
        })
        .collect();

    Ok(FetchedFeed { title, entries })
}

/// Picks the identifier an entry is tracked under.
///
/// Preference: the feed-native ID, then the entry link, then a SHA-256 of
/// title and published time. Entries with none of these stable across
/// fetches will be reported again on every run.
pub fn derive_id(
    native: Option<&str>,
    link: Option<&str>,
    title: &str,
    published: Option<DateTime<Utc>>,
) -> String {
    for candidate in [native, link].into_iter().flatten() {
        let trimmed = candidate.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let input = format!(
        "{}|{}",
        title,
        published
            .map(|p| p.to_rfc3339_opts(SecondsFormat::Secs, true))
            .unwrap_or_default()
    );
    let hash = Sha256::digest(input.as_bytes());
    format!("{:x}", hash)
}
