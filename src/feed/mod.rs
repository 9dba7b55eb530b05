//! Feed list loading, retrieval and parsing.
//!
//! - [`list`] - The user's plain-text feed list
//! - [`fetcher`] - HTTP retrieval with a deadline and a size ceiling
//! - [`parser`] - `feed-rs` output normalised into [`Entry`] / [`FetchedFeed`]
//!
//! Nothing outside this module sees `feed-rs` types.

mod fetcher;
mod list;
mod parser;

pub use fetcher::{FetchError, Fetcher};
pub use list::load_feed_list;
pub use parser::{derive_id, parse_feed, Entry, FetchedFeed};
