//! Prints entries from a list of RSS/Atom feeds that have not been printed
//! before, for cron-driven email digests.
//!
//! A run loads the feed list ([`feed::load_feed_list`]) and the seen-entry
//! store ([`storage::SeenStore`]), fetches each feed in order, writes the new
//! entries ([`app::run_digest`]), then saves the store once.

pub mod app;
pub mod config;
pub mod feed;
pub mod report;
pub mod storage;
pub mod util;
