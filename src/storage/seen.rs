use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::atomic::write_atomic;

// ============================================================================
// Error Types
// ============================================================================

/// The persisted state could not be read. Recoverable: see
/// [`SeenStore::load_or_recover`].
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to read state file: {0}")]
    Io(#[from] std::io::Error),

    #[error("State file is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),

    #[error("State file version {found} is newer than supported version {supported}")]
    UnsupportedVersion { found: u32, supported: u32 },
}

/// The updated state could not be written. Fatal for the run: the previous
/// state file is left as it was, so entries will be reported again.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("Failed to serialize state: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Failed to write state file '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

// ============================================================================
// Store
// ============================================================================

const FORMAT_VERSION: u32 = 1;

/// Per-feed record of what has already been reported.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedRecord {
    #[serde(default)]
    pub seen: BTreeSet<String>,
    /// Last time the feed was fetched successfully.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_checked: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize)]
struct StateFile {
    version: u32,
    #[serde(default)]
    feeds: BTreeMap<String, FeedRecord>,
}

/// Feed URL → identifiers already reported for that feed.
///
/// Owned by one run: loaded at start, mutated while feeds are processed,
/// saved once at the end. Sets only grow; nothing is ever evicted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeenStore {
    feeds: BTreeMap<String, FeedRecord>,
}

impl SeenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads the store from `path`. A missing file is a first run and
    /// yields an empty store.
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        let content = match std::fs::read(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No state file, starting empty");
                return Ok(Self::new());
            }
            Err(e) => return Err(StoreError::Io(e)),
        };

        let state: StateFile = serde_json::from_slice(&content)?;
        if state.version > FORMAT_VERSION {
            return Err(StoreError::UnsupportedVersion {
                found: state.version,
                supported: FORMAT_VERSION,
            });
        }

        let store = Self { feeds: state.feeds };
        tracing::debug!(
            path = %path.display(),
            feeds = store.feeds.len(),
            "Loaded state file"
        );
        Ok(store)
    }

    /// Like [`load`](Self::load), but an unusable state file degrades to an
    /// empty store instead of failing.
    ///
    /// A corrupt or too-new file is first moved aside to
    /// `<name>.corrupt.<timestamp>` so the next save cannot destroy it.
    /// The returned error, if any, is for the caller to report.
    pub fn load_or_recover(path: &Path) -> (Self, Option<StoreError>) {
        match Self::load(path) {
            Ok(store) => (store, None),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Ignoring unusable state file");
                if matches!(
                    e,
                    StoreError::Corrupt(_) | StoreError::UnsupportedVersion { .. }
                ) {
                    move_aside(path);
                }
                (Self::new(), Some(e))
            }
        }
    }

    /// Whether `id` has already been reported for `url`.
    pub fn contains(&self, url: &str, id: &str) -> bool {
        self.feeds
            .get(url)
            .is_some_and(|record| record.seen.contains(id))
    }

    /// Marks `id` as reported for `url`. Returns `false` if it already was.
    pub fn record(&mut self, url: &str, id: &str) -> bool {
        self.feeds
            .entry(url.to_string())
            .or_default()
            .seen
            .insert(id.to_string())
    }

    /// Notes a successful fetch of `url`.
    pub fn mark_checked(&mut self, url: &str, at: DateTime<Utc>) {
        self.feeds.entry(url.to_string()).or_default().last_checked = Some(at);
    }

    pub fn feed(&self, url: &str) -> Option<&FeedRecord> {
        self.feeds.get(url)
    }

    pub fn seen_count(&self, url: &str) -> usize {
        self.feeds.get(url).map_or(0, |record| record.seen.len())
    }

    pub fn feed_count(&self) -> usize {
        self.feeds.len()
    }

    /// Writes the store to `path`, replacing any previous file atomically.
    /// Creates the parent directory if needed.
    pub fn save(&self, path: &Path) -> Result<(), PersistError> {
        let state = StateFile {
            version: FORMAT_VERSION,
            feeds: self.feeds.clone(),
        };
        let mut json = serde_json::to_vec_pretty(&state)?;
        json.push(b'\n');

        let io_err = |source| PersistError::Io {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        write_atomic(path, &json).map_err(io_err)?;

        tracing::debug!(path = %path.display(), feeds = self.feeds.len(), "Saved state file");
        Ok(())
    }
}

fn move_aside(path: &Path) {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let backup = path.with_file_name(format!(
        "{name}.corrupt.{}",
        Utc::now().format("%Y%m%d_%H%M%S")
    ));

    match std::fs::rename(path, &backup) {
        Ok(()) => tracing::warn!(backup = %backup.display(), "Moved unusable state file aside"),
        Err(e) => tracing::warn!(
            path = %path.display(),
            error = %e,
            "Failed to move unusable state file aside"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn test_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("plaintextfeeds_store_test_{name}"));
        std::fs::remove_dir_all(&dir).ok();
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    const A: &str = "https://a.example/feed";
    const B: &str = "https://b.example/feed";

    #[test]
    fn test_missing_file_is_empty_store() {
        let dir = test_dir("missing");
        let store = SeenStore::load(&dir.join("state.json")).unwrap();
        assert_eq!(store, SeenStore::new());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_record_is_idempotent() {
        let mut store = SeenStore::new();
        assert!(!store.contains(A, "1"));
        assert!(store.record(A, "1"));
        assert!(!store.record(A, "1"));
        assert!(store.contains(A, "1"));
        assert_eq!(store.seen_count(A), 1);
    }

    #[test]
    fn test_sets_are_per_feed() {
        let mut store = SeenStore::new();
        store.record(A, "shared-id");
        assert!(store.contains(A, "shared-id"));
        assert!(!store.contains(B, "shared-id"));
        assert_eq!(store.seen_count(B), 0);
    }

    #[test]
    fn test_save_then_load() {
        let dir = test_dir("roundtrip");
        let path = dir.join("state.json");
        let checked = Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap();

        let mut store = SeenStore::new();
        for id in ["1", "2", "3"] {
            store.record(A, id);
        }
        store.record(B, "x");
        store.mark_checked(A, checked);
        store.save(&path).unwrap();

        let loaded = SeenStore::load(&path).unwrap();
        assert_eq!(loaded, store);
        assert_eq!(loaded.feed(A).unwrap().last_checked, Some(checked));
        assert_eq!(loaded.feed(B).unwrap().last_checked, None);
        assert_eq!(loaded.feed_count(), 2);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_save_creates_parent_directory() {
        let dir = test_dir("parent");
        let path = dir.join("nested").join("state.json");

        let mut store = SeenStore::new();
        store.record(A, "1");
        store.save(&path).unwrap();
        assert!(SeenStore::load(&path).unwrap().contains(A, "1"));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_saved_format_is_versioned_json() {
        let dir = test_dir("format");
        let path = dir.join("state.json");

        let mut store = SeenStore::new();
        store.record(A, "b");
        store.record(A, "a");
        store.save(&path).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["version"], 1);
        assert_eq!(value["feeds"][A]["seen"], serde_json::json!(["a", "b"]));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_corrupt_file_is_error() {
        let dir = test_dir("corrupt");
        let path = dir.join("state.json");
        std::fs::write(&path, "https://a.example/feed last updated 2024-01-01").unwrap();

        assert!(matches!(SeenStore::load(&path), Err(StoreError::Corrupt(_))));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_newer_version_rejected() {
        let dir = test_dir("version");
        let path = dir.join("state.json");
        std::fs::write(&path, r#"{"version": 99, "feeds": {}}"#).unwrap();

        match SeenStore::load(&path) {
            Err(StoreError::UnsupportedVersion { found, supported }) => {
                assert_eq!(found, 99);
                assert_eq!(supported, FORMAT_VERSION);
            }
            other => panic!("Expected UnsupportedVersion, got {:?}", other),
        }
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_recover_moves_corrupt_file_aside() {
        let dir = test_dir("recover");
        let path = dir.join("state.json");
        std::fs::write(&path, "{ not json").unwrap();

        let (store, err) = SeenStore::load_or_recover(&path);
        assert_eq!(store, SeenStore::new());
        assert!(matches!(err, Some(StoreError::Corrupt(_))));
        assert!(!path.exists());

        let backups: Vec<_> = std::fs::read_dir(&dir)
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| e.file_name().to_string_lossy().starts_with("state.json.corrupt."))
            .collect();
        assert_eq!(backups.len(), 1);
        assert_eq!(
            std::fs::read_to_string(backups[0].path()).unwrap(),
            "{ not json"
        );

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_recover_passes_good_state_through() {
        let dir = test_dir("recover_good");
        let path = dir.join("state.json");

        let mut store = SeenStore::new();
        store.record(A, "1");
        store.save(&path).unwrap();

        let (loaded, err) = SeenStore::load_or_recover(&path);
        assert!(err.is_none());
        assert_eq!(loaded, store);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_unwritable_destination_is_persist_error() {
        let dir = test_dir("failed_save");

        // A non-empty directory squatting on the destination makes the rename fail
        let blocked = dir.join("state.json");
        std::fs::create_dir_all(blocked.join("inner")).unwrap();

        let mut store = SeenStore::new();
        store.record(A, "1");
        let err = store.save(&blocked).unwrap_err();
        assert!(matches!(err, PersistError::Io { .. }));
        assert!(err.to_string().contains("state.json"));

        let leftovers = std::fs::read_dir(&dir)
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| e.file_name().to_string_lossy().contains(".tmp."))
            .count();
        assert_eq!(leftovers, 0);

        std::fs::remove_dir_all(&dir).ok();
    }
}
