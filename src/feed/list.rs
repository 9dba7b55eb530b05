use std::path::Path;

use crate::config::ConfigError;

/// Reads the feed list: one URL per line.
///
/// Lines are trimmed; blank lines and lines starting with `#` are skipped.
/// Order is preserved and duplicates are kept (a repeated URL is simply
/// checked twice).
///
/// # Errors
///
/// Returns [`ConfigError::FeedList`] if the file is missing or unreadable.
/// The caller aborts the run in that case.
pub fn load_feed_list(path: &Path) -> Result<Vec<String>, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::FeedList {
        path: path.to_path_buf(),
        source,
    })?;

    let urls = parse_feed_list(&content);
    tracing::debug!(path = %path.display(), count = urls.len(), "Loaded feed list");
    Ok(urls)
}

pub(crate) fn parse_feed_list(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_owned)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    #[test]
    fn test_comment_blank_and_one_url() {
        let content = "# my feeds\n\nhttps://a.example/feed\n";
        assert_eq!(parse_feed_list(content), vec!["https://a.example/feed"]);
    }

    #[test]
    fn test_order_and_duplicates_preserved() {
        let content = "https://b.example/feed\nhttps://a.example/feed\nhttps://b.example/feed\n";
        assert_eq!(
            parse_feed_list(content),
            vec![
                "https://b.example/feed",
                "https://a.example/feed",
                "https://b.example/feed",
            ]
        );
    }

    #[test]
    fn test_surrounding_whitespace_trimmed() {
        let content = "   https://a.example/feed  \r\n\t# indented comment\n   \n";
        assert_eq!(parse_feed_list(content), vec!["https://a.example/feed"]);
    }

    #[test]
    fn test_empty_file_yields_no_urls() {
        assert!(parse_feed_list("").is_empty());
        assert!(parse_feed_list("# nothing here yet\n\n").is_empty());
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let path = Path::new("/tmp/plaintextfeeds_test_no_such_feed_list");
        match load_feed_list(path) {
            Err(ConfigError::FeedList { path: p, source }) => {
                assert_eq!(p, path);
                assert_eq!(source.kind(), std::io::ErrorKind::NotFound);
            }
            other => panic!("Expected FeedList error, got {:?}", other),
        }
    }

    #[test]
    fn test_load_from_disk() {
        let dir = std::env::temp_dir().join("plaintextfeeds_list_test_load");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("feeds");
        std::fs::write(&path, "# comment\n\nhttps://a.example/feed\nhttps://b.example/feed\n")
            .unwrap();

        let urls = load_feed_list(&path).unwrap();
        assert_eq!(urls, vec!["https://a.example/feed", "https://b.example/feed"]);

        std::fs::remove_dir_all(&dir).ok();
    }

    proptest! {
        #[test]
        fn prop_no_comment_or_blank_survives(lines in proptest::collection::vec("[ #a-z:/.]{0,20}", 0..20)) {
            let content = lines.join("\n");
            for url in parse_feed_list(&content) {
                prop_assert!(!url.is_empty());
                prop_assert!(!url.starts_with('#'));
                prop_assert_eq!(url.trim(), url.as_str());
            }
        }
    }
}
