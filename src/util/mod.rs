//! Utility functions shared by the fetcher and the digest output.
//!
//! - **URL validation**: syntax check of feed list entries before fetching
//! - **Text processing**: flattening feed-supplied titles into safe single lines

mod text;
mod url_validator;

pub use text::single_line;
pub use url_validator::{validate_url, UrlValidationError};
