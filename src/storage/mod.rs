mod atomic;
mod seen;

pub use atomic::{write_atomic, StagedFile};
pub use seen::{FeedRecord, PersistError, SeenStore, StoreError};
