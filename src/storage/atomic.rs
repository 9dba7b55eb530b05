use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// A fully written and synced temp file waiting to replace its destination.
///
/// Dropping it without [`commit`](StagedFile::commit) removes the temp file
/// and leaves the destination untouched.
#[derive(Debug)]
pub struct StagedFile {
    temp_path: PathBuf,
    dst: PathBuf,
    committed: bool,
}

impl StagedFile {
    /// Writes `contents` to a fresh sibling of `dst` and syncs it to disk.
    pub fn stage(dst: &Path, contents: &[u8]) -> std::io::Result<Self> {
        // Timestamp suffix keeps concurrent temp names apart; create_new refuses
        // to follow anything already sitting at the path
        let random_suffix = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        let temp_path = temp_sibling(dst, random_suffix);

        let mut temp_file = std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&temp_path)?;

        // From here on, Drop cleans up the temp file on any early return
        let staged = Self {
            temp_path,
            dst: dst.to_path_buf(),
            committed: false,
        };

        write_and_sync(&mut temp_file, contents)?;
        Ok(staged)
    }

    pub fn temp_path(&self) -> &Path {
        &self.temp_path
    }

    /// Renames the temp file over the destination.
    pub fn commit(mut self) -> std::io::Result<()> {
        // Windows refuses to rename onto an existing file
        #[cfg(windows)]
        if self.dst.exists() {
            std::fs::remove_file(&self.dst)?;
        }

        std::fs::rename(&self.temp_path, &self.dst)?;
        self.committed = true;
        Ok(())
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        if !self.committed {
            let _ = std::fs::remove_file(&self.temp_path);
        }
    }
}

fn write_and_sync(file: &mut File, contents: &[u8]) -> std::io::Result<()> {
    file.write_all(contents)?;
    file.sync_all()
}

fn temp_sibling(dst: &Path, suffix: u128) -> PathBuf {
    let name = dst
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    dst.with_file_name(format!(".{name}.tmp.{suffix:016x}"))
}

/// Replaces `dst` with `contents` via write-to-temp-then-rename.
///
/// Readers see either the old file or the new one, never a partial write.
pub fn write_atomic(dst: &Path, contents: &[u8]) -> std::io::Result<()> {
    StagedFile::stage(dst, contents)?.commit()
}
