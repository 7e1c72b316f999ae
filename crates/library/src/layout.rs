//! On-disk layout of the offline library.
//!
//! Each downloaded entry lives in its own directory named after the
//! server-side entry ID:
//!
//! ```text
//! <root>/
//!   1041/
//!     entry.html
//!     metadata.json
//!     image_001.png
//!     image_002.jpg
//! ```

use crate::error::{ErrorKind, Result, map_io_error};
use std::fs::create_dir_all as sync_create_dir;
use std::path::{Path, PathBuf};

/// Rendered document inside an entry directory.
pub const HTML_FILE: &str = "entry.html";
/// Metadata sidecar inside an entry directory.
pub const SIDECAR_FILE: &str = "metadata.json";

/// Maps entry IDs to their paths under the library root.
#[derive(Debug, Clone)]
pub struct Layout {
    root: PathBuf,
}

impl Layout {
    /// Open the library root, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the path is not absolute, or exists and is not
    /// a directory.
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.is_absolute() {
            exn::bail!(ErrorKind::InvalidRoot(root));
        }
        if root.exists() {
            if !root.is_dir() {
                exn::bail!(ErrorKind::InvalidRoot(root));
            }
        } else {
            // Runs once at startup, possibly before a runtime exists.
            sync_create_dir(&root).map_err(|e| map_io_error(e, &root))?;
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding everything belonging to one entry.
    pub fn entry_dir(&self, id: i64) -> PathBuf {
        self.root.join(id.to_string())
    }

    pub fn html_file(&self, id: i64) -> PathBuf {
        self.entry_dir(id).join(HTML_FILE)
    }

    pub fn sidecar_file(&self, id: i64) -> PathBuf {
        self.entry_dir(id).join(SIDECAR_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_requires_absolute_path() {
        let temp_dir = tempfile::tempdir().unwrap();
        assert!(Layout::new(temp_dir.path()).is_ok());
        assert!(Layout::new("relative/path").is_err());
        assert!(Layout::new("./relative").is_err());
    }

    #[test]
    fn test_new_creates_missing_root() {
        let temp_dir = tempfile::tempdir().unwrap();
        let root = temp_dir.path().join("library");
        assert!(!root.exists());
        Layout::new(&root).unwrap();
        assert!(root.is_dir());
    }

    #[test]
    fn test_new_rejects_file_as_root() {
        let temp_dir = tempfile::tempdir().unwrap();
        let file = temp_dir.path().join("occupied");
        std::fs::write(&file, b"x").unwrap();
        let err = Layout::new(&file).unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidRoot(_)));
    }

    #[test]
    fn test_entry_paths() {
        let temp_dir = tempfile::tempdir().unwrap();
        let layout = Layout::new(temp_dir.path()).unwrap();
        let dir = temp_dir.path().join("1041");
        assert_eq!(layout.entry_dir(1041), dir);
        assert_eq!(layout.html_file(1041), dir.join("entry.html"));
        assert_eq!(layout.sidecar_file(1041), dir.join("metadata.json"));
    }
}
