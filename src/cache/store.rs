//! On-disk artifact store.
//!
//! Every original path `P` (relative to the source root) maps to exactly one
//! artifact at `<cache_root>/P.webp`. The file's presence is the only cache
//! signal: no checksums, no expiry, no size accounting. Entries live until
//! [`CacheStore::clear`] removes the whole tree.
//!
//! Writes go to a hidden temp file next to the final artifact and are
//! published with a rename, so a reader either sees no artifact or a
//! complete one.

use std::ffi::OsString;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::CacheError;

/// File extension appended to every artifact.
pub const ARTIFACT_EXTENSION: &str = "webp";

const TEMP_PREFIX: &str = ".";
const TEMP_SUFFIX: &str = ".tmp";

/// Maps original paths to cached WebP artifacts under a root directory.
#[derive(Debug, Clone)]
pub struct CacheStore {
    root: PathBuf,
}

impl CacheStore {
    /// Create a store rooted at `root`. Nothing is created on disk.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The cache root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Derive the artifact path for an original path.
    ///
    /// Leading `/` on `original` is ignored so both `/photos/a.jpg` and
    /// `photos/a.jpg` map to `<root>/photos/a.jpg.webp`.
    pub fn artifact_path(&self, original: &Path) -> PathBuf {
        let relative = original.strip_prefix("/").unwrap_or(original);

        let mut file_name = OsString::from(self.root.join(relative));
        file_name.push(".");
        file_name.push(ARTIFACT_EXTENSION);
        PathBuf::from(file_name)
    }

    /// Whether an artifact exists for `original`.
    pub async fn exists(&self, original: &Path) -> bool {
        tokio::fs::metadata(self.artifact_path(original))
            .await
            .map(|m| m.is_file())
            .unwrap_or(false)
    }

    /// Create the cache root if it does not exist.
    pub async fn ensure_root(&self) -> Result<(), CacheError> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| CacheError::CreateDir {
                path: self.root.clone(),
                message: e.to_string(),
            })
    }

    /// Write and publish the artifact for `original`.
    ///
    /// Missing parent directories are created first. The data is written to
    /// a temp file in the destination directory and renamed into place.
    /// This is blocking I/O; call it from a blocking context.
    ///
    /// Returns the published artifact path.
    pub fn write(&self, original: &Path, data: &[u8]) -> Result<PathBuf, CacheError> {
        let artifact = self.artifact_path(original);
        let parent = artifact.parent().unwrap_or(&self.root).to_path_buf();

        std::fs::create_dir_all(&parent).map_err(|e| CacheError::CreateDir {
            path: parent.clone(),
            message: e.to_string(),
        })?;

        let write_error = |message: String| CacheError::Write {
            path: artifact.clone(),
            message,
        };

        let mut temp = tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .suffix(TEMP_SUFFIX)
            .tempfile_in(&parent)
            .map_err(|e| write_error(e.to_string()))?;

        temp.write_all(data)
            .and_then(|_| temp.as_file().sync_all())
            .map_err(|e| write_error(e.to_string()))?;

        temp.persist(&artifact)
            .map_err(|e| write_error(e.error.to_string()))?;

        debug!(artifact = %artifact.display(), bytes = data.len(), "Published cache artifact");

        Ok(artifact)
    }

    /// Remove the entire cache tree.
    ///
    /// A missing root is not an error. The root is not recreated; the next
    /// write creates whatever directories it needs.
    pub async fn clear(&self) -> Result<(), CacheError> {
        match tokio::fs::remove_dir_all(&self.root).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CacheError::Clear {
                path: self.root.clone(),
                message: e.to_string(),
            }),
        }
    }
}
