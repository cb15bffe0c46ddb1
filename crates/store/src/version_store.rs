use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use sha2::{Digest, Sha256};

use crate::error::StoreError;
use crate::types::VersionRecord;

/// Number of versions retained per path unless overridden.
pub const DEFAULT_RETENTION: usize = 5;

fn path_slug(path: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(path.as_bytes());
    let digest = hasher.finalize();
    hex::encode(digest)
}

fn now_unix() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs()
}

fn io_err(path: &Path, source: std::io::Error) -> StoreError {
    StoreError::Io {
        path: path.display().to_string(),
        source,
    }
}

/// Stores a bounded number of historical versions per path on disk.
///
/// Layout: `<root>/<sha256(path)>/index.json` holds the ordered
/// [`VersionRecord`] list; `<root>/<sha256(path)>/<version_id>.bin` holds
/// each version's content. Writes are atomic: content and index updates go
/// through a temp file in the same directory, then an atomic rename, so a
/// crash mid-write never leaves a half-written version visible.
pub struct VersionStore {
    root: PathBuf,
    retention: usize,
}

impl VersionStore {
    /// Opens (creating if necessary) a version store rooted at `root`, using
    /// [`DEFAULT_RETENTION`].
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if `root` cannot be created.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        Self::with_retention(root, DEFAULT_RETENTION)
    }

    /// Opens a version store with a custom retention count.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if `root` cannot be created.
    pub fn with_retention(root: impl Into<PathBuf>, retention: usize) -> Result<Self, StoreError> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|source| io_err(&root, source))?;
        Ok(Self { root, retention: retention.max(1) })
    }

    fn path_dir(&self, path: &str) -> PathBuf {
        self.root.join(path_slug(path))
    }

    fn index_path(&self, path: &str) -> PathBuf {
        self.path_dir(path).join("index.json")
    }

    fn content_path(&self, path: &str, version_id: u64) -> PathBuf {
        self.path_dir(path).join(format!("{version_id}.bin"))
    }

    fn read_index(&self, path: &str) -> Result<Vec<VersionRecord>, StoreError> {
        let index_path = self.index_path(path);
        match fs::read(&index_path) {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|source| StoreError::Corrupt {
                path: path.to_string(),
                source,
            }),
            Err(source) if source.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(source) => Err(io_err(&index_path, source)),
        }
    }

    fn write_atomically(&self, dir: &Path, final_path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
        let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|source| io_err(dir, source))?;
        std::io::Write::write_all(&mut tmp, bytes).map_err(|source| io_err(final_path, source))?;
        tmp.persist(final_path).map_err(|err| io_err(final_path, err.error))?;
        Ok(())
    }

    /// Stores a new version of `path`'s content, returning its record.
    /// Prunes the oldest versions beyond this store's retention count.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] on any filesystem failure.
    pub fn store_version(&self, path: &str, content: &[u8], mtime: u64) -> Result<VersionRecord, StoreError> {
        let dir = self.path_dir(path);
        fs::create_dir_all(&dir).map_err(|source| io_err(&dir, source))?;

        let mut versions = self.read_index(path)?;
        let next_id = versions.last().map_or(0, |last| last.version_id + 1);

        let mut hasher = Sha256::new();
        hasher.update(content);
        let content_hash: [u8; 32] = hasher.finalize().into();

        let record = VersionRecord {
            version_id: next_id,
            content_hash,
            size: content.len() as u64,
            mtime,
            stored_at: now_unix(),
        };

        self.write_atomically(&dir, &self.content_path(path, next_id), content)?;

        versions.push(record.clone());
        while versions.len() > self.retention {
            let evicted = versions.remove(0);
            let _ = fs::remove_file(self.content_path(path, evicted.version_id));
        }

        let index_bytes = serde_json::to_vec_pretty(&versions).map_err(|source| StoreError::Corrupt {
            path: path.to_string(),
            source,
        })?;
        self.write_atomically(&dir, &self.index_path(path), &index_bytes)?;

        Ok(record)
    }

    /// Lists the versions currently retained for `path`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Corrupt`] if the index is unreadable.
    pub fn list_versions(&self, path: &str) -> Result<Vec<VersionRecord>, StoreError> {
        self.read_index(path)
    }

    /// Reads the content of one stored version.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::VersionNotFound`] if `version_id` is not in the
    /// index (evicted or never stored), or [`StoreError::Io`] if the
    /// content file is missing despite being indexed.
    pub fn read_version(&self, path: &str, version_id: u64) -> Result<Vec<u8>, StoreError> {
        let versions = self.read_index(path)?;
        if !versions.iter().any(|record| record.version_id == version_id) {
            return Err(StoreError::VersionNotFound {
                path: path.to_string(),
                version_id,
            });
        }
        let content_path = self.content_path(path, version_id);
        fs::read(&content_path).map_err(|source| io_err(&content_path, source))
    }
}
