//! # File Adapter
//!
//! Durable [`PersistenceAdapter`] backed by one file per key.
//!
//! Keys are arbitrary strings (`@health_cart`), so the file name is the
//! hex SHA-256 of the key. Writes go to a temp file in the same directory
//! and are renamed over the target, so a crash mid-write leaves either the
//! old record or the new one, never a torn file.

use async_trait::async_trait;
use cart_core::{PersistenceAdapter, PersistenceError, PersistenceResult};
use sha2::{Digest, Sha256};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, instrument};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct FileAdapter {
    root: PathBuf,
}

impl FileAdapter {
    /// Adapter rooted at `root`. The directory is created on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Adapter rooted at `root`, creating the directory now
    pub async fn open(root: impl Into<PathBuf>) -> PersistenceResult<Self> {
        let adapter = Self::new(root);
        fs::create_dir_all(&adapter.root).await?;
        Ok(adapter)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File that holds `key`
    pub fn path_for(&self, key: &str) -> PathBuf {
        let digest = Sha256::digest(key.as_bytes());
        self.root.join(format!("{}.json", hex::encode(digest)))
    }
}

#[async_trait]
impl PersistenceAdapter for FileAdapter {
    #[instrument(skip(self))]
    async fn get(&self, key: &str) -> PersistenceResult<Option<String>> {
        let path = self.path_for(key);
        match fs::read_to_string(&path).await {
            Ok(body) => {
                debug!(path = %path.display(), bytes = body.len(), "Read cart file");
                Ok(Some(body))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(PersistenceError::Read {
                key: key.to_string(),
                message: e.to_string(),
            }),
        }
    }

    #[instrument(skip(self, value), fields(bytes = value.len()))]
    async fn set(&self, key: &str, value: &str) -> PersistenceResult<()> {
        let write_err = |e: std::io::Error| PersistenceError::Write {
            key: key.to_string(),
            message: e.to_string(),
        };

        fs::create_dir_all(&self.root).await.map_err(write_err)?;

        let path = self.path_for(key);
        let tmp = path.with_extension(format!("{}.tmp", Uuid::new_v4().simple()));

        if let Err(e) = fs::write(&tmp, value).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(write_err(e));
        }
        if let Err(e) = fs::rename(&tmp, &path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(write_err(e));
        }

        debug!(path = %path.display(), "Wrote cart file");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn remove(&self, key: &str) -> PersistenceResult<()> {
        let path = self.path_for(key);
        match fs::remove_file(&path).await {
            Ok(()) => {
                debug!(path = %path.display(), "Removed cart file");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(PersistenceError::Remove {
                key: key.to_string(),
                message: e.to_string(),
            }),
        }
    }

    fn adapter_name(&self) -> &'static str {
        "file"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_key_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let adapter = FileAdapter::new(dir.path());

        assert_eq!(adapter.get("@health_cart").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_set_get_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let adapter = FileAdapter::new(dir.path().join("nested"));

        adapter.set("@health_cart", "[1]").await.unwrap();
        adapter.set("@health_cart", "[1,2]").await.unwrap();

        assert_eq!(
            adapter.get("@health_cart").await.unwrap().as_deref(),
            Some("[1,2]")
        );
    }

    #[tokio::test]
    async fn test_no_temp_files_left_behind() {
        let dir = tempfile::tempdir().unwrap();
        let adapter = FileAdapter::open(dir.path()).await.unwrap();

        adapter.set("a", "[]").await.unwrap();
        adapter.set("b", "[]").await.unwrap();

        let mut names = Vec::new();
        let mut read_dir = fs::read_dir(dir.path()).await.unwrap();
        while let Some(entry) = read_dir.next_entry().await.unwrap() {
            names.push(entry.file_name().to_string_lossy().to_string());
        }
        assert_eq!(names.len(), 2);
        assert!(names.iter().all(|n| n.ends_with(".json")));
    }

    #[tokio::test]
    async fn test_remove_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let adapter = FileAdapter::new(dir.path());

        adapter.set("k", "[]").await.unwrap();
        adapter.remove("k").await.unwrap();
        adapter.remove("k").await.unwrap();

        assert_eq!(adapter.get("k").await.unwrap(), None);
        assert!(!adapter.path_for("k").exists());
    }

    #[test]
    fn test_keys_map_to_distinct_safe_names() {
        let adapter = FileAdapter::new("/tmp/cart");
        let a = adapter.path_for("@health_cart");
        let b = adapter.path_for("../../etc/passwd");

        assert_ne!(a, b);
        assert_eq!(b.parent(), Some(Path::new("/tmp/cart")));
    }
}
