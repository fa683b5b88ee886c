//! Filesystem-backed video storage

use super::VideoStore;
use crate::error::StoreError;
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Recordings kept as flat files under one directory
#[derive(Debug, Clone)]
pub struct FsVideoStore {
    root: PathBuf,
}

impl FsVideoStore {
    /// Store rooted at `root`
    #[inline]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory
    #[inline]
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, filename: &str) -> Result<PathBuf, StoreError> {
        if !is_plain_filename(filename) {
            return Err(StoreError::Validation(format!("invalid video filename: {filename}")));
        }
        Ok(self.root.join(filename))
    }
}

/// A single path component with no `..` anywhere
#[must_use]
pub fn is_plain_filename(filename: &str) -> bool {
    !filename.is_empty()
        && filename != "."
        && !filename.contains("..")
        && !filename.contains(['/', '\\', '\0'])
}

#[async_trait]
impl VideoStore for FsVideoStore {
    async fn read(&self, filename: &str) -> Result<Vec<u8>, StoreError> {
        let path = self.path_for(filename)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StoreError::NotFound("video".to_string())),
            Err(e) => Err(e.into()),
        }
    }

    async fn remove(&self, filename: &str) -> Result<(), StoreError> {
        let path = self.path_for(filename)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StoreError::NotFound("video".to_string())),
            Err(e) => Err(e.into()),
        }
    }
}
