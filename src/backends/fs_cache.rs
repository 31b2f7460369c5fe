// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! File-backed stage cache: one JSON file per stage under a run output directory.
//!
//! ```text
//! <output_dir>/workflow_output/
//!     patient_info.json
//!     condition_bundles.json
//!     guideline_match__i10.json
//!     case_summary.json
//! ```
//!
//! Writes go to a uniquely named temporary file in the same directory and are
//! renamed into place, so a reader sees either the previous entry or the new
//! one. Loads read the file directly and treat `NotFound` as a miss, so
//! there is no gap between checking for an entry and reading it. A per-stage
//! async lock serializes writers within the process.

use async_trait::async_trait;
use dashmap::DashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::config::consts::WORKFLOW_OUTPUT_DIR;
use crate::errors::CacheError;
use crate::traits::CacheStore;

pub struct FsCacheStore {
    dir: PathBuf,
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl FsCacheStore {
    /// Store entries directly in `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            locks: DashMap::new(),
        }
    }

    /// Store entries in `<output_dir>/workflow_output`.
    pub fn for_output_dir(output_dir: impl AsRef<Path>) -> Self {
        Self::new(output_dir.as_ref().join(WORKFLOW_OUTPUT_DIR))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File path for a stage key. `/` separates key segments and becomes `__`.
    pub fn path_for(&self, stage: &str) -> Result<PathBuf, CacheError> {
        let valid = !stage.is_empty()
            && stage
                .split('/')
                .all(|segment| {
                    !segment.is_empty()
                        && segment
                            .chars()
                            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.')
                        && segment != "."
                        && segment != ".."
                });
        if !valid {
            return Err(CacheError::InvalidKey(stage.to_string()));
        }
        Ok(self.dir.join(format!("{}.json", stage.replace('/', "__"))))
    }

    fn lock_for(&self, stage: &str) -> Arc<Mutex<()>> {
        self.locks
            .entry(stage.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .value()
            .clone()
    }

    fn io_error(stage: &str, path: &Path, source: std::io::Error) -> CacheError {
        CacheError::Io {
            stage: stage.to_string(),
            path: path.to_path_buf(),
            source,
        }
    }
}

#[async_trait]
impl CacheStore for FsCacheStore {
    async fn try_load(&self, stage: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let path = self.path_for(stage)?;
        let lock = self.lock_for(stage);
        let _guard = lock.lock().await;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Self::io_error(stage, &path, e)),
        }
    }

    async fn save(&self, stage: &str, bytes: Vec<u8>) -> Result<(), CacheError> {
        let path = self.path_for(stage)?;
        let lock = self.lock_for(stage);
        let _guard = lock.lock().await;

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| Self::io_error(stage, &self.dir, e))?;

        let tmp = path.with_extension(format!("json.tmp-{}", Uuid::new_v4().simple()));
        tokio::fs::write(&tmp, &bytes)
            .await
            .map_err(|e| Self::io_error(stage, &tmp, e))?;
        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(Self::io_error(stage, &path, e));
        }
        Ok(())
    }
}

impl std::fmt::Debug for FsCacheStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FsCacheStore").field("dir", &self.dir).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_missing_entry_is_a_miss() {
        let temp = TempDir::new().unwrap();
        let store = FsCacheStore::for_output_dir(temp.path());
        assert_eq!(store.try_load("patient_info").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_save_creates_directory_and_round_trips() {
        let temp = TempDir::new().unwrap();
        let store = FsCacheStore::for_output_dir(temp.path());
        store.save("guideline_match/i10", b"{}".to_vec()).await.unwrap();

        let expected = temp.path().join("workflow_output").join("guideline_match__i10.json");
        assert!(expected.exists());
        assert_eq!(
            store.try_load("guideline_match/i10").await.unwrap(),
            Some(b"{}".to_vec())
        );

        let leftovers: Vec<_> = std::fs::read_dir(store.dir())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().contains(".tmp-"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[tokio::test]
    async fn test_overwrite_replaces_entry() {
        let temp = TempDir::new().unwrap();
        let store = FsCacheStore::new(temp.path());
        store.save("stage", b"1".to_vec()).await.unwrap();
        store.save("stage", b"2".to_vec()).await.unwrap();
        assert_eq!(store.try_load("stage").await.unwrap(), Some(b"2".to_vec()));
    }

    #[test]
    fn test_rejects_path_traversal_keys() {
        let store = FsCacheStore::new("/tmp/unused");
        for key in ["", "../escape", "a//b", "a/../b", "with space"] {
            assert!(
                matches!(store.path_for(key), Err(CacheError::InvalidKey(_))),
                "key {:?} should be rejected",
                key
            );
        }
        assert!(store.path_for("case_summary").is_ok());
    }

    #[tokio::test]
    async fn test_unreadable_entry_is_an_io_error() {
        let temp = TempDir::new().unwrap();
        let store = FsCacheStore::new(temp.path());
        // A directory where the file should be cannot be read as bytes.
        std::fs::create_dir_all(temp.path().join("stage.json")).unwrap();
        assert!(matches!(
            store.try_load("stage").await,
            Err(CacheError::Io { .. })
        ));
    }
}
