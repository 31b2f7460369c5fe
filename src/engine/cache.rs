// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Typed per-stage memoization on top of a [`CacheStore`].
//!
//! A stage with a valid cached entry skips its computation entirely. Decode
//! failures and store I/O errors are fatal for the run: there is no fallback
//! to recomputation.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;

use crate::errors::{CacheError, WorkflowError};
use crate::observability::messages::cache::{CacheHit, CacheMiss, CacheSaved};
use crate::traits::CacheStore;

#[derive(Clone, Default)]
pub struct StageCache {
    store: Option<Arc<dyn CacheStore>>,
}

impl StageCache {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self { store: Some(store) }
    }

    /// A cache that never hits and never writes.
    pub fn disabled() -> Self {
        Self { store: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.store.is_some()
    }

    pub async fn load<T: DeserializeOwned>(&self, stage: &str) -> Result<Option<T>, WorkflowError> {
        let Some(store) = &self.store else {
            return Ok(None);
        };
        match store.try_load(stage).await? {
            Some(bytes) => {
                let value = serde_json::from_slice(&bytes).map_err(|e| CacheError::Corrupt {
                    stage: stage.to_string(),
                    reason: e.to_string(),
                })?;
                tracing::info!("{}", CacheHit { stage });
                Ok(Some(value))
            }
            None => {
                tracing::debug!("{}", CacheMiss { stage });
                Ok(None)
            }
        }
    }

    pub async fn save<T: Serialize + ?Sized>(&self, stage: &str, value: &T) -> Result<(), WorkflowError> {
        let Some(store) = &self.store else {
            return Ok(());
        };
        let bytes = serde_json::to_vec_pretty(value).map_err(|e| CacheError::Encode {
            stage: stage.to_string(),
            reason: e.to_string(),
        })?;
        let len = bytes.len();
        store.save(stage, bytes).await?;
        tracing::debug!("{}", CacheSaved { stage, bytes: len });
        Ok(())
    }
}

impl std::fmt::Debug for StageCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StageCache")
            .field("enabled", &self.is_enabled())
            .finish()
    }
}
