// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::errors::CacheError;
use crate::traits::CacheStore;

/// Process-local cache store. Used in tests and for runs without an output directory.
#[derive(Debug, Default)]
pub struct MemoryCacheStore {
    entries: DashMap<String, Vec<u8>>,
    saves: AtomicUsize,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, stage: &str) -> bool {
        self.entries.contains_key(stage)
    }

    pub fn stages(&self) -> Vec<String> {
        let mut stages: Vec<String> = self.entries.iter().map(|e| e.key().clone()).collect();
        stages.sort();
        stages
    }

    /// Number of `save` calls so far.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn try_load(&self, stage: &str) -> Result<Option<Vec<u8>>, CacheError> {
        Ok(self.entries.get(stage).map(|entry| entry.value().clone()))
    }

    async fn save(&self, stage: &str, bytes: Vec<u8>) -> Result<(), CacheError> {
        self.entries.insert(stage.to_string(), bytes);
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
