// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;

use crate::errors::CacheError;

/// Byte-level store behind the per-stage output cache.
///
/// Implementations must make `try_load` atomic with respect to `save`: a
/// reader sees either no entry or a complete one, never a partial write.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// `Ok(None)` when the stage has no entry yet.
    async fn try_load(&self, stage: &str) -> Result<Option<Vec<u8>>, CacheError>;

    async fn save(&self, stage: &str, bytes: Vec<u8>) -> Result<(), CacheError>;
}
