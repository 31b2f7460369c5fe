// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for the per-stage output cache.

use std::fmt::{Display, Formatter};

/// Cached output was found; the stage is skipped.
pub struct CacheHit<'a> {
    pub stage: &'a str,
}

impl Display for CacheHit<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Using cached output for stage '{}'", self.stage)
    }
}

/// No cached output; the stage will be computed.
pub struct CacheMiss<'a> {
    pub stage: &'a str,
}

impl Display for CacheMiss<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "No cached output for stage '{}'", self.stage)
    }
}

pub struct CacheSaved<'a> {
    pub stage: &'a str,
    pub bytes: usize,
}

impl Display for CacheSaved<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Cached {} bytes of output for stage '{}'", self.bytes, self.stage)
    }
}
