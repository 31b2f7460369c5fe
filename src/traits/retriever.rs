// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::errors::CapabilityError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub content: String,
}

/// Similarity lookup over a document index.
///
/// Results for different queries may overlap; callers merge them with
/// [`dedup_by_id`].
#[async_trait]
pub trait Retriever: Send + Sync {
    async fn retrieve(&self, query: &str) -> Result<Vec<Document>, CapabilityError>;

    fn name(&self) -> &'static str;
}

/// Drop documents whose id was already seen, keeping first occurrences in order.
pub fn dedup_by_id(documents: impl IntoIterator<Item = Document>) -> Vec<Document> {
    let mut seen = HashSet::new();
    documents
        .into_iter()
        .filter(|doc| seen.insert(doc.id.clone()))
        .collect()
}
