// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Keyword retriever over a directory of guideline documents.
//!
//! Every `.md` and `.txt` file in the directory is split into paragraph
//! chunks of roughly [`CHUNK_TARGET_CHARS`]. A query is scored against each
//! chunk as the sum, over query terms, of term frequency weighted by inverse
//! document frequency. The `top_k` best chunks with a positive score are
//! returned, best first. Chunk ids are `<file stem>#<chunk index>`, stable
//! across loads of the same directory.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::Path;

use crate::errors::CapabilityError;
use crate::observability::messages::capability::DocumentsRetrieved;
use crate::traits::{Document, Retriever};

pub const CHUNK_TARGET_CHARS: usize = 1200;

const STOPWORDS: &[&str] = &[
    "and", "are", "for", "from", "has", "have", "into", "not", "that", "the", "their", "this",
    "was", "were", "which", "with", "without",
];

struct Chunk {
    document: Document,
    terms: HashMap<String, usize>,
}

pub struct GuidelineIndex {
    chunks: Vec<Chunk>,
    document_frequency: HashMap<String, usize>,
    top_k: usize,
}

fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|word| word.len() >= 3)
        .map(|word| word.to_lowercase())
        .filter(|word| !STOPWORDS.contains(&word.as_str()))
}

fn split_paragraphs(text: &str) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    for paragraph in text.split("\n\n").map(str::trim).filter(|p| !p.is_empty()) {
        if !current.is_empty() && current.len() + paragraph.len() > CHUNK_TARGET_CHARS {
            chunks.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push_str("\n\n");
        }
        current.push_str(paragraph);
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

impl GuidelineIndex {
    /// Build an index from `(source name, text)` pairs.
    pub fn from_texts<'a>(texts: impl IntoIterator<Item = (&'a str, &'a str)>, top_k: usize) -> Self {
        let mut chunks = Vec::new();
        for (source, text) in texts {
            for (n, content) in split_paragraphs(text).into_iter().enumerate() {
                let mut terms = HashMap::new();
                for term in tokenize(&content) {
                    *terms.entry(term).or_insert(0) += 1;
                }
                chunks.push(Chunk {
                    document: Document {
                        id: format!("{}#{}", source, n),
                        content,
                    },
                    terms,
                });
            }
        }

        let mut document_frequency = HashMap::new();
        for chunk in &chunks {
            for term in chunk.terms.keys() {
                *document_frequency.entry(term.clone()).or_insert(0) += 1;
            }
        }

        Self {
            chunks,
            document_frequency,
            top_k: top_k.max(1),
        }
    }

    /// Load every `.md` / `.txt` file in `dir`, in file-name order.
    pub fn load(dir: &Path, top_k: usize) -> Result<Self, CapabilityError> {
        let mut files: Vec<_> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                path.is_file()
                    && matches!(
                        path.extension().and_then(|e| e.to_str()),
                        Some("md") | Some("txt")
                    )
            })
            .collect();
        files.sort();

        let mut texts = Vec::with_capacity(files.len());
        for path in &files {
            let stem = path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("guideline")
                .to_string();
            texts.push((stem, std::fs::read_to_string(path)?));
        }
        tracing::info!(dir = %dir.display(), files = texts.len(), "Loaded guideline documents");

        Ok(Self::from_texts(
            texts.iter().map(|(stem, text)| (stem.as_str(), text.as_str())),
            top_k,
        ))
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    fn search(&self, query: &str) -> Vec<Document> {
        let query_terms: HashSet<String> = tokenize(query).collect();
        let total = self.chunks.len() as f64;

        let mut scored: Vec<(f64, &Chunk)> = self
            .chunks
            .iter()
            .map(|chunk| {
                let score = query_terms
                    .iter()
                    .filter_map(|term| {
                        let tf = *chunk.terms.get(term)? as f64;
                        let df = *self.document_frequency.get(term)? as f64;
                        Some(tf * ((total / df).ln() + 1.0))
                    })
                    .sum::<f64>();
                (score, chunk)
            })
            .filter(|(score, _)| *score > 0.0)
            .collect();

        scored.sort_by(|a, b| {
            b.0.partial_cmp(&a.0)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.1.document.id.cmp(&b.1.document.id))
        });
        scored
            .into_iter()
            .take(self.top_k)
            .map(|(_, chunk)| chunk.document.clone())
            .collect()
    }
}

#[async_trait]
impl Retriever for GuidelineIndex {
    async fn retrieve(&self, query: &str) -> Result<Vec<Document>, CapabilityError> {
        let documents = self.search(query);
        tracing::debug!(
            "{}",
            DocumentsRetrieved {
                retriever: self.name(),
                query,
                count: documents.len(),
            }
        );
        Ok(documents)
    }

    fn name(&self) -> &'static str {
        "guideline_index"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const HYPERTENSION: &str = "Hypertension management\n\nStart a thiazide diuretic or ACE inhibitor for stage 1 hypertension.\n\nRecheck blood pressure in four weeks.";
    const DIABETES: &str = "Type 2 diabetes\n\nMetformin is first line therapy. Check HbA1c every three months until at goal.";

    #[tokio::test]
    async fn test_ranks_matching_chunks_first() {
        let index = GuidelineIndex::from_texts([("htn", HYPERTENSION), ("dm", DIABETES)], 2);
        let results = index.retrieve("metformin therapy for diabetes").await.unwrap();
        assert!(!results.is_empty());
        assert_eq!(results[0].id, "dm#0");
        assert!(results[0].content.contains("Metformin"));
    }

    #[tokio::test]
    async fn test_respects_top_k_and_ignores_non_matches() {
        let index = GuidelineIndex::from_texts([("htn", HYPERTENSION), ("dm", DIABETES)], 1);
        assert_eq!(index.retrieve("hypertension blood pressure").await.unwrap().len(), 1);
        assert!(index.retrieve("orthopedic fracture").await.unwrap().is_empty());
    }

    #[test]
    fn test_long_documents_are_chunked() {
        let paragraph = "asthma inhaler ".repeat(60);
        let text = vec![paragraph.as_str(); 4].join("\n\n");
        let index = GuidelineIndex::from_texts([("asthma", text.as_str())], 3);
        assert!(index.len() > 1);
    }

    #[test]
    fn test_load_reads_markdown_and_text_files() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("htn.md"), HYPERTENSION).unwrap();
        std::fs::write(temp.path().join("dm.txt"), DIABETES).unwrap();
        std::fs::write(temp.path().join("notes.json"), "{}").unwrap();

        let index = GuidelineIndex::load(temp.path(), 3).unwrap();
        assert_eq!(index.len(), 2);
    }
}
