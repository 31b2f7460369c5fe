// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::path::PathBuf;
use thiserror::Error;

/// Errors produced while reading a patient record bundle.
#[derive(Error, Debug)]
pub enum RecordError {
    #[error("Failed to read patient record '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Patient record is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Patient record has no 'entry' array")]
    MissingEntries,

    #[error("No Patient resource found in bundle")]
    MissingPatient,
}
