// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

/// Bound of a run's observer channel
pub const DEFAULT_STREAM_CAPACITY: usize = 64;
/// Step concurrency when the host's parallelism cannot be detected
pub const DEFAULT_MAX_CONCURRENCY: usize = 4;
/// Subdirectory of the output directory holding cached stage results
pub const WORKFLOW_OUTPUT_DIR: &str = "workflow_output";
/// Output directory when the config names none
pub const DEFAULT_OUTPUT_DIR: &str = "data_out";

/// Chat model used for structured generation
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
/// OpenAI-compatible API root
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
/// Environment variable holding the API key
pub const DEFAULT_API_KEY_ENV: &str = "OPENAI_API_KEY";
/// Per-request HTTP timeout in seconds
pub const DEFAULT_REQUEST_TIMEOUT_SECONDS: u64 = 120;

/// Number of guideline chunks returned per query
pub const DEFAULT_SIMILARITY_TOP_K: usize = 3;

/// Base delay between generation retries; grows linearly per attempt
pub const DEFAULT_RETRY_BACKOFF_MS: u64 = 500;

/// Largest accepted `executor_options.retry_attempts`.
pub const MAX_RETRY_ATTEMPTS: u32 = 10;
