// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::config::consts::{
    DEFAULT_API_KEY_ENV, DEFAULT_BASE_URL, DEFAULT_MODEL, DEFAULT_OUTPUT_DIR,
    DEFAULT_REQUEST_TIMEOUT_SECONDS, DEFAULT_SIMILARITY_TOP_K,
};
use crate::errors::ConfigError;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Main configuration structure for a case-summary run.
///
/// Loaded from YAML (`.yaml`, `.yml`) or TOML (`.toml`); the file extension
/// selects the format. Only `retrieval.guidelines_dir` is required.
///
/// # Fields
/// * `output_dir` - Root for run artifacts; cached stages live in `<output_dir>/workflow_output`
/// * `verbose` - Stream JSON dumps and queries in addition to the progress headings
/// * `executor_options` - Scheduler knobs (optional)
/// * `generation` - Structured generation endpoint (optional)
/// * `retrieval` - Guideline source
/// * `record` - Patient record parsing (optional)
/// * `cache` - Stage cache (optional, enabled by default)
///
/// # Example
/// ```yaml
/// output_dir: data_out
/// verbose: true
/// executor_options:
///   max_concurrency: 4
///   timeout_seconds: 300
///   retry_attempts: 2
/// generation:
///   model: gpt-4o-mini
/// retrieval:
///   guidelines_dir: guidelines
///   similarity_top_k: 3
/// ```
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default)]
    pub verbose: bool,
    #[serde(default)]
    pub executor_options: ExecutorOptions,
    #[serde(default)]
    pub generation: GenerationConfig,
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub record: RecordConfig,
    #[serde(default)]
    pub cache: CacheConfig,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(DEFAULT_OUTPUT_DIR)
}

/// Scheduler options. Unset values fall back to the engine defaults.
///
/// # Fields
/// * `max_concurrency` - Maximum number of steps executing at once
/// * `timeout_seconds` - Whole-run deadline; no deadline when unset
/// * `retry_attempts` - Extra attempts for retryable generation failures
/// * `stream_capacity` - Bound of the observer channel
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct ExecutorOptions {
    pub max_concurrency: Option<usize>,
    pub timeout_seconds: Option<u64>,
    pub retry_attempts: Option<u32>,
    pub stream_capacity: Option<usize>,
}

/// OpenAI-compatible generation endpoint.
///
/// The API key itself never appears in the file; `api_key_env` names the
/// environment variable that holds it.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct GenerationConfig {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_api_key_env() -> String {
    DEFAULT_API_KEY_ENV.to_string()
}

fn default_request_timeout() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECONDS
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            base_url: default_base_url(),
            api_key_env: default_api_key_env(),
            request_timeout_seconds: default_request_timeout(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct RetrievalConfig {
    /// Directory of `.md` / `.txt` guideline documents
    pub guidelines_dir: PathBuf,
    #[serde(default = "default_similarity_top_k")]
    pub similarity_top_k: usize,
}

fn default_similarity_top_k() -> usize {
    DEFAULT_SIMILARITY_TOP_K
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct RecordConfig {
    /// Keep only conditions whose clinical status is `active`
    #[serde(default = "default_true")]
    pub filter_active: bool,
}

impl Default for RecordConfig {
    fn default() -> Self {
        Self { filter_active: true }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct CacheConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

fn default_true() -> bool {
    true
}

/// Parse config text in the format named by `extension`.
pub fn parse_config(content: &str, extension: &str) -> Result<Config, ConfigError> {
    match extension.to_ascii_lowercase().as_str() {
        "yaml" | "yml" => Ok(serde_yaml::from_str(content)?),
        "toml" => Ok(toml::from_str(content)?),
        other => Err(ConfigError::UnsupportedFormat(other.to_string())),
    }
}

/// Load a config from a YAML or TOML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or_default();
    if !matches!(extension.to_ascii_lowercase().as_str(), "yaml" | "yml" | "toml") {
        return Err(ConfigError::UnsupportedFormat(extension.to_string()));
    }
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(&content, extension)
}

/// Load and validate a config file
///
/// Every validation problem is reported at once rather than stopping at the
/// first.
pub fn load_and_validate_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let cfg = load_config(path)?;
    crate::config::validate_config(&cfg).map_err(ConfigError::Invalid)?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ValidationError;
    use tempfile::TempDir;

    #[test]
    fn parse_basic_config() {
        let yaml = r#"
output_dir: out
verbose: true
executor_options:
  max_concurrency: 2
  timeout_seconds: 30
retrieval:
  guidelines_dir: guidelines
"#;

        let cfg = parse_config(yaml, "yaml").unwrap();
        assert_eq!(cfg.output_dir, PathBuf::from("out"));
        assert!(cfg.verbose);
        assert_eq!(cfg.executor_options.max_concurrency, Some(2));
        assert_eq!(cfg.executor_options.timeout_seconds, Some(30));
        assert_eq!(cfg.executor_options.retry_attempts, None);
        assert_eq!(cfg.retrieval.guidelines_dir, PathBuf::from("guidelines"));
    }

    #[test]
    fn test_defaults_apply_to_omitted_sections() {
        let cfg = parse_config("retrieval:\n  guidelines_dir: g\n", "yml").unwrap();
        assert_eq!(cfg.output_dir, PathBuf::from(DEFAULT_OUTPUT_DIR));
        assert!(!cfg.verbose);
        assert_eq!(cfg.generation, GenerationConfig::default());
        assert_eq!(cfg.retrieval.similarity_top_k, DEFAULT_SIMILARITY_TOP_K);
        assert!(cfg.record.filter_active);
        assert!(cfg.cache.enabled);
    }

    #[test]
    fn test_parse_toml_config() {
        let toml = r#"
output_dir = "out"

[executor_options]
retry_attempts = 3

[generation]
model = "local-model"
base_url = "http://localhost:8080/v1"

[retrieval]
guidelines_dir = "guidelines"
similarity_top_k = 5

[cache]
enabled = false
"#;

        let cfg = parse_config(toml, "toml").unwrap();
        assert_eq!(cfg.executor_options.retry_attempts, Some(3));
        assert_eq!(cfg.generation.model, "local-model");
        assert_eq!(cfg.generation.api_key_env, DEFAULT_API_KEY_ENV);
        assert_eq!(cfg.retrieval.similarity_top_k, 5);
        assert!(!cfg.cache.enabled);
    }

    #[test]
    fn test_missing_retrieval_section_is_an_error() {
        match parse_config("verbose: true\n", "yaml") {
            Err(ConfigError::Yaml(_)) => {}
            other => panic!("Expected Yaml error, got {:?}", other),
        }
    }

    #[test]
    fn test_unsupported_extension() {
        match load_config("config.json") {
            Err(ConfigError::UnsupportedFormat(ext)) => assert_eq!(ext, "json"),
            other => panic!("Expected UnsupportedFormat, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let temp = TempDir::new().unwrap();
        assert!(matches!(
            load_config(temp.path().join("absent.yaml")),
            Err(ConfigError::Io { .. })
        ));
    }

    #[test]
    fn test_load_and_validate_reports_every_problem() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.yaml");
        let yaml = r#"
executor_options:
  max_concurrency: 0
generation:
  model: ""
retrieval:
  guidelines_dir: /definitely/not/here
  similarity_top_k: 0
"#;
        std::fs::write(&path, yaml).unwrap();

        match load_and_validate_config(&path) {
            Err(ConfigError::Invalid(errors)) => {
                assert_eq!(errors.len(), 4);
                assert!(errors.contains(&ValidationError::NonPositive {
                    field: "executor_options.max_concurrency"
                }));
                assert!(errors.contains(&ValidationError::EmptyValue { field: "generation.model" }));
            }
            other => panic!("Expected Invalid, got {:?}", other),
        }
    }

    #[test]
    fn test_load_and_validate_valid_config() {
        let temp = TempDir::new().unwrap();
        let guidelines = temp.path().join("guidelines");
        std::fs::create_dir(&guidelines).unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(
            &path,
            format!("[retrieval]\nguidelines_dir = {:?}\n", guidelines.display().to_string()),
        )
        .unwrap();

        let cfg = load_and_validate_config(&path).unwrap();
        assert_eq!(cfg.retrieval.guidelines_dir, guidelines);
    }
}
