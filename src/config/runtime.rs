// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use anyhow::Context as _;
use std::sync::Arc;
use std::time::Duration;

use crate::backends::{FsCacheStore, GuidelineIndex, OpenAiGenerator, OpenAiSettings, RetryingGenerator};
use crate::case_summary::{build_workflow, CaseEvent, CaseSummaryCapabilities};
use crate::config::consts::DEFAULT_RETRY_BACKOFF_MS;
use crate::config::Config;
use crate::engine::{StageCache, Workflow, WorkflowOptions};
use crate::traits::{Retriever, StructuredGenerator};

/// Case-summary runtime builder: turns a validated configuration into a
/// ready-to-run workflow.
///
/// Capabilities are assembled here and nowhere else, then injected into the
/// steps. Tests skip the network-backed pieces by calling
/// [`RuntimeBuilder::with_capabilities`] with stubs.
///
/// # Examples
///
/// ```no_run
/// use caseflow::config::{load_and_validate_config, RuntimeBuilder};
///
/// let config = load_and_validate_config("configs/case-summary.yaml").unwrap();
/// let workflow = RuntimeBuilder::from_config(&config).unwrap();
/// assert_eq!(workflow.name(), "case_summary");
/// ```
pub struct RuntimeBuilder;

impl RuntimeBuilder {
    /// Build the workflow with the OpenAI-compatible generator and the
    /// guideline directory index named by the config.
    ///
    /// Fails if the API key variable is unset or the guidelines cannot be read.
    pub fn from_config(cfg: &Config) -> anyhow::Result<Workflow<CaseEvent>> {
        let generator = Self::generator(cfg)?;
        let retriever = Self::retriever(cfg)?;
        Self::with_capabilities(cfg, generator, retriever)
    }

    /// Build the workflow around caller-supplied generation and retrieval.
    pub fn with_capabilities(
        cfg: &Config,
        generator: Arc<dyn StructuredGenerator>,
        retriever: Arc<dyn Retriever>,
    ) -> anyhow::Result<Workflow<CaseEvent>> {
        let capabilities = CaseSummaryCapabilities {
            generator,
            retriever,
            cache: Self::cache(cfg),
            filter_active: cfg.record.filter_active,
        };
        let workflow = build_workflow(capabilities, Self::workflow_options(cfg))
            .context("case-summary workflow failed registration")?;
        Ok(workflow)
    }

    pub fn workflow_options(cfg: &Config) -> WorkflowOptions {
        let mut options = WorkflowOptions {
            verbose: cfg.verbose,
            ..WorkflowOptions::default()
        };
        let executor = &cfg.executor_options;
        if let Some(max_concurrency) = executor.max_concurrency {
            options.max_concurrency = max_concurrency.max(1);
        }
        if let Some(capacity) = executor.stream_capacity {
            options.stream_capacity = capacity.max(1);
        }
        options.timeout = executor.timeout_seconds.map(Duration::from_secs);
        options
    }

    pub fn cache(cfg: &Config) -> StageCache {
        if cfg.cache.enabled {
            StageCache::new(Arc::new(FsCacheStore::for_output_dir(&cfg.output_dir)))
        } else {
            StageCache::disabled()
        }
    }

    pub fn generator(cfg: &Config) -> anyhow::Result<Arc<dyn StructuredGenerator>> {
        let generation = &cfg.generation;
        let api_key = std::env::var(&generation.api_key_env)
            .with_context(|| format!("environment variable {} is not set", generation.api_key_env))?;
        let client = OpenAiGenerator::new(OpenAiSettings {
            base_url: generation.base_url.clone(),
            model: generation.model.clone(),
            api_key,
            request_timeout: Duration::from_secs(generation.request_timeout_seconds),
        })?;

        let generator: Arc<dyn StructuredGenerator> = match cfg.executor_options.retry_attempts {
            Some(retries) if retries > 0 => Arc::new(RetryingGenerator::new(
                client,
                retries,
                Duration::from_millis(DEFAULT_RETRY_BACKOFF_MS),
            )),
            _ => Arc::new(client),
        };
        Ok(generator)
    }

    pub fn retriever(cfg: &Config) -> anyhow::Result<Arc<dyn Retriever>> {
        let retrieval = &cfg.retrieval;
        let index = GuidelineIndex::load(&retrieval.guidelines_dir, retrieval.similarity_top_k)
            .with_context(|| {
                format!(
                    "failed to load guidelines from '{}'",
                    retrieval.guidelines_dir.display()
                )
            })?;
        if index.is_empty() {
            tracing::warn!(
                dir = %retrieval.guidelines_dir.display(),
                "Guidelines directory contains no documents; recommendations will have no source text"
            );
        }
        Ok(Arc::new(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_config;

    fn config(extra: &str) -> Config {
        parse_config(&format!("retrieval:\n  guidelines_dir: g\n{}", extra), "yaml").unwrap()
    }

    #[test]
    fn test_workflow_options_follow_executor_options() {
        let cfg = config(
            "verbose: true\nexecutor_options:\n  max_concurrency: 3\n  timeout_seconds: 90\n  stream_capacity: 8\n",
        );
        let options = RuntimeBuilder::workflow_options(&cfg);
        assert_eq!(options.max_concurrency, 3);
        assert_eq!(options.stream_capacity, 8);
        assert_eq!(options.timeout, Some(Duration::from_secs(90)));
        assert!(options.verbose);
    }

    #[test]
    fn test_unset_options_keep_engine_defaults() {
        let options = RuntimeBuilder::workflow_options(&config(""));
        let defaults = WorkflowOptions::default();
        assert_eq!(options.max_concurrency, defaults.max_concurrency);
        assert_eq!(options.stream_capacity, defaults.stream_capacity);
        assert_eq!(options.timeout, None);
    }

    #[test]
    fn test_cache_can_be_disabled() {
        assert!(RuntimeBuilder::cache(&config("")).is_enabled());
        assert!(!RuntimeBuilder::cache(&config("cache:\n  enabled: false\n")).is_enabled());
    }

    #[test]
    fn test_missing_api_key_variable_is_an_error() {
        let cfg = config("generation:\n  api_key_env: CASEFLOW_TEST_UNSET_KEY_VARIABLE\n");
        let err = RuntimeBuilder::generator(&cfg).err().unwrap();
        assert!(err.to_string().contains("CASEFLOW_TEST_UNSET_KEY_VARIABLE"));
    }
}
