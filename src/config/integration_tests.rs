// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

#[cfg(test)]
mod integration_tests {
    use serde_json::json;
    use std::path::PathBuf;
    use std::sync::Arc;
    use tempfile::TempDir;

    use crate::backends::stub::StubGenerator;
    use crate::config::consts::WORKFLOW_OUTPUT_DIR;
    use crate::config::{load_and_validate_config, RuntimeBuilder};
    use crate::traits::Retriever;

    /// Test that the YAML sample configuration loads and validates
    #[test]
    fn test_case_summary_yaml_loading() {
        let config = load_and_validate_config("configs/case-summary.yaml").unwrap();

        assert!(config.verbose);
        assert_eq!(config.output_dir, PathBuf::from("data_out"));
        assert_eq!(config.executor_options.max_concurrency, Some(4));
        assert_eq!(config.executor_options.timeout_seconds, Some(600));
        assert_eq!(config.executor_options.retry_attempts, Some(2));
        assert_eq!(config.generation.model, "gpt-4o-mini");
        assert_eq!(config.retrieval.guidelines_dir, PathBuf::from("demos/guidelines"));
        assert!(config.cache.enabled);
    }

    /// Test that the TOML sample configuration loads and validates
    #[test]
    fn test_case_summary_toml_loading() {
        let config = load_and_validate_config("configs/case-summary.toml").unwrap();

        assert!(!config.verbose);
        assert_eq!(config.executor_options.max_concurrency, Some(2));
        assert_eq!(config.executor_options.retry_attempts, Some(0));
        assert_eq!(config.retrieval.similarity_top_k, 2);
        assert!(!config.cache.enabled);
        assert!(config.record.filter_active);
    }

    /// Test that the configured guideline directory builds a usable retriever
    #[tokio::test]
    async fn test_retriever_from_config() {
        let config = load_and_validate_config("configs/case-summary.yaml").unwrap();
        let retriever = RuntimeBuilder::retriever(&config).unwrap();

        let documents = retriever.retrieve("inhaled corticosteroids for asthma").await.unwrap();
        assert!(!documents.is_empty());
        assert!(documents.len() <= config.retrieval.similarity_top_k);
        assert!(documents[0].id.starts_with("asthma#"));
    }

    /// Test a full run assembled from the YAML configuration
    #[tokio::test]
    async fn test_runtime_from_yaml_runs_demo_patient() {
        let temp = TempDir::new().unwrap();
        let mut config = load_and_validate_config("configs/case-summary.yaml").unwrap();
        config.output_dir = temp.path().to_path_buf();

        let generator = StubGenerator::new()
            .respond(
                "ConditionBundles",
                json!({"bundles": [
                    {"condition": {"code": "233678006", "display": "Childhood asthma (disorder)", "clinical_status": "active"}},
                    {"condition": {"code": "24079001", "display": "Atopic dermatitis (disorder)", "clinical_status": "active"}}
                ]}),
            )
            .respond("GuidelineQueries", json!({"queries": ["asthma controller therapy"]}))
            .respond_with("GuidelineRecommendation", |request| {
                let text = request.inputs.get("guideline_text").unwrap_or("");
                Ok(json!({
                    "guideline_source": "Demo guidelines",
                    "recommendation_summary": if text.is_empty() { "none" } else { "found" }
                }))
            })
            .respond(
                "CaseSummary",
                json!({
                    "patient_name": "Ana Lopez",
                    "age": 11,
                    "overall_assessment": "Two chronic conditions under management.",
                    "condition_summaries": [
                        {"condition_display": "Childhood asthma (disorder)", "summary": "Controlled."},
                        {"condition_display": "Atopic dermatitis (disorder)", "summary": "Intermittent flares."}
                    ]
                }),
            );
        let generator = Arc::new(generator);
        let retriever = RuntimeBuilder::retriever(&config).unwrap();

        let workflow = RuntimeBuilder::with_capabilities(&config, generator.clone(), retriever).unwrap();
        let summary = workflow.run(PathBuf::from("demos/patient.json")).wait().await.unwrap();

        assert_eq!(summary.condition_summaries.len(), 2);
        assert!(summary.render().starts_with("Patient Name: Ana Lopez"));
        assert_eq!(generator.calls_for("GuidelineRecommendation"), 2);

        let cache_dir = temp.path().join(WORKFLOW_OUTPUT_DIR);
        for stage in [
            "patient_info",
            "condition_bundles",
            "guideline_match__0_233678006",
            "guideline_match__1_24079001",
            "guideline_recommendations",
            "case_summary",
        ] {
            assert!(
                cache_dir.join(format!("{}.json", stage)).is_file(),
                "missing cached stage {}",
                stage
            );
        }
    }
}
