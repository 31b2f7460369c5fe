// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Patient case-summary workflow.
//!
//! Reads a patient record, groups each active condition with its related
//! encounters and medications, matches every group against clinical
//! guidelines concurrently, and writes one case summary for a clinician.
//!
//! ```rust,no_run
//! use caseflow::backends::{GuidelineIndex, MemoryCacheStore, OpenAiGenerator, OpenAiSettings};
//! use caseflow::case_summary::{build_workflow, CaseSummaryCapabilities};
//! use caseflow::engine::{StageCache, WorkflowOptions};
//! use std::path::{Path, PathBuf};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let generator = OpenAiGenerator::new(OpenAiSettings {
//!     base_url: "https://api.openai.com/v1".to_string(),
//!     model: "gpt-4o-mini".to_string(),
//!     api_key: std::env::var("OPENAI_API_KEY")?,
//!     request_timeout: Duration::from_secs(60),
//! })?;
//! let capabilities = CaseSummaryCapabilities {
//!     generator: Arc::new(generator),
//!     retriever: Arc::new(GuidelineIndex::load(Path::new("guidelines"), 3)?),
//!     cache: StageCache::new(Arc::new(MemoryCacheStore::new())),
//!     filter_active: true,
//! };
//! let workflow = build_workflow(capabilities, WorkflowOptions::default())?;
//! let summary = workflow.run(PathBuf::from("patient.json")).wait().await?;
//! println!("{}", summary.render());
//! # Ok(())
//! # }
//! ```

pub mod events;
pub mod models;
pub mod prompts;
pub mod record;
pub mod steps;


use std::sync::Arc;

use crate::engine::{StageCache, Workflow, WorkflowBuilder, WorkflowOptions};
use crate::errors::RegistrationError;
use crate::traits::{Retriever, StructuredGenerator};

pub use events::{CaseEvent, CaseEventKind, PATIENT_INFO};
pub use models::{
    CaseSummary, ConditionBundle, ConditionBundles, ConditionInfo, ConditionSummary, EncounterInfo,
    GuidelineQueries, GuidelineRecommendation, MedicationInfo, PatientInfo,
};
pub use record::{parse_patient_bundle, read_patient_record};

pub const WORKFLOW_NAME: &str = "case_summary";

/// Everything the steps call out to.
#[derive(Clone)]
pub struct CaseSummaryCapabilities {
    pub generator: Arc<dyn StructuredGenerator>,
    pub retriever: Arc<dyn Retriever>,
    pub cache: StageCache,
    /// Keep only conditions whose clinical status is `active`.
    pub filter_active: bool,
}

pub fn build_workflow(
    capabilities: CaseSummaryCapabilities,
    options: WorkflowOptions,
) -> Result<Workflow<CaseEvent>, RegistrationError> {
    let CaseSummaryCapabilities {
        generator,
        retriever,
        cache,
        filter_active,
    } = capabilities;

    WorkflowBuilder::new(WORKFLOW_NAME)
        .options(options)
        .context_key(&PATIENT_INFO)
        .on_start(steps::ParsePatientInfo {
            cache: cache.clone(),
            filter_active,
        })
        .on(
            CaseEventKind::PatientInfo,
            steps::CreateConditionBundles {
                generator: Arc::clone(&generator),
                cache: cache.clone(),
            },
        )
        .on(CaseEventKind::ConditionBundles, steps::DispatchGuidelineMatch)
        .on(
            CaseEventKind::MatchGuideline,
            steps::HandleGuidelineMatch {
                generator: Arc::clone(&generator),
                retriever,
                cache: cache.clone(),
            },
        )
        .on(
            CaseEventKind::MatchGuidelineResult,
            steps::GatherGuidelineMatch { cache: cache.clone() },
        )
        .on(
            CaseEventKind::GenerateCaseSummary,
            steps::GenerateCaseSummary { generator, cache },
        )
        .build()
}
