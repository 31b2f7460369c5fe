// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! The six steps of the case-summary workflow.
//!
//! ```text
//! Start ─► parse_patient_info ─► create_condition_bundles ─► dispatch_guideline_match
//!                                                                 │ (one per bundle)
//!                                                                 ▼
//!   Stop ◄─ generate_case_summary ◄─ gather_guideline_match ◄─ handle_guideline_match
//! ```
//!
//! Every stage that calls a capability is memoized in the [`StageCache`];
//! a rerun against a populated output directory makes no external calls.

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;

use crate::case_summary::events::{CaseEvent, GuidelineMatch, GUIDELINE_MATCHES, PATIENT_INFO};
use crate::case_summary::models::{
    CaseSummary, ConditionBundle, ConditionBundles, GuidelineQueries, GuidelineRecommendation,
    PatientInfo,
};
use crate::case_summary::prompts;
use crate::case_summary::record::read_patient_record;
use crate::engine::{Event, StageCache, StepContext};
use crate::errors::WorkflowError;
use crate::traits::{dedup_by_id, predict, PromptInputs, Retriever, Step, StructuredGenerator};

pub const PATIENT_INFO_STAGE: &str = "patient_info";
pub const CONDITION_BUNDLES_STAGE: &str = "condition_bundles";
pub const GUIDELINE_RECOMMENDATIONS_STAGE: &str = "guideline_recommendations";
pub const CASE_SUMMARY_STAGE: &str = "case_summary";

/// Characters of retrieved guideline text echoed in verbose mode.
const GUIDELINE_PREVIEW_CHARS: usize = 200;

type Emitted = Result<Vec<Event<CaseEvent>>, WorkflowError>;

fn unexpected(step: &'static str, event: &Event<CaseEvent>) -> WorkflowError {
    WorkflowError::UnexpectedEvent {
        step,
        event: event.describe(),
    }
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String, WorkflowError> {
    serde_json::to_string(value).map_err(|e| WorkflowError::Internal(format!("JSON encoding failed: {}", e)))
}

/// Stream a pretty JSON dump of `value` when the run is verbose.
async fn log_json<T: Serialize + ?Sized>(ctx: &StepContext<CaseEvent>, value: &T) -> Result<(), WorkflowError> {
    if !ctx.is_verbose() {
        return Ok(());
    }
    let pretty = serde_json::to_string_pretty(value)
        .map_err(|e| WorkflowError::Internal(format!("JSON encoding failed: {}", e)))?;
    ctx.log(format!(">> \n```json\n{}\n```", pretty)).await
}

async fn log_verbose(ctx: &StepContext<CaseEvent>, message: impl Into<String>) -> Result<(), WorkflowError> {
    if ctx.is_verbose() {
        ctx.log(message).await?;
    }
    Ok(())
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

pub struct ParsePatientInfo {
    pub cache: StageCache,
    pub filter_active: bool,
}

#[async_trait]
impl Step<CaseEvent> for ParsePatientInfo {
    async fn run(&self, ctx: StepContext<CaseEvent>, event: Event<CaseEvent>) -> Emitted {
        let path = match event {
            Event::Start(path) => path,
            other => return Err(unexpected(self.name(), &other)),
        };

        let patient = match self.cache.load::<PatientInfo>(PATIENT_INFO_STAGE).await? {
            Some(patient) => {
                log_verbose(&ctx, "## Patient Info").await?;
                patient
            }
            None => {
                log_verbose(&ctx, ">> Reading patient info").await?;
                let patient = read_patient_record(&path, self.filter_active).await?;
                self.cache.save(PATIENT_INFO_STAGE, &patient).await?;
                patient
            }
        };
        log_json(&ctx, &patient).await?;

        ctx.set(&PATIENT_INFO, patient.clone())?;
        Ok(vec![Event::Step(CaseEvent::PatientInfo(patient))])
    }

    fn name(&self) -> &'static str {
        "parse_patient_info"
    }
}

pub struct CreateConditionBundles {
    pub generator: Arc<dyn StructuredGenerator>,
    pub cache: StageCache,
}

#[async_trait]
impl Step<CaseEvent> for CreateConditionBundles {
    async fn run(&self, _ctx: StepContext<CaseEvent>, event: Event<CaseEvent>) -> Emitted {
        let patient = match event {
            Event::Step(CaseEvent::PatientInfo(patient)) => patient,
            other => return Err(unexpected(self.name(), &other)),
        };

        let bundles = match self.cache.load::<ConditionBundles>(CONDITION_BUNDLES_STAGE).await? {
            Some(bundles) => bundles,
            None => {
                let inputs = PromptInputs::new().with("patient_info", to_json(&patient)?);
                let bundles: ConditionBundles =
                    predict(self.generator.as_ref(), &prompts::condition_bundle_prompt(), inputs).await?;
                self.cache.save(CONDITION_BUNDLES_STAGE, &bundles).await?;
                bundles
            }
        };

        Ok(vec![Event::Step(CaseEvent::ConditionBundles(bundles))])
    }

    fn name(&self) -> &'static str {
        "create_condition_bundles"
    }
}

/// Fans out one `MatchGuideline` per bundle behind a barrier of the same size.
pub struct DispatchGuidelineMatch;

#[async_trait]
impl Step<CaseEvent> for DispatchGuidelineMatch {
    async fn run(&self, ctx: StepContext<CaseEvent>, event: Event<CaseEvent>) -> Emitted {
        let bundles = match event {
            Event::Step(CaseEvent::ConditionBundles(bundles)) => bundles,
            other => return Err(unexpected(self.name(), &other)),
        };

        // The group must be open before the first child can submit.
        let expected = bundles.bundles.len();
        if let Some(matches) = ctx.open_group::<GuidelineMatch>(GUIDELINE_MATCHES, expected)? {
            return Ok(vec![Event::Step(CaseEvent::GenerateCaseSummary(matches))]);
        }

        for (index, bundle) in bundles.bundles.into_iter().enumerate() {
            ctx.send_event(Event::Step(CaseEvent::MatchGuideline { index, bundle })).await?;
        }
        Ok(Vec::new())
    }

    fn name(&self) -> &'static str {
        "dispatch_guideline_match"
    }
}

pub struct HandleGuidelineMatch {
    pub generator: Arc<dyn StructuredGenerator>,
    pub retriever: Arc<dyn Retriever>,
    pub cache: StageCache,
}

impl HandleGuidelineMatch {
    /// Cache key for one fan-out child. Bundles may share a condition code,
    /// so the position in the bundle list keeps keys unique.
    pub fn stage_key(index: usize, bundle: &ConditionBundle) -> String {
        format!("guideline_match/{}_{}", index, bundle.slug())
    }

    async fn recommend(
        &self,
        ctx: &StepContext<CaseEvent>,
        bundle: &ConditionBundle,
    ) -> Result<GuidelineRecommendation, WorkflowError> {
        let patient = ctx.get(&PATIENT_INFO)?;
        let bundle_json = to_json(bundle)?;

        let inputs = PromptInputs::new()
            .with("patient_info", patient.demographic_str())
            .with("condition_info", bundle_json.clone());
        let queries: GuidelineQueries =
            predict(self.generator.as_ref(), &prompts::guideline_queries_prompt(), inputs).await?;

        ctx.log("## Generating Queries").await?;
        let mut documents = Vec::new();
        for query in &queries.queries {
            ctx.ensure_active()?;
            log_verbose(ctx, format!(">> - {}", capitalize(query))).await?;
            documents.extend(self.retriever.retrieve(query).await?);
        }
        let guideline_text = dedup_by_id(documents)
            .into_iter()
            .map(|doc| doc.content)
            .collect::<Vec<_>>()
            .join("\n\n");

        if ctx.is_verbose() {
            ctx.log("## Found Guidelines").await?;
            let preview: String = guideline_text.chars().take(GUIDELINE_PREVIEW_CHARS).collect();
            ctx.log(format!("{}...", preview)).await?;
        }

        ctx.ensure_active()?;
        let inputs = PromptInputs::new()
            .with("patient_condition_text", bundle_json)
            .with("guideline_text", guideline_text);
        predict(self.generator.as_ref(), &prompts::guideline_recommendation_prompt(), inputs).await
    }
}

#[async_trait]
impl Step<CaseEvent> for HandleGuidelineMatch {
    async fn run(&self, ctx: StepContext<CaseEvent>, event: Event<CaseEvent>) -> Emitted {
        let (index, bundle) = match event {
            Event::Step(CaseEvent::MatchGuideline { index, bundle }) => (index, bundle),
            other => return Err(unexpected(self.name(), &other)),
        };

        let stage = Self::stage_key(index, &bundle);
        let recommendation = match self.cache.load::<GuidelineRecommendation>(&stage).await? {
            Some(recommendation) => recommendation,
            None => {
                let recommendation = self.recommend(&ctx, &bundle).await?;
                self.cache.save(&stage, &recommendation).await?;
                recommendation
            }
        };

        ctx.log("## Guidelines Recommendations").await?;
        log_json(&ctx, &recommendation).await?;

        Ok(vec![Event::Step(CaseEvent::MatchGuidelineResult {
            bundle,
            recommendation,
        })])
    }

    fn name(&self) -> &'static str {
        "handle_guideline_match"
    }
}

/// Joins the per-bundle results; only the submit that completes the group
/// emits anything.
pub struct GatherGuidelineMatch {
    pub cache: StageCache,
}

#[async_trait]
impl Step<CaseEvent> for GatherGuidelineMatch {
    async fn run(&self, ctx: StepContext<CaseEvent>, event: Event<CaseEvent>) -> Emitted {
        let (bundle, recommendation) = match event {
            Event::Step(CaseEvent::MatchGuidelineResult { bundle, recommendation }) => (bundle, recommendation),
            other => return Err(unexpected(self.name(), &other)),
        };

        let Some(matches) = ctx.submit(GUIDELINE_MATCHES, (bundle, recommendation))? else {
            return Ok(Vec::new());
        };

        let recommendations: Vec<&GuidelineRecommendation> = matches.iter().map(|(_, rec)| rec).collect();
        self.cache
            .save(GUIDELINE_RECOMMENDATIONS_STAGE, &recommendations)
            .await?;

        Ok(vec![Event::Step(CaseEvent::GenerateCaseSummary(matches))])
    }

    fn name(&self) -> &'static str {
        "gather_guideline_match"
    }
}

pub struct GenerateCaseSummary {
    pub generator: Arc<dyn StructuredGenerator>,
    pub cache: StageCache,
}

#[async_trait]
impl Step<CaseEvent> for GenerateCaseSummary {
    async fn run(&self, ctx: StepContext<CaseEvent>, event: Event<CaseEvent>) -> Emitted {
        let matches = match event {
            Event::Step(CaseEvent::GenerateCaseSummary(matches)) => matches,
            other => return Err(unexpected(self.name(), &other)),
        };

        log_verbose(&ctx, "## Case Summary").await?;

        let summary = match self.cache.load::<CaseSummary>(CASE_SUMMARY_STAGE).await? {
            Some(summary) => summary,
            None => {
                let patient = ctx.get(&PATIENT_INFO)?;
                let condition_guideline_info = matches
                    .iter()
                    .map(|(bundle, rec)| prompts::condition_guideline_text(bundle, rec))
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(|e| WorkflowError::Internal(format!("JSON encoding failed: {}", e)))?
                    .join("\n\n");

                let inputs = PromptInputs::new()
                    .with("demographic_info", patient.demographic_str())
                    .with("condition_guideline_info", condition_guideline_info);
                let summary: CaseSummary =
                    predict(self.generator.as_ref(), &prompts::case_summary_prompt(), inputs).await?;
                self.cache.save(CASE_SUMMARY_STAGE, &summary).await?;
                summary
            }
        };

        Ok(vec![Event::Stop(summary)])
    }

    fn name(&self) -> &'static str {
        "generate_case_summary"
    }
}
