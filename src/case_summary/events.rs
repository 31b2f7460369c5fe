// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::path::PathBuf;

use crate::case_summary::models::{
    CaseSummary, ConditionBundle, ConditionBundles, GuidelineRecommendation, PatientInfo,
};
use crate::engine::{ContextKey, Payload};

/// Parsed patient record, shared by every step after the first.
pub const PATIENT_INFO: ContextKey<PatientInfo> = ContextKey::new("patient_info");

/// Barrier group joining the per-condition guideline matches.
pub const GUIDELINE_MATCHES: &str = "guideline_matches";

pub type GuidelineMatch = (ConditionBundle, GuidelineRecommendation);

#[derive(Debug, Clone)]
pub enum CaseEvent {
    PatientInfo(PatientInfo),
    ConditionBundles(ConditionBundles),
    /// `index` is the bundle's position in the cached `ConditionBundles`.
    MatchGuideline {
        index: usize,
        bundle: ConditionBundle,
    },
    MatchGuidelineResult {
        bundle: ConditionBundle,
        recommendation: GuidelineRecommendation,
    },
    GenerateCaseSummary(Vec<GuidelineMatch>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CaseEventKind {
    PatientInfo,
    ConditionBundles,
    MatchGuideline,
    MatchGuidelineResult,
    GenerateCaseSummary,
}

impl Payload for CaseEvent {
    /// Path of the patient record bundle.
    type Input = PathBuf;
    type Output = CaseSummary;
    type Kind = CaseEventKind;

    fn kind(&self) -> CaseEventKind {
        match self {
            CaseEvent::PatientInfo(_) => CaseEventKind::PatientInfo,
            CaseEvent::ConditionBundles(_) => CaseEventKind::ConditionBundles,
            CaseEvent::MatchGuideline { .. } => CaseEventKind::MatchGuideline,
            CaseEvent::MatchGuidelineResult { .. } => CaseEventKind::MatchGuidelineResult,
            CaseEvent::GenerateCaseSummary(_) => CaseEventKind::GenerateCaseSummary,
        }
    }

    fn kinds() -> &'static [CaseEventKind] {
        &[
            CaseEventKind::PatientInfo,
            CaseEventKind::ConditionBundles,
            CaseEventKind::MatchGuideline,
            CaseEventKind::MatchGuidelineResult,
            CaseEventKind::GenerateCaseSummary,
        ]
    }
}
