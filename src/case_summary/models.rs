// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Data carried through the case-summary workflow.
//!
//! Every type here is both persisted by the stage cache and, where a
//! generator produces it, described to the generator through a JSON schema.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::traits::StructuredOutput;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionInfo {
    pub code: String,
    pub display: String,
    pub clinical_status: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncounterInfo {
    pub date: String,
    #[serde(default)]
    pub reason_display: Option<String>,
    #[serde(default)]
    pub type_display: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MedicationInfo {
    pub name: String,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub instructions: Option<String>,
}

/// Patient summary extracted from a record bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientInfo {
    pub given_name: String,
    pub family_name: String,
    pub birth_date: String,
    pub gender: String,
    #[serde(default)]
    pub conditions: Vec<ConditionInfo>,
    #[serde(default)]
    pub recent_encounters: Vec<EncounterInfo>,
    #[serde(default)]
    pub current_medications: Vec<MedicationInfo>,
}

impl PatientInfo {
    /// Demographics block handed to prompts that do not need the full record.
    pub fn demographic_str(&self) -> String {
        format!(
            "Given name: {}\nFamily name: {}\nBirth date: {}\nGender: {}",
            self.given_name, self.family_name, self.birth_date, self.gender
        )
    }
}

/// One condition with the encounters and medications that relate to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionBundle {
    pub condition: ConditionInfo,
    #[serde(default)]
    pub encounters: Vec<EncounterInfo>,
    #[serde(default)]
    pub medications: Vec<MedicationInfo>,
}

impl ConditionBundle {
    /// Stable cache-key fragment for this bundle's guideline match.
    pub fn slug(&self) -> String {
        let source = if self.condition.code.trim().is_empty() {
            &self.condition.display
        } else {
            &self.condition.code
        };
        let slug: String = source
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
            .collect();
        let slug = slug.trim_matches('_');
        if slug.is_empty() {
            "condition".to_string()
        } else {
            slug.to_string()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionBundles {
    pub bundles: Vec<ConditionBundle>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuidelineQueries {
    #[serde(default)]
    pub queries: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuidelineRecommendation {
    pub guideline_source: String,
    pub recommendation_summary: String,
    #[serde(default)]
    pub reference_section: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionSummary {
    pub condition_display: String,
    pub summary: String,
}

/// The workflow's final result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseSummary {
    pub patient_name: String,
    pub age: u32,
    pub overall_assessment: String,
    #[serde(default)]
    pub condition_summaries: Vec<ConditionSummary>,
}

impl CaseSummary {
    /// Plain-text report for a clinician.
    pub fn render(&self) -> String {
        let mut lines = vec![
            format!("Patient Name: {}", self.patient_name),
            String::new(),
            format!("Patient Age: {} years old", self.age),
            String::new(),
            "Overall Assessment:".to_string(),
            self.overall_assessment.clone(),
            String::new(),
        ];

        if self.condition_summaries.is_empty() {
            lines.push("No specific conditions were summarized.".to_string());
        } else {
            lines.push("Condition Summaries:".to_string());
            for summary in &self.condition_summaries {
                lines.push(format!("- {}:", summary.condition_display));
                lines.push(format!("  {}", summary.summary));
            }
        }
        lines.join("\n")
    }
}

fn condition_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "code": {"type": "string"},
            "display": {"type": "string"},
            "clinical_status": {"type": "string"}
        },
        "required": ["code", "display", "clinical_status"]
    })
}

fn encounter_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "date": {"type": "string", "description": "Date of the encounter."},
            "reason_display": {"type": ["string", "null"], "description": "Reason for the encounter."},
            "type_display": {"type": ["string", "null"], "description": "Type or class of the encounter."}
        },
        "required": ["date"]
    })
}

fn medication_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "name": {"type": "string", "description": "Name of the medication."},
            "start_date": {"type": ["string", "null"], "description": "When the medication was prescribed."},
            "instructions": {"type": ["string", "null"], "description": "Dosage instructions."}
        },
        "required": ["name"]
    })
}

impl StructuredOutput for ConditionBundles {
    const NAME: &'static str = "ConditionBundles";
    const DESCRIPTION: &'static str =
        "Each active condition of the patient with its relevant encounters and medications.";

    fn json_schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "bundles": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "condition": condition_schema(),
                            "encounters": {"type": "array", "items": encounter_schema()},
                            "medications": {"type": "array", "items": medication_schema()}
                        },
                        "required": ["condition"]
                    }
                }
            },
            "required": ["bundles"]
        })
    }
}

impl StructuredOutput for GuidelineQueries {
    const NAME: &'static str = "GuidelineQueries";
    const DESCRIPTION: &'static str =
        "Queries for retrieving guideline sections relevant to the patient's conditions.";

    fn json_schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "queries": {
                    "type": "array",
                    "items": {"type": "string"},
                    "description": "Query strings for searching an index of medical guidelines."
                }
            },
            "required": ["queries"]
        })
    }
}

impl StructuredOutput for GuidelineRecommendation {
    const NAME: &'static str = "GuidelineRecommendation";
    const DESCRIPTION: &'static str = "A guideline recommendation for one patient condition.";

    fn json_schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "guideline_source": {
                    "type": "string",
                    "description": "The origin of the guideline (e.g., 'NHLBI Asthma Guidelines')."
                },
                "recommendation_summary": {
                    "type": "string",
                    "description": "A concise summary of the relevant recommendation."
                },
                "reference_section": {
                    "type": ["string", "null"],
                    "description": "Specific section or reference in the guideline."
                }
            },
            "required": ["guideline_source", "recommendation_summary"]
        })
    }
}

impl StructuredOutput for CaseSummary {
    const NAME: &'static str = "CaseSummary";
    const DESCRIPTION: &'static str = "A concise case summary of the patient for a clinician.";

    fn json_schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "patient_name": {"type": "string", "description": "The patient's name."},
                "age": {"type": "integer", "minimum": 0, "description": "The patient's age in years."},
                "overall_assessment": {
                    "type": "string",
                    "description": "A high-level summary synthesizing all conditions, encounters, medications and guideline recommendations."
                },
                "condition_summaries": {
                    "type": "array",
                    "description": "Condition-specific summaries of current management and recommendations.",
                    "items": {
                        "type": "object",
                        "properties": {
                            "condition_display": {
                                "type": "string",
                                "description": "Human-readable name of the condition."
                            },
                            "summary": {
                                "type": "string",
                                "description": "Narrative of the condition's status, relevant encounters, medications and recommendations."
                            }
                        },
                        "required": ["condition_display", "summary"]
                    }
                }
            },
            "required": ["patient_name", "age", "overall_assessment"]
        })
    }
}
