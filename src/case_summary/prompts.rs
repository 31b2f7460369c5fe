// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Prompt templates for the case-summary workflow.

use crate::case_summary::models::{ConditionBundle, GuidelineRecommendation};
use crate::traits::PromptTemplate;

/// Inputs: `patient_info`.
pub const CONDITION_BUNDLE_PROMPT: &str = "\
You associate each active condition of a patient with the recent encounters and current medications that relate to it.

Steps:
1. Review the patient's demographics, conditions, recent encounters and current medications.
2. For every entry in 'conditions':
   - Pick the entries of 'recent_encounters' whose 'reason_display' or 'type_display' mentions the condition or something closely related. Synonyms and partial matches count: an encounter mentioning \"asthma follow-up\" relates to \"Childhood asthma (disorder)\".
   - Pick the entries of 'current_medications' whose 'name' or 'instructions' indicate they manage the condition, such as inhalers for asthma or topical creams for dermatitis.
3. Demographics are context only and never decide relevance.
4. Answer only through the provided function call, with no commentary.

Patient data:
{{ patient_info }}
";

/// Inputs: `patient_info`, `condition_info`.
pub const GUIDELINE_QUERIES_PROMPT: &str = "\
You decide which medical guideline sections a clinician should consult for one of a patient's conditions.

You are given the patient's demographics and a condition bundle: one condition with its related encounters and medications.

Instructions:
1. Identify what about this condition needs guideline support: severity, standard management steps, medication choices, follow-up intervals, monitoring and patient education.
2. Write 3 to 5 short, specific search queries in natural language that would retrieve those sections from an index of medical guidelines.
3. Mention the relevant medications or encounter findings where they sharpen a query.
4. Answer only through the provided function call.

Patient info: {{ patient_info }}

Condition bundle: {{ condition_info }}
";

/// Inputs: `patient_condition_text`, `guideline_text`.
pub const GUIDELINE_RECOMMENDATION_PROMPT: &str = "\
Using the patient condition below and the matched guideline text (unformatted), produce a guideline recommendation through the provided function call.

The condition details include the condition together with the encounters and medications already associated with it. Keep the recommendation specific to this condition.

Patient condition:
{{ patient_condition_text }}

Matched guideline text:
{{ guideline_text }}
";

pub const CASE_SUMMARY_SYSTEM_PROMPT: &str = "\
You are a medical assistant writing a concise, readable case summary for a clinician.

You receive the patient's demographics and, for each condition, the related encounters, medications and a guideline recommendation.

Produce a CaseSummary through the provided function call:
- Use the patient's name as given and compute the age in years from the birth date.
- Write an overall_assessment that brings together conditions, encounters, medications and recommendations.
- For each condition write a short summary covering its current state, encounters showing progress or problems, the medications managing it and whether they agree with the guideline, and the key recommendation to follow next.
- Stay medically accurate while keeping the language plain.
";

/// Inputs: `demographic_info`, `condition_guideline_info`.
pub const CASE_SUMMARY_USER_PROMPT: &str = "\
Patient demographics:
{{ demographic_info }}

Condition information:
{{ condition_guideline_info }}

Produce the CaseSummary for this patient.
";

pub fn condition_bundle_prompt() -> PromptTemplate {
    PromptTemplate::user(CONDITION_BUNDLE_PROMPT)
}

pub fn guideline_queries_prompt() -> PromptTemplate {
    PromptTemplate::user(GUIDELINE_QUERIES_PROMPT)
}

pub fn guideline_recommendation_prompt() -> PromptTemplate {
    PromptTemplate::user(GUIDELINE_RECOMMENDATION_PROMPT)
}

pub fn case_summary_prompt() -> PromptTemplate {
    PromptTemplate::with_system(CASE_SUMMARY_SYSTEM_PROMPT, CASE_SUMMARY_USER_PROMPT)
}

/// One `(bundle, recommendation)` pair as prompt text.
pub fn condition_guideline_text(
    bundle: &ConditionBundle,
    recommendation: &GuidelineRecommendation,
) -> Result<String, serde_json::Error> {
    Ok(format!(
        "Condition info:\n{}\n\nRecommendation:\n{}\n",
        serde_json::to_string(bundle)?,
        serde_json::to_string(recommendation)?
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::CapabilityError;
    use crate::traits::PromptInputs;

    #[test]
    fn test_templates_render_with_their_inputs() {
        let inputs = PromptInputs::new()
            .with("patient_info", "P")
            .with("condition_info", "C")
            .with("patient_condition_text", "T")
            .with("guideline_text", "G")
            .with("demographic_info", "D")
            .with("condition_guideline_info", "CG");

        for template in [
            condition_bundle_prompt(),
            guideline_queries_prompt(),
            guideline_recommendation_prompt(),
            case_summary_prompt(),
        ] {
            let messages = template.render(&inputs).unwrap();
            assert!(messages.iter().all(|m| !m.content.contains("{{")));
        }
    }

    #[test]
    fn test_templates_report_their_missing_input() {
        match guideline_recommendation_prompt().render(&PromptInputs::new().with("guideline_text", "G")) {
            Err(CapabilityError::MissingPromptInput(name)) => assert_eq!(name, "patient_condition_text"),
            other => panic!("Expected MissingPromptInput, got {:?}", other),
        }
    }

    #[test]
    fn test_case_summary_prompt_has_system_message() {
        let inputs = PromptInputs::new()
            .with("demographic_info", "Given name: Ana")
            .with("condition_guideline_info", "none");
        let messages = case_summary_prompt().render(&inputs).unwrap();
        assert_eq!(messages.len(), 2);
        assert!(messages[1].content.contains("Given name: Ana"));
    }
}
