// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Patient record parsing.
//!
//! Input is a FHIR-style bundle: `{"entry": [{"resource": {...}}, ...]}`.
//! Only `Patient`, `Condition`, `Encounter` and `MedicationRequest`
//! resources are read; everything else is ignored. Missing optional fields
//! fall back to the same placeholders every time so the parsed record is
//! deterministic for a given file.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;
use std::path::Path;

use crate::case_summary::models::{ConditionInfo, EncounterInfo, MedicationInfo, PatientInfo};
use crate::errors::RecordError;

/// Conditions that carry no clinical signal for a case summary.
pub const EXCLUDED_CONDITIONS: &[&str] = &[
    "Medication review due (situation)",
    "Risk activity involvement (finding)",
];

/// How many of the latest encounters are kept.
pub const RECENT_ENCOUNTER_LIMIT: usize = 3;

/// Read and parse the bundle at `path`.
pub async fn read_patient_record(path: &Path, filter_active: bool) -> Result<PatientInfo, RecordError> {
    let bytes = tokio::fs::read(path).await.map_err(|source| RecordError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let bundle: Value = serde_json::from_slice(&bytes)?;
    parse_patient_bundle(&bundle, filter_active)
}

/// Extract a [`PatientInfo`] from an already-decoded bundle.
///
/// With `filter_active` set, only conditions whose clinical status is
/// `active` are kept.
pub fn parse_patient_bundle(bundle: &Value, filter_active: bool) -> Result<PatientInfo, RecordError> {
    let entries = bundle
        .get("entry")
        .and_then(Value::as_array)
        .ok_or(RecordError::MissingEntries)?;

    let mut patient = None;
    let mut conditions = Vec::new();
    let mut encounters = Vec::new();
    let mut medications = Vec::new();

    for resource in entries.iter().filter_map(|entry| entry.get("resource")) {
        match resource.get("resourceType").and_then(Value::as_str) {
            Some("Patient") => patient = Some(resource),
            Some("Condition") => conditions.push(resource),
            Some("Encounter") => encounters.push(resource),
            Some("MedicationRequest") => medications.push(resource),
            _ => {}
        }
    }

    let patient = patient.ok_or(RecordError::MissingPatient)?;
    let name = patient.pointer("/name/0");

    Ok(PatientInfo {
        given_name: text_at(name, "/given/0").unwrap_or_default(),
        family_name: text_at(name, "/family").unwrap_or_default(),
        birth_date: text_at(Some(patient), "/birthDate").unwrap_or_default(),
        gender: text_at(Some(patient), "/gender").unwrap_or_default(),
        conditions: parse_conditions(&conditions, filter_active),
        recent_encounters: parse_encounters(encounters),
        current_medications: parse_medications(&medications),
    })
}

fn text_at(value: Option<&Value>, pointer: &str) -> Option<String> {
    value?.pointer(pointer)?.as_str().map(str::to_string)
}

fn parse_conditions(conditions: &[&Value], filter_active: bool) -> Vec<ConditionInfo> {
    conditions
        .iter()
        .map(|c| {
            let coding = c.pointer("/code/coding/0");
            ConditionInfo {
                code: text_at(coding, "/code").unwrap_or_else(|| "Unknown".to_string()),
                display: text_at(coding, "/display").unwrap_or_else(|| "Unknown".to_string()),
                clinical_status: text_at(Some(c), "/clinicalStatus/coding/0/code")
                    .unwrap_or_else(|| "unknown".to_string()),
            }
        })
        .filter(|c| !EXCLUDED_CONDITIONS.contains(&c.display.as_str()))
        .filter(|c| !filter_active || c.clinical_status == "active")
        .collect()
}

/// Parse an encounter start; anything unparseable sorts first.
fn encounter_start(encounter: &Value) -> DateTime<Utc> {
    let Some(start) = encounter.pointer("/period/start").and_then(Value::as_str) else {
        return DateTime::<Utc>::MIN_UTC;
    };
    if let Ok(parsed) = DateTime::parse_from_rfc3339(start) {
        return parsed.with_timezone(&Utc);
    }
    if let Ok(parsed) = NaiveDateTime::parse_from_str(start, "%Y-%m-%dT%H:%M:%S") {
        return parsed.and_utc();
    }
    NaiveDate::parse_from_str(start, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

fn parse_encounters(mut encounters: Vec<&Value>) -> Vec<EncounterInfo> {
    encounters.sort_by_key(|e| encounter_start(e));
    let skip = encounters.len().saturating_sub(RECENT_ENCOUNTER_LIMIT);
    encounters
        .into_iter()
        .skip(skip)
        .map(|e| EncounterInfo {
            date: text_at(Some(e), "/period/start").unwrap_or_default(),
            reason_display: text_at(Some(e), "/reasonCode/0/coding/0/display"),
            type_display: text_at(Some(e), "/type/0/coding/0/display"),
        })
        .collect()
}

fn parse_medications(medications: &[&Value]) -> Vec<MedicationInfo> {
    medications
        .iter()
        .filter(|m| m.get("status").and_then(Value::as_str) == Some("active"))
        .map(|m| MedicationInfo {
            name: text_at(Some(m), "/medicationCodeableConcept/coding/0/display")
                .unwrap_or_else(|| "Unknown Medication".to_string()),
            start_date: text_at(Some(m), "/authoredOn"),
            instructions: text_at(Some(m), "/dosageInstruction/0/text"),
        })
        .collect()
}
