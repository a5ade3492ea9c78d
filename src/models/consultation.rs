use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// A consultation as fetched by the host application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Consultation {
    pub id: i64,
    pub patient_id: i64,
    pub doctor_id: i64,
    #[serde(default)]
    pub patient_name: Option<String>,
    pub date: NaiveDate,
    pub reason: String,
    #[serde(default)]
    pub diagnosis: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl Consultation {
    /// Reason, diagnosis and notes joined into one text for local analysis.
    pub fn clinical_text(&self) -> String {
        [
            Some(self.reason.as_str()),
            self.diagnosis.as_deref(),
            self.notes.as_deref(),
        ]
        .into_iter()
        .flatten()
        .filter(|s| !s.trim().is_empty())
        .collect::<Vec<_>>()
        .join(" ")
    }

    pub fn patient_label(&self) -> String {
        self.patient_name
            .clone()
            .unwrap_or_else(|| format!("patient n°{}", self.patient_id))
    }
}

/// A previously generated AI summary for a patient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiSummary {
    pub id: i64,
    pub patient_id: i64,
    #[serde(default)]
    pub consultation_id: Option<i64>,
    pub content: String,
    pub created_at: NaiveDateTime,
}

/// Everything the host fetched when a consultation was selected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientRecord {
    pub active: Consultation,
    #[serde(default)]
    pub consultations: Vec<Consultation>,
    #[serde(default)]
    pub summaries: Vec<AiSummary>,
}

impl PatientRecord {
    pub fn new(active: Consultation) -> Self {
        Self {
            active,
            consultations: Vec::new(),
            summaries: Vec::new(),
        }
    }
}
