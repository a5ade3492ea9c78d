use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Scheduling command extracted from free text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentIntent {
    pub iso_date: NaiveDate,
    /// 24h `HH:MM`.
    pub time: String,
    pub reason: String,
}

/// Body of the external appointment-creation operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentRequest {
    pub patient_id: i64,
    pub doctor_id: i64,
    pub date: NaiveDate,
    pub time: String,
    pub reason: String,
}
