//! Scheduling commands typed into the consultation chat.
//!
//! "planifie un rendez-vous demain à 15h pour douleur thoracique" creates an
//! appointment for the active consultation's patient and doctor instead of
//! being sent to the assistant backend.

use std::sync::{Arc, LazyLock};

use chrono::{NaiveDateTime, NaiveTime};
use regex::Regex;

use super::backend::AppointmentService;
use super::clock::Clock;
use super::datetime;
use crate::models::{AppointmentIntent, AppointmentRequest, Consultation};

pub const DEFAULT_REASON: &str = "Consultation";

static VERB_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        concat!(
            r"(?i)\b(?:(?:planifi|programm|r[ée]serv|fix|cal|organis)(?:e|er|ez|es|ons)",
            r"|pr[ée]vo(?:ir|is|it|yez|yons)",
            r"|pren(?:ds|d|dre|ez|ons))\b",
        ),
    )
    .expect("Invalid scheduling verb pattern")
});

static NOUN_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:rendez[- ]vous|rdv)\b").expect("Invalid appointment noun pattern")
});

static REASON_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bpour\b").expect("Invalid reason marker pattern"));

/// Time used when the command names a date but no time.
fn default_time() -> NaiveTime {
    NaiveTime::from_hms_opt(12, 0, 0).unwrap_or(NaiveTime::MIN)
}

/// A scheduling verb and an appointment noun must both appear.
pub fn is_scheduling_command(text: &str) -> bool {
    VERB_PATTERN.is_match(text) && NOUN_PATTERN.is_match(text)
}

/// Text after the last whole-word "pour", or [`DEFAULT_REASON`].
pub fn extract_reason(text: &str) -> String {
    let reason = REASON_MARKER
        .find_iter(text)
        .last()
        .map(|m| {
            text[m.end()..]
                .trim()
                .trim_end_matches(['.', '!', '?', ',', ';', ':'])
                .trim()
        })
        .unwrap_or_default();

    if reason.is_empty() {
        DEFAULT_REASON.to_string()
    } else {
        reason.to_string()
    }
}

/// Parse a scheduling command without side effects.
///
/// The first mention carrying a date wins; a bare time counts only when the
/// text names no date at all. A date missing from the calendar rejects the
/// command.
pub fn parse_command(text: &str, now: NaiveDateTime) -> Option<AppointmentIntent> {
    if !is_scheduling_command(text) {
        return None;
    }

    let mentions = match datetime::extract(text, now) {
        Ok(mentions) => mentions,
        Err(e) => {
            tracing::debug!(error = %e, "Scheduling command names an impossible date");
            return None;
        }
    };
    let mention = mentions
        .iter()
        .find(|m| m.dated)
        .or_else(|| mentions.first())?;
    Some(AppointmentIntent {
        iso_date: mention.date,
        time: mention.time_or(default_time()).format("%H:%M").to_string(),
        reason: extract_reason(text),
    })
}

/// Turns commands into created appointments.
pub struct AppointmentInterpreter {
    service: Arc<dyn AppointmentService>,
    clock: Arc<dyn Clock>,
}

impl AppointmentInterpreter {
    pub fn new(service: Arc<dyn AppointmentService>, clock: Arc<dyn Clock>) -> Self {
        Self { service, clock }
    }

    /// `Some` only when the text is a command and the appointment was created.
    /// Creation failures are logged and reported as "not a command".
    pub async fn try_interpret(
        &self,
        text: &str,
        active: &Consultation,
    ) -> Option<AppointmentIntent> {
        let intent = parse_command(text, self.clock.now())?;

        let request = AppointmentRequest {
            patient_id: active.patient_id,
            doctor_id: active.doctor_id,
            date: intent.iso_date,
            time: intent.time.clone(),
            reason: intent.reason.clone(),
        };

        match self.service.create_appointment(&request).await {
            Ok(_) => {
                tracing::info!(
                    patient_id = active.patient_id,
                    date = %intent.iso_date,
                    time = %intent.time,
                    "Appointment created from chat command"
                );
                Some(intent)
            }
            Err(e) => {
                tracing::warn!(
                    patient_id = active.patient_id,
                    error = %e,
                    "Appointment creation failed, handling message as chat"
                );
                None
            }
        }
    }
}
