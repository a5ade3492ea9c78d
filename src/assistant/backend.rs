//! Collaborator contracts of the remote assistant backend.
//!
//! The orchestrator only sees these traits. `client::HttpBackend` implements
//! all three over HTTP; tests substitute in-memory fakes.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::client::BackendError;
use crate::models::{AppointmentRequest, ChatTurn, MessageRole};

/// Role of a `messageHistory` entry on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub role: HistoryRole,
    pub content: String,
    pub timestamp: String,
}

impl From<&ChatTurn> for HistoryEntry {
    fn from(turn: &ChatTurn) -> Self {
        Self {
            role: match turn.role {
                MessageRole::User => HistoryRole::User,
                MessageRole::Assistant => HistoryRole::Assistant,
            },
            content: turn.text.clone(),
            timestamp: turn.created_at.format("%Y-%m-%dT%H:%M:%S").to_string(),
        }
    }
}

/// Consultation-scoped chat dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsultationChatRequest {
    pub consultation_id: i64,
    pub message: String,
    pub message_history: Vec<HistoryEntry>,
}

/// Floating assistant dispatch, bound to no consultation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneralChatRequest {
    pub message: String,
    pub message_history: Vec<HistoryEntry>,
}

/// Successful chat response body. A body without `response` is malformed.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatReply {
    pub response: String,
}

#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn consultation_chat(
        &self,
        request: &ConsultationChatRequest,
    ) -> Result<String, BackendError>;

    async fn general_chat(&self, request: &GeneralChatRequest) -> Result<String, BackendError>;
}

#[async_trait]
pub trait HealthProbe: Send + Sync {
    /// `Ok` only for a 2xx answer.
    async fn probe(&self) -> Result<(), BackendError>;
}

#[async_trait]
pub trait AppointmentService: Send + Sync {
    /// Returns the created appointment record as sent by the host.
    async fn create_appointment(
        &self,
        request: &AppointmentRequest,
    ) -> Result<serde_json::Value, BackendError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_entry_from_turn() {
        let at = chrono::NaiveDate::from_ymd_opt(2026, 3, 10)
            .unwrap()
            .and_hms_opt(14, 5, 0)
            .unwrap();
        let entry = HistoryEntry::from(&ChatTurn::assistant("Bonjour", at, None));
        assert_eq!(entry.role, HistoryRole::Assistant);
        assert_eq!(entry.content, "Bonjour");
        assert_eq!(entry.timestamp, "2026-03-10T14:05:00");
    }

    #[test]
    fn consultation_request_serializes_camel_case() {
        let request = ConsultationChatRequest {
            consultation_id: 12,
            message: "Synthèse ?".into(),
            message_history: vec![HistoryEntry {
                role: HistoryRole::User,
                content: "toux".into(),
                timestamp: "2026-03-10T14:05:00".into(),
            }],
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["consultationId"], 12);
        assert_eq!(json["messageHistory"][0]["role"], "user");
    }

    #[test]
    fn reply_without_response_field_fails_to_parse() {
        assert!(serde_json::from_str::<ChatReply>(r#"{"answer": "x"}"#).is_err());
        let reply: ChatReply = serde_json::from_str(r#"{"response": "ok"}"#).unwrap();
        assert_eq!(reply.response, "ok");
    }
}
