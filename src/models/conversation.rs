use std::collections::BTreeSet;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{MessageRole, Priority, SuggestedAction};

/// Local triage annotation attached to turns that went through the analyzer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicalContext {
    pub symptoms: Vec<String>,
    pub suggested_actions: BTreeSet<SuggestedAction>,
    pub priority: Priority,
}

/// Delivery status of a turn.
///
/// User turns start `Pending` and move to `Answered` or `Failed` once the
/// dispatch they triggered completes. Assistant turns are always `Answered`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Delivery {
    Pending,
    Answered,
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatTurn {
    pub id: Uuid,
    pub role: MessageRole,
    pub text: String,
    pub created_at: NaiveDateTime,
    pub medical_context: Option<MedicalContext>,
    pub delivery: Delivery,
}

impl ChatTurn {
    /// A user turn. Suggested actions are dropped: only assistant turns carry them.
    pub fn user(
        text: impl Into<String>,
        created_at: NaiveDateTime,
        medical_context: Option<MedicalContext>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            role: MessageRole::User,
            text: text.into(),
            created_at,
            medical_context: medical_context.map(|mut ctx| {
                ctx.suggested_actions.clear();
                ctx
            }),
            delivery: Delivery::Pending,
        }
    }

    pub fn assistant(
        text: impl Into<String>,
        created_at: NaiveDateTime,
        medical_context: Option<MedicalContext>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            role: MessageRole::Assistant,
            text: text.into(),
            created_at,
            medical_context,
            delivery: Delivery::Answered,
        }
    }

    pub fn is_user(&self) -> bool {
        self.role == MessageRole::User
    }

    /// User turn whose dispatch failed and never got an answer.
    pub fn is_failed(&self) -> bool {
        matches!(self.delivery, Delivery::Failed { .. })
    }
}
