//! Floating assistant available outside any consultation.
//!
//! Same turn handling as the consultation orchestrator minus the patient
//! record: no scheduling commands, no preamble, and offline replies come from
//! the general template over the message's own analysis.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

use super::backend::{ChatBackend, GeneralChatRequest, HistoryEntry};
use super::clock::Clock;
use super::connectivity::ConnectivityMonitor;
use super::context::recent_window;
use super::conversation::Conversation;
use super::notify::{Notification, NotificationKind, NotificationLevel, Notifier};
use super::orchestrator::TurnOutcome;
use super::{lock, offline, symptoms, AssistantError};
use crate::models::{ChatTurn, ConnectionMode, Delivery};

struct GeneralSession {
    busy: bool,
    conversation: Conversation,
}

struct BusyGuard<'a> {
    session: &'a Mutex<GeneralSession>,
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        lock(self.session).busy = false;
    }
}

pub struct GeneralAssistant {
    backend: Arc<dyn ChatBackend>,
    connectivity: ConnectivityMonitor,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    history_window: usize,
    session: Mutex<GeneralSession>,
}

impl GeneralAssistant {
    pub fn new(
        backend: Arc<dyn ChatBackend>,
        connectivity: ConnectivityMonitor,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
        history_window: usize,
    ) -> Self {
        Self {
            backend,
            connectivity,
            notifier,
            clock,
            history_window,
            session: Mutex::new(GeneralSession {
                busy: false,
                conversation: Conversation::new(),
            }),
        }
    }

    pub fn conversation(&self) -> Vec<ChatTurn> {
        lock(&self.session).conversation.turns().to_vec()
    }

    pub fn is_busy(&self) -> bool {
        lock(&self.session).busy
    }

    pub fn reset(&self) {
        lock(&self.session).conversation.reset();
    }

    pub async fn submit(&self, text: &str) -> Result<TurnOutcome, AssistantError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(AssistantError::EmptyMessage);
        }

        let analysis = symptoms::analyze(text);
        let now = self.clock.now();

        let (epoch, user_turn_id, history) = {
            let mut session = lock(&self.session);
            if session.busy {
                return Err(AssistantError::Busy);
            }
            session.busy = true;
            let history: Vec<HistoryEntry> =
                recent_window(session.conversation.turns(), self.history_window)
                    .iter()
                    .map(HistoryEntry::from)
                    .collect();
            let user_turn = ChatTurn::user(
                text,
                now,
                (!analysis.is_empty()).then(|| analysis.medical_context(BTreeSet::new())),
            );
            let id = session.conversation.push(user_turn);
            (session.conversation.epoch(), id, history)
        };
        let _busy = BusyGuard {
            session: &self.session,
        };

        let mode = self.connectivity.mode();
        let reply = match mode {
            ConnectionMode::Online => {
                let request = GeneralChatRequest {
                    message: text.to_string(),
                    message_history: history,
                };
                self.backend.general_chat(&request).await
            }
            ConnectionMode::Offline => Ok(offline::general_reply(&analysis)),
        };

        let mut session = lock(&self.session);
        if session.conversation.epoch() != epoch {
            tracing::debug!("General assistant reply arrived after reset, discarded");
            return Ok(TurnOutcome::Discarded);
        }

        match reply {
            Ok(reply) => {
                session.conversation.set_delivery(user_turn_id, Delivery::Answered);
                let actions = symptoms::suggested_actions(&analysis);
                let turn = ChatTurn::assistant(
                    reply,
                    self.clock.now(),
                    (!analysis.is_empty()).then(|| analysis.medical_context(actions)),
                );
                let turn_id = session.conversation.push(turn);
                Ok(TurnOutcome::Answered { turn_id, mode })
            }
            Err(e) => {
                session.conversation.set_delivery(
                    user_turn_id,
                    Delivery::Failed {
                        reason: e.to_string(),
                    },
                );
                drop(session);
                tracing::warn!(error = %e, "General assistant dispatch failed");
                self.notifier.notify(Notification::new(
                    NotificationLevel::Error,
                    NotificationKind::DispatchFailed,
                    format!("L'assistant n'a pas pu répondre : {e}"),
                ));
                Err(e.into())
            }
        }
    }
}
