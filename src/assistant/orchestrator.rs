//! Consultation chat orchestrator.
//!
//! One instance per consultation screen. Each submitted message is first
//! offered to the appointment interpreter; anything else is triaged locally,
//! appended as a user turn and answered by the remote assistant (online) or
//! by a local template (offline).
//!
//! Session state lives behind a `std::sync::Mutex` that is never held across
//! an `.await`. Every dispatch captures the conversation epoch; a reply that
//! comes back after the epoch moved on is dropped.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

use uuid::Uuid;

use super::appointment_command::AppointmentInterpreter;
use super::backend::{ChatBackend, ConsultationChatRequest};
use super::clock::Clock;
use super::connectivity::ConnectivityMonitor;
use super::context::{build_context, ContextLimits};
use super::conversation::{Conversation, Epoch};
use super::notify::{Notification, NotificationKind, NotificationLevel, Notifier};
use super::offline::{self, OfflineInput};
use super::{lock, symptoms, AssistantError};
use crate::models::{
    AnalysisResult, AppointmentIntent, ChatTurn, ConnectionMode, Consultation, Delivery,
    MedicalContext, PatientRecord, SuggestedAction,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrchestratorState {
    Idle,
    InterpretingCommand,
    Analyzing,
    AssemblingContext,
    Dispatching,
}

/// How a submitted message was handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// The message was a scheduling command; the chat backend was not called.
    AppointmentScheduled(AppointmentIntent),
    /// An assistant turn was appended.
    Answered { turn_id: Uuid, mode: ConnectionMode },
    /// The conversation was reset or switched while the reply was in flight.
    Discarded,
}

struct Session {
    state: OrchestratorState,
    record: Option<PatientRecord>,
    conversation: Conversation,
    welcome_pending: bool,
}

/// Returns the session to `Idle` on every exit path of a transition.
struct IdleGuard<'a> {
    session: &'a Mutex<Session>,
}

impl Drop for IdleGuard<'_> {
    fn drop(&mut self) {
        lock(self.session).state = OrchestratorState::Idle;
    }
}

pub struct ChatOrchestrator {
    backend: Arc<dyn ChatBackend>,
    interpreter: AppointmentInterpreter,
    connectivity: ConnectivityMonitor,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    limits: ContextLimits,
    session: Mutex<Session>,
}

impl ChatOrchestrator {
    pub fn new(
        backend: Arc<dyn ChatBackend>,
        interpreter: AppointmentInterpreter,
        connectivity: ConnectivityMonitor,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
        limits: ContextLimits,
    ) -> Self {
        Self {
            backend,
            interpreter,
            connectivity,
            notifier,
            clock,
            limits,
            session: Mutex::new(Session {
                state: OrchestratorState::Idle,
                record: None,
                conversation: Conversation::new(),
                welcome_pending: false,
            }),
        }
    }

    pub fn state(&self) -> OrchestratorState {
        lock(&self.session).state
    }

    /// Snapshot of the turns, in order.
    pub fn conversation(&self) -> Vec<ChatTurn> {
        lock(&self.session).conversation.turns().to_vec()
    }

    pub fn epoch(&self) -> Epoch {
        lock(&self.session).conversation.epoch()
    }

    pub fn active_consultation(&self) -> Option<Consultation> {
        lock(&self.session).record.as_ref().map(|r| r.active.clone())
    }

    /// Switch to another consultation. Selecting the current one again
    /// changes nothing.
    pub fn select_consultation(&self, record: PatientRecord) {
        let mut session = lock(&self.session);
        if session.record.as_ref().map(|r| r.active.id) == Some(record.active.id) {
            return;
        }
        tracing::info!(
            consultation_id = record.active.id,
            patient_id = record.active.patient_id,
            "Consultation selected"
        );
        session.record = Some(record);
        session.conversation.reset();
        session.welcome_pending = true;
    }

    /// Clear the conversation. Replies still in flight will be dropped.
    pub fn reset_conversation(&self) {
        let mut session = lock(&self.session);
        session.conversation.reset();
        tracing::debug!(epoch = session.conversation.epoch().value(), "Conversation reset");
    }

    /// Handle one message typed by the doctor.
    pub async fn submit(&self, text: &str) -> Result<TurnOutcome, AssistantError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(AssistantError::EmptyMessage);
        }

        let (active, epoch) = {
            let mut session = lock(&self.session);
            let Some(record) = session.record.as_ref() else {
                return Err(AssistantError::NoActiveConsultation);
            };
            let active = record.active.clone();
            if session.state != OrchestratorState::Idle {
                return Err(AssistantError::Busy);
            }
            session.state = OrchestratorState::InterpretingCommand;
            (active, session.conversation.epoch())
        };
        let _idle = IdleGuard {
            session: &self.session,
        };

        if let Some(intent) = self.interpreter.try_interpret(text, &active).await {
            return Ok(self.confirm_appointment(intent, epoch));
        }

        self.set_state(OrchestratorState::Analyzing);
        let analysis = symptoms::analyze(text);
        let now = self.clock.now();
        let user_turn = ChatTurn::user(text, now, annotation(&analysis, BTreeSet::new()));

        self.set_state(OrchestratorState::AssemblingContext);
        let (user_turn_id, context) = {
            let mut session = lock(&self.session);
            if session.conversation.epoch() != epoch {
                tracing::debug!("Conversation changed during command check, message dropped");
                return Ok(TurnOutcome::Discarded);
            }
            let Some(record) = session.record.as_ref() else {
                return Err(AssistantError::NoActiveConsultation);
            };
            let context = build_context(
                &record.active,
                &record.consultations,
                &record.summaries,
                session.conversation.turns(),
                &self.limits,
            );
            (session.conversation.push(user_turn), context)
        };

        self.set_state(OrchestratorState::Dispatching);
        let mode = self.connectivity.mode();
        let reply = match mode {
            ConnectionMode::Online => {
                let request = ConsultationChatRequest {
                    consultation_id: active.id,
                    message: text.to_string(),
                    message_history: context.message_history(now),
                };
                self.backend.consultation_chat(&request).await
            }
            ConnectionMode::Offline => {
                let consultation_analysis = symptoms::analyze(&active.clinical_text());
                let input = OfflineInput {
                    consultation: &active,
                    analysis: &consultation_analysis,
                    prior_consultations: &context.prior_consultations,
                };
                let (intent, reply) = offline::respond(text, &input);
                tracing::debug!(?intent, "Offline reply generated");
                Ok(reply)
            }
        };

        let mut session = lock(&self.session);
        if session.conversation.epoch() != epoch {
            tracing::debug!(
                consultation_id = active.id,
                "Reply arrived after conversation reset, discarded"
            );
            return Ok(TurnOutcome::Discarded);
        }

        match reply {
            Ok(reply) => {
                session.conversation.set_delivery(user_turn_id, Delivery::Answered);
                let actions = symptoms::suggested_actions(&analysis);
                let turn = ChatTurn::assistant(reply, self.clock.now(), annotation(&analysis, actions));
                let turn_id = session.conversation.push(turn);
                tracing::info!(
                    consultation_id = active.id,
                    mode = %mode,
                    priority = %analysis.priority,
                    "Assistant turn appended"
                );
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
                tracing::warn!(consultation_id = active.id, error = %e, "Assistant dispatch failed");
                self.notifier.notify(Notification::new(
                    NotificationLevel::Error,
                    NotificationKind::DispatchFailed,
                    format!("L'assistant n'a pas pu répondre : {e}"),
                ));
                Err(e.into())
            }
        }
    }

    /// Greet the doctor once after a consultation is selected.
    ///
    /// `Ok(None)` when there is nothing to do: already greeted, or the
    /// conversation already has turns.
    pub async fn welcome(&self) -> Result<Option<Uuid>, AssistantError> {
        let (record, epoch) = {
            let mut session = lock(&self.session);
            if !session.welcome_pending || !session.conversation.is_empty() {
                return Ok(None);
            }
            let Some(record) = session.record.clone() else {
                return Err(AssistantError::NoActiveConsultation);
            };
            if session.state != OrchestratorState::Idle {
                return Err(AssistantError::Busy);
            }
            session.welcome_pending = false;
            session.state = OrchestratorState::Dispatching;
            (record, session.conversation.epoch())
        };
        let _idle = IdleGuard {
            session: &self.session,
        };

        let active = &record.active;
        let consultation_analysis = symptoms::analyze(&active.clinical_text());
        let now = self.clock.now();

        let reply = match self.connectivity.mode() {
            ConnectionMode::Online => {
                let context = build_context(
                    active,
                    &record.consultations,
                    &record.summaries,
                    &[],
                    &self.limits,
                );
                let request = ConsultationChatRequest {
                    consultation_id: active.id,
                    message: welcome_prompt(active),
                    message_history: context.message_history(now),
                };
                self.backend.consultation_chat(&request).await
            }
            ConnectionMode::Offline => {
                let prior: Vec<Consultation> = record
                    .consultations
                    .iter()
                    .filter(|c| c.patient_id == active.patient_id && c.id != active.id)
                    .cloned()
                    .collect();
                Ok(offline::welcome(&OfflineInput {
                    consultation: active,
                    analysis: &consultation_analysis,
                    prior_consultations: &prior,
                }))
            }
        };

        let mut session = lock(&self.session);
        if session.conversation.epoch() != epoch {
            tracing::debug!(consultation_id = active.id, "Welcome arrived after reset, discarded");
            return Ok(None);
        }

        match reply {
            Ok(text) => {
                let turn = ChatTurn::assistant(
                    text,
                    self.clock.now(),
                    annotation(&consultation_analysis, BTreeSet::new()),
                );
                Ok(Some(session.conversation.push(turn)))
            }
            Err(e) => {
                drop(session);
                tracing::warn!(consultation_id = active.id, error = %e, "Welcome dispatch failed");
                self.notifier.notify(Notification::new(
                    NotificationLevel::Error,
                    NotificationKind::DispatchFailed,
                    format!("Message d'accueil indisponible : {e}"),
                ));
                Err(e.into())
            }
        }
    }

    fn set_state(&self, state: OrchestratorState) {
        lock(&self.session).state = state;
    }

    fn confirm_appointment(&self, intent: AppointmentIntent, epoch: Epoch) -> TurnOutcome {
        let text = format!(
            "✅ Rendez-vous planifié le {} à {}, motif : {}.",
            intent.iso_date.format("%d/%m/%Y"),
            intent.time,
            intent.reason
        );
        {
            let mut session = lock(&self.session);
            if session.conversation.epoch() == epoch {
                session
                    .conversation
                    .push(ChatTurn::assistant(text.clone(), self.clock.now(), None));
            }
        }
        self.notifier.notify(Notification::new(
            NotificationLevel::Success,
            NotificationKind::AppointmentCreated,
            text,
        ));
        TurnOutcome::AppointmentScheduled(intent)
    }
}

fn annotation(
    analysis: &AnalysisResult,
    actions: BTreeSet<SuggestedAction>,
) -> Option<MedicalContext> {
    (!analysis.is_empty()).then(|| analysis.medical_context(actions))
}

fn welcome_prompt(active: &Consultation) -> String {
    format!(
        "Présente-toi en une phrase puis résume les points clés de la consultation de {} \
         du {} (motif : {}) en t'appuyant sur le dossier fourni.",
        active.patient_label(),
        active.date.format("%d/%m/%Y"),
        active.reason
    )
}

// ═══════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════
