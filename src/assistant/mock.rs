//! In-memory collaborators for tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;

use super::backend::{
    AppointmentService, ChatBackend, ConsultationChatRequest, GeneralChatRequest, HealthProbe,
};
use super::client::BackendError;
use super::notify::{Notification, NotificationKind, Notifier};
use crate::models::AppointmentRequest;

/// Chat backend answering from a script, then with a fixed reply.
///
/// With a gate, every call waits for one `Notify` permit before answering.
pub struct MockChatBackend {
    script: Mutex<VecDeque<Result<String, BackendError>>>,
    fallback: String,
    gate: Option<Arc<Notify>>,
    pub consultation_requests: Mutex<Vec<ConsultationChatRequest>>,
    pub general_requests: Mutex<Vec<GeneralChatRequest>>,
}

impl MockChatBackend {
    pub fn replying(text: &str) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback: text.to_string(),
            gate: None,
            consultation_requests: Mutex::new(Vec::new()),
            general_requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        let backend = Self::replying("unused");
        backend.push(Err(BackendError::Status {
            status: 500,
            body: "boom".into(),
        }));
        backend
    }

    pub fn gated(text: &str, gate: Arc<Notify>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::replying(text)
        }
    }

    pub fn push(&self, reply: Result<String, BackendError>) {
        self.script.lock().unwrap().push_back(reply);
    }

    pub fn calls(&self) -> usize {
        self.consultation_requests.lock().unwrap().len() + self.general_requests.lock().unwrap().len()
    }

    async fn answer(&self) -> Result<String, BackendError> {
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(self.fallback.clone()))
    }
}

#[async_trait]
impl ChatBackend for MockChatBackend {
    async fn consultation_chat(
        &self,
        request: &ConsultationChatRequest,
    ) -> Result<String, BackendError> {
        self.consultation_requests.lock().unwrap().push(request.clone());
        self.answer().await
    }

    async fn general_chat(&self, request: &GeneralChatRequest) -> Result<String, BackendError> {
        self.general_requests.lock().unwrap().push(request.clone());
        self.answer().await
    }
}

#[derive(Default)]
pub struct MockAppointments {
    fail: bool,
    pub requests: Mutex<Vec<AppointmentRequest>>,
}

impl MockAppointments {
    pub fn ok() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl AppointmentService for MockAppointments {
    async fn create_appointment(
        &self,
        request: &AppointmentRequest,
    ) -> Result<serde_json::Value, BackendError> {
        self.requests.lock().unwrap().push(request.clone());
        if self.fail {
            return Err(BackendError::Connection("mock".into()));
        }
        Ok(serde_json::json!({ "id": 1, "date": request.date, "time": request.time }))
    }
}

/// Probe returning scripted outcomes, then `fallback`.
pub struct MockProbe {
    script: Mutex<VecDeque<bool>>,
    fallback: bool,
    calls: AtomicUsize,
}

impl MockProbe {
    pub fn always(healthy: bool) -> Self {
        Self::scripted(&[], healthy)
    }

    pub fn scripted(outcomes: &[bool], fallback: bool) -> Self {
        Self {
            script: Mutex::new(outcomes.iter().copied().collect()),
            fallback,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HealthProbe for MockProbe {
    async fn probe(&self) -> Result<(), BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let healthy = self.script.lock().unwrap().pop_front().unwrap_or(self.fallback);
        if healthy {
            Ok(())
        } else {
            Err(BackendError::Connection("mock".into()))
        }
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn kinds(&self) -> Vec<NotificationKind> {
        self.sent.lock().unwrap().iter().map(|n| n.kind).collect()
    }

    pub fn count(&self, kind: NotificationKind) -> usize {
        self.kinds().into_iter().filter(|k| *k == kind).count()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: Notification) {
        self.sent.lock().unwrap().push(notification);
    }
}
