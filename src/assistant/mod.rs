//! Consultation assistant orchestration.
//!
//! Leaf-first:
//! - `symptoms`: local keyword triage (categories + priority)
//! - `datetime`: French natural-language date/time extraction
//! - `appointment_command`: "planifie un rendez-vous…" interpreter
//! - `context`: bounded context sent with every remote dispatch
//! - `offline`: template replies used when the backend is unreachable
//! - `connectivity`: online/offline state and the periodic health probe
//! - `orchestrator`: per-consultation chat state machine
//! - `general`: consultation-free floating assistant
//!
//! Remote collaborators are traits in `backend`; `client` implements them over HTTP.

pub mod appointment_command;
pub mod backend;
pub mod client;
pub mod clock;
pub mod connectivity;
pub mod context;
pub mod conversation;
pub mod datetime;
pub mod general;
pub mod notify;
pub mod offline;
pub mod orchestrator;
pub mod symptoms;

#[cfg(test)]
pub(crate) mod mock;

use std::sync::{Mutex, MutexGuard, PoisonError};

use thiserror::Error;

use client::BackendError;

#[derive(Error, Debug)]
pub enum AssistantError {
    #[error("Message is empty")]
    EmptyMessage,

    #[error("No consultation selected")]
    NoActiveConsultation,

    #[error("Assistant is busy with a previous message")]
    Busy,

    #[error("Assistant backend unreachable: {0}")]
    BackendUnreachable(String),

    #[error("Assistant backend error: {0}")]
    Backend(#[from] BackendError),
}

/// Lock a state mutex, recovering the data if a holder panicked.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
