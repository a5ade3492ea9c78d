//! Online/offline mode and the periodic backend health probe.
//!
//! A successful probe always forces online mode. A failed probe never
//! switches to offline on its own: it raises a one-time dismissible prompt,
//! re-armed only by the next successful probe. Manual toggles and probe
//! results both write the same state; last writer wins.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::NaiveDateTime;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::backend::HealthProbe;
use super::clock::Clock;
use super::notify::{Notification, NotificationKind, NotificationLevel, Notifier};
use super::{lock, AssistantError};
use crate::models::ConnectionMode;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectivityState {
    pub mode: ConnectionMode,
    pub last_probe_at: Option<NaiveDateTime>,
    pub last_probe_ok: Option<bool>,
    pub offline_prompt_visible: bool,
    prompt_armed: bool,
}

impl Default for ConnectivityState {
    fn default() -> Self {
        Self {
            mode: ConnectionMode::Online,
            last_probe_at: None,
            last_probe_ok: None,
            offline_prompt_visible: false,
            prompt_armed: true,
        }
    }
}

/// What a probe result changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeEffect {
    Unchanged,
    BackOnline,
    OfflineSuggested,
}

/// Shared connectivity state plus the collaborators needed to refresh it.
/// Cheap to clone; clones share state.
#[derive(Clone)]
pub struct ConnectivityMonitor {
    state: Arc<Mutex<ConnectivityState>>,
    probe: Arc<dyn HealthProbe>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
}

impl ConnectivityMonitor {
    pub fn new(
        probe: Arc<dyn HealthProbe>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            state: Arc::new(Mutex::new(ConnectivityState::default())),
            probe,
            notifier,
            clock,
        }
    }

    pub fn mode(&self) -> ConnectionMode {
        lock(&self.state).mode
    }

    pub fn snapshot(&self) -> ConnectivityState {
        lock(&self.state).clone()
    }

    /// Apply one probe outcome.
    pub fn record_probe(&self, healthy: bool) -> ProbeEffect {
        let now = self.clock.now();
        let effect = {
            let mut state = lock(&self.state);
            state.last_probe_at = Some(now);
            state.last_probe_ok = Some(healthy);

            if healthy {
                let was_offline = state.mode == ConnectionMode::Offline;
                state.mode = ConnectionMode::Online;
                state.offline_prompt_visible = false;
                state.prompt_armed = true;
                if was_offline {
                    ProbeEffect::BackOnline
                } else {
                    ProbeEffect::Unchanged
                }
            } else if state.mode == ConnectionMode::Online && state.prompt_armed {
                state.offline_prompt_visible = true;
                state.prompt_armed = false;
                ProbeEffect::OfflineSuggested
            } else {
                ProbeEffect::Unchanged
            }
        };

        match effect {
            ProbeEffect::BackOnline => {
                tracing::info!("Assistant backend reachable, switching to online mode");
                self.notifier.notify(Notification::new(
                    NotificationLevel::Success,
                    NotificationKind::ModeChanged,
                    "Connexion rétablie : mode en ligne.",
                ));
            }
            ProbeEffect::OfflineSuggested => {
                tracing::warn!("Assistant backend unreachable, suggesting offline mode");
                self.notifier.notify(Notification::new(
                    NotificationLevel::Warning,
                    NotificationKind::OfflineSuggested,
                    "Assistant distant injoignable. Passer en mode hors ligne ?",
                ));
            }
            ProbeEffect::Unchanged => {}
        }
        effect
    }

    /// Run the health probe once and record the outcome.
    pub async fn probe_once(&self) -> bool {
        let healthy = match self.probe.probe().await {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!(error = %e, "Health probe failed");
                false
            }
        };
        self.record_probe(healthy);
        healthy
    }

    pub fn dismiss_prompt(&self) {
        lock(&self.state).offline_prompt_visible = false;
    }

    pub fn switch_offline(&self) {
        {
            let mut state = lock(&self.state);
            state.mode = ConnectionMode::Offline;
            state.offline_prompt_visible = false;
        }
        tracing::info!("Switched to offline mode");
        self.notifier.notify(Notification::new(
            NotificationLevel::Info,
            NotificationKind::ModeChanged,
            "Mode hors ligne activé.",
        ));
    }

    /// Go online only if the backend answers a probe right now.
    pub async fn switch_online(&self) -> Result<(), AssistantError> {
        match self.probe.probe().await {
            Ok(()) => {
                self.record_probe(true);
                Ok(())
            }
            Err(e) => {
                self.record_probe(false);
                tracing::warn!(error = %e, "Refusing switch to online mode");
                self.notifier.notify(Notification::new(
                    NotificationLevel::Warning,
                    NotificationKind::ModeSwitchRefused,
                    format!("Impossible de passer en ligne : {e}"),
                ));
                Err(AssistantError::BackendUnreachable(e.to_string()))
            }
        }
    }

    /// Spawn the periodic probe. First probe runs immediately.
    pub fn start(&self, interval: Duration) -> MonitorHandle {
        let (shutdown, mut stopped) = watch::channel(false);
        let monitor = self.clone();

        let task = tokio::spawn(async move {
            tracing::info!(interval_secs = interval.as_secs(), "Connectivity monitor started");
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        monitor.probe_once().await;
                    }
                    _ = stopped.changed() => break,
                }
            }
            tracing::info!("Connectivity monitor stopped");
        });

        MonitorHandle {
            shutdown,
            task: Some(task),
        }
    }
}

/// Handle on the probe task. Dropping it cancels the task.
pub struct MonitorHandle {
    shutdown: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl MonitorHandle {
    /// No probe starts after this returns control to the runtime.
    pub fn stop(&self) {
        let _ = self.shutdown.send(true);
    }

    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map_or(true, |t| t.is_finished())
    }
}

impl Drop for MonitorHandle {
    fn drop(&mut self) {
        self.stop();
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
