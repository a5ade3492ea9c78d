//! Line-oriented console host.
//!
//! Loads one patient record, greets, then reads messages from stdin. Lines
//! starting with `/` are host commands; everything else goes to the
//! consultation assistant.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};
use uuid::Uuid;

use crate::assistant::appointment_command::AppointmentInterpreter;
use crate::assistant::client::{BackendError, HttpBackend};
use crate::assistant::clock::{Clock, SystemClock};
use crate::assistant::connectivity::ConnectivityMonitor;
use crate::assistant::general::GeneralAssistant;
use crate::assistant::notify::{Notifier, TracingNotifier};
use crate::assistant::orchestrator::ChatOrchestrator;
use crate::config::{AssistantConfig, ConfigError};
use crate::models::{ChatTurn, Delivery, MessageRole, PatientRecord};

#[derive(Error, Debug)]
pub enum ConsoleError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Cannot read patient record {path}: {source}")]
    RecordIo {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid patient record {path}: {source}")]
    RecordParse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("Console I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Offline,
    Online,
    Reset,
    Dismiss,
    Quit,
    /// Question for the floating assistant.
    Ask(String),
    Message(String),
}

impl ConsoleCommand {
    /// `None` for blank lines and unknown commands.
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        let Some(command) = line.strip_prefix('/') else {
            return Some(Self::Message(line.to_string()));
        };
        let (name, rest) = command
            .split_once(char::is_whitespace)
            .map(|(n, r)| (n, r.trim()))
            .unwrap_or((command, ""));
        match name {
            "offline" => Some(Self::Offline),
            "online" => Some(Self::Online),
            "reset" => Some(Self::Reset),
            "dismiss" => Some(Self::Dismiss),
            "quit" | "exit" => Some(Self::Quit),
            "ask" if !rest.is_empty() => Some(Self::Ask(rest.to_string())),
            _ => None,
        }
    }
}

pub fn load_record(path: &Path) -> Result<PatientRecord, ConsoleError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ConsoleError::RecordIo {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| ConsoleError::RecordParse {
        path: path.to_path_buf(),
        source,
    })
}

/// One turn as printed on stdout.
pub fn render_turn(turn: &ChatTurn) -> String {
    let speaker = match turn.role {
        MessageRole::User => "vous",
        MessageRole::Assistant => "assistant",
    };
    let mut out = format!("[{} {speaker}] {}", turn.created_at.format("%H:%M"), turn.text);

    if let Some(ctx) = &turn.medical_context {
        out.push_str(&format!("\n    ↳ priorité {}", ctx.priority.label()));
        if !ctx.symptoms.is_empty() {
            out.push_str(&format!(" · symptômes : {}", ctx.symptoms.join(", ")));
        }
        if !ctx.suggested_actions.is_empty() {
            let actions: Vec<&str> = ctx.suggested_actions.iter().map(|a| a.as_str()).collect();
            out.push_str(&format!(" · actions : {}", actions.join(", ")));
        }
    }
    if let Delivery::Failed { reason } = &turn.delivery {
        out.push_str(&format!("\n    ✗ non envoyé : {reason}"));
    }
    out
}

/// Prints turns not printed yet. Starts over when the last printed turn is
/// gone (conversation reset).
#[derive(Default)]
struct TurnPrinter {
    last: Option<Uuid>,
}

impl TurnPrinter {
    fn pending<'a>(&self, turns: &'a [ChatTurn]) -> &'a [ChatTurn] {
        let start = self
            .last
            .and_then(|id| turns.iter().position(|t| t.id == id))
            .map_or(0, |i| i + 1);
        &turns[start..]
    }

    fn print_new(&mut self, turns: &[ChatTurn]) {
        for turn in self.pending(turns) {
            println!("{}", render_turn(turn));
        }
        if let Some(turn) = turns.last() {
            self.last = Some(turn.id);
        }
    }
}

pub async fn run(config: AssistantConfig, record_path: &Path) -> Result<(), ConsoleError> {
    let record = load_record(record_path)?;

    let http = Arc::new(HttpBackend::new(&config)?);
    let notifier: Arc<dyn Notifier> = Arc::new(TracingNotifier);
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let connectivity = ConnectivityMonitor::new(http.clone(), notifier.clone(), clock.clone());
    let monitor = connectivity.start(config.probe_interval());

    let orchestrator = ChatOrchestrator::new(
        http.clone(),
        AppointmentInterpreter::new(http.clone(), clock.clone()),
        connectivity.clone(),
        notifier.clone(),
        clock.clone(),
        config.context_limits(),
    );
    let general = GeneralAssistant::new(
        http.clone(),
        connectivity.clone(),
        notifier,
        clock,
        config.recent_turn_window,
    );

    tracing::info!(
        backend = http.base_url(),
        consultation_id = record.active.id,
        "Console session started"
    );
    orchestrator.select_consultation(record);

    let mut printer = TurnPrinter::default();
    let mut general_printer = TurnPrinter::default();
    if let Err(e) = orchestrator.welcome().await {
        tracing::warn!(error = %e, "No welcome message");
    }
    printer.print_new(&orchestrator.conversation());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let Some(command) = ConsoleCommand::parse(&line) else {
            continue;
        };
        match command {
            ConsoleCommand::Quit => break,
            ConsoleCommand::Offline => connectivity.switch_offline(),
            ConsoleCommand::Online => {
                if let Err(e) = connectivity.switch_online().await {
                    println!("{e}");
                }
            }
            ConsoleCommand::Dismiss => connectivity.dismiss_prompt(),
            ConsoleCommand::Reset => orchestrator.reset_conversation(),
            ConsoleCommand::Ask(question) => {
                if let Err(e) = general.submit(&question).await {
                    println!("{e}");
                }
                general_printer.print_new(&general.conversation());
            }
            ConsoleCommand::Message(text) => {
                if let Err(e) = orchestrator.submit(&text).await {
                    println!("{e}");
                }
            }
        }
        printer.print_new(&orchestrator.conversation());
    }

    monitor.stop();
    tracing::info!("Console session ended");
    Ok(())
}
