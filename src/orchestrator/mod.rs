//! The control loop: poll the turtle, ask the model, act, repeat.
//!
//! One cycle walks `FetchingState → Inferring → Sanitizing →
//! CheckingCompletion → Submitting → Persisting`. Any failure logs, waits
//! the fixed backoff and starts over from `FetchingState`; only the
//! completion marker ends the loop.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::conversation::ConversationStore;
use crate::error::{ErrorCategory, GatewayError, StoreError};
use crate::gateway::{AgentGateway, CommandBatch};
use crate::provider::ChatBackend;
use crate::sanitize::{self, DEFAULT_COMPLETION_MARKER};
use crate::types::{Conversation, Message, Role};

/// Reference backoff after any failed step.
pub const DEFAULT_BACKOFF: Duration = Duration::from_secs(5);
/// Reference wait for the turtle to run a submitted batch.
pub const DEFAULT_SETTLE: Duration = Duration::from_secs(5);

/// Loop position, reported through [`StateSink`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum LoopState {
    Idle,
    FetchingState,
    Inferring,
    Sanitizing,
    CheckingCompletion,
    Submitting,
    Persisting,
    Done,
}

/// Callback invoked on every state transition.
pub type StateSink = Arc<dyn Fn(LoopState) + Send + Sync>;

/// Tunables for one run.
#[derive(Debug, Clone)]
pub struct LoopSettings {
    pub backoff: Duration,
    pub settle: Duration,
    pub completion_marker: String,
    pub history_path: PathBuf,
}

impl Default for LoopSettings {
    fn default() -> Self {
        Self {
            backoff: DEFAULT_BACKOFF,
            settle: DEFAULT_SETTLE,
            completion_marker: DEFAULT_COMPLETION_MARKER.to_string(),
            history_path: PathBuf::from("conversation_history.json"),
        }
    }
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The model reported completion; carries the final transcript.
    Completed { transcript: Conversation },
    /// A shutdown signal arrived first.
    Cancelled,
}

enum CycleOutcome {
    Submitted,
    Done,
    Failed,
    Cancelled,
}

/// Resume the saved conversation or seed a fresh one.
///
/// A missing file starts fresh silently; an unreadable one is logged and
/// also starts fresh. The initial task is only used for a fresh seed.
pub fn load_or_seed(path: &Path, system_prompt: &str, initial_task: Option<&str>) -> ConversationStore {
    match ConversationStore::restore(path) {
        Ok(store) if store.is_empty() => {}
        Ok(store) if store.first_role() != Some(Role::System) => {
            warn!(
                operation = "restore",
                path = %path.display(),
                first_role = ?store.first_role(),
                "saved conversation does not start with the system prompt; ignoring it"
            );
        }
        Ok(store) => {
            info!(path = %path.display(), messages = store.len(), "resuming saved conversation");
            return store;
        }
        Err(StoreError::NotFound(_)) => {}
        Err(e) => {
            warn!(operation = "restore", category = %e.category(), error = %e, "ignoring saved conversation");
        }
    }

    let mut store = ConversationStore::seeded(system_prompt);
    if let Some(task) = initial_task.map(str::trim).filter(|t| !t.is_empty()) {
        info!(task, "initial task loaded");
        store.append(Message::user(task));
    }
    info!("conversation initialized with system prompt");
    store
}

/// Drives one task from first poll to completion.
pub struct Orchestrator {
    backend: Arc<dyn ChatBackend>,
    gateway: Arc<dyn AgentGateway>,
    store: ConversationStore,
    settings: LoopSettings,
    operator_input: Option<mpsc::UnboundedReceiver<String>>,
    pending_input: Vec<String>,
    cancel: CancellationToken,
    state_sink: Option<StateSink>,
    state: LoopState,
}

impl Orchestrator {
    pub fn new(
        backend: Arc<dyn ChatBackend>,
        gateway: Arc<dyn AgentGateway>,
        store: ConversationStore,
        settings: LoopSettings,
    ) -> Self {
        Self {
            backend,
            gateway,
            store,
            settings,
            operator_input: None,
            pending_input: Vec::new(),
            cancel: CancellationToken::new(),
            state_sink: None,
            state: LoopState::Idle,
        }
    }

    /// Lines from an interactive front end, folded into the next user turn.
    pub fn with_operator_input(mut self, rx: mpsc::UnboundedReceiver<String>) -> Self {
        self.operator_input = Some(rx);
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn with_state_sink(mut self, sink: StateSink) -> Self {
        self.state_sink = Some(sink);
        self
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn conversation(&self) -> Conversation {
        self.store.snapshot()
    }

    /// Run until the model reports completion or the token is cancelled.
    ///
    /// Cancellation is honored while waiting on the turtle state, the model
    /// or a backoff/settle sleep. A batch handed to the turtle is always
    /// followed by persisting the exchange.
    pub async fn run(&mut self) -> RunOutcome {
        info!(
            backend = self.backend.backend_name(),
            model = self.backend.model_id(),
            messages = self.store.len(),
            "control loop starting"
        );
        let cancel = self.cancel.clone();

        loop {
            let wait = match self.run_cycle().await {
                CycleOutcome::Cancelled => return self.cancelled(),
                CycleOutcome::Done => return self.finish(),
                CycleOutcome::Submitted => self.settings.settle,
                CycleOutcome::Failed => self.settings.backoff,
            };

            tokio::select! {
                _ = cancel.cancelled() => return self.cancelled(),
                _ = tokio::time::sleep(wait) => {}
            }
        }
    }

    async fn run_cycle(&mut self) -> CycleOutcome {
        self.enter(LoopState::FetchingState);
        let fetched = tokio::select! {
            _ = self.cancel.cancelled() => return CycleOutcome::Cancelled,
            fetched = self.gateway.fetch_state() => fetched,
        };
        let turtle_state = match fetched {
            Ok(state) => state,
            Err(e) => return self.failed("fetch_state", e.category(), &e),
        };
        info!(state = %turtle_state, "turtle state retrieved");

        self.enter(LoopState::Inferring);
        self.drain_operator_input();
        let turn = Message::turtle_turn(&turtle_state, &self.pending_input.join("\n"));
        let mut request = self.store.snapshot();
        request.push(turn.clone());

        let completed = tokio::select! {
            _ = self.cancel.cancelled() => return CycleOutcome::Cancelled,
            completed = self.backend.complete(&request) => completed,
        };
        let reply = match completed {
            Ok(reply) => reply,
            Err(e) => return self.failed("complete", e.category(), &e),
        };
        self.pending_input.clear();

        self.enter(LoopState::Sanitizing);
        let payload = sanitize::extract(&reply.content);
        info!(response = %payload, "model response");
        self.store.append(turn);
        self.store.append(Message::assistant(payload.clone()));

        self.enter(LoopState::CheckingCompletion);
        if sanitize::is_task_complete(&payload, &self.settings.completion_marker) {
            return CycleOutcome::Done;
        }

        self.enter(LoopState::Submitting);
        let batch = CommandBatch::from_reply(&payload);
        if let Err(e) = self.gateway.submit(&batch).await {
            if let GatewayError::Validation(reason) = &e {
                warn!(reason = %reason, payload = %payload, "model produced an unsubmittable batch");
            }
            return self.failed("submit", e.category(), &e);
        }
        info!(commands = batch.commands().len(), "commands sent to turtle");

        self.enter(LoopState::Persisting);
        if let Err(e) = self.store.persist(&self.settings.history_path) {
            warn!(operation = "persist", category = %e.category(), error = %e, "conversation not saved; continuing");
        }

        CycleOutcome::Submitted
    }

    fn drain_operator_input(&mut self) {
        let Some(rx) = self.operator_input.as_mut() else {
            return;
        };
        while let Ok(line) = rx.try_recv() {
            let line = line.trim();
            if !line.is_empty() {
                debug!(input = line, "operator input queued");
                self.pending_input.push(line.to_string());
            }
        }
    }

    fn failed(
        &self,
        operation: &'static str,
        category: ErrorCategory,
        error: &dyn std::error::Error,
    ) -> CycleOutcome {
        warn!(
            operation,
            category = %category,
            error = %error,
            backoff_ms = self.settings.backoff.as_millis() as u64,
            "cycle failed; retrying from state fetch"
        );
        CycleOutcome::Failed
    }

    fn finish(&mut self) -> RunOutcome {
        self.enter(LoopState::Done);
        info!("task completed successfully");
        if let Err(e) = ConversationStore::clear(&self.settings.history_path) {
            warn!(operation = "clear", category = %e.category(), error = %e, "failed to clear conversation history");
        }
        let transcript = std::mem::take(&mut self.store).snapshot();
        RunOutcome::Completed { transcript }
    }

    fn cancelled(&self) -> RunOutcome {
        info!(state = %self.state, "control loop cancelled");
        RunOutcome::Cancelled
    }

    fn enter(&mut self, state: LoopState) {
        self.state = state;
        debug!(state = %state, "loop state");
        if let Some(sink) = &self.state_sink {
            sink(state);
        }
    }
}
