//! Shared test helpers: scripted backend and gateway.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use ultron::error::{BackendError, GatewayError};
use ultron::gateway::{AgentGateway, CommandBatch};
use ultron::provider::ChatBackend;
use ultron::types::Message;

/// A transport-class error without touching the network.
pub fn transport_error() -> BackendError {
    let err = reqwest::Client::new()
        .get("http://[::1")
        .build()
        .unwrap_err();
    BackendError::Transport(err)
}

/// Base URL of a local port with nothing listening on it.
pub fn closed_port_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

/// A backend that replays queued replies and records every request.
pub struct MockBackend {
    replies: Mutex<VecDeque<Result<String, BackendError>>>,
    requests: Mutex<Vec<Vec<Message>>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue a successful reply with this content.
    pub fn queue_reply(&self, text: &str) {
        self.replies.lock().unwrap().push_back(Ok(text.to_string()));
    }

    pub fn queue_error(&self, error: BackendError) {
        self.replies.lock().unwrap().push_back(Err(error));
    }

    pub fn requests(&self) -> Vec<Vec<Message>> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatBackend for MockBackend {
    fn backend_name(&self) -> &str {
        "mock"
    }

    fn model_id(&self) -> &str {
        "mock-model"
    }

    /// Falls back to a completion reply once the queue is drained.
    async fn complete(&self, conversation: &[Message]) -> Result<Message, BackendError> {
        self.requests.lock().unwrap().push(conversation.to_vec());
        match self.replies.lock().unwrap().pop_front() {
            Some(Ok(text)) => Ok(Message::assistant(text)),
            Some(Err(e)) => Err(e),
            None => Ok(Message::assistant("Task complete.")),
        }
    }
}

/// A gateway that replays queued states and submission results.
pub struct MockGateway {
    states: Mutex<VecDeque<Result<String, GatewayError>>>,
    submit_results: Mutex<VecDeque<Result<(), GatewayError>>>,
    submitted: Mutex<Vec<CommandBatch>>,
    fetch_times: Mutex<Vec<Instant>>,
    cancel_on_submit: Mutex<Option<CancellationToken>>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self {
            states: Mutex::new(VecDeque::new()),
            submit_results: Mutex::new(VecDeque::new()),
            submitted: Mutex::new(Vec::new()),
            fetch_times: Mutex::new(Vec::new()),
            cancel_on_submit: Mutex::new(None),
        }
    }

    /// Cancel `token` while a batch is being delivered, as Ctrl-C would.
    pub fn cancel_on_submit(&self, token: CancellationToken) {
        *self.cancel_on_submit.lock().unwrap() = Some(token);
    }

    pub fn queue_state(&self, state: &str) {
        self.states.lock().unwrap().push_back(Ok(state.to_string()));
    }

    pub fn queue_fetch_error(&self, error: GatewayError) {
        self.states.lock().unwrap().push_back(Err(error));
    }

    pub fn queue_submit_error(&self, error: GatewayError) {
        self.submit_results.lock().unwrap().push_back(Err(error));
    }

    pub fn submitted(&self) -> Vec<CommandBatch> {
        self.submitted.lock().unwrap().clone()
    }

    pub fn fetch_times(&self) -> Vec<Instant> {
        self.fetch_times.lock().unwrap().clone()
    }
}

#[async_trait]
impl AgentGateway for MockGateway {
    async fn fetch_state(&self) -> Result<String, GatewayError> {
        self.fetch_times.lock().unwrap().push(Instant::now());
        self.states
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok("idle".to_string()))
    }

    async fn submit(&self, batch: &CommandBatch) -> Result<(), GatewayError> {
        batch.to_json()?;
        self.submitted.lock().unwrap().push(batch.clone());
        let cancel = self.cancel_on_submit.lock().unwrap().take();
        if let Some(token) = cancel {
            token.cancel();
            tokio::task::yield_now().await;
        }
        self.submit_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(()))
    }
}

/// In-memory log sink shared with a thread-local subscriber.
#[derive(Clone, Default)]
pub struct CapturedLogs(std::sync::Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl std::io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Route this thread's tracing output into a buffer until the guard drops.
pub fn capture_logs() -> (CapturedLogs, tracing::subscriber::DefaultGuard) {
    let logs = CapturedLogs::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_ansi(false)
        .with_max_level(tracing::Level::DEBUG)
        .with_writer(move || writer.clone())
        .finish();
    let guard = tracing::subscriber::set_default(subscriber);
    (logs, guard)
}
