//! Scripted transport for exercising the pipeline without a network.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use super::transport::{ApiRequest, ApiResponse, Transport, TransportError};

type Reply = Result<ApiResponse, TransportError>;

#[derive(Default)]
struct Script {
    /// One-shot replies, consumed before the standing reply
    queued: HashMap<String, VecDeque<Reply>>,
    standing: HashMap<String, Reply>,
    delays: HashMap<String, Duration>,
    sent: Vec<ApiRequest>,
}

/// Transport that answers from a per-path script and records every request
/// it receives. Paths with no script fail as if the network were down.
#[derive(Default)]
pub struct ScriptedTransport {
    script: Mutex<Script>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn script(&self) -> std::sync::MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Answer every call to `path` with `status` and `body`
    pub fn respond(&self, path: &str, status: u16, body: &str) {
        self.script()
            .standing
            .insert(path.to_string(), Ok(ApiResponse::new(status, body)));
    }

    /// Answer the next call to `path` only
    pub fn respond_once(&self, path: &str, status: u16, body: &str) {
        self.script()
            .queued
            .entry(path.to_string())
            .or_default()
            .push_back(Ok(ApiResponse::new(status, body)));
    }

    /// Fail every call to `path` without a response
    pub fn fail(&self, path: &str, error: TransportError) {
        self.script().standing.insert(path.to_string(), Err(error));
    }

    /// Hold calls to `path` for `delay` before answering
    pub fn delay(&self, path: &str, delay: Duration) {
        self.script().delays.insert(path.to_string(), delay);
    }

    /// Drop every scripted reply so all paths fail
    pub fn go_offline(&self) {
        let mut script = self.script();
        script.queued.clear();
        script.standing.clear();
    }

    pub fn sent(&self) -> Vec<ApiRequest> {
        self.script().sent.clone()
    }

    pub fn hits(&self, path: &str) -> usize {
        self.script().sent.iter().filter(|r| r.path == path).count()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, TransportError> {
        let delay = {
            let mut script = self.script();
            script.sent.push(request.clone());
            script.delays.get(&request.path).copied()
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut script = self.script();
        if let Some(reply) = script
            .queued
            .get_mut(&request.path)
            .and_then(VecDeque::pop_front)
        {
            return reply;
        }
        script
            .standing
            .get(&request.path)
            .cloned()
            .unwrap_or_else(|| Err(TransportError::Connect(format!("no route to {}", request.path))))
    }
}
