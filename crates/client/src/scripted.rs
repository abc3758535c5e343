//! In-memory transport with scripted replies.
//!
//! Replies are queued per endpoint and consumed in order. When an endpoint's
//! queue is empty the fallback reply (if any) is served, otherwise the call
//! fails as a transport error. Every call is recorded, including ones that
//! stall.

use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use crate::error::TransportError;
use crate::protocol::Endpoint;
use crate::transport::{HttpReply, Transport};

#[derive(Debug, Clone)]
pub enum ScriptedReply {
    /// Status and JSON body.
    Json(u16, Value),
    /// Status and raw body text.
    Raw(u16, String),
    /// Transport-level failure.
    Fail(String),
    /// Never completes.
    Stall,
}

impl ScriptedReply {
    pub fn ok(body: Value) -> Self {
        ScriptedReply::Json(200, body)
    }

    pub fn status(status: u16, body: Value) -> Self {
        ScriptedReply::Json(status, body)
    }

    pub fn fail(msg: &str) -> Self {
        ScriptedReply::Fail(msg.to_string())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub endpoint: Endpoint,
    pub body: Option<Value>,
}

#[derive(Debug, Default)]
struct Script {
    queues: HashMap<Endpoint, VecDeque<ScriptedReply>>,
    fallback: HashMap<Endpoint, ScriptedReply>,
    calls: Vec<RecordedCall>,
}

#[derive(Debug, Default)]
pub struct ScriptedTransport {
    script: Mutex<Script>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a reply for `endpoint`.
    pub fn push(&self, endpoint: Endpoint, reply: ScriptedReply) {
        self.script
            .lock()
            .queues
            .entry(endpoint)
            .or_default()
            .push_back(reply);
    }

    /// Reply served once the queue for `endpoint` runs dry.
    pub fn set_fallback(&self, endpoint: Endpoint, reply: ScriptedReply) {
        self.script.lock().fallback.insert(endpoint, reply);
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.script.lock().calls.clone()
    }

    pub fn call_count(&self) -> usize {
        self.script.lock().calls.len()
    }

    pub fn calls_to(&self, endpoint: Endpoint) -> usize {
        self.script
            .lock()
            .calls
            .iter()
            .filter(|c| c.endpoint == endpoint)
            .count()
    }

    fn next(&self, path: &str, body: Option<Value>) -> Result<ScriptedReply, TransportError> {
        let endpoint = Endpoint::from_path(path)
            .ok_or_else(|| TransportError(format!("unknown path {path}")))?;
        let mut script = self.script.lock();
        script.calls.push(RecordedCall { endpoint, body });
        let queued = script.queues.get_mut(&endpoint).and_then(|q| q.pop_front());
        queued
            .or_else(|| script.fallback.get(&endpoint).cloned())
            .ok_or_else(|| TransportError(format!("no scripted reply for {path}")))
    }

    async fn serve(&self, path: &str, body: Option<Value>) -> Result<HttpReply, TransportError> {
        match self.next(path, body)? {
            ScriptedReply::Json(status, body) => Ok(HttpReply {
                status,
                body: body.to_string(),
            }),
            ScriptedReply::Raw(status, body) => Ok(HttpReply { status, body }),
            ScriptedReply::Fail(msg) => Err(TransportError(msg)),
            ScriptedReply::Stall => std::future::pending().await,
        }
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn get(&self, path: &str) -> Result<HttpReply, TransportError> {
        self.serve(path, None).await
    }

    async fn post(&self, path: &str, body: Value) -> Result<HttpReply, TransportError> {
        self.serve(path, Some(body)).await
    }
}
