//! The single gateway to the game server.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, warn};

use crate::circuit::{CircuitBreaker, CircuitSnapshot};
use crate::error::{ClientError, ClientResult};
use crate::protocol::{error_message, parse_state, ActionRequest, Endpoint, StateResponse};
use crate::transport::{HttpTransport, Transport};
use crate::types::{CIRCUIT_COOLDOWN_MS, FAILURE_THRESHOLD, REQUEST_TIMEOUT_MS};

/// Client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub request_timeout: Duration,
    pub failure_threshold: u32,
    pub circuit_cooldown: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5000".to_string(),
            request_timeout: Duration::from_millis(REQUEST_TIMEOUT_MS),
            failure_threshold: FAILURE_THRESHOLD,
            circuit_cooldown: Duration::from_millis(CIRCUIT_COOLDOWN_MS),
        }
    }
}

impl ClientConfig {
    /// Create from environment variables
    pub fn from_env() -> Self {
        use std::env;

        let defaults = Self::default();

        let base_url = env::var("COLOUR_BALLS_SERVER_URL")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or(defaults.base_url);

        let request_timeout = env::var("COLOUR_BALLS_REQUEST_TIMEOUT_MS")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_millis)
            .unwrap_or(defaults.request_timeout);

        let failure_threshold = env::var("COLOUR_BALLS_FAILURE_THRESHOLD")
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
            .map(|n| n.max(1))
            .unwrap_or(defaults.failure_threshold);

        let circuit_cooldown = env::var("COLOUR_BALLS_CIRCUIT_COOLDOWN_MS")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_millis)
            .unwrap_or(defaults.circuit_cooldown);

        Self {
            base_url,
            request_timeout,
            failure_threshold,
            circuit_cooldown,
        }
    }
}

/// Wraps every request with a timeout and the failure circuit.
///
/// Each operation performs at most one network call and classifies it as
/// success, [`ClientError::Timeout`], [`ClientError::Transport`] or
/// [`ClientError::Http`]. Only `submit_action` consults the circuit before
/// sending.
#[derive(Clone)]
pub struct RemoteGameClient {
    transport: Arc<dyn Transport>,
    circuit: Arc<CircuitBreaker>,
    request_timeout: Duration,
}

impl RemoteGameClient {
    pub fn new(transport: Arc<dyn Transport>, config: &ClientConfig) -> Self {
        Self {
            transport,
            circuit: Arc::new(CircuitBreaker::new(
                config.failure_threshold,
                config.circuit_cooldown,
            )),
            request_timeout: config.request_timeout,
        }
    }

    /// Client over the real HTTP transport.
    pub fn http(config: &ClientConfig) -> Self {
        Self::new(Arc::new(HttpTransport::new(config.base_url.clone())), config)
    }

    pub fn circuit(&self) -> &Arc<CircuitBreaker> {
        &self.circuit
    }

    pub fn circuit_snapshot(&self) -> CircuitSnapshot {
        self.circuit.snapshot()
    }

    pub async fn fetch_state(&self) -> ClientResult<StateResponse> {
        self.exchange(Endpoint::State, None).await
    }

    /// Send an action. Non allow-listed kinds short-circuit with
    /// [`ClientError::CircuitOpen`] while the circuit is open.
    pub async fn submit_action(&self, request: &ActionRequest) -> ClientResult<StateResponse> {
        if !self.circuit.allows(request.kind) {
            debug!(kind = %request.kind, "circuit open; action served locally");
            return Err(ClientError::CircuitOpen);
        }
        let body = serde_json::to_value(request.to_body())
            .map_err(|e| ClientError::Transport(e.to_string()))?;
        self.exchange(Endpoint::Action, Some(body)).await
    }

    pub async fn submit_clear_matches(&self) -> ClientResult<StateResponse> {
        self.exchange(Endpoint::ClearMatches, Some(Value::Object(Default::default())))
            .await
    }

    pub async fn reset_game(&self) -> ClientResult<StateResponse> {
        self.exchange(Endpoint::Reset, Some(Value::Object(Default::default())))
            .await
    }

    async fn exchange(&self, endpoint: Endpoint, body: Option<Value>) -> ClientResult<StateResponse> {
        let path = endpoint.path();
        let call = async {
            match body {
                Some(body) => self.transport.post(path, body).await,
                None => self.transport.get(path).await,
            }
        };

        let outcome = match tokio::time::timeout(self.request_timeout, call).await {
            Err(_) => Err(ClientError::Timeout(self.request_timeout)),
            Ok(Err(e)) => Err(ClientError::from(e)),
            Ok(Ok(reply)) if !reply.is_success() => Err(ClientError::Http {
                status: reply.status,
                message: error_message(&reply.body),
            }),
            Ok(Ok(reply)) => parse_state(&reply.body)
                .map_err(|e| ClientError::Transport(format!("malformed reply: {e}"))),
        };

        match &outcome {
            Ok(_) => {
                debug!(path, "exchange ok");
                self.circuit.record_success();
            }
            Err(e) => {
                let open = self.circuit.record_failure();
                warn!(path, error = %e, circuit_open = open, "exchange failed");
            }
        }
        outcome
    }
}

impl std::fmt::Debug for RemoteGameClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteGameClient")
            .field("circuit", &self.circuit.snapshot())
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scripted::{ScriptedReply, ScriptedTransport};
    use crate::types::ActionKind;
    use serde_json::json;

    fn client(transport: &Arc<ScriptedTransport>) -> RemoteGameClient {
        RemoteGameClient::new(transport.clone(), &ClientConfig::default())
    }

    #[tokio::test(start_paused = true)]
    async fn classifies_each_failure_kind() {
        let t = Arc::new(ScriptedTransport::new());
        t.push(Endpoint::State, ScriptedReply::Stall);
        t.push(Endpoint::State, ScriptedReply::fail("connection refused"));
        t.push(
            Endpoint::State,
            ScriptedReply::status(500, json!({"error": "Game state not initialized"})),
        );
        t.push(Endpoint::State, ScriptedReply::Raw(200, "not json".into()));
        let c = client(&t);

        assert_eq!(
            c.fetch_state().await,
            Err(ClientError::Timeout(Duration::from_millis(REQUEST_TIMEOUT_MS)))
        );
        assert!(matches!(c.fetch_state().await, Err(ClientError::Transport(_))));
        assert_eq!(
            c.fetch_state().await,
            Err(ClientError::Http {
                status: 500,
                message: Some("Game state not initialized".into())
            })
        );
        assert!(matches!(c.fetch_state().await, Err(ClientError::Transport(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn open_circuit_short_circuits_without_network() {
        let t = Arc::new(ScriptedTransport::new());
        for _ in 0..3 {
            t.push(Endpoint::Action, ScriptedReply::fail("down"));
        }
        let c = client(&t);
        let req = ActionRequest::new(ActionKind::MoveLeft);
        for _ in 0..3 {
            assert!(c.submit_action(&req).await.is_err());
        }
        assert!(c.circuit().is_open());

        let before = t.call_count();
        assert_eq!(c.submit_action(&req).await, Err(ClientError::CircuitOpen));
        assert_eq!(t.call_count(), before);
    }

    #[tokio::test(start_paused = true)]
    async fn allow_listed_kinds_pass_open_circuit_and_success_closes_it() {
        let t = Arc::new(ScriptedTransport::new());
        for _ in 0..3 {
            t.push(Endpoint::State, ScriptedReply::fail("down"));
        }
        t.push(Endpoint::Action, ScriptedReply::ok(json!({"gameOver": false})));
        let c = client(&t);
        for _ in 0..3 {
            let _ = c.fetch_state().await;
        }
        assert!(c.circuit().is_open());

        let resp = c
            .submit_action(&ActionRequest::new(ActionKind::StartGame))
            .await
            .unwrap();
        assert_eq!(resp.game_over, Some(false));
        assert!(!c.circuit().is_open());
        assert_eq!(c.circuit_snapshot().consecutive_failures, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn action_body_is_posted() {
        let t = Arc::new(ScriptedTransport::new());
        t.push(Endpoint::Action, ScriptedReply::ok(json!({})));
        let c = client(&t);
        c.submit_action(&ActionRequest::with_data(ActionKind::Rotate, json!({"dir": "cw"})))
            .await
            .unwrap();

        let calls = t.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].endpoint, Endpoint::Action);
        let body = calls[0].body.as_ref().unwrap();
        assert_eq!(body["type"], "rotate");
        assert_eq!(body["data"]["dir"], "cw");
    }
}
