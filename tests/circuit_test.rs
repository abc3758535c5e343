//! Degraded mode: the failure circuit, local prediction and the cooldown.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use colour_balls::client::{
    CircuitState, ClientConfig, Endpoint, RemoteGameClient, ScriptedReply, ScriptedTransport,
};
use colour_balls::core::{
    Advisory, CoordinatorConfig, DispatchStatus, GameError, GameStateCoordinator,
};
use colour_balls::types::{ActionKind, Orientation};

fn setup() -> (Arc<ScriptedTransport>, Arc<GameStateCoordinator>) {
    let transport = Arc::new(ScriptedTransport::new());
    let client = RemoteGameClient::new(transport.clone(), &ClientConfig::default());
    let coordinator = GameStateCoordinator::new(client, CoordinatorConfig::default());
    (transport, coordinator)
}

fn started() -> ScriptedReply {
    ScriptedReply::ok(json!({
        "board": vec![vec![0u8; 10]; 20],
        "currentPiece": {"colors": [1, 2, 3], "x": 4, "y": 0, "orientation": 0},
        "nextPieceColors": [4, 5, 6],
        "score": 0,
        "level": 1,
        "gameOver": false
    }))
}

/// Start a game, then fail three actions in a row.
async fn open_circuit(t: &ScriptedTransport, c: &GameStateCoordinator) {
    t.push(Endpoint::Action, started());
    for _ in 0..3 {
        t.push(Endpoint::Action, ScriptedReply::fail("connection refused"));
    }
    assert!(c.dispatch(ActionKind::StartGame, None).await.unwrap().success());
    for _ in 0..3 {
        let out = c.dispatch(ActionKind::MoveDown, None).await.unwrap();
        assert!(matches!(out.error(), Some(GameError::TransportFailure(_))));
    }
}

#[tokio::test(start_paused = true)]
async fn test_three_failures_open_the_circuit() {
    let (t, c) = setup();
    open_circuit(&t, &c).await;

    let snap = c.circuit_snapshot();
    assert_eq!(snap.state, CircuitState::Open);
    assert_eq!(snap.consecutive_failures, 3);

    let before = t.call_count();
    let out = c.dispatch(ActionKind::MoveLeft, None).await.unwrap();
    assert!(!out.success());
    assert!(out.circuit_open());
    assert_eq!(out.status, DispatchStatus::Degraded { predicted: true });
    assert_eq!(out.state.current_piece.as_ref().unwrap().x, 3);
    assert_eq!(t.call_count(), before);
    assert_eq!(c.advisory(), Some(Advisory::Offline));
}

#[tokio::test(start_paused = true)]
async fn test_prediction_respects_board_bounds() {
    let (t, c) = setup();
    open_circuit(&t, &c).await;

    let out = c.dispatch(ActionKind::Rotate, None).await.unwrap();
    let piece = out.state.current_piece.unwrap();
    assert_eq!(piece.orientation, Orientation::Deg90);

    // Anchored on the top row: pointing up (270) would leave the board, so
    // the rotate after 180 is predicted in place.
    let out = c.dispatch(ActionKind::Rotate, None).await.unwrap();
    assert_eq!(out.state.current_piece.unwrap().orientation, Orientation::Deg180);
    let out = c.dispatch(ActionKind::Rotate, None).await.unwrap();
    assert_eq!(out.state.current_piece.unwrap().orientation, Orientation::Deg180);
    assert_eq!(out.status, DispatchStatus::Degraded { predicted: false });

    // Hard drop has no local model.
    let out = c.dispatch(ActionKind::HardDrop, None).await.unwrap();
    assert_eq!(out.status, DispatchStatus::Degraded { predicted: false });
    assert!(!c.hard_drop_in_flight());
}

#[tokio::test(start_paused = true)]
async fn test_reset_and_start_bypass_open_circuit() {
    let (t, c) = setup();
    open_circuit(&t, &c).await;

    t.push(
        Endpoint::Reset,
        ScriptedReply::ok(json!({"score": 0, "level": 1, "gameOver": false})),
    );
    let out = c.dispatch(ActionKind::Reset, None).await.unwrap();
    assert!(out.success());
    assert_eq!(t.calls_to(Endpoint::Reset), 1);
    assert_eq!(c.circuit_snapshot().state, CircuitState::Closed);

    open_circuit(&t, &c).await;
    t.push(Endpoint::Action, started());
    let out = c.dispatch(ActionKind::StartGame, None).await.unwrap();
    assert!(out.success());
    assert_eq!(c.circuit_snapshot().consecutive_failures, 0);
}

#[tokio::test(start_paused = true)]
async fn test_cooldown_lets_next_request_through() {
    let (t, c) = setup();
    open_circuit(&t, &c).await;
    let before = t.call_count();

    tokio::time::sleep(Duration::from_millis(29_999)).await;
    let out = c.dispatch(ActionKind::MoveLeft, None).await.unwrap();
    assert!(out.circuit_open());
    assert_eq!(t.call_count(), before);

    tokio::time::sleep(Duration::from_millis(1)).await;
    t.push(Endpoint::Action, ScriptedReply::ok(json!({"score": 10})));
    let out = c.dispatch(ActionKind::MoveLeft, None).await.unwrap();
    assert!(out.success());
    assert_eq!(out.state.score, 10);
    assert_eq!(t.call_count(), before + 1);

    let snap = c.circuit_snapshot();
    assert_eq!(snap.state, CircuitState::Closed);
    assert_eq!(snap.consecutive_failures, 0);
    assert_eq!(c.advisory(), None);
}

#[tokio::test(start_paused = true)]
async fn test_failed_retry_reopens_immediately() {
    let (t, c) = setup();
    open_circuit(&t, &c).await;

    tokio::time::sleep(Duration::from_secs(30)).await;
    t.push(Endpoint::Action, ScriptedReply::fail("connection refused"));
    let out = c.dispatch(ActionKind::MoveLeft, None).await.unwrap();
    assert!(matches!(out.status, DispatchStatus::Failed(_)));
    assert_eq!(c.circuit_snapshot().state, CircuitState::Open);

    let before = t.call_count();
    assert!(c.dispatch(ActionKind::MoveRight, None).await.unwrap().circuit_open());
    assert_eq!(t.call_count(), before);
}

#[tokio::test(start_paused = true)]
async fn test_initial_fetch_failure_counts_against_circuit() {
    let (t, c) = setup();
    t.push(Endpoint::State, ScriptedReply::Stall);
    assert_eq!(c.initialize().await, Err(GameError::NetworkTimeout));
    assert_eq!(c.circuit_snapshot().consecutive_failures, 1);
    assert!(matches!(c.advisory(), Some(Advisory::Limited(_))));
    assert_eq!(c.current_state().level, 1);
}
