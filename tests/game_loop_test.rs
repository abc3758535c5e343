//! Coordinator and scheduler wired together the way the binary runs them.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use colour_balls::app::Session;
use colour_balls::client::{ClientConfig, Endpoint, RemoteGameClient, ScriptedReply, ScriptedTransport};
use colour_balls::core::{Advisory, CoordinatorConfig, GameStateCoordinator};

fn session() -> (Arc<ScriptedTransport>, Session) {
    let transport = Arc::new(ScriptedTransport::new());
    let client = RemoteGameClient::new(transport.clone(), &ClientConfig::default());
    let coordinator = GameStateCoordinator::new(client, CoordinatorConfig::default());
    (transport, Session::new(coordinator))
}

fn started(level: u32) -> ScriptedReply {
    ScriptedReply::ok(json!({
        "currentPiece": {"colors": [1, 2, 3], "x": 4, "y": 0, "orientation": 0},
        "score": 0,
        "level": level,
        "gameOver": false
    }))
}

async fn sleep_ms(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

#[tokio::test(start_paused = true)]
async fn test_ticks_dispatch_move_down() {
    let (t, s) = session();
    t.push(Endpoint::Action, started(1));
    t.set_fallback(Endpoint::Action, ScriptedReply::ok(json!({"score": 0})));

    assert!(s.start_game().await.unwrap().success());
    assert!(s.scheduler().is_running());

    sleep_ms(2_100).await;
    let calls = t.calls();
    assert_eq!(calls.len(), 3);
    assert_eq!(calls[0].body.as_ref().unwrap()["type"], "start_game");
    for call in &calls[1..] {
        assert_eq!(call.body.as_ref().unwrap()["type"], "move_down");
    }
}

#[tokio::test(start_paused = true)]
async fn test_start_game_uses_reported_level() {
    let (t, s) = session();
    t.push(Endpoint::Action, started(2));
    t.set_fallback(Endpoint::Action, ScriptedReply::ok(json!({"level": 2})));

    s.start_game().await.unwrap();
    assert_eq!(s.scheduler().state().current_speed, Duration::from_millis(900));

    sleep_ms(950).await;
    assert_eq!(t.calls_to(Endpoint::Action), 2);
}

#[tokio::test(start_paused = true)]
async fn test_level_change_speeds_up_loop() {
    let (t, s) = session();
    t.push(Endpoint::Action, started(1));
    t.push(Endpoint::Action, ScriptedReply::ok(json!({"level": 3})));
    t.set_fallback(Endpoint::Action, ScriptedReply::ok(json!({})));

    s.start_game().await.unwrap();
    sleep_ms(1_050).await;
    assert_eq!(s.coordinator().current_state().level, 3);
    assert_eq!(s.scheduler().state().current_speed, Duration::from_millis(810));
    assert!(s.scheduler().is_running());

    // Next tick comes one new period after the level change.
    sleep_ms(800).await;
    assert_eq!(t.calls_to(Endpoint::Action), 3);
}

#[tokio::test(start_paused = true)]
async fn test_game_over_stops_loop() {
    let (t, s) = session();
    t.push(Endpoint::Action, started(1));
    t.push(Endpoint::Action, ScriptedReply::ok(json!({"gameOver": true})));
    t.set_fallback(Endpoint::Action, ScriptedReply::ok(json!({})));

    s.start_game().await.unwrap();
    sleep_ms(1_100).await;
    assert!(s.coordinator().is_game_over());
    assert!(!s.scheduler().is_running());
    assert_eq!(s.coordinator().advisory(), Some(Advisory::GameOver));

    sleep_ms(5_000).await;
    assert_eq!(t.calls_to(Endpoint::Action), 2);
}

#[tokio::test(start_paused = true)]
async fn test_ticks_pause_while_resolving() {
    let (t, s) = session();
    t.push(Endpoint::Action, started(1));
    t.push(
        Endpoint::Action,
        ScriptedReply::ok(json!({"matchedPositions": [[19, 0], [19, 1], [19, 2]]})),
    );
    t.set_fallback(Endpoint::Action, ScriptedReply::ok(json!({})));
    t.set_fallback(Endpoint::ClearMatches, ScriptedReply::ok(json!({})));

    s.start_game().await.unwrap();
    // Tick at 1 s reports a match; the tick at 2 s is dropped by the lock.
    sleep_ms(2_100).await;
    assert_eq!(t.calls_to(Endpoint::Action), 2);
    assert_eq!(t.calls_to(Endpoint::ClearMatches), 0);

    // Cleared at 2.5 s; the tick at 3 s goes through.
    sleep_ms(1_000).await;
    assert_eq!(t.calls_to(Endpoint::ClearMatches), 1);
    assert_eq!(t.calls_to(Endpoint::Action), 3);
}
