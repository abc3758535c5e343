//! Session: wires input commands to the coordinator and the game loop.

use std::sync::Arc;

use tracing::{debug, info};

use crate::client::RemoteGameClient;
use crate::config::AppConfig;
use crate::core::{Advisory, DispatchOutcome, GameStateCoordinator};
use crate::engine::GameLoopScheduler;
use crate::input::InputCommand;
use crate::types::{ActionKind, GameState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// What the renderer needs for one frame.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub state: GameState,
    pub paused: bool,
    pub offline: bool,
    pub message: Option<String>,
}

/// One player's session against one server.
#[derive(Debug, Clone)]
pub struct Session {
    coordinator: Arc<GameStateCoordinator>,
    scheduler: Arc<GameLoopScheduler>,
}

impl Session {
    pub fn new(coordinator: Arc<GameStateCoordinator>) -> Self {
        let scheduler = Arc::new(GameLoopScheduler::new(coordinator.clone()));
        coordinator.attach_loop(&scheduler);
        Self {
            coordinator,
            scheduler,
        }
    }

    /// Session over HTTP to the configured server.
    pub fn connect(config: &AppConfig) -> Self {
        info!(server = %config.client.base_url, "connecting");
        let client = RemoteGameClient::http(&config.client);
        Self::new(GameStateCoordinator::new(client, config.coordinator.clone()))
    }

    pub fn coordinator(&self) -> &Arc<GameStateCoordinator> {
        &self.coordinator
    }

    pub fn scheduler(&self) -> &Arc<GameLoopScheduler> {
        &self.scheduler
    }

    /// Load the server state. A failure is reported through the advisory.
    pub async fn initialize(&self) {
        let _ = self.coordinator.initialize().await;
    }

    pub async fn handle(&self, command: InputCommand) -> Flow {
        match command {
            InputCommand::Quit => return Flow::Quit,
            InputCommand::Action(kind) => {
                self.play(kind).await;
            }
            InputCommand::StartGame => {
                self.start_game().await;
            }
            InputCommand::Reset => {
                self.scheduler.stop();
                self.coordinator.reset().await;
            }
            InputCommand::TogglePause => self.toggle_pause(),
            InputCommand::EmergencyReset => self.coordinator.emergency_reset(),
        }
        Flow::Continue
    }

    /// Stop the loop, ask the server to start a game, and restart the loop
    /// at the current level unless the game is over. A rejected start (the
    /// server refuses a second start while a game runs) still restarts it.
    pub async fn start_game(&self) -> Option<DispatchOutcome> {
        self.scheduler.stop();
        let outcome = self
            .coordinator
            .dispatch(ActionKind::StartGame, None)
            .await;
        if outcome.is_some() {
            let state = self.coordinator.current_state();
            if !state.game_over {
                self.scheduler.start(state.level);
            }
        }
        outcome
    }

    pub fn toggle_pause(&self) {
        if self.coordinator.is_game_over() {
            return;
        }
        if self.scheduler.is_paused() {
            self.scheduler.resume();
        } else {
            self.scheduler.pause();
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        let advisory = self.coordinator.advisory();
        Snapshot {
            state: self.coordinator.current_state(),
            paused: self.scheduler.is_paused(),
            offline: self.coordinator.circuit_snapshot().state
                == crate::client::CircuitState::Open,
            message: advisory.as_ref().map(Advisory::to_string),
        }
    }

    async fn play(&self, kind: ActionKind) -> Option<DispatchOutcome> {
        if self.scheduler.is_paused() || self.coordinator.is_game_over() {
            debug!(%kind, "game paused or over; key ignored");
            return None;
        }
        self.coordinator.dispatch(kind, None).await
    }
}
