//! The coordinator: owns the view model and drives match resolution.
//!
//! # Dispatch order
//!
//! 1. Circuit open and kind not allow-listed: predict locally, no network.
//! 2. A resolution session is active and the kind is not `hard_drop`: dropped.
//! 3. `hard_drop`: take the in-flight guard, cancel any running resolution and
//!    force the animation lock open.
//! 4. Submit, merge the reply (or record the failure and keep the last state).
//! 5. Fresh `matchedPositions` in the reply start a resolution task.
//!
//! # Resolution
//!
//! A spawned task loops: wait the clear delay, `POST /api/clear-matches`,
//! merge. Further matches renew the animation session and loop again; an
//! empty reply, a failure or the depth limit ends it. The session is released
//! on every exit, including when the task is aborted.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::client::{ActionRequest, CircuitBreaker, CircuitSnapshot, RemoteGameClient, StateResponse};
use crate::error::GameError;
use crate::guard::HardDropGuard;
use crate::hooks::{EmergencyReset, LoopControl};
use crate::lock::{AnimationLockManager, MatchedCell, SafetyDeadlines, SessionId};
use crate::predict::predict;
use crate::types::{ActionKind, GameState, CLEAR_DELAY_MS};

/// Default bound on cascade steps per resolution.
pub const MAX_CASCADE_DEPTH: u32 = 32;

#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Wait between a reported match and its clear request.
    pub clear_delay: Duration,
    pub deadlines: SafetyDeadlines,
    pub max_cascade_depth: u32,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            clear_delay: Duration::from_millis(CLEAR_DELAY_MS),
            deadlines: SafetyDeadlines::default(),
            max_cascade_depth: MAX_CASCADE_DEPTH,
        }
    }
}

impl CoordinatorConfig {
    /// Create from environment variables
    pub fn from_env() -> Self {
        use std::env;

        let defaults = Self::default();
        let millis = |key: &str| {
            env::var(key)
                .ok()
                .and_then(|s| s.trim().parse::<u64>().ok())
                .map(Duration::from_millis)
        };

        Self {
            clear_delay: millis("COLOUR_BALLS_CLEAR_DELAY_MS").unwrap_or(defaults.clear_delay),
            deadlines: SafetyDeadlines {
                local: millis("COLOUR_BALLS_LOCAL_DEADLINE_MS")
                    .unwrap_or(defaults.deadlines.local),
                global: millis("COLOUR_BALLS_GLOBAL_DEADLINE_MS")
                    .unwrap_or(defaults.deadlines.global),
            },
            max_cascade_depth: env::var("COLOUR_BALLS_MAX_CASCADE_DEPTH")
                .ok()
                .and_then(|s| s.trim().parse::<u32>().ok())
                .map(|n| n.max(1))
                .unwrap_or(defaults.max_cascade_depth),
        }
    }
}

/// How a dispatch was served.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchStatus {
    /// The server accepted the action and its reply was merged.
    Applied,
    /// Circuit open: served locally. `predicted` is set when the piece was
    /// moved by local prediction.
    Degraded { predicted: bool },
    /// The exchange failed; the last known state was kept.
    Failed(GameError),
}

/// Result of one dispatch. A dropped action yields no outcome at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchOutcome {
    pub kind: ActionKind,
    pub status: DispatchStatus,
    /// Snapshot taken after the dispatch was applied.
    pub state: GameState,
}

impl DispatchOutcome {
    pub fn success(&self) -> bool {
        self.status == DispatchStatus::Applied
    }

    pub fn circuit_open(&self) -> bool {
        matches!(self.status, DispatchStatus::Degraded { .. })
    }

    pub fn error(&self) -> Option<&GameError> {
        match &self.status {
            DispatchStatus::Failed(e) => Some(e),
            _ => None,
        }
    }
}

/// User-facing message for the status line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advisory {
    /// A failure the game plays through.
    Limited(String),
    Offline,
    GameOver,
    ResetDone,
    ResetFailed,
    Emergency,
}

impl std::fmt::Display for Advisory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Advisory::Limited(msg) => {
                write!(f, "Error: {msg}. Game will continue in limited mode.")
            }
            Advisory::Offline => f.write_str("Server unreachable. Playing offline for now."),
            Advisory::GameOver => f.write_str("Game Over! Press R to Reset."),
            Advisory::ResetDone => f.write_str("Game reset. Good luck!"),
            Advisory::ResetFailed => f.write_str("Error resetting game. Press R to retry."),
            Advisory::Emergency => f.write_str("Emergency reset performed."),
        }
    }
}

impl Advisory {
    /// Cleared by the next successful exchange.
    fn is_transient(&self) -> bool {
        matches!(
            self,
            Advisory::Limited(_) | Advisory::Offline | Advisory::GameOver
        )
    }
}

type ResolutionSlot = Arc<Mutex<Option<JoinHandle<()>>>>;

/// Whole-client recovery shared by the global deadline and the emergency key.
struct SystemReset {
    hard_drop: Arc<HardDropGuard>,
    circuit: Arc<CircuitBreaker>,
    resolution: ResolutionSlot,
    count: AtomicU64,
}

impl EmergencyReset for SystemReset {
    fn full_reset(&self) {
        if let Some(task) = self.resolution.lock().take() {
            task.abort();
        }
        self.hard_drop.clear();
        self.circuit.reset();
        let n = self.count.fetch_add(1, Ordering::SeqCst) + 1;
        warn!(resets = n, "client state reset");
    }
}

/// Releases an animation session when the resolution task ends or is dropped.
struct SessionRelease<'a> {
    lock: &'a AnimationLockManager,
    id: SessionId,
}

impl Drop for SessionRelease<'_> {
    fn drop(&mut self) {
        self.lock.release(self.id);
    }
}

pub struct GameStateCoordinator {
    client: RemoteGameClient,
    config: CoordinatorConfig,
    state: RwLock<GameState>,
    advisory: Mutex<Option<Advisory>>,
    lock: AnimationLockManager,
    hard_drop: Arc<HardDropGuard>,
    resolution: ResolutionSlot,
    system: Arc<SystemReset>,
    loop_control: RwLock<Option<Weak<dyn LoopControl>>>,
    me: Weak<GameStateCoordinator>,
}

impl GameStateCoordinator {
    pub fn new(client: RemoteGameClient, config: CoordinatorConfig) -> Arc<Self> {
        let hard_drop = Arc::new(HardDropGuard::new());
        let resolution: ResolutionSlot = Arc::new(Mutex::new(None));
        let system = Arc::new(SystemReset {
            hard_drop: hard_drop.clone(),
            circuit: client.circuit().clone(),
            resolution: resolution.clone(),
            count: AtomicU64::new(0),
        });
        let lock = AnimationLockManager::new(config.deadlines, system.clone());

        Arc::new_cyclic(|me| Self {
            client,
            config,
            state: RwLock::new(GameState::default()),
            advisory: Mutex::new(None),
            lock,
            hard_drop,
            resolution,
            system,
            loop_control: RwLock::new(None),
            me: me.clone(),
        })
    }

    /// Register the periodic driver notified of game over and level changes.
    pub fn attach_loop<L: LoopControl + 'static>(&self, control: &Arc<L>) {
        let weak: Weak<L> = Arc::downgrade(control);
        let weak: Weak<dyn LoopControl> = weak;
        *self.loop_control.write() = Some(weak);
    }

    /// Load the server's current state, replacing the local view.
    pub async fn initialize(&self) -> Result<GameState, GameError> {
        match self.client.fetch_state().await {
            Ok(resp) => {
                let state = GameState::rebuilt_from(resp.into_patch());
                *self.state.write() = state.clone();
                info!(score = state.score, level = state.level, "state loaded");
                Ok(state)
            }
            Err(e) => {
                let e = GameError::from(e);
                warn!(error = %e, "initial state fetch failed");
                self.set_advisory(Advisory::Limited(e.to_string()));
                Err(e)
            }
        }
    }

    /// Dispatch one action. `None` means the action was dropped.
    pub async fn dispatch(&self, kind: ActionKind, data: Option<Value>) -> Option<DispatchOutcome> {
        if kind == ActionKind::Reset {
            return Some(self.reset().await);
        }

        if !self.client.circuit().allows(kind) {
            return Some(self.degrade(kind));
        }

        let is_hard_drop = kind == ActionKind::HardDrop;
        if !is_hard_drop && self.lock.is_active() {
            debug!(%kind, "resolution in progress; action dropped");
            return None;
        }

        let _permit = if is_hard_drop {
            let Some(permit) = self.hard_drop.try_begin() else {
                debug!("hard drop already in flight; rejected");
                return None;
            };
            self.cancel_resolution();
            self.lock.force_release();
            Some(permit)
        } else {
            None
        };

        let request = match data {
            Some(data) => ActionRequest::with_data(kind, data),
            None => ActionRequest::new(kind),
        };
        let resp = match self.client.submit_action(&request).await {
            Ok(resp) => resp,
            Err(e) => {
                let e = GameError::from(e);
                if e == GameError::CircuitOpenFallback {
                    return Some(self.degrade(kind));
                }
                return Some(self.fail(kind, e));
            }
        };

        if let Some(msg) = resp.error.clone() {
            return Some(self.fail(kind, GameError::ApplicationError(msg)));
        }

        let fresh_matches = resp.has_matches();
        let cells = self.apply(resp);
        if fresh_matches {
            self.start_resolution(cells, is_hard_drop);
        }

        Some(DispatchOutcome {
            kind,
            status: DispatchStatus::Applied,
            state: self.current_state(),
        })
    }

    /// Reset the server game and replace the local view wholesale.
    pub async fn reset(&self) -> DispatchOutcome {
        self.cancel_resolution();
        self.lock.force_release();
        self.hard_drop.clear();

        let status = match self.client.reset_game().await {
            Ok(resp) => {
                *self.state.write() = GameState::rebuilt_from(resp.into_patch());
                self.set_advisory(Advisory::ResetDone);
                info!("game reset");
                DispatchStatus::Applied
            }
            Err(e) => {
                let e = GameError::from(e);
                warn!(error = %e, "reset failed");
                self.set_advisory(Advisory::ResetFailed);
                DispatchStatus::Failed(e)
            }
        };

        DispatchOutcome {
            kind: ActionKind::Reset,
            status,
            state: self.current_state(),
        }
    }

    /// Local recovery, independent of the network: release the animation
    /// lock, clear the hard-drop guard, reset the circuit, cancel resolution.
    pub fn emergency_reset(&self) {
        warn!("emergency reset requested");
        self.lock.force_release();
        self.system.full_reset();
        self.set_advisory(Advisory::Emergency);
    }

    /// Snapshot of the view model.
    pub fn current_state(&self) -> GameState {
        self.state.read().clone()
    }

    pub fn is_game_over(&self) -> bool {
        self.state.read().game_over
    }

    pub fn advisory(&self) -> Option<Advisory> {
        self.advisory.lock().clone()
    }

    pub fn lock(&self) -> &AnimationLockManager {
        &self.lock
    }

    pub fn hard_drop_in_flight(&self) -> bool {
        self.hard_drop.is_held()
    }

    pub fn circuit_snapshot(&self) -> CircuitSnapshot {
        self.client.circuit_snapshot()
    }

    /// Full client resets so far (global deadline or emergency key).
    pub fn safety_reset_count(&self) -> u64 {
        self.system.count.load(Ordering::SeqCst)
    }

    pub fn resolution_running(&self) -> bool {
        self.resolution
            .lock()
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    fn degrade(&self, kind: ActionKind) -> DispatchOutcome {
        let mut state = self.state.write();
        let mut predicted = false;
        if kind.is_predictable() {
            if let Some(next) = state
                .current_piece
                .as_ref()
                .and_then(|piece| predict(piece, kind, &state.board))
            {
                predicted = state.current_piece.as_ref() != Some(&next);
                state.current_piece = Some(next);
            }
        }
        let snapshot = state.clone();
        drop(state);

        debug!(%kind, predicted, "circuit open; served locally");
        self.set_advisory(Advisory::Offline);
        DispatchOutcome {
            kind,
            status: DispatchStatus::Degraded { predicted },
            state: snapshot,
        }
    }

    fn fail(&self, kind: ActionKind, error: GameError) -> DispatchOutcome {
        warn!(%kind, error = %error, "action failed; keeping last state");
        self.set_advisory(Advisory::Limited(error.to_string()));
        DispatchOutcome {
            kind,
            status: DispatchStatus::Failed(error),
            state: self.current_state(),
        }
    }

    /// Merge a reply and notify the loop. Returns the matched cells with the
    /// colors they hold in the merged board.
    fn apply(&self, resp: StateResponse) -> Vec<MatchedCell> {
        let (cells, game_over, level, level_changed) = {
            let mut state = self.state.write();
            let previous_level = state.level;
            state.merge(resp.into_patch());
            let cells = state
                .matched_positions
                .iter()
                .map(|pos| MatchedCell {
                    row: pos.row,
                    col: pos.col,
                    color: state.board.get(pos.row, pos.col).unwrap_or(0),
                })
                .collect::<Vec<_>>();
            (cells, state.game_over, state.level, state.level != previous_level)
        };

        let control = self.loop_control.read().as_ref().and_then(Weak::upgrade);
        if game_over {
            info!("game over");
            self.set_advisory(Advisory::GameOver);
            if let Some(control) = control {
                control.stop();
            }
        } else {
            self.clear_transient_advisory();
            if level_changed {
                info!(level, "level changed");
                if let Some(control) = control {
                    control.set_speed(level);
                }
            }
        }
        cells
    }

    fn start_resolution(&self, cells: Vec<MatchedCell>, preempt: bool) {
        let Some(this) = self.me.upgrade() else {
            return;
        };
        let mut slot = self.resolution.lock();
        let count = cells.len();
        let Some(id) = self.lock.try_acquire(cells, preempt) else {
            warn!(cells = count, "matches reported while another resolution is active");
            return;
        };
        if let Some(previous) = slot.take() {
            previous.abort();
        }
        info!(session = %id, cells = count, "resolution started");
        *slot = Some(tokio::spawn(async move { this.resolve(id).await }));
    }

    fn cancel_resolution(&self) {
        if let Some(task) = self.resolution.lock().take() {
            if !task.is_finished() {
                info!("resolution cancelled");
            }
            task.abort();
        }
    }

    async fn resolve(&self, id: SessionId) {
        let _release = SessionRelease {
            lock: &self.lock,
            id,
        };

        let mut depth = 0u32;
        loop {
            tokio::time::sleep(self.config.clear_delay).await;
            depth += 1;

            let resp = match self.client.submit_clear_matches().await {
                Ok(resp) => resp,
                Err(e) => {
                    let e = GameError::from(e);
                    warn!(session = %id, depth, error = %e, "clear-matches failed; ending resolution");
                    self.set_advisory(Advisory::Limited(e.to_string()));
                    return;
                }
            };
            if let Some(msg) = resp.error.clone() {
                warn!(session = %id, depth, error = %msg, "clear-matches rejected; ending resolution");
                self.set_advisory(Advisory::Limited(msg));
                return;
            }

            let more = resp.has_matches();
            let cells = self.apply(resp);
            if !more {
                debug!(session = %id, depth, "resolution settled");
                return;
            }
            if depth >= self.config.max_cascade_depth {
                warn!(session = %id, depth, "cascade depth limit reached; ending resolution");
                return;
            }
            if !self.lock.renew(id, cells) {
                debug!(session = %id, depth, "session no longer current; ending resolution");
                return;
            }
            debug!(session = %id, depth, "cascade continues");
        }
    }

    fn set_advisory(&self, advisory: Advisory) {
        *self.advisory.lock() = Some(advisory);
    }

    fn clear_transient_advisory(&self) {
        let mut advisory = self.advisory.lock();
        if advisory.as_ref().is_some_and(Advisory::is_transient) {
            *advisory = None;
        }
    }
}

impl std::fmt::Debug for GameStateCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameStateCoordinator")
            .field("client", &self.client)
            .field("lock", &self.lock)
            .field("hard_drop_in_flight", &self.hard_drop.is_held())
            .finish()
    }
}
