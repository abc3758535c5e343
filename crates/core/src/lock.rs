//! Animation lock with a two-tier safety ladder.
//!
//! At most one [`AnimationSession`](SessionView) is active. Acquiring one arms
//! two deadlines:
//!
//! - **local** (3 s): the session is force-released and a warning logged. The
//!   global deadline stays armed.
//! - **global** (10 s): if the session was never explicitly released, the
//!   lock clears itself and then fires the injected [`EmergencyReset`].
//!
//! `release(id)` disarms both. A release naming a session that is no longer
//! current is a logged no-op.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::AbortHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::hooks::EmergencyReset;
use crate::types::{GLOBAL_DEADLINE_MS, LOCAL_DEADLINE_MS};

/// Identifies one acquisition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SessionId(u64);

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A flagged cell and the color it held when flagged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MatchedCell {
    pub row: u8,
    pub col: u8,
    pub color: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SafetyDeadlines {
    pub local: Duration,
    pub global: Duration,
}

impl Default for SafetyDeadlines {
    fn default() -> Self {
        Self {
            local: Duration::from_millis(LOCAL_DEADLINE_MS),
            global: Duration::from_millis(GLOBAL_DEADLINE_MS),
        }
    }
}

/// Read-only view of the active session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionView {
    pub id: SessionId,
    pub cells: BTreeSet<MatchedCell>,
}

struct Session {
    id: SessionId,
    cells: BTreeSet<MatchedCell>,
    acquired_at: Instant,
    local: AbortHandle,
    global: AbortHandle,
}

/// A session the local deadline released; only its global deadline remains.
struct Lapsed {
    id: SessionId,
    global: AbortHandle,
}

#[derive(Default)]
struct Inner {
    active: Option<Session>,
    lapsed: Option<Lapsed>,
    next_id: u64,
}

impl Inner {
    fn cancel_all(&mut self) -> bool {
        let had = self.active.is_some();
        if let Some(s) = self.active.take() {
            s.local.abort();
            s.global.abort();
        }
        if let Some(l) = self.lapsed.take() {
            l.global.abort();
        }
        had
    }
}

pub struct AnimationLockManager {
    inner: Arc<Mutex<Inner>>,
    deadlines: SafetyDeadlines,
    reset: Arc<dyn EmergencyReset>,
}

impl AnimationLockManager {
    pub fn new(deadlines: SafetyDeadlines, reset: Arc<dyn EmergencyReset>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner::default())),
            deadlines,
            reset,
        }
    }

    /// Acquire a session for `cells`.
    ///
    /// Fails while another session is active unless `preempt` is set (hard
    /// drop), in which case the existing session is force-released first.
    pub fn try_acquire(
        &self,
        cells: impl IntoIterator<Item = MatchedCell>,
        preempt: bool,
    ) -> Option<SessionId> {
        let mut inner = self.inner.lock();
        if let Some(active) = &inner.active {
            if !preempt {
                debug!(session = %active.id, "animation lock busy");
                return None;
            }
            info!(session = %active.id, "animation session preempted");
        }
        inner.cancel_all();

        inner.next_id = inner.next_id.wrapping_add(1);
        let id = SessionId(inner.next_id);
        let (local, global) = self.arm(id);
        let cells: BTreeSet<_> = cells.into_iter().collect();
        debug!(session = %id, cells = cells.len(), "animation session acquired");
        inner.active = Some(Session {
            id,
            cells,
            acquired_at: Instant::now(),
            local,
            global,
        });
        Some(id)
    }

    /// Record progress: replace the cells and re-arm both deadlines.
    ///
    /// Returns `false` if `id` is no longer the active session.
    pub fn renew(&self, id: SessionId, cells: impl IntoIterator<Item = MatchedCell>) -> bool {
        let mut inner = self.inner.lock();
        let Some(session) = inner.active.as_mut().filter(|s| s.id == id) else {
            return false;
        };
        session.local.abort();
        session.global.abort();
        let (local, global) = self.arm(id);
        session.local = local;
        session.global = global;
        session.cells = cells.into_iter().collect();
        true
    }

    /// Release `id` and disarm its deadlines.
    pub fn release(&self, id: SessionId) -> bool {
        let mut inner = self.inner.lock();
        if inner.active.as_ref().is_some_and(|s| s.id == id) {
            if let Some(s) = inner.active.take() {
                s.local.abort();
                s.global.abort();
                debug!(
                    session = %id,
                    held_ms = s.acquired_at.elapsed().as_millis() as u64,
                    "animation session released"
                );
            }
            return true;
        }
        if inner.lapsed.as_ref().is_some_and(|l| l.id == id) {
            if let Some(l) = inner.lapsed.take() {
                l.global.abort();
            }
            debug!(session = %id, "lapsed animation session settled");
            return true;
        }
        debug!(session = %id, "release of stale animation session ignored");
        false
    }

    /// Drop whatever is held and disarm every deadline.
    pub fn force_release(&self) -> bool {
        let released = self.inner.lock().cancel_all();
        if released {
            info!("animation session force-released");
        }
        released
    }

    pub fn is_active(&self) -> bool {
        self.inner.lock().active.is_some()
    }

    pub fn session(&self) -> Option<SessionView> {
        self.inner.lock().active.as_ref().map(|s| SessionView {
            id: s.id,
            cells: s.cells.clone(),
        })
    }

    fn arm(&self, id: SessionId) -> (AbortHandle, AbortHandle) {
        let local = {
            let inner = self.inner.clone();
            let after = self.deadlines.local;
            tokio::spawn(async move {
                tokio::time::sleep(after).await;
                let mut inner = inner.lock();
                if !inner.active.as_ref().is_some_and(|s| s.id == id) {
                    return;
                }
                if let Some(s) = inner.active.take() {
                    warn!(
                        session = %id,
                        after_ms = after.as_millis() as u64,
                        "animation session missed local deadline; force-releasing"
                    );
                    inner.lapsed = Some(Lapsed {
                        id,
                        global: s.global,
                    });
                }
            })
            .abort_handle()
        };

        let global = {
            let inner = self.inner.clone();
            let reset = self.reset.clone();
            let after = self.deadlines.global;
            tokio::spawn(async move {
                tokio::time::sleep(after).await;
                let fired = {
                    let mut inner = inner.lock();
                    let mut hit = false;
                    if inner.active.as_ref().is_some_and(|s| s.id == id) {
                        if let Some(s) = inner.active.take() {
                            s.local.abort();
                        }
                        hit = true;
                    }
                    if inner.lapsed.as_ref().is_some_and(|l| l.id == id) {
                        inner.lapsed = None;
                        hit = true;
                    }
                    hit
                };
                if fired {
                    error!(
                        session = %id,
                        after_ms = after.as_millis() as u64,
                        "animation session missed global deadline; resetting client"
                    );
                    reset.full_reset();
                }
            })
            .abort_handle()
        };

        (local, global)
    }
}

impl std::fmt::Debug for AnimationLockManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnimationLockManager")
            .field("active", &self.session().map(|s| s.id))
            .field("deadlines", &self.deadlines)
            .finish()
    }
}
