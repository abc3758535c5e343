//! Periodic driver that requests `move_down` at a level-dependent cadence.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::core::{GameStateCoordinator, LoopControl};
use crate::types::{drop_interval_ms, ActionKind};

/// What the scheduler drives.
#[async_trait]
pub trait TickTarget: Send + Sync {
    async fn tick(&self);

    /// Checked before every tick; a finished game stops the loop.
    fn game_over(&self) -> bool;
}

#[async_trait]
impl TickTarget for GameStateCoordinator {
    async fn tick(&self) {
        self.dispatch(ActionKind::MoveDown, None).await;
    }

    fn game_over(&self) -> bool {
        self.is_game_over()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopState {
    pub running: bool,
    pub paused: bool,
    pub current_speed: Duration,
    /// Cadence `resume` reinstalls.
    pub saved_speed: Option<Duration>,
}

struct Inner {
    state: LoopState,
    driver: Option<JoinHandle<()>>,
    generation: u64,
}

impl Inner {
    fn cancel(&mut self) {
        if let Some(driver) = self.driver.take() {
            driver.abort();
        }
    }
}

pub struct GameLoopScheduler {
    target: Arc<dyn TickTarget>,
    inner: Arc<Mutex<Inner>>,
}

impl GameLoopScheduler {
    pub fn new(target: Arc<dyn TickTarget>) -> Self {
        Self {
            target,
            inner: Arc::new(Mutex::new(Inner {
                state: LoopState {
                    running: false,
                    paused: false,
                    current_speed: speed_for(1),
                    saved_speed: None,
                },
                driver: None,
                generation: 0,
            })),
        }
    }

    /// Replace any running driver with one at the cadence for `level`.
    pub fn start(&self, level: u32) {
        let mut inner = self.inner.lock();
        let period = speed_for(level);
        inner.state = LoopState {
            running: true,
            paused: false,
            current_speed: period,
            saved_speed: None,
        };
        self.install(&mut inner, period);
        info!(level, period_ms = period.as_millis() as u64, "game loop started");
    }

    pub fn stop(&self) {
        let mut inner = self.inner.lock();
        inner.cancel();
        if inner.state.running {
            info!("game loop stopped");
        }
        inner.state.running = false;
        inner.state.paused = false;
        inner.state.saved_speed = None;
    }

    /// Update the cadence. A live driver is restarted at the new period; a
    /// stopped or paused one only records it.
    pub fn set_speed(&self, level: u32) {
        let mut inner = self.inner.lock();
        let period = speed_for(level);
        inner.state.current_speed = period;
        if inner.state.paused {
            inner.state.saved_speed = Some(period);
        } else if inner.state.running {
            self.install(&mut inner, period);
        }
        debug!(level, period_ms = period.as_millis() as u64, "loop speed set");
    }

    pub fn pause(&self) {
        let mut inner = self.inner.lock();
        if !inner.state.running || inner.state.paused {
            return;
        }
        inner.cancel();
        inner.state.paused = true;
        inner.state.saved_speed = Some(inner.state.current_speed);
        info!("game loop paused");
    }

    pub fn resume(&self) {
        let mut inner = self.inner.lock();
        if !inner.state.paused {
            return;
        }
        let period = inner.state.saved_speed.take().unwrap_or(inner.state.current_speed);
        inner.state.paused = false;
        inner.state.current_speed = period;
        self.install(&mut inner, period);
        info!(period_ms = period.as_millis() as u64, "game loop resumed");
    }

    pub fn is_paused(&self) -> bool {
        self.inner.lock().state.paused
    }

    pub fn is_running(&self) -> bool {
        self.inner.lock().state.running
    }

    pub fn state(&self) -> LoopState {
        self.inner.lock().state
    }

    fn install(&self, inner: &mut Inner, period: Duration) {
        inner.cancel();
        inner.generation = inner.generation.wrapping_add(1);
        let generation = inner.generation;
        let target = self.target.clone();
        let shared = self.inner.clone();

        inner.driver = Some(tokio::spawn(async move {
            let mut ticks = interval_at(Instant::now() + period, period);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticks.tick().await;
                if target.game_over() {
                    break;
                }
                target.tick().await;
            }

            let mut inner = shared.lock();
            if inner.generation == generation {
                inner.state.running = false;
                inner.driver = None;
                info!("game over; loop stopped itself");
            }
        }));
    }
}

impl LoopControl for GameLoopScheduler {
    fn stop(&self) {
        GameLoopScheduler::stop(self);
    }

    fn set_speed(&self, level: u32) {
        GameLoopScheduler::set_speed(self, level);
    }
}

impl Drop for GameLoopScheduler {
    fn drop(&mut self) {
        self.inner.lock().cancel();
    }
}

impl std::fmt::Debug for GameLoopScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameLoopScheduler")
            .field("state", &self.state())
            .finish()
    }
}

fn speed_for(level: u32) -> Duration {
    Duration::from_millis(drop_interval_ms(level))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

    #[derive(Default)]
    struct CountingTarget {
        ticks: AtomicU32,
        over: AtomicBool,
    }

    #[async_trait]
    impl TickTarget for CountingTarget {
        async fn tick(&self) {
            self.ticks.fetch_add(1, Ordering::SeqCst);
        }

        fn game_over(&self) -> bool {
            self.over.load(Ordering::SeqCst)
        }
    }

    fn setup() -> (GameLoopScheduler, Arc<CountingTarget>) {
        let target = Arc::new(CountingTarget::default());
        (GameLoopScheduler::new(target.clone()), target)
    }

    async fn sleep_ms(ms: u64) {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }

    fn ticks(t: &CountingTarget) -> u32 {
        t.ticks.load(Ordering::SeqCst)
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_at_level_cadence() {
        let (s, t) = setup();
        s.start(1);
        sleep_ms(3_500).await;
        assert_eq!(ticks(&t), 3);

        s.start(2);
        sleep_ms(950).await;
        assert_eq!(ticks(&t), 4);
        assert_eq!(s.state().current_speed, Duration::from_millis(900));
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_retains_cadence() {
        let (s, t) = setup();
        s.start(3);
        sleep_ms(1_000).await;
        assert_eq!(ticks(&t), 1);

        s.pause();
        assert!(s.is_paused());
        sleep_ms(5_000).await;
        assert_eq!(ticks(&t), 1);

        s.resume();
        assert_eq!(s.state().current_speed, Duration::from_millis(810));
        sleep_ms(1_000).await;
        assert_eq!(ticks(&t), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_speed_while_paused_applies_on_resume() {
        let (s, _) = setup();
        s.start(1);
        s.pause();
        s.set_speed(2);
        assert!(s.is_paused());
        s.resume();
        assert_eq!(s.state().current_speed, Duration::from_millis(900));
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_speed_while_stopped_only_records() {
        let (s, t) = setup();
        s.set_speed(5);
        sleep_ms(5_000).await;
        assert_eq!(ticks(&t), 0);
        assert!(!s.is_running());
        assert_eq!(s.state().current_speed, Duration::from_millis(656));
    }

    #[tokio::test(start_paused = true)]
    async fn test_game_over_stops_loop() {
        let (s, t) = setup();
        s.start(1);
        sleep_ms(1_500).await;
        t.over.store(true, Ordering::SeqCst);
        sleep_ms(1_000).await;
        assert_eq!(ticks(&t), 1);
        assert!(!s.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_and_redundant_calls() {
        let (s, t) = setup();
        s.resume();
        s.pause();
        assert!(!s.is_paused());

        s.start(1);
        s.stop();
        sleep_ms(3_000).await;
        assert_eq!(ticks(&t), 0);
    }
}
