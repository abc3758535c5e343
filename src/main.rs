//! Colour Balls terminal client (default binary).
//!
//! Input is read on a dedicated thread and forwarded over a channel; every
//! command other than quit runs as its own task so a slow server never stalls
//! rendering.

use std::thread;
use std::time::{Duration, Instant};

use anyhow::Result;
use crossterm::event::{self, Event, KeyEvent, KeyEventKind};
use tokio::sync::mpsc;
use tracing::{info, warn};

use colour_balls::app::Session;
use colour_balls::config::AppConfig;
use colour_balls::input::{map_key, InputCommand};
use colour_balls::logging;
use colour_balls::term::{FlashClock, FrameBuffer, GameView, HudView, TerminalRenderer, Viewport};

const FRAME_MS: u64 = 33;

enum TermEvent {
    Key(KeyEvent),
    Resize,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let config = AppConfig::from_env();
    let _log_guard = logging::init(&config.log)?;

    let session = Session::connect(&config);
    session.initialize().await;

    let mut term = TerminalRenderer::new();
    term.enter()?;

    let result = run(&mut term, session).await;

    // Always try to restore terminal state.
    let _ = term.exit();
    info!("exiting");
    result
}

async fn run(term: &mut TerminalRenderer, session: Session) -> Result<()> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    thread::Builder::new()
        .name("input".into())
        .spawn(move || read_input(tx))?;

    let view = GameView::default();
    let mut fb = FrameBuffer::new(0, 0);
    let mut flash = FlashClock::new();
    let mut frames = tokio::time::interval(Duration::from_millis(FRAME_MS));
    frames.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = frames.tick() => {
                let snap = session.snapshot();
                let now = Instant::now();
                flash.observe(&snap.state.matched_positions, now);
                let hud = HudView {
                    flash: Some(flash.phase(now)),
                    paused: snap.paused,
                    offline: snap.offline,
                    message: snap.message.as_deref(),
                };
                let (w, h) = crossterm::terminal::size().unwrap_or((80, 24));
                view.render_into(&snap.state, &hud, Viewport::new(w, h), &mut fb);
                term.draw_swap(&mut fb)?;
            }
            event = rx.recv() => match event {
                None => return Ok(()),
                Some(TermEvent::Resize) => term.invalidate(),
                Some(TermEvent::Key(key)) => {
                    let Some(command) = map_key(key) else { continue };
                    if command == InputCommand::Quit {
                        return Ok(());
                    }
                    let session = session.clone();
                    tokio::spawn(async move {
                        session.handle(command).await;
                    });
                }
            },
        }
    }
}

fn read_input(tx: mpsc::UnboundedSender<TermEvent>) {
    loop {
        if tx.is_closed() {
            return;
        }
        let ready = match event::poll(Duration::from_millis(100)) {
            Ok(ready) => ready,
            Err(e) => {
                warn!(error = %e, "input poll failed");
                return;
            }
        };
        if !ready {
            continue;
        }
        let forwarded = match event::read() {
            Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => tx.send(TermEvent::Key(key)),
            Ok(Event::Resize(..)) => tx.send(TermEvent::Resize),
            Ok(_) => Ok(()),
            Err(e) => {
                warn!(error = %e, "input read failed");
                return;
            }
        };
        if forwarded.is_err() {
            return;
        }
    }
}
