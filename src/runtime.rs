use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::{Duration, Instant};

use crossterm::event::{self, Event as CtEvent, KeyEvent};

/// Unified event type consumed by the game loop.
#[derive(Clone, Debug)]
pub enum GameEvent {
    Key(KeyEvent),
    Resize,
    Tick,
}

/// Source of terminal events (keyboard, resize, etc.)
pub trait EventSource: Send + 'static {
    /// Block for up to `timeout` waiting for an event.
    /// Returns Ok(event) if an event arrives before the timeout, or Err(Timeout) if it expires.
    fn recv_timeout(&self, timeout: Duration) -> Result<GameEvent, RecvTimeoutError>;
}

/// Production event source using crossterm
pub struct CrosstermEventSource {
    rx: Receiver<GameEvent>,
}

impl CrosstermEventSource {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();

        std::thread::spawn(move || loop {
            match event::read() {
                Ok(CtEvent::Key(key)) => {
                    if tx.send(GameEvent::Key(key)).is_err() {
                        break;
                    }
                }
                Ok(CtEvent::Resize(_, _)) => {
                    if tx.send(GameEvent::Resize).is_err() {
                        break;
                    }
                }
                Ok(_) => {}
                Err(_) => break,
            }
        });

        Self { rx }
    }
}

impl Default for CrosstermEventSource {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSource for CrosstermEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<GameEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Test event source for unit tests
pub struct TestEventSource {
    rx: Receiver<GameEvent>,
}

impl TestEventSource {
    pub fn new(rx: Receiver<GameEvent>) -> Self {
        Self { rx }
    }
}

impl EventSource for TestEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<GameEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Deadline-aware event pump. Round timers are deadlines polled by the game
/// loop, so the pump blocks until the next input event or the next pending
/// deadline, whichever comes first, instead of spinning on a fixed tick.
/// `max_wait` caps the sleep when no deadline is pending so the loop still
/// wakes for redraws.
pub struct EventPump<E: EventSource> {
    source: E,
    max_wait: Duration,
}

impl<E: EventSource> EventPump<E> {
    pub fn new(source: E, max_wait: Duration) -> Self {
        Self { source, max_wait }
    }

    /// Block until an event arrives or the wait expires, returning `Tick`
    /// on expiry. A deadline at or before `now` yields `Tick` without
    /// blocking unless an input event is already queued.
    pub fn next(&self, now: Instant, deadline: Option<Instant>) -> GameEvent {
        let wait = match deadline {
            Some(at) => at.saturating_duration_since(now).min(self.max_wait),
            None => self.max_wait,
        };

        match self.source.recv_timeout(wait) {
            Ok(ev) => ev,
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {
                GameEvent::Tick
            }
        }
    }
}
