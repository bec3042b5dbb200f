use crate::palette::{self, ColorPair, Rgb};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// How far the waiting color is blended towards white during a deceptive
/// flash.
const FLASH_LIGHTEN: f64 = 0.45;

/// Background shown before the first round begins.
const IDLE_COLOR: Rgb = Rgb::new(0x2c, 0x3e, 0x50);

/// Delay ranges and durations for a round, all in milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Chance that a round includes a deceptive flash before the real change.
    pub flash_probability: f64,
    /// Real trigger delay range for rounds without a flash.
    pub trigger_delay_ms: (u64, u64),
    /// Flash delay range; deliberately earlier than `trigger_delay_ms`.
    pub flash_delay_ms: (u64, u64),
    /// How long the lightened flash color stays on screen.
    pub flash_duration_ms: u64,
    /// Minimum gap between the flash ending and the real trigger.
    pub post_flash_gap_ms: u64,
    /// Extra uniform jitter added on top of the gap.
    pub post_flash_jitter_ms: u64,
    /// Hold time after a score or an early click before the next waiting
    /// phase starts.
    pub pause_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            flash_probability: 0.5,
            trigger_delay_ms: (2000, 5000),
            flash_delay_ms: (1200, 2500),
            flash_duration_ms: 300,
            post_flash_gap_ms: 700,
            post_flash_jitter_ms: 1200,
            pause_ms: 1500,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundState {
    Idle,
    Waiting,
    Ready,
    Paused,
}

/// Side effects of a transition, consumed by the session and the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundSignal {
    RoundStarted { index: usize },
    FlashShown,
    FlashHidden,
    Triggered,
    EarlyClick,
    Scored { ms: u32 },
    /// The post-score / post-early-click hold expired. `advance` is false
    /// when the same round index must be retried.
    PauseOver { advance: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimerAction {
    FlashShow,
    FlashHide,
    Trigger,
    Resume { advance: bool },
}

/// A one-shot deadline. Carries the generation it was minted under; a due
/// timer whose generation is stale is dropped without acting.
#[derive(Debug, Clone, Copy)]
struct Scheduled {
    fire_at: Instant,
    generation: u64,
    action: TimerAction,
}

#[derive(Debug, Clone, Copy)]
enum RoundEvent {
    Begin { retry: bool },
    Input,
    Timer(TimerAction),
    Reset,
}

/// The per-round timing state machine. Owns timer scheduling for deceptive
/// flashes and the real trigger, and interprets player input against the
/// current state. All mutation flows through `apply`.
#[derive(Debug)]
pub struct RoundScheduler {
    state: RoundState,
    round_index: usize,
    generation: u64,
    colors: ColorPair,
    background: Rgb,
    change_at: Option<Instant>,
    timers: Vec<Scheduled>,
    config: TimingConfig,
}

impl RoundScheduler {
    pub fn new(config: TimingConfig) -> Self {
        Self {
            state: RoundState::Idle,
            round_index: 0,
            generation: 0,
            colors: ColorPair {
                from: IDLE_COLOR,
                to: IDLE_COLOR,
            },
            background: IDLE_COLOR,
            change_at: None,
            timers: Vec::new(),
            config,
        }
    }

    pub fn state(&self) -> RoundState {
        self.state
    }

    /// 1-based index of the current round; 0 before the first `begin`.
    pub fn round_index(&self) -> usize {
        self.round_index
    }

    /// The color the UI should fill the background with right now.
    pub fn current_color(&self) -> Rgb {
        self.background
    }

    pub fn change_at(&self) -> Option<Instant> {
        self.change_at
    }

    /// Earliest pending deadline for the current generation. Bounds how
    /// long the event pump may block before the next `poll` is due.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers
            .iter()
            .filter(|t| t.generation == self.generation)
            .map(|t| t.fire_at)
            .min()
    }

    /// Start a round: cancel anything pending, pick a fresh color pair and
    /// schedule the (possibly deceptive) timer set. `retry` keeps the round
    /// index, used after an early click.
    pub fn begin(&mut self, now: Instant, retry: bool) -> Vec<RoundSignal> {
        self.apply(RoundEvent::Begin { retry }, now)
    }

    /// Player input (click/tap). Ignored outside `Waiting`/`Ready`.
    pub fn handle_input(&mut self, now: Instant) -> Vec<RoundSignal> {
        self.apply(RoundEvent::Input, now)
    }

    /// Fire every due timer. Stale generations and stale states are inert;
    /// this is the cancellation contract for timers that already left the
    /// queue.
    pub fn poll(&mut self, now: Instant) -> Vec<RoundSignal> {
        let mut due: Vec<Scheduled> = Vec::new();
        self.timers.retain(|t| {
            if t.fire_at <= now {
                due.push(*t);
                false
            } else {
                true
            }
        });
        due.sort_by_key(|t| t.fire_at);

        let mut signals = Vec::new();
        for timer in due {
            if timer.generation != self.generation {
                continue;
            }
            signals.extend(self.apply(RoundEvent::Timer(timer.action), now));
        }
        signals
    }

    /// Abandon the session: cancel pending timers and return to `Idle`.
    pub fn reset(&mut self) {
        let _ = self.apply(RoundEvent::Reset, Instant::now());
    }

    /// The single transition function: (state, event) -> (state, signals).
    fn apply(&mut self, event: RoundEvent, now: Instant) -> Vec<RoundSignal> {
        match (self.state, event) {
            (_, RoundEvent::Begin { retry }) => {
                self.cancel_pending();
                self.generation += 1;
                if !retry {
                    self.round_index += 1;
                }
                self.state = RoundState::Waiting;
                self.change_at = None;
                self.colors = palette::pick_pair(&mut rand::thread_rng());
                self.background = self.colors.from;
                self.schedule_round(now);
                vec![RoundSignal::RoundStarted {
                    index: self.round_index,
                }]
            }
            (_, RoundEvent::Reset) => {
                self.cancel_pending();
                self.state = RoundState::Idle;
                self.round_index = 0;
                self.change_at = None;
                self.background = IDLE_COLOR;
                vec![]
            }
            (RoundState::Waiting, RoundEvent::Input) => {
                // Early click: hold, then retry the same round index.
                self.cancel_pending();
                self.state = RoundState::Paused;
                self.background = self.colors.from;
                self.schedule(now, self.config.pause_ms, TimerAction::Resume { advance: false });
                vec![RoundSignal::EarlyClick]
            }
            (RoundState::Ready, RoundEvent::Input) => {
                let change_at = self.change_at.take().unwrap_or(now);
                let elapsed = now.duration_since(change_at);
                let ms = (elapsed.as_secs_f64() * 1000.0).round() as u32;
                self.cancel_pending();
                self.state = RoundState::Paused;
                self.schedule(now, self.config.pause_ms, TimerAction::Resume { advance: true });
                vec![RoundSignal::Scored { ms }]
            }
            (RoundState::Waiting, RoundEvent::Timer(TimerAction::FlashShow)) => {
                self.background = self.colors.from.lighten(FLASH_LIGHTEN);
                vec![RoundSignal::FlashShown]
            }
            (RoundState::Waiting, RoundEvent::Timer(TimerAction::FlashHide)) => {
                self.background = self.colors.from;
                vec![RoundSignal::FlashHidden]
            }
            (RoundState::Waiting, RoundEvent::Timer(TimerAction::Trigger)) => {
                self.state = RoundState::Ready;
                self.change_at = Some(now);
                self.background = self.colors.to;
                vec![RoundSignal::Triggered]
            }
            (RoundState::Paused, RoundEvent::Timer(TimerAction::Resume { advance })) => {
                // The owner decides what follows: retry, next round, or
                // session finalization.
                vec![RoundSignal::PauseOver { advance }]
            }
            // Input while idle or paused, and timers that outlived their
            // state, are ignored by design.
            (_, RoundEvent::Input) | (_, RoundEvent::Timer(_)) => vec![],
        }
    }

    fn schedule_round(&mut self, now: Instant) {
        let mut rng = rand::thread_rng();
        let with_flash = rng.gen_bool(self.config.flash_probability.clamp(0.0, 1.0));

        if with_flash {
            let flash_at = draw_ms(&mut rng, self.config.flash_delay_ms);
            let hide_at = flash_at + self.config.flash_duration_ms;
            let jitter = if self.config.post_flash_jitter_ms > 0 {
                rng.gen_range(0..=self.config.post_flash_jitter_ms)
            } else {
                0
            };
            let trigger_at = hide_at + self.config.post_flash_gap_ms + jitter;

            self.schedule(now, flash_at, TimerAction::FlashShow);
            self.schedule(now, hide_at, TimerAction::FlashHide);
            self.schedule(now, trigger_at, TimerAction::Trigger);
        } else {
            let trigger_at = draw_ms(&mut rng, self.config.trigger_delay_ms);
            self.schedule(now, trigger_at, TimerAction::Trigger);
        }
    }

    fn schedule(&mut self, now: Instant, delay_ms: u64, action: TimerAction) {
        self.timers.push(Scheduled {
            fire_at: now + Duration::from_millis(delay_ms),
            generation: self.generation,
            action,
        });
    }

    fn cancel_pending(&mut self) {
        self.timers.clear();
    }
}

fn draw_ms<R: Rng>(rng: &mut R, range: (u64, u64)) -> u64 {
    let (lo, hi) = if range.0 <= range.1 {
        (range.0, range.1)
    } else {
        (range.1, range.0)
    };
    rng.gen_range(lo..=hi)
}
