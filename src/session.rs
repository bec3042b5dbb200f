use crate::leaderboard::{EntryId, LeaderboardError, LeaderboardStore};
use crate::palette::Rgb;
use crate::rank::{self, RankOutcome, LEADERBOARD_CAPACITY};
use crate::recorder::ScoreRecorder;
use crate::round::{RoundScheduler, RoundSignal, RoundState, TimingConfig};
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Idle,
    Running,
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionSignal {
    Round(RoundSignal),
    Finished { average_ms: u32 },
}

/// Orchestrates the round scheduler and score recorder across a fixed number
/// of rounds, then owns the leaderboard flow: preview rank, optional commit,
/// confirmed rank. The store handle is passed in by the caller; there is no
/// global leaderboard state.
#[derive(Debug)]
pub struct Session {
    scheduler: RoundScheduler,
    recorder: ScoreRecorder,
    target_rounds: usize,
    phase: SessionPhase,
    average_ms: Option<u32>,
    preview: Option<RankOutcome>,
    confirmed: Option<RankOutcome>,
    submitted_id: Option<EntryId>,
}

impl Session {
    pub fn new(target_rounds: usize, timing: TimingConfig) -> Self {
        Self {
            scheduler: RoundScheduler::new(timing),
            recorder: ScoreRecorder::new(),
            target_rounds,
            phase: SessionPhase::Idle,
            average_ms: None,
            preview: None,
            confirmed: None,
            submitted_id: None,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn is_finished(&self) -> bool {
        self.phase == SessionPhase::Finished
    }

    pub fn round_state(&self) -> RoundState {
        self.scheduler.state()
    }

    pub fn round_index(&self) -> usize {
        self.scheduler.round_index()
    }

    pub fn target_rounds(&self) -> usize {
        self.target_rounds
    }

    pub fn current_color(&self) -> Rgb {
        self.scheduler.current_color()
    }

    pub fn times(&self) -> &[u32] {
        self.recorder.times()
    }

    /// Earliest pending round deadline while the session runs; bounds the
    /// event pump's blocking wait.
    pub fn next_deadline(&self) -> Option<std::time::Instant> {
        if self.phase == SessionPhase::Running {
            self.scheduler.next_deadline()
        } else {
            None
        }
    }

    pub fn average_ms(&self) -> Option<u32> {
        self.average_ms
    }

    /// Last computed preview rank, if any.
    pub fn preview(&self) -> Option<&RankOutcome> {
        self.preview.as_ref()
    }

    /// Confirmed rank after a successful commit, if any.
    pub fn confirmed(&self) -> Option<&RankOutcome> {
        self.confirmed.as_ref()
    }

    pub fn has_submitted(&self) -> bool {
        self.submitted_id.is_some()
    }

    /// Begin a fresh session, discarding any previous results.
    pub fn start(&mut self, now: Instant) -> Vec<SessionSignal> {
        self.recorder = ScoreRecorder::new();
        self.phase = SessionPhase::Running;
        self.average_ms = None;
        self.preview = None;
        self.confirmed = None;
        self.submitted_id = None;
        self.scheduler.reset();
        let signals = self.scheduler.begin(now, false);
        self.absorb(signals, now)
    }

    /// Abandon the session without finalizing.
    pub fn reset(&mut self) {
        self.scheduler.reset();
        self.phase = SessionPhase::Idle;
    }

    pub fn handle_input(&mut self, now: Instant) -> Vec<SessionSignal> {
        if self.phase != SessionPhase::Running {
            return vec![];
        }
        let signals = self.scheduler.handle_input(now);
        self.absorb(signals, now)
    }

    pub fn on_tick(&mut self, now: Instant) -> Vec<SessionSignal> {
        if self.phase != SessionPhase::Running {
            return vec![];
        }
        let signals = self.scheduler.poll(now);
        self.absorb(signals, now)
    }

    fn absorb(&mut self, round_signals: Vec<RoundSignal>, now: Instant) -> Vec<SessionSignal> {
        let mut out = Vec::with_capacity(round_signals.len());
        for signal in round_signals {
            out.push(SessionSignal::Round(signal));
            match signal {
                RoundSignal::Scored { ms } => self.recorder.add(ms),
                RoundSignal::PauseOver { advance: false } => {
                    let retry = self.scheduler.begin(now, true);
                    out.extend(self.absorb(retry, now));
                }
                RoundSignal::PauseOver { advance: true } => {
                    if self.recorder.is_complete(self.target_rounds) {
                        self.finalize(&mut out);
                    } else {
                        let next = self.scheduler.begin(now, false);
                        out.extend(self.absorb(next, now));
                    }
                }
                _ => {}
            }
        }
        out
    }

    fn finalize(&mut self, out: &mut Vec<SessionSignal>) {
        self.scheduler.reset();
        self.phase = SessionPhase::Finished;
        self.average_ms = self.recorder.average();
        if let Some(average_ms) = self.average_ms {
            out.push(SessionSignal::Finished { average_ms });
        }
    }

    /// Speculative rank of the session average against the current top-C
    /// window, without committing anything.
    pub fn preview_rank(
        &mut self,
        store: &dyn LeaderboardStore,
    ) -> Result<RankOutcome, LeaderboardError> {
        let Some(average_ms) = self.average_ms else {
            return Ok(RankOutcome::Unranked);
        };
        let window = store.query_ascending(LEADERBOARD_CAPACITY)?;
        let outcome = rank::peek(&window, LEADERBOARD_CAPACITY, average_ms);
        self.preview = Some(outcome.clone());
        Ok(outcome)
    }

    /// Commit the session average under `name` and compute the confirmed
    /// rank. Only one insert happens per session: a repeat call re-confirms
    /// against a fresh window without inserting again, and a call after a
    /// successful confirmation returns that result unchanged.
    pub fn submit(
        &mut self,
        store: &dyn LeaderboardStore,
        name: &str,
    ) -> Result<RankOutcome, LeaderboardError> {
        let Some(average_ms) = self.average_ms else {
            return Ok(RankOutcome::Unranked);
        };

        if let Some(outcome) = &self.confirmed {
            return Ok(outcome.clone());
        }

        let id = match self.submitted_id {
            Some(id) => id,
            None => {
                let id = store.insert(name, average_ms)?;
                self.submitted_id = Some(id);
                id
            }
        };

        let window = store.query_ascending(LEADERBOARD_CAPACITY)?;
        let outcome = rank::confirm(&window, id, average_ms);
        self.confirmed = Some(outcome.clone());
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::leaderboard::{Entry, SqliteLeaderboard};
    use assert_matches::assert_matches;
    use std::time::{Duration, Instant};

    fn test_timing() -> TimingConfig {
        TimingConfig {
            flash_probability: 0.0,
            trigger_delay_ms: (1000, 1000),
            flash_delay_ms: (500, 500),
            flash_duration_ms: 300,
            post_flash_gap_ms: 700,
            post_flash_jitter_ms: 0,
            pause_ms: 500,
        }
    }

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    /// Drive one full round: wait for the trigger, react after `react_ms`,
    /// let the pause expire. Returns the new "now".
    fn play_round(session: &mut Session, start: Instant, react_ms: u64) -> Instant {
        let trigger = start + ms(1000);
        let signals = session.on_tick(trigger);
        assert!(signals.contains(&SessionSignal::Round(RoundSignal::Triggered)));

        let input = trigger + ms(react_ms);
        let signals = session.handle_input(input);
        assert!(signals.contains(&SessionSignal::Round(RoundSignal::Scored {
            ms: react_ms as u32
        })));

        let resume = input + ms(500);
        session.on_tick(resume);
        resume
    }

    #[test]
    fn test_full_session_averages_and_finalizes() {
        let mut session = Session::new(5, test_timing());
        let t0 = Instant::now();
        session.start(t0);

        let mut now = t0;
        for (i, react) in [180u64, 150, 220, 190, 160].iter().enumerate() {
            assert_eq!(session.round_index(), i + 1);
            now = play_round(&mut session, now, *react);
        }

        assert!(session.is_finished());
        assert_eq!(session.average_ms(), Some(180));
        assert_eq!(session.times(), &[180, 150, 220, 190, 160]);
        assert_eq!(session.round_state(), RoundState::Idle);
    }

    #[test]
    fn test_finished_signal_carries_average() {
        let mut session = Session::new(1, test_timing());
        let t0 = Instant::now();
        session.start(t0);

        session.on_tick(t0 + ms(1000));
        session.handle_input(t0 + ms(1250));
        let signals = session.on_tick(t0 + ms(1750));
        assert!(signals.contains(&SessionSignal::Finished { average_ms: 250 }));
    }

    #[test]
    fn test_early_click_retries_same_round() {
        let mut session = Session::new(5, test_timing());
        let t0 = Instant::now();
        session.start(t0);
        assert_eq!(session.round_index(), 1);

        let signals = session.handle_input(t0 + ms(200));
        assert!(signals.contains(&SessionSignal::Round(RoundSignal::EarlyClick)));
        assert!(session.times().is_empty());

        // Pause expires and the same round restarts with fresh timers.
        let signals = session.on_tick(t0 + ms(700));
        assert!(signals.contains(&SessionSignal::Round(RoundSignal::RoundStarted { index: 1 })));
        assert_eq!(session.round_index(), 1);
        assert_eq!(session.round_state(), RoundState::Waiting);
    }

    #[test]
    fn test_input_after_finish_is_ignored() {
        let mut session = Session::new(1, test_timing());
        let t0 = Instant::now();
        session.start(t0);
        play_round(&mut session, t0, 200);
        assert!(session.is_finished());

        assert!(session.handle_input(t0 + ms(5000)).is_empty());
        assert!(session.on_tick(t0 + ms(5000)).is_empty());
    }

    #[test]
    fn test_preview_rank_on_empty_leaderboard() {
        let store = SqliteLeaderboard::open_in_memory().unwrap();
        let mut session = Session::new(1, test_timing());
        let t0 = Instant::now();
        session.start(t0);
        play_round(&mut session, t0, 250);

        let outcome = session.preview_rank(&store).unwrap();
        assert_eq!(
            outcome,
            RankOutcome::Ranked {
                rank: 1,
                is_tied: false,
                id: None
            }
        );
        assert_eq!(session.preview(), Some(&outcome));
    }

    #[test]
    fn test_preview_before_finish_is_unranked() {
        let store = SqliteLeaderboard::open_in_memory().unwrap();
        let mut session = Session::new(5, test_timing());
        session.start(Instant::now());
        assert_eq!(session.preview_rank(&store).unwrap(), RankOutcome::Unranked);
    }

    #[test]
    fn test_submit_confirms_and_is_idempotent() {
        let store = SqliteLeaderboard::open_in_memory().unwrap();
        store.insert("ada", 150).unwrap();
        store.insert("bob", 300).unwrap();

        let mut session = Session::new(1, test_timing());
        let t0 = Instant::now();
        session.start(t0);
        play_round(&mut session, t0, 200);

        let first = session.submit(&store, "eve").unwrap();
        assert_matches!(
            first,
            RankOutcome::Ranked {
                rank: 2,
                is_tied: false,
                id: Some(_)
            }
        );

        // A second submit must not insert another row.
        let second = session.submit(&store, "eve").unwrap();
        assert_eq!(first, second);
        assert_eq!(store.query_ascending(10).unwrap().len(), 3);
    }

    #[test]
    fn test_submit_retries_confirmation_without_reinserting() {
        // A store that fails the first re-query after a successful insert.
        struct FlakyStore {
            inner: SqliteLeaderboard,
            fail_queries: std::cell::Cell<u32>,
        }
        impl LeaderboardStore for FlakyStore {
            fn query_ascending(&self, limit: usize) -> Result<Vec<Entry>, LeaderboardError> {
                if self.fail_queries.get() > 0 {
                    self.fail_queries.set(self.fail_queries.get() - 1);
                    return Err(LeaderboardError::Unavailable("down".into()));
                }
                self.inner.query_ascending(limit)
            }
            fn insert(&self, name: &str, score_ms: u32) -> Result<i64, LeaderboardError> {
                self.inner.insert(name, score_ms)
            }
        }

        let store = FlakyStore {
            inner: SqliteLeaderboard::open_in_memory().unwrap(),
            fail_queries: std::cell::Cell::new(1),
        };

        let mut session = Session::new(1, test_timing());
        let t0 = Instant::now();
        session.start(t0);
        play_round(&mut session, t0, 210);

        assert!(session.submit(&store, "eve").is_err());
        assert!(session.has_submitted());

        let outcome = session.submit(&store, "eve").unwrap();
        assert_matches!(outcome, RankOutcome::Ranked { rank: 1, .. });
        assert_eq!(store.inner.query_ascending(10).unwrap().len(), 1);
    }

    #[test]
    fn test_store_failure_degrades_without_breaking_session() {
        struct DownStore;
        impl LeaderboardStore for DownStore {
            fn query_ascending(&self, _limit: usize) -> Result<Vec<Entry>, LeaderboardError> {
                Err(LeaderboardError::Unavailable("down".into()))
            }
            fn insert(&self, _name: &str, _score_ms: u32) -> Result<i64, LeaderboardError> {
                Err(LeaderboardError::Unavailable("down".into()))
            }
        }

        let mut session = Session::new(1, test_timing());
        let t0 = Instant::now();
        session.start(t0);
        play_round(&mut session, t0, 190);

        assert!(session.preview_rank(&DownStore).is_err());
        assert!(session.submit(&DownStore, "eve").is_err());
        assert!(!session.has_submitted());

        // The game itself is unaffected: a new session starts cleanly.
        session.start(Instant::now());
        assert_eq!(session.phase(), SessionPhase::Running);
    }

    #[test]
    fn test_next_deadline_only_while_running() {
        let mut session = Session::new(1, test_timing());
        assert_eq!(session.next_deadline(), None);

        let t0 = Instant::now();
        session.start(t0);
        assert_eq!(session.next_deadline(), Some(t0 + ms(1000)));

        play_round(&mut session, t0, 200);
        assert!(session.is_finished());
        assert_eq!(session.next_deadline(), None);
    }

    #[test]
    fn test_reset_abandons_running_session() {
        let mut session = Session::new(5, test_timing());
        let t0 = Instant::now();
        session.start(t0);
        session.reset();

        assert_eq!(session.phase(), SessionPhase::Idle);
        assert_eq!(session.round_state(), RoundState::Idle);
        // The abandoned round's trigger never fires.
        assert!(session.on_tick(t0 + ms(1000)).is_empty());
    }

    #[test]
    fn test_start_clears_previous_results() {
        let store = SqliteLeaderboard::open_in_memory().unwrap();
        let mut session = Session::new(1, test_timing());
        let t0 = Instant::now();
        session.start(t0);
        play_round(&mut session, t0, 200);
        session.submit(&store, "eve").unwrap();

        session.start(Instant::now());
        assert_eq!(session.average_ms(), None);
        assert!(session.preview().is_none());
        assert!(session.confirmed().is_none());
        assert!(!session.has_submitted());
        assert!(session.times().is_empty());
    }
}
