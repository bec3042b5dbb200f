// Headless end-to-end session scenarios driven through the library surface,
// with deterministic timing (degenerate delay ranges, no flash coin-flip)
// and explicit instants instead of sleeps.

use reflex::leaderboard::{LeaderboardStore, SqliteLeaderboard};
use reflex::rank::RankOutcome;
use reflex::round::{RoundSignal, RoundState, TimingConfig};
use reflex::session::{Session, SessionPhase, SessionSignal};
use std::time::{Duration, Instant};

fn fixed_timing() -> TimingConfig {
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

fn play_round(session: &mut Session, start: Instant, react_ms: u64) -> Instant {
    let trigger = start + ms(1000);
    session.on_tick(trigger);
    let input = trigger + ms(react_ms);
    session.handle_input(input);
    let resume = input + ms(500);
    session.on_tick(resume);
    resume
}

#[test]
fn five_round_session_finalizes_with_rounded_average() {
    let mut session = Session::new(5, fixed_timing());
    let t0 = Instant::now();
    session.start(t0);

    let mut now = t0;
    for react in [180u64, 150, 220, 190, 160] {
        now = play_round(&mut session, now, react);
    }

    assert!(session.is_finished());
    assert_eq!(session.average_ms(), Some(180));
    assert_eq!(session.times().len(), 5);
}

#[test]
fn early_click_reuses_round_index_with_fresh_timers() {
    let mut session = Session::new(3, fixed_timing());
    let t0 = Instant::now();
    session.start(t0);

    let signals = session.handle_input(t0 + ms(400));
    assert!(signals.contains(&SessionSignal::Round(RoundSignal::EarlyClick)));
    assert_eq!(session.round_index(), 1);
    assert!(session.times().is_empty());

    // The original trigger deadline (t0 + 1000ms) passes silently during
    // the retry's waiting phase: the old timer set was cancelled.
    let signals = session.on_tick(t0 + ms(900));
    assert!(signals.contains(&SessionSignal::Round(RoundSignal::RoundStarted { index: 1 })));
    assert!(session.on_tick(t0 + ms(1000)).is_empty());
    assert_eq!(session.round_state(), RoundState::Waiting);

    // The retry schedules its own trigger 1000ms after the restart.
    let signals = session.on_tick(t0 + ms(1900));
    assert!(signals.contains(&SessionSignal::Round(RoundSignal::Triggered)));
}

#[test]
fn session_scores_then_previews_and_commits() {
    let store = SqliteLeaderboard::open_in_memory().unwrap();
    store.insert("ada", 160).unwrap();
    store.insert("bob", 210).unwrap();

    let mut session = Session::new(2, fixed_timing());
    let t0 = Instant::now();
    session.start(t0);
    let now = play_round(&mut session, t0, 170);
    play_round(&mut session, now, 190);

    assert!(session.is_finished());
    assert_eq!(session.average_ms(), Some(180));

    let preview = session.preview_rank(&store).unwrap();
    assert_eq!(
        preview,
        RankOutcome::Ranked {
            rank: 2,
            is_tied: false,
            id: None
        }
    );

    let confirmed = session.submit(&store, "eve").unwrap();
    match confirmed {
        RankOutcome::Ranked { rank, is_tied, id } => {
            assert_eq!(rank, 2);
            assert!(!is_tied);
            assert!(id.is_some());
        }
        RankOutcome::Unranked => panic!("expected a ranked confirmation"),
    }

    // Commit is one-shot per session.
    let again = session.submit(&store, "eve").unwrap();
    assert_eq!(confirmed, again);
    assert_eq!(store.query_ascending(10).unwrap().len(), 3);
}

#[test]
fn session_remains_playable_without_a_store() {
    let mut session = Session::new(1, fixed_timing());
    let t0 = Instant::now();
    session.start(t0);
    play_round(&mut session, t0, 230);

    assert!(session.is_finished());
    assert_eq!(session.average_ms(), Some(230));
    assert!(session.preview().is_none());

    session.start(Instant::now());
    assert_eq!(session.phase(), SessionPhase::Running);
}
