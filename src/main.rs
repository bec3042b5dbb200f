pub mod config;
pub mod leaderboard;
pub mod palette;
pub mod profile;
pub mod rank;
pub mod recorder;
pub mod round;
pub mod runtime;
pub mod session;
pub mod ui;
pub mod util;

use crate::{
    config::{Config, ConfigStore, FileConfigStore},
    leaderboard::{Entry, LeaderboardStore, SqliteLeaderboard},
    profile::{FileProfileStore, Profile, ProfileStore},
    round::RoundSignal,
    runtime::{CrosstermEventSource, EventPump, GameEvent},
    session::{Session, SessionPhase, SessionSignal},
};
use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    event::{KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use std::{
    error::Error,
    io::{self, stdin},
    path::PathBuf,
    time::{Duration, Instant},
};

/// Cap on the event pump's wait when no round deadline is pending.
const MAX_IDLE_WAIT_MS: u64 = 100;

/// How many rows the leaderboard screen shows.
const DISPLAY_ROWS: usize = 10;

/// terminal reaction time trainer with fake-out flashes and a shared leaderboard
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "Measure your reaction time to a color change across a handful of rounds. \
Deceptive flashes punish anticipation; your session average ranks against a shared leaderboard."
)]
pub struct Cli {
    /// number of rounds per session
    #[clap(short = 'r', long)]
    rounds: Option<usize>,

    /// disable deceptive flashes
    #[clap(long)]
    no_flash: bool,

    /// player name to prefill for leaderboard submission
    #[clap(short = 'n', long)]
    name: Option<String>,

    /// alternate leaderboard database path
    #[clap(long)]
    db: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AppState {
    Playing,
    Results,
    Leaderboard,
}

#[derive(Debug)]
pub struct App {
    pub session: Session,
    pub state: AppState,
    pub store: Option<SqliteLeaderboard>,
    pub profile: Profile,
    profile_store: FileProfileStore,
    pub message: String,
    pub name_input: String,
    pub leaderboard_rows: Vec<Entry>,
    pub new_best: bool,
}

impl App {
    pub fn new(cli: Cli) -> Self {
        let mut cfg: Config = FileConfigStore::new().load();
        if let Some(rounds) = cli.rounds {
            cfg.target_rounds = rounds.max(1);
        }
        if cli.no_flash {
            cfg.timing.flash_probability = 0.0;
        }

        // A missing or broken store never blocks the game itself.
        let store = match &cli.db {
            Some(path) => SqliteLeaderboard::open(path).ok(),
            None => SqliteLeaderboard::new().ok(),
        };

        let profile_store = FileProfileStore::new();
        let profile = profile_store.load();
        let name_input = cli
            .name
            .clone()
            .or_else(|| profile.player_name.clone())
            .unwrap_or_default();

        Self {
            session: Session::new(cfg.target_rounds, cfg.timing),
            state: AppState::Playing,
            store,
            profile,
            profile_store,
            message: String::from("press space to start"),
            name_input,
            leaderboard_rows: Vec::new(),
            new_best: false,
        }
    }

    fn start_session(&mut self) {
        self.state = AppState::Playing;
        self.new_best = false;
        let signals = self.session.start(Instant::now());
        self.absorb(signals);
    }

    fn on_tick(&mut self) {
        let signals = self.session.on_tick(Instant::now());
        self.absorb(signals);
    }

    fn on_input(&mut self) {
        if self.session.phase() == SessionPhase::Idle {
            self.start_session();
        } else {
            let signals = self.session.handle_input(Instant::now());
            self.absorb(signals);
        }
    }

    fn absorb(&mut self, signals: Vec<SessionSignal>) {
        for signal in signals {
            match signal {
                SessionSignal::Round(RoundSignal::RoundStarted { .. }) => {
                    self.message = String::from("wait for the color change");
                }
                SessionSignal::Round(RoundSignal::Triggered) => {
                    self.message = String::from("now!");
                }
                SessionSignal::Round(RoundSignal::EarlyClick) => {
                    self.message = String::from("too soon! same round again");
                }
                SessionSignal::Round(RoundSignal::Scored { ms }) => {
                    self.message = format!("{ms} ms");
                }
                SessionSignal::Finished { average_ms } => self.finish(average_ms),
                _ => {}
            }
        }
    }

    fn finish(&mut self, average_ms: u32) {
        self.new_best = self.profile.record_average(average_ms);
        if self.new_best {
            let _ = self.profile_store.save(&self.profile);
        }

        // Preview is speculative; a store failure just leaves it unset and
        // the results screen shows "unranked".
        if let Some(store) = &self.store {
            let _ = self.session.preview_rank(store);
        }

        self.refresh_leaderboard();
        self.state = AppState::Results;
    }

    fn submit(&mut self) {
        let name = self.name_input.trim().to_string();
        if name.is_empty() {
            return;
        }
        let Some(store) = &self.store else { return };

        if let Ok(_outcome) = self.session.submit(store, &name) {
            self.profile.player_name = Some(name);
            let _ = self.profile_store.save(&self.profile);
            self.refresh_leaderboard();
        }
    }

    fn refresh_leaderboard(&mut self) {
        self.leaderboard_rows = self
            .store
            .as_ref()
            .and_then(|s| s.query_ascending(DISPLAY_ROWS).ok())
            .unwrap_or_default();
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(cli);
    let res = run_app(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    res
}

fn run_app<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<(), Box<dyn Error>> {
    let pump = EventPump::new(
        CrosstermEventSource::new(),
        Duration::from_millis(MAX_IDLE_WAIT_MS),
    );

    loop {
        terminal.draw(|f| f.render_widget(&*app, f.area()))?;

        // Block until input or the next round timer is due.
        match pump.next(Instant::now(), app.session.next_deadline()) {
            GameEvent::Tick => app.on_tick(),
            GameEvent::Resize => {}
            GameEvent::Key(key) => {
                if key.code == KeyCode::Esc
                    || (key.modifiers.contains(KeyModifiers::CONTROL)
                        && key.code == KeyCode::Char('c'))
                {
                    break;
                }

                match app.state {
                    AppState::Playing => {
                        if matches!(key.code, KeyCode::Char(' ') | KeyCode::Enter) {
                            app.on_input();
                        }
                    }
                    AppState::Results => match key.code {
                        KeyCode::Left => app.start_session(),
                        KeyCode::Right => {
                            app.refresh_leaderboard();
                            app.state = AppState::Leaderboard;
                        }
                        KeyCode::Enter => app.submit(),
                        KeyCode::Backspace => {
                            if !app.session.has_submitted() {
                                app.name_input.pop();
                            }
                        }
                        KeyCode::Char(c) => {
                            if !app.session.has_submitted()
                                && !c.is_control()
                                && app.name_input.chars().count() < 24
                            {
                                app.name_input.push(c);
                            }
                        }
                        _ => {}
                    },
                    AppState::Leaderboard => match key.code {
                        KeyCode::Left => app.start_session(),
                        KeyCode::Right | KeyCode::Backspace => app.state = AppState::Results,
                        _ => {}
                    },
                }
            }
        }
    }

    Ok(())
}
