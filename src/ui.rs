use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Cell, Paragraph, Row, Table, Widget},
};

use crate::leaderboard::Entry;
use crate::palette::Rgb;
use crate::rank::{self, RankOutcome, LEADERBOARD_CAPACITY};
use crate::round::RoundState;
use crate::{App, AppState};

const HORIZONTAL_MARGIN: u16 = 5;

fn to_color(rgb: Rgb) -> Color {
    Color::Rgb(rgb.r, rgb.g, rgb.b)
}

/// Text shown for a rank outcome. A missing outcome (store failure or no
/// store at all) reads the same as a score outside the window; the two are
/// only distinguished in the API, not to the player.
fn rank_text(outcome: Option<&RankOutcome>) -> String {
    match outcome {
        Some(RankOutcome::Ranked {
            rank,
            is_tied: true,
            ..
        }) => format!("tied #{rank}"),
        Some(RankOutcome::Ranked { rank, .. }) => format!("#{rank}"),
        Some(RankOutcome::Unranked) | None => "unranked".to_string(),
    }
}

fn score_markers(times: &[u32], target: usize) -> String {
    (0..target)
        .map(|i| match times.get(i) {
            Some(ms) => format!("{ms}"),
            None => "·".to_string(),
        })
        .collect::<Vec<_>>()
        .join("  ")
}

impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        match self.state {
            AppState::Playing => render_playing(self, area, buf),
            AppState::Results => render_results(self, area, buf),
            AppState::Leaderboard => render_leaderboard(self, area, buf),
        }
    }
}

fn render_playing(app: &App, area: Rect, buf: &mut Buffer) {
    let bg = to_color(app.session.current_color());
    Block::default().style(Style::default().bg(bg)).render(area, buf);

    let bold_on_bg = Style::default().bg(bg).add_modifier(Modifier::BOLD);
    let dim_on_bg = Style::default().bg(bg).add_modifier(Modifier::DIM);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .constraints([
            Constraint::Min(1),
            Constraint::Length(1), // round counter
            Constraint::Length(1), // status message
            Constraint::Length(1), // padding
            Constraint::Length(1), // per-round markers
            Constraint::Min(1),
        ])
        .split(area);

    let round_line = if app.session.round_state() == RoundState::Idle {
        String::new()
    } else {
        format!(
            "round {}/{}",
            app.session.round_index(),
            app.session.target_rounds()
        )
    };

    Paragraph::new(Span::styled(round_line, dim_on_bg))
        .alignment(Alignment::Center)
        .render(chunks[1], buf);

    Paragraph::new(Span::styled(app.message.clone(), bold_on_bg))
        .alignment(Alignment::Center)
        .render(chunks[2], buf);

    Paragraph::new(Span::styled(
        score_markers(app.session.times(), app.session.target_rounds()),
        dim_on_bg,
    ))
    .alignment(Alignment::Center)
    .render(chunks[4], buf);
}

fn render_results(app: &App, area: Rect, buf: &mut Buffer) {
    let bold = Style::default().add_modifier(Modifier::BOLD);
    let dim = Style::default().add_modifier(Modifier::DIM);
    let italic = Style::default().add_modifier(Modifier::ITALIC);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(2)
        .constraints([
            Constraint::Min(1),
            Constraint::Length(1), // average
            Constraint::Length(1), // best
            Constraint::Length(1), // per-round times
            Constraint::Length(1), // padding
            Constraint::Length(1), // rank line
            Constraint::Length(1), // name entry / submitted line
            Constraint::Min(1),
            Constraint::Length(1), // legend
        ])
        .split(area);

    let average = app
        .session
        .average_ms()
        .map(|ms| format!("average: {ms} ms"))
        .unwrap_or_else(|| String::from("no rounds scored"));
    Paragraph::new(Span::styled(average, bold.fg(Color::Green)))
        .alignment(Alignment::Center)
        .render(chunks[1], buf);

    let best = match (app.profile.best_average_ms, app.new_best) {
        (Some(ms), true) => format!("new personal best: {ms} ms"),
        (Some(ms), false) => format!("personal best: {ms} ms"),
        (None, _) => String::new(),
    };
    Paragraph::new(Span::styled(best, dim))
        .alignment(Alignment::Center)
        .render(chunks[2], buf);

    Paragraph::new(Span::styled(
        score_markers(app.session.times(), app.session.target_rounds()),
        dim,
    ))
    .alignment(Alignment::Center)
    .render(chunks[3], buf);

    let rank_line = if app.session.has_submitted() {
        format!(
            "confirmed rank: {}",
            rank_text(app.session.confirmed())
        )
    } else {
        format!(
            "rank if submitted: {}",
            rank_text(app.session.preview())
        )
    };
    Paragraph::new(Span::styled(rank_line, bold.fg(Color::Magenta)))
        .alignment(Alignment::Center)
        .render(chunks[5], buf);

    let submit_line = if app.session.has_submitted() {
        Line::from(Span::styled(
            format!("submitted as {}", app.name_input),
            dim,
        ))
    } else {
        Line::from(vec![
            Span::styled("name: ", dim),
            Span::styled(app.name_input.clone(), bold),
            Span::styled("▏", bold),
        ])
    };
    Paragraph::new(submit_line)
        .alignment(Alignment::Center)
        .render(chunks[6], buf);

    Paragraph::new(Span::styled(
        "(enter)submit  (→)leaderboard  (←)play again  (esc)quit",
        italic,
    ))
    .alignment(Alignment::Center)
    .render(chunks[8], buf);
}

fn render_leaderboard(app: &App, area: Rect, buf: &mut Buffer) {
    let bold = Style::default().add_modifier(Modifier::BOLD);
    let italic = Style::default().add_modifier(Modifier::ITALIC);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(2)
        .constraints([
            Constraint::Length(1), // title
            Constraint::Length(1), // padding
            Constraint::Min(1),    // table
            Constraint::Length(1), // legend
        ])
        .split(area);

    Paragraph::new(Span::styled(
        format!("top {} of {}", app.leaderboard_rows.len(), LEADERBOARD_CAPACITY),
        bold,
    ))
    .alignment(Alignment::Center)
    .render(chunks[0], buf);

    render_leaderboard_table(&app.leaderboard_rows, chunks[2], buf);

    Paragraph::new(Span::styled(
        "(→)back  (←)play again  (esc)quit",
        italic,
    ))
    .alignment(Alignment::Center)
    .render(chunks[3], buf);
}

fn render_leaderboard_table(rows: &[Entry], area: Rect, buf: &mut Buffer) {
    if rows.is_empty() {
        Paragraph::new(Span::styled(
            "no scores yet",
            Style::default().add_modifier(Modifier::DIM),
        ))
        .alignment(Alignment::Center)
        .render(area, buf);
        return;
    }

    let table_rows: Vec<Row> = rank::with_ranks(rows)
        .into_iter()
        .map(|(rank, entry)| {
            Row::new(vec![
                Cell::from(format!("#{rank}")),
                Cell::from(entry.name.clone()),
                Cell::from(format!("{} ms", entry.score_ms)),
            ])
        })
        .collect();

    let table = Table::new(
        table_rows,
        [
            Constraint::Length(6),
            Constraint::Min(12),
            Constraint::Length(10),
        ],
    )
    .header(
        Row::new(vec!["rank", "name", "avg"])
            .style(Style::default().add_modifier(Modifier::BOLD | Modifier::DIM)),
    )
    .column_spacing(2);

    Widget::render(table, area, buf);
}
