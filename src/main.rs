use std::fs;
use std::io;
use std::path::Path;
use std::sync::mpsc;
use std::time::{Duration, Instant};

use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::prelude::*;
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use knockout_predictor::bracket::BracketState;
use knockout_predictor::config::AppConfig;
use knockout_predictor::model::{MatchId, Slot, abbreviate_team, display_team, equal_team, is_blank};
use knockout_predictor::persist;
use knockout_predictor::provider::spawn_provider;
use knockout_predictor::state::{
    AppState, Delta, InputMode, LoadStatus, ProviderCommand, apply_delta,
};
use knockout_predictor::submit::plan_official_advances;

const CARD_ROWS: u16 = 4;
const GAP_ROWS: u16 = 1;

struct App {
    state: AppState,
    should_quit: bool,
    cmd_tx: Option<mpsc::Sender<ProviderCommand>>,
    script_configured: bool,
}

impl App {
    fn new(cfg: &AppConfig, cmd_tx: Option<mpsc::Sender<ProviderCommand>>) -> Self {
        let mut state = AppState::new(cfg.layout, cfg.propagation);
        state.pending_draft = persist::load_draft(&cfg.draft_key());
        state.status = LoadStatus::Loading;
        Self {
            state,
            should_quit: false,
            cmd_tx,
            script_configured: cfg.script_url.is_some(),
        }
    }

    fn on_key(&mut self, key: KeyEvent) {
        if self.state.input_mode == InputMode::EditingUsername {
            match key.code {
                KeyCode::Enter | KeyCode::Esc => self.state.input_mode = InputMode::Normal,
                KeyCode::Backspace => {
                    self.state.username.pop();
                }
                KeyCode::Char(c) => self.state.username.push(c),
                _ => {}
            }
            return;
        }

        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('j') | KeyCode::Down => self.state.select_next(),
            KeyCode::Char('k') | KeyCode::Up => self.state.select_prev(),
            KeyCode::Char('h') | KeyCode::Left => self.state.select_left(),
            KeyCode::Char('l') | KeyCode::Right => self.state.select_right(),
            KeyCode::Char('a') | KeyCode::Char('A') => {
                self.state.pick_selected(Slot::A);
            }
            KeyCode::Char('b') | KeyCode::Char('B') => {
                self.state.pick_selected(Slot::B);
            }
            KeyCode::Char('c') => self.state.clear_picks(),
            KeyCode::Char('n') => self.state.input_mode = InputMode::EditingUsername,
            KeyCode::Char('s') => self.submit(),
            KeyCode::Char('y') => self.sync_bracket(),
            KeyCode::Char('p') => self.push_official_advances(),
            KeyCode::Char('r') => {
                self.send(ProviderCommand::FetchMatches, "Refresh");
                self.send(ProviderCommand::FetchLeaderboard, "Leaderboard refresh");
            }
            KeyCode::Char('?') => self.state.help_overlay = !self.state.help_overlay,
            KeyCode::Esc => self.state.help_overlay = false,
            _ => {}
        }
    }

    fn submit(&mut self) {
        if self.state.submitting {
            self.state.push_log("[INFO] Submit already in progress");
            return;
        }
        let submission = self.state.submission();
        if let Err(err) = submission.validate() {
            self.state.push_log(format!("[WARN] {err}"));
            return;
        }
        if !self.script_configured {
            self.state.push_log("[WARN] SCRIPT_URL not set");
            return;
        }
        if self.send(ProviderCommand::Submit(submission), "Submit") {
            self.state.submitting = true;
        }
    }

    fn sync_bracket(&mut self) {
        if !self.script_configured {
            self.state.push_log("[WARN] SCRIPT_URL not set");
            return;
        }
        if self.send(ProviderCommand::SyncBracket, "Sync") {
            self.state.syncing = true;
        }
    }

    fn push_official_advances(&mut self) {
        if !self.script_configured {
            self.state.push_log("[WARN] SCRIPT_URL not set");
            return;
        }
        let bracket = &self.state.bracket;
        let mutations = plan_official_advances(bracket.records(), bracket.graph());
        let count = mutations.len();
        if self.send(ProviderCommand::PushOfficialAdvances(mutations), "Advance push") {
            self.state.syncing = true;
            self.state.push_log(format!("[INFO] Pushing {count} official advances"));
        }
    }

    fn send(&mut self, cmd: ProviderCommand, what: &str) -> bool {
        let Some(tx) = &self.cmd_tx else {
            self.state.push_log(format!("[INFO] {what} unavailable"));
            return false;
        };
        if tx.send(cmd).is_err() {
            self.state.push_log(format!("[WARN] {what} request failed"));
            return false;
        }
        self.state.push_log(format!("[INFO] {what} request sent"));
        true
    }
}

fn main() -> io::Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");

    let cfg = match AppConfig::from_env() {
        Ok(cfg) => cfg,
        Err(err) => {
            eprintln!("error: {err:#}");
            std::process::exit(2);
        }
    };
    let _log_guard = init_tracing(&cfg.log_dir);
    info!("knockout predictor starting");

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = ratatui::backend::CrosstermBackend::new(stdout);
    let mut terminal = ratatui::Terminal::new(backend)?;

    let (tx, rx) = mpsc::channel();
    let (cmd_tx, cmd_rx) = mpsc::channel();
    spawn_provider(cfg.clone(), tx, cmd_rx);

    let mut app = App::new(&cfg, Some(cmd_tx));
    let res = run_app(&mut terminal, &mut app, rx);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = persist::save_draft(&cfg.draft_key(), &app.state.draft()) {
        warn!("could not save draft: {err:#}");
    }
    if let Err(err) = res {
        eprintln!("error: {err}");
    }
    Ok(())
}

fn init_tracing(log_dir: &Path) -> Option<WorkerGuard> {
    fs::create_dir_all(log_dir).ok()?;
    let file_appender = tracing_appender::rolling::daily(log_dir, "knockout_predictor.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(non_blocking)
        .with_ansi(false)
        .try_init()
        .ok()?;
    Some(guard)
}

fn run_app<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    rx: mpsc::Receiver<Delta>,
) -> io::Result<()> {
    let tick_rate = Duration::from_millis(250);
    let mut last_tick = Instant::now();

    loop {
        while let Ok(delta) = rx.try_recv() {
            apply_delta(&mut app.state, delta);
        }

        terminal.draw(|f| ui(f, app))?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or(Duration::ZERO);
        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    app.on_key(key);
                }
            }
        }

        if last_tick.elapsed() >= tick_rate {
            last_tick = Instant::now();
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

fn ui(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2),
            Constraint::Min(1),
            Constraint::Length(5),
            Constraint::Length(2),
        ])
        .split(frame.size());

    let header = Paragraph::new(header_text(&app.state))
        .block(Block::default().borders(Borders::BOTTOM));
    frame.render_widget(header, chunks[0]);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(40), Constraint::Length(34)])
        .split(chunks[1]);
    render_bracket(frame, body[0], &app.state);
    render_sidebar(frame, body[1], &app.state);

    let console = Paragraph::new(console_text(&app.state))
        .block(Block::default().title("Console").borders(Borders::ALL));
    frame.render_widget(console, chunks[2]);

    let footer = Paragraph::new(footer_text(&app.state))
        .block(Block::default().borders(Borders::TOP));
    frame.render_widget(footer, chunks[3]);

    if app.state.help_overlay {
        let area = frame.size();
        render_help_overlay(frame, area);
    }
}

fn header_text(state: &AppState) -> String {
    let status = match &state.status {
        LoadStatus::Idle => "idle".to_string(),
        LoadStatus::Loading => "loading…".to_string(),
        LoadStatus::Loaded { at } => format!("updated {at}"),
        LoadStatus::Failed(_) => "could not load".to_string(),
    };
    let mut flags = Vec::new();
    if state.submitting {
        flags.push("submitting");
    }
    if state.syncing {
        flags.push("syncing");
    }
    format!(
        "KNOCKOUT PREDICTOR | {} matches | {} picks | {status} {}",
        state.bracket.records().len(),
        state.bracket.picks().len(),
        flags.join(" ")
    )
}

fn footer_text(state: &AppState) -> String {
    match state.input_mode {
        InputMode::EditingUsername => "Type your name | Enter/Esc Done".to_string(),
        InputMode::Normal => {
            "h/j/k/l Move | a/b Pick | c Clear | n Name | s Submit | y Sync | p Push results | r Refresh | ? Help | q Quit".to_string()
        }
    }
}

fn render_bracket(frame: &mut Frame, area: Rect, state: &AppState) {
    let block = Block::default().title("Bracket").borders(Borders::ALL);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let bracket = &state.bracket;
    if bracket.is_empty() {
        let msg = match &state.status {
            LoadStatus::Failed(err) => format!("Could not load bracket.\n{err}"),
            LoadStatus::Loading => "Loading bracket…".to_string(),
            _ => "No matches yet".to_string(),
        };
        let empty = Paragraph::new(msg).style(Style::default().fg(Color::DarkGray));
        frame.render_widget(empty, inner);
        return;
    }

    let layout = bracket.layout();
    let columns = layout.columns.len().max(1) as u32;
    let areas = Layout::default()
        .direction(Direction::Horizontal)
        .constraints((0..columns).map(|_| Constraint::Ratio(1, columns)))
        .split(inner);

    let spacing = bracket.layout_config().spacing().max(1.0);
    let row_of = |y: f32| ((y / spacing) * f32::from(CARD_ROWS + GAP_ROWS)).round() as u16;

    let visible = inner.height.saturating_sub(1);
    let scroll = state
        .selected
        .and_then(|id| layout.position(id))
        .map(|p| row_of(p.y) + CARD_ROWS)
        .map(|bottom| bottom.saturating_sub(visible))
        .unwrap_or(0);

    for (col, spec) in layout.columns.iter().enumerate() {
        let Some(col_area) = areas.get(col).copied() else {
            continue;
        };
        let title = Paragraph::new(spec.label.clone())
            .style(Style::default().add_modifier(Modifier::BOLD))
            .alignment(Alignment::Center);
        frame.render_widget(
            title,
            Rect {
                height: 1,
                ..col_area
            },
        );

        for id in layout.column_matches(col) {
            let Some(pos) = layout.position(id) else {
                continue;
            };
            let Some(top) = row_of(pos.y).checked_sub(scroll) else {
                continue;
            };
            if top + CARD_ROWS > visible {
                continue;
            }
            let card_area = Rect {
                x: col_area.x,
                y: col_area.y + 1 + top,
                width: col_area.width,
                height: CARD_ROWS,
            };
            render_card(frame, card_area, bracket, id, state.selected == Some(id));
        }
    }
}

fn render_card(frame: &mut Frame, area: Rect, bracket: &BracketState, id: MatchId, selected: bool) {
    let border = if selected {
        Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    let block = Block::default()
        .title(format!("#{id}"))
        .borders(Borders::ALL)
        .border_style(border);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let lines: Vec<Line> = [Slot::A, Slot::B]
        .into_iter()
        .map(|slot| team_line(bracket, id, slot))
        .collect();
    frame.render_widget(Paragraph::new(lines), inner);
}

fn team_line(bracket: &BracketState, id: MatchId, slot: Slot) -> Line<'static> {
    let team = bracket
        .participants(id)
        .map(|p| p.get(slot).to_string())
        .unwrap_or_default();
    let winner = bracket
        .record(id)
        .map(|r| r.official_winner.as_str())
        .unwrap_or("");
    let pick = bracket.pick(id);

    let (marker, style) = if !is_blank(winner) && equal_team(winner, &team) {
        ("✓", Style::default().fg(Color::Green).add_modifier(Modifier::BOLD))
    } else if pick.is_some_and(|p| equal_team(p, &team)) {
        ("▶", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
    } else if is_blank(&team) || pick.is_some() || !is_blank(winner) {
        (" ", Style::default().fg(Color::DarkGray))
    } else {
        (" ", Style::default())
    };
    let text = format!(
        "{marker} {:<3} {}",
        abbreviate_team(&team),
        display_team(&team)
    );
    Line::styled(text, style)
}

fn render_sidebar(frame: &mut Frame, area: Rect, state: &AppState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(5), Constraint::Min(1)])
        .split(area);

    let cursor = if state.input_mode == InputMode::EditingUsername {
        "_"
    } else {
        ""
    };
    let selected = state
        .selected_record()
        .map(|r| format!("#{} {}", r.id, r.round))
        .unwrap_or_else(|| "-".to_string());
    let you = Paragraph::new(format!(
        "Name: {}{cursor}\nPicks: {}\nSelected: {selected}",
        state.username,
        state.bracket.picks().len()
    ))
    .block(Block::default().title("You").borders(Borders::ALL));
    frame.render_widget(you, chunks[0]);

    let board = Paragraph::new(state.leaderboard.lines().join("\n"))
        .block(Block::default().title("Leaderboard").borders(Borders::ALL));
    frame.render_widget(board, chunks[1]);
}

fn console_text(state: &AppState) -> String {
    if state.logs.is_empty() {
        return "No alerts yet".to_string();
    }
    let skip = state.logs.len().saturating_sub(3);
    state
        .logs
        .iter()
        .skip(skip)
        .cloned()
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_help_overlay(frame: &mut Frame, area: Rect) {
    let popup_area = centered_rect(60, 60, area);
    frame.render_widget(Clear, popup_area);

    let text = [
        "Knockout Predictor - Help",
        "",
        "Bracket:",
        "  h/j/k/l or arrows  Move between matches",
        "  a / b              Pick team in slot A / B (again to un-pick)",
        "  c                  Clear all picks",
        "",
        "Sheet:",
        "  n                  Edit your name",
        "  s                  Submit picks",
        "  y                  Ask the sheet script to sync the bracket",
        "  p                  Write official winners into later rounds",
        "  r                  Refresh bracket and leaderboard",
        "",
        "  ?                  Toggle help",
        "  q                  Quit (draft picks are kept)",
    ]
    .join("\n");

    let help = Paragraph::new(text)
        .block(Block::default().title("Help").borders(Borders::ALL))
        .style(Style::default());
    frame.render_widget(help, popup_area);
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1]);

    horizontal[1]
}
