use std::io;
use std::time::{Duration, Instant};

use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::layout::{Constraint, Direction, Flex, Layout};
use ratatui::prelude::*;
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Bar, BarChart, BarGroup, Block, Borders, Clear, Paragraph};

use wygo_stats::config::Config;
use wygo_stats::dashboard::{ChartMetric, MatchReport, RankedChart};
use wygo_stats::live::SessionPhase;
use wygo_stats::logger;
use wygo_stats::records::{CounterField, Outcome};
use wygo_stats::state::{AppState, InputMode, Screen};
use wygo_stats::summary::SeasonSummary;

const CHART_COLORS: [Color; 6] = [
    Color::Blue,
    Color::Green,
    Color::Yellow,
    Color::Red,
    Color::Magenta,
    Color::Cyan,
];

struct App {
    state: AppState,
    should_quit: bool,
}

impl App {
    fn new(config: Config) -> Self {
        let mut state = AppState::new(config);
        state.reload();
        Self {
            state,
            should_quit: false,
        }
    }

    fn on_key(&mut self, key: KeyEvent) {
        if self.state.input != InputMode::Normal {
            match key.code {
                KeyCode::Enter => self.state.submit_input(),
                KeyCode::Esc => self.state.cancel_input(),
                KeyCode::Backspace => self.state.input_backspace(),
                KeyCode::Char(c) => self.state.input_char(c),
                _ => {}
            }
            return;
        }

        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('1') => self.state.screen = Screen::Dashboard,
            KeyCode::Char('2') => self.state.screen = Screen::Match,
            KeyCode::Char('3') => self.state.screen = Screen::Live,
            KeyCode::Char('?') => self.state.help_overlay = !self.state.help_overlay,
            KeyCode::Char('e') => self.state.export(),
            KeyCode::Char('R') => {
                self.state.reload();
                self.state.push_log("[INFO] Tables reloaded");
            }
            KeyCode::Esc => self.state.help_overlay = false,
            _ => match self.state.screen {
                Screen::Dashboard | Screen::Match => self.on_analysis_key(key),
                Screen::Live => self.on_live_key(key),
            },
        }
    }

    fn on_analysis_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('g') => self.state.toggle_per_game(),
            KeyCode::Char('f') => self.state.toggle_full_roster(),
            KeyCode::Char('j') | KeyCode::Down => self.state.select_next(),
            KeyCode::Char('k') | KeyCode::Up => self.state.select_prev(),
            KeyCode::Enter if self.state.screen == Screen::Dashboard => {
                self.state.screen = Screen::Match
            }
            _ => {}
        }
    }

    fn on_live_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('j') | KeyCode::Down => self.state.select_next(),
            KeyCode::Char('k') | KeyCode::Up => self.state.select_prev(),
            KeyCode::Char('l') | KeyCode::Right | KeyCode::Tab => self.state.column_next(),
            KeyCode::Char('h') | KeyCode::Left | KeyCode::BackTab => self.state.column_prev(),
            KeyCode::Char('+') | KeyCode::Char('=') => self.state.live_edit(1),
            KeyCode::Char('-') => self.state.live_edit(-1),
            KeyCode::Char('L') => self.state.live_cycle_line(),
            KeyCode::Char('p') => self.state.live_toggle_played(),
            KeyCode::Char('m') => self.state.begin_input(InputMode::MatchId),
            KeyCode::Char('o') => self.state.begin_input(InputMode::Opponent),
            KeyCode::Char('i') => self.state.begin_input(InputMode::NewPlayer),
            KeyCode::Char('r') => self.state.begin_input(InputMode::ResumeMatch),
            KeyCode::Char('n') => self.state.live_new_match(),
            KeyCode::Char('a') => self.state.toggle_auto_save(),
            KeyCode::Char('w') => self.state.live_flush(),
            _ => {}
        }
    }
}

fn main() -> io::Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
    let config = Config::load();
    let logger_ready = logger::init(config.log_level);

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = ratatui::backend::CrosstermBackend::new(stdout);
    let mut terminal = ratatui::Terminal::new(backend)?;

    let mut app = App::new(config);
    if let Err(err) = logger_ready {
        app.state.push_log(format!("[WARN] {err:#}"));
    }
    let res = run_app(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        eprintln!("error: {err}");
    }
    Ok(())
}

fn run_app<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> io::Result<()> {
    let tick_rate = Duration::from_millis(250);
    let mut last_tick = Instant::now();

    loop {
        app.state.drain_log_records();
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
        .style(Style::default().add_modifier(Modifier::BOLD))
        .block(Block::default().borders(Borders::BOTTOM));
    frame.render_widget(header, chunks[0]);

    match app.state.screen {
        Screen::Dashboard => render_dashboard(frame, chunks[1], &app.state),
        Screen::Match => render_match(frame, chunks[1], &app.state),
        Screen::Live => render_live(frame, chunks[1], &app.state),
    }

    // Bordered pane: two rows go to the frame.
    let console_rows = usize::from(chunks[2].height.saturating_sub(2));
    let console = Paragraph::new(console_lines(&app.state, console_rows))
        .block(Block::default().title("Console").borders(Borders::ALL));
    frame.render_widget(console, chunks[2]);

    let footer = Paragraph::new(footer_text(&app.state))
        .block(Block::default().borders(Borders::TOP));
    frame.render_widget(footer, chunks[3]);

    if app.state.help_overlay {
        render_help_overlay(frame, frame.size());
    }
}

fn header_text(state: &AppState) -> String {
    let mode = if state.full_roster {
        format!("Top {}", state.config.full_n)
    } else {
        format!("Top {}", state.config.top_n)
    };
    let pm = if state.per_game { "PM/game" } else { "PM total" };
    match state.screen {
        Screen::Dashboard => format!("UHC WYGORAZZI | Season | {mode} | {pm}"),
        Screen::Match => format!(
            "UHC WYGORAZZI | Match {} | {mode} | {pm}",
            state.selected_match_id().unwrap_or("-")
        ),
        Screen::Live => format!(
            "UHC WYGORAZZI | Live | Match {} vs {} | {} | Auto-save {}",
            or_dash(state.live.match_id()),
            or_dash(state.live.opponent()),
            phase_label(state.live.phase()),
            if state.live.auto_save() { "on" } else { "off" }
        ),
    }
}

fn footer_text(state: &AppState) -> String {
    if state.input != InputMode::Normal {
        return format!(
            "{}: {}_   (Enter save, Esc cancel)",
            state.input.prompt(),
            state.input_buffer
        );
    }
    match state.screen {
        Screen::Dashboard => {
            "1 Season | 2 Match | 3 Live | g PM/game | f Full roster | e Export | R Reload | ? Help | q Quit".to_string()
        }
        Screen::Match => {
            "1 Season | 2 Match | 3 Live | j/k Match | g PM/game | f Full roster | e Export | ? Help | q Quit".to_string()
        }
        Screen::Live => {
            "j/k Player | h/l Column | +/- Edit | L Line | p Played | m/o Match/Opp | n New | w Save | a Auto | ? Help".to_string()
        }
    }
}

fn render_dashboard(frame: &mut Frame, area: Rect, state: &AppState) {
    let view = state.dashboard();
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(season_card_height(&view.seasons)),
            Constraint::Min(1),
        ])
        .split(area);

    let cards = Paragraph::new(season_text(&view.seasons))
        .block(Block::default().title("Seasons").borders(Borders::ALL));
    frame.render_widget(cards, rows[0]);

    render_chart_grid(frame, rows[1], &view.charts);
}

fn season_card_height(seasons: &[SeasonSummary]) -> u16 {
    (seasons.len().max(1) as u16).min(6) + 2
}

fn season_text(seasons: &[SeasonSummary]) -> String {
    if seasons.is_empty() {
        return "No match data".to_string();
    }
    seasons
        .iter()
        .map(|s| {
            format!(
                "{} {} | GP {} | GF {} ({:.2}) | GA {} ({:.2}) | W-D-L {}-{}-{}",
                or_dash(&s.season),
                or_dash(&s.league),
                s.games,
                s.goals_for,
                s.goals_for_avg,
                s.goals_against,
                s.goals_against_avg,
                s.wins,
                s.draws,
                s.losses
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_chart_grid(frame: &mut Frame, area: Rect, charts: &[RankedChart]) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area);
    let mut cells = Vec::with_capacity(6);
    for row in rows.iter() {
        let cols = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Ratio(1, 3),
                Constraint::Ratio(1, 3),
                Constraint::Ratio(1, 3),
            ])
            .split(*row);
        cells.extend(cols.iter().copied());
    }

    for (idx, (chart, cell)) in charts.iter().zip(cells).enumerate() {
        render_chart(frame, cell, chart, CHART_COLORS[idx % CHART_COLORS.len()]);
    }
}

fn render_chart(frame: &mut Frame, area: Rect, chart: &RankedChart, color: Color) {
    let block = Block::default()
        .title(chart.title.clone())
        .borders(Borders::ALL);
    if chart.entries.is_empty() {
        let empty = Paragraph::new("No data")
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        frame.render_widget(empty, area);
        return;
    }

    let bars: Vec<Bar> = chart
        .entries
        .iter()
        .map(|entry| {
            Bar::default()
                .label(entry.key.clone().into())
                .value(bar_length(chart.metric, entry.value))
                .text_value(chart.metric.format_value(entry.value))
                .style(Style::default().fg(color))
        })
        .collect();

    let mut widget = BarChart::default()
        .block(block)
        .data(BarGroup::default().bars(&bars))
        .direction(Direction::Horizontal)
        .bar_width(1)
        .bar_gap(0)
        .value_style(Style::default().fg(Color::Black).bg(color));
    if chart.metric.is_percent() {
        widget = widget.max(100);
    }
    frame.render_widget(widget, area);
}

/// Bars cannot go below zero; the printed value keeps the sign.
fn bar_length(metric: ChartMetric, value: f64) -> u64 {
    let scaled = match metric {
        ChartMetric::PerGame(_) => value * 100.0,
        _ => value,
    };
    scaled.round().max(0.0) as u64
}

fn render_match(frame: &mut Frame, area: Rect, state: &AppState) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(22), Constraint::Min(30)])
        .split(area);

    let list = Paragraph::new(match_list_text(state))
        .block(Block::default().title("Matches").borders(Borders::ALL));
    frame.render_widget(list, columns[0]);

    let Some(report) = state.match_report() else {
        let empty = Paragraph::new("No matches yet")
            .style(Style::default().fg(Color::DarkGray))
            .block(Block::default().title("Match").borders(Borders::ALL));
        frame.render_widget(empty, columns[1]);
        return;
    };

    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(8), Constraint::Min(1)])
        .split(columns[1]);
    let top = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(right[0]);

    let meta = Paragraph::new(match_meta_text(&report))
        .block(Block::default().title("Match").borders(Borders::ALL));
    frame.render_widget(meta, top[0]);

    let lines = Paragraph::new(roster_text(&report))
        .block(Block::default().title("Lines").borders(Borders::ALL));
    frame.render_widget(lines, top[1]);

    render_chart_grid(frame, right[1], &report.charts);
}

fn match_list_text(state: &AppState) -> String {
    if state.match_ids.is_empty() {
        return "No matches yet".to_string();
    }
    let visible = 40;
    let (start, end) = visible_range(state.match_selected, state.match_ids.len(), visible);
    state.match_ids[start..end]
        .iter()
        .enumerate()
        .map(|(offset, id)| {
            let prefix = if start + offset == state.match_selected { "> " } else { "  " };
            format!("{prefix}{id}")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn match_meta_text(report: &MatchReport) -> String {
    let Some(meta) = &report.meta else {
        return "No data for this match".to_string();
    };
    let date = meta
        .date
        .map(|d| d.format("%d.%m.%Y").to_string())
        .unwrap_or_else(|| "-".to_string());
    [
        format!("Id: {}", report.match_id),
        format!("Date: {date}"),
        format!("Opponent: {}", or_dash(&meta.opponent)),
        format!(
            "Score: {}-{} ({})",
            meta.goals_for,
            meta.goals_against,
            outcome_label(meta.outcome)
        ),
        format!("{} {}", or_dash(&meta.season), meta.league),
    ]
    .join("\n")
}

fn roster_text(report: &MatchReport) -> String {
    if report.lines.is_empty() {
        return "No line-up recorded".to_string();
    }
    report
        .lines
        .iter()
        .map(|group| {
            let label = if group.line.is_assigned() {
                format!("Line {}", group.line)
            } else {
                "No line".to_string()
            };
            format!("{label}: {}", group.players.join(", "))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_live(frame: &mut Frame, area: Rect, state: &AppState) {
    let block = Block::default().title("Live capture").borders(Borders::ALL);
    let inner_height = area.height.saturating_sub(3) as usize;

    let order = state.live.display_order();
    if order.is_empty() {
        let empty = Paragraph::new("No players. Press i to add one or set WYGO_ROSTER.")
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        frame.render_widget(empty, area);
        return;
    }

    let selected_field = state.selected_field();
    let mut lines = vec![live_header_line(selected_field)];
    let (start, end) = visible_range(state.live_selected, order.len(), inner_height.max(1));
    for (pos, idx) in order.iter().enumerate().take(end).skip(start) {
        let row = &state.live.rows()[*idx];
        let selected = pos == state.live_selected;
        let base = if selected {
            Style::default().fg(Color::White).bg(Color::DarkGray)
        } else {
            Style::default()
        };
        let mut spans = vec![
            Span::styled(format!("{:<16}", truncate(&row.name, 15)), base),
            Span::styled(format!("{:<7}", row.line.to_string()), base),
            Span::styled(format!("{:<4}", if row.played { "x" } else { "" }), base),
        ];
        for field in CounterField::ALL {
            let style = if selected && field == selected_field {
                base.fg(Color::Black).bg(Color::Yellow)
            } else {
                base
            };
            spans.push(Span::styled(format!("{:>5}", row.counter(field)), style));
        }
        lines.push(Line::from(spans));
    }

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn live_header_line(selected: CounterField) -> Line<'static> {
    let bold = Style::default().add_modifier(Modifier::BOLD);
    let mut spans = vec![
        Span::styled(format!("{:<16}", "Player"), bold),
        Span::styled(format!("{:<7}", "Line"), bold),
        Span::styled(format!("{:<4}", "P"), bold),
    ];
    for field in CounterField::ALL {
        let style = if field == selected {
            bold.fg(Color::Yellow)
        } else {
            bold
        };
        spans.push(Span::styled(format!("{:>5}", field.short_label()), style));
    }
    Line::from(spans)
}

fn visible_range(selected: usize, total: usize, visible: usize) -> (usize, usize) {
    let visible = visible.min(total);
    let start = selected.saturating_sub(visible / 2).min(total - visible);
    (start, start + visible)
}

/// The newest `rows` log lines, warnings highlighted.
fn console_lines(state: &AppState, rows: usize) -> Vec<Line<'_>> {
    if state.logs.is_empty() {
        return vec![Line::from("No messages yet")];
    }
    let skip = state.logs.len().saturating_sub(rows);
    state
        .logs
        .iter()
        .skip(skip)
        .map(|msg| {
            let style = if msg.starts_with("[WARN]") || msg.starts_with("[ERROR]") {
                Style::default().fg(Color::Yellow)
            } else {
                Style::default()
            };
            Line::styled(msg.as_str(), style)
        })
        .collect()
}

fn phase_label(phase: SessionPhase) -> &'static str {
    match phase {
        SessionPhase::Idle => "IDLE",
        SessionPhase::Active => "UNSAVED",
        SessionPhase::Flushed => "SAVED",
    }
}

fn outcome_label(outcome: Outcome) -> &'static str {
    match outcome {
        Outcome::Win => "win",
        Outcome::Loss => "loss",
        Outcome::Draw => "draw",
    }
}

fn or_dash(value: &str) -> &str {
    if value.trim().is_empty() { "-" } else { value }
}

fn truncate(value: &str, max: usize) -> String {
    value.chars().take(max).collect()
}

fn render_help_overlay(frame: &mut Frame, area: Rect) {
    let popup_area = centered_rect(60, 70, area);
    frame.render_widget(Clear, popup_area);

    let text = [
        "Wygorazzi Stats - Help",
        "",
        "Global:",
        "  1 / 2 / 3    Season / Match / Live",
        "  e            Export xlsx",
        "  R            Reload tables",
        "  ?            Toggle help",
        "  q            Quit",
        "",
        "Season & Match:",
        "  g            Plus-Minus per game",
        "  f            Top N / full roster",
        "  j/k or ↑/↓   Select match",
        "",
        "Live:",
        "  j/k  h/l     Player / column",
        "  + / -        Edit counter",
        "  L            Cycle line",
        "  p            Toggle played",
        "  m / o        Match id / opponent",
        "  i            Add player",
        "  n            New match",
        "  r            Resume saved match",
        "  w / a        Save now / auto-save",
    ]
    .join("\n");

    let help = Paragraph::new(text)
        .block(Block::default().title("Help").borders(Borders::ALL))
        .style(Style::default());
    frame.render_widget(help, popup_area);
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let [band] = Layout::vertical([Constraint::Percentage(percent_y)])
        .flex(Flex::Center)
        .areas(area);
    let [popup] = Layout::horizontal([Constraint::Percentage(percent_x)])
        .flex(Flex::Center)
        .areas(band);
    popup
}
