mod app;

use std::io;
use std::time::Duration;

use app::{format_clock, format_pct, format_volume, truncate, AppState, ConnectionStatus, ResultRow};
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState},
    Frame, Terminal,
};

#[tokio::main]
async fn main() -> io::Result<()> {
    let base_url = std::env::var("API_URL").unwrap_or_else(|_| "http://localhost:5000".to_string());

    // fetch-data walks every symbol with a politeness delay; allow for it.
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(60))
        .build()
        .map_err(io::Error::other)?;

    let mut app = AppState::new(base_url);
    app.refresh(&client).await;

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut table_state = TableState::default();

    let result = run_loop(&mut terminal, &mut app, &client, &mut table_state).await;

    // The terminal is restored even when the loop failed.
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}

async fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut AppState,
    client: &reqwest::Client,
    table_state: &mut TableState,
) -> io::Result<()> {
    let refresh_interval = Duration::from_secs(2);
    let mut last_tick = std::time::Instant::now();

    loop {
        terminal.draw(|f| render(f, app, table_state))?;

        let timeout = refresh_interval
            .checked_sub(last_tick.elapsed())
            .unwrap_or(Duration::ZERO);

        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    match key.code {
                        KeyCode::Char('q') | KeyCode::Char('Q') => return Ok(()),
                        KeyCode::Char('r') | KeyCode::Char('R') => {
                            app.refresh(client).await;
                            last_tick = std::time::Instant::now();
                        }
                        KeyCode::Char('f') | KeyCode::Char('F') => {
                            app.trigger(client, "fetch-data").await;
                            table_state.select(None);
                            last_tick = std::time::Instant::now();
                        }
                        KeyCode::Char('a') | KeyCode::Char('A') => {
                            app.trigger(client, "analyze").await;
                            table_state.select(if app.results.is_empty() { None } else { Some(0) });
                            last_tick = std::time::Instant::now();
                        }
                        KeyCode::Down | KeyCode::Char('j') => {
                            let max = app.results.len().saturating_sub(1);
                            let next = table_state.selected().map_or(0, |i| (i + 1).min(max));
                            table_state.select(Some(next));
                        }
                        KeyCode::Up | KeyCode::Char('k') => {
                            let prev = table_state.selected().map_or(0, |i| i.saturating_sub(1));
                            table_state.select(Some(prev));
                        }
                        _ => {}
                    }
                }
            }
        }

        if last_tick.elapsed() >= refresh_interval {
            app.refresh(client).await;
            last_tick = std::time::Instant::now();
        }
    }
}

fn render(f: &mut Frame, app: &AppState, table_state: &mut TableState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // header
            Constraint::Min(0),    // body
            Constraint::Length(1), // footer
        ])
        .split(f.area());

    render_header(f, app, chunks[0]);
    render_body(f, app, table_state, chunks[1]);
    render_footer(f, app, chunks[2]);
}

fn render_header(f: &mut Frame, app: &AppState, area: Rect) {
    let (status_text, status_color) = match &app.status {
        ConnectionStatus::Connected => ("● online".to_string(), Color::Green),
        ConnectionStatus::Connecting => ("◌ waiting for API".to_string(), Color::Yellow),
        ConnectionStatus::Error(e) => (format!("✗ API: {}", truncate(e, 40)), Color::Red),
    };

    let source = app
        .health
        .last_fetch_source
        .clone()
        .or_else(|| app.health.source.clone())
        .unwrap_or_else(|| "—".to_string());

    let spans = vec![
        Span::styled(
            " NSE Momentum  ",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ),
        Span::styled(status_text, Style::default().fg(status_color)),
        Span::raw("  │  "),
        Span::styled(
            format!("{} stocks", app.stats.total_stocks),
            Style::default().fg(Color::White),
        ),
        Span::raw("  │  "),
        Span::styled(
            format!("{} trending", app.stats.trending_stocks),
            Style::default().fg(Color::White),
        ),
        Span::raw("  │  "),
        Span::styled(
            format!("top {:.2}", app.stats.top_score),
            Style::default().fg(Color::White),
        ),
        Span::raw("  │  "),
        Span::styled(format!("source: {source}"), Style::default().fg(Color::White)),
        Span::raw("  │  "),
        Span::styled(
            format!("updated {}", format_clock(&app.stats.last_update)),
            Style::default().fg(Color::DarkGray),
        ),
    ];

    let paragraph = Paragraph::new(Line::from(spans)).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray)),
    );
    f.render_widget(paragraph, area);
}

fn render_body(f: &mut Frame, app: &AppState, table_state: &mut TableState, area: Rect) {
    let halves = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(area);

    render_rankings(f, app, table_state, halves[0]);
    render_detail(f, app.selected(table_state.selected()), halves[1]);
}

fn render_rankings(f: &mut Frame, app: &AppState, state: &mut TableState, area: Rect) {
    let header_cells = ["#", "Symbol", "Price", "Price Δ", "Vol Δ", "Score"]
        .iter()
        .map(|h| Cell::from(*h).style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)));
    let header = Row::new(header_cells).height(1);

    let top = app.results.first().map_or(0.0, |r| r.momentum_score);
    let rows: Vec<Row> = app
        .results
        .iter()
        .enumerate()
        .map(|(i, r)| {
            // Colour relative to the leader; a zero score never leads.
            let score_color = if top > 0.0 && r.momentum_score >= top * 0.7 {
                Color::Green
            } else if top > 0.0 && r.momentum_score >= top * 0.4 {
                Color::Yellow
            } else {
                Color::Red
            };

            Row::new(vec![
                Cell::from(format!("{}", i + 1)).style(Style::default().fg(Color::DarkGray)),
                Cell::from(truncate(&r.symbol, 12)),
                Cell::from(format!("₹{:.2}", r.current_price)),
                Cell::from(format_pct(r.price_change_pct)).style(Style::default().fg(Color::Cyan)),
                Cell::from(format_pct(r.volume_change_pct)).style(Style::default().fg(Color::Cyan)),
                Cell::from(format!("{:.2}", r.momentum_score)).style(Style::default().fg(score_color)),
            ])
        })
        .collect();

    let title = if app.results.is_empty() {
        " RANKINGS (press f, then a) "
    } else {
        " RANKINGS "
    };

    let table = Table::new(
        rows,
        [
            Constraint::Length(3),
            Constraint::Min(10),
            Constraint::Length(11),
            Constraint::Length(9),
            Constraint::Length(10),
            Constraint::Length(10),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray))
            .title(Span::styled(
                title,
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            )),
    )
    .row_highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD));

    f.render_stateful_widget(table, area, state);
}

fn render_detail(f: &mut Frame, selected: Option<&ResultRow>, area: Rect) {
    let label = Style::default().fg(Color::DarkGray);
    let lines: Vec<Line> = match selected {
        None => vec![Line::from(Span::styled("Select a row with j/k", label))],
        Some(r) => vec![
            Line::from(Span::styled(
                r.symbol.clone(),
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            Line::from(vec![Span::styled("Observed      ", label), Span::raw(format_clock(&r.observed_at))]),
            Line::from(vec![Span::styled("Ref price     ", label), Span::raw(format!("₹{:.2}", r.reference_price))]),
            Line::from(vec![Span::styled("Current price ", label), Span::raw(format!("₹{:.2}", r.current_price))]),
            Line::from(vec![Span::styled("Price change  ", label), Span::raw(format_pct(r.price_change_pct))]),
            Line::from(vec![Span::styled("Ref volume    ", label), Span::raw(format_volume(r.reference_volume))]),
            Line::from(vec![Span::styled("Cur volume    ", label), Span::raw(format_volume(r.current_volume))]),
            Line::from(vec![Span::styled("Volume change ", label), Span::raw(format_pct(r.volume_change_pct))]),
            Line::from(vec![
                Span::styled("Score         ", label),
                Span::styled(
                    format!("{:.2}", r.momentum_score),
                    Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
                ),
            ]),
        ],
    };

    let paragraph = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray))
            .title(Span::styled(
                " DETAIL ",
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            )),
    );
    f.render_widget(paragraph, area);
}

fn render_footer(f: &mut Frame, app: &AppState, area: Rect) {
    let latency = match (app.health.quote_latency_p50_ms, app.health.quote_latency_p99_ms) {
        (Some(p50), Some(p99)) => format!("quotes p50 {p50:.0}ms p99 {p99:.0}ms"),
        _ => "quotes —".to_string(),
    };
    let fetches = format!(
        "fetches {} ({} failed)",
        app.health.fetch_count.unwrap_or(0),
        app.health.fetch_failures.unwrap_or(0),
    );
    let version = app.health.version.clone().unwrap_or_default();
    let message = app.last_message.clone().unwrap_or_default();

    let line = Line::from(vec![
        Span::styled(
            " f fetch  a analyze  r refresh  j/k select  q quit ",
            Style::default().fg(Color::DarkGray),
        ),
        Span::raw(" │ "),
        Span::styled(fetches, Style::default().fg(Color::DarkGray)),
        Span::raw(" │ "),
        Span::styled(latency, Style::default().fg(Color::DarkGray)),
        Span::raw(" │ "),
        Span::styled(
            format!("v{version}  {}s ago", app.last_refresh.elapsed().as_secs()),
            Style::default().fg(Color::DarkGray),
        ),
        Span::raw(" │ "),
        Span::styled(message, Style::default().fg(Color::Yellow)),
    ]);
    f.render_widget(Paragraph::new(line), area);
}
