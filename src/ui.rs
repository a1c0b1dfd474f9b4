use std::{
    io,
    sync::atomic::{AtomicBool, Ordering},
    thread,
    time::{Duration, Instant},
};
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    layout::{Alignment, Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    symbols::Marker,
    text::{Line, Span},
    widgets::{Axis, Block, BorderType, Borders, Chart, Dataset, GraphType, Paragraph},
    Frame, Terminal,
};

use crate::app::App;
use crate::error::AppError;
use crate::sink::RecordSink;
use crate::source::ByteSource;
use crate::util::{format_count, format_value};

// Width one "HH:MM:SS.mmm" label needs, with a gap
const X_LABEL_WIDTH: u16 = 14;

pub fn run<S: ByteSource, K: RecordSink>(
    app: &mut App<S, K>,
    running: &AtomicBool,
) -> Result<(), AppError> {
    // Initialize terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app_loop(&mut terminal, app, running);

    // Cleanup, even if the loop failed
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    res
}

fn run_app_loop<B: Backend, S: ByteSource, K: RecordSink>(
    terminal: &mut Terminal<B>,
    app: &mut App<S, K>,
    running: &AtomicBool,
) -> Result<(), AppError> {
    while running.load(Ordering::SeqCst) {
        if app.take_dirty() {
            terminal.draw(|f| render(f, app))?;
        }

        // Handle input until the next tick is due
        let timeout = app
            .tick_rate
            .checked_sub(app.last_tick.elapsed())
            .unwrap_or(Duration::ZERO);
        if event::poll(timeout)? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => match key.code {
                    KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => return Ok(()),
                    KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                        return Ok(())
                    }
                    _ => {}
                },
                Event::Resize(_, _) => app.mark_dirty(),
                _ => {}
            }
        }

        if app.last_tick.elapsed() >= app.tick_rate {
            app.on_tick()?;
            app.last_tick = Instant::now();
        }
    }
    Ok(())
}

fn render<S: ByteSource, K: RecordSink>(f: &mut Frame, app: &App<S, K>) {
    let main_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(6),    // Chart
            Constraint::Length(1), // Status bar
        ].as_ref())
        .split(f.size());

    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" Sensor data in real time [{}] ", app.source_name))
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(Color::Cyan));

    match &app.view {
        None => {
            let waiting = Paragraph::new("Waiting for data...")
                .alignment(Alignment::Center)
                .style(Style::default().fg(Color::DarkGray))
                .block(block);
            f.render_widget(waiting, main_chunks[0]);
        }
        Some(view) => {
            let max_labels = (main_chunks[0].width / X_LABEL_WIDTH).max(2) as usize;
            let x_labels: Vec<Span> = thin_labels(&view.x_labels, max_labels)
                .into_iter()
                .map(Span::from)
                .collect();

            let [y_min, y_max] = view.y_bounds;
            let y_labels = vec![
                Span::from(format_value(y_min)),
                Span::from(format_value((y_min + y_max) / 2.0)),
                Span::from(format_value(y_max)),
            ];

            let dataset = Dataset::default()
                .marker(Marker::Braille)
                .graph_type(GraphType::Line)
                .style(Style::default().fg(Color::Cyan))
                .data(&view.points);

            let chart = Chart::new(vec![dataset])
                .block(block)
                .x_axis(
                    Axis::default()
                        .title(Span::styled("Time", Style::default().fg(Color::DarkGray)))
                        .style(Style::default().fg(Color::DarkGray))
                        .bounds(view.x_bounds)
                        .labels(x_labels),
                )
                .y_axis(
                    Axis::default()
                        .title(Span::styled("Value", Style::default().fg(Color::DarkGray)))
                        .style(Style::default().fg(Color::DarkGray))
                        .bounds(view.y_bounds)
                        .labels(y_labels),
                );
            f.render_widget(chart, main_chunks[0]);
        }
    }

    // ============ Bottom Status Bar ============
    let stats = app.stats();
    let (len, capacity) = app.points();
    let mut status = vec![
        Span::styled(" SENSOR ", Style::default().bg(Color::White).fg(Color::Black).add_modifier(Modifier::BOLD)),
        Span::raw(" | "),
    ];
    if let Some(view) = &app.view {
        status.extend([
            Span::styled("LAST: ", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
            Span::raw(format!("{} ", format_value(view.latest))),
            Span::styled(
                format!("(min {} / max {})", format_value(view.min), format_value(view.max)),
                Style::default().fg(Color::DarkGray),
            ),
            Span::raw(" | "),
        ]);
    }
    status.extend([
        Span::raw(format!("points {}/{}", len, capacity)),
        Span::raw(" | "),
        Span::styled(format!("ok {}", format_count(stats.accepted)), Style::default().fg(Color::Green)),
        Span::raw(" "),
        Span::styled(
            format!("dropped {}", format_count(stats.dropped())),
            Style::default().fg(if stats.dropped() > 0 { Color::LightYellow } else { Color::DarkGray }),
        ),
        Span::raw(" | Press 'q' to quit"),
    ]);

    let status_bar = Paragraph::new(Line::from(status))
        .style(Style::default().bg(Color::Rgb(20, 20, 20)));
    f.render_widget(status_bar, main_chunks[1]);
}

/// Keeps at most `max` of the pre-sampled labels, evenly strided.
fn thin_labels(labels: &[(usize, String)], max: usize) -> Vec<String> {
    let stride = labels.len().div_ceil(max.max(1)).max(1);
    labels
        .iter()
        .step_by(stride)
        .map(|(_, text)| text.clone())
        .collect()
}

/// Runs the same tick loop without a terminal UI, printing each sample.
pub fn run_headless<S: ByteSource, K: RecordSink>(
    app: &mut App<S, K>,
    running: &AtomicBool,
) -> Result<(), AppError> {
    while running.load(Ordering::SeqCst) {
        app.last_tick = Instant::now();
        let tick = app.on_tick()?;
        for sample in app.recent(tick.accepted) {
            println!("{}", sample);
        }

        if let Some(rest) = app.tick_rate.checked_sub(app.last_tick.elapsed()) {
            thread::sleep(rest);
        }
    }
    Ok(())
}
