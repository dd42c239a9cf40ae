//! TUI module using ratatui.
//!
//! A single popup-style screen: URL input, length selector, and the summary
//! rendered in three labelled sections. Only one summarisation runs at a
//! time; quitting aborts the one in flight.

use crate::pipeline::{SummarizeError, Summarizer};
use crate::preferences::PreferenceError;
use crate::prompt::LengthPreference;
use crate::storage::PreferenceStore;
use crate::summary::Summary;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::layout::{Constraint, Layout};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use ratatui::{DefaultTerminal, Frame};
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::{JoinError, JoinHandle};
use tracing::warn;

const TICK: Duration = Duration::from_millis(100);
const EMPTY_SECTION: &str = "None identified.";

type Pending = JoinHandle<Result<Summary, SummarizeError>>;

/// What the body of the screen shows
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    Idle,
    Loading,
    Ready(Summary),
    Failed(String),
}

/// Effect requested by a key press
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    None,
    Submit(String),
    CycleLength(LengthPreference),
    Quit,
}

/// Screen state, independent of the terminal.
#[derive(Debug, Clone)]
pub struct App {
    pub input: String,
    pub length: LengthPreference,
    pub status: Status,
}

impl App {
    pub fn new(length: LengthPreference) -> Self {
        Self {
            input: String::new(),
            length,
            status: Status::Idle,
        }
    }

    /// Start from the stored length.
    ///
    /// An unreadable stored value is shown as a failure until the user picks
    /// a length with Tab, which overwrites it.
    pub fn with_stored_length(stored: Result<LengthPreference, PreferenceError>) -> Self {
        match stored {
            Ok(length) => Self::new(length),
            Err(err) => {
                warn!(error = %err, "stored summary length unreadable");
                let mut app = Self::new(LengthPreference::default());
                app.status = Status::Failed(format!("{err}. Press Tab to choose a length."));
                app
            }
        }
    }

    pub fn is_loading(&self) -> bool {
        self.status == Status::Loading
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> Action {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return Action::Quit;
        }

        match key.code {
            KeyCode::Esc => Action::Quit,
            KeyCode::Enter => {
                // The trigger stays disabled while a request is pending.
                if self.is_loading() {
                    return Action::None;
                }
                self.status = Status::Loading;
                Action::Submit(self.input.trim().to_string())
            }
            KeyCode::Tab => {
                self.length = self.length.next();
                Action::CycleLength(self.length)
            }
            KeyCode::Backspace => {
                self.input.pop();
                Action::None
            }
            KeyCode::Char(c) => {
                self.input.push(c);
                Action::None
            }
            _ => Action::None,
        }
    }

    /// Record the outcome of a finished summarisation task
    pub fn finish(&mut self, outcome: Result<Result<Summary, SummarizeError>, JoinError>) {
        self.status = match outcome {
            Ok(Ok(summary)) => Status::Ready(summary),
            Ok(Err(err)) => {
                warn!(kind = err.kind(), "summarisation failed");
                Status::Failed(err.to_string())
            }
            Err(err) => Status::Failed(format!("Summarisation stopped unexpectedly: {err}")),
        };
    }
}

/// Run the TUI until the user quits
pub async fn run<S>(summarizer: Arc<Summarizer<S>>) -> io::Result<()>
where
    S: PreferenceStore + Send + Sync + 'static,
{
    let mut app = App::with_stored_length(summarizer.length());

    let mut terminal = ratatui::init();
    let result = event_loop(&mut terminal, &mut app, summarizer).await;
    ratatui::restore();
    result
}

async fn event_loop<S>(
    terminal: &mut DefaultTerminal,
    app: &mut App,
    summarizer: Arc<Summarizer<S>>,
) -> io::Result<()>
where
    S: PreferenceStore + Send + Sync + 'static,
{
    let mut pending: Option<Pending> = None;

    loop {
        if pending.as_ref().is_some_and(|task| task.is_finished()) {
            if let Some(task) = pending.take() {
                app.finish(task.await);
            }
        }

        terminal.draw(|frame| draw(frame, app))?;

        if !event::poll(TICK)? {
            continue;
        }
        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        match app.handle_key(key) {
            Action::Submit(url) => {
                let summarizer = Arc::clone(&summarizer);
                let length = app.length;
                pending = Some(tokio::spawn(async move {
                    summarizer.summarize_url(&url, Some(length)).await
                }));
            }
            Action::CycleLength(length) => {
                if let Err(err) = summarizer.set_length(length) {
                    warn!(error = %err, "failed to persist summary length");
                }
            }
            Action::Quit => {
                if let Some(task) = pending.take() {
                    task.abort();
                }
                return Ok(());
            }
            Action::None => {}
        }
    }
}

fn draw(frame: &mut Frame, app: &App) {
    let [header, input, body, footer] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Length(3),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(frame.area());

    let title = Line::from(vec![
        Span::styled("PageBrain", Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(format!("  length: {}", app.length)),
    ]);
    frame.render_widget(Paragraph::new(title), header);

    let input_block = Block::default().borders(Borders::ALL).title(" URL ");
    frame.render_widget(Paragraph::new(app.input.as_str()).block(input_block), input);

    let body_block = Block::default().borders(Borders::ALL).title(" Summary ");
    frame.render_widget(
        Paragraph::new(body_lines(&app.status))
            .block(body_block)
            .wrap(Wrap { trim: false }),
        body,
    );

    let help = if app.is_loading() {
        "Esc quit"
    } else {
        "Enter summarise  Tab length  Esc quit"
    };
    frame.render_widget(
        Paragraph::new(help).style(Style::default().fg(Color::DarkGray)),
        footer,
    );
}

fn body_lines(status: &Status) -> Vec<Line<'_>> {
    match status {
        Status::Idle => vec![Line::styled(
            "Type a URL and press Enter.",
            Style::default().fg(Color::DarkGray),
        )],
        Status::Loading => vec![Line::styled(
            "Summarising...",
            Style::default().fg(Color::Yellow),
        )],
        Status::Failed(message) => vec![Line::styled(
            message.as_str(),
            Style::default().fg(Color::Red),
        )],
        Status::Ready(summary) => {
            let mut lines = Vec::new();
            push_list(&mut lines, "Key Points", &summary.key_points);
            lines.push(Line::default());
            push_list(&mut lines, "Action Items", &summary.action_items);
            lines.push(Line::default());
            lines.push(heading("Main Takeaway"));
            if summary.takeaway.is_empty() {
                lines.push(placeholder());
            } else {
                lines.extend(summary.takeaway.lines().map(Line::raw));
            }
            lines
        }
    }
}

fn push_list<'a>(lines: &mut Vec<Line<'a>>, label: &'a str, items: &'a [String]) {
    lines.push(heading(label));
    if items.is_empty() {
        lines.push(placeholder());
    }
    for item in items {
        lines.push(Line::raw(format!("  • {item}")));
    }
}

fn heading(label: &str) -> Line<'_> {
    Line::styled(
        label,
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
    )
}

fn placeholder() -> Line<'static> {
    Line::styled(
        EMPTY_SECTION,
        Style::default()
            .fg(Color::DarkGray)
            .add_modifier(Modifier::ITALIC),
    )
}
