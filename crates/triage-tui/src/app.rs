//! App — terminal event loop and the status footer.
//!
//! Architecture:
//! - A `tokio::mpsc` channel carries `AppMessage` events in from background
//!   tasks (keyboard reader, broadcast forwarder).
//! - The event loop draws a frame, then awaits the next message.
//! - Keystrokes map to `Command`s which flow out through `cmd_tx` to the
//!   dispatcher; the app itself never talks to the remote.

use std::io;

use ratatui::crossterm::{
    event::{self, Event, KeyEvent},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame, Terminal,
};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, warn};

use triage_core::command::Command;
use triage_core::model::PlayerState;
use triage_core::state::StateHandle;

use crate::UiMessage;

/// Everything the run loop reacts to.
enum AppMessage {
    Event(Event),
    StateUpdated(Option<PlayerState>),
    Status(String),
}

pub struct App {
    state: StateHandle,
    cmd_tx: mpsc::Sender<Command>,
    divisions: u32,
    /// Local copy of the shared state, refreshed on StateUpdated.
    player: Option<PlayerState>,
    /// Label of the last dispatched action, shown until the next one.
    status: Option<String>,
    should_quit: bool,
}

impl App {
    pub fn new(state: StateHandle, cmd_tx: mpsc::Sender<Command>, divisions: u32) -> Self {
        Self {
            state,
            cmd_tx,
            divisions,
            player: None,
            status: None,
            should_quit: false,
        }
    }

    pub async fn run(mut self, mut ui_rx: broadcast::Receiver<UiMessage>) -> anyhow::Result<()> {
        debug!("run(): enabling raw mode");
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        debug!("run(): terminal created, size={:?}", terminal.size());

        let (tx, mut rx) = mpsc::channel::<AppMessage>(64);

        // ── Background task: keyboard events ──────────────────────────────────
        let event_tx = tx.clone();
        tokio::task::spawn_blocking(move || loop {
            match event::read() {
                Ok(ev) => {
                    if event_tx.blocking_send(AppMessage::Event(ev)).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            }
        });

        // ── Background task: broadcast receiver (tracker/dispatcher → app) ────
        let bc_tx = tx.clone();
        let bc_state = self.state.clone();
        tokio::spawn(async move {
            loop {
                match ui_rx.recv().await {
                    Ok(msg) => {
                        let app_msg = match msg {
                            UiMessage::StateUpdated => {
                                AppMessage::StateUpdated(bc_state.snapshot().await)
                            }
                            UiMessage::Status(label) => AppMessage::Status(label),
                        };
                        if bc_tx.send(app_msg).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!("broadcast receiver lagged by {} messages", n);
                        // continue receiving; the next StateUpdated catches up
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        // Show whatever the tracker has already published.
        self.player = self.state.snapshot().await;

        // ── Main loop ─────────────────────────────────────────────────────────
        loop {
            terminal.draw(|f| self.draw(f))?;

            if self.should_quit {
                break;
            }

            match rx.recv().await {
                Some(msg) => self.handle_message(msg).await,
                None => break,
            }
        }

        // ── Teardown ──────────────────────────────────────────────────────────
        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        Ok(())
    }

    async fn handle_message(&mut self, msg: AppMessage) {
        match msg {
            AppMessage::Event(Event::Key(key)) => self.handle_key(key).await,
            AppMessage::Event(_) => {}
            AppMessage::StateUpdated(player) => self.player = player,
            AppMessage::Status(label) => self.status = Some(label),
        }
    }

    async fn handle_key(&mut self, key: KeyEvent) {
        if crate::keymap::is_quit(&key) {
            self.should_quit = true;
            return;
        }
        if let Some(command) = crate::keymap::command_for_key(&key, self.divisions) {
            if self.cmd_tx.send(command).await.is_err() {
                // Dispatcher gone; nothing left to control.
                self.should_quit = true;
            }
        }
    }

    // ── Rendering ─────────────────────────────────────────────────────────────

    fn draw(&self, f: &mut Frame) {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(8)])
            .split(f.area());

        let footer = Block::default().borders(Borders::ALL).title(" sptriage ");
        let inner = footer.inner(rows[1]);
        f.render_widget(footer, rows[1]);

        let lines = match &self.player {
            Some(player) => self.player_lines(player),
            None => vec![Line::from(Span::styled(
                "no active playback",
                Style::default().fg(Color::DarkGray),
            ))],
        };
        f.render_widget(Paragraph::new(lines), inner);
    }

    fn player_lines<'a>(&self, player: &'a PlayerState) -> Vec<Line<'a>> {
        let label = |s: &'static str| {
            Span::styled(
                format!("{s:>9}: "),
                Style::default().add_modifier(Modifier::BOLD),
            )
        };

        let playlist = match (&player.playlist_name, player.is_classified) {
            (Some(name), true) => Span::raw(name.as_str()),
            (Some(name), false) => Span::styled(
                format!("{name} (unclassified)"),
                Style::default().fg(Color::Yellow),
            ),
            (None, _) => Span::styled("-", Style::default().fg(Color::DarkGray)),
        };

        let mut lines = vec![
            Line::from(vec![label("Playlist"), playlist]),
            Line::from(vec![label("Artists"), Span::raw(player.artist_line())]),
            Line::from(vec![label("Track"), Span::raw(player.track_name.as_str())]),
            Line::from(vec![
                label("Album"),
                Span::raw(player.album_name.as_deref().unwrap_or("-")),
            ]),
            Line::from(vec![
                label("Status"),
                Span::styled(
                    self.status.as_deref().unwrap_or("watching").to_string(),
                    Style::default().fg(Color::Cyan),
                ),
            ]),
        ];

        lines.push(Line::from(vec![
            label("Keys"),
            Span::styled(
                format!(
                    "n)ext p)rev l)ike space 1-{} ←/→ q)uit",
                    self.divisions
                ),
                Style::default().fg(Color::DarkGray),
            ),
        ]));

        if player.is_primary_playlist && !player.sibling_playlists.is_empty() {
            lines.push(Line::from(vec![
                label("File to"),
                Span::styled(sibling_hints(player), Style::default().fg(Color::DarkGray)),
            ]));
        }

        lines
    }
}

/// Sorted "r)ock t)rash" style hint for the sibling keys.
fn sibling_hints(player: &PlayerState) -> String {
    let mut labels: Vec<&String> = player.sibling_playlists.keys().collect();
    labels.sort();
    labels
        .iter()
        .map(|label| match label.char_indices().nth(1) {
            Some((rest, _)) => format!("{}){}", &label[..rest], &label[rest..]),
            None => format!("{label})"),
        })
        .collect::<Vec<_>>()
        .join(" ")
}
