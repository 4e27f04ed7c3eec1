use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph},
    Frame,
};

use crate::actions::Action;
use crate::presence::{truncate_note, unquote, PresenceHost, StatusCommand, UserStatus};

/// Lines of history kept in the prompt window
const MAX_HISTORY: usize = 200;

pub struct Theme {
    pub bg: Color,
    pub fg: Color,
    pub accent: Color,
    pub dim: Color,
    pub success: Color,
    pub warning: Color,
    pub error: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            bg: Color::Rgb(30, 30, 30),
            fg: Color::Rgb(220, 220, 220),
            accent: Color::Rgb(217, 119, 87),
            dim: Color::Rgb(100, 100, 100),
            success: Color::Rgb(80, 200, 120),
            warning: Color::Rgb(255, 193, 7),
            error: Color::Rgb(220, 53, 69),
        }
    }
}

/// Input mode for the application
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Command,
}

/// Prompt window state: our own presence plus the command line
pub struct App {
    /// Current presence status
    pub status: UserStatus,
    /// Current status note
    pub note: String,
    /// Messages shown in the prompt window
    pub history: Vec<String>,
    /// Current message to display (info or error)
    pub error_message: Option<String>,
    pub theme: Theme,
    /// Current input mode
    pub input_mode: InputMode,
    /// Text input buffer
    pub input_buffer: String,
}

impl App {
    pub fn new() -> Self {
        Self {
            status: UserStatus::Online,
            note: String::new(),
            history: Vec::new(),
            error_message: None,
            theme: Theme::default(),
            input_mode: InputMode::Normal,
            input_buffer: String::new(),
        }
    }

    /// Handle an action and return whether to quit
    pub fn handle_action(&mut self, action: Action) -> Result<bool> {
        match action {
            Action::KeyPress(key) => self.handle_key(key),
            Action::Tick => Ok(false),
            Action::Error(msg) => {
                self.error_message = Some(msg);
                Ok(false)
            }
        }
    }

    /// Execute a command line typed at the prompt. Returns whether to quit.
    pub fn execute_line(&mut self, line: &str) -> bool {
        let line = line.trim();
        let (name, args) = line.split_once(char::is_whitespace).unwrap_or((line, ""));

        match name {
            "/quit" | "/exit" => return true,
            "/status" => match StatusCommand::parse(line) {
                Ok(command) => self.run_status_command(&command),
                Err(e) => self.error_message = Some(e.to_string()),
            },
            "/note" => {
                let note = truncate_note(unquote(args.trim())).to_string();
                self.push_history(format!("* Note set to \"{}\"", note));
                self.note = note;
            }
            "" => {}
            other => self.error_message = Some(format!("Unknown command: {}", other)),
        }
        false
    }

    fn push_history(&mut self, line: String) {
        self.history.push(line);
        if self.history.len() > MAX_HISTORY {
            let excess = self.history.len() - MAX_HISTORY;
            self.history.drain(..excess);
        }
    }

    fn handle_key(&mut self, key: KeyEvent) -> Result<bool> {
        // Clear error message on any key press
        if self.error_message.is_some() && self.input_mode == InputMode::Normal {
            self.error_message = None;
        }

        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            return Ok(true);
        }

        match self.input_mode {
            InputMode::Normal => self.handle_normal_key(key),
            InputMode::Command => self.handle_command_key(key),
        }
    }

    fn handle_normal_key(&mut self, key: KeyEvent) -> Result<bool> {
        match key.code {
            KeyCode::Char('q') => return Ok(true),
            KeyCode::Char('/') | KeyCode::Char(':') | KeyCode::Enter => {
                self.input_mode = InputMode::Command;
                self.input_buffer.clear();
                self.input_buffer.push('/');
            }
            _ => {}
        }
        Ok(false)
    }

    fn handle_command_key(&mut self, key: KeyEvent) -> Result<bool> {
        match key.code {
            KeyCode::Enter => {
                let line = std::mem::take(&mut self.input_buffer);
                self.input_mode = InputMode::Normal;
                return Ok(self.execute_line(&line));
            }
            KeyCode::Esc => {
                self.input_buffer.clear();
                self.input_mode = InputMode::Normal;
            }
            KeyCode::Char(c) => self.input_buffer.push(c),
            KeyCode::Backspace => {
                self.input_buffer.pop();
                if self.input_buffer.is_empty() {
                    self.input_mode = InputMode::Normal;
                }
            }
            _ => {}
        }
        Ok(false)
    }

    fn status_color(&self) -> Color {
        match self.status {
            UserStatus::Online => self.theme.success,
            UserStatus::Away => self.theme.warning,
            UserStatus::Busy => self.theme.error,
        }
    }

    pub fn render(&mut self, frame: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Header
                Constraint::Min(0),    // History
                Constraint::Length(3), // Footer/input
            ])
            .split(frame.area());

        self.render_header(frame, chunks[0]);
        self.render_history(frame, chunks[1]);
        self.render_footer(frame, chunks[2]);
    }

    fn render_header(&self, frame: &mut Frame, area: Rect) {
        let title = Paragraph::new(Line::from(vec![
            Span::styled(
                " mplex-away ",
                Style::default()
                    .fg(self.theme.accent)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled("│ ", Style::default().fg(self.theme.dim)),
            Span::styled("● ", Style::default().fg(self.status_color())),
            Span::styled(self.status.as_str(), Style::default().fg(self.theme.fg)),
            Span::styled(
                if self.note.is_empty() {
                    String::new()
                } else {
                    format!(" │ {}", self.note)
                },
                Style::default().fg(self.theme.dim),
            ),
        ]))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .style(Style::default().bg(self.theme.bg))
                .border_style(Style::default().fg(self.theme.dim)),
        );
        frame.render_widget(title, area);
    }

    fn render_history(&self, frame: &mut Frame, area: Rect) {
        let visible = area.height.saturating_sub(2) as usize;
        let items: Vec<ListItem> = if self.history.is_empty() {
            vec![ListItem::new(Line::from(Span::styled(
                "  Type /status <online|away|busy> [\"note\"] to change your status.",
                Style::default().fg(self.theme.dim),
            )))]
        } else {
            self.history
                .iter()
                .skip(self.history.len().saturating_sub(visible))
                .map(|line| {
                    ListItem::new(Line::from(Span::styled(
                        line.as_str(),
                        Style::default().fg(self.theme.fg),
                    )))
                })
                .collect()
        };

        let list = List::new(items).block(
            Block::default()
                .title(" Prompt ")
                .borders(Borders::ALL)
                .style(Style::default().bg(self.theme.bg))
                .border_style(Style::default().fg(self.theme.dim)),
        );
        frame.render_widget(list, area);
    }

    fn render_footer(&self, frame: &mut Frame, area: Rect) {
        let content = if self.input_mode == InputMode::Command {
            Line::from(Span::styled(
                format!(" {}_", self.input_buffer),
                Style::default()
                    .fg(self.theme.accent)
                    .add_modifier(Modifier::BOLD),
            ))
        } else if let Some(ref msg) = self.error_message {
            Line::from(Span::styled(
                format!(" {} ", msg),
                Style::default().fg(self.theme.error),
            ))
        } else {
            Line::from(Span::styled(
                " q: Quit │ /: Command │ /status <online|away|busy> [\"note\"] │ /note \"text\" ",
                Style::default().fg(self.theme.dim),
            ))
        };

        let footer = Paragraph::new(content).block(
            Block::default()
                .borders(Borders::ALL)
                .style(Style::default().bg(self.theme.bg))
                .border_style(Style::default().fg(self.theme.dim)),
        );
        frame.render_widget(footer, area);
    }
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

impl PresenceHost for App {
    fn status(&self) -> UserStatus {
        self.status
    }

    fn note(&self) -> String {
        self.note.clone()
    }

    fn run_status_command(&mut self, command: &StatusCommand) {
        self.status = command.status;
        match &command.note {
            Some(note) => {
                self.note = note.clone();
                self.push_history(format!("* Status set to {}: {}", command.status, note));
            }
            None => self.push_history(format!("* Status set to {}", command.status)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> Action {
        Action::KeyPress(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn type_line(app: &mut App, text: &str) -> bool {
        app.handle_action(key(KeyCode::Char('/'))).unwrap();
        for c in text.chars().skip(1) {
            app.handle_action(key(KeyCode::Char(c))).unwrap();
        }
        app.handle_action(key(KeyCode::Enter)).unwrap()
    }

    #[test]
    fn test_status_command_from_keyboard() {
        let mut app = App::new();
        let quit = type_line(&mut app, "/status busy \"compiling\"");
        assert!(!quit);
        assert_eq!(app.status, UserStatus::Busy);
        assert_eq!(app.note, "compiling");
        assert_eq!(app.input_mode, InputMode::Normal);
        assert_eq!(app.history.last().unwrap(), "* Status set to busy: compiling");
    }

    #[test]
    fn test_status_without_note_keeps_note() {
        let mut app = App::new();
        app.note = "hello".to_string();
        assert!(!app.execute_line("/status away"));
        assert_eq!(app.status, UserStatus::Away);
        assert_eq!(app.note, "hello");
    }

    #[test]
    fn test_note_command() {
        let mut app = App::new();
        app.execute_line("/note \"out to lunch\"");
        assert_eq!(app.note, "out to lunch");
        assert_eq!(app.status, UserStatus::Online);
    }

    #[test]
    fn test_bad_commands_report_errors() {
        let mut app = App::new();
        app.execute_line("/status sleepy");
        assert_eq!(
            app.error_message.as_deref(),
            Some("invalid status: sleepy")
        );

        app.execute_line("/frobnicate");
        assert_eq!(
            app.error_message.as_deref(),
            Some("Unknown command: /frobnicate")
        );
        assert_eq!(app.status, UserStatus::Online);
    }

    #[test]
    fn test_quit() {
        let mut app = App::new();
        assert!(type_line(&mut app, "/quit"));
        assert!(app.handle_action(key(KeyCode::Char('q'))).unwrap());
    }

    #[test]
    fn test_escape_cancels_command() {
        let mut app = App::new();
        app.handle_action(key(KeyCode::Char('/'))).unwrap();
        app.handle_action(key(KeyCode::Char('x'))).unwrap();
        app.handle_action(key(KeyCode::Esc)).unwrap();
        assert_eq!(app.input_mode, InputMode::Normal);
        assert!(app.input_buffer.is_empty());
    }

    #[test]
    fn test_auto_away_uses_command_path() {
        let mut app = App::new();
        app.run_status_command(&StatusCommand::new(UserStatus::Away, "Detached from screen"));
        assert_eq!(app.status, UserStatus::Away);
        assert_eq!(
            app.history.last().unwrap(),
            "* Status set to away: Detached from screen"
        );
    }

    #[test]
    fn test_render_uses_theme_background() {
        use ratatui::backend::TestBackend;
        use ratatui::Terminal;

        let mut app = App::new();
        app.execute_line("/status busy \"compiling\"");

        let mut terminal = Terminal::new(TestBackend::new(60, 10)).unwrap();
        terminal.draw(|f| app.render(f)).unwrap();

        let buffer = terminal.backend().buffer();
        assert_eq!(buffer[(1u16, 1u16)].bg, app.theme.bg);
        assert_eq!(buffer[(5u16, 5u16)].bg, app.theme.bg);
        assert_eq!(buffer[(1u16, 8u16)].bg, app.theme.bg);
    }

    #[test]
    fn test_history_is_bounded() {
        let mut app = App::new();
        for i in 0..(MAX_HISTORY + 10) {
            app.execute_line(&format!("/note {}", i));
        }
        assert_eq!(app.history.len(), MAX_HISTORY);
        assert_eq!(app.history[0], "* Note set to \"10\"");
    }
}
