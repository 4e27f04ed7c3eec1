use crossterm::event::KeyEvent;

/// Actions that can be dispatched through the application
#[derive(Debug, Clone)]
pub enum Action {
    /// A key was pressed
    KeyPress(KeyEvent),
    /// Periodic redraw, so background status changes show up
    Tick,
    /// An error occurred
    Error(String),
}
