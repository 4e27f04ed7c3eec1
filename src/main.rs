use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyEventKind};
use tokio::sync::{mpsc, Mutex};

use mplex_away::actions::Action;
use mplex_away::app::App;
use mplex_away::config::{self, AutoAwayConfig};
use mplex_away::enable_auto_away;

/// How often the prompt is redrawn when nothing else happens
const REDRAW_INTERVAL: Duration = Duration::from_millis(500);

fn init_logging() -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(tracing::Level::INFO.into());

    // The terminal belongs to the UI, so log to a file when we can
    if let Some(path) = config::log_path() {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;
        }
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to open {}", path.display()))?;
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .with_writer(std::sync::Mutex::new(file))
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging()?;

    let settings = AutoAwayConfig::load()?;

    // Shared with the auto-away timer; held for every state change
    let app = Arc::new(Mutex::new(App::new()));

    let away = enable_auto_away(&settings, app.clone()).await;
    if away.is_none() {
        tracing::info!("auto-away inactive");
    }

    // Create event channel
    let (tx, mut rx) = mpsc::unbounded_channel::<Action>();

    // Initialize terminal
    let mut terminal = ratatui::init();

    // Spawn input handler; it stops once the receiver is gone
    let input_tx = tx;
    tokio::task::spawn_blocking(move || loop {
        match event::poll(Duration::from_millis(100)) {
            Ok(true) => match event::read() {
                Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => {
                    if input_tx.send(Action::KeyPress(key)).is_err() {
                        break;
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    let _ = input_tx.send(Action::Error(format!("Input: {}", e)));
                }
            },
            Ok(false) => {
                if input_tx.is_closed() {
                    break;
                }
            }
            Err(e) => {
                let _ = input_tx.send(Action::Error(format!("Input: {}", e)));
                break;
            }
        }
    });

    let mut redraw = tokio::time::interval(REDRAW_INTERVAL);

    // Main event loop
    let result = loop {
        {
            let mut app = app.lock().await;
            if let Err(e) = terminal.draw(|f| app.render(f)) {
                break Err(e.into());
            }
        }

        let action = tokio::select! {
            Some(action) = rx.recv() => action,
            _ = redraw.tick() => Action::Tick,
        };

        match app.lock().await.handle_action(action) {
            Ok(true) => break Ok(()),
            Ok(false) => {}
            Err(e) => break Err(e),
        }
    };

    // Restore terminal
    ratatui::restore();
    drop(rx);

    if let Some(away) = away {
        away.shutdown().await;
    }

    result
}
