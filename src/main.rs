mod app;
mod handlers;
mod ui;

use std::error::Error;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use app::{lock, App, ChatHost};
use chat_timestamps::{activate, Engine, RefreshConfig};
use chrono::Utc;
use clap::Parser;
use crossterm::{
    event::{self, Event as CEvent},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

/// Chat viewer with live <t:EPOCH:STYLE> timestamps.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Transcript with one `author: message` per line, shown as an extra channel
    file: Option<PathBuf>,

    /// Refresh period in milliseconds (overrides ~/.chat_timestamps.json)
    #[arg(long)]
    refresh_ms: Option<u64>,

    /// Locale such as en-US or de-DE (defaults to $LANG)
    #[arg(long)]
    locale: Option<String>,

    /// Write logs to this file (the terminal belongs to the UI)
    #[arg(long)]
    log: Option<PathBuf>,
}

/// Application events
enum AppEvent {
    Terminal(CEvent),
    Tick,
}

fn init_logging(path: Option<&Path>) -> Result<(), Box<dyn Error>> {
    let Some(path) = path else {
        return Ok(());
    };
    let file = std::fs::File::create(path)?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    init_logging(args.log.as_deref())?;

    let config = match args.refresh_ms {
        Some(ms) => RefreshConfig::with_period_ms(Some(ms)),
        None => RefreshConfig::load(),
    };
    let locale = args.locale.or_else(|| std::env::var("LANG").ok());
    let channels = App::load_channels(args.file.as_deref(), Utc::now())?;
    tracing::info!(
        "Starting viewer with {} channels, refresh every {} ms",
        channels.len(),
        config.refresh_period_ms
    );

    let app = Arc::new(Mutex::new(App::new(channels, locale)));
    let engine = Engine::new(ChatHost::new(Arc::clone(&app)));
    let (frame_tx, frame_rx) = mpsc::unbounded_channel::<()>();
    let (deactivate, refresh_task) = activate(engine, config, frame_rx);

    // Enable terminal raw mode
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Spawn terminal event handler
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<AppEvent>();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_millis(50));
        loop {
            interval.tick().await;

            // Check for terminal events (non-blocking)
            if event::poll(Duration::from_millis(0)).unwrap_or(false) {
                if let Ok(event) = event::read() {
                    if event_tx.send(AppEvent::Terminal(event)).is_err() {
                        break;
                    }
                }
            }

            // Send tick event so relative timestamps get redrawn
            if event_tx.send(AppEvent::Tick).is_err() {
                break;
            }
        }
    });

    // Main application loop
    loop {
        let visible_rows = {
            let mut app = lock(&app);
            if app.should_quit {
                break;
            }
            terminal.draw(|f| ui::ui(f, &mut app))?;
            terminal.size()?.height.saturating_sub(5) as usize
        };

        // Every drawn frame is a chance for the engine to run its pass.
        let _ = frame_tx.send(());

        match event_rx.recv().await {
            Some(AppEvent::Terminal(CEvent::Key(key))) => {
                handlers::handle_key_event(key, &mut lock(&app), visible_rows);
            }
            Some(_) => {}
            None => break,
        }
    }

    deactivate.deactivate();
    if let Err(e) = refresh_task.await {
        tracing::error!("Refresh task ended abnormally: {}", e);
    }

    // Cleanup
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    Ok(())
}
