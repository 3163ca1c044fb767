use anyhow::{Context, Result};
use clap::{Arg, Command};
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use mq_shift::api::ApiClient;
use mq_shift::app::App;
use mq_shift::session::SessionRepository;
use mq_shift::ui::run_app;

#[tokio::main]
async fn main() -> Result<()> {
    let matches = Command::new("MQ Migration Console")
        .version("0.1.0")
        .about("Interactive IBM MQ queue manager backup and migration console")
        .arg(
            Arg::new("api-url")
                .long("api-url")
                .help("Base URL of the migration backend")
                .default_value("http://localhost:8080"),
        )
        .arg(
            Arg::new("ws-url")
                .long("ws-url")
                .help("WebSocket URL of the migration backend (defaults to the api-url with a ws scheme)"),
        )
        .arg(
            Arg::new("state-dir")
                .long("state-dir")
                .help("Directory for the persisted session (defaults to the platform data dir)"),
        )
        .arg(
            Arg::new("log-file")
                .long("log-file")
                .help("Diagnostic log file (defaults to mq-shift.log in the state dir)"),
        )
        .get_matches();

    let api_url = matches
        .get_one::<String>("api-url")
        .map(String::as_str)
        .unwrap_or("http://localhost:8080")
        .trim_end_matches('/')
        .to_string();
    let ws_url = matches
        .get_one::<String>("ws-url")
        .cloned()
        .unwrap_or_else(|| derive_ws_url(&api_url));

    let state_dir = match matches.get_one::<String>("state-dir") {
        Some(dir) => PathBuf::from(dir),
        None => dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("mq-shift"),
    };
    std::fs::create_dir_all(&state_dir)
        .with_context(|| format!("creating state dir {}", state_dir.display()))?;

    let log_path = match matches.get_one::<String>("log-file") {
        Some(path) => PathBuf::from(path),
        None => state_dir.join("mq-shift.log"),
    };
    init_tracing(&log_path)?;
    tracing::info!(%api_url, %ws_url, "starting");

    run_tui_app(api_url, ws_url, state_dir).await
}

/// The log stream lives on the same host and port as the HTTP API.
fn derive_ws_url(api_url: &str) -> String {
    if let Some(rest) = api_url.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = api_url.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        format!("ws://{api_url}")
    }
}

/// Diagnostics go to a file; stdout belongs to the terminal UI.
fn init_tracing(log_path: &std::path::Path) -> Result<()> {
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)
        .with_context(|| format!("opening log file {}", log_path.display()))?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(Arc::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

async fn run_tui_app(api_url: String, ws_url: String, state_dir: PathBuf) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Create app and run it
    let client = ApiClient::new(api_url);
    let session = SessionRepository::open(&state_dir);
    let mut app = App::new(Box::new(client), session, ws_url);
    app.export_dir = state_dir;
    let res = run_app(&mut terminal, app).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("{err:?}");
    }

    Ok(())
}
