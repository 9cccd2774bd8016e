mod api;
mod app;
mod cli;
mod config;
mod error;
mod event;
mod hierarchy;
mod kpi;
mod logging;
mod model;
mod retrieval;
mod ui;

use std::io;
use std::panic;

use anyhow::Result;
use clap::Parser;
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tokio::sync::mpsc;
use tracing::warn;

use app::{Action, App};

#[tokio::main]
async fn main() -> Result<()> {
    // A local .env may carry AZURE_DEVOPS_* values
    dotenvy::dotenv().ok();

    let args = cli::Args::parse();
    let _log_guard = logging::init_logging(&args.log_config())?;

    if args.dashboard {
        run_dashboard(&args).await
    } else {
        cli::run(&args).await
    }
}

async fn run_dashboard(args: &cli::Args) -> Result<()> {
    // Missing credentials open the settings form instead of failing
    let credentials = match args.credentials() {
        Ok(credentials) => Some(credentials),
        Err(e) => {
            warn!(error = %e, "starting dashboard without a connection");
            None
        }
    };

    // Set up action channel
    let (action_tx, mut action_rx) = mpsc::unbounded_channel::<Action>();

    let mut app = App::new(credentials, action_tx.clone());

    // Set up terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.hide_cursor()?;

    // Set up panic hook to restore terminal
    let original_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        original_hook(panic_info);
    }));

    // Spawn event reader
    let event_tx = action_tx.clone();
    tokio::spawn(async move {
        event::run_event_loop(event_tx).await;
    });

    // Initial fetch
    if app.connected() {
        app.refresh_epics();
    }

    // Main loop
    loop {
        terminal.draw(|f| ui::render(f, &app))?;

        if let Some(action) = action_rx.recv().await {
            app.update(action).await;
            if app.should_quit {
                break;
            }
        } else {
            break;
        }
    }

    // Restore terminal
    terminal.show_cursor()?;
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;

    Ok(())
}
