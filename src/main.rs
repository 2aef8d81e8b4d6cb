use anyhow::Result;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

mod app;
mod chat_list;
mod config;
mod date_group;
mod formatting;
mod model;
mod search;
mod selection;
mod store;
mod thread;
mod utils;
mod widgets;

use app::{execute, App, Response};
use config::Config;
use store::ExportStore;

// Upper bound on how long the loop waits for input before checking for answers.
const MAX_POLL: Duration = Duration::from_millis(50);

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load()?;

    utils::init_logging(&config.log_path())
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;
    crate::info_log!("=== chatview starting ===");

    let initial_file = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .or_else(|| config.settings.last_file.clone());

    let mut app = App::new(config, ExportStore::new());
    if let Some(path) = initial_file {
        app.open_file(path);
    }

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, &mut app).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(ref e) = res {
        crate::error_log!("Exited with error: {:#}", e);
    }
    res
}

async fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
) -> Result<()> {
    let (tx, mut rx) = mpsc::unbounded_channel::<Response>();

    loop {
        while let Ok(response) = rx.try_recv() {
            app.apply_response(response, Instant::now());
        }

        let now = Instant::now();
        app.tick(now);

        for request in app.take_requests() {
            let store = app.store.clone();
            let tx = tx.clone();
            let limit = app.search_limit();
            tokio::spawn(async move {
                let response = execute(store, request, limit).await;
                // Receiver only goes away on shutdown
                let _ = tx.send(response);
            });
        }

        // Only redraw when something changed
        if app.needs_redraw {
            terminal.draw(|f| app.draw(f))?;
            app.needs_redraw = false;
        }

        if app.should_quit {
            crate::info_log!("=== chatview exiting ===");
            break;
        }

        // Sleep until the next timer is due (or cap at MAX_POLL)
        let poll_timeout = app
            .next_deadline()
            .map(|deadline| deadline.saturating_duration_since(now))
            .unwrap_or(MAX_POLL)
            .min(MAX_POLL);

        if event::poll(poll_timeout)? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    app.handle_key(key, Instant::now());
                }
                Event::Mouse(mouse) => {
                    app.handle_mouse(mouse, Instant::now());
                }
                Event::Resize(_, _) => {
                    app.needs_redraw = true;
                }
                _ => {}
            }
        }
    }

    Ok(())
}
