mod action;
mod app;
mod auth;
mod config;
mod error;
mod event;
mod feed;
mod feeds;
mod github;
mod recent;
mod remote;
mod store;
mod tui;
mod types;
mod ui;

use std::panic;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use clap::Parser;
use tokio::sync::mpsc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::action::Action;
use crate::app::{App, Services};
use crate::auth::{CredentialStore, FileCredentialStore, MemoryCredentialStore, NoBiometrics};
use crate::config::Config;
use crate::event::Event;
use crate::github::GitHub;
use crate::store::JsonStore;
use crate::tui::EventHandler;

/// Browse popular GitHub repositories and search users and repositories
#[derive(Debug, Parser)]
#[command(name = "hubfeed", version)]
struct Cli {
    /// Config file to use instead of ~/.config/hubfeed/config.toml
    #[arg(long)]
    config: Option<PathBuf>,

    /// Items requested per page (1-100)
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=100))]
    page_size: Option<u32>,

    /// Write logs to the cache directory instead of stderr
    #[arg(long)]
    log_file: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::from_path(path)?,
        None => Config::load(),
    };
    if let Some(page_size) = cli.page_size {
        config.feed.page_size = page_size;
    }
    config.log_file |= cli.log_file;

    init_logging(&config)?;

    // Set up panic hook to restore terminal
    let original_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        let _ = tui::restore();
        original_hook(panic_info);
    }));

    let github = Arc::new(GitHub::new(github::resolve_token(&config.github))?);

    let store = match JsonStore::open_default() {
        Ok(store) => Some(store),
        Err(e) => {
            tracing::warn!(error = %e, "no writable data directory; nothing will be saved");
            None
        }
    };
    let credentials: Arc<dyn CredentialStore> = match &store {
        Some(store) => Arc::new(FileCredentialStore::new(store.clone())),
        None => Arc::new(MemoryCredentialStore::default()),
    };

    let services = Services {
        repos: github.clone(),
        users: github,
        credentials,
        biometrics: Arc::new(NoBiometrics),
        store,
    };

    // Run the application
    let result = run(services, config).await;

    // Restore terminal
    tui::restore()?;

    result
}

fn init_logging(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let file_layer = if config.log_file {
        let dir = dirs::cache_dir()
            .ok_or("no cache directory for the log file")?
            .join("hubfeed");
        std::fs::create_dir_all(&dir)?;
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(dir.join("hubfeed.log"))?;
        Some(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(file)),
        )
    } else {
        None
    };
    let stderr_layer = file_layer
        .is_none()
        .then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr));

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(stderr_layer)
        .init();
    Ok(())
}

async fn run(services: Services, config: Config) -> Result<(), Box<dyn std::error::Error>> {
    // Initialize terminal
    let mut terminal = tui::init()?;

    // Create action channel
    let (action_tx, mut action_rx) = mpsc::unbounded_channel::<Action>();

    let mut events = EventHandler::new(&config.ui);

    // Create app state
    let mut app = App::new(services, config, action_tx.clone());

    // Main loop
    loop {
        // Handle events and actions
        tokio::select! {
            Some(event) = events.next() => {
                match event {
                    Event::Render => {
                        terminal.draw(|frame| ui::render(frame, &app))?;
                    }
                    _ => {
                        let action = app.handle_event(event);
                        if !matches!(action, Action::None) {
                            action_tx.send(action)?;
                        }
                    }
                }
            }
            Some(action) = action_rx.recv() => {
                app.update(action);
            }
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}
