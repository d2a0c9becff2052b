mod app;
mod ui;

use crate::app::App;
use crate::ui::run_app;
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io;
use std::sync::Arc;
use teamboard::config::Config;
use teamboard::credentials::{CredentialStore, FileStore};
use teamboard::http::ApiClient;
use teamboard::logging;
use teamboard::state::Stores;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    logging::init(&config.log_path)?;

    let store = FileStore::open(&config.credentials_path)?;
    tracing::info!(path = %store.path().display(), "Opened credential store");
    let client = ApiClient::with_reqwest(&config.api_base, CredentialStore::new(Arc::new(store)));
    tracing::info!(api_base = client.base_url(), "Starting teamboard");

    let mut app = App::new(Stores::new(Arc::new(client)));
    app.start().await;

    // Setup terminal UI
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    terminal.hide_cursor()?;

    let res = run_app(&mut terminal, app).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        eprintln!("Error: {:?}", err);
    }

    Ok(())
}
