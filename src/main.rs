mod api;
mod app;
mod cache;
mod checklist;
mod commands;
mod config;
mod error;
mod event;
mod form;
mod logging;
mod lookup;
mod panel;
mod query;
mod resources;
mod ui;

use clap::Parser;
use color_eyre::{eyre::eyre, Result};
use std::path::PathBuf;
use std::sync::Arc;

use api::{HttpTransport, ResourceClient, Session, Transport};
use config::Auth;

#[derive(Parser, Debug)]
#[command(name = "crmdeck")]
#[command(about = "A terminal admin console for the agency CRM, inspired by k9s")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/crmdeck/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Panel to open on start, e.g. tags or checklists
  #[arg(short, long)]
  panel: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  // Load configuration
  let mut config = config::Config::load(args.config.as_deref())?;
  if let Some(panel) = args.panel {
    config.default_panel = Some(panel);
  }

  let _guard = logging::init(&config::data_dir().join("logs"), config.log.level.as_deref())?;

  let transport: Arc<dyn Transport> = Arc::new(HttpTransport::new(&config.api.url, config.timeout())?);
  let client = match config.auth()? {
    Auth::Token(token) => ResourceClient::new(transport, Session::new(api::Credential::new(token), None)),
    Auth::Login { email, password } => ResourceClient::login(transport, &email, &password)
      .await
      .map_err(|e| eyre!("Sign-in as {} failed: {}", email, e))?,
  };
  tracing::info!(url = %config.api.url, user = client.session().display_name(), "session ready");

  // Initialize and run the app
  let mut app = app::App::new(&config, cache::QueryCache::new(client));
  app.run().await?;

  Ok(())
}
