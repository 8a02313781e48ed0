//! Demo host for the headless session core.
//!
//! Boots a session against a profile fixture and a JSON file store, logs every
//! bus event, optionally switches role, then exits. Guarded by the `host`
//! feature; it is not part of any shipped client.

use anyhow::{Context, Result};
use clap::Parser;
use roster_app::{RosterApp, SwitchOutcome};
use roster_core::{AuthToken, RosterConfig, SelectionKey, SessionStoreExt};
use roster_effects::{FileSessionStore, FixtureGateway, TokioTimeHandler};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "app-host")]
#[command(about = "Drive the Roster session core against a local profile fixture", long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// JSON file backing the session store
    #[arg(short, long, default_value = "roster-session.json")]
    store: PathBuf,

    /// Token to seed into the store before starting
    #[arg(short, long)]
    token: Option<String>,

    /// Profile fixture served by the offline gateway
    #[arg(short, long)]
    fixture: PathBuf,

    /// Selection key to switch to once the session is ready, e.g. `UnitLeader::B`
    #[arg(long)]
    switch: Option<SelectionKey>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut config = match &cli.config {
        Some(path) => RosterConfig::load_from_file(path)?,
        None => RosterConfig::default(),
    };
    config.merge_with_env()?;

    let store = FileSessionStore::new(&cli.store);
    if let Some(raw) = cli.token {
        let token = AuthToken::new(raw).context("--token must not be blank")?;
        store.store_token(&token).await?;
    }
    let gateway = FixtureGateway::from_file(&cli.fixture).await?;

    let app = RosterApp::new(config, store, gateway, TokioTimeHandler::new())?;
    let _log = app.bus().on(|event| info!(event = %event.name(), "bus event"));

    let phase = app.session().start().await?;
    info!(%phase, "session started");

    if let Some(key) = cli.switch {
        let profile = app
            .session()
            .session()
            .profile
            .context("no profile loaded, cannot switch role")?;
        for option in app.roles().open_selection(&profile).await? {
            info!(key = %option.selection_key, scope = %option.display_scope, "role option");
        }
        app.roles().confirm_selection(&key).await?;
        match app.roles().confirm_now().await? {
            SwitchOutcome::Confirmed(ctx) => info!(role = %ctx.active_role, "switched"),
            SwitchOutcome::RolledBack(ctx) => info!(role = %ctx.active_role, "rolled back"),
        }
    }

    app.shutdown();
    Ok(())
}
