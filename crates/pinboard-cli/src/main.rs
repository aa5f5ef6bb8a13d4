mod commands;
mod config;

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::debug;

use pinboard_api::{AuthStore, Dispatcher, PinStore};
use pinboard_db::{Database, Storage};

use crate::commands::{Cli, Session};
use crate::config::Config;

fn main() -> Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging; stdout is reserved for command output
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pinboard_cli=info,pinboard_api=info,pinboard_db=warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;
    debug!(?config, "loaded config");

    let storage: Storage = Arc::new(Database::open(&config.db_path)?);
    let dispatcher = Dispatcher::new();

    let mut auth = AuthStore::new(storage.clone(), dispatcher.clone());
    auth.restore_session()?;
    let pins = PinStore::open(storage, dispatcher)?;

    let mut session = Session { config, auth, pins };
    session.run(cli.command)
}
