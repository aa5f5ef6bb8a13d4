use std::path::PathBuf;

use anyhow::{Context, Result};

use pinboard_api::pins::DEFAULT_PAGE_SIZE;

/// Runtime settings, read from the environment (and `.env` if present).
#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: PathBuf,
    pub page_size: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let db_path = std::env::var("PINBOARD_DB_PATH").unwrap_or_else(|_| "pinboard.db".into());
        let page_size = match std::env::var("PINBOARD_PAGE_SIZE") {
            Ok(raw) => raw
                .parse()
                .with_context(|| format!("PINBOARD_PAGE_SIZE must be a number, got '{raw}'"))?,
            Err(_) => DEFAULT_PAGE_SIZE,
        };

        Ok(Self {
            db_path: PathBuf::from(db_path),
            page_size,
        })
    }
}
