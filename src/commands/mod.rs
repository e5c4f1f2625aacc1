pub mod clear;
pub mod config;
pub mod export;
pub mod generate;
pub mod stats;
pub mod test_connection;

use anyhow::{Context, Result};
use calgen_core::config::RedisSettings;
use calgen_core::kv::RedisStore;
use calgen_core::store::Store;

use crate::utils::tui;

/// Connect to Redis or fail the command.
pub async fn connect_store(settings: &RedisSettings) -> Result<Store<RedisStore>> {
    let spinner = tui::create_spinner(format!("Connecting to {}:{}", settings.host, settings.port));
    let result = RedisStore::connect(settings).await;
    spinner.finish_and_clear();

    let kv = result.context("Could not connect to Redis. Is it running?")?;
    Ok(Store::new(kv))
}
