use anyhow::Result;
use calgen_core::config::Settings;

use crate::render::Render;

pub async fn run(settings: &Settings) -> Result<()> {
    let store = super::connect_store(&settings.redis).await?;
    let stats = store.stats().await?;

    println!("{}", stats.render());

    Ok(())
}
