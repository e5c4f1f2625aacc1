use anyhow::Result;
use calgen_core::config::Settings;
use dialoguer::Confirm;
use owo_colors::OwoColorize;

use crate::render::Render;
use crate::utils::tui::pluralize;

pub async fn run(settings: &Settings, force: bool) -> Result<()> {
    let store = super::connect_store(&settings.redis).await?;
    let stats = store.stats().await?;

    if stats.users == 0 && stats.events == 0 {
        println!("{}", "Nothing to clear".dimmed());
        return Ok(());
    }

    println!("{}", stats.render());

    // Confirm unless --force
    if !force {
        println!();
        let confirmed = Confirm::new()
            .with_prompt(format!(
                "Delete {} and {}?",
                pluralize(stats.users, "user"),
                pluralize(stats.events, "event")
            ))
            .default(false)
            .interact()?;

        if !confirmed {
            return Ok(());
        }
    }

    let deleted = store.clear_all().await?;
    tracing::info!(keys = deleted, "cleared store");

    println!("\n{}", format!("Cleared {}", pluralize(deleted, "key")).green());

    Ok(())
}
