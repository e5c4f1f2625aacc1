use std::path::Path;

use anyhow::Result;
use calgen_core::config::{Settings, expand_path};
use calgen_core::llm::ProviderKind;
use owo_colors::OwoColorize;

pub fn run(settings: &Settings, explicit: Option<&Path>) -> Result<()> {
    let config_path = match explicit {
        Some(path) => expand_path(path),
        None => Settings::default_path()?,
    };

    // Starter file for first-time users; never overwrites.
    if !config_path.exists() {
        Settings::create_default_config(&config_path)?;
        println!("{}", format!("Created {}", config_path.display()).green());
        println!();
    }

    println!("{}", "Paths".bold());
    println!("  Config:     {}", config_path.display());
    println!(
        "  Output:     {}",
        expand_path(&settings.generation.output_dir).display()
    );

    println!();
    println!("{}", "Redis".bold());
    println!(
        "  Address:    {}:{} (db {})",
        settings.redis.host, settings.redis.port, settings.redis.db
    );

    println!();
    println!("{}", "Providers".bold());
    for kind in ProviderKind::ALL {
        let provider = settings.api.provider(kind);
        let status = if provider.has_api_key() {
            "API key set".green().to_string()
        } else {
            "no API key".dimmed().to_string()
        };
        println!("  {:<10}  {} ({})", kind.as_str(), provider.model, status);
    }

    println!();
    println!("{}", "Generation".bold());
    println!("  Users:      {}", settings.generation.users);
    println!("  Events:     {} per user", settings.generation.events_per_user);
    let formats: Vec<_> = settings
        .generation
        .formats
        .iter()
        .map(|f| f.to_string())
        .collect();
    println!("  Formats:    {}", formats.join(", "));

    Ok(())
}
