use anyhow::{Result, bail};
use calgen_core::CoreResult;
use calgen_core::config::Settings;
use calgen_core::kv::{KvStore, RedisStore};
use calgen_core::llm::{CompletionOptions, ProviderKind, provider_for};
use owo_colors::OwoColorize;

use crate::utils::tui;

const CHECK_PROMPT: &str = "Reply with the single word OK.";

pub async fn run(settings: &Settings) -> Result<()> {
    let mut failed = 0;

    println!("{}", "Redis".bold());
    let spinner = tui::create_spinner(format!("{}:{}", settings.redis.host, settings.redis.port));
    let result = RedisStore::connect(&settings.redis).await;
    spinner.finish_and_clear();

    match result {
        Ok(kv) => println!("  {} {}", "✓".green(), kv.address()),
        Err(e) => {
            failed += 1;
            println!("  {} {}", "✗".red(), e.to_string().red());
        }
    }

    println!();
    println!("{}", "Providers".bold());
    for kind in ProviderKind::ALL {
        if !settings.api.provider(kind).has_api_key() {
            println!("  {} {} {}", "-".dimmed(), kind, "(no API key)".dimmed());
            continue;
        }

        let spinner = tui::create_spinner(kind.to_string());
        let result = check_provider(settings, kind).await;
        spinner.finish_and_clear();

        match result {
            Ok(_) => println!("  {} {}", "✓".green(), kind),
            Err(e) => {
                failed += 1;
                println!("  {} {}: {}", "✗".red(), kind, e.to_string().red());
            }
        }
    }

    if failed > 0 {
        bail!("{} connection check(s) failed", failed);
    }

    Ok(())
}

async fn check_provider(settings: &Settings, kind: ProviderKind) -> CoreResult<String> {
    let llm = provider_for(kind, &settings.api)?;
    let options = CompletionOptions {
        max_tokens: 5,
        ..settings.api.provider(kind).completion_options()
    };
    llm.complete(CHECK_PROMPT, &options).await
}
