use anyhow::{Context, Result, bail};
use calgen_core::config::Settings;
use calgen_core::event_range::EventRange;
use calgen_core::generate::{self, GenerationRequest, Generator};
use calgen_core::llm::{ProviderKind, provider_for, select_provider};

use crate::render::Render;
use crate::utils::tui::{self, pluralize};

pub struct Args {
    pub users: u32,
    pub provider: Option<ProviderKind>,
    pub events_per_user: EventRange,
    pub dry_run: bool,
    /// Export the configured formats after a successful run
    pub export: bool,
}

pub async fn run(settings: &Settings, args: Args) -> Result<()> {
    let request = GenerationRequest {
        users: args.users,
        events_per_user: args.events_per_user,
    };

    if args.dry_run {
        let stats = generate::dry_run(&settings.prompts, &request, &mut rand::rng())?;
        println!("{}", stats.render());
        return Ok(());
    }

    let kind = select_provider(args.provider, &settings.api)?;
    let llm = provider_for(kind, &settings.api)?;
    let options = settings.api.provider(kind).completion_options();
    let store = super::connect_store(&settings.redis).await?;

    println!(
        "Generating {} with {} events each using {} ({})\n",
        pluralize(request.users, "user"),
        request.events_per_user,
        kind,
        options.model
    );

    let spinner = tui::create_spinner(format!("Waiting on {}", kind));
    let result = Generator::new(&*llm, &store, &settings.prompts, options)
        .run(&request)
        .await;
    spinner.finish_and_clear();

    let stats = result.context("Generation aborted")?;

    println!("\n{}", stats.render());

    if stats.users_created == 0 {
        bail!("No users were generated. Run with -v to see the provider's responses");
    }

    if args.export {
        println!();
        super::export::export_to(
            &store,
            &settings.generation.formats,
            &settings.generation.output_dir,
        )
        .await?;
    }

    Ok(())
}
