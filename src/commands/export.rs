use std::path::Path;

use anyhow::{Context, Result};
use calgen_core::config::{Settings, expand_path};
use calgen_core::export::{ExportFormat, Exporter, file_stamp};
use calgen_core::kv::KvStore;
use calgen_core::store::Store;

use crate::render::Render;
use crate::utils::tui;

pub async fn run(settings: &Settings, formats: &[ExportFormat], output: &Path) -> Result<()> {
    let store = super::connect_store(&settings.redis).await?;
    export_to(&store, formats, output).await
}

/// Shared with `generate`, which exports after a run.
pub async fn export_to<K: KvStore>(
    store: &Store<K>,
    formats: &[ExportFormat],
    output: &Path,
) -> Result<()> {
    let output = expand_path(output);
    let names: Vec<_> = formats.iter().map(|f| f.to_string()).collect();

    let spinner = tui::create_spinner(format!("Exporting {}", names.join(", ")));
    let result = Exporter::new(store)
        .export(formats, &output, &file_stamp())
        .await;
    spinner.finish_and_clear();

    let written = result.with_context(|| format!("Export to {} failed", output.display()))?;

    println!("Exported to {}", output.display());
    for files in &written {
        println!("{}", files.render());
    }

    Ok(())
}
