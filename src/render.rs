//! Colored terminal rendering for calgen-core types.

use calgen_core::export::ExportedFiles;
use calgen_core::generate::GenerationStats;
use calgen_core::store::StoreStats;
use owo_colors::OwoColorize;

use crate::utils::tui::pluralize;

pub trait Render {
    fn render(&self) -> String;
}

impl Render for StoreStats {
    fn render(&self) -> String {
        let memory = self.memory.as_deref().unwrap_or("unknown");
        format!(
            "{}\n  Users:   {}\n  Events:  {}\n  Memory:  {}\n  Store:   {} {}",
            "Stored data".bold(),
            self.users,
            self.events,
            memory,
            self.address,
            "(connected)".green()
        )
    }
}

impl Render for ExportedFiles {
    fn render(&self) -> String {
        format!(
            "  {} {} ({})\n  {} {} ({})",
            "✓".green(),
            self.users.display(),
            pluralize(self.user_count as u64, "user").dimmed(),
            "✓".green(),
            self.events.display(),
            pluralize(self.event_count as u64, "event").dimmed()
        )
    }
}

impl Render for GenerationStats {
    fn render(&self) -> String {
        let mut lines = Vec::new();

        let title = if self.dry_run {
            "Dry run (nothing was generated or stored)"
        } else {
            "Generation complete"
        };
        lines.push(title.bold().to_string());

        lines.push(format!(
            "  Users:   {}/{} {}",
            self.users_created,
            self.users_requested,
            shortfall(self.users_shortfall())
        ));
        lines.push(format!(
            "  Events:  {}/{} {}",
            self.events_created,
            self.events_requested,
            shortfall(self.events_shortfall())
        ));

        if !self.dry_run {
            lines.push(format!("  API calls: {}", self.api_calls));

            if self.failures() > 0 {
                lines.push(
                    format!(
                        "  Failures: {} api, {} unparseable, {} rejected",
                        self.api_failures, self.parse_failures, self.rejected_records
                    )
                    .yellow()
                    .to_string(),
                );
            }

            if !self.failed_users.is_empty() {
                lines.push(
                    format!("  No events for: {}", self.failed_users.join(", "))
                        .yellow()
                        .to_string(),
                );
            }
        }

        if let Some(duration) = self.duration() {
            let secs = duration.num_milliseconds() as f64 / 1000.0;
            lines.push(format!("  Took {:.1}s", secs).dimmed().to_string());
        }

        lines.join("\n")
    }
}

fn shortfall(missing: u32) -> String {
    if missing == 0 {
        String::new()
    } else {
        format!("({} short)", missing).yellow().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_render_shows_shortfall() {
        let stats = GenerationStats {
            users_requested: 5,
            users_created: 3,
            ..Default::default()
        };
        let out = stats.render();
        assert!(out.contains("3/5"));
        assert!(out.contains("2 short"));
    }

    #[test]
    fn test_store_stats_render_memory_and_address() {
        let stats = StoreStats {
            users: 2,
            events: 7,
            address: "redis://localhost:6379/0".to_string(),
            memory: Some("1.05M".to_string()),
        };
        let out = stats.render();
        assert!(out.contains("Memory:  1.05M"));
        assert!(out.contains("redis://localhost:6379/0"));

        let unknown = StoreStats { memory: None, ..stats };
        assert!(unknown.render().contains("Memory:  unknown"));
    }

    #[test]
    fn test_dry_run_render_skips_api_counts() {
        let stats = GenerationStats {
            dry_run: true,
            users_requested: 2,
            users_created: 2,
            ..Default::default()
        };
        let out = stats.render();
        assert!(out.contains("Dry run"));
        assert!(!out.contains("API calls"));
    }
}
