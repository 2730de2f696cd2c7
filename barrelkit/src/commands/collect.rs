//! One-shot regeneration.

use std::time::Instant;

use anyhow::Result;
use barrelkit_core::Orchestrator;

use crate::formatting::{print_section_header, SectionStyle};

use super::{load_config, print_collect_summary, ConfigOverrides};

pub fn cmd_collect(overrides: &ConfigOverrides, json: bool) -> Result<()> {
    let config = load_config(overrides, !json)?;
    let mut orchestrator = Orchestrator::new(config);

    let start = Instant::now();
    let summary = orchestrator.collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        let style = if summary.has_failures() {
            SectionStyle::Warning
        } else {
            SectionStyle::Primary
        };
        print_section_header("Collecting exports", style);
        print_collect_summary(&summary, start.elapsed().as_secs_f64());
    }

    Ok(())
}
