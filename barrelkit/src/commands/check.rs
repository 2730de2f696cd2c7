//! Export inspection for individual files.

use std::path::PathBuf;

use anyhow::Result;
use barrelkit_core::extract;
use owo_colors::OwoColorize;
use serde::Serialize;

use crate::formatting::{print_error, print_section_header, SectionStyle};

#[derive(Serialize)]
struct CheckReport {
    path: PathBuf,
    default: bool,
    named: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

pub fn cmd_check(files: Vec<PathBuf>, json: bool) -> Result<()> {
    let reports: Vec<CheckReport> = files
        .into_iter()
        .map(|path| match extract(&path) {
            Ok(exports) => CheckReport {
                default: exports.has_default(),
                named: exports.named().map(str::to_string).collect(),
                path,
                error: None,
            },
            Err(e) => CheckReport {
                path,
                default: false,
                named: Vec::new(),
                error: Some(e.to_string()),
            },
        })
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
        return Ok(());
    }

    print_section_header("Exports", SectionStyle::Primary);
    for report in &reports {
        if let Some(error) = &report.error {
            print_error(error);
            continue;
        }

        println!("  {}", report.path.display().to_string().bold().white());
        if report.default {
            println!("    {} {}", "default".cyan(), "(aliased to the file name)".bright_black());
        }
        for name in &report.named {
            println!("    {}", name);
        }
        if !report.default && report.named.is_empty() {
            println!("    {}", "no exports".bright_black());
        }
    }
    println!();

    Ok(())
}
