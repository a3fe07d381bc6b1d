//! `imagepin refs`: list references without building.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use imagepin_backend::AnyBuilder;
use imagepin_resolve::{pipeline, OccurrenceMap};

use super::{manifest_sources, ConfigArgs};

/// Arguments for `imagepin refs`.
#[derive(Args, Debug)]
pub struct RefsArgs {
    /// Manifest file to scan; `-` reads stdin. Repeatable.
    #[arg(short = 'f', long = "filename", value_name = "PATH", required = true)]
    pub filenames: Vec<PathBuf>,

    #[command(flatten)]
    pub config: ConfigArgs,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

impl RefsArgs {
    pub fn run(self) -> Result<()> {
        let config = self.config.load()?;
        let builder = AnyBuilder::from_config(&config);
        let refs = pipeline::scan_only(&manifest_sources(&self.filenames), &builder)
            .context("failed to scan manifests")?;

        let report = build_report(&refs);
        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&report).context("failed to serialize refs JSON")?
            );
            return Ok(());
        }
        print_table(report);
        Ok(())
    }
}

#[derive(Serialize)]
struct ReferenceJson {
    reference: String,
    occurrences: usize,
    selectors: Vec<String>,
    locations: Vec<String>,
}

#[derive(Tabled)]
struct ReferenceRow {
    #[tabled(rename = "reference")]
    reference: String,
    #[tabled(rename = "occurrences")]
    occurrences: usize,
    #[tabled(rename = "selectors")]
    selectors: String,
}

fn build_report(refs: &OccurrenceMap) -> Vec<ReferenceJson> {
    refs.iter()
        .map(|(reference, occurrences)| {
            let mut selectors: Vec<String> = Vec::new();
            for occurrence in occurrences {
                let selector = occurrence.selector.to_string();
                if !selectors.contains(&selector) {
                    selectors.push(selector);
                }
            }
            ReferenceJson {
                reference: reference.to_string(),
                occurrences: occurrences.len(),
                selectors,
                locations: occurrences.iter().map(|o| o.node.to_string()).collect(),
            }
        })
        .collect()
}

fn print_table(report: Vec<ReferenceJson>) {
    if report.is_empty() {
        println!("No ko:// references found.");
        return;
    }

    let total: usize = report.iter().map(|r| r.occurrences).sum();
    println!(
        "{} references | {} occurrences",
        report.len().to_string().bold(),
        total.to_string().bold(),
    );
    let rows: Vec<ReferenceRow> = report
        .into_iter()
        .map(|r| ReferenceRow {
            reference: r.reference,
            occurrences: r.occurrences,
            selectors: r.selectors.join(", "),
        })
        .collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
}
