//! `report` command: render a finished run's report.

use std::path::PathBuf;

use anyhow::{Context, Result};
use comfy_table::{presets, Attribute, Cell, ContentArrangement, Table};

use crate::cli::types::ReportArgs;
use crate::domain::models::RunReport;
use crate::infrastructure::config::ConfigLoader;
use crate::infrastructure::persistence::RunStore;

pub async fn execute(args: ReportArgs, json: bool, config_file: Option<PathBuf>) -> Result<()> {
    let config = match config_file {
        Some(path) => ConfigLoader::load_from_file(path)?,
        None => ConfigLoader::load()?,
    };

    let store = match args.run_id {
        Some(run_id) => RunStore::open(&config.run_dir, run_id)?,
        None => RunStore::latest_run(&config.run_dir)
            .await?
            .context("no runs found")?,
    };

    let report = store
        .load_report()
        .await?
        .with_context(|| format!("run {} has no report yet", store.run_id()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}

fn print_report(report: &RunReport) {
    println!("Run {}", report.run_id);
    println!(
        "  {} | final score {:.1} | {} cycle(s) | {} .. {}",
        report.stop_reason,
        report.final_score,
        report.cycles_completed,
        report.started_at.format("%Y-%m-%d %H:%M:%S"),
        report.finished_at.format("%Y-%m-%d %H:%M:%S"),
    );
    println!();

    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Cycle").add_attribute(Attribute::Bold),
            Cell::new("Before").add_attribute(Attribute::Bold),
            Cell::new("After").add_attribute(Attribute::Bold),
            Cell::new("Delta").add_attribute(Attribute::Bold),
            Cell::new("Approved").add_attribute(Attribute::Bold),
            Cell::new("Applied").add_attribute(Attribute::Bold),
            Cell::new("Trend").add_attribute(Attribute::Bold),
            Cell::new("Rolled back").add_attribute(Attribute::Bold),
        ]);

    for cycle in &report.cycles {
        table.add_row(vec![
            Cell::new(cycle.cycle),
            Cell::new(format!("{:.1}", cycle.before)),
            Cell::new(format!("{:.1}", cycle.after)),
            Cell::new(format!("{:+.1}", cycle.after - cycle.before)),
            Cell::new(cycle.approved),
            Cell::new(cycle.applied),
            Cell::new(cycle.trend.to_string()),
            Cell::new(if cycle.rolled_back { "yes" } else { "no" }),
        ]);
    }
    println!("{table}");

    for cycle in &report.cycles {
        if !cycle.rejected.is_empty() {
            println!();
            println!("Cycle {} rejections:", cycle.cycle);
            for item in &cycle.rejected {
                println!("  - {} ({})", item.title, item.reason);
            }
        }
    }
}
