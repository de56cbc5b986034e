//! `run` command: drive a refinement run to termination.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::adapters::mock::{MockAnalyzer, MockImplementer, MockReflector};
use crate::cli::types::{Driver, RunArgs};
use crate::domain::models::{Config, Recommendation, RunReport};
use crate::domain::ports::Analysis;
use crate::infrastructure::build::ProcessBuildRunner;
use crate::infrastructure::capture::ContentDigestCapture;
use crate::infrastructure::config::ConfigLoader;
use crate::infrastructure::logging;
use crate::infrastructure::persistence::RunStore;
use crate::services::{Collaborators, IterationController, MemoryStore};

pub async fn execute(args: RunArgs, json: bool, config_file: Option<PathBuf>) -> Result<()> {
    let mut config = match config_file {
        Some(path) => ConfigLoader::load_from_file(path)?,
        None => ConfigLoader::load()?,
    };

    if let Some(project) = args.project {
        config.project_path = project;
    }
    if let Some(target_score) = args.target_score {
        config.cycle.target_score = target_score;
    }
    if let Some(max_cycles) = args.max_cycles {
        config.cycle.max_cycles = max_cycles;
    }
    ConfigLoader::validate(&config)?;

    let store = if args.resume {
        RunStore::latest_run(&config.run_dir)
            .await?
            .context("no previous run to resume")?
    } else {
        RunStore::create(&config.run_dir).await?
    };

    let _guard = logging::init(&config.logging, Some(store.path()))?;
    tracing::info!(run_id = %store.run_id(), project = %config.project_path, "run starting");

    let report = match args.driver {
        Driver::Mock => run_with_mocks(config, store, args.resume).await?,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_summary(&report);
    }
    Ok(())
}

async fn run_with_mocks(config: Config, store: RunStore, resume: bool) -> Result<RunReport> {
    let avoid_after_failures = config.filter.avoid_after_failures;
    let plateau_threshold = config.cycle.plateau_threshold;

    // Only the external reasoning capabilities are mocked; capture and the
    // build command run for real against the configured project.
    let collaborators = Collaborators {
        analyzer: Arc::new(MockAnalyzer::scripted(demo_script())),
        implementer: Arc::new(MockImplementer::default()),
        build_runner: Arc::new(ProcessBuildRunner::new(&config.build)),
        reflector: Arc::new(MockReflector::default()),
        capture: Arc::new(ContentDigestCapture::new(
            config.planner.watch_extensions.clone(),
            config.planner.max_file_bytes,
        )),
    };

    let mut controller = IterationController::new(config, collaborators, store.clone());
    if resume {
        if let Some(memory) = store.load_memory().await? {
            controller = controller
                .with_memory(MemoryStore::resume(memory, avoid_after_failures, plateau_threshold));
        }
    }

    controller.run().await.context("refinement run failed")
}

/// Two improving cycles that reach the default target score. The mock
/// implementer produces no plans, so the dry run exercises filtering,
/// memory, verification, and reflection without touching any file.
fn demo_script() -> Vec<Analysis> {
    let rec = |dimension: &str, title: &str, impact: f64, effort: f64| Recommendation {
        dimension: dimension.into(),
        title: title.into(),
        description: format!("{title} across the main views"),
        impact,
        effort,
        hint: None,
    };

    vec![
        Analysis {
            score: 6.5,
            issues: Vec::new(),
            recommendations: vec![
                rec("typography", "normalize heading scale", 7.0, 2.0),
                rec("color", "raise body text contrast", 6.0, 2.0),
            ],
        },
        Analysis {
            score: 7.2,
            issues: Vec::new(),
            recommendations: Vec::new(),
        },
        Analysis {
            score: 7.2,
            issues: Vec::new(),
            recommendations: vec![rec("spacing", "align card padding", 8.0, 3.0)],
        },
        Analysis {
            score: 8.6,
            issues: Vec::new(),
            recommendations: Vec::new(),
        },
    ]
}

fn print_summary(report: &RunReport) {
    println!(
        "run {} finished: {} after {} cycle(s), final score {:.1}",
        report.run_id, report.stop_reason, report.cycles_completed, report.final_score
    );
    for entry in &report.score_history {
        println!(
            "  cycle {}: {:.1} -> {:.1} ({:+.1})",
            entry.cycle, entry.before, entry.after, entry.delta
        );
    }
}
