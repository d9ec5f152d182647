use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use clap::Parser;
use prace_core::{CrossCheck, FixedCrossCheck, Race, RaceConfig, ResultCollector};
use prace_exec::{CommandCrossCheck, ProcRunner, ProcessTerminator, RunnerConfig};
use prace_model::{Catalog, CatalogContext, Collection, Instance};
use prace_observe::logger_init;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

mod cli;
mod workdir;

use cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logger_init(&cli.logger_config()).context("init logger")?;
    run(cli).await
}

async fn run(cli: Cli) -> Result<()> {
    let instance = Instance::open(&cli.input).with_context(|| format!("open instance {}", cli.input.display()))?;

    let catalog = match &cli.catalog {
        Some(path) => {
            let text = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("read catalog {}", path.display()))?;
            Catalog::from_json(&text).with_context(|| format!("parse catalog {}", path.display()))?
        }
        None => Catalog::builtin(),
    };

    let jobs = catalog.instantiate(&CatalogContext {
        instance: &instance,
        work_dir: &cli.work_dir,
        bin_dir: &cli.bin_dir,
    });
    workdir::prepare(&jobs).await?;
    let dirs: Vec<PathBuf> = jobs.iter().map(|j| j.output_dir.clone()).collect();

    let mut config = RaceConfig::default();
    if let Some(n) = cli.max_parallel {
        config.max_parallel = n;
    }
    let runner = ProcRunner::new(RunnerConfig {
        stderr_policy: cli.stderr_policy.clone(),
        ..Default::default()
    });
    let terminator = ProcessTerminator::new(Duration::from_millis(cli.kill_grace_ms));
    let race = Race::new(config, Arc::new(runner), Arc::new(terminator));

    let mut phases = race.state().subscribe_phase();
    tokio::spawn(async move {
        while phases.changed().await.is_ok() {
            let phase = *phases.borrow_and_update();
            debug!(target: "prace.cli", %phase, "race phase");
        }
    });

    let shutdown = CancellationToken::new();
    let trigger = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            trigger.cancel();
        }
    });

    let report = race.run(jobs, instance.clone(), shutdown.clone()).await;
    for job in &report.jobs {
        debug!(
            target: "prace.cli",
            job = %job.job,
            outcome = job.outcome.tag(),
            spawned = job.outcome.was_spawned(),
            elapsed_ms = job.elapsed.as_millis() as u64,
            "job summary"
        );
    }
    if shutdown.is_cancelled() {
        warn!(target: "prace.cli", "interrupted, collecting what is there");
    }

    workdir::clear_verdicts(&cli.output, &instance).await?;
    let check: Arc<dyn CrossCheck> = match &cli.cex_checker {
        Some(program) => Arc::new(CommandCrossCheck::new(program)),
        None => Arc::new(FixedCrossCheck::reject()),
    };
    let collection = ResultCollector::new(check)
        .collect(&dirs, &instance, &cli.output)
        .await
        .context("collect result")?;

    match collection {
        Collection::Verdict(v) => info!(
            target: "prace.cli",
            verdict = v.kind.output_suffix(),
            kind = ?v.kind,
            path = %v.path.display(),
            winner = report.winner.as_ref().map(|w| w.as_str()).unwrap_or("none"),
            "result"
        ),
        Collection::NoResult => info!(target: "prace.cli", verdict = "none", "no result"),
    }
    Ok(())
}
