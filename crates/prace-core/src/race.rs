//! Race coordinator.
//!
//! Every job is started at once, subject to a concurrency cap. The first job that reports a
//! valid answer settles the [`RaceState`]; the coordinator then stops dispatching queued jobs
//! and tears down every registered process tree through the [`Terminator`]. The race is over
//! once every runner invocation has returned.
use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use prace_model::{Instance, JobId, JobSpec, Outcome};
use tokio::{sync::Semaphore, task::JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::{
    runner::{JobReport, JobRunner, RunContext},
    state::{RacePhase, RaceState},
    terminate::{KillOutcome, Terminator},
};

#[derive(Debug, Clone)]
pub struct RaceConfig {
    /// Upper bound on concurrently running jobs.
    pub max_parallel: usize,
}

impl Default for RaceConfig {
    fn default() -> Self {
        Self {
            max_parallel: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
        }
    }
}

/// One termination issued by the cancellation sweep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerminationRecord {
    pub pid: u32,
    pub job: JobId,
    pub outcome: KillOutcome,
}

#[derive(Debug, Clone)]
pub struct RaceReport {
    pub race_id: Uuid,
    pub winner: Option<JobId>,
    /// One report per job, in submission order.
    pub jobs: Vec<JobReport>,
    pub terminations: Vec<TerminationRecord>,
    pub elapsed: Duration,
}

impl RaceReport {
    pub fn report(&self, job: &JobId) -> Option<&JobReport> {
        self.jobs.iter().find(|r| &r.job == job)
    }

    pub fn outcome(&self, job: &JobId) -> Option<&Outcome> {
        self.report(job).map(|r| &r.outcome)
    }
}

pub struct Race {
    config: RaceConfig,
    runner: Arc<dyn JobRunner>,
    terminator: Arc<dyn Terminator>,
    state: Arc<RaceState>,
}

impl Race {
    pub fn new(config: RaceConfig, runner: Arc<dyn JobRunner>, terminator: Arc<dyn Terminator>) -> Self {
        Self {
            config,
            runner,
            terminator,
            state: RaceState::new(),
        }
    }

    /// Shared state of this race, for observers.
    pub fn state(&self) -> Arc<RaceState> {
        Arc::clone(&self.state)
    }

    /// Run every job until one wins or all have finished.
    ///
    /// Tripping `shutdown` aborts the race the same way a winner settles it.
    #[instrument(
        level = "info",
        skip_all,
        fields(race = %self.state.id(), instance = %instance.base_name(), jobs = jobs.len())
    )]
    pub async fn run(self, jobs: Vec<JobSpec>, instance: Instance, shutdown: CancellationToken) -> RaceReport {
        let started = Instant::now();
        let state = Arc::clone(&self.state);
        let ctx = Arc::new(RunContext {
            state: Arc::clone(&state),
            instance,
        });
        let permits = Arc::new(Semaphore::new(self.config.max_parallel.max(1)));

        state.set_phase(RacePhase::Racing);
        info!(
            target: "prace.core.race",
            runner = self.runner.name(),
            max_parallel = self.config.max_parallel,
            "race started"
        );

        let ids: Vec<JobId> = jobs.iter().map(|j| j.id.clone()).collect();
        let mut slots: Vec<Option<JobReport>> = vec![None; jobs.len()];
        let mut workers = JoinSet::new();

        for (idx, job) in jobs.into_iter().enumerate() {
            let runner = Arc::clone(&self.runner);
            let ctx = Arc::clone(&ctx);
            let permits = Arc::clone(&permits);

            // A panicking runner is reported as a runner error of its own job.
            workers.spawn(async move {
                let id = job.id.clone();
                let report = match tokio::spawn(dispatch(runner, job, ctx, permits)).await {
                    Ok(report) => report,
                    Err(e) => {
                        warn!(target: "prace.core.race", job = %id, error = %e, "job worker failed");
                        JobReport::error(id, format!("worker failed: {e}"))
                    }
                };
                (idx, report)
            });
        }

        let mut terminations = Vec::new();
        let mut draining = false;

        loop {
            tokio::select! {
                joined = workers.join_next() => match joined {
                    None => break,
                    Some(Ok((idx, report))) => {
                        debug!(
                            target: "prace.core.race",
                            job = %report.job,
                            outcome = report.outcome.tag(),
                            elapsed_ms = report.elapsed.as_millis() as u64,
                            "job finished"
                        );
                        slots[idx] = Some(report);
                    }
                    Some(Err(e)) => warn!(target: "prace.core.race", error = %e, "dispatch task failed"),
                },
                _ = state.settled(), if !draining => {
                    draining = true;
                    state.set_phase(RacePhase::Draining);
                    terminations = self.sweep(&state).await;
                }
                _ = shutdown.cancelled(), if !state.is_settled() => {
                    warn!(target: "prace.core.race", "shutdown requested");
                    state.abort();
                }
            }
        }

        let leftovers = state.live_pids();
        if !leftovers.is_empty() {
            warn!(target: "prace.core.race", count = leftovers.len(), "registry not empty after all jobs returned");
        }

        state.set_phase(RacePhase::Done);
        let jobs: Vec<JobReport> = slots
            .into_iter()
            .zip(ids)
            .map(|(slot, job)| slot.unwrap_or_else(|| JobReport::error(job, "no report")))
            .collect();

        let report = RaceReport {
            race_id: state.id(),
            winner: state.winner(),
            jobs,
            terminations,
            elapsed: started.elapsed(),
        };
        info!(
            target: "prace.core.race",
            winner = report.winner.as_ref().map(|w| w.as_str()).unwrap_or("none"),
            killed = report.terminations.len(),
            elapsed_ms = report.elapsed.as_millis() as u64,
            "race done"
        );
        report
    }

    /// Terminate every registered process tree, concurrently and independently.
    async fn sweep(&self, state: &RaceState) -> Vec<TerminationRecord> {
        let targets = state.live_pids();
        info!(target: "prace.core.race", targets = targets.len(), "cancelling live jobs");

        let mut kills = JoinSet::new();
        for (pid, job) in targets {
            let terminator = Arc::clone(&self.terminator);
            kills.spawn(async move {
                let outcome = terminator.kill_tree(pid).await;
                TerminationRecord { pid, job, outcome }
            });
        }

        let mut records = Vec::new();
        while let Some(res) = kills.join_next().await {
            match res {
                Ok(rec) => {
                    if let KillOutcome::Failed(reason) = &rec.outcome {
                        warn!(target: "prace.core.race", pid = rec.pid, job = %rec.job, %reason, "termination failed");
                    }
                    records.push(rec);
                }
                Err(e) => warn!(target: "prace.core.race", error = %e, "termination task failed"),
            }
        }
        records.sort_by_key(|r| r.pid);
        records
    }
}

/// Wait for a pool slot, then run the job unless the race settled first.
async fn dispatch(
    runner: Arc<dyn JobRunner>,
    job: JobSpec,
    ctx: Arc<RunContext>,
    permits: Arc<Semaphore>,
) -> JobReport {
    let _permit = tokio::select! {
        biased;
        _ = ctx.state.settled() => return JobReport::skipped(job.id),
        permit = permits.acquire_owned() => match permit {
            Ok(permit) => permit,
            Err(_) => return JobReport::skipped(job.id),
        },
    };
    if ctx.state.is_settled() {
        return JobReport::skipped(job.id);
    }
    runner.run(&job, &ctx).await
}
