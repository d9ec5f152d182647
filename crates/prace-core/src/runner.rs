use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use prace_model::{Instance, JobId, JobSpec, Outcome};

use crate::state::RaceState;

/// Everything a runner needs besides the job itself.
pub struct RunContext {
    pub state: Arc<RaceState>,
    pub instance: Instance,
}

/// Finished state of one job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobReport {
    pub job: JobId,
    /// Set once the process was spawned.
    pub pid: Option<u32>,
    pub exit_code: Option<i32>,
    /// Terminating signal, if the process was killed by one.
    pub signal: Option<i32>,
    /// Captured stderr, possibly truncated.
    pub stderr: Vec<u8>,
    pub outcome: Outcome,
    pub elapsed: Duration,
}

impl JobReport {
    pub fn new(job: JobId, outcome: Outcome) -> Self {
        Self {
            job,
            pid: None,
            exit_code: None,
            signal: None,
            stderr: Vec::new(),
            outcome,
            elapsed: Duration::ZERO,
        }
    }

    pub fn skipped(job: JobId) -> Self {
        Self::new(job, Outcome::Skipped)
    }

    pub fn error(job: JobId, reason: impl Into<String>) -> Self {
        Self::new(job, Outcome::RunnerError(reason.into()))
    }
}

/// Executes one job to completion.
///
/// Implementations must never panic on job failure, must register the job's pid in
/// [`RaceState`] for as long as the process can run, and must declare a winner through
/// [`RaceState::declare_winner`] when the job produces a valid answer.
#[async_trait]
pub trait JobRunner: Send + Sync {
    fn name(&self) -> &'static str;

    async fn run(&self, job: &JobSpec, ctx: &RunContext) -> JobReport;
}
