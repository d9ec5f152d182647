use serde::{Deserialize, Serialize};

/// How one job left the race.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "outcome", content = "reason")]
pub enum Outcome {
    /// Exited cleanly with acceptable stderr and a non-empty artifact.
    Won,
    /// Exited, but did not produce a valid answer (gave up, unknown, rejected by validation).
    Completed,
    /// Wall-clock limit elapsed; the process was killed.
    TimedOut,
    /// Torn down by the race after another job won.
    Cancelled,
    /// Still queued when the race settled; never spawned.
    Skipped,
    /// The job could not be run at all (spawn failure, wait failure, worker panic).
    RunnerError(String),
}

impl Outcome {
    #[inline]
    pub fn is_win(&self) -> bool {
        matches!(self, Outcome::Won)
    }

    /// Returns `true` if the job's process actually ran.
    pub fn was_spawned(&self) -> bool {
        !matches!(self, Outcome::Skipped | Outcome::RunnerError(_))
    }

    /// Short tag for logs.
    pub fn tag(&self) -> &'static str {
        match self {
            Outcome::Won => "won",
            Outcome::Completed => "completed",
            Outcome::TimedOut => "timed-out",
            Outcome::Cancelled => "cancelled",
            Outcome::Skipped => "skipped",
            Outcome::RunnerError(_) => "runner-error",
        }
    }
}
