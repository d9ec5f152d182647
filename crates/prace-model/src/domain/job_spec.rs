use std::{path::PathBuf, time::Duration};

use crate::{JobId, TimeoutMs};

/// Immutable description of one solver configuration entered into a race.
///
/// Built once from the catalog before the race starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobSpec {
    pub id: JobId,
    /// Executable, exec'd directly without a shell.
    pub program: PathBuf,
    pub args: Vec<String>,
    /// Wall-clock limit; the process is killed once it elapses.
    pub timeout_ms: TimeoutMs,
    /// Address-space ceiling applied before exec.
    pub memory_limit_bytes: u64,
    /// Private directory the job is expected to write its artifacts into.
    pub output_dir: PathBuf,
}

impl JobSpec {
    pub fn new(id: impl Into<JobId>, program: impl Into<PathBuf>) -> Self {
        Self {
            id: id.into(),
            program: program.into(),
            args: Vec::new(),
            timeout_ms: 3_600_000,
            memory_limit_bytes: 8 * crate::GIB,
            output_dir: PathBuf::new(),
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: TimeoutMs) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn with_memory_limit(mut self, bytes: u64) -> Self {
        self.memory_limit_bytes = bytes;
        self
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    #[inline]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}
