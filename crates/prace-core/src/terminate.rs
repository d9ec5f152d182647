use async_trait::async_trait;

/// Result of tearing down one process tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KillOutcome {
    /// Nothing left to signal.
    AlreadyExited,
    /// The tree exited after the polite signal.
    Terminated,
    /// Survivors had to be force-killed after the grace window.
    Killed,
    /// Some signal could not be delivered; the sweep went on regardless.
    Failed(String),
}

/// Kills a process and all of its descendants.
#[async_trait]
pub trait Terminator: Send + Sync {
    async fn kill_tree(&self, pid: u32) -> KillOutcome;
}
