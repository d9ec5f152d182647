use std::{
    collections::HashMap,
    fmt,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use prace_model::JobId;
use tokio::sync::watch;
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};
use tracing::{debug, info};
use uuid::Uuid;

/// Coordinator lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RacePhase {
    Idle,
    Racing,
    Draining,
    Done,
}

impl fmt::Display for RacePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RacePhase::Idle => "idle",
            RacePhase::Racing => "racing",
            RacePhase::Draining => "draining",
            RacePhase::Done => "done",
        };
        f.write_str(s)
    }
}

/// State shared by every job of one race.
///
/// Holds the "race settled" signal, the first winner and the registry of live job pids.
/// The signal only ever goes from unset to set. A pid is registered under the registry
/// lock in the same critical section that spawns it, and only if the race has not settled,
/// so a cancellation sweep that snapshots the registry after settling sees every process
/// that can still be running.
pub struct RaceState {
    id: Uuid,
    settled: CancellationToken,
    winner: Mutex<Option<JobId>>,
    registry: Mutex<HashMap<u32, JobId>>,
    phase: watch::Sender<RacePhase>,
}

/// Result of asking the registry for permission to spawn.
pub enum Admission<T> {
    /// Spawned and registered; the registration is released when dropped.
    Admitted(T, Registration),
    /// The race already settled; nothing was spawned.
    Refused,
}

impl RaceState {
    pub fn new() -> Arc<Self> {
        let (phase, _) = watch::channel(RacePhase::Idle);
        Arc::new(Self {
            id: Uuid::new_v4(),
            settled: CancellationToken::new(),
            winner: Mutex::new(None),
            registry: Mutex::new(HashMap::new()),
            phase,
        })
    }

    /// Race identifier, used in log spans.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Record `job` as the winner and settle the race.
    ///
    /// Returns `true` only for the first caller; later winners leave the state unchanged.
    pub fn declare_winner(&self, job: &JobId) -> bool {
        let mut winner = lock(&self.winner);
        if winner.is_some() {
            debug!(target: "prace.core.state", %job, "late winner ignored");
            return false;
        }
        *winner = Some(job.clone());
        drop(winner);

        info!(target: "prace.core.state", race = %self.id, %job, "winner found");
        self.settled.cancel();
        true
    }

    /// Settle the race without a winner (external shutdown).
    pub fn abort(&self) {
        if !self.settled.is_cancelled() {
            info!(target: "prace.core.state", race = %self.id, "race aborted");
        }
        self.settled.cancel();
    }

    #[inline]
    pub fn is_settled(&self) -> bool {
        self.settled.is_cancelled()
    }

    /// Resolves once the race has settled, by a winner or by abort.
    pub fn settled(&self) -> WaitForCancellationFuture<'_> {
        self.settled.cancelled()
    }

    pub fn winner(&self) -> Option<JobId> {
        lock(&self.winner).clone()
    }

    /// Spawn a job process and register its pid atomically.
    ///
    /// `spawn` runs while the registry lock is held and returns the spawned handle together
    /// with its pid. It is not invoked at all if the race has settled.
    pub fn admit<T, E, F>(self: &Arc<Self>, job: &JobId, spawn: F) -> Result<Admission<T>, E>
    where
        F: FnOnce() -> Result<(T, u32), E>,
    {
        let mut registry = lock(&self.registry);
        if self.is_settled() {
            return Ok(Admission::Refused);
        }

        let (handle, pid) = spawn()?;
        registry.insert(pid, job.clone());
        drop(registry);

        debug!(target: "prace.core.state", %job, pid, "pid registered");
        Ok(Admission::Admitted(
            handle,
            Registration {
                state: Arc::clone(self),
                pid,
            },
        ))
    }

    /// Snapshot of the registry, ordered by pid.
    pub fn live_pids(&self) -> Vec<(u32, JobId)> {
        let registry = lock(&self.registry);
        let mut pids: Vec<_> = registry.iter().map(|(pid, job)| (*pid, job.clone())).collect();
        pids.sort_by_key(|(pid, _)| *pid);
        pids
    }

    pub fn is_registered(&self, pid: u32) -> bool {
        lock(&self.registry).contains_key(&pid)
    }

    pub fn phase(&self) -> RacePhase {
        *self.phase.borrow()
    }

    pub fn subscribe_phase(&self) -> watch::Receiver<RacePhase> {
        self.phase.subscribe()
    }

    pub(crate) fn set_phase(&self, phase: RacePhase) {
        debug!(target: "prace.core.state", race = %self.id, %phase, "phase");
        self.phase.send_replace(phase);
    }

    fn release(&self, pid: u32) {
        if lock(&self.registry).remove(&pid).is_some() {
            debug!(target: "prace.core.state", pid, "pid released");
        }
    }
}

/// Registry entry of one live job process; removes the pid when dropped.
///
/// Drop it only after the child has been reaped.
pub struct Registration {
    state: Arc<RaceState>,
    pid: u32,
}

impl Registration {
    pub fn pid(&self) -> u32 {
        self.pid
    }
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration").field("pid", &self.pid).finish()
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.state.release(self.pid);
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}
