//! Process-tree termination.
//!
//! A job is started as the leader of its own process group, but solvers may fork helpers that
//! move to another group. The tree is therefore collected twice: by group id and by walking
//! parent links in `/proc`. The whole tree is snapshotted before the first signal, since
//! orphaned descendants are re-parented and can no longer be found through their parent.
//!
//! Polite `SIGTERM` first, `SIGKILL` for whatever survives the grace window. A zombie counts as
//! exited: it holds no resources besides its table slot and is reaped by its parent.
use std::time::{Duration, Instant};

use async_trait::async_trait;
use prace_core::{KillOutcome, Terminator};
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct ProcessTerminator {
    /// Time between `SIGTERM` and `SIGKILL`.
    grace: Duration,
    /// Liveness polling interval inside the grace window.
    poll: Duration,
}

impl Default for ProcessTerminator {
    fn default() -> Self {
        Self {
            grace: Duration::from_secs(2),
            poll: Duration::from_millis(25),
        }
    }
}

impl ProcessTerminator {
    pub fn new(grace: Duration) -> Self {
        Self {
            grace,
            ..Self::default()
        }
    }

    /// `SIGKILL` the tree rooted at `pid` without a grace window and without waiting.
    pub fn kill_tree_now(pid: u32) -> KillOutcome {
        if let Some(refused) = refuse(pid) {
            return refused;
        }
        let tree = sys::tree(pid);
        if !tree.iter().any(|p| sys::is_alive(*p)) {
            return KillOutcome::AlreadyExited;
        }
        match sys::signal_tree(pid, &tree, sys::Sig::Kill) {
            Ok(()) => KillOutcome::Killed,
            Err(reason) => KillOutcome::Failed(reason),
        }
    }

    /// `SIGKILL` whatever is left in the group led by `pgid` once the leader has been reaped.
    ///
    /// Only the group is signalled: the leader's pid itself may already belong to someone else.
    pub fn kill_group_now(pgid: u32) -> KillOutcome {
        if let Some(refused) = refuse(pgid) {
            return refused;
        }
        match sys::signal_group(pgid, sys::Sig::Kill) {
            Ok(true) => KillOutcome::Killed,
            Ok(false) => KillOutcome::AlreadyExited,
            Err(reason) => KillOutcome::Failed(reason),
        }
    }

    /// Wait until every pid of `tree` is gone, for at most `grace`.
    async fn wait_exit(&self, tree: &[u32]) -> bool {
        let deadline = Instant::now() + self.grace;
        loop {
            if !tree.iter().any(|p| sys::is_alive(*p)) {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(self.poll).await;
        }
    }
}

#[async_trait]
impl Terminator for ProcessTerminator {
    async fn kill_tree(&self, pid: u32) -> KillOutcome {
        if let Some(refused) = refuse(pid) {
            return refused;
        }

        let tree = sys::tree(pid);
        if !tree.iter().any(|p| sys::is_alive(*p)) {
            debug!(target: "prace.exec.terminate", pid, "already exited");
            return KillOutcome::AlreadyExited;
        }
        debug!(target: "prace.exec.terminate", pid, tree = ?tree, "sending SIGTERM");

        let term = sys::signal_tree(pid, &tree, sys::Sig::Term);
        if self.wait_exit(&tree).await {
            return match term {
                Ok(()) => KillOutcome::Terminated,
                Err(reason) => KillOutcome::Failed(reason),
            };
        }

        let survivors: Vec<u32> = tree.iter().copied().filter(|p| sys::is_alive(*p)).collect();
        info!(
            target: "prace.exec.terminate",
            pid,
            survivors = ?survivors,
            grace_ms = self.grace.as_millis() as u64,
            "grace expired, sending SIGKILL"
        );
        match (term, sys::signal_tree(pid, &survivors, sys::Sig::Kill)) {
            (Ok(()), Ok(())) => KillOutcome::Killed,
            (Err(reason), _) | (_, Err(reason)) => KillOutcome::Failed(reason),
        }
    }
}

fn refuse(pid: u32) -> Option<KillOutcome> {
    if pid <= 1 || pid > i32::MAX as u32 {
        warn!(target: "prace.exec.terminate", pid, "refusing to signal pid");
        return Some(KillOutcome::Failed(format!("refusing to signal pid {pid}")));
    }
    None
}

#[cfg(unix)]
mod sys {
    use nix::{
        errno::Errno,
        sys::signal::{Signal, kill, killpg},
        unistd::Pid,
    };
    use tracing::warn;

    #[derive(Debug, Clone, Copy)]
    pub enum Sig {
        Term,
        Kill,
    }

    impl Sig {
        fn signal(self) -> Signal {
            match self {
                Sig::Term => Signal::SIGTERM,
                Sig::Kill => Signal::SIGKILL,
            }
        }
    }

    /// `root` followed by every descendant and group member found.
    pub fn tree(root: u32) -> Vec<u32> {
        let mut tree = vec![root];
        tree.extend(descendants(root));
        tree
    }

    /// `Ok(false)` if no process is left in the group.
    pub fn signal_group(root: u32, sig: Sig) -> Result<bool, String> {
        match killpg(Pid::from_raw(root as i32), sig.signal()) {
            Ok(()) => Ok(true),
            Err(Errno::ESRCH) => Ok(false),
            Err(e) => Err(format!("{:?} group {root}: {e}", sig.signal())),
        }
    }

    /// Signal the group led by `root`, then every pid of `tree` individually.
    ///
    /// Vanished targets are not errors. The first other failure is returned after every
    /// target has been tried.
    pub fn signal_tree(root: u32, tree: &[u32], sig: Sig) -> Result<(), String> {
        let mut failure = None;

        if let Err(reason) = signal_group(root, sig) {
            note(&mut failure, reason);
        }
        for pid in tree {
            match kill(Pid::from_raw(*pid as i32), sig.signal()) {
                Ok(()) | Err(Errno::ESRCH) => {}
                Err(e) => note(&mut failure, format!("{:?} {pid}: {e}", sig.signal())),
            }
        }

        failure.map_or(Ok(()), Err)
    }

    fn note(failure: &mut Option<String>, reason: String) {
        warn!(target: "prace.exec.terminate", %reason, "signal not delivered");
        failure.get_or_insert(reason);
    }

    cfg_if::cfg_if! {
        if #[cfg(target_os = "linux")] {
            use std::{
                collections::{HashMap, VecDeque},
                fs,
            };

            /// `(state, ppid, pgrp)` from the contents of `/proc/<pid>/stat`.
            pub(super) fn parse_stat(stat: &str) -> Option<(char, u32, u32)> {
                // comm may contain spaces and parentheses; fields resume after the last ')'.
                let rest = &stat[stat.rfind(')')? + 1..];
                let mut fields = rest.split_whitespace();
                let state = fields.next()?.chars().next()?;
                let ppid = fields.next()?.parse().ok()?;
                let pgrp = fields.next()?.parse().ok()?;
                Some((state, ppid, pgrp))
            }

            fn stat(pid: u32) -> Option<(char, u32, u32)> {
                parse_stat(&fs::read_to_string(format!("/proc/{pid}/stat")).ok()?)
            }

            pub fn is_alive(pid: u32) -> bool {
                matches!(stat(pid), Some((state, _, _)) if state != 'Z' && state != 'X')
            }

            fn descendants(root: u32) -> Vec<u32> {
                let Ok(entries) = fs::read_dir("/proc") else {
                    return Vec::new();
                };

                let mut children: HashMap<u32, Vec<u32>> = HashMap::new();
                let mut found = Vec::new();
                for entry in entries.flatten() {
                    let Some(pid) = entry.file_name().to_str().and_then(|s| s.parse::<u32>().ok()) else {
                        continue;
                    };
                    if pid == root {
                        continue;
                    }
                    let Some((_, ppid, pgrp)) = stat(pid) else {
                        continue;
                    };
                    children.entry(ppid).or_default().push(pid);
                    if pgrp == root {
                        found.push(pid);
                    }
                }

                let mut queue = VecDeque::from([root]);
                while let Some(parent) = queue.pop_front() {
                    for child in children.remove(&parent).unwrap_or_default() {
                        if !found.contains(&child) {
                            found.push(child);
                        }
                        queue.push_back(child);
                    }
                }
                found.sort_unstable();
                found
            }
        } else {
            pub fn is_alive(pid: u32) -> bool {
                kill(Pid::from_raw(pid as i32), None::<Signal>).is_ok()
            }

            // Without /proc only the process group reaches grandchildren.
            fn descendants(_root: u32) -> Vec<u32> {
                Vec::new()
            }
        }
    }
}

#[cfg(not(unix))]
mod sys {
    #[derive(Debug, Clone, Copy)]
    pub enum Sig {
        Term,
        Kill,
    }

    pub fn tree(root: u32) -> Vec<u32> {
        vec![root]
    }

    pub fn signal_group(_root: u32, _sig: Sig) -> Result<bool, String> {
        Err("process termination is not supported on this platform".into())
    }

    pub fn signal_tree(_root: u32, _tree: &[u32], _sig: Sig) -> Result<(), String> {
        Err("process termination is not supported on this platform".into())
    }

    pub fn is_alive(_pid: u32) -> bool {
        true
    }
}
