use std::{
    process::ExitStatus,
    str::FromStr,
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};

use async_trait::async_trait;
use prace_core::{Admission, JobReport, JobRunner, KillOutcome, RunContext};
use prace_model::{JobSpec, Outcome};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{
    error::ExecError,
    limits::{RlimitConfig, attach_rlimits},
    terminate::ProcessTerminator,
    util::{Captured, StderrSink, capture, cmd_program, take_captured},
};

mod validate;
pub use validate::{Rejection, ResultValidator, Validation};

/// What a job may print on stderr and still win.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StderrPolicy {
    /// Any stderr output disqualifies.
    #[default]
    Reject,
    Ignore,
    /// Disqualify only if stderr contains one of the substrings.
    RejectMatching(Vec<String>),
}

impl StderrPolicy {
    /// Substrings the whole stream is searched for, independent of how much of it is retained.
    pub fn patterns(&self) -> &[String] {
        match self {
            StderrPolicy::RejectMatching(patterns) => patterns,
            StderrPolicy::Reject | StderrPolicy::Ignore => &[],
        }
    }

    pub fn accepts(&self, stderr: &Captured) -> bool {
        match self {
            StderrPolicy::Reject => stderr.total == 0,
            StderrPolicy::Ignore => true,
            StderrPolicy::RejectMatching(_) => !stderr.matched,
        }
    }
}

impl FromStr for StderrPolicy {
    type Err = ExecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reject" => Ok(StderrPolicy::Reject),
            "ignore" => Ok(StderrPolicy::Ignore),
            other => Err(ExecError::InvalidPolicy(other.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunnerConfig {
    pub stderr_policy: StderrPolicy,
    /// Bytes of stderr retained per job.
    pub stderr_limit: usize,
    /// How long to keep draining stderr after the child is reaped.
    pub stderr_drain_grace: Duration,
    /// Limits applied to every job; the address-space ceiling comes from the job itself.
    pub base_limits: RlimitConfig,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            stderr_policy: StderrPolicy::default(),
            stderr_limit: 64 * 1024,
            stderr_drain_grace: Duration::from_millis(500),
            base_limits: RlimitConfig {
                disable_core_dumps: true,
                ..Default::default()
            },
        }
    }
}

/// Runs a job as a native child process.
pub struct ProcRunner {
    name: &'static str,
    cfg: RunnerConfig,
    validator: ResultValidator,
}

impl ProcRunner {
    pub fn new(cfg: RunnerConfig) -> Self {
        let validator = ResultValidator::new(cfg.stderr_policy.clone());
        Self {
            name: "proc",
            cfg,
            validator,
        }
    }

    pub fn with_name(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }
}

impl Default for ProcRunner {
    fn default() -> Self {
        Self::new(RunnerConfig::default())
    }
}

enum Exit {
    Exited(ExitStatus),
    TimedOut(Option<ExitStatus>),
    WaitFailed(String),
}

#[async_trait]
impl JobRunner for ProcRunner {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn run(&self, job: &JobSpec, ctx: &RunContext) -> JobReport {
        let started = Instant::now();
        if job.program.as_os_str().is_empty() {
            return JobReport::error(job.id.clone(), ExecError::MissingProgram.to_string());
        }

        let mut cmd = cmd_program(&job.program, &job.args);
        attach_rlimits(&mut cmd, &self.cfg.base_limits.for_job(job.memory_limit_bytes));

        let admission = ctx.state.admit(&job.id, || {
            let child = cmd.spawn().map_err(|e| ExecError::Spawn {
                program: job.program.display().to_string(),
                reason: e.to_string(),
            })?;
            let pid = child.id().ok_or(ExecError::MissingPid)?;
            Ok::<_, ExecError>((child, pid))
        });
        let (mut child, registration) = match admission {
            Ok(Admission::Admitted(child, registration)) => (child, registration),
            Ok(Admission::Refused) => {
                debug!(target: "prace.exec.runner", job = %job.id, "race settled before spawn");
                return JobReport::skipped(job.id.clone());
            }
            Err(e) => {
                warn!(target: "prace.exec.runner", job = %job.id, error = %e, "spawn failed");
                let mut report = JobReport::error(job.id.clone(), e.to_string());
                report.elapsed = started.elapsed();
                return report;
            }
        };

        let pid = registration.pid();
        info!(
            target: "prace.exec.runner",
            job = %job.id,
            pid,
            program = %job.program.display(),
            timeout_ms = job.timeout_ms,
            "begin"
        );

        let sink = Arc::new(Mutex::new(StderrSink::new(
            self.cfg.stderr_limit,
            self.cfg.stderr_policy.patterns(),
        )));
        let drain = child.stderr.take().map(|stderr| tokio::spawn(capture(stderr, Arc::clone(&sink))));

        let exit = match tokio::time::timeout(job.timeout(), child.wait()).await {
            Ok(Ok(status)) => {
                // Nothing from the job's group may outlive it.
                if let KillOutcome::Killed = ProcessTerminator::kill_group_now(pid) {
                    debug!(target: "prace.exec.runner", job = %job.id, pid, "killed processes left in the job's group");
                }
                Exit::Exited(status)
            }
            Ok(Err(e)) => {
                ProcessTerminator::kill_tree_now(pid);
                let _ = child.start_kill();
                let _ = child.wait().await;
                Exit::WaitFailed(ExecError::Wait(e.to_string()).to_string())
            }
            Err(_) => {
                info!(target: "prace.exec.runner", job = %job.id, pid, timeout_ms = job.timeout_ms, "timeout");
                ProcessTerminator::kill_tree_now(pid);
                let _ = child.start_kill();
                Exit::TimedOut(child.wait().await.ok())
            }
        };
        // Reaped; the pid may be recycled from here on.
        drop(registration);

        if let Some(mut drain) = drain {
            if tokio::time::timeout(self.cfg.stderr_drain_grace, &mut drain).await.is_err() {
                debug!(target: "prace.exec.runner", job = %job.id, "stderr still open after exit, abandoning it");
                drain.abort();
            }
        }
        let stderr = take_captured(&sink);
        if stderr.total > stderr.kept.len() {
            debug!(
                target: "prace.exec.runner",
                job = %job.id,
                total = stderr.total,
                kept = stderr.kept.len(),
                "stderr truncated"
            );
        }

        let mut report = JobReport::new(job.id.clone(), Outcome::Completed);
        report.pid = Some(pid);

        let outcome = match &exit {
            Exit::WaitFailed(reason) => Outcome::RunnerError(reason.clone()),
            Exit::TimedOut(_) => Outcome::TimedOut,
            Exit::Exited(status) => {
                match self
                    .validator
                    .evaluate(status.success(), &stderr, &job.output_dir, &ctx.instance)
                {
                    Validation::Accepted(kind) => {
                        if !ctx.state.declare_winner(&job.id) {
                            debug!(target: "prace.exec.runner", job = %job.id, "valid result after the race settled");
                        }
                        debug!(
                            target: "prace.exec.runner",
                            job = %job.id,
                            ?kind,
                            verdict = ?kind.verdict_kind(),
                            "result accepted"
                        );
                        Outcome::Won
                    }
                    Validation::Rejected(reason) => {
                        debug!(target: "prace.exec.runner", job = %job.id, %reason, "result rejected");
                        if ctx.state.is_settled() && !status.success() {
                            Outcome::Cancelled
                        } else {
                            Outcome::Completed
                        }
                    }
                }
            }
        };

        if let Exit::Exited(status) | Exit::TimedOut(Some(status)) = &exit {
            report.exit_code = status.code();
            report.signal = signal_of(status);
        }
        report.stderr = stderr.kept;
        report.outcome = outcome;
        report.elapsed = started.elapsed();

        info!(
            target: "prace.exec.runner",
            job = %job.id,
            pid,
            outcome = report.outcome.tag(),
            exit_code = ?report.exit_code,
            signal = ?report.signal,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "end"
        );
        report
    }
}

fn signal_of(status: &ExitStatus) -> Option<i32> {
    cfg_if::cfg_if! {
        if #[cfg(unix)] {
            use std::os::unix::process::ExitStatusExt;
            status.signal()
        } else {
            let _ = status;
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seen(policy: &StderrPolicy, limit: usize, chunks: &[&[u8]]) -> Captured {
        let mut sink = StderrSink::new(limit, policy.patterns());
        for chunk in chunks {
            sink.push(chunk);
        }
        sink.take()
    }

    #[test]
    fn stderr_policies() {
        let reject = StderrPolicy::Reject;
        assert!(reject.accepts(&seen(&reject, 64, &[])));
        assert!(!reject.accepts(&seen(&reject, 64, &[b"x"])));
        // Nothing retained, but something was written.
        assert!(!reject.accepts(&seen(&reject, 0, &[b"x"])));
        assert!(StderrPolicy::Ignore.accepts(&seen(&StderrPolicy::Ignore, 64, &[b"anything"])));

        let matching = StderrPolicy::RejectMatching(vec!["error".into(), "abort".into()]);
        assert!(matching.accepts(&seen(&matching, 64, &[b"warning: slow\n"])));
        assert!(!matching.accepts(&seen(&matching, 64, &[b"fatal error: oom\n"])));
    }

    #[test]
    fn matching_policy_sees_past_the_retention_limit() {
        let matching = StderrPolicy::RejectMatching(vec!["error".into()]);
        let noise = vec![b'x'; 70_000];
        let captured = seen(&matching, 64 * 1024, &[&noise, b"fatal err", b"or: bogus\n"]);

        assert_eq!(captured.kept.len(), 64 * 1024);
        assert!(!matching.accepts(&captured));
        assert!(StderrPolicy::Reject.patterns().is_empty());
    }

    #[test]
    fn policy_from_str() {
        assert_eq!("reject".parse::<StderrPolicy>().unwrap(), StderrPolicy::Reject);
        assert_eq!(" IGNORE ".parse::<StderrPolicy>().unwrap(), StderrPolicy::Ignore);
        assert!(matches!(
            "sometimes".parse::<StderrPolicy>(),
            Err(ExecError::InvalidPolicy(p)) if p == "sometimes"
        ));
    }

    #[test]
    fn policy_serde_is_camel_case() {
        let json = serde_json::to_string(&StderrPolicy::RejectMatching(vec!["oom".into()])).unwrap();
        assert_eq!(json, r#"{"rejectMatching":["oom"]}"#);
        let back: StderrPolicy = serde_json::from_str(r#""ignore""#).unwrap();
        assert_eq!(back, StderrPolicy::Ignore);
    }

    #[test]
    fn default_config_keeps_core_dumps_off() {
        let cfg = RunnerConfig::default();
        assert_eq!(cfg.stderr_policy, StderrPolicy::Reject);
        assert_eq!(cfg.stderr_limit, 64 * 1024);
        assert!(cfg.base_limits.disable_core_dumps);
        assert!(cfg.base_limits.max_address_space_bytes.is_none());
    }
}
