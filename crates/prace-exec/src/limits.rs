//! POSIX rlimit-based resource limits for job processes.
//!
//! ## Overview
//!
//! Limits are applied inside a `pre_exec` hook, executed in the child process after `fork()`
//! and immediately before `execve()`. The solver therefore never runs without its address-space
//! ceiling; if a limit cannot be installed the hook fails, the spawn fails and the job is
//! reported as a runner error instead of running unconstrained.
//!
//! The same hook makes the child the leader of a new process group, so the whole subtree can be
//! signalled through the group id (which equals the job's pid).
//!
//! On non-Unix platforms limits are not supported; a warning is logged and the request is a no-op.
use tokio::process::Command;
#[cfg(not(unix))]
use tracing::warn;

/// Declarative rlimits for one job process.
///
/// `None` means "leave the inherited limit unchanged".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RlimitConfig {
    /// Virtual address-space ceiling in bytes (`RLIMIT_AS`).
    ///
    /// This is the job's memory limit. Allocations beyond it fail inside the solver.
    pub max_address_space_bytes: Option<u64>,

    /// Maximum number of open file descriptors (`RLIMIT_NOFILE`).
    pub max_open_files: Option<u64>,

    /// Maximum size of created files in bytes (`RLIMIT_FSIZE`).
    ///
    /// Exceeding it typically delivers `SIGXFSZ`.
    pub max_file_size_bytes: Option<u64>,

    /// Disable core dumps (`RLIMIT_CORE = 0`); crashing solvers are common and cores are large.
    pub disable_core_dumps: bool,

    /// Start the child in its own process group (`setpgid(0, 0)`).
    pub own_process_group: bool,
}

impl RlimitConfig {
    /// Returns `true` if nothing would be changed in the child.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.max_address_space_bytes.is_none()
            && self.max_open_files.is_none()
            && self.max_file_size_bytes.is_none()
            && !self.disable_core_dumps
            && !self.own_process_group
    }

    /// Copy of `self` with the job's memory ceiling and its own process group.
    pub fn for_job(&self, memory_limit_bytes: u64) -> Self {
        Self {
            max_address_space_bytes: Some(memory_limit_bytes),
            own_process_group: true,
            ..self.clone()
        }
    }
}

/// Attach the limits of `config` to `cmd`.
///
/// On Unix this installs a `pre_exec` hook; elsewhere a non-empty config only logs a warning.
pub fn attach_rlimits(cmd: &mut Command, config: &RlimitConfig) {
    if config.is_empty() {
        return;
    }

    #[cfg(unix)]
    {
        unix_impl::attach_rlimits(cmd, config);
    }

    #[cfg(not(unix))]
    {
        let _ = cmd;
        warn!(
            target: "prace.exec.limits",
            ?config,
            "rlimit-based process limits requested on a non-Unix OS; limits will be ignored"
        );
    }
}

#[cfg(unix)]
mod unix_impl {
    use std::io;

    use tokio::process::Command;

    use super::RlimitConfig;

    pub fn attach_rlimits(cmd: &mut Command, config: &RlimitConfig) {
        let address_space = config.max_address_space_bytes;
        let open_files = config.max_open_files;
        let file_size = config.max_file_size_bytes;
        let disable_core_dumps = config.disable_core_dumps;
        let own_process_group = config.own_process_group;

        // Only async-signal-safe calls below: this runs between fork and exec.
        unsafe {
            cmd.pre_exec(move || {
                if own_process_group && libc::setpgid(0, 0) != 0 {
                    return Err(io::Error::last_os_error());
                }
                if let Some(bytes) = address_space {
                    apply_rlimit(libc::RLIMIT_AS, bytes)?;
                }
                if let Some(nofile) = open_files {
                    apply_rlimit(libc::RLIMIT_NOFILE, nofile)?;
                }
                if let Some(fsize) = file_size {
                    apply_rlimit(libc::RLIMIT_FSIZE, fsize)?;
                }
                if disable_core_dumps {
                    apply_rlimit(libc::RLIMIT_CORE, 0)?;
                }
                Ok(())
            });
        }
    }

    #[cfg(all(target_os = "linux", target_env = "gnu"))]
    type Resource = libc::__rlimit_resource_t;
    #[cfg(not(all(target_os = "linux", target_env = "gnu")))]
    type Resource = libc::c_int;

    fn apply_rlimit(resource: Resource, value: u64) -> io::Result<()> {
        let rlim = libc::rlimit {
            rlim_cur: value as libc::rlim_t,
            rlim_max: value as libc::rlim_t,
        };

        let rc = unsafe { libc::setrlimit(resource, &rlim) };
        if rc != 0 {
            Err(io::Error::last_os_error())
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_noop() {
        let config = RlimitConfig::default();
        assert!(config.is_empty());

        let mut cmd = Command::new("sh");
        attach_rlimits(&mut cmd, &config);
    }

    #[test]
    fn for_job_sets_ceiling_and_group() {
        let base = RlimitConfig {
            disable_core_dumps: true,
            ..Default::default()
        };
        let job = base.for_job(4 * prace_model::GIB);

        assert_eq!(job.max_address_space_bytes, Some(4 * prace_model::GIB));
        assert!(job.own_process_group);
        assert!(job.disable_core_dumps);
        assert!(!job.is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn address_space_limit_is_visible_in_child() {
        let limit: u64 = 2 * prace_model::GIB;
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg("ulimit -v");
        cmd.stdout(std::process::Stdio::piped());
        attach_rlimits(&mut cmd, &RlimitConfig::default().for_job(limit));

        let out = cmd.output().await.unwrap();
        assert!(out.status.success());
        // `ulimit -v` reports KiB.
        let reported = String::from_utf8_lossy(&out.stdout).trim().to_string();
        assert_eq!(reported, (limit / 1024).to_string());
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn child_leads_its_own_group() {
        let mut cmd = Command::new("sh");
        // Field 5 of /proc/<pid>/stat is the process group id.
        cmd.arg("-c").arg("cut -d' ' -f5 /proc/$$/stat");
        cmd.stdout(std::process::Stdio::piped());
        attach_rlimits(&mut cmd, &RlimitConfig::default().for_job(prace_model::GIB));

        let child = cmd.spawn().unwrap();
        let pid = child.id().unwrap();
        let out = child.wait_with_output().await.unwrap();
        let pgid = String::from_utf8_lossy(&out.stdout).trim().to_string();
        assert_eq!(pgid, pid.to_string());
    }
}
