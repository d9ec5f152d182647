use std::{
    path::{Path, PathBuf},
    process::Stdio,
    time::Duration,
};

use async_trait::async_trait;
use prace_core::CrossCheck;
use prace_model::Instance;
use tokio::process::Command;
use tracing::{debug, warn};

/// Cross check backed by an external checker binary.
///
/// `{instance}` and `{cex}` in the arguments are replaced by the instance path and the
/// counterexample path. Exit status 0 confirms the counterexample; anything else, including
/// failing to run the checker or exceeding the timeout, does not.
#[derive(Debug, Clone)]
pub struct CommandCrossCheck {
    program: PathBuf,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandCrossCheck {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: vec!["{instance}".into(), "{cex}".into()],
            timeout: Duration::from_secs(60),
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

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn expand(&self, instance: &Instance, counterexample: &Path) -> Vec<String> {
        let inst = instance.path().display().to_string();
        let cex = counterexample.display().to_string();
        self.args
            .iter()
            .map(|a| a.replace("{instance}", &inst).replace("{cex}", &cex))
            .collect()
    }
}

#[async_trait]
impl CrossCheck for CommandCrossCheck {
    fn name(&self) -> &'static str {
        "command"
    }

    async fn confirms_counterexample(&self, instance: &Instance, counterexample: &Path) -> bool {
        let args = self.expand(instance, counterexample);
        let mut cmd = Command::new(&self.program);
        cmd.args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                warn!(target: "prace.exec.check", program = %self.program.display(), error = %e, "checker did not start");
                return false;
            }
        };

        match tokio::time::timeout(self.timeout, child.wait()).await {
            Ok(Ok(status)) => {
                debug!(target: "prace.exec.check", ?args, %status, "checker finished");
                status.success()
            }
            Ok(Err(e)) => {
                warn!(target: "prace.exec.check", error = %e, "checker wait failed");
                false
            }
            Err(_) => {
                warn!(
                    target: "prace.exec.check",
                    timeout_ms = self.timeout.as_millis() as u64,
                    "checker timed out"
                );
                let _ = child.kill().await;
                false
            }
        }
    }
}
