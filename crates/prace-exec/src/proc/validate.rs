use std::{fmt, path::Path};

use prace_core::artifacts;
use prace_model::{ArtifactKind, Instance};

use super::StderrPolicy;
use crate::util::Captured;

/// Why a finished job does not count as a win.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    ExitStatus,
    Stderr,
    NoArtifact,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Rejection::ExitStatus => "unsuccessful exit status",
            Rejection::Stderr => "stderr not accepted",
            Rejection::NoArtifact => "no result artifact",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Validation {
    /// First artifact found in the job's output directory.
    Accepted(ArtifactKind),
    Rejected(Rejection),
}

impl Validation {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Validation::Accepted(_))
    }
}

/// Decides whether a finished job produced a valid answer.
///
/// All three must hold: the process exited successfully, its stderr passes the policy, and a
/// non-empty artifact for the instance exists in the job's output directory.
#[derive(Debug, Clone, Default)]
pub struct ResultValidator {
    stderr: StderrPolicy,
}

impl ResultValidator {
    pub fn new(stderr: StderrPolicy) -> Self {
        Self { stderr }
    }

    pub fn evaluate(&self, success: bool, stderr: &Captured, output_dir: &Path, instance: &Instance) -> Validation {
        if !success {
            return Validation::Rejected(Rejection::ExitStatus);
        }
        if !self.stderr.accepts(stderr) {
            return Validation::Rejected(Rejection::Stderr);
        }
        match artifacts::present(output_dir, instance).first() {
            Some((kind, _)) => Validation::Accepted(*kind),
            None => Validation::Rejected(Rejection::NoArtifact),
        }
    }
}
