use std::path::PathBuf;

use crate::VerdictKind;

/// The single artifact chosen as the final answer for an instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub kind: VerdictKind,
    /// Artifact inside the job output directory it was copied from.
    pub source: PathBuf,
    /// Copy in the canonical output directory.
    pub path: PathBuf,
    /// Both a certificate and a counterexample existed and a cross check decided.
    pub conflict: bool,
}

/// Result of a collection pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Collection {
    Verdict(Verdict),
    /// No job left a usable artifact; nothing was written.
    NoResult,
}

impl Collection {
    pub fn verdict(&self) -> Option<&Verdict> {
        match self {
            Collection::Verdict(v) => Some(v),
            Collection::NoResult => None,
        }
    }
}
