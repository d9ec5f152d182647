use serde::{Deserialize, Serialize};

/// Result file a solver may leave in its output directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ArtifactKind {
    /// `<base>.w.aag`: inductive invariant, the property holds.
    Certificate,
    /// `<base>.cex`: counterexample trace.
    Cex,
    /// `<base>.res`: counterexample trace, alternate form.
    Res,
}

impl ArtifactKind {
    /// Every kind, certificate first, then counterexample forms in lookup order.
    pub const ALL: [ArtifactKind; 3] = [ArtifactKind::Certificate, ArtifactKind::Cex, ArtifactKind::Res];

    /// Counterexample forms in lookup order.
    pub const COUNTEREXAMPLES: [ArtifactKind; 2] = [ArtifactKind::Cex, ArtifactKind::Res];

    pub fn suffix(self) -> &'static str {
        match self {
            ArtifactKind::Certificate => ".w.aag",
            ArtifactKind::Cex => ".cex",
            ArtifactKind::Res => ".res",
        }
    }

    pub fn verdict_kind(self) -> VerdictKind {
        match self {
            ArtifactKind::Certificate => VerdictKind::Certificate,
            ArtifactKind::Cex | ArtifactKind::Res => VerdictKind::Counterexample,
        }
    }
}

/// Final answer class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum VerdictKind {
    Certificate,
    Counterexample,
}

impl VerdictKind {
    /// Suffix of the file written to the canonical output directory.
    ///
    /// Counterexamples are always published as `.cex`, whichever form the solver wrote.
    pub fn output_suffix(self) -> &'static str {
        match self {
            VerdictKind::Certificate => ArtifactKind::Certificate.suffix(),
            VerdictKind::Counterexample => ArtifactKind::Cex.suffix(),
        }
    }
}
