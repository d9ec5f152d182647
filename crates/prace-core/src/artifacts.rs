//! On-disk result artifacts.
//!
//! An artifact only counts when it is a regular file with at least one byte; an empty
//! file is treated as if it did not exist.
use std::{
    fs,
    path::{Path, PathBuf},
};

use prace_model::{ArtifactKind, Instance};

/// `true` if `path` is a non-empty regular file.
pub fn is_present(path: &Path) -> bool {
    fs::metadata(path)
        .map(|m| m.is_file() && m.len() > 0)
        .unwrap_or(false)
}

/// Path of the `kind` artifact in `dir`, if present.
pub fn find(dir: &Path, instance: &Instance, kind: ArtifactKind) -> Option<PathBuf> {
    let path = instance.artifact_path(dir, kind);
    is_present(&path).then_some(path)
}

/// First counterexample form present in `dir` (`.cex` before `.res`).
pub fn find_counterexample(dir: &Path, instance: &Instance) -> Option<(ArtifactKind, PathBuf)> {
    ArtifactKind::COUNTEREXAMPLES
        .into_iter()
        .find_map(|kind| find(dir, instance, kind).map(|p| (kind, p)))
}

/// Every artifact present in `dir`.
pub fn present(dir: &Path, instance: &Instance) -> Vec<(ArtifactKind, PathBuf)> {
    ArtifactKind::ALL
        .into_iter()
        .filter_map(|kind| find(dir, instance, kind).map(|p| (kind, p)))
        .collect()
}
