use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use prace_model::{ArtifactKind, Collection, Instance, Verdict, VerdictKind};
use tracing::{debug, info, instrument, warn};

use crate::{artifacts, cross_check::CrossCheck, error::CoreError};

/// Picks the final answer from the artifacts the jobs left on disk.
///
/// Directories are scanned in the order given. The first non-empty certificate and the
/// first non-empty counterexample are taken; when both exist the cross check decides.
pub struct ResultCollector {
    cross_check: Arc<dyn CrossCheck>,
}

impl ResultCollector {
    pub fn new(cross_check: Arc<dyn CrossCheck>) -> Self {
        Self { cross_check }
    }

    /// Copy the chosen artifact into `output_dir`.
    ///
    /// Writes exactly one file when a verdict exists and nothing otherwise. `output_dir` is
    /// created if missing.
    #[instrument(
        level = "info",
        skip(self, job_dirs, instance, output_dir),
        fields(instance = %instance.base_name(), dirs = job_dirs.len(), check = self.cross_check.name())
    )]
    pub async fn collect(
        &self,
        job_dirs: &[PathBuf],
        instance: &Instance,
        output_dir: &Path,
    ) -> Result<Collection, CoreError> {
        let certificate = job_dirs
            .iter()
            .find_map(|dir| artifacts::find(dir, instance, ArtifactKind::Certificate));
        if let Some(path) = &certificate {
            debug!(target: "prace.core.collect", path = %path.display(), "certificate found");
        }

        let counterexample = job_dirs
            .iter()
            .find_map(|dir| artifacts::find_counterexample(dir, instance))
            .map(|(_, path)| path);
        if let Some(path) = &counterexample {
            debug!(target: "prace.core.collect", path = %path.display(), "counterexample found");
        }

        let (kind, source, conflict) = match (certificate, counterexample) {
            (Some(cert), Some(cex)) => {
                warn!(
                    target: "prace.core.collect",
                    certificate = %cert.display(),
                    counterexample = %cex.display(),
                    "conflicting artifacts, running cross check"
                );
                if self.cross_check.confirms_counterexample(instance, &cex).await {
                    (VerdictKind::Counterexample, cex, true)
                } else {
                    (VerdictKind::Certificate, cert, true)
                }
            }
            (None, Some(cex)) => (VerdictKind::Counterexample, cex, false),
            (Some(cert), None) => (VerdictKind::Certificate, cert, false),
            (None, None) => {
                info!(target: "prace.core.collect", "no job produced a result");
                return Ok(Collection::NoResult);
            }
        };

        let path = publish(&source, instance, kind, output_dir).await?;
        info!(
            target: "prace.core.collect",
            ?kind,
            conflict,
            path = %path.display(),
            "verdict written"
        );

        Ok(Collection::Verdict(Verdict {
            kind,
            source,
            path,
            conflict,
        }))
    }
}

async fn publish(
    source: &Path,
    instance: &Instance,
    kind: VerdictKind,
    output_dir: &Path,
) -> Result<PathBuf, CoreError> {
    tokio::fs::create_dir_all(output_dir)
        .await
        .map_err(|source| CoreError::CreateDir {
            path: output_dir.to_path_buf(),
            source,
        })?;

    let dest = output_dir.join(format!("{}{}", instance.base_name(), kind.output_suffix()));
    tokio::fs::copy(source, &dest)
        .await
        .map_err(|e| CoreError::Copy {
            from: source.to_path_buf(),
            to: dest.clone(),
            source: e,
        })?;
    Ok(dest)
}
