use std::path::Path;

use anyhow::{Context, Result};
use prace_model::{Instance, JobSpec, VerdictKind};
use tracing::debug;

/// Give every job an empty output directory.
///
/// Leftovers from an earlier run would otherwise be collected as this run's answer.
pub async fn prepare(jobs: &[JobSpec]) -> Result<()> {
    for job in jobs {
        let dir = &job.output_dir;
        match tokio::fs::remove_dir_all(dir).await {
            Ok(()) => debug!(target: "prace.cli", dir = %dir.display(), "stale output removed"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e).with_context(|| format!("clear {}", dir.display())),
        }
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("create {}", dir.display()))?;
    }
    Ok(())
}

/// Remove verdict files an earlier run published for `instance` into `output`.
///
/// Other files in `output` are left alone.
pub async fn clear_verdicts(output: &Path, instance: &Instance) -> Result<()> {
    for kind in [VerdictKind::Certificate, VerdictKind::Counterexample] {
        let path = output.join(format!("{}{}", instance.base_name(), kind.output_suffix()));
        match tokio::fs::remove_file(&path).await {
            Ok(()) => debug!(target: "prace.cli", path = %path.display(), "stale verdict removed"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e).with_context(|| format!("remove {}", path.display())),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[tokio::test]
    async fn stale_artifacts_are_wiped() {
        let root = tempfile::tempdir().unwrap();
        let stale = root.path().join("mcar1");
        fs::create_dir_all(&stale).unwrap();
        fs::write(stale.join("foo.cex"), b"old").unwrap();

        let jobs = vec![
            JobSpec::new("mcar1", "MCAR").with_output_dir(&stale),
            JobSpec::new("sc1", "simplecar").with_output_dir(root.path().join("nested/sc1")),
        ];
        prepare(&jobs).await.unwrap();

        for job in &jobs {
            assert!(job.output_dir.is_dir());
            assert_eq!(fs::read_dir(&job.output_dir).unwrap().count(), 0);
        }
    }

    #[tokio::test]
    async fn earlier_verdicts_are_cleared_from_the_output() {
        let root = tempfile::tempdir().unwrap();
        let out = root.path().join("out");
        fs::create_dir_all(&out).unwrap();
        fs::write(out.join("foo.w.aag"), b"old cert").unwrap();
        fs::write(out.join("foo.cex"), b"old cex").unwrap();
        fs::write(out.join("bar.cex"), b"other instance").unwrap();

        let instance = Instance::from_path("bench/foo.aig").unwrap();
        clear_verdicts(&out, &instance).await.unwrap();

        assert!(!out.join("foo.w.aag").exists());
        assert!(!out.join("foo.cex").exists());
        assert!(out.join("bar.cex").is_file());

        // Missing output directory is fine.
        clear_verdicts(&root.path().join("missing"), &instance).await.unwrap();
    }

    #[tokio::test]
    async fn file_in_the_way_is_an_error() {
        let root = tempfile::tempdir().unwrap();
        fs::write(root.path().join("blocker"), b"").unwrap();
        let jobs = vec![JobSpec::new("x", "x").with_output_dir(root.path().join("blocker/x"))];
        assert!(prepare(&jobs).await.is_err());
    }
}
