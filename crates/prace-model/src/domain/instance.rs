use std::path::{Path, PathBuf};

use crate::{ArtifactKind, ModelError};

const FORMAT_EXTENSIONS: [&str; 2] = [".aig", ".aag"];

/// The verification problem handed to every job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instance {
    path: PathBuf,
    base_name: String,
}

impl Instance {
    /// Derive the base name from `path` without touching the filesystem.
    ///
    /// A trailing `.aig` / `.aag` is stripped; any other file name is kept as is.
    pub fn from_path(path: impl Into<PathBuf>) -> Result<Self, ModelError> {
        let path = path.into();
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| ModelError::InvalidInstance {
                path: path.clone(),
                reason: "no utf-8 file name".into(),
            })?;

        let base_name = FORMAT_EXTENSIONS
            .iter()
            .find_map(|ext| file_name.strip_suffix(ext))
            .unwrap_or(file_name);
        if base_name.is_empty() {
            return Err(ModelError::InvalidInstance {
                path: path.clone(),
                reason: "empty base name".into(),
            });
        }
        let base_name = base_name.to_string();

        Ok(Self { path, base_name })
    }

    /// Like [`Instance::from_path`], but the file must exist.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, ModelError> {
        let instance = Self::from_path(path)?;
        if !instance.path.is_file() {
            return Err(ModelError::InvalidInstance {
                path: instance.path,
                reason: "input case not found".into(),
            });
        }
        Ok(instance)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn base_name(&self) -> &str {
        &self.base_name
    }

    /// `<base><suffix>` for the given artifact kind.
    pub fn artifact_name(&self, kind: ArtifactKind) -> String {
        format!("{}{}", self.base_name, kind.suffix())
    }

    pub fn artifact_path(&self, dir: &Path, kind: ArtifactKind) -> PathBuf {
        dir.join(self.artifact_name(kind))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_aiger_extensions() {
        assert_eq!(Instance::from_path("cases/foo.aig").unwrap().base_name(), "foo");
        assert_eq!(Instance::from_path("/x/bar.aag").unwrap().base_name(), "bar");
        assert_eq!(Instance::from_path("baz.aig.aag").unwrap().base_name(), "baz.aig");
    }

    #[test]
    fn keeps_unknown_extensions() {
        assert_eq!(Instance::from_path("model.btor2").unwrap().base_name(), "model.btor2");
    }

    #[test]
    fn rejects_bare_extension() {
        assert!(Instance::from_path(".aig").is_err());
    }

    #[test]
    fn artifact_paths_use_base_name() {
        let inst = Instance::from_path("in/foo.aig").unwrap();
        let dir = Path::new("/work/mcar1");
        assert_eq!(inst.artifact_path(dir, ArtifactKind::Certificate), dir.join("foo.w.aag"));
        assert_eq!(inst.artifact_path(dir, ArtifactKind::Cex), dir.join("foo.cex"));
        assert_eq!(inst.artifact_path(dir, ArtifactKind::Res), dir.join("foo.res"));
    }

    #[test]
    fn open_requires_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.aig");
        assert!(matches!(
            Instance::open(&missing),
            Err(ModelError::InvalidInstance { .. })
        ));

        let present = dir.path().join("here.aig");
        std::fs::write(&present, b"aig 0 0 0 0 0\n").unwrap();
        assert_eq!(Instance::open(&present).unwrap().base_name(), "here");
    }
}
