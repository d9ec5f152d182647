//! Static solver catalog.
//!
//! A catalog is the list of solver configurations entered into every race. Entries are
//! templates: `{input}`, `{out}` and `{bin}` in the program path and arguments are replaced
//! by the instance path, the job's output directory and the solver binary directory when the
//! catalog is instantiated for one instance.
use std::{
    collections::HashSet,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::{GIB, Instance, JobSpec, ModelError, TimeoutMs};

const HOUR_MS: TimeoutMs = 3_600_000;

/// One solver configuration as written in a catalog file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobTemplate {
    /// Unique job name; also the name of its output directory.
    pub name: String,
    pub program: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
    pub timeout_ms: TimeoutMs,
    pub memory_limit_bytes: u64,
}

impl JobTemplate {
    fn new(name: &str, program: &str, args: &[&str], memory_limit_bytes: u64) -> Self {
        Self {
            name: name.to_string(),
            program: program.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
            timeout_ms: HOUR_MS,
            memory_limit_bytes,
        }
    }
}

/// Paths substituted into templates.
#[derive(Debug, Clone)]
pub struct CatalogContext<'a> {
    pub instance: &'a Instance,
    /// Parent of every job output directory.
    pub work_dir: &'a Path,
    pub bin_dir: &'a Path,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    pub jobs: Vec<JobTemplate>,
}

impl Catalog {
    /// Parse and validate a JSON catalog.
    pub fn from_json(s: &str) -> Result<Self, ModelError> {
        let catalog: Catalog = serde_json::from_str(s)?;
        catalog.validate()?;
        Ok(catalog)
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        if self.jobs.is_empty() {
            return Err(ModelError::InvalidCatalog("no jobs".into()));
        }
        let mut seen = HashSet::new();
        for job in &self.jobs {
            if job.name.trim().is_empty() {
                return Err(ModelError::InvalidCatalog("job with empty name".into()));
            }
            if job.name.contains(['/', '\\']) || job.name == "." || job.name == ".." {
                return Err(ModelError::InvalidCatalog(format!(
                    "job name '{}' is not a plain directory name",
                    job.name
                )));
            }
            if job.program.trim().is_empty() {
                return Err(ModelError::InvalidCatalog(format!("job '{}': program is empty", job.name)));
            }
            if job.timeout_ms == 0 {
                return Err(ModelError::InvalidCatalog(format!("job '{}': zero timeout", job.name)));
            }
            if !seen.insert(job.name.as_str()) {
                return Err(ModelError::DuplicateJob(job.name.clone()));
            }
        }
        Ok(())
    }

    /// Output directory of the job called `name`.
    pub fn output_dir(work_dir: &Path, name: &str) -> PathBuf {
        work_dir.join(name)
    }

    /// Expand every template into a concrete [`JobSpec`], in catalog order.
    pub fn instantiate(&self, ctx: &CatalogContext<'_>) -> Vec<JobSpec> {
        let input = ctx.instance.path().to_string_lossy();
        let bin = ctx.bin_dir.to_string_lossy();

        self.jobs
            .iter()
            .map(|t| {
                let out_dir = Self::output_dir(ctx.work_dir, &t.name);
                let out = out_dir.to_string_lossy();
                let expand = |s: &str| {
                    s.replace("{input}", &input)
                        .replace("{out}", &out)
                        .replace("{bin}", &bin)
                };

                JobSpec::new(t.name.as_str(), expand(&t.program))
                    .with_args(t.args.iter().map(|a| expand(a)))
                    .with_timeout_ms(t.timeout_ms)
                    .with_memory_limit(t.memory_limit_bytes)
                    .with_output_dir(out_dir.clone())
            })
            .collect()
    }

    /// The stock CAR portfolio: MCAR and simplecar variants, one hour each.
    pub fn builtin() -> Self {
        let mcar = "{bin}/MCAR";
        let car = "{bin}/simplecar";
        let cadical = "{bin}/simplecar_cadical";

        let jobs = vec![
            JobTemplate::new("mcar1", mcar, &["--vb", "{input}", "{out}"], 8 * GIB),
            JobTemplate::new("fcarbr1", car, &simplecar("-f", "1"), 8 * GIB),
            JobTemplate::new("bcarbr1", car, &simplecar("-b", "1"), 8 * GIB),
            JobTemplate::new("fcarbr2", car, &simplecar("-f", "2"), 8 * GIB),
            JobTemplate::new("bcarbr2", car, &simplecar("-b", "2"), 8 * GIB),
            JobTemplate::new("fcarbr3", car, &simplecar("-f", "3"), 8 * GIB),
            JobTemplate::new("bcarbr3", car, &simplecar("-b", "3"), 8 * GIB),
            JobTemplate::new("bmc", cadical, &["-v", "1", "-bmc", "-w", "{out}", "{input}"], 16 * GIB),
            JobTemplate::new("fcarcadicalbr1", cadical, &simplecar("-f", "1"), 8 * GIB),
            JobTemplate::new("bcarcadicalbr1", cadical, &simplecar("-b", "1"), 8 * GIB),
            JobTemplate::new("bcarcadicalbr2", cadical, &simplecar("-b", "2"), 8 * GIB),
            JobTemplate::new("bcarcadicalbr3", cadical, &simplecar("-b", "3"), 8 * GIB),
            JobTemplate::new("mcarlocal2raw", mcar, &["--vb", "--inter", "2", "{input}", "{out}"], 4 * GIB),
            JobTemplate::new("mcarlocal3raw", mcar, &["--vb", "--inter", "3", "{input}", "{out}"], 4 * GIB),
            JobTemplate::new(
                "mcarmuclow3nosimp",
                mcar,
                &["--vb", "--inter", "1", "--convParam", "3", "{input}", "{out}"],
                4 * GIB,
            ),
        ];
        Self { jobs }
    }
}

fn simplecar(direction: &'static str, br: &'static str) -> [&'static str; 9] {
    ["-v", "1", direction, "-br", br, "-rs", "-w", "{out}", "{input}"]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_catalog_is_valid() {
        let catalog = Catalog::builtin();
        assert_eq!(catalog.jobs.len(), 15);
        catalog.validate().unwrap();
        let bmc = catalog.jobs.iter().find(|j| j.name == "bmc").unwrap();
        assert_eq!(bmc.memory_limit_bytes, 16 * GIB);
    }

    #[test]
    fn instantiate_expands_placeholders() {
        let instance = Instance::from_path("/cases/foo.aig").unwrap();
        let catalog = Catalog::builtin();
        let ctx = CatalogContext {
            instance: &instance,
            work_dir: Path::new("/work"),
            bin_dir: Path::new("/opt/bin"),
        };

        let jobs = catalog.instantiate(&ctx);
        assert_eq!(jobs.len(), 15);

        let mcar = &jobs[0];
        assert_eq!(mcar.id.as_str(), "mcar1");
        assert_eq!(mcar.program, PathBuf::from("/opt/bin/MCAR"));
        assert_eq!(mcar.args, vec!["--vb", "/cases/foo.aig", "/work/mcar1"]);
        assert_eq!(mcar.output_dir, PathBuf::from("/work/mcar1"));
        assert_eq!(mcar.timeout_ms, HOUR_MS);

        let fcar = &jobs[1];
        assert_eq!(
            fcar.args,
            vec!["-v", "1", "-f", "-br", "1", "-rs", "-w", "/work/fcarbr1", "/cases/foo.aig"]
        );
    }

    #[test]
    fn parses_json_catalog() {
        let json = r#"{
            "jobs": [
                { "name": "a", "program": "/bin/true", "timeoutMs": 1000, "memoryLimitBytes": 1073741824 },
                { "name": "b", "program": "{bin}/solver", "args": ["{input}"], "timeoutMs": 5, "memoryLimitBytes": 1 }
            ]
        }"#;
        let catalog = Catalog::from_json(json).unwrap();
        assert_eq!(catalog.jobs.len(), 2);
        assert!(catalog.jobs[0].args.is_empty());
        assert_eq!(catalog.jobs[1].args, vec!["{input}"]);
    }

    #[test]
    fn rejects_duplicate_names() {
        let json = r#"{ "jobs": [
            { "name": "a", "program": "x", "timeoutMs": 1, "memoryLimitBytes": 1 },
            { "name": "a", "program": "y", "timeoutMs": 1, "memoryLimitBytes": 1 }
        ] }"#;
        assert!(matches!(Catalog::from_json(json), Err(ModelError::DuplicateJob(n)) if n == "a"));
    }

    #[test]
    fn rejects_empty_and_path_like_names() {
        let empty = Catalog { jobs: vec![] };
        assert!(matches!(empty.validate(), Err(ModelError::InvalidCatalog(_))));

        let nested = Catalog {
            jobs: vec![JobTemplate::new("../escape", "x", &[], GIB)],
        };
        assert!(matches!(nested.validate(), Err(ModelError::InvalidCatalog(_))));
    }

    #[test]
    fn malformed_json_is_reported() {
        assert!(matches!(Catalog::from_json("{ nope"), Err(ModelError::Json(_))));
    }
}
