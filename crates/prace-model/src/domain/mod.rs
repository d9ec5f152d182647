mod job_id;
pub use job_id::JobId;

mod job_spec;
pub use job_spec::JobSpec;

mod outcome;
pub use outcome::Outcome;

mod artifact;
pub use artifact::{ArtifactKind, VerdictKind};

mod instance;
pub use instance::Instance;

mod verdict;
pub use verdict::{Collection, Verdict};

/// Timeout value in milliseconds.
pub type TimeoutMs = u64;

/// One gibibyte, the unit memory ceilings are usually written in.
pub const GIB: u64 = 1024 * 1024 * 1024;
