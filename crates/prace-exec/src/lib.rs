mod error;
pub use error::ExecError;

pub mod cross_check;
pub use cross_check::CommandCrossCheck;

pub mod limits;
pub use limits::{RlimitConfig, attach_rlimits};

pub mod proc;
pub use proc::{ProcRunner, ResultValidator, RunnerConfig, StderrPolicy};

pub mod terminate;
pub use terminate::ProcessTerminator;

mod util;
pub use util::Captured;
