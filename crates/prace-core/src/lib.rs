pub mod artifacts;
pub mod collect;
pub use collect::ResultCollector;
pub mod cross_check;
pub use cross_check::{CrossCheck, FixedCrossCheck};
pub mod error;
pub use error::CoreError;
pub mod race;
pub use race::{Race, RaceConfig, RaceReport, TerminationRecord};
pub mod runner;
pub use runner::{JobReport, JobRunner, RunContext};
pub mod state;
pub use state::{Admission, RacePhase, RaceState, Registration};
pub mod terminate;
pub use terminate::{KillOutcome, Terminator};
