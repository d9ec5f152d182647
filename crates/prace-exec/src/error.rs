use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExecError {
    #[error("missing program")]
    MissingProgram,
    #[error("spawn {program}: {reason}")]
    Spawn { program: String, reason: String },
    #[error("spawned process has no pid")]
    MissingPid,
    #[error("wait: {0}")]
    Wait(String),
    #[error("invalid stderr policy: {0}")]
    InvalidPolicy(String),
}
