use std::path::PathBuf;

use clap::Parser;
use prace_exec::StderrPolicy;
use prace_observe::{LoggerConfig, LoggerFormat};

#[derive(Debug, Parser)]
#[command(name = "prace")]
#[command(about = "Race a portfolio of model checkers on one instance; the first valid answer wins.", long_about = None)]
pub struct Cli {
    /// Instance to check (.aig or .aag).
    #[arg(short = 'I', long, value_name = "PATH")]
    pub input: PathBuf,

    /// Directory receiving the final certificate or counterexample.
    #[arg(short = 'O', long, value_name = "DIR")]
    pub output: PathBuf,

    #[arg(short = 'V', long)]
    pub verbose: bool,

    /// JSON solver catalog; the built-in portfolio is used when absent.
    #[arg(long, value_name = "FILE")]
    pub catalog: Option<PathBuf>,

    /// Parent of the per-job output directories.
    #[arg(long, value_name = "DIR", default_value = "_tmpRes")]
    pub work_dir: PathBuf,

    /// Substituted for `{bin}` in catalog entries.
    #[arg(long, value_name = "DIR", default_value = "./bin")]
    pub bin_dir: PathBuf,

    /// Concurrently running jobs; defaults to the available parallelism.
    #[arg(long, value_name = "N")]
    pub max_parallel: Option<usize>,

    /// Time between SIGTERM and SIGKILL when cancelling losers.
    #[arg(long, value_name = "MS", default_value_t = 2_000)]
    pub kill_grace_ms: u64,

    #[arg(long, value_name = "POLICY", default_value = "reject")]
    pub stderr_policy: StderrPolicy,

    #[arg(long, value_name = "FORMAT", default_value = "text")]
    pub log_format: LoggerFormat,

    /// External checker consulted on certificate/counterexample conflicts; exit 0 confirms
    /// the counterexample.
    #[arg(long, value_name = "PROGRAM")]
    pub cex_checker: Option<PathBuf>,
}

impl Cli {
    pub fn logger_config(&self) -> LoggerConfig {
        LoggerConfig {
            format: self.log_format,
            ..LoggerConfig::verbose(self.verbose)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_invocation_uses_defaults() {
        let cli = Cli::try_parse_from(["prace", "-I", "foo.aig", "-O", "out"]).unwrap();
        assert_eq!(cli.input, PathBuf::from("foo.aig"));
        assert_eq!(cli.output, PathBuf::from("out"));
        assert_eq!(cli.work_dir, PathBuf::from("_tmpRes"));
        assert_eq!(cli.bin_dir, PathBuf::from("./bin"));
        assert_eq!(cli.kill_grace_ms, 2_000);
        assert_eq!(cli.stderr_policy, StderrPolicy::Reject);
        assert!(cli.catalog.is_none());
        assert!(cli.cex_checker.is_none());
        assert_eq!(cli.logger_config().level, "info");
    }

    #[test]
    fn long_flags_are_parsed() {
        let cli = Cli::try_parse_from([
            "prace",
            "--input",
            "foo.aag",
            "--output",
            "res",
            "--verbose",
            "--max-parallel",
            "3",
            "--stderr-policy",
            "ignore",
            "--log-format",
            "json",
            "--cex-checker",
            "/usr/bin/aigsim",
        ])
        .unwrap();
        assert_eq!(cli.max_parallel, Some(3));
        assert_eq!(cli.stderr_policy, StderrPolicy::Ignore);
        assert_eq!(cli.log_format, LoggerFormat::Json);
        assert_eq!(cli.logger_config().level, "debug");
        assert_eq!(cli.cex_checker, Some(PathBuf::from("/usr/bin/aigsim")));
    }

    #[test]
    fn input_and_output_are_required() {
        assert!(Cli::try_parse_from(["prace", "-O", "out"]).is_err());
        assert!(Cli::try_parse_from(["prace", "-I", "foo.aig"]).is_err());
        assert!(Cli::try_parse_from(["prace", "-I", "a", "-O", "b", "--stderr-policy", "maybe"]).is_err());
    }
}
