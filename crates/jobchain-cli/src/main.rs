//! Operator CLI for the Job Chain ledger
//!
//! Each invocation replays the configured journal, runs one ledger operation
//! and prints the result as JSON on stdout. Logs go to stderr.
//!
//! Rejected operations exit with a code derived from the error kind, so
//! scripts can tell an authorization failure from a duplicate application
//! without parsing messages.

use anyhow::{Context, Result};
use clap::Parser;
use jobchain_ledger::{ErrorKind, LedgerConfig, LedgerError};
use std::path::PathBuf;
use std::process::ExitCode;

mod commands;

use commands::Command;

/// Default config location; a missing file here is not an error.
const DEFAULT_CONFIG: &str = ".jobchain/config.toml";

#[derive(Parser, Debug)]
#[command(name = "jobchain")]
#[command(about = "Job Chain - access-controlled job postings and applications", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file path
    #[arg(short, long, global = true, default_value = DEFAULT_CONFIG)]
    config: PathBuf,

    /// Override the data directory from the config file
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
}

/// Resolve config: file, then environment, then command-line flags.
fn load_config<F>(cli: &Cli, env: F) -> Result<LedgerConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let required = cli.config != PathBuf::from(DEFAULT_CONFIG);
    let mut config = LedgerConfig::load(&cli.config, required)
        .with_context(|| format!("loading config from {}", cli.config.display()))?;
    config.merge_with_env_from(env);
    if let Some(data_dir) = &cli.data_dir {
        config.data_dir = data_dir.clone();
    }
    config.validate().context("validating config")?;
    Ok(config)
}

/// Ledger error kind anywhere in the chain, if the failure came from the ledger.
fn ledger_error_kind(err: &anyhow::Error) -> Option<ErrorKind> {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<LedgerError>())
        .map(LedgerError::kind)
}

fn exit_code(kind: Option<ErrorKind>) -> u8 {
    match kind {
        None => 1,
        Some(ErrorKind::Unauthorized) => 3,
        Some(ErrorKind::NotFound) => 4,
        Some(ErrorKind::AlreadyApplied) => 5,
        Some(ErrorKind::JobClosed) => 6,
        Some(ErrorKind::InvalidArgument) => 7,
        Some(ErrorKind::Storage) => 8,
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = load_config(&cli, |key| std::env::var(key).ok())?;

    // Initialize logging on stderr so stdout stays machine-readable
    let log_filter = if cli.verbose {
        "debug".to_string()
    } else {
        config.log_filter.clone()
    };
    tracing_subscriber::fmt()
        .with_env_filter(log_filter)
        .with_writer(std::io::stderr)
        .init();

    let output = commands::run(cli.command, &config).await?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let kind = ledger_error_kind(&err);
            match kind {
                Some(kind) => eprintln!("error[{kind}]: {err:#}"),
                None => eprintln!("error: {err:#}"),
            }
            ExitCode::from(exit_code(kind))
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use jobchain_ledger::{Address, ApplicationStatus, JobId, Role};
    use std::collections::HashMap;

    const SEEKER: &str = "0x0202020202020202020202020202020202020202";

    fn env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_parses_typed_arguments() {
        let args = ["jobchain", "register", "--caller", SEEKER, "--role", "job-seeker"];
        let cli = Cli::try_parse_from(args).unwrap();
        match cli.command {
            Command::Register { caller, role } => {
                assert_eq!(caller, SEEKER.parse::<Address>().unwrap());
                assert_eq!(role, Role::JobSeeker);
            }
            other => panic!("unexpected command {other:?}"),
        }

        // Numeric codes are accepted alongside names
        let cli = Cli::try_parse_from([
            "jobchain",
            "set-status",
            "--caller",
            SEEKER,
            "--job",
            "3",
            "--applicant",
            SEEKER,
            "--status",
            "4",
        ])
        .unwrap();
        match cli.command {
            Command::SetStatus { job, status, .. } => {
                assert_eq!(job, 3);
                assert_eq!(status, ApplicationStatus::Rejected);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_rejects_malformed_arguments() {
        let short_address = ["jobchain", "role", "0x1234"];
        assert!(Cli::try_parse_from(short_address).is_err());

        let bad_role = ["jobchain", "register", "--caller", SEEKER, "--role", "admin"];
        assert!(Cli::try_parse_from(bad_role).is_err());

        let bad_status = [
            "jobchain",
            "set-status",
            "--caller",
            SEEKER,
            "--job",
            "0",
            "--applicant",
            SEEKER,
            "--status",
            "pending",
        ];
        assert!(Cli::try_parse_from(bad_status).is_err());
    }

    #[test]
    fn test_config_precedence_file_then_env_then_flag() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("config.toml");
        std::fs::write(
            &config_path,
            "data_dir = \"/from/file\"\njournal_file = \"file.jsonl\"\nlog_filter = \"warn\"\n",
        )
        .unwrap();
        let config_arg = config_path.to_str().unwrap();

        let cli = Cli::try_parse_from(["jobchain", "count", "--config", config_arg]).unwrap();
        let config = load_config(&cli, env(&[])).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/from/file"));
        assert_eq!(config.journal_file, "file.jsonl");

        let overrides = [("JOBCHAIN_DATA_DIR", "/from/env"), ("JOBCHAIN_LOG", "debug")];
        let config = load_config(&cli, env(&overrides)).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/from/env"));
        assert_eq!(config.journal_file, "file.jsonl");
        assert_eq!(config.log_filter, "debug");

        let cli = Cli::try_parse_from([
            "jobchain",
            "count",
            "--config",
            config_arg,
            "--data-dir",
            "/from/flag",
        ])
        .unwrap();
        let config = load_config(&cli, env(&overrides)).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/from/flag"));
        assert_eq!(config.log_filter, "debug");
    }

    #[test]
    fn test_explicit_config_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.toml");
        let cli =
            Cli::try_parse_from(["jobchain", "count", "--config", missing.to_str().unwrap()])
                .unwrap();
        assert!(load_config(&cli, env(&[])).is_err());
    }

    #[test]
    fn test_exit_code_follows_error_kind() {
        let err = anyhow::Error::new(LedgerError::JobClosed(JobId::new(0)))
            .context("applying to job-0");
        assert_eq!(ledger_error_kind(&err), Some(ErrorKind::JobClosed));
        assert_eq!(exit_code(ledger_error_kind(&err)), 6);

        let err = anyhow::anyhow!("config file unreadable");
        assert_eq!(ledger_error_kind(&err), None);
        assert_eq!(exit_code(None), 1);
    }
}
