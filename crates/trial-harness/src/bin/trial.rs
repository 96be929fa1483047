//! CLI entrypoint for trial tooling.

use std::path::{Path, PathBuf};

use clap::error::ErrorKind;
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use trial_harness::structured_log::validate_log_file;
use trial_harness::EqualOptions;

/// Structural comparison and log tooling.
#[derive(Debug, Parser)]
#[command(name = "trial")]
#[command(about = "Structural comparison and trial log tooling")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Deep equality.
    Equal,
    /// Expected content must be contained in actual.
    Contains,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Compare two JSON documents; exits 1 and prints the diff on mismatch.
    Compare {
        /// JSON document produced by the system under test.
        #[arg(long)]
        actual: PathBuf,
        /// JSON document describing the expectation.
        #[arg(long)]
        expected: PathBuf,
        /// Comparison relation.
        #[arg(long, value_enum, default_value_t = Mode::Equal)]
        mode: Mode,
        /// Do not treat null, empty arrays and empty objects as equal (equal
        /// mode only).
        #[arg(long)]
        strict_empty: bool,
        /// Object field path to skip in equal mode (repeatable, dotted).
        #[arg(long = "ignore-field")]
        ignore_fields: Vec<String>,
    },
    /// Validate a structured JSONL trial log.
    ValidateLog {
        /// Structured JSONL log path.
        #[arg(long)]
        log: PathBuf,
    },
}

impl Command {
    /// Equality options have no meaning under containment.
    fn check(&self) -> Result<(), clap::Error> {
        if let Self::Compare {
            mode: Mode::Contains,
            strict_empty,
            ignore_fields,
            ..
        } = self
            && (*strict_empty || !ignore_fields.is_empty())
        {
            return Err(Cli::command().error(
                ErrorKind::ArgumentConflict,
                "--strict-empty and --ignore-field only apply to --mode equal",
            ));
        }
        Ok(())
    }
}

fn read_json(path: &Path) -> Result<serde_json::Value, Box<dyn std::error::Error>> {
    let body = std::fs::read_to_string(path)
        .map_err(|err| format!("failed reading '{}': {err}", path.display()))?;
    let doc = serde_json::from_str(&body)
        .map_err(|err| format!("invalid JSON in '{}': {err}", path.display()))?;
    Ok(doc)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    if let Err(err) = cli.command.check() {
        err.exit();
    }

    match cli.command {
        Command::Compare {
            actual,
            expected,
            mode,
            strict_empty,
            ignore_fields,
        } => {
            let actual = read_json(&actual)?;
            let expected = read_json(&expected)?;
            let (matched, diff) = match mode {
                Mode::Equal => EqualOptions::new()
                    .equate_empty(!strict_empty)
                    .ignore_fields(ignore_fields)
                    .equal(&actual, &expected),
                Mode::Contains => trial_harness::contains(&actual, &expected),
            };
            if !matched {
                println!("{diff}");
                std::process::exit(1);
            }
            eprintln!("documents match ({mode:?})");
        }
        Command::ValidateLog { log } => {
            let (lines, errors) = validate_log_file(&log)?;
            for err in &errors {
                eprintln!("{err}");
            }
            if !errors.is_empty() {
                return Err(format!(
                    "{} validation error(s) in {} line(s) of {}",
                    errors.len(),
                    lines,
                    log.display()
                )
                .into());
            }
            eprintln!("{} valid log line(s) in {}", lines, log.display());
        }
    }

    Ok(())
}
