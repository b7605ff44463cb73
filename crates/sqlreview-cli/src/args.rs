//! CLI argument definitions

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "sqlreview")]
#[command(author, version, about = "Review SQL change scripts against a rule policy")]
#[command(propagate_version = true)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Review SQL files against a policy
    Check {
        /// SQL files to review (supports glob patterns)
        files: Vec<PathBuf>,

        /// Database engine the scripts target
        #[arg(short, long, env = "SQLREVIEW_ENGINE")]
        engine: Option<String>,

        /// Review policy (TOML or JSON); defaults to every applicable rule
        #[arg(short, long, value_name = "FILE")]
        policy: Option<PathBuf>,

        /// Starting schema: a DDL script, or a catalog dumped as JSON
        #[arg(short, long, value_name = "FILE")]
        baseline: Option<PathBuf>,

        /// Configuration file (defaults to sqlreview.toml found upward)
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum)]
        format: Option<OutputFormat>,

        /// Fail the review on warnings as well as errors
        #[arg(long)]
        warning_blocks: bool,

        /// Evaluate rules of a statement in parallel
        #[arg(long)]
        parallel: bool,
    },

    /// List the rules available for an engine
    Rules {
        #[arg(short, long, default_value = "mysql")]
        engine: String,
    },

    /// Replay DDL files and display the resulting schema
    Schema {
        /// DDL files, replayed in order
        #[arg(required = true)]
        files: Vec<PathBuf>,

        #[arg(short, long, default_value = "mysql")]
        engine: String,

        /// Print the catalog as JSON (usable as a baseline)
        #[arg(long)]
        json: bool,
    },

    /// Parse SQL and display the normalized statements (for debugging)
    Parse {
        /// SQL file to parse
        file: PathBuf,

        #[arg(short, long, default_value = "mysql")]
        engine: String,
    },
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum, Default)]
pub enum OutputFormat {
    /// Human-readable output with colors
    #[default]
    Human,
    /// JSON output
    Json,
    /// SARIF output (for GitHub Code Scanning)
    Sarif,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_check_command() {
        let args = Args::try_parse_from([
            "sqlreview",
            "check",
            "a.sql",
            "b.sql",
            "--engine",
            "postgresql",
            "--format",
            "sarif",
            "--warning-blocks",
            "-vv",
        ])
        .unwrap();
        assert_eq!(args.verbose, 2);
        match args.command {
            Command::Check {
                files,
                engine,
                format,
                warning_blocks,
                parallel,
                ..
            } => {
                assert_eq!(files.len(), 2);
                assert_eq!(engine.as_deref(), Some("postgresql"));
                assert_eq!(format, Some(OutputFormat::Sarif));
                assert!(warning_blocks);
                assert!(!parallel);
            }
            _ => panic!("expected check"),
        }
    }

    #[test]
    fn test_schema_requires_files() {
        assert!(Args::try_parse_from(["sqlreview", "schema"]).is_err());
    }
}
