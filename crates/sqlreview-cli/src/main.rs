//! sqlreview CLI - SQL change-script review tool

mod args;
mod config;
mod output;

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use miette::{IntoDiagnostic, Result, WrapErr};
use sqlreview_core::parser::parse;
use sqlreview_core::statement::normalize_all;
use sqlreview_core::{Advisor, Catalog, Engine, RuleRegistry};

use crate::args::{Args, Command};
use crate::config::{CheckOverrides, Config};
use crate::output::{FileReport, OutputFormatter};

fn main() -> ExitCode {
    let args = Args::parse();

    let level = match (args.quiet, args.verbose) {
        (true, _) => tracing::Level::ERROR,
        (false, 0) => tracing::Level::WARN,
        (false, 1) => tracing::Level::INFO,
        (false, 2) => tracing::Level::DEBUG,
        (false, _) => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    match run(args) {
        Ok(passed) => {
            if passed {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(1)
            }
        }
        Err(e) => {
            eprintln!("Error: {:?}", e);
            ExitCode::from(2)
        }
    }
}

fn parse_engine(engine: &str) -> Result<Engine> {
    engine.parse::<Engine>().map_err(miette::Report::new)
}

/// Expand glob patterns; plain paths are kept as given
fn expand_files(patterns: &[String]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for pattern in patterns {
        if pattern.contains(['*', '?', '[']) {
            let mut matched: Vec<PathBuf> = glob::glob(pattern)
                .into_diagnostic()
                .wrap_err_with(|| format!("invalid file pattern {pattern}"))?
                .flatten()
                .collect();
            matched.sort();
            files.extend(matched);
        } else {
            files.push(PathBuf::from(pattern));
        }
    }
    Ok(files)
}

fn read(path: &Path) -> Result<String> {
    fs::read_to_string(path)
        .into_diagnostic()
        .wrap_err_with(|| format!("failed to read {}", path.display()))
}

/// Returns whether everything passed
fn run(args: Args) -> Result<bool> {
    let quiet = args.quiet;
    match args.command {
        Command::Check {
            files,
            engine,
            policy,
            baseline,
            config: config_path,
            format,
            warning_blocks,
            parallel,
        } => {
            let config = match config_path {
                Some(path) => Config::from_file(&path)?,
                None => Config::find_and_load()?.unwrap_or_default(),
            };
            let config = config.merge_with_args(CheckOverrides {
                files: &files,
                engine: engine.as_deref(),
                policy: policy.as_deref(),
                baseline: baseline.as_deref(),
                format,
                warning_blocks,
                parallel,
            });

            let engine = config.engine()?;
            let registry = RuleRegistry::builtin();
            let policy = config.load_policy(&registry, engine)?;
            let baseline = config.load_baseline(engine)?;

            let query_files = expand_files(&config.files)?;
            if query_files.is_empty() {
                miette::bail!("No SQL files specified. Use positional arguments or configure in sqlreview.toml");
            }

            let advisor = Advisor::new(&registry).parallel(config.parallel);
            let mut reports = Vec::with_capacity(query_files.len());
            for path in &query_files {
                let source = read(path)?;
                // Each file starts from the same baseline
                let catalog = baseline.clone().unwrap_or_else(Catalog::new);
                let report = advisor
                    .review_with_baseline(engine, &source, &policy, catalog)
                    .map_err(miette::Report::new)
                    .wrap_err_with(|| format!("failed to review {}", path.display()))?;
                tracing::info!(
                    file = %path.display(),
                    statements = report.statement_count,
                    passed = report.passed,
                    "reviewed"
                );
                reports.push(FileReport {
                    file: path.display().to_string(),
                    source,
                    report,
                });
            }

            OutputFormatter::new(config.output_format(), quiet).print_reports(&reports)?;
            Ok(reports.iter().all(|r| r.report.passed))
        }

        Command::Rules { engine } => {
            let engine = parse_engine(&engine)?;
            let registry = RuleRegistry::builtin();
            for checker in registry.rules(engine) {
                println!("{:<42} {}", checker.id(), checker.description());
            }
            Ok(true)
        }

        Command::Schema {
            files,
            engine,
            json,
        } => {
            let engine = parse_engine(&engine)?;
            let mut ddl = String::new();
            for file in &files {
                ddl.push_str(&read(file)?);
                ddl.push_str(";\n");
            }
            let catalog = Catalog::from_ddl(engine, &ddl);

            if json {
                let rendered = serde_json::to_string_pretty(&catalog).into_diagnostic()?;
                println!("{rendered}");
                return Ok(true);
            }

            println!("Schema Information:");
            println!("==================");
            for table in catalog.tables.values() {
                println!("\nTable: {}", table.name);
                for col in table.columns.values() {
                    let nullable = if col.nullable { "NULL" } else { "NOT NULL" };
                    let mut extra = String::new();
                    if col.is_primary_key {
                        extra.push_str(" PRIMARY KEY");
                    }
                    if col.auto_increment {
                        extra.push_str(" AUTO_INCREMENT");
                    }
                    println!("  - {} {} {}{}", col.name, col.data_type, nullable, extra);
                }
                for index in table.indexes.values() {
                    println!(
                        "  index {} ({:?}) on ({})",
                        index.name,
                        index.kind,
                        index.columns.join(", ")
                    );
                }
                for fk in &table.foreign_keys {
                    println!(
                        "  foreign key ({}) references {} ({})",
                        fk.columns.join(", "),
                        fk.references_table,
                        fk.references_columns.join(", ")
                    );
                }
            }
            Ok(true)
        }

        Command::Parse { file, engine } => {
            let engine = parse_engine(&engine)?;
            let content = read(&file)?;
            let parsed = parse(&content, engine).map_err(miette::Report::new)?;
            for statement in normalize_all(&parsed) {
                println!(
                    "Statement {} (lines {}-{}):",
                    statement.index + 1,
                    statement.lines.start,
                    statement.lines.end
                );
                println!("{:#?}", statement.node);
                println!();
            }
            Ok(true)
        }
    }
}
