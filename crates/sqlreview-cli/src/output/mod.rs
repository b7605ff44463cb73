//! Output formatting

use serde::Serialize;
use sqlreview_core::{AdviceStatus, ReviewReport};

use crate::args::OutputFormat;

/// The review of one input file
#[derive(Debug, Serialize)]
pub struct FileReport {
    pub file: String,
    #[serde(skip)]
    pub source: String,
    #[serde(flatten)]
    pub report: ReviewReport,
}

/// Output formatter for review reports
pub struct OutputFormatter {
    format: OutputFormat,
    quiet: bool,
}

impl OutputFormatter {
    pub fn new(format: OutputFormat, quiet: bool) -> Self {
        Self { format, quiet }
    }

    /// Print reports in the configured format
    pub fn print_reports(&self, reports: &[FileReport]) -> miette::Result<()> {
        match self.format {
            OutputFormat::Human => {
                for report in reports {
                    self.print_human(report);
                }
                self.print_summary(reports);
            }
            OutputFormat::Json => println!("{}", to_pretty(&render_json(reports))?),
            OutputFormat::Sarif => println!("{}", to_pretty(&render_sarif(reports))?),
        }
        Ok(())
    }

    fn print_human(&self, file: &FileReport) {
        for advice in file.report.advices.iter().filter(|a| a.is_finding()) {
            let severity_str = match advice.status {
                AdviceStatus::Error => "\x1b[31merror\x1b[0m",
                AdviceStatus::Warning => "\x1b[33mwarning\x1b[0m",
                AdviceStatus::Success => "\x1b[32mok\x1b[0m",
            };

            eprintln!("{}[{}]: {}", severity_str, advice.code, advice.content);

            if advice.line > 0 {
                eprintln!("  --> {}:{}", file.file, advice.line);
                if let Some(source_line) = get_source_line(&file.source, advice.line) {
                    eprintln!("   |");
                    eprintln!("{:>3} | {}", advice.line, source_line);
                    eprintln!("   |");
                }
            } else {
                eprintln!("  --> {}", file.file);
            }
            eprintln!("   = rule: {}", advice.title);
            eprintln!();
        }
    }

    fn print_summary(&self, reports: &[FileReport]) {
        if self.quiet {
            return;
        }
        let errors: usize = reports.iter().map(|r| r.report.error_count()).sum();
        let warnings: usize = reports.iter().map(|r| r.report.warning_count()).sum();
        let failed = reports.iter().filter(|r| !r.report.passed).count();

        if errors > 0 || warnings > 0 {
            eprintln!(
                "Found {} error(s), {} warning(s) in {} file(s); {} failed review",
                errors,
                warnings,
                reports.len(),
                failed
            );
        } else {
            eprintln!("All {} file(s) passed review", reports.len());
        }
    }
}

fn to_pretty(value: &serde_json::Value) -> miette::Result<String> {
    serde_json::to_string_pretty(value).map_err(|e| miette::miette!("failed to render output: {e}"))
}

pub fn render_json(reports: &[FileReport]) -> serde_json::Value {
    serde_json::json!({
        "passed": reports.iter().all(|r| r.report.passed),
        "files": reports,
    })
}

pub fn render_sarif(reports: &[FileReport]) -> serde_json::Value {
    let results: Vec<serde_json::Value> = reports
        .iter()
        .flat_map(|file| {
            file.report
                .advices
                .iter()
                .filter(|a| a.is_finding())
                .map(move |advice| {
                    let mut location = serde_json::json!({
                        "physicalLocation": {
                            "artifactLocation": {
                                "uri": file.file
                            }
                        }
                    });
                    if advice.line > 0 {
                        location["physicalLocation"]["region"] =
                            serde_json::json!({ "startLine": advice.line });
                    }
                    serde_json::json!({
                        "ruleId": advice.title,
                        "level": match advice.status {
                            AdviceStatus::Error => "error",
                            AdviceStatus::Warning => "warning",
                            AdviceStatus::Success => "note",
                        },
                        "message": {
                            "text": advice.content
                        },
                        "properties": {
                            "code": advice.code.value(),
                            "codeName": advice.code.name()
                        },
                        "locations": [location]
                    })
                })
        })
        .collect();

    serde_json::json!({
        "$schema": "https://raw.githubusercontent.com/oasis-tcs/sarif-spec/master/Schemata/sarif-schema-2.1.0.json",
        "version": "2.1.0",
        "runs": [{
            "tool": {
                "driver": {
                    "name": "sqlreview",
                    "version": env!("CARGO_PKG_VERSION")
                }
            },
            "results": results
        }]
    })
}

/// Get a specific line from source (1-indexed)
fn get_source_line(source: &str, line: usize) -> Option<&str> {
    source.lines().nth(line.saturating_sub(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sqlreview_core::{Advisor, Engine, ReviewPolicy, RuleLevel, RuleRegistry, RuleType};

    fn review(sql: &str) -> FileReport {
        let registry = RuleRegistry::builtin();
        let policy = ReviewPolicy::default()
            .with_rule(RuleType::StatementSelectNoSelectAll, RuleLevel::Error);
        FileReport {
            file: "q.sql".to_string(),
            source: sql.to_string(),
            report: Advisor::new(&registry)
                .review(Engine::MySQL, sql, &policy)
                .unwrap(),
        }
    }

    #[test]
    fn test_sarif_results() {
        let sarif = render_sarif(&[review("SELECT 1;\nSELECT * FROM t")]);
        let results = sarif["runs"][0]["results"].as_array().unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0]["ruleId"], "statement.select.no-select-all");
        assert_eq!(results[0]["level"], "error");
        assert_eq!(
            results[0]["locations"][0]["physicalLocation"]["region"]["startLine"],
            2
        );
    }

    #[test]
    fn test_json_keeps_ok_advice() {
        let json = render_json(&[review("SELECT 1")]);
        assert_eq!(json["passed"], true);
        assert_eq!(json["files"][0]["file"], "q.sql");
        assert_eq!(json["files"][0]["advices"][0]["status"], "SUCCESS");
        assert_eq!(json["files"][0]["advices"][0]["code"], 0);
        assert!(json["files"][0].get("source").is_none());
    }

    #[test]
    fn test_get_source_line() {
        assert_eq!(get_source_line("a\nb\nc", 2), Some("b"));
        assert_eq!(get_source_line("a", 3), None);
    }
}
