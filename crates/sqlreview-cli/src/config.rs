//! Configuration file handling

use std::path::{Path, PathBuf};

use miette::{IntoDiagnostic, Result, WrapErr};
use serde::{Deserialize, Serialize};
use sqlreview_core::{Catalog, Engine, ReviewPolicy, RuleRegistry};

use crate::args::OutputFormat;

pub const CONFIG_FILE: &str = "sqlreview.toml";

/// Configuration for sqlreview
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Database engine (e.g. "mysql", "postgresql")
    #[serde(default)]
    pub engine: Option<String>,

    /// SQL files or glob patterns to review
    #[serde(default)]
    pub files: Vec<String>,

    /// Review policy file
    #[serde(default)]
    pub policy: Option<String>,

    /// Baseline schema file
    #[serde(default)]
    pub baseline: Option<String>,

    /// Output format (human, json, sarif)
    #[serde(default)]
    pub format: Option<String>,

    /// Warnings fail the review
    #[serde(default)]
    pub warning_blocks: bool,

    #[serde(default)]
    pub parallel: bool,
}

/// Overrides taken from the command line
#[derive(Default)]
pub struct CheckOverrides<'a> {
    pub files: &'a [PathBuf],
    pub engine: Option<&'a str>,
    pub policy: Option<&'a Path>,
    pub baseline: Option<&'a Path>,
    pub format: Option<OutputFormat>,
    pub warning_blocks: bool,
    pub parallel: bool,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .into_diagnostic()
            .wrap_err_with(|| format!("failed to read {}", path.display()))?;
        toml::from_str(&contents)
            .into_diagnostic()
            .wrap_err_with(|| format!("invalid configuration in {}", path.display()))
    }

    /// Find sqlreview.toml in the current directory or its parents
    pub fn find_and_load() -> Result<Option<Self>> {
        let mut current_dir = std::env::current_dir().into_diagnostic()?;

        loop {
            let config_path = current_dir.join(CONFIG_FILE);
            if config_path.exists() {
                tracing::debug!(path = %config_path.display(), "using configuration");
                return Ok(Some(Self::from_file(&config_path)?));
            }

            if !current_dir.pop() {
                break;
            }
        }

        Ok(None)
    }

    /// Merge CLI arguments into configuration.
    /// CLI arguments take precedence over config file values.
    pub fn merge_with_args(mut self, args: CheckOverrides<'_>) -> Self {
        if !args.files.is_empty() {
            self.files = args.files.iter().map(|p| p.display().to_string()).collect();
        }
        if let Some(engine) = args.engine {
            self.engine = Some(engine.to_string());
        }
        if let Some(policy) = args.policy {
            self.policy = Some(policy.display().to_string());
        }
        if let Some(baseline) = args.baseline {
            self.baseline = Some(baseline.display().to_string());
        }
        if let Some(format) = args.format {
            self.format = Some(format!("{:?}", format).to_lowercase());
        }
        self.warning_blocks |= args.warning_blocks;
        self.parallel |= args.parallel;
        self
    }

    pub fn engine(&self) -> Result<Engine> {
        self.engine
            .as_deref()
            .unwrap_or("mysql")
            .parse::<Engine>()
            .map_err(miette::Report::new)
    }

    pub fn output_format(&self) -> OutputFormat {
        match self.format.as_deref() {
            Some("json") => OutputFormat::Json,
            Some("sarif") => OutputFormat::Sarif,
            _ => OutputFormat::Human,
        }
    }

    /// The configured policy, or every rule applicable to the engine
    pub fn load_policy(&self, registry: &RuleRegistry, engine: Engine) -> Result<ReviewPolicy> {
        let mut policy = match &self.policy {
            Some(path) => load_policy_file(Path::new(path))?,
            None => ReviewPolicy::default_for(registry, engine),
        };
        policy.warning_blocks |= self.warning_blocks;
        Ok(policy)
    }

    pub fn load_baseline(&self, engine: Engine) -> Result<Option<Catalog>> {
        self.baseline
            .as_deref()
            .map(|path| load_baseline_file(Path::new(path), engine))
            .transpose()
    }
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

/// Policies are TOML unless the file ends in `.json`
pub fn load_policy_file(path: &Path) -> Result<ReviewPolicy> {
    let contents = std::fs::read_to_string(path)
        .into_diagnostic()
        .wrap_err_with(|| format!("failed to read policy {}", path.display()))?;
    let policy: Result<ReviewPolicy> = if is_json(path) {
        serde_json::from_str(&contents).into_diagnostic()
    } else {
        toml::from_str(&contents).into_diagnostic()
    };
    policy.wrap_err_with(|| format!("invalid policy in {}", path.display()))
}

/// A JSON baseline is a serialized catalog; anything else is replayed as DDL
pub fn load_baseline_file(path: &Path, engine: Engine) -> Result<Catalog> {
    let contents = std::fs::read_to_string(path)
        .into_diagnostic()
        .wrap_err_with(|| format!("failed to read baseline {}", path.display()))?;
    if is_json(path) {
        let catalog: Catalog = serde_json::from_str(&contents)
            .into_diagnostic()
            .wrap_err_with(|| format!("invalid baseline catalog in {}", path.display()))?;
        Ok(catalog.into_baseline())
    } else {
        Ok(Catalog::from_ddl(engine, &contents))
    }
}
