//! Fatal review errors
//!
//! Everything here aborts a review before any advice is produced. Rule
//! violations and catalog inconsistencies are never errors; they are
//! reported as [`Advice`](crate::advice::Advice).

use miette::Diagnostic;
use thiserror::Error;

/// Errors that abort a review
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
pub enum AdvisorError {
    /// The script could not be tokenized or parsed
    #[error("syntax error at line {line}: {message}")]
    #[diagnostic(
        code(sqlreview::syntax_error),
        help("Fix the statement so it parses for the selected engine")
    )]
    Syntax { line: usize, message: String },

    /// The engine identifier is unknown or has no SQL grammar
    #[error("unsupported engine '{0}'")]
    #[diagnostic(
        code(sqlreview::unsupported_engine),
        help("Supported engines: mysql, tidb, mariadb, oceanbase, postgresql, oracle, mssql, snowflake, sqlite")
    )]
    UnsupportedEngine(String),

    /// A rule payload in the review policy could not be interpreted
    #[error("invalid payload for rule '{rule}': {message}")]
    #[diagnostic(code(sqlreview::invalid_payload))]
    InvalidPayload { rule: String, message: String },
}

impl AdvisorError {
    /// Stable name of the error, matching the advice code vocabulary
    pub fn code(&self) -> &'static str {
        match self {
            AdvisorError::Syntax { .. } => "SyntaxError",
            AdvisorError::UnsupportedEngine(_) => "UnsupportedEngine",
            AdvisorError::InvalidPayload { .. } => "InvalidPayload",
        }
    }

    pub(crate) fn syntax(line: usize, message: impl Into<String>) -> Self {
        AdvisorError::Syntax {
            line,
            message: message.into(),
        }
    }

    pub(crate) fn invalid_payload(rule: impl Into<String>, message: impl Into<String>) -> Self {
        AdvisorError::InvalidPayload {
            rule: rule.into(),
            message: message.into(),
        }
    }
}

pub type Result<T, E = AdvisorError> = std::result::Result<T, E>;
