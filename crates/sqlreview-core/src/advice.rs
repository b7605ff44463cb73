//! Advice model and aggregation

use serde::{Serialize, Serializer};

/// Outcome of one finding
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AdviceStatus {
    Success,
    Warning,
    Error,
}

impl std::fmt::Display for AdviceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AdviceStatus::Success => write!(f, "success"),
            AdviceStatus::Warning => write!(f, "warning"),
            AdviceStatus::Error => write!(f, "error"),
        }
    }
}

/// Stable advice codes
///
/// The numeric values are part of the output contract and never change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdviceCode {
    Ok,

    // 2xx: statement
    StatementNoWhere,
    StatementSelectAll,
    StatementLeadingWildcardLike,
    StatementDisallowCommit,
    StatementDisallowLimit,
    StatementInsertTooManyRows,

    // 3xx: naming
    NamingTableMismatch,
    NamingColumnMismatch,
    NamingIndexMismatch,
    NamingUniqueKeyMismatch,
    NamingForeignKeyMismatch,
    NamingAutoIncrementColumnMismatch,

    // 4xx: column
    NotNullColumnWithNullDefault,
    ColumnNotFound,
    DisabledColumnType,
    DuplicateColumn,

    // 5xx: storage engine
    NotInnoDBEngine,

    // 6xx: table
    TableNoPrimaryKey,
    TableHasForeignKey,
    TableNotExists,
    DuplicateTable,

    // 7xx: database
    DatabaseNotEmpty,
    NotCurrentDatabase,

    // 8xx: index
    IndexNotFound,
    DuplicateIndex,
}

impl AdviceCode {
    pub fn value(&self) -> u32 {
        match self {
            AdviceCode::Ok => 0,
            AdviceCode::StatementNoWhere => 202,
            AdviceCode::StatementSelectAll => 203,
            AdviceCode::StatementLeadingWildcardLike => 204,
            AdviceCode::StatementDisallowCommit => 206,
            AdviceCode::StatementDisallowLimit => 221,
            AdviceCode::StatementInsertTooManyRows => 222,
            AdviceCode::NamingTableMismatch => 301,
            AdviceCode::NamingColumnMismatch => 302,
            AdviceCode::NamingIndexMismatch => 303,
            AdviceCode::NamingUniqueKeyMismatch => 304,
            AdviceCode::NamingForeignKeyMismatch => 305,
            AdviceCode::NamingAutoIncrementColumnMismatch => 307,
            AdviceCode::NotNullColumnWithNullDefault => 404,
            AdviceCode::ColumnNotFound => 405,
            AdviceCode::DisabledColumnType => 411,
            AdviceCode::DuplicateColumn => 412,
            AdviceCode::NotInnoDBEngine => 501,
            AdviceCode::TableNoPrimaryKey => 601,
            AdviceCode::TableHasForeignKey => 602,
            AdviceCode::TableNotExists => 604,
            AdviceCode::DuplicateTable => 607,
            AdviceCode::DatabaseNotEmpty => 701,
            AdviceCode::NotCurrentDatabase => 702,
            AdviceCode::IndexNotFound => 809,
            AdviceCode::DuplicateIndex => 810,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            AdviceCode::Ok => "Ok",
            AdviceCode::StatementNoWhere => "StatementNoWhere",
            AdviceCode::StatementSelectAll => "StatementSelectAll",
            AdviceCode::StatementLeadingWildcardLike => "StatementLeadingWildcardLike",
            AdviceCode::StatementDisallowCommit => "StatementDisallowCommit",
            AdviceCode::StatementDisallowLimit => "StatementDisallowLimit",
            AdviceCode::StatementInsertTooManyRows => "StatementInsertTooManyRows",
            AdviceCode::NamingTableMismatch => "NamingTableConventionMismatch",
            AdviceCode::NamingColumnMismatch => "NamingColumnConventionMismatch",
            AdviceCode::NamingIndexMismatch => "NamingIndexConventionMismatch",
            AdviceCode::NamingUniqueKeyMismatch => "NamingUKConventionMismatch",
            AdviceCode::NamingForeignKeyMismatch => "NamingFKConventionMismatch",
            AdviceCode::NamingAutoIncrementColumnMismatch => {
                "NamingAutoIncrementColumnConventionMismatch"
            }
            AdviceCode::NotNullColumnWithNullDefault => "NotNullColumnWithNullDefault",
            AdviceCode::ColumnNotFound => "ColumnNotFound",
            AdviceCode::DisabledColumnType => "DisabledColumnType",
            AdviceCode::DuplicateColumn => "DuplicateColumn",
            AdviceCode::NotInnoDBEngine => "NotInnoDBEngine",
            AdviceCode::TableNoPrimaryKey => "TableNoPK",
            AdviceCode::TableHasForeignKey => "TableHasFK",
            AdviceCode::TableNotExists => "TableNotExists",
            AdviceCode::DuplicateTable => "DuplicateTable",
            AdviceCode::DatabaseNotEmpty => "DatabaseNotEmpty",
            AdviceCode::NotCurrentDatabase => "NotCurrentDatabase",
            AdviceCode::IndexNotFound => "IndexNotFound",
            AdviceCode::DuplicateIndex => "DuplicateIndex",
        }
    }
}

impl Serialize for AdviceCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u32(self.value())
    }
}

impl std::fmt::Display for AdviceCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.name(), self.value())
    }
}

/// One diagnostic finding
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Advice {
    pub status: AdviceStatus,
    pub code: AdviceCode,
    pub title: String,
    pub content: String,
    /// 1-based script line, 0 for script-level advice
    pub line: usize,
}

impl Advice {
    pub fn new(
        status: AdviceStatus,
        code: AdviceCode,
        title: impl Into<String>,
        content: impl Into<String>,
        line: usize,
    ) -> Self {
        Self {
            status,
            code,
            title: title.into(),
            content: content.into(),
            line,
        }
    }

    /// The advice synthesized for a script with no findings
    pub fn ok() -> Self {
        Self::new(AdviceStatus::Success, AdviceCode::Ok, "OK", "", 0)
    }

    pub fn is_finding(&self) -> bool {
        self.status != AdviceStatus::Success
    }
}

/// Collapse the concatenated per-statement advice into the final list
///
/// Findings keep their order. A script without any warning or error yields
/// exactly one `Success`/`Ok` advice.
pub fn aggregate(advices: Vec<Advice>) -> Vec<Advice> {
    let findings: Vec<Advice> = advices.into_iter().filter(Advice::is_finding).collect();
    if findings.is_empty() {
        vec![Advice::ok()]
    } else {
        findings
    }
}

/// Result of one review call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReviewReport {
    pub advices: Vec<Advice>,
    pub statement_count: usize,
    pub passed: bool,
}

impl ReviewReport {
    pub(crate) fn new(advices: Vec<Advice>, statement_count: usize, warning_blocks: bool) -> Self {
        let advices = aggregate(advices);
        let passed = verdict(&advices, warning_blocks);
        Self {
            advices,
            statement_count,
            passed,
        }
    }

    pub fn error_count(&self) -> usize {
        self.count(AdviceStatus::Error)
    }

    pub fn warning_count(&self) -> usize {
        self.count(AdviceStatus::Warning)
    }

    /// Highest status among the advice
    pub fn status(&self) -> AdviceStatus {
        self.advices
            .iter()
            .map(|a| a.status)
            .max()
            .unwrap_or(AdviceStatus::Success)
    }

    fn count(&self, status: AdviceStatus) -> usize {
        self.advices.iter().filter(|a| a.status == status).count()
    }
}

/// Pass unless an error is present, or a warning when warnings block
pub fn verdict(advices: &[Advice], warning_blocks: bool) -> bool {
    advices.iter().all(|a| match a.status {
        AdviceStatus::Success => true,
        AdviceStatus::Warning => !warning_blocks,
        AdviceStatus::Error => false,
    })
}
