//! Rule checkers and the registry that selects them
//!
//! A checker is one pure analysis of one statement. It sees the statement
//! and the catalog as it was *before* that statement, and returns advice.
//! Checkers never mutate anything, so the ones active for a statement can
//! run in parallel.

mod column;
mod database;
mod engine;
mod naming;
mod registry;
mod statement;
mod table;

use std::str::FromStr;
use std::sync::Arc;

use regex::Regex;
use serde::Deserialize;
use serde_json::Value;

use crate::advice::{Advice, AdviceCode, AdviceStatus};
use crate::dialect::Engine;
use crate::error::{AdvisorError, Result};
use crate::schema::Catalog;
use crate::statement::Statement;

pub use registry::RuleRegistry;

/// Ids of the built-in rules. The registry keys checkers by id, so a
/// checker outside this list registers under its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RuleType {
    EngineMysqlUseInnodb,
    NamingTable,
    NamingColumn,
    NamingIndexUk,
    NamingIndexFk,
    NamingIndexIdx,
    NamingColumnAutoIncrement,
    StatementSelectNoSelectAll,
    StatementWhereRequire,
    StatementWhereNoLeadingWildcardLike,
    StatementDisallowCommit,
    StatementDisallowLimit,
    StatementInsertRowLimit,
    TableRequirePk,
    TableNoForeignKey,
    ColumnSetDefaultForNotNull,
    ColumnTypeDisallowList,
    DatabaseDropEmptyDatabase,
}

impl RuleType {
    pub const ALL: [RuleType; 18] = [
        RuleType::EngineMysqlUseInnodb,
        RuleType::NamingTable,
        RuleType::NamingColumn,
        RuleType::NamingIndexUk,
        RuleType::NamingIndexFk,
        RuleType::NamingIndexIdx,
        RuleType::NamingColumnAutoIncrement,
        RuleType::StatementSelectNoSelectAll,
        RuleType::StatementWhereRequire,
        RuleType::StatementWhereNoLeadingWildcardLike,
        RuleType::StatementDisallowCommit,
        RuleType::StatementDisallowLimit,
        RuleType::StatementInsertRowLimit,
        RuleType::TableRequirePk,
        RuleType::TableNoForeignKey,
        RuleType::ColumnSetDefaultForNotNull,
        RuleType::ColumnTypeDisallowList,
        RuleType::DatabaseDropEmptyDatabase,
    ];

    /// Policy identifier, also used as the advice title
    pub fn id(&self) -> &'static str {
        match self {
            RuleType::EngineMysqlUseInnodb => "engine.mysql.use-innodb",
            RuleType::NamingTable => "naming.table",
            RuleType::NamingColumn => "naming.column",
            RuleType::NamingIndexUk => "naming.index.uk",
            RuleType::NamingIndexFk => "naming.index.fk",
            RuleType::NamingIndexIdx => "naming.index.idx",
            RuleType::NamingColumnAutoIncrement => "naming.column.auto-increment",
            RuleType::StatementSelectNoSelectAll => "statement.select.no-select-all",
            RuleType::StatementWhereRequire => "statement.where.require",
            RuleType::StatementWhereNoLeadingWildcardLike => {
                "statement.where.no-leading-wildcard-like"
            }
            RuleType::StatementDisallowCommit => "statement.disallow-commit",
            RuleType::StatementDisallowLimit => "statement.disallow-limit",
            RuleType::StatementInsertRowLimit => "statement.insert.row-limit",
            RuleType::TableRequirePk => "table.require-pk",
            RuleType::TableNoForeignKey => "table.no-foreign-key",
            RuleType::ColumnSetDefaultForNotNull => "column.set-default-for-not-null",
            RuleType::ColumnTypeDisallowList => "column.type-disallow-list",
            RuleType::DatabaseDropEmptyDatabase => "database.drop-empty-database",
        }
    }
}

impl FromStr for RuleType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        RuleType::ALL
            .into_iter()
            .find(|rule_type| rule_type.id() == s)
            .ok_or_else(|| s.to_string())
    }
}

impl std::fmt::Display for RuleType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id())
    }
}

impl AsRef<str> for RuleType {
    fn as_ref(&self) -> &str {
        self.id()
    }
}

/// How a checker's policy payload is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadShape {
    /// The rule takes no payload
    None,
    /// `{ format: regex, maxLength }`
    Naming,
    /// `{ format: template, maxLength }` with `{{token}}` placeholders
    Template,
    /// `{ number }`
    Number,
    /// `{ list: [string] }`
    StringList,
}

/// A rule payload after validation
#[derive(Debug, Clone)]
pub enum RulePayload {
    None,
    Naming { format: Regex, max_length: usize },
    /// A regex with `{{token}}` placeholders filled per object
    Template { template: String, max_length: usize },
    Number(u64),
    StringList(Vec<String>),
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct FormatPayload {
    format: Option<String>,
    #[serde(alias = "max_length")]
    max_length: Option<usize>,
}

#[derive(Deserialize, Default)]
struct NumberPayload {
    number: Option<u64>,
}

#[derive(Deserialize, Default)]
struct StringListPayload {
    list: Option<Vec<String>>,
}

impl RulePayload {
    /// Interpret a policy payload for `rule`, filling gaps from its default
    pub fn parse(rule: &dyn RuleChecker, payload: &Value) -> Result<Self> {
        let id = rule.id();
        let defaults = rule.default_payload();
        let shape = rule.payload_shape();
        match shape {
            PayloadShape::None => Ok(RulePayload::None),
            PayloadShape::Naming | PayloadShape::Template => {
                let given: FormatPayload = decode(id, payload)?;
                let fallback: FormatPayload = decode(id, &defaults)?;
                let format = given.format.or(fallback.format).unwrap_or_default();
                let max_length = given.max_length.or(fallback.max_length).unwrap_or(64);
                if shape == PayloadShape::Naming {
                    let format = Regex::new(&format)
                        .map_err(|e| AdvisorError::invalid_payload(id, e.to_string()))?;
                    Ok(RulePayload::Naming { format, max_length })
                } else {
                    // Placeholders hold plain identifiers; the rest must be a valid regex
                    let sample = fill_template(&format, |_| Some("x".to_string()));
                    Regex::new(&sample)
                        .map_err(|e| AdvisorError::invalid_payload(id, e.to_string()))?;
                    Ok(RulePayload::Template {
                        template: format,
                        max_length,
                    })
                }
            }
            PayloadShape::Number => {
                let given: NumberPayload = decode(id, payload)?;
                let fallback: NumberPayload = decode(id, &defaults)?;
                Ok(RulePayload::Number(
                    given.number.or(fallback.number).unwrap_or_default(),
                ))
            }
            PayloadShape::StringList => {
                let given: StringListPayload = decode(id, payload)?;
                let fallback: StringListPayload = decode(id, &defaults)?;
                Ok(RulePayload::StringList(
                    given.list.or(fallback.list).unwrap_or_default(),
                ))
            }
        }
    }

    pub fn naming(&self) -> Option<(&Regex, usize)> {
        match self {
            RulePayload::Naming { format, max_length } => Some((format, *max_length)),
            _ => None,
        }
    }

    pub fn template(&self) -> Option<(&str, usize)> {
        match self {
            RulePayload::Template {
                template,
                max_length,
            } => Some((template, *max_length)),
            _ => None,
        }
    }

    pub fn number(&self) -> Option<u64> {
        match self {
            RulePayload::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn string_list(&self) -> &[String] {
        match self {
            RulePayload::StringList(list) => list,
            _ => &[],
        }
    }
}

fn decode<T>(rule_id: &str, payload: &Value) -> Result<T>
where
    T: for<'de> Deserialize<'de> + Default,
{
    if payload.is_null() {
        return Ok(T::default());
    }
    T::deserialize(payload).map_err(|e| AdvisorError::invalid_payload(rule_id, e.to_string()))
}

/// Replace each `{{token}}` with `value(token)`; unknown tokens are kept
pub(crate) fn fill_template(template: &str, value: impl Fn(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find("{{") {
        let Some(close) = rest[open + 2..].find("}}") else {
            break;
        };
        let token = &rest[open + 2..open + 2 + close];
        out.push_str(&rest[..open]);
        match value(token.trim()) {
            Some(v) => out.push_str(&v),
            None => out.push_str(&rest[open..open + close + 4]),
        }
        rest = &rest[open + close + 4..];
    }
    out.push_str(rest);
    out
}

/// A policy rule resolved against the registry
#[derive(Clone)]
pub struct ActiveRule {
    /// Rule id, also the title of its advice
    pub id: &'static str,
    pub status: AdviceStatus,
    pub payload: RulePayload,
    pub checker: Arc<dyn RuleChecker>,
}

impl std::fmt::Debug for ActiveRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActiveRule")
            .field("id", &self.id)
            .field("status", &self.status)
            .field("payload", &self.payload)
            .finish()
    }
}

/// What a checker sees for one statement
pub struct CheckContext<'a> {
    pub engine: Engine,
    pub statement: &'a Statement,
    /// Catalog state before the statement is applied
    pub catalog: &'a Catalog,
    pub rule: &'a ActiveRule,
}

impl CheckContext<'_> {
    /// Advice at the rule's level, titled with the rule id
    pub fn advice(&self, code: AdviceCode, content: impl Into<String>, line: usize) -> Advice {
        Advice::new(self.rule.status, code, self.rule.id, content, line)
    }

    /// Advice on the statement's first line
    pub fn statement_advice(&self, code: AdviceCode, content: impl Into<String>) -> Advice {
        self.advice(code, content, self.statement.line())
    }
}

/// One independent analysis
///
/// A checker carries its own identity and payload contract, so a new rule
/// is added by registering another implementation.
pub trait RuleChecker: Send + Sync {
    /// Policy identifier, also used as the advice title
    fn id(&self) -> &'static str;

    /// One-line description for rule listings
    fn description(&self) -> &'static str;

    fn payload_shape(&self) -> PayloadShape {
        PayloadShape::None
    }

    /// Payload used when a policy leaves it out
    fn default_payload(&self) -> Value {
        Value::Null
    }

    /// Inspect one statement; an empty result means no finding
    fn check(&self, ctx: &CheckContext<'_>) -> Vec<Advice>;
}


#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_rule_type_ids_round_trip() {
        for rule_type in RuleType::ALL {
            assert_eq!(rule_type.id().parse::<RuleType>(), Ok(rule_type));
        }
        assert!("naming.nothing".parse::<RuleType>().is_err());
    }

    #[test]
    fn test_payload_defaults_fill_gaps() {
        let payload = RulePayload::parse(&naming::TableNaming, &json!({ "maxLength": 10 })).unwrap();
        let (format, max_length) = payload.naming().unwrap();
        assert_eq!(format.as_str(), "^[a-z]+(_[a-z]+)*$");
        assert_eq!(max_length, 10);

        let payload = RulePayload::parse(&statement::InsertRowLimit, &Value::Null).unwrap();
        assert_eq!(payload.number(), Some(1000));

        let payload = RulePayload::parse(&naming::IndexNaming::unique_key(), &Value::Null).unwrap();
        assert_eq!(payload.template(), Some(("^uk_{{table}}_{{column_list}}$", 64)));
    }

    #[test]
    fn test_invalid_payload() {
        let err = RulePayload::parse(&naming::ColumnNaming, &json!({ "format": "([a-z" }))
            .unwrap_err();
        assert_eq!(err.code(), "InvalidPayload");

        let err = RulePayload::parse(&statement::InsertRowLimit, &json!({ "number": "many" }))
            .unwrap_err();
        assert!(matches!(err, AdvisorError::InvalidPayload { .. }));
    }

    #[test]
    fn test_fill_template() {
        let filled = fill_template("^idx_{{table}}_{{column_list}}$", |token| match token {
            "table" => Some("book".to_string()),
            "column_list" => Some("id_title".to_string()),
            _ => None,
        });
        assert_eq!(filled, "^idx_book_id_title$");
        assert_eq!(fill_template("{{unknown}}_x", |_| None), "{{unknown}}_x");
    }
}
