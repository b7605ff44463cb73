//! Naming convention rules
//!
//! Table, column and auto-increment rules match a regex from the payload.
//! Index rules fill a template with the object's table and columns first,
//! so the expected name depends on what the index covers.

use regex::Regex;
use serde_json::{json, Value};

use crate::advice::{Advice, AdviceCode};
use crate::schema::IndexKind;
use crate::statement::{AlterAction, ForeignKeySpec, IndexSpec, Node};

use super::column::declared_columns;
use super::{fill_template, CheckContext, PayloadShape, RuleChecker, RuleType};

/// Why a name failed a regex convention, if it did
fn convention_violation(name: &str, format: &Regex, max_length: usize) -> Option<String> {
    if !format.is_match(name) {
        Some(format!("naming format should be \"{}\"", format.as_str()))
    } else if max_length > 0 && name.chars().count() > max_length {
        Some(format!("its length should be within {} characters", max_length))
    } else {
        None
    }
}

pub struct TableNaming;

impl RuleChecker for TableNaming {
    fn id(&self) -> &'static str {
        RuleType::NamingTable.id()
    }

    fn description(&self) -> &'static str {
        "Table names follow the naming convention"
    }

    fn payload_shape(&self) -> PayloadShape {
        PayloadShape::Naming
    }

    fn default_payload(&self) -> Value {
        json!({ "format": "^[a-z]+(_[a-z]+)*$", "maxLength": 64 })
    }

    fn check(&self, ctx: &CheckContext<'_>) -> Vec<Advice> {
        let Some((format, max_length)) = ctx.rule.payload.naming() else {
            return Vec::new();
        };
        let names: Vec<&str> = match &ctx.statement.node {
            Node::CreateTable(create) => vec![create.name.as_str()],
            Node::AlterTable { actions, .. } => actions
                .iter()
                .filter_map(|action| match action {
                    AlterAction::RenameTable { new_name } => Some(new_name.as_str()),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        };

        names
            .into_iter()
            .filter_map(|name| {
                let reason = convention_violation(name, format, max_length)?;
                Some(ctx.statement_advice(
                    AdviceCode::NamingTableMismatch,
                    format!("`{}` mismatches table naming convention, {}", name, reason),
                ))
            })
            .collect()
    }
}

pub struct ColumnNaming;

impl RuleChecker for ColumnNaming {
    fn id(&self) -> &'static str {
        RuleType::NamingColumn.id()
    }

    fn description(&self) -> &'static str {
        "Column names follow the naming convention"
    }

    fn payload_shape(&self) -> PayloadShape {
        PayloadShape::Naming
    }

    fn default_payload(&self) -> Value {
        json!({ "format": "^[a-z]+(_[a-z]+)*$", "maxLength": 64 })
    }

    fn check(&self, ctx: &CheckContext<'_>) -> Vec<Advice> {
        let Some((format, max_length)) = ctx.rule.payload.naming() else {
            return Vec::new();
        };
        let line = ctx.statement.line();

        // MODIFY keeps the existing name, so it is not a new name to judge
        let mut names: Vec<(&str, &str, usize)> = match &ctx.statement.node {
            Node::CreateTable(_) => declared_columns(ctx)
                .into_iter()
                .map(|(table, column, line)| (table, column.name.as_str(), line))
                .collect(),
            _ => Vec::new(),
        };
        if let Node::AlterTable { table, actions } = &ctx.statement.node {
            for action in actions {
                let name = match action {
                    AlterAction::AddColumn(column) | AlterAction::ChangeColumn { column, .. } => {
                        column.name.as_str()
                    }
                    AlterAction::RenameColumn { new_name, .. } => new_name.as_str(),
                    _ => continue,
                };
                names.push((table.as_str(), name, line));
            }
        }

        names
            .into_iter()
            .filter_map(|(table, column, line)| {
                let reason = convention_violation(column, format, max_length)?;
                Some(ctx.advice(
                    AdviceCode::NamingColumnMismatch,
                    format!(
                        "`{}`.`{}` mismatches column naming convention, {}",
                        table, column, reason
                    ),
                    line,
                ))
            })
            .collect()
    }
}

pub struct AutoIncrementColumnNaming;

impl RuleChecker for AutoIncrementColumnNaming {
    fn id(&self) -> &'static str {
        RuleType::NamingColumnAutoIncrement.id()
    }

    fn description(&self) -> &'static str {
        "Auto-increment column names follow the naming convention"
    }

    fn payload_shape(&self) -> PayloadShape {
        PayloadShape::Naming
    }

    fn default_payload(&self) -> Value {
        json!({ "format": "^id$", "maxLength": 64 })
    }

    fn check(&self, ctx: &CheckContext<'_>) -> Vec<Advice> {
        let Some((format, max_length)) = ctx.rule.payload.naming() else {
            return Vec::new();
        };
        declared_columns(ctx)
            .into_iter()
            .filter(|(_, column, _)| column.auto_increment)
            .filter_map(|(table, column, line)| {
                let reason = convention_violation(&column.name, format, max_length)?;
                Some(ctx.advice(
                    AdviceCode::NamingAutoIncrementColumnMismatch,
                    format!(
                        "`{}`.`{}` mismatches auto_increment column naming convention, {}",
                        table, column.name, reason
                    ),
                    line,
                ))
            })
            .collect()
    }
}

/// Expected-name check against a filled template
fn template_violation(
    name: &str,
    template: &str,
    max_length: usize,
    value: impl Fn(&str) -> Option<String>,
) -> Option<String> {
    let expected = fill_template(template, |token| value(token).map(|v| regex::escape(&v)));
    let matches = Regex::new(&expected)
        .map(|re| re.is_match(name))
        .unwrap_or(false);
    if !matches {
        Some(format!("expect \"{}\" but found `{}`", expected, name))
    } else if max_length > 0 && name.chars().count() > max_length {
        Some(format!(
            "its length should be within {} characters",
            max_length
        ))
    } else {
        None
    }
}

/// Plain index or unique key naming
pub struct IndexNaming {
    kind: IndexKind,
}

impl IndexNaming {
    pub fn plain() -> Self {
        Self {
            kind: IndexKind::Plain,
        }
    }

    pub fn unique_key() -> Self {
        Self {
            kind: IndexKind::Unique,
        }
    }

    fn label(&self) -> &'static str {
        match self.kind {
            IndexKind::Unique => "Unique key",
            _ => "Index",
        }
    }

    fn code(&self) -> AdviceCode {
        match self.kind {
            IndexKind::Unique => AdviceCode::NamingUniqueKeyMismatch,
            _ => AdviceCode::NamingIndexMismatch,
        }
    }
}

/// Explicitly named indexes a statement creates, with their table
fn created_indexes<'s>(ctx: &CheckContext<'s>) -> Vec<(&'s str, &'s IndexSpec)> {
    match &ctx.statement.node {
        Node::CreateTable(create) => create
            .indexes
            .iter()
            .map(|index| (create.name.as_str(), index))
            .collect(),
        Node::CreateIndex { table, index, .. } => vec![(table.as_str(), index)],
        Node::AlterTable { table, actions } => actions
            .iter()
            .filter_map(|action| match action {
                AlterAction::AddIndex(index) => Some((table.as_str(), index)),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

impl RuleChecker for IndexNaming {
    fn id(&self) -> &'static str {
        match self.kind {
            IndexKind::Unique => RuleType::NamingIndexUk.id(),
            _ => RuleType::NamingIndexIdx.id(),
        }
    }

    fn description(&self) -> &'static str {
        match self.kind {
            IndexKind::Unique => "Unique key names follow the naming template",
            _ => "Index names follow the naming template",
        }
    }

    fn payload_shape(&self) -> PayloadShape {
        PayloadShape::Template
    }

    fn default_payload(&self) -> Value {
        let format = match self.kind {
            IndexKind::Unique => "^uk_{{table}}_{{column_list}}$",
            _ => "^idx_{{table}}_{{column_list}}$",
        };
        json!({ "format": format, "maxLength": 64 })
    }

    fn check(&self, ctx: &CheckContext<'_>) -> Vec<Advice> {
        let Some((template, max_length)) = ctx.rule.payload.template() else {
            return Vec::new();
        };
        created_indexes(ctx)
            .into_iter()
            .filter(|(_, index)| index.kind == self.kind)
            .filter_map(|(table, index)| {
                let name = index.name.as_deref()?;
                let reason = template_violation(name, template, max_length, |token| match token {
                    "table" => Some(table.to_string()),
                    "column_list" => Some(index.columns.join("_")),
                    _ => None,
                })?;
                Some(ctx.statement_advice(
                    self.code(),
                    format!(
                        "{} in table `{}` mismatches the naming convention, {}",
                        self.label(),
                        table,
                        reason
                    ),
                ))
            })
            .collect()
    }
}

pub struct ForeignKeyNaming;

fn created_foreign_keys<'s>(ctx: &CheckContext<'s>) -> Vec<(&'s str, &'s ForeignKeySpec)> {
    match &ctx.statement.node {
        Node::CreateTable(create) => create
            .foreign_keys
            .iter()
            .chain(create.columns.iter().filter_map(|c| c.references.as_ref()))
            .map(|fk| (create.name.as_str(), fk))
            .collect(),
        Node::AlterTable { table, actions } => actions
            .iter()
            .filter_map(|action| match action {
                AlterAction::AddForeignKey(fk) => Some((table.as_str(), fk)),
                AlterAction::AddColumn(column) => {
                    column.references.as_ref().map(|fk| (table.as_str(), fk))
                }
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

impl RuleChecker for ForeignKeyNaming {
    fn id(&self) -> &'static str {
        RuleType::NamingIndexFk.id()
    }

    fn description(&self) -> &'static str {
        "Foreign key names follow the naming template"
    }

    fn payload_shape(&self) -> PayloadShape {
        PayloadShape::Template
    }

    fn default_payload(&self) -> Value {
        json!({
            "format": "^fk_{{referencing_table}}_{{referencing_column}}_{{referenced_table}}_{{referenced_column}}$",
            "maxLength": 64
        })
    }

    fn check(&self, ctx: &CheckContext<'_>) -> Vec<Advice> {
        let Some((template, max_length)) = ctx.rule.payload.template() else {
            return Vec::new();
        };
        created_foreign_keys(ctx)
            .into_iter()
            .filter_map(|(table, fk)| {
                let name = fk.name.as_deref()?;
                let reason = template_violation(name, template, max_length, |token| match token {
                    "referencing_table" | "table" => Some(table.to_string()),
                    "referencing_column" => Some(fk.columns.join("_")),
                    "referenced_table" => Some(fk.references_table.clone()),
                    "referenced_column" => Some(fk.references_columns.join("_")),
                    _ => None,
                })?;
                Some(ctx.statement_advice(
                    AdviceCode::NamingForeignKeyMismatch,
                    format!(
                        "Foreign key in table `{}` mismatches the naming convention, {}",
                        table, reason
                    ),
                ))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::advice::Advice;
    use crate::dialect::Engine;
    use crate::policy::{RuleDefinition, RuleLevel};
    use crate::rules::testing::run;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn warn(rule_type: RuleType, sql: &str) -> Vec<Advice> {
        run(
            Engine::MySQL,
            RuleDefinition::new(rule_type, RuleLevel::Warning),
            sql,
        )
    }

    fn contents(advices: &[Advice]) -> Vec<&str> {
        advices.iter().map(|a| a.content.as_str()).collect()
    }

    #[test]
    fn test_table_naming() {
        let advices = warn(
            RuleType::NamingTable,
            "CREATE TABLE book_shelf (id int);\nCREATE TABLE BookShelf (id int);\nALTER TABLE book_shelf RENAME TO Shelf2",
        );
        assert_eq!(
            contents(&advices),
            vec![
                "`BookShelf` mismatches table naming convention, naming format should be \"^[a-z]+(_[a-z]+)*$\"",
                "`Shelf2` mismatches table naming convention, naming format should be \"^[a-z]+(_[a-z]+)*$\"",
            ]
        );
        assert_eq!(advices[1].line, 3);
        assert_eq!(advices[0].code, AdviceCode::NamingTableMismatch);
    }

    #[test]
    fn test_table_naming_length() {
        let rule = RuleDefinition::new(RuleType::NamingTable, RuleLevel::Error)
            .with_payload(json!({ "maxLength": 4 }));
        let advices = run(Engine::PostgreSQL, rule, "CREATE TABLE books (id int)");
        assert_eq!(
            contents(&advices),
            vec!["`books` mismatches table naming convention, its length should be within 4 characters"]
        );
    }

    #[test]
    fn test_column_naming() {
        let advices = warn(
            RuleType::NamingColumn,
            "CREATE TABLE book (\n  id int,\n  creatorId int\n);\nALTER TABLE book ADD COLUMN Title text, RENAME COLUMN id TO bookId",
        );
        let found: Vec<(usize, &str)> = advices
            .iter()
            .map(|a| (a.line, a.content.as_str()))
            .collect();
        assert_eq!(found.len(), 3);
        assert_eq!(found[0].0, 3);
        assert!(found[0].1.starts_with("`book`.`creatorId` mismatches column naming convention"));
        assert!(found[1].1.starts_with("`book`.`Title`"));
        assert!(found[2].1.starts_with("`book`.`bookId`"));
    }

    #[test]
    fn test_auto_increment_naming() {
        let advices = warn(
            RuleType::NamingColumnAutoIncrement,
            "CREATE TABLE book (book_id int AUTO_INCREMENT PRIMARY KEY, id2 int);\nCREATE TABLE shelf (id int AUTO_INCREMENT PRIMARY KEY)",
        );
        assert_eq!(
            contents(&advices),
            vec!["`book`.`book_id` mismatches auto_increment column naming convention, naming format should be \"^id$\""]
        );
        assert_eq!(advices[0].code.value(), 307);
    }

    #[test]
    fn test_index_naming() {
        let sql = "CREATE TABLE book (id int, title text, INDEX idx_book_title (title), INDEX book_title (id, title));\nCREATE INDEX ix_title ON book (title);\nCREATE INDEX idx_book_id ON book (id)";
        let advices = warn(RuleType::NamingIndexIdx, sql);
        assert_eq!(
            contents(&advices),
            vec![
                "Index in table `book` mismatches the naming convention, expect \"^idx_book_id_title$\" but found `book_title`",
                "Index in table `book` mismatches the naming convention, expect \"^idx_book_title$\" but found `ix_title`",
            ]
        );
        assert_eq!(advices[1].line, 2);
    }

    #[test]
    fn test_unique_key_naming() {
        let sql = "CREATE TABLE book (id int, isbn text, UNIQUE KEY uk_book_isbn (isbn));\nALTER TABLE book ADD CONSTRAINT isbn_unique UNIQUE (isbn);\nCREATE UNIQUE INDEX book_id ON book (id)";
        let advices = warn(RuleType::NamingIndexUk, sql);
        assert_eq!(advices.len(), 2);
        assert!(advices[0]
            .content
            .starts_with("Unique key in table `book` mismatches the naming convention"));
        assert_eq!(advices[0].code, AdviceCode::NamingUniqueKeyMismatch);
        assert_eq!(advices[1].line, 3);
    }

    #[test]
    fn test_foreign_key_naming() {
        let sql = "CREATE TABLE author (id int PRIMARY KEY);\nCREATE TABLE book (id int, author_id int, CONSTRAINT fk_book_author_id_author_id FOREIGN KEY (author_id) REFERENCES author (id));\nALTER TABLE book ADD CONSTRAINT book_author FOREIGN KEY (author_id) REFERENCES author (id)";
        let advices = warn(RuleType::NamingIndexFk, sql);
        assert_eq!(
            contents(&advices),
            vec!["Foreign key in table `book` mismatches the naming convention, expect \"^fk_book_author_id_author_id$\" but found `book_author`"]
        );
    }

    #[test]
    fn test_unnamed_indexes_are_skipped() {
        let sql = "CREATE TABLE book (id int, isbn text UNIQUE, INDEX (id))";
        assert!(warn(RuleType::NamingIndexIdx, sql).is_empty());
        assert!(warn(RuleType::NamingIndexUk, sql).is_empty());
    }
}
