//! Column definition rules

use indexmap::IndexMap;
use serde_json::{json, Value};

use crate::advice::{Advice, AdviceCode};
use crate::dialect::Engine;
use crate::schema::{fold, ColumnDef};
use crate::statement::{AlterAction, ColumnChange, ColumnSpec, Node};

use super::{CheckContext, PayloadShape, RuleChecker, RuleType};

/// Types that cannot carry a literal default in MySQL
const NO_DEFAULT_TYPES: [&str; 4] = ["BLOB", "TEXT", "JSON", "GEOMETRY"];

/// Columns newly declared or redefined by a statement, with the line to
/// report them on
pub(super) fn declared_columns<'s>(
    ctx: &CheckContext<'s>,
) -> Vec<(&'s str, &'s ColumnSpec, usize)> {
    let statement = ctx.statement;
    let line = statement.line();
    match &statement.node {
        Node::CreateTable(create) => create
            .columns
            .iter()
            .map(|c| (create.name.as_str(), c, c.line.unwrap_or(line)))
            .collect(),
        Node::AlterTable { table, actions } => actions
            .iter()
            .filter_map(|action| match action {
                AlterAction::AddColumn(column)
                | AlterAction::ModifyColumn(column)
                | AlterAction::ChangeColumn { column, .. } => Some((table.as_str(), column, line)),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

/// Base type name without length or precision, upper-cased
fn base_type(data_type: &str) -> String {
    data_type
        .split(|c: char| c == '(' || c.is_whitespace())
        .next()
        .unwrap_or_default()
        .to_uppercase()
}

/// NOT NULL / DEFAULT state of one column
#[derive(Debug, Clone, Copy)]
struct NullState<'a> {
    not_null: bool,
    has_default: bool,
    /// Auto-increment or generated: the server fills the value
    filled: bool,
    data_type: &'a str,
}

impl<'a> NullState<'a> {
    fn declared(column: &'a ColumnSpec) -> Self {
        Self {
            not_null: column.is_not_null(),
            has_default: column.default.is_some(),
            filled: column.auto_increment || column.generated,
            data_type: &column.data_type,
        }
    }

    fn existing(column: &'a ColumnDef) -> Self {
        Self {
            not_null: !column.nullable,
            has_default: column.has_default,
            filled: column.auto_increment,
            data_type: &column.data_type,
        }
    }

    fn lacks_default(&self, engine: Engine) -> bool {
        // MySQL rejects literal defaults on these types
        let no_default_type = engine.is_mysql_family() && {
            let base = base_type(self.data_type);
            NO_DEFAULT_TYPES.iter().any(|t| base.contains(t))
        };
        self.not_null && !self.has_default && !self.filled && !no_default_type
    }
}

pub struct SetDefaultForNotNull;

impl SetDefaultForNotNull {
    /// Columns that `ALTER COLUMN ... SET NOT NULL | DROP DEFAULT` leaves
    /// NOT NULL without a default, once every action of the statement ran
    fn altered_columns<'a>(ctx: &CheckContext<'a>) -> Vec<(&'a str, &'a str)> {
        let statement = ctx.statement;
        let Node::AlterTable { table, actions } = &statement.node else {
            return Vec::new();
        };
        let catalog = ctx.catalog;
        let existing = catalog.get_table(table);

        let mut states: IndexMap<String, NullState<'a>> = IndexMap::new();
        let mut touched: Vec<(String, &'a str)> = Vec::new();
        for action in actions {
            match action {
                AlterAction::AddColumn(column)
                | AlterAction::ModifyColumn(column)
                | AlterAction::ChangeColumn { column, .. } => {
                    states.insert(fold(&column.name), NullState::declared(column));
                }
                AlterAction::AlterColumn { name, change } => {
                    let key = fold(name);
                    if !states.contains_key(&key) {
                        // Unknown columns cannot be judged
                        let Some(column) = existing.and_then(|t| t.get_column(name)) else {
                            continue;
                        };
                        states.insert(key.clone(), NullState::existing(column));
                    }
                    let Some(state) = states.get_mut(&key) else {
                        continue;
                    };
                    match change {
                        ColumnChange::SetNotNull => state.not_null = true,
                        ColumnChange::DropNotNull => state.not_null = false,
                        ColumnChange::SetDefault(_) => state.has_default = true,
                        ColumnChange::DropDefault => state.has_default = false,
                        ColumnChange::SetType(data_type) => state.data_type = data_type.as_str(),
                        ColumnChange::Other(_) => {}
                    }
                    let tightened =
                        matches!(change, ColumnChange::SetNotNull | ColumnChange::DropDefault);
                    if tightened && !touched.iter().any(|(k, _)| *k == key) {
                        touched.push((key, name.as_str()));
                    }
                }
                _ => {}
            }
        }

        touched
            .into_iter()
            .filter(|(key, _)| states.get(key).is_some_and(|s| s.lacks_default(ctx.engine)))
            .map(|(_, name)| (table.as_str(), name))
            .collect()
    }
}

impl RuleChecker for SetDefaultForNotNull {
    fn id(&self) -> &'static str {
        RuleType::ColumnSetDefaultForNotNull.id()
    }

    fn description(&self) -> &'static str {
        "NOT NULL columns must have a default"
    }

    fn check(&self, ctx: &CheckContext<'_>) -> Vec<Advice> {
        let line = ctx.statement.line();
        let declared = declared_columns(ctx)
            .into_iter()
            .filter(|(_, column, _)| NullState::declared(column).lacks_default(ctx.engine))
            .map(|(table, column, line)| (table, column.name.as_str(), line));
        let altered = Self::altered_columns(ctx)
            .into_iter()
            .map(|(table, column)| (table, column, line));

        declared
            .chain(altered)
            .map(|(table, column, line)| {
                ctx.advice(
                    AdviceCode::NotNullColumnWithNullDefault,
                    format!(
                        "Column `{}`.`{}` is NOT NULL but has NULL default value",
                        table, column
                    ),
                    line,
                )
            })
            .collect()
    }
}

pub struct TypeDisallowList;

impl RuleChecker for TypeDisallowList {
    fn id(&self) -> &'static str {
        RuleType::ColumnTypeDisallowList.id()
    }

    fn description(&self) -> &'static str {
        "Disallow listed column types"
    }

    fn payload_shape(&self) -> PayloadShape {
        PayloadShape::StringList
    }

    fn default_payload(&self) -> Value {
        json!({ "list": [] })
    }

    fn check(&self, ctx: &CheckContext<'_>) -> Vec<Advice> {
        let list = ctx.rule.payload.string_list();
        if list.is_empty() {
            return Vec::new();
        }
        let disallowed = |data_type: &str| {
            let base = base_type(data_type);
            list.iter().any(|t| t.eq_ignore_ascii_case(&base))
        };
        let advice = |table: &str, column: &str, data_type: &str, line: usize| {
            ctx.advice(
                AdviceCode::DisabledColumnType,
                format!(
                    "Disallow column type {} but column `{}`.`{}` is",
                    base_type(data_type),
                    table,
                    column
                ),
                line,
            )
        };

        let mut advices: Vec<Advice> = declared_columns(ctx)
            .into_iter()
            .filter(|(_, column, _)| disallowed(&column.data_type))
            .map(|(table, column, line)| advice(table, &column.name, &column.data_type, line))
            .collect();

        if let Node::AlterTable { table, actions } = &ctx.statement.node {
            for action in actions {
                if let AlterAction::AlterColumn {
                    name,
                    change: ColumnChange::SetType(data_type),
                } = action
                {
                    if disallowed(data_type) {
                        advices.push(advice(table, name, data_type, ctx.statement.line()));
                    }
                }
            }
        }
        advices
    }
}
