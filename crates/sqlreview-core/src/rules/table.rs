//! Table structure rules

use crate::advice::{Advice, AdviceCode};
use crate::schema::{fold, IndexKind, TableDef};
use crate::statement::{AlterAction, Node};

use super::{CheckContext, RuleChecker, RuleType};

pub struct RequirePrimaryKey;

impl RequirePrimaryKey {
    /// Whether the actions leave a table that had a primary key without one
    fn drops_primary_key(table: &TableDef, actions: &[AlterAction]) -> bool {
        let Some(pk) = table.primary_key() else {
            return false;
        };
        let mut pk_columns: Vec<String> = pk.columns.iter().map(|c| fold(c)).collect();
        let mut dropped = false;
        let mut added = false;

        for action in actions {
            match action {
                AlterAction::DropPrimaryKey => dropped = true,
                AlterAction::DropIndex { name } | AlterAction::DropConstraint { name, .. }
                    if fold(name) == "primary" || fold(name) == fold(&pk.name) =>
                {
                    dropped = true
                }
                AlterAction::DropColumn { name, .. } => {
                    pk_columns.retain(|c| *c != fold(name));
                    if pk_columns.is_empty() {
                        dropped = true;
                    }
                }
                AlterAction::AddIndex(index) if index.kind == IndexKind::Primary => added = true,
                AlterAction::AddColumn(column)
                | AlterAction::ModifyColumn(column)
                | AlterAction::ChangeColumn { column, .. }
                    if column.primary_key =>
                {
                    added = true
                }
                _ => {}
            }
        }
        dropped && !added
    }
}

impl RuleChecker for RequirePrimaryKey {
    fn id(&self) -> &'static str {
        RuleType::TableRequirePk.id()
    }

    fn description(&self) -> &'static str {
        "Tables must have a primary key"
    }

    fn check(&self, ctx: &CheckContext<'_>) -> Vec<Advice> {
        let missing = match &ctx.statement.node {
            Node::CreateTable(create) if !create.derived && !create.has_primary_key() => {
                Some(create.name.as_str())
            }
            Node::AlterTable { table, actions } => ctx
                .catalog
                .get_table(table)
                .filter(|def| Self::drops_primary_key(def, actions))
                .map(|_| table.as_str()),
            _ => None,
        };
        missing
            .map(|table| {
                vec![ctx.statement_advice(
                    AdviceCode::TableNoPrimaryKey,
                    format!("Table `{}` requires PRIMARY KEY", table),
                )]
            })
            .unwrap_or_default()
    }
}

pub struct NoForeignKey;

impl RuleChecker for NoForeignKey {
    fn id(&self) -> &'static str {
        RuleType::TableNoForeignKey.id()
    }

    fn description(&self) -> &'static str {
        "Disallow foreign keys"
    }

    fn check(&self, ctx: &CheckContext<'_>) -> Vec<Advice> {
        let table = match &ctx.statement.node {
            Node::CreateTable(create)
                if !create.foreign_keys.is_empty()
                    || create.columns.iter().any(|c| c.references.is_some()) =>
            {
                Some(create.name.as_str())
            }
            Node::AlterTable { table, actions }
                if actions.iter().any(|action| match action {
                    AlterAction::AddForeignKey(_) => true,
                    AlterAction::AddColumn(column) => column.references.is_some(),
                    _ => false,
                }) =>
            {
                Some(table.as_str())
            }
            _ => None,
        };
        table
            .map(|table| {
                vec![ctx.statement_advice(
                    AdviceCode::TableHasForeignKey,
                    format!("Foreign key is not allowed in the table `{}`", table),
                )]
            })
            .unwrap_or_default()
    }
}
