//! Database-level rules

use crate::advice::{Advice, AdviceCode};
use crate::statement::Node;

use super::{CheckContext, RuleChecker, RuleType};

pub struct DropEmptyDatabase;

impl RuleChecker for DropEmptyDatabase {
    fn id(&self) -> &'static str {
        RuleType::DatabaseDropEmptyDatabase.id()
    }

    fn description(&self) -> &'static str {
        "Only empty databases may be dropped"
    }

    fn check(&self, ctx: &CheckContext<'_>) -> Vec<Advice> {
        let Node::DropDatabase { name, .. } = &ctx.statement.node else {
            return Vec::new();
        };
        let catalog = ctx.catalog;

        // Only the current database's contents are known
        if !catalog.is_current_database(name) {
            return vec![ctx.statement_advice(
                AdviceCode::NotCurrentDatabase,
                format!(
                    "Database `{}` that is trying to be deleted is not the current database `{}`",
                    name,
                    catalog.database.as_deref().unwrap_or_default()
                ),
            )];
        }
        if !catalog.is_empty() {
            return vec![ctx.statement_advice(
                AdviceCode::DatabaseNotEmpty,
                format!("Database `{}` is not allowed to drop if not empty", name),
            )];
        }
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::Engine;
    use crate::policy::{RuleDefinition, RuleLevel};
    use crate::rules::testing::{run, run_on};
    use crate::schema::{Catalog, TableDef};
    use pretty_assertions::assert_eq;

    fn rule() -> RuleDefinition {
        RuleDefinition::new(RuleType::DatabaseDropEmptyDatabase, RuleLevel::Error)
    }

    #[test]
    fn test_drop_other_database() {
        let catalog = Catalog::new().with_database("shop");
        let advices = run_on(Engine::MySQL, rule(), catalog, "DROP DATABASE archive");
        assert_eq!(advices.len(), 1);
        assert_eq!(advices[0].code, AdviceCode::NotCurrentDatabase);
        assert_eq!(
            advices[0].content,
            "Database `archive` that is trying to be deleted is not the current database `shop`"
        );
    }

    #[test]
    fn test_drop_non_empty_database() {
        let catalog = Catalog::baseline(Some("shop".to_string()), [TableDef::new("orders")]);
        let advices = run_on(Engine::MySQL, rule(), catalog, "DROP DATABASE shop");
        assert_eq!(advices.len(), 1);
        assert_eq!(advices[0].code, AdviceCode::DatabaseNotEmpty);
        assert_eq!(
            advices[0].content,
            "Database `shop` is not allowed to drop if not empty"
        );
    }

    #[test]
    fn test_drop_database_after_emptying_it() {
        let sql = "CREATE TABLE t (id int);\nDROP TABLE t;\nDROP DATABASE shop";
        assert!(run(Engine::TiDB, rule(), sql).is_empty());

        let advices = run(Engine::MariaDB, rule(), "CREATE TABLE t (id int);\nDROP DATABASE shop");
        assert_eq!(advices[0].line, 2);
    }
}
