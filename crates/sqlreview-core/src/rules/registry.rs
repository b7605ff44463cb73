//! Rule registry - (rule id, engine) to checker

use std::collections::HashMap;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::dialect::Engine;
use crate::error::Result;
use crate::policy::ReviewPolicy;

use super::{column, database, engine, naming, statement, table};
use super::{ActiveRule, RuleChecker, RulePayload};

/// Immutable after construction; share it by reference across reviews
#[derive(Default, Clone)]
pub struct RuleRegistry {
    /// Rule id -> checker per engine, in registration order
    checkers: IndexMap<&'static str, HashMap<Engine, Arc<dyn RuleChecker>>>,
}

impl RuleRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in checker
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        let mysql = &Engine::MYSQL_FAMILY;
        let all = &Engine::ALL;

        registry.register(
            &[Engine::MySQL, Engine::MariaDB],
            Arc::new(engine::UseInnoDb),
        );

        registry.register(all, Arc::new(naming::TableNaming));
        registry.register(all, Arc::new(naming::ColumnNaming));
        registry.register(all, Arc::new(naming::IndexNaming::unique_key()));
        registry.register(all, Arc::new(naming::ForeignKeyNaming));
        registry.register(all, Arc::new(naming::IndexNaming::plain()));
        registry.register(mysql, Arc::new(naming::AutoIncrementColumnNaming));

        registry.register(all, Arc::new(statement::NoSelectAll));
        registry.register(all, Arc::new(statement::RequireWhere));
        registry.register(all, Arc::new(statement::NoLeadingWildcardLike));
        registry.register(all, Arc::new(statement::DisallowCommit));
        registry.register(mysql, Arc::new(statement::DisallowLimit));
        registry.register(all, Arc::new(statement::InsertRowLimit));

        registry.register(all, Arc::new(table::RequirePrimaryKey));
        registry.register(all, Arc::new(table::NoForeignKey));

        let not_null_engines: Vec<Engine> = Engine::MYSQL_FAMILY
            .into_iter()
            .chain([Engine::PostgreSQL, Engine::Oracle])
            .collect();
        registry.register(&not_null_engines, Arc::new(column::SetDefaultForNotNull));
        registry.register(all, Arc::new(column::TypeDisallowList));

        registry.register(
            &[Engine::MySQL, Engine::TiDB, Engine::MariaDB],
            Arc::new(database::DropEmptyDatabase),
        );

        registry
    }

    /// Make `checker` available for each of `engines`, replacing any
    /// previous checker with the same id
    pub fn register(&mut self, engines: &[Engine], checker: Arc<dyn RuleChecker>) {
        let by_engine = self.checkers.entry(checker.id()).or_default();
        for engine in engines {
            by_engine.insert(*engine, Arc::clone(&checker));
        }
    }

    /// Checker for a rule id, `None` when the rule is unknown or does not
    /// apply to the engine
    pub fn resolve(&self, engine: Engine, id: &str) -> Option<Arc<dyn RuleChecker>> {
        self.checkers.get(id)?.get(&engine).cloned()
    }

    /// Checkers applicable to `engine`, in registration order
    pub fn rules(&self, engine: Engine) -> Vec<Arc<dyn RuleChecker>> {
        self.checkers
            .values()
            .filter_map(|by_engine| by_engine.get(&engine).cloned())
            .collect()
    }

    /// Turn a policy into the active rule set, in policy order.
    ///
    /// Disabled rules, unknown rule types and rules that do not apply to the
    /// engine are skipped. A payload that cannot be interpreted is fatal.
    pub fn resolve_policy(&self, engine: Engine, policy: &ReviewPolicy) -> Result<Vec<ActiveRule>> {
        let mut active = Vec::new();
        for definition in &policy.rules {
            let Some(status) = definition.level.status() else {
                continue;
            };
            let rule = definition.rule_type.as_str();
            let Some(by_engine) = self.checkers.get(rule) else {
                tracing::debug!(rule, "skipping unknown rule type");
                continue;
            };
            let Some(checker) = by_engine.get(&engine).cloned() else {
                tracing::debug!(rule, %engine, "rule not applicable to engine");
                continue;
            };
            let payload = RulePayload::parse(checker.as_ref(), &definition.payload)?;
            active.push(ActiveRule {
                id: checker.id(),
                status,
                payload,
                checker,
            });
        }
        Ok(active)
    }
}
