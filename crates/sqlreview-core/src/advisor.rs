//! Review orchestration
//!
//! Statements are reviewed strictly in order. For each one the active
//! checkers run against the catalog as it stood before the statement, then
//! the simulator applies it and its catalog advice is appended.

use rayon::prelude::*;

use crate::advice::{Advice, ReviewReport};
use crate::dialect::Engine;
use crate::error::Result;
use crate::parser::parse;
use crate::policy::ReviewPolicy;
use crate::rules::{ActiveRule, CheckContext, RuleRegistry};
use crate::schema::{apply, Catalog};
use crate::statement::{normalize_all, Statement};

/// SQL review advisor - checks a script against a policy
pub struct Advisor<'a> {
    registry: &'a RuleRegistry,
    parallel: bool,
}

impl<'a> Advisor<'a> {
    pub fn new(registry: &'a RuleRegistry) -> Self {
        Self {
            registry,
            parallel: true,
        }
    }

    /// Run a statement's checkers on the rayon pool
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Review a script starting from an empty, non-authoritative catalog
    pub fn review(&self, engine: Engine, sql: &str, policy: &ReviewPolicy) -> Result<ReviewReport> {
        self.review_with_baseline(engine, sql, policy, Catalog::new())
    }

    /// Review a script against a known starting schema
    pub fn review_with_baseline(
        &self,
        engine: Engine,
        sql: &str,
        policy: &ReviewPolicy,
        mut catalog: Catalog,
    ) -> Result<ReviewReport> {
        let rules = self.registry.resolve_policy(engine, policy)?;
        let statements = normalize_all(&parse(sql, engine)?);
        tracing::debug!(
            %engine,
            statements = statements.len(),
            rules = rules.len(),
            "reviewing script"
        );

        let mut advices = Vec::new();
        for statement in &statements {
            advices.extend(self.check_statement(engine, statement, &catalog, &rules));

            let catalog_advices = apply(&mut catalog, statement);
            if !catalog_advices.is_empty() {
                tracing::debug!(
                    statement = statement.index,
                    line = statement.line(),
                    count = catalog_advices.len(),
                    "catalog inconsistency"
                );
            }
            advices.extend(catalog_advices);
        }

        Ok(ReviewReport::new(
            advices,
            statements.len(),
            policy.warning_blocks,
        ))
    }

    /// Checker advice for one statement, in policy order
    fn check_statement(
        &self,
        engine: Engine,
        statement: &Statement,
        catalog: &Catalog,
        rules: &[ActiveRule],
    ) -> Vec<Advice> {
        let run = |rule: &ActiveRule| {
            let ctx = CheckContext {
                engine,
                statement,
                catalog,
                rule,
            };
            rule.checker.check(&ctx)
        };

        let per_rule: Vec<Vec<Advice>> = if self.parallel {
            rules.par_iter().map(run).collect()
        } else {
            rules.iter().map(run).collect()
        };
        per_rule.into_iter().flatten().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::advice::{AdviceCode, AdviceStatus};
    use crate::error::AdvisorError;
    use crate::policy::{RuleDefinition, RuleLevel};
    use crate::rules::RuleType;
    use crate::schema::CATALOG_TITLE;
    use pretty_assertions::assert_eq;

    fn policy(rules: &[(RuleType, RuleLevel)]) -> ReviewPolicy {
        ReviewPolicy::new(
            rules
                .iter()
                .map(|(rule_type, level)| RuleDefinition::new(*rule_type, *level))
                .collect(),
        )
    }

    #[test]
    fn test_clean_script_yields_ok() {
        let registry = RuleRegistry::builtin();
        let report = Advisor::new(&registry)
            .review(
                Engine::MySQL,
                "CREATE TABLE t (id int PRIMARY KEY DEFAULT 0)",
                &policy(&[(RuleType::TableRequirePk, RuleLevel::Error)]),
            )
            .unwrap();
        assert_eq!(report.advices, vec![Advice::ok()]);
        assert_eq!(report.statement_count, 1);
        assert!(report.passed);
    }

    #[test]
    fn test_policy_order_within_statement() {
        let registry = RuleRegistry::builtin();
        let policy = policy(&[
            (RuleType::StatementWhereRequire, RuleLevel::Warning),
            (RuleType::StatementSelectNoSelectAll, RuleLevel::Error),
        ]);
        for parallel in [true, false] {
            let report = Advisor::new(&registry)
                .parallel(parallel)
                .review(Engine::PostgreSQL, "SELECT * FROM t;\nDELETE FROM t", &policy)
                .unwrap();
            let codes: Vec<AdviceCode> = report.advices.iter().map(|a| a.code).collect();
            assert_eq!(
                codes,
                vec![
                    AdviceCode::StatementNoWhere,
                    AdviceCode::StatementSelectAll,
                    AdviceCode::StatementNoWhere,
                ]
            );
            assert!(!report.passed);
        }
    }

    #[test]
    fn test_catalog_advice_follows_rule_advice() {
        let registry = RuleRegistry::builtin();
        let report = Advisor::new(&registry)
            .review(
                Engine::MySQL,
                "CREATE TABLE t (id int PRIMARY KEY);\nCREATE TABLE t (a int)",
                &policy(&[(RuleType::TableRequirePk, RuleLevel::Warning)]),
            )
            .unwrap();
        let found: Vec<(&str, usize)> = report
            .advices
            .iter()
            .map(|a| (a.title.as_str(), a.line))
            .collect();
        assert_eq!(found, vec![("table.require-pk", 2), (CATALOG_TITLE, 2)]);
        assert_eq!(report.advices[1].status, AdviceStatus::Error);
        assert_eq!(report.advices[1].code, AdviceCode::DuplicateTable);
    }

    #[test]
    fn test_syntax_error_is_fatal() {
        let registry = RuleRegistry::builtin();
        let err = Advisor::new(&registry)
            .review(
                Engine::MySQL,
                "SELECT 1;\nSELEC oops",
                &ReviewPolicy::default(),
            )
            .unwrap_err();
        assert!(matches!(err, AdvisorError::Syntax { line: 2, .. }));
    }

    #[test]
    fn test_warning_blocks() {
        let registry = RuleRegistry::builtin();
        let sql = "SELECT * FROM t WHERE id = 1";
        let lenient = policy(&[(RuleType::StatementSelectNoSelectAll, RuleLevel::Warning)]);
        let strict = lenient.clone().with_warning_blocks(true);

        let advisor = Advisor::new(&registry);
        assert!(advisor.review(Engine::MySQL, sql, &lenient).unwrap().passed);
        assert!(!advisor.review(Engine::MySQL, sql, &strict).unwrap().passed);
    }

    #[test]
    fn test_baseline_is_authoritative() {
        let registry = RuleRegistry::builtin();
        let baseline = Catalog::from_ddl(Engine::MySQL, "CREATE TABLE book (id INT PRIMARY KEY)");
        let report = Advisor::new(&registry)
            .review_with_baseline(
                Engine::MySQL,
                "ALTER TABLE author ADD COLUMN name TEXT",
                &ReviewPolicy::default(),
                baseline,
            )
            .unwrap();
        assert_eq!(report.advices.len(), 1);
        assert_eq!(report.advices[0].code, AdviceCode::TableNotExists);
    }
}
