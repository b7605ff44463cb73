//! Storage engine rules

use crate::advice::{Advice, AdviceCode};
use crate::statement::Node;

use super::{CheckContext, RuleChecker, RuleType};

const DEFAULT_ENGINE_VARIABLE: &str = "default_storage_engine";

fn is_innodb(engine: &str) -> bool {
    engine
        .split('(')
        .next()
        .is_some_and(|name| name.trim().eq_ignore_ascii_case("innodb"))
}

pub struct UseInnoDb;

impl RuleChecker for UseInnoDb {
    fn id(&self) -> &'static str {
        RuleType::EngineMysqlUseInnodb.id()
    }

    fn description(&self) -> &'static str {
        "Tables must use the InnoDB storage engine"
    }

    fn check(&self, ctx: &CheckContext<'_>) -> Vec<Advice> {
        let violates = match &ctx.statement.node {
            // No ENGINE clause means the server default, which SET statements cover
            Node::CreateTable(create) => create.engine.as_deref().is_some_and(|e| !is_innodb(e)),
            Node::SetVariable { name, value } => {
                name.eq_ignore_ascii_case(DEFAULT_ENGINE_VARIABLE) && !is_innodb(value)
            }
            _ => false,
        };
        if !violates {
            return Vec::new();
        }
        vec![ctx.statement_advice(
            AdviceCode::NotInnoDBEngine,
            format!("\"{}\" doesn't use InnoDB engine", ctx.statement.text),
        )]
    }
}
