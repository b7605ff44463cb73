//! DML statement rules

use serde_json::{json, Value};

use crate::advice::{Advice, AdviceCode};
use crate::statement::Node;

use super::{CheckContext, PayloadShape, RuleChecker, RuleType};

pub struct NoSelectAll;

impl RuleChecker for NoSelectAll {
    fn id(&self) -> &'static str {
        RuleType::StatementSelectNoSelectAll.id()
    }

    fn description(&self) -> &'static str {
        "Disallow SELECT *"
    }

    fn check(&self, ctx: &CheckContext<'_>) -> Vec<Advice> {
        let select_all = match &ctx.statement.node {
            Node::Select(facts) | Node::Update(facts) | Node::Delete(facts) => facts.select_all,
            Node::Insert(insert) => insert.facts.select_all,
            _ => false,
        };
        if !select_all {
            return Vec::new();
        }
        vec![ctx.statement_advice(
            AdviceCode::StatementSelectAll,
            format!("\"{}\" uses SELECT all", ctx.statement.text),
        )]
    }
}

pub struct RequireWhere;

impl RuleChecker for RequireWhere {
    fn id(&self) -> &'static str {
        RuleType::StatementWhereRequire.id()
    }

    fn description(&self) -> &'static str {
        "Require WHERE on UPDATE, DELETE and SELECT"
    }

    fn check(&self, ctx: &CheckContext<'_>) -> Vec<Advice> {
        let missing = match &ctx.statement.node {
            Node::Update(facts) | Node::Delete(facts) => !facts.has_where,
            // SELECT 1 and friends read no table
            Node::Select(facts) => facts.has_from && !facts.has_where,
            _ => false,
        };
        if !missing {
            return Vec::new();
        }
        vec![ctx.statement_advice(
            AdviceCode::StatementNoWhere,
            format!("\"{}\" requires WHERE clause", ctx.statement.text),
        )]
    }
}

pub struct NoLeadingWildcardLike;

impl RuleChecker for NoLeadingWildcardLike {
    fn id(&self) -> &'static str {
        RuleType::StatementWhereNoLeadingWildcardLike.id()
    }

    fn description(&self) -> &'static str {
        "Disallow LIKE patterns with a leading wildcard"
    }

    fn check(&self, ctx: &CheckContext<'_>) -> Vec<Advice> {
        let patterns = match &ctx.statement.node {
            Node::Select(facts) | Node::Update(facts) | Node::Delete(facts) => &facts.like_patterns,
            Node::Insert(insert) => &insert.facts.like_patterns,
            _ => return Vec::new(),
        };
        // One finding per statement, however many patterns match
        if !patterns
            .iter()
            .any(|p| p.starts_with('%') || p.starts_with('_'))
        {
            return Vec::new();
        }
        vec![ctx.statement_advice(
            AdviceCode::StatementLeadingWildcardLike,
            format!("\"{}\" uses leading wildcard LIKE", ctx.statement.text),
        )]
    }
}

pub struct DisallowCommit;

impl RuleChecker for DisallowCommit {
    fn id(&self) -> &'static str {
        RuleType::StatementDisallowCommit.id()
    }

    fn description(&self) -> &'static str {
        "Disallow explicit COMMIT"
    }

    fn check(&self, ctx: &CheckContext<'_>) -> Vec<Advice> {
        if !matches!(ctx.statement.node, Node::Commit) {
            return Vec::new();
        }
        vec![ctx.statement_advice(
            AdviceCode::StatementDisallowCommit,
            format!(
                "Commit is not allowed, related statement: \"{}\"",
                ctx.statement.text
            ),
        )]
    }
}

pub struct DisallowLimit;

impl RuleChecker for DisallowLimit {
    fn id(&self) -> &'static str {
        RuleType::StatementDisallowLimit.id()
    }

    fn description(&self) -> &'static str {
        "Disallow LIMIT on INSERT, UPDATE and DELETE"
    }

    fn check(&self, ctx: &CheckContext<'_>) -> Vec<Advice> {
        let limited = match &ctx.statement.node {
            Node::Insert(insert) => insert.from_select && insert.facts.limit.is_some(),
            Node::Update(facts) | Node::Delete(facts) => facts.limit.is_some(),
            _ => false,
        };
        if !limited {
            return Vec::new();
        }
        vec![ctx.statement_advice(
            AdviceCode::StatementDisallowLimit,
            format!(
                "LIMIT clause is forbidden in INSERT, UPDATE and DELETE statement, but \"{}\" uses",
                ctx.statement.text
            ),
        )]
    }
}

pub struct InsertRowLimit;

impl RuleChecker for InsertRowLimit {
    fn id(&self) -> &'static str {
        RuleType::StatementInsertRowLimit.id()
    }

    fn description(&self) -> &'static str {
        "Limit the rows of a literal INSERT"
    }

    fn payload_shape(&self) -> PayloadShape {
        PayloadShape::Number
    }

    fn default_payload(&self) -> Value {
        json!({ "number": 1000 })
    }

    fn check(&self, ctx: &CheckContext<'_>) -> Vec<Advice> {
        let Node::Insert(insert) = &ctx.statement.node else {
            return Vec::new();
        };
        let (Some(rows), Some(max)) = (insert.rows, ctx.rule.payload.number()) else {
            return Vec::new();
        };
        if max == 0 || (rows as u64) <= max {
            return Vec::new();
        }
        vec![ctx.statement_advice(
            AdviceCode::StatementInsertTooManyRows,
            format!(
                "\"{}\" inserts {} rows. The count exceeds {}.",
                ctx.statement.text, rows, max
            ),
        )]
    }
}
