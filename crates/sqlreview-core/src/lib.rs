//! sqlreview-core: SQL change-script review library
//!
//! This library reviews SQL scripts against a configurable rule policy
//! without a database connection. Scripts are parsed per engine, lowered to
//! one statement model, replayed onto a simulated schema catalog and checked
//! by the rules the policy enables.

pub mod advice;
pub mod advisor;
pub mod dialect;
pub mod error;
pub mod parser;
pub mod policy;
pub mod rules;
pub mod schema;
pub mod statement;

pub use advice::{Advice, AdviceCode, AdviceStatus, ReviewReport};
pub use advisor::Advisor;
pub use dialect::Engine;
pub use error::{AdvisorError, Result};
pub use policy::{ReviewPolicy, RuleDefinition, RuleLevel};
pub use rules::{CheckContext, PayloadShape, RuleChecker, RuleRegistry, RuleType};
pub use schema::{Catalog, ColumnDef, IndexDef, IndexKind, TableDef};
pub use statement::{Node, Statement};
