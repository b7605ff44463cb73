//! Statement normalizer - lowers dialect parse trees into one canonical model
//!
//! Rules and the catalog simulator only ever see [`Statement`]. Anything
//! dialect-specific is resolved here or in the parser adapter.

use std::ops::ControlFlow;

use serde::Serialize;
use sqlparser::ast::{
    self as ast, AlterColumnOperation, AlterTableOperation, ColumnOption, Expr, ObjectName,
    Query, SelectItem, SetExpr, Statement as AstStatement, TableConstraint, Value, Visit, Visitor,
};

use crate::parser::ParsedStatement;
use crate::schema::{fold, IndexKind};

pub use crate::parser::LineRange;

/// Coarse statement classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StatementKind {
    Create,
    Alter,
    Drop,
    Select,
    Insert,
    Update,
    Delete,
    Other,
}

/// One normalized statement
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Statement {
    pub index: usize,
    pub lines: LineRange,
    pub text: String,
    pub node: Node,
}

impl Statement {
    pub fn kind(&self) -> StatementKind {
        match &self.node {
            Node::CreateTable(_) | Node::CreateIndex { .. } => StatementKind::Create,
            Node::AlterTable { .. } => StatementKind::Alter,
            Node::DropTable { .. } | Node::DropIndex { .. } | Node::DropDatabase { .. } => {
                StatementKind::Drop
            }
            Node::Select(_) => StatementKind::Select,
            Node::Insert(_) => StatementKind::Insert,
            Node::Update(_) => StatementKind::Update,
            Node::Delete(_) => StatementKind::Delete,
            Node::Commit | Node::SetVariable { .. } | Node::Other(_) => StatementKind::Other,
        }
    }

    /// First line of the statement
    pub fn line(&self) -> usize {
        self.lines.start
    }
}

/// Canonical statement payload
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Node {
    CreateTable(CreateTable),
    AlterTable {
        table: String,
        actions: Vec<AlterAction>,
    },
    DropTable {
        tables: Vec<String>,
        if_exists: bool,
    },
    CreateIndex {
        table: String,
        index: IndexSpec,
        if_not_exists: bool,
    },
    DropIndex {
        /// Owning table, when the dialect names it
        table: Option<String>,
        names: Vec<String>,
        if_exists: bool,
    },
    DropDatabase {
        name: String,
        if_exists: bool,
    },
    Select(QueryFacts),
    Insert(InsertFacts),
    Update(QueryFacts),
    Delete(QueryFacts),
    Commit,
    SetVariable {
        name: String,
        value: String,
    },
    /// Statement kinds no rule or catalog action understands
    Other(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreateTable {
    pub name: String,
    pub if_not_exists: bool,
    pub columns: Vec<ColumnSpec>,
    /// Table-level PRIMARY KEY / UNIQUE / INDEX definitions
    pub indexes: Vec<IndexSpec>,
    pub foreign_keys: Vec<ForeignKeySpec>,
    /// Storage engine from `ENGINE = ...`
    pub engine: Option<String>,
    /// `CREATE TABLE ... AS SELECT` or `LIKE`: the column set is not spelled out
    pub derived: bool,
}

impl CreateTable {
    pub fn has_primary_key(&self) -> bool {
        self.columns.iter().any(|c| c.primary_key)
            || self.indexes.iter().any(|i| i.kind == IndexKind::Primary)
    }
}

/// A column as written in a CREATE/ALTER statement
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnSpec {
    pub name: String,
    /// Rendered SQL type
    pub data_type: String,
    pub not_null: bool,
    /// Rendered default expression; `DEFAULT NULL` is recorded as `None`
    pub default: Option<String>,
    /// Part of the primary key, inline or through a table-level constraint
    pub primary_key: bool,
    /// `PRIMARY KEY` written on the column itself
    pub inline_primary_key: bool,
    pub unique: bool,
    pub references: Option<ForeignKeySpec>,
    pub auto_increment: bool,
    /// Computed from an expression (`GENERATED ALWAYS AS (...)`)
    pub generated: bool,
    /// Script line of the column definition, when the parser tracked it
    pub line: Option<usize>,
}

impl ColumnSpec {
    /// Declared NOT NULL, explicitly or through PRIMARY KEY
    pub fn is_not_null(&self) -> bool {
        self.not_null || self.primary_key
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexSpec {
    pub name: Option<String>,
    pub columns: Vec<String>,
    pub kind: IndexKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ForeignKeySpec {
    pub name: Option<String>,
    pub columns: Vec<String>,
    pub references_table: String,
    pub references_columns: Vec<String>,
}

/// One step of an ALTER TABLE, in source order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum AlterAction {
    AddColumn(ColumnSpec),
    /// Redefine a column keeping its name
    ModifyColumn(ColumnSpec),
    /// Redefine and possibly rename a column
    ChangeColumn {
        old_name: String,
        column: ColumnSpec,
    },
    DropColumn {
        name: String,
        if_exists: bool,
    },
    RenameColumn {
        old_name: String,
        new_name: String,
    },
    AlterColumn {
        name: String,
        change: ColumnChange,
    },
    AddIndex(IndexSpec),
    AddForeignKey(ForeignKeySpec),
    AddCheck {
        name: Option<String>,
    },
    DropIndex {
        name: String,
    },
    /// Drop a named constraint of unknown kind
    DropConstraint {
        name: String,
        if_exists: bool,
    },
    DropPrimaryKey,
    RenameTable {
        new_name: String,
    },
    Other(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ColumnChange {
    SetNotNull,
    DropNotNull,
    SetDefault(String),
    DropDefault,
    SetType(String),
    Other(String),
}

/// Facts about a query-shaped statement
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QueryFacts {
    /// Referenced tables, first occurrence order
    pub tables: Vec<String>,
    /// Some query block projects `*` or `t.*`
    pub select_all: bool,
    /// Top-level WHERE is present (for SELECT: on every block with a FROM)
    pub has_where: bool,
    /// Top-level FROM is present
    pub has_from: bool,
    /// Literal LIKE/ILIKE patterns anywhere in the statement
    pub like_patterns: Vec<String>,
    pub limit: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InsertFacts {
    pub table: String,
    pub columns: Vec<String>,
    /// Row count of a literal VALUES list
    pub rows: Option<usize>,
    /// Rows come from a query
    pub from_select: bool,
    pub facts: QueryFacts,
}

/// Normalize every parsed statement, keeping order
pub fn normalize_all(parsed: &[ParsedStatement]) -> Vec<Statement> {
    parsed.iter().map(normalize).collect()
}

/// Lower one parsed statement
pub fn normalize(parsed: &ParsedStatement) -> Statement {
    let node = match &parsed.ast {
        AstStatement::CreateTable(create) => Node::CreateTable(lower_create_table(parsed, create)),
        AstStatement::AlterTable {
            name, operations, ..
        } => Node::AlterTable {
            table: object_name(name),
            actions: operations
                .iter()
                .map(|op| lower_alter_operation(parsed, op))
                .collect(),
        },
        AstStatement::CreateIndex(create) => Node::CreateIndex {
            table: object_name(&create.table_name),
            index: IndexSpec {
                name: create.name.as_ref().map(object_name),
                columns: create
                    .columns
                    .iter()
                    .map(|c| expr_column_name(&c.expr))
                    .collect(),
                kind: if create.unique {
                    IndexKind::Unique
                } else {
                    IndexKind::Plain
                },
            },
            if_not_exists: create.if_not_exists,
        },
        AstStatement::Drop {
            object_type,
            if_exists,
            names,
            ..
        } => lower_drop(&object_type.to_string(), *if_exists, names, &parsed.text),
        AstStatement::Query(query) => {
            let mut facts = collect_facts(&parsed.ast);
            let (has_from, has_where) = where_coverage(&query.body);
            facts.has_from = has_from;
            facts.has_where = has_where;
            facts.limit = query.limit.as_ref().map(ToString::to_string);
            Node::Select(facts)
        }
        AstStatement::Insert(insert) => {
            let mut facts = collect_facts(&parsed.ast);
            let (rows, from_select) = match insert.source.as_deref() {
                Some(source) => {
                    facts.limit = source.limit.as_ref().map(ToString::to_string);
                    match source.body.as_ref() {
                        SetExpr::Values(values) => (Some(values.rows.len()), false),
                        _ => (None, true),
                    }
                }
                None => (None, false),
            };
            Node::Insert(InsertFacts {
                table: object_name(&insert.table_name),
                columns: insert.columns.iter().map(|c| c.value.clone()).collect(),
                rows,
                from_select,
                facts,
            })
        }
        AstStatement::Update { selection, .. } => {
            let mut facts = collect_facts(&parsed.ast);
            facts.has_from = true;
            facts.has_where = selection.is_some();
            facts.limit = parsed.hints.update_limit.clone();
            Node::Update(facts)
        }
        AstStatement::Delete(delete) => {
            let mut facts = collect_facts(&parsed.ast);
            facts.has_from = true;
            facts.has_where = delete.selection.is_some();
            facts.limit = delete.limit.as_ref().map(ToString::to_string);
            Node::Delete(facts)
        }
        AstStatement::Commit { .. } => Node::Commit,
        AstStatement::SetVariable { .. } => lower_set_variable(&parsed.ast.to_string())
            .unwrap_or_else(|| Node::Other(parsed.text.clone())),
        _ => Node::Other(parsed.text.clone()),
    };

    Statement {
        index: parsed.index,
        lines: parsed.lines,
        text: parsed.text.clone(),
        node,
    }
}

fn lower_create_table(parsed: &ParsedStatement, create: &ast::CreateTable) -> CreateTable {
    let mut columns: Vec<ColumnSpec> = create
        .columns
        .iter()
        .map(|column| {
            let options: Vec<&ColumnOption> = column.options.iter().map(|o| &o.option).collect();
            let line = parsed.script_line(column.name.span.start.line);
            lower_column(&column.name, &column.data_type, &options, line)
        })
        .collect();

    let mut indexes = Vec::new();
    let mut foreign_keys = Vec::new();
    for constraint in &create.constraints {
        match lower_constraint(constraint) {
            Some(Constraint::Index(index)) => indexes.push(index),
            Some(Constraint::ForeignKey(fk)) => foreign_keys.push(fk),
            Some(Constraint::Check(_)) | None => {}
        }
    }

    // Columns named by a table-level PRIMARY KEY are implicitly NOT NULL
    for index in indexes.iter().filter(|i| i.kind == IndexKind::Primary) {
        for name in &index.columns {
            if let Some(column) = columns.iter_mut().find(|c| fold(&c.name) == fold(name)) {
                column.primary_key = true;
            }
        }
    }

    CreateTable {
        name: object_name(&create.name),
        if_not_exists: create.if_not_exists,
        derived: create.query.is_some() || create.columns.is_empty(),
        columns,
        indexes,
        foreign_keys,
        engine: create.engine.as_ref().map(|e| e.to_string()),
    }
}

fn lower_column(
    name: &ast::Ident,
    data_type: &ast::DataType,
    options: &[&ColumnOption],
    line: Option<usize>,
) -> ColumnSpec {
    let data_type = data_type.to_string();
    let mut spec = ColumnSpec {
        name: name.value.clone(),
        auto_increment: is_serial_type(&data_type),
        data_type,
        not_null: false,
        default: None,
        primary_key: false,
        inline_primary_key: false,
        unique: false,
        references: None,
        generated: false,
        line,
    };

    for option in options {
        match option {
            ColumnOption::Null => spec.not_null = false,
            ColumnOption::NotNull => spec.not_null = true,
            ColumnOption::Default(Expr::Value(Value::Null)) => spec.default = None,
            ColumnOption::Default(expr) => spec.default = Some(expr.to_string()),
            ColumnOption::Unique { is_primary, .. } => {
                if *is_primary {
                    spec.primary_key = true;
                    spec.inline_primary_key = true;
                } else {
                    spec.unique = true;
                }
            }
            ColumnOption::ForeignKey {
                foreign_table,
                referred_columns,
                ..
            } => {
                spec.references = Some(ForeignKeySpec {
                    name: None,
                    columns: vec![spec.name.clone()],
                    references_table: object_name(foreign_table),
                    references_columns: referred_columns.iter().map(|c| c.value.clone()).collect(),
                });
            }
            ColumnOption::Generated {
                generation_expr, ..
            } => {
                if generation_expr.is_some() {
                    spec.generated = true;
                } else {
                    // GENERATED ... AS IDENTITY
                    spec.auto_increment = true;
                }
            }
            other => {
                let rendered = other.to_string().to_uppercase();
                if rendered.contains("AUTO_INCREMENT")
                    || rendered.contains("AUTOINCREMENT")
                    || rendered.contains("IDENTITY")
                {
                    spec.auto_increment = true;
                }
            }
        }
    }

    spec
}

fn is_serial_type(data_type: &str) -> bool {
    matches!(
        data_type.to_uppercase().as_str(),
        "SERIAL" | "SMALLSERIAL" | "BIGSERIAL" | "SERIAL2" | "SERIAL4" | "SERIAL8"
    )
}

fn idents(columns: &[ast::Ident]) -> Vec<String> {
    columns.iter().map(|c| c.value.clone()).collect()
}

enum Constraint {
    Index(IndexSpec),
    ForeignKey(ForeignKeySpec),
    Check(Option<String>),
}

fn lower_constraint(constraint: &TableConstraint) -> Option<Constraint> {
    let constraint = match constraint {
        TableConstraint::PrimaryKey { name, columns, .. } => Constraint::Index(IndexSpec {
            name: name.as_ref().map(|n| n.value.clone()),
            columns: idents(columns),
            kind: IndexKind::Primary,
        }),
        TableConstraint::Unique {
            name,
            index_name,
            columns,
            ..
        } => Constraint::Index(IndexSpec {
            // MySQL names the index after the KEY name, falling back to CONSTRAINT name
            name: index_name
                .as_ref()
                .or(name.as_ref())
                .map(|n| n.value.clone()),
            columns: idents(columns),
            kind: IndexKind::Unique,
        }),
        TableConstraint::Index { name, columns, .. } => Constraint::Index(IndexSpec {
            name: name.as_ref().map(|n| n.value.clone()),
            columns: idents(columns),
            kind: IndexKind::Plain,
        }),
        TableConstraint::ForeignKey {
            name,
            columns,
            foreign_table,
            referred_columns,
            ..
        } => Constraint::ForeignKey(ForeignKeySpec {
            name: name.as_ref().map(|n| n.value.clone()),
            columns: idents(columns),
            references_table: object_name(foreign_table),
            references_columns: idents(referred_columns),
        }),
        TableConstraint::Check { name, .. } => {
            Constraint::Check(name.as_ref().map(|n| n.value.clone()))
        }
        _ => return None,
    };
    Some(constraint)
}

fn lower_alter_operation(parsed: &ParsedStatement, op: &AlterTableOperation) -> AlterAction {
    match op {
        AlterTableOperation::AddColumn { column_def, .. } => {
            let options: Vec<&ColumnOption> =
                column_def.options.iter().map(|o| &o.option).collect();
            AlterAction::AddColumn(lower_column(
                &column_def.name,
                &column_def.data_type,
                &options,
                None,
            ))
        }
        AlterTableOperation::ModifyColumn {
            col_name,
            data_type,
            options,
            ..
        } => {
            let options: Vec<&ColumnOption> = options.iter().collect();
            AlterAction::ModifyColumn(lower_column(col_name, data_type, &options, None))
        }
        AlterTableOperation::ChangeColumn {
            old_name,
            new_name,
            data_type,
            options,
            ..
        } => {
            let options: Vec<&ColumnOption> = options.iter().collect();
            AlterAction::ChangeColumn {
                old_name: old_name.value.clone(),
                column: lower_column(new_name, data_type, &options, None),
            }
        }
        AlterTableOperation::DropColumn {
            column_name,
            if_exists,
            ..
        } => AlterAction::DropColumn {
            name: column_name.value.clone(),
            if_exists: *if_exists,
        },
        AlterTableOperation::RenameColumn {
            old_column_name,
            new_column_name,
        } => AlterAction::RenameColumn {
            old_name: old_column_name.value.clone(),
            new_name: new_column_name.value.clone(),
        },
        AlterTableOperation::AlterColumn { column_name, op } => AlterAction::AlterColumn {
            name: column_name.value.clone(),
            change: match op {
                AlterColumnOperation::SetNotNull => ColumnChange::SetNotNull,
                AlterColumnOperation::DropNotNull => ColumnChange::DropNotNull,
                AlterColumnOperation::SetDefault { value } => {
                    ColumnChange::SetDefault(value.to_string())
                }
                AlterColumnOperation::DropDefault => ColumnChange::DropDefault,
                AlterColumnOperation::SetDataType { data_type, .. } => {
                    ColumnChange::SetType(data_type.to_string())
                }
                other => ColumnChange::Other(other.to_string()),
            },
        },
        AlterTableOperation::AddConstraint(constraint) => match lower_constraint(constraint) {
            Some(Constraint::Index(index)) => AlterAction::AddIndex(index),
            Some(Constraint::ForeignKey(fk)) => AlterAction::AddForeignKey(fk),
            Some(Constraint::Check(name)) => AlterAction::AddCheck { name },
            None => AlterAction::Other(op.to_string()),
        },
        AlterTableOperation::DropConstraint {
            name, if_exists, ..
        } => {
            let dropped_index = parsed
                .hints
                .dropped_indexes
                .iter()
                .any(|index| fold(index) == fold(&name.value));
            if dropped_index {
                AlterAction::DropIndex {
                    name: name.value.clone(),
                }
            } else {
                AlterAction::DropConstraint {
                    name: name.value.clone(),
                    if_exists: *if_exists,
                }
            }
        }
        AlterTableOperation::DropPrimaryKey => AlterAction::DropPrimaryKey,
        AlterTableOperation::RenameTable { table_name } => AlterAction::RenameTable {
            new_name: object_name(table_name),
        },
        other => AlterAction::Other(other.to_string()),
    }
}

fn lower_drop(object_type: &str, if_exists: bool, names: &[ObjectName], text: &str) -> Node {
    let names: Vec<String> = names.iter().map(object_name).collect();
    match object_type.to_uppercase().as_str() {
        "TABLE" => Node::DropTable {
            tables: names,
            if_exists,
        },
        "INDEX" => Node::DropIndex {
            table: None,
            names,
            if_exists,
        },
        "DATABASE" | "SCHEMA" => match names.into_iter().next() {
            Some(name) => Node::DropDatabase { name, if_exists },
            None => Node::Other(text.to_string()),
        },
        _ => Node::Other(text.to_string()),
    }
}

fn lower_set_variable(rendered: &str) -> Option<Node> {
    let body = rendered.trim().strip_prefix("SET ")?;
    let body = ["LOCAL ", "SESSION ", "GLOBAL ", "HIVEVAR:"]
        .iter()
        .find_map(|modifier| body.strip_prefix(modifier))
        .unwrap_or(body);
    let (name, value) = body.split_once('=').or_else(|| body.split_once(" TO "))?;
    let name = name.trim().trim_start_matches("@@");
    let name = name
        .rsplit_once('.')
        .map_or(name, |(scope, var)| match scope.to_lowercase().as_str() {
            "session" | "global" | "local" => var,
            _ => name,
        });
    Some(Node::SetVariable {
        name: name.to_string(),
        value: value.trim().trim_matches(|c| c == '\'' || c == '"').to_string(),
    })
}

/// Unqualified, unquoted object name; the catalog models one database scope
fn object_name(name: &ObjectName) -> String {
    name.0
        .last()
        .map(|ident| ident.value.clone())
        .unwrap_or_else(|| name.to_string())
}

fn expr_column_name(expr: &Expr) -> String {
    match expr {
        Expr::Identifier(ident) => ident.value.clone(),
        Expr::CompoundIdentifier(idents) => idents
            .last()
            .map(|ident| ident.value.clone())
            .unwrap_or_default(),
        other => other.to_string(),
    }
}

/// (has FROM, every block with FROM has WHERE) over the top-level blocks
fn where_coverage(body: &SetExpr) -> (bool, bool) {
    match body {
        SetExpr::Select(select) => {
            let has_from = !select.from.is_empty();
            (has_from, !has_from || select.selection.is_some())
        }
        SetExpr::Query(query) => where_coverage(&query.body),
        SetExpr::SetOperation { left, right, .. } => {
            let (left_from, left_where) = where_coverage(left);
            let (right_from, right_where) = where_coverage(right);
            (left_from || right_from, left_where && right_where)
        }
        _ => (false, true),
    }
}

fn collect_facts(statement: &AstStatement) -> QueryFacts {
    let mut collector = FactCollector::default();
    let _ = statement.visit(&mut collector);
    QueryFacts {
        tables: collector.tables,
        select_all: collector.select_all,
        like_patterns: collector.like_patterns,
        ..QueryFacts::default()
    }
}

#[derive(Default)]
struct FactCollector {
    tables: Vec<String>,
    select_all: bool,
    like_patterns: Vec<String>,
}

impl Visitor for FactCollector {
    type Break = ();

    fn pre_visit_query(&mut self, query: &Query) -> ControlFlow<Self::Break> {
        if projects_wildcard(&query.body) {
            self.select_all = true;
        }
        ControlFlow::Continue(())
    }

    fn pre_visit_relation(&mut self, relation: &ObjectName) -> ControlFlow<Self::Break> {
        let name = object_name(relation);
        if !self.tables.iter().any(|t| fold(t) == fold(&name)) {
            self.tables.push(name);
        }
        ControlFlow::Continue(())
    }

    fn pre_visit_expr(&mut self, expr: &Expr) -> ControlFlow<Self::Break> {
        if let Expr::Like { pattern, .. } | Expr::ILike { pattern, .. } = expr {
            if let Expr::Value(Value::SingleQuotedString(s) | Value::DoubleQuotedString(s)) =
                pattern.as_ref()
            {
                self.like_patterns.push(s.clone());
            }
        }
        ControlFlow::Continue(())
    }
}

/// Blocks of one query level; nested queries are visited on their own
fn projects_wildcard(body: &SetExpr) -> bool {
    match body {
        SetExpr::Select(select) => select.projection.iter().any(|item| {
            matches!(
                item,
                SelectItem::Wildcard(..) | SelectItem::QualifiedWildcard(..)
            )
        }),
        SetExpr::SetOperation { left, right, .. } => {
            projects_wildcard(left) || projects_wildcard(right)
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::Engine;
    use crate::parser::parse;
    use pretty_assertions::assert_eq;

    fn one(sql: &str, engine: Engine) -> Statement {
        let parsed = parse(sql, engine).unwrap();
        assert_eq!(parsed.len(), 1);
        normalize(&parsed[0])
    }

    #[test]
    fn test_create_table_columns() {
        let stmt = one(
            "CREATE TABLE book (\n  id INT AUTO_INCREMENT,\n  title VARCHAR(20) NOT NULL DEFAULT '',\n  note TEXT DEFAULT NULL,\n  PRIMARY KEY (id)\n) ENGINE = InnoDB",
            Engine::MySQL,
        );
        assert_eq!(stmt.kind(), StatementKind::Create);
        let Node::CreateTable(create) = stmt.node else {
            panic!("expected CREATE TABLE");
        };
        assert_eq!(create.name, "book");
        assert_eq!(create.columns.len(), 3);

        let id = &create.columns[0];
        assert!(id.primary_key);
        assert!(!id.inline_primary_key);
        assert!(id.auto_increment);
        assert_eq!(id.line, Some(2));

        let title = &create.columns[1];
        assert!(title.not_null);
        assert_eq!(title.default.as_deref(), Some("''"));

        assert_eq!(create.columns[2].default, None);
        assert!(create.has_primary_key());
        assert_eq!(create.engine.as_deref().map(str::to_uppercase), Some("INNODB".into()));
    }

    #[test]
    fn test_alter_table_actions() {
        let stmt = one(
            "ALTER TABLE book CHANGE COLUMN uid id int NOT NULL DEFAULT 0, MODIFY COLUMN id int PRIMARY KEY DEFAULT 0, ADD COLUMN name varchar(20) NOT NULL DEFAULT ''",
            Engine::MySQL,
        );
        let Node::AlterTable { table, actions } = stmt.node else {
            panic!("expected ALTER TABLE");
        };
        assert_eq!(table, "book");
        assert_eq!(actions.len(), 3);
        match &actions[0] {
            AlterAction::ChangeColumn { old_name, column } => {
                assert_eq!(old_name, "uid");
                assert_eq!(column.name, "id");
                assert!(column.not_null);
            }
            other => panic!("unexpected action {other:?}"),
        }
        match &actions[1] {
            AlterAction::ModifyColumn(column) => {
                assert!(column.primary_key);
                assert_eq!(column.default.as_deref(), Some("0"));
            }
            other => panic!("unexpected action {other:?}"),
        }
        assert!(matches!(&actions[2], AlterAction::AddColumn(c) if c.name == "name"));
    }

    #[test]
    fn test_postgres_alter_column() {
        let stmt = one(
            "ALTER TABLE book ALTER COLUMN title SET NOT NULL",
            Engine::PostgreSQL,
        );
        let Node::AlterTable { actions, .. } = stmt.node else {
            panic!("expected ALTER TABLE");
        };
        assert_eq!(
            actions,
            vec![AlterAction::AlterColumn {
                name: "title".to_string(),
                change: ColumnChange::SetNotNull,
            }]
        );
    }

    #[test]
    fn test_mysql_drop_index_becomes_drop_index() {
        let stmt = one("ALTER TABLE book DROP INDEX idx_book_title", Engine::MySQL);
        let Node::AlterTable { actions, .. } = stmt.node else {
            panic!("expected ALTER TABLE");
        };
        assert_eq!(
            actions,
            vec![AlterAction::DropIndex {
                name: "idx_book_title".to_string()
            }]
        );
    }

    #[test]
    fn test_select_facts() {
        let stmt = one(
            "SELECT * FROM book b JOIN author a ON b.author_id = a.id WHERE b.title LIKE '%rust'",
            Engine::MySQL,
        );
        let Node::Select(facts) = stmt.node else {
            panic!("expected SELECT");
        };
        assert!(facts.select_all);
        assert!(facts.has_from);
        assert!(facts.has_where);
        assert_eq!(facts.tables, vec!["book".to_string(), "author".to_string()]);
        assert_eq!(facts.like_patterns, vec!["%rust".to_string()]);
    }

    #[test]
    fn test_select_without_from() {
        let Node::Select(facts) = one("SELECT 1", Engine::PostgreSQL).node else {
            panic!("expected SELECT");
        };
        assert!(!facts.has_from);
        assert!(!facts.select_all);
    }

    #[test]
    fn test_subquery_wildcard_is_found() {
        let stmt = one(
            "DELETE FROM book WHERE id IN (SELECT * FROM old_book)",
            Engine::PostgreSQL,
        );
        assert_eq!(stmt.kind(), StatementKind::Delete);
        let Node::Delete(facts) = stmt.node else {
            panic!("expected DELETE");
        };
        assert!(facts.select_all);
        assert!(facts.has_where);
    }

    #[test]
    fn test_insert_rows() {
        let stmt = one(
            "INSERT INTO book (id, title) VALUES (1, 'a'), (2, 'b'), (3, 'c')",
            Engine::MySQL,
        );
        let Node::Insert(insert) = stmt.node else {
            panic!("expected INSERT");
        };
        assert_eq!(insert.table, "book");
        assert_eq!(insert.rows, Some(3));
        assert!(!insert.from_select);
    }

    #[test]
    fn test_update_limit_from_hint() {
        let stmt = one("UPDATE book SET title = 'x' LIMIT 5", Engine::MySQL);
        let Node::Update(facts) = stmt.node else {
            panic!("expected UPDATE");
        };
        assert!(!facts.has_where);
        assert_eq!(facts.limit.as_deref(), Some("5"));
    }

    #[test]
    fn test_drop_statements() {
        assert!(matches!(
            one("DROP TABLE IF EXISTS book", Engine::MySQL).node,
            Node::DropTable { if_exists: true, .. }
        ));
        assert!(matches!(
            one("DROP DATABASE shop", Engine::MySQL).node,
            Node::DropDatabase { ref name, .. } if name == "shop"
        ));
    }

    #[test]
    fn test_commit_and_other() {
        assert_eq!(one("COMMIT", Engine::MySQL).node, Node::Commit);
        assert_eq!(one("COMMIT", Engine::MySQL).kind(), StatementKind::Other);
    }

    #[test]
    fn test_set_variable_rendering() {
        assert_eq!(
            lower_set_variable("SET default_storage_engine = 'MyISAM'"),
            Some(Node::SetVariable {
                name: "default_storage_engine".to_string(),
                value: "MyISAM".to_string(),
            })
        );
        assert_eq!(
            lower_set_variable("SET @@session.default_storage_engine = InnoDB"),
            Some(Node::SetVariable {
                name: "default_storage_engine".to_string(),
                value: "InnoDB".to_string(),
            })
        );
    }
}
