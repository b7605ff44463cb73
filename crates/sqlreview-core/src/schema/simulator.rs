//! Catalog simulator - replays normalized statements onto a catalog
//!
//! Replay never fails. An inconsistent statement still produces a valid next
//! catalog, and the inconsistency comes back as catalog advice.

use crate::advice::{Advice, AdviceCode, AdviceStatus};
use crate::dialect::Engine;
use crate::parser::{DialectParser, SqlParserAdapter};
use crate::schema::{fold, Catalog, ColumnDef, ForeignKeyDef, IndexDef, IndexKind, TableDef};
use crate::statement::{
    normalize, AlterAction, ColumnChange, ColumnSpec, CreateTable, ForeignKeySpec, IndexSpec,
    Node, Statement,
};

/// Title shared by every advice the simulator emits
pub const CATALOG_TITLE: &str = "catalog";

const PRIMARY_INDEX: &str = "PRIMARY";

/// Apply one statement to the catalog and return the catalog advice
pub fn apply(catalog: &mut Catalog, statement: &Statement) -> Vec<Advice> {
    let mut simulator = Simulator {
        catalog,
        line: statement.line(),
        advices: Vec::new(),
    };
    simulator.process_statement(&statement.node);
    simulator.advices
}

impl Catalog {
    /// Build an authoritative baseline by replaying a DDL script.
    ///
    /// Statements that do not parse are skipped, so schema dumps carrying
    /// procedures or triggers still load.
    pub fn from_ddl(engine: Engine, sql: &str) -> Catalog {
        let (parsed, errors) = SqlParserAdapter::new(engine).parse_lenient(sql);
        for error in &errors {
            tracing::debug!(%error, "skipping unparseable baseline statement");
        }

        let mut catalog = Catalog::new();
        for statement in parsed.iter().map(normalize) {
            for advice in apply(&mut catalog, &statement) {
                tracing::warn!(
                    line = advice.line,
                    code = advice.code.name(),
                    "baseline inconsistency: {}",
                    advice.content
                );
            }
        }
        catalog.authoritative = true;
        catalog
    }
}

struct Simulator<'c> {
    catalog: &'c mut Catalog,
    line: usize,
    advices: Vec<Advice>,
}

impl Simulator<'_> {
    fn process_statement(&mut self, node: &Node) {
        match node {
            Node::CreateTable(create) => self.process_create_table(create),
            Node::AlterTable { table, actions } => self.process_alter_table(table, actions),
            Node::DropTable { tables, if_exists } => {
                for table in tables {
                    let known_absent = self.catalog.is_known_absent(table);
                    self.catalog.remove_table(table);
                    if known_absent && !if_exists {
                        self.report(AdviceCode::TableNotExists, table_missing(table));
                    }
                }
            }
            Node::CreateIndex {
                table,
                index,
                if_not_exists,
            } => {
                self.ensure_table(table);
                self.add_index(table, index, *if_not_exists);
            }
            Node::DropIndex {
                table,
                names,
                if_exists,
            } => {
                for name in names {
                    self.drop_index_anywhere(table.as_deref(), name, *if_exists);
                }
            }
            Node::DropDatabase { name, .. } => {
                if self.catalog.is_current_database(name) {
                    self.catalog.drop_all_tables();
                }
            }
            Node::Insert(insert) => self.ensure_table(&insert.table),
            Node::Update(facts) | Node::Delete(facts) => {
                if let Some(target) = facts.tables.first() {
                    self.ensure_table(target);
                }
            }
            Node::Select(_) | Node::Commit | Node::SetVariable { .. } | Node::Other(_) => {}
        }
    }

    fn process_create_table(&mut self, create: &CreateTable) {
        if self.catalog.table_exists(&create.name) {
            if !create.if_not_exists {
                self.report(
                    AdviceCode::DuplicateTable,
                    format!("Table `{}` already exists", create.name),
                );
            }
            return;
        }

        let mut table = TableDef::new(&create.name);
        table.complete = !create.derived;
        if let Some(engine) = &create.engine {
            table.options.insert("ENGINE".to_string(), engine.clone());
        }
        self.catalog.insert_table(table);

        for column in &create.columns {
            self.add_column(&create.name, column);
        }
        for index in &create.indexes {
            self.add_index(&create.name, index, false);
        }
        for fk in &create.foreign_keys {
            self.add_foreign_key(&create.name, fk);
        }
    }

    fn process_alter_table(&mut self, table: &str, actions: &[AlterAction]) {
        self.ensure_table(table);
        // RENAME TO changes the name every later action refers to
        let mut current = table.to_string();

        for action in actions {
            match action {
                AlterAction::AddColumn(column) => self.add_column(&current, column),
                AlterAction::ModifyColumn(column) => {
                    self.change_column(&current, &column.name, column)
                }
                AlterAction::ChangeColumn { old_name, column } => {
                    self.change_column(&current, old_name, column)
                }
                AlterAction::DropColumn { name, if_exists } => {
                    let removed = self
                        .catalog
                        .get_table_mut(&current)
                        .and_then(|t| t.remove_column(name));
                    if removed.is_none() && !if_exists {
                        self.column_missing(&current, name);
                    }
                }
                AlterAction::RenameColumn { old_name, new_name } => {
                    self.rename_column(&current, old_name, new_name)
                }
                AlterAction::AlterColumn { name, change } => {
                    self.alter_column(&current, name, change)
                }
                AlterAction::AddIndex(index) => self.add_index(&current, index, false),
                AlterAction::AddForeignKey(fk) => self.add_foreign_key(&current, fk),
                AlterAction::DropIndex { name } => self.drop_index(&current, name, false),
                AlterAction::DropConstraint { name, .. } => {
                    if let Some(t) = self.catalog.get_table_mut(&current) {
                        if t.remove_index(name).is_none() {
                            t.foreign_keys.retain(|fk| {
                                fk.name.as_deref().map(fold) != Some(fold(name))
                            });
                        }
                    }
                }
                AlterAction::DropPrimaryKey => self.drop_index(&current, PRIMARY_INDEX, false),
                AlterAction::RenameTable { new_name } => {
                    if self.catalog.table_exists(new_name) {
                        self.report(
                            AdviceCode::DuplicateTable,
                            format!("Table `{}` already exists", new_name),
                        );
                    } else {
                        self.catalog.rename_table(&current, new_name);
                        current = new_name.clone();
                    }
                }
                AlterAction::AddCheck { .. } | AlterAction::Other(_) => {}
            }
        }
    }

    /// Make sure `name` resolves, materializing a placeholder when needed
    fn ensure_table(&mut self, name: &str) {
        if self.catalog.table_exists(name) {
            return;
        }
        if self.catalog.is_known_absent(name) {
            self.report(AdviceCode::TableNotExists, table_missing(name));
        }
        self.catalog.insert_table(TableDef::placeholder(name));
    }

    fn add_column(&mut self, table: &str, spec: &ColumnSpec) {
        let Some(t) = self.catalog.get_table_mut(table) else {
            return;
        };
        if t.column_exists(&spec.name) {
            let content = format!("Column `{}`.`{}` already exists", table, spec.name);
            self.report(AdviceCode::DuplicateColumn, content);
            return;
        }
        t.push_column(column_def(spec));
        self.add_inline_constraints(table, spec);
    }

    /// MODIFY/CHANGE: replace `old` with the new definition
    fn change_column(&mut self, table: &str, old: &str, spec: &ColumnSpec) {
        let Some(t) = self.catalog.get_table_mut(table) else {
            return;
        };
        let renamed = fold(old) != fold(&spec.name);
        if renamed && t.column_exists(&spec.name) {
            let content = format!("Column `{}`.`{}` already exists", table, spec.name);
            self.report(AdviceCode::DuplicateColumn, content);
            return;
        }

        let mut column = column_def(spec);
        if let Some(existing) = t.get_column(old) {
            column.is_primary_key |= existing.is_primary_key;
            if column.is_primary_key {
                column.nullable = false;
            }
        }
        if !t.replace_column(old, column.clone()) {
            let complete = t.complete;
            t.push_column(column);
            if complete {
                self.column_missing(table, old);
            }
        }
        self.add_inline_constraints(table, spec);
    }

    fn rename_column(&mut self, table: &str, old: &str, new: &str) {
        let Some(t) = self.catalog.get_table_mut(table) else {
            return;
        };
        if fold(old) != fold(new) && t.column_exists(new) {
            let content = format!("Column `{}`.`{}` already exists", table, new);
            self.report(AdviceCode::DuplicateColumn, content);
            return;
        }
        match t.get_column(old).cloned() {
            Some(mut column) => {
                column.name = new.to_string();
                t.replace_column(old, column);
            }
            None => self.column_missing(table, old),
        }
    }

    fn alter_column(&mut self, table: &str, name: &str, change: &ColumnChange) {
        let Some(column) = self
            .catalog
            .get_table_mut(table)
            .and_then(|t| t.get_column_mut(name))
        else {
            self.column_missing(table, name);
            return;
        };
        match change {
            ColumnChange::SetNotNull => column.nullable = false,
            ColumnChange::DropNotNull => column.nullable = true,
            ColumnChange::SetDefault(_) => column.has_default = true,
            ColumnChange::DropDefault => column.has_default = false,
            ColumnChange::SetType(data_type) => column.data_type = data_type.clone(),
            ColumnChange::Other(_) => {}
        }
    }

    /// Indexes and foreign keys declared on the column itself
    fn add_inline_constraints(&mut self, table: &str, spec: &ColumnSpec) {
        // MODIFY/CHANGE may restate the key the column already forms
        let restated = self
            .catalog
            .get_table(table)
            .and_then(TableDef::primary_key)
            .is_some_and(|pk| pk.columns.len() == 1 && fold(&pk.columns[0]) == fold(&spec.name));
        if spec.inline_primary_key && !restated {
            let index = IndexSpec {
                name: None,
                columns: vec![spec.name.clone()],
                kind: IndexKind::Primary,
            };
            self.add_index(table, &index, false);
        }
        if spec.unique {
            let index = IndexSpec {
                name: None,
                columns: vec![spec.name.clone()],
                kind: IndexKind::Unique,
            };
            self.add_index(table, &index, false);
        }
        if let Some(fk) = &spec.references {
            self.add_foreign_key(table, fk);
        }
    }

    fn add_index(&mut self, table: &str, spec: &IndexSpec, if_not_exists: bool) {
        let Some(t) = self.catalog.get_table_mut(table) else {
            return;
        };
        let name = match (&spec.name, spec.kind) {
            (_, IndexKind::Primary) => PRIMARY_INDEX.to_string(),
            (Some(name), _) => name.clone(),
            (None, _) => t.generate_index_name(&spec.columns),
        };

        if t.get_index(&name).is_some() {
            if !if_not_exists {
                let content = if spec.kind == IndexKind::Primary {
                    format!("Table `{}` has multiple primary keys", table)
                } else {
                    format!("Index `{}` already exists in table `{}`", name, table)
                };
                self.report(AdviceCode::DuplicateIndex, content);
            }
            return;
        }

        let missing: Vec<String> = if t.complete {
            spec.columns
                .iter()
                .filter(|c| !t.column_exists(c))
                .cloned()
                .collect()
        } else {
            Vec::new()
        };

        t.add_index(IndexDef {
            name,
            columns: spec.columns.clone(),
            kind: spec.kind,
        });
        for column in missing {
            self.column_missing(table, &column);
        }
    }

    fn add_foreign_key(&mut self, table: &str, spec: &ForeignKeySpec) {
        if let Some(t) = self.catalog.get_table_mut(table) {
            t.foreign_keys.push(ForeignKeyDef {
                name: spec.name.clone(),
                columns: spec.columns.clone(),
                references_table: spec.references_table.clone(),
                references_columns: spec.references_columns.clone(),
            });
        }
    }

    fn drop_index(&mut self, table: &str, name: &str, if_exists: bool) {
        let Some(t) = self.catalog.get_table_mut(table) else {
            return;
        };
        if t.remove_index(name).is_none() && t.complete && !if_exists {
            let content = format!("Index `{}` does not exist in table `{}`", name, table);
            self.report(AdviceCode::IndexNotFound, content);
        }
    }

    /// `DROP INDEX name` without a table searches every table
    fn drop_index_anywhere(&mut self, table: Option<&str>, name: &str, if_exists: bool) {
        if let Some(table) = table {
            self.ensure_table(table);
            self.drop_index(table, name, if_exists);
            return;
        }
        let owner = self
            .catalog
            .tables
            .values()
            .find(|t| t.get_index(name).is_some())
            .map(|t| t.name.clone());
        match owner {
            Some(owner) => self.drop_index(&owner, name, if_exists),
            None if self.catalog.authoritative && !if_exists => {
                let content = format!("Index `{}` does not exist", name);
                self.report(AdviceCode::IndexNotFound, content);
            }
            None => {}
        }
    }

    /// Column absence only counts against tables whose columns are known
    fn column_missing(&mut self, table: &str, column: &str) {
        let complete = self.catalog.get_table(table).is_some_and(|t| t.complete);
        if complete {
            let content = format!("Column `{}`.`{}` does not exist", table, column);
            self.report(AdviceCode::ColumnNotFound, content);
        }
    }

    fn report(&mut self, code: AdviceCode, content: String) {
        self.advices.push(Advice::new(
            AdviceStatus::Error,
            code,
            CATALOG_TITLE,
            content,
            self.line,
        ));
    }
}

fn table_missing(table: &str) -> String {
    format!("Table `{}` does not exist", table)
}

fn column_def(spec: &ColumnSpec) -> ColumnDef {
    ColumnDef {
        name: spec.name.clone(),
        data_type: spec.data_type.clone(),
        nullable: !spec.is_not_null(),
        has_default: spec.default.is_some(),
        is_primary_key: spec.primary_key,
        auto_increment: spec.auto_increment,
        position: 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use crate::statement::normalize_all;

    fn replay(catalog: &mut Catalog, sql: &str) -> Vec<Advice> {
        let parsed = parse(sql, Engine::MySQL).unwrap();
        normalize_all(&parsed)
            .iter()
            .flat_map(|stmt| apply(catalog, stmt))
            .collect()
    }

    fn codes(advices: &[Advice]) -> Vec<AdviceCode> {
        advices.iter().map(|a| a.code).collect()
    }

    #[test]
    fn test_create_table() {
        let mut catalog = Catalog::new();
        let advices = replay(
            &mut catalog,
            "CREATE TABLE book (id INT PRIMARY KEY, title VARCHAR(20) NOT NULL, UNIQUE KEY uk_book_title (title)) ENGINE = InnoDB",
        );
        assert!(advices.is_empty());

        let book = catalog.get_table("BOOK").unwrap();
        assert!(book.complete);
        assert_eq!(book.column_names(), vec!["id", "title"]);
        assert!(book.has_primary_key());
        assert!(!book.get_column("id").unwrap().nullable);
        assert_eq!(book.get_index("uk_book_title").unwrap().kind, IndexKind::Unique);
        assert_eq!(book.options.get("ENGINE").map(String::as_str), Some("InnoDB"));
    }

    #[test]
    fn test_duplicate_table() {
        let mut catalog = Catalog::new();
        let advices = replay(
            &mut catalog,
            "CREATE TABLE t (id INT);\nCREATE TABLE t (id INT);\nCREATE TABLE IF NOT EXISTS t (id INT)",
        );
        assert_eq!(codes(&advices), vec![AdviceCode::DuplicateTable]);
        assert_eq!(advices[0].line, 2);
        assert_eq!(advices[0].title, CATALOG_TITLE);
        assert_eq!(advices[0].status, AdviceStatus::Error);
    }

    #[test]
    fn test_duplicate_column() {
        let mut catalog = Catalog::new();
        let advices = replay(
            &mut catalog,
            "CREATE TABLE t (id INT); ALTER TABLE t ADD COLUMN ID INT",
        );
        assert_eq!(codes(&advices), vec![AdviceCode::DuplicateColumn]);
    }

    #[test]
    fn test_change_column_renames() {
        let mut catalog = Catalog::new();
        let advices = replay(
            &mut catalog,
            "CREATE TABLE book (uid INT, title TEXT); ALTER TABLE book CHANGE COLUMN uid id INT NOT NULL DEFAULT 0",
        );
        assert!(advices.is_empty());
        let book = catalog.get_table("book").unwrap();
        assert!(book.column_exists("id"));
        assert!(!book.column_exists("uid"));
        let id = book.get_column("id").unwrap();
        assert_eq!(id.position, 1);
        assert!(!id.nullable);
        assert!(id.has_default);
    }

    #[test]
    fn test_change_missing_column_still_inserts() {
        let mut catalog = Catalog::new();
        let advices = replay(
            &mut catalog,
            "CREATE TABLE book (title TEXT); ALTER TABLE book CHANGE COLUMN uid id INT",
        );
        assert_eq!(codes(&advices), vec![AdviceCode::ColumnNotFound]);
        assert!(catalog.get_table("book").unwrap().column_exists("id"));
    }

    #[test]
    fn test_unknown_table_without_baseline_is_placeholder() {
        let mut catalog = Catalog::new();
        let advices = replay(
            &mut catalog,
            "ALTER TABLE book CHANGE COLUMN uid id INT, DROP COLUMN other",
        );
        assert!(advices.is_empty());
        let book = catalog.get_table("book").unwrap();
        assert!(!book.complete);
        assert!(book.column_exists("id"));
    }

    #[test]
    fn test_unknown_table_with_baseline_is_reported() {
        let mut catalog = Catalog::baseline(None, vec![TableDef::new("author")]);
        let advices = replay(&mut catalog, "ALTER TABLE book ADD COLUMN id INT; DROP TABLE ghost");
        assert_eq!(
            codes(&advices),
            vec![AdviceCode::TableNotExists, AdviceCode::TableNotExists]
        );
        // replay continues on the materialized table
        assert!(catalog.get_table("book").unwrap().column_exists("id"));
    }

    #[test]
    fn test_drop_column_updates_indexes() {
        let mut catalog = Catalog::new();
        let advices = replay(
            &mut catalog,
            "CREATE TABLE t (a INT, b INT, INDEX idx_t_a (a)); ALTER TABLE t DROP COLUMN a; ALTER TABLE t DROP COLUMN missing",
        );
        assert_eq!(codes(&advices), vec![AdviceCode::ColumnNotFound]);
        let t = catalog.get_table("t").unwrap();
        assert!(t.get_index("idx_t_a").is_none());
        assert_eq!(t.get_column("b").unwrap().position, 1);
    }

    #[test]
    fn test_index_lifecycle() {
        let mut catalog = Catalog::new();
        let advices = replay(
            &mut catalog,
            "CREATE TABLE t (a INT, b INT);\nCREATE INDEX idx_a ON t (a);\nCREATE INDEX idx_a ON t (b);\nALTER TABLE t DROP INDEX idx_a;\nALTER TABLE t DROP INDEX idx_a",
        );
        assert_eq!(
            codes(&advices),
            vec![AdviceCode::DuplicateIndex, AdviceCode::IndexNotFound]
        );
        assert_eq!(advices[0].line, 3);
        assert_eq!(advices[1].line, 5);
    }

    #[test]
    fn test_unnamed_index_gets_generated_name() {
        let mut catalog = Catalog::new();
        let advices = replay(
            &mut catalog,
            "CREATE TABLE t (a INT, b INT); ALTER TABLE t ADD INDEX (a); ALTER TABLE t ADD INDEX (a, b)",
        );
        assert!(advices.is_empty());
        let t = catalog.get_table("t").unwrap();
        assert!(t.get_index("a").is_some());
        assert!(t.get_index("a_2").is_some());
    }

    #[test]
    fn test_rename_table_and_column() {
        let mut catalog = Catalog::new();
        let advices = replay(
            &mut catalog,
            "CREATE TABLE t (a INT); ALTER TABLE t RENAME TO u; ALTER TABLE u RENAME COLUMN a TO b",
        );
        assert!(advices.is_empty());
        assert!(!catalog.table_exists("t"));
        assert_eq!(catalog.get_table("u").unwrap().column_names(), vec!["b"]);
    }

    #[test]
    fn test_drop_primary_key() {
        let mut catalog = Catalog::new();
        let advices = replay(
            &mut catalog,
            "CREATE TABLE t (id INT, PRIMARY KEY (id)); ALTER TABLE t DROP PRIMARY KEY",
        );
        assert!(advices.is_empty());
        let t = catalog.get_table("t").unwrap();
        assert!(!t.has_primary_key());
        assert!(!t.get_column("id").unwrap().is_primary_key);
    }

    #[test]
    fn test_drop_database_clears_current() {
        let mut catalog = Catalog::new().with_database("shop");
        let advices = replay(&mut catalog, "CREATE TABLE t (id INT); DROP DATABASE other");
        assert!(advices.is_empty());
        assert!(!catalog.is_empty());
        assert!(replay(&mut catalog, "DROP DATABASE shop").is_empty());
        assert!(catalog.is_empty());
        assert_eq!(
            codes(&replay(&mut catalog, "DROP TABLE t")),
            vec![AdviceCode::TableNotExists]
        );
    }

    #[test]
    fn test_table_level_primary_key() {
        let mut catalog = Catalog::new();
        let advices = replay(
            &mut catalog,
            "CREATE TABLE single (id INT, PRIMARY KEY (id));\nCREATE TABLE pair (a INT, b INT, c INT, PRIMARY KEY (a, b))",
        );
        assert!(advices.is_empty());

        let single = catalog.get_table("single").unwrap();
        assert_eq!(single.primary_key().unwrap().columns, vec!["id".to_string()]);
        let pair = catalog.get_table("pair").unwrap();
        assert_eq!(
            pair.primary_key().unwrap().columns,
            vec!["a".to_string(), "b".to_string()]
        );
        assert!(!pair.get_column("b").unwrap().nullable);
        assert!(pair.get_column("c").unwrap().nullable);
    }

    #[test]
    fn test_multiple_primary_keys() {
        let mut catalog = Catalog::new();
        let advices = replay(
            &mut catalog,
            "CREATE TABLE t (a INT PRIMARY KEY, b INT PRIMARY KEY);\nCREATE TABLE u (a INT PRIMARY KEY, b INT, PRIMARY KEY (b))",
        );
        assert_eq!(
            codes(&advices),
            vec![AdviceCode::DuplicateIndex, AdviceCode::DuplicateIndex]
        );
        assert_eq!(advices[0].content, "Table `t` has multiple primary keys");
        assert_eq!(advices[1].line, 2);
        let t = catalog.get_table("t").unwrap();
        assert_eq!(t.primary_key().unwrap().columns, vec!["a".to_string()]);
    }

    #[test]
    fn test_modify_restating_primary_key() {
        let mut catalog = Catalog::new();
        let advices = replay(
            &mut catalog,
            "CREATE TABLE t (id INT PRIMARY KEY, code INT);\nALTER TABLE t MODIFY COLUMN id BIGINT PRIMARY KEY;\nALTER TABLE t MODIFY COLUMN code INT PRIMARY KEY",
        );
        assert_eq!(codes(&advices), vec![AdviceCode::DuplicateIndex]);
        assert_eq!(advices[0].line, 3);
    }

    #[test]
    fn test_dropped_table_is_known_absent() {
        let mut catalog = Catalog::new();
        let advices = replay(
            &mut catalog,
            "CREATE TABLE t (id INT);\nDROP TABLE t;\nDROP TABLE t;\nALTER TABLE t ADD COLUMN c INT;\nDROP TABLE IF EXISTS ghost",
        );
        assert_eq!(
            codes(&advices),
            vec![AdviceCode::TableNotExists, AdviceCode::TableNotExists]
        );
        assert_eq!(advices[0].line, 3);
        assert_eq!(advices[0].content, "Table `t` does not exist");
        assert_eq!(advices[1].line, 4);
        // replay continues on a placeholder
        assert!(catalog.get_table("t").unwrap().column_exists("c"));
    }

    #[test]
    fn test_renamed_away_table_is_known_absent() {
        let mut catalog = Catalog::new();
        let advices = replay(
            &mut catalog,
            "CREATE TABLE t (id INT);\nALTER TABLE t RENAME TO u;\nINSERT INTO t VALUES (1);\nCREATE TABLE t (id INT)",
        );
        assert_eq!(codes(&advices), vec![AdviceCode::TableNotExists, AdviceCode::DuplicateTable]);
        assert_eq!(advices[0].line, 3);
    }

    #[test]
    fn test_from_ddl_is_authoritative() {
        let catalog = Catalog::from_ddl(
            Engine::MySQL,
            "CREATE TABLE a (id INT PRIMARY KEY);\nCREATE PROCEDURE p() BEGIN SELECT 1 END;\nCREATE TABLE b (id INT);",
        );
        assert!(catalog.authoritative);
        assert_eq!(catalog.table_names(), vec!["a", "b"]);
    }
}
