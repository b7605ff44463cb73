//! Schema catalog - the simulated table/column/index state of one database

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

/// Identifier comparison key. Names are matched case-insensitively.
pub fn fold(name: &str) -> String {
    name.to_lowercase()
}

/// Schema catalog for one database scope
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    /// Current database name, when known
    #[serde(default)]
    pub database: Option<String>,
    /// Folded table name -> table
    #[serde(default)]
    pub tables: IndexMap<String, TableDef>,
    /// Seeded from a live schema: an unknown table is an inconsistency,
    /// not a gap in knowledge
    #[serde(default)]
    pub authoritative: bool,
    /// Folded names of tables dropped or renamed away during replay.
    /// Known to be absent even without a baseline.
    #[serde(default, skip_serializing_if = "IndexSet::is_empty")]
    pub dropped: IndexSet<String>,
}

impl Catalog {
    /// Empty, non-authoritative catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Authoritative catalog seeded with the given tables
    pub fn baseline(database: Option<String>, tables: impl IntoIterator<Item = TableDef>) -> Self {
        let mut catalog = Self {
            database,
            tables: IndexMap::new(),
            authoritative: true,
            dropped: IndexSet::new(),
        };
        for table in tables {
            catalog.insert_table(table);
        }
        catalog
    }

    /// Re-key a catalog that was deserialized from an external baseline
    pub fn into_baseline(self) -> Self {
        let tables: Vec<TableDef> = self
            .tables
            .into_values()
            .map(TableDef::reindexed)
            .collect();
        Self::baseline(self.database, tables)
    }

    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    /// Look up a table by name
    pub fn get_table(&self, name: &str) -> Option<&TableDef> {
        self.tables.get(&fold(name))
    }

    /// Look up a table by name (mutable)
    pub fn get_table_mut(&mut self, name: &str) -> Option<&mut TableDef> {
        self.tables.get_mut(&fold(name))
    }

    /// Check if a table exists
    pub fn table_exists(&self, name: &str) -> bool {
        self.tables.contains_key(&fold(name))
    }

    /// Insert or replace a table
    pub fn insert_table(&mut self, table: TableDef) {
        let key = fold(&table.name);
        self.dropped.shift_remove(&key);
        self.tables.insert(key, table);
    }

    pub fn remove_table(&mut self, name: &str) -> Option<TableDef> {
        let key = fold(name);
        let removed = self.tables.shift_remove(&key);
        self.dropped.insert(key);
        removed
    }

    /// Remove every table, as `DROP DATABASE` does
    pub fn drop_all_tables(&mut self) {
        self.dropped.extend(self.tables.drain(..).map(|(key, _)| key));
    }

    /// Whether a missing table is an inconsistency rather than a gap in
    /// knowledge
    pub fn is_known_absent(&self, name: &str) -> bool {
        !self.table_exists(name) && (self.authoritative || self.dropped.contains(&fold(name)))
    }

    /// Rename a table, keeping its position. Returns false if `old` is absent.
    pub fn rename_table(&mut self, old: &str, new: &str) -> bool {
        let Some(index) = self.tables.get_index_of(&fold(old)) else {
            return false;
        };
        let Some((_, mut table)) = self.tables.shift_remove_index(index) else {
            return false;
        };
        table.name = new.to_string();
        self.dropped.shift_remove(&fold(new));
        self.dropped.insert(fold(old));
        self.tables.shift_insert(index, fold(new), table);
        true
    }

    /// Get all table names in creation order
    pub fn table_names(&self) -> Vec<&str> {
        self.tables.values().map(|t| t.name.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Whether `name` refers to the database this catalog models
    pub fn is_current_database(&self, name: &str) -> bool {
        match &self.database {
            Some(current) => fold(current) == fold(name),
            None => true,
        }
    }
}

/// Table definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableDef {
    pub name: String,
    /// Folded column name -> column, in ordinal order
    #[serde(default)]
    pub columns: IndexMap<String, ColumnDef>,
    /// Folded index name -> index
    #[serde(default)]
    pub indexes: IndexMap<String, IndexDef>,
    #[serde(default)]
    pub foreign_keys: Vec<ForeignKeyDef>,
    /// Storage options such as ENGINE, upper-cased keys
    #[serde(default)]
    pub options: IndexMap<String, String>,
    /// The full column set is known
    #[serde(default = "complete_by_default")]
    pub complete: bool,
}

fn complete_by_default() -> bool {
    true
}

impl TableDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: IndexMap::new(),
            indexes: IndexMap::new(),
            foreign_keys: Vec::new(),
            options: IndexMap::new(),
            complete: true,
        }
    }

    /// A table known to exist whose columns have never been seen
    pub fn placeholder(name: impl Into<String>) -> Self {
        Self {
            complete: false,
            ..Self::new(name)
        }
    }

    fn reindexed(mut self) -> Self {
        let columns = std::mem::take(&mut self.columns);
        let indexes = std::mem::take(&mut self.indexes);
        for column in columns.into_values() {
            self.push_column(column);
        }
        for index in indexes.into_values() {
            self.indexes.insert(fold(&index.name), index);
        }
        self
    }

    /// Get a column by name
    pub fn get_column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.get(&fold(name))
    }

    pub fn get_column_mut(&mut self, name: &str) -> Option<&mut ColumnDef> {
        self.columns.get_mut(&fold(name))
    }

    /// Check if a column exists
    pub fn column_exists(&self, name: &str) -> bool {
        self.columns.contains_key(&fold(name))
    }

    /// Get all column names in ordinal order
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.values().map(|c| c.name.as_str()).collect()
    }

    /// Append a column, assigning the next ordinal position
    pub fn push_column(&mut self, mut column: ColumnDef) {
        column.position = self.columns.len() + 1;
        self.columns.insert(fold(&column.name), column);
    }

    /// Replace a column definition in place, keeping its position.
    /// A column stored under `old` is renamed to the definition's name.
    pub fn replace_column(&mut self, old: &str, mut column: ColumnDef) -> bool {
        let Some(index) = self.columns.get_index_of(&fold(old)) else {
            return false;
        };
        column.position = index + 1;
        let new_name = column.name.clone();
        let new_key = fold(&new_name);
        if new_key != fold(old) {
            self.columns.shift_remove_index(index);
            self.columns.shift_insert(index, new_key, column);
            self.rename_in_indexes(old, &new_name);
        } else if let Some((_, slot)) = self.columns.get_index_mut(index) {
            *slot = column;
        }
        true
    }

    /// Remove a column, dropping it from every index
    pub fn remove_column(&mut self, name: &str) -> Option<ColumnDef> {
        let removed = self.columns.shift_remove(&fold(name))?;
        for (position, column) in self.columns.values_mut().enumerate() {
            column.position = position + 1;
        }
        let key = fold(name);
        for index in self.indexes.values_mut() {
            index.columns.retain(|c| fold(c) != key);
        }
        self.indexes.retain(|_, index| !index.columns.is_empty());
        self.foreign_keys
            .retain(|fk| !fk.columns.iter().any(|c| fold(c) == key));
        Some(removed)
    }

    fn rename_in_indexes(&mut self, old: &str, new: &str) {
        let key = fold(old);
        for index in self.indexes.values_mut() {
            for column in index.columns.iter_mut() {
                if fold(column) == key {
                    *column = new.to_string();
                }
            }
        }
        for fk in self.foreign_keys.iter_mut() {
            for column in fk.columns.iter_mut() {
                if fold(column) == key {
                    *column = new.to_string();
                }
            }
        }
    }

    pub fn primary_key(&self) -> Option<&IndexDef> {
        self.indexes.values().find(|i| i.kind == IndexKind::Primary)
    }

    pub fn has_primary_key(&self) -> bool {
        self.primary_key().is_some()
    }

    pub fn get_index(&self, name: &str) -> Option<&IndexDef> {
        self.indexes.get(&fold(name))
    }

    pub fn add_index(&mut self, index: IndexDef) {
        if index.kind == IndexKind::Primary {
            for column in &index.columns {
                if let Some(col) = self.get_column_mut(column) {
                    col.is_primary_key = true;
                    col.nullable = false;
                }
            }
        }
        self.indexes.insert(fold(&index.name), index);
    }

    pub fn remove_index(&mut self, name: &str) -> Option<IndexDef> {
        let removed = self.indexes.shift_remove(&fold(name))?;
        if removed.kind == IndexKind::Primary {
            for column in &removed.columns {
                if let Some(col) = self.get_column_mut(column) {
                    col.is_primary_key = false;
                }
            }
        }
        Some(removed)
    }

    /// Name MySQL would generate for an unnamed index on `columns`
    pub fn generate_index_name(&self, columns: &[String]) -> String {
        let base = columns.first().cloned().unwrap_or_else(|| "idx".to_string());
        if !self.indexes.contains_key(&fold(&base)) {
            return base;
        }
        let mut suffix = 2;
        loop {
            let candidate = format!("{}_{}", base, suffix);
            if !self.indexes.contains_key(&fold(&candidate)) {
                return candidate;
            }
            suffix += 1;
        }
    }
}

/// Column definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDef {
    pub name: String,
    /// Rendered SQL type, e.g. `VARCHAR(20)`
    pub data_type: String,
    #[serde(default = "nullable_by_default")]
    pub nullable: bool,
    #[serde(default)]
    pub has_default: bool,
    #[serde(default)]
    pub is_primary_key: bool,
    #[serde(default)]
    pub auto_increment: bool,
    /// 1-based ordinal position
    #[serde(default)]
    pub position: usize,
}

fn nullable_by_default() -> bool {
    true
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            nullable: true,
            has_default: false,
            is_primary_key: false,
            auto_increment: false,
            position: 0,
        }
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn with_default(mut self) -> Self {
        self.has_default = true;
        self
    }

    pub fn primary_key(mut self) -> Self {
        self.is_primary_key = true;
        self.nullable = false;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexKind {
    Primary,
    Unique,
    Plain,
}

/// Index definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDef {
    pub name: String,
    pub columns: Vec<String>,
    pub kind: IndexKind,
}

/// Foreign key constraint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKeyDef {
    pub name: Option<String>,
    pub columns: Vec<String>,
    pub references_table: String,
    pub references_columns: Vec<String>,
}
