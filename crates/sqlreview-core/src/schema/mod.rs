//! Schema management module

mod catalog;
mod simulator;

pub use catalog::{
    fold, Catalog, ColumnDef, ForeignKeyDef, IndexDef, IndexKind, TableDef,
};
pub use simulator::{apply, CATALOG_TITLE};
