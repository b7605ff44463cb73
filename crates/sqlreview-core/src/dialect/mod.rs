//! Database engine support

use serde::{Deserialize, Serialize};
use sqlparser::dialect::{
    Dialect, GenericDialect, MsSqlDialect, MySqlDialect, PostgreSqlDialect, SQLiteDialect,
    SnowflakeDialect,
};
use std::str::FromStr;

use crate::error::AdvisorError;

/// Database engines the advisor can review scripts for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Engine {
    MySQL,
    TiDB,
    MariaDB,
    OceanBase,
    PostgreSQL,
    Oracle,
    MSSQL,
    Snowflake,
    SQLite,
}

/// Grammar family an engine's scripts are parsed with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    MySql,
    Postgres,
    MsSql,
    Snowflake,
    Sqlite,
    Generic,
}

impl Engine {
    pub const ALL: [Engine; 9] = [
        Engine::MySQL,
        Engine::TiDB,
        Engine::MariaDB,
        Engine::OceanBase,
        Engine::PostgreSQL,
        Engine::Oracle,
        Engine::MSSQL,
        Engine::Snowflake,
        Engine::SQLite,
    ];

    /// Engines that speak the MySQL grammar
    pub const MYSQL_FAMILY: [Engine; 4] = [
        Engine::MySQL,
        Engine::TiDB,
        Engine::MariaDB,
        Engine::OceanBase,
    ];

    pub fn family(&self) -> Family {
        match self {
            Engine::MySQL | Engine::TiDB | Engine::MariaDB | Engine::OceanBase => Family::MySql,
            Engine::PostgreSQL => Family::Postgres,
            Engine::MSSQL => Family::MsSql,
            Engine::Snowflake => Family::Snowflake,
            Engine::SQLite => Family::Sqlite,
            // No dedicated grammar; the generic dialect covers the DDL/DML we review
            Engine::Oracle => Family::Generic,
        }
    }

    /// Get the sqlparser dialect for parsing
    pub fn parser_dialect(&self) -> Box<dyn Dialect + Send + Sync> {
        match self.family() {
            Family::MySql => Box::new(MySqlDialect {}),
            Family::Postgres => Box::new(PostgreSqlDialect {}),
            Family::MsSql => Box::new(MsSqlDialect {}),
            Family::Snowflake => Box::new(SnowflakeDialect {}),
            Family::Sqlite => Box::new(SQLiteDialect {}),
            Family::Generic => Box::new(GenericDialect {}),
        }
    }

    pub fn is_mysql_family(&self) -> bool {
        self.family() == Family::MySql
    }

    pub fn name(&self) -> &'static str {
        match self {
            Engine::MySQL => "mysql",
            Engine::TiDB => "tidb",
            Engine::MariaDB => "mariadb",
            Engine::OceanBase => "oceanbase",
            Engine::PostgreSQL => "postgresql",
            Engine::Oracle => "oracle",
            Engine::MSSQL => "mssql",
            Engine::Snowflake => "snowflake",
            Engine::SQLite => "sqlite",
        }
    }
}

impl FromStr for Engine {
    type Err = AdvisorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mysql" | "mysql8" => Ok(Engine::MySQL),
            "tidb" => Ok(Engine::TiDB),
            "mariadb" => Ok(Engine::MariaDB),
            "oceanbase" => Ok(Engine::OceanBase),
            "postgresql" | "postgres" | "pg" => Ok(Engine::PostgreSQL),
            "oracle" => Ok(Engine::Oracle),
            "mssql" | "sqlserver" => Ok(Engine::MSSQL),
            "snowflake" => Ok(Engine::Snowflake),
            "sqlite" => Ok(Engine::SQLite),
            _ => Err(AdvisorError::UnsupportedEngine(s.to_string())),
        }
    }
}

impl std::fmt::Display for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_from_str() {
        assert_eq!("MySQL".parse::<Engine>().unwrap(), Engine::MySQL);
        assert_eq!("pg".parse::<Engine>().unwrap(), Engine::PostgreSQL);
        assert_eq!("tidb".parse::<Engine>().unwrap(), Engine::TiDB);
    }

    #[test]
    fn test_unsupported_engine() {
        let err = "mongodb".parse::<Engine>().unwrap_err();
        assert_eq!(err, AdvisorError::UnsupportedEngine("mongodb".to_string()));
    }

    #[test]
    fn test_engine_round_trips_through_name() {
        for engine in Engine::ALL {
            assert_eq!(engine.name().parse::<Engine>().unwrap(), engine);
        }
    }
}
