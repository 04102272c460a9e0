//! SQL dialects.
//!
//! A dialect is a stateless provider of the SQL fragments that differ between
//! databases: identifier quoting, bind placeholders, the "insert a row of
//! defaults" clause, and how the generated primary key of an INSERT is handed
//! back to the caller.

use std::fmt;
use std::sync::Arc;

/// How a dialect reports the primary key generated by an INSERT.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertIdStrategy {
    /// Execute, then ask the driver for the last inserted id.
    LastInsertId,
    /// Append a clause after VALUES (`RETURNING "t"."id"`) and read the row.
    ReturningSuffix,
    /// Insert a clause between the column list and VALUES
    /// (`OUTPUT Inserted."id"`) and read the row.
    OutputInterstitial,
}

/// Per-database SQL fragments used by the create pipeline.
pub trait Dialect: Send + Sync + fmt::Debug {
    /// Name used for lookup and logging.
    fn name(&self) -> &'static str;

    /// Quote a single identifier.
    fn quote_ident(&self, ident: &str) -> String {
        quote_ident(ident)
    }

    /// Quote a possibly dotted name (`schema.table`), part by part.
    fn quote(&self, name: &str) -> String {
        name.split('.')
            .map(|part| self.quote_ident(part))
            .collect::<Vec<_>>()
            .join(".")
    }

    /// Placeholder for the 1-based bind parameter `index`.
    fn placeholder(&self, index: usize) -> String {
        let _ = index;
        "?".to_string()
    }

    /// Clause used when an INSERT has no columns at all.
    fn default_value_str(&self) -> &'static str {
        "DEFAULT VALUES"
    }

    fn insert_id_strategy(&self) -> InsertIdStrategy {
        InsertIdStrategy::LastInsertId
    }

    /// Clause appended after VALUES to return the generated key.
    ///
    /// `table` and `column` arrive quoted.
    fn last_insert_id_returning_suffix(&self, table: &str, column: &str) -> Option<String> {
        match self.insert_id_strategy() {
            InsertIdStrategy::ReturningSuffix => Some(format!("RETURNING {}.{}", table, column)),
            _ => None,
        }
    }

    /// Clause placed between the column list and VALUES to return the key.
    ///
    /// Returns `None` for a column-less insert, which cannot carry the clause.
    fn last_insert_id_output_interstitial(
        &self,
        table: &str,
        column: &str,
        columns: &[String],
    ) -> Option<String> {
        let _ = table;
        match self.insert_id_strategy() {
            InsertIdStrategy::OutputInterstitial if !columns.is_empty() => {
                Some(format!("OUTPUT Inserted.{}", column))
            }
            _ => None,
        }
    }

    /// Suffix for a `SELECT` without a table (`FROM DUAL` on MySQL).
    fn select_from_dummy_table(&self) -> &'static str {
        ""
    }
}

/// Quote an identifier with double quotes, doubling embedded quotes.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Quote an identifier with backticks, doubling embedded backticks.
pub fn quote_ident_mysql(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// SQLite.
///
/// By default the generated key comes from `last_insert_rowid()`. SQLite 3.35+
/// also understands `RETURNING`; [`Sqlite::with_returning`] switches to it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Sqlite {
    returning: bool,
}

impl Sqlite {
    pub const fn new() -> Self {
        Self { returning: false }
    }

    /// Read generated keys with a `RETURNING` clause instead of the rowid.
    pub const fn with_returning() -> Self {
        Self { returning: true }
    }
}

impl Dialect for Sqlite {
    fn name(&self) -> &'static str {
        "sqlite3"
    }

    fn insert_id_strategy(&self) -> InsertIdStrategy {
        if self.returning {
            InsertIdStrategy::ReturningSuffix
        } else {
            InsertIdStrategy::LastInsertId
        }
    }

    // SQLite's RETURNING does not accept table-qualified column names.
    fn last_insert_id_returning_suffix(&self, _table: &str, column: &str) -> Option<String> {
        self.returning.then(|| format!("RETURNING {}", column))
    }
}

/// PostgreSQL.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Postgres;

impl Dialect for Postgres {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn placeholder(&self, index: usize) -> String {
        format!("${}", index)
    }

    fn insert_id_strategy(&self) -> InsertIdStrategy {
        InsertIdStrategy::ReturningSuffix
    }
}

/// MySQL / MariaDB.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MySql;

impl Dialect for MySql {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn quote_ident(&self, ident: &str) -> String {
        quote_ident_mysql(ident)
    }

    fn default_value_str(&self) -> &'static str {
        "VALUES()"
    }

    fn select_from_dummy_table(&self) -> &'static str {
        "FROM DUAL"
    }
}

/// Microsoft SQL Server.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MsSql;

impl Dialect for MsSql {
    fn name(&self) -> &'static str {
        "mssql"
    }

    fn placeholder(&self, index: usize) -> String {
        format!("@p{}", index)
    }

    fn insert_id_strategy(&self) -> InsertIdStrategy {
        InsertIdStrategy::OutputInterstitial
    }
}

/// Look up a built-in dialect by name.
pub fn by_name(name: &str) -> Option<Arc<dyn Dialect>> {
    let dialect: Arc<dyn Dialect> = match name.to_ascii_lowercase().as_str() {
        "sqlite" | "sqlite3" => Arc::new(Sqlite::new()),
        "postgres" | "postgresql" => Arc::new(Postgres),
        "mysql" | "mariadb" => Arc::new(MySql),
        "mssql" | "sqlserver" => Arc::new(MsSql),
        _ => return None,
    };
    Some(dialect)
}
