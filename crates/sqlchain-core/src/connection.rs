//! Database connection contracts.
//!
//! Drivers implement [`Connection`] and [`Transaction`]. Both traits are object
//! safe: the pipeline holds them as `&dyn Connection` and
//! `Box<dyn Transaction>` so that one compiled chain serves every driver.

use crate::error::Result;
use crate::row::Row;
use crate::value::Value;

/// Result of executing a statement that returns no rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecResult {
    /// Rows inserted, updated or deleted.
    pub rows_affected: u64,
    /// Auto-generated id reported by the driver, when it tracks one.
    pub last_insert_id: Option<i64>,
}

impl ExecResult {
    pub const fn new(rows_affected: u64) -> Self {
        Self {
            rows_affected,
            last_insert_id: None,
        }
    }

    pub const fn with_last_insert_id(mut self, id: i64) -> Self {
        self.last_insert_id = Some(id);
        self
    }
}

/// A database connection.
pub trait Connection {
    /// Execute a statement and report affected rows.
    fn execute(&self, sql: &str, params: &[Value]) -> Result<ExecResult>;

    /// Run a query and return all rows.
    fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>>;

    /// Run a query and return the first row, if any.
    fn query_one(&self, sql: &str, params: &[Value]) -> Result<Option<Row>> {
        Ok(self.query(sql, params)?.into_iter().next())
    }

    /// Begin a transaction. The transaction borrows the connection until it
    /// is committed or rolled back.
    fn begin(&self) -> Result<Box<dyn Transaction + '_>>;
}

/// An open transaction.
///
/// Dropping a transaction without committing must roll it back.
pub trait Transaction {
    fn execute(&self, sql: &str, params: &[Value]) -> Result<ExecResult>;

    fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>>;

    fn query_one(&self, sql: &str, params: &[Value]) -> Result<Option<Row>> {
        Ok(self.query(sql, params)?.into_iter().next())
    }

    fn commit(self: Box<Self>) -> Result<()>;

    fn rollback(self: Box<Self>) -> Result<()>;
}
