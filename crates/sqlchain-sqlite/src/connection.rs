//! `Connection` and `Transaction` over a rusqlite connection.

use std::path::Path;
use std::sync::Arc;

use rusqlite::ErrorCode;
use rusqlite::params_from_iter;
use sqlchain_core::{
    Connection, Error, ExecResult, QueryError, QueryErrorKind, Result, Row, Transaction,
    TransactionError, TransactionErrorKind, Value,
};

use crate::value::{from_sqlite, to_sqlite};

/// A single SQLite connection.
///
/// Transactions are plain `BEGIN`/`COMMIT`/`ROLLBACK` statements on the same
/// connection; only one can be open at a time.
#[derive(Debug)]
pub struct SqliteConnection {
    conn: rusqlite::Connection,
}

impl SqliteConnection {
    /// Open (or create) a database file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = rusqlite::Connection::open(path).map_err(|e| connection_error(&e))?;
        Ok(Self { conn })
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        let conn = rusqlite::Connection::open_in_memory().map_err(|e| connection_error(&e))?;
        Ok(Self { conn })
    }

    /// Wrap an already configured rusqlite connection.
    pub fn from_rusqlite(conn: rusqlite::Connection) -> Self {
        Self { conn }
    }

    /// Run several `;`-separated statements without parameters (DDL, PRAGMAs).
    pub fn execute_batch(&self, sql: &str) -> Result<()> {
        self.conn
            .execute_batch(sql)
            .map_err(|e| query_error(e, sql))
    }

    pub fn inner(&self) -> &rusqlite::Connection {
        &self.conn
    }

    fn bind(params: &[Value]) -> Result<Vec<rusqlite::types::Value>> {
        params.iter().map(to_sqlite).collect()
    }
}

impl Connection for SqliteConnection {
    fn execute(&self, sql: &str, params: &[Value]) -> Result<ExecResult> {
        tracing::trace!(sql, params = params.len(), "sqlite execute");
        let bound = Self::bind(params)?;
        let changed = self
            .conn
            .execute(sql, params_from_iter(bound.iter()))
            .map_err(|e| query_error(e, sql))?;
        let rows = u64::try_from(changed).unwrap_or(u64::MAX);
        // last_insert_rowid() keeps the previous insert's id when nothing was written.
        if rows == 0 {
            return Ok(ExecResult::new(0));
        }
        Ok(ExecResult::new(rows).with_last_insert_id(self.conn.last_insert_rowid()))
    }

    fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        tracing::trace!(sql, params = params.len(), "sqlite query");
        let bound = Self::bind(params)?;
        let mut stmt = self.conn.prepare(sql).map_err(|e| query_error(e, sql))?;
        let columns: Arc<[String]> = stmt
            .column_names()
            .into_iter()
            .map(str::to_string)
            .collect::<Vec<_>>()
            .into();
        let width = columns.len();
        let mut rows = stmt
            .query(params_from_iter(bound.iter()))
            .map_err(|e| query_error(e, sql))?;
        let mut out = Vec::new();
        while let Some(row) = rows.next().map_err(|e| query_error(e, sql))? {
            let mut values = Vec::with_capacity(width);
            for idx in 0..width {
                let value = row.get_ref(idx).map_err(|e| query_error(e, sql))?;
                values.push(from_sqlite(value));
            }
            out.push(Row::new(Arc::clone(&columns), values));
        }
        Ok(out)
    }

    fn begin(&self) -> Result<Box<dyn Transaction + '_>> {
        self.conn.execute_batch("BEGIN").map_err(|e| {
            Error::from(TransactionError::from_error(
                TransactionErrorKind::Begin,
                query_error(e, "BEGIN"),
            ))
        })?;
        tracing::trace!("sqlite transaction started");
        Ok(Box::new(SqliteTransaction {
            conn: self,
            finished: false,
        }))
    }
}

/// An open `BEGIN ... COMMIT` block. Dropped unresolved, it rolls back.
#[derive(Debug)]
pub struct SqliteTransaction<'c> {
    conn: &'c SqliteConnection,
    finished: bool,
}

impl SqliteTransaction<'_> {
    fn finish(&mut self, statement: &str, kind: TransactionErrorKind) -> Result<()> {
        self.finished = true;
        self.conn.conn.execute_batch(statement).map_err(|e| {
            TransactionError::from_error(kind, query_error(e, statement)).into()
        })
    }
}

impl Transaction for SqliteTransaction<'_> {
    fn execute(&self, sql: &str, params: &[Value]) -> Result<ExecResult> {
        self.conn.execute(sql, params)
    }

    fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        self.conn.query(sql, params)
    }

    fn commit(mut self: Box<Self>) -> Result<()> {
        self.finish("COMMIT", TransactionErrorKind::Commit)
    }

    fn rollback(mut self: Box<Self>) -> Result<()> {
        self.finish("ROLLBACK", TransactionErrorKind::Rollback)
    }
}

impl Drop for SqliteTransaction<'_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        if let Err(err) = self.conn.conn.execute_batch("ROLLBACK") {
            tracing::warn!(error = %err, "rollback of abandoned transaction failed");
        }
    }
}

fn connection_error(err: &rusqlite::Error) -> Error {
    Error::custom(format!("cannot open sqlite database: {}", err))
}

fn query_error(err: rusqlite::Error, sql: &str) -> Error {
    let kind = match &err {
        rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation => {
            QueryErrorKind::Constraint
        }
        rusqlite::Error::SqliteFailure(e, _)
            if matches!(e.code, ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked) =>
        {
            QueryErrorKind::Timeout
        }
        other if other.to_string().contains("syntax error") => QueryErrorKind::Syntax,
        _ => QueryErrorKind::Database,
    };
    let message = err.to_string();
    QueryError::new(kind, message)
        .with_sql(sql)
        .with_source(err)
        .into()
}
