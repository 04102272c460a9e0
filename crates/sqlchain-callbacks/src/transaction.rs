//! Transaction boundaries of a create.
//!
//! The outermost scope begins a transaction and resolves it at the end of the
//! chain. Nested scopes (cascaded saves) run inside it and never begin or
//! commit on their own.

use std::mem;

use sqlchain_core::{TransactionError, TransactionErrorKind};

use crate::scope::{Handle, Scope};

/// Begin a transaction on the scope's connection.
pub fn begin_transaction(scope: &mut Scope<'_>) {
    if scope.has_error() || scope.depth > 0 {
        return;
    }
    let Handle::Idle(conn) = &scope.handle else {
        return;
    };
    let conn = *conn;
    match conn.begin() {
        Ok(tx) => {
            tracing::debug!(table = scope.table_name(), "transaction started");
            scope.handle = Handle::Owned { conn, tx };
        }
        Err(err) => {
            scope.set_error(TransactionError::from_error(TransactionErrorKind::Begin, err).into());
        }
    }
}

/// Commit when the chain succeeded, roll back otherwise.
///
/// Runs whether or not the scope has an error.
pub fn commit_or_rollback_transaction(scope: &mut Scope<'_>) {
    resolve(scope);
}

pub(crate) fn resolve(scope: &mut Scope<'_>) {
    let Handle::Owned { conn, .. } = &scope.handle else {
        return;
    };
    let conn = *conn;
    let Handle::Owned { tx, .. } = mem::replace(&mut scope.handle, Handle::Idle(conn)) else {
        return;
    };

    if let Some(err) = scope.error() {
        tracing::debug!(table = scope.table_name(), error = %err, "rolling back");
        if let Err(rollback_err) = tx.rollback() {
            tracing::warn!(
                table = scope.table_name(),
                error = %rollback_err,
                "rollback failed"
            );
        }
        return;
    }

    match tx.commit() {
        Ok(()) => tracing::debug!(table = scope.table_name(), "transaction committed"),
        Err(err) => {
            scope.set_error(TransactionError::from_error(TransactionErrorKind::Commit, err).into());
        }
    }
}
