//! Error types shared by every sqlchain crate.
//!
//! A create operation surfaces exactly one of these to the caller: whatever the
//! first failing step stored in the scope's error slot, or the transaction
//! resolution failure when the chain itself succeeded.

use std::error::Error as StdError;
use std::fmt;

/// Result type alias for sqlchain operations.
pub type Result<T> = std::result::Result<T, Error>;

type BoxedSource = Box<dyn StdError + Send + Sync + 'static>;

/// The primary error type for the create pipeline.
#[derive(Debug)]
pub enum Error {
    /// A lifecycle hook on the entity returned an error.
    Hook(HookError),
    /// The driver rejected or failed to run a statement.
    Query(QueryError),
    /// A result could not be read back (missing row, missing id, bad column).
    Scan(String),
    /// The generated primary key cannot be written back into the entity.
    UnaddressablePrimaryKey {
        /// Table of the entity being created.
        table: String,
        /// Primary-key column that could not be assigned.
        column: String,
    },
    /// Saving a related entity failed.
    Cascade {
        /// Relationship field name on the parent entity.
        relationship: String,
        /// Error raised by the related entity's own create chain.
        source: Box<Error>,
    },
    /// BEGIN, COMMIT or ROLLBACK failed.
    Transaction(TransactionError),
    /// A value could not be assigned to an entity field.
    Field(FieldError),
    /// Invalid engine configuration.
    Config(String),
    /// Anything else.
    Custom(String),
}

impl Error {
    /// Build a [`Error::Custom`] from any message.
    pub fn custom(message: impl Into<String>) -> Self {
        Error::Custom(message.into())
    }

    /// Build a [`Error::Hook`] for the named hook.
    pub fn hook(hook: &'static str, message: impl Into<String>) -> Self {
        Error::Hook(HookError {
            hook,
            message: message.into(),
        })
    }

    /// Build a [`Error::Field`] for the named column.
    pub fn field(column: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Field(FieldError {
            column: column.into(),
            message: message.into(),
        })
    }

    /// Wrap an error raised while saving a related entity.
    pub fn cascade(relationship: impl Into<String>, source: Error) -> Self {
        Error::Cascade {
            relationship: relationship.into(),
            source: Box::new(source),
        }
    }

    /// Whether this error came from a related entity's create chain.
    pub fn is_cascade(&self) -> bool {
        matches!(self, Error::Cascade { .. })
    }

    /// The innermost error, following cascade wrappers.
    pub fn root(&self) -> &Error {
        match self {
            Error::Cascade { source, .. } => source.root(),
            other => other,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Hook(e) => write!(f, "{}", e),
            Error::Query(e) => write!(f, "{}", e),
            Error::Scan(msg) => write!(f, "scan error: {}", msg),
            Error::UnaddressablePrimaryKey { table, column } => write!(
                f,
                "using unaddressable value: cannot assign generated key {}.{}",
                table, column
            ),
            Error::Cascade {
                relationship,
                source,
            } => write!(f, "saving association {}: {}", relationship, source),
            Error::Transaction(e) => write!(f, "{}", e),
            Error::Field(e) => write!(f, "{}", e),
            Error::Config(msg) => write!(f, "configuration error: {}", msg),
            Error::Custom(msg) => write!(f, "{}", msg),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Error::Query(e) => e
                .source
                .as_ref()
                .map(|s| s.as_ref() as &(dyn StdError + 'static)),
            Error::Transaction(e) => e
                .source
                .as_ref()
                .map(|s| s.as_ref() as &(dyn StdError + 'static)),
            Error::Cascade { source, .. } => Some(&**source),
            _ => None,
        }
    }
}

/// Error returned by an entity lifecycle hook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookError {
    /// Hook that failed (`before_save`, `before_create`, ...).
    pub hook: &'static str,
    /// Message supplied by the entity.
    pub message: String,
}

impl fmt::Display for HookError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} hook failed: {}", self.hook, self.message)
    }
}

/// Classification of statement failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryErrorKind {
    /// Constraint violation (unique, foreign key, not null, check).
    Constraint,
    /// Malformed SQL.
    Syntax,
    /// Any other database-reported failure.
    Database,
    /// The driver timed out while executing.
    Timeout,
}

/// A statement failed inside the driver.
#[derive(Debug)]
pub struct QueryError {
    pub kind: QueryErrorKind,
    /// The statement that failed, when known.
    pub sql: Option<String>,
    pub message: String,
    pub source: Option<BoxedSource>,
}

impl QueryError {
    /// Create a query error without an underlying source.
    pub fn new(kind: QueryErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            sql: None,
            message: message.into(),
            source: None,
        }
    }

    /// Attach the failing statement.
    pub fn with_sql(mut self, sql: impl Into<String>) -> Self {
        self.sql = Some(sql.into());
        self
    }

    /// Attach the driver error.
    pub fn with_source(mut self, source: impl StdError + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.sql {
            Some(sql) => write!(f, "query error: {} (sql: {})", self.message, sql),
            None => write!(f, "query error: {}", self.message),
        }
    }
}

impl From<QueryError> for Error {
    fn from(err: QueryError) -> Self {
        Error::Query(err)
    }
}

/// Which part of the transaction lifecycle failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionErrorKind {
    Begin,
    Commit,
    Rollback,
}

impl TransactionErrorKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            TransactionErrorKind::Begin => "begin",
            TransactionErrorKind::Commit => "commit",
            TransactionErrorKind::Rollback => "rollback",
        }
    }
}

/// BEGIN, COMMIT or ROLLBACK failed.
#[derive(Debug)]
pub struct TransactionError {
    pub kind: TransactionErrorKind,
    pub message: String,
    pub source: Option<BoxedSource>,
}

impl TransactionError {
    pub fn new(kind: TransactionErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Wrap an error raised by the driver while resolving a transaction.
    pub fn from_error(kind: TransactionErrorKind, err: Error) -> Self {
        Self {
            kind,
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}

impl fmt::Display for TransactionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "transaction {} failed: {}", self.kind.as_str(), self.message)
    }
}

impl From<TransactionError> for Error {
    fn from(err: TransactionError) -> Self {
        Error::Transaction(err)
    }
}

/// A value could not be stored in an entity field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub column: String,
    pub message: String,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "field {}: {}", self.column, self.message)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Config(err.to_string())
    }
}
