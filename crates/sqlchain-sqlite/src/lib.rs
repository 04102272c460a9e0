//! SQLite driver for sqlchain, backed by `rusqlite`.
//!
//! ```no_run
//! use sqlchain_core::{Connection, Value};
//! use sqlchain_sqlite::SqliteConnection;
//!
//! let conn = SqliteConnection::open_in_memory()?;
//! conn.execute_batch("CREATE TABLE heroes (id INTEGER PRIMARY KEY, name TEXT)")?;
//! conn.execute("INSERT INTO heroes (name) VALUES (?)", &[Value::Text("Deadpond".into())])?;
//! # Ok::<(), sqlchain_core::Error>(())
//! ```

pub mod connection;
pub mod value;

pub use connection::{SqliteConnection, SqliteTransaction};
pub use value::{from_sqlite, to_sqlite};
