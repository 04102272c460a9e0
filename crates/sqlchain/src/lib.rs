//! sqlchain: an extensible callback pipeline for creating rows.
//!
//! A create runs an ordered chain of named steps over one per-operation
//! scope: begin a transaction, call the entity's before hooks, save
//! belongs-to relations, stamp timestamps, INSERT and read back the primary
//! key, reload database defaults, save dependent relations, call the after
//! hooks, then commit or roll back.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use sqlchain::prelude::*;
//! use sqlchain_sqlite::SqliteConnection;
//!
//! let conn = SqliteConnection::open_in_memory()?;
//! let engine = Engine::new(Sqlite::new());
//!
//! let mut hero = Hero { id: 0, name: "Deadpond".into(), created_at: 0 };
//! let report = engine.create(&conn, &mut hero)?;
//! assert!(hero.id > 0);
//! assert_eq!(report.rows_affected, 1);
//! ```
//!
//! # Extending The Chain
//!
//! Steps are registered by name and placed relative to each other:
//!
//! ```rust,ignore
//! engine.callbacks_mut().register_before(
//!     ChainKind::Create,
//!     names::CREATE,
//!     "validate_name",
//!     |scope| {
//!         if scope.field_by_name("name").is_some_and(|f| f.blank) {
//!             scope.set_error(Error::custom("name is required"));
//!         }
//!     },
//! );
//! ```
//!
//! # Crates
//!
//! - `sqlchain-core`: values, errors, entity and driver contracts, dialects.
//! - `sqlchain-callbacks`: registries, the scope and the default steps.
//! - `sqlchain-sqlite`: a rusqlite-backed driver.

pub mod config;
pub mod engine;

pub use config::EngineConfig;
pub use engine::{Engine, EngineBuilder};

pub use sqlchain_callbacks::{
    BLANK_COLUMNS_WITH_DEFAULT, CallbackRegistry, Callbacks, Chain, ChainKind, Clock,
    CreateOptions, CreateReport, Hook, InstanceKey, Pipeline, Placement, Scope, Settings, names,
};
pub use sqlchain_core::{
    Connection, CreateHooks, DefaultIntrospector, Dialect, Entity, Error, ExecResult, FieldError,
    FieldInfo, FieldIntrospector, FieldMeta, HookContext, HookError, InsertIdStrategy,
    LinkTableInfo, MsSql, MySql, Postgres, QueryError, QueryErrorKind, RelationshipInfo,
    RelationshipKind, Result, Row, Sqlite, Transaction, TransactionError, TransactionErrorKind,
    Value,
};

/// Everything needed to define entities and run creates.
pub mod prelude {
    pub use crate::{
        CallbackRegistry, Callbacks, ChainKind, Clock, Connection, CreateHooks, CreateOptions,
        CreateReport, Dialect, Engine, EngineBuilder, EngineConfig, Entity, Error, FieldInfo,
        HookContext, LinkTableInfo, MsSql, MySql, Placement, Postgres, RelationshipInfo,
        RelationshipKind, Result, Scope, Sqlite, Value, names,
    };
}
