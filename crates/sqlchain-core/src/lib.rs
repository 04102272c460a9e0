//! Core types and traits for sqlchain.
//!
//! `sqlchain-core` is the **contract layer** of the workspace. It defines the
//! data that flows through a create operation and the traits the pipeline
//! consumes from the outside world.
//!
//! # Role In The Architecture
//!
//! - **Entities**: `Entity` describes a row-shaped value through static
//!   `FieldInfo` metadata; `CreateHooks` is the optional lifecycle capability.
//! - **Collaborators**: `Connection`/`Transaction` are implemented by drivers,
//!   `Dialect` by each supported database, `FieldIntrospector` by whatever
//!   discovers entity shapes.
//! - **Data model**: `Value`, `Row`, `FieldMeta` and `RelationshipInfo` are
//!   shared by the callbacks crate, drivers and the facade.
//!
//! Most applications should use the `sqlchain` facade; reach for this crate
//! directly when writing drivers, dialects or custom introspectors.

pub mod connection;
pub mod dialect;
pub mod entity;
pub mod error;
pub mod field;
pub mod relationship;
pub mod row;
pub mod value;

pub use connection::{Connection, ExecResult, Transaction};
pub use dialect::{Dialect, InsertIdStrategy, MsSql, MySql, Postgres, Sqlite, quote_ident};
pub use entity::{
    CreateHooks, DefaultIntrospector, Entity, Executor, FieldIntrospector, HookContext,
    primary_field, type_mismatch,
};
pub use error::{
    Error, FieldError, HookError, QueryError, QueryErrorKind, Result, TransactionError,
    TransactionErrorKind,
};
pub use field::{FieldInfo, FieldMeta};
pub use relationship::{LinkTableInfo, RelationshipInfo, RelationshipKind};
pub use row::Row;
pub use value::Value;
