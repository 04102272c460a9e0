//! Entities, lifecycle hooks and field introspection.
//!
//! The pipeline never reflects on Rust types. An [`Entity`] describes its own
//! columns through static [`FieldInfo`] metadata and exposes values by column
//! name; a [`FieldIntrospector`] turns that into the per-operation field
//! snapshot. Lifecycle hooks are an optional capability: an entity that wants
//! them returns itself from [`Entity::hooks`].

use std::fmt;

use crate::connection::ExecResult;
use crate::dialect::Dialect;
use crate::error::{Error, Result};
use crate::field::{FieldInfo, FieldMeta};
use crate::row::Row;
use crate::value::Value;

/// A value that can be created through the pipeline.
///
/// # Example
///
/// ```
/// use sqlchain_core::{Entity, Error, FieldInfo, Result, Value};
///
/// struct Hero {
///     id: i64,
///     name: String,
/// }
///
/// impl Entity for Hero {
///     fn table_name(&self) -> &str {
///         "heroes"
///     }
///
///     fn field_infos(&self) -> &'static [FieldInfo] {
///         static FIELDS: &[FieldInfo] = &[
///             FieldInfo::new("id", "id").primary_key(true),
///             FieldInfo::new("name", "name"),
///         ];
///         FIELDS
///     }
///
///     fn column_value(&self, column: &str) -> Value {
///         match column {
///             "id" => Value::BigInt(self.id),
///             "name" => Value::Text(self.name.clone()),
///             _ => Value::Null,
///         }
///     }
///
///     fn set_column(&mut self, column: &str, value: Value) -> Result<()> {
///         match column {
///             "id" => self.id = value.as_i64().ok_or_else(|| Error::field("id", "expected integer"))?,
///             "name" => self.name = value.as_str().unwrap_or_default().to_string(),
///             _ => {}
///         }
///         Ok(())
///     }
/// }
/// ```
pub trait Entity {
    /// Unquoted table name.
    fn table_name(&self) -> &str;

    /// Field metadata in declaration order.
    fn field_infos(&self) -> &'static [FieldInfo];

    /// Current value of a column. Unknown columns yield `Null`.
    fn column_value(&self, column: &str) -> Value;

    /// Whether a relationship field currently holds any related entity.
    fn has_related(&self, field: &str) -> bool {
        let _ = field;
        false
    }

    /// Store a value into a column field.
    fn set_column(&mut self, column: &str, value: Value) -> Result<()>;

    /// Whether a generated value can be written back into `column` in place.
    fn can_set(&self, column: &str) -> bool {
        let _ = column;
        true
    }

    /// Related entities held by a relationship field.
    fn related_mut(&mut self, field: &str) -> Vec<&mut dyn Entity> {
        let _ = field;
        Vec::new()
    }

    /// The entity's lifecycle hooks, when it has any.
    fn hooks(&mut self) -> Option<&mut dyn CreateHooks> {
        None
    }
}

/// Statement access handed to lifecycle hooks.
///
/// Statements run inside the operation's transaction.
pub trait Executor {
    fn execute(&self, sql: &str, params: &[Value]) -> Result<ExecResult>;

    fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>>;
}

/// What a hook can see of the running operation.
pub struct HookContext<'a> {
    executor: &'a dyn Executor,
    dialect: &'a dyn Dialect,
    now: i64,
}

impl<'a> HookContext<'a> {
    pub fn new(executor: &'a dyn Executor, dialect: &'a dyn Dialect, now: i64) -> Self {
        Self {
            executor,
            dialect,
            now,
        }
    }

    /// Execute a statement in the operation's transaction.
    pub fn execute(&self, sql: &str, params: &[Value]) -> Result<ExecResult> {
        self.executor.execute(sql, params)
    }

    /// Run a query in the operation's transaction.
    pub fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        self.executor.query(sql, params)
    }

    pub fn dialect(&self) -> &dyn Dialect {
        self.dialect
    }

    /// The operation's timestamp, microseconds since the Unix epoch.
    pub fn now(&self) -> i64 {
        self.now
    }
}

impl fmt::Debug for HookContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookContext")
            .field("dialect", &self.dialect.name())
            .field("now", &self.now)
            .finish_non_exhaustive()
    }
}

/// Lifecycle hooks invoked around a create.
///
/// Every method defaults to a no-op, so implementors override only what they
/// need. Returning an error aborts the operation and rolls back its
/// transaction.
pub trait CreateHooks {
    fn before_save(&mut self, cx: &HookContext<'_>) -> Result<()> {
        let _ = cx;
        Ok(())
    }

    fn before_create(&mut self, cx: &HookContext<'_>) -> Result<()> {
        let _ = cx;
        Ok(())
    }

    fn after_create(&mut self, cx: &HookContext<'_>) -> Result<()> {
        let _ = cx;
        Ok(())
    }

    fn after_save(&mut self, cx: &HookContext<'_>) -> Result<()> {
        let _ = cx;
        Ok(())
    }
}

/// Produces the field snapshot of an entity.
pub trait FieldIntrospector: Send + Sync + fmt::Debug {
    fn introspect(&self, entity: &dyn Entity) -> Vec<FieldMeta>;
}

/// Snapshot built from [`Entity::field_infos`] and the entity's current values.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultIntrospector;

impl FieldIntrospector for DefaultIntrospector {
    fn introspect(&self, entity: &dyn Entity) -> Vec<FieldMeta> {
        entity
            .field_infos()
            .iter()
            .map(|info| {
                if info.is_normal() {
                    FieldMeta::column(*info, entity.column_value(info.column_name))
                } else {
                    FieldMeta::relation(*info, entity.has_related(info.name))
                }
            })
            .collect()
    }
}

/// The field the generated key is written to.
///
/// With a composite key the column named `id` wins, otherwise the first key
/// column.
pub fn primary_field(fields: &[FieldMeta]) -> Option<&FieldMeta> {
    let mut keys = fields.iter().filter(|f| f.is_primary_key());
    let first = keys.next()?;
    if first.column_name() == "id" {
        return Some(first);
    }
    Some(keys.find(|f| f.column_name() == "id").unwrap_or(first))
}

/// Build a [`Error::Field`] for a value of the wrong type.
pub fn type_mismatch(column: &str, expected: &str, got: &Value) -> Error {
    Error::field(
        column,
        format!("expected {}, got {}", expected, got.type_name()),
    )
}
