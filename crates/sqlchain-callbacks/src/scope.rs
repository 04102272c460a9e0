//! The per-operation context threaded through every step.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;

use sqlchain_core::{
    Connection, Dialect, Entity, Error, ExecResult, Executor, FieldMeta, Result, Row, Transaction,
    Value, primary_field,
};

use crate::options::CreateOptions;
use crate::pipeline::{CreateReport, Pipeline, Settings};

/// A typed key into the scope's instance store.
///
/// ```ignore
/// const SEEN: InstanceKey<u32> = InstanceKey::new("audit:seen");
/// scope.instance_set(SEEN, 1);
/// assert_eq!(scope.instance_get(SEEN), Some(&1));
/// ```
pub struct InstanceKey<T> {
    name: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<T> InstanceKey<T> {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _marker: PhantomData,
        }
    }

    pub const fn name(&self) -> &'static str {
        self.name
    }
}

impl<T> Clone for InstanceKey<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for InstanceKey<T> {}

impl<T> fmt::Debug for InstanceKey<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("InstanceKey").field(&self.name).finish()
    }
}

/// Unquoted columns the INSERT left to their database default.
pub const BLANK_COLUMNS_WITH_DEFAULT: InstanceKey<Vec<String>> =
    InstanceKey::new("sqlchain:blank_columns_with_default");

/// Where a scope's statements go.
pub(crate) enum Handle<'a> {
    /// No transaction yet.
    Idle(&'a dyn Connection),
    /// A transaction this scope began and must resolve.
    Owned {
        conn: &'a dyn Connection,
        tx: Box<dyn Transaction + 'a>,
    },
    /// The transaction of an enclosing scope.
    Joined(&'a dyn Transaction),
}

impl Handle<'_> {
    /// A handle for a nested scope: same connection, same transaction.
    pub(crate) fn join(&self) -> Handle<'_> {
        match self {
            Handle::Idle(conn) => Handle::Idle(*conn),
            Handle::Owned { tx, .. } => Handle::Joined(&**tx),
            Handle::Joined(tx) => Handle::Joined(*tx),
        }
    }

    pub(crate) fn is_owned(&self) -> bool {
        matches!(self, Handle::Owned { .. })
    }

    pub(crate) fn in_transaction(&self) -> bool {
        !matches!(self, Handle::Idle(_))
    }

    fn query_one(&self, sql: &str, params: &[Value]) -> Result<Option<Row>> {
        match self {
            Handle::Idle(conn) => conn.query_one(sql, params),
            Handle::Owned { tx, .. } => tx.query_one(sql, params),
            Handle::Joined(tx) => tx.query_one(sql, params),
        }
    }
}

impl Executor for Handle<'_> {
    fn execute(&self, sql: &str, params: &[Value]) -> Result<ExecResult> {
        match self {
            Handle::Idle(conn) => conn.execute(sql, params),
            Handle::Owned { tx, .. } => tx.execute(sql, params),
            Handle::Joined(tx) => tx.execute(sql, params),
        }
    }

    fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        match self {
            Handle::Idle(conn) => conn.query(sql, params),
            Handle::Owned { tx, .. } => tx.query(sql, params),
            Handle::Joined(tx) => tx.query(sql, params),
        }
    }
}

/// State of one create operation.
///
/// Steps read and write the scope and nothing else. The error slot holds the
/// first failure; once it is set, steps with visible effects do nothing.
pub struct Scope<'a> {
    pub(crate) pipeline: &'a Pipeline,
    pub(crate) entity: &'a mut dyn Entity,
    pub(crate) handle: Handle<'a>,
    pub(crate) depth: usize,
    pub(crate) now: i64,
    options: CreateOptions,
    table_name: String,
    fields: Vec<FieldMeta>,
    sql: String,
    vars: Vec<Value>,
    error: Option<Error>,
    rows_affected: Option<u64>,
    instance: HashMap<&'static str, Box<dyn Any + Send>>,
}

impl<'a> Scope<'a> {
    pub(crate) fn new(
        pipeline: &'a Pipeline,
        entity: &'a mut dyn Entity,
        handle: Handle<'a>,
        options: CreateOptions,
        depth: usize,
    ) -> Self {
        let fields = pipeline.introspector.introspect(&*entity);
        let table_name = entity.table_name().to_string();
        Self {
            pipeline,
            entity,
            handle,
            depth,
            now: pipeline.clock.now(),
            options,
            table_name,
            fields,
            sql: String::new(),
            vars: Vec::new(),
            error: None,
            rows_affected: None,
            instance: HashMap::new(),
        }
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn quoted_table_name(&self) -> String {
        self.dialect().quote(&self.table_name)
    }

    /// Quote a column or dotted name with the dialect.
    pub fn quote(&self, name: &str) -> String {
        self.dialect().quote(name)
    }

    pub fn dialect(&self) -> &'a dyn Dialect {
        &*self.pipeline.dialect
    }

    pub fn settings(&self) -> &'a Settings {
        &self.pipeline.settings
    }

    pub fn options(&self) -> &CreateOptions {
        &self.options
    }

    /// The operation timestamp, microseconds since the Unix epoch.
    pub fn now(&self) -> i64 {
        self.now
    }

    /// Nesting level: 0 for the caller's entity, 1+ for cascaded saves.
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn in_transaction(&self) -> bool {
        self.handle.in_transaction()
    }

    /// Whether related entities are saved along with this one.
    pub fn save_associations(&self) -> bool {
        self.options
            .save_associations
            .unwrap_or(self.pipeline.settings.save_associations)
    }

    pub fn entity(&self) -> &dyn Entity {
        &*self.entity
    }

    pub fn entity_mut(&mut self) -> &mut (dyn Entity + 'a) {
        &mut *self.entity
    }

    // ---- fields ----

    pub fn fields(&self) -> &[FieldMeta] {
        &self.fields
    }

    pub fn fields_mut(&mut self) -> &mut [FieldMeta] {
        &mut self.fields
    }

    /// Field by Rust name or column name.
    pub fn field_by_name(&self, name: &str) -> Option<&FieldMeta> {
        self.fields.iter().find(|f| f.info.matches(name))
    }

    pub fn primary_field(&self) -> Option<&FieldMeta> {
        primary_field(&self.fields)
    }

    /// Take the field snapshot again from the entity.
    pub fn refresh_fields(&mut self) {
        self.fields = self.pipeline.introspector.introspect(&*self.entity);
    }

    /// Write a value into the entity and the snapshot.
    pub fn set_column(&mut self, column: &str, value: Value) -> Result<()> {
        let Some(idx) = self
            .fields
            .iter()
            .position(|f| f.is_normal() && f.info.matches(column))
        else {
            return Err(Error::field(
                column,
                format!("no such column on {}", self.table_name),
            ));
        };
        let column_name = self.fields[idx].column_name();
        self.entity.set_column(column_name, value.clone())?;
        self.fields[idx].set_value(value);
        Ok(())
    }

    /// Whether `field` may be written, given the select/omit options.
    pub fn changeable_field(&self, field: &FieldMeta) -> bool {
        if !self.options.select.is_empty() {
            return self.options.select.iter().any(|s| field.info.matches(s));
        }
        !self.options.omit.iter().any(|o| field.info.matches(o))
    }

    // ---- error slot ----

    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }

    pub fn error(&self) -> Option<&Error> {
        self.error.as_ref()
    }

    /// Record a failure. The first error wins; later ones are logged.
    pub fn set_error(&mut self, err: Error) {
        match &self.error {
            None => {
                tracing::debug!(table = %self.table_name, error = %err, "scope error set");
                self.error = Some(err);
            }
            Some(first) => {
                tracing::warn!(
                    table = %self.table_name,
                    error = %err,
                    first = %first,
                    "scope already failed, dropping error"
                );
            }
        }
    }

    // ---- statement ----

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn vars(&self) -> &[Value] {
        &self.vars
    }

    /// Replace the statement text.
    pub fn raw(&mut self, sql: impl Into<String>) {
        self.sql = sql.into();
    }

    /// Bind a value and return its placeholder.
    pub fn add_to_vars(&mut self, value: Value) -> String {
        self.vars.push(value);
        self.dialect().placeholder(self.vars.len())
    }

    pub fn rows_affected(&self) -> Option<u64> {
        self.rows_affected
    }

    pub fn set_rows_affected(&mut self, rows: u64) {
        self.rows_affected = Some(rows);
    }

    // ---- instance store ----

    pub fn instance_set<T: Any + Send>(&mut self, key: InstanceKey<T>, value: T) {
        self.instance.insert(key.name, Box::new(value));
    }

    pub fn instance_get<T: Any + Send>(&self, key: InstanceKey<T>) -> Option<&T> {
        self.instance.get(key.name)?.downcast_ref()
    }

    pub fn instance_get_mut<T: Any + Send>(&mut self, key: InstanceKey<T>) -> Option<&mut T> {
        self.instance.get_mut(key.name)?.downcast_mut()
    }

    pub fn instance_remove<T: Any + Send>(&mut self, key: InstanceKey<T>) -> Option<T> {
        let boxed = self.instance.remove(key.name)?;
        boxed.downcast::<T>().ok().map(|b| *b)
    }

    // ---- execution ----

    /// Execute through the scope's transaction, or the bare connection.
    pub fn execute(&self, sql: &str, params: &[Value]) -> Result<ExecResult> {
        self.handle.execute(sql, params)
    }

    pub fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        self.handle.query(sql, params)
    }

    pub fn query_one(&self, sql: &str, params: &[Value]) -> Result<Option<Row>> {
        self.handle.query_one(sql, params)
    }

    /// Run the create chain over another entity, inside this scope's
    /// transaction.
    pub fn create_child(&self, entity: &mut dyn Entity) -> Result<()> {
        run_nested(self.pipeline, &self.handle, entity, self.depth + 1)
    }

    pub(crate) fn into_report(self) -> Result<CreateReport> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(CreateReport {
                rows_affected: self.rows_affected.unwrap_or(0),
                sql: self.sql,
                vars: self.vars,
            }),
        }
    }
}

impl fmt::Debug for Scope<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("table", &self.table_name)
            .field("depth", &self.depth)
            .field("sql", &self.sql)
            .field("vars", &self.vars)
            .field("error", &self.error)
            .field("rows_affected", &self.rows_affected)
            .finish_non_exhaustive()
    }
}

/// Run the pipeline's chain over a related entity in a nested scope.
pub(crate) fn run_nested(
    pipeline: &Pipeline,
    parent: &Handle<'_>,
    entity: &mut dyn Entity,
    depth: usize,
) -> Result<()> {
    let mut child = Scope::new(pipeline, entity, parent.join(), CreateOptions::default(), depth);
    tracing::debug!(table = child.table_name(), depth, "creating related entity");
    pipeline.chain.run(&mut child);
    child.into_report().map(|_| ())
}
