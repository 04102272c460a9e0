//! The default create chain.
//!
//! ```text
//! begin_transaction
//! before_create              before_save, before_create hooks
//! save_before_associations   belongs-to
//! update_time_stamp
//! create                     INSERT + primary key
//! force_reload_after_create  columns left to database defaults
//! save_after_associations    has-one, has-many, many-to-many
//! after_create               after_create, after_save hooks
//! commit_or_rollback_transaction
//! ```

use std::time::Instant;

use sqlchain_core::{Error, FieldMeta, RelationshipKind, Value};

use crate::association::{save_after_associations, save_before_associations};
use crate::hooks::{Hook, dispatch};
use crate::registry::CallbackRegistry;
use crate::scope::{BLANK_COLUMNS_WITH_DEFAULT, Scope};
use crate::transaction::{begin_transaction, commit_or_rollback_transaction};

/// Step names of the default create chain, usable as anchors.
pub mod names {
    pub const BEGIN_TRANSACTION: &str = "begin_transaction";
    pub const BEFORE_CREATE: &str = "before_create";
    pub const SAVE_BEFORE_ASSOCIATIONS: &str = "save_before_associations";
    pub const UPDATE_TIME_STAMP: &str = "update_time_stamp";
    pub const CREATE: &str = "create";
    pub const FORCE_RELOAD_AFTER_CREATE: &str = "force_reload_after_create";
    pub const SAVE_AFTER_ASSOCIATIONS: &str = "save_after_associations";
    pub const AFTER_CREATE: &str = "after_create";
    pub const COMMIT_OR_ROLLBACK_TRANSACTION: &str = "commit_or_rollback_transaction";
}

/// Install the default create steps in order.
pub fn register_defaults(registry: &mut CallbackRegistry) {
    registry.register(names::BEGIN_TRANSACTION, begin_transaction);
    registry.register(names::BEFORE_CREATE, before_create);
    registry.register(names::SAVE_BEFORE_ASSOCIATIONS, save_before_associations);
    registry.register(names::UPDATE_TIME_STAMP, update_time_stamp);
    registry.register(names::CREATE, create);
    registry.register(names::FORCE_RELOAD_AFTER_CREATE, force_reload_after_create);
    registry.register(names::SAVE_AFTER_ASSOCIATIONS, save_after_associations);
    registry.register(names::AFTER_CREATE, after_create);
    registry.register(
        names::COMMIT_OR_ROLLBACK_TRANSACTION,
        commit_or_rollback_transaction,
    );
}

/// Run `before_save` and `before_create`, then re-read the entity so values
/// the hooks assigned reach the INSERT.
pub fn before_create(scope: &mut Scope<'_>) {
    dispatch(scope, Hook::BeforeSave);
    dispatch(scope, Hook::BeforeCreate);
    if !scope.has_error() {
        scope.refresh_fields();
    }
}

/// Stamp blank creation/update timestamp fields with the operation time.
pub fn update_time_stamp(scope: &mut Scope<'_>) {
    if scope.has_error() {
        return;
    }
    let now = Value::Timestamp(scope.now());
    let settings = scope.settings();
    for name in [&settings.created_at_field, &settings.updated_at_field] {
        let column = scope
            .field_by_name(name)
            .filter(|f| f.is_normal() && f.blank)
            .map(FieldMeta::column_name);
        if let Some(column) = column {
            if let Err(err) = scope.set_column(column, now.clone()) {
                scope.set_error(err);
                return;
            }
        }
    }
}

/// Build and run the INSERT, then assign the generated primary key.
pub fn create(scope: &mut Scope<'_>) {
    if scope.has_error() {
        return;
    }

    let fields = scope.fields().to_vec();
    let mut columns = Vec::new();
    let mut placeholders = Vec::new();
    let mut blank_columns_with_default = Vec::new();

    for field in &fields {
        if !scope.changeable_field(field) {
            continue;
        }
        if field.is_normal() && !field.is_ignored() {
            if field.blank && field.has_default() {
                blank_columns_with_default.push(field.column_name().to_string());
            } else if !field.is_primary_key() || !field.blank {
                columns.push(scope.quote(field.column_name()));
                placeholders.push(scope.add_to_vars(field.value.clone()));
            }
        } else if let Some(rel) = field.relationship_of(RelationshipKind::BelongsTo) {
            for fk in rel.foreign_keys {
                let Some(foreign) = fields.iter().find(|f| f.is_normal() && f.info.matches(fk))
                else {
                    continue;
                };
                // Only when the key column was not already written on its own.
                if !scope.changeable_field(foreign) {
                    columns.push(scope.quote(foreign.column_name()));
                    placeholders.push(scope.add_to_vars(foreign.value.clone()));
                }
            }
        }
    }

    if !blank_columns_with_default.is_empty() {
        scope.instance_set(BLANK_COLUMNS_WITH_DEFAULT, blank_columns_with_default);
    }

    let dialect = scope.dialect();
    let table = scope.quoted_table_name();
    let primary = scope.primary_field().cloned();
    let returning_column = primary
        .as_ref()
        .map_or_else(|| "*".to_string(), |pk| scope.quote(pk.column_name()));
    let suffix = dialect.last_insert_id_returning_suffix(&table, &returning_column);
    let interstitial =
        dialect.last_insert_id_output_interstitial(&table, &returning_column, &columns);

    let modifier = scope.options().modifier_clause();
    let option = scope.options().option_clause().map(str::to_string);
    let sql = if columns.is_empty() {
        format!(
            "INSERT{} INTO {} {}{}{}",
            clause(modifier.as_deref()),
            table,
            dialect.default_value_str(),
            clause(option.as_deref()),
            clause(suffix.as_deref()),
        )
    } else {
        format!(
            "INSERT{} INTO {} ({}){} VALUES ({}){}{}",
            clause(modifier.as_deref()),
            table,
            columns.join(","),
            clause(interstitial.as_deref()),
            placeholders.join(","),
            clause(option.as_deref()),
            clause(suffix.as_deref()),
        )
    };
    scope.raw(sql);

    let start = Instant::now();
    match primary {
        None => insert_without_key(scope),
        Some(pk) if suffix.is_none() && interstitial.is_none() => {
            insert_with_last_insert_id(scope, &pk);
        }
        Some(pk) => insert_returning_key(scope, &pk),
    }
    tracing::debug!(
        table = scope.table_name(),
        sql = scope.sql(),
        vars = scope.vars().len(),
        rows_affected = ?scope.rows_affected(),
        elapsed_us = u64::try_from(start.elapsed().as_micros()).unwrap_or(u64::MAX),
        "executed insert"
    );
}

fn clause(part: Option<&str>) -> String {
    part.map_or_else(String::new, |p| format!(" {}", p))
}

fn insert_without_key(scope: &mut Scope<'_>) {
    match scope.execute(scope.sql(), scope.vars()) {
        Ok(result) => scope.set_rows_affected(result.rows_affected),
        Err(err) => scope.set_error(err),
    }
}

fn insert_with_last_insert_id(scope: &mut Scope<'_>, pk: &FieldMeta) {
    let result = match scope.execute(scope.sql(), scope.vars()) {
        Ok(result) => result,
        Err(err) => {
            scope.set_error(err);
            return;
        }
    };
    scope.set_rows_affected(result.rows_affected);
    // An ignored or conflicting insert wrote no row, so there is no key to read.
    if !pk.blank || result.rows_affected == 0 {
        return;
    }
    match result.last_insert_id {
        Some(id) => {
            if let Err(err) = scope.set_column(pk.column_name(), Value::BigInt(id)) {
                scope.set_error(err);
            }
        }
        None => scope.set_error(Error::Scan(format!(
            "driver reported no last insert id for {}",
            scope.table_name()
        ))),
    }
}

fn insert_returning_key(scope: &mut Scope<'_>, pk: &FieldMeta) {
    if !scope.entity().can_set(pk.column_name()) {
        scope.set_error(Error::UnaddressablePrimaryKey {
            table: scope.table_name().to_string(),
            column: pk.column_name().to_string(),
        });
        return;
    }
    let row = match scope.query_one(scope.sql(), scope.vars()) {
        Ok(Some(row)) => row,
        Ok(None) => {
            scope.set_error(Error::Scan(format!(
                "insert into {} returned no row",
                scope.table_name()
            )));
            return;
        }
        Err(err) => {
            scope.set_error(err);
            return;
        }
    };
    let Some(key) = row.get(0).cloned() else {
        scope.set_error(Error::Scan(format!(
            "insert into {} returned an empty row",
            scope.table_name()
        )));
        return;
    };
    scope.set_rows_affected(1);
    if pk.blank {
        if let Err(err) = scope.set_column(pk.column_name(), key) {
            scope.set_error(err);
        }
    }
}

/// Read back the columns the INSERT left to their database defaults.
pub fn force_reload_after_create(scope: &mut Scope<'_>) {
    if scope.has_error() {
        return;
    }
    let Some(columns) = scope
        .instance_get(BLANK_COLUMNS_WITH_DEFAULT)
        .filter(|c| !c.is_empty())
        .cloned()
    else {
        return;
    };

    let mut keys: Vec<&FieldMeta> = scope
        .fields()
        .iter()
        .filter(|f| f.is_normal() && f.is_primary_key() && !f.blank)
        .collect();
    if keys.is_empty() {
        keys = scope
            .fields()
            .iter()
            .filter(|f| f.is_normal() && f.info.unique && !f.blank)
            .collect();
    }
    if keys.is_empty() {
        tracing::warn!(
            table = scope.table_name(),
            columns = ?columns,
            "no identifying field to reload defaults by, skipping"
        );
        return;
    }

    let dialect = scope.dialect();
    let mut conditions = Vec::with_capacity(keys.len());
    let mut params = Vec::with_capacity(keys.len());
    for (idx, key) in keys.iter().enumerate() {
        conditions.push(format!(
            "{} = {}",
            scope.quote(key.column_name()),
            dialect.placeholder(idx + 1)
        ));
        params.push(key.value.clone());
    }
    let select = columns
        .iter()
        .map(|c| scope.quote(c))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!(
        "SELECT {} FROM {} WHERE {}",
        select,
        scope.quoted_table_name(),
        conditions.join(" AND ")
    );

    let row = match scope.query_one(&sql, &params) {
        Ok(Some(row)) => row,
        Ok(None) => {
            scope.set_error(Error::Scan(format!(
                "reloading {} found no row",
                scope.table_name()
            )));
            return;
        }
        Err(err) => {
            scope.set_error(err);
            return;
        }
    };
    tracing::debug!(table = scope.table_name(), sql = %sql, "reloaded default columns");
    for (column, value) in columns.iter().zip(row.iter().map(|(_, v)| v)) {
        if let Err(err) = scope.set_column(column, value.clone()) {
            scope.set_error(err);
            return;
        }
    }
}

/// Run `after_create` and `after_save`.
pub fn after_create(scope: &mut Scope<'_>) {
    dispatch(scope, Hook::AfterCreate);
    dispatch(scope, Hook::AfterSave);
}
