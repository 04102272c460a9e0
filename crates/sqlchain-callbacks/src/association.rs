//! Saving related entities around the INSERT.
//!
//! Belongs-to relations are saved first so the owner's foreign keys are known
//! when its INSERT is built. Has-one, has-many and many-to-many relations are
//! saved afterwards, once the owner's primary key exists. Every related save
//! runs the full create chain in a nested scope that shares the owner's
//! transaction.

use sqlchain_core::{
    Dialect, Entity, Error, Executor, FieldMeta, LinkTableInfo, RelationshipInfo,
    RelationshipKind, Result, Value, primary_field,
};

use crate::pipeline::Pipeline;
use crate::scope::{Handle, Scope, run_nested};

/// Save belongs-to relations and copy their keys into the owner.
pub fn save_before_associations(scope: &mut Scope<'_>) {
    if scope.has_error() || !scope.save_associations() {
        return;
    }
    let fields = association_fields(scope, |kind| kind.saved_before_owner());
    for field in &fields {
        let Some(rel) = field.relationship().copied() else {
            continue;
        };
        let references = match save_belongs_to(scope, field.name(), &rel) {
            Ok(references) => references,
            Err(err) => {
                scope.set_error(Error::cascade(field.name(), err));
                return;
            }
        };
        for (column, value) in references {
            if let Err(err) = scope.set_column(column, value) {
                scope.set_error(Error::cascade(field.name(), err));
                return;
            }
        }
    }
}

/// Save has-one, has-many and many-to-many relations.
pub fn save_after_associations(scope: &mut Scope<'_>) {
    if scope.has_error() || !scope.save_associations() {
        return;
    }
    let fields = association_fields(scope, |kind| !kind.saved_before_owner());
    for field in &fields {
        let Some(rel) = field.relationship().copied() else {
            continue;
        };
        if let Err(err) = save_dependents(scope, field.name(), &rel) {
            scope.set_error(Error::cascade(field.name(), err));
            return;
        }
    }
}

/// Relationship fields of the wanted kinds that hold something to save.
fn association_fields(scope: &Scope<'_>, wanted: impl Fn(RelationshipKind) -> bool) -> Vec<FieldMeta> {
    scope
        .fields()
        .iter()
        .filter(|f| f.relationship().is_some_and(|r| wanted(r.kind)))
        .filter(|f| scope.changeable_field(f) && !f.blank && !f.is_ignored())
        .cloned()
        .collect()
}

fn save_belongs_to(
    scope: &mut Scope<'_>,
    field: &str,
    rel: &RelationshipInfo,
) -> Result<Vec<(&'static str, Value)>> {
    let pipeline = scope.pipeline;
    let depth = scope.depth + 1;
    let mut references = Vec::new();
    for related in scope.entity.related_mut(field) {
        if rel.auto_create && is_new_record(pipeline, related) {
            run_nested(pipeline, &scope.handle, related, depth)?;
        }
        if !rel.save_reference {
            continue;
        }
        let related_fields = pipeline.introspector.introspect(related);
        for (idx, fk) in rel.foreign_keys.iter().enumerate() {
            let value = referenced_value(&related_fields, rel.association_foreign_keys, idx)
                .ok_or_else(|| {
                    Error::field(
                        *fk,
                        format!("{} has no column to reference", related.table_name()),
                    )
                })?;
            references.push((*fk, value));
        }
    }
    Ok(references)
}

fn save_dependents(scope: &mut Scope<'_>, field: &str, rel: &RelationshipInfo) -> Result<()> {
    let pipeline = scope.pipeline;
    let depth = scope.depth + 1;
    let owner_keys = rel
        .foreign_keys
        .iter()
        .enumerate()
        .map(|(idx, fk)| {
            referenced_value(scope.fields(), rel.association_foreign_keys, idx)
                .map(|value| (*fk, value))
                .ok_or_else(|| {
                    Error::field(*fk, format!("{} has no column to reference", scope.table_name()))
                })
        })
        .collect::<Result<Vec<_>>>()?;
    let owner_pk = scope.primary_field().map(|f| f.value.clone());

    for related in scope.entity.related_mut(field) {
        match rel.kind {
            RelationshipKind::HasOne | RelationshipKind::HasMany => {
                let is_new = is_new_record(pipeline, related);
                for (fk, value) in &owner_keys {
                    related.set_column(fk, value.clone())?;
                }
                if is_new {
                    if rel.auto_create {
                        run_nested(pipeline, &scope.handle, related, depth)?;
                    }
                } else if !owner_keys.is_empty() {
                    update_foreign_keys(pipeline, &scope.handle, related, &owner_keys)?;
                }
            }
            RelationshipKind::ManyToMany => {
                if rel.auto_create && is_new_record(pipeline, related) {
                    run_nested(pipeline, &scope.handle, related, depth)?;
                }
                let (Some(link), Some(owner)) = (rel.link_table, owner_pk.as_ref()) else {
                    continue;
                };
                if !rel.save_reference {
                    continue;
                }
                let related_fields = pipeline.introspector.introspect(related);
                let remote = primary_field(&related_fields)
                    .filter(|f| !f.blank)
                    .map(|f| f.value.clone())
                    .ok_or_else(|| {
                        Error::field(
                            link.remote_column,
                            format!("cannot link {} without a primary key", related.table_name()),
                        )
                    })?;
                insert_link_row(pipeline.dialect(), &scope.handle, &link, owner, &remote)?;
            }
            RelationshipKind::BelongsTo => {}
        }
    }
    Ok(())
}

/// Value of the `idx`-th referenced column, defaulting to the primary key.
fn referenced_value(fields: &[FieldMeta], columns: &[&str], idx: usize) -> Option<Value> {
    let field = match columns.get(idx) {
        Some(column) => fields.iter().find(|f| f.is_normal() && f.info.matches(column)),
        None => primary_field(fields),
    };
    field.map(|f| f.value.clone())
}

/// An entity with no primary key, or a blank one, has not been saved yet.
fn is_new_record(pipeline: &Pipeline, entity: &dyn Entity) -> bool {
    primary_field(&pipeline.introspector.introspect(entity)).is_none_or(|f| f.blank)
}

/// Point an already persisted dependent at its owner.
fn update_foreign_keys(
    pipeline: &Pipeline,
    handle: &Handle<'_>,
    related: &dyn Entity,
    keys: &[(&'static str, Value)],
) -> Result<()> {
    let fields = pipeline.introspector.introspect(related);
    let Some(pk) = primary_field(&fields) else {
        tracing::warn!(
            table = related.table_name(),
            "dependent has no primary key, foreign keys not persisted"
        );
        return Ok(());
    };
    let dialect = pipeline.dialect();
    let mut params = Vec::with_capacity(keys.len() + 1);
    let assignments = keys
        .iter()
        .map(|(column, value)| {
            params.push(value.clone());
            format!("{} = {}", dialect.quote(column), dialect.placeholder(params.len()))
        })
        .collect::<Vec<_>>()
        .join(", ");
    params.push(pk.value.clone());
    let sql = format!(
        "UPDATE {} SET {} WHERE {} = {}",
        dialect.quote(related.table_name()),
        assignments,
        dialect.quote(pk.column_name()),
        dialect.placeholder(params.len())
    );
    let result = handle.execute(&sql, &params)?;
    tracing::debug!(sql = %sql, rows_affected = result.rows_affected, "updated dependent keys");
    Ok(())
}

/// Insert a link row unless the pair is already linked.
fn insert_link_row(
    dialect: &dyn Dialect,
    handle: &Handle<'_>,
    link: &LinkTableInfo,
    owner: &Value,
    related: &Value,
) -> Result<()> {
    let table = dialect.quote(link.table_name);
    let local = dialect.quote(link.local_column);
    let remote = dialect.quote(link.remote_column);
    let dummy = dialect.select_from_dummy_table();
    let from = if dummy.is_empty() {
        String::new()
    } else {
        format!(" {}", dummy)
    };
    let sql = format!(
        "INSERT INTO {table} ({local},{remote}) SELECT {},{}{from} WHERE NOT EXISTS \
         (SELECT * FROM {table} WHERE {local} = {} AND {remote} = {})",
        dialect.placeholder(1),
        dialect.placeholder(2),
        dialect.placeholder(3),
        dialect.placeholder(4),
    );
    let params = [owner.clone(), related.clone(), owner.clone(), related.clone()];
    let result = handle.execute(&sql, &params)?;
    tracing::debug!(
        link = link.table_name,
        rows_affected = result.rows_affected,
        "saved link row"
    );
    Ok(())
}
