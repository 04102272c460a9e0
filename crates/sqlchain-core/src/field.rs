//! Field and column definitions.

use crate::relationship::{RelationshipInfo, RelationshipKind};
use crate::value::Value;

/// Static metadata about an entity field.
///
/// A field is either a plain column (`relationship` is `None`) or a
/// relationship field that holds related entities and has no column of its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldInfo {
    /// Rust field name
    pub name: &'static str,
    /// Database column name (may differ from field name)
    pub column_name: &'static str,
    /// Whether this is a primary key
    pub primary_key: bool,
    /// Whether this field has a unique constraint
    pub unique: bool,
    /// Whether the database assigns a default when the column is omitted
    pub has_default: bool,
    /// Default value expression (SQL), informational
    pub default: Option<&'static str>,
    /// Excluded from every statement (`#[sqlchain(skip)]`-style fields)
    pub ignored: bool,
    /// Relationship metadata for association fields
    pub relationship: Option<RelationshipInfo>,
}

impl FieldInfo {
    /// Create a plain column field.
    pub const fn new(name: &'static str, column_name: &'static str) -> Self {
        Self {
            name,
            column_name,
            primary_key: false,
            unique: false,
            has_default: false,
            default: None,
            ignored: false,
            relationship: None,
        }
    }

    /// Create a relationship field.
    pub const fn relation(name: &'static str, relationship: RelationshipInfo) -> Self {
        let mut info = Self::new(name, "");
        info.relationship = Some(relationship);
        info
    }

    /// Set the database column name.
    pub const fn column(mut self, name: &'static str) -> Self {
        self.column_name = name;
        self
    }

    /// Set primary key flag.
    pub const fn primary_key(mut self, value: bool) -> Self {
        self.primary_key = value;
        self
    }

    /// Set unique flag.
    pub const fn unique(mut self, value: bool) -> Self {
        self.unique = value;
        self
    }

    /// Declare a database-side default. Implies `has_default`.
    pub const fn default(mut self, expr: &'static str) -> Self {
        self.default = Some(expr);
        self.has_default = true;
        self
    }

    /// Set the has-default flag without naming the expression.
    pub const fn has_default(mut self, value: bool) -> Self {
        self.has_default = value;
        self
    }

    /// Set ignored flag.
    pub const fn ignored(mut self, value: bool) -> Self {
        self.ignored = value;
        self
    }

    /// A plain, stored column (not a relationship).
    pub const fn is_normal(&self) -> bool {
        self.relationship.is_none()
    }

    /// Whether `input` names this field, by Rust name or column name.
    pub fn matches(&self, input: &str) -> bool {
        self.name == input || (!self.column_name.is_empty() && self.column_name == input)
    }
}

/// A field as observed on one entity instance at the start of an operation.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldMeta {
    pub info: FieldInfo,
    /// Current value. Always `Null` for relationship fields.
    pub value: Value,
    /// Zero-value flag; for relationship fields, "no related entity attached".
    pub blank: bool,
}

impl FieldMeta {
    /// Snapshot a column field from its current value.
    pub fn column(info: FieldInfo, value: Value) -> Self {
        let blank = value.is_blank();
        Self { info, value, blank }
    }

    /// Snapshot a relationship field.
    pub fn relation(info: FieldInfo, attached: bool) -> Self {
        Self {
            info,
            value: Value::Null,
            blank: !attached,
        }
    }

    pub fn name(&self) -> &'static str {
        self.info.name
    }

    pub fn column_name(&self) -> &'static str {
        self.info.column_name
    }

    pub fn is_primary_key(&self) -> bool {
        self.info.primary_key
    }

    pub fn is_normal(&self) -> bool {
        self.info.is_normal()
    }

    pub fn is_ignored(&self) -> bool {
        self.info.ignored
    }

    pub fn has_default(&self) -> bool {
        self.info.has_default
    }

    pub fn relationship(&self) -> Option<&RelationshipInfo> {
        self.info.relationship.as_ref()
    }

    /// Relationship of the given kind, if this field is one.
    pub fn relationship_of(&self, kind: RelationshipKind) -> Option<&RelationshipInfo> {
        self.relationship().filter(|r| r.kind == kind)
    }

    /// Replace the value and recompute the blank flag.
    pub fn set_value(&mut self, value: Value) {
        self.blank = value.is_blank();
        self.value = value;
    }
}
