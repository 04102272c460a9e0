//! Relationship metadata.
//!
//! Relationships are declared as static metadata next to an entity's columns.
//! The create pipeline reads them to decide which related entities to save
//! before the parent row (so their keys can be copied into it) and which to
//! save afterwards (so they can receive the parent's key).

/// The kind of relationship between two entities.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RelationshipKind {
    /// Many `Hero`s belong to one `Team`; the foreign key lives on `Hero`.
    #[default]
    BelongsTo,
    /// A `Hero` has one `Profile`; the foreign key lives on `Profile`.
    HasOne,
    /// A `Team` has many `Hero`s; the foreign key lives on `Hero`.
    HasMany,
    /// `Hero`s have many `Power`s via a link table.
    ManyToMany,
}

impl RelationshipKind {
    /// Whether related rows must exist before the owning row is inserted.
    pub const fn saved_before_owner(&self) -> bool {
        matches!(self, RelationshipKind::BelongsTo)
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            RelationshipKind::BelongsTo => "belongs_to",
            RelationshipKind::HasOne => "has_one",
            RelationshipKind::HasMany => "has_many",
            RelationshipKind::ManyToMany => "many_to_many",
        }
    }
}

/// A link/join table for many-to-many relationships.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkTableInfo {
    /// The link table name (e.g., `"hero_powers"`).
    pub table_name: &'static str,

    /// Column in link table pointing to the local entity (e.g., `"hero_id"`).
    pub local_column: &'static str,

    /// Column in link table pointing to the remote entity (e.g., `"power_id"`).
    pub remote_column: &'static str,
}

impl LinkTableInfo {
    #[must_use]
    pub const fn new(
        table_name: &'static str,
        local_column: &'static str,
        remote_column: &'static str,
    ) -> Self {
        Self {
            table_name,
            local_column,
            remote_column,
        }
    }
}

/// Metadata about a relationship field.
///
/// `foreign_keys` and `association_foreign_keys` pair up by position:
///
/// - `BelongsTo`: `foreign_keys` are columns on the owner (`team_id`),
///   `association_foreign_keys` are columns on the related entity (`id`).
/// - `HasOne` / `HasMany`: `foreign_keys` are columns on the related entity
///   (`team_id`), `association_foreign_keys` are columns on the owner (`id`).
///
/// An empty `association_foreign_keys` list means "the primary key of the
/// side that is referenced".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelationshipInfo {
    /// The related entity's table name.
    pub related_table: &'static str,

    /// Kind of relationship.
    pub kind: RelationshipKind,

    /// Foreign-key columns, in order.
    pub foreign_keys: &'static [&'static str],

    /// Referenced columns, in the same order as `foreign_keys`.
    pub association_foreign_keys: &'static [&'static str],

    /// Link table for ManyToMany relationships.
    pub link_table: Option<LinkTableInfo>,

    /// Create related entities that have no primary key yet.
    pub auto_create: bool,

    /// Copy keys across the relationship (owner foreign keys for `BelongsTo`,
    /// link rows for `ManyToMany`).
    pub save_reference: bool,
}

impl RelationshipInfo {
    #[must_use]
    pub const fn new(related_table: &'static str, kind: RelationshipKind) -> Self {
        Self {
            related_table,
            kind,
            foreign_keys: &[],
            association_foreign_keys: &[],
            link_table: None,
            auto_create: true,
            save_reference: true,
        }
    }

    #[must_use]
    pub const fn belongs_to(related_table: &'static str) -> Self {
        Self::new(related_table, RelationshipKind::BelongsTo)
    }

    #[must_use]
    pub const fn has_one(related_table: &'static str) -> Self {
        Self::new(related_table, RelationshipKind::HasOne)
    }

    #[must_use]
    pub const fn has_many(related_table: &'static str) -> Self {
        Self::new(related_table, RelationshipKind::HasMany)
    }

    #[must_use]
    pub const fn many_to_many(related_table: &'static str, link: LinkTableInfo) -> Self {
        let mut info = Self::new(related_table, RelationshipKind::ManyToMany);
        info.link_table = Some(link);
        info
    }

    /// Set the foreign-key columns.
    #[must_use]
    pub const fn foreign_keys(mut self, keys: &'static [&'static str]) -> Self {
        self.foreign_keys = keys;
        self
    }

    /// Set the referenced columns.
    #[must_use]
    pub const fn association_foreign_keys(mut self, keys: &'static [&'static str]) -> Self {
        self.association_foreign_keys = keys;
        self
    }

    #[must_use]
    pub const fn auto_create(mut self, value: bool) -> Self {
        self.auto_create = value;
        self
    }

    #[must_use]
    pub const fn save_reference(mut self, value: bool) -> Self {
        self.save_reference = value;
        self
    }
}

impl Default for RelationshipInfo {
    fn default() -> Self {
        Self::new("", RelationshipKind::default())
    }
}
