use sea_orm::{Condition, EntityTrait, Select};

use crate::filtering::like_condition;

/// How a related table joins to the resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationKind {
    /// Many related rows point back at the record; attached as an array
    HasMany,
    /// The record points at one related row; attached as an object or `null`
    BelongsTo,
}

/// A relation a resource exposes to `with`.
///
/// `local_key` is the column on the record being expanded and `foreign_key` the
/// column of `table` it matches: for a has-many relation that is the related
/// table's reference back to the record, for a belongs-to relation the related
/// table's own key.
#[derive(Debug, Clone, Copy)]
pub struct RelationSpec {
    pub name: &'static str,
    pub kind: RelationKind,
    pub table: &'static str,
    pub local_key: &'static str,
    pub foreign_key: &'static str,
    /// Columns of `table` never serialized
    pub hidden: &'static [&'static str],
    /// Relations reachable from the related rows
    pub nested: fn(&str) -> Option<RelationSpec>,
}

impl RelationSpec {
    /// No further relations below this one
    #[must_use]
    pub fn leaf(_name: &str) -> Option<RelationSpec> {
        None
    }
}

/// A resource served by the generic list/show/destroy operations.
pub trait ApiResource: Send + Sync + 'static {
    type Entity: EntityTrait<Model: Sync + 'static>;

    const RESOURCE_NAME_SINGULAR: &'static str;
    const RESOURCE_NAME_PLURAL: &'static str;
    /// Columns never serialized (e.g. `password`)
    const HIDDEN_FIELDS: &'static [&'static str] = &[];

    /// Starting query for listings
    fn base_query() -> Select<Self::Entity> {
        Self::Entity::find()
    }

    /// Condition for a non-empty `search` term. Defaults to a case-insensitive
    /// match on `name`.
    fn search_condition(term: &str) -> Option<Condition> {
        Some(Condition::all().add(like_condition::<Self::Entity>("name", term)))
    }

    /// Relation reachable through `with`, by name
    fn relation(_name: &str) -> Option<RelationSpec> {
        None
    }
}
