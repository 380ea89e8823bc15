use sea_orm::Condition;

use super::{role, user};
use crate::core::{ApiResource, RelationKind, RelationSpec};
use crate::filtering::like_condition;

pub struct UserResource;

fn role_relation() -> RelationSpec {
    RelationSpec {
        name: "role",
        kind: RelationKind::BelongsTo,
        table: "roles",
        local_key: "role_id",
        foreign_key: "id",
        hidden: &[],
        nested: RoleResource::relation,
    }
}

fn tokens_relation() -> RelationSpec {
    RelationSpec {
        name: "tokens",
        kind: RelationKind::HasMany,
        table: "access_tokens",
        local_key: "id",
        foreign_key: "user_id",
        hidden: &["token"],
        nested: RelationSpec::leaf,
    }
}

fn users_relation() -> RelationSpec {
    RelationSpec {
        name: "users",
        kind: RelationKind::HasMany,
        table: "users",
        local_key: "id",
        foreign_key: "role_id",
        hidden: UserResource::HIDDEN_FIELDS,
        nested: UserResource::relation,
    }
}

impl ApiResource for UserResource {
    type Entity = user::Entity;

    const RESOURCE_NAME_SINGULAR: &'static str = "user";
    const RESOURCE_NAME_PLURAL: &'static str = "users";
    const HIDDEN_FIELDS: &'static [&'static str] = &["password"];

    /// Users match on name or email
    fn search_condition(term: &str) -> Option<Condition> {
        Some(
            Condition::any()
                .add(like_condition::<user::Entity>("name", term))
                .add(like_condition::<user::Entity>("email", term)),
        )
    }

    fn relation(name: &str) -> Option<RelationSpec> {
        match name {
            "role" => Some(role_relation()),
            "tokens" => Some(tokens_relation()),
            _ => None,
        }
    }
}

pub struct RoleResource;

impl ApiResource for RoleResource {
    type Entity = role::Entity;

    const RESOURCE_NAME_SINGULAR: &'static str = "role";
    const RESOURCE_NAME_PLURAL: &'static str = "roles";

    fn relation(name: &str) -> Option<RelationSpec> {
        match name {
            "users" => Some(users_relation()),
            _ => None,
        }
    }
}
