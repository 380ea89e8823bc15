use sea_orm::{
    EntityTrait, QueryOrder, Select,
    sea_query::{Order, SimpleExpr},
};
use serde::{Deserialize, Serialize};

use super::conditions::{FieldRef, is_valid_field_name};

/// Shared direction applied to every order field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    /// `desc` only on an exact, case-sensitive match
    #[must_use]
    pub fn from_param(value: Option<&str>) -> Self {
        match value {
            Some("desc") => Self::Desc,
            _ => Self::Asc,
        }
    }
}

impl From<SortDirection> for Order {
    fn from(direction: SortDirection) -> Self {
        match direction {
            SortDirection::Asc => Order::Asc,
            SortDirection::Desc => Order::Desc,
        }
    }
}

/// Apply each order field in sequence with the same direction.
///
/// Fields may name entity columns or one of the `computed` aliases the query
/// selects (such as `tokens_count`); anything else is skipped.
pub fn apply_order<E: EntityTrait>(
    mut query: Select<E>,
    fields: &[String],
    direction: SortDirection,
    computed: &[String],
) -> Select<E> {
    for field in fields {
        if !is_valid_field_name(field) {
            tracing::debug!(field = %field, "Skipping invalid order field");
            continue;
        }
        let Some(field_ref) = FieldRef::<E>::resolve_with(field, computed) else {
            tracing::debug!(field = %field, "Skipping unknown order field");
            continue;
        };
        let expr: SimpleExpr = field_ref.expr().into();
        query = query.order_by(expr, direction.into());
    }
    query
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_is_case_sensitive() {
        assert_eq!(SortDirection::from_param(Some("desc")), SortDirection::Desc);
        assert_eq!(SortDirection::from_param(Some("DESC")), SortDirection::Asc);
        assert_eq!(SortDirection::from_param(Some("asc")), SortDirection::Asc);
        assert_eq!(SortDirection::from_param(None), SortDirection::Asc);
    }

    #[test]
    fn test_orders_by_columns_and_selected_aliases_only() {
        use crate::users::user;
        use sea_orm::{DatabaseBackend, QueryTrait};

        let fields = vec![
            "tokens_count".to_string(),
            "missing".to_string(),
            "users.name".to_string(),
        ];
        let sql = apply_order(user::Entity::find(), &fields, SortDirection::Desc, &["tokens_count".to_string()])
            .build(DatabaseBackend::Sqlite)
            .to_string();
        assert!(sql.ends_with(r#"ORDER BY "tokens_count" DESC, "users"."name" DESC"#), "{sql}");

        let sql = apply_order(user::Entity::find(), &fields, SortDirection::Asc, &[])
            .build(DatabaseBackend::Sqlite)
            .to_string();
        assert!(sql.ends_with(r#"ORDER BY "users"."name" ASC"#), "{sql}");
    }

    #[test]
    fn test_into_order() {
        assert!(matches!(Order::from(SortDirection::Desc), Order::Desc));
        assert!(matches!(Order::from(SortDirection::Asc), Order::Asc));
    }
}
