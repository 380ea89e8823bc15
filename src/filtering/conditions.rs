//! Filter predicates.
//!
//! Each entry of `where`, `where_not` and `or_where` becomes one predicate:
//!
//! | value              | `where`       | `where_not`       | `or_where`       |
//! |--------------------|---------------|-------------------|------------------|
//! | `""`, `"0"`        | `IS NULL`     | `IS NOT NULL`     | `OR … IS NULL`   |
//! | `a,b,c`            | `IN (…)`      | `NOT IN (…)`      | `OR … IN (…)`    |
//! | anything else      | `= v`         | `<> v`            | `OR … = v`       |
//!
//! Predicates fold left in the order search, `where`, `where_not`, `or_where`; an
//! `or_where` predicate is OR-ed with everything accumulated before it.

use indexmap::IndexMap;
use sea_orm::{
    ColumnTrait, ColumnType, Condition, EntityTrait, IdenStatic, Iterable, Value,
    sea_query::{Alias, ConditionExpression, Expr, Func, LikeExpr, SimpleExpr},
};
use std::marker::PhantomData;

use super::query_parser::QuerySpec;
use crate::helpers::checkbox_to_bool;

const MAX_FIELD_NAME_LENGTH: usize = 100;

/// Field names are ASCII identifiers with at most one `.` separating a table
/// prefix. Names starting with `_` are reserved.
#[must_use]
pub fn is_valid_field_name(field_name: &str) -> bool {
    !field_name.is_empty()
        && field_name.len() <= MAX_FIELD_NAME_LENGTH
        && !field_name.starts_with('_')
        && field_name.matches('.').count() <= 1
        && !field_name.starts_with('.')
        && !field_name.ends_with('.')
        && field_name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
}

/// Absent, empty and `"0"` values all mean "no value".
#[must_use]
pub fn is_loosely_empty(value: Option<&str>) -> bool {
    matches!(value, None | Some("" | "0"))
}

/// Which filter map a predicate came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterMode {
    And,
    AndNot,
    Or,
}

/// Shape of a single filter value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    IsNull,
    In(Vec<String>),
    Equals(String),
}

impl Predicate {
    #[must_use]
    pub fn classify(value: &str) -> Self {
        if is_loosely_empty(Some(value)) {
            Self::IsNull
        } else if value.contains(',') {
            Self::In(value.split(',').map(str::to_string).collect())
        } else {
            Self::Equals(value.to_string())
        }
    }
}

/// A field name resolved against an entity.
#[derive(Debug, Clone)]
pub enum FieldRef<E: EntityTrait> {
    /// A column of the entity, optionally written as `table.column`
    Column(E::Column),
    /// An alias the query itself selects, such as `tokens_count`
    Computed(String),
}

impl<E: EntityTrait> FieldRef<E> {
    /// Resolve a validated field name to a column of `E`.
    ///
    /// Names of other tables or unknown columns resolve to `None`.
    #[must_use]
    pub fn resolve(field: &str) -> Option<Self> {
        let table = E::default().table_name().to_string();
        let (prefix, name) = match field.split_once('.') {
            Some((prefix, name)) => (Some(prefix), name),
            None => (None, field),
        };

        if prefix.is_some_and(|prefix| prefix != table) {
            return None;
        }
        E::Column::iter()
            .find(|column| column.as_str() == name)
            .map(Self::Column)
    }

    /// Like [`resolve`](Self::resolve), also accepting one of the `computed`
    /// aliases selected by the query.
    #[must_use]
    pub fn resolve_with(field: &str, computed: &[String]) -> Option<Self> {
        Self::resolve(field).or_else(|| {
            computed
                .iter()
                .any(|alias| alias == field)
                .then(|| Self::Computed(field.to_string()))
        })
    }

    /// Column expression, table-qualified for entity columns
    #[must_use]
    pub fn expr(&self) -> Expr {
        match self {
            Self::Column(column) => Expr::col((E::default(), *column)),
            Self::Computed(alias) => Expr::col(Alias::new(alias.as_str())),
        }
    }

    /// Bind a raw filter value with the column's type.
    #[must_use]
    pub fn coerce(&self, raw: &str) -> Value {
        let Self::Column(column) = self else {
            return Value::from(raw.to_string());
        };
        match column.def().get_column_type() {
            ColumnType::TinyInteger
            | ColumnType::SmallInteger
            | ColumnType::Integer
            | ColumnType::BigInteger
            | ColumnType::TinyUnsigned
            | ColumnType::SmallUnsigned
            | ColumnType::Unsigned
            | ColumnType::BigUnsigned => raw
                .trim()
                .parse::<i64>()
                .map_or_else(|_| Value::from(raw.to_string()), Value::from),
            ColumnType::Float | ColumnType::Double | ColumnType::Decimal(_) => raw
                .trim()
                .parse::<f64>()
                .map_or_else(|_| Value::from(raw.to_string()), Value::from),
            ColumnType::Boolean => Value::from(checkbox_to_bool(raw)),
            _ => Value::from(raw.to_string()),
        }
    }

    /// Build the predicate expression for `value` in `mode`.
    #[must_use]
    pub fn predicate(&self, value: &str, mode: FilterMode) -> SimpleExpr {
        let negated = mode == FilterMode::AndNot;
        let column = self.expr();
        match Predicate::classify(value) {
            Predicate::IsNull if negated => column.is_not_null(),
            Predicate::IsNull => column.is_null(),
            Predicate::In(items) => {
                let values: Vec<Value> = items.iter().map(|item| self.coerce(item)).collect();
                if negated { column.is_not_in(values) } else { column.is_in(values) }
            }
            Predicate::Equals(item) if negated => column.ne(self.coerce(&item)),
            Predicate::Equals(item) => column.eq(self.coerce(&item)),
        }
    }
}

/// Escape `LIKE` wildcards so the term matches literally.
#[must_use]
pub fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Case-insensitive substring match on `column`.
#[must_use]
pub fn like_condition<E: EntityTrait>(column: &str, term: &str) -> SimpleExpr {
    let pattern = format!("%{}%", escape_like(&term.to_lowercase()));
    let target = FieldRef::<E>::resolve(column)
        .map_or_else(|| Expr::col(Alias::new(column)), |field| field.expr());
    Expr::expr(Func::lower(target)).like(LikeExpr::new(pattern).escape('\\'))
}

/// Left fold of filter predicates.
#[derive(Debug, Clone)]
pub struct FilterBuilder<E: EntityTrait> {
    condition: Option<Condition>,
    disjunction: bool,
    _entity: PhantomData<E>,
}

impl<E: EntityTrait> Default for FilterBuilder<E> {
    fn default() -> Self {
        Self {
            condition: None,
            disjunction: false,
            _entity: PhantomData,
        }
    }
}

impl<E: EntityTrait> FilterBuilder<E> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, mode: FilterMode, predicate: impl Into<ConditionExpression>) {
        let (condition, disjunction) = match (self.condition.take(), mode) {
            (None, _) => (Condition::all().add(predicate), false),
            (Some(acc), FilterMode::Or) => (Condition::any().add(acc).add(predicate), true),
            (Some(acc), _) if self.disjunction => (Condition::all().add(acc).add(predicate), false),
            (Some(acc), _) => (acc.add(predicate), false),
        };
        self.condition = Some(condition);
        self.disjunction = disjunction;
    }

    /// Start the fold with a search condition.
    #[must_use]
    pub fn search(mut self, condition: Option<Condition>) -> Self {
        if let Some(condition) = condition {
            self.push(FilterMode::And, condition);
        }
        self
    }

    /// Fold every entry of a filter map in `mode`, skipping names that are not
    /// columns of `E`.
    #[must_use]
    pub fn apply(mut self, filters: &IndexMap<String, String>, mode: FilterMode) -> Self {
        for (field, value) in filters {
            if !is_valid_field_name(field) {
                tracing::debug!(field = %field, ?mode, "Skipping invalid filter field");
                continue;
            }
            let Some(field_ref) = FieldRef::<E>::resolve(field) else {
                tracing::debug!(field = %field, ?mode, "Skipping unknown filter field");
                continue;
            };
            self.push(mode, field_ref.predicate(value, mode));
        }
        self
    }

    /// The folded condition, if any predicate was added
    #[must_use]
    pub fn build(self) -> Option<Condition> {
        self.condition
    }
}

/// Fold search, `where`, `where_not` and `or_where` of `spec` into one condition.
#[must_use]
pub fn build_filter_condition<E: EntityTrait>(
    spec: &QuerySpec,
    search: Option<Condition>,
) -> Option<Condition> {
    FilterBuilder::<E>::new()
        .search(search)
        .apply(&spec.where_eq, FilterMode::And)
        .apply(&spec.where_not, FilterMode::AndNot)
        .apply(&spec.or_where, FilterMode::Or)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, QueryFilter, QueryTrait};

    mod note {
        use sea_orm::entity::prelude::*;

        #[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
        #[sea_orm(table_name = "notes")]
        pub struct Model {
            #[sea_orm(primary_key)]
            pub id: i32,
            pub name: String,
            pub pinned: bool,
            pub author_id: Option<i32>,
        }

        #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
        pub enum Relation {}

        impl ActiveModelBehavior for ActiveModel {}
    }

    fn sql(filters: &[(&str, &str, FilterMode)]) -> String {
        let mut builder = FilterBuilder::<note::Entity>::new();
        for (field, value, mode) in filters {
            let mut map = IndexMap::new();
            map.insert((*field).to_string(), (*value).to_string());
            builder = builder.apply(&map, *mode);
        }
        let mut query = note::Entity::find();
        if let Some(condition) = builder.build() {
            query = query.filter(condition);
        }
        query.build(DatabaseBackend::Sqlite).to_string()
    }

    #[test]
    fn test_field_name_validation() {
        assert!(is_valid_field_name("name"));
        assert!(is_valid_field_name("users.role_id"));
        assert!(!is_valid_field_name(""));
        assert!(!is_valid_field_name("_secret"));
        assert!(!is_valid_field_name("a.b.c"));
        assert!(!is_valid_field_name("name; DROP TABLE"));
        assert!(!is_valid_field_name(".name"));
        assert!(!is_valid_field_name(&"x".repeat(101)));
    }

    #[test]
    fn test_classify() {
        assert_eq!(Predicate::classify(""), Predicate::IsNull);
        assert_eq!(Predicate::classify("0"), Predicate::IsNull);
        assert_eq!(
            Predicate::classify("1,2,3"),
            Predicate::In(vec!["1".into(), "2".into(), "3".into()])
        );
        assert_eq!(Predicate::classify("Ann"), Predicate::Equals("Ann".into()));
    }

    #[test]
    fn test_comma_value_yields_in_with_split_elements() {
        let sql = sql(&[("id", "1,2,3", FilterMode::And)]);
        assert!(sql.contains(r#""notes"."id" IN (1, 2, 3)"#), "{sql}");
    }

    #[test]
    fn test_loose_empty_becomes_null_checks() {
        let sql_where = sql(&[("author_id", "0", FilterMode::And)]);
        assert!(sql_where.contains(r#""notes"."author_id" IS NULL"#), "{sql_where}");

        let sql_not = sql(&[("author_id", "", FilterMode::AndNot)]);
        assert!(sql_not.contains(r#""notes"."author_id" IS NOT NULL"#), "{sql_not}");
    }

    #[test]
    fn test_negated_modes() {
        let sql = sql(&[
            ("name", "Ann", FilterMode::AndNot),
            ("id", "4,5", FilterMode::AndNot),
        ]);
        assert!(sql.contains(r#""notes"."name" <> 'Ann'"#), "{sql}");
        assert!(sql.contains(r#""notes"."id" NOT IN (4, 5)"#), "{sql}");
    }

    #[test]
    fn test_or_where_wraps_accumulated_predicates() {
        let sql = sql(&[
            ("name", "Ann", FilterMode::And),
            ("author_id", "2", FilterMode::And),
            ("id", "9", FilterMode::Or),
        ]);
        assert!(
            sql.contains(r#"("notes"."name" = 'Ann' AND "notes"."author_id" = 2) OR "notes"."id" = 9"#),
            "{sql}"
        );
    }

    #[test]
    fn test_checkbox_coercion_for_boolean_columns() {
        let field = FieldRef::<note::Entity>::resolve("pinned").unwrap();
        assert_eq!(field.coerce("on"), Value::from(true));
        assert_eq!(field.coerce("no"), Value::from(false));
    }

    #[test]
    fn test_resolution() {
        assert!(matches!(FieldRef::<note::Entity>::resolve("notes.name"), Some(FieldRef::Column(_))));
        assert!(FieldRef::<note::Entity>::resolve("roles.level").is_none());
        assert!(FieldRef::<note::Entity>::resolve("tokens_count").is_none());

        let computed = vec!["tokens_count".to_string()];
        assert!(matches!(
            FieldRef::<note::Entity>::resolve_with("tokens_count", &computed),
            Some(FieldRef::Computed(_))
        ));
        assert!(matches!(
            FieldRef::<note::Entity>::resolve_with("name", &computed),
            Some(FieldRef::Column(_))
        ));
    }

    #[test]
    fn test_unknown_filter_fields_are_skipped() {
        let sql = sql(&[
            ("nonexistent", "1", FilterMode::And),
            ("roles.level", "5", FilterMode::AndNot),
            ("tokens_count", "2", FilterMode::Or),
        ]);
        assert!(!sql.contains("WHERE"), "{sql}");

        let sql = self::sql(&[("nonexistent", "1", FilterMode::And), ("name", "Ann", FilterMode::And)]);
        assert!(sql.ends_with(r#"WHERE "notes"."name" = 'Ann'"#), "{sql}");
    }

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
    }

    #[test]
    fn test_search_precedes_filters() {
        let condition = FilterBuilder::<note::Entity>::new()
            .search(Some(Condition::all().add(like_condition::<note::Entity>("name", "An"))))
            .build()
            .unwrap();
        let sql = note::Entity::find()
            .filter(condition)
            .build(DatabaseBackend::Sqlite)
            .to_string();
        assert!(sql.contains(r#"LOWER("notes"."name") LIKE '%an%'"#), "{sql}");
        assert!(sql.contains("ESCAPE"), "{sql}");
    }
}
