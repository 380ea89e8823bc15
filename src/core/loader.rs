//! Relation execution.
//!
//! Counts are added to the main query as correlated sub-selects, so they cost no
//! extra round trip. Relations load with one `IN` query per relation over the
//! parent keys and are attached to the records in memory.

use sea_orm::{
    ConnectionTrait, EntityTrait, FromQueryResult, JsonValue, QuerySelect, Select, Value,
    sea_query::{Alias, Asterisk, Expr, Func, Query, SimpleExpr, SubQueryStatement},
};
use std::collections::{HashMap, HashSet};

use super::traits::{ApiResource, RelationKind, RelationSpec};
use crate::errors::ApiError;
use crate::filtering::{RelationDirective, RelationPlan};

/// A relation to load and the relations to load below it.
#[derive(Debug, Clone)]
pub struct ResolvedRelation {
    pub spec: RelationSpec,
    pub nested: Vec<RelationSpec>,
}

/// A [`RelationPlan`] resolved against a resource's declared relations.
#[derive(Debug, Clone, Default)]
pub struct ResolvedPlan {
    pub counts: Vec<RelationSpec>,
    pub relations: Vec<ResolvedRelation>,
}

fn unknown_relation(name: &str) -> ApiError {
    ApiError::bad_request(format!("Unknown relation '{name}'"))
}

/// Look up every relation named in `plan`.
///
/// # Errors
///
/// Returns a 400 for a name the resource does not expose.
pub fn resolve_plan<R: ApiResource>(plan: &RelationPlan) -> Result<ResolvedPlan, ApiError> {
    let counts = plan
        .counts
        .iter()
        .map(|name| R::relation(name).ok_or_else(|| unknown_relation(name)))
        .collect::<Result<Vec<_>, _>>()?;

    let relations = plan
        .relations
        .iter()
        .map(|directive: &RelationDirective| -> Result<ResolvedRelation, ApiError> {
            let spec = R::relation(directive.name()).ok_or_else(|| unknown_relation(directive.name()))?;
            let nested = directive
                .nested()
                .iter()
                .map(|name| (spec.nested)(name).ok_or_else(|| unknown_relation(&format!("{}.{name}", spec.name))))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(ResolvedRelation { spec, nested })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ResolvedPlan { counts, relations })
}

/// `(SELECT COUNT(table.foreign_key) FROM table WHERE table.foreign_key = parent.local_key)`
fn count_subquery(parent_table: &str, spec: &RelationSpec) -> SimpleExpr {
    let related_key = (Alias::new(spec.table), Alias::new(spec.foreign_key));
    let statement = Query::select()
        .expr(Func::count(Expr::col(related_key.clone())))
        .from(Alias::new(spec.table))
        .and_where(Expr::col(related_key).equals((Alias::new(parent_table), Alias::new(spec.local_key))))
        .to_owned();
    SimpleExpr::SubQuery(None, Box::new(SubQueryStatement::SelectStatement(statement)))
}

/// Column name a counted relation is exposed under
#[must_use]
pub fn count_alias(spec: &RelationSpec) -> String {
    format!("{}_count", spec.name)
}

/// Expose one `<name>_count` column per counted relation.
pub fn apply_counts<E: EntityTrait>(mut query: Select<E>, parent_table: &str, counts: &[RelationSpec]) -> Select<E> {
    for spec in counts {
        query = query.column_as(count_subquery(parent_table, spec), count_alias(spec));
    }
    query
}

/// Join key as text so integer and string keys group alike.
fn key_of(value: Option<&JsonValue>) -> Option<String> {
    match value? {
        JsonValue::Number(number) => Some(number.to_string()),
        JsonValue::String(text) => Some(text.clone()),
        _ => None,
    }
}

fn bind_key(value: &JsonValue) -> Option<Value> {
    match value {
        JsonValue::Number(number) => number
            .as_i64()
            .map(Value::from)
            .or_else(|| number.as_f64().map(Value::from)),
        JsonValue::String(text) => Some(Value::from(text.clone())),
        _ => None,
    }
}

/// Distinct bindable values of `column` across `records`.
fn collect_keys(records: &[JsonValue], column: &str) -> Vec<Value> {
    let mut seen = HashSet::new();
    let mut keys = Vec::new();
    for record in records {
        let Some(value) = record.get(column) else { continue };
        let (Some(key), Some(bound)) = (key_of(Some(value)), bind_key(value)) else {
            continue;
        };
        if seen.insert(key) {
            keys.push(bound);
        }
    }
    keys
}

/// Remove `hidden` columns from a record object.
pub fn strip_hidden(record: &mut JsonValue, hidden: &[&str]) {
    if let Some(object) = record.as_object_mut() {
        for field in hidden {
            object.remove(*field);
        }
    }
}

/// Fetch every row of `spec.table` whose `foreign_key` matches a key of `parents`.
async fn fetch_related<C: ConnectionTrait>(
    db: &C,
    spec: &RelationSpec,
    parents: &[JsonValue],
) -> Result<Vec<JsonValue>, ApiError> {
    let keys = collect_keys(parents, spec.local_key);
    if keys.is_empty() {
        return Ok(Vec::new());
    }

    let statement = Query::select()
        .column(Asterisk)
        .from(Alias::new(spec.table))
        .and_where(Expr::col((Alias::new(spec.table), Alias::new(spec.foreign_key))).is_in(keys))
        .to_owned();
    let rows = JsonValue::find_by_statement(db.get_database_backend().build(&statement))
        .all(db)
        .await?;
    tracing::debug!(relation = spec.name, rows = rows.len(), "Loaded relation");
    Ok(rows)
}

/// Attach `rows` to `parents` under `spec.name`, stripping hidden columns.
fn attach(parents: &mut [JsonValue], spec: &RelationSpec, rows: Vec<JsonValue>) {
    let mut grouped: HashMap<String, Vec<JsonValue>> = HashMap::new();
    for mut row in rows {
        let Some(key) = key_of(row.get(spec.foreign_key)) else { continue };
        strip_hidden(&mut row, spec.hidden);
        grouped.entry(key).or_default().push(row);
    }

    for parent in parents.iter_mut() {
        let related = key_of(parent.get(spec.local_key)).and_then(|key| grouped.get(&key));
        let value = match spec.kind {
            RelationKind::HasMany => JsonValue::Array(related.cloned().unwrap_or_default()),
            RelationKind::BelongsTo => related
                .and_then(|rows| rows.first().cloned())
                .unwrap_or(JsonValue::Null),
        };
        if let Some(object) = parent.as_object_mut() {
            object.insert(spec.name.to_string(), value);
        }
    }
}

/// Load every resolved relation for `records`, one query per relation.
///
/// # Errors
///
/// Propagates database errors.
pub async fn load_relations<C: ConnectionTrait>(
    db: &C,
    records: &mut [JsonValue],
    relations: &[ResolvedRelation],
) -> Result<(), ApiError> {
    if records.is_empty() {
        return Ok(());
    }

    for relation in relations {
        let mut rows = fetch_related(db, &relation.spec, records).await?;
        for nested in &relation.nested {
            let nested_rows = fetch_related(db, nested, &rows).await?;
            attach(&mut rows, nested, nested_rows);
        }
        attach(records, &relation.spec, rows);
    }
    Ok(())
}
