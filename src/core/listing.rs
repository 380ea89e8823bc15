//! Generic list, show and destroy operations.
//!
//! A list request runs in a fixed order: filters, total count, `with` expansion,
//! ordering, then the `take`/`page` window.

use axum::http::StatusCode;
use sea_orm::{
    ConnectionTrait, EntityName, EntityTrait, IdenStatic, JsonValue, PaginatorTrait, PrimaryKeyTrait, QueryFilter,
    QuerySelect, Select,
};
use std::sync::Arc;

use super::loader::{ResolvedPlan, apply_counts, count_alias, load_relations, resolve_plan, strip_hidden};
use super::traits::ApiResource;
use crate::errors::ApiError;
use crate::filtering::{
    ListResponse, QuerySpec, apply_order, build_filter_condition, conditions::FieldRef, expand,
    is_valid_field_name,
};

/// Per-record transform applied to list output.
pub type RecordTransform = Arc<dyn Fn(JsonValue) -> JsonValue + Send + Sync>;

/// Presentation options for [`list_request`].
#[derive(Clone, Default)]
pub struct ListOptions {
    /// Applied to every record after relations are attached; records pass
    /// through unchanged when absent
    pub transform: Option<RecordTransform>,
}

impl ListOptions {
    #[must_use]
    pub fn with_transform(transform: impl Fn(JsonValue) -> JsonValue + Send + Sync + 'static) -> Self {
        Self {
            transform: Some(Arc::new(transform)),
        }
    }

    fn apply(&self, record: JsonValue) -> JsonValue {
        match &self.transform {
            Some(transform) => transform(record),
            None => record,
        }
    }
}

impl std::fmt::Debug for ListOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListOptions")
            .field("transform", &self.transform.is_some())
            .finish()
    }
}

type PrimaryKeyValue<R> =
    <<<R as ApiResource>::Entity as EntityTrait>::PrimaryKey as PrimaryKeyTrait>::ValueType;

/// Restrict to the requested columns, keeping the keys relations join on.
fn apply_select<R: ApiResource>(
    query: Select<R::Entity>,
    spec: &QuerySpec,
    plan: &ResolvedPlan,
) -> Select<R::Entity> {
    if spec.selects_all() {
        return query;
    }

    let mut columns = Vec::new();
    let requested = spec
        .select
        .iter()
        .map(String::as_str)
        .chain(plan.relations.iter().map(|relation| relation.spec.local_key));
    for field in requested {
        if !is_valid_field_name(field) {
            tracing::debug!(field = %field, "Skipping invalid select field");
            continue;
        }
        match FieldRef::<R::Entity>::resolve(field) {
            Some(FieldRef::Column(column)) => {
                if !columns.iter().any(|known: &<R::Entity as EntityTrait>::Column| known.as_str() == column.as_str()) {
                    columns.push(column);
                }
            }
            _ => tracing::debug!(field = %field, "Skipping unknown select field"),
        }
    }

    if columns.is_empty() {
        query
    } else {
        query.select_only().columns(columns)
    }
}

fn present<R: ApiResource>(mut record: JsonValue) -> JsonValue {
    strip_hidden(&mut record, R::HIDDEN_FIELDS);
    record
}

/// Filtered, ordered, windowed listing of `R`.
///
/// # Errors
///
/// Returns a 400 for an unknown relation in `with`, or a database error.
pub async fn list_request<R: ApiResource, C: ConnectionTrait>(
    db: &C,
    spec: &QuerySpec,
    options: &ListOptions,
) -> Result<ListResponse, ApiError> {
    let plan = resolve_plan::<R>(&expand(&spec.with))?;
    let table = R::Entity::default().table_name().to_string();

    let mut query = R::base_query();
    let search = spec.search.as_deref().and_then(R::search_condition);
    if let Some(condition) = build_filter_condition::<R::Entity>(spec, search) {
        query = query.filter(condition);
    }

    let total = query.clone().count(db).await?;

    query = apply_select::<R>(query, spec, &plan);
    query = apply_counts(query, &table, &plan.counts);
    let computed: Vec<String> = plan.counts.iter().map(count_alias).collect();
    query = apply_order(query, &spec.order.fields, spec.order.direction, &computed);
    if spec.is_windowed() {
        let take = spec.take.unsigned_abs();
        query = query.limit(take).offset(spec.skip);
    }

    let mut records = query.into_json().all(db).await?;
    load_relations(db, &mut records, &plan.relations).await?;

    let collection = records
        .into_iter()
        .map(|record| options.apply(present::<R>(record)))
        .collect();

    tracing::debug!(
        resource = R::RESOURCE_NAME_PLURAL,
        total,
        page = spec.page,
        take = spec.take,
        "Listed resources"
    );

    Ok(ListResponse {
        collection,
        page: spec.page,
        take: spec.take,
        total,
    })
}

/// A single record by id, honoring `select` and `with`.
///
/// # Errors
///
/// Returns a 404 when no record has `id`, a 400 for an unknown relation, or a
/// database error.
pub async fn show_request<R, C>(db: &C, id: i32, spec: &QuerySpec) -> Result<JsonValue, ApiError>
where
    R: ApiResource,
    C: ConnectionTrait,
    PrimaryKeyValue<R>: From<i32>,
{
    let plan = resolve_plan::<R>(&expand(&spec.with))?;
    let table = R::Entity::default().table_name().to_string();

    let query = apply_select::<R>(R::Entity::find_by_id(id), spec, &plan);
    let query = apply_counts(query, &table, &plan.counts);

    let record = query
        .into_json()
        .one(db)
        .await?
        .ok_or_else(|| ApiError::not_found(R::RESOURCE_NAME_SINGULAR, Some(id.to_string())))?;

    let mut records = vec![record];
    load_relations(db, &mut records, &plan.relations).await?;
    let record = records.pop().unwrap_or_default();
    Ok(present::<R>(record))
}

/// Delete a record by id.
///
/// # Errors
///
/// Returns a 404 when nothing was deleted, or a database error.
pub async fn destroy_request<R, C>(db: &C, id: i32) -> Result<StatusCode, ApiError>
where
    R: ApiResource,
    C: ConnectionTrait,
    PrimaryKeyValue<R>: From<i32>,
{
    let result = R::Entity::delete_by_id(id).exec(db).await?;
    if result.rows_affected == 0 {
        return Err(ApiError::not_found(R::RESOURCE_NAME_SINGULAR, Some(id.to_string())));
    }
    tracing::debug!(resource = R::RESOURCE_NAME_SINGULAR, id, "Deleted resource");
    Ok(StatusCode::NO_CONTENT)
}
