use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, EntityTrait, IntoActiveModel, JsonValue, TransactionTrait,
};
use utoipa_axum::{router::OpenApiRouter, routes};

use super::requests::{USER_FIELDS, UserPayload, store_rules, update_rules};
use super::{UserResource, role, user};
use crate::auth::{CurrentCaller, caller_level, ensure_can_assign, ensure_can_modify, hash_password, role_level};
use crate::core::{ListOptions, destroy_request, list_request, show_request};
use crate::errors::{ApiError, ErrorResponse};
use crate::filtering::{ListResponse, QuerySpec, RequestParams};
use crate::input::{FormInput, FormValue};
use crate::state::AppState;
use crate::storage::FileStorage;
use crate::validation::Validator;

/// Field carrying the profile image
pub const IMAGE_FIELD: &str = "img_url";
const IMAGE_HINT: &str = "user_img";

fn image_directory(user_id: i32) -> String {
    format!("users/{user_id}")
}

/// Best-effort removal of a file that is no longer referenced.
fn discard(storage: &dyn FileStorage, path: &str) {
    if let Err(err) = storage.remove(path) {
        tracing::warn!(path = %path, error = %err, "Failed to remove stored file");
    }
}

/// `None` when the field was not submitted, `Some(None)` when it was sent empty.
fn submitted_text(input: &FormInput, field: &str) -> Option<Option<String>> {
    input
        .contains(field)
        .then(|| input.text(field).map(str::to_string))
}

#[utoipa::path(
    get,
    path = "/",
    params(
        ("take" = Option<i64>, Query, description = "Page size; 0 or less returns every row"),
        ("page" = Option<u64>, Query, description = "1-based page number"),
        ("order[by]" = Option<String>, Query, description = "Comma-separated order fields"),
        ("order[dir]" = Option<String>, Query, description = "`desc` for descending order"),
        ("select" = Option<String>, Query, description = "Comma-separated columns"),
        ("search" = Option<String>, Query, description = "Matches name or email"),
        ("with" = Option<String>, Query, description = "Relations to load, `name.count` for counts")
    ),
    responses(
        (status = StatusCode::OK, description = "Paginated users", body = ListResponse),
        (status = StatusCode::BAD_REQUEST, description = "Unknown relation", body = ErrorResponse)
    ),
    tag = "users",
    operation_id = "list_users",
    summary = "List users"
)]
pub async fn index(
    State(state): State<AppState>,
    params: RequestParams,
) -> Result<Json<ListResponse>, ApiError> {
    let spec = QuerySpec::parse(&params, &state.settings.listing);
    let response = list_request::<UserResource, _>(&state.db, &spec, &ListOptions::default()).await?;
    Ok(Json(response))
}

#[utoipa::path(
    get,
    path = "/{id}",
    params(
        ("id" = i32, Path, description = "User id"),
        ("select" = Option<String>, Query, description = "Comma-separated columns"),
        ("with" = Option<String>, Query, description = "Relations to load")
    ),
    responses(
        (status = StatusCode::OK, description = "The user", body = serde_json::Value),
        (status = StatusCode::NOT_FOUND, description = "User not found", body = ErrorResponse)
    ),
    tag = "users",
    operation_id = "show_user",
    summary = "Show one user"
)]
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    params: RequestParams,
) -> Result<Json<JsonValue>, ApiError> {
    let spec = QuerySpec::parse(&params, &state.settings.listing);
    Ok(Json(show_request::<UserResource, _>(&state.db, id, &spec).await?))
}

#[utoipa::path(
    post,
    path = "/",
    request_body = UserPayload,
    responses(
        (status = StatusCode::CREATED, description = "User registered; the body includes an access `token`", body = serde_json::Value),
        (status = StatusCode::BAD_REQUEST, description = "The image could not be stored", body = ErrorResponse),
        (status = StatusCode::UNPROCESSABLE_ENTITY, description = "Validation failed", body = ErrorResponse)
    ),
    tag = "users",
    operation_id = "create_user",
    summary = "Register a user"
)]
pub async fn store(
    State(state): State<AppState>,
    input: FormInput,
) -> Result<(StatusCode, Json<JsonValue>), ApiError> {
    let input = input.only(USER_FIELDS);
    Validator::new(store_rules()).validate(&state.db, &input).await?;

    let txn = state.db.begin().await?;
    let mut created = user::ActiveModel {
        name: Set(input.text("name").unwrap_or_default().to_string()),
        email: Set(input.text("email").unwrap_or_default().to_string()),
        password: Set(hash_password(input.text("password").unwrap_or_default())?),
        img_url: Set(None),
        role_id: Set(input.text("role_id").and_then(|role_id| role_id.parse().ok())),
        phone: Set(input.text("phone").map(str::to_string)),
        about: Set(input.text("about").map(str::to_string)),
        lang: Set(input.text("lang").map(str::to_string)),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    if let Some(file) = input.file(IMAGE_FIELD) {
        let stored = match state.storage.save(file, &image_directory(created.id), Some(IMAGE_HINT)) {
            Ok(stored) => stored,
            Err(err) => {
                txn.rollback().await?;
                return Err(ApiError::file_operation(IMAGE_FIELD, err));
            }
        };
        let mut active = created.into_active_model();
        active.img_url = Set(Some(stored.clone()));
        created = match active.update(&txn).await {
            Ok(updated) => updated,
            Err(err) => {
                discard(state.storage.as_ref(), &stored);
                return Err(err.into());
            }
        };
    }
    txn.commit().await?;

    let token = state.tokens.issue(&state.db, created.id).await?;
    tracing::info!(user_id = created.id, email = %created.email, "User registered");

    let mut body = show_request::<UserResource, _>(&state.db, created.id, &QuerySpec::default()).await?;
    if let Some(object) = body.as_object_mut() {
        object.insert("token".to_string(), JsonValue::String(token));
    }
    Ok((StatusCode::CREATED, Json(body)))
}

#[utoipa::path(
    put,
    path = "/{id}",
    params(("id" = i32, Path, description = "User id")),
    request_body = UserPayload,
    responses(
        (status = StatusCode::OK, description = "The updated user", body = serde_json::Value),
        (status = StatusCode::BAD_REQUEST, description = "The image could not be stored or removed", body = ErrorResponse),
        (status = StatusCode::FORBIDDEN, description = "Caller is less privileged than the user or the role", body = ErrorResponse),
        (status = StatusCode::NOT_FOUND, description = "User not found", body = ErrorResponse),
        (status = StatusCode::UNPROCESSABLE_ENTITY, description = "Validation failed", body = ErrorResponse)
    ),
    tag = "users",
    operation_id = "update_user",
    summary = "Update a user"
)]
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    caller: CurrentCaller,
    input: FormInput,
) -> Result<Json<JsonValue>, ApiError> {
    let input = input.only(USER_FIELDS);
    let target = user::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_else(|| ApiError::not_found("user", Some(id.to_string())))?;

    let level = caller_level(&state.db, &caller).await?;
    ensure_can_modify(level, role_level(&state.db, target.role_id).await?)?;
    if let Some(role_id) = input.text("role_id").and_then(|role_id| role_id.parse::<i32>().ok())
        && let Some(role) = role::Entity::find_by_id(role_id).one(&state.db).await?
    {
        ensure_can_assign(level, role.level)?;
    }

    Validator::new(update_rules(&input, id))
        .validate(&state.db, &input)
        .await?;

    let previous_image = target.img_url.clone();
    let mut active = target.into_active_model();
    if let Some(Some(name)) = submitted_text(&input, "name") {
        active.name = Set(name);
    }
    if let Some(Some(email)) = submitted_text(&input, "email") {
        active.email = Set(email);
    }
    if let Some(password) = input.text("password") {
        active.password = Set(hash_password(password)?);
    }
    if let Some(role_id) = submitted_text(&input, "role_id") {
        active.role_id = Set(role_id.and_then(|role_id| role_id.parse().ok()));
    }
    if let Some(phone) = submitted_text(&input, "phone") {
        active.phone = Set(phone);
    }
    if let Some(about) = submitted_text(&input, "about") {
        active.about = Set(about);
    }
    if let Some(lang) = submitted_text(&input, "lang") {
        active.lang = Set(lang);
    }

    // The previous image is only dropped once the row no longer points at it
    let mut saved: Option<String> = None;
    let mut replaced: Option<String> = None;
    match input.get(IMAGE_FIELD) {
        Some(FormValue::Null) => {
            replaced.clone_from(&previous_image);
            active.img_url = Set(None);
        }
        Some(FormValue::File(file)) => {
            let stored = state
                .storage
                .save(file, &image_directory(id), Some(IMAGE_HINT))
                .map_err(|err| ApiError::file_operation(IMAGE_FIELD, err))?;
            replaced.clone_from(&previous_image);
            active.img_url = Set(Some(stored.clone()));
            saved = Some(stored);
        }
        _ => {}
    }

    if active.is_changed() {
        if let Err(err) = active.update(&state.db).await {
            if let Some(stored) = &saved {
                discard(state.storage.as_ref(), stored);
            }
            return Err(err.into());
        }
        tracing::debug!(user_id = id, "Updated user");
    }
    if let Some(previous) = &replaced {
        discard(state.storage.as_ref(), previous);
    }

    Ok(Json(show_request::<UserResource, _>(&state.db, id, &QuerySpec::default()).await?))
}

/// `PATCH` shares the partial-update semantics of `PUT`.
#[utoipa::path(
    patch,
    path = "/{id}",
    params(("id" = i32, Path, description = "User id")),
    request_body = UserPayload,
    responses(
        (status = StatusCode::OK, description = "The updated user", body = serde_json::Value),
        (status = StatusCode::FORBIDDEN, description = "Caller is less privileged than the user or the role", body = ErrorResponse),
        (status = StatusCode::NOT_FOUND, description = "User not found", body = ErrorResponse),
        (status = StatusCode::UNPROCESSABLE_ENTITY, description = "Validation failed", body = ErrorResponse)
    ),
    tag = "users",
    operation_id = "patch_user",
    summary = "Partially update a user"
)]
pub async fn patch(
    state: State<AppState>,
    path: Path<i32>,
    caller: CurrentCaller,
    input: FormInput,
) -> Result<Json<JsonValue>, ApiError> {
    update(state, path, caller, input).await
}

#[utoipa::path(
    delete,
    path = "/{id}",
    params(("id" = i32, Path, description = "User id")),
    responses(
        (status = StatusCode::NO_CONTENT, description = "User deleted"),
        (status = StatusCode::NOT_FOUND, description = "User not found", body = ErrorResponse)
    ),
    tag = "users",
    operation_id = "delete_user",
    summary = "Delete a user"
)]
pub async fn destroy(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<StatusCode, ApiError> {
    let image = user::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .and_then(|user| user.img_url);
    let status = destroy_request::<UserResource, _>(&state.db, id).await?;
    if let Some(image) = image {
        discard(state.storage.as_ref(), &image);
    }
    Ok(status)
}

/// User routes, relative to their mount point.
pub fn router(state: AppState) -> OpenApiRouter {
    OpenApiRouter::new()
        .routes(routes!(index, store))
        .routes(routes!(show, update, patch, destroy))
        .with_state(state)
}
