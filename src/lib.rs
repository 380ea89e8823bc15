//! # resourcecrate
//!
//! A REST resource layer for axum and SeaORM. List endpoints interpret a small
//! query-string DSL (`where`, `where_not`, `or_where`, `with`, `order[by]`,
//! `order[dir]`, `select`, `search`, `take`, `page`) and translate it into one
//! filtered, ordered, windowed read plus batched relation loads. Mutation
//! endpoints validate field rules, persist inside transactions and attach
//! uploaded files through a pluggable [`FileStorage`](storage::FileStorage).
//!
//! ```rust,ignore
//! use resourcecrate::{AppState, Settings, api_router};
//!
//! let settings = Settings::load()?;
//! let db = settings.connect().await?;
//! let (app, openapi) = api_router(AppState::new(db, settings));
//! ```

pub mod auth;
pub mod config;
pub mod core;
pub mod errors;
pub mod filtering;
pub mod helpers;
pub mod input;
pub mod state;
pub mod storage;
pub mod users;
pub mod validation;

pub use config::Settings;
pub use core::{ApiResource, ListOptions, RecordTransform, RelationKind, RelationSpec};
pub use errors::{ApiError, ErrorResponse};
pub use filtering::{ListResponse, QuerySpec, RequestParams};
pub use input::{FormInput, FormValue};
pub use state::AppState;

use utoipa::OpenApi;
use utoipa_axum::router::OpenApiRouter;

#[derive(OpenApi)]
#[openapi(
    info(title = "resourcecrate", description = "Generic REST resources"),
    tags((name = "users", description = "User accounts")),
    components(schemas(ErrorResponse, ListResponse))
)]
pub struct ApiDoc;

/// Router serving every resource under `/api`, with its OpenAPI document.
pub fn api_router(state: AppState) -> (axum::Router, utoipa::openapi::OpenApi) {
    OpenApiRouter::with_openapi(ApiDoc::openapi())
        .nest("/api/users", users::router(state))
        .split_for_parts()
}
