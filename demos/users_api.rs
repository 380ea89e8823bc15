//! Users API on a fresh database (in-memory SQLite unless configured otherwise).
//!
//! ```sh
//! cargo run --example users_api
//! curl -s 'http://localhost:3000/api/users?with=role,tokens.count&order[by]=name' | jq .
//! ```
//!
//! Settings come from `resourcecrate.toml` and `RESOURCECRATE_*` variables.

use axum::{Json, Router, routing::get};
use resourcecrate::users::{access_token, role, user};
use resourcecrate::{AppState, Settings, api_router};
use sea_orm::{ActiveModelTrait, ActiveValue::Set, ConnectionTrait, DatabaseConnection, DbErr, Schema};

async fn create_schema(db: &DatabaseConnection) -> Result<(), DbErr> {
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);
    db.execute(backend.build(&schema.create_table_from_entity(role::Entity))).await?;
    db.execute(backend.build(&schema.create_table_from_entity(user::Entity))).await?;
    db.execute(backend.build(&schema.create_table_from_entity(access_token::Entity))).await?;

    for (name, level) in [("admin", 1), ("editor", 50), ("member", 200)] {
        role::ActiveModel {
            name: Set(name.to_string()),
            level: Set(level),
            ..Default::default()
        }
        .insert(db)
        .await?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .compact()
        .init();

    let settings = Settings::load()?;
    let db = settings.connect().await?;
    create_schema(&db).await?;

    let (api, openapi) = api_router(AppState::new(db, settings));
    let app = Router::new()
        .merge(api)
        .route(
            "/api-docs/openapi.json",
            get(move || std::future::ready(Json(openapi.clone()))),
        );

    let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
    tracing::info!("Listening on http://localhost:3000 (docs at /api-docs/openapi.json)");
    axum::serve(listener, app).await?;
    Ok(())
}
