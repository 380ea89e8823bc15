#![allow(dead_code)]

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use resourcecrate::auth::hash_password;
use resourcecrate::storage::{FileError, FileStorage, LocalFileStorage, UploadedFile};
use resourcecrate::users::{access_token, role, user};
use resourcecrate::{AppState, Settings, api_router};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ConnectionTrait, Database, DatabaseConnection, DbErr,
    Schema,
};
use serde_json::Value;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

pub const BOUNDARY: &str = "resourcecrate-test-boundary";
pub const PASSWORD: &str = "secret123";

pub const ADMIN_ROLE: i32 = 1;
pub const EDITOR_ROLE: i32 = 2;
pub const VIEWER_ROLE: i32 = 3;

pub const ALICE: i32 = 1;
pub const BOB: i32 = 2;
pub const CAROL: i32 = 3;
pub const DAVE: i32 = 4;

pub struct TestApp {
    pub app: Router,
    pub db: DatabaseConnection,
    pub storage_dir: TempDir,
}

/// Storage whose writes always fail; removals still reach the disk.
pub struct FailingStorage {
    local: LocalFileStorage,
}

impl FileStorage for FailingStorage {
    fn save(&self, _file: &UploadedFile, _destination: &str, _field_hint: Option<&str>) -> Result<String, FileError> {
        Err(FileError::new("disk full"))
    }

    fn remove(&self, stored_path: &str) -> Result<(), FileError> {
        self.local.remove(stored_path)
    }
}

async fn create_tables(db: &DatabaseConnection) -> Result<(), DbErr> {
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);
    db.execute(backend.build(&schema.create_table_from_entity(role::Entity))).await?;
    db.execute(backend.build(&schema.create_table_from_entity(user::Entity))).await?;
    db.execute(backend.build(&schema.create_table_from_entity(access_token::Entity))).await?;
    Ok(())
}

async fn seed(db: &DatabaseConnection) -> Result<(), DbErr> {
    for (id, name, level) in [(ADMIN_ROLE, "admin", 1), (EDITOR_ROLE, "editor", 5), (VIEWER_ROLE, "viewer", 10)] {
        role::ActiveModel {
            id: Set(id),
            name: Set(name.to_string()),
            level: Set(level),
        }
        .insert(db)
        .await?;
    }

    let users = [
        (ALICE, "Alice Admin", "alice@example.com", Some(ADMIN_ROLE)),
        (BOB, "Bob Editor", "bob@example.com", Some(EDITOR_ROLE)),
        (CAROL, "Carol Viewer", "carol@example.com", Some(VIEWER_ROLE)),
        (DAVE, "Dave Guest", "dave@example.org", None),
    ];
    let password = hash_password(PASSWORD).expect("Failed to hash password");
    for (id, name, email, role_id) in users {
        user::ActiveModel {
            id: Set(id),
            name: Set(name.to_string()),
            email: Set(email.to_string()),
            password: Set(password.clone()),
            img_url: Set(None),
            role_id: Set(role_id),
            phone: Set(None),
            about: Set(None),
            lang: Set(Some("en".to_string())),
        }
        .insert(db)
        .await?;
    }

    for (user_id, name) in [(ALICE, "laptop"), (ALICE, "phone"), (BOB, "laptop")] {
        access_token::ActiveModel {
            user_id: Set(user_id),
            name: Set(name.to_string()),
            token: Set(format!("{user_id}-{name}-digest")),
            ..Default::default()
        }
        .insert(db)
        .await?;
    }
    Ok(())
}

pub async fn setup_test_db() -> Result<DatabaseConnection, DbErr> {
    let db = Database::connect("sqlite::memory:").await?;
    create_tables(&db).await?;
    seed(&db).await?;
    Ok(db)
}

pub async fn setup_test_app() -> TestApp {
    let db = setup_test_db().await.expect("Failed to setup test database");
    let storage_dir = tempfile::tempdir().expect("Failed to create storage directory");
    let state = AppState::new(db.clone(), Settings::default())
        .with_storage(Arc::new(LocalFileStorage::new(storage_dir.path())));
    let (app, _openapi) = api_router(state);
    TestApp { app, db, storage_dir }
}

pub async fn setup_failing_storage_app() -> TestApp {
    let db = setup_test_db().await.expect("Failed to setup test database");
    let storage_dir = tempfile::tempdir().expect("Failed to create storage directory");
    let storage = FailingStorage { local: LocalFileStorage::new(storage_dir.path()) };
    let state = AppState::new(db.clone(), Settings::default()).with_storage(Arc::new(storage));
    let (app, _openapi) = api_router(state);
    TestApp { app, db, storage_dir }
}

/// One part of a multipart body.
pub enum Part<'a> {
    Text(&'a str, &'a str),
    File(&'a str, &'a str, &'a [u8]),
}

pub fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes());
                body.extend_from_slice(value.as_bytes());
            }
            Part::File(name, file_name, bytes) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(bytes);
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub fn multipart_request(method: &str, uri: &str, parts: &[Part<'_>]) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", format!("multipart/form-data; boundary={BOUNDARY}"))
        .body(Body::from(multipart_body(parts)))
        .unwrap()
}

pub fn json_request(method: &str, uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(body).unwrap()))
        .unwrap()
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().method("GET").uri(uri).body(Body::empty()).unwrap()
}

/// Send `request` and decode the JSON body.
pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if body.is_empty() { Value::Null } else { serde_json::from_slice(&body).unwrap() };
    (status, json)
}

pub fn names(body: &Value) -> Vec<String> {
    body["collection"]
        .as_array()
        .unwrap()
        .iter()
        .map(|record| record["name"].as_str().unwrap().to_string())
        .collect()
}
