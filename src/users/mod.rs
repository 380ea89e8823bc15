//! The `users` resource: listing through the generic query DSL plus
//! registration and profile updates with image uploads.

pub mod access_token;
pub mod handlers;
pub mod requests;
pub mod resource;
pub mod role;
pub mod tokens;
pub mod user;

pub use handlers::router;
pub use resource::{RoleResource, UserResource};
pub use tokens::DatabaseTokenIssuer;
