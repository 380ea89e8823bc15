use serde::Deserialize;
use utoipa::ToSchema;

use crate::input::FormInput;
use crate::validation::{AlreadyExists, Exists, Rule, RuleSet};

/// Accepted upload extensions for `img_url`
pub const IMAGE_TYPES: &[&str] = &["png", "jpeg", "jpg"];

/// Fields a user payload may carry, in validation order
pub const USER_FIELDS: &[&str] = &[
    "name",
    "email",
    "img_url",
    "password",
    "confirmation",
    "role_id",
    "phone",
    "about",
    "lang",
];

/// Documented shape of a create/update payload.
///
/// Bodies may be JSON, `multipart/form-data` (required to upload `img_url`) or
/// URL-encoded; empty strings are read as `null`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UserPayload {
    pub name: String,
    pub email: String,
    /// Profile image; `null` on update removes the current one
    #[schema(value_type = Option<String>, format = Binary)]
    pub img_url: Option<String>,
    /// At least 8 characters
    pub password: String,
    /// Must match `password`
    pub confirmation: String,
    pub role_id: Option<i32>,
    #[schema(max_length = 64)]
    pub phone: Option<String>,
    pub about: Option<String>,
    /// Two-letter language code
    #[schema(max_length = 2)]
    pub lang: Option<String>,
}

fn shared_rules(ignore_id: Option<i32>) -> RuleSet {
    let mut rules = RuleSet::new();
    rules.insert("name".into(), vec![Rule::Required, Rule::String]);
    rules.insert(
        "email".into(),
        vec![
            Rule::Required,
            Rule::Email,
            Rule::AlreadyExists(AlreadyExists::new("users", ignore_id)),
        ],
    );
    rules.insert("img_url".into(), vec![Rule::Nullable, Rule::FileTypes(IMAGE_TYPES)]);
    rules.insert(
        "password".into(),
        vec![Rule::Required, Rule::Same("confirmation"), Rule::Password],
    );
    rules.insert(
        "role_id".into(),
        vec![Rule::Nullable, Rule::Exists(Exists::new("roles", "id"))],
    );
    rules.insert("phone".into(), vec![Rule::Nullable, Rule::String, Rule::Max(64)]);
    rules.insert("about".into(), vec![Rule::Nullable, Rule::String]);
    rules.insert("lang".into(), vec![Rule::Nullable, Rule::String, Rule::Max(2)]);
    rules
}

/// Rules for registering a user.
#[must_use]
pub fn store_rules() -> RuleSet {
    shared_rules(None)
}

/// Rules for updating user `user_id`, limited to the submitted fields.
///
/// The email may stay the user's own, and the password becomes optional.
#[must_use]
pub fn update_rules(input: &FormInput, user_id: i32) -> RuleSet {
    let mut rules = shared_rules(Some(user_id));
    rules.insert(
        "password".into(),
        vec![Rule::Nullable, Rule::Same("confirmation"), Rule::Password],
    );
    rules.insert("confirmation".into(), vec![Rule::Nullable, Rule::Same("password")]);
    rules.retain(|field, _| input.contains(field));
    rules
}
