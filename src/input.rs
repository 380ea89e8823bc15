//! Mutation payload decoding.
//!
//! [`FormInput`] accepts JSON, `multipart/form-data` and URL-encoded bodies and
//! normalizes them into an ordered field map. Empty strings become
//! [`FormValue::Null`], which is how a client clears a field from an HTML form;
//! field names ending in `[]` collect into lists.

use axum::{
    body::Bytes,
    extract::{FromRequest, Multipart, Request},
    http::header::CONTENT_TYPE,
};
use indexmap::IndexMap;

use crate::errors::ApiError;
use crate::storage::UploadedFile;

/// A single decoded field value.
#[derive(Debug, Clone)]
pub enum FormValue {
    Null,
    Text(String),
    List(Vec<String>),
    File(UploadedFile),
}

impl FormValue {
    fn from_text(text: String) -> Self {
        if text.is_empty() { Self::Null } else { Self::Text(text) }
    }

    fn from_json(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::String(text) => Self::from_text(text),
            serde_json::Value::Bool(flag) => Self::Text(if flag { "1" } else { "0" }.to_string()),
            serde_json::Value::Number(number) => Self::Text(number.to_string()),
            serde_json::Value::Array(items) => Self::List(
                items
                    .into_iter()
                    .filter_map(|item| match item {
                        serde_json::Value::Null => None,
                        serde_json::Value::String(text) => Some(text),
                        other => Some(other.to_string()),
                    })
                    .collect(),
            ),
            object @ serde_json::Value::Object(_) => Self::Text(object.to_string()),
        }
    }

    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_file(&self) -> Option<&UploadedFile> {
        match self {
            Self::File(file) => Some(file),
            _ => None,
        }
    }
}

/// Ordered field map decoded from a request body.
#[derive(Debug, Clone, Default)]
pub struct FormInput {
    fields: IndexMap<String, FormValue>,
}

impl FormInput {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a field, appending to a list when the name ends in `[]`.
    pub fn insert(&mut self, name: &str, value: FormValue) {
        if let Some(base) = name.strip_suffix("[]") {
            let entry = self
                .fields
                .entry(base.to_string())
                .or_insert_with(|| FormValue::List(Vec::new()));
            match (entry, value) {
                (FormValue::List(items), FormValue::Text(text)) => items.push(text),
                (FormValue::List(_), FormValue::Null) => {}
                (slot, other) => *slot = other,
            }
        } else {
            self.fields.insert(name.to_string(), value);
        }
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FormValue> {
        self.fields.get(name)
    }

    /// Whether the field was submitted at all, null included
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    #[must_use]
    pub fn text(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(FormValue::as_text)
    }

    #[must_use]
    pub fn file(&self, name: &str) -> Option<&UploadedFile> {
        self.get(name).and_then(FormValue::as_file)
    }

    /// Keep only the named fields, preserving submission order.
    #[must_use]
    pub fn only(&self, names: &[&str]) -> Self {
        Self {
            fields: self
                .fields
                .iter()
                .filter(|(key, _)| names.contains(&key.as_str()))
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FormValue)> {
        self.fields.iter().map(|(key, value)| (key.as_str(), value))
    }

    /// Decode a JSON object body.
    ///
    /// # Errors
    ///
    /// Returns a 400 when the body is not a JSON object.
    pub fn from_json_slice(body: &[u8]) -> Result<Self, ApiError> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::new());
        }
        let object: IndexMap<String, serde_json::Value> = serde_json::from_slice(body)
            .map_err(|err| ApiError::bad_request(format!("Invalid JSON body: {err}")))?;

        let mut input = Self::new();
        for (key, value) in object {
            input.insert(&key, FormValue::from_json(value));
        }
        Ok(input)
    }

    /// Decode an `application/x-www-form-urlencoded` body.
    #[must_use]
    pub fn from_urlencoded(body: &[u8]) -> Self {
        let mut input = Self::new();
        for (key, value) in url::form_urlencoded::parse(body) {
            input.insert(&key, FormValue::from_text(value.into_owned()));
        }
        input
    }

    async fn from_multipart(mut multipart: Multipart) -> Result<Self, ApiError> {
        let mut input = Self::new();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|err| ApiError::bad_request(format!("Invalid multipart body: {err}")))?
        {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };

            if let Some(file_name) = field.file_name().map(str::to_string) {
                let content_type = field.content_type().map(str::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|err| ApiError::bad_request(format!("Invalid upload: {err}")))?;
                // Browsers send an empty part for an untouched file input
                let value = if file_name.is_empty() && bytes.is_empty() {
                    FormValue::Null
                } else {
                    FormValue::File(UploadedFile {
                        file_name: Some(file_name),
                        content_type,
                        bytes,
                    })
                };
                input.insert(&name, value);
            } else {
                let text = field
                    .text()
                    .await
                    .map_err(|err| ApiError::bad_request(format!("Invalid form field: {err}")))?;
                input.insert(&name, FormValue::from_text(text));
            }
        }
        Ok(input)
    }
}

impl<S> FromRequest<S> for FormInput
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let content_type = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();

        if content_type.starts_with("multipart/form-data") {
            let multipart = Multipart::from_request(req, state)
                .await
                .map_err(|err| ApiError::bad_request(err.body_text()))?;
            return Self::from_multipart(multipart).await;
        }

        let body = Bytes::from_request(req, state)
            .await
            .map_err(|err| ApiError::bad_request(err.body_text()))?;

        if content_type.starts_with("application/x-www-form-urlencoded") {
            Ok(Self::from_urlencoded(&body))
        } else {
            Self::from_json_slice(&body)
        }
    }
}
