//! Query-string tree.
//!
//! List parameters use bracket notation (`where[name]=Ann`, `with[]=role`,
//! `where[id][]=1&where[id][]=2`). [`RequestParams`] folds them into an ordered
//! tree that keeps the order in which keys were first seen.

use axum::{extract::FromRequestParts, http::request::Parts};
use indexmap::IndexMap;
use std::convert::Infallible;

/// A node of the parameter tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    Scalar(String),
    List(Vec<String>),
    Map(IndexMap<String, ParamValue>),
}

impl ParamValue {
    #[must_use]
    pub fn as_scalar(&self) -> Option<&str> {
        match self {
            Self::Scalar(value) => Some(value),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_map(&self) -> Option<&IndexMap<String, ParamValue>> {
        match self {
            Self::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Scalar values of this node: itself, its items, or the scalar entries of a map
    #[must_use]
    pub fn to_list(&self) -> Vec<String> {
        match self {
            Self::Scalar(value) => vec![value.clone()],
            Self::List(items) => items.clone(),
            Self::Map(map) => map
                .values()
                .filter_map(|value| value.as_scalar().map(str::to_string))
                .collect(),
        }
    }
}

/// Split `where[id][]` into `["where", "id", ""]`.
///
/// A key with unbalanced brackets is kept whole.
fn key_segments(key: &str) -> Vec<&str> {
    let Some(open) = key.find('[') else {
        return vec![key];
    };
    if open == 0 {
        return vec![key];
    }

    let mut segments = vec![&key[..open]];
    let mut rest = &key[open..];
    while let Some(inner) = rest.strip_prefix('[') {
        let Some(close) = inner.find(']') else {
            return vec![key];
        };
        segments.push(&inner[..close]);
        rest = &inner[close + 1..];
    }
    if rest.is_empty() { segments } else { vec![key] }
}

fn insert(map: &mut IndexMap<String, ParamValue>, segments: &[&str], value: String) {
    let Some((&head, tail)) = segments.split_first() else {
        return;
    };

    match tail {
        [] => {
            map.insert(head.to_string(), ParamValue::Scalar(value));
        }
        [""] => {
            let entry = map
                .entry(head.to_string())
                .or_insert_with(|| ParamValue::List(Vec::new()));
            match entry {
                ParamValue::List(items) => items.push(value),
                other => *other = ParamValue::List(vec![value]),
            }
        }
        [next, ..] if !next.is_empty() => {
            let entry = map
                .entry(head.to_string())
                .or_insert_with(|| ParamValue::Map(IndexMap::new()));
            if !matches!(entry, ParamValue::Map(_)) {
                *entry = ParamValue::Map(IndexMap::new());
            }
            if let ParamValue::Map(inner) = entry {
                insert(inner, tail, value);
            }
        }
        _ => {
            tracing::debug!(key = head, "Ignoring list parameter with nested keys");
        }
    }
}

/// Ordered tree of query-string parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestParams {
    values: IndexMap<String, ParamValue>,
}

impl RequestParams {
    #[must_use]
    pub fn from_query(query: &str) -> Self {
        let mut values = IndexMap::new();
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            insert(&mut values, &key_segments(&key), value.into_owned());
        }
        Self { values }
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.values.get(name)
    }

    #[must_use]
    pub fn scalar(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(ParamValue::as_scalar)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<S> FromRequestParts<S> for RequestParams
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts.uri.query().map(Self::from_query).unwrap_or_default())
    }
}
