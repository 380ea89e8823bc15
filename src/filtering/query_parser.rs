use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::pagination::compute_skip;
use super::params::{ParamValue, RequestParams};
use super::sort::SortDirection;

/// Listing defaults applied when a parameter is absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListDefaults {
    pub take: i64,
    pub order_by: Vec<String>,
    pub select: Vec<String>,
}

impl Default for ListDefaults {
    fn default() -> Self {
        Self {
            take: 25,
            order_by: vec!["id".to_string()],
            select: vec!["*".to_string()],
        }
    }
}

/// Requested ordering: every field shares one direction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderSpec {
    pub fields: Vec<String>,
    pub direction: SortDirection,
}

/// Everything a list or show request asked for, parsed once per request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuerySpec {
    pub select: Vec<String>,
    pub where_eq: IndexMap<String, String>,
    pub where_not: IndexMap<String, String>,
    pub or_where: IndexMap<String, String>,
    pub with: Vec<String>,
    pub order: OrderSpec,
    /// `<= 0` means unlimited
    pub take: i64,
    pub page: u64,
    pub skip: u64,
    pub search: Option<String>,
}

impl Default for QuerySpec {
    fn default() -> Self {
        Self::parse(&RequestParams::default(), &ListDefaults::default())
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

/// Flatten a filter map; list values are joined so they read as an `IN` set.
fn filter_map(params: &RequestParams, name: &str) -> IndexMap<String, String> {
    let Some(map) = params.get(name).and_then(ParamValue::as_map) else {
        return IndexMap::new();
    };
    map.iter()
        .filter_map(|(field, value)| match value {
            ParamValue::Scalar(value) => Some((field.clone(), value.clone())),
            ParamValue::List(items) => Some((field.clone(), items.join(","))),
            ParamValue::Map(_) => {
                tracing::debug!(param = name, field = %field, "Ignoring nested filter value");
                None
            }
        })
        .collect()
}

impl QuerySpec {
    /// Read the list parameters out of `params`, ignoring anything else.
    #[must_use]
    pub fn parse(params: &RequestParams, defaults: &ListDefaults) -> Self {
        let take = params
            .scalar("take")
            .and_then(|take| take.trim().parse::<i64>().ok())
            .unwrap_or(defaults.take);

        let page = params
            .scalar("page")
            .and_then(|page| page.trim().parse::<i64>().ok())
            .map_or(1, |page| u64::try_from(page.max(1)).unwrap_or(1));

        let select = match params.get("select") {
            Some(ParamValue::Scalar(value)) => split_list(value),
            Some(ParamValue::List(items)) => items.iter().flat_map(|item| split_list(item)).collect(),
            _ => Vec::new(),
        };
        let select = if select.is_empty() { defaults.select.clone() } else { select };

        let order = params.get("order").and_then(ParamValue::as_map);
        let fields = order
            .and_then(|order| order.get("by"))
            .and_then(ParamValue::as_scalar)
            .map(split_list)
            .filter(|fields| !fields.is_empty())
            .unwrap_or_else(|| defaults.order_by.clone());
        let direction = SortDirection::from_param(
            order
                .and_then(|order| order.get("dir"))
                .and_then(ParamValue::as_scalar),
        );

        let with = params.get("with").map(ParamValue::to_list).unwrap_or_default();

        let search = params
            .scalar("search")
            .map(str::trim)
            .filter(|term| !term.is_empty())
            .map(str::to_string);

        Self {
            select,
            where_eq: filter_map(params, "where"),
            where_not: filter_map(params, "where_not"),
            or_where: filter_map(params, "or_where"),
            with,
            order: OrderSpec { fields, direction },
            take,
            page,
            skip: compute_skip(page, take),
            search,
        }
    }

    /// Whether every column was requested
    #[must_use]
    pub fn selects_all(&self) -> bool {
        self.select.is_empty() || self.select.iter().any(|field| field == "*")
    }

    /// Whether a window applies to the collection
    #[must_use]
    pub fn is_windowed(&self) -> bool {
        self.take > 0
    }
}
