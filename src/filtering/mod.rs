//! # List Query DSL
//!
//! Translates list query parameters into database reads. The pipeline is linear:
//!
//! 1. [`RequestParams`] folds the bracketed query string into a tree
//! 2. [`QuerySpec::parse`] extracts `take, page, order, select, where, where_not,
//!    or_where, search, with`, ignoring anything else
//! 3. [`build_filter_condition`] turns the filter maps into one condition
//! 4. [`expand`] turns `with` into a [`RelationPlan`]
//! 5. [`apply_order`] and [`compute_skip`] window the result
//!
//! ## Query Parameter Examples
//!
//! ```rust,ignore
//! // Equality, IN and IS NULL
//! GET /api/users?where[name]=Ann&where[id]=1,2,3&where[deleted_at]=
//!
//! // Negated and OR-ed filters
//! GET /api/users?where_not[role_id]=1&or_where[email]=ann@example.com
//!
//! // Ordering, shared direction
//! GET /api/users?order[by]=name,id&order[dir]=desc
//!
//! // Relations and counts
//! GET /api/users?with=role,tokens.count
//!
//! // Pagination; take=0 returns every row
//! GET /api/users?take=10&page=3
//! ```

pub mod conditions;
pub mod pagination;
pub mod params;
pub mod query_parser;
pub mod relations;
pub mod sort;

pub use conditions::{FilterBuilder, FilterMode, Predicate, build_filter_condition, is_valid_field_name, like_condition};
pub use pagination::{ListResponse, compute_skip};
pub use params::{ParamValue, RequestParams};
pub use query_parser::{ListDefaults, OrderSpec, QuerySpec};
pub use relations::{RelationDirective, RelationPlan, expand, parse_token};
pub use sort::{SortDirection, apply_order};
