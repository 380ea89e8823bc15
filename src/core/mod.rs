// Generic resource operations: list, show and destroy driven by the query DSL

pub mod listing;
pub mod loader;
pub mod traits;

pub use listing::{ListOptions, RecordTransform, destroy_request, list_request, show_request};
pub use loader::{ResolvedPlan, ResolvedRelation, load_relations, resolve_plan};
pub use traits::{ApiResource, RelationKind, RelationSpec};
