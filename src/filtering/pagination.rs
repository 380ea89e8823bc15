use serde::Serialize;
use utoipa::ToSchema;

/// Rows to skip before the requested page.
///
/// Only a positive `take` windows the collection; `take <= 0` means every row and
/// never skips. The result never exceeds `i64::MAX`, the largest offset a
/// database will bind.
#[must_use]
pub fn compute_skip(page: u64, take: i64) -> u64 {
    match u64::try_from(take) {
        Ok(take) if take > 0 && page > 1 => (page - 1)
            .saturating_mul(take)
            .min(i64::MAX.unsigned_abs()),
        _ => 0,
    }
}

/// Paginated list body.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ListResponse {
    /// Records of the requested page
    #[schema(value_type = Vec<Object>)]
    pub collection: Vec<serde_json::Value>,
    pub page: u64,
    pub take: i64,
    /// Rows matching the filters, before windowing
    pub total: u64,
}
