//! # Route Modules
//!
//! Each module defines an Axum Router for one API surface area.
//! Routers are assembled in `lib.rs` into the application.

pub mod applications;
pub mod leases;
pub mod notifications;
pub mod payments;

use serde::Deserialize;
use utoipa::ToSchema;

/// Pagination parameters for list endpoints.
#[derive(Debug, Deserialize, Default, ToSchema)]
pub struct PaginationParams {
    /// Maximum number of items to return (default: 100, max: 500).
    pub limit: Option<usize>,
    /// Number of items to skip (default: 0).
    pub offset: Option<usize>,
}

impl PaginationParams {
    const DEFAULT_LIMIT: usize = 100;
    const MAX_LIMIT: usize = 500;

    /// The limit to apply, clamped to the maximum.
    pub fn effective_limit(&self) -> usize {
        self.limit
            .unwrap_or(Self::DEFAULT_LIMIT)
            .min(Self::MAX_LIMIT)
    }

    /// The offset to apply.
    pub fn effective_offset(&self) -> usize {
        self.offset.unwrap_or(0)
    }

    /// Apply this pagination to an already-ordered vector.
    pub fn page<T>(&self, items: Vec<T>) -> Vec<T> {
        let offset = self.effective_offset().min(items.len());
        items
            .into_iter()
            .skip(offset)
            .take(self.effective_limit())
            .collect()
    }
}
