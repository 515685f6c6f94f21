// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Domain Repository Interfaces
//!
//! Persistence contract for deployed bundles. The interface lives in the
//! domain layer; implementations live in `crate::infrastructure::repositories`.
//!
//! | Trait | Aggregate | Implementations |
//! |-------|-----------|----------------|
//! | `BundleRepository` | `Bundle` | `InMemoryBundleRepository` |
//!
//! Bundles are append-only and grouped per creator. Index `i` of a creator's
//! list holds the bundle with sequence number `i + 1`.

use async_trait::async_trait;

use crate::domain::bundle::Bundle;
use crate::domain::principal::{BundleId, Principal};

/// Repository interface for Bundle aggregates
#[async_trait]
pub trait BundleRepository: Send + Sync {
    /// Append a bundle to its creator's list.
    ///
    /// Fails with `Conflict` if `bundle.sequence_number` is not the next
    /// number for the creator, or if the id is already taken.
    async fn append(&self, bundle: &Bundle) -> Result<(), RepositoryError>;

    /// Number of bundles deployed by `creator`
    async fn count_by_creator(&self, creator: Principal) -> Result<u64, RepositoryError>;

    /// Bundle at zero-based `index` in the creator's list
    async fn find_by_creator_index(
        &self,
        creator: Principal,
        index: u64,
    ) -> Result<Option<Bundle>, RepositoryError>;

    async fn find_by_id(&self, id: &BundleId) -> Result<Option<Bundle>, RepositoryError>;

    /// All bundles of `creator`, oldest first
    async fn list_by_creator(&self, creator: Principal) -> Result<Vec<Bundle>, RepositoryError>;
}

/// Repository errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    #[error("Conflict: {0}")]
    Conflict(String),
}
