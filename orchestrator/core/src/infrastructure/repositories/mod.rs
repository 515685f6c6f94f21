// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Repository Implementations
//!
//! Infrastructure implementations of the repository abstractions defined in
//! the domain layer.
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure
//! - **Purpose:** Persist and retrieve deployed bundles
//! - **Pattern:** Repository (DDD), Adapter (Hexagonal Architecture)
//!
//! # Available Implementations
//!
//! - **InMemoryBundleRepository** - per-creator lists plus an id index,
//!   thread-safe and ephemeral

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::domain::bundle::Bundle;
use crate::domain::principal::{BundleId, Principal};
use crate::domain::repository::{BundleRepository, RepositoryError};

#[derive(Default)]
struct BundleTables {
    by_creator: HashMap<Principal, Vec<Bundle>>,
    by_id: HashMap<BundleId, (Principal, usize)>,
}

#[derive(Clone, Default)]
pub struct InMemoryBundleRepository {
    tables: Arc<RwLock<BundleTables>>,
}

impl InMemoryBundleRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BundleRepository for InMemoryBundleRepository {
    async fn append(&self, bundle: &Bundle) -> Result<(), RepositoryError> {
        let mut tables = self.tables.write();
        if tables.by_id.contains_key(&bundle.id) {
            return Err(RepositoryError::Conflict(format!(
                "bundle id {} already recorded",
                bundle.id
            )));
        }

        let list = tables.by_creator.entry(bundle.creator).or_default();
        let expected = list.len() as u64 + 1;
        if bundle.sequence_number != expected {
            return Err(RepositoryError::Conflict(format!(
                "creator {} expects sequence {}, got {}",
                bundle.creator, expected, bundle.sequence_number
            )));
        }

        let index = list.len();
        list.push(bundle.clone());
        tables.by_id.insert(bundle.id.clone(), (bundle.creator, index));
        Ok(())
    }

    async fn count_by_creator(&self, creator: Principal) -> Result<u64, RepositoryError> {
        let tables = self.tables.read();
        Ok(tables.by_creator.get(&creator).map_or(0, |l| l.len() as u64))
    }

    async fn find_by_creator_index(
        &self,
        creator: Principal,
        index: u64,
    ) -> Result<Option<Bundle>, RepositoryError> {
        let tables = self.tables.read();
        let bundle = usize::try_from(index)
            .ok()
            .and_then(|i| tables.by_creator.get(&creator)?.get(i))
            .cloned();
        Ok(bundle)
    }

    async fn find_by_id(&self, id: &BundleId) -> Result<Option<Bundle>, RepositoryError> {
        let tables = self.tables.read();
        let bundle = tables
            .by_id
            .get(id)
            .and_then(|(creator, index)| tables.by_creator.get(creator)?.get(*index))
            .cloned();
        Ok(bundle)
    }

    async fn list_by_creator(&self, creator: Principal) -> Result<Vec<Bundle>, RepositoryError> {
        let tables = self.tables.read();
        Ok(tables.by_creator.get(&creator).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::bundle::{derive_bundle_id, BundleComponents};
    use crate::domain::principal::Facet;
    use chrono::Utc;

    fn bundle(creator: Principal, sequence_number: u64) -> Bundle {
        let deployed_at = Utc::now();
        Bundle {
            id: derive_bundle_id(creator, deployed_at, sequence_number),
            creator,
            sequence_number,
            components: BundleComponents::from_array(Facet::ALL.map(|f| {
                Principal::from_label(&format!("{creator}-{sequence_number}-{f}"))
            })),
            deployed_at,
        }
    }

    #[tokio::test]
    async fn test_append_and_lookup() {
        let repo = InMemoryBundleRepository::new();
        let alice = Principal::from_label("alice");
        let first = bundle(alice, 1);
        let second = bundle(alice, 2);
        repo.append(&first).await.unwrap();
        repo.append(&second).await.unwrap();

        assert_eq!(repo.count_by_creator(alice).await.unwrap(), 2);
        assert_eq!(repo.find_by_creator_index(alice, 1).await.unwrap(), Some(second.clone()));
        assert_eq!(repo.find_by_creator_index(alice, 2).await.unwrap(), None);
        assert_eq!(repo.find_by_id(&first.id).await.unwrap(), Some(first.clone()));
        assert_eq!(repo.list_by_creator(alice).await.unwrap(), vec![first, second]);
        assert_eq!(repo.count_by_creator(Principal::from_label("bob")).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_rejects_out_of_order_sequence() {
        let repo = InMemoryBundleRepository::new();
        let alice = Principal::from_label("alice");
        let err = repo.append(&bundle(alice, 2)).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
        assert_eq!(repo.count_by_creator(alice).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_rejects_duplicate_id() {
        let repo = InMemoryBundleRepository::new();
        let alice = Principal::from_label("alice");
        let first = bundle(alice, 1);
        repo.append(&first).await.unwrap();

        let mut clash = bundle(Principal::from_label("bob"), 1);
        clash.id = first.id.clone();
        assert!(matches!(repo.append(&clash).await, Err(RepositoryError::Conflict(_))));
    }
}
