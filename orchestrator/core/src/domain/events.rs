// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Domain Events
//!
//! Every state change a bundle component accepts is described by exactly one
//! event value, returned by the aggregate and published by the application
//! layer once the call has fully succeeded.
//!
//! | Enum | Emitted by |
//! |------|-----------|
//! | [`BundleEvent`] | `NibbleFactory::deploy_nibble` |
//! | [`AccessControlEvent`] | `AccessControls` role mutations |
//! | [`RegistryEvent`] | adapter and workflow registries (batch upsert / remove) |
//!
//! Batch events use the parallel-array encoding consumed by external
//! indexers: column `i` of every array describes input record `i`.

use serde::{Deserialize, Serialize};

use crate::domain::access_controls::Role;
use crate::domain::principal::{BundleId, Facet, Principal};
use crate::domain::registry::RecordId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BundleEvent {
    /// Shape consumed by indexers; `addresses` follows [`Facet::ALL`] order.
    BundleDeployed {
        addresses: [Principal; 9],
        id: BundleId,
        sequence_number: u64,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccessControlEvent {
    AdminChanged {
        access_controls: Principal,
        previous_admin: Principal,
        new_admin: Principal,
    },
    RoleGranted {
        access_controls: Principal,
        role: Role,
        principal: Principal,
        granted_by: Principal,
    },
    RoleRevoked {
        access_controls: Principal,
        role: Role,
        principal: Principal,
        revoked_by: Principal,
    },
}

/// Kind-specific columns of an upsert batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExtraColumns {
    None,
    Connector { on_chain: Vec<bool> },
    Agent { wallets: Vec<Principal>, writers: Vec<bool> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegistryEvent {
    RecordsUpserted {
        registry: Principal,
        facet: Facet,
        ids: Vec<RecordId>,
        metadata: Vec<String>,
        encrypted: Vec<bool>,
        extra: ExtraColumns,
        was_new: Vec<bool>,
    },
    RecordsRemoved {
        registry: Principal,
        facet: Facet,
        ids: Vec<RecordId>,
    },
}

impl RegistryEvent {
    pub fn registry(&self) -> Principal {
        match self {
            RegistryEvent::RecordsUpserted { registry, .. } => *registry,
            RegistryEvent::RecordsRemoved { registry, .. } => *registry,
        }
    }

    pub fn facet(&self) -> Facet {
        match self {
            RegistryEvent::RecordsUpserted { facet, .. } => *facet,
            RegistryEvent::RecordsRemoved { facet, .. } => *facet,
        }
    }

    pub fn ids(&self) -> &[RecordId] {
        match self {
            RegistryEvent::RecordsUpserted { ids, .. } => ids,
            RegistryEvent::RecordsRemoved { ids, .. } => ids,
        }
    }
}
