// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Adapter Registries
//!
//! One generic [`AdapterRegistry`] serves all six adapter facets of a bundle.
//! The facet is selected by a zero-sized marker implementing [`AdapterKind`]:
//!
//! | Marker | Facet | Record | Extra accessors |
//! |--------|-------|--------|-----------------|
//! | [`Conditions`] | `conditions` | [`MetadataRecord`] | - |
//! | [`Listeners`] | `listeners` | [`MetadataRecord`] | - |
//! | [`Connectors`] | `connectors` | [`ConnectorRecord`] | `is_on_chain` |
//! | [`Agents`] | `agents` | [`AgentRecord`] | `wallet`, `is_writer` |
//! | [`Evaluations`] | `evaluations` | [`MetadataRecord`] | - |
//! | [`FheGates`] | `fhe_gates` | [`MetadataRecord`] | - |
//!
//! Reads are total: unknown ids yield `false`, `""` or the zero principal.

use std::fmt;
use std::marker::PhantomData;

use serde::{Deserialize, Serialize};

use super::access_controls::AccessControls;
use super::bundle::ComponentHandle;
use super::errors::ComponentError;
use super::events::{ExtraColumns, RegistryEvent};
use super::lifecycle::Shared;
use super::policy::RegistryPolicy;
use super::principal::{Facet, Principal};
use super::registry::{Record, RecordId, RegistryCore};

/// Compile-time selector for one adapter facet.
pub trait AdapterKind: Send + Sync + Sized + 'static {
    type Record: Record + Serialize + for<'de> Deserialize<'de>;

    const FACET: Facet;

    fn into_handle(registry: Shared<AdapterRegistry<Self>>) -> ComponentHandle;

    fn from_handle(handle: &ComponentHandle) -> Option<Shared<AdapterRegistry<Self>>>;
}

macro_rules! adapter_kind {
    ($(#[$doc:meta])* $name:ident, $record:ty, $facet:expr, $variant:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub struct $name;

        impl AdapterKind for $name {
            type Record = $record;

            const FACET: Facet = $facet;

            fn into_handle(registry: Shared<AdapterRegistry<Self>>) -> ComponentHandle {
                ComponentHandle::$variant(registry)
            }

            fn from_handle(handle: &ComponentHandle) -> Option<Shared<AdapterRegistry<Self>>> {
                match handle {
                    ComponentHandle::$variant(registry) => Some(registry.clone()),
                    _ => None,
                }
            }
        }
    };
}

adapter_kind!(
    /// Trigger predicates ("temp>30").
    Conditions, MetadataRecord, Facet::Conditions, Conditions
);
adapter_kind!(Listeners, MetadataRecord, Facet::Listeners, Listeners);
adapter_kind!(
    /// On-chain and off-chain connectors.
    Connectors, ConnectorRecord, Facet::Connectors, Connectors
);
adapter_kind!(Agents, AgentRecord, Facet::Agents, Agents);
adapter_kind!(Evaluations, MetadataRecord, Facet::Evaluations, Evaluations);
adapter_kind!(
    /// FHE gates. Encryption is a capability flag only.
    FheGates, MetadataRecord, Facet::FheGates, FheGates
);

/// Record shape shared by conditions, listeners, evaluations and FHE gates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataRecord {
    pub id: RecordId,
    pub metadata: String,
    pub encrypted: bool,
}

impl MetadataRecord {
    pub fn new(id: impl Into<RecordId>, metadata: impl Into<String>, encrypted: bool) -> Self {
        Self {
            id: id.into(),
            metadata: metadata.into(),
            encrypted,
        }
    }
}

impl Record for MetadataRecord {
    fn id(&self) -> &RecordId {
        &self.id
    }

    fn metadata(&self) -> &str {
        &self.metadata
    }

    fn is_encrypted(&self) -> bool {
        self.encrypted
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectorRecord {
    pub id: RecordId,
    pub metadata: String,
    pub encrypted: bool,
    /// `false` for off-chain (HTTP) connectors.
    pub on_chain: bool,
}

impl ConnectorRecord {
    pub fn new(
        id: impl Into<RecordId>,
        metadata: impl Into<String>,
        encrypted: bool,
        on_chain: bool,
    ) -> Self {
        Self {
            id: id.into(),
            metadata: metadata.into(),
            encrypted,
            on_chain,
        }
    }
}

impl Record for ConnectorRecord {
    fn id(&self) -> &RecordId {
        &self.id
    }

    fn metadata(&self) -> &str {
        &self.metadata
    }

    fn is_encrypted(&self) -> bool {
        self.encrypted
    }

    fn extra_columns(records: &[Self]) -> ExtraColumns {
        ExtraColumns::Connector {
            on_chain: records.iter().map(|r| r.on_chain).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentRecord {
    pub id: RecordId,
    pub metadata: String,
    pub encrypted: bool,
    pub wallet: Principal,
    pub writer: bool,
}

impl AgentRecord {
    pub fn new(
        id: impl Into<RecordId>,
        metadata: impl Into<String>,
        encrypted: bool,
        wallet: Principal,
        writer: bool,
    ) -> Self {
        Self {
            id: id.into(),
            metadata: metadata.into(),
            encrypted,
            wallet,
            writer,
        }
    }
}

impl Record for AgentRecord {
    fn id(&self) -> &RecordId {
        &self.id
    }

    fn metadata(&self) -> &str {
        &self.metadata
    }

    fn is_encrypted(&self) -> bool {
        self.encrypted
    }

    fn extra_columns(records: &[Self]) -> ExtraColumns {
        ExtraColumns::Agent {
            wallets: records.iter().map(|r| r.wallet).collect(),
            writers: records.iter().map(|r| r.writer).collect(),
        }
    }
}

/// Keyed adapter store for the facet selected by `K`.
pub struct AdapterRegistry<K: AdapterKind> {
    core: RegistryCore<K::Record>,
    _kind: PhantomData<fn() -> K>,
}

impl<K: AdapterKind> fmt::Debug for AdapterRegistry<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdapterRegistry")
            .field("facet", &K::FACET)
            .field("address", &self.core.address())
            .field("records", &self.core.len())
            .finish()
    }
}

impl<K: AdapterKind> AdapterRegistry<K> {
    pub fn new(address: Principal, deployer: Principal, policy: RegistryPolicy) -> Self {
        Self {
            core: RegistryCore::new(K::FACET, address, deployer, policy),
            _kind: PhantomData,
        }
    }

    pub fn initialize(
        &mut self,
        caller: Principal,
        factory: Principal,
        access_controls: Shared<AccessControls>,
        storage: Principal,
    ) -> Result<(), ComponentError> {
        self.core.initialize(caller, factory, access_controls, storage)
    }

    pub fn upsert_batch(
        &mut self,
        caller: Principal,
        records: Vec<K::Record>,
    ) -> Result<Option<RegistryEvent>, ComponentError> {
        self.core.upsert_batch(caller, records)
    }

    pub fn remove_batch(
        &mut self,
        caller: Principal,
        ids: Vec<RecordId>,
    ) -> Result<Option<RegistryEvent>, ComponentError> {
        self.core.remove_batch(caller, ids)
    }

    /// Fails exactly when `upsert_batch`/`remove_batch` would fail for `caller`.
    pub fn authorize(&self, caller: Principal) -> Result<(), ComponentError> {
        self.core.authorize(caller, "write adapters")
    }

    pub fn is_encrypted(&self, id: &[u8]) -> bool {
        self.core.is_encrypted(id)
    }

    pub fn metadata(&self, id: &[u8]) -> String {
        self.core.metadata(id)
    }

    pub fn record(&self, id: &[u8]) -> Option<&K::Record> {
        self.core.get(id)
    }

    pub fn contains(&self, id: &[u8]) -> bool {
        self.core.contains(id)
    }

    pub fn ids(&self) -> Vec<RecordId> {
        self.core.ids()
    }

    pub fn len(&self) -> usize {
        self.core.len()
    }

    pub fn is_empty(&self) -> bool {
        self.core.is_empty()
    }

    pub fn address(&self) -> Principal {
        self.core.address()
    }

    pub fn storage(&self) -> Principal {
        self.core.storage()
    }

    pub fn is_initialized(&self) -> bool {
        self.core.is_initialized()
    }
}

impl AdapterRegistry<Connectors> {
    pub fn is_on_chain(&self, id: &[u8]) -> bool {
        self.core.get(id).is_some_and(|c| c.on_chain)
    }
}

impl AdapterRegistry<Agents> {
    /// Zero principal for unknown agents.
    pub fn wallet(&self, id: &[u8]) -> Principal {
        self.core.get(id).map(|a| a.wallet).unwrap_or(Principal::ZERO)
    }

    pub fn is_writer(&self, id: &[u8]) -> bool {
        self.core.get(id).is_some_and(|a| a.writer)
    }
}
