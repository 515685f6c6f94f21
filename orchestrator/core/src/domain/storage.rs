// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Storage Facade
//!
//! Fans batched adapter and workflow mutations out to the registries of one
//! bundle. Storage writes through with its own address, which every registry
//! of the bundle admits; the external caller must still pass the bundle's
//! writer predicate at the Storage boundary.
//!
//! A multi-registry batch is all-or-nothing: every touched registry is
//! write-locked and pre-authorized before the first record is applied.
//!
//! Lock order: Storage → registries (fixed order below) → AccessControls.

use serde::{Deserialize, Serialize};

use super::access_controls::AccessControls;
use super::adapter::{
    AdapterKind, AdapterRegistry, AgentRecord, Agents, Conditions, ConnectorRecord, Connectors,
    Evaluations, FheGates, Listeners, MetadataRecord,
};
use super::errors::ComponentError;
use super::events::RegistryEvent;
use super::lifecycle::{InitGuard, Shared};
use super::policy::RegistryPolicy;
use super::principal::{Facet, Principal};
use super::registry::RecordId;
use super::workflow::{WorkflowRecord, WorkflowRegistry};

/// References Storage receives at initialization.
#[derive(Debug, Clone)]
pub struct RegistryHandles {
    pub conditions: Shared<AdapterRegistry<Conditions>>,
    pub listeners: Shared<AdapterRegistry<Listeners>>,
    pub connectors: Shared<AdapterRegistry<Connectors>>,
    pub agents: Shared<AdapterRegistry<Agents>>,
    pub evaluations: Shared<AdapterRegistry<Evaluations>>,
    pub fhe_gates: Shared<AdapterRegistry<FheGates>>,
    pub workflows: Shared<WorkflowRegistry>,
}

impl RegistryHandles {
    fn addresses(&self) -> [(Facet, Principal); 7] {
        [
            (Facet::Conditions, self.conditions.read().address()),
            (Facet::Listeners, self.listeners.read().address()),
            (Facet::Connectors, self.connectors.read().address()),
            (Facet::Agents, self.agents.read().address()),
            (Facet::Evaluations, self.evaluations.read().address()),
            (Facet::FheGates, self.fhe_gates.read().address()),
            (Facet::Workflows, self.workflows.read().address()),
        ]
    }
}

/// Records to insert or overwrite, per adapter facet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModifyAdapters {
    pub conditions: Vec<MetadataRecord>,
    pub listeners: Vec<MetadataRecord>,
    pub connectors: Vec<ConnectorRecord>,
    pub agents: Vec<AgentRecord>,
    pub evaluations: Vec<MetadataRecord>,
    pub fhe_gates: Vec<MetadataRecord>,
}

impl ModifyAdapters {
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
            && self.listeners.is_empty()
            && self.connectors.is_empty()
            && self.agents.is_empty()
            && self.evaluations.is_empty()
            && self.fhe_gates.is_empty()
    }
}

/// Ids to delete, per adapter facet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveAdapters {
    pub conditions: Vec<RecordId>,
    pub listeners: Vec<RecordId>,
    pub connectors: Vec<RecordId>,
    pub agents: Vec<RecordId>,
    pub evaluations: Vec<RecordId>,
    pub fhe_gates: Vec<RecordId>,
}

impl RemoveAdapters {
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
            && self.listeners.is_empty()
            && self.connectors.is_empty()
            && self.agents.is_empty()
            && self.evaluations.is_empty()
            && self.fhe_gates.is_empty()
    }
}

#[derive(Debug)]
pub struct Storage {
    address: Principal,
    guard: InitGuard,
    policy: RegistryPolicy,
    factory: Principal,
    access_controls: Option<Shared<AccessControls>>,
    registries: Option<RegistryHandles>,
}

impl Storage {
    pub fn new(address: Principal, deployer: Principal, policy: RegistryPolicy) -> Self {
        Self {
            address,
            guard: InitGuard::new(Facet::Storage, deployer),
            policy,
            factory: Principal::ZERO,
            access_controls: None,
            registries: None,
        }
    }

    pub fn initialize(
        &mut self,
        caller: Principal,
        factory: Principal,
        access_controls: Shared<AccessControls>,
        registries: RegistryHandles,
    ) -> Result<(), ComponentError> {
        self.guard.check(caller)?;
        if factory.is_zero() {
            return Err(invalid_reference("factory"));
        }
        if access_controls.read().address().is_zero() {
            return Err(invalid_reference("access_controls"));
        }
        for (facet, address) in registries.addresses() {
            if address.is_zero() {
                return Err(invalid_reference(facet.as_str()));
            }
        }

        self.factory = factory;
        self.access_controls = Some(access_controls);
        self.registries = Some(registries);
        self.guard.seal();
        Ok(())
    }

    /// Writer predicate applied to the external caller. Storage itself is
    /// never the caller here.
    pub fn authorize(&self, caller: Principal, action: &'static str) -> Result<(), ComponentError> {
        self.guard.ensure_initialized()?;
        let acl = self
            .access_controls
            .as_ref()
            .ok_or(ComponentError::NotInitialized { facet: Facet::Storage })?
            .read();
        let agent_writer = acl.is_agent_writer(caller);
        let human_writer = acl.is_human_writer(caller);
        drop(acl);

        if self.policy.write.permits(agent_writer, human_writer, false) {
            Ok(())
        } else {
            Err(ComponentError::Unauthorized {
                facet: Facet::Storage,
                caller,
                action,
            })
        }
    }

    /// Upsert every non-empty list into its registry. Returns one event per
    /// touched registry, in field order of [`ModifyAdapters`].
    pub fn add_or_modify_adapters_batch(
        &self,
        caller: Principal,
        batch: ModifyAdapters,
    ) -> Result<Vec<RegistryEvent>, ComponentError> {
        self.authorize(caller, "modify adapters")?;
        let registries = self.registries()?;

        let mut conditions = registries.conditions.write();
        let mut listeners = registries.listeners.write();
        let mut connectors = registries.connectors.write();
        let mut agents = registries.agents.write();
        let mut evaluations = registries.evaluations.write();
        let mut fhe_gates = registries.fhe_gates.write();

        let me = self.address;
        preflight(&*conditions, me, &batch.conditions)?;
        preflight(&*listeners, me, &batch.listeners)?;
        preflight(&*connectors, me, &batch.connectors)?;
        preflight(&*agents, me, &batch.agents)?;
        preflight(&*evaluations, me, &batch.evaluations)?;
        preflight(&*fhe_gates, me, &batch.fhe_gates)?;

        let mut events = Vec::new();
        upsert_into(&mut *conditions, me, batch.conditions, &mut events)?;
        upsert_into(&mut *listeners, me, batch.listeners, &mut events)?;
        upsert_into(&mut *connectors, me, batch.connectors, &mut events)?;
        upsert_into(&mut *agents, me, batch.agents, &mut events)?;
        upsert_into(&mut *evaluations, me, batch.evaluations, &mut events)?;
        upsert_into(&mut *fhe_gates, me, batch.fhe_gates, &mut events)?;
        Ok(events)
    }

    pub fn remove_adapters_batch(
        &self,
        caller: Principal,
        batch: RemoveAdapters,
    ) -> Result<Vec<RegistryEvent>, ComponentError> {
        self.authorize(caller, "remove adapters")?;
        let registries = self.registries()?;

        let mut conditions = registries.conditions.write();
        let mut listeners = registries.listeners.write();
        let mut connectors = registries.connectors.write();
        let mut agents = registries.agents.write();
        let mut evaluations = registries.evaluations.write();
        let mut fhe_gates = registries.fhe_gates.write();

        let me = self.address;
        preflight(&*conditions, me, &batch.conditions)?;
        preflight(&*listeners, me, &batch.listeners)?;
        preflight(&*connectors, me, &batch.connectors)?;
        preflight(&*agents, me, &batch.agents)?;
        preflight(&*evaluations, me, &batch.evaluations)?;
        preflight(&*fhe_gates, me, &batch.fhe_gates)?;

        let mut events = Vec::new();
        remove_from(&mut *conditions, me, batch.conditions, &mut events)?;
        remove_from(&mut *listeners, me, batch.listeners, &mut events)?;
        remove_from(&mut *connectors, me, batch.connectors, &mut events)?;
        remove_from(&mut *agents, me, batch.agents, &mut events)?;
        remove_from(&mut *evaluations, me, batch.evaluations, &mut events)?;
        remove_from(&mut *fhe_gates, me, batch.fhe_gates, &mut events)?;
        Ok(events)
    }

    pub fn add_or_modify_workflows(
        &self,
        caller: Principal,
        workflows: Vec<WorkflowRecord>,
    ) -> Result<Option<RegistryEvent>, ComponentError> {
        self.authorize(caller, "modify workflows")?;
        let registries = self.registries()?;
        let event = registries
            .workflows
            .write()
            .add_or_modify_workflows(self.address, workflows)?;
        Ok(event)
    }

    pub fn add_or_modify_workflow(
        &self,
        caller: Principal,
        workflow: WorkflowRecord,
    ) -> Result<Option<RegistryEvent>, ComponentError> {
        self.add_or_modify_workflows(caller, vec![workflow])
    }

    pub fn remove_workflows(
        &self,
        caller: Principal,
        ids: Vec<RecordId>,
    ) -> Result<Option<RegistryEvent>, ComponentError> {
        self.authorize(caller, "remove workflows")?;
        let registries = self.registries()?;
        let event = registries
            .workflows
            .write()
            .remove_workflows(self.address, ids)?;
        Ok(event)
    }

    pub fn remove_workflow(
        &self,
        caller: Principal,
        id: RecordId,
    ) -> Result<Option<RegistryEvent>, ComponentError> {
        self.remove_workflows(caller, vec![id])
    }

    pub fn address(&self) -> Principal {
        self.address
    }

    pub fn factory(&self) -> Principal {
        self.factory
    }

    pub fn is_initialized(&self) -> bool {
        self.guard.is_initialized()
    }

    /// Wired registry address for `facet`, or `None` before initialization
    /// and for non-registry facets.
    pub fn registry_address(&self, facet: Facet) -> Option<Principal> {
        self.registries.as_ref().and_then(|r| {
            r.addresses()
                .into_iter()
                .find(|(f, _)| *f == facet)
                .map(|(_, address)| address)
        })
    }

    fn registries(&self) -> Result<&RegistryHandles, ComponentError> {
        self.registries
            .as_ref()
            .ok_or(ComponentError::NotInitialized { facet: Facet::Storage })
    }
}

fn invalid_reference(reference: &'static str) -> ComponentError {
    ComponentError::InvalidReference {
        facet: Facet::Storage,
        reference,
    }
}

fn preflight<K: AdapterKind, T>(
    registry: &AdapterRegistry<K>,
    storage: Principal,
    items: &[T],
) -> Result<(), ComponentError> {
    if items.is_empty() {
        return Ok(());
    }
    registry.authorize(storage)
}

fn upsert_into<K: AdapterKind>(
    registry: &mut AdapterRegistry<K>,
    storage: Principal,
    records: Vec<K::Record>,
    events: &mut Vec<RegistryEvent>,
) -> Result<(), ComponentError> {
    if records.is_empty() {
        return Ok(());
    }
    events.extend(registry.upsert_batch(storage, records)?);
    Ok(())
}

fn remove_from<K: AdapterKind>(
    registry: &mut AdapterRegistry<K>,
    storage: Principal,
    ids: Vec<RecordId>,
    events: &mut Vec<RegistryEvent>,
) -> Result<(), ComponentError> {
    if ids.is_empty() {
        return Ok(());
    }
    events.extend(registry.remove_batch(storage, ids)?);
    Ok(())
}
