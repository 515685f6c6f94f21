// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Bundle Aggregate
//!
//! A bundle ("nibble") is nine cooperating component instances plus identity
//! metadata. This module holds:
//!
//! - [`BundleComponents`]: the nine addresses, in event order
//! - [`Bundle`]: the persisted deployment record
//! - [`ContractInfo`]: the per-component shape indexers persist
//! - [`WiredBundle`]: live handles to the nine instances, plus the two-phase
//!   instantiate / wire protocol
//! - [`ComponentHandle`]: type-erased handle stored by the component host

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::access_controls::AccessControls;
use super::adapter::{
    AdapterRegistry, Agents, Conditions, Connectors, Evaluations, FheGates, Listeners,
};
use super::errors::ComponentError;
use super::lifecycle::{shared, Shared};
use super::policy::RegistryPolicy;
use super::principal::{BundleId, Facet, Principal};
use super::storage::{RegistryHandles, Storage};
use super::workflow::WorkflowRegistry;

/// Addresses of the nine components of one bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleComponents {
    pub storage: Principal,
    pub listeners: Principal,
    pub conditions: Principal,
    pub evaluations: Principal,
    pub agents: Principal,
    pub connectors: Principal,
    pub fhe_gates: Principal,
    pub access_controls: Principal,
    pub workflows: Principal,
}

impl BundleComponents {
    /// Build from an array in [`Facet::ALL`] order.
    pub fn from_array(addresses: [Principal; 9]) -> Self {
        let [
            storage,
            listeners,
            conditions,
            evaluations,
            agents,
            connectors,
            fhe_gates,
            access_controls,
            workflows,
        ] = addresses;
        Self {
            storage,
            listeners,
            conditions,
            evaluations,
            agents,
            connectors,
            fhe_gates,
            access_controls,
            workflows,
        }
    }

    /// Addresses in [`Facet::ALL`] order, as carried by `BundleDeployed`.
    pub fn as_array(&self) -> [Principal; 9] {
        Facet::ALL.map(|facet| self.get(facet))
    }

    pub fn get(&self, facet: Facet) -> Principal {
        match facet {
            Facet::Storage => self.storage,
            Facet::Listeners => self.listeners,
            Facet::Conditions => self.conditions,
            Facet::Evaluations => self.evaluations,
            Facet::Agents => self.agents,
            Facet::Connectors => self.connectors,
            Facet::FheGates => self.fhe_gates,
            Facet::AccessControls => self.access_controls,
            Facet::Workflows => self.workflows,
        }
    }

    pub fn contract_infos(&self) -> Vec<ContractInfo> {
        Facet::ALL
            .iter()
            .map(|&facet| ContractInfo {
                name: facet.contract_name().to_string(),
                address: self.get(facet),
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractInfo {
    pub name: String,
    pub address: Principal,
}

/// One successful deployment, as persisted by the bundle repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bundle {
    pub id: BundleId,
    pub creator: Principal,
    /// 1-based, per creator.
    pub sequence_number: u64,
    pub components: BundleComponents,
    pub deployed_at: DateTime<Utc>,
}

/// `sha256(creator || timestamp_millis_be || sequence_be)`.
pub fn derive_bundle_id(
    creator: Principal,
    deployed_at: DateTime<Utc>,
    sequence_number: u64,
) -> BundleId {
    let mut hasher = Sha256::new();
    hasher.update(creator.as_bytes());
    hasher.update(deployed_at.timestamp_millis().to_be_bytes());
    hasher.update(sequence_number.to_be_bytes());
    BundleId::new(hasher.finalize().to_vec())
}

/// Type-erased live component, keyed by address in the component host.
#[derive(Debug, Clone)]
pub enum ComponentHandle {
    Storage(Shared<Storage>),
    Listeners(Shared<AdapterRegistry<Listeners>>),
    Conditions(Shared<AdapterRegistry<Conditions>>),
    Evaluations(Shared<AdapterRegistry<Evaluations>>),
    Agents(Shared<AdapterRegistry<Agents>>),
    Connectors(Shared<AdapterRegistry<Connectors>>),
    FheGates(Shared<AdapterRegistry<FheGates>>),
    AccessControls(Shared<AccessControls>),
    Workflows(Shared<WorkflowRegistry>),
}

impl ComponentHandle {
    pub fn facet(&self) -> Facet {
        match self {
            ComponentHandle::Storage(_) => Facet::Storage,
            ComponentHandle::Listeners(_) => Facet::Listeners,
            ComponentHandle::Conditions(_) => Facet::Conditions,
            ComponentHandle::Evaluations(_) => Facet::Evaluations,
            ComponentHandle::Agents(_) => Facet::Agents,
            ComponentHandle::Connectors(_) => Facet::Connectors,
            ComponentHandle::FheGates(_) => Facet::FheGates,
            ComponentHandle::AccessControls(_) => Facet::AccessControls,
            ComponentHandle::Workflows(_) => Facet::Workflows,
        }
    }
}

/// Live handles to the nine components of one bundle.
#[derive(Debug, Clone)]
pub struct WiredBundle {
    pub components: BundleComponents,
    pub storage: Shared<Storage>,
    pub listeners: Shared<AdapterRegistry<Listeners>>,
    pub conditions: Shared<AdapterRegistry<Conditions>>,
    pub evaluations: Shared<AdapterRegistry<Evaluations>>,
    pub agents: Shared<AdapterRegistry<Agents>>,
    pub connectors: Shared<AdapterRegistry<Connectors>>,
    pub fhe_gates: Shared<AdapterRegistry<FheGates>>,
    pub access_controls: Shared<AccessControls>,
    pub workflows: Shared<WorkflowRegistry>,
}

impl WiredBundle {
    /// Phase one: construct every component at its address with `deployer`
    /// recorded. Nothing is wired.
    pub fn instantiate(
        components: &BundleComponents,
        deployer: Principal,
        policy: RegistryPolicy,
    ) -> Self {
        Self {
            components: *components,
            storage: shared(Storage::new(components.storage, deployer, policy)),
            listeners: shared(AdapterRegistry::new(components.listeners, deployer, policy)),
            conditions: shared(AdapterRegistry::new(components.conditions, deployer, policy)),
            evaluations: shared(AdapterRegistry::new(components.evaluations, deployer, policy)),
            agents: shared(AdapterRegistry::new(components.agents, deployer, policy)),
            connectors: shared(AdapterRegistry::new(components.connectors, deployer, policy)),
            fhe_gates: shared(AdapterRegistry::new(components.fhe_gates, deployer, policy)),
            access_controls: shared(AccessControls::new(components.access_controls, deployer)),
            workflows: shared(WorkflowRegistry::new(components.workflows, deployer, policy)),
        }
    }

    /// Phase two: initialize AccessControls, then Storage, then every
    /// registry, all with `caller` as both initializer and factory reference.
    ///
    /// Stops at the first failure and reports the facet that failed. The
    /// instances are then partially wired and must be discarded.
    pub fn wire(&self, caller: Principal, admin: Principal) -> Result<(), (Facet, ComponentError)> {
        self.access_controls
            .write()
            .initialize(caller, caller, admin)
            .map_err(|e| (Facet::AccessControls, e))?;

        self.storage
            .write()
            .initialize(caller, caller, self.access_controls.clone(), self.registry_handles())
            .map_err(|e| (Facet::Storage, e))?;

        let storage = self.components.storage;
        let acl = &self.access_controls;
        self.listeners
            .write()
            .initialize(caller, caller, acl.clone(), storage)
            .map_err(|e| (Facet::Listeners, e))?;
        self.conditions
            .write()
            .initialize(caller, caller, acl.clone(), storage)
            .map_err(|e| (Facet::Conditions, e))?;
        self.evaluations
            .write()
            .initialize(caller, caller, acl.clone(), storage)
            .map_err(|e| (Facet::Evaluations, e))?;
        self.agents
            .write()
            .initialize(caller, caller, acl.clone(), storage)
            .map_err(|e| (Facet::Agents, e))?;
        self.connectors
            .write()
            .initialize(caller, caller, acl.clone(), storage)
            .map_err(|e| (Facet::Connectors, e))?;
        self.fhe_gates
            .write()
            .initialize(caller, caller, acl.clone(), storage)
            .map_err(|e| (Facet::FheGates, e))?;
        self.workflows
            .write()
            .initialize(caller, caller, acl.clone(), storage)
            .map_err(|e| (Facet::Workflows, e))?;
        Ok(())
    }

    pub fn registry_handles(&self) -> RegistryHandles {
        RegistryHandles {
            conditions: self.conditions.clone(),
            listeners: self.listeners.clone(),
            connectors: self.connectors.clone(),
            agents: self.agents.clone(),
            evaluations: self.evaluations.clone(),
            fhe_gates: self.fhe_gates.clone(),
            workflows: self.workflows.clone(),
        }
    }

    /// `(address, handle)` pairs in [`Facet::ALL`] order.
    pub fn handles(&self) -> Vec<(Principal, ComponentHandle)> {
        let c = &self.components;
        vec![
            (c.storage, ComponentHandle::Storage(self.storage.clone())),
            (c.listeners, ComponentHandle::Listeners(self.listeners.clone())),
            (c.conditions, ComponentHandle::Conditions(self.conditions.clone())),
            (c.evaluations, ComponentHandle::Evaluations(self.evaluations.clone())),
            (c.agents, ComponentHandle::Agents(self.agents.clone())),
            (c.connectors, ComponentHandle::Connectors(self.connectors.clone())),
            (c.fhe_gates, ComponentHandle::FheGates(self.fhe_gates.clone())),
            (c.access_controls, ComponentHandle::AccessControls(self.access_controls.clone())),
            (c.workflows, ComponentHandle::Workflows(self.workflows.clone())),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn components() -> BundleComponents {
        BundleComponents::from_array(Facet::ALL.map(|f| Principal::from_label(f.as_str())))
    }

    #[test]
    fn test_array_order_matches_facets() {
        let c = components();
        let array = c.as_array();
        for facet in Facet::ALL {
            assert_eq!(array[facet.position()], c.get(facet));
        }
        assert_eq!(BundleComponents::from_array(array), c);
    }

    #[test]
    fn test_contract_infos_use_indexer_names() {
        let infos = components().contract_infos();
        let names: Vec<&str> = infos.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "NibbleStorage",
                "NibbleListeners",
                "NibbleConditions",
                "NibbleEvaluations",
                "NibbleAgents",
                "NibbleConnectors",
                "NibbleFHEGates",
                "NibbleAccessControls",
                "NibbleWorkflows",
            ]
        );
        assert_eq!(infos[7].address, Principal::from_label("access_controls"));
    }

    #[test]
    fn test_bundle_id_depends_on_every_input() {
        let alice = Principal::from_label("alice");
        let bob = Principal::from_label("bob");
        let t0 = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();
        let t1 = Utc.timestamp_millis_opt(1_700_000_000_001).unwrap();

        let base = derive_bundle_id(alice, t0, 1);
        assert_eq!(base, derive_bundle_id(alice, t0, 1));
        assert_eq!(base.as_bytes().len(), 32);
        assert_ne!(base, derive_bundle_id(bob, t0, 1));
        assert_ne!(base, derive_bundle_id(alice, t1, 1));
        assert_ne!(base, derive_bundle_id(alice, t0, 2));
    }

    #[test]
    fn test_wire_initializes_every_component() {
        let factory = Principal::from_label("factory");
        let admin = Principal::from_label("admin");
        let bundle = WiredBundle::instantiate(&components(), factory, RegistryPolicy::default());
        bundle.wire(factory, admin).unwrap();

        assert!(bundle.access_controls.read().is_initialized());
        assert!(bundle.storage.read().is_initialized());
        assert!(bundle.workflows.read().is_initialized());
        assert!(bundle.fhe_gates.read().is_initialized());
        assert_eq!(bundle.access_controls.read().admin(), admin);
        assert_eq!(bundle.conditions.read().storage(), bundle.components.storage);

        let handles = bundle.handles();
        let facets: Vec<Facet> = handles.iter().map(|(_, h)| h.facet()).collect();
        assert_eq!(facets, Facet::ALL.to_vec());
    }

    #[test]
    fn test_wire_reports_failing_facet() {
        let factory = Principal::from_label("factory");
        let bundle = WiredBundle::instantiate(&components(), factory, RegistryPolicy::default());
        let err = bundle.wire(factory, Principal::ZERO).unwrap_err();
        assert_eq!(err, (Facet::AccessControls, ComponentError::AdminCannotBeZero));
        assert!(!bundle.storage.read().is_initialized());
    }

    #[test]
    fn test_second_wire_fails_on_first_component() {
        let factory = Principal::from_label("factory");
        let bundle = WiredBundle::instantiate(&components(), factory, RegistryPolicy::default());
        bundle.wire(factory, Principal::from_label("admin")).unwrap();
        let err = bundle.wire(factory, Principal::from_label("admin")).unwrap_err();
        assert_eq!(
            err,
            (
                Facet::AccessControls,
                ComponentError::AlreadyInitialized {
                    facet: Facet::AccessControls
                }
            )
        );

        let stranger = Principal::from_label("stranger");
        let err = bundle.wire(stranger, stranger).unwrap_err();
        assert!(matches!(err.1, ComponentError::InvalidInitializer { .. }));
    }
}
