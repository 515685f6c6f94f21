// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Nibble Gateway Application Service
//!
//! Caller-facing entry points for deployed components. Each call resolves the
//! target component in the [`ComponentHost`], runs the domain operation under
//! the component's lock and publishes the resulting events only after the
//! operation succeeded. A rejected call publishes nothing.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, warn};

use crate::domain::access_controls::{AccessControls, Role};
use crate::domain::adapter::{AdapterKind, AdapterRegistry};
use crate::domain::errors::ComponentError;
use crate::domain::events::RegistryEvent;
use crate::domain::lifecycle::Shared;
use crate::domain::principal::{Facet, Principal};
use crate::domain::registry::RecordId;
use crate::domain::storage::{ModifyAdapters, RemoveAdapters, Storage};
use crate::domain::workflow::{WorkflowRecord, WorkflowRegistry};
use crate::infrastructure::component_host::ComponentHost;
use crate::infrastructure::event_bus::EventBus;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("No {facet} component at {address}")]
    UnknownComponent { facet: Facet, address: Principal },

    #[error(transparent)]
    Component(#[from] ComponentError),
}

impl GatewayError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, GatewayError::Component(e) if e.is_unauthorized())
    }
}

#[derive(Clone)]
pub struct NibbleGateway {
    host: ComponentHost,
    event_bus: Arc<EventBus>,
}

impl NibbleGateway {
    pub fn new(host: ComponentHost, event_bus: Arc<EventBus>) -> Self {
        Self { host, event_bus }
    }

    // ------------------------------------------------------------------
    // AccessControls
    // ------------------------------------------------------------------

    pub fn change_admin(
        &self,
        caller: Principal,
        access_controls: Principal,
        new_admin: Principal,
    ) -> Result<(), GatewayError> {
        let acl = self.access_controls(access_controls)?;
        let event = self.reject_logged(caller, acl.write().change_admin(caller, new_admin))?;
        self.event_bus.publish_access_control_event(event);
        Ok(())
    }

    pub fn grant_role(
        &self,
        caller: Principal,
        access_controls: Principal,
        role: Role,
        principal: Principal,
    ) -> Result<(), GatewayError> {
        let acl = self.access_controls(access_controls)?;
        let event = self.reject_logged(caller, acl.write().grant_role(caller, role, principal))?;
        self.event_bus.publish_access_control_event(event);
        Ok(())
    }

    pub fn revoke_role(
        &self,
        caller: Principal,
        access_controls: Principal,
        role: Role,
        principal: Principal,
    ) -> Result<(), GatewayError> {
        let acl = self.access_controls(access_controls)?;
        let event = self.reject_logged(caller, acl.write().revoke_role(caller, role, principal))?;
        self.event_bus.publish_access_control_event(event);
        Ok(())
    }

    pub fn has_role(
        &self,
        access_controls: Principal,
        role: Role,
        principal: Principal,
    ) -> Result<bool, GatewayError> {
        Ok(self
            .access_controls(access_controls)?
            .read()
            .has_role(role, principal))
    }

    pub fn get_admin(&self, access_controls: Principal) -> Result<Principal, GatewayError> {
        Ok(self.access_controls(access_controls)?.read().admin())
    }

    // ------------------------------------------------------------------
    // Adapter registries (direct writers)
    // ------------------------------------------------------------------

    pub fn upsert_adapters<K: AdapterKind>(
        &self,
        caller: Principal,
        registry: Principal,
        records: Vec<K::Record>,
    ) -> Result<(), GatewayError> {
        let handle = self.adapters::<K>(registry)?;
        let event = self.reject_logged(caller, handle.write().upsert_batch(caller, records))?;
        self.publish_registry_events(event);
        Ok(())
    }

    pub fn remove_adapters<K: AdapterKind>(
        &self,
        caller: Principal,
        registry: Principal,
        ids: Vec<RecordId>,
    ) -> Result<(), GatewayError> {
        let handle = self.adapters::<K>(registry)?;
        let event = self.reject_logged(caller, handle.write().remove_batch(caller, ids))?;
        self.publish_registry_events(event);
        Ok(())
    }

    /// Run a read against a registry. Reads never fail once the registry is
    /// found.
    pub fn read_adapters<K: AdapterKind, T>(
        &self,
        registry: Principal,
        read: impl FnOnce(&AdapterRegistry<K>) -> T,
    ) -> Result<T, GatewayError> {
        let handle = self.adapters::<K>(registry)?;
        let guard = handle.read();
        Ok(read(&guard))
    }

    pub fn is_encrypted<K: AdapterKind>(
        &self,
        registry: Principal,
        id: &[u8],
    ) -> Result<bool, GatewayError> {
        self.read_adapters::<K, _>(registry, |r| r.is_encrypted(id))
    }

    pub fn get_metadata<K: AdapterKind>(
        &self,
        registry: Principal,
        id: &[u8],
    ) -> Result<String, GatewayError> {
        self.read_adapters::<K, _>(registry, |r| r.metadata(id))
    }

    // ------------------------------------------------------------------
    // Workflow registry (direct writers)
    // ------------------------------------------------------------------

    pub fn upsert_workflows(
        &self,
        caller: Principal,
        registry: Principal,
        workflows: Vec<WorkflowRecord>,
    ) -> Result<(), GatewayError> {
        let handle = self.workflows(registry)?;
        let event = self.reject_logged(
            caller,
            handle.write().add_or_modify_workflows(caller, workflows),
        )?;
        self.publish_registry_events(event);
        Ok(())
    }

    pub fn remove_workflows(
        &self,
        caller: Principal,
        registry: Principal,
        ids: Vec<RecordId>,
    ) -> Result<(), GatewayError> {
        let handle = self.workflows(registry)?;
        let event = self.reject_logged(caller, handle.write().remove_workflows(caller, ids))?;
        self.publish_registry_events(event);
        Ok(())
    }

    pub fn read_workflows<T>(
        &self,
        registry: Principal,
        read: impl FnOnce(&WorkflowRegistry) -> T,
    ) -> Result<T, GatewayError> {
        let handle = self.workflows(registry)?;
        let guard = handle.read();
        Ok(read(&guard))
    }

    // ------------------------------------------------------------------
    // Storage (write-through)
    // ------------------------------------------------------------------

    pub fn add_or_modify_adapters_batch(
        &self,
        caller: Principal,
        storage: Principal,
        batch: ModifyAdapters,
    ) -> Result<(), GatewayError> {
        let storage = self.storage(storage)?;
        let events = self.reject_logged(
            caller,
            storage.read().add_or_modify_adapters_batch(caller, batch),
        )?;
        self.publish_registry_events(events);
        Ok(())
    }

    pub fn remove_adapters_batch(
        &self,
        caller: Principal,
        storage: Principal,
        batch: RemoveAdapters,
    ) -> Result<(), GatewayError> {
        let storage = self.storage(storage)?;
        let events =
            self.reject_logged(caller, storage.read().remove_adapters_batch(caller, batch))?;
        self.publish_registry_events(events);
        Ok(())
    }

    pub fn add_or_modify_workflow(
        &self,
        caller: Principal,
        storage: Principal,
        workflow: WorkflowRecord,
    ) -> Result<(), GatewayError> {
        let storage = self.storage(storage)?;
        let event = self.reject_logged(
            caller,
            storage.read().add_or_modify_workflow(caller, workflow),
        )?;
        self.publish_registry_events(event);
        Ok(())
    }

    pub fn add_or_modify_workflows(
        &self,
        caller: Principal,
        storage: Principal,
        workflows: Vec<WorkflowRecord>,
    ) -> Result<(), GatewayError> {
        let storage = self.storage(storage)?;
        let event = self.reject_logged(
            caller,
            storage.read().add_or_modify_workflows(caller, workflows),
        )?;
        self.publish_registry_events(event);
        Ok(())
    }

    pub fn remove_workflow(
        &self,
        caller: Principal,
        storage: Principal,
        id: RecordId,
    ) -> Result<(), GatewayError> {
        let storage = self.storage(storage)?;
        let event = self.reject_logged(caller, storage.read().remove_workflow(caller, id))?;
        self.publish_registry_events(event);
        Ok(())
    }

    pub fn remove_workflows_via_storage(
        &self,
        caller: Principal,
        storage: Principal,
        ids: Vec<RecordId>,
    ) -> Result<(), GatewayError> {
        let storage = self.storage(storage)?;
        let event = self.reject_logged(caller, storage.read().remove_workflows(caller, ids))?;
        self.publish_registry_events(event);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Resolution
    // ------------------------------------------------------------------

    pub fn access_controls(
        &self,
        address: Principal,
    ) -> Result<Shared<AccessControls>, GatewayError> {
        self.host
            .access_controls(address)
            .ok_or(GatewayError::UnknownComponent {
                facet: Facet::AccessControls,
                address,
            })
    }

    pub fn storage(&self, address: Principal) -> Result<Shared<Storage>, GatewayError> {
        self.host.storage(address).ok_or(GatewayError::UnknownComponent {
            facet: Facet::Storage,
            address,
        })
    }

    pub fn workflows(
        &self,
        address: Principal,
    ) -> Result<Shared<WorkflowRegistry>, GatewayError> {
        self.host.workflows(address).ok_or(GatewayError::UnknownComponent {
            facet: Facet::Workflows,
            address,
        })
    }

    pub fn adapters<K: AdapterKind>(
        &self,
        address: Principal,
    ) -> Result<Shared<AdapterRegistry<K>>, GatewayError> {
        self.host
            .adapters::<K>(address)
            .ok_or(GatewayError::UnknownComponent {
                facet: K::FACET,
                address,
            })
    }

    fn reject_logged<T>(
        &self,
        caller: Principal,
        result: Result<T, ComponentError>,
    ) -> Result<T, GatewayError> {
        result.map_err(|e| {
            if e.is_unauthorized() {
                metrics::counter!("nibble_unauthorized_writes_total").increment(1);
            }
            warn!("Rejected call from {}: {}", caller, e);
            GatewayError::Component(e)
        })
    }

    fn publish_registry_events(&self, events: impl IntoIterator<Item = RegistryEvent>) {
        for event in events {
            debug!(
                "Registry {} ({}) applied batch of {} ids",
                event.registry(),
                event.facet(),
                event.ids().len()
            );
            self.event_bus.publish_registry_event(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::factory::{DeployedNibble, FactoryService, NibbleFactory};
    use crate::domain::adapter::{Conditions, MetadataRecord};
    use crate::domain::node_config::FactoryConfigManifest;
    use crate::infrastructure::event_bus::DomainEvent;
    use crate::infrastructure::repositories::InMemoryBundleRepository;

    async fn deployed(admin: Principal) -> (NibbleGateway, DeployedNibble, Arc<EventBus>) {
        let host = ComponentHost::new();
        let bus = Arc::new(EventBus::new(64));
        let factory = NibbleFactory::from_config(
            &FactoryConfigManifest::default(),
            host.clone(),
            Arc::new(InMemoryBundleRepository::new()),
            bus.clone(),
        );
        let nibble = factory.deploy_nibble(admin).await.unwrap();
        (NibbleGateway::new(host, bus.clone()), nibble, bus)
    }

    #[tokio::test]
    async fn test_unknown_component() {
        let (gateway, nibble, _) = deployed(Principal::from_label("admin")).await;
        let err = gateway
            .get_metadata::<Conditions>(nibble.components.listeners, b"x")
            .unwrap_err();
        assert!(matches!(
            err,
            GatewayError::UnknownComponent { facet: Facet::Conditions, address }
                if address == nibble.components.listeners
        ));
    }

    #[tokio::test]
    async fn test_rejected_write_publishes_nothing() {
        let admin = Principal::from_label("admin");
        let (gateway, nibble, bus) = deployed(admin).await;
        let mut events = bus.subscribe();
        let stranger = Principal::from_label("stranger");

        let err = gateway
            .upsert_adapters::<Conditions>(
                stranger,
                nibble.components.conditions,
                vec![MetadataRecord::new("c1", "temp>30", false)],
            )
            .unwrap_err();
        assert!(err.is_unauthorized());
        assert!(events.drain().is_empty());
        assert_eq!(
            gateway
                .get_metadata::<Conditions>(nibble.components.conditions, b"c1")
                .unwrap(),
            ""
        );
    }

    #[tokio::test]
    async fn test_role_changes_are_published() {
        let admin = Principal::from_label("admin");
        let (gateway, nibble, bus) = deployed(admin).await;
        let mut events = bus.subscribe();
        let writer = Principal::from_label("writer");
        let acl = nibble.components.access_controls;

        gateway.grant_role(admin, acl, Role::AgentWriter, writer).unwrap();
        assert!(gateway.has_role(acl, Role::AgentWriter, writer).unwrap());
        gateway.revoke_role(admin, acl, Role::AgentWriter, writer).unwrap();
        assert!(!gateway.has_role(acl, Role::AgentWriter, writer).unwrap());

        let received = events.drain();
        assert_eq!(received.len(), 2);
        assert!(received
            .iter()
            .all(|e| matches!(e, DomainEvent::AccessControl(_))));
    }

    #[tokio::test]
    async fn test_workflow_removal_by_registry_and_by_storage() {
        let admin = Principal::from_label("admin");
        let (gateway, nibble, _) = deployed(admin).await;
        let c = nibble.components;
        gateway
            .grant_role(admin, c.access_controls, Role::AgentWriter, admin)
            .unwrap();
        gateway
            .upsert_workflows(
                admin,
                c.workflows,
                vec![
                    WorkflowRecord::new("w1", "alert", false),
                    WorkflowRecord::new("w2", "swap", false),
                ],
            )
            .unwrap();

        gateway
            .remove_workflows(admin, c.workflows, vec![RecordId::from("w1")])
            .unwrap();
        gateway
            .remove_workflows_via_storage(admin, c.storage, vec![RecordId::from("w2")])
            .unwrap();
        assert!(gateway.read_workflows(c.workflows, |w| w.is_empty()).unwrap());

        // Each path resolves only its own facet.
        assert!(matches!(
            gateway.remove_workflows(admin, c.storage, vec![]),
            Err(GatewayError::UnknownComponent { facet: Facet::Workflows, .. })
        ));
        assert!(matches!(
            gateway.remove_workflows_via_storage(admin, c.workflows, vec![]),
            Err(GatewayError::UnknownComponent { facet: Facet::Storage, .. })
        ));
    }
}
