// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Component Host
//!
//! Address → live component table: the execution environment in which
//! deployed bundle components run and through which callers reach them.
//! Components become reachable only once the factory has fully wired and
//! recorded their bundle.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::domain::access_controls::AccessControls;
use crate::domain::adapter::{AdapterKind, AdapterRegistry};
use crate::domain::bundle::ComponentHandle;
use crate::domain::errors::ComponentError;
use crate::domain::lifecycle::Shared;
use crate::domain::principal::Principal;
use crate::domain::storage::Storage;
use crate::domain::workflow::WorkflowRegistry;

#[derive(Clone, Default)]
pub struct ComponentHost {
    components: Arc<RwLock<HashMap<Principal, ComponentHandle>>>,
}

impl ComponentHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_occupied(&self, address: Principal) -> bool {
        self.components.read().contains_key(&address)
    }

    /// Install every handle, or none if any address is taken.
    pub fn install(
        &self,
        handles: Vec<(Principal, ComponentHandle)>,
    ) -> Result<(), ComponentError> {
        let mut components = self.components.write();
        if let Some((address, _)) = handles.iter().find(|(a, _)| components.contains_key(a)) {
            return Err(ComponentError::AddressInUse { address: *address });
        }
        components.extend(handles);
        Ok(())
    }

    /// Drop the given addresses. Used to undo an `install`.
    pub fn uninstall(&self, addresses: &[Principal]) {
        let mut components = self.components.write();
        for address in addresses {
            components.remove(address);
        }
    }

    pub fn get(&self, address: Principal) -> Option<ComponentHandle> {
        self.components.read().get(&address).cloned()
    }

    pub fn len(&self) -> usize {
        self.components.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.read().is_empty()
    }

    pub fn access_controls(&self, address: Principal) -> Option<Shared<AccessControls>> {
        match self.get(address)? {
            ComponentHandle::AccessControls(acl) => Some(acl),
            _ => None,
        }
    }

    pub fn storage(&self, address: Principal) -> Option<Shared<Storage>> {
        match self.get(address)? {
            ComponentHandle::Storage(storage) => Some(storage),
            _ => None,
        }
    }

    pub fn workflows(&self, address: Principal) -> Option<Shared<WorkflowRegistry>> {
        match self.get(address)? {
            ComponentHandle::Workflows(workflows) => Some(workflows),
            _ => None,
        }
    }

    pub fn adapters<K: AdapterKind>(
        &self,
        address: Principal,
    ) -> Option<Shared<AdapterRegistry<K>>> {
        K::from_handle(&self.get(address)?)
    }
}
