// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Workflow registry: same lifecycle and authorization as the adapter
//! registries, keyed by workflow id.

use serde::{Deserialize, Serialize};

use super::access_controls::AccessControls;
use super::errors::ComponentError;
use super::events::RegistryEvent;
use super::lifecycle::Shared;
use super::policy::RegistryPolicy;
use super::principal::{Facet, Principal};
use super::registry::{Record, RecordId, RegistryCore};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowRecord {
    pub id: RecordId,
    pub metadata: String,
    pub encrypted: bool,
}

impl WorkflowRecord {
    pub fn new(id: impl Into<RecordId>, metadata: impl Into<String>, encrypted: bool) -> Self {
        Self {
            id: id.into(),
            metadata: metadata.into(),
            encrypted,
        }
    }
}

impl Record for WorkflowRecord {
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

#[derive(Debug)]
pub struct WorkflowRegistry {
    core: RegistryCore<WorkflowRecord>,
}

impl WorkflowRegistry {
    pub fn new(address: Principal, deployer: Principal, policy: RegistryPolicy) -> Self {
        Self {
            core: RegistryCore::new(Facet::Workflows, address, deployer, policy),
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

    pub fn add_or_modify_workflows(
        &mut self,
        caller: Principal,
        workflows: Vec<WorkflowRecord>,
    ) -> Result<Option<RegistryEvent>, ComponentError> {
        self.core.upsert_batch(caller, workflows)
    }

    pub fn add_or_modify_workflow(
        &mut self,
        caller: Principal,
        workflow: WorkflowRecord,
    ) -> Result<Option<RegistryEvent>, ComponentError> {
        self.core.upsert_batch(caller, vec![workflow])
    }

    pub fn remove_workflows(
        &mut self,
        caller: Principal,
        ids: Vec<RecordId>,
    ) -> Result<Option<RegistryEvent>, ComponentError> {
        self.core.remove_batch(caller, ids)
    }

    pub fn remove_workflow(
        &mut self,
        caller: Principal,
        id: RecordId,
    ) -> Result<Option<RegistryEvent>, ComponentError> {
        self.core.remove_batch(caller, vec![id])
    }

    pub fn authorize(&self, caller: Principal) -> Result<(), ComponentError> {
        self.core.authorize(caller, "write workflows")
    }

    pub fn is_encrypted(&self, id: &[u8]) -> bool {
        self.core.is_encrypted(id)
    }

    pub fn metadata(&self, id: &[u8]) -> String {
        self.core.metadata(id)
    }

    pub fn workflow(&self, id: &[u8]) -> Option<&WorkflowRecord> {
        self.core.get(id)
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

    pub fn is_initialized(&self) -> bool {
        self.core.is_initialized()
    }
}
