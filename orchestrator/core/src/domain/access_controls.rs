// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # AccessControls Aggregate
//!
//! Per-bundle role store. Leaf component: it references nothing else in the
//! bundle, every other facet reads it.
//!
//! ## Permission Matrix
//!
//! | Operation | Who may call |
//! |-----------|--------------|
//! | `change_admin` | current admin |
//! | grant/revoke `AgentAdmin` | current admin |
//! | grant/revoke `HumanWriter` | current admin |
//! | grant/revoke `AgentWriter`, `AgentReader`, `AgentTokenDistributor` | admin or any agent-admin |
//!
//! Read predicates are total: unknown principals simply hold no role.

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use super::errors::ComponentError;
use super::events::AccessControlEvent;
use super::lifecycle::InitGuard;
use super::principal::{Facet, Principal};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    AgentWriter,
    AgentReader,
    AgentAdmin,
    HumanWriter,
    AgentTokenDistributor,
}

impl Role {
    /// Roles only the admin itself may grant or revoke.
    pub fn admin_only(self) -> bool {
        matches!(self, Role::AgentAdmin | Role::HumanWriter)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::AgentWriter => "agent_writer",
            Role::AgentReader => "agent_reader",
            Role::AgentAdmin => "agent_admin",
            Role::HumanWriter => "human_writer",
            Role::AgentTokenDistributor => "agent_token_distributor",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone)]
pub struct AccessControls {
    address: Principal,
    guard: InitGuard,
    factory: Principal,
    admin: Principal,
    roles: HashMap<Role, HashSet<Principal>>,
}

impl AccessControls {
    pub fn new(address: Principal, deployer: Principal) -> Self {
        Self {
            address,
            guard: InitGuard::new(Facet::AccessControls, deployer),
            factory: Principal::ZERO,
            admin: Principal::ZERO,
            roles: HashMap::new(),
        }
    }

    /// Seed `admin` as admin and human writer. Factory-only, once.
    pub fn initialize(
        &mut self,
        caller: Principal,
        factory: Principal,
        admin: Principal,
    ) -> Result<(), ComponentError> {
        self.guard.check(caller)?;
        if admin.is_zero() {
            return Err(ComponentError::AdminCannotBeZero);
        }
        if factory.is_zero() {
            return Err(ComponentError::InvalidReference {
                facet: Facet::AccessControls,
                reference: "factory",
            });
        }

        self.factory = factory;
        self.admin = admin;
        self.roles.entry(Role::HumanWriter).or_default().insert(admin);
        self.guard.seal();
        Ok(())
    }

    pub fn change_admin(
        &mut self,
        caller: Principal,
        new_admin: Principal,
    ) -> Result<AccessControlEvent, ComponentError> {
        self.guard.ensure_initialized()?;
        if caller != self.admin {
            return Err(self.unauthorized(caller, "change the admin"));
        }
        if new_admin.is_zero() {
            return Err(ComponentError::AdminCannotBeZero);
        }

        let previous_admin = std::mem::replace(&mut self.admin, new_admin);
        Ok(AccessControlEvent::AdminChanged {
            access_controls: self.address,
            previous_admin,
            new_admin,
        })
    }

    pub fn grant_role(
        &mut self,
        caller: Principal,
        role: Role,
        principal: Principal,
    ) -> Result<AccessControlEvent, ComponentError> {
        self.authorize_role_change(caller, role, "grant roles")?;
        self.roles.entry(role).or_default().insert(principal);
        Ok(AccessControlEvent::RoleGranted {
            access_controls: self.address,
            role,
            principal,
            granted_by: caller,
        })
    }

    pub fn revoke_role(
        &mut self,
        caller: Principal,
        role: Role,
        principal: Principal,
    ) -> Result<AccessControlEvent, ComponentError> {
        self.authorize_role_change(caller, role, "revoke roles")?;
        if let Some(members) = self.roles.get_mut(&role) {
            members.remove(&principal);
        }
        Ok(AccessControlEvent::RoleRevoked {
            access_controls: self.address,
            role,
            principal,
            revoked_by: caller,
        })
    }

    pub fn add_agent_admin(
        &mut self,
        caller: Principal,
        principal: Principal,
    ) -> Result<AccessControlEvent, ComponentError> {
        self.grant_role(caller, Role::AgentAdmin, principal)
    }

    pub fn remove_agent_admin(
        &mut self,
        caller: Principal,
        principal: Principal,
    ) -> Result<AccessControlEvent, ComponentError> {
        self.revoke_role(caller, Role::AgentAdmin, principal)
    }

    pub fn add_agent_writer(
        &mut self,
        caller: Principal,
        principal: Principal,
    ) -> Result<AccessControlEvent, ComponentError> {
        self.grant_role(caller, Role::AgentWriter, principal)
    }

    pub fn remove_agent_writer(
        &mut self,
        caller: Principal,
        principal: Principal,
    ) -> Result<AccessControlEvent, ComponentError> {
        self.revoke_role(caller, Role::AgentWriter, principal)
    }

    pub fn add_agent_reader(
        &mut self,
        caller: Principal,
        principal: Principal,
    ) -> Result<AccessControlEvent, ComponentError> {
        self.grant_role(caller, Role::AgentReader, principal)
    }

    pub fn remove_agent_reader(
        &mut self,
        caller: Principal,
        principal: Principal,
    ) -> Result<AccessControlEvent, ComponentError> {
        self.revoke_role(caller, Role::AgentReader, principal)
    }

    pub fn add_agent_token_distributor(
        &mut self,
        caller: Principal,
        principal: Principal,
    ) -> Result<AccessControlEvent, ComponentError> {
        self.grant_role(caller, Role::AgentTokenDistributor, principal)
    }

    pub fn remove_agent_token_distributor(
        &mut self,
        caller: Principal,
        principal: Principal,
    ) -> Result<AccessControlEvent, ComponentError> {
        self.revoke_role(caller, Role::AgentTokenDistributor, principal)
    }

    pub fn add_human_writer(
        &mut self,
        caller: Principal,
        principal: Principal,
    ) -> Result<AccessControlEvent, ComponentError> {
        self.grant_role(caller, Role::HumanWriter, principal)
    }

    pub fn remove_human_writer(
        &mut self,
        caller: Principal,
        principal: Principal,
    ) -> Result<AccessControlEvent, ComponentError> {
        self.revoke_role(caller, Role::HumanWriter, principal)
    }

    pub fn has_role(&self, role: Role, principal: Principal) -> bool {
        self.roles
            .get(&role)
            .is_some_and(|members| members.contains(&principal))
    }

    pub fn is_human_writer(&self, principal: Principal) -> bool {
        self.has_role(Role::HumanWriter, principal)
    }

    pub fn is_agent_writer(&self, principal: Principal) -> bool {
        self.has_role(Role::AgentWriter, principal)
    }

    pub fn is_agent_reader(&self, principal: Principal) -> bool {
        self.has_role(Role::AgentReader, principal)
    }

    pub fn is_agent_admin(&self, principal: Principal) -> bool {
        self.has_role(Role::AgentAdmin, principal)
    }

    pub fn is_agent_token_distributor(&self, principal: Principal) -> bool {
        self.has_role(Role::AgentTokenDistributor, principal)
    }

    /// Zero until initialized.
    pub fn admin(&self) -> Principal {
        self.admin
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

    fn authorize_role_change(
        &self,
        caller: Principal,
        role: Role,
        action: &'static str,
    ) -> Result<(), ComponentError> {
        self.guard.ensure_initialized()?;
        let is_admin = caller == self.admin;
        let permitted = if role.admin_only() {
            is_admin
        } else {
            is_admin || self.is_agent_admin(caller)
        };
        if permitted {
            Ok(())
        } else {
            Err(self.unauthorized(caller, action))
        }
    }

    fn unauthorized(&self, caller: Principal, action: &'static str) -> ComponentError {
        ComponentError::Unauthorized {
            facet: Facet::AccessControls,
            caller,
            action,
        }
    }
}
