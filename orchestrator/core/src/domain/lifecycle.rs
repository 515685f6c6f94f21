// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Component Lifecycle (clone-and-wire)
//!
//! Every bundle component goes through two phases:
//!
//! 1. **Instantiate**: the factory obtains a fresh address from an
//!    [`AddressAllocator`] and constructs the component with that address and
//!    the factory recorded as its deployer. Nothing is wired yet.
//! 2. **Initialize**: the factory calls the component's `initialize` exactly
//!    once, passing cross-references to its sibling components.
//!
//! [`InitGuard`] enforces the second phase: only the recorded deployer may
//! initialize, and only once.

use std::sync::Arc;

use parking_lot::RwLock;

use super::errors::ComponentError;
use super::principal::{Facet, Principal};

/// Shared, lockable handle to a live component.
///
/// Components reference each other through these handles once wired.
pub type Shared<T> = Arc<RwLock<T>>;

pub fn shared<T>(component: T) -> Shared<T> {
    Arc::new(RwLock::new(component))
}

/// Clone/template instantiation primitive.
///
/// Hands out a fresh address for every component instance the factory
/// creates. Implementations live in `crate::infrastructure::allocator`.
pub trait AddressAllocator: Send + Sync {
    fn allocate(&self, factory: Principal, facet: Facet) -> Principal;
}

/// One-time initialization guard bound to the deployer recorded at
/// instantiation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitGuard {
    facet: Facet,
    deployer: Principal,
    initialized: bool,
}

impl InitGuard {
    pub fn new(facet: Facet, deployer: Principal) -> Self {
        Self {
            facet,
            deployer,
            initialized: false,
        }
    }

    /// Verify that `caller` may initialize now. Does not seal.
    ///
    /// The caller check runs first, so a stranger always sees
    /// `InvalidInitializer` regardless of the initialization state.
    pub fn check(&self, caller: Principal) -> Result<(), ComponentError> {
        if caller != self.deployer {
            return Err(ComponentError::InvalidInitializer {
                facet: self.facet,
                caller,
                factory: self.deployer,
            });
        }
        if self.initialized {
            return Err(ComponentError::AlreadyInitialized { facet: self.facet });
        }
        Ok(())
    }

    /// Mark the component initialized. Call only after every field is set.
    pub fn seal(&mut self) {
        self.initialized = true;
    }

    pub fn ensure_initialized(&self) -> Result<(), ComponentError> {
        if self.initialized {
            Ok(())
        } else {
            Err(ComponentError::NotInitialized { facet: self.facet })
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn deployer(&self) -> Principal {
        self.deployer
    }

    pub fn facet(&self) -> Facet {
        self.facet
    }
}
