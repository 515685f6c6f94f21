// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Component-level failures shared by every facet of a bundle.
//!
//! A failed call leaves the component untouched; callers resubmit with the
//! right credentials. Factory-level failures wrap these in
//! [`crate::application::factory::FactoryError`].

use thiserror::Error;

use super::principal::{Facet, Principal};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ComponentError {
    #[error("Caller {caller} is not authorized to {action} on the {facet} component")]
    Unauthorized {
        facet: Facet,
        caller: Principal,
        action: &'static str,
    },

    #[error("The {facet} component is already initialized")]
    AlreadyInitialized { facet: Facet },

    #[error("Caller {caller} is not the recorded factory {factory} of the {facet} component")]
    InvalidInitializer {
        facet: Facet,
        caller: Principal,
        factory: Principal,
    },

    #[error("Admin cannot be the zero principal")]
    AdminCannotBeZero,

    #[error("The {facet} component has not been initialized")]
    NotInitialized { facet: Facet },

    #[error("The {facet} component received a zero {reference} reference")]
    InvalidReference {
        facet: Facet,
        reference: &'static str,
    },

    #[error("Address {address} is already occupied by another component")]
    AddressInUse { address: Principal },
}

impl ComponentError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ComponentError::Unauthorized { .. })
    }
}
