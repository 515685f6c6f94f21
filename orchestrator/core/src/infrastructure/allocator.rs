// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Clone address allocation.
//!
//! Stands in for the host's template-instantiation primitive: every call
//! yields a fresh address derived from the factory and a monotonically
//! increasing nonce.

use std::sync::atomic::{AtomicU64, Ordering};

use sha2::{Digest, Sha256};

use crate::domain::lifecycle::AddressAllocator;
use crate::domain::principal::{Facet, Principal, PRINCIPAL_LEN};

const CLONE_DOMAIN: &[u8] = b"nibble:clone";

/// `sha256("nibble:clone" || factory || nonce_be)[12..]`
#[derive(Debug, Default)]
pub struct HashAddressAllocator {
    nonce: AtomicU64,
}

impl HashAddressAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resume numbering after `nonce` allocations.
    pub fn starting_at(nonce: u64) -> Self {
        Self {
            nonce: AtomicU64::new(nonce),
        }
    }

    pub fn allocated(&self) -> u64 {
        self.nonce.load(Ordering::SeqCst)
    }
}

impl AddressAllocator for HashAddressAllocator {
    fn allocate(&self, factory: Principal, _facet: Facet) -> Principal {
        let nonce = self.nonce.fetch_add(1, Ordering::SeqCst);
        let mut hasher = Sha256::new();
        hasher.update(CLONE_DOMAIN);
        hasher.update(factory.as_bytes());
        hasher.update(nonce.to_be_bytes());
        let digest = hasher.finalize();

        let mut bytes = [0u8; PRINCIPAL_LEN];
        bytes.copy_from_slice(&digest[32 - PRINCIPAL_LEN..]);
        Principal::new(bytes)
    }
}
