// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # `nibble-core`: Bundle Factory and Registries
//!
//! Provisions bundles ("nibbles") of nine cooperating components and manages
//! the typed adapter records inside each bundle.
//!
//! ## Crate Layout
//!
//! | Module | Layer | Contents |
//! |--------|-------|----------|
//! | [`domain`] | Domain | `AccessControls`, `AdapterRegistry<K>`, `WorkflowRegistry`, `Storage`, `Bundle` |
//! | [`application`] | Application | `NibbleFactory` deploy service, `NibbleGateway` entry points |
//! | [`infrastructure`] | Infrastructure | event bus, component host, allocator, in-memory repository, telemetry |
//!
//! ## Key Concepts
//!
//! - **Clone-and-wire**: the factory instantiates all nine components at fresh
//!   addresses, then initializes each exactly once with references to its
//!   siblings. Only the factory may initialize.
//! - **Write-through**: registries accept writes from writers admitted by the
//!   bundle's write policy, and from the bundle's own Storage component.
//! - **All-or-nothing**: a deployment or batch call either applies fully and
//!   publishes its events, or changes nothing.

pub mod application;
pub mod domain;
pub mod infrastructure;

pub use domain::*;
