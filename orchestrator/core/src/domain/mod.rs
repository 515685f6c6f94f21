// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Domain layer: bundle components, their records and events.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Pure aggregates. Nothing here logs, locks across calls or
//!   performs I/O (configuration loading excepted).

pub mod access_controls;
pub mod adapter;
pub mod bundle;
pub mod errors;
pub mod events;
pub mod lifecycle;
pub mod node_config;
pub mod policy;
pub mod principal;
pub mod registry;
pub mod repository;
pub mod storage;
pub mod workflow;
