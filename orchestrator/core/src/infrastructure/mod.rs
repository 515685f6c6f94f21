// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod allocator;
pub mod clock;
pub mod component_host;
pub mod event_bus;
pub mod repositories;
pub mod telemetry;
