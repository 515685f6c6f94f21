// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod factory;
pub mod gateway;

pub use factory::{DeployedNibble, FactoryError, FactoryService, NibbleFactory};
pub use gateway::{GatewayError, NibbleGateway};
