// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("Invalid write policy: {0} (expected 'conjunctive' or 'disjunctive')")]
    InvalidWritePolicy(String),
}

/// How registry writes combine the caller's writer roles.
///
/// The Storage write-through path is admitted under both modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WritePolicy {
    /// `(agent_writer AND human_writer) OR is_storage`
    #[default]
    Conjunctive,
    /// `(agent_writer OR human_writer) OR is_storage`
    Disjunctive,
}

impl WritePolicy {
    pub fn permits(self, agent_writer: bool, human_writer: bool, is_storage: bool) -> bool {
        if is_storage {
            return true;
        }
        match self {
            WritePolicy::Conjunctive => agent_writer && human_writer,
            WritePolicy::Disjunctive => agent_writer || human_writer,
        }
    }
}

impl fmt::Display for WritePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WritePolicy::Conjunctive => f.write_str("conjunctive"),
            WritePolicy::Disjunctive => f.write_str("disjunctive"),
        }
    }
}

impl FromStr for WritePolicy {
    type Err = PolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "conjunctive" | "and" => Ok(WritePolicy::Conjunctive),
            "disjunctive" | "or" => Ok(WritePolicy::Disjunctive),
            other => Err(PolicyError::InvalidWritePolicy(other.to_string())),
        }
    }
}

/// Per-bundle registry behaviour fixed by the factory at instantiation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryPolicy {
    pub write: WritePolicy,
    /// Emit a batch event even when the batch is empty.
    pub emit_empty_batches: bool,
}

impl Default for RegistryPolicy {
    fn default() -> Self {
        Self {
            write: WritePolicy::Conjunctive,
            emit_empty_batches: true,
        }
    }
}
