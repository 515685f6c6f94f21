// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Identity Value Objects
//!
//! | Type | Purpose |
//! |------|---------|
//! | [`Principal`] | 20-byte handle for callers *and* deployed components |
//! | [`BundleId`] | Opaque hash identifying one deployed bundle |
//! | [`Facet`] | One of the nine component roles inside a bundle |
//!
//! Components are addressed with the same handle type as external callers so
//! that a registry can compare "who is calling" against "which component is
//! my Storage" without any extra indirection.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Length in bytes of a [`Principal`].
pub const PRINCIPAL_LEN: usize = 20;

/// An externally-authenticated identity or a deployed component handle.
///
/// Serialized as a `0x`-prefixed lowercase hex string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Principal([u8; PRINCIPAL_LEN]);

impl Principal {
    /// The null principal. Never a valid admin.
    pub const ZERO: Principal = Principal([0u8; PRINCIPAL_LEN]);

    pub const fn new(bytes: [u8; PRINCIPAL_LEN]) -> Self {
        Self(bytes)
    }

    /// Derive a stable principal from a human-readable label.
    ///
    /// Takes the trailing 20 bytes of `sha256(label)`. Handy for configuration
    /// defaults and tests ("alice", "bob").
    pub fn from_label(label: &str) -> Self {
        let digest = Sha256::digest(label.as_bytes());
        let mut bytes = [0u8; PRINCIPAL_LEN];
        bytes.copy_from_slice(&digest[32 - PRINCIPAL_LEN..]);
        Self(bytes)
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; PRINCIPAL_LEN]
    }

    pub fn as_bytes(&self) -> &[u8; PRINCIPAL_LEN] {
        &self.0
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PrincipalParseError {
    #[error("Invalid hex in principal: {0}")]
    InvalidHex(String),

    #[error("Principal must be 20 bytes, got {0}")]
    InvalidLength(usize),
}

impl FromStr for Principal {
    type Err = PrincipalParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.strip_prefix("0x").unwrap_or(s);
        let decoded =
            hex::decode(trimmed).map_err(|e| PrincipalParseError::InvalidHex(e.to_string()))?;
        let bytes: [u8; PRINCIPAL_LEN] = decoded
            .as_slice()
            .try_into()
            .map_err(|_| PrincipalParseError::InvalidLength(decoded.len()))?;
        Ok(Self(bytes))
    }
}

impl Serialize for Principal {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Principal {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Opaque identifier of one deployed bundle.
///
/// Derived by the factory from `(creator, timestamp, sequence)`; see
/// [`crate::domain::bundle::derive_bundle_id`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BundleId(Vec<u8>);

impl BundleId {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for BundleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(&self.0))
    }
}

impl Serialize for BundleId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for BundleId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        let trimmed = raw.strip_prefix("0x").unwrap_or(&raw);
        hex::decode(trimmed)
            .map(Self)
            .map_err(serde::de::Error::custom)
    }
}

/// The nine component roles of a bundle.
///
/// Declaration order is the wire order of the `BundleDeployed` event:
/// storage, listeners, conditions, evaluations, agents, connectors,
/// fheGates, accessControls, workflows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Facet {
    Storage,
    Listeners,
    Conditions,
    Evaluations,
    Agents,
    Connectors,
    FheGates,
    AccessControls,
    Workflows,
}

impl Facet {
    /// All facets in event order.
    pub const ALL: [Facet; 9] = [
        Facet::Storage,
        Facet::Listeners,
        Facet::Conditions,
        Facet::Evaluations,
        Facet::Agents,
        Facet::Connectors,
        Facet::FheGates,
        Facet::AccessControls,
        Facet::Workflows,
    ];

    /// Position of this facet in the `BundleDeployed` address array.
    pub fn position(self) -> usize {
        self as usize
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Facet::Storage => "storage",
            Facet::Listeners => "listeners",
            Facet::Conditions => "conditions",
            Facet::Evaluations => "evaluations",
            Facet::Agents => "agents",
            Facet::Connectors => "connectors",
            Facet::FheGates => "fhe_gates",
            Facet::AccessControls => "access_controls",
            Facet::Workflows => "workflows",
        }
    }

    /// Name under which indexers record the component (`ContractInfo.name`).
    pub fn contract_name(self) -> &'static str {
        match self {
            Facet::Storage => "NibbleStorage",
            Facet::Listeners => "NibbleListeners",
            Facet::Conditions => "NibbleConditions",
            Facet::Evaluations => "NibbleEvaluations",
            Facet::Agents => "NibbleAgents",
            Facet::Connectors => "NibbleConnectors",
            Facet::FheGates => "NibbleFHEGates",
            Facet::AccessControls => "NibbleAccessControls",
            Facet::Workflows => "NibbleWorkflows",
        }
    }
}

impl fmt::Display for Facet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_principal_hex_roundtrip() {
        let alice = Principal::from_label("alice");
        let parsed: Principal = alice.to_string().parse().unwrap();
        assert_eq!(parsed, alice);
        assert!(alice.to_string().starts_with("0x"));
        assert_eq!(alice.to_string().len(), 2 + PRINCIPAL_LEN * 2);
    }

    #[test]
    fn test_principal_rejects_wrong_length() {
        let err = "0xdeadbeef".parse::<Principal>().unwrap_err();
        assert_eq!(err, PrincipalParseError::InvalidLength(4));
        assert!(matches!(
            "0xzz".parse::<Principal>(),
            Err(PrincipalParseError::InvalidHex(_))
        ));
    }

    #[test]
    fn test_zero_principal() {
        assert!(Principal::ZERO.is_zero());
        assert!(Principal::default().is_zero());
        assert!(!Principal::from_label("alice").is_zero());
    }

    #[test]
    fn test_principal_serializes_as_hex_string() {
        let bob = Principal::from_label("bob");
        let json = serde_json::to_string(&bob).unwrap();
        assert_eq!(json, format!("\"{}\"", bob));
        let back: Principal = serde_json::from_str(&json).unwrap();
        assert_eq!(back, bob);
    }

    #[test]
    fn test_facet_event_order() {
        let positions: Vec<usize> = Facet::ALL.iter().map(|f| f.position()).collect();
        assert_eq!(positions, (0..9).collect::<Vec<_>>());
        assert_eq!(Facet::ALL[0], Facet::Storage);
        assert_eq!(Facet::ALL[7], Facet::AccessControls);
        assert_eq!(Facet::ALL[8], Facet::Workflows);
    }

    #[test]
    fn test_bundle_id_display() {
        let id = BundleId::new(vec![0xab, 0xcd]);
        assert_eq!(id.to_string(), "0xabcd");
        let json = serde_json::to_string(&id).unwrap();
        let back: BundleId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
