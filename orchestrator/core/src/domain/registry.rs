// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Registry Core
//!
//! Shared machinery behind [`crate::domain::adapter::AdapterRegistry`] and
//! [`crate::domain::workflow::WorkflowRegistry`]:
//!
//! - [`RecordId`]: caller-supplied opaque key
//! - [`Record`]: what a stored value must expose (id, metadata, encrypted flag,
//!   kind-specific event columns)
//! - [`RegistryCore`]: one-time wiring, write authorization, keyed storage and
//!   batch event construction
//!
//! ## Presence
//!
//! Records live in an ordered map; presence is map membership. A record whose
//! id is the empty byte string is a real record and reports `was_new = false`
//! on its second upsert.
//!
//! ## Write Authorization
//!
//! A write is admitted when the caller is the Storage component wired at
//! initialization, or when the bundle's [`WritePolicy`] admits the caller's
//! writer roles as read from AccessControls.

use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::access_controls::AccessControls;
use super::errors::ComponentError;
use super::events::{ExtraColumns, RegistryEvent};
use super::lifecycle::{InitGuard, Shared};
use super::policy::{RegistryPolicy, WritePolicy};
use super::principal::{Facet, Principal};

/// Opaque record key, serialized as `0x`-prefixed hex.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct RecordId(Vec<u8>);

impl RecordId {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for RecordId {
    fn from(value: &str) -> Self {
        Self(value.as_bytes().to_vec())
    }
}

impl From<Vec<u8>> for RecordId {
    fn from(value: Vec<u8>) -> Self {
        Self(value)
    }
}

impl From<&[u8]> for RecordId {
    fn from(value: &[u8]) -> Self {
        Self(value.to_vec())
    }
}

impl Borrow<[u8]> for RecordId {
    fn borrow(&self) -> &[u8] {
        &self.0
    }
}

impl AsRef<[u8]> for RecordId {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(&self.0))
    }
}

impl Serialize for RecordId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for RecordId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        let trimmed = raw.strip_prefix("0x").unwrap_or(&raw);
        hex::decode(trimmed).map(Self).map_err(serde::de::Error::custom)
    }
}

/// A value stored in a registry.
pub trait Record: Clone + fmt::Debug + Send + Sync + 'static {
    fn id(&self) -> &RecordId;
    fn metadata(&self) -> &str;
    fn is_encrypted(&self) -> bool;

    /// Kind-specific event columns for `records`, in input order.
    fn extra_columns(_records: &[Self]) -> ExtraColumns
    where
        Self: Sized,
    {
        ExtraColumns::None
    }
}

/// Wiring, authorization and storage shared by every registry facet.
#[derive(Debug)]
pub struct RegistryCore<R> {
    facet: Facet,
    address: Principal,
    guard: InitGuard,
    policy: RegistryPolicy,
    factory: Principal,
    access_controls: Option<Shared<AccessControls>>,
    storage: Principal,
    records: BTreeMap<RecordId, R>,
}

impl<R: Record> RegistryCore<R> {
    pub fn new(
        facet: Facet,
        address: Principal,
        deployer: Principal,
        policy: RegistryPolicy,
    ) -> Self {
        Self {
            facet,
            address,
            guard: InitGuard::new(facet, deployer),
            policy,
            factory: Principal::ZERO,
            access_controls: None,
            storage: Principal::ZERO,
            records: BTreeMap::new(),
        }
    }

    pub fn initialize(
        &mut self,
        caller: Principal,
        factory: Principal,
        access_controls: Shared<AccessControls>,
        storage: Principal,
    ) -> Result<(), ComponentError> {
        self.guard.check(caller)?;
        if factory.is_zero() {
            return Err(self.invalid_reference("factory"));
        }
        if access_controls.read().address().is_zero() {
            return Err(self.invalid_reference("access_controls"));
        }
        if storage.is_zero() {
            return Err(self.invalid_reference("storage"));
        }

        self.factory = factory;
        self.access_controls = Some(access_controls);
        self.storage = storage;
        self.guard.seal();
        Ok(())
    }

    /// Check whether `caller` may write. Never mutates.
    pub fn authorize(&self, caller: Principal, action: &'static str) -> Result<(), ComponentError> {
        self.guard.ensure_initialized()?;
        let is_storage = caller == self.storage;
        let (agent_writer, human_writer) = match &self.access_controls {
            Some(acl) => {
                let acl = acl.read();
                (acl.is_agent_writer(caller), acl.is_human_writer(caller))
            }
            None => return Err(ComponentError::NotInitialized { facet: self.facet }),
        };

        if self.policy.write.permits(agent_writer, human_writer, is_storage) {
            Ok(())
        } else {
            Err(ComponentError::Unauthorized {
                facet: self.facet,
                caller,
                action,
            })
        }
    }

    /// Insert or fully overwrite each record, in input order.
    ///
    /// Returns `None` only for an empty batch when empty batches are not
    /// emitted.
    pub fn upsert_batch(
        &mut self,
        caller: Principal,
        records: Vec<R>,
    ) -> Result<Option<RegistryEvent>, ComponentError> {
        self.authorize(caller, "upsert records")?;
        if records.is_empty() && !self.policy.emit_empty_batches {
            return Ok(None);
        }

        let extra = R::extra_columns(&records);
        let mut ids = Vec::with_capacity(records.len());
        let mut metadata = Vec::with_capacity(records.len());
        let mut encrypted = Vec::with_capacity(records.len());
        let mut was_new = Vec::with_capacity(records.len());

        for record in records {
            ids.push(record.id().clone());
            metadata.push(record.metadata().to_string());
            encrypted.push(record.is_encrypted());
            was_new.push(self.records.insert(record.id().clone(), record).is_none());
        }

        Ok(Some(RegistryEvent::RecordsUpserted {
            registry: self.address,
            facet: self.facet,
            ids,
            metadata,
            encrypted,
            extra,
            was_new,
        }))
    }

    /// Hard-delete each id. Absent ids are ignored.
    pub fn remove_batch(
        &mut self,
        caller: Principal,
        ids: Vec<RecordId>,
    ) -> Result<Option<RegistryEvent>, ComponentError> {
        self.authorize(caller, "remove records")?;
        if ids.is_empty() && !self.policy.emit_empty_batches {
            return Ok(None);
        }

        for id in &ids {
            self.records.remove(id);
        }

        Ok(Some(RegistryEvent::RecordsRemoved {
            registry: self.address,
            facet: self.facet,
            ids,
        }))
    }

    pub fn get(&self, id: &[u8]) -> Option<&R> {
        self.records.get(id)
    }

    pub fn contains(&self, id: &[u8]) -> bool {
        self.records.contains_key(id)
    }

    pub fn is_encrypted(&self, id: &[u8]) -> bool {
        self.get(id).is_some_and(Record::is_encrypted)
    }

    /// Empty string for unknown ids.
    pub fn metadata(&self, id: &[u8]) -> String {
        self.get(id)
            .map(|record| record.metadata().to_string())
            .unwrap_or_default()
    }

    /// Stored ids in key order.
    pub fn ids(&self) -> Vec<RecordId> {
        self.records.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn address(&self) -> Principal {
        self.address
    }

    pub fn storage(&self) -> Principal {
        self.storage
    }

    pub fn factory(&self) -> Principal {
        self.factory
    }

    pub fn write_policy(&self) -> WritePolicy {
        self.policy.write
    }

    pub fn is_initialized(&self) -> bool {
        self.guard.is_initialized()
    }

    fn invalid_reference(&self, reference: &'static str) -> ComponentError {
        ComponentError::InvalidReference {
            facet: self.facet,
            reference,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::lifecycle::shared;

    #[derive(Debug, Clone, PartialEq)]
    struct Note {
        id: RecordId,
        text: String,
        sealed: bool,
    }

    impl Record for Note {
        fn id(&self) -> &RecordId {
            &self.id
        }
        fn metadata(&self) -> &str {
            &self.text
        }
        fn is_encrypted(&self) -> bool {
            self.sealed
        }
    }

    fn note(id: &str, text: &str) -> Note {
        Note {
            id: RecordId::from(id),
            text: text.to_string(),
            sealed: false,
        }
    }

    struct Fixture {
        core: RegistryCore<Note>,
        acl: Shared<AccessControls>,
        admin: Principal,
        storage: Principal,
    }

    fn fixture(policy: RegistryPolicy) -> Fixture {
        let factory = Principal::from_label("factory");
        let admin = Principal::from_label("admin");
        let storage = Principal::from_label("storage");
        let acl = shared(AccessControls::new(Principal::from_label("acl"), factory));
        acl.write().initialize(factory, factory, admin).unwrap();

        let mut core = RegistryCore::new(
            Facet::Conditions,
            Principal::from_label("notes"),
            factory,
            policy,
        );
        core.initialize(factory, factory, acl.clone(), storage).unwrap();
        Fixture { core, acl, admin, storage }
    }

    #[test]
    fn test_empty_id_is_a_real_record() {
        let mut f = fixture(RegistryPolicy::default());
        let first = f.core.upsert_batch(f.storage, vec![note("", "a")]).unwrap().unwrap();
        let second = f.core.upsert_batch(f.storage, vec![note("", "b")]).unwrap().unwrap();

        assert!(matches!(
            first,
            RegistryEvent::RecordsUpserted { ref was_new, .. } if was_new == &vec![true]
        ));
        assert!(matches!(
            second,
            RegistryEvent::RecordsUpserted { ref was_new, .. } if was_new == &vec![false]
        ));
        assert!(f.core.contains(b""));
        assert_eq!(f.core.metadata(b""), "b");
    }

    #[test]
    fn test_duplicate_ids_within_one_batch() {
        let mut f = fixture(RegistryPolicy::default());
        let event = f
            .core
            .upsert_batch(f.storage, vec![note("x", "1"), note("x", "2")])
            .unwrap()
            .unwrap();
        match event {
            RegistryEvent::RecordsUpserted { was_new, metadata, .. } => {
                assert_eq!(was_new, vec![true, false]);
                assert_eq!(metadata, vec!["1".to_string(), "2".to_string()]);
            }
            other => panic!("unexpected event {other:?}"),
        }
        assert_eq!(f.core.metadata(b"x"), "2");
        assert_eq!(f.core.len(), 1);
    }

    #[test]
    fn test_empty_batch_emission_follows_policy() {
        let mut emitting = fixture(RegistryPolicy::default());
        let event = emitting.core.upsert_batch(emitting.storage, vec![]).unwrap();
        assert!(matches!(
            event,
            Some(RegistryEvent::RecordsUpserted { ref ids, .. }) if ids.is_empty()
        ));

        let mut quiet = fixture(RegistryPolicy {
            write: WritePolicy::Conjunctive,
            emit_empty_batches: false,
        });
        assert_eq!(quiet.core.upsert_batch(quiet.storage, vec![]).unwrap(), None);
        assert_eq!(quiet.core.remove_batch(quiet.storage, vec![]).unwrap(), None);
    }

    #[test]
    fn test_human_writer_alone_is_rejected_under_conjunctive_policy() {
        let mut f = fixture(RegistryPolicy::default());
        // The admin is seeded as human writer but is not an agent writer.
        let err = f.core.upsert_batch(f.admin, vec![note("a", "1")]).unwrap_err();
        assert!(err.is_unauthorized());
        assert!(f.core.is_empty());

        f.acl.write().add_agent_writer(f.admin, f.admin).unwrap();
        assert!(f.core.upsert_batch(f.admin, vec![note("a", "1")]).is_ok());
    }

    #[test]
    fn test_human_writer_alone_is_admitted_under_disjunctive_policy() {
        let mut f = fixture(RegistryPolicy {
            write: WritePolicy::Disjunctive,
            emit_empty_batches: true,
        });
        assert!(f.core.upsert_batch(f.admin, vec![note("a", "1")]).is_ok());
        assert_eq!(f.core.metadata(b"a"), "1");
    }

    #[test]
    fn test_initialize_rejects_zero_storage() {
        let factory = Principal::from_label("factory");
        let acl = shared(AccessControls::new(Principal::from_label("acl"), factory));
        let mut core: RegistryCore<Note> = RegistryCore::new(
            Facet::Listeners,
            Principal::from_label("l"),
            factory,
            RegistryPolicy::default(),
        );
        assert_eq!(
            core.initialize(factory, factory, acl, Principal::ZERO),
            Err(ComponentError::InvalidReference {
                facet: Facet::Listeners,
                reference: "storage"
            })
        );
        assert!(!core.is_initialized());
    }

    #[test]
    fn test_writes_before_initialize_fail() {
        let mut core: RegistryCore<Note> = RegistryCore::new(
            Facet::Evaluations,
            Principal::from_label("e"),
            Principal::from_label("factory"),
            RegistryPolicy::default(),
        );
        assert_eq!(
            core.remove_batch(Principal::from_label("anyone"), vec![RecordId::from("x")]),
            Err(ComponentError::NotInitialized { facet: Facet::Evaluations })
        );
    }

    #[test]
    fn test_record_id_hex_serialization() {
        let id = RecordId::from("c1");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"0x6331\"");
        let back: RecordId = serde_json::from_str("\"0x6331\"").unwrap();
        assert_eq!(back, id);
    }
}
