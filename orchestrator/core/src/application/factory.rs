// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Nibble Factory Application Service
//!
//! Deploys bundles with the clone-and-wire protocol, coordinating:
//! - Domain layer: `WiredBundle` instantiate / wire, bundle id derivation
//! - Infrastructure layer: address allocator, component host, bundle repository
//! - Event bus: one `BundleDeployed` per successful deployment
//!
//! A deployment either completes (components reachable, bundle recorded,
//! event published) or leaves no trace. Nothing is committed until all nine
//! components are wired.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::domain::bundle::{derive_bundle_id, Bundle, BundleComponents, ContractInfo, WiredBundle};
use crate::domain::errors::ComponentError;
use crate::domain::events::BundleEvent;
use crate::domain::lifecycle::AddressAllocator;
use crate::domain::node_config::FactoryConfigManifest;
use crate::domain::policy::RegistryPolicy;
use crate::domain::principal::{BundleId, Facet, Principal};
use crate::domain::repository::{BundleRepository, RepositoryError};
use crate::infrastructure::allocator::HashAddressAllocator;
use crate::infrastructure::clock::{Clock, SystemClock};
use crate::infrastructure::component_host::ComponentHost;
use crate::infrastructure::event_bus::EventBus;

#[derive(Debug, Error)]
pub enum FactoryError {
    #[error("Initialization of the {facet} component failed: {source}")]
    ComponentInitializationFailed {
        facet: Facet,
        #[source]
        source: ComponentError,
    },

    #[error("Index {index} out of range for creator {creator} ({count} bundles)")]
    IndexOutOfRange {
        creator: Principal,
        index: u64,
        count: u64,
    },

    #[error("No bundle with id {0}")]
    BundleNotFound(BundleId),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Result of a successful `deploy_nibble`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployedNibble {
    pub components: BundleComponents,
    pub id: BundleId,
    pub sequence_number: u64,
}

// ============================================================================
// Service Trait
// ============================================================================

#[async_trait]
pub trait FactoryService: Send + Sync {
    /// Instantiate, wire and record a new bundle administered by `caller`.
    async fn deploy_nibble(&self, caller: Principal) -> Result<DeployedNibble, FactoryError>;

    async fn get_bundle_count(&self, creator: Principal) -> Result<u64, FactoryError>;

    /// Component addresses of the creator's bundle at `index`.
    async fn get_bundle(
        &self,
        creator: Principal,
        index: u64,
    ) -> Result<BundleComponents, FactoryError>;

    async fn get_bundle_id(
        &self,
        creator: Principal,
        index: u64,
    ) -> Result<BundleId, FactoryError>;

    async fn get_sequence_number(
        &self,
        creator: Principal,
        index: u64,
    ) -> Result<u64, FactoryError>;

    async fn find_bundle_by_id(&self, id: &BundleId) -> Result<Bundle, FactoryError>;
}

// ============================================================================
// Standard Implementation
// ============================================================================

pub struct NibbleFactory {
    address: Principal,
    policy: RegistryPolicy,
    allocator: Arc<dyn AddressAllocator>,
    host: ComponentHost,
    bundles: Arc<dyn BundleRepository>,
    event_bus: Arc<EventBus>,
    clock: Arc<dyn Clock>,
    deploy_lock: Mutex<()>,
}

impl NibbleFactory {
    pub fn new(
        address: Principal,
        policy: RegistryPolicy,
        allocator: Arc<dyn AddressAllocator>,
        host: ComponentHost,
        bundles: Arc<dyn BundleRepository>,
        event_bus: Arc<EventBus>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            address,
            policy,
            allocator,
            host,
            bundles,
            event_bus,
            clock,
            deploy_lock: Mutex::new(()),
        }
    }

    /// Factory with the configured identity and policy, the hash allocator and
    /// the system clock.
    pub fn from_config(
        config: &FactoryConfigManifest,
        host: ComponentHost,
        bundles: Arc<dyn BundleRepository>,
        event_bus: Arc<EventBus>,
    ) -> Self {
        Self::new(
            config.factory_address(),
            config.registry_policy(),
            Arc::new(HashAddressAllocator::new()),
            host,
            bundles,
            event_bus,
            Arc::new(SystemClock),
        )
    }

    pub fn address(&self) -> Principal {
        self.address
    }

    pub fn policy(&self) -> RegistryPolicy {
        self.policy
    }

    pub fn host(&self) -> &ComponentHost {
        &self.host
    }

    /// Address of one facet of the creator's bundle at `index`.
    pub async fn get_component(
        &self,
        creator: Principal,
        index: u64,
        facet: Facet,
    ) -> Result<Principal, FactoryError> {
        Ok(self.get_bundle(creator, index).await?.get(facet))
    }

    /// Indexer view of the creator's bundle at `index`.
    pub async fn contract_infos(
        &self,
        creator: Principal,
        index: u64,
    ) -> Result<Vec<ContractInfo>, FactoryError> {
        Ok(self.get_bundle(creator, index).await?.contract_infos())
    }

    pub async fn list_bundles(&self, creator: Principal) -> Result<Vec<Bundle>, FactoryError> {
        Ok(self.bundles.list_by_creator(creator).await?)
    }

    /// Nine fresh, distinct, unoccupied addresses in [`Facet::ALL`] order.
    fn allocate_components(&self) -> Result<BundleComponents, FactoryError> {
        let mut seen = HashSet::new();
        let mut addresses = [Principal::ZERO; 9];
        for facet in Facet::ALL {
            let address = self.allocator.allocate(self.address, facet);
            if address.is_zero() {
                return Err(FactoryError::ComponentInitializationFailed {
                    facet,
                    source: ComponentError::InvalidReference {
                        facet,
                        reference: "address",
                    },
                });
            }
            if !seen.insert(address) || self.host.is_occupied(address) {
                return Err(FactoryError::ComponentInitializationFailed {
                    facet,
                    source: ComponentError::AddressInUse { address },
                });
            }
            addresses[facet.position()] = address;
        }
        Ok(BundleComponents::from_array(addresses))
    }

    async fn bundle_at(&self, creator: Principal, index: u64) -> Result<Bundle, FactoryError> {
        match self.bundles.find_by_creator_index(creator, index).await? {
            Some(bundle) => Ok(bundle),
            None => Err(FactoryError::IndexOutOfRange {
                creator,
                index,
                count: self.bundles.count_by_creator(creator).await?,
            }),
        }
    }

    async fn deploy(&self, caller: Principal) -> Result<DeployedNibble, FactoryError> {
        let _deploying = self.deploy_lock.lock().await;

        let components = self.allocate_components()?;
        let bundle = WiredBundle::instantiate(&components, self.address, self.policy);
        debug!("Wiring bundle components for creator {}", caller);
        bundle
            .wire(self.address, caller)
            .map_err(|(facet, source)| FactoryError::ComponentInitializationFailed {
                facet,
                source,
            })?;

        let sequence_number = self.bundles.count_by_creator(caller).await? + 1;
        let deployed_at = self.clock.now();
        let id = derive_bundle_id(caller, deployed_at, sequence_number);
        let record = Bundle {
            id: id.clone(),
            creator: caller,
            sequence_number,
            components,
            deployed_at,
        };

        let handles = bundle.handles();
        self.host
            .install(handles)
            .map_err(|source| FactoryError::ComponentInitializationFailed {
                facet: Facet::Storage,
                source,
            })?;
        if let Err(e) = self.bundles.append(&record).await {
            self.host.uninstall(&components.as_array());
            return Err(e.into());
        }

        self.event_bus.publish_bundle_event(BundleEvent::BundleDeployed {
            addresses: components.as_array(),
            id: id.clone(),
            sequence_number,
        });

        Ok(DeployedNibble {
            components,
            id,
            sequence_number,
        })
    }
}

#[async_trait]
impl FactoryService for NibbleFactory {
    async fn deploy_nibble(&self, caller: Principal) -> Result<DeployedNibble, FactoryError> {
        match self.deploy(caller).await {
            Ok(deployed) => {
                metrics::counter!("nibble_bundles_deployed_total").increment(1);
                info!(
                    "Deployed bundle {} for creator {} (sequence {})",
                    deployed.id, caller, deployed.sequence_number
                );
                Ok(deployed)
            }
            Err(e) => {
                let facet = match &e {
                    FactoryError::ComponentInitializationFailed { facet, .. } => facet.as_str(),
                    _ => "none",
                };
                metrics::counter!("nibble_deployments_failed_total", "facet" => facet).increment(1);
                warn!("Deployment for creator {} rolled back: {}", caller, e);
                Err(e)
            }
        }
    }

    async fn get_bundle_count(&self, creator: Principal) -> Result<u64, FactoryError> {
        Ok(self.bundles.count_by_creator(creator).await?)
    }

    async fn get_bundle(
        &self,
        creator: Principal,
        index: u64,
    ) -> Result<BundleComponents, FactoryError> {
        Ok(self.bundle_at(creator, index).await?.components)
    }

    async fn get_bundle_id(
        &self,
        creator: Principal,
        index: u64,
    ) -> Result<BundleId, FactoryError> {
        Ok(self.bundle_at(creator, index).await?.id)
    }

    async fn get_sequence_number(
        &self,
        creator: Principal,
        index: u64,
    ) -> Result<u64, FactoryError> {
        Ok(self.bundle_at(creator, index).await?.sequence_number)
    }

    async fn find_bundle_by_id(&self, id: &BundleId) -> Result<Bundle, FactoryError> {
        self.bundles
            .find_by_id(id)
            .await?
            .ok_or_else(|| FactoryError::BundleNotFound(id.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::clock::FixedClock;
    use crate::infrastructure::event_bus::DomainEvent;
    use crate::infrastructure::repositories::InMemoryBundleRepository;
    use chrono::{TimeZone, Utc};

    struct ConstantAllocator(Principal);

    impl AddressAllocator for ConstantAllocator {
        fn allocate(&self, _factory: Principal, _facet: Facet) -> Principal {
            self.0
        }
    }

    fn factory_with(allocator: Arc<dyn AddressAllocator>) -> (NibbleFactory, Arc<EventBus>) {
        let event_bus = Arc::new(EventBus::new(64));
        let factory = NibbleFactory::new(
            Principal::from_label("factory"),
            RegistryPolicy::default(),
            allocator,
            ComponentHost::new(),
            Arc::new(InMemoryBundleRepository::new()),
            event_bus.clone(),
            Arc::new(FixedClock(Utc.timestamp_millis_opt(1_700_000_000_000).unwrap())),
        );
        (factory, event_bus)
    }

    fn factory() -> (NibbleFactory, Arc<EventBus>) {
        factory_with(Arc::new(HashAddressAllocator::new()))
    }

    #[tokio::test]
    async fn test_first_bundle_has_sequence_one() {
        let (factory, bus) = factory();
        let mut events = bus.subscribe();
        let alice = Principal::from_label("alice");

        let deployed = factory.deploy_nibble(alice).await.unwrap();
        assert_eq!(deployed.sequence_number, 1);
        assert_eq!(factory.get_bundle_count(alice).await.unwrap(), 1);
        assert_eq!(factory.get_bundle(alice, 0).await.unwrap(), deployed.components);
        assert_eq!(factory.get_bundle_id(alice, 0).await.unwrap(), deployed.id);
        assert_eq!(factory.get_sequence_number(alice, 0).await.unwrap(), 1);
        assert_eq!(factory.host().len(), 9);

        assert_eq!(
            events.try_recv().unwrap(),
            DomainEvent::Bundle(BundleEvent::BundleDeployed {
                addresses: deployed.components.as_array(),
                id: deployed.id,
                sequence_number: 1,
            })
        );
    }

    #[tokio::test]
    async fn test_index_out_of_range() {
        let (factory, _) = factory();
        let alice = Principal::from_label("alice");
        factory.deploy_nibble(alice).await.unwrap();

        let err = factory.get_bundle(alice, 1).await.unwrap_err();
        assert!(matches!(
            err,
            FactoryError::IndexOutOfRange { creator, index: 1, count: 1 } if creator == alice
        ));
        assert!(matches!(
            factory.get_bundle_id(Principal::from_label("bob"), 0).await,
            Err(FactoryError::IndexOutOfRange { count: 0, .. })
        ));
        assert!(matches!(
            factory.get_sequence_number(alice, u64::MAX).await,
            Err(FactoryError::IndexOutOfRange { .. })
        ));
    }

    #[tokio::test]
    async fn test_zero_admin_rolls_back_everything() {
        let (factory, bus) = factory();
        let mut events = bus.subscribe();

        let err = factory.deploy_nibble(Principal::ZERO).await.unwrap_err();
        match err {
            FactoryError::ComponentInitializationFailed { facet, source } => {
                assert_eq!(facet, Facet::AccessControls);
                assert_eq!(source, ComponentError::AdminCannotBeZero);
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert_eq!(factory.get_bundle_count(Principal::ZERO).await.unwrap(), 0);
        assert!(factory.host().is_empty());
        assert!(events.drain().is_empty());
    }

    #[tokio::test]
    async fn test_colliding_allocator_names_the_facet() {
        let (factory, _) = factory_with(Arc::new(ConstantAllocator(Principal::from_label("same"))));
        let err = factory.deploy_nibble(Principal::from_label("alice")).await.unwrap_err();
        assert!(matches!(
            err,
            FactoryError::ComponentInitializationFailed {
                facet: Facet::Listeners,
                source: ComponentError::AddressInUse { .. }
            }
        ));
        assert!(factory.host().is_empty());
    }

    #[tokio::test]
    async fn test_zero_address_allocator_fails_on_storage() {
        let (factory, _) = factory_with(Arc::new(ConstantAllocator(Principal::ZERO)));
        let err = factory.deploy_nibble(Principal::from_label("alice")).await.unwrap_err();
        assert!(matches!(
            err,
            FactoryError::ComponentInitializationFailed {
                facet: Facet::Storage,
                source: ComponentError::InvalidReference { reference: "address", .. }
            }
        ));
    }

    #[tokio::test]
    async fn test_find_bundle_by_id() {
        let (factory, _) = factory();
        let alice = Principal::from_label("alice");
        let deployed = factory.deploy_nibble(alice).await.unwrap();

        let bundle = factory.find_bundle_by_id(&deployed.id).await.unwrap();
        assert_eq!(bundle.creator, alice);
        assert_eq!(bundle.components, deployed.components);
        assert_eq!(
            factory.contract_infos(alice, 0).await.unwrap()[0].name,
            "NibbleStorage"
        );
        assert_eq!(
            factory.get_component(alice, 0, Facet::Workflows).await.unwrap(),
            deployed.components.workflows
        );

        let missing = BundleId::new(vec![0; 32]);
        assert!(matches!(
            factory.find_bundle_by_id(&missing).await,
            Err(FactoryError::BundleNotFound(id)) if id == missing
        ));
    }

    #[tokio::test]
    async fn test_fixed_clock_still_yields_distinct_ids() {
        let (factory, _) = factory();
        let alice = Principal::from_label("alice");
        let first = factory.deploy_nibble(alice).await.unwrap();
        let second = factory.deploy_nibble(alice).await.unwrap();
        assert_ne!(first.id, second.id);
        assert_eq!(second.sequence_number, 2);
        assert_eq!(factory.list_bundles(alice).await.unwrap().len(), 2);
    }
}
