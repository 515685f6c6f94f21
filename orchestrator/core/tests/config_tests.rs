// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use std::io::Write;
use std::sync::Arc;

use nibble_core::application::factory::{FactoryService, NibbleFactory};
use nibble_core::application::gateway::NibbleGateway;
use nibble_core::domain::access_controls::Role;
use nibble_core::domain::adapter::{Conditions, MetadataRecord};
use nibble_core::domain::node_config::FactoryConfigManifest;
use nibble_core::domain::policy::WritePolicy;
use nibble_core::domain::principal::Principal;
use nibble_core::infrastructure::component_host::ComponentHost;
use nibble_core::infrastructure::event_bus::EventBus;
use nibble_core::infrastructure::repositories::InMemoryBundleRepository;

const DISJUNCTIVE_CONFIG: &str = r#"
apiVersion: nibble.dev/v1
kind: FactoryConfig
metadata:
  name: staging-factory
  labels:
    environment: staging
spec:
  authorization:
    write_policy: disjunctive
  events:
    capacity: 32
  logging:
    level: debug
    format: json
"#;

#[tokio::test]
async fn test_factory_built_from_config_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(DISJUNCTIVE_CONFIG.as_bytes()).unwrap();

    let config = FactoryConfigManifest::from_yaml_file(file.path()).unwrap();
    config.validate().unwrap();
    assert_eq!(config.spec.events.capacity, 32);
    assert_eq!(config.spec.logging.format, "json");

    let host = ComponentHost::new();
    let bus = Arc::new(EventBus::new(config.spec.events.capacity));
    let factory = NibbleFactory::from_config(
        &config,
        host.clone(),
        Arc::new(InMemoryBundleRepository::new()),
        bus.clone(),
    );
    assert_eq!(factory.address(), Principal::from_label("staging-factory"));
    assert_eq!(factory.policy().write, WritePolicy::Disjunctive);

    // Under the disjunctive policy the creator's seeded human-writer role is
    // enough to write.
    let creator = Principal::from_label("creator");
    let nibble = factory.deploy_nibble(creator).await.unwrap();
    let gateway = NibbleGateway::new(host, bus);
    gateway
        .upsert_adapters::<Conditions>(
            creator,
            nibble.components.conditions,
            vec![MetadataRecord::new("c1", "temp>30", false)],
        )
        .unwrap();
    assert!(!gateway
        .has_role(nibble.components.access_controls, Role::AgentWriter, creator)
        .unwrap());
}

#[test]
fn test_invalid_config_file_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nibble-config.yaml");
    std::fs::write(
        &path,
        "apiVersion: nibble.dev/v1\nkind: FactoryConfig\nmetadata:\n  name: broken\nspec:\n  events:\n    capacity: 0\n",
    )
    .unwrap();

    assert!(FactoryConfigManifest::load_or_default(Some(path)).is_err());
}

#[test]
fn test_unknown_write_policy_fails_to_parse() {
    let yaml = "apiVersion: nibble.dev/v1\nkind: FactoryConfig\nmetadata:\n  name: f\n\
                spec:\n  authorization:\n    write_policy: sometimes\n";
    assert!(FactoryConfigManifest::from_yaml_str(yaml).is_err());
}
