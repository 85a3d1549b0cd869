//! Sample remote and desired documents for tests.
//!
//! Everything is derived from an explicit [`FixtureConfig`]; there are no
//! shared name prefixes or other process-wide fixtures.

use crate::component::ComponentKind;
use crate::desired::{ComponentSpec, DesiredState, TopologySpec};
use crate::size;
use crate::types::{
    DeploymentInfo, Metadata, Plan, PlanAttempt, PlanInfo, PlanStatus, Ports, RemoteResourceInfo,
    ResourceInfo, TopologyElement, TopologySize,
};

/// Knobs shared by the fixtures of one test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixtureConfig {
    pub name_prefix: String,
    pub region: String,
    pub version: String,
}

impl Default for FixtureConfig {
    fn default() -> Self {
        Self {
            name_prefix: "ecdeploy_acc_".to_string(),
            region: "us-east-1".to_string(),
            version: "7.8.1".to_string(),
        }
    }
}

impl FixtureConfig {
    /// Deployment name for a test suffix.
    pub fn name(&self, suffix: &str) -> String {
        format!("{}{suffix}", self.name_prefix)
    }

    /// Deployment id for a test suffix.
    pub fn id(&self, suffix: &str) -> String {
        format!("{suffix}-0123456789abcdef")
    }

    /// Size each kind is provisioned with.
    pub fn size_units(&self, kind: ComponentKind) -> u32 {
        match kind {
            ComponentKind::Elasticsearch => 4096,
            ComponentKind::Kibana => 1024,
            ComponentKind::Apm => 512,
            ComponentKind::Appsearch | ComponentKind::EnterpriseSearch => 2048,
        }
    }

    /// A healthy, fully applied resource of `kind`.
    pub fn resource(&self, suffix: &str, kind: ComponentKind) -> RemoteResourceInfo {
        let descriptor = kind.descriptor();
        let element = TopologyElement {
            instance_configuration_id: descriptor.default_instance_configuration_id.to_string(),
            zone_count: descriptor.default_zone_count,
            size: Some(TopologySize::memory(self.size_units(kind))),
            node_type: descriptor
                .node_types
                .iter()
                .map(|flag| (flag.name.to_string(), flag.default))
                .collect(),
        };

        RemoteResourceInfo {
            kind,
            ref_id: Some(descriptor.default_ref_id.to_string()),
            elasticsearch_cluster_ref_id: (!kind.is_primary()).then(|| {
                ComponentKind::Elasticsearch
                    .descriptor()
                    .default_ref_id
                    .to_string()
            }),
            region: Some(self.region.clone()),
            info: Some(ResourceInfo {
                id: Some(format!("{}-{kind}", self.id(suffix))),
                name: Some(self.name(suffix)),
                region: self.region.clone(),
                healthy: true,
                status: "started".to_string(),
                metadata: Some(Metadata {
                    endpoint: format!("{kind}.{suffix}.cloud.example"),
                    ports: Some(Ports {
                        http: Some(9200),
                        https: Some(9243),
                    }),
                }),
                plan_info: Some(PlanInfo {
                    current: Some(PlanAttempt {
                        plan: Some(Plan {
                            version: self.version.clone(),
                            topology: vec![element],
                        }),
                        status: PlanStatus::Success,
                        error: None,
                    }),
                    pending: None,
                }),
            }),
        }
    }

    /// A resource still provisioning for the first time: pending plan only.
    pub fn pending_only(&self, kind: ComponentKind) -> RemoteResourceInfo {
        RemoteResourceInfo {
            kind,
            ref_id: Some(kind.descriptor().default_ref_id.to_string()),
            elasticsearch_cluster_ref_id: None,
            region: Some(self.region.clone()),
            info: Some(ResourceInfo {
                region: self.region.clone(),
                status: "initializing".to_string(),
                plan_info: Some(PlanInfo {
                    current: None,
                    pending: Some(PlanAttempt {
                        plan: Some(Plan {
                            version: self.version.clone(),
                            topology: vec![TopologyElement {
                                instance_configuration_id: kind
                                    .descriptor()
                                    .default_instance_configuration_id
                                    .to_string(),
                                zone_count: 1,
                                size: Some(TopologySize::memory(self.size_units(kind))),
                                ..Default::default()
                            }],
                        }),
                        status: PlanStatus::InProgress,
                        error: None,
                    }),
                }),
                ..Default::default()
            }),
        }
    }

    /// A healthy deployment with one applied resource per kind.
    pub fn deployment(&self, suffix: &str, kinds: &[ComponentKind]) -> DeploymentInfo {
        DeploymentInfo {
            id: self.id(suffix),
            name: self.name(suffix),
            healthy: true,
            resources: kinds.iter().map(|kind| self.resource(suffix, *kind)).collect(),
        }
    }

    /// Desired state matching [`FixtureConfig::deployment`] for the same kinds.
    pub fn desired(&self, suffix: &str, kinds: &[ComponentKind]) -> DesiredState {
        let mut desired = DesiredState::new(self.name(suffix), self.region.clone());
        if !kinds.contains(&ComponentKind::Elasticsearch) {
            desired = desired.with_component(
                ComponentKind::Elasticsearch,
                self.spec(ComponentKind::Elasticsearch),
            );
        }
        for kind in kinds {
            desired = desired.with_component(*kind, self.spec(*kind));
        }
        desired
    }

    fn spec(&self, kind: ComponentKind) -> ComponentSpec {
        ComponentSpec::default()
            .version(self.version.clone())
            .element(TopologySpec::sized(size::encode(self.size_units(kind))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_use_prefix() {
        let cfg = FixtureConfig {
            name_prefix: "acc-".to_string(),
            ..Default::default()
        };
        assert_eq!(cfg.name("basic"), "acc-basic");
    }

    #[test]
    fn test_resource_is_provisioned() {
        let cfg = FixtureConfig::default();
        for kind in ComponentKind::all() {
            assert!(cfg.resource("x", *kind).current_plan().is_some());
            assert!(cfg.pending_only(*kind).current_plan().is_none());
        }
    }

    #[test]
    fn test_desired_always_has_primary() {
        let desired = FixtureConfig::default().desired("x", &[ComponentKind::Apm]);
        assert!(desired.component(ComponentKind::Elasticsearch).is_some());
        assert!(desired.component(ComponentKind::Apm).is_some());
    }
}
