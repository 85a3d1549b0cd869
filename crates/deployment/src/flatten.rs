//! Flatten remote resources into the flat state the orchestration host stores.
//!
//! A component with no provisioned current plan flattens to nothing at all.
//! Re-reading an unconfigured component must never synthesize state,
//! otherwise the host would see a diff for something the user never asked for.

use crate::component::{ComponentKind, NODE_TYPE_PREFIX};
use crate::desired::{ComponentSpec, TopologySpec};
use crate::endpoint;
use crate::size;
use crate::types::{RemoteResourceInfo, TopologyElement};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Flat, reconciled state of one component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlatComponentState {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub ref_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub resource_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub display_name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub version: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub region: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elasticsearch_cluster_ref_id: Option<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub http_endpoint: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub https_endpoint: String,
    pub topology: Vec<FlatTopologyElement>,
}

/// Flat form of one topology element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlatTopologyElement {
    pub instance_configuration_id: String,
    pub memory_per_node: String,
    pub zone_count: i32,
    /// `node_type_<flag>` attributes
    #[serde(flatten)]
    pub node_types: BTreeMap<String, bool>,
}

/// Flatten one resource of `kind`.
///
/// `sibling_ref_id` fills in a companion's elasticsearch binding when the
/// API does not report one. Returns `None` when the resource is absent or
/// has no provisioned current plan.
pub fn flatten_resource(
    resource: Option<&RemoteResourceInfo>,
    kind: ComponentKind,
    sibling_ref_id: Option<&str>,
) -> Option<FlatComponentState> {
    let resource = resource.filter(|r| r.kind == kind)?;
    let plan = resource.current_plan()?;
    let info = resource.info.as_ref()?;

    let endpoints = endpoint::from_metadata(info.metadata.as_ref());
    let region = resource
        .region
        .clone()
        .filter(|r| !r.is_empty())
        .unwrap_or_else(|| info.region.clone());

    let elasticsearch_cluster_ref_id = if kind.is_primary() {
        None
    } else {
        resource
            .elasticsearch_cluster_ref_id
            .clone()
            .or_else(|| sibling_ref_id.map(str::to_string))
    };

    Some(FlatComponentState {
        ref_id: resource.ref_id.clone().unwrap_or_default(),
        resource_id: info.id.clone().unwrap_or_default(),
        display_name: info.name.clone().unwrap_or_default(),
        version: plan.version.clone(),
        region,
        elasticsearch_cluster_ref_id,
        http_endpoint: endpoints.http,
        https_endpoint: endpoints.https,
        topology: plan
            .provisioned()
            .map(|el| flatten_element(kind, el))
            .collect(),
    })
}

/// Flatten a list of resources of one kind, dropping those that are absent.
pub fn flatten_resources(
    resources: &[RemoteResourceInfo],
    kind: ComponentKind,
) -> Vec<FlatComponentState> {
    resources
        .iter()
        .filter_map(|r| flatten_resource(Some(r), kind, None))
        .collect()
}

fn flatten_element(kind: ComponentKind, element: &TopologyElement) -> FlatTopologyElement {
    let node_types = kind
        .descriptor()
        .node_types
        .iter()
        .filter_map(|flag| {
            element
                .node_type
                .get(flag.name)
                .map(|value| (format!("{NODE_TYPE_PREFIX}{}", flag.name), *value))
        })
        .collect();

    FlatTopologyElement {
        instance_configuration_id: element.instance_configuration_id.clone(),
        memory_per_node: size::encode(element.size_units()),
        zone_count: element.zone_count,
        node_types,
    }
}

impl FlatComponentState {
    /// A desired spec that pins everything this state reports.
    ///
    /// Building a change request from this spec against the same remote
    /// state yields a no-op.
    pub fn to_spec(&self) -> ComponentSpec {
        ComponentSpec {
            ref_id: Some(self.ref_id.clone()).filter(|r| !r.is_empty()),
            elasticsearch_cluster_ref_id: self.elasticsearch_cluster_ref_id.clone(),
            version: Some(self.version.clone()).filter(|v| !v.is_empty()),
            topology: self.topology.iter().map(FlatTopologyElement::to_spec).collect(),
        }
    }
}

impl FlatTopologyElement {
    fn to_spec(&self) -> TopologySpec {
        TopologySpec {
            instance_configuration_id: Some(self.instance_configuration_id.clone()),
            size: Some(self.memory_per_node.clone()),
            zone_count: Some(self.zone_count),
            node_type: self
                .node_types
                .iter()
                .filter_map(|(key, value)| {
                    key.strip_prefix(NODE_TYPE_PREFIX)
                        .map(|flag| (flag.to_string(), *value))
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{
        Metadata, Plan, PlanAttempt, PlanInfo, PlanStatus, Ports, ResourceInfo, TopologySize,
    };
    use serde_json::json;

    fn enterprise_search_resource() -> RemoteResourceInfo {
        RemoteResourceInfo {
            kind: ComponentKind::EnterpriseSearch,
            ref_id: Some("main-enterprise_search".to_string()),
            elasticsearch_cluster_ref_id: Some("main-elasticsearch".to_string()),
            region: Some("some-region".to_string()),
            info: Some(ResourceInfo {
                id: Some("320b7b540dfc967a7a649c18e2fce4ed".to_string()),
                name: Some("some-enterprisesearch-name".to_string()),
                region: "some-region".to_string(),
                healthy: true,
                status: "started".to_string(),
                metadata: Some(Metadata {
                    endpoint: "h.cloud.example".to_string(),
                    ports: Some(Ports {
                        http: Some(9200),
                        https: Some(9243),
                    }),
                }),
                plan_info: Some(PlanInfo {
                    current: Some(PlanAttempt {
                        plan: Some(Plan {
                            version: "7.7.0".to_string(),
                            topology: vec![TopologyElement {
                                instance_configuration_id: "aws.x.r4".to_string(),
                                zone_count: 1,
                                size: Some(TopologySize::memory(1024)),
                                node_type: BTreeMap::from([
                                    ("appserver".to_string(), true),
                                    ("worker".to_string(), false),
                                ]),
                            }],
                        }),
                        status: PlanStatus::Success,
                        error: None,
                    }),
                    pending: None,
                }),
            }),
        }
    }

    #[test]
    fn test_empty_resource_list_flattens_to_nothing() {
        assert!(flatten_resources(&[], ComponentKind::EnterpriseSearch).is_empty());
    }

    #[test]
    fn test_pending_only_flattens_to_nothing() {
        let res = RemoteResourceInfo {
            kind: ComponentKind::EnterpriseSearch,
            ref_id: None,
            elasticsearch_cluster_ref_id: None,
            region: None,
            info: Some(ResourceInfo {
                plan_info: Some(PlanInfo {
                    current: None,
                    pending: Some(PlanAttempt::default()),
                }),
                ..Default::default()
            }),
        };
        assert!(flatten_resources(&[res], ComponentKind::EnterpriseSearch).is_empty());
    }

    #[test]
    fn test_absent_resource_flattens_to_none() {
        assert!(flatten_resource(None, ComponentKind::Kibana, None).is_none());
    }

    #[test]
    fn test_kind_mismatch_flattens_to_none() {
        let res = enterprise_search_resource();
        assert!(flatten_resource(Some(&res), ComponentKind::Kibana, None).is_none());
    }

    #[test]
    fn test_parses_full_resource() {
        let got = flatten_resources(&[enterprise_search_resource()], ComponentKind::EnterpriseSearch);
        assert_eq!(got.len(), 1);
        assert_eq!(
            serde_json::to_value(&got[0]).unwrap(),
            json!({
                "elasticsearch_cluster_ref_id": "main-elasticsearch",
                "display_name": "some-enterprisesearch-name",
                "ref_id": "main-enterprise_search",
                "resource_id": "320b7b540dfc967a7a649c18e2fce4ed",
                "version": "7.7.0",
                "region": "some-region",
                "http_endpoint": "http://h.cloud.example:9200",
                "https_endpoint": "https://h.cloud.example:9243",
                "topology": [{
                    "instance_configuration_id": "aws.x.r4",
                    "memory_per_node": "1g",
                    "zone_count": 1,
                    "node_type_appserver": true,
                    "node_type_worker": false
                }]
            })
        );
    }

    #[test]
    fn test_missing_metadata_omits_endpoints() {
        let mut res = enterprise_search_resource();
        res.info.as_mut().unwrap().metadata = None;
        let flat = flatten_resource(Some(&res), ComponentKind::EnterpriseSearch, None).unwrap();
        let value = serde_json::to_value(&flat).unwrap();
        assert!(value.get("http_endpoint").is_none());
        assert!(value.get("https_endpoint").is_none());
    }

    #[test]
    fn test_sibling_ref_fills_missing_binding() {
        let mut res = enterprise_search_resource();
        res.elasticsearch_cluster_ref_id = None;
        let flat =
            flatten_resource(Some(&res), ComponentKind::EnterpriseSearch, Some("es-ref")).unwrap();
        assert_eq!(flat.elasticsearch_cluster_ref_id.as_deref(), Some("es-ref"));
    }

    #[test]
    fn test_topology_order_follows_api() {
        let mut res = enterprise_search_resource();
        let plan = res
            .info
            .as_mut()
            .unwrap()
            .plan_info
            .as_mut()
            .unwrap()
            .current
            .as_mut()
            .unwrap()
            .plan
            .as_mut()
            .unwrap();
        let mut second = plan.topology[0].clone();
        second.instance_configuration_id = "aws.a.first-alphabetically".to_string();
        second.size = Some(TopologySize::memory(512));
        plan.topology.push(second);
        plan.topology.push(TopologyElement {
            instance_configuration_id: "aws.unused".to_string(),
            ..Default::default()
        });

        let flat = flatten_resource(Some(&res), ComponentKind::EnterpriseSearch, None).unwrap();
        let ids: Vec<_> = flat
            .topology
            .iter()
            .map(|el| el.instance_configuration_id.as_str())
            .collect();
        assert_eq!(ids, vec!["aws.x.r4", "aws.a.first-alphabetically"]);
        assert_eq!(flat.topology[1].memory_per_node, "512m");
    }

    #[test]
    fn test_flags_not_defined_for_kind_are_dropped() {
        let mut res = enterprise_search_resource();
        res.kind = ComponentKind::Kibana;
        let flat = flatten_resource(Some(&res), ComponentKind::Kibana, None).unwrap();
        assert!(flat.topology[0].node_types.is_empty());
    }

    #[test]
    fn test_flatten_is_byte_identical() {
        let res = enterprise_search_resource();
        let first = serde_json::to_string(&flatten_resources(
            std::slice::from_ref(&res),
            ComponentKind::EnterpriseSearch,
        ))
        .unwrap();
        let second = serde_json::to_string(&flatten_resources(
            std::slice::from_ref(&res),
            ComponentKind::EnterpriseSearch,
        ))
        .unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_to_spec_strips_node_type_prefix() {
        let flat = flatten_resource(
            Some(&enterprise_search_resource()),
            ComponentKind::EnterpriseSearch,
            None,
        )
        .unwrap();
        let spec = flat.to_spec();
        assert_eq!(spec.version.as_deref(), Some("7.7.0"));
        assert_eq!(spec.topology[0].size.as_deref(), Some("1g"));
        assert_eq!(spec.topology[0].node_type.get("appserver"), Some(&true));
        assert_eq!(spec.topology[0].node_type.get("worker"), Some(&false));
    }
}
