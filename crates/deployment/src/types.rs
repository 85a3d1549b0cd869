//! Remote resource model as reported by the control plane.
//!
//! These types are read-only to this crate: they come from the API client
//! and are only ever inspected, never mutated, during reconciliation.

use crate::component::ComponentKind;
use crate::size::MEMORY_RESOURCE;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A deployment and all of its component resources.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentInfo {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub healthy: bool,
    #[serde(default)]
    pub resources: Vec<RemoteResourceInfo>,
}

impl DeploymentInfo {
    /// All resources of a kind, in API order.
    pub fn resources_of(&self, kind: ComponentKind) -> impl Iterator<Item = &RemoteResourceInfo> {
        self.resources.iter().filter(move |r| r.kind == kind)
    }

    /// The first resource of a kind that has a provisioned current plan.
    pub fn provisioned(&self, kind: ComponentKind) -> Option<&RemoteResourceInfo> {
        self.resources_of(kind).find(|r| r.current_plan().is_some())
    }
}

/// One component resource of a deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteResourceInfo {
    pub kind: ComponentKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ref_id: Option<String>,
    /// ref_id of the elasticsearch cluster a companion is bound to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elasticsearch_cluster_ref_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info: Option<ResourceInfo>,
}

impl RemoteResourceInfo {
    /// The applied plan, if it has at least one provisioned topology element.
    pub fn current_plan(&self) -> Option<&Plan> {
        self.plan_info()
            .and_then(|p| p.current.as_ref())
            .and_then(|attempt| attempt.plan.as_ref())
            .filter(|plan| plan.provisioned().next().is_some())
    }

    /// The in-flight plan attempt, if any.
    pub fn pending(&self) -> Option<&PlanAttempt> {
        self.plan_info().and_then(|p| p.pending.as_ref())
    }

    fn plan_info(&self) -> Option<&PlanInfo> {
        self.info.as_ref().and_then(|i| i.plan_info.as_ref())
    }
}

/// Details of a resource once the control plane knows about it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub healthy: bool,
    /// Lifecycle status such as `initializing`, `started` or `stopped`
    #[serde(default)]
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan_info: Option<PlanInfo>,
}

/// Connection metadata, populated only once the resource is healthy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    /// Hostname
    #[serde(default)]
    pub endpoint: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ports: Option<Ports>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ports {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub https: Option<u16>,
}

/// Applied and in-flight plans of a resource.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current: Option<PlanAttempt>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending: Option<PlanAttempt>,
}

/// A plan together with the status of applying it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanAttempt {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan: Option<Plan>,
    #[serde(default)]
    pub status: PlanStatus,
    /// Failure detail reported by the control plane
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanStatus {
    #[default]
    Pending,
    InProgress,
    Success,
    Error,
}

/// Version plus topology. Used both for reported plans and for requests.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub topology: Vec<TopologyElement>,
}

impl Plan {
    /// Topology elements with a non-zero size, in API order.
    ///
    /// Zero-sized elements are unused slots and never count as configuration.
    pub fn provisioned(&self) -> impl Iterator<Item = &TopologyElement> {
        self.topology.iter().filter(|el| el.size_units() > 0)
    }
}

/// One sizing/placement unit of a plan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopologyElement {
    #[serde(default)]
    pub instance_configuration_id: String,
    #[serde(default)]
    pub zone_count: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<TopologySize>,
    /// Node roles keyed by flag name (`data`, `master`, `appserver`, ...)
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub node_type: BTreeMap<String, bool>,
}

impl TopologyElement {
    /// Memory size in raw units, zero when unset.
    pub fn size_units(&self) -> u32 {
        self.size
            .as_ref()
            .filter(|s| s.resource == MEMORY_RESOURCE)
            .map_or(0, |s| s.value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopologySize {
    pub resource: String,
    pub value: u32,
}

impl TopologySize {
    /// A memory size in raw units.
    pub fn memory(value: u32) -> Self {
        Self {
            resource: MEMORY_RESOURCE.to_string(),
            value,
        }
    }
}
