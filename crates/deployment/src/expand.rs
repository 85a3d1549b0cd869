//! Expand desired component specs into request-shaped plans.
//!
//! Each field the spec leaves unset is resolved in this order:
//! 1. the value in the current remote plan (update path)
//! 2. the kind's default from its [`ComponentDescriptor`]
//! 3. otherwise the field is mandatory and expansion fails
//!
//! `ref_id` is the exception: it comes from the spec or the kind default only,
//! so companion references can be checked without reading remote state.
//!
//! [`ComponentDescriptor`]: crate::component::ComponentDescriptor

use crate::component::ComponentKind;
use crate::desired::{ComponentSpec, TopologySpec};
use crate::error::{Error, Result};
use crate::size;
use crate::types::{Plan, RemoteResourceInfo, TopologyElement, TopologySize};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Request-shaped plan for one component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentRequest {
    pub kind: ComponentKind,
    pub ref_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elasticsearch_cluster_ref_id: Option<String>,
    pub region: String,
    pub plan: Plan,
}

/// Deployment-level values a component expansion depends on.
#[derive(Debug, Clone, Copy)]
pub struct ExpandContext<'a> {
    pub region: &'a str,
    /// Resolved ref_id of the elasticsearch component
    pub primary_ref_id: &'a str,
    /// Resolved version of the elasticsearch component, if known
    pub primary_version: Option<&'a str>,
}

/// Expand a desired spec, inheriting unset fields from `current` when given.
pub fn expand(
    kind: ComponentKind,
    spec: &ComponentSpec,
    current: Option<&RemoteResourceInfo>,
    ctx: &ExpandContext<'_>,
) -> Result<ComponentRequest> {
    let remote_plan = current.and_then(RemoteResourceInfo::current_plan);

    let version = resolve_version(kind, spec, remote_plan, ctx)?;
    let topology = if spec.topology.is_empty() {
        match remote_plan {
            Some(plan) => {
                log::debug!("{kind}: no topology declared, keeping remote topology");
                plan.provisioned().cloned().collect()
            }
            None => {
                return Err(Error::IncompleteSpec {
                    kind,
                    field: "topology",
                });
            }
        }
    } else {
        let remote: Vec<&TopologyElement> =
            remote_plan.map(|p| p.provisioned().collect()).unwrap_or_default();
        spec.topology
            .iter()
            .enumerate()
            .map(|(index, el)| expand_element(kind, el, match_remote(&remote, el, index)))
            .collect::<Result<Vec<_>>>()?
    };

    let ref_id = spec.resolved_ref_id(kind);

    let elasticsearch_cluster_ref_id = if kind.is_primary() {
        None
    } else {
        Some(
            spec.elasticsearch_cluster_ref_id
                .clone()
                .unwrap_or_else(|| ctx.primary_ref_id.to_string()),
        )
    };

    Ok(ComponentRequest {
        kind,
        ref_id,
        elasticsearch_cluster_ref_id,
        region: ctx.region.to_string(),
        plan: Plan { version, topology },
    })
}

fn resolve_version(
    kind: ComponentKind,
    spec: &ComponentSpec,
    remote_plan: Option<&Plan>,
    ctx: &ExpandContext<'_>,
) -> Result<String> {
    if let Some(version) = spec.version.as_ref().filter(|v| !v.is_empty()) {
        return Ok(version.clone());
    }
    if let Some(plan) = remote_plan
        && !plan.version.is_empty()
    {
        return Ok(plan.version.clone());
    }
    if !kind.is_primary()
        && let Some(version) = ctx.primary_version
    {
        return Ok(version.to_string());
    }
    Err(Error::IncompleteSpec {
        kind,
        field: "version",
    })
}

/// Remote element a desired element inherits from: same instance
/// configuration when the spec names one, otherwise the same position.
fn match_remote<'a>(
    remote: &[&'a TopologyElement],
    element: &TopologySpec,
    index: usize,
) -> Option<&'a TopologyElement> {
    match &element.instance_configuration_id {
        Some(id) => remote
            .iter()
            .find(|r| &r.instance_configuration_id == id)
            .copied(),
        None => remote.get(index).copied(),
    }
}

fn expand_element(
    kind: ComponentKind,
    element: &TopologySpec,
    remote: Option<&TopologyElement>,
) -> Result<TopologyElement> {
    let descriptor = kind.descriptor();

    let instance_configuration_id = element
        .instance_configuration_id
        .clone()
        .or_else(|| remote.map(|r| r.instance_configuration_id.clone()))
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| descriptor.default_instance_configuration_id.to_string());

    let units = match (&element.size, remote) {
        (Some(capacity), _) => size::decode(capacity)?,
        (None, Some(r)) if r.size_units() > 0 => r.size_units(),
        (None, _) => match descriptor.default_size {
            Some(default) => size::decode(default)?,
            None => return Err(Error::IncompleteSpec { kind, field: "size" }),
        },
    };

    let zone_count = element
        .zone_count
        .or_else(|| remote.map(|r| r.zone_count).filter(|z| *z > 0))
        .unwrap_or(descriptor.default_zone_count);

    for flag in element.node_type.keys() {
        if descriptor.node_type(flag).is_none() {
            return Err(Error::UnknownNodeType {
                kind,
                flag: flag.clone(),
            });
        }
    }

    let mut node_type: BTreeMap<String, bool> = match remote {
        Some(r) => r.node_type.clone(),
        None => descriptor
            .node_types
            .iter()
            .map(|flag| (flag.name.to_string(), flag.default))
            .collect(),
    };
    node_type.extend(element.node_type.iter().map(|(k, v)| (k.clone(), *v)));

    Ok(TopologyElement {
        instance_configuration_id,
        zone_count,
        size: Some(TopologySize::memory(units)),
        node_type,
    })
}
