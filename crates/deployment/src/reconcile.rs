//! Deployment-level reconciliation.
//!
//! [`flatten`] turns a remote deployment into the flat state the host stores.
//! [`build_change_request`] turns desired state plus the current remote
//! deployment into the full request to submit, classifying each component so
//! the host can skip the call when nothing would change.

use crate::component::ComponentKind;
use crate::desired::DesiredState;
use crate::error::{Error, Result};
use crate::expand::{self, ComponentRequest, ExpandContext};
use crate::flatten::{self, FlatComponentState};
use crate::size;
use crate::types::{DeploymentInfo, Plan};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Flat state of a whole deployment, keyed by component kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlatDeploymentState {
    pub id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub region: String,
    #[serde(flatten)]
    pub components: BTreeMap<ComponentKind, FlatComponentState>,
}

impl FlatDeploymentState {
    pub fn component(&self, kind: ComponentKind) -> Option<&FlatComponentState> {
        self.components.get(&kind)
    }

    /// Desired state that reproduces this deployment exactly.
    pub fn to_desired(&self) -> DesiredState {
        DesiredState {
            name: self.name.clone(),
            region: self.region.clone(),
            components: self
                .components
                .iter()
                .map(|(kind, state)| (*kind, state.to_spec()))
                .collect(),
        }
    }
}

/// Flatten every component of a remote deployment. Never fails; components
/// without a provisioned current plan are left out.
pub fn flatten(remote: &DeploymentInfo) -> FlatDeploymentState {
    let primary = flatten::flatten_resource(
        remote.provisioned(ComponentKind::Elasticsearch),
        ComponentKind::Elasticsearch,
        None,
    );
    let primary_ref = primary.as_ref().map(|p| p.ref_id.as_str()).filter(|r| !r.is_empty());

    let mut components = BTreeMap::new();
    for kind in ComponentKind::all().iter().filter(|k| !k.is_primary()) {
        if let Some(state) =
            flatten::flatten_resource(remote.provisioned(*kind), *kind, primary_ref)
        {
            components.insert(*kind, state);
        }
    }

    let region = primary.as_ref().map(|p| p.region.clone()).unwrap_or_default();
    if let Some(primary) = primary {
        components.insert(ComponentKind::Elasticsearch, primary);
    }

    FlatDeploymentState {
        id: remote.id.clone(),
        name: remote.name.clone(),
        region,
        components,
    }
}

/// What submitting a component's plan would do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeAction {
    /// Not present remotely yet
    Create,
    /// Desired plan equals the current plan
    NoChange,
    /// Only sizes or zone counts differ
    Resize,
    /// Elements, instance configurations or node roles differ
    TopologyChange,
    /// Version differs
    VersionChange,
    /// Present remotely, absent from desired state
    Remove,
}

impl ChangeAction {
    pub fn is_change(&self) -> bool {
        !matches!(self, Self::NoChange)
    }
}

/// One component's entry in a change request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentChange {
    pub kind: ComponentKind,
    pub ref_id: String,
    pub action: ChangeAction,
    /// Full desired plan; `None` only for removals
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request: Option<ComponentRequest>,
}

/// The full set of component plans to submit for a deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRequest {
    pub name: String,
    pub region: String,
    pub components: Vec<ComponentChange>,
}

impl ChangeRequest {
    /// True when submitting would change nothing.
    pub fn is_noop(&self) -> bool {
        self.components.iter().all(|c| !c.action.is_change())
    }

    pub fn component(&self, kind: ComponentKind) -> Option<&ComponentChange> {
        self.components.iter().find(|c| c.kind == kind)
    }

    /// Components whose action is a change, in reconciliation order.
    pub fn changes(&self) -> impl Iterator<Item = &ComponentChange> {
        self.components.iter().filter(|c| c.action.is_change())
    }

    pub fn summary(&self) -> ChangeSummary {
        ChangeSummary::from_changes(&self.components)
    }
}

/// Counts of component actions in a change request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChangeSummary {
    pub creates: usize,
    pub updates: usize,
    pub removals: usize,
    pub unchanged: usize,
}

impl ChangeSummary {
    pub fn from_changes(changes: &[ComponentChange]) -> Self {
        let mut summary = Self::default();
        for change in changes {
            match change.action {
                ChangeAction::Create => summary.creates += 1,
                ChangeAction::Remove => summary.removals += 1,
                ChangeAction::NoChange => summary.unchanged += 1,
                ChangeAction::Resize
                | ChangeAction::TopologyChange
                | ChangeAction::VersionChange => summary.updates += 1,
            }
        }
        summary
    }

    /// Total number of changes
    pub fn total(&self) -> usize {
        self.creates + self.updates + self.removals
    }

    pub fn has_changes(&self) -> bool {
        self.total() > 0
    }
}

/// Checks that need no remote state.
///
/// [`build_change_request`] runs these first; hosts call this directly to
/// reject a desired state before reading anything remotely.
pub fn validate(desired: &DesiredState) -> Result<()> {
    if desired.name.is_empty() {
        return Err(Error::MissingField { field: "name" });
    }
    if desired.region.is_empty() {
        return Err(Error::MissingField { field: "region" });
    }

    let primary_ref_id = desired
        .component(ComponentKind::Elasticsearch)
        .map(|spec| spec.resolved_ref_id(ComponentKind::Elasticsearch));
    for (kind, spec) in desired.components.iter().filter(|(k, _)| !k.is_primary()) {
        let reference = spec
            .elasticsearch_cluster_ref_id
            .clone()
            .filter(|r| !r.is_empty());
        match (&primary_ref_id, reference) {
            (Some(primary_ref), Some(reference)) if *primary_ref != reference => {
                return Err(Error::DanglingReference {
                    kind: *kind,
                    reference,
                });
            }
            (Some(_), _) => {}
            (None, reference) => {
                return Err(Error::DanglingReference {
                    kind: *kind,
                    reference: reference.unwrap_or_else(|| {
                        ComponentKind::Elasticsearch
                            .descriptor()
                            .default_ref_id
                            .to_string()
                    }),
                });
            }
        }
    }
    if primary_ref_id.is_none() {
        return Err(Error::MissingPrimary);
    }

    for (kind, spec) in &desired.components {
        let descriptor = kind.descriptor();
        for element in &spec.topology {
            if let Some(capacity) = &element.size {
                size::decode(capacity)?;
            }
            if let Some(zones) = element.zone_count.filter(|z| *z < 1) {
                return Err(Error::InvalidZoneCount {
                    kind: *kind,
                    value: zones,
                });
            }
            if let Some(flag) = element.node_type.keys().find(|f| descriptor.node_type(f).is_none()) {
                return Err(Error::UnknownNodeType {
                    kind: *kind,
                    flag: flag.clone(),
                });
            }
        }
    }

    Ok(())
}

/// Build the request that moves `remote` to `desired`.
///
/// `remote` is `None` when the deployment does not exist yet. Every declared
/// component is included, changed or not; remote components missing from
/// `desired` are marked [`ChangeAction::Remove`]. All validation happens here,
/// before anything is sent.
pub fn build_change_request(
    desired: &DesiredState,
    remote: Option<&DeploymentInfo>,
) -> Result<ChangeRequest> {
    validate(desired)?;

    let current = remote.map(flatten);
    if let Some(current) = &current
        && !current.region.is_empty()
        && current.region != desired.region
    {
        return Err(Error::ImmutableField {
            field: "region",
            current: current.region.clone(),
            desired: desired.region.clone(),
        });
    }

    let remote_of = |kind: ComponentKind| remote.and_then(|r| r.provisioned(kind));

    let Some(primary_spec) = desired.component(ComponentKind::Elasticsearch) else {
        return Err(Error::MissingPrimary);
    };
    let primary_ref_id = primary_spec.resolved_ref_id(ComponentKind::Elasticsearch);

    let primary = expand::expand(
        ComponentKind::Elasticsearch,
        primary_spec,
        remote_of(ComponentKind::Elasticsearch),
        &ExpandContext {
            region: &desired.region,
            primary_ref_id: &primary_ref_id,
            primary_version: None,
        },
    )?;
    let ctx = ExpandContext {
        region: &desired.region,
        primary_ref_id: &primary_ref_id,
        primary_version: Some(primary.plan.version.as_str()),
    };

    let mut components = Vec::new();
    for kind in ComponentKind::all() {
        let remote_resource = remote_of(*kind);
        let request = match desired.component(*kind) {
            Some(_) if kind.is_primary() => primary.clone(),
            Some(spec) => expand::expand(*kind, spec, remote_resource, &ctx)?,
            None => {
                // Pending-only resources count as present: they still need pruning.
                if let Some(resource) = remote.and_then(|r| r.resources_of(*kind).next()) {
                    log::debug!("{kind}: present remotely but not declared, marking for removal");
                    components.push(ComponentChange {
                        kind: *kind,
                        ref_id: resource
                            .ref_id
                            .clone()
                            .unwrap_or_else(|| kind.descriptor().default_ref_id.to_string()),
                        action: ChangeAction::Remove,
                        request: None,
                    });
                }
                continue;
            }
        };

        let action = classify(remote_resource.and_then(|r| r.current_plan()), &request.plan);
        log::debug!("{kind}: {action:?}");
        components.push(ComponentChange {
            kind: *kind,
            ref_id: request.ref_id.clone(),
            action,
            request: Some(request),
        });
    }

    Ok(ChangeRequest {
        name: desired.name.clone(),
        region: desired.region.clone(),
        components,
    })
}

/// Classify the difference between the current and desired plan.
pub fn classify(current: Option<&Plan>, desired: &Plan) -> ChangeAction {
    let Some(current) = current else {
        return ChangeAction::Create;
    };

    if current.version != desired.version {
        return ChangeAction::VersionChange;
    }

    let before: Vec<_> = current.provisioned().collect();
    let after: Vec<_> = desired.provisioned().collect();
    if before == after {
        return ChangeAction::NoChange;
    }

    let same_shape = before.len() == after.len()
        && before.iter().zip(&after).all(|(b, a)| {
            b.instance_configuration_id == a.instance_configuration_id
                && b.node_type == a.node_type
        });
    if same_shape {
        ChangeAction::Resize
    } else {
        ChangeAction::TopologyChange
    }
}
