//! Backend traits and implementations for talking to the control plane.
//!
//! This module provides the [`Backend`] trait, the HTTP implementation
//! [`http::CloudBackend`], and [`MockBackend`] for tests.
//!
//! # Testing
//!
//! Use [`MockBackend`] for testing without network access:
//!
//! ```
//! use cloudapi::backend::{Backend, MockBackend};
//! use cloudapi::QueryParams;
//! use deployment::fixtures::FixtureConfig;
//! use deployment::ComponentKind;
//!
//! let mock = MockBackend::new();
//! let remote = FixtureConfig::default().deployment("docs", &[ComponentKind::Elasticsearch]);
//! mock.insert(remote.clone());
//!
//! let read = mock.get_deployment(&remote.id, &QueryParams::full()).unwrap();
//! assert_eq!(read, remote);
//! ```

pub mod http;

use crate::error::{Error, Result};
use crate::types::{Accepted, QueryParams};
use deployment::{
    ChangeRequest, ComponentRequest, DeploymentInfo, Metadata, PlanAttempt, PlanInfo, PlanStatus,
    Ports, RemoteResourceInfo, ResourceInfo,
};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

/// Operations this layer consumes from the control plane.
///
/// Implementations perform exactly one remote call per method and never
/// retry; retry policy lives in the poller.
pub trait Backend: Send + Sync {
    /// Read a deployment.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` if the deployment doesn't exist.
    fn get_deployment(&self, id: &str, params: &QueryParams) -> Result<DeploymentInfo>;

    /// Create a deployment from a change request built with no remote state.
    fn create_deployment(&self, request: &ChangeRequest) -> Result<Accepted>;

    /// Submit the full desired plan for an existing deployment.
    ///
    /// # Errors
    ///
    /// Returns `Error::Validation` if the control plane rejects the plan.
    fn submit_change(&self, id: &str, request: &ChangeRequest) -> Result<Accepted>;

    /// Shut a deployment down.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` if the deployment doesn't exist.
    fn delete_deployment(&self, id: &str) -> Result<()>;
}

/// Number of calls made against a [`MockBackend`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    /// `get_deployment` calls
    pub reads: u32,
    /// `create_deployment` calls
    pub creates: u32,
    /// `submit_change` calls
    pub submits: u32,
    /// `delete_deployment` calls
    pub deletes: u32,
}

impl CallCounts {
    /// Calls that would change remote state.
    #[must_use]
    pub fn writes(&self) -> u32 {
        self.creates + self.submits + self.deletes
    }
}

/// Mock backend for testing without network access.
///
/// Deployments live in memory. Reads first drain the scripted queue filled
/// by [`MockBackend::push_read`], then fall back to the stored deployment.
/// Clones share state, so a test can keep a handle after boxing one into a
/// [`Client`](crate::Client).
#[derive(Debug, Clone, Default)]
pub struct MockBackend {
    deployments: Arc<Mutex<HashMap<String, DeploymentInfo>>>,
    reads: Arc<Mutex<VecDeque<Result<DeploymentInfo>>>>,
    submitted: Arc<Mutex<Vec<(String, ChangeRequest)>>>,
    calls: Arc<Mutex<CallCounts>>,
}

impl MockBackend {
    /// Create a new empty mock backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a deployment, replacing any with the same id.
    pub fn insert(&self, deployment: DeploymentInfo) {
        let mut deployments = self.deployments.lock().unwrap();
        deployments.insert(deployment.id.clone(), deployment);
    }

    /// Queue the result of a future read.
    pub fn push_read(&self, result: Result<DeploymentInfo>) {
        self.reads.lock().unwrap().push_back(result);
    }

    /// Stored deployment by id.
    #[must_use]
    pub fn deployment(&self, id: &str) -> Option<DeploymentInfo> {
        self.deployments.lock().unwrap().get(id).cloned()
    }

    /// Change requests received so far, with the deployment id they targeted.
    #[must_use]
    pub fn submitted(&self) -> Vec<(String, ChangeRequest)> {
        self.submitted.lock().unwrap().clone()
    }

    /// Calls made so far.
    #[must_use]
    pub fn calls(&self) -> CallCounts {
        *self.calls.lock().unwrap()
    }

    /// Build the deployment the control plane would converge to.
    fn apply(id: &str, request: &ChangeRequest) -> DeploymentInfo {
        DeploymentInfo {
            id: id.to_string(),
            name: request.name.clone(),
            healthy: true,
            resources: request
                .components
                .iter()
                .filter_map(|change| change.request.as_ref())
                .map(|component| Self::provisioned(id, &request.name, component))
                .collect(),
        }
    }

    fn provisioned(id: &str, name: &str, component: &ComponentRequest) -> RemoteResourceInfo {
        RemoteResourceInfo {
            kind: component.kind,
            ref_id: Some(component.ref_id.clone()),
            elasticsearch_cluster_ref_id: component.elasticsearch_cluster_ref_id.clone(),
            region: Some(component.region.clone()),
            info: Some(ResourceInfo {
                id: Some(format!("{id}-{}", component.kind)),
                name: Some(name.to_string()),
                region: component.region.clone(),
                healthy: true,
                status: "started".to_string(),
                metadata: Some(Metadata {
                    endpoint: format!("{}.{id}.mock", component.kind),
                    ports: Some(Ports {
                        http: Some(9200),
                        https: Some(9243),
                    }),
                }),
                plan_info: Some(PlanInfo {
                    current: Some(PlanAttempt {
                        plan: Some(component.plan.clone()),
                        status: PlanStatus::Success,
                        error: None,
                    }),
                    pending: None,
                }),
            }),
        }
    }
}

impl Backend for MockBackend {
    fn get_deployment(&self, id: &str, _params: &QueryParams) -> Result<DeploymentInfo> {
        self.calls.lock().unwrap().reads += 1;

        if let Some(scripted) = self.reads.lock().unwrap().pop_front() {
            return scripted;
        }

        let deployments = self.deployments.lock().unwrap();
        deployments
            .get(id)
            .cloned()
            .ok_or_else(|| Error::NotFound { id: id.to_string() })
    }

    fn create_deployment(&self, request: &ChangeRequest) -> Result<Accepted> {
        let id = {
            let mut calls = self.calls.lock().unwrap();
            calls.creates += 1;
            format!("mock-{:04}", calls.creates)
        };

        self.submitted
            .lock()
            .unwrap()
            .push((id.clone(), request.clone()));
        self.insert(Self::apply(&id, request));
        Ok(Accepted { id })
    }

    fn submit_change(&self, id: &str, request: &ChangeRequest) -> Result<Accepted> {
        self.calls.lock().unwrap().submits += 1;

        if self.deployment(id).is_none() {
            return Err(Error::NotFound { id: id.to_string() });
        }

        self.submitted
            .lock()
            .unwrap()
            .push((id.to_string(), request.clone()));
        self.insert(Self::apply(id, request));
        Ok(Accepted { id: id.to_string() })
    }

    fn delete_deployment(&self, id: &str) -> Result<()> {
        self.calls.lock().unwrap().deletes += 1;

        let mut deployments = self.deployments.lock().unwrap();
        deployments
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| Error::NotFound { id: id.to_string() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deployment::fixtures::FixtureConfig;
    use deployment::{ComponentKind, build_change_request};

    #[test]
    fn test_mock_backend_not_found() {
        let mock = MockBackend::new();
        let err = mock.get_deployment("missing", &QueryParams::full()).unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(mock.calls().reads, 1);
    }

    #[test]
    fn test_mock_backend_scripted_reads_come_first() {
        let cfg = FixtureConfig::default();
        let mock = MockBackend::new();
        mock.insert(cfg.deployment("a", &[ComponentKind::Elasticsearch]));
        mock.push_read(Err(Error::http("unavailable", Some(503))));

        let id = cfg.id("a");
        assert!(mock.get_deployment(&id, &QueryParams::full()).is_err());
        assert!(mock.get_deployment(&id, &QueryParams::full()).is_ok());
        assert_eq!(mock.calls().reads, 2);
    }

    #[test]
    fn test_mock_backend_create_applies_request() {
        let cfg = FixtureConfig::default();
        let desired = cfg.desired("a", &[ComponentKind::Kibana]);
        let request = build_change_request(&desired, None).unwrap();

        let mock = MockBackend::new();
        let accepted = mock.create_deployment(&request).unwrap();
        let created = mock.deployment(&accepted.id).unwrap();

        assert_eq!(created.name, cfg.name("a"));
        assert_eq!(created.resources.len(), 2);
        assert!(created.provisioned(ComponentKind::Kibana).is_some());
        assert_eq!(mock.submitted().len(), 1);
        assert_eq!(mock.calls().writes(), 1);
    }

    #[test]
    fn test_mock_backend_submit_requires_existing() {
        let cfg = FixtureConfig::default();
        let request = build_change_request(&cfg.desired("a", &[]), None).unwrap();

        let mock = MockBackend::new();
        let err = mock.submit_change("missing", &request).unwrap_err();
        assert!(err.is_not_found());
        assert!(mock.submitted().is_empty());
    }

    #[test]
    fn test_mock_backend_delete() {
        let cfg = FixtureConfig::default();
        let mock = MockBackend::new();
        mock.insert(cfg.deployment("a", &[ComponentKind::Elasticsearch]));

        mock.delete_deployment(&cfg.id("a")).unwrap();
        assert!(mock.deployment(&cfg.id("a")).is_none());
        assert!(mock.delete_deployment(&cfg.id("a")).unwrap_err().is_not_found());
    }
}
