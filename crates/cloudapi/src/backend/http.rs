//! HTTP backend for the deployments API.
//!
//! Requests are blocking and made with a single `ureq` agent. Non-2xx
//! responses are read in full so validation messages reach the caller.

use crate::backend::Backend;
use crate::error::{Error, Result};
use crate::types::{Accepted, QueryParams};
use deployment::{
    ChangeRequest, ComponentKind, DeploymentInfo, Plan, RemoteResourceInfo, ResourceInfo,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use ureq::Body;
use ureq::http::Response;

/// Default public API endpoint.
pub const DEFAULT_API_BASE: &str = "https://api.elastic-cloud.com";

/// Upper bound for a single request, including reading the body.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

const USER_AGENT: &str = concat!("cloudapi/", env!("CARGO_PKG_VERSION"));

/// Deployments API backend.
///
/// # Example
///
/// ```no_run
/// use cloudapi::backend::http::CloudBackend;
/// use cloudapi::backend::Backend;
/// use cloudapi::QueryParams;
///
/// let backend = CloudBackend::new().with_api_key("secret");
/// let deployment = backend.get_deployment("abc123", &QueryParams::full()).unwrap();
/// println!("{} has {} resources", deployment.name, deployment.resources.len());
/// ```
pub struct CloudBackend {
    /// HTTP agent for requests.
    agent: ureq::Agent,
    /// API base URL.
    api_base: String,
    /// Key sent as `Authorization: ApiKey <key>`.
    api_key: Option<String>,
}

impl CloudBackend {
    /// Create a backend for the public endpoint.
    #[must_use]
    pub fn new() -> Self {
        Self::with_api_base(DEFAULT_API_BASE)
    }

    /// Create a backend with a custom API base.
    #[must_use]
    pub fn with_api_base(api_base: impl Into<String>) -> Self {
        let config = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(REQUEST_TIMEOUT))
            .build();
        Self {
            agent: ureq::Agent::new_with_config(config),
            api_base: api_base.into().trim_end_matches('/').to_string(),
            api_key: None,
        }
    }

    /// Authenticate requests with an API key.
    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Get the current API base URL.
    #[must_use]
    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    fn deployments_url(&self) -> String {
        format!("{}/api/v1/deployments", self.api_base)
    }

    fn deployment_url(&self, id: &str) -> String {
        format!("{}/api/v1/deployments/{id}", self.api_base)
    }

    fn read_url(&self, id: &str, params: &QueryParams) -> String {
        format!("{}?{}", self.deployment_url(id), params.to_query())
    }

    fn shutdown_url(&self, id: &str) -> String {
        format!("{}/api/v1/deployments/{id}/_shutdown", self.api_base)
    }

    fn headers<B>(&self, request: ureq::RequestBuilder<B>) -> ureq::RequestBuilder<B> {
        let request = request
            .header("Accept", "application/json")
            .header("User-Agent", USER_AGENT);
        match &self.api_key {
            Some(key) => request.header("Authorization", format!("ApiKey {key}")),
            None => request,
        }
    }
}

impl Default for CloudBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl Backend for CloudBackend {
    fn get_deployment(&self, id: &str, params: &QueryParams) -> Result<DeploymentInfo> {
        let url = self.read_url(id, params);
        log::debug!("GET {url}");

        let response = self.headers(self.agent.get(&url)).call()?;
        let wire: WireDeployment = ensure_success(id, response)?.body_mut().read_json()?;
        Ok(wire.into())
    }

    fn create_deployment(&self, request: &ChangeRequest) -> Result<Accepted> {
        let url = self.deployments_url();
        log::debug!("POST {url}");

        let response = self
            .headers(self.agent.post(&url))
            .send_json(WireRequest::new(request, false))?;
        let accepted: Accepted = ensure_success("", response)?.body_mut().read_json()?;
        Ok(accepted)
    }

    fn submit_change(&self, id: &str, request: &ChangeRequest) -> Result<Accepted> {
        let url = self.deployment_url(id);
        log::debug!("PUT {url}");

        let response = self
            .headers(self.agent.put(&url))
            .send_json(WireRequest::new(request, true))?;
        ensure_success(id, response)?;
        Ok(Accepted { id: id.to_string() })
    }

    fn delete_deployment(&self, id: &str) -> Result<()> {
        let url = self.shutdown_url(id);
        log::debug!("POST {url}");

        let response = self.headers(self.agent.post(&url)).send_empty()?;
        ensure_success(id, response)?;
        Ok(())
    }
}

fn ensure_success(id: &str, mut response: Response<Body>) -> Result<Response<Body>> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.body_mut().read_to_string().unwrap_or_else(|e| {
        log::debug!("could not read {status} response body for {id}: {e}");
        String::new()
    });
    Err(Error::from_status(status.as_u16(), body.trim(), id))
}

// ============================================================================
// Wire format
// ============================================================================

/// Create/update body. Resources are grouped by kind; a kind left out of an
/// update is removed because `prune_orphans` is set.
#[derive(Debug, Serialize)]
struct WireRequest<'a> {
    name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    prune_orphans: Option<bool>,
    resources: BTreeMap<ComponentKind, Vec<WireComponent<'a>>>,
}

#[derive(Debug, Serialize)]
struct WireComponent<'a> {
    ref_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    elasticsearch_cluster_ref_id: Option<&'a str>,
    region: &'a str,
    plan: &'a Plan,
}

impl<'a> WireRequest<'a> {
    fn new(request: &'a ChangeRequest, prune_orphans: bool) -> Self {
        let mut resources: BTreeMap<ComponentKind, Vec<WireComponent<'a>>> = BTreeMap::new();
        for component in request.components.iter().filter_map(|c| c.request.as_ref()) {
            resources
                .entry(component.kind)
                .or_default()
                .push(WireComponent {
                    ref_id: &component.ref_id,
                    elasticsearch_cluster_ref_id: component.elasticsearch_cluster_ref_id.as_deref(),
                    region: &component.region,
                    plan: &component.plan,
                });
        }
        Self {
            name: &request.name,
            prune_orphans: prune_orphans.then_some(true),
            resources,
        }
    }
}

#[derive(Debug, Deserialize)]
struct WireDeployment {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    healthy: bool,
    #[serde(default)]
    resources: BTreeMap<String, Vec<WireResource>>,
}

#[derive(Debug, Deserialize)]
struct WireResource {
    #[serde(default)]
    ref_id: Option<String>,
    #[serde(default)]
    elasticsearch_cluster_ref_id: Option<String>,
    #[serde(default)]
    region: Option<String>,
    #[serde(default)]
    info: Option<ResourceInfo>,
}

impl From<WireDeployment> for DeploymentInfo {
    fn from(wire: WireDeployment) -> Self {
        let mut resources = Vec::new();
        for (key, group) in wire.resources {
            let Some(kind) = ComponentKind::all().iter().find(|k| k.name() == key) else {
                log::debug!("ignoring unsupported resource kind {key}");
                continue;
            };
            resources.extend(group.into_iter().map(|r| RemoteResourceInfo {
                kind: *kind,
                ref_id: r.ref_id,
                elasticsearch_cluster_ref_id: r.elasticsearch_cluster_ref_id,
                region: r.region,
                info: r.info,
            }));
        }
        Self {
            id: wire.id,
            name: wire.name,
            healthy: wire.healthy,
            resources,
        }
    }
}
