//! # cloudapi
//!
//! Blocking client for the deployments control plane.
//!
//! This crate provides:
//! - A [`Backend`] seam with an HTTP implementation and an in-memory mock
//! - An error taxonomy that tells transient failures from final ones
//! - Bounded linear retry and a plan poller with timeout and cancellation
//! - A [`Client`] mapping read/create/update/delete onto reconcile + submit + poll
//!
//! ## Example
//!
//! ```no_run
//! use cloudapi::Client;
//! use deployment::{ComponentKind, ComponentSpec, DesiredState, TopologySpec};
//!
//! let client = Client::new("https://api.elastic-cloud.com", Some("secret"));
//!
//! let desired = DesiredState::new("search", "us-east-1").with_component(
//!     ComponentKind::Elasticsearch,
//!     ComponentSpec::default().version("7.8.1").element(TopologySpec::sized("4g")),
//! );
//!
//! let applied = client.create(&desired).expect("create failed");
//! println!("created {}", applied.id);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod backend;
pub mod error;
pub mod poller;
pub mod retry;
pub mod types;

// Re-export main types at crate root
pub use backend::http::CloudBackend;
pub use backend::{Backend, MockBackend};
pub use error::{Error, ErrorCategory, Result};
pub use poller::{CancelToken, NoObserver, PollObserver, PollOutcome, PollState, Poller};
pub use types::{Accepted, PollConfig, QueryParams, RetryConfig};

use deployment::{
    ChangeRequest, ChangeSummary, ComponentKind, DeploymentInfo, DesiredState,
    FlatDeploymentState,
};

/// Result of a create or update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Applied {
    /// Deployment id
    pub id: String,
    /// Flat state after the change settled
    pub state: FlatDeploymentState,
    /// Components reporting unhealthy after the change
    pub unhealthy: Vec<ComponentKind>,
    /// What the change request contained
    pub summary: ChangeSummary,
    /// False when the request was a no-op and nothing was sent
    pub submitted: bool,
}

/// High-level control-plane client.
///
/// Each operation composes the pure reconciliation functions from the
/// `deployment` crate with backend calls and the poller. Nothing is cached
/// between calls; every operation starts from a fresh read.
pub struct Client {
    backend: Box<dyn Backend>,
    poll: PollConfig,
    cancel: CancelToken,
    observer: Option<Box<dyn PollObserver>>,
}

impl Client {
    /// Create a client for an HTTP endpoint.
    #[must_use]
    pub fn new(api_base: &str, api_key: Option<&str>) -> Self {
        let backend = CloudBackend::with_api_base(api_base);
        let backend = match api_key {
            Some(key) => backend.with_api_key(key),
            None => backend,
        };
        Self::with_backend(Box::new(backend))
    }

    /// Create a client with a custom backend (useful for testing).
    #[must_use]
    pub fn with_backend(backend: Box<dyn Backend>) -> Self {
        Self {
            backend,
            poll: PollConfig::default(),
            cancel: CancelToken::new(),
            observer: None,
        }
    }

    /// Use a different timing policy for waiting on changes.
    #[must_use]
    pub fn with_poll_config(mut self, poll: PollConfig) -> Self {
        self.poll = poll;
        self
    }

    /// Share a cancellation token with the poller.
    #[must_use]
    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Report polling progress.
    #[must_use]
    pub fn with_observer(mut self, observer: Box<dyn PollObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    // =========================================================================
    // Read Operations
    // =========================================================================

    /// Read a deployment and flatten it. `None` when it doesn't exist.
    pub fn read(&self, id: &str) -> Result<Option<FlatDeploymentState>> {
        match self.fetch(id) {
            Ok(remote) => Ok(Some(deployment::flatten(&remote))),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Read the raw remote deployment.
    pub fn fetch(&self, id: &str) -> Result<DeploymentInfo> {
        self.cancel.check()?;
        self.backend.get_deployment(id, &QueryParams::full())
    }

    /// Build the change request that `apply` would submit.
    ///
    /// With `id` set the request is built against that deployment, otherwise
    /// as a create. Local validation runs before anything is read.
    pub fn plan(&self, desired: &DesiredState, id: Option<&str>) -> Result<ChangeRequest> {
        deployment::validate(desired)?;
        let remote = id.map(|id| self.fetch(id)).transpose()?;
        Ok(deployment::build_change_request(desired, remote.as_ref())?)
    }

    // =========================================================================
    // Write Operations
    // =========================================================================

    /// Create a deployment and wait for it to settle.
    pub fn create(&self, desired: &DesiredState) -> Result<Applied> {
        let request = deployment::build_change_request(desired, None)?;
        self.cancel.check()?;
        let accepted = self.backend.create_deployment(&request)?;
        log::info!("created deployment {}", accepted.id);
        self.settle(&accepted.id, &request)
    }

    /// Update a deployment to match `desired` and wait for it to settle.
    ///
    /// Nothing is submitted when the change request is a no-op.
    pub fn update(&self, id: &str, desired: &DesiredState) -> Result<Applied> {
        deployment::validate(desired)?;
        let remote = self.fetch(id)?;
        let request = deployment::build_change_request(desired, Some(&remote))?;

        if request.is_noop() {
            log::info!("deployment {id} already matches the desired state");
            return Ok(Applied {
                id: id.to_string(),
                state: deployment::flatten(&remote),
                unhealthy: poller::unhealthy_components(&remote),
                summary: request.summary(),
                submitted: false,
            });
        }

        self.cancel.check()?;
        self.backend.submit_change(id, &request)?;
        log::info!("submitted change to deployment {id}");
        self.settle(id, &request)
    }

    /// Shut a deployment down and wait until it is gone.
    pub fn delete(&self, id: &str) -> Result<()> {
        self.cancel.check()?;
        self.backend.delete_deployment(id)?;
        log::info!("shutdown requested for deployment {id}");
        self.poller().wait_until_absent(id)
    }

    fn settle(&self, id: &str, request: &ChangeRequest) -> Result<Applied> {
        let outcome = self.poller().wait_until_stable(id)?;
        Ok(Applied {
            id: id.to_string(),
            state: deployment::flatten(&outcome.deployment),
            unhealthy: outcome.unhealthy,
            summary: request.summary(),
            submitted: true,
        })
    }

    fn poller(&self) -> Poller<'_> {
        let poller = Poller::new(self.backend.as_ref(), &self.poll).with_cancel(self.cancel.clone());
        match &self.observer {
            Some(observer) => poller.with_observer(observer.as_ref()),
            None => poller,
        }
    }
}
