//! Waiting for submitted changes to settle.
//!
//! The poller is a small state machine driven only by what a read of the
//! deployment reports:
//!
//! ```text
//! Pending ──> Applying ──> Stable
//!    │           │
//!    └───────────┴──────> Failed
//! ```
//!
//! Every read goes through [`with_retry_until`] so transient failures are
//! retried with linear backoff, but never past the overall deadline. The
//! [`CancelToken`] is checked before each network call.

use crate::backend::Backend;
use crate::error::{Error, Result};
use crate::retry::{RetryCallback, with_retry_until};
use crate::types::{PollConfig, QueryParams};
use deployment::{ComponentKind, DeploymentInfo, PlanStatus};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

/// Status of the component resource that marks it fully shut down.
pub const STOPPED_STATUS: &str = "stopped";

/// Where a deployment is in applying its latest change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollState {
    /// No component resource has been reported yet.
    Pending,
    /// These components still have a plan in flight.
    Applying {
        /// Kinds with an unfinished pending plan
        components: Vec<ComponentKind>,
    },
    /// Nothing in flight.
    Stable,
    /// A component's pending plan failed.
    Failed {
        /// Component whose plan failed
        kind: ComponentKind,
        /// Remote error detail
        detail: String,
    },
}

impl PollState {
    /// Derive the state from one read of the deployment.
    #[must_use]
    pub fn from_deployment(deployment: &DeploymentInfo) -> Self {
        if deployment.resources.is_empty() {
            return Self::Pending;
        }

        let mut components = Vec::new();
        for resource in &deployment.resources {
            let Some(attempt) = resource.pending() else {
                continue;
            };
            match attempt.status {
                PlanStatus::Error => {
                    return Self::Failed {
                        kind: resource.kind,
                        detail: attempt
                            .error
                            .clone()
                            .unwrap_or_else(|| "plan failed without detail".to_string()),
                    };
                }
                PlanStatus::Success => {}
                PlanStatus::Pending | PlanStatus::InProgress => {
                    if !components.contains(&resource.kind) {
                        components.push(resource.kind);
                    }
                }
            }
        }

        if components.is_empty() {
            Self::Stable
        } else {
            Self::Applying { components }
        }
    }

    /// Whether polling stops at this state.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Stable | Self::Failed { .. })
    }
}

/// Cooperative cancellation shared between a caller and a poller.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Create a token that is not cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Takes effect before the next network call.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Fail with [`Error::Cancelled`] once cancellation was requested.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(Error::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Progress notifications from a poller.
///
/// Retries of individual reads arrive through the [`RetryCallback`]
/// supertrait.
pub trait PollObserver: RetryCallback {
    /// Called after each successful read.
    fn on_state(&self, poll: u32, elapsed: Duration, state: &PollState);
}

/// Observer that ignores everything.
pub struct NoObserver;

impl RetryCallback for NoObserver {
    fn on_retry(&self, _attempt: u32, _max_attempts: u32, _error: &Error, _delay: Duration) {}
}

impl PollObserver for NoObserver {
    fn on_state(&self, _poll: u32, _elapsed: Duration, _state: &PollState) {}
}

/// A deployment that reached [`PollState::Stable`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollOutcome {
    /// The deployment as last read
    pub deployment: DeploymentInfo,
    /// Components reporting unhealthy once stable
    pub unhealthy: Vec<ComponentKind>,
    /// Number of successful reads
    pub polls: u32,
}

impl PollOutcome {
    /// Whether every component reports healthy.
    #[must_use]
    pub fn is_healthy(&self) -> bool {
        self.unhealthy.is_empty()
    }
}

/// Component kinds whose resource reports unhealthy.
#[must_use]
pub fn unhealthy_components(deployment: &DeploymentInfo) -> Vec<ComponentKind> {
    let mut kinds = Vec::new();
    for resource in &deployment.resources {
        if let Some(info) = &resource.info
            && !info.healthy
            && !kinds.contains(&resource.kind)
        {
            kinds.push(resource.kind);
        }
    }
    kinds
}

/// Polls one backend with a fixed timing policy.
pub struct Poller<'a> {
    backend: &'a dyn Backend,
    config: &'a PollConfig,
    cancel: CancelToken,
    observer: Option<&'a dyn PollObserver>,
}

impl<'a> Poller<'a> {
    /// Create a poller.
    #[must_use]
    pub fn new(backend: &'a dyn Backend, config: &'a PollConfig) -> Self {
        Self {
            backend,
            config,
            cancel: CancelToken::new(),
            observer: None,
        }
    }

    /// Stop at the next network call once `cancel` fires.
    #[must_use]
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Report progress to `observer`.
    #[must_use]
    pub fn with_observer(mut self, observer: &'a dyn PollObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Read until the deployment is stable or a plan fails.
    ///
    /// # Errors
    ///
    /// - `Error::Timeout` when the deadline passes first
    /// - `Error::PlanFailed` with the remote detail
    /// - `Error::Cancelled` when the token fires
    /// - the last transient error once a read exhausts its retries
    /// - any non-retryable read error, unchanged
    pub fn wait_until_stable(&self, id: &str) -> Result<PollOutcome> {
        let start = Instant::now();
        let deadline = start + self.config.timeout;
        let mut polls = 0;

        loop {
            let deployment = self.read(id, start, deadline)?;
            polls += 1;

            let state = PollState::from_deployment(&deployment);
            log::debug!("poll {polls} of {id}: {state:?}");
            if let Some(observer) = self.observer {
                observer.on_state(polls, start.elapsed(), &state);
            }

            match state {
                PollState::Stable => {
                    let unhealthy = unhealthy_components(&deployment);
                    if !unhealthy.is_empty() {
                        log::warn!("deployment {id} settled with unhealthy components: {unhealthy:?}");
                    }
                    log::info!("deployment {id} is stable after {polls} polls");
                    return Ok(PollOutcome {
                        deployment,
                        unhealthy,
                        polls,
                    });
                }
                PollState::Failed { kind, detail } => {
                    return Err(Error::PlanFailed {
                        id: id.to_string(),
                        kind,
                        detail,
                    });
                }
                PollState::Pending | PollState::Applying { .. } => {
                    self.pause(id, start, deadline)?;
                }
            }
        }
    }

    /// Read until the deployment is gone or every resource reports stopped.
    ///
    /// # Errors
    ///
    /// Same as [`Poller::wait_until_stable`], except that `NotFound` is the
    /// success condition.
    pub fn wait_until_absent(&self, id: &str) -> Result<()> {
        let start = Instant::now();
        let deadline = start + self.config.timeout;
        let mut polls = 0;

        loop {
            let deployment = match self.read(id, start, deadline) {
                Ok(deployment) => deployment,
                Err(e) if e.is_not_found() => {
                    log::info!("deployment {id} is gone");
                    return Ok(());
                }
                Err(e) => return Err(e),
            };
            polls += 1;

            let stopped = deployment.resources.iter().all(|r| {
                r.info
                    .as_ref()
                    .is_some_and(|info| info.status == STOPPED_STATUS)
            });
            log::debug!("poll {polls} of {id}: stopped={stopped}");
            if stopped {
                log::info!("deployment {id} is stopped");
                return Ok(());
            }

            self.pause(id, start, deadline)?;
        }
    }

    fn read(&self, id: &str, start: Instant, deadline: Instant) -> Result<DeploymentInfo> {
        if Instant::now() >= deadline {
            return Err(self.timeout(id, start));
        }

        let callback = self.observer.map(|o| o as &dyn RetryCallback);
        with_retry_until(&self.config.retry, Some(deadline), callback, || {
            self.cancel.check()?;
            self.backend.get_deployment(id, &QueryParams::full())
        })
    }

    fn pause(&self, id: &str, start: Instant, deadline: Instant) -> Result<()> {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(self.timeout(id, start));
        }
        thread::sleep(self.config.poll_interval.min(remaining));
        Ok(())
    }

    fn timeout(&self, id: &str, start: Instant) -> Error {
        log::warn!("gave up waiting for deployment {id}");
        Error::Timeout {
            id: id.to_string(),
            elapsed: start.elapsed(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MockBackend;
    use crate::types::RetryConfig;
    use deployment::fixtures::FixtureConfig;
    use deployment::{PlanAttempt, RemoteResourceInfo};
    use std::sync::Mutex;

    fn fast_config(max_attempts: u32) -> PollConfig {
        PollConfig {
            timeout: Duration::from_secs(5),
            poll_interval: Duration::from_millis(1),
            retry: RetryConfig {
                max_attempts,
                base_delay: Duration::from_millis(1),
                max_delay: Duration::from_millis(5),
            },
        }
    }

    fn with_pending(mut resource: RemoteResourceInfo, status: PlanStatus) -> RemoteResourceInfo {
        if let Some(plan_info) = resource.info.as_mut().and_then(|i| i.plan_info.as_mut()) {
            plan_info.pending = Some(PlanAttempt {
                plan: None,
                status,
                error: (status == PlanStatus::Error).then(|| "out of capacity".to_string()),
            });
        }
        resource
    }

    fn applying(cfg: &FixtureConfig) -> DeploymentInfo {
        let mut deployment = cfg.deployment("a", &[ComponentKind::Elasticsearch]);
        deployment.resources[0] =
            with_pending(deployment.resources[0].clone(), PlanStatus::InProgress);
        deployment
    }

    fn transient() -> Error {
        Error::http("unavailable", Some(503))
    }

    #[test]
    fn test_state_from_deployment() {
        let cfg = FixtureConfig::default();
        let kinds = [ComponentKind::Elasticsearch, ComponentKind::Kibana];
        let mut deployment = cfg.deployment("a", &kinds);
        assert_eq!(PollState::from_deployment(&deployment), PollState::Stable);

        deployment.resources[1] =
            with_pending(deployment.resources[1].clone(), PlanStatus::InProgress);
        assert_eq!(
            PollState::from_deployment(&deployment),
            PollState::Applying {
                components: vec![ComponentKind::Kibana]
            }
        );

        deployment.resources[0] = with_pending(deployment.resources[0].clone(), PlanStatus::Error);
        assert_eq!(
            PollState::from_deployment(&deployment),
            PollState::Failed {
                kind: ComponentKind::Elasticsearch,
                detail: "out of capacity".to_string()
            }
        );

        assert_eq!(
            PollState::from_deployment(&DeploymentInfo::default()),
            PollState::Pending
        );
    }

    #[test]
    fn test_successful_pending_plan_is_stable() {
        let cfg = FixtureConfig::default();
        let mut deployment = cfg.deployment("a", &[ComponentKind::Apm]);
        deployment.resources[0] = with_pending(deployment.resources[0].clone(), PlanStatus::Success);
        assert!(PollState::from_deployment(&deployment).is_terminal());
    }

    #[test]
    fn test_waits_through_applying() {
        let cfg = FixtureConfig::default();
        let mock = MockBackend::new();
        mock.insert(cfg.deployment("a", &[ComponentKind::Elasticsearch]));
        mock.push_read(Ok(DeploymentInfo {
            id: cfg.id("a"),
            ..Default::default()
        }));
        mock.push_read(Ok(applying(&cfg)));
        mock.push_read(Ok(applying(&cfg)));

        let config = fast_config(1);
        let outcome = Poller::new(&mock, &config)
            .wait_until_stable(&cfg.id("a"))
            .unwrap();

        assert_eq!(outcome.polls, 4);
        assert!(outcome.is_healthy());
        assert_eq!(mock.calls().reads, 4);
    }

    #[test]
    fn test_transient_failures_below_bound_succeed() {
        let cfg = FixtureConfig::default();
        let mock = MockBackend::new();
        mock.insert(cfg.deployment("a", &[ComponentKind::Elasticsearch]));
        mock.push_read(Err(transient()));
        mock.push_read(Err(Error::http("connection reset", None)));

        let config = fast_config(3);
        let outcome = Poller::new(&mock, &config).wait_until_stable(&cfg.id("a"));

        assert!(outcome.is_ok());
        assert_eq!(mock.calls().reads, 3);
    }

    #[test]
    fn test_transient_failures_above_bound_surface_last_error() {
        let cfg = FixtureConfig::default();
        let mock = MockBackend::new();
        mock.insert(cfg.deployment("a", &[ComponentKind::Elasticsearch]));
        for _ in 0..3 {
            mock.push_read(Err(transient()));
        }

        let config = fast_config(3);
        let start = Instant::now();
        let err = Poller::new(&mock, &config)
            .wait_until_stable(&cfg.id("a"))
            .unwrap_err();

        assert!(matches!(err, Error::Http { status: Some(503), .. }));
        assert_eq!(mock.calls().reads, 3);
        assert!(start.elapsed() < config.timeout);
    }

    #[test]
    fn test_client_error_not_retried() {
        let mock = MockBackend::new();
        mock.push_read(Err(Error::http("forbidden", Some(403))));

        let config = fast_config(5);
        let err = Poller::new(&mock, &config).wait_until_stable("a").unwrap_err();

        assert!(matches!(err, Error::Http { status: Some(403), .. }));
        assert_eq!(mock.calls().reads, 1);
    }

    #[test]
    fn test_plan_failed_carries_detail() {
        let cfg = FixtureConfig::default();
        let mut failed = cfg.deployment("a", &[ComponentKind::Elasticsearch, ComponentKind::Kibana]);
        failed.resources[1] = with_pending(failed.resources[1].clone(), PlanStatus::Error);
        let mock = MockBackend::new();
        mock.insert(failed);

        let config = fast_config(1);
        let err = Poller::new(&mock, &config)
            .wait_until_stable(&cfg.id("a"))
            .unwrap_err();

        match err {
            Error::PlanFailed { kind, detail, .. } => {
                assert_eq!(kind, ComponentKind::Kibana);
                assert_eq!(detail, "out of capacity");
            }
            other => panic!("expected PlanFailed, got {other:?}"),
        }
    }

    #[test]
    fn test_timeout() {
        let cfg = FixtureConfig::default();
        let mock = MockBackend::new();
        mock.insert(applying(&cfg));

        let config = PollConfig {
            timeout: Duration::from_millis(30),
            poll_interval: Duration::from_millis(5),
            ..fast_config(1)
        };
        let start = Instant::now();
        let err = Poller::new(&mock, &config)
            .wait_until_stable(&cfg.id("a"))
            .unwrap_err();

        assert!(matches!(err, Error::Timeout { .. }));
        assert!(start.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn test_cancel_checked_before_read() {
        let mock = MockBackend::new();
        let cancel = CancelToken::new();
        cancel.cancel();

        let config = fast_config(3);
        let err = Poller::new(&mock, &config)
            .with_cancel(cancel)
            .wait_until_stable("a")
            .unwrap_err();

        assert!(matches!(err, Error::Cancelled));
        assert_eq!(mock.calls().reads, 0);
    }

    #[test]
    fn test_cancel_between_polls() {
        struct CancelOnFirstPoll(CancelToken);
        impl RetryCallback for CancelOnFirstPoll {
            fn on_retry(&self, _: u32, _: u32, _: &Error, _: Duration) {}
        }
        impl PollObserver for CancelOnFirstPoll {
            fn on_state(&self, _: u32, _: Duration, _: &PollState) {
                self.0.cancel();
            }
        }

        let cfg = FixtureConfig::default();
        let mock = MockBackend::new();
        mock.insert(applying(&cfg));
        let cancel = CancelToken::new();
        let observer = CancelOnFirstPoll(cancel.clone());

        let config = fast_config(1);
        let err = Poller::new(&mock, &config)
            .with_cancel(cancel)
            .with_observer(&observer)
            .wait_until_stable(&cfg.id("a"))
            .unwrap_err();

        assert!(matches!(err, Error::Cancelled));
        assert_eq!(mock.calls().reads, 1);
    }

    #[test]
    fn test_unhealthy_reported_not_failed() {
        let cfg = FixtureConfig::default();
        let mut deployment = cfg.deployment("a", &[ComponentKind::Elasticsearch, ComponentKind::Apm]);
        if let Some(info) = deployment.resources[1].info.as_mut() {
            info.healthy = false;
        }
        let mock = MockBackend::new();
        mock.insert(deployment);

        let config = fast_config(1);
        let outcome = Poller::new(&mock, &config)
            .wait_until_stable(&cfg.id("a"))
            .unwrap();

        assert!(!outcome.is_healthy());
        assert_eq!(outcome.unhealthy, vec![ComponentKind::Apm]);
    }

    #[test]
    fn test_observer_sees_every_state() {
        #[derive(Default)]
        struct Recorder(Mutex<Vec<PollState>>);
        impl RetryCallback for Recorder {
            fn on_retry(&self, _: u32, _: u32, _: &Error, _: Duration) {}
        }
        impl PollObserver for Recorder {
            fn on_state(&self, _: u32, _: Duration, state: &PollState) {
                self.0.lock().unwrap().push(state.clone());
            }
        }

        let cfg = FixtureConfig::default();
        let mock = MockBackend::new();
        mock.insert(cfg.deployment("a", &[ComponentKind::Elasticsearch]));
        mock.push_read(Ok(applying(&cfg)));

        let recorder = Recorder::default();
        let config = fast_config(1);
        Poller::new(&mock, &config)
            .with_observer(&recorder)
            .wait_until_stable(&cfg.id("a"))
            .unwrap();

        let states = recorder.0.lock().unwrap();
        assert_eq!(states.len(), 2);
        assert!(matches!(states[0], PollState::Applying { .. }));
        assert_eq!(states[1], PollState::Stable);
    }

    #[test]
    fn test_wait_until_absent() {
        let cfg = FixtureConfig::default();
        let mock = MockBackend::new();
        mock.push_read(Ok(cfg.deployment("a", &[ComponentKind::Elasticsearch])));

        let config = fast_config(1);
        Poller::new(&mock, &config)
            .wait_until_absent(&cfg.id("a"))
            .unwrap();
        assert_eq!(mock.calls().reads, 2);
    }

    #[test]
    fn test_wait_until_absent_accepts_stopped() {
        let cfg = FixtureConfig::default();
        let mut deployment = cfg.deployment("a", &[ComponentKind::Elasticsearch, ComponentKind::Kibana]);
        for resource in &mut deployment.resources {
            if let Some(info) = resource.info.as_mut() {
                info.status = STOPPED_STATUS.to_string();
            }
        }
        let mock = MockBackend::new();
        mock.insert(deployment);

        let config = fast_config(1);
        assert!(Poller::new(&mock, &config).wait_until_absent(&cfg.id("a")).is_ok());
        assert_eq!(mock.calls().reads, 1);
    }
}
