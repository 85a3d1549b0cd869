//! # deployment
//!
//! Reconciliation between a declarative deployment description and the
//! resource model reported by the control plane.
//!
//! ## Core Concepts
//!
//! - **DesiredState**: user-authored components and sizing, keyed by kind
//! - **DeploymentInfo**: authoritative, nested remote state (read-only here)
//! - **FlatDeploymentState**: remote state flattened for the state store
//! - **ChangeRequest**: the full desired plan, classified per component
//!
//! Everything in this crate is pure and synchronous. It performs no I/O,
//! holds no shared state, and is safe to call repeatedly for the same input.
//!
//! ## Example
//!
//! ```
//! use deployment::{ComponentKind, ComponentSpec, DesiredState, TopologySpec};
//!
//! let desired = DesiredState::new("search", "us-east-1")
//!     .with_component(
//!         ComponentKind::Elasticsearch,
//!         ComponentSpec::default()
//!             .version("7.8.1")
//!             .element(TopologySpec::sized("4g")),
//!     )
//!     .with_component(ComponentKind::Kibana, ComponentSpec::default().element(TopologySpec::default()));
//!
//! // No remote deployment yet: every component is a create.
//! let request = deployment::build_change_request(&desired, None).unwrap();
//! assert_eq!(request.summary().creates, 2);
//! assert!(!request.is_noop());
//! ```

pub mod component;
pub mod desired;
pub mod endpoint;
pub mod error;
pub mod expand;
pub mod fixtures;
pub mod flatten;
pub mod reconcile;
pub mod size;
pub mod types;

// Re-export main types at crate root
pub use component::{ComponentDescriptor, ComponentKind, NodeTypeFlag};
pub use desired::{ComponentSpec, DesiredState, TopologySpec};
pub use endpoint::Endpoints;
pub use error::{Error, Result};
pub use expand::ComponentRequest;
pub use flatten::{FlatComponentState, FlatTopologyElement};
pub use reconcile::{
    ChangeAction, ChangeRequest, ChangeSummary, ComponentChange, FlatDeploymentState,
    build_change_request, flatten, validate,
};
pub use types::{
    DeploymentInfo, Metadata, Plan, PlanAttempt, PlanInfo, PlanStatus, Ports, RemoteResourceInfo,
    ResourceInfo, TopologyElement, TopologySize,
};
