//! Error types for reconciliation.
//!
//! Every variant here is a local, structural failure: it is raised before
//! any request reaches the control plane and is never worth retrying.

use crate::component::ComponentKind;
use thiserror::Error;

/// Errors raised while translating between desired and remote state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// A capacity string did not match `<integer><g|m>`.
    #[error("invalid capacity format {value:?}: expected an integer followed by g or m (e.g. \"1g\", \"512m\")")]
    InvalidCapacityFormat {
        /// The rejected input
        value: String,
    },

    /// A mandatory field was missing for a newly declared component.
    #[error("incomplete {kind} spec: {field} is required")]
    IncompleteSpec {
        /// Component missing the field
        kind: ComponentKind,
        /// Name of the missing field
        field: &'static str,
    },

    /// A deployment-level field was missing.
    #[error("deployment {field} is required")]
    MissingField {
        /// Name of the missing field
        field: &'static str,
    },

    /// No elasticsearch component was declared.
    #[error("deployment must declare an elasticsearch component")]
    MissingPrimary,

    /// A companion points at an elasticsearch ref_id that is not declared.
    #[error("{kind} references elasticsearch cluster {reference:?}, which is not declared")]
    DanglingReference {
        /// Companion holding the reference
        kind: ComponentKind,
        /// The unresolved ref_id
        reference: String,
    },

    /// A field that is fixed at creation was changed.
    #[error("{field} cannot be changed from {current:?} to {desired:?} after creation")]
    ImmutableField {
        /// Name of the immutable field
        field: &'static str,
        /// Value the deployment was created with
        current: String,
        /// Value requested by the desired state
        desired: String,
    },

    /// A topology element asked for fewer than one zone.
    #[error("{kind} zone_count must be at least 1, got {value}")]
    InvalidZoneCount {
        /// Component the element belongs to
        kind: ComponentKind,
        /// The rejected zone count
        value: i32,
    },

    /// A node type flag was set that the component kind does not have.
    #[error("{kind} does not support node type {flag:?}")]
    UnknownNodeType {
        /// Component the flag was set on
        kind: ComponentKind,
        /// The unsupported flag
        flag: String,
    },
}

/// Result type for reconciliation.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_names_component() {
        let err = Error::IncompleteSpec {
            kind: ComponentKind::Elasticsearch,
            field: "size",
        };
        assert_eq!(err.to_string(), "incomplete elasticsearch spec: size is required");
    }

    #[test]
    fn test_dangling_reference_display() {
        let err = Error::DanglingReference {
            kind: ComponentKind::Kibana,
            reference: "other-cluster".to_string(),
        };
        let display = err.to_string();
        assert!(display.contains("kibana"));
        assert!(display.contains("other-cluster"));
    }
}
