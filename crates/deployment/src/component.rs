//! Component kinds and their per-kind descriptor table.
//!
//! A deployment is made of one mandatory elasticsearch cluster plus optional
//! companion services. Instead of a bespoke flattener and expander per kind,
//! every kind is described by a [`ComponentDescriptor`] and the generic code
//! in [`crate::flatten`] and [`crate::expand`] reads the differences from it.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A managed-service type that can be part of a deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentKind {
    /// The primary data-plane cluster. Every deployment has exactly one.
    Elasticsearch,
    /// Kibana UI.
    Kibana,
    /// APM server.
    Apm,
    /// App Search (pre-7.7 standalone).
    Appsearch,
    /// Enterprise Search.
    EnterpriseSearch,
}

impl ComponentKind {
    /// Identifier used in attribute names and on the wire.
    pub fn name(&self) -> &'static str {
        self.descriptor().name
    }

    /// Whether this is the mandatory primary kind.
    pub fn is_primary(&self) -> bool {
        matches!(self, Self::Elasticsearch)
    }

    /// All kinds, primary first. Reconciliation walks kinds in this order.
    pub fn all() -> &'static [ComponentKind] {
        &[
            Self::Elasticsearch,
            Self::Kibana,
            Self::Apm,
            Self::Appsearch,
            Self::EnterpriseSearch,
        ]
    }

    /// Static description of this kind's fields and defaults.
    pub fn descriptor(&self) -> &'static ComponentDescriptor {
        match self {
            Self::Elasticsearch => &DESCRIPTORS[0],
            Self::Kibana => &DESCRIPTORS[1],
            Self::Apm => &DESCRIPTORS[2],
            Self::Appsearch => &DESCRIPTORS[3],
            Self::EnterpriseSearch => &DESCRIPTORS[4],
        }
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A boolean node role a topology element may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeTypeFlag {
    /// Flag name without the `node_type_` prefix
    pub name: &'static str,
    /// Value used when creating a new element
    pub default: bool,
}

/// Per-kind field set and default table.
#[derive(Debug)]
pub struct ComponentDescriptor {
    /// Kind this descriptor belongs to
    pub kind: ComponentKind,
    /// Wire/attribute name
    pub name: &'static str,
    /// ref_id used when the spec does not set one
    pub default_ref_id: &'static str,
    /// Node type flags defined for this kind, in attribute order
    pub node_types: &'static [NodeTypeFlag],
    /// Capacity used on create when the spec omits a size; `None` means mandatory
    pub default_size: Option<&'static str>,
    /// Instance configuration used on create when the spec omits one
    pub default_instance_configuration_id: &'static str,
    /// Zone count used on create when the spec omits one
    pub default_zone_count: i32,
}

impl ComponentDescriptor {
    /// Look up a node type flag by name.
    pub fn node_type(&self, name: &str) -> Option<&'static NodeTypeFlag> {
        self.node_types.iter().find(|flag| flag.name == name)
    }
}

/// Prefix of node type attributes in flat state.
pub const NODE_TYPE_PREFIX: &str = "node_type_";

static DESCRIPTORS: [ComponentDescriptor; 5] = [
    ComponentDescriptor {
        kind: ComponentKind::Elasticsearch,
        name: "elasticsearch",
        default_ref_id: "main-elasticsearch",
        node_types: &[
            NodeTypeFlag { name: "data", default: true },
            NodeTypeFlag { name: "master", default: true },
            NodeTypeFlag { name: "ingest", default: true },
            NodeTypeFlag { name: "ml", default: false },
        ],
        default_size: None,
        default_instance_configuration_id: "aws.data.highio.i3",
        default_zone_count: 1,
    },
    ComponentDescriptor {
        kind: ComponentKind::Kibana,
        name: "kibana",
        default_ref_id: "main-kibana",
        node_types: &[],
        default_size: Some("1g"),
        default_instance_configuration_id: "aws.kibana.r5d",
        default_zone_count: 1,
    },
    ComponentDescriptor {
        kind: ComponentKind::Apm,
        name: "apm",
        default_ref_id: "main-apm",
        node_types: &[],
        default_size: Some("512m"),
        default_instance_configuration_id: "aws.apm.r5d",
        default_zone_count: 1,
    },
    ComponentDescriptor {
        kind: ComponentKind::Appsearch,
        name: "appsearch",
        default_ref_id: "main-appsearch",
        node_types: &[
            NodeTypeFlag { name: "appserver", default: true },
            NodeTypeFlag { name: "worker", default: true },
        ],
        default_size: Some("2g"),
        default_instance_configuration_id: "aws.appsearch.m5d",
        default_zone_count: 1,
    },
    ComponentDescriptor {
        kind: ComponentKind::EnterpriseSearch,
        name: "enterprise_search",
        default_ref_id: "main-enterprise_search",
        node_types: &[
            NodeTypeFlag { name: "appserver", default: true },
            NodeTypeFlag { name: "worker", default: true },
            NodeTypeFlag { name: "connector", default: true },
        ],
        default_size: Some("2g"),
        default_instance_configuration_id: "aws.enterprisesearch.m5d",
        default_zone_count: 1,
    },
];
