//! User-authored desired state.
//!
//! A desired-state document looks like:
//!
//! ```toml
//! name = "search"
//! region = "us-east-1"
//!
//! [elasticsearch]
//! version = "7.8.1"
//!
//! [[elasticsearch.topology]]
//! size = "4g"
//! zone_count = 2
//!
//! [kibana]
//! ```
//!
//! Component tables are keyed by kind, so each kind appears at most once.
//! Every field inside a component is optional here; what is mandatory is
//! decided during expansion, where remote state and defaults are known.

use crate::component::ComponentKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Desired state of a whole deployment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesiredState {
    pub name: String,
    pub region: String,
    #[serde(flatten)]
    pub components: BTreeMap<ComponentKind, ComponentSpec>,
}

impl DesiredState {
    pub fn new(name: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            region: region.into(),
            components: BTreeMap::new(),
        }
    }

    /// Declare a component, replacing any previous spec of that kind.
    pub fn with_component(mut self, kind: ComponentKind, spec: ComponentSpec) -> Self {
        self.components.insert(kind, spec);
        self
    }

    pub fn component(&self, kind: ComponentKind) -> Option<&ComponentSpec> {
        self.components.get(&kind)
    }
}

/// Desired configuration of one component.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ref_id: Option<String>,
    /// Companions only: ref_id of the elasticsearch cluster to bind to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elasticsearch_cluster_ref_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub topology: Vec<TopologySpec>,
}

impl ComponentSpec {
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn element(mut self, element: TopologySpec) -> Self {
        self.topology.push(element);
        self
    }

    /// The ref_id this component is declared under: explicit, else the
    /// kind's default. Never taken from remote state.
    pub fn resolved_ref_id(&self, kind: ComponentKind) -> String {
        self.ref_id
            .clone()
            .filter(|r| !r.is_empty())
            .unwrap_or_else(|| kind.descriptor().default_ref_id.to_string())
    }
}

/// Desired sizing of one topology element.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopologySpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_configuration_id: Option<String>,
    /// Capacity string such as `"1g"` or `"512m"`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone_count: Option<i32>,
    /// Node roles keyed by flag name without the `node_type_` prefix
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub node_type: BTreeMap<String, bool>,
}

impl TopologySpec {
    pub fn sized(size: impl Into<String>) -> Self {
        Self {
            size: Some(size.into()),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_toml_document() {
        let doc = r#"
name = "search"
region = "us-east-1"

[elasticsearch]
version = "7.8.1"

[[elasticsearch.topology]]
size = "4g"
zone_count = 2
node_type = { ml = true }

[kibana]
"#;
        let desired: DesiredState = toml::from_str(doc).unwrap();
        assert_eq!(desired.name, "search");
        assert_eq!(desired.components.len(), 2);

        let es = desired.component(ComponentKind::Elasticsearch).unwrap();
        assert_eq!(es.version.as_deref(), Some("7.8.1"));
        assert_eq!(es.topology[0].size.as_deref(), Some("4g"));
        assert_eq!(es.topology[0].zone_count, Some(2));
        assert_eq!(es.topology[0].node_type.get("ml"), Some(&true));

        let kibana = desired.component(ComponentKind::Kibana).unwrap();
        assert_eq!(kibana, &ComponentSpec::default());
    }

    #[test]
    fn test_unknown_component_rejected() {
        let doc = r#"
name = "search"
region = "us-east-1"

[logstash]
version = "7.8.1"
"#;
        assert!(toml::from_str::<DesiredState>(doc).is_err());
    }

    #[test]
    fn test_builder() {
        let desired = DesiredState::new("search", "us-east-1").with_component(
            ComponentKind::Elasticsearch,
            ComponentSpec::default()
                .version("7.8.1")
                .element(TopologySpec::sized("1g")),
        );
        assert!(desired.component(ComponentKind::Elasticsearch).is_some());
        assert!(desired.component(ComponentKind::Kibana).is_none());
    }

    #[test]
    fn test_resolved_ref_id() {
        let es = ComponentKind::Elasticsearch;
        assert_eq!(ComponentSpec::default().resolved_ref_id(es), "main-elasticsearch");

        let named = ComponentSpec {
            ref_id: Some("search-es".to_string()),
            ..Default::default()
        };
        assert_eq!(named.resolved_ref_id(es), "search-es");

        let blank = ComponentSpec {
            ref_id: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(blank.resolved_ref_id(ComponentKind::Kibana), "main-kibana");
    }
}
