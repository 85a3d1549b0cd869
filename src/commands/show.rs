//! Show the flattened state of a deployment.

use crate::commands;
use crate::progress;
use crate::ui;
use crate::Context;
use anyhow::{Result, bail};
use colored::Colorize;
use deployment::{FlatComponentState, FlatDeploymentState};

pub fn run(ctx: &Context, id: &str, json: bool) -> Result<()> {
    let client = commands::client(ctx, None);

    let pb = progress::spinner(&format!("Reading deployment {id}..."), ctx.quiet || json);
    let state = client.read(id);
    progress::finish_clear(&pb);

    let Some(state) = state.map_err(commands::report)? else {
        bail!("Deployment {id} not found");
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&state)?);
    } else {
        display_state(&state);
    }
    Ok(())
}

fn display_state(state: &FlatDeploymentState) {
    let title = if state.name.is_empty() {
        state.id.as_str()
    } else {
        state.name.as_str()
    };
    ui::header(title);
    ui::kv("id", &state.id);
    ui::kv("region", &state.region);

    if state.components.is_empty() {
        ui::dim("No provisioned components");
        return;
    }

    for (kind, component) in &state.components {
        ui::section(kind.name());
        display_component(component);
    }
}

fn display_component(component: &FlatComponentState) {
    ui::kv("ref_id", &component.ref_id);
    ui::kv("version", &component.version);
    if !component.resource_id.is_empty() {
        ui::kv("resource_id", &component.resource_id);
    }
    if let Some(reference) = &component.elasticsearch_cluster_ref_id {
        ui::kv("elasticsearch", reference);
    }
    if component.https_endpoint.is_empty() {
        ui::kv("endpoint", &"(not yet known)".dimmed().to_string());
    } else {
        ui::kv("endpoint", &component.https_endpoint);
    }
    for element in &component.topology {
        println!("    {}", topology_line(element));
    }
}

fn topology_line(element: &deployment::FlatTopologyElement) -> String {
    let roles: Vec<&str> = element
        .node_types
        .iter()
        .filter(|(_, enabled)| **enabled)
        .filter_map(|(key, _)| key.strip_prefix(deployment::component::NODE_TYPE_PREFIX))
        .collect();

    let mut line = format!(
        "{} × {} zone(s)  {}",
        element.memory_per_node,
        element.zone_count,
        element.instance_configuration_id.dimmed()
    );
    if !roles.is_empty() {
        line.push_str(&format!("  [{}]", roles.join(", ")));
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_topology_line_lists_enabled_roles() {
        colored::control::set_override(false);
        let element = deployment::FlatTopologyElement {
            instance_configuration_id: "aws.data.highio.i3".to_string(),
            memory_per_node: "4g".to_string(),
            zone_count: 2,
            node_types: BTreeMap::from([
                ("node_type_data".to_string(), true),
                ("node_type_ml".to_string(), false),
                ("node_type_master".to_string(), true),
            ]),
        };
        assert_eq!(
            topology_line(&element),
            "4g × 2 zone(s)  aws.data.highio.i3  [data, master]"
        );
    }
}
