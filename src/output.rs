use std::collections::BTreeMap;

use serde_json::Value;
use tabled::settings::Style;
use tabled::{Table, Tabled};
use termtree::Tree;

use crate::reconcile::{DataResult, Plan};
use crate::resource::Attributes;
use crate::state::{ResourceState, StateFile};

const SENSITIVE: &[&str] = &["secret", "plain_text", "admin_pass", "user_data"];
const REDACTED: &str = "(sensitive)";

#[derive(Tabled)]
struct PlanRow {
    #[tabled(rename = "Address")]
    address: String,
    #[tabled(rename = "Action")]
    action: String,
    #[tabled(rename = "Changed")]
    changed: String,
}

fn format_value(key: &str, value: &Value) -> String {
    if SENSITIVE.contains(&key) {
        return REDACTED.to_string();
    }
    match value {
        Value::String(s) => format!("\"{}\"", s),
        other => other.to_string(),
    }
}

fn attribute_leaves(attributes: &Attributes) -> Vec<Tree<String>> {
    attributes
        .iter()
        .filter(|(_, value)| !value.is_null())
        .map(|(key, value)| Tree::new(format!("{} = {}", key, format_value(key, value))))
        .collect()
}

fn resource_node(resource: &ResourceState) -> Tree<String> {
    let mut label = format!("{} ({})", resource.name, resource.id);
    if resource.tainted {
        label.push_str(" [tainted]");
    }
    Tree::new(label).with_leaves(attribute_leaves(&resource.attributes))
}

pub fn render_plan(plan: &Plan) -> String {
    if !plan.has_changes() {
        return format!("No changes. {}", plan.summary());
    }

    let rows: Vec<PlanRow> = plan
        .changes
        .iter()
        .map(|change| PlanRow {
            address: change.address(),
            action: change.action.to_string(),
            changed: change.changed.join(", "),
        })
        .collect();

    let mut table = Table::new(rows);
    table.with(Style::rounded());
    format!("{}\n{}", table, plan.summary())
}

/// Stored resources grouped by type.
pub fn render_state(state: &StateFile) -> String {
    let mut by_type: BTreeMap<&str, Vec<&ResourceState>> = BTreeMap::new();
    for resource in &state.resources {
        by_type
            .entry(resource.resource_type.as_str())
            .or_default()
            .push(resource);
    }

    let groups: Vec<Tree<String>> = by_type
        .into_iter()
        .map(|(resource_type, resources)| {
            Tree::new(resource_type.to_string())
                .with_leaves(resources.into_iter().map(resource_node))
        })
        .collect();

    let root = format!("state ({} resources)", state.resources.len());
    Tree::new(root).with_leaves(groups).to_string()
}

pub fn render_data(results: &[DataResult]) -> String {
    let nodes: Vec<Tree<String>> = results
        .iter()
        .map(|result| {
            Tree::new(format!(
                "data.{}.{} ({})",
                result.data_type, result.name, result.id
            ))
            .with_leaves(attribute_leaves(&result.attributes))
        })
        .collect();

    Tree::new("data".to_string()).with_leaves(nodes).to_string()
}
