// src/graph/alias_graph.rs

use std::collections::BTreeMap;

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::errors::{Result, TaskgraphError};
use crate::graph::expander::Expander;
use crate::graph::invocation::Reference;

/// Check every alias at once and return alias names ordered so that each
/// alias comes after the aliases it references.
///
/// Used by `--list` / `--dry-run` to report configuration problems up front.
/// A normal run only validates what it expands.
pub fn validate_aliases(expander: &Expander<'_>, aliases: &BTreeMap<String, Vec<String>>) -> Result<Vec<String>> {
    // Edge direction: referenced alias -> referencing alias.
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for name in aliases.keys() {
        graph.add_node(name.as_str());
    }

    for (name, body) in aliases.iter() {
        for raw in body {
            let reference = Reference::parse(raw);
            if reference.target.is_none() {
                if let Some((child, _)) = aliases.get_key_value(&reference.name) {
                    graph.add_edge(child.as_str(), name.as_str(), ());
                }
            }
        }
    }

    let order = match toposort(&graph, None) {
        Ok(order) => order,
        Err(cycle) => {
            // Let the expander name the full cycle.
            let node = cycle.node_id();
            return match expander.expand(node) {
                Err(err) => Err(err),
                Ok(_) => Err(TaskgraphError::CyclicAlias(format!(
                    "cycle detected in alias graph involving '{}'",
                    node
                ))),
            };
        }
    };

    // Acyclic: now surface unknown references too.
    for name in order.iter() {
        expander.expand(name)?;
    }

    Ok(order.into_iter().map(str::to_string).collect())
}
