//! Read-side assembly of the multi-structure forest.

use crate::models::{GeoNode, GeoNodeResponse, GeoTreeNode, NodeKind};
use std::collections::HashMap;
use tracing::warn;
use uuid::Uuid;

fn sort_nodes(nodes: &mut [GeoNode]) {
    nodes.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.name.cmp(&b.name)));
}

/// Names of the location children, in display order.
pub fn leaf_names(children: &[GeoNode]) -> Vec<String> {
    children
        .iter()
        .filter(|c| c.kind == NodeKind::Location)
        .map(|c| c.name.clone())
        .collect()
}

/// Build a tree node, projecting `villages`/`sections` from `children`,
/// which must already be sorted.
pub fn tree_node(
    node: GeoNode,
    children: Vec<GeoTreeNode>,
    sorted_children: &[GeoNode],
) -> GeoTreeNode {
    let mut villages = None;
    let mut sections = None;
    match node.kind.leaf_list_name() {
        Some("villages") => villages = Some(leaf_names(sorted_children)),
        Some("sections") => sections = Some(leaf_names(sorted_children)),
        _ => {}
    }
    GeoTreeNode {
        node: GeoNodeResponse::from(node),
        villages,
        sections,
        children,
    }
}

/// Group a flat node list into trees.
///
/// Nodes whose parent is missing from the batch are kept as roots so they
/// stay visible. Siblings and roots are sorted by `order`, then name.
pub fn assemble_forest(nodes: Vec<GeoNode>) -> Vec<GeoTreeNode> {
    let ids: std::collections::HashSet<Uuid> = nodes.iter().map(|n| n.id).collect();
    let mut by_parent: HashMap<Uuid, Vec<GeoNode>> = HashMap::new();
    let mut roots = Vec::new();

    for node in nodes {
        match node.parent_id() {
            Some(parent_id) if ids.contains(&parent_id) => {
                by_parent.entry(parent_id).or_default().push(node)
            }
            Some(parent_id) => {
                warn!(node_id = %node.id, parent_id = %parent_id, path = %node.path, "Orphaned geo node");
                roots.push(node);
            }
            None => roots.push(node),
        }
    }

    sort_children(&mut by_parent);
    sort_nodes(&mut roots);

    roots
        .into_iter()
        .map(|root| build(root, &mut by_parent))
        .collect()
}

/// Build the tree below `root` from its descendants.
pub fn assemble_subtree(root: GeoNode, descendants: Vec<GeoNode>) -> GeoTreeNode {
    let mut by_parent: HashMap<Uuid, Vec<GeoNode>> = HashMap::new();
    for node in descendants {
        if let Some(parent_id) = node.parent_id() {
            by_parent.entry(parent_id).or_default().push(node);
        }
    }
    sort_children(&mut by_parent);
    build(root, &mut by_parent)
}

fn sort_children(by_parent: &mut HashMap<Uuid, Vec<GeoNode>>) {
    for children in by_parent.values_mut() {
        sort_nodes(children);
    }
}

// Depth is bounded by the longest kind sequence, so recursion stays shallow.
fn build(node: GeoNode, by_parent: &mut HashMap<Uuid, Vec<GeoNode>>) -> GeoTreeNode {
    let children = by_parent.remove(&node.id).unwrap_or_default();
    let subtrees = children
        .iter()
        .cloned()
        .map(|child| build(child, by_parent))
        .collect();
    tree_node(node, subtrees, &children)
}
