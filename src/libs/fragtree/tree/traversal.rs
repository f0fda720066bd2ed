use super::FragTree;
use crate::libs::fragtree::node::NodeId;

/// Get node IDs in preorder traversal (Root -> Children)
pub fn preorder(tree: &FragTree, start_node: NodeId) -> Vec<NodeId> {
    let mut result = Vec::new();
    let mut stack = vec![start_node];

    while let Some(id) = stack.pop() {
        if let Some(node) = tree.get_node(id) {
            result.push(id);
            // Push children in reverse order so they are processed in order
            for &child in node.children.iter().rev() {
                stack.push(child);
            }
        }
    }

    result
}

/// Get node IDs in postorder traversal (Children -> Root).
/// A child always precedes its parent.
pub fn postorder(tree: &FragTree, start_node: NodeId) -> Vec<NodeId> {
    let mut result = Vec::new();
    // (node, children already expanded)
    let mut stack = vec![(start_node, false)];

    while let Some((id, expanded)) = stack.pop() {
        let Some(node) = tree.get_node(id) else {
            continue;
        };
        if expanded {
            result.push(id);
        } else {
            stack.push((id, true));
            for &child in node.children.iter().rev() {
                stack.push((child, false));
            }
        }
    }

    result
}

/// Number of edges on the longest root-to-leaf path
pub fn depth(tree: &FragTree) -> usize {
    let Some(root) = tree.get_root() else {
        return 0;
    };
    let mut max = 0;
    let mut stack = vec![(root, 0usize)];
    while let Some((id, d)) = stack.pop() {
        if let Some(node) = tree.get_node(id) {
            max = max.max(d);
            for &child in &node.children {
                stack.push((child, d + 1));
            }
        }
    }
    max
}
