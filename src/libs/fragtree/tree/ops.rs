use super::FragTree;
use crate::libs::formula::Formula;
use crate::libs::fragtree::error::TreeError;
use crate::libs::fragtree::node::NodeId;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::VecDeque;

/// Add a child to a parent node.
/// Updates both parent's `children` list and child's `parent` field.
pub fn add_child(tree: &mut FragTree, parent_id: NodeId, child_id: NodeId) -> Result<(), TreeError> {
    if parent_id == child_id {
        return Err(TreeError::LogicError(
            "Cannot add node as child of itself".to_string(),
        ));
    }
    if tree.get_node(parent_id).is_none() {
        return Err(TreeError::LogicError(format!(
            "Parent node {} not found",
            parent_id
        )));
    }
    if tree.get_node(child_id).is_none() {
        return Err(TreeError::LogicError(format!(
            "Child node {} not found",
            child_id
        )));
    }
    if let Some(old_parent) = tree.nodes[child_id].parent {
        return Err(TreeError::LogicError(format!(
            "Node {} already has parent {}",
            child_id, old_parent
        )));
    }

    tree.nodes[child_id].parent = Some(parent_id);
    tree.nodes[parent_id].children.push(child_id);
    tree.touch();

    Ok(())
}

/// Reattach `id` to its grandparent, appended after the grandparent's
/// existing children. The former parent stays in the tree and the loss label
/// of `id` is kept. Returns the former parent.
pub fn pull_up(tree: &mut FragTree, id: NodeId) -> Result<NodeId, TreeError> {
    let parent_id = tree
        .get_node(id)
        .ok_or_else(|| TreeError::LogicError(format!("Node {} not found", id)))?
        .parent
        .ok_or_else(|| TreeError::LogicError(format!("Node {} is the root", id)))?;
    let grandparent_id = tree.nodes[parent_id].parent.ok_or_else(|| {
        TreeError::LogicError(format!("Parent of node {} is the root", id))
    })?;

    tree.nodes[parent_id].children.retain(|&c| c != id);
    tree.nodes[grandparent_id].children.push(id);
    tree.nodes[id].parent = Some(grandparent_id);
    tree.touch();

    Ok(parent_id)
}

/// Randomly reorder the children of every node. The node set is unchanged.
pub fn shuffle_children<R: rand::Rng + ?Sized>(tree: &mut FragTree, rng: &mut R) {
    let Some(root) = tree.root else {
        return;
    };
    for id in super::traversal::preorder(tree, root) {
        tree.nodes[id].children.shuffle(rng);
    }
    tree.touch();
}

/// A copy with children reordered by a seeded generator
pub fn shuffled(tree: &FragTree, seed: u64) -> FragTree {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut copy = tree.clone();
    shuffle_children(&mut copy, &mut rng);
    copy
}

/// Build a tree of `num_nodes` nodes filled breadth-first: each parent takes
/// `out_degree` children before the next node in line becomes a parent.
/// Losses are taken from `losses` cyclically; an empty slice yields `CO`.
pub fn random(num_nodes: usize, out_degree: usize, losses: &[Formula]) -> FragTree {
    let mut tree = FragTree::new();
    if num_nodes == 0 {
        return tree;
    }
    let out_degree = out_degree.max(1);
    let default_loss = [Formula::parse("CO").unwrap_or_default()];
    let losses = if losses.is_empty() {
        &default_loss[..]
    } else {
        losses
    };

    let root = tree.add_node();
    tree.set_root(root);

    let mut queue = VecDeque::new();
    let mut parent = root;
    let mut child_number = 0;
    for i in 1..num_nodes {
        let id = tree.add_node();
        tree.nodes[id].loss = Some(losses[(i - 1) % losses.len()].clone());
        tree.nodes[id].name = Some(format!("NL_{}", i));
        tree.nodes[id].weight = 1.0;
        tree.nodes[id].parent = Some(parent);
        tree.nodes[parent].children.push(id);
        queue.push_back(id);

        child_number += 1;
        if child_number == out_degree {
            if let Some(next) = queue.pop_front() {
                parent = next;
            }
            child_number = 0;
        }
    }

    tree
}
