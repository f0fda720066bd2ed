use super::FragTree;
use crate::libs::fragtree::node::NodeId;
use std::io::Read;

/// Read Newick fragmentation trees from a file.
///
/// # Arguments
/// * `infile` - Path to the input file (or "stdin" for stdin).
///
/// # Example
/// ```
/// // usage in CLI:
/// // let trees = ftalign::libs::fragtree::FragTree::from_file("path/to/trees.nwk")?;
/// ```
pub fn from_file(infile: &str) -> anyhow::Result<Vec<FragTree>> {
    let mut reader = intspan::reader(infile);
    let mut newick = String::new();
    reader
        .read_to_string(&mut newick)
        .map_err(|e| anyhow::anyhow!("Read error: {}", e))?;
    Ok(FragTree::from_newick_multi(newick.as_str())?)
}

/// Serialize tree to a single-line Newick string.
///
/// Non-root labels are loss formulas, the root label is the tree name,
/// weights become branch lengths, fragments and names go to NHX tags.
pub fn to_newick(tree: &FragTree) -> String {
    if let Some(root) = tree.get_root() {
        let mut s = to_newick_recursive(tree, root);
        s.push(';');
        s
    } else {
        ";".to_string()
    }
}

fn to_newick_recursive(tree: &FragTree, node_id: NodeId) -> String {
    let Some(node) = tree.get_node(node_id) else {
        return String::new();
    };

    let mut node_info = String::new();
    if node.is_root() {
        if let Some(name) = &node.name {
            node_info.push_str(&quote_label(name));
        }
    } else if let Some(loss) = &node.loss {
        node_info.push_str(&loss.to_string());
    }

    if node.weight != 0.0 {
        node_info.push_str(&format!(":{}", node.weight));
    }

    let mut props = Vec::new();
    if let Some(fragment) = &node.fragment {
        props.push(format!("F={}", fragment));
    }
    if !node.is_root() {
        if let Some(name) = &node.name {
            props.push(format!("N={}", name));
        }
    }
    if !props.is_empty() {
        node_info.push_str(&format!("[&&NHX:{}]", props.join(":")));
    }

    if node.children.is_empty() {
        node_info
    } else {
        let children_strs: Vec<String> = node
            .children
            .iter()
            .map(|&child| to_newick_recursive(tree, child))
            .collect();
        format!("({}){}", children_strs.join(","), node_info)
    }
}

fn quote_label(label: &str) -> String {
    if label.chars().any(|c| "():;,[] \t'".contains(c)) {
        format!("'{}'", label.replace('\'', "''"))
    } else {
        label.to_string()
    }
}
