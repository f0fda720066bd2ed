use super::*;
use crate::libs::formula::Formula;

fn sample() -> FragTree {
    //      0
    //     / \
    //    1   2
    //   / \   \
    //  3   4   5
    FragTree::from_newick("((H2O,CO)CH4,(NH3)C2H2)root;").unwrap()
}

#[test]
fn test_tree_traversals() {
    let mut tree = FragTree::new();
    let n0 = tree.add_node();
    let n1 = tree.add_node();
    let n2 = tree.add_node();
    let n3 = tree.add_node();
    let n4 = tree.add_node();
    let n5 = tree.add_node();

    tree.set_root(n0);
    tree.add_child(n0, n1).unwrap();
    tree.add_child(n0, n2).unwrap();
    tree.add_child(n1, n3).unwrap();
    tree.add_child(n1, n4).unwrap();
    tree.add_child(n2, n5).unwrap();

    let pre = tree.preorder(&n0);
    assert_eq!(pre, vec![n0, n1, n3, n4, n2, n5]);

    let post = tree.postorder(&n0);
    assert_eq!(post, vec![n3, n4, n1, n5, n2, n0]);

    assert_eq!(tree.depth(), 2);
    assert_eq!(tree.max_degree(), 2);
    assert_eq!(tree.get_leaves(), vec![n3, n4, n5]);
}

#[test]
fn test_tree_add_child_errors() {
    let mut tree = FragTree::new();
    let n0 = tree.add_node();
    let n1 = tree.add_node();
    tree.set_root(n0);

    assert!(tree.add_child(n0, n0).is_err());
    assert!(tree.add_child(n0, 9).is_err());
    assert!(tree.add_child(n0, n1).is_ok());
    assert!(tree.add_child(n0, n1).is_err());
}

#[test]
fn test_tree_uid() {
    let tree = sample();
    let copy = tree.clone();
    assert_eq!(tree.uid(), copy.uid());

    let mut moved = tree.clone();
    let leaf = moved.get_leaves()[0];
    moved.pull_up(leaf).unwrap();
    assert_ne!(tree.uid(), moved.uid());
}

#[test]
fn test_tree_pull_up() {
    let mut tree = sample();
    let root = tree.get_root().unwrap();
    let inner = tree.get_node(root).unwrap().children[0];
    let h2o = tree.get_node(inner).unwrap().children[0];

    let former = tree.pull_up(h2o).unwrap();
    assert_eq!(former, inner);

    let h2o_node = tree.get_node(h2o).unwrap();
    assert_eq!(h2o_node.parent, Some(root));
    assert_eq!(h2o_node.loss, Some(Formula::parse("H2O").unwrap()));

    // appended after existing children
    let root_node = tree.get_node(root).unwrap();
    assert_eq!(root_node.children.len(), 3);
    assert_eq!(*root_node.children.last().unwrap(), h2o);
    assert_eq!(tree.get_node(inner).unwrap().children.len(), 1);
    assert_eq!(tree.len(), 6);

    // children of the root cannot be pulled up
    assert!(tree.pull_up(inner).is_err());
    assert!(tree.pull_up(root).is_err());
}

#[test]
fn test_tree_shuffled() {
    let tree = FragTree::from_newick("(CO,H2O,NH3,CH4,C2H2,O,S,H2)root;").unwrap();
    let a = tree.shuffled(7);
    let b = tree.shuffled(7);
    assert_eq!(a.to_newick(), b.to_newick());
    assert_eq!(a.len(), tree.len());

    let mut labels: Vec<String> = a.nodes().map(|n| n.loss_label()).collect();
    let mut orig: Vec<String> = tree.nodes().map(|n| n.loss_label()).collect();
    labels.sort();
    orig.sort();
    assert_eq!(labels, orig);
}

#[test]
fn test_tree_random() {
    let tree = FragTree::random(7, 2, &[]);
    assert_eq!(tree.len(), 7);
    assert_eq!(tree.max_degree(), 2);
    assert_eq!(tree.depth(), 2);
    assert!(tree
        .nodes()
        .filter(|n| !n.is_root())
        .all(|n| n.loss_label() == "CO"));

    assert!(FragTree::random(0, 3, &[]).is_empty());
}

#[test]
fn test_tree_to_newick() {
    let input = "((H2O,CO)CH4:1.5,(CH3N[&&NHX:F=C2H5N:N=p2])C2H2)root;";
    let tree = FragTree::from_newick(input).unwrap();
    assert_eq!(tree.to_newick(), input);

    let again = FragTree::from_newick(&tree.to_newick()).unwrap();
    assert_eq!(again.len(), tree.len());

    assert_eq!(FragTree::new().to_newick(), ";");
}
