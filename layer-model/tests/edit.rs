//! Tests for delete / group / ungroup edits.

use layer_model::{Document, ModelError, NodeId, NodeSpec, TreeRead};

fn doc() -> Document {
    Document::with_root(NodeSpec::container().with_id("root").children([
        NodeSpec::leaf().with_id("a"),
        NodeSpec::leaf().with_id("b"),
        NodeSpec::container()
            .with_id("box")
            .children([NodeSpec::leaf().with_id("c"), NodeSpec::leaf().with_id("d")]),
        NodeSpec::leaf().with_id("e"),
    ]))
}

fn id(doc: &Document, name: &str) -> NodeId {
    doc.find_by_identifier(name).unwrap()
}

fn names(doc: &Document, nodes: &[NodeId]) -> Vec<String> {
    nodes
        .iter()
        .map(|n| doc.identifier(*n).unwrap_or_default())
        .collect()
}

#[test]
fn test_remove_selected() {
    let doc = doc();
    doc.select(&[id(&doc, "a"), id(&doc, "box"), id(&doc, "c")]);
    assert_eq!(doc.remove_selected(), Ok(2));
    let root = doc.root().unwrap();
    assert_eq!(names(&doc, &doc.children(root)), vec!["b", "e"]);
    assert!(doc.selected_nodes().is_empty());
}

#[test]
fn test_remove_requires_selection() {
    let doc = doc();
    assert_eq!(doc.remove_selected(), Err(ModelError::EmptySelection));
}

#[test]
fn test_remove_root_only_is_rejected() {
    let doc = doc();
    doc.select(&[doc.root().unwrap()]);
    assert_eq!(doc.remove_selected(), Err(ModelError::RootNotRemovable));
}

#[test]
fn test_group_selected_in_document_order() {
    let doc = doc();
    doc.select(&[id(&doc, "e"), id(&doc, "b")]);
    let group = doc.group_selected().unwrap();

    let root = doc.root().unwrap();
    let top = doc.children(root);
    assert_eq!(top.len(), 3);
    assert_eq!(top[1], group);
    assert_eq!(doc.identifier(top[2]).as_deref(), Some("box"));
    assert!(doc.is_container(group));
    assert_eq!(names(&doc, &doc.children(group)), vec!["b", "e"]);
    assert_eq!(doc.selected_nodes(), vec![group]);
}

#[test]
fn test_group_rejects_mixed_depth() {
    let doc = doc();
    doc.select(&[id(&doc, "a"), id(&doc, "c")]);
    assert_eq!(doc.group_selected(), Err(ModelError::MixedDepth));
}

#[test]
fn test_group_needs_two() {
    let doc = doc();
    doc.select(&[id(&doc, "a")]);
    assert!(matches!(
        doc.group_selected(),
        Err(ModelError::InvalidSelection(_))
    ));
}

#[test]
fn test_ungroup_splices_children() {
    let doc = doc();
    let boxed = id(&doc, "box");
    doc.select(&[boxed]);
    let children = doc.ungroup_selected().unwrap();

    let root = doc.root().unwrap();
    assert_eq!(
        names(&doc, &doc.children(root)),
        vec!["a", "b", "c", "d", "e"]
    );
    assert!(!doc.contains(boxed));
    assert_eq!(doc.selected_nodes(), children);
    assert_eq!(doc.depth(children[0]), 1);
}

#[test]
fn test_ungroup_leaf_is_rejected() {
    let doc = doc();
    let a = id(&doc, "a");
    doc.select(&[a]);
    assert_eq!(doc.ungroup_selected(), Err(ModelError::NotAContainer(a)));
}

#[test]
fn test_move_into_own_subtree_is_rejected() {
    let doc = doc();
    let boxed = id(&doc, "box");
    let inner = doc
        .add_node(boxed, 0, NodeSpec::container().with_id("inner"))
        .unwrap();
    assert!(matches!(
        doc.move_node(boxed, inner, 0),
        Err(ModelError::InvalidSelection(_))
    ));
}
