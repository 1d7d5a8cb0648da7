//! Tests for document mutations and change events.

use std::sync::{Arc, Mutex};

use layer_model::{
    Document, DocumentEvent, ModelError, NodePath, NodeSpec, PropertyValue, TreeRead, path_of,
};

fn record(doc: &Document) -> (Arc<Mutex<Vec<DocumentEvent>>>, layer_model::Subscription) {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    let sub = doc.subscribe(move |event| sink.lock().unwrap().push(event.clone()));
    (events, sub)
}

fn panel() -> Document {
    Document::with_root(
        NodeSpec::container().with_id("root").children([
            NodeSpec::container()
                .with_id("header")
                .children([NodeSpec::leaf().with_id("title"), NodeSpec::leaf()]),
            NodeSpec::leaf().with_id("footer"),
        ]),
    )
}

#[test]
fn test_with_root_builds_tree() {
    let doc = panel();
    let root = doc.root().unwrap();
    assert_eq!(doc.node_count(), 5);
    assert_eq!(doc.children(root).len(), 2);
    assert_eq!(doc.identifier(root).as_deref(), Some("root"));
    let title = doc.find_by_identifier("title").unwrap();
    assert_eq!(doc.depth(title), 2);
    assert!(!doc.is_container(title));
}

#[test]
fn test_add_node_emits_event() {
    let doc = panel();
    let (events, _sub) = record(&doc);
    let root = doc.root().unwrap();
    let added = doc.add_node(root, 1, NodeSpec::leaf()).unwrap();

    assert_eq!(doc.children(root)[1], added);
    assert_eq!(
        events.lock().unwrap().as_slice(),
        &[DocumentEvent::NodeAdded {
            node: added,
            parent: root
        }]
    );
}

#[test]
fn test_add_to_leaf_is_rejected() {
    let doc = panel();
    let footer = doc.find_by_identifier("footer").unwrap();
    assert_eq!(
        doc.add_node(footer, 0, NodeSpec::leaf()),
        Err(ModelError::NotAContainer(footer))
    );
}

#[test]
fn test_remove_node_drops_subtree_and_selection() {
    let doc = panel();
    let header = doc.find_by_identifier("header").unwrap();
    let title = doc.find_by_identifier("title").unwrap();
    doc.select(&[title]);
    let (events, _sub) = record(&doc);

    doc.remove_node(header).unwrap();

    assert!(!doc.contains(title));
    assert!(doc.selected_nodes().is_empty());
    let events = events.lock().unwrap();
    assert!(matches!(events[0], DocumentEvent::NodeRemoved { node, .. } if node == header));
    assert_eq!(events[1], DocumentEvent::SelectionChanged);
}

#[test]
fn test_root_cannot_be_removed() {
    let doc = panel();
    let root = doc.root().unwrap();
    assert_eq!(doc.remove_node(root), Err(ModelError::RootNotRemovable));
}

#[test]
fn test_set_root_makes_old_ids_stale() {
    let doc = panel();
    let old_root = doc.root().unwrap();
    let old_title = doc.find_by_identifier("title").unwrap();
    doc.select(&[old_title]);
    let (events, _sub) = record(&doc);

    let new_root = doc.set_root(NodeSpec::container().child(NodeSpec::leaf().with_id("title")));

    assert_ne!(old_root, new_root);
    assert!(!doc.contains(old_title));
    assert_eq!(path_of(&doc, old_title), None);
    assert_eq!(doc.former_path(old_title), Some(NodePath::from([0, 0])));
    assert!(doc.selected_nodes().is_empty());
    assert_eq!(
        events.lock().unwrap().as_slice(),
        &[DocumentEvent::RootChanged {
            root: Some(new_root)
        }]
    );
}

#[test]
fn test_set_property_updates_identifier() {
    let doc = panel();
    let footer = doc.find_by_identifier("footer").unwrap();
    let (events, _sub) = record(&doc);

    doc.set_property(footer, "id", PropertyValue::Text("bottom".into()))
        .unwrap();
    doc.set_property(footer, "alpha", PropertyValue::Number(0.5))
        .unwrap();

    assert_eq!(doc.identifier(footer).as_deref(), Some("bottom"));
    assert_eq!(doc.property(footer, "alpha"), Some(PropertyValue::Number(0.5)));
    let events = events.lock().unwrap();
    assert_eq!(events.len(), 2);
    assert!(matches!(&events[0], DocumentEvent::TreeChanged { property, .. } if property == "id"));
}

#[test]
fn test_select_filters_unknown_and_duplicates() {
    let doc = panel();
    let title = doc.find_by_identifier("title").unwrap();
    let footer = doc.find_by_identifier("footer").unwrap();
    doc.remove_node(footer).unwrap();
    doc.select(&[title, footer, title]);
    assert_eq!(doc.selected_nodes(), vec![title]);
}

#[test]
fn test_dropping_subscription_unsubscribes() {
    let doc = panel();
    let (events, sub) = record(&doc);
    assert_eq!(doc.listener_count(), 1);
    drop(sub);
    assert_eq!(doc.listener_count(), 0);
    doc.clear_selection();
    assert!(events.lock().unwrap().is_empty());
}

#[test]
fn test_dispose_is_idempotent() {
    let doc = panel();
    let (_events, mut sub) = record(&doc);
    sub.dispose();
    sub.dispose();
    assert!(!sub.is_active());
    assert_eq!(doc.listener_count(), 0);
}

#[test]
fn test_listener_can_read_document() {
    let doc = panel();
    let reader = doc.clone();
    let seen = Arc::new(Mutex::new(None));
    let sink = Arc::clone(&seen);
    let _sub = doc.subscribe(move |event| {
        if let DocumentEvent::NodeAdded { node, .. } = event {
            *sink.lock().unwrap() = path_of(&reader, *node);
        }
    });
    let root = doc.root().unwrap();
    doc.add_node(root, 0, NodeSpec::leaf()).unwrap();
    assert_eq!(*seen.lock().unwrap(), Some(NodePath::from([0])));
}

#[test]
fn test_session_is_per_document() {
    let a = panel();
    let b = panel();
    a.session().set("k", &1u8).unwrap();
    assert!(a.clone().session().contains_key("k"));
    assert!(!b.session().contains_key("k"));
}
