//! # Persistence Tests
//!
//! End-to-end save/load behavior through `PersistenceEngine`, against a
//! scratch workspace.

use fieldbox_core::{
    Anchors, BoxBehavior, BoxGraph, BoxId, Diagnostic, Document, EdgeSide, FieldboxError,
    LoadStage, PersistenceEngine, PostLoad, Properties, PropertyValue, Record, document_to_string,
};
use std::collections::BTreeSet;
use std::fs;
use tempfile::TempDir;

const DOC: &str = "{{workspace}}doc.field2";

// =============================================================================
// HELPERS
// =============================================================================

fn engine(dir: &TempDir) -> PersistenceEngine {
    let mut engine = PersistenceEngine::new(dir.path()).expect("engine");
    engine.register_filespec("code", ".js", "javascript");
    engine
}

fn anchored_root(graph: &mut BoxGraph) -> (BoxId, Anchors) {
    let root = graph.insert_default();
    (root, Anchors::with("root", root))
}

fn named_child(graph: &mut BoxGraph, parent: BoxId, name: &str) -> BoxId {
    let id = graph.insert_default();
    graph.node_mut(id).expect("node").set("name", name);
    graph.connect(parent, id).expect("connect");
    id
}

fn identity(graph: &BoxGraph, id: BoxId) -> String {
    graph
        .node(id)
        .expect("node")
        .identity()
        .expect("identity")
        .to_string()
}

/// Default box type with a post-load hook that marks the box.
#[derive(Debug)]
struct Hooked;

impl PostLoad for Hooked {
    fn loaded(&mut self, properties: &mut Properties) -> Result<(), FieldboxError> {
        properties.insert("loaded".into(), PropertyValue::Bool(true));
        Ok(())
    }
}

impl BoxBehavior for Hooked {
    fn type_tag(&self) -> &str {
        "default"
    }

    fn post_load(&mut self) -> Option<&mut dyn PostLoad> {
        Some(self)
    }
}

#[derive(Debug)]
struct Overlay;

impl BoxBehavior for Overlay {
    fn type_tag(&self) -> &str {
        "overlay"
    }

    fn is_persistent(&self) -> bool {
        false
    }
}

fn write_document(dir: &TempDir, document: &Document) {
    let text = document_to_string(document).expect("encode");
    fs::write(dir.path().join("doc.field2"), text).expect("write document");
}

fn record(id: &str, type_tag: &str, data_file: &str) -> Record {
    Record {
        id: id.into(),
        type_tag: type_tag.into(),
        text_files: Default::default(),
        data_file: data_file.into(),
        parents: BTreeSet::new(),
        children: BTreeSet::new(),
    }
}

// =============================================================================
// ROUND TRIP
// =============================================================================

#[test]
fn round_trip_preserves_identities_and_edges() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut engine = engine(&dir);

    let mut graph = BoxGraph::new();
    let (root, anchors) = anchored_root(&mut graph);
    let a = named_child(&mut graph, root, "a");
    let b = named_child(&mut graph, a, "b");
    let c = named_child(&mut graph, a, "c");
    graph.connect(b, c).expect("diamond");
    graph.node_mut(b).expect("b").set("code", "draw()");

    let saved = engine.save(&mut graph, root, &anchors, DOC).expect("save");
    assert_eq!(saved.document.records.len(), 3);
    assert!(saved.diagnostics.is_empty());

    let expected: BTreeSet<String> = [a, b, c].iter().map(|&id| identity(&graph, id)).collect();

    let mut loaded_graph = BoxGraph::new();
    let (new_root, new_anchors) = anchored_root(&mut loaded_graph);
    let outcome = engine
        .load(DOC, &mut loaded_graph, &new_anchors)
        .expect("load");

    let actual: BTreeSet<String> = outcome.by_identity.keys().cloned().collect();
    assert_eq!(actual, expected);
    assert_eq!(outcome.stage, LoadStage::PostLoadDispatched);
    assert!(!outcome.was_new);
    assert!(outcome.diagnostics.is_empty());

    let loaded_a = outcome.by_identity[&identity(&graph, a)];
    let loaded_b = outcome.by_identity[&identity(&graph, b)];
    let loaded_c = outcome.by_identity[&identity(&graph, c)];

    let root_children = loaded_graph.node(new_root).expect("root").children();
    assert_eq!(root_children, &BTreeSet::from([loaded_a]));
    assert_eq!(
        loaded_graph.node(loaded_a).expect("a").children(),
        &BTreeSet::from([loaded_b, loaded_c])
    );
    assert_eq!(
        loaded_graph.node(loaded_c).expect("c").parents(),
        &BTreeSet::from([loaded_a, loaded_b])
    );
    assert_eq!(
        loaded_graph.node(loaded_b).expect("b").text("code"),
        Some("draw()")
    );
    assert_eq!(loaded_graph.node(loaded_c).expect("c").name(), Some("c"));
}

#[test]
fn resave_after_load_keeps_paths() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut engine = engine(&dir);

    let mut graph = BoxGraph::new();
    let (root, anchors) = anchored_root(&mut graph);
    let a = named_child(&mut graph, root, "a");
    graph.node_mut(a).expect("a").set("code", "one()");
    let first = engine.save(&mut graph, root, &anchors, DOC).expect("save");

    let mut reloaded = BoxGraph::new();
    let (new_root, new_anchors) = anchored_root(&mut reloaded);
    engine.load(DOC, &mut reloaded, &new_anchors).expect("load");
    let second = engine
        .save(&mut reloaded, new_root, &new_anchors, DOC)
        .expect("resave");

    assert_eq!(first.document.records, second.document.records);
}

// =============================================================================
// FILENAMES
// =============================================================================

#[test]
fn saving_twice_does_not_churn_paths() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut engine = engine(&dir);

    let mut graph = BoxGraph::new();
    let (root, anchors) = anchored_root(&mut graph);
    let a = named_child(&mut graph, root, "a");
    graph.node_mut(a).expect("a").set("code", "one()");

    let first = engine.save(&mut graph, root, &anchors, DOC).expect("save");
    graph.node_mut(a).expect("a").set("code", "two()");
    let second = engine.save(&mut graph, root, &anchors, DOC).expect("save");

    assert_eq!(
        first.document.records[0].text_files,
        second.document.records[0].text_files
    );
    assert_eq!(
        first.document.records[0].data_file,
        second.document.records[0].data_file
    );
    assert_eq!(
        fs::read_to_string(dir.path().join("a_code.js")).expect("sidecar"),
        "two()"
    );
}

#[test]
fn existing_unrelated_file_is_never_overwritten() {
    let dir = tempfile::tempdir().expect("tempdir");
    fs::write(dir.path().join("foo_code.js"), "unrelated").expect("write");
    let mut engine = engine(&dir);

    let mut graph = BoxGraph::new();
    let (root, anchors) = anchored_root(&mut graph);
    let foo = named_child(&mut graph, root, "foo");
    graph.node_mut(foo).expect("foo").set("code", "mine()");

    let saved = engine.save(&mut graph, root, &anchors, DOC).expect("save");

    let record = &saved.document.records[0];
    assert_eq!(record.text_files["code"], "{{workspace}}foo00000_code.js");
    assert_eq!(record.data_file, "{{workspace}}foo00000_code.js.box");
    assert_eq!(
        fs::read_to_string(dir.path().join("foo_code.js")).expect("unrelated"),
        "unrelated"
    );
    assert_eq!(
        fs::read_to_string(dir.path().join("foo00000_code.js")).expect("mine"),
        "mine()"
    );
}

#[test]
fn same_named_boxes_get_distinct_paths() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut engine = engine(&dir);

    let mut graph = BoxGraph::new();
    let (root, anchors) = anchored_root(&mut graph);
    for text in ["first()", "second()"] {
        let id = named_child(&mut graph, root, "twin");
        graph.node_mut(id).expect("twin").set("code", text);
    }

    let saved = engine.save(&mut graph, root, &anchors, DOC).expect("save");

    let paths: BTreeSet<&str> = saved
        .document
        .records
        .iter()
        .map(|r| r.text_files["code"].as_str())
        .collect();
    assert_eq!(paths.len(), 2);
}

#[test]
fn code_scenario_writes_named_sidecar_and_reloads_exactly() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut engine = engine(&dir);

    let mut graph = BoxGraph::new();
    let (root, anchors) = anchored_root(&mut graph);
    let foo = named_child(&mut graph, root, "foo");
    graph.node_mut(foo).expect("foo").set("code", "print(1)");

    let saved = engine.save(&mut graph, root, &anchors, DOC).expect("save");
    let path = &saved.document.records[0].text_files["code"];
    assert!(path.starts_with("{{workspace}}"));
    assert!(path.ends_with("_code.js"));

    let mut loaded = BoxGraph::new();
    let (_, new_anchors) = anchored_root(&mut loaded);
    let outcome = engine.load(DOC, &mut loaded, &new_anchors).expect("load");
    let id = outcome.by_identity[&identity(&graph, foo)];
    assert_eq!(loaded.node(id).expect("foo").text("code"), Some("print(1)"));
}

// =============================================================================
// NON-PERSISTENCE
// =============================================================================

#[test]
fn non_persistent_boxes_never_reach_the_document() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut engine = engine(&dir);

    let mut graph = BoxGraph::new();
    let (root, anchors) = anchored_root(&mut graph);
    let kept = named_child(&mut graph, root, "kept");
    let flagged = named_child(&mut graph, kept, "scratch");
    graph
        .node_mut(flagged)
        .expect("flagged")
        .set("dontSave", true);
    let overlay = graph.insert(Box::new(Overlay));
    graph.connect(kept, overlay).expect("connect");

    let saved = engine.save(&mut graph, root, &anchors, DOC).expect("save");

    assert_eq!(saved.document.records.len(), 1);
    let record = &saved.document.records[0];
    assert_eq!(record.id, identity(&graph, kept));
    assert!(record.children.is_empty());
    assert!(graph.node(flagged).expect("flagged").identity().is_none());
    assert!(graph.node(overlay).expect("overlay").identity().is_none());
}

// =============================================================================
// RESILIENCE
// =============================================================================

#[test]
fn missing_sidecar_degrades_one_property() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut engine = engine(&dir);

    let mut graph = BoxGraph::new();
    let (root, anchors) = anchored_root(&mut graph);
    let lost = named_child(&mut graph, root, "lost");
    let kept = named_child(&mut graph, root, "kept");
    graph.node_mut(lost).expect("lost").set("code", "gone()");
    graph.node_mut(kept).expect("kept").set("code", "here()");
    engine.save(&mut graph, root, &anchors, DOC).expect("save");

    fs::remove_file(dir.path().join("lost_code.js")).expect("remove");

    let mut loaded = BoxGraph::new();
    let (_, new_anchors) = anchored_root(&mut loaded);
    let outcome = engine.load(DOC, &mut loaded, &new_anchors).expect("load");

    let lost_id = outcome.by_identity[&identity(&graph, lost)];
    let kept_id = outcome.by_identity[&identity(&graph, kept)];
    assert_eq!(loaded.node(lost_id).expect("lost").text("code"), None);
    assert_eq!(loaded.node(lost_id).expect("lost").name(), Some("lost"));
    assert_eq!(loaded.node(kept_id).expect("kept").text("code"), Some("here()"));
    assert_eq!(outcome.diagnostics.len(), 1);
    assert!(matches!(
        &outcome.diagnostics[0],
        Diagnostic::MissingSidecar { property, .. } if property == "code"
    ));
}

#[test]
fn dangling_parent_reference_skips_only_that_edge() {
    let dir = tempfile::tempdir().expect("tempdir");
    fs::write(dir.path().join("a.box"), r#"{"name":"a"}"#).expect("write");

    let mut a = record("a-id", "default", "{{workspace}}a.box");
    a.parents.insert("root".into());
    a.parents.insert("ghost".into());
    let mut document = Document::new();
    document.records.push(a);
    write_document(&dir, &document);

    let mut engine = engine(&dir);
    let mut graph = BoxGraph::new();
    let (root, anchors) = anchored_root(&mut graph);
    let outcome = engine.load(DOC, &mut graph, &anchors).expect("load");

    let loaded = outcome.by_identity["a-id"];
    assert_eq!(
        graph.node(loaded).expect("a").parents(),
        &BTreeSet::from([root])
    );
    assert_eq!(
        outcome.diagnostics,
        vec![Diagnostic::LostReference {
            id: "a-id".into(),
            reference: "ghost".into(),
            side: EdgeSide::Parent,
        }]
    );
    assert_eq!(outcome.stage, LoadStage::PostLoadDispatched);
}

#[test]
fn unknown_type_loads_as_default_with_properties_and_edges() {
    let dir = tempfile::tempdir().expect("tempdir");
    fs::write(dir.path().join("a.box"), r#"{"name":"A"}"#).expect("write");
    fs::write(dir.path().join("b.box"), r#"{"name":"B","color":"red"}"#).expect("write");

    let mut a = record("a-id", "default", "{{workspace}}a.box");
    a.children.insert("b-id".into());
    let mut b = record("b-id", "unknown-tag", "{{workspace}}b.box");
    b.parents.insert("a-id".into());
    let mut document = Document::new();
    document.records.extend([a, b]);
    write_document(&dir, &document);

    let mut engine = engine(&dir);
    engine.register_type("default", || Ok(Box::new(Hooked)));

    let mut graph = BoxGraph::new();
    let (_, anchors) = anchored_root(&mut graph);
    let outcome = engine.load(DOC, &mut graph, &anchors).expect("load");

    let a_id = outcome.by_identity["a-id"];
    let b_id = outcome.by_identity["b-id"];
    let b_node = graph.node(b_id).expect("b");
    assert!(b_node.is_fallback());
    assert_eq!(b_node.type_tag(), "unknown-tag");
    assert_eq!(b_node.text("color"), Some("red"));
    assert!(graph.node(a_id).expect("a").children().contains(&b_id));
    assert!(b_node.parents().contains(&a_id));

    assert_eq!(outcome.hooks_run, 2);
    for id in [a_id, b_id] {
        assert_eq!(
            graph.node(id).expect("box").get("loaded"),
            Some(&PropertyValue::Bool(true))
        );
    }
    assert!(matches!(
        outcome.diagnostics.as_slice(),
        [Diagnostic::UnresolvedType { tag, .. }] if tag == "unknown-tag"
    ));
}

#[test]
fn fallback_box_keeps_its_tag_on_resave() {
    let dir = tempfile::tempdir().expect("tempdir");
    fs::write(dir.path().join("b.box"), r#"{"name":"B"}"#).expect("write");
    let mut b = record("b-id", "timeline", "{{workspace}}b.box");
    b.parents.insert("root".into());
    let mut document = Document::new();
    document.records.push(b);
    write_document(&dir, &document);

    let mut engine = engine(&dir);
    let mut graph = BoxGraph::new();
    let (root, anchors) = anchored_root(&mut graph);
    engine.load(DOC, &mut graph, &anchors).expect("load");
    let resaved = engine.save(&mut graph, root, &anchors, DOC).expect("resave");

    assert_eq!(resaved.document.records[0].type_tag, "timeline");
    assert_eq!(resaved.document.records[0].id, "b-id");
}

#[test]
fn corrupt_document_is_an_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    fs::write(dir.path().join("doc.field2"), "{ not json").expect("write");
    let mut engine = engine(&dir);

    let mut graph = BoxGraph::new();
    let result = engine.load(DOC, &mut graph, &Anchors::new());

    assert!(matches!(result, Err(FieldboxError::DeserializationError(_))));
    assert!(graph.is_empty());
}

#[test]
fn loaded_catalog_is_merged_into_engine() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut writer = engine(&dir);
    writer.register_filespec("shader", ".glsl", "glsl");
    writer.register_persisted_property("color");

    let mut graph = BoxGraph::new();
    let (root, anchors) = anchored_root(&mut graph);
    named_child(&mut graph, root, "a");
    writer.save(&mut graph, root, &anchors, DOC).expect("save");

    let mut reader = engine(&dir);
    assert!(reader.catalog().filespec("shader").is_none());
    let mut loaded = BoxGraph::new();
    let (_, new_anchors) = anchored_root(&mut loaded);
    reader.load(DOC, &mut loaded, &new_anchors).expect("load");

    assert!(reader.catalog().filespec("shader").is_some());
    assert!(reader.catalog().is_persisted("color"));
}
