use refwire::{
    schema, Catalog, Engine, EngineOptions, EnumSchema, Error, ObjectGraph, Shape, Value,
};
use std::sync::Arc;

fn catalog() -> (Catalog, Arc<refwire::Schema>) {
    let mut catalog = Catalog::new();
    catalog
        .register_enum(EnumSchema::new("t.Color", ["Red", "Green"]))
        .unwrap();
    catalog
        .register(schema!("t.Counter" => { n: Shape::I32 }))
        .unwrap();
    let node = catalog
        .register(schema!("t.N" => {
            a: Shape::named("t.N"),
            b: Shape::named("t.N"),
        }))
        .unwrap();
    (catalog, node)
}

fn engine() -> Engine {
    Engine::new(catalog().0)
}

#[test]
fn test_object_with_type_table() {
    let mut catalog = Catalog::new();
    let point = catalog
        .register(schema!("demo.Point" => { x: Shape::I32, y: Shape::I32 }))
        .unwrap();
    let mut graph = ObjectGraph::new();
    let p = graph.alloc(&point);
    graph.set(p, "x", Value::I32(3)).unwrap();
    graph.set(p, "y", Value::I32(-2)).unwrap();

    let engine = Engine::new(catalog);
    assert_eq!(
        engine.serialize(&graph, p).unwrap(),
        "-t[14]demo.Point&i32(0)<[x]=(1)3><[y]=(1)-2>"
    );
}

#[test]
fn test_object_without_type_table() {
    let mut catalog = Catalog::new();
    let point = catalog
        .register(schema!("demo.Point" => { x: Shape::I32, y: Shape::I32 }))
        .unwrap();
    let mut graph = ObjectGraph::new();
    let p = graph.alloc(&point);
    graph.set(p, "x", Value::I32(3)).unwrap();

    let engine = Engine::with_options(catalog, EngineOptions::new().with_type_table(false));
    let text = engine.serialize(&graph, p).unwrap();
    assert_eq!(text, "--(demo.Point)<[x]=(i32)3><[y]=(i32)0>");

    let (decoded, root) = engine.deserialize_as(&text, "demo.Point").unwrap();
    assert_eq!(decoded.get(root, "x"), Some(&Value::I32(3)));
}

#[test]
fn test_reference_blocks_last_discovered_first() {
    let (catalog, node) = catalog();
    let mut graph = ObjectGraph::new();
    let root = graph.alloc(&node);
    let a = graph.alloc(&node);
    let b = graph.alloc(&node);
    graph.set(root, "a", Value::Object(a)).unwrap();
    graph.set(root, "b", Value::Object(a)).unwrap();
    graph.set(a, "a", Value::Object(b)).unwrap();
    graph.set(a, "b", Value::Object(b)).unwrap();

    let engine = Engine::new(catalog);
    assert_eq!(
        engine.serialize(&graph, root).unwrap(),
        "rt[3]t.N[58]{15&2&(0)<[a]=><[b]=>}{29&1&(0)<[a]=(0)ref2><[b]=(0)ref2>}(0)<[a]=(0)ref1><[b]=(0)ref1>"
    );
}

#[test]
fn test_root_back_reference_needs_no_block() {
    let (catalog, node) = catalog();
    let mut graph = ObjectGraph::new();
    let root = graph.alloc(&node);
    graph.set(root, "b", Value::Object(root)).unwrap();

    let engine = Engine::new(catalog);
    assert_eq!(
        engine.serialize(&graph, root).unwrap(),
        "-t[3]t.N(0)<[a]=><[b]=(0)ref0>"
    );
}

#[test]
fn test_copy_mode_root_cycle_text() {
    let (catalog, node) = catalog();
    let mut graph = ObjectGraph::new();
    let root = graph.alloc(&node);
    graph.set(root, "a", Value::Object(root)).unwrap();

    let engine = Engine::new(catalog);
    assert_eq!(
        engine.serialize_with(&graph, root, false).unwrap(),
        "rt[3]t.N[29]{22&1&(0)<[a]=(0)ref1><[b]=>}(0)<[a]=(0)ref1><[b]=>"
    );
}

#[test]
fn test_string_length_counts_characters() {
    let engine = engine();
    let text = engine
        .serialize_value(&ObjectGraph::new(), &Value::from("日本>"))
        .unwrap();
    assert_eq!(text, "--~[3]日本>");
    assert_eq!(engine.deserialize(&text).unwrap().root, Value::from("日本>"));
}

#[test]
fn test_literal_tokens_resolve_alongside_the_table() {
    let engine = engine();
    let decoded = engine.deserialize("-t[3]t.N(i32)5").unwrap();
    assert_eq!(decoded.root, Value::I32(5));
}

#[test]
fn test_malformed_headers() {
    let engine = engine();
    for text in ["", "-", "x-", "-x", "tr", "-t", "-t[", "-t[5]ab", "r-[abc]"] {
        assert!(
            matches!(engine.deserialize(text), Err(Error::MalformedHeader(_))),
            "{:?}",
            text
        );
    }
}

#[test]
fn test_unresolved_reference() {
    let engine = engine();
    assert_eq!(
        engine.deserialize("-t[3]t.N(0)<[a]=(0)ref9>").unwrap_err(),
        Error::UnresolvedReference(9)
    );
}

#[test]
fn test_unknown_type() {
    let engine = engine();
    assert_eq!(
        engine.deserialize("-t[9]t.Missing(0)").unwrap_err(),
        Error::type_resolution("t.Missing")
    );
    assert_eq!(
        engine.deserialize("--(list{t.Gone})").unwrap_err(),
        Error::type_resolution("t.Gone")
    );
}

#[test]
fn test_value_of_wrong_type_for_member() {
    let engine = engine();
    assert!(matches!(
        engine.deserialize("-t[7]t.N&i32(0)<[a]=(1)5>"),
        Err(Error::TypeMismatch { .. })
    ));
    assert!(matches!(
        engine.deserialize("-t[3]t.N(0)<[a]=~[1]x>"),
        Err(Error::TypeMismatch { .. })
    ));
}

#[test]
fn test_missing_payload_for_value_member() {
    let engine = engine();
    assert!(matches!(
        engine.deserialize("-t[9]t.Counter(0)<[n]=>"),
        Err(Error::TypeMismatch { .. })
    ));
}

#[test]
fn test_bad_scalar_and_enum_text() {
    let engine = engine();
    assert!(matches!(
        engine.deserialize("-t[13]t.Counter&i32(0)<[n]=(1)12x>"),
        Err(Error::TypeMismatch { .. })
    ));
    assert_eq!(
        engine.deserialize("-t[7]t.Color(0)Purple").unwrap_err(),
        Error::type_mismatch("t.Color", "Purple")
    );
    assert_eq!(
        engine.deserialize("-t[7]t.Color(0)Green").unwrap().root,
        Value::Enum(refwire::EnumValue::new("t.Color", "Green"))
    );
}

#[test]
fn test_syntax_errors() {
    let engine = engine();
    for text in [
        "-t[3]t.N(0)<[a]=",
        "-t[3]t.N(0)<[a]",
        "-t[3]t.N(0)<a]=>",
        "-t[3]t.N(0)<[zz]=>",
        "-t[13]list{i32}&i32(0)<[1]=(1)5>",
        "--~[2]abc",
        "rt[3]t.N[5]{9&1&(0)}(0)",
    ] {
        assert!(
            matches!(engine.deserialize(text), Err(Error::Syntax { .. })),
            "{:?}",
            text
        );
    }
}

#[test]
fn test_reference_block_must_hold_an_object() {
    let engine = engine();
    assert!(matches!(
        engine.deserialize("r-[13]{6&1&(i32)3}(t.N)<[a]=(t.N)ref1>"),
        Err(Error::UnsupportedShape(_))
    ));
}

#[test]
fn test_nothing_partial_on_failure() {
    let engine = engine();
    // the root and block parse, the last member does not
    let text = "rt[3]t.N[15]{9&1&(0)<[a]=>}(0)<[a]=(0)ref1><[b]=(0)ref4>";
    assert_eq!(engine.deserialize(text).unwrap_err(), Error::UnresolvedReference(4));
}

#[test]
fn test_list_root_hoists_shared_elements() {
    let (catalog, node) = catalog();
    let mut graph = ObjectGraph::new();
    let b = graph.alloc(&node);
    let list = Value::Seq(refwire::Sequence::list(
        Shape::named("t.N"),
        vec![Value::Object(b), Value::Object(b)],
    ));

    let engine = Engine::new(catalog);
    let text = engine.serialize_value(&graph, &list).unwrap();
    assert_eq!(
        text,
        "rt[13]list{t.N}&t.N[22]{15&1&(1)<[a]=><[b]=>}(0)<[0]=(1)ref1><[1]=(1)ref1>"
    );

    let decoded = engine.deserialize(&text).unwrap();
    let items = decoded.root.as_seq().map(|s| s.items.clone()).unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0], items[1]);
    assert_eq!(decoded.graph.len(), 1);
}

#[test]
fn test_list_root_with_cyclic_element() {
    let (catalog, node) = catalog();
    let mut graph = ObjectGraph::new();
    let a = graph.alloc(&node);
    graph.set(a, "a", Value::Object(a)).unwrap();
    let list = Value::Seq(refwire::Sequence::list(Shape::named("t.N"), vec![Value::Object(a)]));

    let engine = Engine::new(catalog);
    let text = engine.serialize_value(&graph, &list).unwrap();
    assert_eq!(
        text,
        "rt[13]list{t.N}&t.N[29]{22&1&(1)<[a]=(1)ref1><[b]=>}(0)<[0]=(1)ref1>"
    );

    let decoded = engine.deserialize(&text).unwrap();
    let item = decoded.root.as_seq().and_then(|s| s.items[0].as_object()).unwrap();
    assert_eq!(decoded.graph.get(item, "a"), Some(&Value::Object(item)));
}
