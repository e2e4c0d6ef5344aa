//! Property-based tests for the round-trip and identity guarantees.
//!
//! Scalars and strings are checked across generated inputs; whole graphs are
//! generated as random edge lists, so cycles and sharing occur naturally.

use proptest::prelude::*;
use refwire::{
    schema, Catalog, Decimal, Dictionary, Engine, EngineOptions, ObjectGraph, ObjectId, Shape,
    Value,
};
use std::collections::HashMap;
use std::sync::Arc;

fn engine() -> (Engine, Arc<refwire::Schema>) {
    let mut catalog = Catalog::new();
    let node = catalog
        .register(schema!("prop.Node" => {
            label: Shape::String,
            left: Shape::named("prop.Node"),
            right: Shape::named("prop.Node"),
            extra: Shape::list(Shape::named("prop.Node")),
        }))
        .unwrap();
    (Engine::new(catalog), node)
}

fn roundtrip(value: &Value) -> bool {
    let (engine, _) = engine();
    let graph = ObjectGraph::new();
    match engine.serialize_value(&graph, value) {
        Ok(text) => match engine.deserialize(&text) {
            Ok(decoded) => graph.structurally_equal(value, &decoded.graph, &decoded.root),
            Err(e) => {
                eprintln!("Deserialize failed: {}", e);
                eprintln!("Serialized was: {}", text);
                false
            }
        },
        Err(e) => {
            eprintln!("Serialize failed: {}", e);
            false
        }
    }
}

/// Edges per node: left, right and one list entry, each optional.
type Edges = Vec<(Option<usize>, Option<usize>, Option<usize>)>;

fn build(node: &Arc<refwire::Schema>, labels: &[String], edges: &Edges) -> (ObjectGraph, ObjectId) {
    let mut graph = ObjectGraph::new();
    let ids: Vec<_> = labels.iter().map(|_| graph.alloc(node)).collect();
    let n = ids.len();
    for (i, (label, (left, right, extra))) in labels.iter().zip(edges).enumerate() {
        let id = ids[i];
        let link = |target: &Option<usize>| target.map_or(Value::Null, |t| Value::Object(ids[t % n]));
        graph.set(id, "label", Value::from(label.as_str())).unwrap();
        graph.set(id, "left", link(left)).unwrap();
        graph.set(id, "right", link(right)).unwrap();
        if extra.is_some() {
            let list = refwire::Sequence::list(Shape::named("prop.Node"), vec![link(extra)]);
            graph.set(id, "extra", Value::Seq(list)).unwrap();
        }
    }
    (graph, ids[0])
}

/// Walks both graphs in lockstep and checks that identity maps one to one.
fn same_identity(a: &ObjectGraph, ra: ObjectId, b: &ObjectGraph, rb: ObjectId) -> bool {
    let mut forward: HashMap<ObjectId, ObjectId> = HashMap::new();
    let mut backward: HashMap<ObjectId, ObjectId> = HashMap::new();
    let mut stack = vec![(ra, rb)];
    while let Some((x, y)) = stack.pop() {
        match (forward.get(&x), backward.get(&y)) {
            (Some(&fy), Some(&bx)) if fy == y && bx == x => continue,
            (None, None) => {
                forward.insert(x, y);
                backward.insert(y, x);
            }
            _ => return false,
        }
        for member in ["left", "right"] {
            match (a.get(x, member), b.get(y, member)) {
                (Some(Value::Object(cx)), Some(Value::Object(cy))) => stack.push((*cx, *cy)),
                (Some(Value::Null), Some(Value::Null)) => {}
                _ => return false,
            }
        }
        if let (Some(Value::Seq(sx)), Some(Value::Seq(sy))) = (a.get(x, "extra"), b.get(y, "extra")) {
            for (cx, cy) in sx.items.iter().zip(&sy.items) {
                if let (Value::Object(cx), Value::Object(cy)) = (cx, cy) {
                    stack.push((*cx, *cy));
                }
            }
        }
    }
    true
}

fn graph_strategy() -> impl Strategy<Value = (Vec<String>, Edges)> {
    (1usize..8).prop_flat_map(|n| {
        let edge = proptest::option::of(0..n);
        (
            prop::collection::vec(".{0,6}", n),
            prop::collection::vec((edge.clone(), edge.clone(), edge), n),
        )
    })
}

proptest! {
    #[test]
    fn prop_string(s in any::<String>()) {
        prop_assert!(roundtrip(&Value::String(s)));
    }

    #[test]
    fn prop_structural_strings(s in "[~\\[\\]<>|&{}()=0-9a]{0,24}") {
        prop_assert!(roundtrip(&Value::String(s)));
    }

    #[test]
    fn prop_i64(n in any::<i64>()) {
        prop_assert!(roundtrip(&Value::I64(n)));
    }

    #[test]
    fn prop_u64(n in any::<u64>()) {
        prop_assert!(roundtrip(&Value::U64(n)));
    }

    #[test]
    fn prop_f64(f in any::<f64>()) {
        prop_assert!(roundtrip(&Value::F64(f)));
    }

    #[test]
    fn prop_f32(f in any::<f32>()) {
        prop_assert!(roundtrip(&Value::F32(f)));
    }

    #[test]
    fn prop_decimal(mantissa in any::<i64>(), scale in 0u32..12) {
        prop_assert!(roundtrip(&Value::Decimal(Decimal::new(mantissa, scale))));
    }

    #[test]
    fn prop_dictionary_of_strings(entries in prop::collection::vec((any::<String>(), any::<i32>()), 0..8)) {
        let mut dict = Dictionary::new(Shape::String, Shape::I32);
        for (k, v) in entries {
            dict.insert(Value::String(k), Value::I32(v));
        }
        prop_assert!(roundtrip(&Value::Dict(dict)));
    }

    #[test]
    fn prop_graph_identity_preserved((labels, edges) in graph_strategy()) {
        let (engine, node) = engine();
        let (graph, root) = build(&node, &labels, &edges);
        let text = engine.serialize(&graph, root).unwrap();
        let decoded = engine.deserialize(&text).unwrap();
        let decoded_root = decoded.root_object().unwrap();

        prop_assert!(graph.structurally_equal(&Value::Object(root), &decoded.graph, &decoded.root));
        prop_assert!(same_identity(&graph, root, &decoded.graph, decoded_root), "text {}", text);
    }

    #[test]
    fn prop_graph_copy_is_structurally_equal((labels, edges) in graph_strategy()) {
        let (engine, node) = engine();
        let engine = Engine::with_options(engine.catalog().clone(), EngineOptions::copy());
        let (graph, root) = build(&node, &labels, &edges);
        let text = engine.serialize(&graph, root).unwrap();
        let decoded = engine.deserialize(&text).unwrap();

        prop_assert!(graph.structurally_equal(&Value::Object(root), &decoded.graph, &decoded.root));
    }
}
