//! Encode and decode a small object graph.
//!
//! Run with: cargo run --example simple

use refwire::{schema, Catalog, Engine, ObjectGraph, Sequence, Shape, Value};
use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    let mut catalog = Catalog::new();
    let user = catalog.register(schema!("demo.User" => {
        id: Shape::U32,
        name: Shape::String,
        email: Shape::String,
        roles: Shape::list(Shape::String),
    }))?;

    let mut graph = ObjectGraph::new();
    let alice = graph.alloc(&user);
    graph.set(alice, "id", Value::U32(42))?;
    graph.set(alice, "name", Value::from("Alice Johnson"))?;
    graph.set(alice, "email", Value::from("alice@example.com"))?;
    graph.set(
        alice,
        "roles",
        Value::Seq(Sequence::list(
            Shape::String,
            vec![Value::from("admin"), Value::from("ops")],
        )),
    )?;

    let engine = Engine::new(catalog);
    let text = engine.serialize(&graph, alice)?;
    println!("Wire text:\n{}\n", text);

    let decoded = engine.deserialize(&text)?;
    assert!(graph.structurally_equal(&Value::Object(alice), &decoded.graph, &decoded.root));
    println!("✓ Round-trip successful");

    Ok(())
}
