//! Cycles, shared references and copy mode.
//!
//! Run with: cargo run --example cycles

use refwire::{schema, Catalog, Engine, ObjectGraph, Shape, Value};
use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    let mut catalog = Catalog::new();
    let employee = catalog.register(schema!("demo.Employee" => {
        name: Shape::String,
        manager: Shape::named("demo.Employee"),
        mentor: Shape::named("demo.Employee"),
    }))?;

    let mut graph = ObjectGraph::new();
    let boss = graph.alloc(&employee);
    let dev = graph.alloc(&employee);
    graph.set(boss, "name", Value::from("Grace"))?;
    graph.set(dev, "name", Value::from("Linus"))?;
    // mentoring runs both ways, and the developer's manager is also the mentor
    graph.set(boss, "mentor", Value::Object(dev))?;
    graph.set(dev, "manager", Value::Object(boss))?;
    graph.set(dev, "mentor", Value::Object(boss))?;

    let engine = Engine::new(catalog);

    let shared = engine.serialize(&graph, dev)?;
    println!("Aliases preserved:\n{}\n", shared);
    let (decoded, root) = engine.deserialize_as(&shared, "demo.Employee")?;
    let manager = decoded.get(root, "manager").cloned();
    assert_eq!(manager.as_ref(), decoded.get(root, "mentor"));
    println!("✓ manager and mentor decode as one instance");

    let copied = engine.serialize_with(&graph, dev, false)?;
    println!("Copy mode:\n{}\n", copied);
    let (decoded, root) = engine.deserialize_as(&copied, "demo.Employee")?;
    assert_ne!(decoded.get(root, "manager"), decoded.get(root, "mentor"));
    println!("✓ manager and mentor decode as independent copies");

    let copy = decoded
        .get(root, "manager")
        .and_then(Value::as_object)
        .ok_or("manager missing")?;
    let back = decoded.get(copy, "mentor").and_then(Value::as_object);
    println!("  the cycle through the root stays finite: {:?}", back);

    Ok(())
}
