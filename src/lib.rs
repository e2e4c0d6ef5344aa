//! # refwire
//!
//! Reference-aware serialization of object graphs to a compact text format.
//!
//! ## What does it do?
//!
//! Most serializers see a tree. An object graph reached twice is written
//! twice, and a cycle never terminates. `refwire` writes every object once,
//! refers to it by id wherever it recurs, and on decode rebuilds the graph
//! with the same sharing: two members that pointed at one object point at
//! one object again.
//!
//! ## Key Features
//!
//! - **Cycle Safe**: self references and longer cycles encode and decode
//! - **Alias Preserving**: shared objects stay shared, or are copied out on request
//! - **No Escaping**: strings are length-prefixed, any content is safe
//! - **Compact Types**: full type names are interned into a per-document table
//! - **Typed Errors**: every failure is a [`Error`] variant; nothing panics on bad input
//! - **No Unsafe Code**: written entirely in safe Rust
//!
//! ## Quick Start
//!
//! Types are described by a [`Schema`] and registered in a [`Catalog`]; objects
//! live in an [`ObjectGraph`] arena and refer to each other by [`ObjectId`].
//!
//! ```rust
//! use refwire::{schema, Catalog, Engine, ObjectGraph, Shape, Value};
//!
//! let mut catalog = Catalog::new();
//! let person = catalog
//!     .register(schema!("demo.Person" => {
//!         name: Shape::String,
//!         best_friend: Shape::named("demo.Person"),
//!     }))
//!     .unwrap();
//!
//! let mut graph = ObjectGraph::new();
//! let alice = graph.alloc(&person);
//! let bob = graph.alloc(&person);
//! graph.set(alice, "name", Value::from("Alice")).unwrap();
//! graph.set(bob, "name", Value::from("Bob")).unwrap();
//! graph.set(alice, "best_friend", Value::Object(bob)).unwrap();
//! graph.set(bob, "best_friend", Value::Object(alice)).unwrap();
//!
//! let engine = Engine::new(catalog);
//! let text = engine.serialize(&graph, alice).unwrap();
//!
//! let (decoded, root) = engine.deserialize_as(&text, "demo.Person").unwrap();
//! let friend = decoded.get(root, "best_friend").and_then(Value::as_object).unwrap();
//! assert_eq!(decoded.get(friend, "best_friend"), Some(&Value::Object(root)));
//! ```
//!
//! ### Copy Mode
//!
//! With aliases off, shared objects are duplicated and only cycles keep
//! their identity:
//!
//! ```rust
//! use refwire::{schema, Catalog, Engine, ObjectGraph, Shape, Value};
//!
//! let mut catalog = Catalog::new();
//! let pair = catalog
//!     .register(schema!("demo.Pair" => {
//!         left: Shape::named("demo.Pair"),
//!         right: Shape::named("demo.Pair"),
//!     }))
//!     .unwrap();
//!
//! let mut graph = ObjectGraph::new();
//! let root = graph.alloc(&pair);
//! let shared = graph.alloc(&pair);
//! graph.set(root, "left", Value::Object(shared)).unwrap();
//! graph.set(root, "right", Value::Object(shared)).unwrap();
//!
//! let engine = Engine::new(catalog);
//! let text = engine.serialize_with(&graph, root, false).unwrap();
//! let (decoded, root) = engine.deserialize_as(&text, "demo.Pair").unwrap();
//! assert_ne!(decoded.get(root, "left"), decoded.get(root, "right"));
//! ```
//!
//! ## Performance Characteristics
//!
//! - **Serialization**: one tracking pass and one write pass, O(n) in members
//! - **Deserialization**: O(n); each string is skipped by length, never scanned
//! - **Memory**: the decoded graph is a single arena allocation per object
//!
//! ## Safety Guarantees
//!
//! - No `unsafe` code blocks
//! - All slicing is bounds-checked against length prefixes
//! - Proper error propagation with `Result` types
//! - No panics in public API on malformed input
//!
//! ## Wire format
//!
//! See the [`format`] module for the wire format.
//!
//! ## Demos
//!
//! See the `demos/` directory:
//!
//! - **`simple.rs`** - encode and decode a small graph
//! - **`cycles.rs`** - cycles, shared references and copy mode
//!
//! Run any demo with: `cargo run --example <name>`

pub mod de;
pub mod engine;
pub mod error;
pub mod format;
pub mod graph;
pub mod macros;
pub mod map;
pub mod options;
pub mod registry;
mod scan;
pub mod schema;
pub mod ser;
pub mod tracker;
pub mod value;

pub use de::{Decoded, Deserializer};
pub use engine::Engine;
pub use error::{Error, Result};
pub use graph::{Node, ObjectGraph, ObjectId};
pub use map::FieldMap;
pub use options::EngineOptions;
pub use registry::TypeRegistry;
pub use schema::{
    validate_type_name, Access, Catalog, CatalogDescriptor, EnumSchema, Member, Schema, SeqKind,
    Shape,
};
pub use ser::Serializer;
pub use tracker::{ReferenceEntry, ReferenceTracker};
pub use value::{Decimal, Dictionary, EnumValue, Guid, Sequence, Value};

use std::io;

/// Serializes the graph reachable from `root` with default options.
///
/// # Examples
///
/// ```rust
/// use refwire::{schema, to_string, ObjectGraph, Shape};
/// use std::sync::Arc;
///
/// let point = Arc::new(schema!("demo.Point" => { x: Shape::I32, y: Shape::I32 }));
/// let mut graph = ObjectGraph::new();
/// let p = graph.alloc(&point);
///
/// let text = to_string(&graph, p).unwrap();
/// assert!(text.starts_with("-t"));
/// ```
///
/// # Errors
///
/// Returns an error if the graph holds a value its schema does not admit.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn to_string(graph: &ObjectGraph, root: ObjectId) -> Result<String> {
    to_string_with_options(graph, &Value::Object(root), EngineOptions::default())
}

/// Serializes any value with custom options.
///
/// # Examples
///
/// ```rust
/// use refwire::{to_string_with_options, EngineOptions, ObjectGraph, Value};
///
/// let options = EngineOptions::new().with_type_table(false);
/// let text = to_string_with_options(&ObjectGraph::new(), &Value::Bool(true), options).unwrap();
/// assert_eq!(text, "--(bool)true");
/// ```
///
/// # Errors
///
/// Returns an error if the value cannot be serialized.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn to_string_with_options(
    graph: &ObjectGraph,
    root: &Value,
    options: EngineOptions,
) -> Result<String> {
    engine::encode(graph, root, &options)
}

/// Serializes the graph reachable from `root` to a writer.
///
/// # Examples
///
/// ```rust
/// use refwire::{schema, to_writer, ObjectGraph, Shape};
/// use std::sync::Arc;
///
/// let point = Arc::new(schema!("demo.Point" => { x: Shape::I32 }));
/// let mut graph = ObjectGraph::new();
/// let p = graph.alloc(&point);
///
/// let mut buffer = Vec::new();
/// to_writer(&mut buffer, &graph, p).unwrap();
/// assert!(!buffer.is_empty());
/// ```
///
/// # Errors
///
/// Returns an error if serialization fails or writing to the writer fails.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn to_writer<W>(writer: W, graph: &ObjectGraph, root: ObjectId) -> Result<()>
where
    W: io::Write,
{
    to_writer_with_options(writer, graph, &Value::Object(root), EngineOptions::default())
}

/// Serializes any value to a writer with custom options.
///
/// # Errors
///
/// Returns an error if serialization fails or writing to the writer fails.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn to_writer_with_options<W>(
    mut writer: W,
    graph: &ObjectGraph,
    root: &Value,
    options: EngineOptions,
) -> Result<()>
where
    W: io::Write,
{
    let text = to_string_with_options(graph, root, options)?;
    writer
        .write_all(text.as_bytes())
        .map_err(|e| Error::io(&e.to_string()))?;
    Ok(())
}

/// Decodes a document with default options.
///
/// # Examples
///
/// ```rust
/// use refwire::{from_str, Catalog, Value};
///
/// let decoded = from_str(&Catalog::new(), "-t[3]i64(0)-12").unwrap();
/// assert_eq!(decoded.root, Value::I64(-12));
/// ```
///
/// # Errors
///
/// Returns an error if the document is malformed or names unknown types.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn from_str(catalog: &Catalog, s: &str) -> Result<Decoded> {
    from_str_with_options(catalog, s, &EngineOptions::default())
}

/// Decodes a document with custom options.
///
/// # Errors
///
/// Returns an error if the document is malformed or names unknown types.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn from_str_with_options(catalog: &Catalog, s: &str, options: &EngineOptions) -> Result<Decoded> {
    engine::decode(catalog, s, options)
}

/// Decodes a document from an I/O stream.
///
/// # Examples
///
/// ```rust
/// use refwire::{from_reader, Catalog, Value};
/// use std::io::Cursor;
///
/// let decoded = from_reader(&Catalog::new(), Cursor::new(b"--~[2]hi")).unwrap();
/// assert_eq!(decoded.root, Value::from("hi"));
/// ```
///
/// # Errors
///
/// Returns an error if reading fails or the document is invalid.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn from_reader<R>(catalog: &Catalog, mut reader: R) -> Result<Decoded>
where
    R: io::Read,
{
    let mut string = String::new();
    reader
        .read_to_string(&mut string)
        .map_err(|e| Error::io(&e.to_string()))?;
    from_str(catalog, &string)
}

/// Decodes a document from bytes.
///
/// # Errors
///
/// Returns an error if the bytes are not valid UTF-8 or not a valid document.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn from_slice(catalog: &Catalog, v: &[u8]) -> Result<Decoded> {
    let s = std::str::from_utf8(v).map_err(|e| Error::custom(e.to_string()))?;
    from_str(catalog, s)
}
