//! The serialization engine.
//!
//! [`Engine`] pairs a [`Catalog`] with [`EngineOptions`]. Each call builds a
//! fresh [`Serializer`] or [`Deserializer`] session, so no state survives
//! from one call to the next and a failed call leaves nothing behind.
//!
//! ## Examples
//!
//! ```rust
//! use refwire::{schema, Catalog, Engine, ObjectGraph, Shape, Value};
//!
//! let mut catalog = Catalog::new();
//! let node = catalog
//!     .register(schema!("demo.Node" => { next: Shape::named("demo.Node") }))
//!     .unwrap();
//!
//! let mut graph = ObjectGraph::new();
//! let a = graph.alloc(&node);
//! graph.set(a, "next", Value::Object(a)).unwrap();
//!
//! let engine = Engine::new(catalog);
//! let text = engine.serialize(&graph, a).unwrap();
//! let (decoded, root) = engine.deserialize_as(&text, "demo.Node").unwrap();
//! assert_eq!(decoded.get(root, "next"), Some(&Value::Object(root)));
//! ```

use crate::{
    Catalog, Decoded, Deserializer, EngineOptions, Error, ObjectGraph, ObjectId, Result,
    Serializer, Value,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};

/// Serializes object graphs against one catalog.
#[derive(Clone, Debug)]
pub struct Engine {
    catalog: Catalog,
    options: EngineOptions,
}

impl Engine {
    #[must_use]
    pub fn new(catalog: Catalog) -> Self {
        Self::with_options(catalog, EngineOptions::default())
    }

    #[must_use]
    pub fn with_options(catalog: Catalog, options: EngineOptions) -> Self {
        Engine { catalog, options }
    }

    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    #[must_use]
    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// Serializes the graph reachable from `root`.
    ///
    /// Tracking and writing recurse once per level of inline nesting, so the
    /// longest chain of objects that are each reached only through the one
    /// before them is bounded by the thread's stack. A 20,000-node linked
    /// list overflows a default 2 MiB test thread; run graphs that deep on a
    /// thread built with a larger `std::thread::Builder::stack_size`.
    /// Decoding that document recurses to the same depth.
    ///
    /// # Errors
    ///
    /// See [`Serializer::serialize`].
    pub fn serialize(&self, graph: &ObjectGraph, root: ObjectId) -> Result<String> {
        encode(graph, &Value::Object(root), &self.options)
    }

    /// Serializes with an explicit aliasing mode.
    ///
    /// With `preserve_aliases` off, shared objects are written once per
    /// occurrence and only cycles keep their identity.
    ///
    /// # Errors
    ///
    /// See [`Serializer::serialize`].
    pub fn serialize_with(
        &self,
        graph: &ObjectGraph,
        root: ObjectId,
        preserve_aliases: bool,
    ) -> Result<String> {
        let options = self.options.clone().with_preserve_aliases(preserve_aliases);
        encode(graph, &Value::Object(root), &options)
    }

    /// Serializes any value, including isolated scalars and collections.
    ///
    /// # Errors
    ///
    /// See [`Serializer::serialize`].
    pub fn serialize_value(&self, graph: &ObjectGraph, value: &Value) -> Result<String> {
        encode(graph, value, &self.options)
    }

    /// Decodes a document into a new graph.
    ///
    /// Nested bodies are decoded recursively; see [`Engine::serialize`] for
    /// the depth bound.
    ///
    /// # Errors
    ///
    /// See [`Deserializer::deserialize`]; also [`Error::Base64`] when the
    /// base64 wrapper is enabled and the input is not valid base64.
    pub fn deserialize(&self, data: &str) -> Result<Decoded> {
        decode(&self.catalog, data, &self.options)
    }

    /// Decodes a document whose root must be an object of `type_name`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TypeMismatch`] if the root is anything else.
    pub fn deserialize_as(&self, data: &str, type_name: &str) -> Result<(ObjectGraph, ObjectId)> {
        let decoded = self.deserialize(data)?;
        let found = match &decoded.root {
            Value::Object(id) => decoded.graph.type_name(*id).map(str::to_string),
            other => other.shape(&decoded.graph).map(|s| s.to_string()),
        };
        match decoded.root_object() {
            Some(id) if found.as_deref() == Some(type_name) => Ok((decoded.graph, id)),
            _ => Err(Error::type_mismatch(
                type_name,
                found.as_deref().unwrap_or("null"),
            )),
        }
    }
}

/// Runs one encode session and applies the transport wrapper.
pub(crate) fn encode(graph: &ObjectGraph, root: &Value, options: &EngineOptions) -> Result<String> {
    let text = Serializer::new(graph, options.clone()).serialize(root)?;
    if options.base64 {
        Ok(BASE64.encode(text))
    } else {
        Ok(text)
    }
}

/// Removes the transport wrapper and runs one decode session.
pub(crate) fn decode(catalog: &Catalog, data: &str, options: &EngineOptions) -> Result<Decoded> {
    if options.base64 {
        let bytes = BASE64.decode(data.trim())?;
        let text = String::from_utf8(bytes).map_err(|e| Error::Base64(e.to_string()))?;
        Deserializer::new(catalog).deserialize(&text)
    } else {
        Deserializer::new(catalog).deserialize(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema;

    fn engine(options: EngineOptions) -> (Engine, ObjectGraph, ObjectId) {
        let mut catalog = Catalog::new();
        let node = catalog
            .register(schema!("demo.Node" => {
                label: crate::Shape::String,
                next: crate::Shape::named("demo.Node"),
            }))
            .unwrap();
        let mut graph = ObjectGraph::new();
        let a = graph.alloc(&node);
        graph.set(a, "label", Value::from("αβ")).unwrap();
        graph.set(a, "next", Value::Object(a)).unwrap();
        (Engine::with_options(catalog, options), graph, a)
    }

    #[test]
    fn test_base64_wrapper_round_trip() {
        let (engine, graph, a) = engine(EngineOptions::new().with_base64(true));
        let text = engine.serialize(&graph, a).unwrap();
        assert!(BASE64.decode(&text).is_ok());

        let (decoded, root) = engine.deserialize_as(&text, "demo.Node").unwrap();
        assert_eq!(decoded.get(root, "label"), Some(&Value::from("αβ")));
        assert_eq!(decoded.get(root, "next"), Some(&Value::Object(root)));
    }

    #[test]
    fn test_base64_rejects_garbage() {
        let (engine, _, _) = engine(EngineOptions::new().with_base64(true));
        assert!(matches!(engine.deserialize("not base64!"), Err(Error::Base64(_))));
    }

    #[test]
    fn test_deserialize_as_checks_root_type() {
        let (engine, graph, a) = engine(EngineOptions::new());
        let text = engine.serialize(&graph, a).unwrap();
        assert!(matches!(
            engine.deserialize_as(&text, "demo.Other"),
            Err(Error::TypeMismatch { .. })
        ));

        let scalar = engine.serialize_value(&graph, &Value::I32(1)).unwrap();
        assert_eq!(
            engine.deserialize_as(&scalar, "demo.Node").unwrap_err(),
            Error::type_mismatch("demo.Node", "i32")
        );
    }
}
