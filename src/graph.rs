//! Arena-backed object graphs.
//!
//! An [`ObjectGraph`] owns every node; a field that refers to another object
//! holds its [`ObjectId`]. Identity is the id, so cycles and shared
//! references are just repeated ids and need no reference counting.
//!
//! ## Examples
//!
//! ```rust
//! use refwire::{schema, ObjectGraph, Shape, Value};
//! use std::sync::Arc;
//!
//! let node = Arc::new(schema!("demo.Node" => {
//!     label: Shape::String,
//!     next: Shape::named("demo.Node"),
//! }));
//!
//! let mut graph = ObjectGraph::new();
//! let a = graph.alloc(&node);
//! graph.set(a, "label", Value::from("loop")).unwrap();
//! graph.set(a, "next", Value::Object(a)).unwrap();
//!
//! assert_eq!(graph.get(a, "next"), Some(&Value::Object(a)));
//! ```

use crate::{Error, FieldMap, Result, Schema, Value};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// Index of a node in its [`ObjectGraph`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(usize);

impl ObjectId {
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One object: its schema and its member values in declaration order.
#[derive(Clone, Debug)]
pub struct Node {
    schema: Arc<Schema>,
    fields: FieldMap,
}

impl Node {
    #[must_use]
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    #[must_use]
    pub fn fields(&self) -> &FieldMap {
        &self.fields
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }
}

/// An arena of objects.
#[derive(Clone, Debug, Default)]
pub struct ObjectGraph {
    nodes: Vec<Node>,
}

impl ObjectGraph {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Allocates an empty instance: every member holds its shape's default.
    pub fn alloc(&mut self, schema: &Arc<Schema>) -> ObjectId {
        let fields = schema
            .members
            .iter()
            .map(|m| (m.name.clone(), m.shape.default_value()))
            .collect();
        self.nodes.push(Node {
            schema: Arc::clone(schema),
            fields,
        });
        ObjectId(self.nodes.len() - 1)
    }

    #[must_use]
    pub fn node(&self, id: ObjectId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    #[must_use]
    pub fn schema(&self, id: ObjectId) -> Option<&Arc<Schema>> {
        self.node(id).map(Node::schema)
    }

    #[must_use]
    pub fn type_name(&self, id: ObjectId) -> Option<&str> {
        self.node(id).map(|n| n.schema.name.as_str())
    }

    #[must_use]
    pub fn get(&self, id: ObjectId, name: &str) -> Option<&Value> {
        self.node(id)?.fields.get(name)
    }

    pub fn get_mut(&mut self, id: ObjectId, name: &str) -> Option<&mut Value> {
        self.nodes.get_mut(id.0)?.fields.get_mut(name)
    }

    /// Sets a member, returning the previous value.
    ///
    /// # Errors
    ///
    /// Fails if `id` is not in this graph or the schema has no such member.
    pub fn set(&mut self, id: ObjectId, name: &str, value: Value) -> Result<Value> {
        let node = self
            .nodes
            .get_mut(id.0)
            .ok_or_else(|| Error::custom(format!("no object {} in graph", id)))?;
        let slot = node.fields.get_mut(name).ok_or_else(|| {
            Error::custom(format!("type {} has no member '{}'", node.schema.name, name))
        })?;
        Ok(std::mem::replace(slot, value))
    }

    /// Overwrites a member that is known to exist.
    pub(crate) fn put(&mut self, id: ObjectId, name: &str, value: Value) {
        if let Some(slot) = self.get_mut(id, name) {
            *slot = value;
        }
    }

    /// Deep comparison of `a` in this graph with `b` in `other`.
    ///
    /// Objects compare by schema name and by the values of their eligible
    /// members; ignored and read-only members are skipped. A pair of objects
    /// already under comparison is assumed equal, which makes the check
    /// terminate on cycles. Aliasing is not compared: a shared node and two
    /// equal copies of it are structurally equal.
    #[must_use]
    pub fn structurally_equal(&self, a: &Value, other: &ObjectGraph, b: &Value) -> bool {
        let mut assumed = HashSet::new();
        self.equal_values(a, other, b, &mut assumed)
    }

    fn equal_values(
        &self,
        a: &Value,
        other: &ObjectGraph,
        b: &Value,
        assumed: &mut HashSet<(ObjectId, ObjectId)>,
    ) -> bool {
        match (a, b) {
            (Value::Object(x), Value::Object(y)) => {
                if !assumed.insert((*x, *y)) {
                    return true;
                }
                let (Some(nx), Some(ny)) = (self.node(*x), other.node(*y)) else {
                    return false;
                };
                nx.schema.name == ny.schema.name
                    && nx.schema.eligible_members().all(|m| {
                        match (nx.fields.get(&m.name), ny.fields.get(&m.name)) {
                            (Some(va), Some(vb)) => self.equal_values(va, other, vb, assumed),
                            _ => false,
                        }
                    })
            }
            (Value::Seq(x), Value::Seq(y)) => {
                x.kind == y.kind
                    && x.element == y.element
                    && x.items.len() == y.items.len()
                    && x
                        .items
                        .iter()
                        .zip(&y.items)
                        .all(|(va, vb)| self.equal_values(va, other, vb, assumed))
            }
            (Value::Dict(x), Value::Dict(y)) => {
                x.key == y.key
                    && x.value == y.value
                    && x.entries.len() == y.entries.len()
                    && x.entries.iter().zip(&y.entries).all(|((ka, va), (kb, vb))| {
                        self.equal_values(ka, other, kb, assumed)
                            && self.equal_values(va, other, vb, assumed)
                    })
            }
            (Value::F32(x), Value::F32(y)) => x == y || (x.is_nan() && y.is_nan()),
            (Value::F64(x), Value::F64(y)) => x == y || (x.is_nan() && y.is_nan()),
            _ => a == b,
        }
    }
}
