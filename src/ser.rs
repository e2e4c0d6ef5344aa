//! Graph serialization.
//!
//! A [`Serializer`] is one encode session. It owns the session's type table
//! and reference tracker, so nothing carries over between calls.
//!
//! ## Overview
//!
//! 1. **Tracking**: the [`ReferenceTracker`] walks the graph once and flags
//!    every object reached more than once.
//! 2. **Writing**: the root body is written inline. Each flagged object is
//!    written as `(type)ref<id>` wherever it occurs.
//! 3. **Planning**: every referenced object other than the root is written
//!    once into a `{len&id&body}` block. Writing a block can reference
//!    objects for the first time, so blocks are produced until none are
//!    pending, then emitted last-discovered first.
//! 4. **Assembly**: flags, the type table, the block region and the body.
//!
//! ## Examples
//!
//! ```rust
//! use refwire::{schema, EngineOptions, ObjectGraph, Serializer, Shape, Value};
//! use std::sync::Arc;
//!
//! let point = Arc::new(schema!("demo.Point" => { x: Shape::I32, y: Shape::I32 }));
//! let mut graph = ObjectGraph::new();
//! let p = graph.alloc(&point);
//! graph.set(p, "x", Value::I32(3)).unwrap();
//!
//! let text = Serializer::new(&graph, EngineOptions::new())
//!     .serialize(&Value::Object(p))
//!     .unwrap();
//! assert_eq!(text, "-t[14]demo.Point&i32(0)<[x]=(1)3><[y]=(1)0>");
//! ```

use crate::registry::TypeRegistry;
use crate::tracker::ReferenceTracker;
use crate::{EngineOptions, Error, ObjectGraph, ObjectId, Result, Shape, Value};

/// One encode session over a borrowed graph.
pub struct Serializer<'g> {
    graph: &'g ObjectGraph,
    options: EngineOptions,
    types: TypeRegistry,
    tracker: ReferenceTracker,
}

impl<'g> Serializer<'g> {
    pub fn new(graph: &'g ObjectGraph, options: EngineOptions) -> Self {
        Serializer {
            graph,
            options,
            types: TypeRegistry::new(),
            tracker: ReferenceTracker::new(),
        }
    }

    /// Encodes `root` and returns the wire text, before any base64 wrapping.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedShape`] if the graph holds a value its
    /// declared member shape does not admit, an object of a type not marked
    /// serializable, or a dangling object id.
    pub fn serialize(mut self, root: &Value) -> Result<String> {
        self.tracker
            .track(self.graph, root, self.options.preserve_aliases)?;

        // 256 bytes covers small graphs without regrowing
        let mut body = String::with_capacity(256);
        match root {
            Value::Object(id) => self.write_object(&mut body, *id)?,
            other => self.write_value(&mut body, other, &Shape::Any)?,
        }

        let blocks = self.plan_blocks()?;
        let output = self.assemble(&blocks, &body);
        tracing::debug!(
            tracked = self.tracker.len(),
            types = self.types.len(),
            blocks = blocks.len(),
            chars = output.len(),
            "encoded object graph"
        );
        Ok(output)
    }

    fn write_type(&mut self, out: &mut String, shape: &Shape) {
        out.push('(');
        out.push_str(&self.types.token(shape, self.options.type_table));
        out.push(')');
    }

    fn write_value(&mut self, out: &mut String, value: &Value, declared: &Shape) -> Result<()> {
        let graph = self.graph;
        if !declared.admits(value, graph) {
            let found = value
                .shape(graph)
                .map_or_else(|| value.kind_name().to_string(), |s| s.to_string());
            return Err(Error::unsupported_shape(&format!(
                "a {} slot cannot hold {}",
                declared, found
            )));
        }

        match value {
            Value::Null => {}
            Value::String(s) => write_string(out, s),
            Value::Dict(dict) => {
                self.write_type(out, &dict.shape());
                for (index, (key, val)) in dict.entries.iter().enumerate() {
                    open_segment(out, &index.to_string());
                    self.write_value(out, key, &dict.key)?;
                    out.push('|');
                    self.write_value(out, val, &dict.value)?;
                    out.push('>');
                }
            }
            Value::Seq(seq) => {
                self.write_type(out, &seq.shape());
                for (index, item) in seq.items.iter().enumerate() {
                    open_segment(out, &index.to_string());
                    self.write_value(out, item, &seq.element)?;
                    out.push('>');
                }
            }
            Value::Object(id) => match self.tracker.lookup(*id) {
                Some(ref_id) => {
                    let name = object_type(graph, *id)?;
                    self.write_type(out, &Shape::named(name));
                    out.push_str("ref");
                    out.push_str(&ref_id.to_string());
                }
                None => self.write_object(out, *id)?,
            },
            scalar => {
                let shape = scalar
                    .shape(graph)
                    .ok_or_else(|| Error::unsupported_shape(scalar.kind_name()))?;
                let text = scalar_text(scalar)
                    .ok_or_else(|| Error::unsupported_shape(scalar.kind_name()))?;
                self.write_type(out, &shape);
                out.push_str(&text);
            }
        }
        Ok(())
    }

    /// Writes an object's full body, without consulting the tracker for it.
    fn write_object(&mut self, out: &mut String, id: ObjectId) -> Result<()> {
        let graph = self.graph;
        let node = graph
            .node(id)
            .ok_or_else(|| Error::unsupported_shape(&format!("dangling object id {}", id)))?;
        let schema = node.schema();
        if !schema.serializable {
            return Err(Error::unsupported_shape(&format!(
                "type {} is not marked serializable",
                schema.name
            )));
        }

        self.write_type(out, &Shape::named(schema.name.as_str()));
        for member in schema.eligible_members() {
            open_segment(out, &member.name);
            let value = node.get(&member.name).unwrap_or(&Value::Null);
            self.write_value(out, value, &member.shape)?;
            out.push('>');
        }
        Ok(())
    }

    /// Writes every pending hoist, repeating until a pass adds none.
    ///
    /// Returned blocks are in emission order: last discovered first.
    fn plan_blocks(&mut self) -> Result<Vec<String>> {
        let mut blocks = Vec::new();
        while let Some((ref_id, target)) = self.tracker.next_pending() {
            let mut body = String::new();
            self.write_object(&mut body, target)?;
            tracing::trace!(id = ref_id, object = %target, "hoisted into reference block");
            blocks.push(format!("{{{}&{}&{}}}", body.chars().count(), ref_id, body));
        }
        blocks.reverse();
        Ok(blocks)
    }

    fn assemble(&self, blocks: &[String], body: &str) -> String {
        let mut out = String::with_capacity(body.len() + 64);
        out.push(if blocks.is_empty() { '-' } else { 'r' });
        out.push(if self.types.is_empty() { '-' } else { 't' });
        if !self.types.is_empty() {
            write_length_prefixed(&mut out, &self.types.to_wire());
        }
        if !blocks.is_empty() {
            write_length_prefixed(&mut out, &blocks.concat());
        }
        out.push_str(body);
        out
    }
}

fn object_type(graph: &ObjectGraph, id: ObjectId) -> Result<&str> {
    graph
        .type_name(id)
        .ok_or_else(|| Error::unsupported_shape(&format!("dangling object id {}", id)))
}

#[inline]
fn open_segment(out: &mut String, key: &str) {
    out.push_str("<[");
    out.push_str(key);
    out.push_str("]=");
}

#[inline]
fn write_length_prefixed(out: &mut String, text: &str) {
    out.push('[');
    out.push_str(&text.chars().count().to_string());
    out.push(']');
    out.push_str(text);
}

/// `~[len]chars`; the length lets the scanner skip the raw characters.
#[inline]
fn write_string(out: &mut String, s: &str) {
    out.push('~');
    write_length_prefixed(out, s);
}

/// RFC 3339 in UTC for years 0000 to 9999; `%Y` adds a sign and widens
/// outside that range, which plain RFC 3339 cannot express.
pub(crate) const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.fZ";

/// Culture-invariant text of a scalar, `None` for non-scalars.
pub(crate) fn scalar_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::Bool(v) => v.to_string(),
        Value::I8(v) => v.to_string(),
        Value::I16(v) => v.to_string(),
        Value::I32(v) => v.to_string(),
        Value::I64(v) => v.to_string(),
        Value::U8(v) => v.to_string(),
        Value::U16(v) => v.to_string(),
        Value::U32(v) => v.to_string(),
        Value::U64(v) => v.to_string(),
        Value::F32(v) => v.to_string(),
        Value::F64(v) => v.to_string(),
        Value::Decimal(v) => v.to_string(),
        Value::DateTime(v) => v.format(DATETIME_FORMAT).to_string(),
        Value::Duration(v) => format!("{}:{}", v.num_seconds(), v.subsec_nanos()),
        Value::Guid(v) => v.to_string(),
        Value::Enum(v) => v.variant.clone(),
        _ => return None,
    };
    Some(text)
}
