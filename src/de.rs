//! Graph deserialization.
//!
//! A [`Deserializer`] is one decode session against a [`Catalog`]. It owns the
//! type table read from the header, the graph under construction, and the map
//! from wire ids to the objects built for them.
//!
//! Decoding runs in this order:
//!
//! 1. Flags, then the type table and the reference block region when the
//!    flags announce them.
//! 2. An object root is allocated as id 0 before anything else, so back
//!    references to the root resolve.
//! 3. Every reference block is allocated and registered before any block is
//!    filled. Blocks may therefore refer to each other in any order.
//! 4. Blocks are filled, then the main body.
//!
//! Any error aborts the whole call; no partial graph is returned.

use crate::registry::TypeRegistry;
use crate::scan::{self, Block};
use crate::ser::DATETIME_FORMAT;
use crate::{
    Catalog, Decimal, Dictionary, EnumValue, Error, Guid, ObjectGraph, ObjectId, Result, Sequence,
    Shape, Value,
};
use chrono::{Duration, NaiveDateTime, TimeZone, Utc};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

/// The result of a decode: the new graph and the root value.
#[derive(Clone, Debug)]
pub struct Decoded {
    pub graph: ObjectGraph,
    pub root: Value,
}

impl Decoded {
    /// The root object, if the document encoded one.
    #[must_use]
    pub fn root_object(&self) -> Option<ObjectId> {
        self.root.as_object()
    }
}

/// The parts of a document, located but not yet interpreted.
struct Document<'a> {
    table: Option<&'a str>,
    region: Option<(&'a str, usize)>,
    body: &'a str,
    body_offset: usize,
}

/// One decode session.
pub struct Deserializer<'c> {
    catalog: &'c Catalog,
    types: TypeRegistry,
    graph: ObjectGraph,
    objects: HashMap<usize, ObjectId>,
}

impl<'c> Deserializer<'c> {
    pub fn new(catalog: &'c Catalog) -> Self {
        Deserializer {
            catalog,
            types: TypeRegistry::new(),
            graph: ObjectGraph::new(),
            objects: HashMap::new(),
        }
    }

    /// Decodes a complete document.
    ///
    /// # Errors
    ///
    /// Every error is fatal: [`Error::MalformedHeader`] for bad flags or
    /// prefixes, [`Error::Syntax`] for malformed bodies,
    /// [`Error::TypeResolution`] for unknown types,
    /// [`Error::UnresolvedReference`] for dangling `ref` ids and
    /// [`Error::TypeMismatch`] for values that do not fit their member.
    pub fn deserialize(mut self, text: &str) -> Result<Decoded> {
        let doc = split_document(text)?;
        if let Some(table) = doc.table {
            self.types = TypeRegistry::from_wire(table);
        }
        let blocks = match doc.region {
            Some((region, offset)) => {
                scan::extract_blocks(region).map_err(|e| e.shifted(offset))?
            }
            None => Vec::new(),
        };

        let root = self.allocate_root(doc.body, doc.body_offset)?;
        let pending = self.allocate_blocks(&blocks, doc.region.map_or(0, |(_, o)| o))?;
        for (id, rest, offset) in pending {
            self.fill_object(id, rest, offset)?;
        }

        let root = match root {
            Some((id, rest, offset)) => {
                self.fill_object(id, rest, offset)?;
                Value::Object(id)
            }
            None => self.decode_value(doc.body, &Shape::Any, doc.body_offset)?,
        };

        tracing::debug!(
            objects = self.graph.len(),
            blocks = blocks.len(),
            types = self.types.len(),
            "decoded object graph"
        );
        Ok(Decoded {
            graph: self.graph,
            root,
        })
    }

    /// Allocates the root as id 0 when the main body is an inline object.
    fn allocate_root<'t>(
        &mut self,
        body: &'t str,
        offset: usize,
    ) -> Result<Option<(ObjectId, &'t str, usize)>> {
        if !body.starts_with('(') {
            return Ok(None);
        }
        let catalog = self.catalog;
        let (token, rest, rest_offset) =
            scan::split_type_token(body).map_err(|e| e.shifted(offset))?;
        let shape = self.types.resolve(token, catalog)?;
        let schema = match &shape {
            Shape::Named(name) if !rest.starts_with("ref") => catalog.schema(name),
            _ => None,
        };
        let Some(schema) = schema else {
            return Ok(None);
        };
        let id = catalog.instantiate(&mut self.graph, schema);
        self.objects.insert(0, id);
        Ok(Some((id, rest, offset + rest_offset)))
    }

    /// First phase of block decoding: an empty instance per block.
    fn allocate_blocks<'t>(
        &mut self,
        blocks: &[Block<'t>],
        region_offset: usize,
    ) -> Result<Vec<(ObjectId, &'t str, usize)>> {
        let catalog = self.catalog;
        let mut pending = Vec::with_capacity(blocks.len());
        for block in blocks {
            let base = region_offset + block.offset;
            let (token, rest, rest_offset) =
                scan::split_type_token(block.body).map_err(|e| e.shifted(base))?;
            let shape = self.types.resolve(token, catalog)?;
            let schema = match &shape {
                Shape::Named(name) => catalog.schema(name),
                _ => None,
            }
            .ok_or_else(|| {
                Error::unsupported_shape(&format!("reference block {} holds a {}", block.id, shape))
            })?;
            if rest.starts_with("ref") {
                return Err(Error::syntax(base + rest_offset, "reference block body is a ref"));
            }

            let id = catalog.instantiate(&mut self.graph, schema);
            if self.objects.insert(block.id, id).is_some() {
                return Err(Error::syntax(base, &format!("duplicate block id {}", block.id)));
            }
            tracing::trace!(id = block.id, object = %id, "allocated reference block");
            pending.push((id, rest, base + rest_offset));
        }
        Ok(pending)
    }

    /// Fills the members of an allocated object from its segments.
    fn fill_object(&mut self, id: ObjectId, body: &str, offset: usize) -> Result<()> {
        let schema = self
            .graph
            .schema(id)
            .map(Arc::clone)
            .ok_or_else(|| Error::unsupported_shape(&format!("dangling object id {}", id)))?;
        let segments = scan::extract_segments(body).map_err(|e| e.shifted(offset))?;
        for segment in segments {
            let at = offset + segment.offset;
            let member = schema.member(segment.key).ok_or_else(|| {
                Error::syntax(
                    at,
                    &format!("type {} has no member '{}'", schema.name, segment.key),
                )
            })?;
            if !member.is_eligible() {
                continue;
            }
            let value = self.decode_value(segment.payload, &member.shape, at)?;
            self.graph.put(id, &member.name, value);
        }
        Ok(())
    }

    /// Decodes one payload into a value for a slot of shape `declared`.
    fn decode_value(&mut self, payload: &str, declared: &Shape, offset: usize) -> Result<Value> {
        if payload.is_empty() {
            return if declared.is_nullable() {
                Ok(Value::Null)
            } else {
                Err(Error::type_mismatch(&declared.to_string(), "null"))
            };
        }

        if payload.starts_with('~') {
            let (text, end) = scan::read_string(payload, 0).map_err(|e| e.shifted(offset))?;
            if end != payload.len() {
                return Err(Error::syntax(offset + end, "trailing characters after string"));
            }
            conform(declared, Shape::String)?;
            return Ok(Value::String(text.to_string()));
        }

        let catalog = self.catalog;
        let (token, rest, rest_offset) =
            scan::split_type_token(payload).map_err(|e| e.shifted(offset))?;
        let shape = conform(declared, self.types.resolve(token, catalog)?)?;
        let offset = offset + rest_offset;

        match &shape {
            Shape::Named(name) => {
                if let Some(schema) = catalog.schema(name) {
                    if let Some(id_text) = rest.strip_prefix("ref") {
                        return self.resolve_reference(id_text, name, offset);
                    }
                    let id = catalog.instantiate(&mut self.graph, schema);
                    self.fill_object(id, rest, offset)?;
                    Ok(Value::Object(id))
                } else if let Some(e) = catalog.enum_schema(name) {
                    if !e.has_variant(rest) {
                        return Err(Error::type_mismatch(name, rest));
                    }
                    Ok(Value::Enum(EnumValue::new(name.as_str(), rest)))
                } else {
                    Err(Error::type_resolution(name))
                }
            }
            Shape::Seq(kind, element) => {
                let segments = scan::extract_segments(rest).map_err(|e| e.shifted(offset))?;
                let mut items = Vec::with_capacity(segments.len());
                for (index, segment) in segments.iter().enumerate() {
                    let at = offset + segment.offset;
                    check_index(segment.key, index, at)?;
                    items.push(self.decode_value(segment.payload, element, at)?);
                }
                Ok(Value::Seq(Sequence::new(*kind, (**element).clone(), items)))
            }
            Shape::Dict(key_shape, value_shape) => {
                let segments = scan::extract_segments(rest).map_err(|e| e.shifted(offset))?;
                let mut dict = Dictionary::new((**key_shape).clone(), (**value_shape).clone());
                for (index, segment) in segments.iter().enumerate() {
                    let at = offset + segment.offset;
                    check_index(segment.key, index, at)?;
                    let (key, value, value_offset) =
                        scan::split_entry(segment.payload).map_err(|e| e.shifted(at))?;
                    let key = self.decode_value(key, key_shape, at)?;
                    let value = self.decode_value(value, value_shape, at + value_offset)?;
                    dict.insert(key, value);
                }
                Ok(Value::Dict(dict))
            }
            Shape::Option(_) | Shape::Any => Err(Error::unsupported_shape(&format!(
                "'{}' is not a concrete wire type",
                shape
            ))),
            scalar => parse_scalar(scalar, rest),
        }
    }

    fn resolve_reference(&self, id_text: &str, type_name: &str, offset: usize) -> Result<Value> {
        let ref_id: usize = id_text
            .parse()
            .map_err(|_| Error::syntax(offset, "expected a reference id after 'ref'"))?;
        let id = *self
            .objects
            .get(&ref_id)
            .ok_or(Error::UnresolvedReference(ref_id))?;
        match self.graph.type_name(id) {
            Some(found) if found == type_name => Ok(Value::Object(id)),
            found => Err(Error::type_mismatch(type_name, found.unwrap_or("nothing"))),
        }
    }
}

/// Locates flags, table, block region and body.
fn split_document(text: &str) -> Result<Document<'_>> {
    let bytes = text.as_bytes();
    let has_refs = match bytes.first() {
        Some(b'r') => true,
        Some(b'-') => false,
        Some(_) => return Err(Error::malformed_header("first flag must be 'r' or '-'")),
        None => return Err(Error::malformed_header("empty input")),
    };
    let has_table = match bytes.get(1) {
        Some(b't') => true,
        Some(b'-') => false,
        Some(_) => return Err(Error::malformed_header("second flag must be 't' or '-'")),
        None => return Err(Error::malformed_header("missing type table flag")),
    };

    let mut pos = 2;
    let table = if has_table {
        Some(read_section(text, &mut pos, "type table")?.0)
    } else {
        None
    };
    let region = if has_refs {
        Some(read_section(text, &mut pos, "reference block")?)
    } else {
        None
    };
    Ok(Document {
        table,
        region,
        body: &text[pos..],
        body_offset: pos,
    })
}

/// Reads one `[len]`-prefixed header section, returning it and its offset.
fn read_section<'a>(text: &'a str, pos: &mut usize, what: &str) -> Result<(&'a str, usize)> {
    let (len, start) = scan::read_length(text, *pos)
        .map_err(|e| Error::MalformedHeader(format!("{} length: {}", what, e)))?;
    let end = scan::skip_chars(text, start, len)
        .ok_or_else(|| Error::MalformedHeader(format!("{} runs past the end of input", what)))?;
    *pos = end;
    Ok((&text[start..end], start))
}

/// Checks a declared slot against the resolved wire type, returning the shape
/// to build. Sequences take the declared collection kind.
fn conform(declared: &Shape, actual: Shape) -> Result<Shape> {
    match (declared, &actual) {
        (Shape::Any, _) => Ok(actual),
        (Shape::Option(inner), _) => conform(inner, actual),
        (Shape::Seq(kind, element), Shape::Seq(_, found)) if element == found => {
            Ok(Shape::Seq(*kind, element.clone()))
        }
        _ if *declared == actual => Ok(actual),
        _ => Err(Error::type_mismatch(&declared.to_string(), &actual.to_string())),
    }
}

fn check_index(key: &str, index: usize, offset: usize) -> Result<()> {
    if key.parse::<usize>().ok() == Some(index) {
        Ok(())
    } else {
        Err(Error::syntax(
            offset,
            &format!("expected element index {}, found '{}'", index, key),
        ))
    }
}

fn parse_scalar(shape: &Shape, text: &str) -> Result<Value> {
    fn num<T: FromStr>(shape: &Shape, text: &str) -> Result<T> {
        text.parse()
            .map_err(|_| Error::type_mismatch(&shape.to_string(), text))
    }

    let value = match shape {
        Shape::Bool => Value::Bool(num(shape, text)?),
        Shape::I8 => Value::I8(num(shape, text)?),
        Shape::I16 => Value::I16(num(shape, text)?),
        Shape::I32 => Value::I32(num(shape, text)?),
        Shape::I64 => Value::I64(num(shape, text)?),
        Shape::U8 => Value::U8(num(shape, text)?),
        Shape::U16 => Value::U16(num(shape, text)?),
        Shape::U32 => Value::U32(num(shape, text)?),
        Shape::U64 => Value::U64(num(shape, text)?),
        Shape::F32 => Value::F32(num(shape, text)?),
        Shape::F64 => Value::F64(num(shape, text)?),
        Shape::Decimal => Value::Decimal(num::<Decimal>(shape, text)?),
        Shape::Guid => Value::Guid(num::<Guid>(shape, text)?),
        Shape::DateTime => NaiveDateTime::parse_from_str(text, DATETIME_FORMAT)
            .map(|naive| Value::DateTime(Utc.from_utc_datetime(&naive)))
            .map_err(|_| Error::type_mismatch("datetime", text))?,
        Shape::Duration => parse_duration(text)
            .map(Value::Duration)
            .ok_or_else(|| Error::type_mismatch("duration", text))?,
        other => return Err(Error::unsupported_shape(&other.to_string())),
    };
    Ok(value)
}

/// `seconds:nanoseconds`, both signed, as written by the encoder.
fn parse_duration(text: &str) -> Option<Duration> {
    const MAX_SECONDS: i64 = i64::MAX / 1000;
    let (secs, nanos) = text.split_once(':')?;
    let secs: i64 = secs.parse().ok()?;
    let nanos: i64 = nanos.parse().ok()?;
    if !(-MAX_SECONDS..=MAX_SECONDS).contains(&secs) || nanos.abs() >= 1_000_000_000 {
        return None;
    }
    Duration::seconds(secs).checked_add(&Duration::nanoseconds(nanos))
}
