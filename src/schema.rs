//! Schema descriptors and the type catalog.
//!
//! Rust has no runtime reflection, so every type that takes part in graph
//! serialization is described once by a [`Schema`]: its full name, whether it
//! opts into the scheme, and its members in declaration order. Declaration
//! order is the member order used by both the tracking and the write pass.
//!
//! A [`Shape`] is the shape tag of a member or value. Its text form is the
//! full type name that the wire format interns:
//!
//! | Shape | Type name |
//! |-------|-----------|
//! | scalars | `bool`, `i32`, `f64`, `decimal`, `string`, `datetime`, `duration`, `guid`, ... |
//! | nullable | `option{i32}` |
//! | sequences | `array{T}`, `list{T}`, `observable{T}` |
//! | dictionary | `dict{K,V}` |
//! | enum or object | its registered name, e.g. `demo.Node` |
//! | untyped slot | `any` |
//!
//! The [`Catalog`] is the host's resolver: it maps names to schemas and enum
//! descriptors, and produces empty instances for the decoder.
//!
//! ## Examples
//!
//! ```rust
//! use refwire::{Catalog, Member, Schema, Shape};
//!
//! let mut catalog = Catalog::new();
//! catalog
//!     .register(
//!         Schema::new("demo.Node")
//!             .with_member(Member::new("label", Shape::String))
//!             .with_member(Member::new("next", Shape::named("demo.Node"))),
//!     )
//!     .unwrap();
//!
//! let shape = catalog.resolve("list{demo.Node}").unwrap();
//! assert_eq!(shape, Shape::list(Shape::named("demo.Node")));
//! ```

use crate::{Error, Result, Value};
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// The concrete kind of an ordered collection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SeqKind {
    Array,
    List,
    Observable,
}

impl SeqKind {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            SeqKind::Array => "array",
            SeqKind::List => "list",
            SeqKind::Observable => "observable",
        }
    }
}

/// The shape tag of a member or value.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Shape {
    Bool,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    Decimal,
    String,
    DateTime,
    Duration,
    Guid,
    /// A registered enum or object type, by full name.
    Named(String),
    Option(Box<Shape>),
    Seq(SeqKind, Box<Shape>),
    Dict(Box<Shape>, Box<Shape>),
    Any,
}

const SCALARS: &[(&str, Shape)] = &[
    ("bool", Shape::Bool),
    ("i8", Shape::I8),
    ("i16", Shape::I16),
    ("i32", Shape::I32),
    ("i64", Shape::I64),
    ("u8", Shape::U8),
    ("u16", Shape::U16),
    ("u32", Shape::U32),
    ("u64", Shape::U64),
    ("f32", Shape::F32),
    ("f64", Shape::F64),
    ("decimal", Shape::Decimal),
    ("string", Shape::String),
    ("datetime", Shape::DateTime),
    ("duration", Shape::Duration),
    ("guid", Shape::Guid),
    ("any", Shape::Any),
];

const CONSTRUCTORS: &[&str] = &["option", "array", "list", "observable", "dict"];

impl Shape {
    pub fn named(name: impl Into<String>) -> Self {
        Shape::Named(name.into())
    }

    pub fn option(inner: Shape) -> Self {
        Shape::Option(Box::new(inner))
    }

    pub fn array(element: Shape) -> Self {
        Shape::Seq(SeqKind::Array, Box::new(element))
    }

    pub fn list(element: Shape) -> Self {
        Shape::Seq(SeqKind::List, Box::new(element))
    }

    pub fn observable(element: Shape) -> Self {
        Shape::Seq(SeqKind::Observable, Box::new(element))
    }

    pub fn dict(key: Shape, value: Shape) -> Self {
        Shape::Dict(Box::new(key), Box::new(value))
    }

    /// Returns `true` if a slot of this shape may hold `Value::Null`.
    ///
    /// Named shapes are reference slots and always nullable.
    #[must_use]
    pub const fn is_nullable(&self) -> bool {
        matches!(
            self,
            Shape::String
                | Shape::Named(_)
                | Shape::Option(_)
                | Shape::Seq(..)
                | Shape::Dict(..)
                | Shape::Any
        )
    }

    /// The value a fresh instance holds in a slot of this shape.
    #[must_use]
    pub fn default_value(&self) -> Value {
        match self {
            Shape::Bool => Value::Bool(false),
            Shape::I8 => Value::I8(0),
            Shape::I16 => Value::I16(0),
            Shape::I32 => Value::I32(0),
            Shape::I64 => Value::I64(0),
            Shape::U8 => Value::U8(0),
            Shape::U16 => Value::U16(0),
            Shape::U32 => Value::U32(0),
            Shape::U64 => Value::U64(0),
            Shape::F32 => Value::F32(0.0),
            Shape::F64 => Value::F64(0.0),
            Shape::Decimal => Value::Decimal(crate::Decimal::default()),
            Shape::DateTime => Value::DateTime(chrono::DateTime::default()),
            Shape::Duration => Value::Duration(chrono::Duration::zero()),
            Shape::Guid => Value::Guid(crate::Guid::nil()),
            _ => Value::Null,
        }
    }

    /// Returns `true` if a slot of this shape can hold `value`.
    ///
    /// Collections are checked by their declared shape only; elements are
    /// checked as they are written.
    #[must_use]
    pub fn admits(&self, value: &Value, graph: &crate::ObjectGraph) -> bool {
        match (self, value) {
            (_, Value::Null) => self.is_nullable(),
            (Shape::Any, _) => true,
            (Shape::Option(inner), v) => inner.admits(v, graph),
            (Shape::Named(name), Value::Enum(e)) => *name == e.type_name,
            (Shape::Named(name), Value::Object(id)) => {
                graph.type_name(*id) == Some(name.as_str())
            }
            (Shape::Seq(kind, element), Value::Seq(s)) => *kind == s.kind && **element == s.element,
            (Shape::Dict(key, val), Value::Dict(d)) => **key == d.key && **val == d.value,
            (shape, v) => v.shape(graph).as_ref() == Some(shape),
        }
    }

    /// Checks that every type name inside this shape is usable on the wire.
    fn validate_names(&self) -> Result<()> {
        match self {
            Shape::Named(name) => validate_type_name(name),
            Shape::Option(inner) | Shape::Seq(_, inner) => inner.validate_names(),
            Shape::Dict(key, value) => {
                key.validate_names()?;
                value.validate_names()
            }
            _ => Ok(()),
        }
    }

    /// Calls `f` with every named type this shape mentions.
    fn for_each_name<'a>(&'a self, f: &mut impl FnMut(&'a str) -> Result<()>) -> Result<()> {
        match self {
            Shape::Named(name) => f(name),
            Shape::Option(inner) | Shape::Seq(_, inner) => inner.for_each_name(f),
            Shape::Dict(key, value) => {
                key.for_each_name(f)?;
                value.for_each_name(f)
            }
            _ => Ok(()),
        }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Shape::Named(name) => f.write_str(name),
            Shape::Option(inner) => write!(f, "option{{{}}}", inner),
            Shape::Seq(kind, element) => write!(f, "{}{{{}}}", kind.as_str(), element),
            Shape::Dict(key, value) => write!(f, "dict{{{},{}}}", key, value),
            scalar => {
                let name = SCALARS
                    .iter()
                    .find(|(_, s)| s == scalar)
                    .map_or("?", |(name, _)| name);
                f.write_str(name)
            }
        }
    }
}

impl FromStr for Shape {
    type Err = Error;

    /// Parses a full type name. Named types are not checked against any
    /// catalog; use [`Catalog::resolve`] for that.
    fn from_str(s: &str) -> Result<Self> {
        let mut parser = ShapeParser { input: s, pos: 0 };
        let shape = parser.parse_shape()?;
        if parser.pos != s.len() {
            return Err(Error::type_resolution(s));
        }
        Ok(shape)
    }
}

/// Recursive-descent parser for type names.
struct ShapeParser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> ShapeParser<'a> {
    fn fail(&self) -> Error {
        Error::type_resolution(self.input)
    }

    fn expect(&mut self, byte: u8) -> Result<()> {
        if self.input.as_bytes().get(self.pos) == Some(&byte) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.fail())
        }
    }

    fn ident(&mut self) -> Result<&'a str> {
        let start = self.pos;
        let bytes = self.input.as_bytes();
        while self.pos < bytes.len() && is_name_byte(bytes[self.pos], self.pos == start) {
            self.pos += 1;
        }
        if start == self.pos {
            return Err(self.fail());
        }
        Ok(&self.input[start..self.pos])
    }

    fn parse_shape(&mut self) -> Result<Shape> {
        let ident = self.ident()?;
        if let Some((_, shape)) = SCALARS.iter().find(|(name, _)| *name == ident) {
            return Ok(shape.clone());
        }
        let boxed = |p: &mut Self| -> Result<Box<Shape>> {
            p.expect(b'{')?;
            let inner = p.parse_shape()?;
            p.expect(b'}')?;
            Ok(Box::new(inner))
        };
        match ident {
            "option" => Ok(Shape::Option(boxed(self)?)),
            "array" => Ok(Shape::Seq(SeqKind::Array, boxed(self)?)),
            "list" => Ok(Shape::Seq(SeqKind::List, boxed(self)?)),
            "observable" => Ok(Shape::Seq(SeqKind::Observable, boxed(self)?)),
            "dict" => {
                self.expect(b'{')?;
                let key = self.parse_shape()?;
                self.expect(b',')?;
                let value = self.parse_shape()?;
                self.expect(b'}')?;
                Ok(Shape::dict(key, value))
            }
            name => Ok(Shape::Named(name.to_string())),
        }
    }
}

fn is_name_byte(b: u8, first: bool) -> bool {
    if first {
        b.is_ascii_alphabetic() || b == b'_'
    } else {
        b.is_ascii_alphanumeric() || matches!(b, b'_' | b'.' | b':')
    }
}

/// Rejects names that could collide with the grammar or with the type table.
///
/// A valid name matches `[A-Za-z_][A-Za-z0-9_.:]*` and is not one of the
/// reserved shape keywords.
pub fn validate_type_name(name: &str) -> Result<()> {
    let bytes = name.as_bytes();
    let well_formed = !bytes.is_empty()
        && bytes
            .iter()
            .enumerate()
            .all(|(i, &b)| is_name_byte(b, i == 0));
    let reserved = SCALARS.iter().any(|(n, _)| *n == name) || CONSTRUCTORS.contains(&name);
    if well_formed && !reserved {
        Ok(())
    } else {
        Err(Error::InvalidTypeName(name.to_string()))
    }
}

impl Serialize for Shape {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Shape {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

/// Whether a member can be written back.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Access {
    #[default]
    ReadWrite,
    ReadOnly,
}

/// One member of a schema.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Member {
    pub name: String,
    pub shape: Shape,
    #[serde(default)]
    pub access: Access,
    #[serde(default)]
    pub ignore: bool,
}

impl Member {
    pub fn new(name: impl Into<String>, shape: Shape) -> Self {
        Member {
            name: name.into(),
            shape,
            access: Access::ReadWrite,
            ignore: false,
        }
    }

    /// Marks the member as excluded from tracking and encoding.
    #[must_use]
    pub fn ignored(mut self) -> Self {
        self.ignore = true;
        self
    }

    /// Marks the member as having no setter.
    #[must_use]
    pub fn read_only(mut self) -> Self {
        self.access = Access::ReadOnly;
        self
    }

    /// Gettable, settable, and not ignored.
    #[must_use]
    pub fn is_eligible(&self) -> bool {
        self.access == Access::ReadWrite && !self.ignore
    }
}

/// Describes a type that can appear as a node of an object graph.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    pub name: String,
    /// The type-level opt-in marker.
    #[serde(default = "default_serializable")]
    pub serializable: bool,
    #[serde(default)]
    pub members: Vec<Member>,
}

fn default_serializable() -> bool {
    true
}

impl Schema {
    pub fn new(name: impl Into<String>) -> Self {
        Schema {
            name: name.into(),
            serializable: true,
            members: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_member(mut self, member: Member) -> Self {
        self.members.push(member);
        self
    }

    #[must_use]
    pub fn with_serializable(mut self, serializable: bool) -> Self {
        self.serializable = serializable;
        self
    }

    #[must_use]
    pub fn member(&self, name: &str) -> Option<&Member> {
        self.members.iter().find(|m| m.name == name)
    }

    /// Members that take part in tracking and encoding, in declaration order.
    pub fn eligible_members(&self) -> impl Iterator<Item = &Member> {
        self.members.iter().filter(|m| m.is_eligible())
    }
}

/// Describes an enum type by its variant names.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumSchema {
    pub name: String,
    pub variants: Vec<String>,
}

impl EnumSchema {
    pub fn new<I, S>(name: impl Into<String>, variants: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        EnumSchema {
            name: name.into(),
            variants: variants.into_iter().map(Into::into).collect(),
        }
    }

    #[must_use]
    pub fn has_variant(&self, variant: &str) -> bool {
        self.variants.iter().any(|v| v == variant)
    }
}

/// A serde-loadable list of descriptors for [`Catalog::from_descriptor`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogDescriptor {
    #[serde(default)]
    pub enums: Vec<EnumSchema>,
    #[serde(default)]
    pub schemas: Vec<Schema>,
}

#[derive(Clone, Debug)]
enum Entry {
    Object(Arc<Schema>),
    Enum(Arc<EnumSchema>),
}

/// Named types known to the host, resolved by full name.
#[derive(Clone, Debug, Default)]
pub struct Catalog {
    types: IndexMap<String, Entry>,
}

impl Catalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a catalog from a descriptor, enums first.
    ///
    /// # Errors
    ///
    /// Fails on the first invalid or duplicate type or member name.
    pub fn from_descriptor(descriptor: CatalogDescriptor) -> Result<Self> {
        let mut catalog = Catalog::new();
        for e in descriptor.enums {
            catalog.register_enum(e)?;
        }
        for schema in descriptor.schemas {
            catalog.register(schema)?;
        }
        Ok(catalog)
    }

    /// Registers an object schema and returns the shared handle nodes carry.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidTypeName`] for a name the grammar cannot carry
    /// or that is already registered, and for member names that are not
    /// plain identifiers.
    pub fn register(&mut self, schema: Schema) -> Result<Arc<Schema>> {
        self.check_new_name(&schema.name)?;
        for member in &schema.members {
            if !is_identifier(&member.name) {
                return Err(Error::InvalidTypeName(format!(
                    "{}.{}",
                    schema.name, member.name
                )));
            }
            member.shape.validate_names()?;
        }
        let schema = Arc::new(schema);
        self.types
            .insert(schema.name.clone(), Entry::Object(Arc::clone(&schema)));
        Ok(schema)
    }

    /// Registers an enum type.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidTypeName`] for an unusable or duplicate name,
    /// and for variants that are not plain identifiers. Variants are written
    /// bare, so they cannot contain segment delimiters.
    pub fn register_enum(&mut self, schema: EnumSchema) -> Result<()> {
        self.check_new_name(&schema.name)?;
        if let Some(bad) = schema.variants.iter().find(|v| !is_identifier(v)) {
            return Err(Error::InvalidTypeName(format!("{}::{}", schema.name, bad)));
        }
        self.types
            .insert(schema.name.clone(), Entry::Enum(Arc::new(schema)));
        Ok(())
    }

    fn check_new_name(&self, name: &str) -> Result<()> {
        validate_type_name(name)?;
        if self.types.contains_key(name) {
            return Err(Error::InvalidTypeName(format!("{} (duplicate)", name)));
        }
        Ok(())
    }

    #[must_use]
    pub fn schema(&self, name: &str) -> Option<&Arc<Schema>> {
        match self.types.get(name) {
            Some(Entry::Object(schema)) => Some(schema),
            _ => None,
        }
    }

    #[must_use]
    pub fn enum_schema(&self, name: &str) -> Option<&Arc<EnumSchema>> {
        match self.types.get(name) {
            Some(Entry::Enum(schema)) => Some(schema),
            _ => None,
        }
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    /// Resolves a full type name to a shape whose named parts all exist.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TypeResolution`] if the name does not parse or
    /// mentions an unregistered type.
    pub fn resolve(&self, name: &str) -> Result<Shape> {
        let shape: Shape = name.parse()?;
        shape.for_each_name(&mut |n| {
            if self.contains(n) {
                Ok(())
            } else {
                Err(Error::type_resolution(n))
            }
        })?;
        Ok(shape)
    }

    /// Allocates an empty instance of `schema` in `graph`.
    ///
    /// Enum members start at their first variant; every other member starts
    /// at its shape's default.
    pub fn instantiate(
        &self,
        graph: &mut crate::ObjectGraph,
        schema: &Arc<Schema>,
    ) -> crate::ObjectId {
        let id = graph.alloc(schema);
        for member in &schema.members {
            if let Shape::Named(name) = &member.shape {
                if let Some(first) = self.enum_schema(name).and_then(|e| e.variants.first()) {
                    graph.put(id, &member.name, Value::Enum(crate::EnumValue::new(name, first)));
                }
            }
        }
        id
    }
}

/// `[A-Za-z_][A-Za-z0-9_]*`, the form of member and variant names.
fn is_identifier(name: &str) -> bool {
    let bytes = name.as_bytes();
    !bytes.is_empty()
        && bytes
            .iter()
            .enumerate()
            .all(|(i, &b)| b == b'_' || b.is_ascii_alphabetic() || (i > 0 && b.is_ascii_digit()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_names_parse_back() {
        let shapes = [
            Shape::I32,
            Shape::option(Shape::Guid),
            Shape::list(Shape::array(Shape::String)),
            Shape::dict(Shape::String, Shape::observable(Shape::named("demo.Node"))),
            Shape::Any,
        ];
        for shape in shapes {
            let name = shape.to_string();
            assert_eq!(name.parse::<Shape>().unwrap(), shape, "{}", name);
        }
        assert_eq!(
            Shape::dict(Shape::I32, Shape::option(Shape::Bool)).to_string(),
            "dict{i32,option{bool}}"
        );
    }

    #[test]
    fn test_malformed_shape_names() {
        assert!("list{".parse::<Shape>().is_err());
        assert!("dict{i32}".parse::<Shape>().is_err());
        assert!("i32}".parse::<Shape>().is_err());
        assert!("".parse::<Shape>().is_err());
    }

    #[test]
    fn test_type_names_with_grammar_characters_rejected() {
        let mut catalog = Catalog::new();
        for bad in ["a&b", "a<b>", "x~", "[t]", "7up", "list", "i32", "a|b"] {
            assert!(
                matches!(catalog.register(Schema::new(bad)), Err(Error::InvalidTypeName(_))),
                "{}",
                bad
            );
        }
        assert!(catalog.register(Schema::new("ns::demo.Node_2")).is_ok());
        assert!(catalog.register(Schema::new("ns::demo.Node_2")).is_err());
    }

    #[test]
    fn test_enum_variants_must_be_identifiers() {
        let mut catalog = Catalog::new();
        for bad in ["A>B", "<x", "a|b", "~[3]", "", "9lives", "two words"] {
            assert!(
                matches!(
                    catalog.register_enum(EnumSchema::new("demo.Mood", ["Calm", bad])),
                    Err(Error::InvalidTypeName(name)) if name.starts_with("demo.Mood::")
                ),
                "{:?}",
                bad
            );
        }
        assert!(!catalog.contains("demo.Mood"));
        assert!(catalog
            .register_enum(EnumSchema::new("demo.Mood", ["Calm", "_Tense2"]))
            .is_ok());
    }

    #[test]
    fn test_resolve_requires_registered_names() {
        let mut catalog = Catalog::new();
        catalog
            .register_enum(EnumSchema::new("demo.Color", ["Red", "Green"]))
            .unwrap();
        assert!(catalog.resolve("list{demo.Color}").is_ok());
        assert!(matches!(
            catalog.resolve("list{demo.Missing}"),
            Err(Error::TypeResolution(name)) if name == "demo.Missing"
        ));
    }

    #[test]
    fn test_catalog_from_json_descriptor() {
        let json = r#"{
            "enums": [{ "name": "demo.Color", "variants": ["Red", "Blue"] }],
            "schemas": [{
                "name": "demo.Pixel",
                "members": [
                    { "name": "color", "shape": "demo.Color" },
                    { "name": "tags", "shape": "list{string}" },
                    { "name": "cache", "shape": "i32", "ignore": true },
                    { "name": "area", "shape": "f64", "access": "read_only" }
                ]
            }]
        }"#;
        let descriptor: CatalogDescriptor = serde_json::from_str(json).unwrap();
        let catalog = Catalog::from_descriptor(descriptor).unwrap();

        let schema = catalog.schema("demo.Pixel").unwrap();
        assert!(schema.serializable);
        let eligible: Vec<_> = schema.eligible_members().map(|m| m.name.as_str()).collect();
        assert_eq!(eligible, vec!["color", "tags"]);
        assert_eq!(schema.members[1].shape, Shape::list(Shape::String));
    }
}
