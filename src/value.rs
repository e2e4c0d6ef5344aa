//! Dynamic values held by graph objects.
//!
//! [`Value`] is what a member slot of an [`ObjectGraph`](crate::ObjectGraph)
//! node contains: a scalar, a string, a collection, or a reference to another
//! node by [`ObjectId`]. References are arena indices, so shared and cyclic
//! structure needs no owning pointers.
//!
//! ## Scalars
//!
//! Besides the primitive numbers, the codec carries a few host scalars:
//!
//! - [`Decimal`]: an arbitrary-precision mantissa with a decimal scale
//! - [`Guid`]: 16 bytes, written in hyphenated hex
//! - `DateTime<Utc>` and `chrono::Duration`
//! - [`EnumValue`]: a variant of a catalog-registered enum
//!
//! ## Examples
//!
//! ```rust
//! use refwire::{Decimal, Value};
//!
//! let price = Value::from("19.99".parse::<Decimal>().unwrap());
//! assert_eq!(price.kind_name(), "decimal");
//!
//! let count = Value::from(42);
//! assert_eq!(count.as_i64(), Some(42));
//! ```

use crate::{Error, ObjectGraph, ObjectId, SeqKind, Shape};
use chrono::{DateTime, Duration, Utc};
use num_bigint::{BigInt, Sign};
use std::fmt;
use std::str::FromStr;

/// A dynamically-typed member value.
#[derive(Clone, Debug, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
    Decimal(Decimal),
    String(String),
    DateTime(DateTime<Utc>),
    Duration(Duration),
    Guid(Guid),
    Enum(EnumValue),
    Seq(Sequence),
    Dict(Dictionary),
    Object(ObjectId),
}

impl Value {
    /// Short name of the value's kind, used in error messages.
    #[must_use]
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::I8(_) => "i8",
            Value::I16(_) => "i16",
            Value::I32(_) => "i32",
            Value::I64(_) => "i64",
            Value::U8(_) => "u8",
            Value::U16(_) => "u16",
            Value::U32(_) => "u32",
            Value::U64(_) => "u64",
            Value::F32(_) => "f32",
            Value::F64(_) => "f64",
            Value::Decimal(_) => "decimal",
            Value::String(_) => "string",
            Value::DateTime(_) => "datetime",
            Value::Duration(_) => "duration",
            Value::Guid(_) => "guid",
            Value::Enum(_) => "enum",
            Value::Seq(_) => "sequence",
            Value::Dict(_) => "dictionary",
            Value::Object(_) => "object",
        }
    }

    /// The full shape of this value, which is the type name written to the wire.
    ///
    /// Returns `None` for `Null` and for object ids the graph does not hold.
    #[must_use]
    pub fn shape(&self, graph: &ObjectGraph) -> Option<Shape> {
        let shape = match self {
            Value::Null => return None,
            Value::Bool(_) => Shape::Bool,
            Value::I8(_) => Shape::I8,
            Value::I16(_) => Shape::I16,
            Value::I32(_) => Shape::I32,
            Value::I64(_) => Shape::I64,
            Value::U8(_) => Shape::U8,
            Value::U16(_) => Shape::U16,
            Value::U32(_) => Shape::U32,
            Value::U64(_) => Shape::U64,
            Value::F32(_) => Shape::F32,
            Value::F64(_) => Shape::F64,
            Value::Decimal(_) => Shape::Decimal,
            Value::String(_) => Shape::String,
            Value::DateTime(_) => Shape::DateTime,
            Value::Duration(_) => Shape::Duration,
            Value::Guid(_) => Shape::Guid,
            Value::Enum(e) => Shape::Named(e.type_name.clone()),
            Value::Seq(s) => s.shape(),
            Value::Dict(d) => d.shape(),
            Value::Object(id) => Shape::Named(graph.type_name(*id)?.to_string()),
        };
        Some(shape)
    }

    #[inline]
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns any integer value that fits in an `i64`.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Value::I8(v) => Some(v.into()),
            Value::I16(v) => Some(v.into()),
            Value::I32(v) => Some(v.into()),
            Value::I64(v) => Some(v),
            Value::U8(v) => Some(v.into()),
            Value::U16(v) => Some(v.into()),
            Value::U32(v) => Some(v.into()),
            Value::U64(v) => i64::try_from(v).ok(),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Value::F32(v) => Some(v.into()),
            Value::F64(v) => Some(v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_object(&self) -> Option<ObjectId> {
        match self {
            Value::Object(id) => Some(*id),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_seq(&self) -> Option<&Sequence> {
        match self {
            Value::Seq(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_dict(&self) -> Option<&Dictionary> {
        match self {
            Value::Dict(d) => Some(d),
            _ => None,
        }
    }
}

macro_rules! impl_from_scalar {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$variant(v)
                }
            }
        )*
    };
}

impl_from_scalar! {
    bool => Bool,
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    f32 => F32,
    f64 => F64,
    Decimal => Decimal,
    String => String,
    DateTime<Utc> => DateTime,
    Duration => Duration,
    Guid => Guid,
    EnumValue => Enum,
    Sequence => Seq,
    Dictionary => Dict,
    ObjectId => Object,
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map_or(Value::Null, Into::into)
    }
}

/// A fixed-point decimal: `mantissa * 10^-scale`.
///
/// The scale is preserved through a round trip, so `1.50` stays `1.50`.
///
/// # Examples
///
/// ```rust
/// use refwire::Decimal;
///
/// let d = Decimal::new(-1250, 3);
/// assert_eq!(d.to_string(), "-1.250");
/// assert_eq!("-1.250".parse::<Decimal>().unwrap(), d);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, Default)]
pub struct Decimal {
    mantissa: BigInt,
    scale: u32,
}

impl Decimal {
    pub fn new(mantissa: impl Into<BigInt>, scale: u32) -> Self {
        Decimal {
            mantissa: mantissa.into(),
            scale,
        }
    }

    #[must_use]
    pub fn mantissa(&self) -> &BigInt {
        &self.mantissa
    }

    #[must_use]
    pub const fn scale(&self) -> u32 {
        self.scale
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.mantissa.sign() == Sign::Minus {
            f.write_str("-")?;
        }
        let digits = self.mantissa.magnitude().to_string();
        let scale = self.scale as usize;
        if scale == 0 {
            return f.write_str(&digits);
        }
        let padded = if digits.len() <= scale {
            format!("{}{}", "0".repeat(scale + 1 - digits.len()), digits)
        } else {
            digits
        };
        let (int, frac) = padded.split_at(padded.len() - scale);
        write!(f, "{}.{}", int, frac)
    }
}

impl FromStr for Decimal {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || Error::custom(format!("invalid decimal '{}'", s));
        let (negative, unsigned) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s),
        };
        let (int, frac) = unsigned.split_once('.').unwrap_or((unsigned, ""));
        let all_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
        if int.is_empty() || !all_digits(int) || !all_digits(frac) {
            return Err(invalid());
        }
        if unsigned.contains('.') && frac.is_empty() {
            return Err(invalid());
        }

        let mut digits = String::with_capacity(int.len() + frac.len() + 1);
        if negative {
            digits.push('-');
        }
        digits.push_str(int);
        digits.push_str(frac);
        let mantissa = BigInt::from_str(&digits).map_err(|_| invalid())?;
        let scale = u32::try_from(frac.len()).map_err(|_| invalid())?;
        Ok(Decimal { mantissa, scale })
    }
}

/// A 128-bit globally unique identifier.
///
/// # Examples
///
/// ```rust
/// use refwire::Guid;
///
/// let g = Guid::from_u128(0x0123_4567_89ab_cdef_0123_4567_89ab_cdef);
/// assert_eq!(g.to_string(), "01234567-89ab-cdef-0123-456789abcdef");
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Guid([u8; 16]);

impl Guid {
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Guid(bytes)
    }

    #[must_use]
    pub const fn from_u128(v: u128) -> Self {
        Guid(v.to_be_bytes())
    }

    #[must_use]
    pub const fn nil() -> Self {
        Guid([0; 16])
    }

    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }
}

impl fmt::Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, byte) in self.0.iter().enumerate() {
            if matches!(i, 4 | 6 | 8 | 10) {
                f.write_str("-")?;
            }
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

impl FromStr for Guid {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || Error::custom(format!("invalid guid '{}'", s));
        let bytes = s.as_bytes();
        if bytes.len() != 36 || [8, 13, 18, 23].iter().any(|&i| bytes[i] != b'-') {
            return Err(invalid());
        }
        let hex: String = s.chars().filter(|&c| c != '-').collect();
        if hex.len() != 32 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(invalid());
        }
        let mut out = [0u8; 16];
        for (i, slot) in out.iter_mut().enumerate() {
            *slot = u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16).map_err(|_| invalid())?;
        }
        Ok(Guid(out))
    }
}

/// A variant of a catalog-registered enum type.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct EnumValue {
    pub type_name: String,
    pub variant: String,
}

impl EnumValue {
    pub fn new(type_name: impl Into<String>, variant: impl Into<String>) -> Self {
        EnumValue {
            type_name: type_name.into(),
            variant: variant.into(),
        }
    }
}

/// An ordered collection: array, list, or observable collection.
///
/// The element shape is part of the collection's type name, so an empty
/// list still knows what it holds.
#[derive(Clone, Debug, PartialEq)]
pub struct Sequence {
    pub kind: SeqKind,
    pub element: Shape,
    pub items: Vec<Value>,
}

impl Sequence {
    pub fn new(kind: SeqKind, element: Shape, items: Vec<Value>) -> Self {
        Sequence {
            kind,
            element,
            items,
        }
    }

    pub fn array(element: Shape, items: Vec<Value>) -> Self {
        Self::new(SeqKind::Array, element, items)
    }

    pub fn list(element: Shape, items: Vec<Value>) -> Self {
        Self::new(SeqKind::List, element, items)
    }

    pub fn observable(element: Shape, items: Vec<Value>) -> Self {
        Self::new(SeqKind::Observable, element, items)
    }

    #[must_use]
    pub fn shape(&self) -> Shape {
        Shape::Seq(self.kind, Box::new(self.element.clone()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// An ordered key-value collection.
///
/// Entries keep insertion order; on the wire each entry is addressed by its
/// position, not its key, so keys may be any value shape.
#[derive(Clone, Debug, PartialEq)]
pub struct Dictionary {
    pub key: Shape,
    pub value: Shape,
    pub entries: Vec<(Value, Value)>,
}

impl Dictionary {
    pub fn new(key: Shape, value: Shape) -> Self {
        Dictionary {
            key,
            value,
            entries: Vec::new(),
        }
    }

    /// Appends an entry, replacing the value of an equal key in place.
    pub fn insert(&mut self, key: Value, value: Value) -> Option<Value> {
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    #[must_use]
    pub fn with_entry(mut self, key: impl Into<Value>, value: impl Into<Value>) -> Self {
        self.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn get(&self, key: &Value) -> Option<&Value> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    #[must_use]
    pub fn shape(&self) -> Shape {
        Shape::Dict(Box::new(self.key.clone()), Box::new(self.value.clone()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
