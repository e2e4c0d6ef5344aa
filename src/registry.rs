//! Per-session type table.
//!
//! The encoder interns every full type name it writes and refers to it by
//! position; the decoder rebuilds the same table from the document header.
//! Position order is insertion order, so both sides agree on every index.

use crate::{Catalog, Result, Shape};
use indexmap::IndexSet;

#[derive(Debug, Default)]
pub struct TypeRegistry {
    names: IndexSet<String>,
}

impl TypeRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the id of `shape`'s full name, appending it if unseen.
    pub fn intern(&mut self, shape: &Shape) -> usize {
        let (index, _) = self.names.insert_full(shape.to_string());
        index
    }

    /// The token written inside `( )` for `shape`.
    ///
    /// With the table disabled the literal type name is written instead.
    pub fn token(&mut self, shape: &Shape, use_table: bool) -> String {
        if use_table {
            self.intern(shape).to_string()
        } else {
            shape.to_string()
        }
    }

    /// Resolves a token: a valid table index first, then a literal name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TypeResolution`](crate::Error::TypeResolution) if the
    /// literal name does not resolve through the catalog.
    pub fn resolve(&self, token: &str, catalog: &Catalog) -> Result<Shape> {
        let name = token
            .parse::<usize>()
            .ok()
            .and_then(|index| self.names.get_index(index))
            .map_or(token, String::as_str);
        catalog.resolve(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// The `&`-joined table text.
    #[must_use]
    pub fn to_wire(&self) -> String {
        self.names.iter().map(String::as_str).collect::<Vec<_>>().join("&")
    }

    /// Restores a table from its `&`-joined text.
    #[must_use]
    pub fn from_wire(text: &str) -> Self {
        let names = if text.is_empty() {
            IndexSet::new()
        } else {
            text.split('&').map(str::to_string).collect()
        };
        TypeRegistry { names }
    }
}
