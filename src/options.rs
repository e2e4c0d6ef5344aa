//! Configuration options for the engine.
//!
//! [`EngineOptions`] controls three things:
//!
//! - whether shared references and cycles keep their identity, or the root is
//!   copied out as an alias-free snapshot
//! - whether type names are interned into a table or written literally
//! - whether the finished text is wrapped in base64 for transport
//!
//! ## Examples
//!
//! ```rust
//! use refwire::EngineOptions;
//!
//! let options = EngineOptions::new().with_base64(true);
//! assert!(options.preserve_aliases);
//! assert!(options.base64);
//!
//! let snapshot = EngineOptions::copy();
//! assert!(!snapshot.preserve_aliases);
//! ```

use serde::{Deserialize, Serialize};

/// Configuration options for [`Engine`](crate::Engine).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineOptions {
    /// Keep shared references and cycles as the same instance on decode.
    pub preserve_aliases: bool,
    /// Intern type names into a table and refer to them by index.
    pub type_table: bool,
    /// Wrap the wire text in standard base64.
    pub base64: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        EngineOptions {
            preserve_aliases: true,
            type_table: true,
            base64: false,
        }
    }
}

impl EngineOptions {
    /// Creates default options (aliases preserved, type table on, no base64).
    ///
    /// # Examples
    ///
    /// ```rust
    /// use refwire::EngineOptions;
    ///
    /// let options = EngineOptions::new();
    /// assert!(options.type_table);
    /// assert!(!options.base64);
    /// ```
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates options for copy mode.
    ///
    /// The root is left out of the reference table and acyclic sharing is
    /// re-inlined, so the decoded graph shares no instances that were merely
    /// aliased in the source.
    #[must_use]
    pub fn copy() -> Self {
        EngineOptions {
            preserve_aliases: false,
            ..Default::default()
        }
    }

    /// Sets whether aliases are preserved.
    #[must_use]
    pub fn with_preserve_aliases(mut self, preserve: bool) -> Self {
        self.preserve_aliases = preserve;
        self
    }

    /// Sets whether type names are interned into a table.
    ///
    /// With the table off every type token is the literal type name.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use refwire::{Catalog, Engine, EngineOptions, ObjectGraph, Value};
    ///
    /// let options = EngineOptions::new().with_type_table(false);
    /// let engine = Engine::with_options(Catalog::new(), options);
    /// let text = engine.serialize_value(&ObjectGraph::new(), &Value::I32(7)).unwrap();
    /// assert_eq!(text, "--(i32)7");
    /// ```
    #[must_use]
    pub fn with_type_table(mut self, enabled: bool) -> Self {
        self.type_table = enabled;
        self
    }

    /// Sets whether the output is base64-wrapped.
    #[must_use]
    pub fn with_base64(mut self, enabled: bool) -> Self {
        self.base64 = enabled;
        self
    }
}
