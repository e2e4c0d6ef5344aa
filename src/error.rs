//! Error types for graph serialization and deserialization.
//!
//! Every failure is fatal for the call that raised it. A malformed document
//! never yields a partially filled graph, since a half-built cyclic graph
//! cannot be handed back safely.
//!
//! ## Error Categories
//!
//! - **Header errors**: bad flags or a bad length prefix
//! - **Syntax errors**: malformed object bodies, with the character offset
//! - **Resolution errors**: unknown type tokens and dangling `ref` ids
//! - **Shape errors**: values the codec has no rule for
//!
//! ## Examples
//!
//! ```rust
//! use refwire::{Catalog, Engine, Error};
//!
//! let engine = Engine::new(Catalog::new());
//! let result = engine.deserialize("x-");
//! assert!(matches!(result, Err(Error::MalformedHeader(_))));
//! ```

use std::fmt;
use thiserror::Error;

/// Represents all possible errors that can occur while encoding or decoding.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// The two flag characters or a length prefix could not be read
    #[error("Malformed header: {0}")]
    MalformedHeader(String),

    /// An object body did not follow the grammar
    #[error("Syntax error at offset {pos}: {msg}")]
    Syntax { pos: usize, msg: String },

    /// A type token resolved to no known type
    #[error("Cannot resolve type '{0}'")]
    TypeResolution(String),

    /// A `ref` token named an id with no registered object
    #[error("Unresolved reference to object id {0}")]
    UnresolvedReference(usize),

    /// A value or member type the codec has no rule for
    #[error("Unsupported shape: {0}")]
    UnsupportedShape(String),

    /// A decoded value does not fit the declared member shape
    #[error("Type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },

    /// A type name that collides with the grammar's structural characters
    #[error("Invalid type name '{0}'")]
    InvalidTypeName(String),

    /// The base64 transport wrapper could not be decoded
    #[error("Base64 error: {0}")]
    Base64(String),

    /// IO error during reading or writing
    #[error("IO error: {0}")]
    Io(String),

    /// Custom error
    #[error("Error: {0}")]
    Custom(String),
}

impl Error {
    /// Creates a header error.
    pub fn malformed_header(msg: &str) -> Self {
        Error::MalformedHeader(msg.to_string())
    }

    /// Creates a syntax error at the given character offset of the body.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use refwire::Error;
    ///
    /// let err = Error::syntax(12, "expected '<'");
    /// assert!(err.to_string().contains("offset 12"));
    /// ```
    pub fn syntax(pos: usize, msg: &str) -> Self {
        Error::Syntax {
            pos,
            msg: msg.to_string(),
        }
    }

    /// Moves a syntax error's offset from a nested slice into its parent.
    #[must_use]
    pub(crate) fn shifted(self, base: usize) -> Self {
        match self {
            Error::Syntax { pos, msg } => Error::Syntax {
                pos: pos + base,
                msg,
            },
            other => other,
        }
    }

    /// Creates a type resolution error for a token that names no known type.
    pub fn type_resolution(token: &str) -> Self {
        Error::TypeResolution(token.to_string())
    }

    /// Creates an unsupported shape error.
    pub fn unsupported_shape(msg: &str) -> Self {
        Error::UnsupportedShape(msg.to_string())
    }

    /// Creates a type mismatch error.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use refwire::Error;
    ///
    /// let err = Error::type_mismatch("i32", "string");
    /// assert!(err.to_string().contains("expected i32"));
    /// ```
    pub fn type_mismatch(expected: &str, found: &str) -> Self {
        Error::TypeMismatch {
            expected: expected.to_string(),
            found: found.to_string(),
        }
    }

    /// Creates a custom error with a display message.
    pub fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::Custom(msg.to_string())
    }

    /// Creates an I/O error for reading/writing failures.
    pub fn io(msg: &str) -> Self {
        Error::Io(msg.to_string())
    }
}

impl From<base64::DecodeError> for Error {
    fn from(err: base64::DecodeError) -> Self {
        Error::Base64(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
