//!
//! Model, field and filter core of nodeedge.
//!
//! ```text
//! ModelSchema --bind--> ModelClass --field()--> ModelField (handle) --equal/in_/..--> Filter
//!                           |                        |                                  |
//!                      instantiate                  >>                                 & |
//!                           |                        |                                  |
//!                     ModelInstance              PathNode                    Compositable<Filter>
//!                   (Arc<dyn Field>)                                                    |
//!                                                                         map_composition(listener)
//! ```
//!
//! Every value holding type in this crate is immutable from the outside:
//! "mutating" operations return a modified copy produced by the cloning
//! protocol in [`clone`].
//!

extern crate self as nodeedge;

pub use nodeedge_macros::*;

pub mod backends;
pub mod clone;
pub mod config;
pub mod datetime;
pub mod field;
pub mod filter;
pub mod logic;
pub mod lookup;
pub mod model;
pub mod path;
pub mod prelude;
pub mod ty;
pub mod value;

pub use config::Configuration;
pub use model::Model;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum NodeEdgeError {
    /// Wrong operand or value type for an operation.
    #[error("{0}")]
    Type(String),

    /// A value failed the format or range rule of a field kind.
    #[error("{0}")]
    Value(String),

    #[error("{model} has no field '{field}'")]
    UnknownField { model: String, field: String },

    /// Aggregated per-field validation errors of one model.
    #[error("{} validation error(s) for {model}: {errors}", .errors.len())]
    Validation { model: String, errors: FieldErrors },

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Not implemented: {0}")]
    NotImplemented(&'static str),
}

impl NodeEdgeError {
    /// Path and composition policy violations, as opposed to
    /// structural type mismatches.
    pub fn is_domain_error(&self) -> bool {
        matches!(self, Self::Domain(_))
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Path not allowed: {0}")]
    NotAllowedPath(String),

    #[error("Composition not allowed: {0}")]
    NotAllowedComposition(String),

    #[error("Invalid composited type: {0}")]
    InvalidCompositedType(String),
}

/// Per-field errors, in field declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldErrors(pub Vec<(String, NodeEdgeError)>);

impl FieldErrors {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&NodeEdgeError> {
        self.0
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, error)| error)
    }
}

impl std::fmt::Display for FieldErrors {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
        for (index, (field, error)) in self.0.iter().enumerate() {
            if index > 0 {
                write!(fmt, "; ")?;
            }
            write!(fmt, "{}: {}", field, error)?;
        }
        Ok(())
    }
}

pub type NodeEdgeResult<T> = Result<T, NodeEdgeError>;
