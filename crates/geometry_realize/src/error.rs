//! Error types for the mutable attribute surface.

use thiserror::Error;

use crate::types::{DataType, Domain};

/// Failure of an attribute mutation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AttributeError {
  #[error("attribute name must not be empty")]
  EmptyName,

  #[error("attribute `{0}` already exists")]
  AlreadyExists(String),

  #[error("attribute `{0}` does not exist")]
  NotFound(String),

  #[error("builtin attribute `{name}` must be {domain} {data_type}")]
  BuiltinMismatch {
    name: String,
    domain: Domain,
    data_type: DataType,
  },

  #[error("builtin attribute `{0}` is required and cannot be removed")]
  RequiredBuiltin(String),

  #[error("domain {0} is not supported by this geometry")]
  UnsupportedDomain(Domain),

  #[error("expected {expected} elements, got {actual}")]
  SizeMismatch { expected: usize, actual: usize },

  #[error("expected {expected} values, got {actual}")]
  TypeMismatch { expected: DataType, actual: DataType },

  #[error("no implicit conversion from {from} to {to}")]
  NotConvertible { from: DataType, to: DataType },
}
