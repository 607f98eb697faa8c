//! Core attribute meta data: element types, element domains and their
//! ordering rules.

use std::fmt;

/// Element type of an attribute column.
///
/// Declared in complexity order, so the derived `Ord` matches the order used
/// when attributes with the same id but different types are merged.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DataType {
  Bool,
  Int8,
  Int32,
  Float,
  Float2,
  Float3,
  /// Sparse 8-bit per channel color, sRGB encoded.
  ByteColor,
  /// Linear 32-bit float color.
  Color,
}

impl DataType {
  /// All supported types, lowest complexity first.
  pub const ALL: [DataType; 8] = [
    DataType::Bool,
    DataType::Int8,
    DataType::Int32,
    DataType::Float,
    DataType::Float2,
    DataType::Float3,
    DataType::ByteColor,
    DataType::Color,
  ];

  /// Rank of this type in the complexity order.
  #[inline]
  pub fn complexity(self) -> u8 {
    self as u8
  }

  pub fn name(self) -> &'static str {
    match self {
      DataType::Bool => "bool",
      DataType::Int8 => "int8",
      DataType::Int32 => "int32",
      DataType::Float => "float",
      DataType::Float2 => "float2",
      DataType::Float3 => "float3",
      DataType::ByteColor => "byte_color",
      DataType::Color => "color",
    }
  }
}

impl fmt::Display for DataType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name())
  }
}

/// Element kind an attribute is defined over.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Domain {
  Point,
  Edge,
  /// Mesh polygon.
  Face,
  /// Mesh face corner (loop).
  Corner,
  Curve,
  Instance,
}

impl Domain {
  pub const ALL: [Domain; 6] = [
    Domain::Point,
    Domain::Edge,
    Domain::Face,
    Domain::Corner,
    Domain::Curve,
    Domain::Instance,
  ];

  /// Rank used when the same attribute lives on different domains in
  /// different sources. Higher wins.
  #[inline]
  pub fn priority(self) -> u8 {
    match self {
      Domain::Instance => 0,
      Domain::Curve => 1,
      Domain::Face => 2,
      Domain::Edge => 3,
      Domain::Point => 4,
      Domain::Corner => 5,
    }
  }

  #[inline]
  pub(crate) fn index(self) -> usize {
    self as usize
  }

  pub fn name(self) -> &'static str {
    match self {
      Domain::Point => "point",
      Domain::Edge => "edge",
      Domain::Face => "face",
      Domain::Corner => "corner",
      Domain::Curve => "curve",
      Domain::Instance => "instance",
    }
  }
}

impl fmt::Display for Domain {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name())
  }
}

/// Domain and type of a stored attribute.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct AttributeMetaData {
  pub domain: Domain,
  pub data_type: DataType,
}

impl AttributeMetaData {
  #[inline]
  pub const fn new(domain: Domain, data_type: DataType) -> Self {
    Self { domain, data_type }
  }
}

/// Same shape as [`AttributeMetaData`], used for the merged schema of a
/// realize pass.
pub type AttributeKind = AttributeMetaData;

/// Pick the type that can represent all of `data_types` with the least loss.
///
/// Returns `None` for an empty input.
pub fn attribute_data_type_highest_complexity(
  data_types: impl IntoIterator<Item = DataType>,
) -> Option<DataType> {
  data_types.into_iter().max_by_key(|data_type| data_type.complexity())
}

/// Pick the domain that keeps the most detail among `domains`.
///
/// Returns `None` for an empty input.
pub fn attribute_domain_highest_priority(
  domains: impl IntoIterator<Item = Domain>,
) -> Option<Domain> {
  domains.into_iter().max_by_key(|domain| domain.priority())
}

#[cfg(test)]
#[path = "types_test.rs"]
mod types_test;
