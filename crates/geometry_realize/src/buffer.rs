//! Owned and borrowed type-erased attribute columns.

use std::ops::Range;

use glam::{Vec2, Vec3};

use crate::color::{ColorGeometry4b, ColorGeometry4f};
use crate::error::AttributeError;
use crate::index_mask::IndexMask;
use crate::types::DataType;
use crate::value::{AttributeType, AttributeValue};

/// Expand `$body` once per variant of a buffer-like enum, binding the inner
/// value to `$v`.
macro_rules! dispatch {
  ($enum:ident, $value:expr, $v:ident => $body:expr) => {
    match $value {
      $enum::Bool($v) => $body,
      $enum::Int8($v) => $body,
      $enum::Int32($v) => $body,
      $enum::Float($v) => $body,
      $enum::Float2($v) => $body,
      $enum::Float3($v) => $body,
      $enum::ByteColor($v) => $body,
      $enum::Color($v) => $body,
    }
  };
}

/// Expand `$body` for two buffer-like values of the same variant, or evaluate
/// `$mismatch` when the variants differ.
macro_rules! dispatch_pair {
  ($a_enum:ident, $b_enum:ident, $a:expr, $b:expr, ($x:ident, $y:ident) => $body:expr, _ => $mismatch:expr) => {
    match ($a, $b) {
      ($a_enum::Bool($x), $b_enum::Bool($y)) => $body,
      ($a_enum::Int8($x), $b_enum::Int8($y)) => $body,
      ($a_enum::Int32($x), $b_enum::Int32($y)) => $body,
      ($a_enum::Float($x), $b_enum::Float($y)) => $body,
      ($a_enum::Float2($x), $b_enum::Float2($y)) => $body,
      ($a_enum::Float3($x), $b_enum::Float3($y)) => $body,
      ($a_enum::ByteColor($x), $b_enum::ByteColor($y)) => $body,
      ($a_enum::Color($x), $b_enum::Color($y)) => $body,
      _ => $mismatch,
    }
  };
}

pub(crate) use dispatch_pair;

/// An owned column of attribute values.
#[derive(Clone, Debug, PartialEq)]
pub enum AttributeBuffer {
  Bool(Vec<bool>),
  Int8(Vec<i8>),
  Int32(Vec<i32>),
  Float(Vec<f32>),
  Float2(Vec<Vec2>),
  Float3(Vec<Vec3>),
  ByteColor(Vec<ColorGeometry4b>),
  Color(Vec<ColorGeometry4f>),
}

/// A borrowed read-only column.
#[derive(Clone, Copy, Debug)]
pub enum GSpan<'a> {
  Bool(&'a [bool]),
  Int8(&'a [i8]),
  Int32(&'a [i32]),
  Float(&'a [f32]),
  Float2(&'a [Vec2]),
  Float3(&'a [Vec3]),
  ByteColor(&'a [ColorGeometry4b]),
  Color(&'a [ColorGeometry4f]),
}

/// A borrowed mutable column.
#[derive(Debug)]
pub enum GMutableSpan<'a> {
  Bool(&'a mut [bool]),
  Int8(&'a mut [i8]),
  Int32(&'a mut [i32]),
  Float(&'a mut [f32]),
  Float2(&'a mut [Vec2]),
  Float3(&'a mut [Vec3]),
  ByteColor(&'a mut [ColorGeometry4b]),
  Color(&'a mut [ColorGeometry4f]),
}

impl AttributeBuffer {
  /// `len` copies of the type default.
  pub fn new_default(data_type: DataType, len: usize) -> Self {
    crate::with_attribute_type!(data_type, T => T::into_buffer(vec![T::default(); len]))
  }

  /// `len` copies of `value`.
  pub fn new_filled(value: AttributeValue, len: usize) -> Self {
    let mut buffer = Self::new_default(value.data_type(), len);
    buffer.as_mut_span().fill(&value);
    buffer
  }

  #[inline]
  pub fn from_vec<T: AttributeType>(values: Vec<T>) -> Self {
    T::into_buffer(values)
  }

  pub fn data_type(&self) -> DataType {
    self.as_span().data_type()
  }

  #[inline]
  pub fn len(&self) -> usize {
    dispatch!(AttributeBuffer, self, v => v.len())
  }

  #[inline]
  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// Read one element. Panics when out of range.
  #[inline]
  pub fn get(&self, index: usize) -> AttributeValue {
    self.as_span().get(index)
  }

  /// Write one element, rejecting values of another type.
  pub fn set(&mut self, index: usize, value: &AttributeValue) -> Result<(), AttributeError> {
    self.as_mut_span().set(index, value)
  }

  #[inline]
  pub fn typed<T: AttributeType>(&self) -> Option<&[T]> {
    T::slice(self)
  }

  #[inline]
  pub fn typed_mut<T: AttributeType>(&mut self) -> Option<&mut [T]> {
    T::slice_mut(self)
  }

  pub fn as_span(&self) -> GSpan<'_> {
    match self {
      AttributeBuffer::Bool(v) => GSpan::Bool(v),
      AttributeBuffer::Int8(v) => GSpan::Int8(v),
      AttributeBuffer::Int32(v) => GSpan::Int32(v),
      AttributeBuffer::Float(v) => GSpan::Float(v),
      AttributeBuffer::Float2(v) => GSpan::Float2(v),
      AttributeBuffer::Float3(v) => GSpan::Float3(v),
      AttributeBuffer::ByteColor(v) => GSpan::ByteColor(v),
      AttributeBuffer::Color(v) => GSpan::Color(v),
    }
  }

  pub fn as_mut_span(&mut self) -> GMutableSpan<'_> {
    match self {
      AttributeBuffer::Bool(v) => GMutableSpan::Bool(v),
      AttributeBuffer::Int8(v) => GMutableSpan::Int8(v),
      AttributeBuffer::Int32(v) => GMutableSpan::Int32(v),
      AttributeBuffer::Float(v) => GMutableSpan::Float(v),
      AttributeBuffer::Float2(v) => GMutableSpan::Float2(v),
      AttributeBuffer::Float3(v) => GMutableSpan::Float3(v),
      AttributeBuffer::ByteColor(v) => GMutableSpan::ByteColor(v),
      AttributeBuffer::Color(v) => GMutableSpan::Color(v),
    }
  }

  /// Grow with type defaults or truncate to `len`.
  pub fn resize(&mut self, len: usize) {
    dispatch!(AttributeBuffer, self, v => v.resize(len, Default::default()))
  }

  /// Copy the elements selected by `mask` into a new compact buffer.
  pub fn gather(&self, mask: &IndexMask) -> AttributeBuffer {
    dispatch!(AttributeBuffer, self, v => mask.iter().map(|i| v[i]).collect::<Vec<_>>().into())
  }
}

macro_rules! impl_from_vec {
  ($($ty:ty),*) => {
    $(
      impl From<Vec<$ty>> for AttributeBuffer {
        #[inline]
        fn from(values: Vec<$ty>) -> Self {
          <$ty as AttributeType>::into_buffer(values)
        }
      }
    )*
  };
}

impl_from_vec!(bool, i8, i32, f32, Vec2, Vec3, ColorGeometry4b, ColorGeometry4f);

impl<'a> GSpan<'a> {
  pub fn data_type(&self) -> DataType {
    match self {
      GSpan::Bool(_) => DataType::Bool,
      GSpan::Int8(_) => DataType::Int8,
      GSpan::Int32(_) => DataType::Int32,
      GSpan::Float(_) => DataType::Float,
      GSpan::Float2(_) => DataType::Float2,
      GSpan::Float3(_) => DataType::Float3,
      GSpan::ByteColor(_) => DataType::ByteColor,
      GSpan::Color(_) => DataType::Color,
    }
  }

  #[inline]
  pub fn len(&self) -> usize {
    dispatch!(GSpan, self, v => v.len())
  }

  #[inline]
  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  #[inline]
  pub fn get(&self, index: usize) -> AttributeValue {
    dispatch!(GSpan, self, v => v[index].into_value())
  }

  pub fn slice(self, range: Range<usize>) -> GSpan<'a> {
    match self {
      GSpan::Bool(v) => GSpan::Bool(&v[range]),
      GSpan::Int8(v) => GSpan::Int8(&v[range]),
      GSpan::Int32(v) => GSpan::Int32(&v[range]),
      GSpan::Float(v) => GSpan::Float(&v[range]),
      GSpan::Float2(v) => GSpan::Float2(&v[range]),
      GSpan::Float3(v) => GSpan::Float3(&v[range]),
      GSpan::ByteColor(v) => GSpan::ByteColor(&v[range]),
      GSpan::Color(v) => GSpan::Color(&v[range]),
    }
  }

  pub fn to_buffer(&self) -> AttributeBuffer {
    dispatch!(GSpan, self, v => v.to_vec().into())
  }
}

impl<'a> GMutableSpan<'a> {
  pub fn data_type(&self) -> DataType {
    match self {
      GMutableSpan::Bool(_) => DataType::Bool,
      GMutableSpan::Int8(_) => DataType::Int8,
      GMutableSpan::Int32(_) => DataType::Int32,
      GMutableSpan::Float(_) => DataType::Float,
      GMutableSpan::Float2(_) => DataType::Float2,
      GMutableSpan::Float3(_) => DataType::Float3,
      GMutableSpan::ByteColor(_) => DataType::ByteColor,
      GMutableSpan::Color(_) => DataType::Color,
    }
  }

  #[inline]
  pub fn len(&self) -> usize {
    dispatch!(GMutableSpan, self, v => v.len())
  }

  #[inline]
  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  #[inline]
  pub fn get(&self, index: usize) -> AttributeValue {
    dispatch!(GMutableSpan, self, v => v[index].into_value())
  }

  /// Shorter-lived reborrow, so the span can be passed on and used again.
  pub fn reborrow(&mut self) -> GMutableSpan<'_> {
    match self {
      GMutableSpan::Bool(v) => GMutableSpan::Bool(v),
      GMutableSpan::Int8(v) => GMutableSpan::Int8(v),
      GMutableSpan::Int32(v) => GMutableSpan::Int32(v),
      GMutableSpan::Float(v) => GMutableSpan::Float(v),
      GMutableSpan::Float2(v) => GMutableSpan::Float2(v),
      GMutableSpan::Float3(v) => GMutableSpan::Float3(v),
      GMutableSpan::ByteColor(v) => GMutableSpan::ByteColor(v),
      GMutableSpan::Color(v) => GMutableSpan::Color(v),
    }
  }

  pub fn as_span(&self) -> GSpan<'_> {
    match self {
      GMutableSpan::Bool(v) => GSpan::Bool(v),
      GMutableSpan::Int8(v) => GSpan::Int8(v),
      GMutableSpan::Int32(v) => GSpan::Int32(v),
      GMutableSpan::Float(v) => GSpan::Float(v),
      GMutableSpan::Float2(v) => GSpan::Float2(v),
      GMutableSpan::Float3(v) => GSpan::Float3(v),
      GMutableSpan::ByteColor(v) => GSpan::ByteColor(v),
      GMutableSpan::Color(v) => GSpan::Color(v),
    }
  }

  pub fn set(&mut self, index: usize, value: &AttributeValue) -> Result<(), AttributeError> {
    let expected = self.data_type();
    dispatch!(GMutableSpan, self, v => {
      match AttributeType::from_value(value) {
        Some(value) => {
          v[index] = value;
          Ok(())
        }
        None => Err(AttributeError::TypeMismatch { expected, actual: value.data_type() }),
      }
    })
  }

  /// Fill every element with `value`. Values of another type are ignored.
  pub fn fill(&mut self, value: &AttributeValue) {
    debug_assert_eq!(self.data_type(), value.data_type());
    dispatch!(GMutableSpan, self, v => {
      if let Some(value) = AttributeType::from_value(value) {
        v.fill(value);
      }
    })
  }

  /// Copy all of `src` into this span. Both must have the same type and
  /// length.
  pub fn copy_from(&mut self, src: GSpan<'_>) -> Result<(), AttributeError> {
    let (expected, actual) = (self.data_type(), src.data_type());
    dispatch_pair!(GMutableSpan, GSpan, self, src, (dst, src) => {
      if dst.len() != src.len() {
        return Err(AttributeError::SizeMismatch { expected: dst.len(), actual: src.len() });
      }
      dst.copy_from_slice(src);
      Ok(())
    }, _ => Err(AttributeError::TypeMismatch { expected, actual }))
  }

  /// Split into consecutive disjoint spans with the given lengths.
  ///
  /// The lengths must not add up to more than the span length. Any remainder
  /// is dropped.
  pub fn split_lengths(self, lengths: impl IntoIterator<Item = usize>) -> Vec<GMutableSpan<'a>> {
    fn split_typed<'a, T>(
      mut rest: &'a mut [T],
      lengths: impl IntoIterator<Item = usize>,
      wrap: fn(&'a mut [T]) -> GMutableSpan<'a>,
    ) -> Vec<GMutableSpan<'a>> {
      let mut parts = Vec::new();
      for len in lengths {
        let (head, tail) = std::mem::take(&mut rest).split_at_mut(len);
        parts.push(wrap(head));
        rest = tail;
      }
      parts
    }

    match self {
      GMutableSpan::Bool(v) => split_typed(v, lengths, GMutableSpan::Bool),
      GMutableSpan::Int8(v) => split_typed(v, lengths, GMutableSpan::Int8),
      GMutableSpan::Int32(v) => split_typed(v, lengths, GMutableSpan::Int32),
      GMutableSpan::Float(v) => split_typed(v, lengths, GMutableSpan::Float),
      GMutableSpan::Float2(v) => split_typed(v, lengths, GMutableSpan::Float2),
      GMutableSpan::Float3(v) => split_typed(v, lengths, GMutableSpan::Float3),
      GMutableSpan::ByteColor(v) => split_typed(v, lengths, GMutableSpan::ByteColor),
      GMutableSpan::Color(v) => split_typed(v, lengths, GMutableSpan::Color),
    }
  }
}

#[cfg(test)]
#[path = "buffer_test.rs"]
mod buffer_test;
