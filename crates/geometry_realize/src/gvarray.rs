//! Generic virtual arrays: a column of values of one runtime type, read
//! through a common interface regardless of how it is stored.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::buffer::{dispatch_pair, AttributeBuffer, GMutableSpan, GSpan};
use crate::conversions::ConversionFunctions;
use crate::error::AttributeError;
use crate::index_mask::IndexMask;
use crate::types::DataType;
use crate::value::{AttributeType, AttributeValue};

type ElementFn = dyn Fn(usize) -> AttributeValue + Send + Sync;

/// Read-only type-erased array.
///
/// Cloning is cheap: dense storage is shared, not copied.
#[derive(Clone)]
pub enum GVArray {
  /// Dense shared buffer.
  Span(Arc<AttributeBuffer>),
  /// The same value repeated `len` times.
  Single { value: AttributeValue, len: usize },
  /// Values computed per index on demand.
  Func(Arc<FuncGVArray>),
  /// Another array read through a type conversion.
  Converted(Arc<ConvertedGVArray>),
}

pub struct FuncGVArray {
  data_type: DataType,
  len: usize,
  function: Box<ElementFn>,
}

/// Reads `source` and converts every element on access.
pub struct ConvertedGVArray {
  source: GVArray,
  functions: ConversionFunctions,
}

impl ConvertedGVArray {
  /// `functions` must convert from the type of `source`.
  pub fn new(source: GVArray, functions: ConversionFunctions) -> Self {
    debug_assert_eq!(source.data_type(), functions.from_type());
    debug_assert_ne!(functions.from_type(), functions.to_type());
    Self { source, functions }
  }

  pub fn source(&self) -> &GVArray {
    &self.source
  }

  #[inline]
  fn get(&self, index: usize) -> AttributeValue {
    self.functions.convert_single(&self.source.get(index))
  }

  fn materialize(&self, mask: &IndexMask, mut dst: GMutableSpan<'_>) {
    match &self.source {
      GVArray::Span(buffer) => self.functions.convert_span(buffer.as_span(), mask, dst),
      GVArray::Single { value, .. } => {
        let converted = self.functions.convert_single(value);
        for i in mask.iter() {
          let _ = dst.set(i, &converted);
        }
      }
      source => {
        let buffer = source.materialize_to_buffer();
        self.functions.convert_span(buffer.as_span(), mask, dst)
      }
    }
  }
}

impl GVArray {
  pub fn from_buffer(buffer: AttributeBuffer) -> Self {
    GVArray::Span(Arc::new(buffer))
  }

  #[inline]
  pub fn from_shared(buffer: Arc<AttributeBuffer>) -> Self {
    GVArray::Span(buffer)
  }

  pub fn from_vec<T: AttributeType>(values: Vec<T>) -> Self {
    Self::from_buffer(T::into_buffer(values))
  }

  #[inline]
  pub fn from_single(value: AttributeValue, len: usize) -> Self {
    GVArray::Single { value, len }
  }

  /// Array of `len` type defaults.
  pub fn from_default(data_type: DataType, len: usize) -> Self {
    Self::from_single(AttributeValue::default_for(data_type), len)
  }

  pub fn from_func(
    data_type: DataType,
    len: usize,
    function: impl Fn(usize) -> AttributeValue + Send + Sync + 'static,
  ) -> Self {
    GVArray::Func(Arc::new(FuncGVArray {
      data_type,
      len,
      function: Box::new(function),
    }))
  }

  #[inline]
  pub fn from_converted(converted: ConvertedGVArray) -> Self {
    GVArray::Converted(Arc::new(converted))
  }

  pub fn data_type(&self) -> DataType {
    match self {
      GVArray::Span(buffer) => buffer.data_type(),
      GVArray::Single { value, .. } => value.data_type(),
      GVArray::Func(func) => func.data_type,
      GVArray::Converted(converted) => converted.functions.to_type(),
    }
  }

  pub fn len(&self) -> usize {
    match self {
      GVArray::Span(buffer) => buffer.len(),
      GVArray::Single { len, .. } => *len,
      GVArray::Func(func) => func.len,
      GVArray::Converted(converted) => converted.source.len(),
    }
  }

  #[inline]
  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// Read one element. Panics when out of range for dense storage.
  pub fn get(&self, index: usize) -> AttributeValue {
    match self {
      GVArray::Span(buffer) => buffer.get(index),
      GVArray::Single { value, .. } => *value,
      GVArray::Func(func) => (func.function)(index),
      GVArray::Converted(converted) => converted.get(index),
    }
  }

  /// Dense view, if the array is stored densely.
  pub fn as_span(&self) -> Option<GSpan<'_>> {
    match self {
      GVArray::Span(buffer) => Some(buffer.as_span()),
      _ => None,
    }
  }

  /// The repeated value, if the array is a single value.
  pub fn as_single(&self) -> Option<AttributeValue> {
    match self {
      GVArray::Single { value, .. } => Some(*value),
      _ => None,
    }
  }

  /// True when both refer to the same storage.
  pub fn is_same(&self, other: &GVArray) -> bool {
    match (self, other) {
      (GVArray::Span(a), GVArray::Span(b)) => Arc::ptr_eq(a, b),
      (GVArray::Func(a), GVArray::Func(b)) => Arc::ptr_eq(a, b),
      (GVArray::Converted(a), GVArray::Converted(b)) => Arc::ptr_eq(a, b),
      (GVArray::Single { value: a, len: la }, GVArray::Single { value: b, len: lb }) => {
        a == b && la == lb
      }
      _ => false,
    }
  }

  /// Write `self[i]` into `dst[i]` for every `i` in `mask`.
  pub fn materialize(&self, mask: &IndexMask, mut dst: GMutableSpan<'_>) -> Result<(), AttributeError> {
    if dst.data_type() != self.data_type() {
      return Err(AttributeError::TypeMismatch {
        expected: dst.data_type(),
        actual: self.data_type(),
      });
    }
    if dst.len() < mask.min_array_size() {
      return Err(AttributeError::SizeMismatch {
        expected: mask.min_array_size(),
        actual: dst.len(),
      });
    }
    match self {
      GVArray::Span(buffer) => {
        dispatch_pair!(GMutableSpan, GSpan, dst, buffer.as_span(), (dst, src) => {
          for i in mask.iter() {
            dst[i] = src[i];
          }
        }, _ => unreachable!("types checked above"));
      }
      GVArray::Single { value, .. } => {
        for i in mask.iter() {
          dst.set(i, value)?;
        }
      }
      GVArray::Func(func) => {
        for i in mask.iter() {
          dst.set(i, &(func.function)(i))?;
        }
      }
      GVArray::Converted(converted) => converted.materialize(mask, dst),
    }
    Ok(())
  }

  /// Copy every element into a new dense buffer.
  pub fn materialize_to_buffer(&self) -> AttributeBuffer {
    if let GVArray::Span(buffer) = self {
      return buffer.as_ref().clone();
    }
    let mut buffer = AttributeBuffer::new_default(self.data_type(), self.len());
    // Same type and full size by construction.
    let _ = self.materialize(&IndexMask::full(self.len()), buffer.as_mut_span());
    buffer
  }

  /// Dense shared storage, materializing if needed.
  pub fn into_shared_buffer(self) -> Arc<AttributeBuffer> {
    match self {
      GVArray::Span(buffer) => buffer,
      other => Arc::new(other.materialize_to_buffer()),
    }
  }

  /// Typed view, `None` if `T` is not the element type.
  pub fn typed<T: AttributeType>(&self) -> Option<VArray<T>> {
    VArray::from_gvarray(self.clone())
  }
}

impl fmt::Debug for GVArray {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let kind = match self {
      GVArray::Span(_) => "Span",
      GVArray::Single { .. } => "Single",
      GVArray::Func(_) => "Func",
      GVArray::Converted(_) => "Converted",
    };
    f.debug_struct("GVArray")
      .field("kind", &kind)
      .field("data_type", &self.data_type())
      .field("len", &self.len())
      .finish()
  }
}

/// Typed wrapper around a [`GVArray`].
#[derive(Clone, Debug)]
pub struct VArray<T: AttributeType> {
  varray: GVArray,
  _marker: PhantomData<T>,
}

impl<T: AttributeType> VArray<T> {
  pub fn from_gvarray(varray: GVArray) -> Option<Self> {
    (varray.data_type() == T::DATA_TYPE).then_some(Self {
      varray,
      _marker: PhantomData,
    })
  }

  pub fn from_vec(values: Vec<T>) -> Self {
    Self {
      varray: GVArray::from_vec(values),
      _marker: PhantomData,
    }
  }

  pub fn from_single(value: T, len: usize) -> Self {
    Self {
      varray: GVArray::from_single(value.into_value(), len),
      _marker: PhantomData,
    }
  }

  #[inline]
  pub fn len(&self) -> usize {
    self.varray.len()
  }

  #[inline]
  pub fn is_empty(&self) -> bool {
    self.varray.is_empty()
  }

  #[inline]
  pub fn get(&self, index: usize) -> T {
    match &self.varray {
      GVArray::Span(buffer) => T::slice(buffer).map(|values| values[index]).unwrap_or_default(),
      other => T::from_value(&other.get(index)).unwrap_or_default(),
    }
  }

  pub fn as_span(&self) -> Option<&[T]> {
    match &self.varray {
      GVArray::Span(buffer) => T::slice(buffer),
      _ => None,
    }
  }

  pub fn as_single(&self) -> Option<T> {
    self.varray.as_single().and_then(|value| T::from_value(&value))
  }

  /// Write every element into `dst`, which must have the same length.
  pub fn materialize(&self, dst: &mut [T]) {
    debug_assert_eq!(dst.len(), self.len());
    if let Some(span) = self.as_span() {
      dst.copy_from_slice(span);
    } else if let Some(value) = self.as_single() {
      dst.fill(value);
    } else {
      for (i, dst) in dst.iter_mut().enumerate() {
        *dst = self.get(i);
      }
    }
  }

  pub fn to_vec(&self) -> Vec<T> {
    match self.as_span() {
      Some(span) => span.to_vec(),
      None => (0..self.len()).map(|i| self.get(i)).collect(),
    }
  }

  #[inline]
  pub fn as_gvarray(&self) -> &GVArray {
    &self.varray
  }

  #[inline]
  pub fn into_gvarray(self) -> GVArray {
    self.varray
  }
}

/// Mutable type-erased array borrowed from its owner.
pub enum GVMutableArray<'a> {
  Span(GMutableSpan<'a>),
  /// Reads convert `forward`, writes convert `backward` into the source type.
  Converted {
    source: GMutableSpan<'a>,
    forward: ConversionFunctions,
    backward: ConversionFunctions,
  },
}

impl<'a> GVMutableArray<'a> {
  pub(crate) fn converted(self, forward: ConversionFunctions, backward: ConversionFunctions) -> Self {
    debug_assert_eq!(forward.from_type(), backward.to_type());
    debug_assert_eq!(forward.to_type(), backward.from_type());
    GVMutableArray::Converted {
      source: self.into_source(),
      forward,
      backward,
    }
  }

  /// The underlying storage without any conversion.
  pub fn into_source(self) -> GMutableSpan<'a> {
    match self {
      GVMutableArray::Span(span) => span,
      GVMutableArray::Converted { source, .. } => source,
    }
  }

  pub fn data_type(&self) -> DataType {
    match self {
      GVMutableArray::Span(span) => span.data_type(),
      GVMutableArray::Converted { forward, .. } => forward.to_type(),
    }
  }

  pub fn len(&self) -> usize {
    match self {
      GVMutableArray::Span(span) => span.len(),
      GVMutableArray::Converted { source, .. } => source.len(),
    }
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  pub fn get(&self, index: usize) -> AttributeValue {
    match self {
      GVMutableArray::Span(span) => span.get(index),
      GVMutableArray::Converted { source, forward, .. } => {
        forward.convert_single(&source.get(index))
      }
    }
  }

  /// Store `value`, converting it back to the source type if needed.
  pub fn set_by_move(&mut self, index: usize, value: AttributeValue) -> Result<(), AttributeError> {
    match self {
      GVMutableArray::Span(span) => span.set(index, &value),
      GVMutableArray::Converted {
        source, backward, ..
      } => {
        if value.data_type() != backward.from_type() {
          return Err(AttributeError::TypeMismatch {
            expected: backward.from_type(),
            actual: value.data_type(),
          });
        }
        let converted = backward.convert_single(&value);
        source.set(index, &converted)
      }
    }
  }

  /// Overwrite every element with the matching element of `src`.
  pub fn set_all(&mut self, src: &GVArray) -> Result<(), AttributeError> {
    if src.len() != self.len() {
      return Err(AttributeError::SizeMismatch {
        expected: self.len(),
        actual: src.len(),
      });
    }
    match self {
      GVMutableArray::Span(span) => src.materialize(&IndexMask::full(src.len()), span.reborrow()),
      GVMutableArray::Converted { .. } => {
        for i in 0..src.len() {
          self.set_by_move(i, src.get(i))?;
        }
        Ok(())
      }
    }
  }

  /// Dense view when no conversion is involved.
  pub fn as_span_mut(&mut self) -> Option<GMutableSpan<'_>> {
    match self {
      GVMutableArray::Span(span) => Some(span.reborrow()),
      GVMutableArray::Converted { .. } => None,
    }
  }
}

#[cfg(test)]
#[path = "gvarray_test.rs"]
mod gvarray_test;
