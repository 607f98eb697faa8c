//! Grain sizes and chunked parallel helpers built on rayon.
//!
//! All helpers write disjoint chunks of the destination, so a run on a
//! single thread produces the same output as a parallel one.

use glam::{Mat4, Vec3};
use rayon::prelude::*;

use crate::buffer::{GMutableSpan, GSpan};
use crate::error::AttributeError;
use crate::value::{AttributeType, AttributeValue};

/// Realize tasks handed to one rayon job at a time.
pub const TASK_GRAIN_SIZE: usize = 100;
/// Elements copied or filled per chunk.
pub const ELEMENT_GRAIN_SIZE: usize = 1024;
/// Attribute columns handled per job.
pub const ATTRIBUTE_GRAIN_SIZE: usize = 10;
/// Offsets shifted per chunk.
pub const OFFSET_GRAIN_SIZE: usize = 2048;

/// Copy `src` into `dst` in parallel chunks.
pub fn parallel_copy<T: AttributeType>(src: &[T], dst: &mut [T]) {
  debug_assert_eq!(src.len(), dst.len());
  dst
    .par_chunks_mut(ELEMENT_GRAIN_SIZE)
    .zip(src.par_chunks(ELEMENT_GRAIN_SIZE))
    .for_each(|(dst, src)| dst.copy_from_slice(src));
}

/// Fill `dst` with `value` in parallel chunks.
pub fn parallel_fill<T: AttributeType>(value: T, dst: &mut [T]) {
  dst
    .par_chunks_mut(ELEMENT_GRAIN_SIZE)
    .for_each(|chunk| chunk.fill(value));
}

/// Type-erased [`parallel_copy`].
pub fn parallel_copy_span(src: GSpan<'_>, dst: GMutableSpan<'_>) -> Result<(), AttributeError> {
  let (expected, actual) = (dst.data_type(), src.data_type());
  if expected != actual {
    return Err(AttributeError::TypeMismatch { expected, actual });
  }
  if src.len() != dst.len() {
    return Err(AttributeError::SizeMismatch {
      expected: dst.len(),
      actual: src.len(),
    });
  }
  crate::with_attribute_type!(expected, T => {
    if let (Some(src), Some(dst)) = (T::span(src), T::span_mut(dst)) {
      parallel_copy(src, dst);
    }
  });
  Ok(())
}

/// Type-erased [`parallel_fill`].
pub fn parallel_fill_span(value: &AttributeValue, dst: GMutableSpan<'_>) -> Result<(), AttributeError> {
  let expected = dst.data_type();
  crate::with_attribute_type!(expected, T => {
    let value = value.get::<T>().ok_or(AttributeError::TypeMismatch {
      expected,
      actual: value.data_type(),
    })?;
    if let Some(dst) = T::span_mut(dst) {
      parallel_fill(value, dst);
    }
  });
  Ok(())
}

/// Split `slice` into consecutive disjoint parts with the given lengths.
///
/// The lengths must not add up to more than the slice length. Any remainder
/// is dropped.
pub fn split_lengths_mut<'a, T>(
  mut rest: &'a mut [T],
  lengths: impl IntoIterator<Item = usize>,
) -> Vec<&'a mut [T]> {
  let mut parts = Vec::new();
  for len in lengths {
    let (head, tail) = std::mem::take(&mut rest).split_at_mut(len);
    parts.push(head);
    rest = tail;
  }
  parts
}

/// `dst[i] = transform * src[i]` for points.
pub fn copy_transformed_positions(src: &[Vec3], transform: &Mat4, dst: &mut [Vec3]) {
  debug_assert_eq!(src.len(), dst.len());
  dst
    .par_chunks_mut(ELEMENT_GRAIN_SIZE)
    .zip(src.par_chunks(ELEMENT_GRAIN_SIZE))
    .for_each(|(dst, src)| {
      for (dst, src) in dst.iter_mut().zip(src) {
        *dst = transform.transform_point3(*src);
      }
    });
}
