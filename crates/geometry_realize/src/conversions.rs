//! Registry of implicit conversions between attribute types.
//!
//! Every ordered pair of distinct supported types has exactly one entry. The
//! process-wide registry is built on first use and read-only afterwards.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use glam::{Vec2, Vec3};

use crate::buffer::{GMutableSpan, GSpan};
use crate::color::{ColorGeometry4b, ColorGeometry4f};
use crate::error::AttributeError;
use crate::fields::Field;
use crate::gvarray::{ConvertedGVArray, GVArray, GVMutableArray};
use crate::index_mask::IndexMask;
use crate::types::DataType;
use crate::value::{AttributeType, AttributeValue};

type SingleFn = dyn Fn(&AttributeValue) -> AttributeValue + Send + Sync;
type BatchFn = dyn Fn(GSpan<'_>, &IndexMask, GMutableSpan<'_>) + Send + Sync;

/// Scalar and batch conversion for one `(from, to)` pair.
///
/// Both paths apply the same per-element function.
#[derive(Clone)]
pub struct ConversionFunctions {
  from: DataType,
  to: DataType,
  single: Arc<SingleFn>,
  batch: Arc<BatchFn>,
}

impl ConversionFunctions {
  fn new<F: AttributeType, T: AttributeType>(function: fn(F) -> T) -> Self {
    let single = move |value: &AttributeValue| match F::from_value(value) {
      Some(value) => function(value).into_value(),
      None => T::default().into_value(),
    };
    let batch = move |src: GSpan<'_>, mask: &IndexMask, dst: GMutableSpan<'_>| {
      if let (Some(src), Some(dst)) = (F::span(src), T::span_mut(dst)) {
        for i in mask.iter() {
          dst[i] = function(src[i]);
        }
      }
    };
    Self {
      from: F::DATA_TYPE,
      to: T::DATA_TYPE,
      single: Arc::new(single),
      batch: Arc::new(batch),
    }
  }

  #[inline]
  pub fn from_type(&self) -> DataType {
    self.from
  }

  #[inline]
  pub fn to_type(&self) -> DataType {
    self.to
  }

  /// Convert one value. A value of the wrong source type yields the target
  /// default.
  #[inline]
  pub fn convert_single(&self, value: &AttributeValue) -> AttributeValue {
    debug_assert_eq!(value.data_type(), self.from);
    (self.single)(value)
  }

  /// Convert `src[i]` into `dst[i]` for every `i` in `mask`.
  pub fn convert_span(&self, src: GSpan<'_>, mask: &IndexMask, dst: GMutableSpan<'_>) {
    debug_assert_eq!(src.data_type(), self.from);
    debug_assert_eq!(dst.data_type(), self.to);
    (self.batch)(src, mask, dst)
  }
}

impl fmt::Debug for ConversionFunctions {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ConversionFunctions")
      .field("from", &self.from)
      .field("to", &self.to)
      .finish_non_exhaustive()
  }
}

/// Map from `(from, to)` type pairs to conversion functions.
#[derive(Default, Debug)]
pub struct DataTypeConversions {
  conversions: HashMap<(DataType, DataType), ConversionFunctions>,
}

impl DataTypeConversions {
  pub fn new() -> Self {
    Self::default()
  }

  /// Register a conversion.
  ///
  /// Panics when the pair is already registered.
  pub fn add<F: AttributeType, T: AttributeType>(&mut self, function: fn(F) -> T) {
    let key = (F::DATA_TYPE, T::DATA_TYPE);
    assert!(F::DATA_TYPE != T::DATA_TYPE, "identity conversions are implicit");
    let previous = self.conversions.insert(key, ConversionFunctions::new(function));
    assert!(previous.is_none(), "conversion {} -> {} registered twice", key.0, key.1);
  }

  #[inline]
  pub fn get_conversion_functions(
    &self,
    from: DataType,
    to: DataType,
  ) -> Option<&ConversionFunctions> {
    self.conversions.get(&(from, to))
  }

  /// True when `from == to` or a conversion is registered.
  #[inline]
  pub fn is_convertible(&self, from: DataType, to: DataType) -> bool {
    from == to || self.conversions.contains_key(&(from, to))
  }

  pub fn len(&self) -> usize {
    self.conversions.len()
  }

  pub fn is_empty(&self) -> bool {
    self.conversions.is_empty()
  }

  /// Convert a single value to `to`. Returns `None` when not convertible.
  pub fn convert_value(&self, value: &AttributeValue, to: DataType) -> Option<AttributeValue> {
    let from = value.data_type();
    if from == to {
      return Some(*value);
    }
    self
      .get_conversion_functions(from, to)
      .map(|functions| functions.convert_single(value))
  }

  /// Overwrite every element of `dst` with the converted element of `src`.
  pub fn convert_span(&self, src: GSpan<'_>, mut dst: GMutableSpan<'_>) -> Result<(), AttributeError> {
    let (from, to) = (src.data_type(), dst.data_type());
    if src.len() != dst.len() {
      return Err(AttributeError::SizeMismatch {
        expected: dst.len(),
        actual: src.len(),
      });
    }
    if from == to {
      return dst.copy_from(src);
    }
    let functions = self
      .get_conversion_functions(from, to)
      .ok_or(AttributeError::NotConvertible { from, to })?;
    functions.convert_span(src, &IndexMask::full(src.len()), dst);
    Ok(())
  }

  /// Wrap `varray` so it reads as `to`.
  ///
  /// Returns the input unchanged when it already has that type and `None`
  /// when no conversion exists.
  pub fn try_convert(&self, varray: GVArray, to: DataType) -> Option<GVArray> {
    let from = varray.data_type();
    if from == to {
      return Some(varray);
    }
    let functions = self.get_conversion_functions(from, to)?.clone();
    Some(GVArray::from_converted(ConvertedGVArray::new(varray, functions)))
  }

  /// Wrap a mutable array so it reads and writes as `to`. Writes go through
  /// the inverse conversion, so both directions must be registered.
  pub fn try_convert_mut<'a>(
    &self,
    varray: GVMutableArray<'a>,
    to: DataType,
  ) -> Option<GVMutableArray<'a>> {
    let from = varray.data_type();
    if from == to {
      return Some(varray);
    }
    let forward = self.get_conversion_functions(from, to)?.clone();
    let backward = self.get_conversion_functions(to, from)?.clone();
    Some(varray.converted(forward, backward))
  }

  /// Convert the output of `field` to `to`.
  pub fn try_convert_field(&self, field: Field, to: DataType) -> Option<Field> {
    let from = field.data_type();
    if from == to {
      return Some(field);
    }
    let functions = self.get_conversion_functions(from, to)?.clone();
    Some(Field::converted(field, functions))
  }
}

/// The process-wide registry with every supported conversion.
pub fn get_implicit_type_conversions() -> &'static DataTypeConversions {
  static CONVERSIONS: OnceLock<DataTypeConversions> = OnceLock::new();
  CONVERSIONS.get_or_init(create_implicit_conversions)
}

#[inline]
fn float_to_int8(a: f32) -> i8 {
  a.clamp(i8::MIN as f32, i8::MAX as f32) as i8
}

#[inline]
fn int_to_int8(a: i32) -> i8 {
  a.clamp(i8::MIN as i32, i8::MAX as i32) as i8
}

#[inline]
fn bool_to_float(a: bool) -> f32 {
  if a {
    1.0
  } else {
    0.0
  }
}

#[inline]
fn byte_to_bool(a: ColorGeometry4b) -> bool {
  a.r > 0 || a.g > 0 || a.b > 0
}

fn create_implicit_conversions() -> DataTypeConversions {
  let mut c = DataTypeConversions::new();

  c.add::<f32, Vec2>(Vec2::splat);
  c.add::<f32, Vec3>(Vec3::splat);
  c.add::<f32, i32>(|a| a as i32);
  c.add::<f32, i8>(float_to_int8);
  c.add::<f32, bool>(|a| a > 0.0);
  c.add::<f32, ColorGeometry4f>(ColorGeometry4f::gray);
  c.add::<f32, ColorGeometry4b>(|a| ColorGeometry4f::gray(a).encode());

  c.add::<Vec2, Vec3>(|a| a.extend(0.0));
  c.add::<Vec2, f32>(|a| (a.x + a.y) / 2.0);
  c.add::<Vec2, i32>(|a| ((a.x + a.y) / 2.0) as i32);
  c.add::<Vec2, i8>(|a| float_to_int8((a.x + a.y) / 2.0));
  c.add::<Vec2, bool>(|a| a != Vec2::ZERO);
  c.add::<Vec2, ColorGeometry4f>(|a| ColorGeometry4f::new(a.x, a.y, 0.0, 1.0));
  c.add::<Vec2, ColorGeometry4b>(|a| ColorGeometry4f::new(a.x, a.y, 0.0, 1.0).encode());

  c.add::<Vec3, bool>(|a| a != Vec3::ZERO);
  c.add::<Vec3, i8>(|a| float_to_int8((a.x + a.y + a.z) / 3.0));
  c.add::<Vec3, f32>(|a| (a.x + a.y + a.z) / 3.0);
  c.add::<Vec3, i32>(|a| ((a.x + a.y + a.z) / 3.0) as i32);
  c.add::<Vec3, Vec2>(|a| a.truncate());
  c.add::<Vec3, ColorGeometry4f>(|a| ColorGeometry4f::new(a.x, a.y, a.z, 1.0));
  c.add::<Vec3, ColorGeometry4b>(|a| ColorGeometry4f::new(a.x, a.y, a.z, 1.0).encode());

  c.add::<i32, bool>(|a| a != 0);
  c.add::<i32, i8>(int_to_int8);
  c.add::<i32, f32>(|a| a as f32);
  c.add::<i32, Vec2>(|a| Vec2::splat(a as f32));
  c.add::<i32, Vec3>(|a| Vec3::splat(a as f32));
  c.add::<i32, ColorGeometry4f>(|a| ColorGeometry4f::gray(a as f32));
  c.add::<i32, ColorGeometry4b>(|a| ColorGeometry4f::gray(a as f32).encode());

  c.add::<i8, bool>(|a| a != 0);
  c.add::<i8, i32>(i32::from);
  c.add::<i8, f32>(f32::from);
  c.add::<i8, Vec2>(|a| Vec2::splat(a as f32));
  c.add::<i8, Vec3>(|a| Vec3::splat(a as f32));
  c.add::<i8, ColorGeometry4f>(|a| ColorGeometry4f::gray(a as f32));
  c.add::<i8, ColorGeometry4b>(|a| ColorGeometry4f::gray(a as f32).encode());

  c.add::<bool, f32>(bool_to_float);
  c.add::<bool, i8>(i8::from);
  c.add::<bool, i32>(i32::from);
  c.add::<bool, Vec2>(|a| Vec2::splat(bool_to_float(a)));
  c.add::<bool, Vec3>(|a| Vec3::splat(bool_to_float(a)));
  c.add::<bool, ColorGeometry4f>(|a| ColorGeometry4f::gray(bool_to_float(a)));
  c.add::<bool, ColorGeometry4b>(|a| ColorGeometry4f::gray(bool_to_float(a)).encode());

  c.add::<ColorGeometry4f, bool>(|a| a.grayscale() > 0.0);
  c.add::<ColorGeometry4f, i8>(|a| float_to_int8(a.grayscale()));
  c.add::<ColorGeometry4f, i32>(|a| a.grayscale() as i32);
  c.add::<ColorGeometry4f, f32>(|a| a.grayscale());
  c.add::<ColorGeometry4f, Vec2>(|a| Vec2::new(a.r, a.g));
  c.add::<ColorGeometry4f, Vec3>(|a| Vec3::new(a.r, a.g, a.b));
  c.add::<ColorGeometry4f, ColorGeometry4b>(|a| a.encode());

  c.add::<ColorGeometry4b, bool>(byte_to_bool);
  c.add::<ColorGeometry4b, i8>(|a| float_to_int8(a.decode().grayscale()));
  c.add::<ColorGeometry4b, i32>(|a| a.decode().grayscale() as i32);
  c.add::<ColorGeometry4b, f32>(|a| a.decode().grayscale());
  c.add::<ColorGeometry4b, Vec2>(|a| {
    let color = a.decode();
    Vec2::new(color.r, color.g)
  });
  c.add::<ColorGeometry4b, Vec3>(|a| {
    let color = a.decode();
    Vec3::new(color.r, color.g, color.b)
  });
  c.add::<ColorGeometry4b, ColorGeometry4f>(|a| a.decode());

  c
}

#[cfg(test)]
#[path = "conversions_test.rs"]
mod conversions_test;
