//! Runtime-typed single values and the bridge between them and concrete Rust
//! element types.

use glam::{Vec2, Vec3};

use crate::buffer::{AttributeBuffer, GMutableSpan, GSpan};
use crate::color::{ColorGeometry4b, ColorGeometry4f};
use crate::types::DataType;

/// One attribute element of a type known only at runtime.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum AttributeValue {
  Bool(bool),
  Int8(i8),
  Int32(i32),
  Float(f32),
  Float2(Vec2),
  Float3(Vec3),
  ByteColor(ColorGeometry4b),
  Color(ColorGeometry4f),
}

impl AttributeValue {
  /// Zero value of `data_type`.
  pub fn default_for(data_type: DataType) -> Self {
    match data_type {
      DataType::Bool => AttributeValue::Bool(false),
      DataType::Int8 => AttributeValue::Int8(0),
      DataType::Int32 => AttributeValue::Int32(0),
      DataType::Float => AttributeValue::Float(0.0),
      DataType::Float2 => AttributeValue::Float2(Vec2::ZERO),
      DataType::Float3 => AttributeValue::Float3(Vec3::ZERO),
      DataType::ByteColor => AttributeValue::ByteColor(ColorGeometry4b::default()),
      DataType::Color => AttributeValue::Color(ColorGeometry4f::default()),
    }
  }

  pub fn data_type(&self) -> DataType {
    match self {
      AttributeValue::Bool(_) => DataType::Bool,
      AttributeValue::Int8(_) => DataType::Int8,
      AttributeValue::Int32(_) => DataType::Int32,
      AttributeValue::Float(_) => DataType::Float,
      AttributeValue::Float2(_) => DataType::Float2,
      AttributeValue::Float3(_) => DataType::Float3,
      AttributeValue::ByteColor(_) => DataType::ByteColor,
      AttributeValue::Color(_) => DataType::Color,
    }
  }

  /// Typed view of the value, `None` if the types differ.
  #[inline]
  pub fn get<T: AttributeType>(&self) -> Option<T> {
    T::from_value(self)
  }
}

/// Concrete element types that can live in an attribute column.
///
/// Implemented for exactly the eight supported types. The mixing hooks
/// compute a mean of several values and are used by domain interpolation.
pub trait AttributeType:
  Copy + Default + PartialEq + Send + Sync + std::fmt::Debug + 'static
{
  const DATA_TYPE: DataType;

  /// Accumulator for [`AttributeType::mix_add`].
  type Accumulator: Copy + Default + Send + Sync;

  fn into_value(self) -> AttributeValue;
  fn from_value(value: &AttributeValue) -> Option<Self>;

  fn slice(buffer: &AttributeBuffer) -> Option<&[Self]>;
  fn slice_mut(buffer: &mut AttributeBuffer) -> Option<&mut [Self]>;
  fn span<'a>(span: GSpan<'a>) -> Option<&'a [Self]>;
  fn span_mut<'a>(span: GMutableSpan<'a>) -> Option<&'a mut [Self]>;
  fn into_buffer(values: Vec<Self>) -> AttributeBuffer;

  fn mix_add(accumulator: &mut Self::Accumulator, value: Self);
  /// Mean of `count` accumulated values, the type default for zero values.
  fn mix_finish(accumulator: Self::Accumulator, count: usize) -> Self;
}

macro_rules! impl_attribute_type {
  ($ty:ty, $variant:ident, $accum:ty, |$acc:ident, $v:ident| $add:expr, |$facc:ident, $n:ident| $finish:expr) => {
    impl AttributeType for $ty {
      const DATA_TYPE: DataType = DataType::$variant;
      type Accumulator = $accum;

      #[inline]
      fn into_value(self) -> AttributeValue {
        AttributeValue::$variant(self)
      }

      #[inline]
      fn from_value(value: &AttributeValue) -> Option<Self> {
        match value {
          AttributeValue::$variant(v) => Some(*v),
          _ => None,
        }
      }

      #[inline]
      fn slice(buffer: &AttributeBuffer) -> Option<&[Self]> {
        match buffer {
          AttributeBuffer::$variant(values) => Some(values),
          _ => None,
        }
      }

      #[inline]
      fn slice_mut(buffer: &mut AttributeBuffer) -> Option<&mut [Self]> {
        match buffer {
          AttributeBuffer::$variant(values) => Some(values),
          _ => None,
        }
      }

      #[inline]
      fn span<'a>(span: GSpan<'a>) -> Option<&'a [Self]> {
        match span {
          GSpan::$variant(values) => Some(values),
          _ => None,
        }
      }

      #[inline]
      fn span_mut<'a>(span: GMutableSpan<'a>) -> Option<&'a mut [Self]> {
        match span {
          GMutableSpan::$variant(values) => Some(values),
          _ => None,
        }
      }

      #[inline]
      fn into_buffer(values: Vec<Self>) -> AttributeBuffer {
        AttributeBuffer::$variant(values)
      }

      #[inline]
      fn mix_add($acc: &mut Self::Accumulator, $v: Self) {
        $add
      }

      #[inline]
      fn mix_finish($facc: Self::Accumulator, $n: usize) -> Self {
        if $n == 0 {
          return Self::default();
        }
        $finish
      }
    }
  };
}

// Booleans mix as "all true". Callers that need "any" handle it themselves.
impl_attribute_type!(bool, Bool, usize, |acc, v| *acc += v as usize, |acc, n| acc == n);
impl_attribute_type!(
  i8,
  Int8,
  f64,
  |acc, v| *acc += v as f64,
  |acc, n| (acc / n as f64).round() as i8
);
impl_attribute_type!(
  i32,
  Int32,
  f64,
  |acc, v| *acc += v as f64,
  |acc, n| (acc / n as f64).round() as i32
);
impl_attribute_type!(f32, Float, f32, |acc, v| *acc += v, |acc, n| acc / n as f32);
impl_attribute_type!(Vec2, Float2, Vec2, |acc, v| *acc += v, |acc, n| acc / n as f32);
impl_attribute_type!(Vec3, Float3, Vec3, |acc, v| *acc += v, |acc, n| acc / n as f32);
impl_attribute_type!(
  ColorGeometry4f,
  Color,
  [f32; 4],
  |acc, v| {
    acc[0] += v.r;
    acc[1] += v.g;
    acc[2] += v.b;
    acc[3] += v.a;
  },
  |acc, n| {
    let inv = 1.0 / n as f32;
    ColorGeometry4f::new(acc[0] * inv, acc[1] * inv, acc[2] * inv, acc[3] * inv)
  }
);
// Byte colors are averaged in linear space.
impl_attribute_type!(
  ColorGeometry4b,
  ByteColor,
  [f32; 4],
  |acc, v| {
    let linear = v.decode();
    acc[0] += linear.r;
    acc[1] += linear.g;
    acc[2] += linear.b;
    acc[3] += linear.a;
  },
  |acc, n| {
    let inv = 1.0 / n as f32;
    ColorGeometry4f::new(acc[0] * inv, acc[1] * inv, acc[2] * inv, acc[3] * inv).encode()
  }
);

/// Run `$body` with `$T` bound to the concrete element type of `$data_type`.
#[macro_export]
#[doc(hidden)]
macro_rules! with_attribute_type {
  ($data_type:expr, $T:ident => $body:expr) => {
    match $data_type {
      $crate::types::DataType::Bool => {
        type $T = bool;
        $body
      }
      $crate::types::DataType::Int8 => {
        type $T = i8;
        $body
      }
      $crate::types::DataType::Int32 => {
        type $T = i32;
        $body
      }
      $crate::types::DataType::Float => {
        type $T = f32;
        $body
      }
      $crate::types::DataType::Float2 => {
        type $T = ::glam::Vec2;
        $body
      }
      $crate::types::DataType::Float3 => {
        type $T = ::glam::Vec3;
        $body
      }
      $crate::types::DataType::ByteColor => {
        type $T = $crate::color::ColorGeometry4b;
        $body
      }
      $crate::types::DataType::Color => {
        type $T = $crate::color::ColorGeometry4f;
        $body
      }
    }
  };
}
