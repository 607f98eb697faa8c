//! Curves: points grouped into curves by an offsets array.

use std::ops::Range;

use glam::Vec3;

use super::runtime::{GeometryRuntime, CURVE_TYPES_NUM};
use crate::attributes::interpolate::adapt_curve_domain;
use crate::attributes::{
  AttributeAccessor, AttributeLayer, AttributeOwner, AttributeProviders, AttributeStorage,
  AttributeUpdate, BuiltinAttribute, DomainSizes, MutableAttributeAccessor,
};
use crate::buffer::AttributeBuffer;
use crate::gvarray::{GVArray, VArray};
use crate::types::{DataType, Domain};

/// Resolution used by curves without a `resolution` attribute.
pub const DEFAULT_CURVE_RESOLUTION: i32 = 12;

/// Radius used by points without a `radius` attribute.
pub const DEFAULT_CURVE_RADIUS: f32 = 1.0;

#[repr(i8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CurveType {
  CatmullRom = 0,
  Poly = 1,
  Bezier = 2,
  Nurbs = 3,
}

static CURVES_BUILTINS: [BuiltinAttribute; 7] = [
  BuiltinAttribute::new("position", Domain::Point, DataType::Float3).required(),
  BuiltinAttribute::new("radius", Domain::Point, DataType::Float),
  BuiltinAttribute::new("id", Domain::Point, DataType::Int32),
  BuiltinAttribute::new("handle_left", Domain::Point, DataType::Float3),
  BuiltinAttribute::new("handle_right", Domain::Point, DataType::Float3),
  BuiltinAttribute::new("resolution", Domain::Curve, DataType::Int32),
  BuiltinAttribute::new("curve_type", Domain::Curve, DataType::Int8)
    .with_update(AttributeUpdate::CurveTypes),
];

pub static CURVES_PROVIDERS: AttributeProviders = AttributeProviders {
  builtins: &CURVES_BUILTINS,
  domains: &[Domain::Point, Domain::Curve],
};

#[derive(Clone, Debug)]
pub struct Curves {
  points_num: usize,
  /// Start point of every curve plus the total point count.
  offsets: Vec<i32>,
  attributes: AttributeStorage,
  runtime: GeometryRuntime,
}

impl Curves {
  /// Curves with zeroed positions. Offsets are zero except the last, which
  /// is `points_num`; callers fill them in.
  pub fn new(points_num: usize, curves_num: usize) -> Self {
    let mut offsets = vec![0; curves_num + 1];
    offsets[curves_num] = points_num as i32;
    let mut attributes = AttributeStorage::new();
    attributes.insert(
      "position".into(),
      AttributeLayer::new(
        Domain::Point,
        AttributeBuffer::new_default(DataType::Float3, points_num),
      ),
    );
    Self {
      points_num,
      offsets,
      attributes,
      runtime: GeometryRuntime::default(),
    }
  }

  /// Curves from positions and per-curve point counts.
  pub fn from_point_counts(positions: Vec<Vec3>, point_counts: &[usize]) -> Self {
    let mut curves = Self::new(positions.len(), point_counts.len());
    let mut offset = 0;
    for (curve, count) in point_counts.iter().enumerate() {
      curves.offsets[curve] = offset as i32;
      offset += count;
    }
    debug_assert_eq!(offset, positions.len());
    if let Some(layer) = curves.attributes.get_mut("position".into()) {
      *layer = AttributeLayer::new(Domain::Point, AttributeBuffer::from_vec(positions));
    }
    curves
  }

  #[inline]
  pub fn points_num(&self) -> usize {
    self.points_num
  }

  #[inline]
  pub fn curves_num(&self) -> usize {
    self.offsets.len() - 1
  }

  #[inline]
  pub fn offsets(&self) -> &[i32] {
    &self.offsets
  }

  #[inline]
  pub fn offsets_for_write(&mut self) -> &mut [i32] {
    &mut self.offsets
  }

  pub fn points_for_curve(&self, curve: usize) -> Range<usize> {
    self.offsets[curve] as usize..self.offsets[curve + 1] as usize
  }

  pub fn positions(&self) -> &[Vec3] {
    self
      .attributes
      .get("position".into())
      .and_then(|layer| layer.data.typed::<Vec3>())
      .unwrap_or(&[])
  }

  /// Per-curve resolution, the default where the attribute is absent.
  pub fn resolution(&self) -> VArray<i32> {
    self
      .attributes()
      .lookup_or_default_typed("resolution", Domain::Curve, DEFAULT_CURVE_RESOLUTION)
  }

  pub fn curve_types(&self) -> VArray<i8> {
    self
      .attributes()
      .lookup_or_default_typed("curve_type", Domain::Curve, CurveType::CatmullRom as i8)
  }

  /// Number of curves of every type, cached until curve types are written.
  pub fn curve_type_counts(&self) -> [usize; CURVE_TYPES_NUM] {
    self.runtime.curve_type_counts_or_init(|| {
      let mut counts = [0; CURVE_TYPES_NUM];
      let types = self.curve_types();
      for curve in 0..self.curves_num() {
        let curve_type = types.get(curve);
        if let Some(count) = counts.get_mut(curve_type as usize) {
          *count += 1;
        }
      }
      counts
    })
  }

  /// Overwrite the cached type counts when they are known up front.
  pub fn set_curve_type_counts(&self, counts: [usize; CURVE_TYPES_NUM]) {
    self.runtime.set_curve_type_counts(counts);
  }

  pub fn runtime(&self) -> &GeometryRuntime {
    &self.runtime
  }

  #[inline]
  pub fn attributes(&self) -> AttributeAccessor<'_> {
    AttributeAccessor::new(self)
  }

  pub fn attributes_for_write(&mut self) -> MutableAttributeAccessor<'_> {
    let sizes = DomainSizes::from_owner(&*self);
    MutableAttributeAccessor::new(&mut self.attributes, &self.runtime, &CURVES_PROVIDERS, sizes)
  }

  /// Offsets and attributes borrowed separately, for filling new curves.
  pub fn parts_for_write(&mut self) -> (&mut [i32], MutableAttributeAccessor<'_>) {
    let sizes = DomainSizes::from_owner(&*self);
    (
      &mut self.offsets,
      MutableAttributeAccessor::new(&mut self.attributes, &self.runtime, &CURVES_PROVIDERS, sizes),
    )
  }
}

impl AttributeOwner for Curves {
  fn attribute_storage(&self) -> &AttributeStorage {
    &self.attributes
  }

  fn attribute_providers(&self) -> &'static AttributeProviders {
    &CURVES_PROVIDERS
  }

  fn domain_size(&self, domain: Domain) -> usize {
    match domain {
      Domain::Point => self.points_num,
      Domain::Curve => self.curves_num(),
      _ => 0,
    }
  }

  fn adapt_domain(&self, varray: GVArray, from: Domain, to: Domain) -> Option<GVArray> {
    adapt_curve_domain(&self.offsets, self.points_num, varray, from, to)
  }
}
