//! Unconnected points.

use glam::Vec3;

use super::runtime::GeometryRuntime;
use crate::attributes::{
  AttributeAccessor, AttributeLayer, AttributeOwner, AttributeProviders, AttributeStorage,
  BuiltinAttribute, DomainSizes, MutableAttributeAccessor,
};
use crate::buffer::AttributeBuffer;
use crate::types::{DataType, Domain};

static POINTCLOUD_BUILTINS: [BuiltinAttribute; 3] = [
  BuiltinAttribute::new("position", Domain::Point, DataType::Float3).required(),
  BuiltinAttribute::new("radius", Domain::Point, DataType::Float),
  BuiltinAttribute::new("id", Domain::Point, DataType::Int32),
];

pub static POINTCLOUD_PROVIDERS: AttributeProviders = AttributeProviders {
  builtins: &POINTCLOUD_BUILTINS,
  domains: &[Domain::Point],
};

#[derive(Clone, Debug)]
pub struct PointCloud {
  points_num: usize,
  attributes: AttributeStorage,
  runtime: GeometryRuntime,
}

impl PointCloud {
  /// Point cloud with zeroed positions.
  pub fn new(points_num: usize) -> Self {
    Self::from_positions(vec![Vec3::ZERO; points_num])
  }

  pub fn from_positions(positions: Vec<Vec3>) -> Self {
    let points_num = positions.len();
    let mut attributes = AttributeStorage::new();
    attributes.insert(
      "position".into(),
      AttributeLayer::new(Domain::Point, AttributeBuffer::from_vec(positions)),
    );
    Self {
      points_num,
      attributes,
      runtime: GeometryRuntime::default(),
    }
  }

  #[inline]
  pub fn points_num(&self) -> usize {
    self.points_num
  }

  pub fn positions(&self) -> &[Vec3] {
    self
      .attributes
      .get("position".into())
      .and_then(|layer| layer.data.typed::<Vec3>())
      .unwrap_or(&[])
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
    MutableAttributeAccessor::new(
      &mut self.attributes,
      &self.runtime,
      &POINTCLOUD_PROVIDERS,
      sizes,
    )
  }
}

impl AttributeOwner for PointCloud {
  fn attribute_storage(&self) -> &AttributeStorage {
    &self.attributes
  }

  fn attribute_providers(&self) -> &'static AttributeProviders {
    &POINTCLOUD_PROVIDERS
  }

  fn domain_size(&self, domain: Domain) -> usize {
    match domain {
      Domain::Point => self.points_num,
      _ => 0,
    }
  }
}
