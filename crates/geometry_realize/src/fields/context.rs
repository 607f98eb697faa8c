//! Evaluation contexts: a geometry and the domain a field is evaluated on.

use crate::attributes::{AttributeAccessor, MutableAttributeAccessor};
use crate::geometry::{Curves, GeometryComponentType, Instances, Mesh, PointCloud};
use crate::types::Domain;

/// A borrowed geometry of any kind that stores attributes.
#[derive(Clone, Copy, Debug)]
pub enum GeometryRef<'a> {
  Mesh(&'a Mesh),
  Curves(&'a Curves),
  PointCloud(&'a PointCloud),
  Instances(&'a Instances),
}

impl<'a> GeometryRef<'a> {
  pub fn component_type(&self) -> GeometryComponentType {
    match self {
      GeometryRef::Mesh(_) => GeometryComponentType::Mesh,
      GeometryRef::Curves(_) => GeometryComponentType::Curve,
      GeometryRef::PointCloud(_) => GeometryComponentType::PointCloud,
      GeometryRef::Instances(_) => GeometryComponentType::Instances,
    }
  }

  pub fn attributes(&self) -> AttributeAccessor<'a> {
    match *self {
      GeometryRef::Mesh(mesh) => mesh.attributes(),
      GeometryRef::Curves(curves) => curves.attributes(),
      GeometryRef::PointCloud(pointcloud) => pointcloud.attributes(),
      GeometryRef::Instances(instances) => instances.attributes(),
    }
  }

  #[inline]
  pub fn domain_size(&self, domain: Domain) -> usize {
    self.attributes().domain_size(domain)
  }
}

/// A mutably borrowed geometry of any kind that stores attributes.
#[derive(Debug)]
pub enum GeometryMut<'a> {
  Mesh(&'a mut Mesh),
  Curves(&'a mut Curves),
  PointCloud(&'a mut PointCloud),
  Instances(&'a mut Instances),
}

impl GeometryMut<'_> {
  pub fn as_ref(&self) -> GeometryRef<'_> {
    match self {
      GeometryMut::Mesh(mesh) => GeometryRef::Mesh(mesh),
      GeometryMut::Curves(curves) => GeometryRef::Curves(curves),
      GeometryMut::PointCloud(pointcloud) => GeometryRef::PointCloud(pointcloud),
      GeometryMut::Instances(instances) => GeometryRef::Instances(instances),
    }
  }

  pub fn attributes_for_write(&mut self) -> MutableAttributeAccessor<'_> {
    match self {
      GeometryMut::Mesh(mesh) => mesh.attributes_for_write(),
      GeometryMut::Curves(curves) => curves.attributes_for_write(),
      GeometryMut::PointCloud(pointcloud) => pointcloud.attributes_for_write(),
      GeometryMut::Instances(instances) => instances.attributes_for_write(),
    }
  }
}

/// Context that works for every geometry kind.
#[derive(Clone, Copy, Debug)]
pub struct GeometryFieldContext<'a> {
  geometry: GeometryRef<'a>,
  domain: Domain,
}

impl<'a> GeometryFieldContext<'a> {
  pub fn new(geometry: GeometryRef<'a>, domain: Domain) -> Self {
    Self { geometry, domain }
  }

  #[inline]
  pub fn geometry(&self) -> GeometryRef<'a> {
    self.geometry
  }

  #[inline]
  pub fn domain(&self) -> Domain {
    self.domain
  }

  pub fn attributes(&self) -> Option<AttributeAccessor<'a>> {
    Some(self.geometry.attributes())
  }

  pub fn mesh(&self) -> Option<&'a Mesh> {
    match self.geometry {
      GeometryRef::Mesh(mesh) => Some(mesh),
      _ => None,
    }
  }

  pub fn curves(&self) -> Option<&'a Curves> {
    match self.geometry {
      GeometryRef::Curves(curves) => Some(curves),
      _ => None,
    }
  }

  pub fn pointcloud(&self) -> Option<&'a PointCloud> {
    match self.geometry {
      GeometryRef::PointCloud(pointcloud) => Some(pointcloud),
      _ => None,
    }
  }

  pub fn instances(&self) -> Option<&'a Instances> {
    match self.geometry {
      GeometryRef::Instances(instances) => Some(instances),
      _ => None,
    }
  }
}

#[derive(Clone, Copy, Debug)]
pub struct MeshFieldContext<'a> {
  mesh: &'a Mesh,
  domain: Domain,
}

impl<'a> MeshFieldContext<'a> {
  pub fn new(mesh: &'a Mesh, domain: Domain) -> Self {
    Self { mesh, domain }
  }

  #[inline]
  pub fn mesh(&self) -> &'a Mesh {
    self.mesh
  }

  #[inline]
  pub fn domain(&self) -> Domain {
    self.domain
  }

  pub fn attributes(&self) -> Option<AttributeAccessor<'a>> {
    Some(self.mesh.attributes())
  }
}

#[derive(Clone, Copy, Debug)]
pub struct CurvesFieldContext<'a> {
  curves: &'a Curves,
  domain: Domain,
}

impl<'a> CurvesFieldContext<'a> {
  pub fn new(curves: &'a Curves, domain: Domain) -> Self {
    Self { curves, domain }
  }

  #[inline]
  pub fn curves(&self) -> &'a Curves {
    self.curves
  }

  #[inline]
  pub fn domain(&self) -> Domain {
    self.domain
  }

  pub fn attributes(&self) -> Option<AttributeAccessor<'a>> {
    Some(self.curves.attributes())
  }
}

/// Point clouds only have the point domain.
#[derive(Clone, Copy, Debug)]
pub struct PointCloudFieldContext<'a> {
  pointcloud: &'a PointCloud,
}

impl<'a> PointCloudFieldContext<'a> {
  pub fn new(pointcloud: &'a PointCloud) -> Self {
    Self { pointcloud }
  }

  #[inline]
  pub fn pointcloud(&self) -> &'a PointCloud {
    self.pointcloud
  }

  #[inline]
  pub fn domain(&self) -> Domain {
    Domain::Point
  }

  pub fn attributes(&self) -> Option<AttributeAccessor<'a>> {
    Some(self.pointcloud.attributes())
  }
}

/// Instances only have the instance domain.
#[derive(Clone, Copy, Debug)]
pub struct InstancesFieldContext<'a> {
  instances: &'a Instances,
}

impl<'a> InstancesFieldContext<'a> {
  pub fn new(instances: &'a Instances) -> Self {
    Self { instances }
  }

  #[inline]
  pub fn instances(&self) -> &'a Instances {
    self.instances
  }

  #[inline]
  pub fn domain(&self) -> Domain {
    Domain::Instance
  }

  pub fn attributes(&self) -> Option<AttributeAccessor<'a>> {
    Some(self.instances.attributes())
  }
}

/// Any of the contexts above.
#[derive(Clone, Copy, Debug)]
pub enum FieldContext<'a> {
  Geometry(GeometryFieldContext<'a>),
  Mesh(MeshFieldContext<'a>),
  Curves(CurvesFieldContext<'a>),
  PointCloud(PointCloudFieldContext<'a>),
  Instances(InstancesFieldContext<'a>),
}

impl<'a> FieldContext<'a> {
  pub fn attributes(&self) -> Option<AttributeAccessor<'a>> {
    match self {
      FieldContext::Geometry(context) => context.attributes(),
      FieldContext::Mesh(context) => context.attributes(),
      FieldContext::Curves(context) => context.attributes(),
      FieldContext::PointCloud(context) => context.attributes(),
      FieldContext::Instances(context) => context.attributes(),
    }
  }

  pub fn domain(&self) -> Domain {
    match self {
      FieldContext::Geometry(context) => context.domain(),
      FieldContext::Mesh(context) => context.domain(),
      FieldContext::Curves(context) => context.domain(),
      FieldContext::PointCloud(context) => context.domain(),
      FieldContext::Instances(context) => context.domain(),
    }
  }

  /// The same geometry and domain as a kind-erased context.
  pub fn as_geometry_context(&self) -> GeometryFieldContext<'a> {
    match *self {
      FieldContext::Geometry(context) => context,
      FieldContext::Mesh(context) => {
        GeometryFieldContext::new(GeometryRef::Mesh(context.mesh()), context.domain())
      }
      FieldContext::Curves(context) => {
        GeometryFieldContext::new(GeometryRef::Curves(context.curves()), context.domain())
      }
      FieldContext::PointCloud(context) => {
        GeometryFieldContext::new(GeometryRef::PointCloud(context.pointcloud()), Domain::Point)
      }
      FieldContext::Instances(context) => {
        GeometryFieldContext::new(GeometryRef::Instances(context.instances()), Domain::Instance)
      }
    }
  }
}

impl<'a> From<GeometryFieldContext<'a>> for FieldContext<'a> {
  fn from(context: GeometryFieldContext<'a>) -> Self {
    FieldContext::Geometry(context)
  }
}

impl<'a> From<MeshFieldContext<'a>> for FieldContext<'a> {
  fn from(context: MeshFieldContext<'a>) -> Self {
    FieldContext::Mesh(context)
  }
}

impl<'a> From<CurvesFieldContext<'a>> for FieldContext<'a> {
  fn from(context: CurvesFieldContext<'a>) -> Self {
    FieldContext::Curves(context)
  }
}

impl<'a> From<PointCloudFieldContext<'a>> for FieldContext<'a> {
  fn from(context: PointCloudFieldContext<'a>) -> Self {
    FieldContext::PointCloud(context)
  }
}

impl<'a> From<InstancesFieldContext<'a>> for FieldContext<'a> {
  fn from(context: InstancesFieldContext<'a>) -> Self {
    FieldContext::Instances(context)
  }
}
