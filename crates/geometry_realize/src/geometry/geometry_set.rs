//! A container holding at most one geometry of each kind, and the scene
//! data that instances may reference.

use std::sync::Arc;

use glam::{Mat4, Vec3};
use indexmap::IndexSet;
use smallvec::SmallVec;

use super::curves::{Curves, CURVES_PROVIDERS};
use super::instances::{InstanceReference, Instances, INSTANCES_PROVIDERS};
use super::mesh::{Mesh, MESH_PROVIDERS};
use super::pointcloud::{PointCloud, POINTCLOUD_PROVIDERS};
use super::ByAddress;
use crate::attributes::{AttributeAccessor, AttributeProviders};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GeometryComponentType {
  Mesh,
  PointCloud,
  Instances,
  Volume,
  Curve,
  Edit,
}

impl GeometryComponentType {
  pub const ALL: [GeometryComponentType; 6] = [
    GeometryComponentType::Mesh,
    GeometryComponentType::PointCloud,
    GeometryComponentType::Instances,
    GeometryComponentType::Volume,
    GeometryComponentType::Curve,
    GeometryComponentType::Edit,
  ];

  /// Attribute rules of the kind, `None` for kinds without attributes.
  pub fn attribute_providers(self) -> Option<&'static AttributeProviders> {
    match self {
      GeometryComponentType::Mesh => Some(&MESH_PROVIDERS),
      GeometryComponentType::PointCloud => Some(&POINTCLOUD_PROVIDERS),
      GeometryComponentType::Instances => Some(&INSTANCES_PROVIDERS),
      GeometryComponentType::Curve => Some(&CURVES_PROVIDERS),
      GeometryComponentType::Volume | GeometryComponentType::Edit => None,
    }
  }
}

/// Volume data passed through untouched.
#[derive(Clone, Debug, Default)]
pub struct Volume {
  pub name: String,
}

/// Edit hints passed through untouched.
#[derive(Clone, Debug, Default)]
pub struct GeometryEditData {
  pub name: String,
}

#[derive(Clone, Debug, Default)]
pub struct GeometrySet {
  mesh: Option<Arc<Mesh>>,
  pointcloud: Option<Arc<PointCloud>>,
  instances: Option<Arc<Instances>>,
  volume: Option<Arc<Volume>>,
  curves: Option<Arc<Curves>>,
  edit_data: Option<Arc<GeometryEditData>>,
}

impl GeometrySet {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn from_mesh(mesh: Mesh) -> Self {
    Self {
      mesh: Some(Arc::new(mesh)),
      ..Self::default()
    }
  }

  pub fn from_pointcloud(pointcloud: PointCloud) -> Self {
    Self {
      pointcloud: Some(Arc::new(pointcloud)),
      ..Self::default()
    }
  }

  pub fn from_curves(curves: Curves) -> Self {
    Self {
      curves: Some(Arc::new(curves)),
      ..Self::default()
    }
  }

  pub fn from_instances(instances: Instances) -> Self {
    Self {
      instances: Some(Arc::new(instances)),
      ..Self::default()
    }
  }

  #[inline]
  pub fn mesh(&self) -> Option<&Arc<Mesh>> {
    self.mesh.as_ref()
  }

  #[inline]
  pub fn pointcloud(&self) -> Option<&Arc<PointCloud>> {
    self.pointcloud.as_ref()
  }

  #[inline]
  pub fn curves(&self) -> Option<&Arc<Curves>> {
    self.curves.as_ref()
  }

  #[inline]
  pub fn instances(&self) -> Option<&Arc<Instances>> {
    self.instances.as_ref()
  }

  #[inline]
  pub fn volume(&self) -> Option<&Arc<Volume>> {
    self.volume.as_ref()
  }

  #[inline]
  pub fn edit_data(&self) -> Option<&Arc<GeometryEditData>> {
    self.edit_data.as_ref()
  }

  /// Unique access to the mesh, copying it if shared.
  pub fn mesh_for_write(&mut self) -> Option<&mut Mesh> {
    self.mesh.as_mut().map(Arc::make_mut)
  }

  pub fn pointcloud_for_write(&mut self) -> Option<&mut PointCloud> {
    self.pointcloud.as_mut().map(Arc::make_mut)
  }

  pub fn curves_for_write(&mut self) -> Option<&mut Curves> {
    self.curves.as_mut().map(Arc::make_mut)
  }

  pub fn instances_for_write(&mut self) -> Option<&mut Instances> {
    self.instances.as_mut().map(Arc::make_mut)
  }

  pub fn replace_mesh(&mut self, mesh: impl Into<Arc<Mesh>>) {
    self.mesh = Some(mesh.into());
  }

  pub fn replace_pointcloud(&mut self, pointcloud: impl Into<Arc<PointCloud>>) {
    self.pointcloud = Some(pointcloud.into());
  }

  pub fn replace_curves(&mut self, curves: impl Into<Arc<Curves>>) {
    self.curves = Some(curves.into());
  }

  pub fn replace_instances(&mut self, instances: impl Into<Arc<Instances>>) {
    self.instances = Some(instances.into());
  }

  pub fn replace_volume(&mut self, volume: impl Into<Arc<Volume>>) {
    self.volume = Some(volume.into());
  }

  pub fn replace_edit_data(&mut self, edit_data: impl Into<Arc<GeometryEditData>>) {
    self.edit_data = Some(edit_data.into());
  }

  pub fn has(&self, component_type: GeometryComponentType) -> bool {
    match component_type {
      GeometryComponentType::Mesh => self.mesh.is_some(),
      GeometryComponentType::PointCloud => self.pointcloud.is_some(),
      GeometryComponentType::Instances => self.instances.is_some(),
      GeometryComponentType::Volume => self.volume.is_some(),
      GeometryComponentType::Curve => self.curves.is_some(),
      GeometryComponentType::Edit => self.edit_data.is_some(),
    }
  }

  /// True if there is at least one instance to realize.
  pub fn has_instances(&self) -> bool {
    self
      .instances
      .as_ref()
      .is_some_and(|instances| instances.instances_num() > 0)
  }

  pub fn is_empty(&self) -> bool {
    GeometryComponentType::ALL
      .iter()
      .all(|&component_type| !self.has(component_type))
  }

  pub fn remove(&mut self, component_type: GeometryComponentType) {
    match component_type {
      GeometryComponentType::Mesh => self.mesh = None,
      GeometryComponentType::PointCloud => self.pointcloud = None,
      GeometryComponentType::Instances => self.instances = None,
      GeometryComponentType::Volume => self.volume = None,
      GeometryComponentType::Curve => self.curves = None,
      GeometryComponentType::Edit => self.edit_data = None,
    }
  }

  /// Attributes of one component, `None` if absent or without attributes.
  pub fn attributes(&self, component_type: GeometryComponentType) -> Option<AttributeAccessor<'_>> {
    match component_type {
      GeometryComponentType::Mesh => self.mesh.as_deref().map(Mesh::attributes),
      GeometryComponentType::PointCloud => self.pointcloud.as_deref().map(PointCloud::attributes),
      GeometryComponentType::Instances => self.instances.as_deref().map(Instances::attributes),
      GeometryComponentType::Curve => self.curves.as_deref().map(Curves::attributes),
      GeometryComponentType::Volume | GeometryComponentType::Edit => None,
    }
  }

  /// Component types present here.
  pub fn component_types(&self) -> Vec<GeometryComponentType> {
    GeometryComponentType::ALL
      .into_iter()
      .filter(|&component_type| self.has(component_type))
      .collect()
  }

  /// Component types present anywhere in the instancing tree. Instances
  /// themselves are only listed when `include_instances` is set.
  pub fn gather_component_types(&self, include_instances: bool) -> Vec<GeometryComponentType> {
    let mut types = IndexSet::new();
    self.foreach_geometry_recursive(&mut |geometry| {
      for component_type in geometry.component_types() {
        if include_instances || component_type != GeometryComponentType::Instances {
          types.insert(component_type);
        }
      }
    });
    types.into_iter().collect()
  }

  /// Visit this set and every set reachable through instance references,
  /// depth first. A set referenced several times is visited once per
  /// reference.
  pub fn foreach_geometry_recursive(&self, callback: &mut dyn FnMut(&GeometrySet)) {
    callback(self);
    let Some(instances) = &self.instances else {
      return;
    };
    for reference in instances.references() {
      match reference {
        InstanceReference::None => {}
        InstanceReference::Object(object) => object.geometry.foreach_geometry_recursive(callback),
        InstanceReference::Collection(collection) => {
          for object in collection.objects_recursive() {
            object.geometry.foreach_geometry_recursive(callback);
          }
        }
        InstanceReference::GeometrySet(geometry) => geometry.foreach_geometry_recursive(callback),
      }
    }
  }

  /// Apply `callback` to this set and every inline geometry set referenced
  /// by nested instances. Object and collection geometry is shared scene data
  /// and is left alone.
  pub fn modify_geometry_sets(&mut self, callback: &mut dyn FnMut(&mut GeometrySet)) {
    callback(self);
    let Some(instances) = self.instances_for_write() else {
      return;
    };
    for reference in instances.references_for_write() {
      if let InstanceReference::GeometrySet(geometry) = reference {
        Arc::make_mut(geometry).modify_geometry_sets(callback);
      }
    }
  }
}

/// A scene object with evaluated geometry.
#[derive(Clone, Debug, Default)]
pub struct Object {
  pub name: String,
  /// Object to world matrix.
  pub transform: Mat4,
  pub geometry: Arc<GeometrySet>,
}

impl Object {
  pub fn new(name: impl Into<String>, transform: Mat4, geometry: GeometrySet) -> Arc<Self> {
    Arc::new(Self {
      name: name.into(),
      transform,
      geometry: Arc::new(geometry),
    })
  }

  #[inline]
  pub fn evaluated_geometry(&self) -> &GeometrySet {
    &self.geometry
  }
}

/// A group of objects and nested collections.
#[derive(Clone, Debug, Default)]
pub struct Collection {
  pub name: String,
  /// Subtracted from every object transform when the collection is
  /// instanced.
  pub instance_offset: Vec3,
  pub objects: Vec<Arc<Object>>,
  pub children: Vec<Arc<Collection>>,
}

impl Collection {
  /// Own objects first, then those of child collections depth first. Objects
  /// linked in several places are listed once.
  pub fn objects_recursive(&self) -> Vec<Arc<Object>> {
    let mut objects = IndexSet::new();
    let mut stack: SmallVec<[&Collection; 8]> = SmallVec::new();
    stack.push(self);
    while let Some(collection) = stack.pop() {
      objects.extend(collection.objects.iter().cloned().map(ByAddress));
      stack.extend(collection.children.iter().rev().map(|child| &**child));
    }
    objects.into_iter().map(|object| object.0).collect()
  }
}
