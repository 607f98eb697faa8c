//! Instances: references to other geometry placed with a transform each.

use std::sync::Arc;

use glam::Mat4;

use super::geometry_set::{Collection, GeometrySet, Object};
use super::runtime::GeometryRuntime;
use crate::attributes::{
  AttributeAccessor, AttributeOwner, AttributeProviders, AttributeStorage, BuiltinAttribute,
  DomainSizes, MutableAttributeAccessor,
};
use crate::types::{DataType, Domain};

/// What an instance places.
#[derive(Clone, Debug, Default)]
pub enum InstanceReference {
  /// Places nothing.
  #[default]
  None,
  Object(Arc<Object>),
  Collection(Arc<Collection>),
  GeometrySet(Arc<GeometrySet>),
}

impl InstanceReference {
  /// Identity comparison: two references are the same if they point at the
  /// same shared data.
  pub fn is_same(&self, other: &InstanceReference) -> bool {
    match (self, other) {
      (InstanceReference::None, InstanceReference::None) => true,
      (InstanceReference::Object(a), InstanceReference::Object(b)) => Arc::ptr_eq(a, b),
      (InstanceReference::Collection(a), InstanceReference::Collection(b)) => Arc::ptr_eq(a, b),
      (InstanceReference::GeometrySet(a), InstanceReference::GeometrySet(b)) => Arc::ptr_eq(a, b),
      _ => false,
    }
  }
}

impl From<GeometrySet> for InstanceReference {
  fn from(geometry: GeometrySet) -> Self {
    InstanceReference::GeometrySet(Arc::new(geometry))
  }
}

impl From<Arc<Object>> for InstanceReference {
  fn from(object: Arc<Object>) -> Self {
    InstanceReference::Object(object)
  }
}

impl From<Arc<Collection>> for InstanceReference {
  fn from(collection: Arc<Collection>) -> Self {
    InstanceReference::Collection(collection)
  }
}

static INSTANCES_BUILTINS: [BuiltinAttribute; 1] =
  [BuiltinAttribute::new("id", Domain::Instance, DataType::Int32)];

pub static INSTANCES_PROVIDERS: AttributeProviders = AttributeProviders {
  builtins: &INSTANCES_BUILTINS,
  domains: &[Domain::Instance],
};

#[derive(Clone, Debug, Default)]
pub struct Instances {
  references: Vec<InstanceReference>,
  /// Index into `references` for every instance.
  handles: Vec<usize>,
  transforms: Vec<Mat4>,
  attributes: AttributeStorage,
  runtime: GeometryRuntime,
}

impl Instances {
  pub fn new() -> Self {
    Self::default()
  }

  #[inline]
  pub fn instances_num(&self) -> usize {
    self.transforms.len()
  }

  #[inline]
  pub fn references_num(&self) -> usize {
    self.references.len()
  }

  #[inline]
  pub fn references(&self) -> &[InstanceReference] {
    &self.references
  }

  pub(crate) fn references_for_write(&mut self) -> &mut [InstanceReference] {
    &mut self.references
  }

  #[inline]
  pub fn reference_handles(&self) -> &[usize] {
    &self.handles
  }

  #[inline]
  pub fn transforms(&self) -> &[Mat4] {
    &self.transforms
  }

  #[inline]
  pub fn transforms_for_write(&mut self) -> &mut [Mat4] {
    &mut self.transforms
  }

  /// Handle of `reference`, reusing an existing slot for the same data.
  pub fn add_reference(&mut self, reference: impl Into<InstanceReference>) -> usize {
    let reference = reference.into();
    if let Some(handle) = self.references.iter().position(|r| r.is_same(&reference)) {
      return handle;
    }
    self.references.push(reference);
    self.references.len() - 1
  }

  /// Append one instance. Instance attributes grow with default values.
  pub fn add_instance(&mut self, handle: usize, transform: Mat4) {
    debug_assert!(handle < self.references.len());
    self.handles.push(handle);
    self.transforms.push(transform);
    let len = self.transforms.len();
    for (_, layer) in self.attributes.iter_mut() {
      layer.data_mut().resize(len);
    }
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
      &INSTANCES_PROVIDERS,
      sizes,
    )
  }
}

impl AttributeOwner for Instances {
  fn attribute_storage(&self) -> &AttributeStorage {
    &self.attributes
  }

  fn attribute_providers(&self) -> &'static AttributeProviders {
    &INSTANCES_PROVIDERS
  }

  fn domain_size(&self, domain: Domain) -> usize {
    match domain {
      Domain::Instance => self.instances_num(),
      _ => 0,
    }
  }
}
