//! Physical attribute storage shared by every geometry kind, plus the static
//! description of each kind's builtin attributes.

use std::sync::Arc;

use indexmap::map::Entry;
use indexmap::IndexMap;

use super::id::{AttributeId, AttributeIdRef};
use crate::buffer::AttributeBuffer;
use crate::types::{AttributeMetaData, DataType, Domain};

/// One stored column.
#[derive(Clone, Debug, PartialEq)]
pub struct AttributeLayer {
  pub domain: Domain,
  /// Shared until written; writers copy on demand.
  pub data: Arc<AttributeBuffer>,
}

impl AttributeLayer {
  pub fn new(domain: Domain, data: AttributeBuffer) -> Self {
    Self {
      domain,
      data: Arc::new(data),
    }
  }

  #[inline]
  pub fn meta_data(&self) -> AttributeMetaData {
    AttributeMetaData::new(self.domain, self.data.data_type())
  }

  /// Unique mutable access to the data.
  #[inline]
  pub fn data_mut(&mut self) -> &mut AttributeBuffer {
    Arc::make_mut(&mut self.data)
  }
}

/// Insertion ordered set of attribute layers.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AttributeStorage {
  layers: IndexMap<AttributeId, AttributeLayer>,
}

impl AttributeStorage {
  pub fn new() -> Self {
    Self::default()
  }

  #[inline]
  pub fn len(&self) -> usize {
    self.layers.len()
  }

  #[inline]
  pub fn is_empty(&self) -> bool {
    self.layers.is_empty()
  }

  #[inline]
  pub fn get(&self, id: AttributeIdRef<'_>) -> Option<&AttributeLayer> {
    self.layers.get(&id)
  }

  #[inline]
  pub fn get_mut(&mut self, id: AttributeIdRef<'_>) -> Option<&mut AttributeLayer> {
    self.layers.get_mut(&id)
  }

  #[inline]
  pub fn contains(&self, id: AttributeIdRef<'_>) -> bool {
    self.layers.contains_key(&id)
  }

  #[inline]
  pub fn index_of(&self, id: AttributeIdRef<'_>) -> Option<usize> {
    self.layers.get_index_of(&id)
  }

  /// Insert a new layer. Returns false and leaves storage unchanged if the id
  /// is taken.
  pub fn insert(&mut self, id: AttributeId, layer: AttributeLayer) -> bool {
    match self.layers.entry(id) {
      Entry::Occupied(_) => false,
      Entry::Vacant(entry) => {
        entry.insert(layer);
        true
      }
    }
  }

  /// Remove a layer, keeping the order of the others.
  pub fn remove(&mut self, id: AttributeIdRef<'_>) -> Option<AttributeLayer> {
    self.layers.shift_remove(&id)
  }

  pub fn retain(&mut self, mut keep: impl FnMut(&AttributeId, &AttributeLayer) -> bool) {
    self.layers.retain(|id, layer| keep(id, layer));
  }

  pub fn iter(&self) -> impl Iterator<Item = (&AttributeId, &AttributeLayer)> {
    self.layers.iter()
  }

  pub fn iter_mut(&mut self) -> impl Iterator<Item = (&AttributeId, &mut AttributeLayer)> {
    self.layers.iter_mut()
  }
}

/// Cache invalidation triggered when a builtin attribute writer finishes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AttributeUpdate {
  /// Positions changed, derived normals are stale.
  Positions,
  /// Curve types changed, cached type counts are stale.
  CurveTypes,
}

/// Description of an attribute with fixed meaning for one geometry kind.
#[derive(Clone, Copy, Debug)]
pub struct BuiltinAttribute {
  pub name: &'static str,
  pub domain: Domain,
  pub data_type: DataType,
  /// Required builtins always exist and cannot be removed.
  pub deletable: bool,
  pub update: Option<AttributeUpdate>,
}

impl BuiltinAttribute {
  pub const fn new(name: &'static str, domain: Domain, data_type: DataType) -> Self {
    Self {
      name,
      domain,
      data_type,
      deletable: true,
      update: None,
    }
  }

  pub const fn required(self) -> Self {
    Self {
      deletable: false,
      ..self
    }
  }

  pub const fn with_update(self, update: AttributeUpdate) -> Self {
    Self {
      update: Some(update),
      ..self
    }
  }

  #[inline]
  pub fn meta_data(&self) -> AttributeMetaData {
    AttributeMetaData::new(self.domain, self.data_type)
  }
}

/// Static attribute rules of one geometry kind.
#[derive(Debug)]
pub struct AttributeProviders {
  pub builtins: &'static [BuiltinAttribute],
  pub domains: &'static [Domain],
}

impl AttributeProviders {
  pub fn builtin(&self, id: AttributeIdRef<'_>) -> Option<&'static BuiltinAttribute> {
    let name = id.name()?;
    self.builtins.iter().find(|builtin| builtin.name == name)
  }

  #[inline]
  pub fn supports_domain(&self, domain: Domain) -> bool {
    self.domains.contains(&domain)
  }
}
