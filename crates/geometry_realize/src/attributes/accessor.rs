//! Uniform attribute access over every geometry kind.

use indexmap::IndexSet;

use super::id::{AttributeId, AttributeIdRef};
use super::init::AttributeInit;
use super::storage::{AttributeLayer, AttributeProviders, AttributeStorage, AttributeUpdate};
use super::writer::{GAttributeWriter, GSpanAttributeWriter};
use crate::buffer::AttributeBuffer;
use crate::conversions::get_implicit_type_conversions;
use crate::error::AttributeError;
use crate::geometry::GeometryRuntime;
use crate::gvarray::{GVArray, GVMutableArray, VArray};
use crate::types::{AttributeMetaData, DataType, Domain};
use crate::value::{AttributeType, AttributeValue};

/// A geometry that stores attributes.
///
/// Implementors describe their domains and how values move between domains.
/// Everything else is shared by [`AttributeAccessor`].
pub trait AttributeOwner: Sync {
  fn attribute_storage(&self) -> &AttributeStorage;

  fn attribute_providers(&self) -> &'static AttributeProviders;

  /// Number of elements in `domain`, zero for unsupported domains.
  fn domain_size(&self, domain: Domain) -> usize;

  /// Interpolate `varray` from one domain to another. Only same-domain
  /// requests succeed by default.
  fn adapt_domain(&self, varray: GVArray, from: Domain, to: Domain) -> Option<GVArray> {
    (from == to).then_some(varray)
  }
}

/// Element counts per domain, indexed by [`Domain`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DomainSizes([usize; 6]);

impl DomainSizes {
  pub fn from_owner(owner: &dyn AttributeOwner) -> Self {
    let mut sizes = [0; 6];
    for domain in Domain::ALL {
      sizes[domain.index()] = owner.domain_size(domain);
    }
    Self(sizes)
  }

  pub fn with(mut self, domain: Domain, size: usize) -> Self {
    self.0[domain.index()] = size;
    self
  }

  #[inline]
  pub fn get(&self, domain: Domain) -> usize {
    self.0[domain.index()]
  }
}

/// Read result: an array in the attribute's native domain.
#[derive(Clone, Debug)]
pub struct GAttributeReader {
  pub varray: GVArray,
  pub domain: Domain,
}

/// Read-only attribute access.
#[derive(Clone, Copy)]
pub struct AttributeAccessor<'a> {
  owner: &'a dyn AttributeOwner,
}

impl<'a> AttributeAccessor<'a> {
  pub fn new(owner: &'a dyn AttributeOwner) -> Self {
    Self { owner }
  }

  #[inline]
  pub fn domain_size(&self, domain: Domain) -> usize {
    self.owner.domain_size(domain)
  }

  pub fn providers(&self) -> &'static AttributeProviders {
    self.owner.attribute_providers()
  }

  pub fn is_builtin<'i>(&self, id: impl Into<AttributeIdRef<'i>>) -> bool {
    self.providers().builtin(id.into()).is_some()
  }

  pub fn contains<'i>(&self, id: impl Into<AttributeIdRef<'i>>) -> bool {
    self.owner.attribute_storage().contains(id.into())
  }

  /// Native-domain reader, `None` if absent.
  pub fn lookup<'i>(&self, id: impl Into<AttributeIdRef<'i>>) -> Option<GAttributeReader> {
    let layer = self.owner.attribute_storage().get(id.into())?;
    Some(GAttributeReader {
      varray: GVArray::from_shared(layer.data.clone()),
      domain: layer.domain,
    })
  }

  /// Reader adapted to `domain` and `data_type` when given.
  ///
  /// `None` when the attribute is absent or either adaptation is impossible.
  pub fn lookup_with<'i>(
    &self,
    id: impl Into<AttributeIdRef<'i>>,
    domain: Option<Domain>,
    data_type: Option<DataType>,
  ) -> Option<GVArray> {
    let GAttributeReader {
      mut varray,
      domain: native_domain,
    } = self.lookup(id)?;
    if let Some(domain) = domain {
      if domain != native_domain {
        varray = self.owner.adapt_domain(varray, native_domain, domain)?;
      }
    }
    if let Some(data_type) = data_type {
      varray = get_implicit_type_conversions().try_convert(varray, data_type)?;
    }
    Some(varray)
  }

  /// Typed reader adapted to `domain`.
  pub fn lookup_typed<'i, T: AttributeType>(
    &self,
    id: impl Into<AttributeIdRef<'i>>,
    domain: Domain,
  ) -> Option<VArray<T>> {
    self
      .lookup_with(id, Some(domain), Some(T::DATA_TYPE))
      .and_then(VArray::from_gvarray)
  }

  /// Like [`Self::lookup_with`] but falls back to a constant array of the
  /// domain size. `default` must have type `data_type`.
  pub fn lookup_or_default<'i>(
    &self,
    id: impl Into<AttributeIdRef<'i>>,
    domain: Domain,
    data_type: DataType,
    default: Option<AttributeValue>,
  ) -> GVArray {
    if let Some(varray) = self.lookup_with(id, Some(domain), Some(data_type)) {
      return varray;
    }
    let value = default
      .filter(|value| value.data_type() == data_type)
      .unwrap_or_else(|| AttributeValue::default_for(data_type));
    GVArray::from_single(value, self.domain_size(domain))
  }

  pub fn lookup_or_default_typed<'i, T: AttributeType>(
    &self,
    id: impl Into<AttributeIdRef<'i>>,
    domain: Domain,
    default: T,
  ) -> VArray<T> {
    self
      .lookup_typed(id, domain)
      .unwrap_or_else(|| VArray::from_single(default, self.domain_size(domain)))
  }

  pub fn lookup_meta_data<'i>(&self, id: impl Into<AttributeIdRef<'i>>) -> Option<AttributeMetaData> {
    self
      .owner
      .attribute_storage()
      .get(id.into())
      .map(AttributeLayer::meta_data)
  }

  /// Visit every attribute until `callback` returns false. Returns false if
  /// stopped early.
  pub fn for_all(&self, mut callback: impl FnMut(&AttributeId, AttributeMetaData) -> bool) -> bool {
    for (id, layer) in self.owner.attribute_storage().iter() {
      if !callback(id, layer.meta_data()) {
        return false;
      }
    }
    true
  }

  pub fn all_ids(&self) -> IndexSet<AttributeId> {
    self
      .owner
      .attribute_storage()
      .iter()
      .map(|(id, _)| id.clone())
      .collect()
  }

  pub fn adapt_domain(&self, varray: GVArray, from: Domain, to: Domain) -> Option<GVArray> {
    self.owner.adapt_domain(varray, from, to)
  }
}

/// Mutable attribute access.
///
/// Not thread-safe across operations on the same owner. Writers borrow the
/// accessor, so no structural change can happen while one is alive.
pub struct MutableAttributeAccessor<'a> {
  storage: &'a mut AttributeStorage,
  runtime: &'a GeometryRuntime,
  providers: &'static AttributeProviders,
  sizes: DomainSizes,
}

impl<'a> MutableAttributeAccessor<'a> {
  pub fn new(
    storage: &'a mut AttributeStorage,
    runtime: &'a GeometryRuntime,
    providers: &'static AttributeProviders,
    sizes: DomainSizes,
  ) -> Self {
    Self {
      storage,
      runtime,
      providers,
      sizes,
    }
  }

  #[inline]
  pub fn domain_size(&self, domain: Domain) -> usize {
    self.sizes.get(domain)
  }

  pub fn contains<'i>(&self, id: impl Into<AttributeIdRef<'i>>) -> bool {
    self.storage.contains(id.into())
  }

  pub fn lookup<'i>(&self, id: impl Into<AttributeIdRef<'i>>) -> Option<GAttributeReader> {
    let layer = self.storage.get(id.into())?;
    Some(GAttributeReader {
      varray: GVArray::from_shared(layer.data.clone()),
      domain: layer.domain,
    })
  }

  pub fn lookup_meta_data<'i>(&self, id: impl Into<AttributeIdRef<'i>>) -> Option<AttributeMetaData> {
    self.storage.get(id.into()).map(AttributeLayer::meta_data)
  }

  pub fn for_all(&self, mut callback: impl FnMut(&AttributeId, AttributeMetaData) -> bool) -> bool {
    for (id, layer) in self.storage.iter() {
      if !callback(id, layer.meta_data()) {
        return false;
      }
    }
    true
  }

  pub fn all_ids(&self) -> IndexSet<AttributeId> {
    self.storage.iter().map(|(id, _)| id.clone()).collect()
  }

  /// Add a new attribute.
  pub fn add(
    &mut self,
    id: impl Into<AttributeId>,
    domain: Domain,
    data_type: DataType,
    init: AttributeInit,
  ) -> Result<(), AttributeError> {
    let id = id.into();
    if id.name() == Some("") {
      return Err(AttributeError::EmptyName);
    }
    if self.storage.contains(id.as_ref()) {
      return Err(AttributeError::AlreadyExists(id.to_string()));
    }
    if let Some(builtin) = self.providers.builtin(id.as_ref()) {
      if builtin.domain != domain || builtin.data_type != data_type {
        return Err(AttributeError::BuiltinMismatch {
          name: builtin.name.to_string(),
          domain: builtin.domain,
          data_type: builtin.data_type,
        });
      }
    }
    if !self.providers.supports_domain(domain) {
      return Err(AttributeError::UnsupportedDomain(domain));
    }

    let size = self.sizes.get(domain);
    let data = match init {
      AttributeInit::Construct | AttributeInit::DefaultValue => {
        AttributeBuffer::new_default(data_type, size)
      }
      AttributeInit::VArray(varray) => {
        if varray.len() != size {
          return Err(AttributeError::SizeMismatch {
            expected: size,
            actual: varray.len(),
          });
        }
        let from = varray.data_type();
        get_implicit_type_conversions()
          .try_convert(varray, data_type)
          .ok_or(AttributeError::NotConvertible { from, to: data_type })?
          .materialize_to_buffer()
      }
      AttributeInit::MoveArray(buffer) => {
        if buffer.data_type() != data_type {
          return Err(AttributeError::TypeMismatch {
            expected: data_type,
            actual: buffer.data_type(),
          });
        }
        if buffer.len() != size {
          return Err(AttributeError::SizeMismatch {
            expected: size,
            actual: buffer.len(),
          });
        }
        buffer
      }
    };

    self.storage.insert(id, AttributeLayer::new(domain, data));
    Ok(())
  }

  /// Remove an attribute. Returns `Ok(false)` if it did not exist.
  pub fn remove<'i>(&mut self, id: impl Into<AttributeIdRef<'i>>) -> Result<bool, AttributeError> {
    let id = id.into();
    if let Some(builtin) = self.providers.builtin(id) {
      if !builtin.deletable {
        return Err(AttributeError::RequiredBuiltin(builtin.name.to_string()));
      }
    }
    Ok(self.storage.remove(id).is_some())
  }

  /// Remove every attribute with an anonymous id. Returns how many were
  /// removed.
  pub fn remove_anonymous(&mut self) -> usize {
    let before = self.storage.len();
    self.storage.retain(|id, _| !id.is_anonymous());
    before - self.storage.len()
  }

  fn update_for(&self, id: AttributeIdRef<'_>) -> Option<AttributeUpdate> {
    self.providers.builtin(id).and_then(|builtin| builtin.update)
  }

  /// Writer over the stored span of an existing attribute.
  pub fn lookup_for_write_span<'i>(
    &mut self,
    id: impl Into<AttributeIdRef<'i>>,
  ) -> Option<GSpanAttributeWriter<'_>> {
    let id = id.into();
    let update = self.update_for(id);
    let runtime = self.runtime;
    let layer = self.storage.get_mut(id)?;
    let domain = layer.domain;
    Some(GSpanAttributeWriter::new(
      layer.data_mut().as_mut_span(),
      domain,
      id.to_owned(),
      runtime,
      update,
    ))
  }

  /// Writer over an existing attribute in its stored type.
  pub fn lookup_for_write<'i>(
    &mut self,
    id: impl Into<AttributeIdRef<'i>>,
  ) -> Option<GAttributeWriter<'_>> {
    let id = id.into();
    let update = self.update_for(id);
    let runtime = self.runtime;
    let layer = self.storage.get_mut(id)?;
    let domain = layer.domain;
    Some(GAttributeWriter::new(
      GVMutableArray::Span(layer.data_mut().as_mut_span()),
      domain,
      id.to_owned(),
      runtime,
      update,
    ))
  }

  /// Writer that reads and writes as `data_type`, converting on access.
  pub fn lookup_for_write_as<'i>(
    &mut self,
    id: impl Into<AttributeIdRef<'i>>,
    data_type: DataType,
  ) -> Option<GAttributeWriter<'_>> {
    let id = id.into();
    let update = self.update_for(id);
    let runtime = self.runtime;
    let layer = self.storage.get_mut(id)?;
    let domain = layer.domain;
    let varray = get_implicit_type_conversions()
      .try_convert_mut(GVMutableArray::Span(layer.data_mut().as_mut_span()), data_type)?;
    Some(GAttributeWriter::new(varray, domain, id.to_owned(), runtime, update))
  }

  /// Existing attribute if its meta data matches, otherwise a newly added
  /// one. `None` if it exists with other meta data or cannot be added.
  pub fn lookup_or_add_for_write<'i>(
    &mut self,
    id: impl Into<AttributeIdRef<'i>>,
    domain: Domain,
    data_type: DataType,
    init: AttributeInit,
  ) -> Option<GAttributeWriter<'_>> {
    let id = id.into();
    if !self.prepare_for_write(id, domain, data_type, init) {
      return None;
    }
    self.lookup_for_write(id)
  }

  /// Span variant of [`Self::lookup_or_add_for_write`].
  pub fn lookup_or_add_for_write_span<'i>(
    &mut self,
    id: impl Into<AttributeIdRef<'i>>,
    domain: Domain,
    data_type: DataType,
    init: AttributeInit,
  ) -> Option<GSpanAttributeWriter<'_>> {
    let id = id.into();
    if !self.prepare_for_write(id, domain, data_type, init) {
      return None;
    }
    self.lookup_for_write_span(id)
  }

  /// Span writer for a caller that overwrites every value.
  pub fn lookup_or_add_for_write_only_span<'i>(
    &mut self,
    id: impl Into<AttributeIdRef<'i>>,
    domain: Domain,
    data_type: DataType,
  ) -> Option<GSpanAttributeWriter<'_>> {
    self.lookup_or_add_for_write_span(id, domain, data_type, AttributeInit::Construct)
  }

  /// Write-only span writers for several attributes at once, in request
  /// order. Slots that cannot be created, or repeat an earlier id, are
  /// `None`.
  pub fn lookup_or_add_for_write_only_spans(
    &mut self,
    requests: &[(AttributeId, AttributeMetaData)],
  ) -> Vec<Option<GSpanAttributeWriter<'_>>> {
    let indices: Vec<Option<usize>> = requests
      .iter()
      .map(|(id, meta)| {
        if self.prepare_for_write(id.as_ref(), meta.domain, meta.data_type, AttributeInit::Construct) {
          self.storage.index_of(id.as_ref())
        } else {
          None
        }
      })
      .collect();

    let providers = self.providers;
    let runtime = self.runtime;
    let mut layers: Vec<Option<(&AttributeId, &mut AttributeLayer)>> =
      self.storage.iter_mut().map(Some).collect();

    indices
      .into_iter()
      .map(|index| {
        let (id, layer) = layers.get_mut(index?)?.take()?;
        let update = providers.builtin(id.as_ref()).and_then(|builtin| builtin.update);
        let domain = layer.domain;
        Some(GSpanAttributeWriter::new(
          layer.data_mut().as_mut_span(),
          domain,
          id.clone(),
          runtime,
          update,
        ))
      })
      .collect()
  }

  fn prepare_for_write(
    &mut self,
    id: AttributeIdRef<'_>,
    domain: Domain,
    data_type: DataType,
    init: AttributeInit,
  ) -> bool {
    match self.lookup_meta_data(id) {
      Some(meta) => meta.domain == domain && meta.data_type == data_type,
      None => self.add(id, domain, data_type, init).is_ok(),
    }
  }
}

#[cfg(test)]
#[path = "accessor_test.rs"]
mod accessor_test;
