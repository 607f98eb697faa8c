//! Helpers that carry attributes from source geometry to new geometry.

use indexmap::map::Entry;
use indexmap::IndexMap;

use super::accessor::{AttributeAccessor, MutableAttributeAccessor};
use super::id::{AnonymousAttributeId, AttributeId};
use super::writer::GSpanAttributeWriter;
use crate::geometry::{GeometryComponentType, GeometrySet};
use crate::gvarray::GVArray;
use crate::index_mask::IndexMask;
use crate::types::{
  attribute_data_type_highest_complexity, attribute_domain_highest_priority, AttributeMetaData,
  Domain,
};

/// Which anonymous attributes survive an operation. Named attributes always
/// do.
#[derive(Clone, Debug)]
pub struct AttributePropagation {
  pub propagate_all: bool,
  kept: Vec<AnonymousAttributeId>,
}

impl Default for AttributePropagation {
  fn default() -> Self {
    Self::all()
  }
}

impl AttributePropagation {
  /// Propagate every anonymous attribute.
  pub fn all() -> Self {
    Self {
      propagate_all: true,
      kept: Vec::new(),
    }
  }

  /// Propagate only the given anonymous attributes.
  pub fn only(kept: impl IntoIterator<Item = AnonymousAttributeId>) -> Self {
    Self {
      propagate_all: false,
      kept: kept.into_iter().collect(),
    }
  }

  pub fn propagate(&self, id: &AnonymousAttributeId) -> bool {
    self.propagate_all || self.kept.contains(id)
  }

  /// Named ids always pass.
  pub fn should_keep(&self, id: &AttributeId) -> bool {
    id.anonymous_id().map_or(true, |anonymous| self.propagate(anonymous))
  }
}

/// Collect the attributes of `component_types` anywhere in `geometry` that
/// should exist on a new `dst_component`.
///
/// Same-id attributes from different sources are merged to the highest
/// priority domain and the most complex type. Instance attributes land on
/// points of non-instance destinations.
pub fn gather_attributes_for_propagation(
  geometry: &GeometrySet,
  component_types: &[GeometryComponentType],
  dst_component: GeometryComponentType,
  include_instances: bool,
  propagation: &AttributePropagation,
  r_attributes: &mut IndexMap<AttributeId, AttributeMetaData>,
) {
  let Some(dst_providers) = dst_component.attribute_providers() else {
    return;
  };

  let mut visit = |geometry: &GeometrySet| {
    for &component_type in component_types {
      let Some(attributes) = geometry.attributes(component_type) else {
        continue;
      };
      attributes.for_all(|id, meta| {
        // Builtins of other kinds have no meaning on the destination.
        if attributes.is_builtin(id) && dst_providers.builtin(id.as_ref()).is_none() {
          return true;
        }
        if !propagation.should_keep(id) {
          return true;
        }
        let domain = if dst_component != GeometryComponentType::Instances && meta.domain == Domain::Instance {
          Domain::Point
        } else {
          meta.domain
        };
        if !dst_providers.supports_domain(domain) {
          return true;
        }
        match r_attributes.entry(id.clone()) {
          Entry::Vacant(entry) => {
            entry.insert(AttributeMetaData::new(domain, meta.data_type));
          }
          Entry::Occupied(mut entry) => {
            let kind = entry.get_mut();
            if let Some(merged) = attribute_domain_highest_priority([kind.domain, domain]) {
              kind.domain = merged;
            }
            if let Some(merged) = attribute_data_type_highest_complexity([kind.data_type, meta.data_type]) {
              kind.data_type = merged;
            }
          }
        }
        true
      });
    }
  };

  if include_instances {
    geometry.foreach_geometry_recursive(&mut visit);
  } else {
    visit(geometry);
  }
}

/// Copy every `domain` attribute of `src` selected by `selection` into
/// `dst`, compacting the selected elements.
///
/// Anonymous attributes rejected by `propagation` and names in `skip` are
/// left out.
pub fn copy_attribute_domain(
  src: AttributeAccessor<'_>,
  dst: &mut MutableAttributeAccessor<'_>,
  selection: &IndexMask,
  domain: Domain,
  propagation: &AttributePropagation,
  skip: &[&str],
) {
  let mut to_copy = Vec::new();
  src.for_all(|id, meta| {
    if meta.domain == domain && keep_for_transfer(id, propagation, skip) {
      to_copy.push((id.clone(), meta));
    }
    true
  });

  for (id, meta) in to_copy {
    let Some(reader) = src.lookup(&id) else {
      continue;
    };
    let Some(mut writer) = dst.lookup_or_add_for_write_only_span(&id, domain, meta.data_type) else {
      continue;
    };
    let gathered = reader.varray.materialize_to_buffer().gather(selection);
    if let Err(err) = writer.span.copy_from(gathered.as_span()) {
      tracing::debug!(attribute = %id, %err, "attribute not copied");
    }
    writer.finish();
  }
}

/// A source attribute and the destination writer it should be transferred
/// to. The caller fills `dst` and must finish it.
pub struct AttributeTransferData<'a> {
  pub src: GVArray,
  pub meta_data: AttributeMetaData,
  pub dst: GSpanAttributeWriter<'a>,
}

/// Open destination writers for every attribute of `src` on one of
/// `domains`, with the same filtering as [`copy_attribute_domain`].
pub fn retrieve_attributes_for_transfer<'a>(
  src: AttributeAccessor<'_>,
  dst: &'a mut MutableAttributeAccessor<'_>,
  domains: &[Domain],
  propagation: &AttributePropagation,
  skip: &[&str],
) -> Vec<AttributeTransferData<'a>> {
  let mut sources = Vec::new();
  src.for_all(|id, meta| {
    if domains.contains(&meta.domain) && keep_for_transfer(id, propagation, skip) {
      if let Some(reader) = src.lookup(id) {
        sources.push((id.clone(), meta, reader.varray));
      }
    }
    true
  });

  let requests: Vec<(AttributeId, AttributeMetaData)> =
    sources.iter().map(|(id, meta, _)| (id.clone(), *meta)).collect();
  let writers = dst.lookup_or_add_for_write_only_spans(&requests);

  sources
    .into_iter()
    .zip(writers)
    .filter_map(|((_, meta_data, src), dst)| {
      Some(AttributeTransferData {
        src,
        meta_data,
        dst: dst?,
      })
    })
    .collect()
}

fn keep_for_transfer(id: &AttributeId, propagation: &AttributePropagation, skip: &[&str]) -> bool {
  if !propagation.should_keep(id) {
    return false;
  }
  !id.name().is_some_and(|name| skip.contains(&name))
}

#[cfg(test)]
#[path = "propagation_test.rs"]
mod propagation_test;
