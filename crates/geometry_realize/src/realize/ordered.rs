//! Attribute slots shared by every geometry kind during a realize pass.
//!
//! Attributes are addressed by index into [`OrderedAttributes`] so the per
//! task loop never hashes names.

use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};
use rayon::prelude::*;
use smallvec::SmallVec;

use crate::attributes::{
  gather_attributes_for_propagation, AttributeAccessor, AttributeId, AttributePropagation,
  GSpanAttributeWriter,
};
use crate::buffer::{AttributeBuffer, GMutableSpan};
use crate::geometry::{GeometryComponentType, GeometrySet};
use crate::gvarray::GVArray;
use crate::threading::{parallel_copy_span, parallel_fill_span, ATTRIBUTE_GRAIN_SIZE};
use crate::types::{AttributeKind, AttributeMetaData, DataType, Domain};
use crate::value::AttributeValue;

/// Per-slot value used where a source lacks the attribute. `None` means the
/// type's default.
pub(crate) type AttributeFallbacks = SmallVec<[Option<AttributeValue>; 8]>;

/// Generic attributes of one geometry kind with stable slot indices.
#[derive(Debug, Default)]
pub(crate) struct OrderedAttributes {
  pub ids: IndexSet<AttributeId>,
  pub kinds: Vec<AttributeKind>,
}

impl OrderedAttributes {
  #[inline]
  pub fn len(&self) -> usize {
    self.kinds.len()
  }

  #[inline]
  pub fn index_of(&self, id: &AttributeId) -> Option<usize> {
    self.ids.get_index_of(id)
  }

  pub fn iter(&self) -> impl Iterator<Item = (&AttributeId, AttributeKind)> + '_ {
    self.ids.iter().zip(self.kinds.iter().copied())
  }

  /// Writer requests in slot order.
  pub fn requests(&self) -> impl Iterator<Item = (AttributeId, AttributeMetaData)> + '_ {
    self.iter().map(|(id, kind)| (id.clone(), kind))
  }

  pub fn empty_fallbacks(&self) -> AttributeFallbacks {
    smallvec::smallvec![None; self.len()]
  }
}

/// Generic attributes to propagate into `component_type`. Names in `handled`
/// are written by the kind itself and left out, as is `id`.
///
/// The flag is true when any source has an `id` attribute.
pub(crate) fn gather_generic_attributes(
  geometry: &GeometrySet,
  component_type: GeometryComponentType,
  realize_instance_attributes: bool,
  propagation: &AttributePropagation,
  handled: &[&str],
) -> (OrderedAttributes, bool) {
  let mut src_component_types = vec![component_type];
  if realize_instance_attributes {
    src_component_types.push(GeometryComponentType::Instances);
  }

  let mut attributes: IndexMap<AttributeId, AttributeMetaData> = IndexMap::new();
  gather_attributes_for_propagation(
    geometry,
    &src_component_types,
    component_type,
    true,
    propagation,
    &mut attributes,
  );
  for name in handled {
    attributes.shift_remove(&AttributeId::from(*name));
  }
  let create_id = attributes.shift_remove(&AttributeId::from("id")).is_some();

  let mut ordered = OrderedAttributes::default();
  for (id, kind) in attributes {
    ordered.ids.insert(id);
    ordered.kinds.push(kind);
  }
  (ordered, create_id)
}

/// Source arrays for every slot, materialized once so tasks only copy spans.
///
/// Slots whose attribute is missing, or cannot be converted to the slot
/// type, stay empty.
pub(crate) fn resolve_source_attributes(
  attributes: AttributeAccessor<'_>,
  ordered: &OrderedAttributes,
) -> Vec<Option<Arc<AttributeBuffer>>> {
  ordered
    .iter()
    .map(|(id, kind)| {
      if !attributes.contains(id) {
        return None;
      }
      let varray = attributes.lookup_with(id, Some(kind.domain), Some(kind.data_type));
      if varray.is_none() {
        tracing::debug!(
          attribute = %id,
          domain = %kind.domain,
          data_type = %kind.data_type,
          "attribute not propagated, it cannot be adapted"
        );
      }
      varray.map(|varray| varray.into_shared_buffer())
    })
    .collect()
}

/// An attribute the kind writes itself, adapted to the domain and type it
/// expects. `None` when the source lacks it.
pub(crate) fn resolve_builtin(
  attributes: AttributeAccessor<'_>,
  name: &str,
  domain: Domain,
  data_type: DataType,
) -> Option<Arc<AttributeBuffer>> {
  attributes
    .lookup_with(name, Some(domain), Some(data_type))
    .map(GVArray::into_shared_buffer)
}

/// Split every generic writer into one slice per task.
///
/// `task_sizes(task, domain)` is the number of elements task `task` writes
/// on `domain`. The result is indexed by task, then by slot.
pub(crate) fn split_generic_writers<'a>(
  writers: &'a mut [Option<GSpanAttributeWriter<'_>>],
  tasks_num: usize,
  task_sizes: impl Fn(usize, Domain) -> usize,
) -> Vec<Vec<Option<GMutableSpan<'a>>>> {
  let mut per_task: Vec<Vec<Option<GMutableSpan<'a>>>> = (0..tasks_num)
    .map(|_| Vec::with_capacity(writers.len()))
    .collect();
  for writer in writers.iter_mut() {
    match writer {
      Some(writer) => {
        let domain = writer.domain;
        let parts = writer
          .span
          .reborrow()
          .split_lengths((0..tasks_num).map(|task| task_sizes(task, domain)));
        for (task_spans, part) in per_task.iter_mut().zip(parts) {
          task_spans.push(Some(part));
        }
      }
      None => per_task.iter_mut().for_each(|task_spans| task_spans.push(None)),
    }
  }
  per_task
}

/// Split an optional typed destination into one slice per task.
pub(crate) fn split_optional<'a, T>(
  slice: Option<&'a mut [T]>,
  lengths: impl IntoIterator<Item = usize>,
) -> Vec<Option<&'a mut [T]>> {
  let lengths = lengths.into_iter();
  match slice {
    Some(slice) => crate::threading::split_lengths_mut(slice, lengths)
      .into_iter()
      .map(Some)
      .collect(),
    None => lengths.map(|_| None).collect(),
  }
}

/// Fill one task's slice of every generic attribute: copy the source values
/// where the source has them, else broadcast the slot's fallback.
pub(crate) fn copy_generic_attributes_to_result(
  src_attributes: &[Option<Arc<AttributeBuffer>>],
  fallbacks: &AttributeFallbacks,
  dst_attributes: Vec<Option<GMutableSpan<'_>>>,
) {
  dst_attributes
    .into_par_iter()
    .enumerate()
    .with_min_len(ATTRIBUTE_GRAIN_SIZE)
    .for_each(|(slot, dst)| {
      let Some(dst) = dst else {
        return;
      };
      let result = match src_attributes.get(slot).and_then(Option::as_ref) {
        Some(src) => parallel_copy_span(src.as_span(), dst),
        None => {
          let value = fallbacks
            .get(slot)
            .copied()
            .flatten()
            .unwrap_or_else(|| AttributeValue::default_for(dst.data_type()));
          parallel_fill_span(&value, dst)
        }
      };
      debug_assert!(result.is_ok(), "slot {slot} does not match its source type");
    });
}
