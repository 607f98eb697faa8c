//! Field domain detection and storing field results as attributes.

use super::context::{FieldContext, GeometryFieldContext, GeometryMut, GeometryRef};
use super::input::FieldInputKind;
use super::Field;
use crate::attributes::{AttributeIdRef, AttributeInit};
use crate::gvarray::GVArray;
use crate::index_mask::IndexMask;
use crate::types::Domain;

/// The domain all inputs of `field` prefer on `geometry`.
///
/// Point clouds and instances have a single domain. On meshes and curves
/// every input must state a preference and they must all agree, otherwise
/// there is no answer.
pub fn try_detect_field_domain(geometry: GeometryRef<'_>, field: &Field) -> Option<Domain> {
  match geometry {
    GeometryRef::PointCloud(_) => return Some(Domain::Point),
    GeometryRef::Instances(_) => return Some(Domain::Instance),
    GeometryRef::Mesh(_) | GeometryRef::Curves(_) => {}
  }

  let mut output_domain = None;
  for input in field.field_inputs() {
    let domain = match (input.kind(), geometry) {
      (FieldInputKind::Geometry(input), geometry) => input.preferred_domain(geometry),
      (FieldInputKind::Mesh(input), GeometryRef::Mesh(mesh)) => input.preferred_domain(mesh),
      (FieldInputKind::Curves(input), GeometryRef::Curves(curves)) => {
        input.preferred_domain(curves)
      }
      _ => None,
    }?;
    match output_domain {
      Some(current) if current != domain => return None,
      _ => output_domain = Some(domain),
    }
  }
  output_domain
}

/// Evaluate `field` on every element of `domain` and store the result as
/// the attribute `id`.
///
/// An existing attribute with the same domain and type is overwritten in
/// place, any other existing attribute under `id` is replaced. Returns false
/// when the attribute cannot be stored, e.g. when `id` names a builtin with
/// other meta data.
pub fn try_capture_field_on_geometry<'i>(
  mut geometry: GeometryMut<'_>,
  id: impl Into<AttributeIdRef<'i>>,
  domain: Domain,
  field: &Field,
) -> bool {
  let id = id.into();
  let data_type = field.data_type();
  let domain_size = geometry.as_ref().domain_size(domain);
  let mut attributes = geometry.attributes_for_write();

  let attribute_exists = attributes
    .lookup_meta_data(id)
    .is_some_and(|meta| meta.domain == domain && meta.data_type == data_type);

  if domain_size == 0 {
    return attribute_exists
      || attributes
        .add(id, domain, data_type, AttributeInit::Construct)
        .is_ok();
  }
  drop(attributes);

  let buffer = {
    let geometry = geometry.as_ref();
    let context = FieldContext::Geometry(GeometryFieldContext::new(geometry, domain));
    field
      .evaluate(&context, &IndexMask::full(domain_size))
      .materialize_to_buffer()
  };

  let mut attributes = geometry.attributes_for_write();
  if attribute_exists {
    if let Some(mut writer) = attributes.lookup_for_write(id) {
      let written = writer.varray.set_all(&GVArray::from_buffer(buffer));
      writer.finish();
      return written.is_ok();
    }
  }

  if attributes.remove(id).is_err() {
    return false;
  }
  match attributes.add(id, domain, data_type, AttributeInit::MoveArray(buffer)) {
    Ok(()) => true,
    Err(err) => {
      tracing::debug!(attribute = %id, %err, "captured field not stored");
      false
    }
  }
}

#[cfg(test)]
#[path = "capture_test.rs"]
mod capture_test;
