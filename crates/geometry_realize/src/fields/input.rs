//! Field inputs: leaves of a field that read data from the context.
//!
//! An input implements one of the kind traits below and reports it through
//! [`FieldInput::kind`]. [`get_varray_for_context`] then adapts whatever
//! context it is evaluated in, trying the kind-erased geometry context first
//! and the specific geometry kinds after that.

use std::any::Any;
use std::fmt;

use super::context::{FieldContext, GeometryFieldContext, GeometryRef};
use crate::geometry::{Curves, Instances, Mesh, PointCloud};
use crate::gvarray::GVArray;
use crate::index_mask::IndexMask;
use crate::types::{DataType, Domain};

pub trait FieldInput: Send + Sync + fmt::Debug + 'static {
  fn data_type(&self) -> DataType;

  fn debug_name(&self) -> String;

  fn kind(&self) -> FieldInputKind<'_>;

  fn as_any(&self) -> &dyn Any;

  /// Inputs that are equal are evaluated once per field.
  fn is_equal_to(&self, _other: &dyn FieldInput) -> bool {
    false
  }
}

/// Which geometry kinds an input understands.
#[derive(Clone, Copy)]
pub enum FieldInputKind<'a> {
  /// Reads only the context itself, e.g. element indices.
  Context(&'a dyn ContextFieldInput),
  /// Works on every geometry kind.
  Geometry(&'a dyn GeometryFieldInput),
  Mesh(&'a dyn MeshFieldInput),
  Curves(&'a dyn CurvesFieldInput),
  PointCloud(&'a dyn PointCloudFieldInput),
  Instances(&'a dyn InstancesFieldInput),
}

pub trait ContextFieldInput {
  fn get_varray_for_field_context(
    &self,
    context: &FieldContext<'_>,
    mask: &IndexMask,
  ) -> Option<GVArray>;
}

pub trait GeometryFieldInput {
  fn get_varray_for_geometry(
    &self,
    context: &GeometryFieldContext<'_>,
    mask: &IndexMask,
  ) -> Option<GVArray>;

  fn preferred_domain(&self, _geometry: GeometryRef<'_>) -> Option<Domain> {
    None
  }
}

pub trait MeshFieldInput {
  fn get_varray_for_mesh(&self, mesh: &Mesh, domain: Domain, mask: &IndexMask) -> Option<GVArray>;

  fn preferred_domain(&self, _mesh: &Mesh) -> Option<Domain> {
    None
  }
}

pub trait CurvesFieldInput {
  fn get_varray_for_curves(
    &self,
    curves: &Curves,
    domain: Domain,
    mask: &IndexMask,
  ) -> Option<GVArray>;

  fn preferred_domain(&self, _curves: &Curves) -> Option<Domain> {
    None
  }
}

pub trait PointCloudFieldInput {
  fn get_varray_for_pointcloud(&self, pointcloud: &PointCloud, mask: &IndexMask) -> Option<GVArray>;
}

pub trait InstancesFieldInput {
  fn get_varray_for_instances(&self, instances: &Instances, mask: &IndexMask) -> Option<GVArray>;
}

/// Evaluate `input` in `context`.
///
/// `None` when the input does not apply to the context's geometry kind or
/// has no data for it.
pub fn get_varray_for_context(
  input: &dyn FieldInput,
  context: &FieldContext<'_>,
  mask: &IndexMask,
) -> Option<GVArray> {
  match input.kind() {
    FieldInputKind::Context(input) => input.get_varray_for_field_context(context, mask),
    FieldInputKind::Geometry(input) => {
      input.get_varray_for_geometry(&context.as_geometry_context(), mask)
    }
    FieldInputKind::Mesh(input) => match context {
      FieldContext::Geometry(context) => {
        input.get_varray_for_mesh(context.mesh()?, context.domain(), mask)
      }
      FieldContext::Mesh(context) => input.get_varray_for_mesh(context.mesh(), context.domain(), mask),
      _ => None,
    },
    FieldInputKind::Curves(input) => match context {
      FieldContext::Geometry(context) => {
        input.get_varray_for_curves(context.curves()?, context.domain(), mask)
      }
      FieldContext::Curves(context) => {
        input.get_varray_for_curves(context.curves(), context.domain(), mask)
      }
      _ => None,
    },
    FieldInputKind::PointCloud(input) => match context {
      FieldContext::Geometry(context) => {
        input.get_varray_for_pointcloud(context.pointcloud()?, mask)
      }
      FieldContext::PointCloud(context) => input.get_varray_for_pointcloud(context.pointcloud(), mask),
      _ => None,
    },
    FieldInputKind::Instances(input) => match context {
      FieldContext::Geometry(context) => input.get_varray_for_instances(context.instances()?, mask),
      FieldContext::Instances(context) => input.get_varray_for_instances(context.instances(), mask),
      _ => None,
    },
  }
}
