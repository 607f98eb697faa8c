//! Field inputs provided by the geometry layer.

use std::any::Any;

use super::context::{FieldContext, GeometryFieldContext, GeometryRef};
use super::input::{
  ContextFieldInput, CurvesFieldInput, FieldInput, FieldInputKind, GeometryFieldInput,
  MeshFieldInput,
};
use crate::attributes::AnonymousAttributeId;
use crate::geometry::{Curves, Mesh};
use crate::gvarray::GVArray;
use crate::index_mask::IndexMask;
use crate::types::{DataType, Domain};
use crate::value::AttributeValue;

fn index_varray(len: usize) -> GVArray {
  GVArray::from_func(DataType::Int32, len, |i| AttributeValue::Int32(i as i32))
}

/// Index of every element in its domain.
#[derive(Clone, Copy, Debug, Default)]
pub struct IndexFieldInput;

impl FieldInput for IndexFieldInput {
  fn data_type(&self) -> DataType {
    DataType::Int32
  }

  fn debug_name(&self) -> String {
    "Index".to_string()
  }

  fn kind(&self) -> FieldInputKind<'_> {
    FieldInputKind::Context(self)
  }

  fn as_any(&self) -> &dyn Any {
    self
  }

  fn is_equal_to(&self, other: &dyn FieldInput) -> bool {
    other.as_any().is::<IndexFieldInput>()
  }
}

impl ContextFieldInput for IndexFieldInput {
  fn get_varray_for_field_context(
    &self,
    _context: &FieldContext<'_>,
    mask: &IndexMask,
  ) -> Option<GVArray> {
    Some(index_varray(mask.min_array_size()))
  }
}

/// A named attribute read in the requested domain and type.
#[derive(Clone, Debug)]
pub struct AttributeFieldInput {
  name: String,
  data_type: DataType,
}

impl AttributeFieldInput {
  pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
    Self {
      name: name.into(),
      data_type,
    }
  }

  pub fn name(&self) -> &str {
    &self.name
  }
}

impl FieldInput for AttributeFieldInput {
  fn data_type(&self) -> DataType {
    self.data_type
  }

  fn debug_name(&self) -> String {
    self.name.clone()
  }

  fn kind(&self) -> FieldInputKind<'_> {
    FieldInputKind::Geometry(self)
  }

  fn as_any(&self) -> &dyn Any {
    self
  }

  fn is_equal_to(&self, other: &dyn FieldInput) -> bool {
    other
      .as_any()
      .downcast_ref::<AttributeFieldInput>()
      .is_some_and(|other| other.name == self.name && other.data_type == self.data_type)
  }
}

impl GeometryFieldInput for AttributeFieldInput {
  fn get_varray_for_geometry(
    &self,
    context: &GeometryFieldContext<'_>,
    _mask: &IndexMask,
  ) -> Option<GVArray> {
    context
      .attributes()?
      .lookup_with(self.name.as_str(), Some(context.domain()), Some(self.data_type))
  }

  fn preferred_domain(&self, geometry: GeometryRef<'_>) -> Option<Domain> {
    geometry
      .attributes()
      .lookup_meta_data(self.name.as_str())
      .map(|meta| meta.domain)
  }
}

/// An attribute identified by an anonymous id.
#[derive(Clone, Debug)]
pub struct AnonymousAttributeFieldInput {
  id: AnonymousAttributeId,
  data_type: DataType,
  producer_name: String,
}

impl AnonymousAttributeFieldInput {
  pub fn new(id: AnonymousAttributeId, data_type: DataType, producer_name: impl Into<String>) -> Self {
    Self {
      id,
      data_type,
      producer_name: producer_name.into(),
    }
  }

  pub fn id(&self) -> &AnonymousAttributeId {
    &self.id
  }
}

impl FieldInput for AnonymousAttributeFieldInput {
  fn data_type(&self) -> DataType {
    self.data_type
  }

  fn debug_name(&self) -> String {
    format!("{} from {}", self.id.debug_name(), self.producer_name)
  }

  fn kind(&self) -> FieldInputKind<'_> {
    FieldInputKind::Geometry(self)
  }

  fn as_any(&self) -> &dyn Any {
    self
  }

  fn is_equal_to(&self, other: &dyn FieldInput) -> bool {
    other
      .as_any()
      .downcast_ref::<AnonymousAttributeFieldInput>()
      .is_some_and(|other| other.id == self.id && other.data_type == self.data_type)
  }
}

impl GeometryFieldInput for AnonymousAttributeFieldInput {
  fn get_varray_for_geometry(
    &self,
    context: &GeometryFieldContext<'_>,
    _mask: &IndexMask,
  ) -> Option<GVArray> {
    context
      .attributes()?
      .lookup_with(&self.id, Some(context.domain()), Some(self.data_type))
  }

  fn preferred_domain(&self, geometry: GeometryRef<'_>) -> Option<Domain> {
    geometry
      .attributes()
      .lookup_meta_data(&self.id)
      .map(|meta| meta.domain)
  }
}

/// The stored `id` attribute, or the element index where there is none.
#[derive(Clone, Copy, Debug, Default)]
pub struct IdOrIndexFieldInput;

impl FieldInput for IdOrIndexFieldInput {
  fn data_type(&self) -> DataType {
    DataType::Int32
  }

  fn debug_name(&self) -> String {
    "ID / Index".to_string()
  }

  fn kind(&self) -> FieldInputKind<'_> {
    FieldInputKind::Geometry(self)
  }

  fn as_any(&self) -> &dyn Any {
    self
  }

  fn is_equal_to(&self, other: &dyn FieldInput) -> bool {
    other.as_any().is::<IdOrIndexFieldInput>()
  }
}

impl GeometryFieldInput for IdOrIndexFieldInput {
  fn get_varray_for_geometry(
    &self,
    context: &GeometryFieldContext<'_>,
    mask: &IndexMask,
  ) -> Option<GVArray> {
    context
      .attributes()
      .and_then(|attributes| attributes.lookup_with("id", Some(context.domain()), Some(DataType::Int32)))
      .or_else(|| Some(index_varray(mask.min_array_size())))
  }
}

/// Number of corners of every face.
#[derive(Clone, Copy, Debug, Default)]
pub struct FaceCornerCountFieldInput;

impl FieldInput for FaceCornerCountFieldInput {
  fn data_type(&self) -> DataType {
    DataType::Int32
  }

  fn debug_name(&self) -> String {
    "Face Corner Count".to_string()
  }

  fn kind(&self) -> FieldInputKind<'_> {
    FieldInputKind::Mesh(self)
  }

  fn as_any(&self) -> &dyn Any {
    self
  }

  fn is_equal_to(&self, other: &dyn FieldInput) -> bool {
    other.as_any().is::<FaceCornerCountFieldInput>()
  }
}

impl MeshFieldInput for FaceCornerCountFieldInput {
  fn get_varray_for_mesh(&self, mesh: &Mesh, domain: Domain, _mask: &IndexMask) -> Option<GVArray> {
    let counts: Vec<i32> = mesh.polys.iter().map(|poly| poly.loop_count as i32).collect();
    mesh
      .attributes()
      .adapt_domain(GVArray::from_vec(counts), Domain::Face, domain)
  }

  fn preferred_domain(&self, _mesh: &Mesh) -> Option<Domain> {
    Some(Domain::Face)
  }
}

/// Number of points of every curve.
#[derive(Clone, Copy, Debug, Default)]
pub struct CurvePointCountFieldInput;

impl FieldInput for CurvePointCountFieldInput {
  fn data_type(&self) -> DataType {
    DataType::Int32
  }

  fn debug_name(&self) -> String {
    "Curve Point Count".to_string()
  }

  fn kind(&self) -> FieldInputKind<'_> {
    FieldInputKind::Curves(self)
  }

  fn as_any(&self) -> &dyn Any {
    self
  }

  fn is_equal_to(&self, other: &dyn FieldInput) -> bool {
    other.as_any().is::<CurvePointCountFieldInput>()
  }
}

impl CurvesFieldInput for CurvePointCountFieldInput {
  fn get_varray_for_curves(
    &self,
    curves: &Curves,
    domain: Domain,
    _mask: &IndexMask,
  ) -> Option<GVArray> {
    let counts: Vec<i32> = curves.offsets().windows(2).map(|w| w[1] - w[0]).collect();
    curves
      .attributes()
      .adapt_domain(GVArray::from_vec(counts), Domain::Curve, domain)
  }

  fn preferred_domain(&self, _curves: &Curves) -> Option<Domain> {
    Some(Domain::Curve)
  }
}
