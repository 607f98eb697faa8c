//! Lazily evaluated per-element computations over geometry.
//!
//! A [`Field`] is a small graph of inputs, constants and conversions. It is
//! evaluated against a [`FieldContext`] that supplies the geometry and the
//! domain.

use std::fmt;
use std::sync::Arc;

pub mod capture;
pub mod context;
pub mod input;
pub mod inputs;

pub use capture::{try_capture_field_on_geometry, try_detect_field_domain};
pub use context::{
  CurvesFieldContext, FieldContext, GeometryFieldContext, GeometryMut, GeometryRef,
  InstancesFieldContext, MeshFieldContext, PointCloudFieldContext,
};
pub use input::{
  get_varray_for_context, ContextFieldInput, CurvesFieldInput, FieldInput, FieldInputKind,
  GeometryFieldInput, InstancesFieldInput, MeshFieldInput, PointCloudFieldInput,
};
pub use inputs::{
  AnonymousAttributeFieldInput, AttributeFieldInput, CurvePointCountFieldInput,
  FaceCornerCountFieldInput, IdOrIndexFieldInput, IndexFieldInput,
};

use crate::conversions::ConversionFunctions;
use crate::gvarray::{ConvertedGVArray, GVArray};
use crate::index_mask::IndexMask;
use crate::types::DataType;
use crate::value::AttributeValue;

pub enum FieldNode {
  Input(Arc<dyn FieldInput>),
  Constant(AttributeValue),
  /// Output of `source` read through a type conversion.
  Convert {
    source: Field,
    functions: ConversionFunctions,
  },
}

/// Shared handle to a field graph node.
#[derive(Clone)]
pub struct Field(Arc<FieldNode>);

impl Field {
  pub fn from_input(input: impl FieldInput) -> Self {
    Self::from_shared_input(Arc::new(input))
  }

  pub fn from_shared_input(input: Arc<dyn FieldInput>) -> Self {
    Self(Arc::new(FieldNode::Input(input)))
  }

  pub fn constant(value: AttributeValue) -> Self {
    Self(Arc::new(FieldNode::Constant(value)))
  }

  /// `field` read through `functions`, which must convert from its type.
  pub fn converted(field: Field, functions: ConversionFunctions) -> Self {
    debug_assert_eq!(field.data_type(), functions.from_type());
    Self(Arc::new(FieldNode::Convert {
      source: field,
      functions,
    }))
  }

  #[inline]
  pub fn node(&self) -> &FieldNode {
    &self.0
  }

  pub fn data_type(&self) -> DataType {
    match self.node() {
      FieldNode::Input(input) => input.data_type(),
      FieldNode::Constant(value) => value.data_type(),
      FieldNode::Convert { functions, .. } => functions.to_type(),
    }
  }

  /// Every input leaf of the graph, equal inputs listed once.
  pub fn field_inputs(&self) -> Vec<Arc<dyn FieldInput>> {
    let mut inputs: Vec<Arc<dyn FieldInput>> = Vec::new();
    let mut stack = vec![self];
    while let Some(field) = stack.pop() {
      match field.node() {
        FieldNode::Input(input) => {
          let known = inputs.iter().any(|known| {
            std::ptr::addr_eq(Arc::as_ptr(known), Arc::as_ptr(input)) || known.is_equal_to(&**input)
          });
          if !known {
            inputs.push(input.clone());
          }
        }
        FieldNode::Constant(_) => {}
        FieldNode::Convert { source, .. } => stack.push(source),
      }
    }
    inputs
  }

  /// Evaluate for the indices in `mask`. The result is indexed like the
  /// domain, elements outside `mask` are unspecified.
  ///
  /// Inputs without data for the context evaluate to the type default.
  pub fn evaluate(&self, context: &FieldContext<'_>, mask: &IndexMask) -> GVArray {
    let len = mask.min_array_size();
    match self.node() {
      FieldNode::Input(input) => get_varray_for_context(&**input, context, mask)
        .unwrap_or_else(|| GVArray::from_default(input.data_type(), len)),
      FieldNode::Constant(value) => GVArray::from_single(*value, len),
      FieldNode::Convert { source, functions } => {
        let source = source.evaluate(context, mask);
        match source.as_single() {
          Some(value) => GVArray::from_single(functions.convert_single(&value), source.len()),
          None => GVArray::from_converted(ConvertedGVArray::new(source, functions.clone())),
        }
      }
    }
  }
}

impl fmt::Debug for Field {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self.node() {
      FieldNode::Input(input) => write!(f, "Field({})", input.debug_name()),
      FieldNode::Constant(value) => write!(f, "Field({value:?})"),
      FieldNode::Convert { source, functions } => {
        write!(f, "Field({source:?} as {})", functions.to_type())
      }
    }
  }
}

#[cfg(test)]
#[path = "fields_test.rs"]
mod fields_test;
